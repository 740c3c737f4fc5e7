//! External compositing tool.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::SourceError;

/// An external program that filters bytes: input on stdin, result on stdout.
///
/// Used for image compositing. Any non-zero exit status is an error carrying
/// the program's stderr.
#[derive(Debug, Clone)]
pub struct Compositor {
    program: PathBuf,
    args: Vec<String>,
}

impl Compositor {
    /// Create a compositor running `program` with fixed leading `args`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Run the program over `input`, appending `extra_args` to the fixed
    /// arguments, and return its stdout.
    pub fn run(&self, input: &[u8], extra_args: &[String]) -> Result<Vec<u8>, SourceError> {
        let program = self.program.display().to_string();
        let io_err = |source: std::io::Error| SourceError::CompositorIo {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(io_err)?;

        let mut stdin = child.stdin.take();
        // Feed stdin from another thread so a large output can't deadlock us.
        let (written, output) = std::thread::scope(|s| {
            let writer = s.spawn(move || match stdin.as_mut() {
                Some(stdin) => stdin.write_all(input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output.map_err(io_err)?;

        if !output.status.success() {
            return Err(SourceError::CompositorFailed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(io_err(e)),
            Err(_) => {
                return Err(io_err(std::io::Error::other("stdin writer panicked")));
            }
        }

        tracing::debug!(
            program = %program,
            input = input.len(),
            output = output.stdout.len(),
            "Compositor finished"
        );
        Ok(output.stdout)
    }
}
