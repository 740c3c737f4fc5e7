//! Output archive shared by all build workers.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use flate2::Compression;
use flate2::write::GzEncoder;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::BuildError;

/// Totals for a finished archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Entries written, `.gz` siblings included.
    pub entries: usize,
    /// Uncompressed bytes written, `.gz` siblings included.
    pub bytes: u64,
}

/// Zip writer that many threads can add entries to.
///
/// Each entry is written under one lock acquisition, so entries never
/// interleave. Entries whose extension is in the pre-compressed set get a
/// gzip sibling `<path>.gz`, compressed outside the lock.
pub struct ArchiveWriter {
    zip: Mutex<ZipWriter<File>>,
    options: SimpleFileOptions,
    pre_compressed: HashSet<String>,
    entries: AtomicUsize,
    bytes: AtomicU64,
}

impl ArchiveWriter {
    /// Start an archive in `file`. With `compression` entries are deflated,
    /// otherwise stored.
    pub fn new(file: File, compression: bool, pre_compressed: &[String]) -> Self {
        let method = if compression {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        Self {
            zip: Mutex::new(ZipWriter::new(file)),
            options: SimpleFileOptions::default().compression_method(method),
            pre_compressed: pre_compressed
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            entries: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Whether `path` gets a `.gz` sibling.
    pub fn wants_gzip(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .is_some_and(|(_, ext)| self.pre_compressed.contains(&ext.to_ascii_lowercase()))
    }

    /// Add an entry at `path`.
    pub fn write_entry(&self, path: &str, bytes: &[u8]) -> Result<(), BuildError> {
        let gzipped = if self.wants_gzip(path) {
            Some(gzip(bytes).map_err(|e| BuildError::io(path, e))?)
        } else {
            None
        };

        let mut zip = self.zip.lock().unwrap_or_else(PoisonError::into_inner);
        zip.start_file(path, self.options)?;
        zip.write_all(bytes).map_err(|e| BuildError::io(path, e))?;
        self.record(bytes.len());

        if let Some(gzipped) = gzipped {
            let sibling = format!("{path}.gz");
            let stored = self.options.compression_method(CompressionMethod::Stored);
            zip.start_file(sibling.as_str(), stored)?;
            zip.write_all(&gzipped).map_err(|e| BuildError::io(&sibling, e))?;
            self.record(gzipped.len());
        }
        drop(zip);

        tracing::debug!(path, bytes = bytes.len(), "Wrote archive entry");
        Ok(())
    }

    /// Totals so far.
    pub fn stats(&self) -> ArchiveStats {
        ArchiveStats {
            entries: self.entries.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }

    /// Write the central directory and return the totals.
    pub fn finish(self) -> Result<ArchiveStats, BuildError> {
        let stats = self.stats();
        let zip = self.zip.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut file = zip.finish()?;
        file.flush().map_err(|e| BuildError::io("archive", e))?;
        Ok(stats)
    }

    fn record(&self, len: usize) {
        self.entries.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }
}

fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::best());
    encoder.write_all(bytes)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;
    use pretty_assertions::assert_eq;

    use super::*;

    fn read_archive(file: File) -> zip::ZipArchive<File> {
        zip::ZipArchive::new(file).unwrap()
    }

    #[test]
    fn test_gzip_siblings_follow_extension() {
        let temp = tempfile::tempfile().unwrap();
        let writer = ArchiveWriter::new(
            temp.try_clone().unwrap(),
            false,
            &["html".to_owned(), ".CSS".to_owned()],
        );

        writer.write_entry("a/index.html", b"<html></html>").unwrap();
        writer.write_entry("rsc/a.PNG", b"png").unwrap();
        writer.write_entry("site.css", b"body{}").unwrap();
        let stats = writer.finish().unwrap();

        let mut archive = read_archive(temp);
        let mut names: Vec<_> = archive.file_names().map(str::to_owned).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["a/index.html", "a/index.html.gz", "rsc/a.PNG", "site.css", "site.css.gz"]
        );
        assert_eq!(stats.entries, 5);

        let mut unzipped = String::new();
        GzDecoder::new(archive.by_name("a/index.html.gz").unwrap())
            .read_to_string(&mut unzipped)
            .unwrap();
        assert_eq!(unzipped, "<html></html>");
    }

    #[test]
    fn test_compression_setting() {
        for (compression, method) in [
            (true, CompressionMethod::Deflated),
            (false, CompressionMethod::Stored),
        ] {
            let temp = tempfile::tempfile().unwrap();
            let writer = ArchiveWriter::new(temp.try_clone().unwrap(), compression, &[]);
            writer.write_entry("a.txt", b"aaaaaaaaaaaaaaaa").unwrap();
            writer.finish().unwrap();

            let mut archive = read_archive(temp);
            assert_eq!(archive.by_name("a.txt").unwrap().compression(), method);
        }
    }

    #[test]
    fn test_duplicate_entry_fails() {
        let writer = ArchiveWriter::new(tempfile::tempfile().unwrap(), false, &[]);
        writer.write_entry("a.txt", b"a").unwrap();

        assert!(matches!(
            writer.write_entry("a.txt", b"b"),
            Err(BuildError::Archive(_))
        ));
    }
}
