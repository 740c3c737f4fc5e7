//! Resource identity and URI resolution.
//!
//! A [`ResourceRef`] names some bytes ([`Origin`]) and the archive path they
//! should live at. Resolving it inside a [`Context`] either links to it,
//! registering a file dependency as a side effect, or inlines it as a data
//! URI, depending on the session's [`ReferenceMode`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use tome_sources::{AssetStore, SourceError, Sources};

use crate::context::Context;
use crate::deps::{Producer, producer};
use crate::error::{RenderError, ResourceError};
use crate::node::AttrValue;

/// Archive folder that all resource destinations live under.
pub const RESOURCE_DIR: &str = "rsc";

/// How resource references are written into documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceMode {
    /// Link remote resources at their original URL; everything else as
    /// [`ReferenceMode::Internal`].
    External,
    /// Link to a copy inside the archive.
    #[default]
    Internal,
    /// Inline the bytes as a `data:` URI.
    DataUri,
}

impl ReferenceMode {
    /// Configuration name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
            Self::DataUri => "data-uri",
        }
    }
}

impl fmt::Display for ReferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized reference mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reference mode `{0}` (expected external, internal or data-uri)")]
pub struct UnknownReferenceMode(pub String);

impl FromStr for ReferenceMode {
    type Err = UnknownReferenceMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(Self::External),
            "internal" => Ok(Self::Internal),
            "data-uri" => Ok(Self::DataUri),
            other => Err(UnknownReferenceMode(other.to_owned())),
        }
    }
}

/// Where a resource's bytes come from.
#[derive(Clone)]
pub enum Origin {
    /// A file on the local filesystem.
    LocalFile(PathBuf),
    /// An entry of the content-addressed asset store.
    CachedAsset { key: String, hash: String },
    /// A remote URL, fetched through the process-wide remote cache.
    Remote(String),
    /// Bytes computed on demand.
    Computed(Producer),
    /// Another origin's bytes piped through the external compositor.
    Composited { input: Box<Origin>, args: Vec<String> },
    /// A placeholder with a destination but no content.
    Inert,
}

impl Origin {
    /// Obtain the bytes. `destination` is only used for error messages.
    pub fn fetch(&self, sources: &Sources, destination: &str) -> Result<Vec<u8>, ResourceError> {
        match self {
            Self::LocalFile(path) => std::fs::read(path).map_err(|source| ResourceError::Io {
                path: path.clone(),
                source,
            }),
            Self::CachedAsset { key, .. } => Ok(sources.assets.read(key)?),
            Self::Remote(url) => Ok(sources.remote.get(url)?.to_vec()),
            Self::Computed(produce) => produce(sources),
            Self::Composited { input, args } => {
                let bytes = input.fetch(sources, destination)?;
                Ok(sources.compositor()?.run(&bytes, args)?)
            }
            Self::Inert => Err(ResourceError::Inert(destination.to_owned())),
        }
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalFile(path) => f.debug_tuple("LocalFile").field(path).finish(),
            Self::CachedAsset { key, hash } => f
                .debug_struct("CachedAsset")
                .field("key", key)
                .field("hash", hash)
                .finish(),
            Self::Remote(url) => f.debug_tuple("Remote").field(url).finish(),
            Self::Computed(_) => f.write_str("Computed"),
            Self::Composited { input, args } => f
                .debug_struct("Composited")
                .field("input", input)
                .field("args", args)
                .finish(),
            Self::Inert => f.write_str("Inert"),
        }
    }
}

/// A resource a document refers to: an origin plus its archive destination.
///
/// Destinations are relative to [`RESOURCE_DIR`]. Cached assets derive theirs
/// from the content hash, so identical content shared by many documents maps
/// to one archive entry.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    origin: Origin,
    destination: String,
}

impl ResourceRef {
    /// A local file copied to `destination`.
    #[must_use]
    pub fn local_file(path: impl Into<PathBuf>, destination: &str) -> Self {
        Self {
            origin: Origin::LocalFile(path.into()),
            destination: destination.to_owned(),
        }
    }

    /// An asset store entry, stored under `cache/<hash>.<ext>`.
    ///
    /// Fails if the store has no such key.
    pub fn cached(key: &str, assets: &dyn AssetStore) -> Result<Self, ResourceError> {
        if !assets.contains(key) {
            return Err(SourceError::MissingAsset(key.to_owned()).into());
        }
        let hash = assets.content_hash(key)?;
        let destination = match Path::new(key).extension() {
            Some(ext) => format!("cache/{hash}.{}", ext.to_string_lossy()),
            None => format!("cache/{hash}"),
        };
        Ok(Self {
            origin: Origin::CachedAsset {
                key: key.to_owned(),
                hash,
            },
            destination,
        })
    }

    /// A remote resource mirrored to `destination`.
    #[must_use]
    pub fn remote(url: &str, destination: &str) -> Self {
        Self {
            origin: Origin::Remote(url.to_owned()),
            destination: destination.to_owned(),
        }
    }

    /// Bytes computed by `produce`, stored at `destination`.
    #[must_use]
    pub fn computed<F>(destination: &str, produce: F) -> Self
    where
        F: Fn(&Sources) -> Result<Vec<u8>, ResourceError> + Send + Sync + 'static,
    {
        Self {
            origin: Origin::Computed(producer(produce)),
            destination: destination.to_owned(),
        }
    }

    /// This resource passed through the compositor with `args`, stored at
    /// `destination`.
    #[must_use]
    pub fn composited(&self, args: Vec<String>, destination: &str) -> Self {
        Self {
            origin: Origin::Composited {
                input: Box::new(self.origin.clone()),
                args,
            },
            destination: destination.to_owned(),
        }
    }

    /// A destination with no content. Resolves to a path but never becomes
    /// a dependency.
    #[must_use]
    pub fn inert(destination: &str) -> Self {
        Self {
            origin: Origin::Inert,
            destination: destination.to_owned(),
        }
    }

    /// Where the bytes come from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Destination relative to [`RESOURCE_DIR`].
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Destination relative to the archive root.
    pub fn archive_path(&self) -> String {
        format!("{RESOURCE_DIR}/{}", self.destination)
    }

    /// Deferred computation of this resource's bytes.
    pub fn producer(&self) -> Producer {
        let origin = self.origin.clone();
        let destination = self.destination.clone();
        producer(move |sources| origin.fetch(sources, &destination))
    }

    /// URI of this resource relative to the document being rendered.
    pub fn uri(&self, ctx: &mut Context) -> Result<String, RenderError> {
        self.resolve(ctx, false)
    }

    /// URI of this resource relative to the archive root.
    pub fn absolute_uri(&self, ctx: &mut Context) -> Result<String, RenderError> {
        self.resolve(ctx, true)
    }

    /// Fully qualified URL under `deployment_url` (expected to end in `/`).
    ///
    /// Remote links and data URIs are returned unchanged.
    pub fn absolute_url(&self, ctx: &mut Context, deployment_url: &str) -> Result<String, RenderError> {
        let uri = self.absolute_uri(ctx)?;
        if uri.contains("://") || uri.starts_with("data:") {
            Ok(uri)
        } else {
            Ok(format!("{deployment_url}{uri}"))
        }
    }

    /// Attribute value resolving to [`ResourceRef::uri`] at render time.
    pub fn attr(&self) -> AttrValue {
        let resource = self.clone();
        AttrValue::resolver(move |ctx| resource.uri(ctx))
    }

    /// Inline the bytes as a `data:` URI, typed by the destination extension.
    pub fn data_uri(&self, sources: &Sources) -> Result<String, ResourceError> {
        let mime = mime_guess::from_path(&self.destination)
            .first()
            .ok_or_else(|| ResourceError::UnknownMime(self.destination.clone()))?;
        let bytes = self.origin.fetch(sources, &self.destination)?;
        Ok(format!(
            "data:{};base64,{}",
            mime.essence_str(),
            BASE64_STANDARD.encode(bytes)
        ))
    }

    fn resolve(&self, ctx: &mut Context, absolute: bool) -> Result<String, RenderError> {
        let mode = ctx.reference_mode();
        if mode == ReferenceMode::External
            && let Origin::Remote(url) = &self.origin
        {
            return Ok(url.clone());
        }
        let inert = matches!(self.origin, Origin::Inert);
        if mode == ReferenceMode::DataUri && !inert {
            return Ok(self.data_uri(ctx.sources())?);
        }

        let path = self.archive_path();
        if !inert {
            ctx.add_file_dependency(&path, self.producer());
        }
        if absolute {
            Ok(path)
        } else {
            Ok(ctx.path_to(&path))
        }
    }
}
