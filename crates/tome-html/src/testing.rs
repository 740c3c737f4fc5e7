//! Shared fixtures for unit tests.

use std::sync::Arc;

use tome_sources::{EmptyData, Fetcher, MockAssetStore, RemoteCache, SourceError, Sources};

use crate::context::{Context, Sink};
use crate::node::Node;

/// Fetcher that serves the URL itself as content.
pub(crate) struct EchoFetcher;

impl Fetcher for EchoFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        Ok(url.as_bytes().to_vec())
    }
}

pub(crate) fn sources_with(assets: MockAssetStore) -> Sources {
    Sources::new(
        Arc::new(EmptyData),
        Arc::new(assets),
        Arc::new(RemoteCache::new(Box::new(EchoFetcher))),
    )
}

pub(crate) fn sources() -> Sources {
    sources_with(MockAssetStore::new())
}

pub(crate) fn context() -> Context {
    Context::new(Sink::Buffer(String::new()), sources(), Arc::default())
}

/// Render `node` in a fresh root context and return the markup.
pub(crate) fn render(node: &Node) -> String {
    let mut ctx = context();
    node.render(&mut ctx).unwrap();
    ctx.close().unwrap().output.unwrap()
}
