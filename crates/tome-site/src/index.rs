//! Search index and redirect map.

use serde::Serialize;
use tome_html::{Context, Document, RenderError};

/// One searchable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Lower-cased name, matched against queries.
    pub index: String,
    /// Display name.
    pub name: String,
    /// Archive path of the document.
    pub path: String,
    /// Icon URI relative to the archive root.
    pub icon: Option<String>,
}

/// Build index entries for `documents`, resolving icons in `ctx`.
///
/// `ctx` should sit at the archive root; icon dependencies it registers are
/// materialized with the rest.
pub fn index_entries(documents: &[Document], ctx: &mut Context) -> Result<Vec<IndexEntry>, RenderError> {
    documents
        .iter()
        .map(|document| -> Result<IndexEntry, RenderError> {
            let icon = match document.icon() {
                Some(icon) => Some(icon.absolute_uri(ctx)?),
                None => None,
            };
            Ok(IndexEntry {
                index: document.name().to_lowercase(),
                name: document.name().to_owned(),
                path: document.path(),
                icon,
            })
        })
        .collect()
}

/// Render the index as an ES module exporting the entry list.
pub fn search_index_module(entries: &[IndexEntry]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(entries)?;
    Ok(format!("const searchindex = {json};\nexport default searchindex;"))
}

/// Rewrite rules mapping persistent URLs to current document paths, sorted.
///
/// Each line reads `/<folder>/<persistent name> /<path>;`.
pub fn redirect_lines(documents: &[Document]) -> Vec<String> {
    let mut lines: Vec<String> = documents
        .iter()
        .filter_map(|document| {
            let persistent = document.persistent_name()?;
            let from = match document.kind().folder_name() {
                Some(folder) => format!("/{folder}/{persistent}"),
                None => format!("/{persistent}"),
            };
            Some(format!("{from} /{};", document.path()))
        })
        .collect();
    lines.sort();
    lines
}
