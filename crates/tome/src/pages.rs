//! Generic record pages and the site index.
//!
//! Every record of the data set becomes one page in the folder named after
//! its table. A record's `name`, `description` and `icon` fields feed the
//! page identity; all other fields are shown as a table.

use std::sync::Arc;

use serde_json::{Map, Value};
use tome_html::{
    AttrValue, Component, Context, Document, DocumentKind, Element, Module, Node, RenderError,
    ResourceError, ResourceRef, StructuralError, tags,
};
use tome_sources::{AssetStore, DataProvider};

/// Shell styles shared by every page.
pub(crate) const SITE_CSS: &str = "\
.body_grid{display:grid;grid-template-rows:auto 1fr auto;min-height:100vh;margin:0}
.header,.footer{padding:.5em 1em;background:#f4f1ea}
#content{padding:1em}";

const RECORD_CSS: &str = "\
table.record{border-collapse:collapse}
table.record th{text-align:left;vertical-align:top;padding-right:1em}";

/// Fields shown in the page identity rather than the field table.
const IDENTITY_FIELDS: &[&str] = &["name", "description", "icon"];

/// Field table of one record.
struct RecordFields {
    fields: Vec<(String, Value)>,
}

impl Component for RecordFields {
    fn name(&self) -> &str {
        "RecordFields"
    }

    fn content(&self, _ctx: &mut Context) -> Result<Vec<Node>, RenderError> {
        self.fields
            .iter()
            .map(|(field, value)| -> Result<Node, RenderError> {
                let row = tags::tr().children([
                    Node::from(tags::th().text(field)?),
                    Node::from(tags::td().child(value_node(value)?)?),
                ])?;
                Ok(row.into())
            })
            .collect()
    }

    fn css(&self) -> &str {
        RECORD_CSS
    }
}

fn value_node(value: &Value) -> Result<Node, StructuralError> {
    Ok(match value {
        Value::Null => Node::Empty,
        Value::Bool(b) => Node::text(b.to_string()),
        Value::Number(n) => Node::text(n.to_string()),
        Value::String(s) => Node::text(s.as_str()),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| -> Result<Element, StructuralError> {
                    Ok(tags::li().child(value_node(item)?)?)
                })
                .collect::<Result<Vec<Element>, StructuralError>>()?;
            tags::ul().children(items)?.into()
        }
        Value::Object(map) => field_table(map)?.into(),
    })
}

fn field_table(map: &Map<String, Value>) -> Result<Element, StructuralError> {
    let rows = map
        .iter()
        .map(|(field, value)| -> Result<Element, StructuralError> {
            tags::tr().children([
                Node::from(tags::th().text(field)?),
                Node::from(tags::td().child(value_node(value)?)?),
            ])
        })
        .collect::<Result<Vec<Element>, StructuralError>>()?;
    tags::table().children(rows)
}

/// One page for `record`, stored under the folder of `table`.
///
/// An `icon` field names an asset store key; a missing key is an error.
pub(crate) fn record_document(
    table: &str,
    key: &str,
    record: &Value,
    assets: &dyn AssetStore,
) -> Result<Document, ResourceError> {
    let name = record.get("name").and_then(Value::as_str).unwrap_or(key);
    let description = record.get("description").and_then(Value::as_str);
    let icon = record
        .get("icon")
        .and_then(Value::as_str)
        .map(|icon| ResourceRef::cached(icon, assets))
        .transpose()?;
    let fields: Vec<(String, Value)> = record
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(field, _)| !IDENTITY_FIELDS.contains(&field.as_str()))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();

    let title = name.to_owned();
    let summary = description.map(str::to_owned);
    let image = icon.clone();
    let mut document = Document::new(name, DocumentKind::folder(table), move |_ctx| {
        let fields = Module::new(
            tags::table().class("record")?,
            RecordFields {
                fields: fields.clone(),
            },
        );
        Ok(Node::sequence([
            tags::h1().text(&title)?.into(),
            image
                .as_ref()
                .map_or(Node::Empty, |icon| tags::img(icon, &title).into()),
            summary
                .as_deref()
                .map_or(Ok(Node::Empty), |text| tags::p().text(text).map(Node::from))?,
            fields.into(),
        ]))
    })
    .with_persistent_name(key);

    if let Some(description) = description {
        document = document.with_description(description);
    }
    if let Some(icon) = icon {
        document = document.with_icon(icon);
    }
    Ok(document)
}

/// Pages for every record of `data`, table by table in key order.
pub(crate) fn record_documents(
    data: &dyn DataProvider,
    assets: &dyn AssetStore,
) -> Result<Vec<Document>, ResourceError> {
    let mut documents = Vec::new();
    for table in data.table_names() {
        for key in data.keys(&table) {
            if let Some(record) = data.lookup(&table, &key) {
                documents.push(record_document(&table, &key, record, assets)?);
            }
        }
    }
    Ok(documents)
}

/// Root page linking every record page, grouped by folder.
pub(crate) fn index_document(site_name: &str, records: Vec<Document>) -> Document {
    let records = Arc::new(records);
    Document::new(site_name, DocumentKind::root("Index"), move |_ctx| {
        let mut sections: Vec<Node> = vec![tags::h1().text("Index")?.into()];
        for group in records.chunk_by(|a, b| a.kind() == b.kind()) {
            let links = group
                .iter()
                .map(|document| tags::li().child(tags::page_link(document, None)))
                .collect::<Result<Vec<Element>, StructuralError>>()?;
            sections.push(tags::h2().text(group[0].kind().name())?.into());
            sections.push(tags::ul().children(links)?.into());
        }
        Ok(Node::sequence(sections))
    })
    .with_filename("index.html")
}

/// Link to the site index, for the page header.
pub(crate) fn header(site_name: &str) -> Result<Node, RenderError> {
    let home = tags::a(AttrValue::resolver(|ctx| Ok(ctx.path_to("index.html"))));
    Ok(tags::div()
        .class("header")?
        .child(home.child(tags::b().text(site_name)?)?)?
        .into())
}

/// Page footer naming the generator version.
pub(crate) fn footer(version: &str) -> Result<Node, RenderError> {
    Ok(tags::div()
        .class("footer")?
        .text(&format!("Built with tome {version}"))?
        .into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tome_html::{DependencyRegistry, Sink};
    use tome_sources::{
        EmptyData, Fetcher, JsonDataSet, MockAssetStore, RemoteCache, SourceError, Sources,
    };

    use super::*;

    struct Offline;

    impl Fetcher for Offline {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
            Err(SourceError::Fetch {
                url: url.to_owned(),
                message: "offline".to_owned(),
            })
        }
    }

    fn context(depth: usize) -> Context {
        let sources = Sources::new(
            Arc::new(EmptyData),
            Arc::new(MockAssetStore::new()),
            Arc::new(RemoteCache::new(Box::new(Offline))),
        );
        Context::new(
            Sink::Buffer(String::new()),
            sources,
            Arc::new(DependencyRegistry::new()),
        )
        .with_folder_depth(depth)
    }

    fn render_content(document: &Document) -> String {
        let mut ctx = context(document.folder_depth());
        document.content(&mut ctx).unwrap().render(&mut ctx).unwrap();
        ctx.close().unwrap().output.unwrap()
    }

    fn data() -> JsonDataSet {
        JsonDataSet::from_json(
            r#"{"tables": {
                "item": {
                    "rope": {"name": "Rope", "weight": 5, "tags": ["gear"]},
                    "torch": {"name": "Torch", "description": "Sheds light", "icon": "icons/torch.png"}
                },
                "spell": {"light": {"name": "Light", "level": 0, "ritual": false}}
            }}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_record_page_shows_fields() {
        let assets = MockAssetStore::new();
        let record = serde_json::json!({"name": "Rope", "weight": 5, "tags": ["gear", "coil"], "cost": null});

        let document = record_document("item", "rope", &record, &assets).unwrap();

        assert_eq!(document.path(), "item/Rope.html");
        assert_eq!(document.persistent_name(), Some("rope"));
        assert_eq!(
            render_content(&document),
            "<h1>Rope</h1><table class='record'>\
             <tr><th>cost</th><td></td></tr>\
             <tr><th>tags</th><td><ul><li>gear</li><li>coil</li></ul></td></tr>\
             <tr><th>weight</th><td>5</td></tr></table>"
        );
    }

    #[test]
    fn test_record_without_name_uses_key() {
        let assets = MockAssetStore::new();
        let record = serde_json::json!({"size": {"w": 1}});

        let document = record_document("item", "pole", &record, &assets).unwrap();

        assert_eq!(document.name(), "pole");
        assert_eq!(
            render_content(&document),
            "<h1>pole</h1><table class='record'><tr><th>size</th><td>\
             <table><tr><th>w</th><td>1</td></tr></table></td></tr></table>"
        );
    }

    #[test]
    fn test_record_identity_fields() {
        let assets = MockAssetStore::new().with_asset("icons/torch.png", b"png");
        let data = data();
        let record = data.lookup("item", "torch").unwrap();

        let document = record_document("item", "torch", record, &assets).unwrap();

        assert_eq!(document.description(), Some("Sheds light"));
        assert!(document.icon().is_some());
        let html = render_content(&document);
        assert!(html.starts_with("<h1>Torch</h1><img src='../rsc/cache/"));
        assert!(html.contains("<p>Sheds light</p>"));
    }

    #[test]
    fn test_missing_icon_is_an_error() {
        let assets = MockAssetStore::new();
        let data = data();
        let record = data.lookup("item", "torch").unwrap();

        assert!(record_document("item", "torch", record, &assets).is_err());
    }

    #[test]
    fn test_index_links_every_record() {
        let assets = MockAssetStore::new().with_asset("icons/torch.png", b"png");
        let records = record_documents(&data(), &assets).unwrap();

        let index = index_document("Dungeon Wiki", records);

        assert_eq!(index.path(), "index.html");
        assert_eq!(
            render_content(&index),
            "<h1>Index</h1>\
             <h2>item</h2><ul><li><a href='item/Rope.html'>Rope</a></li>\
             <li><a href='item/Torch.html'>Torch</a></li></ul>\
             <h2>spell</h2><ul><li><a href='spell/Light.html'>Light</a></li></ul>"
        );
    }

    #[test]
    fn test_header_links_home() {
        let mut ctx = context(1);
        header("Dungeon Wiki").unwrap().render(&mut ctx).unwrap();

        assert_eq!(
            ctx.close().unwrap().output.unwrap(),
            "<div class='header'><a href='../index.html'><b>Dungeon Wiki</b></a></div>"
        );
    }
}
