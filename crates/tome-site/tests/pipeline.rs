use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use tome_html::{
    Component, Context, Document, DocumentKind, Element, Module, Node, ReferenceMode,
    RenderError, ResourceError, ResourceRef, Shell, tags,
};
use tome_site::{BuildError, BuildOptions, Pipeline, StaticFile};
use tome_sources::{
    AssetStore, DataProvider, EmptyData, Fetcher, MockAssetStore, RemoteCache, SourceError,
    Sources,
};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

struct Offline;

impl Fetcher for Offline {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        Err(SourceError::Fetch {
            url: url.to_owned(),
            message: "offline".to_owned(),
        })
    }
}

struct Tooltip;

impl Component for Tooltip {
    fn name(&self) -> &str {
        "Tooltip"
    }

    fn content(&self, _ctx: &mut Context) -> Result<Vec<Node>, RenderError> {
        Ok(vec![Node::text("?")])
    }

    fn css(&self) -> &str {
        ".tooltip{}"
    }

    fn script(&self) -> Option<&str> {
        Some("tooltips();")
    }
}

fn sources(assets: MockAssetStore) -> Sources {
    sources_with(assets, Arc::new(EmptyData))
}

fn sources_with(assets: MockAssetStore, data: Arc<dyn DataProvider>) -> Sources {
    Sources::new(
        data,
        Arc::new(assets),
        Arc::new(RemoteCache::new(Box::new(Offline))),
    )
}

fn shell() -> Shell {
    Shell::new("Tome", "TM", "https://tome.test/").with_css("body{}")
}

fn options(output_dir: &Path) -> BuildOptions {
    BuildOptions {
        output_dir: output_dir.to_path_buf(),
        threads: 4,
        ..BuildOptions::default()
    }
}

/// Document showing an asset store image.
fn asset_page(name: &str, key: &'static str) -> Document {
    Document::new(name, DocumentKind::folder("Item"), move |ctx| {
        let icon = ResourceRef::cached(key, ctx.sources().assets.as_ref())?;
        Ok(tags::img(&icon, "icon").into())
    })
}

fn read_archive(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();
        entries.insert(file.name().to_owned(), bytes);
    }
    entries
}

fn text(entries: &BTreeMap<String, Vec<u8>>, path: &str) -> String {
    String::from_utf8(entries[path].clone()).unwrap()
}

fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn test_shared_computed_resource_is_produced_once() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let documents: Vec<_> = (0..50)
        .map(|i| {
            let calls = Arc::clone(&calls);
            Document::new(&format!("Page {i}"), DocumentKind::folder("Item"), move |_| {
                let calls = Arc::clone(&calls);
                let chart = ResourceRef::computed("charts/shared.svg", move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(b"<svg/>".to_vec())
                });
                Ok(tags::img(&chart, "chart").into())
            })
        })
        .collect();

    let report = Pipeline::new(options(dir.path()), sources(MockAssetStore::new()))
        .build(&shell(), &documents)
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.documents, 50);
    assert_eq!(report.dependencies, 1);
    let entries = read_archive(&report.archive);
    assert_eq!(entries["rsc/charts/shared.svg"], b"<svg/>");
}

#[test]
fn test_shared_cached_asset_has_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let assets = Arc::new(
        MockAssetStore::new()
            .with_asset("icons/rope.png", PNG)
            .with_asset("legacy/rope-copy.png", PNG),
    );
    let store = Arc::clone(&assets) as Arc<dyn AssetStore>;
    let sources = Sources::new(
        Arc::new(EmptyData),
        store,
        Arc::new(RemoteCache::new(Box::new(Offline))),
    );
    let documents = vec![
        asset_page("Rope", "icons/rope.png"),
        asset_page("Old Rope", "legacy/rope-copy.png"),
    ];

    let report = Pipeline::new(options(dir.path()), sources)
        .build(&shell(), &documents)
        .unwrap();

    assert_eq!(assets.read_count(), 1);
    let entries = read_archive(&report.archive);
    let cached: Vec<_> = entries
        .keys()
        .filter(|path| path.starts_with("rsc/cache/"))
        .collect();
    assert_eq!(cached.len(), 1);
    assert!(cached[0].ends_with(".png"));
    let src = format!("src='../{}'", cached[0]);
    assert!(text(&entries, "item/Rope.html").contains(&src));
    assert!(text(&entries, "item/Old Rope.html").contains(&src));
}

#[test]
fn test_missing_asset_aborts_without_archive() {
    let dir = tempfile::tempdir().unwrap();
    let documents = vec![
        asset_page("Rope", "icons/rope.png"),
        Document::new("Anchor", DocumentKind::folder("Item"), |_| Ok(Node::Empty)),
    ];

    let err = Pipeline::new(options(dir.path()), sources(MockAssetStore::new()))
        .build(&shell(), &documents)
        .unwrap_err();

    match err {
        BuildError::Render(err) => {
            assert_eq!(err.boundaries(), vec!["document Rope (item/Rope.html)"]);
            assert!(matches!(
                err.cause(),
                RenderError::Resource(ResourceError::Source(SourceError::MissingAsset(key)))
                    if key == "icons/rope.png"
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(dir_is_empty(dir.path()));
}

#[test]
fn test_failed_materialization_aborts_without_archive() {
    let dir = tempfile::tempdir().unwrap();
    let documents = vec![Document::new("Map", DocumentKind::folder("Item"), |_| {
        let render = ResourceRef::remote("https://img.test/map.png", "maps/map.png");
        Ok(tags::img(&render, "map").into())
    })];

    let err = Pipeline::new(options(dir.path()), sources(MockAssetStore::new()))
        .build(&shell(), &documents)
        .unwrap_err();

    assert!(matches!(err, BuildError::Dependency { ref path, .. } if path == "rsc/maps/map.png"));
    assert!(dir_is_empty(dir.path()));
}

#[test]
fn test_data_uri_inlines_without_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let assets = MockAssetStore::new().with_asset("icons/rope.png", PNG);
    let build_options = BuildOptions {
        reference_mode: ReferenceMode::DataUri,
        ..options(dir.path())
    };

    let report = Pipeline::new(build_options, sources(assets))
        .build(&shell(), &[asset_page("Rope", "icons/rope.png")])
        .unwrap();

    let entries = read_archive(&report.archive);
    assert!(text(&entries, "item/Rope.html").contains("src='data:image/png;base64,"));
    assert_eq!(report.dependencies, 0);
    assert!(!entries.keys().any(|path| path.starts_with("rsc/cache/")));
}

#[test]
fn test_external_mode_links_remote_resources() {
    let dir = tempfile::tempdir().unwrap();
    let documents = vec![Document::new("Map", DocumentKind::folder("Item"), |_| {
        let render = ResourceRef::remote("https://img.test/map.png", "maps/map.png");
        Ok(tags::img(&render, "map").into())
    })];
    let build_options = BuildOptions {
        reference_mode: ReferenceMode::External,
        ..options(dir.path())
    };

    let report = Pipeline::new(build_options, sources(MockAssetStore::new()))
        .build(&shell(), &documents)
        .unwrap();

    let entries = read_archive(&report.archive);
    assert!(text(&entries, "item/Map.html").contains("src='https://img.test/map.png'"));
    assert_eq!(report.dependencies, 0);
}

#[test]
fn test_archive_layout() {
    let dir = tempfile::tempdir().unwrap();
    let resources = tempfile::tempdir().unwrap();
    std::fs::write(resources.path().join("favicon.ico"), b"ico").unwrap();
    let themes = resources.path().join("themes");
    std::fs::create_dir_all(themes.join("dark")).unwrap();
    std::fs::write(themes.join("light.css"), b"light{}").unwrap();
    std::fs::write(themes.join("dark").join("main.css"), b"dark{}").unwrap();

    let documents = vec![
        Document::new("Rope", DocumentKind::folder("Item"), |_| {
            let module = Module::new(Element::new("span"), Tooltip).child("Rope")?;
            Ok(module.into())
        })
        .with_persistent_name("42")
        .with_css(".rope{}"),
        Document::new("index", DocumentKind::root("Static"), |_| Ok(Node::text("home"))),
    ];
    let build_options = BuildOptions {
        static_files: vec![StaticFile {
            source: resources.path().join("favicon.ico"),
            path: "favicon.ico".to_owned(),
        }],
        theme_dir: Some(themes),
        pre_compressed: vec!["css".to_owned()],
        ..options(dir.path())
    };

    let report = Pipeline::new(build_options, sources(MockAssetStore::new()))
        .build(&shell(), &documents)
        .unwrap();

    let entries = read_archive(&report.archive);
    assert_eq!(
        entries.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "favicon.ico",
            "index.html",
            "item/Rope.html",
            "rsc/searchindex.js",
            "script.js",
            "stylesheet.css",
            "stylesheet.css.gz",
            "themes/dark/main.css",
            "themes/dark/main.css.gz",
            "themes/light.css",
            "themes/light.css.gz",
        ]
    );
    assert_eq!(text(&entries, "stylesheet.css"), "body{}\n\n.rope{}\n\n.tooltip{}\n\n");
    assert_eq!(text(&entries, "script.js"), "tooltips();\n\n");
    assert_eq!(entries["favicon.ico"], b"ico");
    assert!(text(&entries, "item/Rope.html").contains("<span>?Rope</span>"));
    assert!(text(&entries, "index.html").starts_with("<!DOCTYPE html>\n<html lang='en'>"));

    let index = text(&entries, "rsc/searchindex.js");
    assert!(index.starts_with("const searchindex = [{\"index\":\"rope\",\"name\":\"Rope\""));
    assert!(index.ends_with(";\nexport default searchindex;"));

    assert_eq!(
        std::fs::read_to_string(&report.redirects).unwrap(),
        "/item/42 /item/Rope.html;\n"
    );
    assert_eq!(report.archive, dir.path().join("website.zip"));
    assert_eq!(report.entries, entries.len());
}

#[test]
fn test_skip_resources() {
    let dir = tempfile::tempdir().unwrap();
    let assets = MockAssetStore::new().with_asset("icons/rope.png", PNG);
    let build_options = BuildOptions {
        skip_resources: true,
        ..options(dir.path())
    };

    let report = Pipeline::new(build_options, sources(assets))
        .build(&shell(), &[asset_page("Rope", "icons/rope.png")])
        .unwrap();

    let entries = read_archive(&report.archive);
    assert!(entries.contains_key("item/Rope.html"));
    assert!(!entries.keys().any(|path| path.starts_with("rsc/cache/")));
    assert_eq!(report.dependencies, 1);
    assert!(!report.resources_written);
}

#[test]
fn test_builds_are_deterministic() {
    let build = || {
        let dir = tempfile::tempdir().unwrap();
        let documents: Vec<_> = (0..20)
            .map(|i| {
                Document::new(&format!("Page {i}"), DocumentKind::folder("Item"), move |ctx| {
                    let id = ctx.id_for("row");
                    Ok(tags::div().id(&id)?.text(&i.to_string())?.into())
                })
                .with_css(&format!(".page{}{{}}", i % 3))
            })
            .collect();
        let report = Pipeline::new(options(dir.path()), sources(MockAssetStore::new()))
            .build(&shell(), &documents)
            .unwrap();
        read_archive(&report.archive)
    };

    assert_eq!(build(), build());
}

#[test]
fn test_records_from_data_provider() {
    let dir = tempfile::tempdir().unwrap();
    let data: Arc<dyn DataProvider> = Arc::new(
        tome_sources::JsonDataSet::from_json(
            r#"{"tables": {"spell": {"light": {"name": "Light"}}}}"#,
        )
        .unwrap(),
    );
    let documents = vec![Document::new("Light", DocumentKind::folder("Spell"), |ctx| {
        let name = ctx
            .sources()
            .data
            .lookup("spell", "light")
            .and_then(|record| record["name"].as_str())
            .unwrap_or_default()
            .to_owned();
        Ok(tags::h1().text(&name)?.into())
    })];

    let report = Pipeline::new(options(dir.path()), sources_with(MockAssetStore::new(), data))
        .build(&shell(), &documents)
        .unwrap();

    let entries = read_archive(&report.archive);
    assert!(text(&entries, "spell/Light.html").contains("<h1>Light</h1>"));
}
