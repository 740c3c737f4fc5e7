//! Constructors for common elements.
//!
//! Plain tags return a fresh [`Element`]; helpers that need attributes or
//! content set them up front, so none of them can fail.

use crate::document::Document;
use crate::node::{AttrValue, Element, Node};
use crate::resource::ResourceRef;

/// Doctype written before the root element.
const DOCTYPE: &str = "<!DOCTYPE html>\n";

pub fn div() -> Element {
    Element::new("div")
}

pub fn span() -> Element {
    Element::new("span")
}

pub fn p() -> Element {
    Element::new("p")
}

pub fn b() -> Element {
    Element::new("b")
}

pub fn h1() -> Element {
    Element::new("h1")
}

pub fn h2() -> Element {
    Element::new("h2")
}

pub fn table() -> Element {
    Element::new("table")
}

pub fn tr() -> Element {
    Element::new("tr")
}

pub fn td() -> Element {
    Element::new("td")
}

pub fn th() -> Element {
    Element::new("th")
}

pub fn ul() -> Element {
    Element::new("ul")
}

pub fn li() -> Element {
    Element::new("li")
}

pub fn br() -> Element {
    Element::new("br")
}

/// `<html lang=…>`, preceded by the HTML5 doctype on output.
pub fn document_root(lang: &str) -> Element {
    Element::new("html")
        .with_preamble(DOCTYPE)
        .preset("lang", lang)
}

/// `<title>` with escaped text.
pub fn title(text: &str) -> Element {
    Element::new("title").preset_child(Node::text(text))
}

/// `<a href=…>`.
pub fn a(href: impl Into<AttrValue>) -> Element {
    Element::new("a").preset("href", href)
}

/// Link to another document, relative to the document being rendered.
/// Shows the document's name unless `text` is given.
pub fn page_link(document: &Document, text: Option<&str>) -> Element {
    let path = document.path();
    let label = text.unwrap_or(document.name());
    a(AttrValue::resolver(move |ctx| Ok(ctx.path_to(&path)))).preset_child(Node::text(label))
}

/// `<img>` pointing at `src`.
pub fn img(src: &ResourceRef, alt: &str) -> Element {
    Element::new("img").preset("src", src.attr()).preset("alt", alt)
}

/// `<meta charset=…>`.
pub fn meta_charset(charset: &str) -> Element {
    Element::new("meta").preset("charset", charset)
}

/// `<meta name=… content=…>`.
pub fn meta(name: &str, content: &str) -> Element {
    Element::new("meta")
        .preset("name", name)
        .preset("content", content)
}

/// `<meta property=… content=…>`, as used by OpenGraph.
pub fn meta_property(property: &str, content: &str) -> Element {
    Element::new("meta")
        .preset("property", property)
        .preset("content", content)
}

/// `<link rel=… href=…>` where `target` is relative to the output root.
pub fn link(rel: &str, target: &str) -> Element {
    Element::new("link")
        .preset("rel", rel)
        .preset("href", root_relative(target))
}

/// `<script type='module' src=…>` where `target` is relative to the output
/// root.
pub fn script_module(target: &str) -> Element {
    Element::new("script")
        .preset("type", "module")
        .preset("src", root_relative(target))
}

/// `<script>` with inline code, written verbatim.
pub fn script_inline(code: &str) -> Element {
    Element::new("script").preset_child(Node::raw(code))
}

/// Attribute value resolving `target` against the document being rendered.
fn root_relative(target: &str) -> AttrValue {
    let target = target.to_owned();
    AttrValue::resolver(move |ctx| Ok(ctx.path_to(&target)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::DocumentKind;
    use crate::testing::{context, render};

    #[test]
    fn test_document_root_emits_doctype() {
        let root = document_root("en").child(Element::new("body")).unwrap();

        assert_eq!(
            render(&root.into()),
            "<!DOCTYPE html>\n<html lang='en'><body></body></html>"
        );
    }

    #[test]
    fn test_page_link_is_relative() {
        let target = Document::new("Rope", DocumentKind::folder("Item"), |_| Ok(Node::Empty));
        let node: Node = page_link(&target, None).into();
        let mut ctx = context().with_folder_depth(1);

        node.render(&mut ctx).unwrap();

        assert_eq!(
            ctx.close().unwrap().output.unwrap(),
            "<a href='../item/Rope.html'>Rope</a>"
        );
    }

    #[test]
    fn test_page_link_custom_text() {
        let target = Document::new("Rope", DocumentKind::root("Static"), |_| Ok(Node::Empty));

        assert_eq!(
            render(&page_link(&target, Some("<more>")).into()),
            "<a href='Rope.html'>&lt;more&gt;</a>"
        );
    }

    #[test]
    fn test_head_helpers() {
        let head = Element::new("head")
            .children([
                meta_charset("UTF-8"),
                title("A & B"),
                link("stylesheet", "stylesheet.css"),
                script_module("script.js"),
            ])
            .unwrap();

        assert_eq!(
            render(&head.into()),
            "<head><meta charset='UTF-8'><title>A &amp; B</title>\
             <link rel='stylesheet' href='stylesheet.css'>\
             <script type='module' src='script.js'></script></head>"
        );
    }

    #[test]
    fn test_helpers_still_validate_later_calls() {
        assert!(br().text("x").is_err());
        assert!(a("x").attr("href", "y").is_err());
    }
}
