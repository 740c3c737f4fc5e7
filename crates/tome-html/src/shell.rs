//! The page frame every document is rendered into.

use std::sync::Arc;

use crate::context::Context;
use crate::document::{ContentProducer, Document, Layout};
use crate::error::RenderError;
use crate::node::{Element, Node};
use crate::tags;

/// Archive path of the site stylesheet bundle.
pub const STYLESHEET: &str = "stylesheet.css";

/// Archive path of the site script bundle.
pub const SCRIPT: &str = "script.js";

/// Site-wide parts of every page: metadata, shared styles and the regions
/// around the content.
#[derive(Clone)]
pub struct Shell {
    site_name: String,
    abbreviation: String,
    deployment_url: String,
    lang: String,
    favicon: String,
    css: Vec<String>,
    header: Option<ContentProducer>,
    sidebar: Option<ContentProducer>,
    footer: Option<ContentProducer>,
}

impl Shell {
    /// New shell. `deployment_url` is used for absolute link-preview URLs.
    #[must_use]
    pub fn new(site_name: &str, abbreviation: &str, deployment_url: &str) -> Self {
        Self {
            site_name: site_name.to_owned(),
            abbreviation: abbreviation.to_owned(),
            deployment_url: deployment_url.to_owned(),
            lang: "en".to_owned(),
            favicon: "favicon.ico".to_owned(),
            css: Vec::new(),
            header: None,
            sidebar: None,
            footer: None,
        }
    }

    #[must_use]
    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_owned();
        self
    }

    /// Favicon path relative to the output root.
    #[must_use]
    pub fn with_favicon(mut self, favicon: &str) -> Self {
        self.favicon = favicon.to_owned();
        self
    }

    /// Add a stylesheet fragment registered before any document styles.
    #[must_use]
    pub fn with_css(mut self, css: &str) -> Self {
        self.css.push(css.to_owned());
        self
    }

    /// Region rendered above the content of [`Layout::Page`] documents.
    #[must_use]
    pub fn with_header<F>(mut self, header: F) -> Self
    where
        F: Fn(&mut Context) -> Result<Node, RenderError> + Send + Sync + 'static,
    {
        self.header = Some(Arc::new(header));
        self
    }

    /// Region rendered beside the content of [`Layout::Page`] documents.
    #[must_use]
    pub fn with_sidebar<F>(mut self, sidebar: F) -> Self
    where
        F: Fn(&mut Context) -> Result<Node, RenderError> + Send + Sync + 'static,
    {
        self.sidebar = Some(Arc::new(sidebar));
        self
    }

    /// Region rendered below the content of [`Layout::Page`] documents.
    #[must_use]
    pub fn with_footer<F>(mut self, footer: F) -> Self
    where
        F: Fn(&mut Context) -> Result<Node, RenderError> + Send + Sync + 'static,
    {
        self.footer = Some(Arc::new(footer));
        self
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn deployment_url(&self) -> &str {
        &self.deployment_url
    }

    /// Render `document` framed by this shell.
    pub fn render(&self, document: &Document, ctx: &mut Context) -> Result<(), RenderError> {
        for css in &self.css {
            ctx.register_css(css);
        }
        if let Some(css) = document.css() {
            ctx.register_css(css);
        }

        let head = self.head(document, ctx)?;
        let body = match document.layout() {
            Layout::Page => {
                let header = region(self.header.as_ref(), ctx)?;
                let sidebar = region(self.sidebar.as_ref(), ctx)?;
                let content = tags::div()
                    .id(&ctx.try_id("content")?)?
                    .child(document.content(ctx)?)?;
                let footer = region(self.footer.as_ref(), ctx)?;
                Element::new("body")
                    .class("body_grid")?
                    .children([header, sidebar, content.into(), footer])?
            }
            Layout::Frame => Element::new("body").child(document.content(ctx)?)?,
        };

        Node::from(tags::document_root(&self.lang).children([head, body])?).render(ctx)
    }

    fn head(&self, document: &Document, ctx: &mut Context) -> Result<Element, RenderError> {
        let mut head = Element::new("head").children([
            tags::meta_charset("UTF-8"),
            tags::meta("viewport", "width=device-width, initial-scale=1"),
            tags::title(&format!("{} - {}", self.abbreviation, document.name())),
            tags::link("stylesheet", STYLESHEET),
            tags::link("icon", &self.favicon),
            tags::meta_property("og:site_name", &self.site_name),
            tags::meta_property("og:title", document.name()),
        ])?;
        if let Some(description) = document.description() {
            head = head.child(tags::meta_property("og:description", description))?;
        }
        if let Some(icon) = document.icon() {
            let url = icon.absolute_url(ctx, &self.deployment_url)?;
            head = head.child(tags::meta_property("og:image", &url))?;
        }
        Ok(head
            .child(document.head_entries(ctx)?)?
            .child(tags::script_module(SCRIPT))?)
    }
}

fn region(producer: Option<&ContentProducer>, ctx: &mut Context) -> Result<Node, RenderError> {
    match producer {
        Some(produce) => produce(ctx),
        None => Ok(Node::Empty),
    }
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("site_name", &self.site_name)
            .field("abbreviation", &self.abbreviation)
            .field("deployment_url", &self.deployment_url)
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}
