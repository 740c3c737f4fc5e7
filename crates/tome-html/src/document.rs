//! Documents: one output file each.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::RenderError;
use crate::escape::escape_file_name;
use crate::node::Node;
use crate::resource::ResourceRef;
use crate::shell::Shell;

/// Builds a node tree inside a render session.
pub type ContentProducer = Arc<dyn Fn(&mut Context) -> Result<Node, RenderError> + Send + Sync>;

/// Category of a document; decides the output folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKind {
    name: String,
    folder: Option<String>,
}

impl DocumentKind {
    /// Kind stored in a folder named after the lower-cased kind name.
    #[must_use]
    pub fn folder(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            folder: Some(escape_file_name(&name.to_lowercase())),
        }
    }

    /// Kind stored at the output root.
    #[must_use]
    pub fn root(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            folder: None,
        }
    }

    /// Kind name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output folder, `None` for root documents.
    pub fn folder_name(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    /// Number of folders between the output root and documents of this kind.
    pub fn depth(&self) -> usize {
        usize::from(self.folder.is_some())
    }
}

/// Frame around a document's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Full page with header and footer.
    #[default]
    Page,
    /// Content only, for embedding in an iframe.
    Frame,
}

/// A unit of output: produces one archive entry.
#[derive(Clone)]
pub struct Document {
    name: String,
    kind: DocumentKind,
    filename: String,
    description: Option<String>,
    icon: Option<ResourceRef>,
    persistent_name: Option<String>,
    layout: Layout,
    css: Option<String>,
    head: Option<ContentProducer>,
    content: ContentProducer,
}

impl Document {
    /// New document named `name`; the file name is the escaped name plus
    /// `.html`.
    pub fn new<F>(name: &str, kind: DocumentKind, content: F) -> Self
    where
        F: Fn(&mut Context) -> Result<Node, RenderError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_owned(),
            kind,
            filename: format!("{}.html", escape_file_name(name)),
            description: None,
            icon: None,
            persistent_name: None,
            layout: Layout::default(),
            css: None,
            head: None,
            content: Arc::new(content),
        }
    }

    /// Override the output file name.
    #[must_use]
    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = filename.to_owned();
        self
    }

    /// Short description, used for link previews.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Icon, used for link previews and the search index.
    #[must_use]
    pub fn with_icon(mut self, icon: ResourceRef) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Stable name that keeps redirecting to this document when its display
    /// name changes.
    #[must_use]
    pub fn with_persistent_name(mut self, persistent_name: &str) -> Self {
        self.persistent_name = Some(persistent_name.to_owned());
        self
    }

    /// Choose the page frame.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Stylesheet text specific to this document, bundled after the shell's.
    #[must_use]
    pub fn with_css(mut self, css: &str) -> Self {
        self.css = Some(css.to_owned());
        self
    }

    /// Extra `<head>` entries.
    #[must_use]
    pub fn with_head<F>(mut self, head: F) -> Self
    where
        F: Fn(&mut Context) -> Result<Node, RenderError> + Send + Sync + 'static,
    {
        self.head = Some(Arc::new(head));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DocumentKind {
        &self.kind
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn icon(&self) -> Option<&ResourceRef> {
        self.icon.as_ref()
    }

    pub fn persistent_name(&self) -> Option<&str> {
        self.persistent_name.as_deref()
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn css(&self) -> Option<&str> {
        self.css.as_deref()
    }

    /// Archive path, relative to the root.
    pub fn path(&self) -> String {
        match self.kind.folder_name() {
            Some(folder) => format!("{folder}/{}", self.filename),
            None => self.filename.clone(),
        }
    }

    /// Folder depth of [`Document::path`].
    pub fn folder_depth(&self) -> usize {
        self.kind.depth()
    }

    /// Build the content tree.
    pub fn content(&self, ctx: &mut Context) -> Result<Node, RenderError> {
        (self.content)(ctx)
    }

    /// Build the extra head entries.
    pub fn head_entries(&self, ctx: &mut Context) -> Result<Node, RenderError> {
        match &self.head {
            Some(head) => head(ctx),
            None => Ok(Node::Empty),
        }
    }

    /// Render the whole document inside `shell`.
    ///
    /// Any error is wrapped with this document's identity.
    pub fn render(&self, shell: &Shell, ctx: &mut Context) -> Result<(), RenderError> {
        shell
            .render(self, ctx)
            .map_err(|e| e.within(format!("document {} ({})", self.name, self.path())))
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("filename", &self.filename)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::node::Element;
    use crate::testing::context;

    fn empty(_: &mut Context) -> Result<Node, RenderError> {
        Ok(Node::Empty)
    }

    #[test]
    fn test_folder_kind_path() {
        let doc = Document::new("Fire/Ice: 2?", DocumentKind::folder("Spell"), empty);

        assert_eq!(doc.path(), "spell/Fire-Ice 2.html");
        assert_eq!(doc.folder_depth(), 1);
    }

    #[test]
    fn test_root_kind_path() {
        let doc = Document::new("index", DocumentKind::root("Static"), empty);

        assert_eq!(doc.path(), "index.html");
        assert_eq!(doc.folder_depth(), 0);
    }

    #[test]
    fn test_custom_filename() {
        let doc = Document::new("Search", DocumentKind::root("Static"), empty)
            .with_filename("search.html");

        assert_eq!(doc.path(), "search.html");
    }

    #[test]
    fn test_content_and_head_producers() {
        let doc = Document::new("Rope", DocumentKind::folder("Item"), |ctx| {
            Ok(Element::new("p").text(&ctx.path_to("index.html"))?.into())
        })
        .with_head(|_| Ok(Node::raw("<meta name='robots' content='noindex'>")));
        let mut ctx = context().with_folder_depth(doc.folder_depth());

        let body = doc.content(&mut ctx).unwrap();
        let head = doc.head_entries(&mut ctx).unwrap();
        body.render(&mut ctx).unwrap();
        head.render(&mut ctx).unwrap();

        assert_eq!(
            ctx.close().unwrap().output.unwrap(),
            "<p>../index.html</p><meta name='robots' content='noindex'>"
        );
    }
}
