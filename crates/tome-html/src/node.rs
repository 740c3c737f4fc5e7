//! The document tree.
//!
//! Trees are built eagerly and rendered later through a [`Context`].
//! Values that can only be known at render time (relative paths, ids) are
//! attribute [`AttrValue::Resolver`]s evaluated against the context.

use std::fmt;

use crate::context::Context;
use crate::error::{RenderError, StructuralError};
use crate::escape::{escape_attr, escape_text};

/// Elements that never have content or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

type ResolverFn = dyn Fn(&mut Context) -> Result<String, RenderError>;

/// Value of an element attribute.
pub enum AttrValue {
    /// Fixed text, escaped at render time.
    Literal(String),
    /// Computed from the render context, then escaped.
    Resolver(Box<ResolverFn>),
    /// Attribute name only, without a value.
    Bare,
}

impl AttrValue {
    /// Wrap a closure as a resolver.
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> Result<String, RenderError> + 'static,
    {
        Self::Resolver(Box::new(f))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Resolver(_) => f.write_str("Resolver"),
            Self::Bare => f.write_str("Bare"),
        }
    }
}

/// A node of the document tree.
#[derive(Debug)]
pub enum Node {
    /// A markup element.
    Element(Element),
    /// Text, escaped on output.
    Text(String),
    /// Preformatted markup, written verbatim.
    Raw(String),
    /// Several nodes in order.
    Sequence(Vec<Node>),
    /// One node rendered several times.
    Repeat(usize, Box<Node>),
    /// Nothing.
    Empty,
    /// An element whose leading content comes from a [`Component`].
    Module(Module),
}

impl Node {
    /// Escaped text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Verbatim markup. The caller is responsible for its validity.
    pub fn raw(markup: impl Into<String>) -> Self {
        Self::Raw(markup.into())
    }

    /// Nodes in order, with [`Node::Empty`] items dropped.
    pub fn sequence(nodes: impl IntoIterator<Item = Node>) -> Self {
        let nodes: Vec<_> = nodes.into_iter().filter(|n| !n.is_empty()).collect();
        if nodes.is_empty() {
            Self::Empty
        } else {
            Self::Sequence(nodes)
        }
    }

    /// `node` repeated `count` times.
    pub fn repeat(count: usize, node: Node) -> Self {
        if count == 0 || node.is_empty() {
            Self::Empty
        } else {
            Self::Repeat(count, Box::new(node))
        }
    }

    /// Whether this is [`Node::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Render the tree in pre-order into `ctx`.
    pub fn render(&self, ctx: &mut Context) -> Result<(), RenderError> {
        match self {
            Self::Element(element) => element.render(ctx),
            Self::Text(text) => ctx.write(&escape_text(text)),
            Self::Raw(markup) => ctx.write(markup),
            Self::Sequence(nodes) => nodes.iter().try_for_each(|node| node.render(ctx)),
            Self::Repeat(count, node) => (0..*count).try_for_each(|_| node.render(ctx)),
            Self::Empty => Ok(()),
            Self::Module(module) => module.render(ctx),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Module> for Node {
    fn from(module: Module) -> Self {
        Self::Module(module)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

/// A markup element under construction.
///
/// Builder methods consume the element and fail with a [`StructuralError`]
/// on misuse. On output `class` comes first, then the other attributes in
/// assignment order.
#[derive(Debug)]
pub struct Element {
    tag: String,
    void: bool,
    preamble: Option<&'static str>,
    class: Option<String>,
    attributes: Vec<(String, AttrValue)>,
    children: Vec<Node>,
}

impl Element {
    /// New element. Void-ness is derived from the tag name.
    pub fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let void = VOID_TAGS.contains(&tag.as_str());
        Self {
            tag,
            void,
            preamble: None,
            class: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Text written immediately before the opening tag, such as a doctype.
    #[must_use]
    pub(crate) fn with_preamble(mut self, preamble: &'static str) -> Self {
        self.preamble = Some(preamble);
        self
    }

    /// Set an attribute on a freshly built element whose attribute names are
    /// known to be distinct.
    #[must_use]
    pub(crate) fn preset(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.to_owned(), value.into()));
        self
    }

    /// Append a child to a freshly built, non-void element.
    #[must_use]
    pub(crate) fn preset_child(mut self, node: impl Into<Node>) -> Self {
        debug_assert!(!self.void, "<{}> is void", self.tag);
        self.children.push(node.into());
        self
    }

    /// Tag name, lower case.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether this element may not have content.
    pub fn is_void(&self) -> bool {
        self.void
    }

    /// Assign an attribute. Names are lower-cased; `class` and repeated
    /// names are rejected.
    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Result<Self, StructuralError> {
        let name = name.to_ascii_lowercase();
        if name == "class" {
            return Err(StructuralError::ClassAttribute);
        }
        if self.attributes.iter().any(|(existing, _)| *existing == name) {
            return Err(StructuralError::DuplicateAttribute(name));
        }
        self.attributes.push((name, value.into()));
        Ok(self)
    }

    /// Assign an attribute computed at render time.
    pub fn attr_with<F>(self, name: &str, resolve: F) -> Result<Self, StructuralError>
    where
        F: Fn(&mut Context) -> Result<String, RenderError> + 'static,
    {
        self.attr(name, AttrValue::resolver(resolve))
    }

    /// Assign a value-less attribute.
    pub fn bare_attr(self, name: &str) -> Result<Self, StructuralError> {
        self.attr(name, AttrValue::Bare)
    }

    /// Set the class slot. It can be set once.
    pub fn class(mut self, class: &str) -> Result<Self, StructuralError> {
        if let Some(existing) = self.class {
            return Err(StructuralError::DuplicateClass(existing));
        }
        self.class = Some(class.to_owned());
        Ok(self)
    }

    /// Assign the `id` attribute.
    pub fn id(self, id: &str) -> Result<Self, StructuralError> {
        self.attr("id", id)
    }

    /// Append a child. [`Node::Empty`] is dropped.
    pub fn child(mut self, node: impl Into<Node>) -> Result<Self, StructuralError> {
        let node = node.into();
        if node.is_empty() {
            return Ok(self);
        }
        if self.void {
            return Err(StructuralError::VoidContent(self.tag));
        }
        self.children.push(node);
        Ok(self)
    }

    /// Append several children in order.
    pub fn children<I>(self, nodes: I) -> Result<Self, StructuralError>
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        nodes.into_iter().try_fold(self, |element, node| element.child(node))
    }

    /// Append escaped text.
    pub fn text(self, text: &str) -> Result<Self, StructuralError> {
        self.child(Node::text(text))
    }

    /// Render this element.
    pub fn render(&self, ctx: &mut Context) -> Result<(), RenderError> {
        self.render_with(ctx, &[])
    }

    /// Render this element with `leading` nodes placed before its own
    /// children.
    fn render_with(&self, ctx: &mut Context, leading: &[Node]) -> Result<(), RenderError> {
        if self.void && leading.iter().any(|n| !n.is_empty()) {
            return Err(StructuralError::VoidContent(self.tag.clone()).into());
        }

        if let Some(preamble) = self.preamble {
            ctx.write(preamble)?;
        }
        ctx.write("<")?;
        ctx.write(&self.tag)?;
        if let Some(class) = &self.class {
            ctx.write(" class='")?;
            ctx.write(&escape_attr(class))?;
            ctx.write("'")?;
        }
        for (name, value) in &self.attributes {
            ctx.write(" ")?;
            ctx.write(name)?;
            let value = match value {
                AttrValue::Literal(text) => escape_attr(text),
                AttrValue::Resolver(resolve) => escape_attr(&resolve(ctx)?),
                AttrValue::Bare => continue,
            };
            ctx.write("='")?;
            ctx.write(&value)?;
            ctx.write("'")?;
        }
        ctx.write(">")?;

        if self.void {
            return Ok(());
        }
        for node in leading.iter().chain(&self.children) {
            node.render(ctx)?;
        }
        ctx.write("</")?;
        ctx.write(&self.tag)?;
        ctx.write(">")
    }
}

/// Reusable widget: an element with content of its own, plus the styles and
/// script the widget needs.
pub trait Component {
    /// Name used when reporting errors raised inside the component.
    fn name(&self) -> &str;

    /// The component's own content, placed before anything the caller
    /// appended.
    fn content(&self, ctx: &mut Context) -> Result<Vec<Node>, RenderError>;

    /// Stylesheet text for the site bundle.
    fn css(&self) -> &str {
        ""
    }

    /// Script text for the site bundle.
    fn script(&self) -> Option<&str> {
        None
    }
}

/// A [`Component`] bound to its wrapping element.
///
/// Rendering is two steps: compute the component's own content, then render
/// the element with that content ahead of the caller's children. The
/// component's styles and script are registered once it has rendered.
pub struct Module {
    element: Element,
    component: Box<dyn Component>,
}

impl Module {
    /// Bind `component` to `element`.
    pub fn new(element: Element, component: impl Component + 'static) -> Self {
        Self {
            element,
            component: Box::new(component),
        }
    }

    /// Append a caller child after the component's own content.
    pub fn child(mut self, node: impl Into<Node>) -> Result<Self, StructuralError> {
        self.element = self.element.child(node)?;
        Ok(self)
    }

    /// Append several caller children.
    pub fn children<I>(mut self, nodes: I) -> Result<Self, StructuralError>
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.element = self.element.children(nodes)?;
        Ok(self)
    }

    /// Render the module.
    pub fn render(&self, ctx: &mut Context) -> Result<(), RenderError> {
        self.component
            .content(ctx)
            .and_then(|own| self.element.render_with(ctx, &own))
            .map_err(|e| e.within(format!("module {}", self.component.name())))?;

        let css = self.component.css();
        if !css.is_empty() {
            ctx.register_css(css);
        }
        if let Some(script) = self.component.script() {
            ctx.register_script(script);
        }
        Ok(())
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("component", &self.component.name())
            .field("element", &self.element)
            .finish()
    }
}
