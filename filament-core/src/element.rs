//! Element Tree
//!
//! Elements are the ephemeral description of the desired tree shape for one
//! render pass. They are cheap records produced by component functions (or by
//! application code at the root), consumed by the reconciler, and discarded.
//! Persistent identity lives in the fiber tree, never here.
//!
//! # Text Elements
//!
//! Text content is not a separate node payload: a text element carries the
//! `Text` kind and stores its content in the `node_value` prop. This keeps
//! text changes on the Update path of the diff (same kind, changed prop)
//! instead of forcing a delete-and-recreate of the host text node.
//!
//! # Prop Values
//!
//! `PropValue` covers the value kinds a host property can take plus event
//! handlers. Handlers compare by reference identity: a closure rebuilt on the
//! next render pass never equals the previous one, so changed listeners are
//! always re-registered during commit.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::engine::RenderCx;
use crate::host::{Event, EventHandler};

/// Prop key under which a text element stores its content.
pub const NODE_VALUE: &str = "node_value";

/// A component function: pure tree description from props, with hook access
/// through the render context.
///
/// Plain function pointers (not closures) so that the diff can compare
/// component identity across generations.
pub type ComponentFn = fn(&mut RenderCx, &Props) -> Element;

/// What an element describes: a host node, a text leaf, or a component
/// invocation.
#[derive(Clone)]
pub enum ElementKind {
    /// A host node with the given tag name.
    Host(String),
    /// A text leaf; content lives in the `node_value` prop.
    Text,
    /// A component invocation.
    Component(ComponentFn),
}

impl ElementKind {
    /// Type equality as the diff sees it: tag names by value, component
    /// functions by identity.
    pub fn same_type(&self, other: &ElementKind) -> bool {
        match (self, other) {
            (ElementKind::Host(a), ElementKind::Host(b)) => a == b,
            (ElementKind::Text, ElementKind::Text) => true,
            (ElementKind::Component(a), ElementKind::Component(b)) => {
                std::ptr::fn_addr_eq(*a, *b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Host(tag) => write!(f, "Host({tag:?})"),
            ElementKind::Text => write!(f, "Text"),
            ElementKind::Component(func) => write!(f, "Component({:p})", *func as *const ()),
        }
    }
}

/// A value assignable to a host property, or an event handler.
#[derive(Clone)]
pub enum PropValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Handler(EventHandler),
}

impl PropValue {
    /// True for the handler variant.
    pub fn is_handler(&self) -> bool {
        matches!(self, PropValue::Handler(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            // Identity, not structure: rebuilt closures never compare equal.
            (PropValue::Handler(a), PropValue::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => write!(f, "Str({s:?})"),
            PropValue::Int(n) => write!(f, "Int({n})"),
            PropValue::Float(x) => write!(f, "Float({x})"),
            PropValue::Bool(b) => write!(f, "Bool({b})"),
            PropValue::Handler(_) => write!(f, "Handler(..)"),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => write!(f, "{s}"),
            PropValue::Int(n) => write!(f, "{n}"),
            PropValue::Float(x) => write!(f, "{x}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Handler(_) => write!(f, "[handler]"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s)
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Int(n)
    }
}

impl From<i32> for PropValue {
    fn from(n: i32) -> Self {
        PropValue::Int(n.into())
    }
}

impl From<f64> for PropValue {
    fn from(x: f64) -> Self {
        PropValue::Float(x)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl From<EventHandler> for PropValue {
    fn from(h: EventHandler) -> Self {
        PropValue::Handler(h)
    }
}

/// The props of one element: an ordered attribute map plus the ordered child
/// list.
///
/// Attribute order is preserved (insertion order) so that property diffs emit
/// host operations in a deterministic order.
#[derive(Clone, Debug, Default)]
pub struct Props {
    pub(crate) attrs: IndexMap<String, PropValue>,
    pub(crate) children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attrs.get(name)
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Iterate attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Convenience accessor for integer attributes.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropValue::as_int)
    }

    /// Convenience accessor for string attributes.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    /// Convenience accessor for boolean attributes.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropValue::as_bool)
    }
}

/// One node of the desired-tree description for a single render pass.
#[derive(Clone, Debug)]
pub struct Element {
    kind: ElementKind,
    props: Props,
}

impl Element {
    /// A host element with the given tag name.
    pub fn host(tag: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Host(tag.into()),
            props: Props::new(),
        }
    }

    /// A text leaf.
    pub fn text(content: impl fmt::Display) -> Self {
        let mut props = Props::new();
        props.set(NODE_VALUE, content.to_string());
        Self {
            kind: ElementKind::Text,
            props,
        }
    }

    /// A component invocation.
    pub fn component(func: ComponentFn) -> Self {
        Self {
            kind: ElementKind::Component(func),
            props: Props::new(),
        }
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Set an attribute (builder style).
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.set(name, value);
        self
    }

    /// Register an event handler under the `on`-prefix convention
    /// (`on("click", ..)` stores the `onclick` prop).
    pub fn on(mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        let handler: EventHandler = Rc::new(handler);
        self.props.set(format!("on{event}"), handler);
        self
    }

    /// Append a child element.
    pub fn child(mut self, child: Element) -> Self {
        self.props.children.push(child);
        self
    }

    /// Append a child element if present; `None` children are skipped, the
    /// remaining children shift positionally.
    pub fn maybe_child(mut self, child: Option<Element>) -> Self {
        if let Some(child) = child {
            self.props.children.push(child);
        }
        self
    }

    /// Append a sequence of children.
    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.props.children.extend(children);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_element_stores_content_as_prop() {
        let el = Element::text("hello");
        assert!(matches!(el.kind(), ElementKind::Text));
        assert_eq!(el.props().str(NODE_VALUE), Some("hello"));
        assert!(el.props().children().is_empty());
    }

    #[test]
    fn builder_sets_attrs_and_children() {
        let el = Element::host("div")
            .attr("id", "container")
            .attr("count", 3i64)
            .child(Element::text("a"))
            .child(Element::host("span"));

        assert_eq!(el.props().str("id"), Some("container"));
        assert_eq!(el.props().int("count"), Some(3));
        assert_eq!(el.props().children().len(), 2);
    }

    #[test]
    fn maybe_child_skips_none() {
        let el = Element::host("ul")
            .maybe_child(Some(Element::host("li")))
            .maybe_child(None)
            .maybe_child(Some(Element::host("li")));
        assert_eq!(el.props().children().len(), 2);
    }

    #[test]
    fn host_types_compare_by_tag() {
        assert!(ElementKind::Host("div".into()).same_type(&ElementKind::Host("div".into())));
        assert!(!ElementKind::Host("div".into()).same_type(&ElementKind::Host("span".into())));
        assert!(!ElementKind::Host("div".into()).same_type(&ElementKind::Text));
        assert!(ElementKind::Text.same_type(&ElementKind::Text));
    }

    #[test]
    fn component_types_compare_by_identity() {
        fn a(_: &mut RenderCx, _: &Props) -> Element {
            Element::text("a")
        }
        fn b(_: &mut RenderCx, _: &Props) -> Element {
            Element::text("b")
        }

        assert!(ElementKind::Component(a).same_type(&ElementKind::Component(a)));
        assert!(!ElementKind::Component(a).same_type(&ElementKind::Component(b)));
    }

    #[test]
    fn handlers_compare_by_identity() {
        let h: EventHandler = Rc::new(|_| {});
        let same = PropValue::Handler(h.clone());
        let other = PropValue::Handler(Rc::new(|_| {}));

        assert_eq!(PropValue::Handler(h.clone()), same);
        assert_ne!(PropValue::Handler(h), other);
    }

    #[test]
    fn values_compare_by_value() {
        assert_eq!(PropValue::from("x"), PropValue::from("x"));
        assert_ne!(PropValue::from("x"), PropValue::from("y"));
        assert_eq!(PropValue::from(1i64), PropValue::from(1i64));
        assert_ne!(PropValue::from(1i64), PropValue::from(true));
    }
}
