//! In-Memory Host Backend
//!
//! A reference implementation of the host contract: nodes live in a slotmap,
//! child lists are explicit, and every applied operation is appended to an
//! inspectable log. The engine's end-to-end tests assert against that log,
//! the same way the original environment would be observed through its
//! mutation calls.
//!
//! Removal only unlinks a node from its parent; the node's storage stays
//! alive so that the log can still be rendered after the fact.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use slotmap::SlotMap;

use super::{Event, EventHandler, HostBackend, HostError, HostNodeId};
use crate::element::{PropValue, NODE_VALUE};

/// One applied host mutation, as recorded by [`MemoryHost`].
#[derive(Clone, Debug)]
pub enum HostOp {
    CreateElement { node: HostNodeId, tag: String },
    CreateText { node: HostNodeId, text: String },
    SetProperty { node: HostNodeId, name: String, value: PropValue },
    RemoveProperty { node: HostNodeId, name: String },
    AddListener { node: HostNodeId, event: String },
    RemoveListener { node: HostNodeId, event: String },
    AppendChild { parent: HostNodeId, child: HostNodeId },
    RemoveChild { parent: HostNodeId, child: HostNodeId },
}

enum Node {
    Element {
        tag: String,
        properties: IndexMap<String, PropValue>,
        listeners: IndexMap<String, EventHandler>,
        children: Vec<HostNodeId>,
    },
    Text {
        text: String,
    },
}

/// In-memory host tree with an operation log.
pub struct MemoryHost {
    nodes: SlotMap<HostNodeId, Node>,
    container: HostNodeId,
    log: Vec<HostOp>,
}

impl MemoryHost {
    /// Create a host with a single pre-existing container node. The container
    /// is part of the environment, so its creation is not logged.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let container = nodes.insert(Node::Element {
            tag: "root".to_owned(),
            properties: IndexMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
        });
        Self {
            nodes,
            container,
            log: Vec::new(),
        }
    }

    /// The pre-existing container node renders attach under.
    pub fn container(&self) -> HostNodeId {
        self.container
    }

    /// The operations applied so far, in order.
    pub fn log(&self) -> &[HostOp] {
        &self.log
    }

    /// Drop the recorded operations (the node tree is untouched). Useful for
    /// asserting on one render pass at a time.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Render the log as short human-readable lines, resolving handles to
    /// `<tag>` / `"text"` names. This is what the end-to-end tests compare.
    pub fn describe_log(&self) -> Vec<String> {
        self.log
            .iter()
            .map(|op| match op {
                HostOp::CreateElement { tag, .. } => format!("create <{tag}>"),
                HostOp::CreateText { text, .. } => format!("create text {text:?}"),
                HostOp::SetProperty { node, name, value } => {
                    format!("set {}.{name} = {value}", self.name_of(*node))
                }
                HostOp::RemoveProperty { node, name } => {
                    format!("remove {}.{name}", self.name_of(*node))
                }
                HostOp::AddListener { node, event } => {
                    format!("listen {} {event}", self.name_of(*node))
                }
                HostOp::RemoveListener { node, event } => {
                    format!("unlisten {} {event}", self.name_of(*node))
                }
                HostOp::AppendChild { parent, child } => {
                    format!("append {} -> {}", self.name_of(*child), self.name_of(*parent))
                }
                HostOp::RemoveChild { parent, child } => {
                    format!("remove {} <- {}", self.name_of(*child), self.name_of(*parent))
                }
            })
            .collect()
    }

    /// The tag of an element node.
    pub fn tag_of(&self, node: HostNodeId) -> Option<&str> {
        match self.nodes.get(node)? {
            Node::Element { tag, .. } => Some(tag.as_str()),
            Node::Text { .. } => None,
        }
    }

    /// The content of a text node.
    pub fn text_of(&self, node: HostNodeId) -> Option<&str> {
        match self.nodes.get(node)? {
            Node::Text { text } => Some(text.as_str()),
            Node::Element { .. } => None,
        }
    }

    /// The ordered children of an element node.
    pub fn children(&self, node: HostNodeId) -> Vec<HostNodeId> {
        match self.nodes.get(node) {
            Some(Node::Element { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// A property value on an element node.
    pub fn property(&self, node: HostNodeId, name: &str) -> Option<PropValue> {
        match self.nodes.get(node)? {
            Node::Element { properties, .. } => properties.get(name).cloned(),
            Node::Text { text } if name == NODE_VALUE => Some(PropValue::Str(text.clone())),
            Node::Text { .. } => None,
        }
    }

    /// The registered listener for an event type, if any.
    pub fn listener(&self, node: HostNodeId, event: &str) -> Option<EventHandler> {
        match self.nodes.get(node)? {
            Node::Element { listeners, .. } => listeners.get(event).cloned(),
            Node::Text { .. } => None,
        }
    }

    /// The first attached element node with the given tag, searching
    /// depth-first from the container.
    pub fn find_by_tag(&self, tag: &str) -> Option<HostNodeId> {
        let mut stack = vec![self.container];
        while let Some(id) = stack.pop() {
            if let Some(Node::Element { tag: t, children, .. }) = self.nodes.get(id) {
                if t == tag && id != self.container {
                    return Some(id);
                }
                stack.extend(children.iter().rev().copied());
            }
        }
        None
    }

    /// Dispatch a synthetic event to the node's registered listener. The
    /// handler runs after the host borrow is released, so it is free to call
    /// back into the engine (e.g. through a state setter).
    pub fn dispatch(host: &Rc<RefCell<MemoryHost>>, node: HostNodeId, event: &str) {
        let handler = host.borrow().listener(node, event);
        if let Some(handler) = handler {
            handler(&Event::new(event));
        }
    }

    fn name_of(&self, node: HostNodeId) -> String {
        match self.nodes.get(node) {
            Some(Node::Element { tag, .. }) => format!("<{tag}>"),
            Some(Node::Text { text }) => format!("{text:?}"),
            None => "<gone>".to_owned(),
        }
    }

    fn element_mut(
        &mut self,
        node: HostNodeId,
        what: &'static str,
    ) -> Result<(&mut IndexMap<String, PropValue>, &mut IndexMap<String, EventHandler>, &mut Vec<HostNodeId>), HostError> {
        match self.nodes.get_mut(node) {
            None => Err(HostError::UnknownNode(node)),
            Some(Node::Text { .. }) => Err(HostError::Unsupported(node, what)),
            Some(Node::Element {
                properties,
                listeners,
                children,
                ..
            }) => Ok((properties, listeners, children)),
        }
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBackend for MemoryHost {
    fn create_element(&mut self, tag: &str) -> Result<HostNodeId, HostError> {
        let node = self.nodes.insert(Node::Element {
            tag: tag.to_owned(),
            properties: IndexMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
        });
        self.log.push(HostOp::CreateElement {
            node,
            tag: tag.to_owned(),
        });
        Ok(node)
    }

    fn create_text(&mut self, text: &str) -> Result<HostNodeId, HostError> {
        let node = self.nodes.insert(Node::Text {
            text: text.to_owned(),
        });
        self.log.push(HostOp::CreateText {
            node,
            text: text.to_owned(),
        });
        Ok(node)
    }

    fn set_property(
        &mut self,
        node: HostNodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        match self.nodes.get_mut(node) {
            None => return Err(HostError::UnknownNode(node)),
            Some(Node::Text { text }) => {
                if name != NODE_VALUE {
                    return Err(HostError::Unsupported(node, "properties"));
                }
                *text = value.to_string();
            }
            Some(Node::Element { properties, .. }) => {
                properties.insert(name.to_owned(), value.clone());
            }
        }
        self.log.push(HostOp::SetProperty {
            node,
            name: name.to_owned(),
            value: value.clone(),
        });
        Ok(())
    }

    fn remove_property(&mut self, node: HostNodeId, name: &str) -> Result<(), HostError> {
        let (properties, _, _) = self.element_mut(node, "properties")?;
        properties.shift_remove(name);
        self.log.push(HostOp::RemoveProperty {
            node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: HostNodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError> {
        let (_, listeners, _) = self.element_mut(node, "listeners")?;
        listeners.insert(event.to_owned(), handler);
        self.log.push(HostOp::AddListener {
            node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn remove_listener(&mut self, node: HostNodeId, event: &str) -> Result<(), HostError> {
        let (_, listeners, _) = self.element_mut(node, "listeners")?;
        listeners.shift_remove(event);
        self.log.push(HostOp::RemoveListener {
            node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError> {
        if !self.nodes.contains_key(child) {
            return Err(HostError::UnknownNode(child));
        }
        let (_, _, children) = self.element_mut(parent, "children")?;
        children.push(child);
        self.log.push(HostOp::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError> {
        let (_, _, children) = self.element_mut(parent, "children")?;
        let index = children
            .iter()
            .position(|c| *c == child)
            .ok_or(HostError::NotAChild { parent, child })?;
        children.remove(index);
        self.log.push(HostOp::RemoveChild { parent, child });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_small_tree() {
        let mut host = MemoryHost::new();
        let container = host.container();

        let div = host.create_element("div").unwrap();
        let text = host.create_text("hi").unwrap();
        host.append_child(div, text).unwrap();
        host.append_child(container, div).unwrap();

        assert_eq!(host.tag_of(div), Some("div"));
        assert_eq!(host.text_of(text), Some("hi"));
        assert_eq!(host.children(container), vec![div]);
        assert_eq!(host.children(div), vec![text]);
        assert_eq!(
            host.describe_log(),
            vec![
                "create <div>",
                "create text \"hi\"",
                "append \"hi\" -> <div>",
                "append <div> -> <root>",
            ]
        );
    }

    #[test]
    fn set_and_remove_properties() {
        let mut host = MemoryHost::new();
        let div = host.create_element("div").unwrap();

        host.set_property(div, "id", &PropValue::from("x")).unwrap();
        assert_eq!(host.property(div, "id"), Some(PropValue::from("x")));

        host.remove_property(div, "id").unwrap();
        assert_eq!(host.property(div, "id"), None);
    }

    #[test]
    fn text_nodes_accept_only_node_value() {
        let mut host = MemoryHost::new();
        let text = host.create_text("a").unwrap();

        host.set_property(text, NODE_VALUE, &PropValue::from("b"))
            .unwrap();
        assert_eq!(host.text_of(text), Some("b"));

        assert!(host.set_property(text, "id", &PropValue::from("x")).is_err());
        assert!(host
            .add_listener(text, "click", Rc::new(|_| {}))
            .is_err());
    }

    #[test]
    fn remove_child_requires_linkage() {
        let mut host = MemoryHost::new();
        let a = host.create_element("a").unwrap();
        let b = host.create_element("b").unwrap();

        assert!(matches!(
            host.remove_child(a, b),
            Err(HostError::NotAChild { .. })
        ));

        host.append_child(a, b).unwrap();
        host.remove_child(a, b).unwrap();
        assert!(host.children(a).is_empty());
    }

    #[test]
    fn unknown_nodes_are_rejected() {
        let mut host = MemoryHost::new();
        let a = host.create_element("a").unwrap();
        let ghost = HostNodeId::default();

        assert!(matches!(
            host.append_child(a, ghost),
            Err(HostError::UnknownNode(_))
        ));
        assert!(matches!(
            host.set_property(ghost, "id", &PropValue::from("x")),
            Err(HostError::UnknownNode(_))
        ));
    }

    #[test]
    fn dispatch_reaches_registered_listener() {
        use std::cell::Cell;

        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let button = host.borrow_mut().create_element("button").unwrap();

        let clicks = Rc::new(Cell::new(0));
        let seen = clicks.clone();
        host.borrow_mut()
            .add_listener(button, "click", Rc::new(move |event| {
                assert_eq!(event.name(), "click");
                seen.set(seen.get() + 1);
            }))
            .unwrap();

        MemoryHost::dispatch(&host, button, "click");
        MemoryHost::dispatch(&host, button, "click");
        MemoryHost::dispatch(&host, button, "missing");
        assert_eq!(clicks.get(), 2);
    }
}
