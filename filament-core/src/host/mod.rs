//! Host Tree Contract
//!
//! The reconciler never mutates a display tree directly; it speaks to a host
//! backend through the small set of primitives defined here. The backend owns
//! node storage and hands out opaque `HostNodeId` handles; the engine only
//! ever stores and passes these handles around.
//!
//! All primitives are fallible. The engine calls them exclusively during the
//! commit phase, where a failure means the environment (not the reconciler)
//! is at fault, and the error propagates to the caller of the work loop.
//!
//! `memory::MemoryHost` is the reference backend: an in-memory node tree that
//! records every applied operation, used by the test suite and usable as a
//! template for real backends.

pub mod memory;

pub use memory::{HostOp, MemoryHost};

use std::rc::Rc;

use thiserror::Error;

use crate::element::PropValue;

slotmap::new_key_type! {
    /// Opaque handle to a node owned by a host backend.
    pub struct HostNodeId;
}

/// A host event delivered to registered listeners.
#[derive(Clone, Debug)]
pub struct Event {
    name: String,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The event type this event was dispatched as, e.g. `click`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shared event listener callback.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// Errors produced by host backends.
///
/// The reconciler never constructs these; it only propagates them.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown host node {0:?}")]
    UnknownNode(HostNodeId),

    #[error("host node {0:?} does not accept {1}")]
    Unsupported(HostNodeId, &'static str),

    #[error("host node {child:?} is not a child of {parent:?}")]
    NotAChild {
        parent: HostNodeId,
        child: HostNodeId,
    },
}

/// The mutation primitives a hosting environment must provide.
///
/// Contract: operations are applied in call order; `create_*` returns a
/// handle valid for the lifetime of the backend; `append_child`/`remove_child`
/// maintain an explicit, ordered child list per element node.
pub trait HostBackend {
    /// Create a detached host node for the given tag.
    fn create_element(&mut self, tag: &str) -> Result<HostNodeId, HostError>;

    /// Create a detached text node with the given content.
    fn create_text(&mut self, text: &str) -> Result<HostNodeId, HostError>;

    /// Set a named property on a node.
    fn set_property(&mut self, node: HostNodeId, name: &str, value: &PropValue)
        -> Result<(), HostError>;

    /// Remove a named property from a node.
    fn remove_property(&mut self, node: HostNodeId, name: &str) -> Result<(), HostError>;

    /// Register a listener for the given event type, replacing any previous
    /// listener for that type.
    fn add_listener(
        &mut self,
        node: HostNodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError>;

    /// Remove the listener for the given event type.
    fn remove_listener(&mut self, node: HostNodeId, event: &str) -> Result<(), HostError>;

    /// Append `child` to the end of `parent`'s child list.
    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError>;

    /// Detach `child` from `parent`.
    fn remove_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError>;
}
