//! Fiber nodes and hook records.

use std::any::Any;
use std::rc::Rc;

use smallvec::SmallVec;

use super::FiberId;
use crate::element::{ComponentFn, ElementKind, PropValue, Props};
use crate::host::HostNodeId;

/// The pending-mutation classification of a fiber for the current pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectTag {
    /// No host mutation pending.
    #[default]
    None,
    /// New fiber; its host node (if any) must be attached at commit.
    Placement,
    /// Same type as its alternate; props must be diffed at commit.
    Update,
    /// Dropped from the new tree; its host subtree must be detached at commit.
    Deletion,
}

/// What a fiber represents. Closed set: every consumer switches exhaustively.
#[derive(Clone)]
pub enum FiberKind {
    /// The tree root. Carries the container handle as a non-owning reference;
    /// the engine never creates or removes the container itself.
    Root(HostNodeId),
    /// A host node with the given tag name.
    Host(String),
    /// A text leaf; content lives in the `node_value` prop.
    Text,
    /// A component invocation.
    Component(ComponentFn),
}

impl FiberKind {
    pub(crate) fn from_element(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::Host(tag) => FiberKind::Host(tag.clone()),
            ElementKind::Text => FiberKind::Text,
            ElementKind::Component(func) => FiberKind::Component(*func),
        }
    }

    /// Diff-level type equality against a new element. Root fibers never
    /// match an element; they are only ever created directly by the engine.
    pub(crate) fn same_type(&self, element: &ElementKind) -> bool {
        match (self, element) {
            (FiberKind::Host(a), ElementKind::Host(b)) => a == b,
            (FiberKind::Text, ElementKind::Text) => true,
            (FiberKind::Component(a), ElementKind::Component(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => false,
        }
    }

    /// True for kinds that own a host handle (host and text fibers).
    pub fn owns_host_node(&self) -> bool {
        matches!(self, FiberKind::Host(_) | FiberKind::Text)
    }

    pub fn is_component(&self) -> bool {
        matches!(self, FiberKind::Component(_))
    }
}

/// Type-erased state cell held by a state hook.
pub(crate) type DynState = Rc<dyn Any>;

/// A queued state transformation. `Fn`, not `FnOnce`: a pending queue is
/// cloned into the next generation and folded there, while the committed
/// generation keeps its copy in case the pass is abandoned and retried.
pub(crate) type StateAction = Rc<dyn Fn(&DynState) -> DynState>;

/// An effect callback; may hand back a cleanup to run before the next firing
/// or on unmount.
pub(crate) type EffectCallback = Rc<dyn Fn() -> Option<Cleanup>>;

/// A pending effect cleanup, as returned by effect callbacks.
pub type Cleanup = Box<dyn FnOnce()>;

/// State-flavor hook record: the folded value plus transformations enqueued
/// since the last fold.
#[derive(Clone)]
pub(crate) struct StateHook {
    pub value: DynState,
    pub queue: Vec<StateAction>,
}

/// Effect-flavor hook record: the callback and dependency snapshot for this
/// generation, plus the cleanup left behind by the last firing.
pub(crate) struct EffectHook {
    pub callback: EffectCallback,
    pub deps: Option<SmallVec<[PropValue; 4]>>,
    pub cleanup: Option<Cleanup>,
}

/// One hook record, identified by call order within the component body.
pub(crate) enum Hook {
    State(StateHook),
    Effect(EffectHook),
}

/// One unit of reconciliation work and of tree identity across generations.
pub struct Fiber {
    pub(crate) kind: FiberKind,
    pub(crate) props: Props,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    /// Cross-generation link to the counterpart fiber in the other tree.
    pub(crate) alternate: Option<FiberId>,
    /// Owned host handle; present only for host and text fibers.
    pub(crate) host_node: Option<HostNodeId>,
    pub(crate) effect_tag: EffectTag,
    /// Hook records in call order; populated while the component body runs.
    pub(crate) hooks: Vec<Hook>,
    /// Flattened effect list accumulated at completion: this fiber's tagged
    /// descendants in depth-first order, children before parents.
    pub(crate) effects: SmallVec<[FiberId; 8]>,
}

impl Fiber {
    pub(crate) fn new(kind: FiberKind, props: Props) -> Self {
        Self {
            kind,
            props,
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            host_node: None,
            effect_tag: EffectTag::None,
            hooks: Vec::new(),
            effects: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> &FiberKind {
        &self.kind
    }

    pub fn effect_tag(&self) -> EffectTag {
        self.effect_tag
    }
}
