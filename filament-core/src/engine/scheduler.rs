//! Work Scheduler
//!
//! The cooperative loop at the center of the engine. A render request (or a
//! state update) pushes a fresh work-in-progress root; the loop then pulls
//! one fiber at a time, runs it through beginWork + reconciliation, and
//! consults the deadline between fibers. An exhausted deadline suspends the
//! walk; the partial tree survives untouched until the next slice. When the
//! walk completes, the commit phase applies the accumulated effects in one
//! synchronous pass.
//!
//! # One Pass In Flight
//!
//! Only one logical pass exists at a time. A fresh top-level request always
//! restarts from the last committed root and simply drops the reference to
//! any partial work-in-progress tree; nothing was attached to the host tree
//! yet, so abandonment is invisible to the host. Abandoned fibers linger in
//! the arena until the next post-commit sweep reclaims them.
//!
//! # Single Writer
//!
//! All fiber-tree mutation happens inside this loop. State setters invoked
//! from host event callbacks only enqueue a pending transformation plus a
//! new top-level request; they never touch the tree directly.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::{debug, trace};

use super::budget::{Deadline, Unlimited};
use super::commit::run_effect_jobs;
use super::hooks::RenderCx;
use super::reconcile::reconcile_children;
use crate::element::{ComponentFn, Element, Props};
use crate::fiber::{
    Cleanup, EffectTag, Fiber, FiberArena, FiberId, FiberKind, Hook, StateAction,
};
use crate::host::{HostBackend, HostError, HostNodeId};

/// Errors surfaced by the work loop.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A component body panicked. The pass was abandoned before any commit
    /// mutation ran; the previously committed tree is untouched and still
    /// visible.
    #[error("component panicked during render: {0}")]
    ComponentPanicked(String),

    /// A host primitive failed during commit. The work-in-progress tree was
    /// structurally valid by then, so this indicates an environment fault,
    /// not a reconciler bug; it is propagated, never swallowed.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Outcome of one [`Engine::work`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// No pass in flight and nothing scheduled.
    Idle,
    /// The deadline ran out mid-walk; the partial tree is kept and the next
    /// call resumes where this one stopped.
    Yielded,
    /// The walk finished and the pass committed.
    Committed,
}

pub(crate) enum UnitsOutcome {
    Idle,
    Yielded,
    NeedsCommit,
}

/// The reconciliation engine: owns the fiber arena, the scheduler state, and
/// a handle to the host backend.
pub struct Engine {
    inner: Rc<RefCell<EngineInner>>,
}

pub(crate) struct EngineInner {
    pub(crate) arena: FiberArena,
    pub(crate) host: Rc<RefCell<dyn HostBackend>>,
    pub(crate) container: HostNodeId,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) pending_commit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) self_ref: Weak<RefCell<EngineInner>>,
}

impl Engine {
    /// Create an engine targeting `container`, a pre-existing node owned by
    /// `host`. The engine never creates or removes the container itself.
    pub fn new<H: HostBackend + 'static>(host: Rc<RefCell<H>>, container: HostNodeId) -> Self {
        let host: Rc<RefCell<dyn HostBackend>> = host;
        let inner = Rc::new_cyclic(|weak: &Weak<RefCell<EngineInner>>| {
            RefCell::new(EngineInner {
                arena: FiberArena::new(),
                host,
                container,
                current_root: None,
                wip_root: None,
                next_unit: None,
                pending_commit: None,
                deletions: Vec::new(),
                self_ref: weak.clone(),
            })
        });
        Self { inner }
    }

    /// Schedule a top-level render of `element` under the container. Any
    /// not-yet-committed pass is discarded. No work happens until
    /// [`Engine::work`] is called.
    pub fn render(&self, element: Element) {
        self.inner.borrow_mut().schedule_render(element);
    }

    /// Process units of work until the deadline yields or the pending pass
    /// commits. Commit is synchronous and is not interrupted by the
    /// deadline; the deadline only gates the tree walk.
    pub fn work(&self, deadline: &mut dyn Deadline) -> Result<WorkStatus, EngineError> {
        let outcome = self.inner.borrow_mut().work_units(deadline)?;
        match outcome {
            UnitsOutcome::Idle => Ok(WorkStatus::Idle),
            UnitsOutcome::Yielded => Ok(WorkStatus::Yielded),
            UnitsOutcome::NeedsCommit => {
                let jobs = self.inner.borrow_mut().commit()?;
                // Effect callbacks run outside any engine borrow so they can
                // re-enter through state setters.
                run_effect_jobs(&self.inner, jobs);
                Ok(WorkStatus::Committed)
            }
        }
    }

    /// Drive the loop with an unlimited budget until no work remains,
    /// including passes scheduled by effect callbacks along the way.
    pub fn run_to_completion(&self) -> Result<(), EngineError> {
        let mut budget = Unlimited;
        loop {
            if self.work(&mut budget)? == WorkStatus::Idle {
                return Ok(());
            }
        }
    }

    /// True when no pass is in flight and none is scheduled.
    pub fn is_idle(&self) -> bool {
        let inner = self.inner.borrow();
        inner.next_unit.is_none() && inner.pending_commit.is_none()
    }

    /// Number of live fibers across all generations. Diagnostics only.
    pub fn fiber_count(&self) -> usize {
        self.inner.borrow().arena.len()
    }
}

impl EngineInner {
    /// Resolve a fiber link that is structurally guaranteed to be live.
    pub(crate) fn fiber(&self, id: FiberId) -> &Fiber {
        self.arena.get(id).expect("fiber link outlived its arena entry")
    }

    pub(crate) fn fiber_mut(&mut self, id: FiberId) -> &mut Fiber {
        self.arena
            .get_mut(id)
            .expect("fiber link outlived its arena entry")
    }

    fn schedule_render(&mut self, element: Element) {
        let mut props = Props::new();
        props.children = vec![element];
        self.start_pass(props);
    }

    /// Start a full re-render rooted at the last committed tree. Invoked by
    /// state setters; a no-op before the first commit.
    pub(crate) fn schedule_from_committed(&mut self) {
        let Some(current) = self.current_root else {
            return;
        };
        let props = self.fiber(current).props.clone();
        self.start_pass(props);
    }

    fn start_pass(&mut self, props: Props) {
        let mut root = Fiber::new(FiberKind::Root(self.container), props);
        root.alternate = self.current_root;
        let root_id = self.arena.insert(root);
        // A fresh top-level request supersedes any partial pass outright.
        self.wip_root = Some(root_id);
        self.next_unit = Some(root_id);
        self.pending_commit = None;
        self.deletions.clear();
        debug!(has_alternate = self.current_root.is_some(), "pass scheduled");
    }

    pub(crate) fn work_units(
        &mut self,
        deadline: &mut dyn Deadline,
    ) -> Result<UnitsOutcome, EngineError> {
        if self.next_unit.is_none() && self.pending_commit.is_none() {
            return Ok(UnitsOutcome::Idle);
        }
        while let Some(unit) = self.next_unit {
            match self.perform_unit(unit) {
                Ok(next) => self.next_unit = next,
                Err(err) => {
                    self.abandon_pass();
                    return Err(err);
                }
            }
            if self.next_unit.is_some() && deadline.should_yield() {
                trace!("yielding between units");
                return Ok(UnitsOutcome::Yielded);
            }
        }
        if self.pending_commit.is_some() {
            Ok(UnitsOutcome::NeedsCommit)
        } else {
            Ok(UnitsOutcome::Idle)
        }
    }

    fn abandon_pass(&mut self) {
        self.wip_root = None;
        self.next_unit = None;
        self.pending_commit = None;
        self.deletions.clear();
    }

    /// One unit of work: beginWork on this fiber, then pick the next unit
    /// depth-first. A produced child is next; otherwise complete fibers
    /// upward until a sibling exists or the root finishes.
    fn perform_unit(&mut self, unit: FiberId) -> Result<Option<FiberId>, EngineError> {
        self.begin_work(unit)?;

        if let Some(child) = self.fiber(unit).child {
            return Ok(Some(child));
        }

        let mut node = unit;
        loop {
            self.complete_work(node);
            if let Some(sibling) = self.fiber(node).sibling {
                return Ok(Some(sibling));
            }
            match self.fiber(node).parent {
                Some(parent) => node = parent,
                None => return Ok(None),
            }
        }
    }

    fn begin_work(&mut self, unit: FiberId) -> Result<(), EngineError> {
        let kind = self.fiber(unit).kind.clone();
        match kind {
            FiberKind::Component(func) => self.update_component(unit, func),
            FiberKind::Root(_) | FiberKind::Host(_) | FiberKind::Text => {
                self.update_host(unit);
                Ok(())
            }
        }
    }

    /// Invoke the component body with a fresh hook cursor, then reconcile
    /// the returned element as the single child.
    fn update_component(&mut self, unit: FiberId, func: ComponentFn) -> Result<(), EngineError> {
        let props = self.fiber(unit).props.clone();
        let old_state = match self.fiber(unit).alternate {
            Some(alt) => self
                .fiber(alt)
                .hooks
                .iter()
                .map(|hook| match hook {
                    Hook::State(state) => Some(state.clone()),
                    Hook::Effect(_) => None,
                })
                .collect(),
            None => Vec::new(),
        };

        let mut cx = RenderCx::new(unit, old_state, self.self_ref.clone());
        let result = catch_unwind(AssertUnwindSafe(|| func(&mut cx, &props)));
        match result {
            Ok(element) => {
                self.fiber_mut(unit).hooks = cx.into_hooks();
                let children = [element];
                reconcile_children(&mut self.arena, &mut self.deletions, unit, &children);
                Ok(())
            }
            Err(payload) => Err(EngineError::ComponentPanicked(panic_message(payload))),
        }
    }

    /// Root, host, and text fibers take their children straight from props.
    /// Host handles are not created here; they materialize during commit.
    fn update_host(&mut self, unit: FiberId) {
        let children = self.fiber(unit).props.children.clone();
        reconcile_children(&mut self.arena, &mut self.deletions, unit, &children);
    }

    /// Splice this fiber's accumulated effects, then itself if tagged, onto
    /// its parent's list, keeping children before parents. Root completion
    /// marks the whole tree ready to commit.
    fn complete_work(&mut self, unit: FiberId) {
        match self.fiber(unit).parent {
            Some(parent) => {
                let (effects, tagged) = {
                    let fiber = self.fiber_mut(unit);
                    (
                        std::mem::take(&mut fiber.effects),
                        fiber.effect_tag != EffectTag::None,
                    )
                };
                let parent_fiber = self.fiber_mut(parent);
                parent_fiber.effects.extend(effects);
                if tagged {
                    parent_fiber.effects.push(unit);
                }
            }
            None => {
                trace!("tree walk complete");
                self.pending_commit = Some(unit);
            }
        }
    }

    /// Append a pending transformation to a state hook's queue and schedule
    /// the pass that folds it. If the owning fiber was already reclaimed the
    /// transformation is dropped, but the pass is still scheduled.
    pub(crate) fn enqueue_state_action(
        &mut self,
        fiber: FiberId,
        index: usize,
        action: StateAction,
    ) {
        if let Some(f) = self.arena.get_mut(fiber) {
            if let Some(Hook::State(hook)) = f.hooks.get_mut(index) {
                hook.queue.push(action);
            }
        }
        self.schedule_from_committed();
    }

    /// Store the cleanup returned by a fired effect callback back onto its
    /// hook record.
    pub(crate) fn store_cleanup(&mut self, fiber: FiberId, index: usize, cleanup: Cleanup) {
        if let Some(f) = self.arena.get_mut(fiber) {
            if let Some(Hook::Effect(hook)) = f.hooks.get_mut(index) {
                hook.cleanup = Some(cleanup);
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
