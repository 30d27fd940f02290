//! Commit Phase
//!
//! Once a tree walk completes, the accumulated effects are applied to the
//! host tree in one synchronous pass: first the flattened effect list
//! (placements and updates, children before parents), then the per-pass
//! deletions, so a replaced node's successor is attached before the old node
//! detaches. Host handles materialize here, on first use; nothing exists in
//! or attaches to the host tree before commit.
//!
//! After the mutations, the work-in-progress tree is promoted to current,
//! hook-effect work is collected in registration order, and the arena sweep
//! reclaims the superseded generation. The collected effect jobs run after
//! the engine borrow is released, strictly after every host mutation.

use std::cell::RefCell;
use std::mem::take;
use std::rc::Rc;

use tracing::{debug, trace};

use super::scheduler::{EngineError, EngineInner};
use crate::element::{Props, NODE_VALUE};
use crate::fiber::{Cleanup, EffectCallback, EffectTag, FiberId, FiberKind, Hook};
use crate::host::HostNodeId;

/// Deferred hook-effect work produced by one commit.
pub(crate) enum EffectJob {
    /// An unmount cleanup.
    Cleanup(Cleanup),
    /// A firing effect: run the previous cleanup (if any), then the
    /// callback; a returned cleanup is stored back on the hook record.
    Fire {
        fiber: FiberId,
        index: usize,
        cleanup: Option<Cleanup>,
        callback: EffectCallback,
    },
}

/// Run collected effect jobs. Called with no engine borrow held, so
/// callbacks are free to re-enter the engine through state setters.
pub(crate) fn run_effect_jobs(inner: &Rc<RefCell<EngineInner>>, jobs: Vec<EffectJob>) {
    for job in jobs {
        match job {
            EffectJob::Cleanup(cleanup) => cleanup(),
            EffectJob::Fire {
                fiber,
                index,
                cleanup,
                callback,
            } => {
                if let Some(cleanup) = cleanup {
                    cleanup();
                }
                if let Some(new_cleanup) = callback() {
                    inner.borrow_mut().store_cleanup(fiber, index, new_cleanup);
                }
            }
        }
    }
}

impl EngineInner {
    /// Apply the pending pass to the host tree and promote it to current.
    /// Returns the hook-effect jobs to run once the borrow is released.
    pub(crate) fn commit(&mut self) -> Result<Vec<EffectJob>, EngineError> {
        let Some(root) = self.pending_commit.take() else {
            return Ok(Vec::new());
        };
        let effect_list = take(&mut self.fiber_mut(root).effects);
        let deletions = take(&mut self.deletions);
        debug!(
            effects = effect_list.len(),
            deletions = deletions.len(),
            "commit phase"
        );

        for id in effect_list {
            self.commit_work(id)?;
        }

        let mut jobs = Vec::new();
        for id in deletions {
            self.collect_unmount_cleanups(id, &mut jobs);
            self.commit_deletion(id)?;
        }

        // Promote: work-in-progress becomes the committed tree.
        self.current_root = Some(root);
        self.wip_root = None;

        self.collect_effect_jobs(root, &mut jobs);

        let freed = self.arena.sweep(root);
        trace!(freed, "reclaimed superseded fibers");

        Ok(jobs)
    }

    fn commit_work(&mut self, id: FiberId) -> Result<(), EngineError> {
        match self.fiber(id).effect_tag {
            EffectTag::Placement => {
                // Component fibers own no host handle; their placement is
                // carried entirely by their host-bearing descendants.
                if self.fiber(id).kind.owns_host_node() {
                    let target = self.attach_target(id)?;
                    let node = self.ensure_host_node(id)?;
                    self.host.borrow_mut().append_child(target, node)?;
                }
                Ok(())
            }
            EffectTag::Update => {
                if let Some(node) = self.fiber(id).host_node {
                    let old_props = match self.fiber(id).alternate {
                        Some(alt) => self.fiber(alt).props.clone(),
                        None => Props::new(),
                    };
                    let new_props = self.fiber(id).props.clone();
                    self.update_properties(node, &old_props, &new_props)?;
                }
                Ok(())
            }
            // Deletions ride the per-pass list, not the effect list.
            EffectTag::Deletion | EffectTag::None => Ok(()),
        }
    }

    /// The host node this fiber attaches under: the nearest ancestor that
    /// carries a host handle, created on demand, or the container at the
    /// root.
    fn attach_target(&mut self, id: FiberId) -> Result<HostNodeId, EngineError> {
        let mut cursor = self.fiber(id).parent;
        while let Some(parent) = cursor {
            let fiber = self.fiber(parent);
            if let FiberKind::Root(container) = fiber.kind() {
                return Ok(*container);
            }
            if fiber.kind.owns_host_node() {
                return self.ensure_host_node(parent);
            }
            cursor = fiber.parent;
        }
        unreachable!("fiber detached from its root")
    }

    /// The fiber's host handle, creating it (with initial properties and
    /// listeners) on first use. Only host and text fibers reach this.
    fn ensure_host_node(&mut self, id: FiberId) -> Result<HostNodeId, EngineError> {
        if let Some(node) = self.fiber(id).host_node {
            return Ok(node);
        }
        let kind = self.fiber(id).kind.clone();
        let node = match kind {
            FiberKind::Host(tag) => {
                let node = self.host.borrow_mut().create_element(&tag)?;
                let props = self.fiber(id).props.clone();
                self.update_properties(node, &Props::new(), &props)?;
                node
            }
            FiberKind::Text => {
                let text = self
                    .fiber(id)
                    .props
                    .get(NODE_VALUE)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                self.host.borrow_mut().create_text(&text)?
            }
            FiberKind::Root(_) | FiberKind::Component(_) => {
                unreachable!("only host and text fibers own host nodes")
            }
        };
        self.fiber_mut(id).host_node = Some(node);
        Ok(node)
    }

    /// Diff two prop generations onto a host node: drop stale listeners and
    /// properties, assign changed values, register changed listeners.
    /// Listener props follow the `on` prefix convention; `onclick` registers
    /// for the `click` event type.
    fn update_properties(
        &mut self,
        node: HostNodeId,
        old: &Props,
        new: &Props,
    ) -> Result<(), EngineError> {
        let mut host = self.host.borrow_mut();

        for (name, value) in old.attrs() {
            if !is_event(name) {
                continue;
            }
            if new.get(name).map_or(true, |v| v != value) {
                host.remove_listener(node, &event_name(name))?;
            }
        }

        for (name, _) in old.attrs() {
            if is_event(name) {
                continue;
            }
            if new.get(name).is_none() {
                host.remove_property(node, name)?;
            }
        }

        for (name, value) in new.attrs() {
            if is_event(name) {
                continue;
            }
            if old.get(name) != Some(value) {
                host.set_property(node, name, value)?;
            }
        }

        for (name, value) in new.attrs() {
            if !is_event(name) {
                continue;
            }
            if old.get(name) != Some(value) {
                if let Some(handler) = value.as_handler() {
                    host.add_listener(node, &event_name(name), handler.clone())?;
                }
            }
        }

        Ok(())
    }

    /// Detach the host-bearing fringe of a deleted fiber's subtree from the
    /// nearest host ancestor. A component fiber's deletion never touches the
    /// host tree itself; the walk descends through it to its host-bearing
    /// descendants, and never descends into a removed host subtree.
    fn commit_deletion(&mut self, id: FiberId) -> Result<(), EngineError> {
        let target = self.attach_target(id)?;
        let mut node = id;
        loop {
            let fiber = self.fiber(node);
            if let Some(handle) = fiber.host_node {
                self.host.borrow_mut().remove_child(target, handle)?;
            } else if let Some(child) = fiber.child {
                node = child;
                continue;
            }

            loop {
                if node == id {
                    return Ok(());
                }
                if let Some(sibling) = self.fiber(node).sibling {
                    node = sibling;
                    break;
                }
                match self.fiber(node).parent {
                    Some(parent) => node = parent,
                    None => return Ok(()),
                }
            }
        }
    }

    /// Take every pending effect cleanup in the deleted subtree.
    fn collect_unmount_cleanups(&mut self, id: FiberId, jobs: &mut Vec<EffectJob>) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(fiber) = self.arena.get_mut(node) else {
                continue;
            };
            for hook in fiber.hooks.iter_mut() {
                if let Hook::Effect(effect) = hook {
                    if let Some(cleanup) = effect.cleanup.take() {
                        jobs.push(EffectJob::Cleanup(cleanup));
                    }
                }
            }
            let child = fiber.child;
            let sibling = fiber.sibling;
            // Siblings of the deletion root are not part of its subtree.
            if node != id {
                if let Some(sibling) = sibling {
                    stack.push(sibling);
                }
            }
            if let Some(child) = child {
                stack.push(child);
            }
        }
    }

    /// Walk the committed tree in hook-registration order (depth-first
    /// preorder, the order component bodies executed) and decide, per effect
    /// hook, whether it fires on this commit.
    fn collect_effect_jobs(&mut self, root: FiberId, jobs: &mut Vec<EffectJob>) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let (child, sibling, is_component, alternate) = {
                let fiber = self.fiber(id);
                (
                    fiber.child,
                    fiber.sibling,
                    fiber.kind.is_component(),
                    fiber.alternate,
                )
            };
            // LIFO: push the sibling first so the child is visited first.
            if let Some(sibling) = sibling {
                stack.push(sibling);
            }
            if let Some(child) = child {
                stack.push(child);
            }
            if is_component {
                self.collect_component_effects(id, alternate, jobs);
            }
        }
    }

    fn collect_component_effects(
        &mut self,
        id: FiberId,
        alternate: Option<FiberId>,
        jobs: &mut Vec<EffectJob>,
    ) {
        let hook_count = self.fiber(id).hooks.len();
        for index in 0..hook_count {
            let (callback, new_deps) = match &self.fiber(id).hooks[index] {
                Hook::Effect(effect) => (effect.callback.clone(), effect.deps.clone()),
                Hook::State(_) => continue,
            };

            // Previous-generation record at the same call-order index. Its
            // pending cleanup is taken either way, since the old generation
            // is about to be swept.
            let mut previous = None;
            let mut old_cleanup = None;
            if let Some(alt) = alternate {
                if let Some(fiber) = self.arena.get_mut(alt) {
                    if let Some(Hook::Effect(old)) = fiber.hooks.get_mut(index) {
                        old_cleanup = old.cleanup.take();
                        previous = Some(old.deps.clone());
                    }
                }
            }

            let fire = match (&new_deps, &previous) {
                // First commit that includes this hook lineage.
                (_, None) => true,
                // No snapshot on either side: fire every commit.
                (None, Some(_)) | (Some(_), Some(None)) => true,
                (Some(new), Some(Some(old))) => new != old,
            };

            if fire {
                jobs.push(EffectJob::Fire {
                    fiber: id,
                    index,
                    cleanup: old_cleanup,
                    callback,
                });
            } else if let Some(cleanup) = old_cleanup {
                // Suppressed firing: the pending cleanup carries forward to
                // this generation's record.
                if let Some(Hook::Effect(effect)) = self.fiber_mut(id).hooks.get_mut(index) {
                    effect.cleanup = Some(cleanup);
                }
            }
        }
    }
}

fn is_event(name: &str) -> bool {
    name.starts_with("on")
}

fn event_name(name: &str) -> String {
    name[2..].to_ascii_lowercase()
}
