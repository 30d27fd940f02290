//! Fiber Arena
//!
//! All fibers of all live generations share one slotmap. Links between
//! fibers are keys into it, which keeps both trees (current and
//! work-in-progress) free of ownership cycles and makes stale references
//! harmless: a key whose fiber was reclaimed simply stops resolving.

use slotmap::{SecondaryMap, SlotMap};

use super::node::Fiber;
use super::FiberId;

pub(crate) struct FiberArena {
    fibers: SlotMap<FiberId, Fiber>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self {
            fibers: SlotMap::with_key(),
        }
    }

    pub fn insert(&mut self, fiber: Fiber) -> FiberId {
        self.fibers.insert(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.fibers.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    /// Reclaim every fiber not reachable from `root` via child/sibling
    /// links, and clear survivors' alternate links that pointed into the
    /// reclaimed set. Called after commit, when the superseded generation
    /// (and any abandoned partial pass) is no longer referenced by the
    /// algorithm. Returns the number of fibers freed.
    pub fn sweep(&mut self, root: FiberId) -> usize {
        let mut live: SecondaryMap<FiberId, ()> = SecondaryMap::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if live.insert(id, ()).is_some() {
                continue;
            }
            if let Some(fiber) = self.fibers.get(id) {
                if let Some(child) = fiber.child {
                    stack.push(child);
                }
                if let Some(sibling) = fiber.sibling {
                    stack.push(sibling);
                }
            }
        }

        let before = self.fibers.len();
        self.fibers.retain(|id, _| live.contains_key(id));
        for (_, fiber) in self.fibers.iter_mut() {
            if let Some(alt) = fiber.alternate {
                if !live.contains_key(alt) {
                    fiber.alternate = None;
                }
            }
        }
        before - self.fibers.len()
    }
}
