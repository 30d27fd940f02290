//! Fiber Tree
//!
//! Fibers are the persistent counterpart of the ephemeral element tree: one
//! fiber per tree position per generation, linked by parent/child/sibling
//! keys and bridged across generations by the `alternate` key. All fiber
//! storage lives in a single arena, so every link is an index and every
//! traversal is iterative index-chasing: no owned recursion, no cycle
//! bookkeeping, and superseded generations are reclaimed by a reachability
//! sweep after each commit.

mod arena;
mod node;

pub use node::{Cleanup, EffectTag, Fiber, FiberKind};

pub(crate) use arena::FiberArena;
pub(crate) use node::{DynState, EffectCallback, EffectHook, Hook, StateAction, StateHook};

slotmap::new_key_type! {
    /// Arena key identifying one fiber of one generation.
    pub struct FiberId;
}
