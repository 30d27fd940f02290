//! Reconciliation Engine
//!
//! This module implements the incremental, interruptible reconciler: the
//! cooperative work scheduler, the positional child diff, the two-phase
//! reconcile-then-commit protocol, and the hook store that carries component
//! state across generations.
//!
//! # Execution Model
//!
//! A render request or state update schedules a fresh work-in-progress tree
//! rooted at the last committed tree. The scheduler processes one fiber per
//! unit of work, yielding to the caller whenever the supplied [`Deadline`]
//! is exhausted; the partial tree survives across slices. Once the walk
//! completes, the commit phase applies every tagged mutation to the host
//! tree in one synchronous pass and promotes the tree to current. Hook
//! effect callbacks fire strictly after the commit mutations.
//!
//! Reconciliation for a pass always finishes before any commit mutation
//! begins, so an interrupted or abandoned pass is invisible to the host
//! tree.

mod budget;
mod commit;
mod hooks;
mod reconcile;
mod scheduler;

pub use budget::{Deadline, TimeSlice, UnitBudget, Unlimited};
pub use hooks::{cleanup, RenderCx, StateSetter};
pub use scheduler::{Engine, EngineError, WorkStatus};

pub use crate::fiber::Cleanup;
