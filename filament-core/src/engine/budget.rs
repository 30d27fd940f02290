//! Work Budget
//!
//! The hosting runtime's idle-callback primitive is abstracted as a deadline
//! checked by the scheduler between units of work, never mid-unit and never
//! during commit. What must survive the abstraction is the suspension
//! contract: yield only between units, resume with the pending tree intact.

use std::time::{Duration, Instant};

/// A per-slice work budget. `should_yield` is polled once after each
/// processed unit of work; returning `true` suspends the walk until the next
/// `work` call.
pub trait Deadline {
    fn should_yield(&mut self) -> bool;
}

/// Wall-clock budget backed by a monotonic deadline.
pub struct TimeSlice {
    deadline: Instant,
}

impl TimeSlice {
    pub fn new(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
        }
    }
}

impl Deadline for TimeSlice {
    fn should_yield(&mut self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Deterministic budget: processes exactly `units` units per slice.
/// Intended for tests and simulations where wall-clock timing is unwelcome.
pub struct UnitBudget {
    remaining: usize,
}

impl UnitBudget {
    pub fn new(units: usize) -> Self {
        Self { remaining: units }
    }
}

impl Deadline for UnitBudget {
    fn should_yield(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Never yields; drives a pass to completion in one call.
pub struct Unlimited;

impl Deadline for Unlimited {
    fn should_yield(&mut self) -> bool {
        false
    }
}
