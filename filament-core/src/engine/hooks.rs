//! Hook Store
//!
//! Hooks give leaf computations persistent state across recomputations. A
//! hook is identified purely by call order within one component invocation:
//! the first `use_state` call is hook 0, the next hook call is hook 1, and
//! so on. Continuity across generations works by reading the alternate
//! fiber's record at the same index, which is why hook call order must be
//! identical on every render of a component. That is a caller obligation;
//! this module does not (and cannot cheaply) enforce it.
//!
//! # The Render Context
//!
//! The "currently executing fiber" and its hook cursor are not ambient
//! globals; they live in an explicit [`RenderCx`] handed to the component
//! body. The context collects this generation's hook records and is drained
//! back into the fiber when the body returns.
//!
//! # State Updates
//!
//! A [`StateSetter`] never touches the fiber tree. It appends a pending
//! transformation to its hook record's queue and schedules a fresh top-level
//! pass from the last committed root, so the single-writer discipline over
//! the tree stays with the scheduler loop. Pending queues are folded into
//! the state at the next read, in enqueue order.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::scheduler::EngineInner;
use crate::element::PropValue;
use crate::fiber::{Cleanup, DynState, EffectHook, FiberId, Hook, StateAction, StateHook};

/// Wrap a closure as an effect cleanup, for returning from a `use_effect`
/// callback: `cx.use_effect(deps, || { ..; cleanup(|| { .. }) })`.
pub fn cleanup(f: impl FnOnce() + 'static) -> Option<Cleanup> {
    Some(Box::new(f))
}

/// The render context for one component invocation: the executing fiber,
/// its hook cursor, and the hook records built so far.
pub struct RenderCx {
    fiber: FiberId,
    cursor: usize,
    hooks: Vec<Hook>,
    old_state: Vec<Option<StateHook>>,
    engine: Weak<RefCell<EngineInner>>,
}

impl RenderCx {
    pub(crate) fn new(
        fiber: FiberId,
        old_state: Vec<Option<StateHook>>,
        engine: Weak<RefCell<EngineInner>>,
    ) -> Self {
        Self {
            fiber,
            cursor: 0,
            hooks: Vec::new(),
            old_state,
            engine,
        }
    }

    pub(crate) fn into_hooks(self) -> Vec<Hook> {
        self.hooks
    }

    /// Persistent state, addressed by call order.
    ///
    /// On the first render of this fiber lineage the state is `initial`; on
    /// later renders it is the previous generation's state with any pending
    /// transformations folded in, in enqueue order. The returned setter
    /// enqueues transformations and schedules a full re-render; it never
    /// applies anything immediately.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        let index = self.cursor;
        self.cursor += 1;

        let seed = self.old_state.get(index).and_then(Clone::clone);
        let (mut value, queue) = match seed {
            Some(old) => (old.value, old.queue),
            None => (Rc::new(initial) as DynState, Vec::new()),
        };
        for action in &queue {
            value = action(&value);
        }

        let current = value
            .downcast_ref::<T>()
            .expect("state hook changed type between renders; hook call order must be stable")
            .clone();
        // The folded queue is drained: the new record starts empty.
        self.hooks.push(Hook::State(StateHook {
            value,
            queue: Vec::new(),
        }));

        let setter = StateSetter {
            fiber: self.fiber,
            index,
            engine: self.engine.clone(),
            _value: PhantomData,
        };
        (current, setter)
    }

    /// Post-commit side effect, addressed by call order.
    ///
    /// The callback fires after the commit that includes this fiber when
    /// `deps` is `None`, when no previous snapshot exists, or when any
    /// position of `deps` differs from the previous snapshot. A returned
    /// cleanup runs before the next firing of this hook lineage and when the
    /// fiber is unmounted.
    pub fn use_effect(
        &mut self,
        deps: Option<Vec<PropValue>>,
        callback: impl Fn() -> Option<Cleanup> + 'static,
    ) {
        self.cursor += 1;
        self.hooks.push(Hook::Effect(EffectHook {
            callback: Rc::new(callback),
            deps: deps.map(SmallVec::from_vec),
            cleanup: None,
        }));
    }
}

/// Enqueues state transformations for one state hook and schedules the
/// re-render that will fold them. Cheap to clone; holds only a weak engine
/// reference, so it outliving the engine is harmless.
pub struct StateSetter<T> {
    fiber: FiberId,
    index: usize,
    engine: Weak<RefCell<EngineInner>>,
    _value: PhantomData<fn(T) -> T>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            fiber: self.fiber,
            index: self.index,
            engine: self.engine.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: 'static> StateSetter<T> {
    /// Replace the state with a literal value on the next render.
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        self.push(Rc::new(move |_prev: &DynState| {
            Rc::new(value.clone()) as DynState
        }));
    }

    /// Transform the previous state on the next render.
    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        self.push(Rc::new(move |prev: &DynState| {
            let prev = prev
                .downcast_ref::<T>()
                .expect("state hook changed type between renders; hook call order must be stable");
            Rc::new(f(prev)) as DynState
        }));
    }

    fn push(&self, action: StateAction) {
        let Some(inner) = self.engine.upgrade() else {
            return;
        };
        inner
            .borrow_mut()
            .enqueue_state_action(self.fiber, self.index, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cx() -> RenderCx {
        RenderCx::new(FiberId::default(), Vec::new(), Weak::new())
    }

    fn cx_with(old_state: Vec<Option<StateHook>>) -> RenderCx {
        RenderCx::new(FiberId::default(), old_state, Weak::new())
    }

    #[test]
    fn first_read_returns_initial() {
        let mut cx = cx();
        let (value, _set) = cx.use_state(41i64);
        assert_eq!(value, 41);
    }

    #[test]
    fn hooks_are_addressed_by_call_order() {
        let mut cx = cx();
        let (a, _) = cx.use_state(1i64);
        let (b, _) = cx.use_state("two".to_owned());
        assert_eq!(a, 1);
        assert_eq!(b, "two");
        assert_eq!(cx.into_hooks().len(), 2);
    }

    #[test]
    fn seeded_state_folds_pending_queue_in_order() {
        let add_one: StateAction = Rc::new(|prev: &DynState| {
            let v = *prev.downcast_ref::<i64>().unwrap();
            Rc::new(v + 1) as DynState
        });
        let overwrite_five: StateAction = Rc::new(|_prev: &DynState| Rc::new(5i64) as DynState);

        let old = StateHook {
            value: Rc::new(0i64),
            queue: vec![add_one, overwrite_five],
        };

        let mut cx = cx_with(vec![Some(old)]);
        let (value, _set) = cx.use_state(0i64);
        // Fold-left: +1 first, then the literal overwrite wins.
        assert_eq!(value, 5);

        // The new record's queue is drained.
        match &cx.into_hooks()[0] {
            Hook::State(hook) => assert!(hook.queue.is_empty()),
            Hook::Effect(_) => panic!("expected a state hook"),
        }
    }

    #[test]
    fn seeding_does_not_consume_the_old_record() {
        let bump: StateAction = Rc::new(|prev: &DynState| {
            let v = *prev.downcast_ref::<i64>().unwrap();
            Rc::new(v + 1) as DynState
        });
        let old = StateHook {
            value: Rc::new(7i64),
            queue: vec![bump],
        };

        // Two consecutive passes seeded from the same committed record: the
        // second one (after the first pass was abandoned) sees the same fold.
        for _ in 0..2 {
            let mut cx = cx_with(vec![Some(old.clone())]);
            let (value, _set) = cx.use_state(0i64);
            assert_eq!(value, 8);
        }
        assert_eq!(old.queue.len(), 1);
    }

    #[test]
    fn setter_on_dead_engine_is_a_noop() {
        let mut cx = cx();
        let (_, set) = cx.use_state(0i64);
        // The weak engine reference is dangling; both calls must not panic.
        set.set(3);
        set.update(|v| v + 1);
    }

    #[test]
    fn effect_hook_records_snapshot() {
        let mut cx = cx();
        cx.use_effect(Some(vec![PropValue::from(1i64)]), || None);
        cx.use_effect(None, || cleanup(|| {}));

        let hooks = cx.into_hooks();
        assert_eq!(hooks.len(), 2);
        match &hooks[0] {
            Hook::Effect(e) => {
                assert_eq!(e.deps.as_ref().map(|d| d.len()), Some(1));
                assert!(e.cleanup.is_none());
            }
            Hook::State(_) => panic!("expected an effect hook"),
        }
        match &hooks[1] {
            Hook::Effect(e) => assert!(e.deps.is_none()),
            Hook::State(_) => panic!("expected an effect hook"),
        }
    }
}
