//! Echo suppression for engine-originated updates.
//!
//! When the engine pushes a parameter value, the bridge writes it into the
//! value store. Observers of that store (the controls on screen) may react
//! by calling back into the bridge, and without suppression that reaction
//! would be sent straight back to the engine.
//!
//! [`EchoSuppression`] is raised for the duration of one inbound apply and
//! lowered by a task on the bridge's [`TickQueue`]. The reset runs at the
//! next tick, never inline: reactions in the same turn stay suppressed,
//! user edits in later turns go through.
//!
//! ```text
//! engine ──► apply_parameter_value ──► raise ──► store.set ──► observers
//!                                         │                      │
//!                                         │          set_value ──┘ (suppressed)
//!                                         ▼
//!                                   TickQueue::defer(lower)
//!
//! next tick ──► TickQueue::run_pending ──► lower
//! ```
//!
//! Each bridge owns its own flag; bridges never share suppression state.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Work deferred to the next scheduling tick.
#[derive(Default)]
pub struct TickQueue {
    tasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task for the next tick.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run the tasks queued so far. Tasks deferred while running wait for
    /// the following tick. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.tasks.borrow_mut());
        let count = pending.len();
        for task in pending {
            task();
        }
        count
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

#[derive(Default)]
struct EchoState {
    active: Cell<bool>,
    reset_scheduled: Cell<bool>,
}

/// Flag telling outbound senders not to re-transmit an inbound value.
#[derive(Clone, Default)]
pub struct EchoSuppression {
    state: Rc<EchoState>,
}

impl EchoSuppression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether outbound parameter traffic is currently suppressed.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.active.get()
    }

    /// Run `apply` with suppression raised and schedule the reset on `ticks`.
    ///
    /// Several applies within one tick share a single reset.
    pub fn apply<R>(&self, ticks: &TickQueue, apply: impl FnOnce() -> R) -> R {
        self.state.active.set(true);
        if !self.state.reset_scheduled.replace(true) {
            let state = Rc::downgrade(&self.state);
            ticks.defer(move || {
                if let Some(state) = state.upgrade() {
                    state.active.set(false);
                    state.reset_scheduled.set(false);
                }
            });
        }
        apply()
    }
}

impl std::fmt::Debug for EchoSuppression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoSuppression")
            .field("active", &self.is_active())
            .finish()
    }
}
