//! Debug-only dispatcher state.
//!
//! Test harnesses and dev tooling read and write these fields. Nothing in the
//! flag model or the commit walk looks at them, so compiling without the
//! `diagnostics` feature changes no flag or mask semantics.

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use super::{Slot, SlotName};

/// Function returning a description of the component stack being rendered.
pub type CurrentStack = dyn Fn() -> String;

// =============================================================================
// Renderer Tasks
// =============================================================================

/// Unit of queued renderer work. Running it may hand back a continuation.
pub struct RendererTask(Box<dyn FnOnce(bool) -> Option<RendererTask>>);

impl RendererTask {
    pub fn new(task: impl FnOnce(bool) -> Option<RendererTask> + 'static) -> Self {
        Self(Box::new(task))
    }

    pub fn run(self, did_timeout: bool) -> Option<RendererTask> {
        (self.0)(did_timeout)
    }
}

impl fmt::Debug for RendererTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RendererTask")
    }
}

// =============================================================================
// DiagnosticState
// =============================================================================

pub struct DiagnosticState {
    act_queue: RefCell<Option<Vec<RendererTask>>>,
    is_batching_legacy: Cell<bool>,
    did_schedule_legacy_update: Cell<bool>,
    did_use_promise: Cell<bool>,
    thrown_errors: RefCell<Vec<Rc<dyn Error>>>,
    get_current_stack: Slot<CurrentStack>,
}

impl DiagnosticState {
    pub const fn new() -> Self {
        Self {
            act_queue: RefCell::new(None),
            is_batching_legacy: Cell::new(false),
            did_schedule_legacy_update: Cell::new(false),
            did_use_promise: Cell::new(false),
            thrown_errors: RefCell::new(Vec::new()),
            get_current_stack: Slot::new(SlotName::CurrentStack),
        }
    }

    // -------------------------------------------------------------------------
    // Act queue
    // -------------------------------------------------------------------------

    /// Start queueing renderer tasks instead of scheduling them.
    pub fn begin_act_queue(&self) {
        let mut queue = self.act_queue.borrow_mut();
        if queue.is_none() {
            *queue = Some(Vec::new());
        }
    }

    pub fn is_act_queue_active(&self) -> bool {
        self.act_queue.borrow().is_some()
    }

    /// Queue `task` if an act queue is active. Hands the task back otherwise.
    pub fn enqueue_act_task(&self, task: RendererTask) -> Result<(), RendererTask> {
        match self.act_queue.borrow_mut().as_mut() {
            Some(queue) => {
                queue.push(task);
                Ok(())
            }
            None => Err(task),
        }
    }

    pub fn pending_act_tasks(&self) -> usize {
        self.act_queue.borrow().as_ref().map_or(0, Vec::len)
    }

    /// Run queued tasks, and their continuations, until the queue is empty.
    ///
    /// Tasks may enqueue more tasks while running. Returns how many task
    /// invocations ran.
    pub fn flush_act_queue(&self) -> usize {
        let mut flushed = 0;
        loop {
            let batch = match self.act_queue.borrow_mut().as_mut() {
                Some(queue) => std::mem::take(queue),
                None => return flushed,
            };
            if batch.is_empty() {
                return flushed;
            }
            for task in batch {
                let mut next = Some(task);
                while let Some(task) = next {
                    next = task.run(false);
                    flushed += 1;
                }
            }
        }
    }

    /// Stop queueing and return whatever was left unflushed.
    pub fn end_act_queue(&self) -> Vec<RendererTask> {
        self.act_queue.borrow_mut().take().unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Legacy batching
    // -------------------------------------------------------------------------

    pub fn is_batching_legacy(&self) -> bool {
        self.is_batching_legacy.get()
    }

    /// Batch legacy-mode updates until the guard is dropped.
    #[must_use = "batching ends as soon as the guard is dropped"]
    pub fn batch_legacy_updates(&self) -> LegacyBatchGuard<'_> {
        let previous = self.is_batching_legacy.replace(true);
        LegacyBatchGuard { state: self, previous }
    }

    /// Record that a legacy update was scheduled during a batch.
    pub fn note_legacy_update(&self) {
        if self.is_batching_legacy.get() {
            self.did_schedule_legacy_update.set(true);
        }
    }

    pub fn did_schedule_legacy_update(&self) -> bool {
        self.did_schedule_legacy_update.get()
    }

    pub fn take_did_schedule_legacy_update(&self) -> bool {
        self.did_schedule_legacy_update.replace(false)
    }

    // -------------------------------------------------------------------------
    // Promises
    // -------------------------------------------------------------------------

    pub fn mark_used_promise(&self) {
        self.did_use_promise.set(true);
    }

    pub fn did_use_promise(&self) -> bool {
        self.did_use_promise.get()
    }

    /// Read and reset the flag.
    pub fn take_did_use_promise(&self) -> bool {
        self.did_use_promise.replace(false)
    }

    // -------------------------------------------------------------------------
    // Thrown errors
    // -------------------------------------------------------------------------

    /// Remember an error thrown during the current act scope.
    ///
    /// The same error instance is only recorded once.
    pub fn record_thrown_error(&self, error: Rc<dyn Error>) {
        let mut errors = self.thrown_errors.borrow_mut();
        if !errors.iter().any(|seen| Rc::ptr_eq(seen, &error)) {
            errors.push(error);
        }
    }

    pub fn thrown_error_count(&self) -> usize {
        self.thrown_errors.borrow().len()
    }

    pub fn take_thrown_errors(&self) -> Vec<Rc<dyn Error>> {
        std::mem::take(&mut *self.thrown_errors.borrow_mut())
    }

    // -------------------------------------------------------------------------
    // Component stack
    // -------------------------------------------------------------------------

    /// Slot for the renderer's stack accessor.
    pub fn get_current_stack(&self) -> &Slot<CurrentStack> {
        &self.get_current_stack
    }

    /// Current component stack, empty when no renderer installed an accessor.
    pub fn current_stack(&self) -> String {
        self.get_current_stack
            .get()
            .map(|stack| (*stack)())
            .unwrap_or_default()
    }
}

impl Default for DiagnosticState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DiagnosticState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticState")
            .field("act_queue", &self.act_queue.borrow().as_ref().map(Vec::len))
            .field("is_batching_legacy", &self.is_batching_legacy.get())
            .field("did_schedule_legacy_update", &self.did_schedule_legacy_update.get())
            .field("did_use_promise", &self.did_use_promise.get())
            .field("thrown_errors", &self.thrown_errors.borrow().len())
            .field("get_current_stack", &self.get_current_stack)
            .finish()
    }
}

/// Restores the previous legacy batching state when dropped.
#[derive(Debug)]
pub struct LegacyBatchGuard<'a> {
    state: &'a DiagnosticState,
    previous: bool,
}

impl Drop for LegacyBatchGuard<'_> {
    fn drop(&mut self) {
        self.state.is_batching_legacy.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_initial_state() {
        let state = DiagnosticState::new();
        assert!(!state.is_act_queue_active());
        assert!(!state.is_batching_legacy());
        assert!(!state.did_schedule_legacy_update());
        assert!(!state.did_use_promise());
        assert_eq!(state.thrown_error_count(), 0);
        assert!(!state.get_current_stack().is_installed());
        assert_eq!(state.current_stack(), "");
    }

    #[test]
    fn test_enqueue_without_queue_returns_task() {
        let state = DiagnosticState::new();
        assert!(state.enqueue_act_task(RendererTask::new(|_| None)).is_err());
    }

    #[test]
    fn test_flush_runs_continuations_and_new_tasks() {
        let state = Rc::new(DiagnosticState::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        state.begin_act_queue();

        let l = log.clone();
        let s = state.clone();
        let task = RendererTask::new(move |_| {
            l.borrow_mut().push("first");
            let l2 = l.clone();
            let _ = s.enqueue_act_task(RendererTask::new(move |_| {
                l2.borrow_mut().push("queued");
                None
            }));
            let l3 = l.clone();
            Some(RendererTask::new(move |_| {
                l3.borrow_mut().push("continuation");
                None
            }))
        });
        assert!(state.enqueue_act_task(task).is_ok());
        assert_eq!(state.pending_act_tasks(), 1);

        assert_eq!(state.flush_act_queue(), 3);
        assert_eq!(*log.borrow(), vec!["first", "continuation", "queued"]);
        assert_eq!(state.pending_act_tasks(), 0);
        assert!(state.end_act_queue().is_empty());
        assert!(!state.is_act_queue_active());
    }

    #[test]
    fn test_legacy_batching_scope() {
        let state = DiagnosticState::new();
        state.note_legacy_update();
        assert!(!state.did_schedule_legacy_update());
        {
            let _outer = state.batch_legacy_updates();
            {
                let _inner = state.batch_legacy_updates();
                state.note_legacy_update();
            }
            assert!(state.is_batching_legacy());
        }
        assert!(!state.is_batching_legacy());
        assert!(state.take_did_schedule_legacy_update());
        assert!(!state.did_schedule_legacy_update());
    }

    #[test]
    fn test_thrown_errors_recorded_once() {
        let state = DiagnosticState::new();
        let error: Rc<dyn Error> = Rc::new(Boom);
        state.record_thrown_error(error.clone());
        state.record_thrown_error(error);
        state.record_thrown_error(Rc::new(Boom));
        assert_eq!(state.thrown_error_count(), 2);
        let errors = state.take_thrown_errors();
        assert_eq!(errors[0].to_string(), "boom");
        assert_eq!(state.thrown_error_count(), 0);
    }

    #[test]
    fn test_promise_flag() {
        let state = DiagnosticState::new();
        state.mark_used_promise();
        assert!(state.take_did_use_promise());
        assert!(!state.did_use_promise());
    }

    #[test]
    fn test_current_stack_accessor() {
        let state = DiagnosticState::new();
        let stack: Rc<CurrentStack> = Rc::new(|| "in App".to_string());
        let guard = state.get_current_stack().install(stack);
        assert_eq!(state.current_stack(), "in App");
        drop(guard);
        assert_eq!(state.current_stack(), "");
    }
}
