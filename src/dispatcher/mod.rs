//! Dispatcher Slots - Swappable capabilities for the active execution context.
//!
//! Hook calls, cache reads and transition scheduling do not know whether they
//! run under a concurrent root, a legacy root or a test harness. They read a
//! slot on [`SharedInternals`] and use whatever the entry point installed.
//!
//! ```text
//! H  hook dispatcher          (HookDispatcher)
//! A  async / cache dispatcher (AsyncDispatcher)
//! T  active transition        (Transition)
//! S  transition finish        (TransitionFinish)
//! ```
//!
//! `SharedInternals` is passed by reference to whoever needs it. Entry points
//! override a slot for the duration of a scope and the guard puts the old value
//! back on drop, whether the scope returns, bails out with `?`, or panics.
//!
//! # Example
//!
//! ```ignore
//! let internals = SharedInternals::new();
//! let dispatcher: Rc<dyn HookDispatcher> = Rc::new(MountDispatcher::default());
//!
//! let id = internals.dispatcher().scoped(dispatcher, || internals.use_id())?;
//! assert!(!internals.dispatcher().is_installed());
//! ```

mod capability;
#[cfg(feature = "diagnostics")]
mod diagnostics;
mod slot;

pub use capability::*;
#[cfg(feature = "diagnostics")]
pub use diagnostics::*;
pub use slot::*;

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::rc::Rc;

use crate::error::DispatchError;

// =============================================================================
// Slot Names
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotName {
    /// `H`
    Dispatcher,
    /// `A`
    AsyncDispatcher,
    /// `T`
    Transition,
    /// `S`
    TransitionFinish,
    /// `getCurrentStack`, diagnostics only.
    CurrentStack,
}

impl SlotName {
    /// Short key the slot is known by in tooling.
    pub const fn key(self) -> &'static str {
        match self {
            SlotName::Dispatcher => "H",
            SlotName::AsyncDispatcher => "A",
            SlotName::Transition => "T",
            SlotName::TransitionFinish => "S",
            SlotName::CurrentStack => "getCurrentStack",
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            SlotName::Dispatcher => "hook dispatcher",
            SlotName::AsyncDispatcher => "async dispatcher",
            SlotName::Transition => "transition",
            SlotName::TransitionFinish => "transition finish callback",
            SlotName::CurrentStack => "stack accessor",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.key())
    }
}

// =============================================================================
// SharedInternals
// =============================================================================

/// The set of dispatcher slots for one renderer instance.
///
/// All primary slots start empty. Single-threaded: it is neither `Send` nor
/// `Sync`, and overrides on one instance must nest.
pub struct SharedInternals {
    dispatcher: Slot<dyn HookDispatcher>,
    async_dispatcher: Slot<dyn AsyncDispatcher>,
    transition: Slot<Transition>,
    transition_finish: Slot<TransitionFinish>,
    #[cfg(feature = "diagnostics")]
    diagnostics: DiagnosticState,
}

impl SharedInternals {
    pub const fn new() -> Self {
        Self {
            dispatcher: Slot::new(SlotName::Dispatcher),
            async_dispatcher: Slot::new(SlotName::AsyncDispatcher),
            transition: Slot::new(SlotName::Transition),
            transition_finish: Slot::new(SlotName::TransitionFinish),
            #[cfg(feature = "diagnostics")]
            diagnostics: DiagnosticState::new(),
        }
    }

    /// `H`
    pub fn dispatcher(&self) -> &Slot<dyn HookDispatcher> {
        &self.dispatcher
    }

    /// `A`
    pub fn async_dispatcher(&self) -> &Slot<dyn AsyncDispatcher> {
        &self.async_dispatcher
    }

    /// `T`
    pub fn transition(&self) -> &Slot<Transition> {
        &self.transition
    }

    /// `S`
    pub fn transition_finish(&self) -> &Slot<TransitionFinish> {
        &self.transition_finish
    }

    #[cfg(feature = "diagnostics")]
    pub fn diagnostics(&self) -> &DiagnosticState {
        &self.diagnostics
    }

    // -------------------------------------------------------------------------
    // Readers
    // -------------------------------------------------------------------------

    /// Installed hook dispatcher, or an error naming `caller`.
    pub fn resolve_dispatcher(
        &self,
        caller: &'static str,
    ) -> Result<Rc<dyn HookDispatcher>, DispatchError> {
        self.dispatcher.require(caller)
    }

    pub fn use_id(&self) -> Result<String, DispatchError> {
        self.resolve_dispatcher("use_id")?.use_id()
    }

    /// Cached `T` from the installed async dispatcher, created with `init`.
    pub fn get_cache_for_type<T: Any>(
        &self,
        init: impl Fn() -> T,
    ) -> Result<Rc<T>, DispatchError> {
        let dispatcher = self.async_dispatcher.require("get_cache_for_type")?;
        let create = || -> Rc<dyn Any> { Rc::new(init()) };
        let value = dispatcher.get_cache_for_type(TypeId::of::<T>(), &create);
        value.downcast::<T>().map_err(|_| DispatchError::CacheTypeMismatch {
            type_name: type_name::<T>(),
        })
    }

    /// Whether a transition is being started right now.
    pub fn is_in_transition(&self) -> bool {
        self.transition.is_installed()
    }

    /// Run `scope` as a transition.
    ///
    /// `transition` occupies `T` for the duration of `scope`. If a finish
    /// callback is installed in `S`, it sees the transition and the value
    /// `scope` returned before `T` is restored.
    pub fn start_transition<R: Any>(&self, transition: Transition, scope: impl FnOnce() -> R) -> R {
        let transition = Rc::new(transition);
        let _guard = self.transition.install(transition.clone());
        let value = scope();
        if let Some(finish) = self.transition_finish.get() {
            (*finish)(&transition, &value);
        }
        value
    }
}

impl Default for SharedInternals {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedInternals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SharedInternals");
        s.field("H", &self.dispatcher)
            .field("A", &self.async_dispatcher)
            .field("T", &self.transition)
            .field("S", &self.transition_finish);
        #[cfg(feature = "diagnostics")]
        s.field("diagnostics", &self.diagnostics);
        s.finish()
    }
}
