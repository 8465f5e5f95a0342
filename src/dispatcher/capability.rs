//! Capabilities that can be installed into dispatcher slots.
//!
//! The engine never names a concrete implementation. Whatever execution
//! context is active installs its own, and call sites read the slot.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::DispatchError;
use crate::tree::NodeId;

// =============================================================================
// Hook Dispatcher (H)
// =============================================================================

/// Which stage of a component render a hook dispatcher serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatcherKind {
    Mount,
    Update,
    Rerender,
    /// Installed outside component bodies: only context reads are allowed.
    ContextOnly,
}

/// Hook implementation for the component currently rendering.
pub trait HookDispatcher {
    fn kind(&self) -> DispatcherKind;

    /// A stable identifier for the calling hook position.
    fn use_id(&self) -> Result<String, DispatchError>;
}

/// Dispatcher installed between component renders.
///
/// Every hook call through it is an invalid hook call.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextOnlyDispatcher;

impl HookDispatcher for ContextOnlyDispatcher {
    fn kind(&self) -> DispatcherKind {
        DispatcherKind::ContextOnly
    }

    fn use_id(&self) -> Result<String, DispatchError> {
        Err(DispatchError::InvalidHookCall)
    }
}

// =============================================================================
// Async Dispatcher (A)
// =============================================================================

/// Cache and owner lookup for the active render.
pub trait AsyncDispatcher {
    /// Cached value for `key`, created with `init` on first use.
    fn get_cache_for_type(&self, key: TypeId, init: &dyn Fn() -> Rc<dyn Any>) -> Rc<dyn Any>;

    /// Node whose render is running, if tracked.
    fn owner(&self) -> Option<NodeId> {
        None
    }
}

/// Type-keyed cache that lives as long as the dispatcher.
#[derive(Default)]
pub struct CacheDispatcher {
    entries: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

impl CacheDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl AsyncDispatcher for CacheDispatcher {
    fn get_cache_for_type(&self, key: TypeId, init: &dyn Fn() -> Rc<dyn Any>) -> Rc<dyn Any> {
        if let Some(value) = self.entries.borrow().get(&key) {
            return value.clone();
        }
        // Not holding the borrow while `init` runs: it may read the cache.
        let value = init();
        self.entries
            .borrow_mut()
            .entry(key)
            .or_insert(value)
            .clone()
    }
}

impl std::fmt::Debug for CacheDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheDispatcher")
            .field("entries", &self.len())
            .finish()
    }
}

// =============================================================================
// Transitions (T, S)
// =============================================================================

/// Config of the transition currently being started.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub name: Option<String>,
    pub start_time: Option<f64>,
}

impl Transition {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            start_time: None,
        }
    }
}

/// Called when a transition scope returns, with the scope's return value.
pub type TransitionFinish = dyn Fn(&Transition, &dyn Any);
