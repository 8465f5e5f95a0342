//! Swappable slot with scoped overrides.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{error, trace};

use super::SlotName;
use crate::error::DispatchError;

// =============================================================================
// Slot
// =============================================================================

/// A named reference to a capability, or nothing.
///
/// The slot shares ownership of whatever is installed but never creates or
/// validates it. Readers decide what an empty slot means for them; use
/// [`Slot::require`] to turn emptiness into a [`DispatchError`].
///
/// Overrides nest strictly: the last guard created must be the first dropped.
pub struct Slot<T: ?Sized> {
    name: SlotName,
    value: RefCell<Option<Rc<T>>>,
    depth: Cell<usize>,
}

impl<T: ?Sized> Slot<T> {
    /// An empty slot.
    pub const fn new(name: SlotName) -> Self {
        Self {
            name,
            value: RefCell::new(None),
            depth: Cell::new(0),
        }
    }

    pub fn name(&self) -> SlotName {
        self.name
    }

    /// Current value, if any.
    pub fn get(&self) -> Option<Rc<T>> {
        self.value.borrow().clone()
    }

    pub fn is_installed(&self) -> bool {
        self.value.borrow().is_some()
    }

    /// Number of overrides currently active.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Current value, or an error naming `caller` if nothing is installed.
    pub fn require(&self, caller: &'static str) -> Result<Rc<T>, DispatchError> {
        self.get().ok_or(DispatchError::OutsideContext {
            slot: self.name,
            caller,
        })
    }

    /// Install `value` until the returned guard is dropped.
    #[must_use = "the previous value is restored as soon as the guard is dropped"]
    pub fn install(&self, value: Rc<T>) -> SlotGuard<'_, T> {
        self.swap(Some(value))
    }

    /// Empty the slot until the returned guard is dropped.
    #[must_use = "the previous value is restored as soon as the guard is dropped"]
    pub fn clear(&self) -> SlotGuard<'_, T> {
        self.swap(None)
    }

    /// Run `f` with `value` installed, restoring the previous value after.
    ///
    /// Restoration also happens if `f` panics.
    pub fn scoped<R>(&self, value: Rc<T>, f: impl FnOnce() -> R) -> R {
        let _guard = self.install(value);
        f()
    }

    fn swap(&self, next: Option<Rc<T>>) -> SlotGuard<'_, T> {
        let previous = self.value.replace(next);
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        trace!(slot = %self.name, depth, installed = self.is_installed(), "slot override");
        SlotGuard {
            slot: self,
            previous: Some(previous),
            depth,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("installed", &self.is_installed())
            .field("depth", &self.depth.get())
            .finish()
    }
}

// =============================================================================
// SlotGuard
// =============================================================================

/// Restores a slot's previous value when dropped.
pub struct SlotGuard<'a, T: ?Sized> {
    slot: &'a Slot<T>,
    previous: Option<Option<Rc<T>>>,
    depth: usize,
}

impl<T: ?Sized> SlotGuard<'_, T> {
    /// The value this guard will put back.
    pub fn previous(&self) -> Option<&Rc<T>> {
        self.previous.as_ref().and_then(|prev| prev.as_ref())
    }
}

impl<T: ?Sized> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        let current = self.slot.depth.get();
        if current != self.depth {
            // Undefined nesting. Restore anyway and leave a trace of it.
            error!(
                slot = %self.slot.name,
                expected = self.depth,
                actual = current,
                "slot override restored out of order"
            );
        }
        if let Some(previous) = self.previous.take() {
            self.slot.value.replace(previous);
        }
        // Counts live guards, whatever order they go away in.
        let depth = current.saturating_sub(1);
        self.slot.depth.set(depth);
        trace!(slot = %self.slot.name, depth, "slot restore");
    }
}

impl<T: ?Sized> fmt::Debug for SlotGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotGuard")
            .field("slot", &self.slot.name)
            .field("depth", &self.depth)
            .finish()
    }
}
