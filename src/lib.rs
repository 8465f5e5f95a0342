//! # spark-fiber
//!
//! Effect flags and dispatcher slots for a reactive tree reconciler.
//!
//! ## Architecture
//!
//! The reconciler splits every update into a render pass that works out what
//! changed and a commit pass that applies it. This crate is the data layer
//! between the two:
//!
//! ```text
//! render: mark flags ──► complete_work (bubble subtree flags, bottom-up)
//!                                   │
//! commit: BeforeMutation ─► Mutation ─► Layout ─► Passive
//!         (each phase skips subtrees whose subtree flags miss its mask)
//! ```
//!
//! Alongside it, [`SharedInternals`] holds the dispatcher slots (`H`, `A`, `T`,
//! `S`) that decouple hook, cache and transition call sites from whichever
//! execution context is active.
//!
//! ## Modules
//!
//! - [`flags`] - Flag bits, phase masks, kind-checked aliases
//! - [`tree`] - Node flags, subtree propagation, cloning, commit walk
//! - [`dispatcher`] - Dispatcher slots with scoped overrides
//! - [`error`] - Error types
//!
//! ## Crate features
//!
//! - `create-event-handle` (off by default): widens [`BEFORE_MUTATION_MASK`]
//!   to visit deleted and hidden trees.
//! - `diagnostics` (on by default): debug-only dispatcher state such as the
//!   act queue and thrown-error list.

pub mod dispatcher;
pub mod error;
pub mod flags;
pub mod tree;

// Re-export commonly used items
pub use error::{DispatchError, FlagError};

pub use flags::{
    before_mutation_mask, EffectTag, Flags, KindFlags, NodeKind, BEFORE_MUTATION_MASK,
    HOST_EFFECT_MASK, LAYOUT_MASK, LIFECYCLE_EFFECT_MASK, MUTATION_MASK, PASSIVE_MASK,
    PROPAGATED_MASK, STATIC_MASK,
};

pub use tree::{CommitPhase, CommitStats, CommitVisitor, EffectTree, NodeId};

pub use dispatcher::{
    AsyncDispatcher, CacheDispatcher, ContextOnlyDispatcher, DispatcherKind, HookDispatcher,
    SharedInternals, Slot, SlotGuard, SlotName, Transition, TransitionFinish,
};

#[cfg(feature = "diagnostics")]
pub use dispatcher::{DiagnosticState, LegacyBatchGuard, RendererTask};
