//! Effect Flags - Per-node bitmask of pending work.
//!
//! During the render pass every node records which categories of work it
//! needs (placement, update, deletion, ref change, ...). The commit pass reads
//! these bits back, together with the node's subtree flags, and uses the phase
//! masks below to skip subtrees that contain nothing relevant.
//!
//! # Bit layout
//!
//! ```text
//! bit  0  PERFORMED_WORK        bit 15  INCOMPLETE
//! bit  1  PLACEMENT             bit 16  SHOULD_CAPTURE
//! bit  2  UPDATE                bit 17  FORCE_UPDATE_FOR_LEGACY_SUSPENSE
//! bit  3  CLONED                bit 18  DID_PROPAGATE_CONTEXT
//! bit  4  CHILD_DELETION        bit 19  NEEDS_PROPAGATION
//! bit  5  CONTENT_RESET         bit 20  FORKED
//! bit  6  CALLBACK              bit 21  REF_STATIC
//! bit  7  DID_CAPTURE           bit 22  LAYOUT_STATIC
//! bit  8  FORCE_CLIENT_RENDER   bit 23  PASSIVE_STATIC
//! bit  9  REF                   bit 24  MAY_SUSPEND_COMMIT
//! bit 10  SNAPSHOT              bit 25  PLACEMENT_DEV
//! bit 11  PASSIVE               bit 26  MOUNT_LAYOUT_DEV
//! bit 12  HYDRATING             bit 27  MOUNT_PASSIVE_DEV
//! bit 13  VISIBILITY
//! bit 14  STORE_CONSISTENCY
//! ```
//!
//! Bits 0..=14 have the lifetime of one commit and make up [`HOST_EFFECT_MASK`].
//! `PERFORMED_WORK`, `PLACEMENT`, `DID_CAPTURE` and `HYDRATING` are read by
//! external dev tooling and must keep their values. The rest may move, but the
//! masks must then be re-derived (they are, since they are built from the
//! named bits).
//!
//! Four bits are reused under a second name on node kinds that never need both
//! meanings at once. See [`alias`] for the per-kind table.

pub mod alias;

pub use alias::*;

bitflags::bitflags! {
    /// Pending work and static facts for one node.
    ///
    /// Only single bits live here. Aliases and masks are associated constants
    /// below so that `Debug` output names the primary meaning.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        // Dev-tools visible. Do not renumber.
        const PERFORMED_WORK = 1 << 0;
        const PLACEMENT = 1 << 1;
        const DID_CAPTURE = 1 << 7;
        const HYDRATING = 1 << 12;

        const UPDATE = 1 << 2;
        const CLONED = 1 << 3;
        const CHILD_DELETION = 1 << 4;
        const CONTENT_RESET = 1 << 5;
        const CALLBACK = 1 << 6;
        const FORCE_CLIENT_RENDER = 1 << 8;
        const REF = 1 << 9;
        const SNAPSHOT = 1 << 10;
        const PASSIVE = 1 << 11;
        const VISIBILITY = 1 << 13;
        const STORE_CONSISTENCY = 1 << 14;

        // Render-phase only. Not side effects, never committed.
        const INCOMPLETE = 1 << 15;
        const SHOULD_CAPTURE = 1 << 16;
        const FORCE_UPDATE_FOR_LEGACY_SUSPENSE = 1 << 17;
        const DID_PROPAGATE_CONTEXT = 1 << 18;
        const NEEDS_PROPAGATION = 1 << 19;
        const FORKED = 1 << 20;

        // Static: describe the subtree rather than this render.
        const REF_STATIC = 1 << 21;
        const LAYOUT_STATIC = 1 << 22;
        const PASSIVE_STATIC = 1 << 23;
        const MAY_SUSPEND_COMMIT = 1 << 24;

        // Dev-only. PLACEMENT_DEV survives the commit, unlike PLACEMENT.
        const PLACEMENT_DEV = 1 << 25;
        const MOUNT_LAYOUT_DEV = 1 << 26;
        const MOUNT_PASSIVE_DEV = 1 << 27;
    }
}

// =============================================================================
// Aliased Bits
// =============================================================================

impl Flags {
    /// The all-zero value. Default and reset state.
    pub const NO_FLAGS: Flags = Flags::empty();

    /// Suspense-like kinds only. Shares its bit with `STORE_CONSISTENCY`.
    pub const SCHEDULE_RETRY: Flags = Flags::STORE_CONSISTENCY;
    /// Host instances only. Shares its bit with `VISIBILITY`.
    pub const SHOULD_SUSPEND_COMMIT: Flags = Flags::VISIBILITY;
    /// Suspense-like kinds only. Shares its bit with `CONTENT_RESET`.
    pub const DID_DEFER: Flags = Flags::CONTENT_RESET;
    /// Host instances only. Shares its bit with `SNAPSHOT`.
    pub const FORM_RESET: Flags = Flags::SNAPSHOT;
}

// =============================================================================
// Masks
// =============================================================================

/// Flags that take part in lifecycle ordering.
pub const LIFECYCLE_EFFECT_MASK: Flags = Flags::PASSIVE
    .union(Flags::UPDATE)
    .union(Flags::CALLBACK)
    .union(Flags::REF)
    .union(Flags::SNAPSHOT)
    .union(Flags::STORE_CONSISTENCY);

/// Union of every flag with the lifetime of a single commit.
pub const HOST_EFFECT_MASK: Flags = Flags::from_bits_retain(0b0111_1111_1111_1111);

/// Flags the before-mutation phase acts on for a given switch value.
///
/// Event handles need to visit deleted and hidden trees to fire `beforeblur`,
/// which pulls in `CHILD_DELETION` and `VISIBILITY`.
pub const fn before_mutation_mask(enable_create_event_handle: bool) -> Flags {
    let base = Flags::UPDATE.union(Flags::SNAPSHOT);
    if enable_create_event_handle {
        base.union(Flags::CHILD_DELETION).union(Flags::VISIBILITY)
    } else {
        base
    }
}

/// Before-mutation phase mask, fixed by the `create-event-handle` feature.
pub const BEFORE_MUTATION_MASK: Flags =
    before_mutation_mask(cfg!(feature = "create-event-handle"));

pub const MUTATION_MASK: Flags = Flags::PLACEMENT
    .union(Flags::UPDATE)
    .union(Flags::CHILD_DELETION)
    .union(Flags::CONTENT_RESET)
    .union(Flags::REF)
    .union(Flags::HYDRATING)
    .union(Flags::VISIBILITY)
    .union(Flags::FORM_RESET);

pub const LAYOUT_MASK: Flags = Flags::UPDATE
    .union(Flags::CALLBACK)
    .union(Flags::REF)
    .union(Flags::VISIBILITY);

// TODO: split into separate mount and unmount masks once passive unmounts
// stop relying on VISIBILITY.
pub const PASSIVE_MASK: Flags = Flags::PASSIVE
    .union(Flags::VISIBILITY)
    .union(Flags::CHILD_DELETION);

/// Flags that survive cloning a node for the next render.
pub const STATIC_MASK: Flags = Flags::LAYOUT_STATIC
    .union(Flags::PASSIVE_STATIC)
    .union(Flags::REF_STATIC)
    .union(Flags::MAY_SUSPEND_COMMIT);

/// Flags carried from a completed child into its parent's subtree flags.
///
/// Commit flags plus the static facts. Render-only and dev-only bits stay on
/// the node that set them.
pub const PROPAGATED_MASK: Flags = HOST_EFFECT_MASK.union(STATIC_MASK);

// =============================================================================
// Helpers
// =============================================================================

impl Flags {
    /// Part of these flags the commit phase cares about.
    #[inline]
    pub const fn commit_part(self) -> Flags {
        self.intersection(HOST_EFFECT_MASK)
    }

    /// Part of these flags that survives a clone.
    #[inline]
    pub const fn static_part(self) -> Flags {
        self.intersection(STATIC_MASK)
    }

    /// Whether any commit-phase work is pending.
    #[inline]
    pub const fn needs_commit(self) -> bool {
        self.intersects(HOST_EFFECT_MASK)
    }

    /// Drop everything except the static bits, in place.
    #[inline]
    pub fn clear_for_clone(&mut self) {
        *self = self.static_part();
    }
}
