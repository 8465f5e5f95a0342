//! Kind-checked names for reused bits.
//!
//! We are close to running out of bits, so four bits carry a second meaning on
//! node kinds that never need the first one:
//!
//! | bit                 | primary meaning     | alias                   | alias kinds                      |
//! |---------------------|---------------------|-------------------------|----------------------------------|
//! | `STORE_CONSISTENCY` | store consistency   | `SCHEDULE_RETRY`        | Suspense, SuspenseList, Offscreen |
//! | `VISIBILITY`        | visibility change   | `SHOULD_SUSPEND_COMMIT` | HostComponent, HostHoistable     |
//! | `CONTENT_RESET`     | content reset       | `DID_DEFER`             | Suspense                         |
//! | `SNAPSHOT`          | snapshot            | `FORM_RESET`            | HostComponent                    |
//!
//! A node kind listed in the last column may only use the alias; every other
//! kind may only use the primary meaning. [`KindFlags`] enforces this when a
//! tag is inserted, so the storage stays a single shared `Flags` word while no
//! caller can set both meanings of one bit on the wrong kind.

use super::Flags;
use crate::error::FlagError;

// =============================================================================
// Node Kinds
// =============================================================================

/// Node-kind groups relevant to flag aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    FunctionComponent,
    ClassComponent,
    HostRoot,
    HostComponent,
    HostHoistable,
    HostText,
    Fragment,
    Portal,
    Suspense,
    SuspenseList,
    Offscreen,
}

// =============================================================================
// Effect Tags
// =============================================================================

/// A named meaning of one flag bit.
///
/// Unlike [`Flags`], the aliases here are distinct values, so a tag always says
/// which meaning the caller intends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectTag {
    PerformedWork,
    Placement,
    Update,
    Cloned,
    ChildDeletion,
    ContentReset,
    Callback,
    DidCapture,
    ForceClientRender,
    Ref,
    Snapshot,
    Passive,
    Hydrating,
    Visibility,
    StoreConsistency,
    ScheduleRetry,
    ShouldSuspendCommit,
    DidDefer,
    FormReset,
    Incomplete,
    ShouldCapture,
    ForceUpdateForLegacySuspense,
    DidPropagateContext,
    NeedsPropagation,
    Forked,
    RefStatic,
    LayoutStatic,
    PassiveStatic,
    MaySuspendCommit,
    PlacementDev,
    MountLayoutDev,
    MountPassiveDev,
}

impl EffectTag {
    /// The bit this tag occupies.
    pub const fn bits(self) -> Flags {
        match self {
            Self::PerformedWork => Flags::PERFORMED_WORK,
            Self::Placement => Flags::PLACEMENT,
            Self::Update => Flags::UPDATE,
            Self::Cloned => Flags::CLONED,
            Self::ChildDeletion => Flags::CHILD_DELETION,
            Self::ContentReset => Flags::CONTENT_RESET,
            Self::Callback => Flags::CALLBACK,
            Self::DidCapture => Flags::DID_CAPTURE,
            Self::ForceClientRender => Flags::FORCE_CLIENT_RENDER,
            Self::Ref => Flags::REF,
            Self::Snapshot => Flags::SNAPSHOT,
            Self::Passive => Flags::PASSIVE,
            Self::Hydrating => Flags::HYDRATING,
            Self::Visibility => Flags::VISIBILITY,
            Self::StoreConsistency => Flags::STORE_CONSISTENCY,
            Self::ScheduleRetry => Flags::SCHEDULE_RETRY,
            Self::ShouldSuspendCommit => Flags::SHOULD_SUSPEND_COMMIT,
            Self::DidDefer => Flags::DID_DEFER,
            Self::FormReset => Flags::FORM_RESET,
            Self::Incomplete => Flags::INCOMPLETE,
            Self::ShouldCapture => Flags::SHOULD_CAPTURE,
            Self::ForceUpdateForLegacySuspense => Flags::FORCE_UPDATE_FOR_LEGACY_SUSPENSE,
            Self::DidPropagateContext => Flags::DID_PROPAGATE_CONTEXT,
            Self::NeedsPropagation => Flags::NEEDS_PROPAGATION,
            Self::Forked => Flags::FORKED,
            Self::RefStatic => Flags::REF_STATIC,
            Self::LayoutStatic => Flags::LAYOUT_STATIC,
            Self::PassiveStatic => Flags::PASSIVE_STATIC,
            Self::MaySuspendCommit => Flags::MAY_SUSPEND_COMMIT,
            Self::PlacementDev => Flags::PLACEMENT_DEV,
            Self::MountLayoutDev => Flags::MOUNT_LAYOUT_DEV,
            Self::MountPassiveDev => Flags::MOUNT_PASSIVE_DEV,
        }
    }

    /// The alias entry this tag belongs to, if its bit is shared.
    pub fn aliased_bit(self) -> Option<&'static AliasedBit> {
        ALIASED_BITS
            .iter()
            .find(|entry| entry.primary == self || entry.alias == self)
    }
}

// =============================================================================
// Alias Table
// =============================================================================

/// One reused bit and the node kinds that read it under its second name.
#[derive(Debug)]
pub struct AliasedBit {
    pub bit: Flags,
    pub primary: EffectTag,
    pub alias: EffectTag,
    pub alias_kinds: &'static [NodeKind],
}

impl AliasedBit {
    /// Which meaning this bit has on `kind`.
    pub fn meaning_for(&self, kind: NodeKind) -> EffectTag {
        if self.alias_kinds.contains(&kind) {
            self.alias
        } else {
            self.primary
        }
    }
}

pub static ALIASED_BITS: [AliasedBit; 4] = [
    AliasedBit {
        bit: Flags::STORE_CONSISTENCY,
        primary: EffectTag::StoreConsistency,
        alias: EffectTag::ScheduleRetry,
        alias_kinds: &[NodeKind::Suspense, NodeKind::SuspenseList, NodeKind::Offscreen],
    },
    AliasedBit {
        bit: Flags::VISIBILITY,
        primary: EffectTag::Visibility,
        alias: EffectTag::ShouldSuspendCommit,
        alias_kinds: &[NodeKind::HostComponent, NodeKind::HostHoistable],
    },
    AliasedBit {
        bit: Flags::CONTENT_RESET,
        primary: EffectTag::ContentReset,
        alias: EffectTag::DidDefer,
        alias_kinds: &[NodeKind::Suspense],
    },
    AliasedBit {
        bit: Flags::SNAPSHOT,
        primary: EffectTag::Snapshot,
        alias: EffectTag::FormReset,
        alias_kinds: &[NodeKind::HostComponent],
    },
];

impl NodeKind {
    /// Whether a node of this kind may carry `tag`.
    pub fn accepts(self, tag: EffectTag) -> bool {
        match tag.aliased_bit() {
            Some(entry) => entry.meaning_for(self) == tag,
            None => true,
        }
    }
}

// =============================================================================
// KindFlags
// =============================================================================

/// Flags of one node together with its kind.
///
/// Storage is a plain [`Flags`] word; only tag insertion is kind-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindFlags {
    kind: NodeKind,
    flags: Flags,
}

impl KindFlags {
    pub const fn new(kind: NodeKind) -> Self {
        Self { kind, flags: Flags::NO_FLAGS }
    }

    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Set a tag, refusing meanings that clash with this node's kind.
    pub fn insert(&mut self, tag: EffectTag) -> Result<(), FlagError> {
        if !self.kind.accepts(tag) {
            return Err(FlagError::AliasConflict { tag, kind: self.kind });
        }
        self.flags |= tag.bits();
        Ok(())
    }

    pub fn remove(&mut self, tag: EffectTag) {
        self.flags.remove(tag.bits());
    }

    /// Whether `tag` is set under the meaning this kind gives its bit.
    pub fn contains(&self, tag: EffectTag) -> bool {
        self.kind.accepts(tag) && self.flags.contains(tag.bits())
    }

    /// Keep only the bits in `mask`.
    pub fn retain(&mut self, mask: Flags) {
        self.flags &= mask;
    }

    /// What `bit` means on this node's kind, whether or not it is set.
    ///
    /// `None` unless `bit` is exactly one catalog bit.
    pub fn meaning(&self, bit: Flags) -> Option<EffectTag> {
        // Exactly one tag per bit is accepted for a given kind.
        ALL_TAGS
            .iter()
            .copied()
            .find(|tag| tag.bits() == bit && self.kind.accepts(*tag))
    }

    /// Named meanings of the bits currently set, resolved for this kind.
    pub fn tags(&self) -> impl Iterator<Item = EffectTag> + '_ {
        self.flags.iter().filter_map(move |bit| self.meaning(bit))
    }
}

const ALL_TAGS: [EffectTag; 32] = [
    EffectTag::PerformedWork,
    EffectTag::Placement,
    EffectTag::Update,
    EffectTag::Cloned,
    EffectTag::ChildDeletion,
    EffectTag::ContentReset,
    EffectTag::Callback,
    EffectTag::DidCapture,
    EffectTag::ForceClientRender,
    EffectTag::Ref,
    EffectTag::Snapshot,
    EffectTag::Passive,
    EffectTag::Hydrating,
    EffectTag::Visibility,
    EffectTag::StoreConsistency,
    EffectTag::ScheduleRetry,
    EffectTag::ShouldSuspendCommit,
    EffectTag::DidDefer,
    EffectTag::FormReset,
    EffectTag::Incomplete,
    EffectTag::ShouldCapture,
    EffectTag::ForceUpdateForLegacySuspense,
    EffectTag::DidPropagateContext,
    EffectTag::NeedsPropagation,
    EffectTag::Forked,
    EffectTag::RefStatic,
    EffectTag::LayoutStatic,
    EffectTag::PassiveStatic,
    EffectTag::MaySuspendCommit,
    EffectTag::PlacementDev,
    EffectTag::MountLayoutDev,
    EffectTag::MountPassiveDev,
];
