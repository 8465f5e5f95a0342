//! Error types for flag bookkeeping and dispatcher slots.

use thiserror::Error;

use crate::dispatcher::SlotName;
use crate::flags::{EffectTag, NodeKind};
use crate::tree::NodeId;

/// Misuse of the flag model by a render or commit collaborator.
///
/// These are programming errors. Nothing here is retried or repaired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("{tag:?} shares its bit with another meaning on {kind:?} nodes")]
    AliasConflict { tag: EffectTag, kind: NodeKind },

    #[error("no node with id {0:?}")]
    UnknownNode(NodeId),

    #[error("cannot complete {parent:?} before its child {child:?}")]
    ChildNotCompleted { parent: NodeId, child: NodeId },

    #[error("{0:?} was not reached by a completed render")]
    NotCompleted(NodeId),
}

/// Failure to use a capability through a dispatcher slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{caller} was invoked outside of a supported execution context (no {slot} installed)")]
    OutsideContext { slot: SlotName, caller: &'static str },

    #[error(
        "invalid hook call: hooks can only be called inside the body of a component while it renders"
    )]
    InvalidHookCall,

    #[error("cached value for {type_name} has a different type")]
    CacheTypeMismatch { type_name: &'static str },
}
