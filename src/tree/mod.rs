//! Effect Tree - Node flags, subtree flags and their propagation.
//!
//! Nodes are NOT objects. They are indices into parallel arrays:
//!
//! ```text
//! NodeId 0: HostRoot      (parent=None, flags=0,      subtree=UPDATE)
//! NodeId 1: HostComponent (parent=0,    flags=0,      subtree=UPDATE)
//! NodeId 2: HostText      (parent=1,    flags=UPDATE, subtree=0)
//! ```
//!
//! The render pass marks each node's own flags, then completes nodes bottom-up.
//! Completing a node folds every child's `flags | subtree_flags` into the
//! node's `subtree_flags`, which lets the commit pass in [`commit`] decide in
//! O(1) whether a subtree holds anything for the current phase.
//!
//! # Ordering
//!
//! A node may only be completed after all of its children. Completion is total:
//! every child is folded in, there is no early exit. [`EffectTree::complete_work`]
//! refuses to run out of order rather than producing a subtree summary that
//! could hide pending work.
//!
//! A completed node stays completed only while its summary is current. Any
//! change below it (a new child, a new mark, a clone or an abandoned subtree)
//! clears the completed state of the changed node and every ancestor, so the
//! commit walk refuses the tree until it is completed again.

pub mod commit;

pub use commit::*;

use tracing::debug;

use crate::error::FlagError;
use crate::flags::{EffectTag, Flags, KindFlags, NodeKind, PROPAGATED_MASK, STATIC_MASK};

/// Handle of a node in an [`EffectTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

// =============================================================================
// EffectTree
// =============================================================================

/// Arena of nodes with per-node flags and subtree flags.
#[derive(Debug, Default, Clone)]
pub struct EffectTree {
    flags: Vec<KindFlags>,
    subtree_flags: Vec<Flags>,
    parent: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    completed: Vec<bool>,
}

impl EffectTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Add a node with no parent.
    pub fn add_root(&mut self, kind: NodeKind) -> NodeId {
        self.push(kind, None)
    }

    /// Append a node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, FlagError> {
        self.check(parent)?;
        let id = self.push(kind, Some(parent));
        self.children[parent.0].push(id);
        self.invalidate(parent);
        Ok(id)
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.flags.len());
        self.flags.push(KindFlags::new(kind));
        self.subtree_flags.push(Flags::NO_FLAGS);
        self.parent.push(parent);
        self.children.push(Vec::new());
        self.completed.push(false);
        id
    }

    fn check(&self, id: NodeId) -> Result<(), FlagError> {
        if id.0 < self.flags.len() {
            Ok(())
        } else {
            Err(FlagError::UnknownNode(id))
        }
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, FlagError> {
        self.check(id)?;
        Ok(self.parent[id.0])
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], FlagError> {
        self.check(id)?;
        Ok(&self.children[id.0])
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, FlagError> {
        self.check(id)?;
        Ok(self.flags[id.0].kind())
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    /// This render's own flags for `id`.
    pub fn flags(&self, id: NodeId) -> Result<Flags, FlagError> {
        self.check(id)?;
        Ok(self.flags[id.0].flags())
    }

    /// Union of descendants' flags. Meaningful once `id` is completed.
    pub fn subtree_flags(&self, id: NodeId) -> Result<Flags, FlagError> {
        self.check(id)?;
        Ok(self.subtree_flags[id.0])
    }

    pub fn kind_flags(&self, id: NodeId) -> Result<&KindFlags, FlagError> {
        self.check(id)?;
        Ok(&self.flags[id.0])
    }

    /// Record pending work on `id`, checked against the node's kind.
    ///
    /// Marking a completed node uncompletes it and its ancestors.
    pub fn mark(&mut self, id: NodeId, tag: EffectTag) -> Result<(), FlagError> {
        self.check(id)?;
        self.flags[id.0].insert(tag)?;
        self.invalidate(id);
        Ok(())
    }

    pub fn is_completed(&self, id: NodeId) -> Result<bool, FlagError> {
        self.check(id)?;
        Ok(self.completed[id.0])
    }

    // -------------------------------------------------------------------------
    // Completion
    // -------------------------------------------------------------------------

    /// Complete `id`: fold its children's flags into its subtree flags.
    ///
    /// Every child must already be completed. Only bits in
    /// [`PROPAGATED_MASK`] travel upward.
    pub fn complete_work(&mut self, id: NodeId) -> Result<Flags, FlagError> {
        self.check(id)?;
        let mut subtree = Flags::NO_FLAGS;
        for &child in &self.children[id.0] {
            if !self.completed[child.0] {
                return Err(FlagError::ChildNotCompleted { parent: id, child });
            }
            subtree |= self.flags[child.0].flags() | self.subtree_flags[child.0];
        }
        subtree &= PROPAGATED_MASK;
        self.subtree_flags[id.0] = subtree;
        self.completed[id.0] = true;
        Ok(subtree)
    }

    /// Complete `id` whose children were reused without re-rendering.
    ///
    /// Reused children carry no new work, so only static facts are folded in.
    /// The whole subtree counts as reached by this render.
    pub fn bailout(&mut self, id: NodeId) -> Result<Flags, FlagError> {
        self.check(id)?;
        let mut subtree = Flags::NO_FLAGS;
        for &child in &self.children[id.0] {
            subtree |= self.flags[child.0].flags() | self.subtree_flags[child.0];
        }
        subtree &= STATIC_MASK;
        self.subtree_flags[id.0] = subtree;
        for node in self.descendants(id) {
            self.completed[node.0] = true;
        }
        Ok(subtree)
    }

    /// Complete every node under `root` (inclusive) in post-order.
    pub fn complete_all(&mut self, root: NodeId) -> Result<Flags, FlagError> {
        self.check(root)?;
        let order = self.post_order(root);
        let mut last = Flags::NO_FLAGS;
        for id in order {
            last = self.complete_work(id)?;
        }
        Ok(last)
    }

    // -------------------------------------------------------------------------
    // Next render
    // -------------------------------------------------------------------------

    /// Prepare the subtree at `root` for the next render.
    ///
    /// Static bits survive on both flags and subtree flags; everything else is
    /// cleared. The subtree and its ancestors await completion again.
    pub fn clone_for_next_render(&mut self, root: NodeId) -> Result<(), FlagError> {
        self.check(root)?;
        self.reset_subtree(root);
        Ok(())
    }

    /// Throw away work-in-progress for the subtree at `root`.
    ///
    /// Ancestors lose their completed state too, since their subtree flags
    /// summarized the discarded nodes.
    pub fn abandon(&mut self, root: NodeId) -> Result<(), FlagError> {
        self.check(root)?;
        let nodes = self.reset_subtree(root);
        debug!(root = root.0, nodes, "abandoning work in progress");
        Ok(())
    }

    /// Keep only static bits below `root` and uncomplete the subtree and its
    /// ancestors. Returns the number of nodes reset.
    fn reset_subtree(&mut self, root: NodeId) -> usize {
        self.invalidate(root);
        let nodes = self.descendants(root);
        for &id in &nodes {
            self.flags[id.0].retain(STATIC_MASK);
            self.subtree_flags[id.0] &= STATIC_MASK;
            self.completed[id.0] = false;
        }
        nodes.len()
    }

    /// Uncomplete `id` and every ancestor.
    ///
    /// A completed node only ever has completed descendants, so the climb
    /// stops at the first node that is already uncompleted.
    fn invalidate(&mut self, id: NodeId) {
        let mut node = Some(id);
        while let Some(current) = node {
            if !self.completed[current.0] {
                break;
            }
            self.completed[current.0] = false;
            node = self.parent[current.0];
        }
    }

    // -------------------------------------------------------------------------
    // Traversal helpers
    // -------------------------------------------------------------------------

    /// `root` and everything below it, pre-order.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children[id.0].iter().rev());
        }
        out
    }

    /// `root` and everything below it, children before parents.
    fn post_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = self.descendants(root);
        order.reverse();
        order
    }
}
