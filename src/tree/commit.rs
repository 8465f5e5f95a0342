//! Commit traversal with subtree pruning.
//!
//! Each commit phase walks the completed tree once. A node's children are only
//! entered when its subtree flags intersect the phase mask, so subtrees with
//! nothing to do cost one check at their root.
//!
//! Children are committed before their parent, matching the order host
//! mutations and layout callbacks need.
//!
//! A walk first checks every node it is going to enter. If any of them was not
//! reached by a completed render the walk fails before the visitor sees a
//! single node, so a host is never left half-mutated. Both passes use an
//! explicit stack, so tree depth is bounded by memory rather than the call
//! stack.

use tracing::{debug, trace};

use super::{EffectTree, NodeId};
use crate::error::FlagError;
use crate::flags::{
    BEFORE_MUTATION_MASK, Flags, LAYOUT_MASK, MUTATION_MASK, NodeKind, PASSIVE_MASK,
};

// =============================================================================
// Phases
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitPhase {
    BeforeMutation,
    Mutation,
    Layout,
    Passive,
}

impl CommitPhase {
    /// Phases in the order a commit runs them.
    pub const ALL: [CommitPhase; 4] = [
        CommitPhase::BeforeMutation,
        CommitPhase::Mutation,
        CommitPhase::Layout,
        CommitPhase::Passive,
    ];

    pub const fn mask(self) -> Flags {
        match self {
            CommitPhase::BeforeMutation => BEFORE_MUTATION_MASK,
            CommitPhase::Mutation => MUTATION_MASK,
            CommitPhase::Layout => LAYOUT_MASK,
            CommitPhase::Passive => PASSIVE_MASK,
        }
    }
}

// =============================================================================
// Visitor
// =============================================================================

/// Receives nodes during a commit walk.
pub trait CommitVisitor {
    /// Called for every node the walk enters, effects or not.
    fn enter(&mut self, _id: NodeId) {}

    /// Called for a node whose own flags intersect the phase mask.
    /// `flags` is already restricted to the mask.
    fn commit(&mut self, id: NodeId, kind: NodeKind, flags: Flags);
}

impl<F> CommitVisitor for F
where
    F: FnMut(NodeId, NodeKind, Flags),
{
    fn commit(&mut self, id: NodeId, kind: NodeKind, flags: Flags) {
        self(id, kind, flags)
    }
}

/// Counters from one commit walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitStats {
    /// Nodes entered.
    pub visited: usize,
    /// Nodes handed to [`CommitVisitor::commit`].
    pub effects: usize,
    /// Nodes whose children were not entered.
    pub skipped_subtrees: usize,
}

// =============================================================================
// Walk
// =============================================================================

impl EffectTree {
    /// Whether the commit walk for `phase` has to enter the children of `id`.
    pub fn needs_subtree_visit(&self, id: NodeId, phase: CommitPhase) -> Result<bool, FlagError> {
        Ok(self.subtree_flags(id)?.intersects(phase.mask()))
    }

    /// Run one commit phase from `root`.
    ///
    /// Every node the walk enters must have been completed by the render pass.
    /// Otherwise nothing is committed and the first such node is reported.
    pub fn commit_walk<V>(
        &self,
        root: NodeId,
        phase: CommitPhase,
        visitor: &mut V,
    ) -> Result<CommitStats, FlagError>
    where
        V: CommitVisitor + ?Sized,
    {
        self.check(root)?;
        let mask = phase.mask();
        self.check_reached(root, mask)?;
        let stats = self.visit(root, mask, visitor);
        debug!(
            ?phase,
            visited = stats.visited,
            effects = stats.effects,
            skipped = stats.skipped_subtrees,
            "commit phase done"
        );
        Ok(stats)
    }

    /// Run every phase in order.
    pub fn commit_all<V>(&self, root: NodeId, visitor: &mut V) -> Result<CommitStats, FlagError>
    where
        V: CommitVisitor + ?Sized,
    {
        let mut total = CommitStats::default();
        for phase in CommitPhase::ALL {
            let stats = self.commit_walk(root, phase, visitor)?;
            total.visited += stats.visited;
            total.effects += stats.effects;
            total.skipped_subtrees += stats.skipped_subtrees;
        }
        Ok(total)
    }

    /// Walk the nodes a `mask` commit would enter, without committing.
    fn check_reached(&self, root: NodeId, mask: Flags) -> Result<(), FlagError> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.completed[id.0] {
                return Err(FlagError::NotCompleted(id));
            }
            if self.subtree_flags[id.0].intersects(mask) {
                stack.extend(self.children[id.0].iter().rev());
            }
        }
        Ok(())
    }

    fn visit<V>(&self, root: NodeId, mask: Flags, visitor: &mut V) -> CommitStats
    where
        V: CommitVisitor + ?Sized,
    {
        let mut stats = CommitStats::default();
        // (node, children already pushed)
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                let own = self.flags[id.0].flags() & mask;
                if !own.is_empty() {
                    stats.effects += 1;
                    visitor.commit(id, self.flags[id.0].kind(), own);
                }
                continue;
            }

            stats.visited += 1;
            visitor.enter(id);
            stack.push((id, true));

            let children = &self.children[id.0];
            if self.subtree_flags[id.0].intersects(mask) {
                stack.extend(children.iter().rev().map(|&child| (child, false)));
            } else if !children.is_empty() {
                trace!(node = id.0, "skipping subtree");
                stats.skipped_subtrees += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::EffectTag;

    #[derive(Default)]
    struct Recorder {
        entered: Vec<NodeId>,
        committed: Vec<(NodeId, Flags)>,
    }

    impl CommitVisitor for Recorder {
        fn enter(&mut self, id: NodeId) {
            self.entered.push(id);
        }

        fn commit(&mut self, id: NodeId, _kind: NodeKind, flags: Flags) {
            self.committed.push((id, flags));
        }
    }

    /// root ─┬─ a ── a1 ── a2 (UPDATE)
    ///       └─ b ── b1
    fn sample() -> (EffectTree, [NodeId; 6]) {
        let mut tree = EffectTree::new();
        let root = tree.add_root(NodeKind::HostRoot);
        let a = tree.add_child(root, NodeKind::FunctionComponent).unwrap();
        let a1 = tree.add_child(a, NodeKind::HostComponent).unwrap();
        let a2 = tree.add_child(a1, NodeKind::HostText).unwrap();
        let b = tree.add_child(root, NodeKind::FunctionComponent).unwrap();
        let b1 = tree.add_child(b, NodeKind::HostComponent).unwrap();
        tree.mark(a2, EffectTag::Update).unwrap();
        tree.complete_all(root).unwrap();
        (tree, [root, a, a1, a2, b, b1])
    }

    #[test]
    fn test_phase_masks() {
        assert_eq!(CommitPhase::Mutation.mask(), MUTATION_MASK);
        assert_eq!(CommitPhase::Layout.mask(), LAYOUT_MASK);
        assert_eq!(CommitPhase::Passive.mask(), PASSIVE_MASK);
        assert_eq!(CommitPhase::BeforeMutation.mask(), BEFORE_MUTATION_MASK);
    }

    #[test]
    fn test_walk_skips_clean_sibling_subtree() {
        let (tree, [root, a, a1, a2, b, b1]) = sample();
        let mut recorder = Recorder::default();
        let stats = tree.commit_walk(root, CommitPhase::Mutation, &mut recorder).unwrap();

        assert_eq!(recorder.entered, vec![root, a, a1, a2, b]);
        assert!(!recorder.entered.contains(&b1));
        assert_eq!(recorder.committed, vec![(a2, Flags::UPDATE)]);
        assert_eq!(stats.skipped_subtrees, 1);
        assert_eq!(stats.effects, 1);
        assert!(!tree.needs_subtree_visit(b, CommitPhase::Mutation).unwrap());
    }

    #[test]
    fn test_walk_prunes_by_phase_mask() {
        let (tree, [root, ..]) = sample();
        let mut recorder = Recorder::default();
        let stats = tree.commit_walk(root, CommitPhase::Passive, &mut recorder).unwrap();

        // UPDATE means nothing to the passive phase.
        assert_eq!(recorder.entered, vec![root]);
        assert!(recorder.committed.is_empty());
        assert_eq!(stats.visited, 1);
    }

    #[test]
    fn test_children_commit_before_parent() {
        let mut tree = EffectTree::new();
        let root = tree.add_root(NodeKind::HostRoot);
        let parent = tree.add_child(root, NodeKind::HostComponent).unwrap();
        let child = tree.add_child(parent, NodeKind::HostText).unwrap();
        tree.mark(parent, EffectTag::Placement).unwrap();
        tree.mark(child, EffectTag::Placement).unwrap();
        tree.complete_all(root).unwrap();

        let mut order = Vec::new();
        let mut visitor = |id: NodeId, _: NodeKind, _: Flags| order.push(id);
        tree.commit_walk(root, CommitPhase::Mutation, &mut visitor).unwrap();
        assert_eq!(order, vec![child, parent]);
    }

    #[test]
    fn test_walk_refuses_uncompleted_root() {
        let (mut tree, [root, _, a1, ..]) = sample();
        tree.abandon(a1).unwrap();
        let mut recorder = Recorder::default();
        assert_eq!(
            tree.commit_walk(root, CommitPhase::Mutation, &mut recorder),
            Err(FlagError::NotCompleted(root))
        );
        assert!(recorder.entered.is_empty());
    }

    #[test]
    fn test_walk_fails_before_any_commit() {
        // root ─┬─ b (PLACEMENT)
        //       └─ a ── a1 (PLACEMENT)
        let mut tree = EffectTree::new();
        let root = tree.add_root(NodeKind::HostRoot);
        let b = tree.add_child(root, NodeKind::HostComponent).unwrap();
        let a = tree.add_child(root, NodeKind::FunctionComponent).unwrap();
        let a1 = tree.add_child(a, NodeKind::HostComponent).unwrap();
        tree.mark(b, EffectTag::Placement).unwrap();
        tree.mark(a1, EffectTag::Placement).unwrap();
        tree.complete_all(root).unwrap();

        // A stale node below a completed root, reached only after `b`.
        tree.completed[a1.0] = false;
        let mut recorder = Recorder::default();
        assert_eq!(
            tree.commit_walk(root, CommitPhase::Mutation, &mut recorder),
            Err(FlagError::NotCompleted(a1))
        );
        assert!(recorder.entered.is_empty());
        assert!(recorder.committed.is_empty());
    }

    #[test]
    fn test_clone_of_inner_subtree_blocks_commit() {
        let mut tree = EffectTree::new();
        let root = tree.add_root(NodeKind::HostRoot);
        let b = tree.add_child(root, NodeKind::HostComponent).unwrap();
        let a = tree.add_child(root, NodeKind::FunctionComponent).unwrap();
        let a1 = tree.add_child(a, NodeKind::HostComponent).unwrap();
        tree.mark(b, EffectTag::Placement).unwrap();
        tree.mark(a1, EffectTag::Placement).unwrap();
        tree.complete_all(root).unwrap();

        tree.clone_for_next_render(a).unwrap();
        let mut recorder = Recorder::default();
        assert_eq!(
            tree.commit_walk(root, CommitPhase::Mutation, &mut recorder),
            Err(FlagError::NotCompleted(root))
        );
        assert!(recorder.committed.is_empty());

        tree.complete_all(root).unwrap();
        tree.commit_walk(root, CommitPhase::Mutation, &mut recorder).unwrap();
        assert_eq!(recorder.committed, vec![(b, Flags::PLACEMENT)]);
    }

    #[test]
    fn test_mark_after_completion_is_not_skipped() {
        let mut tree = EffectTree::new();
        let root = tree.add_root(NodeKind::HostRoot);
        let a = tree.add_child(root, NodeKind::FunctionComponent).unwrap();
        let leaf = tree.add_child(a, NodeKind::HostText).unwrap();
        tree.complete_all(root).unwrap();

        tree.mark(leaf, EffectTag::Update).unwrap();
        let mut recorder = Recorder::default();
        assert_eq!(
            tree.commit_walk(root, CommitPhase::Mutation, &mut recorder),
            Err(FlagError::NotCompleted(root))
        );

        tree.complete_all(root).unwrap();
        tree.commit_walk(root, CommitPhase::Mutation, &mut recorder).unwrap();
        assert_eq!(recorder.committed, vec![(leaf, Flags::UPDATE)]);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut tree = EffectTree::new();
        let root = tree.add_root(NodeKind::HostRoot);
        let mut leaf = root;
        for _ in 0..100_000 {
            leaf = tree.add_child(leaf, NodeKind::HostComponent).unwrap();
        }
        tree.mark(leaf, EffectTag::Placement).unwrap();
        tree.complete_all(root).unwrap();

        let mut recorder = Recorder::default();
        let stats = tree.commit_walk(root, CommitPhase::Mutation, &mut recorder).unwrap();
        assert_eq!(stats.visited, 100_001);
        assert_eq!(recorder.committed, vec![(leaf, Flags::PLACEMENT)]);
    }

    #[test]
    fn test_commit_all_runs_every_phase() {
        let (tree, [root, ..]) = sample();
        let mut recorder = Recorder::default();
        let stats = tree.commit_all(root, &mut recorder).unwrap();
        // UPDATE is in the before-mutation, mutation and layout masks.
        assert_eq!(stats.effects, 3);
    }
}
