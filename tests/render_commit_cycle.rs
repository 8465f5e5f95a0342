//! Render, complete, commit and clone a small tree end to end, with a hook
//! dispatcher installed for the render pass.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use spark_fiber::{
    CommitPhase, CommitVisitor, DispatchError, DispatcherKind, EffectTag, EffectTree, Flags,
    HookDispatcher, NodeId, NodeKind, SharedInternals, SlotName, HOST_EFFECT_MASK,
};

struct RenderDispatcher {
    renders: Cell<u32>,
}

impl HookDispatcher for RenderDispatcher {
    fn kind(&self) -> DispatcherKind {
        DispatcherKind::Update
    }

    fn use_id(&self) -> Result<String, DispatchError> {
        self.renders.set(self.renders.get() + 1);
        Ok(format!("r{}", self.renders.get()))
    }
}

#[derive(Default)]
struct Entered(Vec<NodeId>);

impl CommitVisitor for Entered {
    fn enter(&mut self, id: NodeId) {
        self.0.push(id);
    }

    fn commit(&mut self, _id: NodeId, _kind: NodeKind, _flags: Flags) {}
}

/// app ─┬─ list ─┬─ item0 ── text0
///      │        └─ item1 ── text1 (UPDATE)
///      └─ footer ── label
struct App {
    tree: EffectTree,
    app: NodeId,
    list: NodeId,
    item0: NodeId,
    text0: NodeId,
    item1: NodeId,
    text1: NodeId,
    footer: NodeId,
    label: NodeId,
}

fn build() -> App {
    let mut tree = EffectTree::new();
    let app = tree.add_root(NodeKind::HostRoot);
    let list = tree.add_child(app, NodeKind::FunctionComponent).unwrap();
    let item0 = tree.add_child(list, NodeKind::HostComponent).unwrap();
    let text0 = tree.add_child(item0, NodeKind::HostText).unwrap();
    let item1 = tree.add_child(list, NodeKind::HostComponent).unwrap();
    let text1 = tree.add_child(item1, NodeKind::HostText).unwrap();
    let footer = tree.add_child(app, NodeKind::FunctionComponent).unwrap();
    let label = tree.add_child(footer, NodeKind::HostText).unwrap();
    App { tree, app, list, item0, text0, item1, text1, footer, label }
}

#[test]
fn deep_update_marks_ancestors_and_skips_siblings() {
    let internals = SharedInternals::new();
    let mut app = build();

    let dispatcher: Rc<dyn HookDispatcher> = Rc::new(RenderDispatcher { renders: Cell::new(0) });
    internals.dispatcher().scoped(dispatcher, || {
        assert_eq!(internals.use_id().unwrap(), "r1");
        app.tree.mark(app.text1, EffectTag::Update).unwrap();
        app.tree.mark(app.list, EffectTag::PassiveStatic).unwrap();
        app.tree.complete_all(app.app).unwrap();
    });
    assert!(!internals.dispatcher().is_installed());

    for ancestor in [app.item1, app.list, app.app] {
        assert!(app.tree.subtree_flags(ancestor).unwrap().intersects(HOST_EFFECT_MASK));
    }
    for clean in [app.item0, app.footer, app.text0, app.label] {
        assert_eq!(app.tree.subtree_flags(clean).unwrap(), Flags::NO_FLAGS);
    }

    let mut entered = Entered::default();
    let stats = app
        .tree
        .commit_walk(app.app, CommitPhase::Mutation, &mut entered)
        .unwrap();
    assert!(!entered.0.contains(&app.text0));
    assert!(!entered.0.contains(&app.label));
    assert!(entered.0.contains(&app.text1));
    assert_eq!(stats.effects, 1);
    assert_eq!(stats.skipped_subtrees, 2);
}

#[test]
fn clone_carries_static_flags_into_next_render() {
    let mut app = build();
    app.tree.mark(app.list, EffectTag::PassiveStatic).unwrap();
    app.tree.mark(app.list, EffectTag::Update).unwrap();
    app.tree.complete_all(app.app).unwrap();

    app.tree.clone_for_next_render(app.app).unwrap();
    assert_eq!(app.tree.flags(app.list).unwrap(), Flags::PASSIVE_STATIC);
    assert_eq!(app.tree.subtree_flags(app.app).unwrap(), Flags::PASSIVE_STATIC);

    // Nothing committable until the next render completes.
    let mut entered = Entered::default();
    assert!(app.tree.commit_walk(app.app, CommitPhase::Passive, &mut entered).is_err());

    app.tree.complete_all(app.app).unwrap();
    let stats = app.tree.commit_all(app.app, &mut entered).unwrap();
    assert_eq!(stats.effects, 0);
}

#[test]
fn failed_render_restores_dispatcher_and_discards_work() {
    let internals = SharedInternals::new();
    let mut app = build();

    let result = catch_unwind(AssertUnwindSafe(|| {
        let dispatcher: Rc<dyn HookDispatcher> =
            Rc::new(RenderDispatcher { renders: Cell::new(0) });
        let _guard = internals.dispatcher().install(dispatcher);
        app.tree.mark(app.text0, EffectTag::Placement).unwrap();
        panic!("component threw during render");
    }));
    assert!(result.is_err());
    assert!(internals.dispatcher().get().is_none());

    app.tree.abandon(app.app).unwrap();
    assert_eq!(app.tree.flags(app.text0).unwrap(), Flags::NO_FLAGS);

    assert_eq!(
        internals.use_id(),
        Err(DispatchError::OutsideContext { slot: SlotName::Dispatcher, caller: "use_id" })
    );
}

#[test]
fn aliased_bits_are_checked_per_kind() {
    let mut tree = EffectTree::new();
    let root = tree.add_root(NodeKind::HostRoot);
    let boundary = tree.add_child(root, NodeKind::Suspense).unwrap();
    let form = tree.add_child(boundary, NodeKind::HostComponent).unwrap();

    tree.mark(boundary, EffectTag::ScheduleRetry).unwrap();
    tree.mark(form, EffectTag::FormReset).unwrap();
    assert!(tree.mark(form, EffectTag::Snapshot).is_err());
    assert!(tree.mark(root, EffectTag::ScheduleRetry).is_err());

    let tags: Vec<_> = tree.kind_flags(form).unwrap().tags().collect();
    assert_eq!(tags, vec![EffectTag::FormReset]);
}
