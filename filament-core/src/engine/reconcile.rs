//! Reconciliation
//!
//! The positional diff: walk the old fiber children (via the work-in-progress
//! fiber's alternate) and the new element sequence in lockstep, one slot at a
//! time, producing tagged fibers linked into the new tree.
//!
//! # Rules Per Slot
//!
//! - Same type on both sides: reuse the old fiber's type and host handle,
//!   adopt the new props, link `alternate`, tag `Update`.
//! - New element, types differ (or no old fiber): fresh fiber with no handle
//!   and no alternate, tag `Placement`.
//! - Old fiber, types differ (or no new element): tag the old fiber
//!   `Deletion` and record it on the per-pass deletions list; it never joins
//!   the new tree.
//!
//! The middle two rules both fire when a slot changes type: positional
//! replace, not move detection. Reordering children therefore reads as
//! replacement of every shifted slot, and the observable commit sequences
//! depend on exactly that.

use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId, FiberKind};

/// Diff `wip`'s new child elements against its alternate's children, linking
/// produced fibers into the work-in-progress tree in new-index order.
pub(crate) fn reconcile_children(
    arena: &mut FiberArena,
    deletions: &mut Vec<FiberId>,
    wip: FiberId,
    elements: &[Element],
) {
    let mut index = 0usize;
    let mut old_fiber = arena
        .get(wip)
        .and_then(|f| f.alternate)
        .and_then(|alt| arena.get(alt))
        .and_then(|alt| alt.child);
    let mut prev_sibling: Option<FiberId> = None;

    while index < elements.len() || old_fiber.is_some() {
        let element = elements.get(index);
        let same_type = match (old_fiber, element) {
            (Some(old), Some(el)) => arena
                .get(old)
                .map_or(false, |f| f.kind.same_type(el.kind())),
            _ => false,
        };

        let mut new_fiber: Option<FiberId> = None;

        if same_type {
            if let (Some(old), Some(el)) = (old_fiber, element) {
                let (kind, host_node) = {
                    let f = arena.get(old).map(|f| (f.kind.clone(), f.host_node));
                    f.unwrap_or((FiberKind::from_element(el.kind()), None))
                };
                let mut fiber = Fiber::new(kind, el.props().clone());
                fiber.parent = Some(wip);
                fiber.alternate = Some(old);
                fiber.host_node = host_node;
                fiber.effect_tag = EffectTag::Update;
                new_fiber = Some(arena.insert(fiber));
            }
        }

        if !same_type {
            if let Some(el) = element {
                let mut fiber = Fiber::new(FiberKind::from_element(el.kind()), el.props().clone());
                fiber.parent = Some(wip);
                fiber.effect_tag = EffectTag::Placement;
                new_fiber = Some(arena.insert(fiber));
            }

            if let Some(old) = old_fiber {
                if let Some(f) = arena.get_mut(old) {
                    f.effect_tag = EffectTag::Deletion;
                }
                deletions.push(old);
            }
        }

        if let Some(old) = old_fiber {
            old_fiber = arena.get(old).and_then(|f| f.sibling);
        }

        if index == 0 {
            if let Some(f) = arena.get_mut(wip) {
                f.child = new_fiber;
            }
        } else if element.is_some() {
            if let Some(prev) = prev_sibling {
                if let Some(f) = arena.get_mut(prev) {
                    f.sibling = new_fiber;
                }
            }
        }

        prev_sibling = new_fiber;
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Props;
    use crate::host::{HostBackend, HostNodeId, MemoryHost};

    fn root_pair(arena: &mut FiberArena) -> (FiberId, FiberId) {
        let old_root = arena.insert(Fiber::new(
            FiberKind::Root(HostNodeId::default()),
            Props::new(),
        ));
        let mut wip = Fiber::new(FiberKind::Root(HostNodeId::default()), Props::new());
        wip.alternate = Some(old_root);
        let wip_root = arena.insert(wip);
        (old_root, wip_root)
    }

    fn link_children(arena: &mut FiberArena, parent: FiberId, children: &[FiberId]) {
        let mut prev: Option<FiberId> = None;
        for &child in children {
            arena.get_mut(child).unwrap().parent = Some(parent);
            match prev {
                None => arena.get_mut(parent).unwrap().child = Some(child),
                Some(p) => arena.get_mut(p).unwrap().sibling = Some(child),
            }
            prev = Some(child);
        }
    }

    fn collect_children(arena: &FiberArena, parent: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut cursor = arena.get(parent).unwrap().child;
        while let Some(id) = cursor {
            out.push(id);
            cursor = arena.get(id).unwrap().sibling;
        }
        out
    }

    #[test]
    fn fresh_children_are_placements() {
        let mut arena = FiberArena::new();
        let mut deletions = Vec::new();
        let wip = arena.insert(Fiber::new(
            FiberKind::Root(HostNodeId::default()),
            Props::new(),
        ));

        let elements = [Element::host("div"), Element::text("x")];
        reconcile_children(&mut arena, &mut deletions, wip, &elements);

        let children = collect_children(&arena, wip);
        assert_eq!(children.len(), 2);
        for id in &children {
            let f = arena.get(*id).unwrap();
            assert_eq!(f.effect_tag, EffectTag::Placement);
            assert!(f.alternate.is_none());
            assert!(f.host_node.is_none());
            assert_eq!(f.parent, Some(wip));
        }
        assert!(deletions.is_empty());
    }

    #[test]
    fn same_type_reuses_host_node_and_links_alternate() {
        let mut host = MemoryHost::new();
        let node = host.create_element("div").unwrap();

        let mut arena = FiberArena::new();
        let mut deletions = Vec::new();
        let (old_root, wip_root) = root_pair(&mut arena);

        let mut old_child = Fiber::new(FiberKind::Host("div".into()), Props::new());
        old_child.host_node = Some(node);
        let old_child = arena.insert(old_child);
        link_children(&mut arena, old_root, &[old_child]);

        let elements = [Element::host("div").attr("id", "fresh")];
        reconcile_children(&mut arena, &mut deletions, wip_root, &elements);

        let children = collect_children(&arena, wip_root);
        assert_eq!(children.len(), 1);
        let f = arena.get(children[0]).unwrap();
        assert_eq!(f.effect_tag, EffectTag::Update);
        assert_eq!(f.alternate, Some(old_child));
        assert_eq!(f.host_node, Some(node));
        assert_eq!(f.props.str("id"), Some("fresh"));
        assert!(deletions.is_empty());
    }

    #[test]
    fn type_change_produces_deletion_and_placement_for_one_slot() {
        let mut arena = FiberArena::new();
        let mut deletions = Vec::new();
        let (old_root, wip_root) = root_pair(&mut arena);

        let old_span = arena.insert(Fiber::new(FiberKind::Host("span".into()), Props::new()));
        link_children(&mut arena, old_root, &[old_span]);

        let elements = [Element::host("p")];
        reconcile_children(&mut arena, &mut deletions, wip_root, &elements);

        let children = collect_children(&arena, wip_root);
        assert_eq!(children.len(), 1);
        let new = arena.get(children[0]).unwrap();
        assert_eq!(new.effect_tag, EffectTag::Placement);
        assert!(new.alternate.is_none());

        assert_eq!(deletions, vec![old_span]);
        assert_eq!(
            arena.get(old_span).unwrap().effect_tag,
            EffectTag::Deletion
        );
    }

    #[test]
    fn shrinking_children_deletes_every_excess_sibling() {
        let mut arena = FiberArena::new();
        let mut deletions = Vec::new();
        let (old_root, wip_root) = root_pair(&mut arena);

        let a = arena.insert(Fiber::new(FiberKind::Host("li".into()), Props::new()));
        let b = arena.insert(Fiber::new(FiberKind::Host("li".into()), Props::new()));
        let c = arena.insert(Fiber::new(FiberKind::Host("li".into()), Props::new()));
        link_children(&mut arena, old_root, &[a, b, c]);

        let elements = [Element::host("li")];
        reconcile_children(&mut arena, &mut deletions, wip_root, &elements);

        assert_eq!(collect_children(&arena, wip_root).len(), 1);
        assert_eq!(deletions, vec![b, c]);
        assert_eq!(arena.get(b).unwrap().effect_tag, EffectTag::Deletion);
        assert_eq!(arena.get(c).unwrap().effect_tag, EffectTag::Deletion);
    }

    #[test]
    fn growing_children_places_the_tail() {
        let mut arena = FiberArena::new();
        let mut deletions = Vec::new();
        let (old_root, wip_root) = root_pair(&mut arena);

        let a = arena.insert(Fiber::new(FiberKind::Host("li".into()), Props::new()));
        link_children(&mut arena, old_root, &[a]);

        let elements = [Element::host("li"), Element::host("li")];
        reconcile_children(&mut arena, &mut deletions, wip_root, &elements);

        let children = collect_children(&arena, wip_root);
        assert_eq!(children.len(), 2);
        assert_eq!(
            arena.get(children[0]).unwrap().effect_tag,
            EffectTag::Update
        );
        assert_eq!(
            arena.get(children[1]).unwrap().effect_tag,
            EffectTag::Placement
        );
        assert!(deletions.is_empty());
    }
}
