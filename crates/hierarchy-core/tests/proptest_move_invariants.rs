//! Property tests for the tree mutator and the drag session.
//!
//! Random campaigns get random drops; whatever the outcome, the tree must stay
//! structurally valid, keep every own budget in the totals, and never change
//! on a rejected or cancelled drop.

use gpui_hierarchy_core::{
    Candidate, DropTarget, Hierarchy, HierarchyDnd, InsertionMode, MoveError, NodeDraft, Rect,
};
use proptest::prelude::*;
use proptest::sample::Index;

// Every container carries its own budget next to its children, so childless
// tactiques and placements with money in them show up regularly.
type Placement = (u32, Vec<u32>);
type Tactique = (u32, Vec<Placement>);
type Section = (u32, Vec<Tactique>);
type Shape = Vec<Section>;

fn own_budget() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0u32), 1u32..500]
}

fn shape() -> impl Strategy<Value = Shape> {
    let creatifs = prop::collection::vec(0u32..1_000, 0..3);
    let placements = prop::collection::vec((own_budget(), creatifs), 0..3);
    let tactiques = prop::collection::vec((own_budget(), placements), 0..3);
    prop::collection::vec((own_budget(), tactiques), 1..4)
}

fn mode() -> impl Strategy<Value = InsertionMode> {
    prop_oneof![
        Just(InsertionMode::Before),
        Just(InsertionMode::After),
        Just(InsertionMode::Inside),
    ]
}

fn build(shape: Shape) -> Hierarchy {
    let sections: Vec<NodeDraft> = shape
        .into_iter()
        .enumerate()
        .map(|(s, (own, tactiques))| {
            let tactiques: Vec<NodeDraft> = tactiques
                .into_iter()
                .enumerate()
                .map(|(t, (own, placements))| {
                    let placements: Vec<NodeDraft> = placements
                        .into_iter()
                        .enumerate()
                        .map(|(p, (own, budgets))| {
                            let creatifs: Vec<NodeDraft> = budgets
                                .into_iter()
                                .enumerate()
                                .map(|(c, budget)| {
                                    NodeDraft::creatif(format!("S{s}T{t}P{p}C{c}"))
                                        .budget(budget as f64)
                                })
                                .collect();
                            NodeDraft::placement(format!("S{s}T{t}P{p}"))
                                .budget(own as f64)
                                .expanded(true)
                                .children(creatifs)
                        })
                        .collect();
                    NodeDraft::tactique(format!("S{s}T{t}"))
                        .budget(own as f64)
                        .expanded(true)
                        .children(placements)
                })
                .collect();
            NodeDraft::section(format!("S{s}"))
                .budget(own as f64)
                .expanded(true)
                .children(tactiques)
        })
        .collect();
    Hierarchy::from_drafts(sections).unwrap()
}

fn sorted_ids(tree: &Hierarchy) -> Vec<String> {
    let mut ids: Vec<String> = tree.iter().map(|node| node.id().to_string()).collect();
    ids.sort();
    ids
}

fn own_total(tree: &Hierarchy) -> f64 {
    tree.iter().map(|node| node.own_budget()).sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_drops_keep_the_tree_consistent(
        shape in shape(),
        moves in prop::collection::vec((any::<Index>(), any::<Index>(), mode()), 0..24),
    ) {
        let mut tree = build(shape);
        let money = own_total(&tree);

        for (dragged, target, mode) in moves {
            let ids = sorted_ids(&tree);
            let dragged = dragged.get(&ids).clone();
            let target = target.get(&ids).clone();
            let before = tree.clone();
            let candidate = Candidate { target_id: target.clone(), mode };

            match tree.apply_drop(&dragged, &candidate) {
                Ok(record) => {
                    if mode == InsertionMode::Inside {
                        prop_assert_eq!(tree.get(&target).unwrap().children().last(), Some(&dragged));
                        if record.changed_parent() {
                            prop_assert_eq!(record.to_index, before.get(&target).unwrap().children().len());
                        }
                    }
                }
                Err(_) => prop_assert_eq!(&tree, &before),
            }

            prop_assert!(tree.validate().is_ok(), "{:?}", tree.validate());
            prop_assert_eq!(tree.total_budget(), money);
            prop_assert_eq!(own_total(&tree), money);
            for section in tree.sections() {
                prop_assert_eq!(tree.get(section).unwrap().rollup_budget(), tree.rollup_total(section).unwrap());
            }
        }
    }

    #[test]
    fn drops_into_own_subtree_are_cyclic(shape in shape(), pick in any::<Index>(), mode in mode()) {
        let mut tree = build(shape);
        let ids = sorted_ids(&tree);
        let dragged = pick.get(&ids).clone();
        let before = tree.clone();

        let subtree: Vec<String> = ids
            .iter()
            .filter(|id| tree.is_self_or_descendant(id, &dragged))
            .cloned()
            .collect();
        prop_assert!(!subtree.is_empty());

        for target in subtree {
            let result = tree.apply_drop(&dragged, &Candidate { target_id: target, mode });
            prop_assert!(matches!(result, Err(MoveError::CyclicMove { .. })), "{:?}", result);
        }
        prop_assert_eq!(tree, before);
    }

    #[test]
    fn cancelled_drags_leave_no_trace(
        shape in shape(),
        pick in any::<Index>(),
        pointer in prop::collection::vec((0.0f64..320.0, -20.0f64..900.0), 1..16),
    ) {
        let tree = build(shape);
        let before = tree.clone();
        let dragged = pick.get(&sorted_ids(&tree)).clone();

        let mut dnd = HierarchyDnd::new(tree);
        let rows = dnd.hierarchy().visible_rows();
        for (ix, row) in rows.into_iter().enumerate() {
            let y = ix as f64 * 20.0;
            let x = row.depth as f64 * 12.0;
            dnd.register_target(row.id, DropTarget::new(row.kind, Rect::new(x, y, 320.0, y + 20.0)));
        }

        dnd.start_drag(&dragged).unwrap();
        for (x, y) in pointer {
            dnd.pointer_move(x, y).unwrap();
        }
        dnd.cancel().unwrap();

        prop_assert!(!dnd.is_dragging());
        prop_assert_eq!(dnd.hierarchy(), &before);
    }
}
