use crate::error::MoveError;
use crate::hierarchy::Hierarchy;
use crate::hit_test::{Candidate, InsertionMode};
use crate::node::{NodeId, NodeKind};

/// One row of the acceptance table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindRule {
    pub dragged: NodeKind,
    /// Kind a `before`/`after` drop may land next to.
    pub sibling_of: NodeKind,
    /// Kind an `inside` drop may land in; `None` for top-level kinds.
    pub inside_of: Option<NodeKind>,
}

const RULES: [KindRule; 4] = [
    KindRule {
        dragged: NodeKind::Section,
        sibling_of: NodeKind::Section,
        inside_of: None,
    },
    KindRule {
        dragged: NodeKind::Tactique,
        sibling_of: NodeKind::Tactique,
        inside_of: Some(NodeKind::Section),
    },
    KindRule {
        dragged: NodeKind::Placement,
        sibling_of: NodeKind::Placement,
        inside_of: Some(NodeKind::Tactique),
    },
    KindRule {
        dragged: NodeKind::Creatif,
        sibling_of: NodeKind::Creatif,
        inside_of: Some(NodeKind::Placement),
    },
];

/// Where a validated drop places the dragged node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    pub parent_id: Option<NodeId>,
    /// Slot in the destination's current children, counted before the dragged
    /// node is detached.
    pub index: usize,
}

pub struct AcceptanceMatrix;

impl AcceptanceMatrix {
    pub fn rule(dragged: NodeKind) -> &'static KindRule {
        match dragged {
            NodeKind::Section => &RULES[0],
            NodeKind::Tactique => &RULES[1],
            NodeKind::Placement => &RULES[2],
            NodeKind::Creatif => &RULES[3],
        }
    }

    pub fn is_legal(dragged: NodeKind, target: NodeKind, mode: InsertionMode) -> bool {
        let rule = Self::rule(dragged);
        match mode {
            InsertionMode::Before | InsertionMode::After => rule.sibling_of == target,
            InsertionMode::Inside => rule.inside_of == Some(target),
        }
    }

    /// Validate `candidate` for `dragged_id` against the live tree and work out
    /// where the node would land.
    pub fn check_drop(
        tree: &Hierarchy,
        dragged_id: &str,
        candidate: &Candidate,
    ) -> Result<Destination, MoveError> {
        let dragged = tree.get(dragged_id).ok_or_else(|| MoveError::StaleTarget {
            node_id: dragged_id.to_string(),
        })?;
        let target = tree
            .get(&candidate.target_id)
            .ok_or_else(|| MoveError::StaleTarget {
                node_id: candidate.target_id.clone(),
            })?;

        if tree.is_self_or_descendant(target.id(), dragged_id) {
            return Err(MoveError::CyclicMove {
                node_id: dragged_id.to_string(),
                target_id: candidate.target_id.clone(),
            });
        }

        if !Self::is_legal(dragged.kind(), target.kind(), candidate.mode) {
            return Err(MoveError::IllegalType {
                dragged: dragged.kind(),
                target: target.kind(),
                mode: candidate.mode,
            });
        }

        let destination = match candidate.mode {
            InsertionMode::Before => Destination {
                parent_id: target.parent_id().map(str::to_string),
                index: target.index(),
            },
            InsertionMode::After => Destination {
                parent_id: target.parent_id().map(str::to_string),
                index: target.index() + 1,
            },
            InsertionMode::Inside => Destination {
                parent_id: Some(target.id().to_string()),
                index: target.children().len(),
            },
        };
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeDraft;

    fn candidate(target: &str, mode: InsertionMode) -> Candidate {
        Candidate {
            target_id: target.to_string(),
            mode,
        }
    }

    fn tree() -> Hierarchy {
        Hierarchy::from_drafts(vec![
            NodeDraft::section("S1").child(
                NodeDraft::tactique("T1")
                    .child(NodeDraft::placement("P1").child(NodeDraft::creatif("C1").budget(5.))),
            ),
            NodeDraft::section("S2").child(NodeDraft::tactique("T2")),
        ])
        .unwrap()
    }

    #[test]
    fn table_matches_the_kind_hierarchy() {
        use InsertionMode::*;
        use NodeKind::*;

        assert!(AcceptanceMatrix::is_legal(Tactique, Tactique, Before));
        assert!(AcceptanceMatrix::is_legal(Tactique, Section, Inside));
        assert!(AcceptanceMatrix::is_legal(Placement, Tactique, Inside));
        assert!(AcceptanceMatrix::is_legal(Creatif, Placement, Inside));
        assert!(AcceptanceMatrix::is_legal(Section, Section, After));

        assert!(!AcceptanceMatrix::is_legal(Creatif, Section, Inside));
        assert!(!AcceptanceMatrix::is_legal(Section, Section, Inside));
        assert!(!AcceptanceMatrix::is_legal(Tactique, Placement, Before));
        assert!(!AcceptanceMatrix::is_legal(Placement, Placement, Inside));
    }

    #[test]
    fn cross_parent_sibling_drop_reparents_to_target_parent() {
        let tree = tree();
        let dest =
            AcceptanceMatrix::check_drop(&tree, "T2", &candidate("T1", InsertionMode::After))
                .unwrap();
        assert_eq!(dest.parent_id.as_deref(), Some("S1"));
        assert_eq!(dest.index, 1);
    }

    #[test]
    fn inside_drop_appends() {
        let tree = tree();
        let dest =
            AcceptanceMatrix::check_drop(&tree, "T2", &candidate("S1", InsertionMode::Inside))
                .unwrap();
        assert_eq!(dest.parent_id.as_deref(), Some("S1"));
        assert_eq!(dest.index, 1);
    }

    #[test]
    fn rejects_drop_into_own_subtree() {
        let tree = tree();
        let err = AcceptanceMatrix::check_drop(&tree, "T1", &candidate("T1", InsertionMode::Before))
            .unwrap_err();
        assert!(matches!(err, MoveError::CyclicMove { .. }));

        let err = AcceptanceMatrix::check_drop(&tree, "S1", &candidate("P1", InsertionMode::Inside))
            .unwrap_err();
        assert!(matches!(err, MoveError::CyclicMove { .. }));
    }

    #[test]
    fn rejects_creatif_under_section() {
        let tree = tree();
        let err = AcceptanceMatrix::check_drop(&tree, "C1", &candidate("S2", InsertionMode::Inside))
            .unwrap_err();
        assert_eq!(
            err,
            MoveError::IllegalType {
                dragged: NodeKind::Creatif,
                target: NodeKind::Section,
                mode: InsertionMode::Inside,
            }
        );
    }

    #[test]
    fn missing_target_is_stale() {
        let tree = tree();
        let err = AcceptanceMatrix::check_drop(&tree, "T1", &candidate("gone", InsertionMode::After))
            .unwrap_err();
        assert_eq!(
            err,
            MoveError::StaleTarget {
                node_id: "gone".into()
            }
        );
    }
}
