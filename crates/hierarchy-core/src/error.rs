use thiserror::Error;

use crate::hit_test::InsertionMode;
use crate::node::{NodeId, NodeKind};

/// Why a drop (or an explicit move) cannot be applied to the tree.
///
/// None of these reach the user: the session treats them as "no drop" and a
/// release without a legal candidate becomes a cancellation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MoveError {
    /// The acceptance table does not allow this kind/target/mode combination.
    #[error("cannot drop {dragged:?} {mode:?} {target:?}")]
    IllegalType {
        dragged: NodeKind,
        target: NodeKind,
        mode: InsertionMode,
    },

    /// The target is the dragged node itself or one of its descendants.
    #[error("node '{node_id}' cannot be moved into its own subtree (target '{target_id}')")]
    CyclicMove { node_id: NodeId, target_id: NodeId },

    /// A referenced node is gone, usually because the tree was edited mid-drag.
    #[error("node '{node_id}' no longer exists")]
    StaleTarget { node_id: NodeId },

    /// The move would leave the node where it already is.
    #[error("move does not change the tree")]
    NoOp,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTestError {
    #[error("no drop targets are registered")]
    NoRegisteredTargets,
}

/// Contract violations by the gesture layer. These indicate mis-wiring and
/// are never caused by user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionMisuse {
    #[error("a drag of '{dragged_id}' is already in progress")]
    AlreadyDragging { dragged_id: NodeId },

    #[error("no drag is in progress")]
    NotDragging,

    #[error("cannot drag unknown node '{node_id}'")]
    UnknownNode { node_id: NodeId },
}

/// Structural problems found while loading or validating a [`crate::Hierarchy`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("duplicate node id '{node_id}'")]
    DuplicateId { node_id: NodeId },

    #[error("node '{node_id}' references missing parent '{parent_id}'")]
    UnknownParent { node_id: NodeId, parent_id: NodeId },

    #[error("node '{node_id}' of kind {kind:?} cannot sit under {parent:?}")]
    IllegalParent {
        node_id: NodeId,
        kind: NodeKind,
        parent: Option<NodeKind>,
    },

    #[error("children of {parent_id:?} are not ordered 0..n-1")]
    OrderGap { parent_id: Option<NodeId> },

    #[error("node '{node_id}' is listed under {listed_under:?} but its parent is {parent_id:?}")]
    ParentMismatch {
        node_id: NodeId,
        parent_id: Option<NodeId>,
        listed_under: Option<NodeId>,
    },

    #[error("node '{node_id}' is not reachable from any section")]
    Unreachable { node_id: NodeId },

    #[error("rollup budget of '{node_id}' is {actual}, own budget and children sum to {expected}")]
    BudgetMismatch {
        node_id: NodeId,
        expected: f64,
        actual: f64,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse drag-and-drop config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid drag-and-drop config: {0}")]
    Invalid(String),
}
