use serde::{Deserialize, Serialize};

use crate::acceptance::{AcceptanceMatrix, Destination};
use crate::error::MoveError;
use crate::hierarchy::Hierarchy;
use crate::hit_test::{Candidate, InsertionMode};
use crate::node::NodeId;

/// The diff of one committed move, for the persistence layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub node_id: NodeId,
    pub from_parent: Option<NodeId>,
    pub from_index: usize,
    pub to_parent: Option<NodeId>,
    pub to_index: usize,
}

impl MoveRecord {
    pub fn changed_parent(&self) -> bool {
        self.from_parent != self.to_parent
    }
}

impl Hierarchy {
    /// Move `node_id` under `parent_id` (`None` for the section list) at slot
    /// `index` of that parent's current children.
    ///
    /// The slot is counted before `node_id` is detached, so dropping right
    /// after a later sibling in the same parent lands where it looks like it
    /// should.
    pub fn move_node(
        &mut self,
        node_id: &str,
        parent_id: Option<&str>,
        index: usize,
    ) -> Result<MoveRecord, MoveError> {
        let node = self.get(node_id).ok_or_else(|| MoveError::StaleTarget {
            node_id: node_id.to_string(),
        })?;
        let kind = node.kind();
        let from_parent = node.parent_id().map(str::to_string);
        let from_index = node.index();

        let destination_kind = match parent_id {
            None => None,
            Some(parent_id) => {
                let parent = self.get(parent_id).ok_or_else(|| MoveError::StaleTarget {
                    node_id: parent_id.to_string(),
                })?;
                if self.is_self_or_descendant(parent_id, node_id) {
                    return Err(MoveError::CyclicMove {
                        node_id: node_id.to_string(),
                        target_id: parent_id.to_string(),
                    });
                }
                Some(parent.kind())
            }
        };
        if kind.parent_kind() != destination_kind {
            let (target, mode) = match destination_kind {
                Some(target) => (target, InsertionMode::Inside),
                None => (kind, InsertionMode::Before),
            };
            return Err(MoveError::IllegalType {
                dragged: kind,
                target,
                mode,
            });
        }

        let same_parent = from_parent.as_deref() == parent_id;
        let to_index = if same_parent {
            self.reorder_index(from_index, parent_id, index)
        } else {
            index.min(self.children_of(parent_id).map_or(0, <[NodeId]>::len))
        };
        if same_parent && to_index == from_index {
            return Err(MoveError::NoOp);
        }

        self.detach(node_id, from_parent.as_deref(), from_index);
        self.attach(node_id, parent_id, to_index);

        if !same_parent {
            self.refresh_rollups_from(from_parent.as_deref());
            self.refresh_rollups_from(parent_id);
        }

        let record = MoveRecord {
            node_id: node_id.to_string(),
            from_parent,
            from_index,
            to_parent: parent_id.map(str::to_string),
            to_index,
        };
        tracing::debug!(
            node_id = %record.node_id,
            from_parent = ?record.from_parent,
            from_index = record.from_index,
            to_parent = ?record.to_parent,
            to_index = record.to_index,
            "moved node"
        );
        Ok(record)
    }

    /// Re-validate `candidate` against the current tree and apply it.
    pub fn apply_drop(
        &mut self,
        node_id: &str,
        candidate: &Candidate,
    ) -> Result<MoveRecord, MoveError> {
        let destination = AcceptanceMatrix::check_drop(self, node_id, candidate)?;
        self.move_node(node_id, destination.parent_id.as_deref(), destination.index)
    }

    /// `true` when moving `node_id` to `destination` would leave it in its
    /// current slot, which [`Hierarchy::move_node`] reports as
    /// [`MoveError::NoOp`].
    pub fn is_in_place(&self, node_id: &str, destination: &Destination) -> bool {
        let parent_id = destination.parent_id.as_deref();
        self.get(node_id).is_some_and(|node| {
            node.parent_id() == parent_id
                && self.reorder_index(node.index(), parent_id, destination.index) == node.index()
        })
    }

    fn reorder_index(&self, from_index: usize, parent_id: Option<&str>, gap: usize) -> usize {
        let sibling_count = self.children_of(parent_id).map_or(0, <[NodeId]>::len);
        reorder_to_index_from_gap(from_index, gap.min(sibling_count), sibling_count)
    }

    fn siblings_mut(&mut self, parent_id: Option<&str>) -> Option<&mut Vec<NodeId>> {
        match parent_id {
            None => Some(&mut self.sections),
            Some(parent_id) => self.nodes.get_mut(parent_id).map(|node| &mut node.children),
        }
    }

    fn detach(&mut self, node_id: &str, parent_id: Option<&str>, index: usize) {
        let Some(siblings) = self.siblings_mut(parent_id) else {
            return;
        };
        if siblings.get(index).is_some_and(|id| id == node_id) {
            siblings.remove(index);
        } else {
            siblings.retain(|id| id != node_id);
        }
        self.reindex(parent_id, index);
    }

    fn attach(&mut self, node_id: &str, parent_id: Option<&str>, index: usize) {
        let Some(siblings) = self.siblings_mut(parent_id) else {
            return;
        };
        let index = index.min(siblings.len());
        siblings.insert(index, node_id.to_string());
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.parent_id = parent_id.map(str::to_string);
        }
        self.reindex(parent_id, index);
    }

    /// Rewrite `order_index` for the siblings at and after `from`.
    fn reindex(&mut self, parent_id: Option<&str>, from: usize) {
        let siblings = match parent_id {
            None => self.sections.clone(),
            Some(parent_id) => match self.nodes.get(parent_id) {
                Some(parent) => parent.children.clone(),
                None => return,
            },
        };
        for (index, id) in siblings.iter().enumerate().skip(from) {
            if let Some(node) = self.nodes.get_mut(id) {
                node.order_index = index;
            }
        }
    }
}

/// Convert a gap between siblings into the final index of an item that is
/// currently at `from_ix` in the same list.
fn reorder_to_index_from_gap(from_ix: usize, gap_index: usize, item_count: usize) -> usize {
    let mut to_ix = gap_index;
    if to_ix > from_ix {
        to_ix = to_ix.saturating_sub(1);
    }
    to_ix.min(item_count.saturating_sub(1))
}
