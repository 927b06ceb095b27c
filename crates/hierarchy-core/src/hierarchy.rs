use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::IntegrityError;
use crate::node::{Node, NodeDraft, NodeId, NodeKind};

const BUDGET_EPSILON: f64 = 1e-6;

/// Flat, persisted form of a [`Hierarchy`]: every node with its `parent_id`
/// and `order_index`. Children lists are derived on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HierarchySnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// A row of the depth-first walk over expanded nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleRow {
    pub id: NodeId,
    pub kind: NodeKind,
    pub depth: usize,
}

/// The section → tactique → placement → creatif tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "HierarchySnapshot", into = "HierarchySnapshot")]
pub struct Hierarchy {
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) sections: Vec<NodeId>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from nested drafts; `order_index`/`parent_id` follow the
    /// nesting and rollups are computed from the own budgets.
    pub fn from_drafts(sections: impl Into<Vec<NodeDraft>>) -> Result<Self, IntegrityError> {
        fn flatten(draft: NodeDraft, parent_id: Option<&str>, index: usize, out: &mut Vec<Node>) {
            let NodeDraft {
                id,
                kind,
                label,
                budget,
                expanded,
                children,
            } = draft;
            let mut node = Node::new(id, kind)
                .label(label)
                .budget(budget)
                .expanded(expanded)
                .order_index(index);
            node.parent_id = parent_id.map(str::to_string);
            let id = node.id.clone();
            out.push(node);
            for (index, child) in children.into_iter().enumerate() {
                flatten(child, Some(&id), index, out);
            }
        }

        let mut nodes = Vec::new();
        for (index, section) in sections.into().into_iter().enumerate() {
            flatten(section, None, index, &mut nodes);
        }
        Self::from_nodes(nodes)
    }

    /// Build a tree from flat rows as they come out of storage.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self, IntegrityError> {
        let mut map: HashMap<NodeId, Node> = HashMap::new();
        let mut arrival = Vec::new();
        for mut node in nodes {
            node.children.clear();
            if map.contains_key(&node.id) {
                return Err(IntegrityError::DuplicateId { node_id: node.id });
            }
            arrival.push(node.id.clone());
            map.insert(node.id.clone(), node);
        }

        let mut top_level = Vec::new();
        let mut groups: HashMap<NodeId, Vec<(usize, NodeId)>> = HashMap::new();
        for id in &arrival {
            let node = &map[id];
            match node.parent_id.as_deref() {
                None => {
                    if node.kind.parent_kind().is_some() {
                        return Err(IntegrityError::IllegalParent {
                            node_id: id.clone(),
                            kind: node.kind,
                            parent: None,
                        });
                    }
                    top_level.push((node.order_index, id.clone()));
                }
                Some(parent_id) => {
                    let parent =
                        map.get(parent_id)
                            .ok_or_else(|| IntegrityError::UnknownParent {
                                node_id: id.clone(),
                                parent_id: parent_id.to_string(),
                            })?;
                    if node.kind.parent_kind() != Some(parent.kind) {
                        return Err(IntegrityError::IllegalParent {
                            node_id: id.clone(),
                            kind: node.kind,
                            parent: Some(parent.kind),
                        });
                    }
                    groups
                        .entry(parent_id.to_string())
                        .or_default()
                        .push((node.order_index, id.clone()));
                }
            }
        }

        let sections = dense_order(top_level, None)?;
        for (parent_id, group) in groups {
            let children = dense_order(group, Some(&parent_id))?;
            if let Some(parent) = map.get_mut(&parent_id) {
                parent.children = children;
            }
        }

        let mut tree = Self {
            nodes: map,
            sections,
        };
        tree.recompute_budgets();
        Ok(tree)
    }

    pub fn snapshot(&self) -> HierarchySnapshot {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<&NodeId> = self.sections.iter().rev().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            nodes.push(node.clone());
            stack.extend(node.children.iter().rev());
        }
        HierarchySnapshot { nodes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    #[inline]
    pub fn sections(&self) -> &[NodeId] {
        &self.sections
    }

    /// Children of `parent_id`, or the section list for `None`.
    pub fn children_of(&self, parent_id: Option<&str>) -> Option<&[NodeId]> {
        match parent_id {
            None => Some(&self.sections),
            Some(parent_id) => self.nodes.get(parent_id).map(|node| node.children()),
        }
    }

    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        self.get(id)
            .and_then(|node| node.parent_id())
            .and_then(|parent_id| self.get(parent_id))
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.get(id).map(Node::index)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Node> + use<'a> {
        let start = self.parent_of(id);
        std::iter::successors(start, move |node| {
            node.parent_id().and_then(|parent_id| self.get(parent_id))
        })
    }

    /// `true` when `id` is `ancestor_id` or sits somewhere below it.
    pub fn is_self_or_descendant(&self, id: &str, ancestor_id: &str) -> bool {
        id == ancestor_id || self.ancestors(id).any(|node| node.id == ancestor_id)
    }

    /// Every own budget in the subtree of `id`, summed from scratch.
    pub fn rollup_total(&self, id: &str) -> Option<f64> {
        let node = self.get(id)?;
        let below: f64 = node
            .children
            .iter()
            .filter_map(|child| self.rollup_total(child))
            .sum();
        Some(node.budget + below + 0.0)
    }

    pub fn total_budget(&self) -> f64 {
        self.sections
            .iter()
            .filter_map(|id| self.get(id))
            .map(Node::rollup_budget)
            .sum::<f64>()
            + 0.0
    }

    /// Depth-first rows, descending only into expanded nodes.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        fn walk(tree: &Hierarchy, ids: &[NodeId], depth: usize, out: &mut Vec<VisibleRow>) {
            for id in ids {
                let Some(node) = tree.get(id) else {
                    continue;
                };
                out.push(VisibleRow {
                    id: id.clone(),
                    kind: node.kind,
                    depth,
                });
                if node.expanded {
                    walk(tree, &node.children, depth + 1, out);
                }
            }
        }

        let mut rows = Vec::new();
        walk(self, &self.sections, 0, &mut rows);
        rows
    }

    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.expanded = expanded;
                true
            }
            None => false,
        }
    }

    pub fn toggle_expanded(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if !node.kind.is_container() {
            return false;
        }
        node.expanded = !node.expanded;
        true
    }

    /// Recompute every rollup from the leaves up.
    pub fn recompute_budgets(&mut self) {
        fn rollup(tree: &mut Hierarchy, id: &str) {
            let Some(children) = tree.nodes.get(id).map(|node| node.children.clone()) else {
                return;
            };
            for child in &children {
                rollup(tree, child);
            }
            let total = tree.nodes.get(id).map_or(0.0, |node| tree.rollup_of(node));
            if let Some(node) = tree.nodes.get_mut(id) {
                node.rollup = total;
            }
        }

        for id in self.sections.clone() {
            rollup(self, &id);
        }
    }

    /// Recompute rollups from `start` up to its section. Each ancestor only
    /// needs its direct children, whose rollups are already current.
    pub(crate) fn refresh_rollups_from(&mut self, start: Option<&str>) {
        let mut cursor = start.map(str::to_string);
        while let Some(id) = cursor {
            let Some(node) = self.nodes.get(&id) else {
                break;
            };
            let total = self.rollup_of(node);
            let parent = node.parent_id.clone();
            if let Some(node) = self.nodes.get_mut(&id) {
                node.rollup = total;
            }
            cursor = parent;
        }
    }

    /// Own budget plus the current rollups of the direct children. The trailing
    /// `+ 0.0` turns an empty `-0.0` sum into `0.0`.
    fn rollup_of(&self, node: &Node) -> f64 {
        node.children
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .fold(node.budget, |total, child| total + child.rollup)
            + 0.0
    }

    /// Check every structural invariant of the tree.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(Option<&str>, &[NodeId])> = vec![(None, self.sections.as_slice())];

        while let Some((parent_id, ids)) = stack.pop() {
            let parent_kind = parent_id.and_then(|id| self.get(id)).map(Node::kind);
            for (index, id) in ids.iter().enumerate() {
                let node = self.get(id).ok_or_else(|| match parent_id {
                    Some(parent_id) => IntegrityError::UnknownParent {
                        node_id: id.clone(),
                        parent_id: parent_id.to_string(),
                    },
                    None => IntegrityError::Unreachable { node_id: id.clone() },
                })?;
                if node.parent_id() != parent_id || !visited.insert(id.as_str()) {
                    return Err(IntegrityError::ParentMismatch {
                        node_id: id.clone(),
                        parent_id: node.parent_id.clone(),
                        listed_under: parent_id.map(str::to_string),
                    });
                }
                if node.kind.parent_kind() != parent_kind {
                    return Err(IntegrityError::IllegalParent {
                        node_id: id.clone(),
                        kind: node.kind,
                        parent: parent_kind,
                    });
                }
                if node.order_index != index {
                    return Err(IntegrityError::OrderGap {
                        parent_id: parent_id.map(str::to_string),
                    });
                }
                let expected = self.rollup_of(node);
                if (expected - node.rollup).abs() > BUDGET_EPSILON * expected.abs().max(1.0) {
                    return Err(IntegrityError::BudgetMismatch {
                        node_id: id.clone(),
                        expected,
                        actual: node.rollup,
                    });
                }
                stack.push((Some(id.as_str()), node.children.as_slice()));
            }
        }

        if let Some(orphan) = self.nodes.keys().find(|id| !visited.contains(id.as_str())) {
            return Err(IntegrityError::Unreachable {
                node_id: orphan.clone(),
            });
        }
        Ok(())
    }
}

impl TryFrom<HierarchySnapshot> for Hierarchy {
    type Error = IntegrityError;

    fn try_from(snapshot: HierarchySnapshot) -> Result<Self, Self::Error> {
        Self::from_nodes(snapshot.nodes)
    }
}

impl From<Hierarchy> for HierarchySnapshot {
    fn from(tree: Hierarchy) -> Self {
        tree.snapshot()
    }
}

fn dense_order(
    mut group: Vec<(usize, NodeId)>,
    parent_id: Option<&str>,
) -> Result<Vec<NodeId>, IntegrityError> {
    group.sort_by_key(|(index, _)| *index);
    if group
        .iter()
        .enumerate()
        .any(|(expected, (index, _))| *index != expected)
    {
        return Err(IntegrityError::OrderGap {
            parent_id: parent_id.map(str::to_string),
        });
    }
    Ok(group.into_iter().map(|(_, id)| id).collect())
}
