use serde::{Deserialize, Serialize};

use crate::acceptance::AcceptanceMatrix;

pub type NodeId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Section,
    Tactique,
    Placement,
    Creatif,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Section,
        NodeKind::Tactique,
        NodeKind::Placement,
        NodeKind::Creatif,
    ];

    /// The only kind this kind may be nested under. `None` for top-level sections.
    pub fn parent_kind(self) -> Option<NodeKind> {
        AcceptanceMatrix::rule(self).inside_of
    }

    /// The kind new children of this node get by default.
    pub fn child_kind(self) -> Option<NodeKind> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.parent_kind() == Some(self))
    }

    pub fn is_container(self) -> bool {
        self.child_kind().is_some()
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Section => "section",
            NodeKind::Tactique => "tactique",
            NodeKind::Placement => "placement",
            NodeKind::Creatif => "creatif",
        }
    }
}

/// One entry of the hierarchy.
///
/// Structural fields (`parent_id`, `order_index`, `children`) and the derived
/// rollup are owned by [`crate::Hierarchy`] and only change through its
/// mutation entry points. `budget` is the node's own contribution: the leaf
/// amount of a creatif, or whatever a container carries itself (a childless
/// tactique with a budget, for instance). It travels with the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    #[serde(default)]
    pub(crate) label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) parent_id: Option<NodeId>,
    #[serde(default)]
    pub(crate) order_index: usize,
    #[serde(default)]
    pub(crate) budget: f64,
    #[serde(default)]
    pub(crate) expanded: bool,
    #[serde(default, skip_serializing)]
    pub(crate) children: Vec<NodeId>,
    #[serde(skip)]
    pub(crate) rollup: f64,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: String::new(),
            parent_id: None,
            order_index: 0,
            budget: 0.0,
            expanded: false,
            children: Vec::new(),
            rollup: 0.0,
        }
    }

    pub fn parent(mut self, parent_id: impl Into<NodeId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn order_index(mut self, order_index: usize) -> Self {
        self.order_index = order_index;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn budget(mut self, budget: f64) -> Self {
        self.budget = budget;
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn title(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }

    #[inline]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.order_index
    }

    #[inline]
    pub fn own_budget(&self) -> f64 {
        self.budget
    }

    /// Own budget plus the rollups of every child.
    #[inline]
    pub fn rollup_budget(&self) -> f64 {
        self.rollup
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// A nested description of a subtree, used to build a [`crate::Hierarchy`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub budget: f64,
    pub expanded: bool,
    pub children: Vec<NodeDraft>,
}

impl NodeDraft {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: String::new(),
            budget: 0.0,
            expanded: false,
            children: Vec::new(),
        }
    }

    pub fn section(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Section)
    }

    pub fn tactique(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Tactique)
    }

    pub fn placement(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Placement)
    }

    pub fn creatif(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Creatif)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn budget(mut self, budget: f64) -> Self {
        self.budget = budget;
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    pub fn child(mut self, child: NodeDraft) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl Into<Vec<NodeDraft>>) -> Self {
        self.children.extend(children.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_campaign_hierarchy() {
        assert_eq!(NodeKind::Section.parent_kind(), None);
        assert_eq!(NodeKind::Tactique.parent_kind(), Some(NodeKind::Section));
        assert_eq!(NodeKind::Placement.parent_kind(), Some(NodeKind::Tactique));
        assert_eq!(NodeKind::Creatif.parent_kind(), Some(NodeKind::Placement));

        assert_eq!(NodeKind::Section.child_kind(), Some(NodeKind::Tactique));
        assert_eq!(NodeKind::Placement.child_kind(), Some(NodeKind::Creatif));
        assert_eq!(NodeKind::Creatif.child_kind(), None);
        assert!(!NodeKind::Creatif.is_container());
        assert!(NodeKind::Section.is_container());
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&NodeKind::Tactique).unwrap();
        assert_eq!(json, "\"tactique\"");
        let kind: NodeKind = serde_json::from_str("\"creatif\"").unwrap();
        assert_eq!(kind, NodeKind::Creatif);
    }

    #[test]
    fn title_falls_back_to_id() {
        let node = Node::new("T1", NodeKind::Tactique);
        assert_eq!(node.title(), "T1");
        let node = node.label("Search");
        assert_eq!(node.title(), "Search");
    }
}
