use kurbo::Point;

use crate::acceptance::AcceptanceMatrix;
use crate::error::{MoveError, SessionMisuse};
use crate::hierarchy::Hierarchy;
use crate::hit_test::{Candidate, HitTester};
use crate::mutator::MoveRecord;
use crate::node::{NodeId, NodeKind};

/// Where the dragged node sat when the gesture started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragOrigin {
    pub parent_id: Option<NodeId>,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
struct ActiveDrag {
    dragged_id: NodeId,
    dragged_kind: NodeKind,
    origin: DragOrigin,
    candidate: Option<Candidate>,
    in_place: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
enum SessionState {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

/// How a drag ended.
#[derive(Clone, Debug, PartialEq)]
pub enum DropOutcome {
    /// The move was committed.
    Moved(MoveRecord),
    /// The held candidate would not change the tree.
    Unchanged,
    /// No legal candidate, the commit failed re-validation, or the drag was cancelled.
    Cancelled,
}

/// The drag gesture state machine: `Idle → Dragging → (Committing | Cancelled) → Idle`.
///
/// The session never touches the tree while dragging; the only write happens
/// inside [`DragSession::release`].
#[derive(Clone, Debug, Default)]
pub struct DragSession {
    state: SessionState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SessionState::Dragging(_))
    }

    pub fn dragged_id(&self) -> Option<&str> {
        self.active().map(|drag| drag.dragged_id.as_str())
    }

    pub fn origin(&self) -> Option<&DragOrigin> {
        self.active().map(|drag| &drag.origin)
    }

    /// The last legal candidate seen during this drag.
    pub fn candidate(&self) -> Option<&Candidate> {
        self.active().and_then(|drag| drag.candidate.as_ref())
    }

    /// Whether the held candidate puts the node back where it already is.
    pub fn is_in_place(&self) -> bool {
        self.active().is_some_and(|drag| drag.in_place)
    }

    fn active(&self) -> Option<&ActiveDrag> {
        match &self.state {
            SessionState::Dragging(drag) => Some(drag),
            SessionState::Idle => None,
        }
    }

    pub fn start(&mut self, tree: &Hierarchy, node_id: &str) -> Result<(), SessionMisuse> {
        if let SessionState::Dragging(drag) = &self.state {
            return Err(SessionMisuse::AlreadyDragging {
                dragged_id: drag.dragged_id.clone(),
            });
        }
        let node = tree.get(node_id).ok_or_else(|| SessionMisuse::UnknownNode {
            node_id: node_id.to_string(),
        })?;

        let origin = DragOrigin {
            parent_id: node.parent_id().map(str::to_string),
            index: node.index(),
        };
        tracing::debug!(node_id, ?origin, "drag started");
        self.state = SessionState::Dragging(ActiveDrag {
            dragged_id: node_id.to_string(),
            dragged_kind: node.kind(),
            origin,
            candidate: None,
            in_place: false,
        });
        Ok(())
    }

    /// Re-resolve the hovered target and keep it if it is a legal drop.
    ///
    /// An illegal hover leaves the previous legal candidate in place. Returns
    /// the candidate worth showing: `None` while the held one would drop the
    /// node into its own slot, which still releases as [`DropOutcome::Unchanged`].
    pub fn update(
        &mut self,
        tree: &Hierarchy,
        hits: &HitTester,
        pointer: Point,
    ) -> Result<Option<&Candidate>, SessionMisuse> {
        let SessionState::Dragging(drag) = &mut self.state else {
            return Err(SessionMisuse::NotDragging);
        };

        let resolved = match hits.resolve(pointer, drag.dragged_kind) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::trace!(%err, "nothing to hit-test against");
                None
            }
        };

        if let Some(candidate) = resolved {
            match AcceptanceMatrix::check_drop(tree, &drag.dragged_id, &candidate) {
                Ok(destination) => {
                    drag.in_place = tree.is_in_place(&drag.dragged_id, &destination);
                    drag.candidate = Some(candidate);
                }
                Err(err) => {
                    tracing::trace!(target_id = %candidate.target_id, %err, "rejected drop candidate");
                }
            }
        }
        if drag.in_place {
            return Ok(None);
        }
        Ok(drag.candidate.as_ref())
    }

    /// End the drag, committing the held candidate if there is one.
    pub fn release(&mut self, tree: &mut Hierarchy) -> Result<DropOutcome, SessionMisuse> {
        let SessionState::Dragging(drag) = std::mem::take(&mut self.state) else {
            return Err(SessionMisuse::NotDragging);
        };

        let Some(candidate) = drag.candidate else {
            tracing::debug!(node_id = %drag.dragged_id, "drag released without a legal drop");
            return Ok(DropOutcome::Cancelled);
        };

        tracing::debug!(node_id = %drag.dragged_id, ?candidate, "committing drop");
        match tree.apply_drop(&drag.dragged_id, &candidate) {
            Ok(record) => Ok(DropOutcome::Moved(record)),
            Err(MoveError::NoOp) => Ok(DropOutcome::Unchanged),
            Err(err) => {
                tracing::warn!(node_id = %drag.dragged_id, %err, "drop no longer valid, discarding");
                Ok(DropOutcome::Cancelled)
            }
        }
    }

    pub fn cancel(&mut self) -> Result<(), SessionMisuse> {
        let SessionState::Dragging(drag) = std::mem::take(&mut self.state) else {
            return Err(SessionMisuse::NotDragging);
        };
        tracing::debug!(node_id = %drag.dragged_id, "drag cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit_test::{DropTarget, InsertionMode};
    use crate::node::NodeDraft;
    use kurbo::Rect;

    fn tree() -> Hierarchy {
        Hierarchy::from_drafts(vec![
            NodeDraft::section("S1").children(vec![
                NodeDraft::tactique("T1").budget(100.),
                NodeDraft::tactique("T2").budget(50.),
            ]),
            NodeDraft::section("S2"),
        ])
        .unwrap()
    }

    // Rows stacked 20 units tall in visible order.
    fn hits(tree: &Hierarchy) -> HitTester {
        let mut hits = HitTester::default();
        for (ix, id) in ["S1", "T1", "T2", "S2"].into_iter().enumerate() {
            let y = ix as f64 * 20.0;
            let kind = tree.get(id).unwrap().kind();
            hits.register_target(id, DropTarget::new(kind, Rect::new(0.0, y, 100.0, y + 20.0)));
        }
        hits
    }

    #[test]
    fn start_captures_origin() {
        let tree = tree();
        let mut session = DragSession::new();
        session.start(&tree, "T2").unwrap();
        assert!(session.is_dragging());
        assert_eq!(session.dragged_id(), Some("T2"));
        assert_eq!(
            session.origin(),
            Some(&DragOrigin {
                parent_id: Some("S1".into()),
                index: 1,
            })
        );
        assert_eq!(session.candidate(), None);
    }

    #[test]
    fn second_start_fails_fast() {
        let tree = tree();
        let mut session = DragSession::new();
        session.start(&tree, "T1").unwrap();
        assert_eq!(
            session.start(&tree, "T2"),
            Err(SessionMisuse::AlreadyDragging {
                dragged_id: "T1".into()
            })
        );
        assert_eq!(session.dragged_id(), Some("T1"));
    }

    #[test]
    fn idle_session_rejects_gestures() {
        let mut tree = tree();
        let hits = hits(&tree);
        let mut session = DragSession::new();
        assert_eq!(
            session.update(&tree, &hits, Point::new(1.0, 1.0)).err(),
            Some(SessionMisuse::NotDragging)
        );
        assert_eq!(session.release(&mut tree), Err(SessionMisuse::NotDragging));
        assert_eq!(session.cancel(), Err(SessionMisuse::NotDragging));
        assert_eq!(
            session.start(&tree, "nope"),
            Err(SessionMisuse::UnknownNode {
                node_id: "nope".into()
            })
        );
    }

    #[test]
    fn illegal_hover_keeps_previous_candidate() {
        let tree = tree();
        let hits = hits(&tree);
        let mut session = DragSession::new();
        session.start(&tree, "T1").unwrap();

        // Over its own row: cyclic, nothing held yet.
        let held = session.update(&tree, &hits, Point::new(5.0, 22.0)).unwrap();
        assert_eq!(held, None);

        // Middle of S2: legal inside drop.
        let held = session
            .update(&tree, &hits, Point::new(5.0, 72.0))
            .unwrap()
            .cloned();
        assert_eq!(
            held,
            Some(Candidate {
                target_id: "S2".into(),
                mode: InsertionMode::Inside,
            })
        );

        // Back over itself: the S2 candidate stays.
        session.update(&tree, &hits, Point::new(5.0, 30.0)).unwrap();
        assert_eq!(session.candidate().unwrap().target_id, "S2");
    }

    #[test]
    fn release_commits_the_held_candidate() {
        let mut tree = tree();
        let hits = hits(&tree);
        let mut session = DragSession::new();
        session.start(&tree, "T1").unwrap();
        session.update(&tree, &hits, Point::new(5.0, 72.0)).unwrap();

        let outcome = session.release(&mut tree).unwrap();
        let DropOutcome::Moved(record) = outcome else {
            panic!("expected a committed move, got {outcome:?}");
        };
        assert_eq!(record.to_parent.as_deref(), Some("S2"));
        assert_eq!(record.to_index, 0);
        assert!(!session.is_dragging());
        assert_eq!(tree.get("S2").unwrap().rollup_budget(), 100.);
        assert_eq!(tree.get("S1").unwrap().rollup_budget(), 50.);
    }

    #[test]
    fn release_without_candidate_cancels() {
        let mut tree = tree();
        let before = tree.clone();
        let mut session = DragSession::new();
        session.start(&tree, "T1").unwrap();
        assert_eq!(session.release(&mut tree), Ok(DropOutcome::Cancelled));
        assert_eq!(tree, before);
    }

    #[test]
    fn stale_candidate_is_discarded_on_release() {
        let tree = tree();
        let hits = hits(&tree);
        let mut session = DragSession::new();
        session.start(&tree, "T1").unwrap();
        session.update(&tree, &hits, Point::new(5.0, 72.0)).unwrap();

        // S2 disappears before release.
        let mut edited = Hierarchy::from_drafts(vec![NodeDraft::section("S1").children(vec![
            NodeDraft::tactique("T1").budget(100.),
            NodeDraft::tactique("T2").budget(50.),
        ])])
        .unwrap();
        let before = edited.clone();
        assert_eq!(session.release(&mut edited), Ok(DropOutcome::Cancelled));
        assert_eq!(edited, before);
    }

    #[test]
    fn releasing_in_place_is_unchanged() {
        let mut tree = tree();
        let hits = hits(&tree);
        let mut session = DragSession::new();
        session.start(&tree, "T2").unwrap();
        // Bottom of T1: after T1, which is where T2 already is.
        let shown = session.update(&tree, &hits, Point::new(5.0, 39.0)).unwrap();
        assert_eq!(shown, None);
        assert!(session.is_in_place());
        assert_eq!(session.candidate().unwrap().target_id, "T1");
        assert_eq!(session.release(&mut tree), Ok(DropOutcome::Unchanged));
    }

    #[test]
    fn leaving_the_own_slot_shows_the_candidate_again() {
        let tree = tree();
        let hits = hits(&tree);
        let mut session = DragSession::new();
        session.start(&tree, "T2").unwrap();

        assert_eq!(session.update(&tree, &hits, Point::new(5.0, 39.0)).unwrap(), None);
        let shown = session
            .update(&tree, &hits, Point::new(5.0, 21.0))
            .unwrap()
            .cloned();
        assert_eq!(
            shown,
            Some(Candidate {
                target_id: "T1".into(),
                mode: InsertionMode::Before,
            })
        );
        assert!(!session.is_in_place());
    }

    #[test]
    fn cancel_returns_to_idle() {
        let tree = tree();
        let hits = hits(&tree);
        let mut session = DragSession::new();
        session.start(&tree, "T1").unwrap();
        session.update(&tree, &hits, Point::new(5.0, 72.0)).unwrap();
        session.cancel().unwrap();
        assert!(!session.is_dragging());
        assert_eq!(session.candidate(), None);
        session.start(&tree, "T2").unwrap();
    }
}
