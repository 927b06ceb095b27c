use kurbo::Point;

use crate::config::DndConfig;
use crate::error::SessionMisuse;
use crate::feedback::{IndicatorSpec, InsertionFeedback};
use crate::hierarchy::Hierarchy;
use crate::hit_test::{DropTarget, HitTester};
use crate::mutator::MoveRecord;
use crate::node::NodeId;
use crate::session::{DragSession, DropOutcome};

type CommitObserver = Box<dyn FnMut(&MoveRecord, &Hierarchy)>;

/// Owns the tree, the target registry and the drag session, and exposes the
/// operations the rendering and gesture layers call.
pub struct HierarchyDnd {
    tree: Hierarchy,
    hits: HitTester,
    session: DragSession,
    feedback: InsertionFeedback,
    indicator: Option<IndicatorSpec>,
    on_commit: Option<CommitObserver>,
}

impl HierarchyDnd {
    pub fn new(tree: Hierarchy) -> Self {
        Self::with_config(tree, DndConfig::default())
    }

    pub fn with_config(tree: Hierarchy, config: DndConfig) -> Self {
        Self {
            tree,
            hits: HitTester::new(&config),
            session: DragSession::new(),
            feedback: InsertionFeedback::new(&config),
            indicator: None,
            on_commit: None,
        }
    }

    /// Called after every committed move, once the tree is fully updated.
    pub fn on_commit(mut self, observer: impl FnMut(&MoveRecord, &Hierarchy) + 'static) -> Self {
        self.on_commit = Some(Box::new(observer));
        self
    }

    #[inline]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.tree
    }

    /// Mutable access for external edits. A drag in flight re-validates its
    /// candidate against the edited tree on release.
    #[inline]
    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.tree
    }

    pub fn set_hierarchy(&mut self, tree: Hierarchy) {
        self.tree = tree;
    }

    #[inline]
    pub fn hit_tester(&self) -> &HitTester {
        &self.hits
    }

    #[inline]
    pub fn session(&self) -> &DragSession {
        &self.session
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.session.is_dragging()
    }

    /// The indicator computed by the last pointer move.
    #[inline]
    pub fn indicator(&self) -> Option<&IndicatorSpec> {
        self.indicator.as_ref()
    }

    pub fn register_target(&mut self, id: impl Into<NodeId>, target: DropTarget) {
        self.hits.register_target(id, target);
    }

    pub fn unregister_target(&mut self, id: &str) {
        self.hits.unregister_target(id);
    }

    pub fn clear_targets(&mut self) {
        self.hits.clear();
    }

    pub fn start_drag(&mut self, node_id: &str) -> Result<(), SessionMisuse> {
        self.session.start(&self.tree, node_id)?;
        self.indicator = None;
        Ok(())
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<Option<&IndicatorSpec>, SessionMisuse> {
        let candidate = self.session.update(&self.tree, &self.hits, Point::new(x, y))?;
        self.indicator = self.feedback.project(candidate, &self.hits);
        Ok(self.indicator.as_ref())
    }

    pub fn release(&mut self) -> Result<DropOutcome, SessionMisuse> {
        self.indicator = None;
        let outcome = self.session.release(&mut self.tree)?;
        if let (DropOutcome::Moved(record), Some(observer)) = (&outcome, self.on_commit.as_mut()) {
            observer(record, &self.tree);
        }
        Ok(outcome)
    }

    pub fn cancel(&mut self) -> Result<(), SessionMisuse> {
        self.indicator = None;
        self.session.cancel()
    }
}
