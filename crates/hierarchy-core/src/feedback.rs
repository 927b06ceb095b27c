use kurbo::Rect;

use crate::config::DndConfig;
use crate::hit_test::{Candidate, HitTester, InsertionMode};
use crate::node::{NodeId, NodeKind};

/// What the renderer needs to draw the insertion line.
#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorSpec {
    pub target_id: NodeId,
    pub rect: Rect,
    pub direction: InsertionMode,
    pub target_kind: NodeKind,
}

#[derive(Clone, Copy, Debug)]
pub struct InsertionFeedback {
    thickness: f64,
}

impl Default for InsertionFeedback {
    fn default() -> Self {
        Self::new(&DndConfig::default())
    }
}

impl InsertionFeedback {
    pub fn new(config: &DndConfig) -> Self {
        Self {
            thickness: config.indicator_thickness,
        }
    }

    /// `None` means the indicator must be hidden.
    pub fn project(&self, candidate: Option<&Candidate>, hits: &HitTester) -> Option<IndicatorSpec> {
        let candidate = candidate?;
        let target = hits.target(&candidate.target_id)?;
        let rect = target.rect;
        let thickness = self.thickness.min(rect.height());

        // `inside` appends as the last child, so it shares the bottom edge.
        let band = match candidate.mode {
            InsertionMode::Before => Rect::new(rect.x0, rect.y0, rect.x1, rect.y0 + thickness),
            InsertionMode::After | InsertionMode::Inside => {
                Rect::new(rect.x0, rect.y1 - thickness, rect.x1, rect.y1)
            }
        };

        Some(IndicatorSpec {
            target_id: candidate.target_id.clone(),
            rect: band,
            direction: candidate.mode,
            target_kind: target.kind,
        })
    }
}
