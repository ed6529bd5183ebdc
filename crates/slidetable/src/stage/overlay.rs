use crate::render::{HighlightTarget, OverlayRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    /// Inserted at opacity 0.
    Created,
    /// Faded in on the first animation frame after creation.
    Visible,
    Fading,
    Removed,
}

/// One highlight rectangle and its fade timeline.
///
/// The hold timer runs from creation, independently of the fade-in frame. Without a hold the
/// overlay stays visible until cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub id: u64,
    pub target: HighlightTarget,
    pub rect: OverlayRect,
    pub color: String,
    pub hold_ms: Option<f64>,
    created_ms: f64,
    phase: OverlayPhase,
    fade_started_ms: f64,
}

impl Overlay {
    pub(crate) fn new(
        id: u64,
        target: HighlightTarget,
        rect: OverlayRect,
        color: String,
        hold_ms: Option<f64>,
        now_ms: f64,
    ) -> Self {
        Self {
            id,
            target,
            rect,
            color,
            hold_ms: hold_ms.filter(|ms| ms.is_finite() && *ms > 0.0),
            created_ms: now_ms,
            phase: OverlayPhase::Created,
            fade_started_ms: 0.0,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn created_ms(&self) -> f64 {
        self.created_ms
    }

    /// Target CSS opacity; the transition in the markup animates toward it.
    pub fn opacity(&self) -> f64 {
        match self.phase {
            OverlayPhase::Visible => 1.0,
            OverlayPhase::Created | OverlayPhase::Fading | OverlayPhase::Removed => 0.0,
        }
    }

    /// Applies one animation frame at `now_ms`.
    pub(crate) fn advance(&mut self, now_ms: f64, fade_ms: f64) {
        if self.phase == OverlayPhase::Created {
            self.phase = OverlayPhase::Visible;
        }
        if self.phase == OverlayPhase::Visible {
            if let Some(hold) = self.hold_ms {
                let fade_at = self.created_ms + hold;
                if now_ms >= fade_at {
                    self.phase = OverlayPhase::Fading;
                    self.fade_started_ms = fade_at;
                }
            }
        }
        if self.phase == OverlayPhase::Fading && now_ms >= self.fade_started_ms + fade_ms {
            self.phase = OverlayPhase::Removed;
        }
    }
}
