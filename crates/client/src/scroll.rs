// Scroll anchor: keeps the reader's place across merges.
//
// Prepends shift the offset by exactly the height they added above the
// viewport. Appends and replacements follow the bottom only when auto-follow
// was on when the batch arrived. Auto-follow itself is recomputed from
// geometry on every scroll notification and never from merge history.

use std::time::Duration;

use crate::merge::{InsertPlan, MergeMode};
use crate::pagination::is_near_top;

pub const DEFAULT_NEAR_TOP_THRESHOLD_PX: f64 = 50.0;
pub const DEFAULT_NEAR_BOTTOM_THRESHOLD_PX: f64 = 100.0;

/// Live geometry of the scrollable transcript container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportMetrics {
    pub scroll_height: f64,
    pub scroll_top: f64,
    pub client_height: f64,
}

impl ViewportMetrics {
    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }

    /// Largest reachable offset.
    pub fn max_scroll_top(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }
}

/// Geometry captured just before a merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSnapshot {
    pub scroll_height: f64,
    pub scroll_top: f64,
}

/// What the viewport should do after a merge has been rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollAction {
    None,
    /// Apply this offset now.
    SetOffset(f64),
    /// Scroll to the bottom once layout has settled.
    ScrollToBottomAfter(Duration),
}

/// Settle delays before a deferred scroll-to-bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollDelays {
    pub live: Duration,
    pub history: Duration,
    pub empty_history: Duration,
}

impl Default for ScrollDelays {
    fn default() -> Self {
        Self {
            live: Duration::from_millis(10),
            history: Duration::from_millis(100),
            empty_history: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollAnchor {
    auto_follow: bool,
    near_top_threshold: f64,
    near_bottom_threshold: f64,
    delays: ScrollDelays,
}

impl Default for ScrollAnchor {
    fn default() -> Self {
        Self::new(
            DEFAULT_NEAR_TOP_THRESHOLD_PX,
            DEFAULT_NEAR_BOTTOM_THRESHOLD_PX,
            ScrollDelays::default(),
        )
    }
}

impl ScrollAnchor {
    pub fn new(near_top_threshold: f64, near_bottom_threshold: f64, delays: ScrollDelays) -> Self {
        Self { auto_follow: true, near_top_threshold, near_bottom_threshold, delays }
    }

    pub fn auto_follow_enabled(&self) -> bool {
        self.auto_follow
    }

    pub fn delays(&self) -> ScrollDelays {
        self.delays
    }

    /// Recompute auto-follow from the current geometry. Returns whether the
    /// viewport is close enough to the top to page backward.
    pub fn on_scroll(&mut self, metrics: &ViewportMetrics) -> bool {
        self.auto_follow = metrics.distance_from_bottom() < self.near_bottom_threshold;
        is_near_top(metrics.scroll_top, self.near_top_threshold)
    }

    /// The viewport was just pinned to the bottom.
    pub fn mark_at_bottom(&mut self) {
        self.auto_follow = true;
    }

    pub fn capture_before(&self, metrics: &ViewportMetrics) -> ViewportSnapshot {
        ViewportSnapshot { scroll_height: metrics.scroll_height, scroll_top: metrics.scroll_top }
    }

    /// Decide the post-merge scroll.
    ///
    /// `follow_at_call` is the auto-follow flag captured when the batch
    /// arrived, before anything touched the viewport.
    pub fn restore_after(
        &self,
        snapshot: &ViewportSnapshot,
        plan: &InsertPlan,
        after: &ViewportMetrics,
        follow_at_call: bool,
    ) -> ScrollAction {
        match plan.mode {
            MergeMode::PrependOlder => {
                if plan.batch_len == 0 {
                    return ScrollAction::None;
                }
                let added = after.scroll_height - snapshot.scroll_height;
                ScrollAction::SetOffset(snapshot.scroll_top + added)
            }
            MergeMode::AppendLive => {
                if plan.is_empty() || !follow_at_call {
                    return ScrollAction::None;
                }
                ScrollAction::ScrollToBottomAfter(self.delays.live)
            }
            MergeMode::ReplaceAll => {
                if !follow_at_call {
                    return ScrollAction::None;
                }
                let delay =
                    if plan.batch_len == 0 { self.delays.empty_history } else { self.delays.history };
                ScrollAction::ScrollToBottomAfter(delay)
            }
        }
    }
}
