// Rendering seam. The session decides order and position; a view decides
// how rows look and reports the geometry the scroll anchor needs.

use chatsync_common::display::{display_label, format_display_time, is_own_message};
use chatsync_common::MessageId;
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::merge::{InsertPlan, InsertPosition};
use crate::scroll::ViewportMetrics;

pub trait TranscriptView {
    /// Current geometry of the scroll container.
    fn metrics(&self) -> ViewportMetrics;

    /// Materialize a merge result.
    fn apply(&mut self, plan: &InsertPlan);

    fn set_scroll_top(&mut self, scroll_top: f64);

    /// Show or hide the "loading older messages" indicator.
    fn set_loading_indicator(&mut self, _visible: bool) {}
}

/// A rendered transcript row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    pub id: MessageId,
    pub label: String,
    pub time: String,
    pub own: bool,
}

/// Headless view with fixed-height rows. Geometry behaves like a scroll
/// container: content shorter than the viewport still reports the viewport
/// height, and offsets clamp to the reachable range.
#[derive(Debug, Clone)]
pub struct SimulatedView {
    client_name: String,
    row_height: f64,
    client_height: f64,
    scroll_top: f64,
    rows: Vec<RenderedRow>,
    loading_visible: bool,
}

impl SimulatedView {
    pub fn new(client_name: impl Into<String>, row_height: f64, client_height: f64) -> Self {
        Self {
            client_name: client_name.into(),
            row_height,
            client_height,
            scroll_top: 0.0,
            rows: Vec::new(),
            loading_visible: false,
        }
    }

    pub fn rows(&self) -> &[RenderedRow] {
        &self.rows
    }

    pub fn row_ids(&self) -> Vec<MessageId> {
        self.rows.iter().map(|row| row.id.clone()).collect()
    }

    pub fn loading_visible(&self) -> bool {
        self.loading_visible
    }

    fn render(&self, plan: &InsertPlan) -> Vec<RenderedRow> {
        let now = Utc::now();
        plan.inserted
            .iter()
            .map(|message| RenderedRow {
                id: message.id.clone(),
                label: display_label(message, &self.client_name),
                time: format_display_time(Some(message.shown_timestamp()), now),
                own: is_own_message(message, &self.client_name),
            })
            .collect()
    }
}

impl TranscriptView for SimulatedView {
    fn metrics(&self) -> ViewportMetrics {
        let content = self.rows.len() as f64 * self.row_height;
        ViewportMetrics {
            scroll_height: content.max(self.client_height),
            scroll_top: self.scroll_top,
            client_height: self.client_height,
        }
    }

    fn apply(&mut self, plan: &InsertPlan) {
        let rendered = self.render(plan);
        match &plan.position {
            InsertPosition::ReplaceAll => {
                self.rows = rendered;
            }
            InsertPosition::Append => self.rows.extend(rendered),
            InsertPosition::Before(anchor) => {
                // Older rows always belong above existing content.
                let index = self.rows.iter().position(|row| &row.id == anchor).unwrap_or_else(|| {
                    warn!(anchor = %anchor, "anchor row not rendered, inserting at top");
                    0
                });
                self.rows.splice(index..index, rendered);
            }
        }
        let max = self.metrics().max_scroll_top();
        self.scroll_top = self.scroll_top.min(max);
    }

    fn set_scroll_top(&mut self, scroll_top: f64) {
        let max = self.metrics().max_scroll_top();
        self.scroll_top = scroll_top.clamp(0.0, max);
    }

    fn set_loading_indicator(&mut self, visible: bool) {
        self.loading_visible = visible;
    }
}
