// Sync session: the top-level state machine.
//
// Owns the merge engine, the scroll anchor and the transport. Every inbound
// event, scroll notification, heartbeat tick and submit is a method call
// here, so the whole core runs on whichever single task owns the session.

use anyhow::{Context, Result};
use chatsync_common::{ClientEvent, Message, RefreshRequest, ServerEvent, SyncStatus};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::merge::{InsertPlan, MergeEngine, MergeMode, Transcript};
use crate::scroll::{ScrollAction, ScrollAnchor};
use crate::transport::ChatTransport;
use crate::view::TranscriptView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No transport connection yet, or the last one dropped.
    Connecting,
    /// Refresh requested, waiting for `chat_history`.
    SyncingInitial,
    Live,
}

pub struct SyncSession<T: ChatTransport> {
    transport: T,
    engine: MergeEngine,
    anchor: ScrollAnchor,
    state: SessionState,
    connected: bool,
    last_status: Option<SyncStatus>,
    last_plan: Option<InsertPlan>,
}

impl<T: ChatTransport> SyncSession<T> {
    pub fn new(config: &SyncConfig, transport: T) -> Self {
        Self {
            transport,
            engine: MergeEngine::new(config.page_limit, config.initial_limit),
            anchor: ScrollAnchor::new(
                config.near_top_threshold_px,
                config.near_bottom_threshold_px,
                config.scroll_delays(),
            ),
            state: SessionState::Connecting,
            connected: false,
            last_status: None,
            last_plan: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    pub fn anchor(&self) -> &ScrollAnchor {
        &self.anchor
    }

    pub fn transcript(&self) -> &Transcript {
        self.engine.transcript()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Whether a backward page is in flight; drives the loading indicator.
    pub fn is_loading_older(&self) -> bool {
        self.engine.pagination().is_loading_older()
    }

    pub fn last_status(&self) -> Option<&SyncStatus> {
        self.last_status.as_ref()
    }

    /// The most recent merge result, if any batch has been merged.
    pub fn last_plan(&self) -> Option<&InsertPlan> {
        self.last_plan.as_ref()
    }

    // ── Inbound events ──────────────────────────────────────────────

    /// Dispatch one inbound event. A returned `ScrollToBottomAfter` is the
    /// caller's to schedule; offsets are applied to `view` before returning.
    pub fn handle<V: TranscriptView>(
        &mut self,
        event: ServerEvent,
        view: &mut V,
    ) -> Result<ScrollAction> {
        let action = match event {
            ServerEvent::Connect => {
                self.on_connect()?;
                ScrollAction::None
            }
            ServerEvent::Disconnect => {
                self.on_disconnect();
                ScrollAction::None
            }
            ServerEvent::ChatHistory(batch) => self.on_chat_history(batch, view),
            ServerEvent::ReceiveMessage(message) => self.on_receive_message(message, view),
            ServerEvent::OlderMessages(batch) => self.on_older_messages(batch, view),
            ServerEvent::SyncStatus(status) => {
                self.on_sync_status(status);
                ScrollAction::None
            }
        };
        view.set_loading_indicator(self.is_loading_older());
        Ok(action)
    }

    /// Every connect, first or not, funnels into a full refresh.
    pub fn on_connect(&mut self) -> Result<()> {
        self.connected = true;
        self.refresh()
    }

    pub fn on_disconnect(&mut self) {
        self.connected = false;
        self.state = SessionState::Connecting;
        info!(transcript_len = self.transcript().len(), "transport disconnected");
    }

    pub fn on_chat_history<V: TranscriptView>(
        &mut self,
        batch: Vec<Message>,
        view: &mut V,
    ) -> ScrollAction {
        let action = self.merge_into_view(batch, MergeMode::ReplaceAll, view);
        self.state = SessionState::Live;
        action
    }

    pub fn on_receive_message<V: TranscriptView>(
        &mut self,
        message: Message,
        view: &mut V,
    ) -> ScrollAction {
        self.merge_into_view(vec![message], MergeMode::AppendLive, view)
    }

    pub fn on_older_messages<V: TranscriptView>(
        &mut self,
        batch: Vec<Message>,
        view: &mut V,
    ) -> ScrollAction {
        if !self.engine.claim_older_response() {
            debug!(
                batch_len = batch.len(),
                generation = self.engine.generation(),
                "stale older-messages response ignored"
            );
            return ScrollAction::None;
        }
        self.merge_into_view(batch, MergeMode::PrependOlder, view)
    }

    /// Observability only; core state is untouched.
    pub fn on_sync_status(&mut self, status: SyncStatus) {
        info!(status = %status.status, "sync status");
        self.last_status = Some(status);
    }

    // ── Local triggers ──────────────────────────────────────────────

    /// Scroll notification. Recomputes auto-follow and, when near the top,
    /// tries to page backward. Returns whether a request went out.
    pub fn on_scroll<V: TranscriptView>(&mut self, view: &mut V) -> Result<bool> {
        let near_top = self.anchor.on_scroll(&view.metrics());
        if !near_top {
            return Ok(false);
        }
        self.load_older(view)
    }

    /// Issue a backward page request if every guard allows it.
    pub fn load_older<V: TranscriptView>(&mut self, view: &mut V) -> Result<bool> {
        let Some(request) = self.engine.request_older() else {
            return Ok(false);
        };
        let before = request.before_timestamp.clone();
        if let Err(error) = self.transport.emit(&ClientEvent::LoadOlderMessages(request)) {
            self.engine.abandon_older_request();
            return Err(error).context("failed to request older messages");
        }
        debug!(before = %before, "older messages requested");
        view.set_loading_indicator(true);
        Ok(true)
    }

    /// Request a full refresh and hold paging until it lands.
    pub fn refresh(&mut self) -> Result<()> {
        self.engine.begin_refresh();
        self.state = SessionState::SyncingInitial;
        let limit = self.engine.pagination().initial_limit();
        info!(limit, "requesting full refresh");
        self.transport
            .emit(&ClientEvent::RefreshChat(RefreshRequest { limit }))
            .context("failed to request chat refresh")
    }

    /// Heartbeat tick. Returns whether a nudge was emitted.
    pub fn heartbeat(&mut self) -> Result<bool> {
        if !self.connected {
            return Ok(false);
        }
        self.transport
            .emit(&ClientEvent::CheckNewMessages)
            .context("failed to emit heartbeat")?;
        Ok(true)
    }

    /// Submit a chat line. Returns `false` when nothing was sent.
    pub fn send_message(&mut self, text: &str) -> Result<bool> {
        let text = text.trim();
        if text.is_empty() || !self.connected {
            debug!(connected = self.connected, "submit ignored");
            return Ok(false);
        }
        self.transport
            .emit(&ClientEvent::SendMessage(text.to_string()))
            .context("failed to send message")?;
        Ok(true)
    }

    /// Run a deferred scroll-to-bottom.
    pub fn scroll_to_bottom<V: TranscriptView>(&mut self, view: &mut V) {
        let bottom = view.metrics().max_scroll_top();
        view.set_scroll_top(bottom);
        self.anchor.mark_at_bottom();
    }

    /// Tear down: releases the transport. Core state stays readable.
    pub fn close(&mut self) {
        if self.connected {
            warn!("closing session while still connected");
        }
        self.connected = false;
        self.transport.close();
    }

    // ── Merge plumbing ──────────────────────────────────────────────

    fn merge_into_view<V: TranscriptView>(
        &mut self,
        batch: Vec<Message>,
        mode: MergeMode,
        view: &mut V,
    ) -> ScrollAction {
        let follow = self.anchor.auto_follow_enabled();
        let snapshot = self.anchor.capture_before(&view.metrics());

        let plan = self.engine.merge(batch, mode);
        view.apply(&plan);

        let action = self.anchor.restore_after(&snapshot, &plan, &view.metrics(), follow);
        if let ScrollAction::SetOffset(offset) = action {
            view.set_scroll_top(offset);
        }
        view.set_loading_indicator(self.is_loading_older());
        self.last_plan = Some(plan);
        action
    }
}
