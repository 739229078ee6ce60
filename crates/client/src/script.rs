// Scripted replay: drive a session from a recorded event log.
//
// One step per line (JSON Lines), each `{"event": "<name>", "payload": ...}`.
// Inbound event names decode as server events; `scroll`, `submit`,
// `heartbeat` and `refresh` stand in for local triggers. Deferred scrolls
// run immediately since there is no layout to wait for.

use anyhow::{bail, Context, Result};
use chatsync_common::{ClientEvent, ServerEvent, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SyncConfig;
use crate::scroll::ScrollAction;
use crate::session::{SessionState, SyncSession};
use crate::transport::{ChatTransport, RecordingTransport};
use crate::view::{RenderedRow, SimulatedView, TranscriptView};

/// Row height used by replays.
pub const REPLAY_ROW_HEIGHT: f64 = 20.0;
/// Default replay viewport height.
pub const REPLAY_VIEWPORT_HEIGHT: f64 = 400.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Server(ServerEvent),
    Scroll { scroll_top: f64 },
    Submit { text: String },
    Heartbeat,
    Refresh,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ScrollPayload {
    scroll_top: f64,
}

#[derive(Debug, Deserialize)]
struct SubmitPayload {
    text: String,
}

impl ScriptStep {
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawStep = serde_json::from_value(value).context("step must be {event, payload}")?;
        let step = match raw.event.as_str() {
            "scroll" => {
                let payload: ScrollPayload =
                    serde_json::from_value(raw.payload).context("malformed `scroll` payload")?;
                Self::Scroll { scroll_top: payload.scroll_top }
            }
            "submit" => {
                let payload: SubmitPayload =
                    serde_json::from_value(raw.payload).context("malformed `submit` payload")?;
                Self::Submit { text: payload.text }
            }
            "heartbeat" => Self::Heartbeat,
            "refresh" => Self::Refresh,
            name => Self::Server(ServerEvent::from_named(name, raw.payload)?),
        };
        Ok(step)
    }
}

/// Parse a JSON Lines script. Blank lines are skipped.
pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("line {} is not valid JSON", index + 1))?;
        let step = ScriptStep::from_value(value).with_context(|| format!("line {}", index + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

/// Run one step against a session, executing any deferred scroll at once.
pub fn apply_step<T: ChatTransport, V: TranscriptView>(
    session: &mut SyncSession<T>,
    view: &mut V,
    step: ScriptStep,
) -> Result<()> {
    match step {
        ScriptStep::Server(event) => {
            let action = session.handle(event, view)?;
            if let ScrollAction::ScrollToBottomAfter(_) = action {
                session.scroll_to_bottom(view);
            }
        }
        ScriptStep::Scroll { scroll_top } => {
            if !scroll_top.is_finite() {
                bail!("scroll_top must be finite");
            }
            view.set_scroll_top(scroll_top);
            session.on_scroll(view)?;
        }
        ScriptStep::Submit { text } => {
            session.send_message(&text)?;
        }
        ScriptStep::Heartbeat => {
            session.heartbeat()?;
        }
        ScriptStep::Refresh => session.refresh()?,
    }
    Ok(())
}

/// Final state of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub state: SessionState,
    pub outbound: Vec<ClientEvent>,
    pub rows: Vec<RenderedRow>,
    pub oldest: Option<Timestamp>,
    pub newest: Option<Timestamp>,
    pub has_more_older: bool,
    pub is_loading_older: bool,
    pub auto_follow: bool,
    pub scroll_top: f64,
}

/// Replay `steps` on a fresh session over a [`SimulatedView`].
pub fn replay(config: &SyncConfig, steps: Vec<ScriptStep>, viewport_height: f64) -> Result<ReplayReport> {
    let mut session = SyncSession::new(config, RecordingTransport::default());
    let mut view = SimulatedView::new(config.client_name.clone(), REPLAY_ROW_HEIGHT, viewport_height);

    for (index, step) in steps.into_iter().enumerate() {
        apply_step(&mut session, &mut view, step)
            .with_context(|| format!("replay step {} failed", index + 1))?;
    }

    let cursors = session.engine().cursors();
    Ok(ReplayReport {
        state: session.state(),
        outbound: session.transport().sent.clone(),
        rows: view.rows().to_vec(),
        oldest: cursors.oldest().cloned(),
        newest: cursors.newest().cloned(),
        has_more_older: session.engine().pagination().has_more_older(),
        is_loading_older: session.is_loading_older(),
        auto_follow: session.anchor().auto_follow_enabled(),
        scroll_top: view.metrics().scroll_top,
    })
}
