// `chatsync replay` — drive a sync session from a JSON Lines event script.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chatsync_client::script::{parse_script, replay, ReplayReport, REPLAY_VIEWPORT_HEIGHT};
use chatsync_common::ClientEvent;
use clap::Args;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Script path, or `-` for stdin.
    pub script: PathBuf,

    /// Config file (defaults to ~/.chatsync/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = REPLAY_VIEWPORT_HEIGHT)]
    height: f64,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ReplayArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match execute(&args) {
        Ok(report) => {
            output::print_output(format, &report, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn execute(args: &ReplayArgs) -> anyhow::Result<ReplayReport> {
    if !(args.height > 0.0) {
        anyhow::bail!("--height must be positive");
    }
    let config = super::config::load_config(args.config.as_deref())?;
    let text = read_script(&args.script)?;
    let steps = parse_script(&text)?;
    tracing::debug!(steps = steps.len(), "replaying script");
    replay(&config, steps, args.height)
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("failed to read script from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))
}

fn format_human(report: &ReplayReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "# {} messages, state {:?}, more history: {}",
        report.rows.len(),
        report.state,
        if report.has_more_older { "yes" } else { "no" }
    ));
    lines.push(format!(
        "cursors: {} .. {}",
        report.oldest.as_ref().map(|ts| ts.as_str()).unwrap_or("-"),
        report.newest.as_ref().map(|ts| ts.as_str()).unwrap_or("-"),
    ));
    lines.push(String::new());
    for row in &report.rows {
        lines.push(format!("[{}] {}", row.time, row.label));
    }
    if !report.outbound.is_empty() {
        lines.push(String::new());
        lines.push("sent:".to_string());
        for event in &report.outbound {
            lines.push(format!("  {}", describe(event)));
        }
    }
    lines.join("\n")
}

fn describe(event: &ClientEvent) -> String {
    match event {
        ClientEvent::SendMessage(text) => format!("send_message {text:?}"),
        ClientEvent::LoadOlderMessages(request) => format!(
            "load_older_messages before={} limit={}",
            request.before_timestamp, request.limit
        ),
        ClientEvent::RefreshChat(request) => format!("refresh_chat limit={}", request.limit),
        ClientEvent::CheckNewMessages => "check_new_messages".to_string(),
    }
}
