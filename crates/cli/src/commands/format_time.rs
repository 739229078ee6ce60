// `chatsync format-time` — render a timestamp the way transcript rows show it.

use chatsync_common::display::format_display_time_in;
use chatsync_common::Timestamp;
use chrono::{FixedOffset, Utc};
use clap::Args;
use serde::Serialize;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct FormatTimeArgs {
    /// Raw timestamp (RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or epoch millis).
    pub timestamp: String,

    /// Display offset from UTC, in minutes.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    utc_offset: i32,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
pub struct FormattedTime {
    pub raw: String,
    pub display: String,
    /// False when the input did not parse and the current time was shown.
    pub parsed: bool,
}

pub fn run(args: FormatTimeArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match execute(&args) {
        Ok(result) => {
            output::print_output(format, &result, |r| r.display.clone())?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn execute(args: &FormatTimeArgs) -> anyhow::Result<FormattedTime> {
    let offset = FixedOffset::east_opt(args.utc_offset * 60)
        .ok_or_else(|| anyhow::anyhow!("--utc-offset {} is out of range", args.utc_offset))?;
    let timestamp = Timestamp::new(args.timestamp.clone());
    let display = format_display_time_in(Some(&timestamp), Utc::now(), &offset);
    if !timestamp.is_comparable() {
        tracing::warn!(raw = %args.timestamp, "timestamp did not parse, showing current time");
    }
    Ok(FormattedTime { raw: args.timestamp.clone(), display, parsed: timestamp.is_comparable() })
}
