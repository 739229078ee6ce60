// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    let mut out = io::stdout().lock();
    write_output(&mut out, format, value, human_fn)
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line =
                render_human_stderr_line("error", message, io::stderr().is_terminal(), ANSI_RED);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");
    let lower = message.to_ascii_lowercase();

    if lower.contains("invalid config") || lower.contains("config parse error") {
        return ("CONFIG_INVALID", format!("{message}. Check the file with: chatsync config"));
    }

    if lower.contains("line ") && (lower.contains("not valid json") || lower.contains("unknown event"))
    {
        return ("SCRIPT_INVALID", message);
    }

    if lower.contains("no such file") || lower.contains("not found") {
        return ("FILE_NOT_FOUND", message);
    }

    ("COMMAND_FAILED", message)
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}
