// CLI subcommand dispatch.

use clap::Subcommand;

pub mod config;
pub mod format_time;
pub mod replay;

#[derive(Subcommand)]
pub enum Command {
    /// Drive a sync session from a JSON Lines event script
    Replay(replay::ReplayArgs),
    /// Show (or write) the effective sync configuration
    Config(config::ConfigArgs),
    /// Render a timestamp the way the transcript shows it
    FormatTime(format_time::FormatTimeArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Replay(args) => replay::run(args),
        Command::Config(args) => config::run(args),
        Command::FormatTime(args) => format_time::run(args),
    }
}
