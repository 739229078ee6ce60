// `chatsync config` — show or write the effective sync configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chatsync_client::config::global_config_path;
use chatsync_client::SyncConfig;
use clap::Args;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config file (defaults to ~/.chatsync/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config back to the file.
    #[arg(long)]
    write: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match execute(&args) {
        Ok(config) => {
            output::print_output(format, &config, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn execute(args: &ConfigArgs) -> anyhow::Result<SyncConfig> {
    let config = load_config(args.config.as_deref())?;
    if args.write {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => global_config_path().context("cannot locate home directory")?,
        };
        config
            .save_to(&path)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        tracing::info!(path = %path.display(), "config written");
    }
    Ok(config)
}

/// Resolve the effective config: an explicit file when given, otherwise the
/// global one. Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SyncConfig> {
    let config = match path {
        Some(path) if path.exists() => SyncConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?
            .apply_env_fn(|key| std::env::var(key))?,
        Some(_) => SyncConfig::default().apply_env_fn(|key| std::env::var(key))?,
        None => SyncConfig::load().context("failed to load global config")?,
    };
    Ok(config)
}

fn format_human(config: &SyncConfig) -> String {
    toml::to_string_pretty(config)
        .unwrap_or_else(|error| format!("<config could not be rendered: {error}>"))
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_file_is_loaded() {
        let tmp = TempDir::new().expect("temp dir should be created");
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "page_limit = 7\n").expect("write config");

        let config = load_config(Some(&path)).expect("config should load");
        assert_eq!(config.page_limit, 7);
    }

    #[test]
    fn write_flag_creates_missing_file() {
        let tmp = TempDir::new().expect("temp dir should be created");
        let path = tmp.path().join("nested").join("config.toml");
        let args = ConfigArgs { config: Some(path.clone()), write: true, json: true };

        execute(&args).expect("config should be written");
        assert!(path.exists());
        assert!(SyncConfig::load_from(&path).is_ok());
    }

    #[test]
    fn invalid_file_reports_context() {
        let tmp = TempDir::new().expect("temp dir should be created");
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "initial_limit = 0\n").expect("write config");

        let error = load_config(Some(&path)).expect_err("invalid config should fail");
        assert!(format!("{error:#}").contains("invalid config"));
    }

    #[test]
    fn human_rendering_is_toml() {
        let rendered = format_human(&SyncConfig::default());
        assert!(rendered.contains("page_limit = 20"));
        assert!(rendered.contains("client_name = \"DefaultUser\""));
    }
}
