use chatsync_client::script::{parse_script, replay, ReplayReport, REPLAY_VIEWPORT_HEIGHT};
use chatsync_client::SyncConfig;
use chatsync_common::ClientEvent;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct GoldenCase {
    name: String,
    script: String,
    config: SyncConfig,
    expected: Expected,
}

/// Fields left out of `expected.json` are not checked.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Expected {
    state: Option<String>,
    labels: Option<Vec<String>>,
    outbound: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    oldest: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    newest: Option<Option<String>>,
    has_more_older: Option<bool>,
    is_loading_older: Option<bool>,
    auto_follow: Option<bool>,
    scroll_top: Option<f64>,
}

/// Keeps an explicit `null` distinct from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[test]
fn replay_golden_cases() {
    let cases_dir = golden_cases_dir();
    let cases = load_cases(&cases_dir);

    assert!(!cases.is_empty(), "no golden cases found in {}", cases_dir.display());

    let mut failures = Vec::new();
    for case in cases {
        if let Err(message) = run_case(&case) {
            failures.push(message);
        }
    }

    if !failures.is_empty() {
        panic!("{} golden case(s) failed:\n\n{}", failures.len(), failures.join("\n\n"));
    }
}

fn golden_cases_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tests/golden/cases")
}

fn load_cases(cases_dir: &Path) -> Vec<GoldenCase> {
    let mut case_dirs: Vec<PathBuf> = fs::read_dir(cases_dir)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", cases_dir.display()))
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if path.is_dir() { Some(path) } else { None }
        })
        .collect();
    case_dirs.sort();
    case_dirs.into_iter().map(load_case).collect()
}

fn load_case(case_dir: PathBuf) -> GoldenCase {
    let name = case_dir
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("<unnamed-case>")
        .to_owned();

    let script = read_required(&case_dir.join("script.jsonl"));
    let expected_path = case_dir.join("expected.json");
    let expected = serde_json::from_str::<Expected>(&read_required(&expected_path))
        .unwrap_or_else(|error| {
            panic!("failed to parse expectations in {}: {error}", expected_path.display())
        });

    let config_path = case_dir.join("config.toml");
    let config = if config_path.exists() {
        SyncConfig::load_from(&config_path)
            .unwrap_or_else(|error| panic!("failed to load {}: {error}", config_path.display()))
    } else {
        SyncConfig::default()
    };

    GoldenCase { name, script, config, expected }
}

fn run_case(case: &GoldenCase) -> Result<(), String> {
    let steps = parse_script(&case.script)
        .map_err(|error| format!("case `{}` script did not parse: {error:#}", case.name))?;
    let report = replay(&case.config, steps, REPLAY_VIEWPORT_HEIGHT)
        .map_err(|error| format!("case `{}` replay failed: {error:#}", case.name))?;

    let mut mismatches = Vec::new();
    let expected = &case.expected;

    if let Some(state) = &expected.state {
        let actual = serde_json::to_value(report.state)
            .ok()
            .and_then(|value| value.as_str().map(str::to_owned))
            .unwrap_or_default();
        check(&mut mismatches, "state", state, &actual);
    }
    if let Some(labels) = &expected.labels {
        let actual: Vec<String> = report.rows.iter().map(|row| row.label.clone()).collect();
        check(&mut mismatches, "labels", labels, &actual);
    }
    if let Some(outbound) = &expected.outbound {
        check(&mut mismatches, "outbound", outbound, &render_outbound(&report));
    }
    if let Some(oldest) = &expected.oldest {
        let actual = report.oldest.as_ref().map(|ts| ts.as_str().to_owned());
        check(&mut mismatches, "oldest", oldest, &actual);
    }
    if let Some(newest) = &expected.newest {
        let actual = report.newest.as_ref().map(|ts| ts.as_str().to_owned());
        check(&mut mismatches, "newest", newest, &actual);
    }
    if let Some(has_more) = expected.has_more_older {
        check(&mut mismatches, "has_more_older", &has_more, &report.has_more_older);
    }
    if let Some(loading) = expected.is_loading_older {
        check(&mut mismatches, "is_loading_older", &loading, &report.is_loading_older);
    }
    if let Some(follow) = expected.auto_follow {
        check(&mut mismatches, "auto_follow", &follow, &report.auto_follow);
    }
    if let Some(scroll_top) = expected.scroll_top {
        check(&mut mismatches, "scroll_top", &scroll_top, &report.scroll_top);
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(format!("case `{}` mismatched:\n{}", case.name, mismatches.join("\n")))
    }
}

fn check<T: PartialEq + std::fmt::Debug>(
    mismatches: &mut Vec<String>,
    field: &str,
    expected: &T,
    actual: &T,
) {
    if expected != actual {
        mismatches.push(format!("  {field}:\n    expected: {expected:?}\n    actual:   {actual:?}"));
    }
}

/// Outbound events as `name` or `name:payload` for compact expectations.
fn render_outbound(report: &ReplayReport) -> Vec<String> {
    report
        .outbound
        .iter()
        .map(|event| match event {
            ClientEvent::SendMessage(text) => format!("send_message:{text}"),
            ClientEvent::LoadOlderMessages(request) => format!(
                "load_older_messages:{}:{}",
                request.before_timestamp.as_str(),
                request.limit
            ),
            ClientEvent::RefreshChat(request) => format!("refresh_chat:{}", request.limit),
            ClientEvent::CheckNewMessages => "check_new_messages".to_owned(),
        })
        .collect()
}

fn read_required(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()))
}
