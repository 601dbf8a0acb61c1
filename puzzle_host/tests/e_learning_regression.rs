use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

fn scenario_dir() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .expect("workspace root should exist")
        .join("scenarios")
        .join("e_learning")
}

fn labels(log: &Value) -> Vec<String> {
    log["events"]
        .as_array()
        .map(|events| {
            events
                .iter()
                .filter_map(|event| event["label"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn guided_walkthrough_reaches_the_final_step() -> Result<()> {
    let dir = scenario_dir();
    assert!(dir.is_dir(), "expected fixtures at {}", dir.display());

    let temp_dir = tempdir().context("creating temporary directory for logs")?;
    let event_log_path = temp_dir.path().join("events.json");
    let progress_path = temp_dir.path().join("progress.json");

    let output = Command::new(env!("CARGO_BIN_EXE_puzzle_host"))
        .arg("--scene")
        .arg(dir.join("scene.json"))
        .arg("--scenario")
        .arg(dir.join("scenario.json"))
        .arg("--input")
        .arg(dir.join("input.json"))
        .arg("--event-log-json")
        .arg(&event_log_path)
        .arg("--progress-json")
        .arg(&progress_path)
        .output()
        .context("executing puzzle_host e-learning replay")?;

    assert!(
        output.status.success(),
        "puzzle_host exited with {:?}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let log: Value = serde_json::from_str(
        &fs::read_to_string(&event_log_path).context("reading event log")?,
    )
    .context("parsing event log")?;
    assert_eq!(log["scenario"], "e_learning");
    assert_eq!(log["final_step"], 380);

    let labels = labels(&log);
    let completed: Vec<&str> = labels
        .iter()
        .filter_map(|label| label.strip_prefix("step.complete "))
        .collect();
    assert_eq!(
        completed,
        vec!["5", "40", "140", "160", "220", "280", "320", "360", "380"]
    );
    assert!(labels.iter().any(|label| label == "scene.hide startup_example"));
    assert!(labels.iter().any(|label| label == "scene.show carton_body"));
    assert!(labels
        .iter()
        .any(|label| label == "scene.text Text \"Your box is ready!\""));
    assert!(labels
        .iter()
        .any(|label| label == "progress.set cmi.core.score.raw=1.3157894736842104"));
    assert_eq!(labels.last().map(String::as_str), Some("runtime.unload"));

    let progress: Value = serde_json::from_str(
        &fs::read_to_string(&progress_path).context("reading progress snapshot")?,
    )
    .context("parsing progress snapshot")?;
    assert_eq!(progress["initialized"], true);
    assert_eq!(progress["finished"], true);
    assert_eq!(progress["commits"], 9);
    assert_eq!(progress["values"]["cmi.core.score.raw"], "100");
    assert_eq!(progress["values"]["cmi.core.lesson_status"], "passed");

    Ok(())
}

#[test]
fn walkthrough_runs_without_a_progress_adapter() -> Result<()> {
    let dir = scenario_dir();
    let temp_dir = tempdir().context("creating temporary directory for logs")?;
    let event_log_path = temp_dir.path().join("events.json");

    let output = Command::new(env!("CARGO_BIN_EXE_puzzle_host"))
        .arg("--scene")
        .arg(dir.join("scene.json"))
        .arg("--scenario")
        .arg(dir.join("scenario.json"))
        .arg("--input")
        .arg(dir.join("input.json"))
        .arg("--event-log-json")
        .arg(&event_log_path)
        .arg("--no-progress-api")
        .output()
        .context("executing puzzle_host without progress adapter")?;
    assert!(output.status.success(), "puzzle_host exited with {:?}", output.status);

    let log: Value = serde_json::from_str(&fs::read_to_string(&event_log_path)?)?;
    assert_eq!(log["final_step"], 380);
    assert!(!labels(&log).iter().any(|label| label.starts_with("progress.")));
    Ok(())
}

#[test]
fn out_of_order_clicks_leave_the_walkthrough_in_place() -> Result<()> {
    let dir = scenario_dir();
    let temp_dir = tempdir().context("creating temporary directory for input")?;
    let input_path = temp_dir.path().join("input.json");
    let event_log_path = temp_dir.path().join("events.json");
    fs::write(
        &input_path,
        r#"{
            "surface": { "left": 0, "top": 0, "width": 800, "height": 600 },
            "steps": [
                { "kind": "click", "x": 400, "y": 300 },
                { "kind": "wait", "seconds": 1 },
                { "kind": "click", "x": 210, "y": 307 },
                { "kind": "wait", "seconds": 5 },
                { "kind": "click", "x": 400, "y": 300, "button": 1 },
                { "kind": "wait", "seconds": 5 }
            ]
        }"#,
    )?;

    let output = Command::new(env!("CARGO_BIN_EXE_puzzle_host"))
        .arg("--scene")
        .arg(dir.join("scene.json"))
        .arg("--scenario")
        .arg(dir.join("scenario.json"))
        .arg("--input")
        .arg(&input_path)
        .arg("--event-log-json")
        .arg(&event_log_path)
        .output()
        .context("executing puzzle_host with out-of-order clicks")?;
    assert!(output.status.success(), "puzzle_host exited with {:?}", output.status);

    let log: Value = serde_json::from_str(&fs::read_to_string(&event_log_path)?)?;
    assert_eq!(log["final_step"], 40);
    let labels = labels(&log);
    assert!(labels.iter().any(|label| label == "step.skip 360->380 at 5"));
    Ok(())
}
