use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use puzzle_runtime::procedure::Procedure;
use puzzle_runtime::{
    FrameWindow, MemoryProgressStore, PreloaderHooks, ProgressReporter, Runtime, Scenario,
    StepConfig,
};
use puzzle_scene::MemoryScene;
use serde::Serialize;

use crate::cli::ReplayArgs;
use crate::input::{InputScript, Replay};

/// Frames between the content window and the window exposing the adapter.
const LMS_FRAME_DEPTH: usize = 2;

pub fn execute(args: ReplayArgs) -> Result<()> {
    let ReplayArgs {
        scene,
        scenario,
        input,
        frame_seconds,
        event_log_json,
        progress_json,
        progress_api,
        verbose,
    } = args;

    let scene = MemoryScene::from_json_file(&scene)
        .with_context(|| format!("loading scene {}", scene.display()))?;
    let scenario = Scenario::from_json_file(&scenario)?;
    let script = match input.as_ref() {
        Some(path) => InputScript::from_json_file(path)?,
        None => InputScript::default(),
    };

    let loaded = Rc::new(Cell::new(0u32));
    let options = scenario.init_options(preloader_hooks(Rc::clone(&loaded)));
    options.preloader.start();
    options.preloader.progress(100.0);
    options.preloader.end();
    log::info!(
        target: "puzzle_host",
        "scene loaded ({}%), fade annotations {}",
        loaded.get(),
        options.fade_annotations
    );

    let store = progress_api.then(|| {
        Rc::new(MemoryProgressStore::with_values([(
            status_key(&scenario),
            "not attempted".to_string(),
        )]))
    });
    let reporter = match store.as_ref() {
        Some(store) => {
            let window = FrameWindow::with_api(store.clone()).nested(LMS_FRAME_DEPTH);
            ProgressReporter::discover(&window)
        }
        None => ProgressReporter::absent(),
    };

    let mut runtime = Runtime::new(scene, &options)
        .with_surface(script.surface)
        .with_progress(reporter);
    scenario.install(&mut runtime);

    let mut replay = Replay::new(frame_seconds);
    replay.run(&mut runtime, &script.steps);

    if let Some(path) = event_log_json.as_ref() {
        let log = build_event_log(&scenario, &runtime);
        let json = serde_json::to_string_pretty(&log).context("serializing event log to JSON")?;
        write_json(path, &json, "event log")?;
    }

    if let (Some(path), Some(store)) = (progress_json.as_ref(), store.as_ref()) {
        let json = serde_json::to_string_pretty(&store.snapshot())
            .context("serializing progress snapshot to JSON")?;
        write_json(path, &json, "progress snapshot")?;
    }

    print_summary(&scenario, &runtime, &replay, verbose);
    if let Some(store) = store.as_ref() {
        let snapshot = store.snapshot();
        println!(
            "Progress -> commits: {} | finished: {}",
            snapshot.commits, snapshot.finished
        );
        for (key, value) in &snapshot.values {
            println!("  {key} = {value}");
        }
    }

    Ok(())
}

fn preloader_hooks(loaded: Rc<Cell<u32>>) -> PreloaderHooks {
    PreloaderHooks {
        on_start: Some(Rc::new(|| log::debug!(target: "puzzle_host", "preloader start"))),
        on_progress: Some(Rc::new(move |percentage: u32| loaded.set(percentage))),
        on_end: Some(Rc::new(|| log::debug!(target: "puzzle_host", "preloader end"))),
    }
}

fn status_key(scenario: &Scenario) -> String {
    match &scenario.procedure {
        Procedure::Guided(guided) => guided.steps.status_key.clone(),
        Procedure::Scroll(_) => StepConfig::default().status_key,
    }
}

fn write_json(path: &Path, json: &str, what: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct EventLogEntry<'a> {
    sequence: u32,
    label: &'a str,
}

#[derive(Serialize)]
struct EventLog<'a> {
    scenario: &'a str,
    final_step: i64,
    events: Vec<EventLogEntry<'a>>,
}

fn build_event_log<'a>(scenario: &'a Scenario, runtime: &'a Runtime<MemoryScene>) -> EventLog<'a> {
    let events = runtime
        .events()
        .iter()
        .enumerate()
        .map(|(index, label)| EventLogEntry {
            sequence: index as u32,
            label: label.as_str(),
        })
        .collect();
    EventLog {
        scenario: &scenario.name,
        final_step: runtime.current_step(),
        events,
    }
}

fn print_summary(scenario: &Scenario, runtime: &Runtime<MemoryScene>, replay: &Replay, verbose: bool) {
    println!("Scenario: {}", scenario.name);
    println!(
        "Replayed {:.3}s over {} frame(s) | step {} | unloaded: {}",
        replay.elapsed_seconds(),
        replay.frames(),
        runtime.current_step(),
        runtime.is_unloaded()
    );

    let events = runtime.events();
    let limit = if verbose { events.len() } else { events.len().min(12) };
    println!("\nEvents:");
    for (index, event) in events.iter().enumerate().skip(events.len() - limit) {
        println!("  {index:>4}. {event}");
    }
    if !verbose && events.len() > limit {
        println!("  ... {} earlier events (use --verbose)", events.len() - limit);
    }
}
