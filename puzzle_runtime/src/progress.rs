//! Learning-record progress reporting.
//!
//! The runtime talks to an optional [`ProgressApi`] adapter found in the host
//! window hierarchy. When no adapter exists every read returns an empty
//! string and every write is dropped.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use puzzle_scene::SceneEngine;
use serde::Serialize;

use crate::runtime::Runtime;

/// Parent hops searched before discovery gives up.
pub const MAX_DISCOVERY_DEPTH: usize = 7;

const NOT_ATTEMPTED: &str = "not attempted";
const INCOMPLETE: &str = "incomplete";

/// Host-provided learning-record adapter. Every call answers with the
/// adapter's string result.
pub trait ProgressApi {
    fn initialize(&self) -> String;
    fn finish(&self) -> String;
    fn commit(&self) -> String;
    fn get_value(&self, key: &str) -> String;
    fn set_value(&self, key: &str, value: &str) -> String;
}

impl fmt::Debug for dyn ProgressApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressApi")
    }
}

/// Window of the host page hierarchy.
pub trait HostWindow {
    fn progress_api(&self) -> Option<Rc<dyn ProgressApi>>;
    /// `None` for a top-level window.
    fn parent(&self) -> Option<&dyn HostWindow>;
    fn opener(&self) -> Option<&dyn HostWindow>;
}

fn find_in_ancestors(window: &dyn HostWindow) -> Option<Rc<dyn ProgressApi>> {
    let mut current = window;
    let mut hops = 0;
    loop {
        if let Some(api) = current.progress_api() {
            return Some(api);
        }
        let parent = current.parent()?;
        hops += 1;
        if hops > MAX_DISCOVERY_DEPTH {
            log::error!(
                target: "puzzle_runtime",
                "progress API discovery: window hierarchy nested deeper than {MAX_DISCOVERY_DEPTH} levels"
            );
            return None;
        }
        current = parent;
    }
}

/// Looks for an adapter in `window` and its parents, then in its opener's
/// hierarchy, then in the hierarchy of its parent's opener.
pub fn discover_progress_api(window: &dyn HostWindow) -> Option<Rc<dyn ProgressApi>> {
    let api = find_in_ancestors(window)
        .or_else(|| window.opener().and_then(find_in_ancestors))
        .or_else(|| {
            window
                .parent()
                .and_then(|parent| parent.opener())
                .and_then(find_in_ancestors)
        });
    if api.is_none() {
        log::warn!(target: "puzzle_runtime", "unable to find a progress API adapter");
    }
    api
}

/// Owned window tree, enough to describe frames and popups.
#[derive(Default)]
pub struct FrameWindow {
    pub api: Option<Rc<dyn ProgressApi>>,
    pub parent: Option<Box<FrameWindow>>,
    pub opener: Option<Box<FrameWindow>>,
}

impl FrameWindow {
    pub fn with_api(api: Rc<dyn ProgressApi>) -> Self {
        FrameWindow {
            api: Some(api),
            ..FrameWindow::default()
        }
    }

    /// Wraps `self` in `depth` empty frames, returning the innermost one.
    pub fn nested(self, depth: usize) -> Self {
        let mut window = self;
        for _ in 0..depth {
            window = FrameWindow {
                parent: Some(Box::new(window)),
                ..FrameWindow::default()
            };
        }
        window
    }

    pub fn opened_by(mut self, opener: FrameWindow) -> Self {
        self.opener = Some(Box::new(opener));
        self
    }
}

impl HostWindow for FrameWindow {
    fn progress_api(&self) -> Option<Rc<dyn ProgressApi>> {
        self.api.clone()
    }

    fn parent(&self) -> Option<&dyn HostWindow> {
        self.parent.as_deref().map(|parent| parent as &dyn HostWindow)
    }

    fn opener(&self) -> Option<&dyn HostWindow> {
        self.opener.as_deref().map(|opener| opener as &dyn HostWindow)
    }
}

/// Optional adapter wrapper. Calls return `None` when no adapter is present.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    api: Option<Rc<dyn ProgressApi>>,
}

impl ProgressReporter {
    pub fn new(api: Rc<dyn ProgressApi>) -> Self {
        ProgressReporter { api: Some(api) }
    }

    pub fn absent() -> Self {
        ProgressReporter { api: None }
    }

    pub fn discover(window: &dyn HostWindow) -> Self {
        ProgressReporter {
            api: discover_progress_api(window),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api.is_some()
    }

    pub fn initialize(&self) -> Option<String> {
        self.api.as_ref().map(|api| api.initialize())
    }

    pub fn finish(&self) -> Option<String> {
        self.api.as_ref().map(|api| api.finish())
    }

    pub fn commit(&self) -> Option<String> {
        self.api.as_ref().map(|api| api.commit())
    }

    pub fn get_value(&self, key: &str) -> String {
        self.api
            .as_ref()
            .map(|api| api.get_value(key))
            .unwrap_or_default()
    }

    pub fn set_value(&self, key: &str, value: &str) -> Option<String> {
        self.api.as_ref().map(|api| api.set_value(key, value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ProgressCall {
    Initialize,
    Finish,
    Commit,
    GetValue { key: String },
    SetValue { key: String, value: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub initialized: bool,
    pub finished: bool,
    pub commits: usize,
    pub values: BTreeMap<String, String>,
    pub calls: Vec<ProgressCall>,
}

/// In-memory adapter that records every call.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    values: RefCell<BTreeMap<String, String>>,
    calls: RefCell<Vec<ProgressCall>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        MemoryProgressStore {
            values: RefCell::new(values),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn value(&self, key: &str) -> String {
        self.values.borrow().get(key).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<ProgressCall> {
        self.calls.borrow().clone()
    }

    pub fn commits(&self) -> usize {
        self.count(&ProgressCall::Commit)
    }

    fn count(&self, call: &ProgressCall) -> usize {
        self.calls.borrow().iter().filter(|made| *made == call).count()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            initialized: self.count(&ProgressCall::Initialize) > 0,
            finished: self.count(&ProgressCall::Finish) > 0,
            commits: self.commits(),
            values: self.values.borrow().clone(),
            calls: self.calls(),
        }
    }

    fn record(&self, call: ProgressCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl ProgressApi for MemoryProgressStore {
    fn initialize(&self) -> String {
        self.record(ProgressCall::Initialize);
        "true".to_string()
    }

    fn finish(&self) -> String {
        self.record(ProgressCall::Finish);
        "true".to_string()
    }

    fn commit(&self) -> String {
        self.record(ProgressCall::Commit);
        "true".to_string()
    }

    fn get_value(&self, key: &str) -> String {
        self.record(ProgressCall::GetValue {
            key: key.to_string(),
        });
        self.value(key)
    }

    fn set_value(&self, key: &str, value: &str) -> String {
        self.record(ProgressCall::SetValue {
            key: key.to_string(),
            value: value.to_string(),
        });
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        "true".to_string()
    }
}

impl<S: SceneEngine + 'static> Runtime<S> {
    /// Initializes the learning record and marks a fresh attempt as
    /// incomplete.
    pub fn begin_progress_session(&mut self) {
        if self.progress.initialize().is_some() {
            self.log_event("progress.initialize");
        }
        let status_key = self.step_config().status_key.clone();
        if self.progress.get_value(&status_key) == NOT_ATTEMPTED {
            self.progress_set_value(&status_key, INCOMPLETE);
        }
    }

    pub fn finish_progress_session(&mut self) {
        if self.progress.finish().is_some() {
            self.log_event("progress.finish");
        }
    }

    pub fn progress_value(&self, key: &str) -> String {
        self.progress.get_value(key)
    }

    pub(crate) fn progress_set_value(&mut self, key: &str, value: &str) {
        if self.progress.set_value(key, value).is_some() {
            self.log_event(format!("progress.set {key}={value}"));
        }
    }

    pub(crate) fn progress_commit(&mut self) {
        if self.progress.commit().is_some() {
            self.log_event("progress.commit");
        }
    }
}

#[cfg(test)]
mod tests {
    use puzzle_scene::MemoryScene;

    use super::*;
    use crate::options::InitOptions;
    use crate::steps::StepConfig;

    fn store() -> Rc<MemoryProgressStore> {
        Rc::new(MemoryProgressStore::new())
    }

    fn same(found: Option<Rc<dyn ProgressApi>>, expected: &Rc<MemoryProgressStore>) -> bool {
        found.is_some_and(|api| {
            Rc::as_ptr(&api) as *const () == Rc::as_ptr(expected) as *const ()
        })
    }

    #[test]
    fn finds_the_api_in_the_current_window() {
        let api = store();
        let window = FrameWindow::with_api(api.clone());
        assert!(same(discover_progress_api(&window), &api));
    }

    #[test]
    fn walks_up_to_the_depth_limit() {
        let api = store();
        let window = FrameWindow::with_api(api.clone()).nested(MAX_DISCOVERY_DEPTH);
        assert!(same(discover_progress_api(&window), &api));

        let too_deep = FrameWindow::with_api(api).nested(MAX_DISCOVERY_DEPTH + 1);
        assert!(discover_progress_api(&too_deep).is_none());
    }

    #[test]
    fn falls_back_to_the_opener_chains() {
        let api = store();
        let popup = FrameWindow::default().opened_by(FrameWindow::with_api(api.clone()).nested(2));
        assert!(same(discover_progress_api(&popup), &api));

        let other = store();
        let framed_popup = FrameWindow {
            parent: Some(Box::new(
                FrameWindow::default().opened_by(FrameWindow::with_api(other.clone())),
            )),
            ..FrameWindow::default()
        };
        assert!(same(discover_progress_api(&framed_popup), &other));
    }

    #[test]
    fn absent_reporter_degrades_to_empty_results() {
        let reporter = ProgressReporter::discover(&FrameWindow::default().nested(3));
        assert!(!reporter.is_available());
        assert_eq!(reporter.get_value("cmi.core.lesson_status"), "");
        assert_eq!(reporter.set_value("cmi.core.score.raw", "10"), None);
        assert_eq!(reporter.commit(), None);
    }

    #[test]
    fn session_marks_fresh_attempts_incomplete() {
        let scene = MemoryScene::from_json_str(r#"{ "nodes": [] }"#).expect("scene parses");
        let api = Rc::new(MemoryProgressStore::with_values([(
            "cmi.core.lesson_status",
            "not attempted",
        )]));
        let mut runtime = Runtime::new(scene, &InitOptions::default())
            .with_progress(ProgressReporter::new(api.clone()));
        runtime.begin_progress_session();
        assert_eq!(api.value("cmi.core.lesson_status"), "incomplete");
        runtime.finish_progress_session();

        let snapshot = api.snapshot();
        assert!(snapshot.initialized);
        assert!(snapshot.finished);
        assert_eq!(
            runtime.events(),
            &[
                "progress.initialize",
                "progress.set cmi.core.lesson_status=incomplete",
                "progress.finish"
            ]
        );
    }

    #[test]
    fn session_leaves_existing_status_alone() {
        let scene = MemoryScene::from_json_str(r#"{ "nodes": [] }"#).expect("scene parses");
        let api = Rc::new(MemoryProgressStore::with_values([(
            "cmi.core.lesson_status",
            "passed",
        )]));
        let mut runtime = Runtime::new(scene, &InitOptions::default())
            .with_progress(ProgressReporter::new(api.clone()));
        runtime.begin_progress_session();
        assert_eq!(runtime.progress_value("cmi.core.lesson_status"), "passed");
        assert_eq!(api.snapshot().values.len(), 1);
    }

    #[test]
    fn session_uses_the_configured_status_key() {
        let scene = MemoryScene::from_json_str(r#"{ "nodes": [] }"#).expect("scene parses");
        let api = Rc::new(MemoryProgressStore::with_values([("status", "not attempted")]));
        let mut runtime = Runtime::new(scene, &InitOptions::default())
            .with_step_config(StepConfig {
                status_key: "status".to_string(),
                ..StepConfig::default()
            })
            .with_progress(ProgressReporter::new(api.clone()));
        runtime.begin_progress_session();
        assert_eq!(api.value("status"), "incomplete");
        assert_eq!(api.value("cmi.core.lesson_status"), "");
    }
}
