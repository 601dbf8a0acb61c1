//! Play/stop/pause/resume/seek over named animation actions, plus the
//! registry of callbacks waiting for an action to finish.

use puzzle_scene::{LoopMode, SceneEngine};
use serde::{Deserialize, Serialize};

use crate::runtime::{Callback, Runtime};
use crate::selector::Selector;

/// Used when the scene metadata carries no frame rate.
pub const DEFAULT_FRAME_RATE: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopSetting {
    /// Keep whatever loop mode the action already has.
    #[default]
    Auto,
    Once,
    Repeat,
    PingPong,
}

impl LoopSetting {
    fn mode(self) -> Option<LoopMode> {
        match self {
            LoopSetting::Auto => None,
            LoopSetting::Once => Some(LoopMode::Once),
            LoopSetting::Repeat => Some(LoopMode::Repeat),
            LoopSetting::PingPong => Some(LoopMode::PingPong),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayOptions {
    /// First frame of the played window.
    pub from: Option<f64>,
    /// Last frame of the played window; the full clip when unset.
    pub to: Option<f64>,
    #[serde(rename = "loop")]
    pub loop_setting: LoopSetting,
    pub speed: f64,
    /// Leave the repetition count alone instead of repeating forever.
    pub legacy: bool,
    pub reverse: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        PlayOptions {
            from: None,
            to: None,
            loop_setting: LoopSetting::Auto,
            speed: 1.0,
            legacy: false,
            reverse: false,
        }
    }
}

impl PlayOptions {
    pub fn window(from: f64, to: f64) -> Self {
        PlayOptions {
            from: Some(from),
            to: Some(to),
            ..PlayOptions::default()
        }
    }

    pub fn legacy(mut self) -> Self {
        self.legacy = true;
        self
    }
}

/// (action, callback) pairs in registration order.
pub(crate) struct FinishedCallbacks<S> {
    entries: Vec<(String, Callback<S>)>,
}

impl<S> Default for FinishedCallbacks<S> {
    fn default() -> Self {
        FinishedCallbacks {
            entries: Vec::new(),
        }
    }
}

impl<S> FinishedCallbacks<S> {
    /// Returns `false` when the exact pair is already registered.
    pub(crate) fn register(&mut self, action: &str, callback: Callback<S>) -> bool {
        let present = self
            .entries
            .iter()
            .any(|(name, existing)| name == action && existing.same(&callback));
        if !present {
            self.entries.push((action.to_string(), callback));
        }
        !present
    }

    pub(crate) fn remove_action(&mut self, action: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(name, _)| name != action);
        before - self.entries.len()
    }

    /// Removes and returns every callback waiting on `action`.
    pub(crate) fn take(&mut self, action: &str) -> Vec<Callback<S>> {
        let mut taken = Vec::new();
        self.entries.retain(|(name, callback)| {
            if name == action {
                taken.push(callback.clone());
                false
            } else {
                true
            }
        });
        taken
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<S: SceneEngine + 'static> Runtime<S> {
    /// Resolved names that have an animation action.
    pub fn animations(&self, selector: &Selector) -> Vec<String> {
        self.resolve(selector)
            .into_iter()
            .filter(|name| self.scene.action(name).is_some())
            .collect()
    }

    pub fn pending_finish_callbacks(&self) -> usize {
        self.finished.len()
    }

    fn frame_rate(&self, action: &str) -> f64 {
        self.scene
            .action_frame_rate(action)
            .filter(|rate| *rate > 0.0)
            .unwrap_or(DEFAULT_FRAME_RATE)
    }

    pub fn play_animations(
        &mut self,
        selector: &Selector,
        options: &PlayOptions,
        on_finished: Callback<S>,
    ) {
        for name in self.resolve(selector) {
            self.play_action(&name, options, &on_finished);
        }
        self.install_finished_listener();
    }

    fn play_action(&mut self, name: &str, options: &PlayOptions, on_finished: &Callback<S>) {
        let frame_rate = self.frame_rate(name);
        let Some(action) = self.scene.action_mut(name) else {
            log::debug!(target: "puzzle_runtime", "play: no action named {name:?}");
            return;
        };
        if action.is_running() {
            return;
        }

        action.reset();
        if let Some(mode) = options.loop_setting.mode() {
            action.set_loop(mode);
        }
        if !options.legacy {
            action.set_repetitions(None);
        }
        let mut time_scale = options.speed.abs();
        if options.reverse {
            time_scale = -time_scale;
        }
        action.set_time_scale(time_scale);
        action.set_time_start(options.from.map_or(0.0, |from| from / frame_rate));
        match options.to {
            Some(to) => action.set_clip_duration(to / frame_rate),
            None => action.reset_clip_duration(),
        }
        let start = if time_scale >= 0.0 {
            action.time_start()
        } else {
            action.clip_duration()
        };
        action.set_time(start);
        action.set_paused(false);
        action.play();

        self.finished.register(name, on_finished.clone());
        self.log_event(format!("anim.play {name}"));
    }

    /// Stops unconditionally and forgets every callback waiting on the
    /// stopped actions.
    pub fn stop_animations(&mut self, selector: &Selector) {
        for name in self.resolve(selector) {
            let Some(action) = self.scene.action_mut(&name) else {
                continue;
            };
            action.stop();
            let purged = self.finished.remove_action(&name);
            if purged > 0 {
                log::debug!(target: "puzzle_runtime", "stop {name}: purged {purged} callback(s)");
            }
            self.log_event(format!("anim.stop {name}"));
        }
        self.install_finished_listener();
    }

    pub fn pause_animations(&mut self, selector: &Selector) {
        self.set_paused(selector, true);
    }

    pub fn resume_animations(&mut self, selector: &Selector) {
        self.set_paused(selector, false);
    }

    fn set_paused(&mut self, selector: &Selector, paused: bool) {
        let verb = if paused { "pause" } else { "resume" };
        for name in self.resolve(selector) {
            let Some(action) = self.scene.action_mut(&name) else {
                continue;
            };
            action.set_paused(paused);
            self.log_event(format!("anim.{verb} {name}"));
        }
        self.install_finished_listener();
    }

    /// Seeks to `frame` (0 when unset), starts the action and pauses it
    /// immediately.
    pub fn set_animation_frame(&mut self, selector: &Selector, frame: Option<f64>) {
        let frame = frame.unwrap_or(0.0);
        for name in self.resolve(selector) {
            let frame_rate = self.frame_rate(&name);
            let Some(action) = self.scene.action_mut(&name) else {
                continue;
            };
            action.set_time(frame / frame_rate);
            action.play();
            action.set_paused(true);
            self.log_event(format!("anim.set_frame {name} {frame}"));
        }
        self.install_finished_listener();
    }

    fn install_finished_listener(&mut self) {
        let Some(mixer) = self.scene.mixer_id() else {
            return;
        };
        if self.mixer_listener != Some(mixer) {
            log::debug!(target: "puzzle_runtime", "listening for finished actions on mixer {}", mixer.0);
            self.mixer_listener = Some(mixer);
        }
    }

    /// Fires every callback registered against `action`, once each, in
    /// registration order.
    pub(crate) fn notify_finished(&mut self, action: &str) {
        let callbacks = self.finished.take(action);
        self.log_event(format!("anim.finished {action}"));
        for callback in callbacks {
            callback.call(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use puzzle_scene::{AnimationMixer, MemoryScene};

    use super::*;
    use crate::options::InitOptions;

    fn runtime() -> Runtime<MemoryScene> {
        let scene = MemoryScene::from_json_str(
            r#"{
                "frame_rate": 10,
                "nodes": [
                    { "name": "door", "kind": "mesh", "groups": ["parts"] },
                    { "name": "lid", "kind": "mesh", "groups": ["parts"] },
                    { "name": "static", "kind": "mesh", "groups": ["parts"] }
                ],
                "animations": [
                    { "name": "door", "frames": 20, "loop": "once" },
                    { "name": "lid", "frames": 10, "repetitions": 3 }
                ]
            }"#,
        )
        .expect("scene parses");
        Runtime::new(scene, &InitOptions::default())
    }

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Callback<MemoryScene> {
        let log = Rc::clone(log);
        Callback::new(move |_| log.borrow_mut().push(label))
    }

    #[test]
    fn animations_filters_names_without_actions() {
        let runtime = runtime();
        assert_eq!(runtime.animations(&Selector::group("parts")), vec!["door", "lid"]);
    }

    #[test]
    fn play_applies_window_and_direction() {
        let mut runtime = runtime();
        let options = PlayOptions {
            reverse: true,
            speed: -2.0,
            ..PlayOptions::window(5.0, 15.0)
        };
        runtime.play_animations(&"door".into(), &options, Callback::noop());
        let door = runtime.scene().action("door").expect("door action");
        assert_eq!(door.time_scale(), -2.0);
        assert_eq!(door.time_start(), 0.5);
        assert_eq!(door.clip_duration(), 1.5);
        assert_eq!(door.time(), 1.5);
        assert!(door.is_running());
    }

    #[test]
    fn play_on_running_action_changes_nothing() {
        let mut runtime = runtime();
        runtime.play_animations(&"door".into(), &PlayOptions::window(0.0, 20.0), Callback::noop());
        let options = PlayOptions {
            speed: 3.0,
            ..PlayOptions::window(10.0, 20.0)
        };
        runtime.play_animations(&"door".into(), &options, Callback::noop());
        let door = runtime.scene().action("door").expect("door action");
        assert_eq!(door.time_scale(), 1.0);
        assert_eq!(door.time_start(), 0.0);
        assert_eq!(runtime.pending_finish_callbacks(), 1);
    }

    #[test]
    fn identical_pairs_fire_once() {
        let mut runtime = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));
        let callback = recorder(&log, "done");
        runtime.play_animations(&"door".into(), &PlayOptions::default(), callback.clone());
        runtime.pause_animations(&"door".into());
        runtime.play_animations(&"door".into(), &PlayOptions::default(), callback);
        assert_eq!(runtime.pending_finish_callbacks(), 1);

        runtime.advance(2.5);
        assert_eq!(*log.borrow(), vec!["done"]);
        assert_eq!(runtime.pending_finish_callbacks(), 0);
    }

    #[test]
    fn distinct_callbacks_fire_in_registration_order() {
        let mut runtime = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));
        runtime.play_animations(&"door".into(), &PlayOptions::default(), recorder(&log, "first"));
        runtime.pause_animations(&"door".into());
        runtime.play_animations(&"door".into(), &PlayOptions::default(), recorder(&log, "second"));
        runtime.advance(1.0);
        assert!(log.borrow().is_empty());
        runtime.advance(1.5);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn pause_holds_the_clock_until_resumed() {
        let mut runtime = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));
        runtime.play_animations(&"door".into(), &PlayOptions::default(), recorder(&log, "door"));
        runtime.advance(0.5);
        runtime.pause_animations(&"door".into());
        runtime.advance(1.0);
        assert_eq!(runtime.scene().action("door").map(|a| a.time()), Some(0.5));
        assert_eq!(runtime.pending_finish_callbacks(), 1);

        runtime.resume_animations(&"door".into());
        assert!(runtime.scene().action("door").expect("door").is_running());
        runtime.advance(1.0);
        assert_eq!(runtime.scene().action("door").map(|a| a.time()), Some(1.5));
        assert!(log.borrow().is_empty());

        runtime.advance(1.0);
        assert_eq!(*log.borrow(), vec!["door"]);
        assert!(runtime.events().iter().any(|event| event == "anim.resume door"));
    }

    #[test]
    fn stop_purges_pending_callbacks() {
        let mut runtime = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));
        runtime.play_animations(&"door".into(), &PlayOptions::default(), recorder(&log, "door"));
        runtime.stop_animations(&Selector::group("parts"));
        assert_eq!(runtime.pending_finish_callbacks(), 0);
        runtime.advance(5.0);
        assert!(log.borrow().is_empty());
        assert!(!runtime.scene().action("door").expect("door").is_running());
    }

    #[test]
    fn finishes_from_an_unobserved_mixer_are_dropped() {
        let mut runtime = runtime();
        let log = Rc::new(RefCell::new(Vec::new()));
        runtime.play_animations(&"door".into(), &PlayOptions::default(), recorder(&log, "door"));
        runtime.scene_mut().regenerate_mixer();
        runtime.advance(5.0);
        assert!(log.borrow().is_empty());
        assert!(!runtime.events().iter().any(|event| event.starts_with("anim.finished")));
    }

    #[test]
    fn non_legacy_play_repeats_forever() {
        let mut runtime = runtime();
        runtime.play_animations(&"lid".into(), &PlayOptions::default(), Callback::noop());
        assert_eq!(runtime.scene().memory_action("lid").map(|a| a.repetitions()), Some(None));

        runtime.stop_animations(&"lid".into());
        runtime.scene_mut().action_mut("lid").expect("lid").set_repetitions(Some(3));
        runtime.play_animations(&"lid".into(), &PlayOptions::default().legacy(), Callback::noop());
        assert_eq!(runtime.scene().memory_action("lid").map(|a| a.repetitions()), Some(Some(3)));
    }

    #[test]
    fn set_frame_seeks_and_pauses() {
        let mut runtime = runtime();
        runtime.set_animation_frame(&Selector::group("parts"), Some(5.0));
        let door = runtime.scene().action("door").expect("door");
        assert_eq!(door.time(), 0.5);
        assert!(door.is_paused());
        assert!(!door.is_running());
        runtime.advance(1.0);
        assert_eq!(runtime.scene().action("door").map(|a| a.time()), Some(0.5));

        runtime.set_animation_frame(&"door".into(), None);
        assert_eq!(runtime.scene().action("door").map(|a| a.time()), Some(0.0));
    }

    #[test]
    fn missing_actions_are_skipped() {
        let mut runtime = runtime();
        runtime.play_animations(&"ghost".into(), &PlayOptions::default(), Callback::noop());
        runtime.stop_animations(&"ghost".into());
        runtime.set_animation_frame(&"ghost".into(), Some(3.0));
        assert!(runtime.events().is_empty());
        assert_eq!(runtime.pending_finish_callbacks(), 0);
    }
}
