//! Guided procedure state machine.
//!
//! A procedure is a chain of `step(from, to, ..)` calls wired to pick
//! handlers. A step only runs while the counter equals its `from`, so stale
//! or repeated triggers are no-ops and the walkthrough advances strictly one
//! transition at a time. The counter moves when the transition animation
//! finishes, not when the step starts.

use puzzle_scene::SceneEngine;
use serde::{Deserialize, Serialize};

use crate::animation::PlayOptions;
use crate::runtime::{Callback, Runtime};
use crate::selector::Selector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub start_step: i64,
    /// Step that completes the procedure; progress is reported relative to it.
    pub final_step: i64,
    /// Objects whose animations and outlines are cleared before a transition.
    pub reset_group: Selector,
    /// Clip played from frame `from` to frame `to` for every transition.
    pub transition_animation: String,
    /// Text object receiving the step message.
    pub status_text: Selector,
    pub score_key: String,
    pub status_key: String,
    pub passed_status: String,
}

impl Default for StepConfig {
    fn default() -> Self {
        StepConfig {
            start_step: 0,
            final_step: 380,
            reset_group: Selector::group("all parts"),
            transition_animation: "Armature".to_string(),
            status_text: Selector::name("Text"),
            score_key: "cmi.core.score.raw".to_string(),
            status_key: "cmi.core.lesson_status".to_string(),
            passed_status: "passed".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StepMachine {
    current: i64,
    config: StepConfig,
}

impl StepMachine {
    pub(crate) fn new(config: StepConfig) -> Self {
        StepMachine {
            current: config.start_step,
            config,
        }
    }

    /// Percentage of the procedure reached at `step`, in shortest decimal
    /// form (`"100"`, `"1.3157894736842104"`).
    fn score(&self, step: i64) -> Option<String> {
        if self.config.final_step == 0 {
            return None;
        }
        let ratio = step as f64 / self.config.final_step as f64;
        Some(format!("{}", ratio * 100.0))
    }
}

impl<S: SceneEngine + 'static> Runtime<S> {
    pub fn current_step(&self) -> i64 {
        self.steps.current
    }

    pub fn step_config(&self) -> &StepConfig {
        &self.steps.config
    }

    /// Runs the transition `from -> to` if the procedure currently sits at
    /// `from`.
    pub fn step(&mut self, from: i64, to: i64, message: &str, highlight: Option<Selector>) {
        let current = self.steps.current;
        if current != from {
            self.log_event(format!("step.skip {from}->{to} at {current}"));
            return;
        }
        self.log_event(format!("step.begin {from}->{to}"));

        let config = self.steps.config.clone();
        self.stop_animations(&config.reset_group);
        self.outline(&config.reset_group, false);

        let message = message.to_string();
        let on_finished = Callback::new(move |runtime: &mut Runtime<S>| {
            runtime.complete_step(to, &message, highlight.as_ref());
        });
        let transition = PlayOptions::window(from as f64, to as f64).legacy();
        self.play_animations(
            &Selector::name(config.transition_animation),
            &transition,
            on_finished,
        );
    }

    fn complete_step(&mut self, to: i64, message: &str, highlight: Option<&Selector>) {
        let config = self.steps.config.clone();
        self.update_text(&config.status_text, message);
        if let Some(highlight) = highlight {
            self.play_animations(highlight, &PlayOptions::default().legacy(), Callback::noop());
            self.outline(highlight, true);
        }
        self.steps.current = to;
        self.log_event(format!("step.complete {to}"));

        if let Some(score) = self.steps.score(to) {
            self.progress_set_value(&config.score_key, &score);
        }
        if self.steps.current == config.final_step {
            self.progress_set_value(&config.status_key, &config.passed_status);
        }
        self.progress_commit();
    }
}
