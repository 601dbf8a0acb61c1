//! Declarative scenarios.
//!
//! A scenario describes a scripted procedure as data: guided procedures are
//! step triggers bound to picks, scroll procedures are range bindings driven
//! by the page scroll offset. [`Scenario::install`] wires either kind into a
//! [`Runtime`].

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use puzzle_scene::{Rgb, SceneEngine};
use serde::{Deserialize, Serialize};

use crate::mapper::{map_pair, SignalRange};
use crate::options::{exec_init, InitConfig, InitOptions, PreloaderHooks};
use crate::pick::{PickOptions, PickPolicy};
use crate::runtime::{Callback, Runtime};
use crate::scene_ops::MaterialColor;
use crate::selector::Selector;
use crate::steps::{StepConfig, StepMachine};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub init: InitConfig,
    #[serde(default)]
    pub pick_policy: PickPolicy,
    /// Open a progress session at install time and close it on unload.
    #[serde(default)]
    pub progress_session: bool,
    pub procedure: Procedure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Procedure {
    Guided(GuidedProcedure),
    Scroll(ScrollProcedure),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidedProcedure {
    #[serde(default)]
    pub steps: StepConfig,
    pub triggers: Vec<StepTrigger>,
}

/// Pick registration that hides/shows objects and then requests one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTrigger {
    pub selector: Selector,
    #[serde(default)]
    pub pick: PickOptions,
    #[serde(default)]
    pub hide: Option<Selector>,
    #[serde(default)]
    pub show: Option<Selector>,
    pub from: i64,
    pub to: i64,
    pub message: String,
    #[serde(default)]
    pub highlight: Option<Selector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollProcedure {
    pub bindings: Vec<ScrollBinding>,
    #[serde(default)]
    pub idle_timer: IdleTimer,
}

/// Maps the scroll offset onto a target while it lies inside `when`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollBinding {
    pub when: SignalRange,
    pub input: [f64; 2],
    pub target: BindingTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingTarget {
    SetFrame {
        animations: Selector,
        frames: [f64; 2],
    },
    MaterialColor {
        material: String,
        slot: String,
        red: [f64; 2],
        green: [f64; 2],
        blue: [f64; 2],
    },
}

/// Debounce timer restarted by every scroll event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleTimer {
    pub id: String,
    pub interval: f64,
}

impl Default for IdleTimer {
    fn default() -> Self {
        IdleTimer {
            id: "scroll_idle".to_string(),
            interval: 0.1,
        }
    }
}

impl Scenario {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("decoding scenario JSON")
    }

    pub fn init_options(&self, hooks: PreloaderHooks) -> InitOptions {
        exec_init(&self.init, hooks)
    }

    pub fn install<S: SceneEngine + 'static>(&self, runtime: &mut Runtime<S>) {
        runtime.pick_policy = self.pick_policy;
        match &self.procedure {
            Procedure::Guided(guided) => guided.install(runtime),
            Procedure::Scroll(scroll) => scroll.install(runtime),
        }
        if self.progress_session {
            runtime.begin_progress_session();
            runtime.on_unload(Callback::new(|runtime: &mut Runtime<S>| {
                runtime.finish_progress_session();
            }));
        }
        log::info!(target: "puzzle_runtime", "installed scenario {}", self.name);
    }
}

impl GuidedProcedure {
    fn install<S: SceneEngine + 'static>(&self, runtime: &mut Runtime<S>) {
        runtime.steps = StepMachine::new(self.steps.clone());
        for trigger in &self.triggers {
            let action = trigger.clone();
            runtime.register_pick(
                trigger.selector.clone(),
                trigger.pick.clone(),
                Callback::new(move |runtime: &mut Runtime<S>| action.fire(runtime)),
                Callback::noop(),
            );
        }
    }
}

impl StepTrigger {
    fn fire<S: SceneEngine + 'static>(&self, runtime: &mut Runtime<S>) {
        if let Some(hide) = self.hide.as_ref() {
            runtime.change_visibility(hide, false);
        }
        if let Some(show) = self.show.as_ref() {
            runtime.change_visibility(show, true);
        }
        runtime.step(self.from, self.to, &self.message, self.highlight.clone());
    }
}

impl ScrollProcedure {
    fn install<S: SceneEngine + 'static>(&self, runtime: &mut Runtime<S>) {
        let bindings = Rc::new(self.bindings.clone());
        let idle = self.idle_timer.clone();
        let scrolling = Rc::new(Cell::new(false));
        runtime.on_scroll(move |runtime, offset| {
            if !scrolling.replace(true) {
                runtime.log_event("scroll.start");
            }
            for binding in bindings.iter() {
                binding.apply(runtime, offset);
            }
            runtime.remove_timer(&idle.id);
            let flag = Rc::clone(&scrolling);
            runtime.set_timer(
                &idle.id,
                idle.interval,
                Callback::new(move |runtime: &mut Runtime<S>| {
                    flag.set(false);
                    runtime.log_event("scroll.idle");
                }),
                Some(1),
            );
        });
    }
}

impl ScrollBinding {
    fn apply<S: SceneEngine + 'static>(&self, runtime: &mut Runtime<S>, offset: f64) {
        if !self.when.contains(offset) {
            return;
        }
        match &self.target {
            BindingTarget::SetFrame { animations, frames } => {
                let frame = map_pair(self.input, *frames, offset);
                runtime.set_animation_frame(animations, Some(frame));
            }
            BindingTarget::MaterialColor {
                material,
                slot,
                red,
                green,
                blue,
            } => {
                let color = Rgb::new(
                    map_pair(self.input, *red, offset),
                    map_pair(self.input, *green, offset),
                    map_pair(self.input, *blue, offset),
                );
                runtime.set_material_color(material, slot, &MaterialColor::Linear(color));
            }
        }
    }
}
