//! Scripted host input: pointer presses, taps, scroll offsets, waits and
//! surface changes replayed against a runtime in order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use puzzle_runtime::{HostEvent, PointerEvent, Runtime, Surface};
use puzzle_scene::SceneEngine;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputScript {
    #[serde(default)]
    pub surface: Surface,
    #[serde(default)]
    pub steps: Vec<InputStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputStep {
    Click {
        x: f32,
        y: f32,
        #[serde(default)]
        button: u8,
    },
    DoubleClick {
        x: f32,
        y: f32,
        #[serde(default)]
        button: u8,
    },
    /// Touch start and end at the same surface offset.
    Tap { x: f32, y: f32 },
    Scroll { offset: f64 },
    Wait { seconds: f64 },
    Resize { width: f32, height: f32 },
    Unload,
}

impl InputScript {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading input script {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("parsing input script {}", path.display()))
    }
}

/// Host clock feeding steps into a runtime.
#[derive(Debug)]
pub struct Replay {
    frame_seconds: f64,
    elapsed_seconds: f64,
    frames: u64,
}

impl Replay {
    pub fn new(frame_seconds: f64) -> Self {
        Replay {
            frame_seconds,
            elapsed_seconds: 0.0,
            frames: 0,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn time_ms(&self) -> u64 {
        (self.elapsed_seconds * 1000.0).round() as u64
    }

    pub fn run<S: SceneEngine + 'static>(&mut self, runtime: &mut Runtime<S>, steps: &[InputStep]) {
        for step in steps {
            self.apply(runtime, step);
        }
    }

    pub fn apply<S: SceneEngine + 'static>(&mut self, runtime: &mut Runtime<S>, step: &InputStep) {
        log::trace!(target: "puzzle_host", "t={:.3}s {step:?}", self.elapsed_seconds);
        match *step {
            InputStep::Click { x, y, button } => {
                self.pointer(runtime, PointerEvent::MouseDown { x, y, button })
            }
            InputStep::DoubleClick { x, y, button } => {
                self.pointer(runtime, PointerEvent::DoubleClick { x, y, button })
            }
            InputStep::Tap { x, y } => {
                let surface = runtime.surface();
                let client_x = surface.left + x;
                let client_y = surface.top + y;
                self.pointer(runtime, PointerEvent::TouchStart { client_x, client_y });
                self.pointer(runtime, PointerEvent::TouchEnd { client_x, client_y });
            }
            InputStep::Scroll { offset } => runtime.handle_event(HostEvent::Scroll { offset }),
            InputStep::Wait { seconds } => self.wait(runtime, seconds),
            InputStep::Resize { width, height } => {
                let surface = Surface {
                    width,
                    height,
                    ..runtime.surface()
                };
                runtime.handle_event(HostEvent::Resize(surface));
            }
            InputStep::Unload => runtime.handle_event(HostEvent::Unload),
        }
    }

    fn pointer<S: SceneEngine + 'static>(&self, runtime: &mut Runtime<S>, event: PointerEvent) {
        runtime.handle_event(HostEvent::Pointer {
            time_ms: self.time_ms(),
            event,
        });
    }

    /// Advances in whole frames; the last frame is shortened to land exactly
    /// on `seconds`.
    fn wait<S: SceneEngine + 'static>(&mut self, runtime: &mut Runtime<S>, seconds: f64) {
        let mut remaining = seconds.max(0.0);
        while remaining > 1e-9 {
            let delta = remaining.min(self.frame_seconds);
            runtime.advance(delta);
            self.elapsed_seconds += delta;
            self.frames += 1;
            remaining -= delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use puzzle_runtime::{InitOptions, Runtime};
    use puzzle_scene::MemoryScene;

    use super::*;

    const SCRIPT: &str = r#"{
        "surface": { "left": 0, "top": 0, "width": 200, "height": 100 },
        "steps": [
            { "kind": "click", "x": 100, "y": 50 },
            { "kind": "tap", "x": 100, "y": 50 },
            { "kind": "wait", "seconds": 0.25 },
            { "kind": "scroll", "offset": 120 },
            { "kind": "resize", "width": 400, "height": 300 },
            { "kind": "unload" }
        ]
    }"#;

    fn runtime(surface: Surface) -> Runtime<MemoryScene> {
        let scene = MemoryScene::from_json_str(r#"{ "nodes": [ { "name": "Camera", "kind": "camera" } ] }"#)
            .expect("scene parses");
        Runtime::new(scene, &InitOptions::default()).with_surface(surface)
    }

    #[test]
    fn scripts_parse_with_defaults() {
        let script: InputScript = serde_json::from_str(SCRIPT).expect("script parses");
        assert_eq!(script.surface.width, 200.0);
        assert_eq!(script.steps.len(), 6);
        assert_eq!(
            script.steps[0],
            InputStep::Click {
                x: 100.0,
                y: 50.0,
                button: 0
            }
        );

        let empty: InputScript = serde_json::from_str("{}").expect("empty script parses");
        assert!(empty.steps.is_empty());
        assert_eq!(empty.surface, Surface::default());
    }

    #[test]
    fn waits_advance_in_frames() {
        let script: InputScript = serde_json::from_str(SCRIPT).expect("script parses");
        let mut runtime = runtime(script.surface);
        let mut replay = Replay::new(0.1);
        replay.run(&mut runtime, &script.steps);

        assert_eq!(replay.frames(), 3);
        assert!((replay.elapsed_seconds() - 0.25).abs() < 1e-9);
        assert!((runtime.clock() - 0.25).abs() < 1e-9);
        assert!(runtime.is_unloaded());
    }

    #[test]
    fn resize_keeps_the_surface_origin() {
        let mut runtime = runtime(Surface {
            left: 15.0,
            top: 30.0,
            width: 200.0,
            height: 100.0,
        });
        let mut replay = Replay::new(1.0 / 60.0);
        replay.apply(
            &mut runtime,
            &InputStep::Resize {
                width: 400.0,
                height: 300.0,
            },
        );
        let surface = runtime.surface();
        assert_eq!((surface.left, surface.top), (15.0, 30.0));
        assert_eq!((surface.width, surface.height), (400.0, 300.0));
        assert_eq!(runtime.events(), &["surface.resize 400x300".to_string()]);
    }
}
