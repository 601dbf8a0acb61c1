//! Pointer picking: host pointer events become ray casts, and ray hits are
//! matched against the selectors procedures registered.

use glam::Vec2;
use puzzle_scene::{NodeId, NodeKind, SceneEngine};
use serde::{Deserialize, Serialize};

use crate::runtime::{Callback, Runtime};
use crate::selector::Selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickTrigger {
    /// Mouse down, or a single touch.
    #[default]
    Click,
    /// Double click, or two touches inside the double-tap window.
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPhase {
    Start,
    #[default]
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PickOptions {
    /// Consider every hit along the ray instead of the nearest ones only.
    pub x_ray: bool,
    pub trigger: PickTrigger,
    /// Mouse buttons allowed to pick; any button when unset.
    pub buttons: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickPolicy {
    pub double_tap_window_ms: u64,
    /// Hits considered per round outside x-ray mode.
    pub nearest_hits: usize,
    pub touch_phase: TouchPhase,
}

impl Default for PickPolicy {
    fn default() -> Self {
        PickPolicy {
            double_tap_window_ms: 600,
            nearest_hits: 1,
            touch_phase: TouchPhase::End,
        }
    }
}

/// Pointer input. Mouse coordinates are offsets inside the render surface;
/// touch coordinates are client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    MouseDown { x: f32, y: f32, button: u8 },
    DoubleClick { x: f32, y: f32, button: u8 },
    TouchStart { client_x: f32, client_y: f32 },
    TouchEnd { client_x: f32, client_y: f32 },
}

impl PointerEvent {
    fn touch_phase(&self) -> Option<TouchPhase> {
        match self {
            PointerEvent::TouchStart { .. } => Some(TouchPhase::Start),
            PointerEvent::TouchEnd { .. } => Some(TouchPhase::End),
            PointerEvent::MouseDown { .. } | PointerEvent::DoubleClick { .. } => None,
        }
    }

    fn button(&self) -> Option<u8> {
        match self {
            PointerEvent::MouseDown { button, .. } | PointerEvent::DoubleClick { button, .. } => {
                Some(*button)
            }
            PointerEvent::TouchStart { .. } | PointerEvent::TouchEnd { .. } => None,
        }
    }
}

/// Bounding rectangle of the render surface in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Surface {
    fn default() -> Self {
        Surface {
            left: 0.0,
            top: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

impl Surface {
    /// Normalized device coordinates of `event`: x right, y up, both in
    /// `[-1, 1]` across the surface.
    pub fn ndc(&self, event: &PointerEvent) -> Vec2 {
        let (x, y) = match *event {
            PointerEvent::MouseDown { x, y, .. } | PointerEvent::DoubleClick { x, y, .. } => (x, y),
            PointerEvent::TouchStart { client_x, client_y }
            | PointerEvent::TouchEnd { client_x, client_y } => {
                (client_x - self.left, client_y - self.top)
            }
        };
        let normalized = Vec2::new(ratio(x, self.width), ratio(y, self.height));
        Vec2::new(normalized.x * 2.0 - 1.0, -normalized.y * 2.0 + 1.0)
    }
}

fn ratio(value: f32, extent: f32) -> f32 {
    if extent > 0.0 {
        value / extent
    } else {
        0.0
    }
}

/// Input delivered by the host environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Pointer { time_ms: u64, event: PointerEvent },
    Scroll { offset: f64 },
    Resize(Surface),
    Unload,
}

pub(crate) struct PickRegistration<S> {
    selector: Selector,
    options: PickOptions,
    on_hit: Callback<S>,
    on_miss: Callback<S>,
    last_tap_ms: Option<u64>,
}

impl<S: SceneEngine + 'static> Runtime<S> {
    pub fn register_pick(
        &mut self,
        selector: Selector,
        options: PickOptions,
        on_hit: Callback<S>,
        on_miss: Callback<S>,
    ) {
        self.picks.push(PickRegistration {
            selector,
            options,
            on_hit,
            on_miss,
            last_tap_ms: None,
        });
    }

    pub fn pick_registrations(&self) -> usize {
        self.picks.len()
    }

    pub(crate) fn dispatch_pointer(&mut self, time_ms: u64, event: PointerEvent) {
        let mut index = 0;
        while index < self.picks.len() {
            if self.pick_triggered(index, time_ms, &event) {
                self.run_pick_round(index, &event);
            }
            index += 1;
        }
    }

    fn pick_triggered(&mut self, index: usize, time_ms: u64, event: &PointerEvent) -> bool {
        let policy = self.pick_policy;
        let Some(registration) = self.picks.get_mut(index) else {
            return false;
        };
        let touch = event.touch_phase();
        match (registration.options.trigger, event) {
            (PickTrigger::Click, PointerEvent::MouseDown { .. }) => true,
            (PickTrigger::DoubleClick, PointerEvent::DoubleClick { .. }) => true,
            (PickTrigger::Click, _) => touch == Some(policy.touch_phase),
            (PickTrigger::DoubleClick, _) if touch == Some(policy.touch_phase) => {
                match registration.last_tap_ms {
                    Some(previous)
                        if time_ms > previous
                            && time_ms - previous < policy.double_tap_window_ms =>
                    {
                        registration.last_tap_ms = None;
                        true
                    }
                    _ => {
                        registration.last_tap_ms = Some(time_ms);
                        false
                    }
                }
            }
            (PickTrigger::DoubleClick, _) => false,
        }
    }

    fn run_pick_round(&mut self, index: usize, event: &PointerEvent) {
        let Some(camera) = self.scene.active_camera() else {
            log::debug!(target: "puzzle_runtime", "pick skipped: no active camera");
            return;
        };
        let Some(registration) = self.picks.get(index) else {
            return;
        };
        let selector = registration.selector.clone();
        let x_ray = registration.options.x_ray;
        let on_hit = registration.on_hit.clone();
        let on_miss = registration.on_miss.clone();
        if let (Some(buttons), Some(button)) = (registration.options.buttons.as_ref(), event.button()) {
            if !buttons.contains(&button) {
                return;
            }
        }

        let ndc = self.surface.ndc(event);
        let hits = self.scene.raycast(camera, ndc);
        let limit = if x_ray {
            hits.len()
        } else {
            hits.len().min(self.pick_policy.nearest_hits)
        };

        let mut picked = false;
        for hit in hits.iter().take(limit) {
            let Some(name) = self.picked_name(hit.node) else {
                continue;
            };
            let names = self.resolve(&selector);
            if self.objects_include(&names, &name) {
                self.picked_object = name.clone();
                picked = true;
                self.log_event(format!("pick.hit {name}"));
                on_hit.call(self);
            }
        }

        if !picked {
            self.picked_object.clear();
            on_miss.call(self);
        }
    }

    /// Name reported for a hit node; per-material sub-meshes report their
    /// parent.
    fn picked_name(&self, id: NodeId) -> Option<String> {
        let node = self.scene.node(id)?;
        if node.is_material_generated_mesh() {
            if let Some(parent) = node.parent.and_then(|parent| self.scene.node(parent)) {
                return Some(parent.name.clone());
            }
        }
        Some(node.name.clone())
    }

    fn objects_include(&mut self, names: &[String], tested: &str) -> bool {
        if tested.is_empty() {
            return false;
        }
        for name in names {
            if name == tested {
                return true;
            }
            let Some(id) = self.object_by_name(name) else {
                continue;
            };
            let Some(node) = self.scene.node(id) else {
                continue;
            };
            if node.kind == NodeKind::Group
                && node
                    .children
                    .iter()
                    .filter_map(|child| self.scene.node(*child))
                    .any(|child| child.name == tested)
            {
                return true;
            }
        }
        false
    }
}
