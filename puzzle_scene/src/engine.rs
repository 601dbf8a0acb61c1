//! Narrow contracts the runtime consumes from a scene engine.

use glam::Vec2;

use crate::color::Rgb;
use crate::node::{Intersection, LoopMode, MixerId, NodeId, SceneNode};

/// Node traversal, picking and the handful of node mutations scripted
/// procedures perform.
pub trait SceneGraph {
    /// Visits every node depth first, parents before children, siblings in
    /// declaration order.
    fn traverse(&self, visit: &mut dyn FnMut(&SceneNode));

    fn node(&self, id: NodeId) -> Option<&SceneNode>;

    /// `None` while the scene is being unloaded.
    fn active_camera(&self) -> Option<NodeId>;

    /// Casts a ray from `camera` through the normalized device coordinate
    /// `ndc` against every node. Hits come back nearest first.
    fn raycast(&self, camera: NodeId, ndc: Vec2) -> Vec<Intersection>;

    fn set_visible(&mut self, id: NodeId, visible: bool);

    /// Replaces the text of a text-geometry node. Returns `false` when the
    /// node carries no text geometry.
    fn set_text(&mut self, id: NodeId, text: &str) -> bool;

    fn has_outline_pass(&self) -> bool;

    fn set_outlined(&mut self, id: NodeId, outlined: bool);
}

/// Engine-side playable clip instance.
pub trait AnimationAction {
    fn is_running(&self) -> bool;
    fn reset(&mut self);
    fn set_loop(&mut self, mode: LoopMode);
    /// `None` repeats forever.
    fn set_repetitions(&mut self, repetitions: Option<u32>);
    fn time_scale(&self) -> f64;
    fn set_time_scale(&mut self, scale: f64);
    fn time_start(&self) -> f64;
    fn set_time_start(&mut self, seconds: f64);
    fn clip_duration(&self) -> f64;
    fn set_clip_duration(&mut self, seconds: f64);
    /// Restores the duration the clip was authored with.
    fn reset_clip_duration(&mut self);
    fn time(&self) -> f64;
    fn set_time(&mut self, seconds: f64);
    fn is_paused(&self) -> bool;
    fn set_paused(&mut self, paused: bool);
    fn play(&mut self);
    fn stop(&mut self);
}

/// Owner of the animation actions of a scene.
pub trait AnimationMixer {
    /// `None` when the scene carries no animation at all.
    fn mixer_id(&self) -> Option<MixerId>;

    fn action(&self, name: &str) -> Option<&dyn AnimationAction>;

    fn action_mut(&mut self, name: &str) -> Option<&mut dyn AnimationAction>;

    /// Frame rate stored in the metadata of the scene owning `name`.
    fn action_frame_rate(&self, name: &str) -> Option<f64>;

    /// Advances every playing action by `delta` seconds.
    fn update(&mut self, delta: f64);

    /// Takes the names of actions that completed since the previous call, in
    /// completion order.
    fn drain_finished(&mut self) -> Vec<String>;
}

/// Material colour access.
pub trait MaterialStore {
    /// Colour slot names the material exposes; empty for unknown materials.
    fn color_slots(&self, material: &str) -> Vec<String>;

    fn set_color(&mut self, material: &str, slot: &str, color: Rgb);
}

/// Everything the runtime needs from an engine.
pub trait SceneEngine: SceneGraph + AnimationMixer + MaterialStore {}

impl<T> SceneEngine for T where T: SceneGraph + AnimationMixer + MaterialStore {}
