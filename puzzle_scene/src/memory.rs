//! JSON-described in-memory engine.
//!
//! Nodes carry an optional screen-space rectangle (in normalized device
//! coordinates) and a depth; ray casting is a rectangle test sorted by depth.
//! The mixer advances clip clocks and records completions the way a real
//! mixer would emit its "finished" signal.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::engine::{AnimationAction, AnimationMixer, MaterialStore, SceneGraph};
use crate::error::SceneError;
use crate::node::{Intersection, LoopMode, MixerId, NodeId, NodeKind, SceneNode};

fn default_true() -> bool {
    true
}

fn default_scene_name() -> String {
    "Scene".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default = "default_scene_name")]
    pub name: String,
    #[serde(default)]
    pub frame_rate: Option<f64>,
    #[serde(default = "default_true")]
    pub outline_pass: bool,
    /// Name of the active camera; the first camera node when omitted.
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub animations: Vec<AnimationDescription>,
    #[serde(default)]
    pub materials: Vec<MaterialDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub material_generated: bool,
    #[serde(default)]
    pub aux_clipping: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub bounds: Option<ScreenBounds>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeDescription>,
}

/// Matches the JSON defaults: a node is visible unless told otherwise.
impl Default for NodeDescription {
    fn default() -> Self {
        NodeDescription {
            name: String::new(),
            kind: NodeKind::default(),
            groups: Vec::new(),
            material_generated: false,
            aux_clipping: false,
            visible: true,
            bounds: None,
            text: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub min: Vec2,
    pub max: Vec2,
    pub depth: f32,
}

impl ScreenBounds {
    fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationDescription {
    pub name: String,
    pub frames: f64,
    #[serde(default, rename = "loop")]
    pub loop_mode: LoopMode,
    #[serde(default)]
    pub repetitions: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    pub slots: Vec<String>,
}

/// Clip instance driven by [`MemoryScene::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAction {
    full_duration: f64,
    duration: f64,
    loop_mode: LoopMode,
    repetitions: Option<u32>,
    time_scale: f64,
    time_start: f64,
    time: f64,
    paused: bool,
    active: bool,
    loop_count: u32,
}

impl MemoryAction {
    fn new(duration: f64, loop_mode: LoopMode, repetitions: Option<u32>) -> Self {
        Self {
            full_duration: duration,
            duration,
            loop_mode,
            repetitions,
            time_scale: 1.0,
            time_start: 0.0,
            time: 0.0,
            paused: false,
            active: false,
            loop_count: 0,
        }
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn repetitions(&self) -> Option<u32> {
        self.repetitions
    }

    /// Scheduled on the mixer, paused or not.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Moves the clock; returns `true` when the action completed.
    fn advance(&mut self, delta: f64) -> bool {
        if !self.is_running() {
            return false;
        }
        self.time += delta * self.time_scale;
        let forward = self.time_scale > 0.0;
        let past_boundary = if forward {
            self.time >= self.duration
        } else {
            self.time <= self.time_start
        };
        if !past_boundary {
            return false;
        }

        self.loop_count = self.loop_count.saturating_add(1);
        let exhausted = match self.loop_mode {
            LoopMode::Once => true,
            LoopMode::Repeat | LoopMode::PingPong => self
                .repetitions
                .is_some_and(|limit| self.loop_count >= limit),
        };
        let span = self.duration - self.time_start;
        if exhausted || span <= 0.0 {
            self.time = if forward {
                self.duration
            } else {
                self.time_start
            };
            self.active = false;
            return true;
        }

        if self.loop_mode == LoopMode::PingPong {
            self.time = if forward {
                2.0 * self.duration - self.time
            } else {
                2.0 * self.time_start - self.time
            };
            self.time_scale = -self.time_scale;
        } else if forward {
            self.time = self.time_start + (self.time - self.duration) % span;
        } else {
            self.time = self.duration - (self.time_start - self.time) % span;
        }
        self.time = self.time.clamp(self.time_start, self.duration);
        false
    }
}

impl AnimationAction for MemoryAction {
    fn is_running(&self) -> bool {
        self.active && !self.paused && self.time_scale != 0.0
    }

    fn reset(&mut self) {
        self.paused = false;
        self.time = 0.0;
        self.loop_count = 0;
    }

    fn set_loop(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    fn set_repetitions(&mut self, repetitions: Option<u32>) {
        self.repetitions = repetitions;
    }

    fn time_scale(&self) -> f64 {
        self.time_scale
    }

    fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale;
    }

    fn time_start(&self) -> f64 {
        self.time_start
    }

    fn set_time_start(&mut self, seconds: f64) {
        self.time_start = seconds;
    }

    fn clip_duration(&self) -> f64 {
        self.duration
    }

    fn set_clip_duration(&mut self, seconds: f64) {
        self.duration = seconds;
    }

    fn reset_clip_duration(&mut self) {
        self.duration = self.full_duration;
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn set_time(&mut self, seconds: f64) {
        self.time = seconds;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn play(&mut self) {
        self.active = true;
    }

    fn stop(&mut self) {
        self.active = false;
        self.reset();
    }
}

#[derive(Debug, Clone)]
pub struct MemoryScene {
    nodes: Vec<Option<SceneNode>>,
    bounds: BTreeMap<NodeId, ScreenBounds>,
    texts: BTreeMap<NodeId, String>,
    outline_pass: bool,
    outlined: Vec<NodeId>,
    camera: Option<NodeId>,
    frame_rate: Option<f64>,
    mixer: Option<MixerId>,
    actions: BTreeMap<String, MemoryAction>,
    finished: Vec<String>,
    materials: BTreeMap<String, BTreeMap<String, Rgb>>,
}

const ROOT: NodeId = NodeId(0);

impl MemoryScene {
    pub fn from_json_file(path: &Path) -> Result<Self, SceneError> {
        let json = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SceneError> {
        let description: SceneDescription = serde_json::from_str(json)?;
        Self::from_description(description)
    }

    pub fn from_description(description: SceneDescription) -> Result<Self, SceneError> {
        let mut scene = MemoryScene {
            nodes: Vec::new(),
            bounds: BTreeMap::new(),
            texts: BTreeMap::new(),
            outline_pass: description.outline_pass,
            outlined: Vec::new(),
            camera: None,
            frame_rate: description.frame_rate,
            mixer: None,
            actions: BTreeMap::new(),
            finished: Vec::new(),
            materials: BTreeMap::new(),
        };

        let root = NodeDescription {
            name: description.name,
            kind: NodeKind::Scene,
            children: description.nodes,
            ..NodeDescription::default()
        };
        scene.insert(None, &root);

        scene.camera = match description.camera {
            Some(name) => Some(
                scene
                    .find(|node| node.kind == NodeKind::Camera && node.name == name)
                    .ok_or(SceneError::UnknownCamera(name))?,
            ),
            None => scene.find(|node| node.kind == NodeKind::Camera),
        };

        for animation in description.animations {
            let frame_rate = scene.frame_rate.unwrap_or(24.0);
            let action = MemoryAction::new(
                animation.frames / frame_rate,
                animation.loop_mode,
                animation.repetitions,
            );
            if scene.actions.insert(animation.name.clone(), action).is_some() {
                return Err(SceneError::DuplicateAnimation(animation.name));
            }
        }
        if !scene.actions.is_empty() {
            scene.mixer = Some(MixerId(1));
        }

        for material in description.materials {
            let slots = material
                .slots
                .into_iter()
                .map(|slot| (slot, Rgb::default()))
                .collect();
            scene.materials.insert(material.name, slots);
        }

        Ok(scene)
    }

    fn insert(&mut self, parent: Option<NodeId>, description: &NodeDescription) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(SceneNode {
            id,
            name: description.name.clone(),
            kind: description.kind,
            parent,
            children: Vec::new(),
            group_names: description.groups.clone(),
            material_generated: description.material_generated,
            aux_clipping: description.aux_clipping,
            visible: description.visible,
        }));
        if let Some(bounds) = description.bounds {
            self.bounds.insert(id, bounds);
        }
        if let Some(text) = description.text.as_ref() {
            self.texts.insert(id, text.clone());
        }
        let children: Vec<NodeId> = description
            .children
            .iter()
            .map(|child| self.insert(Some(id), child))
            .collect();
        if let Some(node) = self.slot_mut(id) {
            node.children = children;
        }
        id
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    fn find(&self, mut predicate: impl FnMut(&SceneNode) -> bool) -> Option<NodeId> {
        let mut found = None;
        self.traverse(&mut |node| {
            if found.is_none() && predicate(node) {
                found = Some(node.id);
            }
        });
        found
    }

    fn walk(&self, id: NodeId, visit: &mut dyn FnMut(&SceneNode)) {
        let Some(node) = self.node(id) else {
            return;
        };
        visit(node);
        for child in &node.children {
            self.walk(*child, visit);
        }
    }

    fn collect_hits(&self, id: NodeId, ndc: Vec2, hits: &mut Vec<Intersection>) {
        let Some(node) = self.node(id) else {
            return;
        };
        if !node.visible {
            return;
        }
        if let Some(bounds) = self.bounds.get(&id) {
            if bounds.contains(ndc) {
                hits.push(Intersection {
                    node: id,
                    distance: bounds.depth,
                });
            }
        }
        for child in &node.children {
            self.collect_hits(*child, ndc, hits);
        }
    }

    /// First node named `name` in traversal order, ignored kinds included.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.find(|node| node.name == name)
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.visible)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.texts.get(&id).map(String::as_str)
    }

    pub fn is_outlined(&self, id: NodeId) -> bool {
        self.outlined.contains(&id)
    }

    pub fn outlined(&self) -> &[NodeId] {
        &self.outlined
    }

    pub fn memory_action(&self, name: &str) -> Option<&MemoryAction> {
        self.actions.get(name)
    }

    pub fn material_color(&self, material: &str, slot: &str) -> Option<Rgb> {
        self.materials.get(material)?.get(slot).copied()
    }

    pub fn rename_node(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.slot_mut(id) {
            node.name = name.to_string();
        }
    }

    /// Detaches `id` and its subtree from the scene.
    pub fn remove_node(&mut self, id: NodeId) {
        if id == ROOT {
            return;
        }
        let Some(node) = self.nodes.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|parent| self.slot_mut(parent)) {
            parent.children.retain(|child| *child != id);
        }
        self.bounds.remove(&id);
        self.texts.remove(&id);
        self.outlined.retain(|outlined| *outlined != id);
        for child in node.children {
            self.remove_node(child);
        }
    }

    /// Appends a subtree under `parent` and returns the id of its root.
    pub fn add_node(&mut self, parent: NodeId, description: &NodeDescription) -> Option<NodeId> {
        self.node(parent)?;
        let id = self.insert(Some(parent), description);
        if let Some(node) = self.slot_mut(parent) {
            node.children.push(id);
        }
        Some(id)
    }

    /// Simulates a scene unload: picking stops until a camera returns.
    pub fn detach_camera(&mut self) -> Option<NodeId> {
        self.camera.take()
    }

    pub fn attach_camera(&mut self, camera: NodeId) {
        self.camera = Some(camera);
    }

    /// Swaps in a fresh mixer, as a scene reload would.
    pub fn regenerate_mixer(&mut self) -> Option<MixerId> {
        self.mixer = self.mixer.map(|MixerId(id)| MixerId(id + 1));
        self.finished.clear();
        self.mixer
    }
}

impl SceneGraph for MemoryScene {
    fn traverse(&self, visit: &mut dyn FnMut(&SceneNode)) {
        self.walk(ROOT, visit);
    }

    fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn active_camera(&self) -> Option<NodeId> {
        self.camera
    }

    fn raycast(&self, _camera: NodeId, ndc: Vec2) -> Vec<Intersection> {
        let mut hits = Vec::new();
        self.collect_hits(ROOT, ndc, &mut hits);
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.slot_mut(id) {
            node.visible = visible;
        }
    }

    fn set_text(&mut self, id: NodeId, text: &str) -> bool {
        match self.texts.get_mut(&id) {
            Some(current) => {
                *current = text.to_string();
                true
            }
            None => false,
        }
    }

    fn has_outline_pass(&self) -> bool {
        self.outline_pass
    }

    fn set_outlined(&mut self, id: NodeId, outlined: bool) {
        if !self.outline_pass {
            return;
        }
        let index = self.outlined.iter().position(|existing| *existing == id);
        match (outlined, index) {
            (true, None) => self.outlined.push(id),
            (false, Some(index)) => {
                self.outlined.remove(index);
            }
            _ => {}
        }
    }
}

impl AnimationMixer for MemoryScene {
    fn mixer_id(&self) -> Option<MixerId> {
        self.mixer
    }

    fn action(&self, name: &str) -> Option<&dyn AnimationAction> {
        self.actions
            .get(name)
            .map(|action| action as &dyn AnimationAction)
    }

    fn action_mut(&mut self, name: &str) -> Option<&mut dyn AnimationAction> {
        self.actions
            .get_mut(name)
            .map(|action| action as &mut dyn AnimationAction)
    }

    fn action_frame_rate(&self, name: &str) -> Option<f64> {
        self.actions.get(name)?;
        self.frame_rate
    }

    fn update(&mut self, delta: f64) {
        for (name, action) in self.actions.iter_mut() {
            if action.advance(delta) {
                self.finished.push(name.clone());
            }
        }
    }

    fn drain_finished(&mut self) -> Vec<String> {
        std::mem::take(&mut self.finished)
    }
}

impl MaterialStore for MemoryScene {
    fn color_slots(&self, material: &str) -> Vec<String> {
        self.materials
            .get(material)
            .map(|slots| slots.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn set_color(&mut self, material: &str, slot: &str, color: Rgb) {
        if let Some(current) = self
            .materials
            .get_mut(material)
            .and_then(|slots| slots.get_mut(slot))
        {
            *current = color;
        }
    }
}
