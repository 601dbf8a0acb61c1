use serde::{Deserialize, Serialize};

/// Stable handle for a node inside one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identity of an animation mixer. A reloaded scene gets a fresh mixer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MixerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Scene,
    #[default]
    Object,
    Group,
    Mesh,
    Camera,
    AmbientLight,
    Light,
}

/// How an action behaves when its clock reaches a clip boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    Once,
    #[default]
    Repeat,
    PingPong,
}

/// Node record exposed during traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub group_names: Vec<String>,
    /// Set on the per-material sub-meshes an exporter generates for
    /// multi-material objects.
    pub material_generated: bool,
    pub aux_clipping: bool,
    pub visible: bool,
}

impl SceneNode {
    pub fn is_material_generated_mesh(&self) -> bool {
        self.kind == NodeKind::Mesh && self.material_generated
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.group_names.iter().any(|name| name == group)
    }
}

/// One ray hit; engines return them nearest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub node: NodeId,
    pub distance: f32,
}
