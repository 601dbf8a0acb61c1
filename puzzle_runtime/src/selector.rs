use puzzle_scene::{NodeKind, SceneGraph, SceneNode};
use serde::{Deserialize, Serialize};

/// Symbolic reference to zero or more scene objects.
///
/// JSON accepts a bare string, `{"kind": "group", "name": ...}`,
/// `{"kind": "all_objects"}` or an array of any of these (`null` entries are
/// dropped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SelectorRepr", into = "SelectorRepr")]
pub enum Selector {
    Name(String),
    Group(String),
    AllObjects,
    List(Vec<Selector>),
}

impl Selector {
    pub fn name(name: impl Into<String>) -> Self {
        Selector::Name(name.into())
    }

    pub fn group(group: impl Into<String>) -> Self {
        Selector::Group(group.into())
    }

    /// Expands to object names in scene traversal order. Empty names are
    /// dropped; repeated literal names are kept.
    pub fn resolve<G: SceneGraph + ?Sized>(&self, scene: &G) -> Vec<String> {
        let mut names = Vec::new();
        self.collect(scene, &mut names);
        names.retain(|name| !name.is_empty());
        names
    }

    fn collect<G: SceneGraph + ?Sized>(&self, scene: &G, names: &mut Vec<String>) {
        match self {
            Selector::Name(name) => names.push(name.clone()),
            Selector::Group(group) => scene.traverse(&mut |node| {
                if not_ignored(node) && node.in_group(group) {
                    names.push(node.name.clone());
                }
            }),
            Selector::AllObjects => scene.traverse(&mut |node| {
                if not_ignored(node) {
                    names.push(node.name.clone());
                }
            }),
            Selector::List(items) => {
                for item in items {
                    item.collect(scene, names);
                }
            }
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

impl From<Vec<Selector>> for Selector {
    fn from(items: Vec<Selector>) -> Self {
        Selector::List(items)
    }
}

/// Nodes scripted procedures never address: ambient lights, unnamed nodes,
/// per-material sub-meshes and auxiliary clipping meshes.
pub(crate) fn not_ignored(node: &SceneNode) -> bool {
    node.kind != NodeKind::AmbientLight
        && !node.name.is_empty()
        && !node.is_material_generated_mesh()
        && !node.aux_clipping
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectorRepr {
    Name(String),
    List(Vec<Option<Selector>>),
    Tagged(TaggedSelector),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TaggedSelector {
    Group { name: String },
    AllObjects,
}

impl From<SelectorRepr> for Selector {
    fn from(repr: SelectorRepr) -> Self {
        match repr {
            SelectorRepr::Name(name) => Selector::Name(name),
            SelectorRepr::List(items) => Selector::List(items.into_iter().flatten().collect()),
            SelectorRepr::Tagged(TaggedSelector::Group { name }) => Selector::Group(name),
            SelectorRepr::Tagged(TaggedSelector::AllObjects) => Selector::AllObjects,
        }
    }
}

impl From<Selector> for SelectorRepr {
    fn from(selector: Selector) -> Self {
        match selector {
            Selector::Name(name) => SelectorRepr::Name(name),
            Selector::Group(name) => SelectorRepr::Tagged(TaggedSelector::Group { name }),
            Selector::AllObjects => SelectorRepr::Tagged(TaggedSelector::AllObjects),
            Selector::List(items) => SelectorRepr::List(items.into_iter().map(Some).collect()),
        }
    }
}
