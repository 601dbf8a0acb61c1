use std::collections::BTreeMap;

use puzzle_scene::{NodeId, SceneGraph};

use crate::selector::not_ignored;

/// Name to node lookups, refreshed by traversal when an entry goes stale.
#[derive(Debug, Default)]
pub(crate) struct ObjectCache {
    entries: BTreeMap<String, NodeId>,
}

impl ObjectCache {
    pub(crate) fn lookup<G: SceneGraph + ?Sized>(&mut self, scene: &G, name: &str) -> Option<NodeId> {
        if name.is_empty() {
            return None;
        }
        if let Some(id) = self.entries.get(name).copied() {
            if scene.node(id).is_some_and(|node| node.name == name) {
                return Some(id);
            }
            self.entries.remove(name);
        }

        let mut found = None;
        scene.traverse(&mut |node| {
            if found.is_none() && not_ignored(node) && node.name == name {
                found = Some(node.id);
            }
        });
        if let Some(id) = found {
            self.entries.insert(name.to_string(), id);
        }
        found
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
