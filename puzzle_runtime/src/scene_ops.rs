use puzzle_scene::{Rgb, SceneEngine};
use serde::{Deserialize, Serialize};

use crate::runtime::Runtime;
use crate::selector::Selector;

/// Colour given either as linear RGB or as a CSS hex code in sRGB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialColor {
    Linear(Rgb),
    Css(String),
}

impl MaterialColor {
    fn to_linear(&self) -> Option<Rgb> {
        match self {
            MaterialColor::Linear(rgb) => Some(*rgb),
            MaterialColor::Css(code) => Rgb::from_css_hex(code),
        }
    }
}

impl<S: SceneEngine + 'static> Runtime<S> {
    pub fn change_visibility(&mut self, selector: &Selector, visible: bool) {
        let verb = if visible { "show" } else { "hide" };
        for name in self.resolve(selector) {
            let Some(id) = self.object_by_name(&name) else {
                continue;
            };
            self.scene.set_visible(id, visible);
            self.log_event(format!("scene.{verb} {name}"));
        }
    }

    /// Replaces the text of every resolved object that carries text geometry.
    pub fn update_text(&mut self, selector: &Selector, text: &str) {
        for name in self.resolve(selector) {
            let Some(id) = self.object_by_name(&name) else {
                continue;
            };
            if self.scene.set_text(id, text) {
                self.log_event(format!("scene.text {name} {text:?}"));
            }
        }
    }

    pub fn outline(&mut self, selector: &Selector, enable: bool) {
        if !self.scene.has_outline_pass() {
            return;
        }
        for name in self.resolve(selector) {
            let Some(id) = self.object_by_name(&name) else {
                continue;
            };
            self.scene.set_outlined(id, enable);
        }
    }

    pub fn set_material_color(&mut self, material: &str, slot: &str, color: &MaterialColor) {
        if !self.scene.color_slots(material).iter().any(|known| known == slot) {
            log::debug!(target: "puzzle_runtime", "material {material:?} has no colour {slot:?}");
            return;
        }
        let Some(rgb) = color.to_linear() else {
            log::warn!(target: "puzzle_runtime", "unparseable colour {color:?} for {material}.{slot}");
            return;
        };
        self.scene.set_color(material, slot, rgb);
        self.log_event(format!(
            "material.color {material}.{slot} {:.6} {:.6} {:.6}",
            rgb.r, rgb.g, rgb.b
        ));
    }
}

#[cfg(test)]
mod tests {
    use puzzle_scene::MemoryScene;

    use super::*;
    use crate::options::InitOptions;

    fn runtime(outline_pass: bool) -> Runtime<MemoryScene> {
        let json = format!(
            r#"{{
                "outline_pass": {outline_pass},
                "nodes": [
                    {{ "name": "Text", "kind": "mesh", "text": "Hello" }},
                    {{ "name": "caption", "kind": "mesh", "groups": ["labels"] }},
                    {{ "name": "flap", "kind": "mesh", "groups": ["labels", "parts"] }}
                ],
                "materials": [ {{ "name": "cover", "slots": ["first_color"] }} ]
            }}"#
        );
        let scene = MemoryScene::from_json_str(&json).expect("scene parses");
        Runtime::new(scene, &InitOptions::default())
    }

    fn id(runtime: &Runtime<MemoryScene>, name: &str) -> puzzle_scene::NodeId {
        runtime.scene().node_id(name).expect("node exists")
    }

    #[test]
    fn visibility_follows_the_selector() {
        let mut runtime = runtime(true);
        runtime.change_visibility(&Selector::group("labels"), false);
        assert!(!runtime.scene().is_visible(id(&runtime, "caption")));
        assert!(!runtime.scene().is_visible(id(&runtime, "flap")));
        assert!(runtime.scene().is_visible(id(&runtime, "Text")));
        runtime.change_visibility(&"missing".into(), true);
        assert_eq!(runtime.events(), &["scene.hide caption", "scene.hide flap"]);
    }

    #[test]
    fn text_updates_skip_plain_meshes() {
        let mut runtime = runtime(true);
        runtime.update_text(&Selector::List(vec!["Text".into(), "flap".into()]), "Step 1");
        assert_eq!(runtime.scene().text(id(&runtime, "Text")), Some("Step 1"));
        assert_eq!(runtime.events().len(), 1);
    }

    #[test]
    fn outline_requires_an_outline_pass() {
        let mut plain = runtime(false);
        plain.outline(&Selector::group("parts"), true);
        assert!(plain.scene().outlined().is_empty());

        let mut runtime = runtime(true);
        runtime.outline(&Selector::group("parts"), true);
        assert_eq!(runtime.scene().outlined(), &[id(&runtime, "flap")]);
        runtime.outline(&Selector::group("parts"), false);
        assert!(runtime.scene().outlined().is_empty());
    }

    #[test]
    fn material_colours_accept_linear_and_css() {
        let mut runtime = runtime(true);
        runtime.set_material_color("cover", "first_color", &MaterialColor::Linear(Rgb::new(0.1, 0.2, 0.3)));
        assert_eq!(
            runtime.scene().material_color("cover", "first_color"),
            Some(Rgb::new(0.1, 0.2, 0.3))
        );
        runtime.set_material_color("cover", "first_color", &MaterialColor::Css("#ffffff".into()));
        let white = runtime.scene().material_color("cover", "first_color").expect("slot");
        assert!((white.g - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_slots_are_ignored() {
        let mut runtime = runtime(true);
        let red = MaterialColor::Linear(Rgb::new(1.0, 0.0, 0.0));
        runtime.set_material_color("cover", "third_color", &red);
        runtime.set_material_color("missing", "first_color", &red);
        assert!(runtime.events().is_empty());
        assert_eq!(
            runtime.scene().material_color("cover", "first_color"),
            Some(Rgb::default())
        );
    }

    #[test]
    fn colours_parse_from_json() {
        let css: MaterialColor = serde_json::from_str(r##""#808080""##).expect("css parses");
        assert_eq!(css, MaterialColor::Css("#808080".to_string()));
        let linear: MaterialColor =
            serde_json::from_str(r#"{ "r": 0.5, "g": 0.25, "b": 0.0 }"#).expect("rgb parses");
        assert_eq!(linear, MaterialColor::Linear(Rgb::new(0.5, 0.25, 0.0)));
    }
}
