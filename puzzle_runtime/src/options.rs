use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Configuration bag handed over by the host shell. Unset entries take
/// their defaults in [`exec_init`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    pub fade_annotations: Option<bool>,
    pub background_transparency: Option<bool>,
    pub preserve_draw_buffer: Option<bool>,
    pub compressed_assets: Option<bool>,
    pub fullscreen: Option<bool>,
    /// Id of the element hosting the render surface.
    pub container: Option<String>,
}

/// Optional preloader lifecycle callbacks.
#[derive(Clone, Default)]
pub struct PreloaderHooks {
    pub on_start: Option<Rc<dyn Fn()>>,
    /// Receives the load percentage rounded to a whole number.
    pub on_progress: Option<Rc<dyn Fn(u32)>>,
    pub on_end: Option<Rc<dyn Fn()>>,
}

impl fmt::Debug for PreloaderHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloaderHooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

impl PreloaderHooks {
    pub fn is_custom(&self) -> bool {
        self.on_start.is_some() || self.on_progress.is_some() || self.on_end.is_some()
    }

    pub fn start(&self) {
        if let Some(hook) = self.on_start.as_ref() {
            hook();
        }
    }

    pub fn progress(&self, percentage: f64) {
        if let Some(hook) = self.on_progress.as_ref() {
            hook(percentage.clamp(0.0, 100.0).round() as u32);
        }
    }

    pub fn end(&self) {
        if let Some(hook) = self.on_end.as_ref() {
            hook();
        }
    }
}

/// Normalized startup options for the host shell to apply before the first
/// frame.
#[derive(Debug, Clone, Serialize)]
pub struct InitOptions {
    pub fade_annotations: bool,
    pub background_transparency: bool,
    pub preserve_draw_buffer: bool,
    pub compressed_assets: bool,
    pub fullscreen: bool,
    pub custom_preloader: bool,
    pub container: String,
    #[serde(skip)]
    pub preloader: PreloaderHooks,
}

impl Default for InitOptions {
    fn default() -> Self {
        exec_init(&InitConfig::default(), PreloaderHooks::default())
    }
}

pub fn exec_init(config: &InitConfig, hooks: PreloaderHooks) -> InitOptions {
    InitOptions {
        fade_annotations: config.fade_annotations.unwrap_or(true),
        background_transparency: config.background_transparency.unwrap_or(false),
        preserve_draw_buffer: config.preserve_draw_buffer.unwrap_or(false),
        compressed_assets: config.compressed_assets.unwrap_or(false),
        fullscreen: config.fullscreen.unwrap_or(true),
        custom_preloader: hooks.is_custom(),
        container: config.container.clone().unwrap_or_default(),
        preloader: hooks,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn defaults_match_a_plain_startup() {
        let options = InitOptions::default();
        assert!(options.fade_annotations);
        assert!(!options.background_transparency);
        assert!(!options.preserve_draw_buffer);
        assert!(!options.compressed_assets);
        assert!(options.fullscreen);
        assert!(!options.custom_preloader);
        assert_eq!(options.container, "");
    }

    #[test]
    fn explicit_values_win() {
        let config: InitConfig =
            serde_json::from_str(r#"{ "fade_annotations": false, "fullscreen": false, "container": "v3d-container" }"#)
                .expect("config parses");
        let options = exec_init(&config, PreloaderHooks::default());
        assert!(!options.fade_annotations);
        assert!(!options.fullscreen);
        assert_eq!(options.container, "v3d-container");
    }

    #[test]
    fn any_hook_enables_the_custom_preloader() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let hooks = PreloaderHooks {
            on_progress: Some(Rc::new(move |percentage: u32| sink.borrow_mut().push(percentage))),
            ..PreloaderHooks::default()
        };
        let options = exec_init(&InitConfig::default(), hooks);
        assert!(options.custom_preloader);

        options.preloader.start();
        options.preloader.progress(33.4);
        options.preloader.progress(66.6);
        options.preloader.progress(140.0);
        options.preloader.end();
        assert_eq!(*seen.borrow(), vec![33, 67, 100]);
    }
}
