//! Scripted-procedure runtime for interactive 3D scenes.
//!
//! Everything a scripted procedure touches lives inside one [`Runtime`]
//! value: the object cache, the finished-callback registry, the pick
//! registrations, the timer registry, the step counter and the progress
//! reporter. The embedding application owns the runtime, feeds it
//! [`HostEvent`]s and advances its clock; the runtime reaches the engine only
//! through [`puzzle_scene::SceneEngine`].

pub mod animation;
pub mod mapper;
mod objects;
pub mod options;
pub mod pick;
pub mod procedure;
pub mod progress;
mod runtime;
pub mod scene_ops;
pub mod selector;
pub mod steps;
pub mod timers;

pub use animation::{LoopSetting, PlayOptions, DEFAULT_FRAME_RATE};
pub use mapper::map_range;
pub use options::{exec_init, InitConfig, InitOptions, PreloaderHooks};
pub use pick::{HostEvent, PickOptions, PickPolicy, PickTrigger, PointerEvent, Surface};
pub use procedure::Scenario;
pub use progress::{
    discover_progress_api, FrameWindow, HostWindow, MemoryProgressStore, ProgressApi,
    ProgressReporter,
};
pub use runtime::{Callback, Runtime};
pub use scene_ops::MaterialColor;
pub use selector::Selector;
pub use steps::StepConfig;
