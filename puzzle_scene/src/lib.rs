//! Scene-engine contract consumed by the puzzle runtime.
//!
//! The runtime never renders, loads assets or intersects geometry itself. It
//! reaches the engine only through the traits in [`engine`], so the same
//! scripted procedures run against any implementation. [`MemoryScene`] is a
//! small engine backed by a JSON description; the host runner and the tests
//! use it in place of a real renderer.

pub mod color;
pub mod engine;
mod error;
pub mod memory;
pub mod node;

pub use color::Rgb;
pub use engine::{AnimationAction, AnimationMixer, MaterialStore, SceneEngine, SceneGraph};
pub use error::SceneError;
pub use memory::{MemoryAction, MemoryScene, NodeDescription, SceneDescription, ScreenBounds};
pub use node::{Intersection, LoopMode, MixerId, NodeId, NodeKind, SceneNode};
