use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while building a [`crate::MemoryScene`].
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("reading scene description {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scene description is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("camera {0:?} does not name a camera node")]
    UnknownCamera(String),
    #[error("animation {0:?} declared twice")]
    DuplicateAnimation(String),
}
