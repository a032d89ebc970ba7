use std::path::PathBuf;

/// Failure of a single classification call. The frame is skipped.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// Failure to acquire a resource gesture control depends on.
#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("gesture model failed to load: {0}")]
    ModelLoad(String),
    #[error("failed to parse gesture script: {0}")]
    ScriptParse(#[from] toml::de::Error),
    #[error("invalid gesture script: {0}")]
    InvalidScript(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn gesture worker: {0}")]
    Spawn(#[source] std::io::Error),
}
