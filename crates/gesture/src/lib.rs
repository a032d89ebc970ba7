//! Turns noisy per-frame hand classification into stable formation commands.
//!
//! ```text
//!   camera frame ─▶ GestureClassifier ─▶ index-up override ─▶ Debouncer
//!                                                               │ committed label
//!                                                               ▼
//!                                                    formation::SharedState
//! ```
//!
//! [`GesturePipeline`] performs one cycle per video frame and can be driven
//! cooperatively from a host loop. [`GestureController`] acquires a camera
//! and classifier and runs the pipeline on a worker thread until torn down.

mod capture;
mod classifier;
mod debounce;
mod error;
mod landmarks;
mod pipeline;
mod script;

pub use capture::{CameraDevice, ClassifierFactory, GestureController, SyntheticCamera};
pub use classifier::{Classification, GestureClassifier, Recognition, VideoFrame};
pub use debounce::{DebounceStatus, Debouncer};
pub use error::{ClassifierError, GestureError};
pub use formation::GestureLabel;
pub use landmarks::{is_index_up, HandLandmarks, HandPose, Landmark, LANDMARK_COUNT};
pub use pipeline::{FrameOutcome, GesturePipeline, TimestampClock};
pub use script::{GestureScript, ScriptStep, ScriptedClassifier};
