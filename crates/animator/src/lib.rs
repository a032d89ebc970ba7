//! Per-frame motion for every ornament, the group rotation and the tree-top
//! star, plus the instance buffers the renderer consumes.
//!
//! [`InstanceAnimator::frame`] reads a [`formation::FrameInputs`] snapshot,
//! advances the rotation strategy, moves each object toward its formation
//! target with category-specific orientation rules, then copies the results
//! into [`InstanceBatches`]. [`GpuInstances`] uploads dirty batches through
//! `wgpu`.

mod animator;
mod clock;
pub mod gpu;
mod instances;
pub mod rotation;
mod topper;

pub use animator::{outward_orientation, FrameReport, InstanceAnimator};
pub use clock::{FixedStepClock, FrameClock, FrameSample};
pub use gpu::{GpuContext, GpuInstances};
pub use instances::{BatchId, InstanceBatch, InstanceBatches, InstanceRaw, Transform};
pub use rotation::{
    strategy_for_config, BoxedRotationStrategy, EaseCurve, HoldToSpin, RotationMode,
    RotationStrategy, Showcase,
};
pub use topper::TreeTopper;
