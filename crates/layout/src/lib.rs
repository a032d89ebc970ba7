//! Procedural placement of every decorative object.
//!
//! [`generate`] produces one [`OrnamentRecord`] per object with both
//! formation targets already resolved. The result is random per call, so
//! callers keep a single [`Layout`] for the lifetime of the scene;
//! [`generate_seeded`] exists for reproducible runs and tests.

mod generator;
mod palette;
mod record;

pub use generator::{
    envelope_radius, generate, generate_from_entropy, generate_seeded, generate_with,
    tier_wobble, MIN_RADIUS,
};
pub use palette::{Palette, Rgb};
pub use record::{Category, CategoryIndex, Layout, OrnamentRecord};
