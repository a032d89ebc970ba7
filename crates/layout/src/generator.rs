use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use treeconfig::LayoutConfig;

use crate::palette::{Palette, Rgb};
use crate::record::{Category, Layout, OrnamentRecord};

/// Smallest radius any tree placement may collapse to near the apex.
pub const MIN_RADIUS: f32 = 0.2;

const GARLAND_OFFSET: f32 = 0.2;
const BAUBLE_OFFSET: f32 = 0.15;
const LIGHT_OFFSET: f32 = -0.1;
const BAUBLE_MAX_HEIGHT: f32 = 0.95;
const STAR_MAX_HEIGHT: f32 = 0.8;
const STAR_RADIAL_SPREAD: f32 = 1.0;
const GOLDEN_RATIO: f32 = 1.618;
const GIFT_BANDS: [(f32, f32); 3] = [(0.0, 2.0), (0.3, 4.0), (0.7, 6.0)];
const GIFT_BAND_SPREAD: f32 = 1.5;
const GIFT_ANGLE_JITTER: f32 = 0.5;

/// Periodic radial bulge modelling stacked branch tiers at height fraction `h`.
pub fn tier_wobble(h: f32, tiers: u32, amplitude: f32) -> f32 {
    (h * PI * tiers as f32).sin().powi(2) * (amplitude * (1.0 - h))
}

/// Cone radius plus tier wobble at height fraction `h`.
pub fn envelope_radius(config: &LayoutConfig, h: f32) -> f32 {
    config.base_radius * (1.0 - h) + tier_wobble(h, config.tiers, config.wobble_amplitude)
}

/// Generates a layout from an entropy-seeded generator and the default dimensions.
pub fn generate() -> Layout {
    generate_from_entropy(&LayoutConfig::default())
}

/// Entropy-seeded generation with explicit dimensions. Every call differs.
pub fn generate_from_entropy(config: &LayoutConfig) -> Layout {
    let mut rng = StdRng::from_entropy();
    generate_with(config, &mut rng)
}

/// Reproducible variant of [`generate`].
pub fn generate_seeded(config: &LayoutConfig, seed: u64) -> Layout {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_with(config, &mut rng)
}

pub fn generate_with<R: Rng + ?Sized>(config: &LayoutConfig, rng: &mut R) -> Layout {
    let mut builder = Builder {
        config,
        rng,
        records: Vec::with_capacity(config.counts.total()),
    };

    builder.foliage();
    builder.garland();
    builder.baubles();
    builder.lights();
    builder.gifts();
    builder.star_ornaments();

    let layout = Layout::new(builder.records);
    debug!(
        total = layout.len(),
        foliage = layout.count(Category::Foliage),
        baubles = layout.count(Category::Bauble),
        garland = layout.count(Category::Garland),
        gifts = layout.count(Category::Gift),
        lights = layout.count(Category::Light),
        star_ornaments = layout.count(Category::StarOrnament),
        "generated ornament layout"
    );
    layout
}

struct Builder<'a, R: Rng + ?Sized> {
    config: &'a LayoutConfig,
    rng: &'a mut R,
    records: Vec<OrnamentRecord>,
}

struct Placement {
    tree_position: Vec3,
    nominal_scale: Vec3,
    color: Rgb,
    speed: f32,
    phase: f32,
    rotation_speed: Vec3,
}

impl<R: Rng + ?Sized> Builder<'_, R> {
    fn push(&mut self, category: Category, placement: Placement) {
        let scatter_position = self.point_in_sphere(self.config.scatter_radius);
        self.records.push(OrnamentRecord {
            id: self.records.len() as u32,
            category,
            scatter_position,
            tree_position: placement.tree_position,
            nominal_scale: placement.nominal_scale,
            color: placement.color,
            speed: placement.speed,
            phase: placement.phase,
            rotation_speed: placement.rotation_speed,
        });
    }

    fn unit(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// Uniform volumetric sample; the cube root keeps density even across radii.
    fn point_in_sphere(&mut self, radius: f32) -> Vec3 {
        let theta = TAU * self.unit();
        let phi = (2.0 * self.unit() - 1.0).clamp(-1.0, 1.0).acos();
        let r = self.unit().cbrt() * radius;
        Vec3::new(
            r * phi.sin() * theta.cos(),
            r * phi.sin() * theta.sin(),
            r * phi.cos(),
        )
    }

    fn height_to_y(&self, h: f32) -> f32 {
        h * self.config.tree_height - self.config.tree_height / 2.0
    }

    fn on_ring(&self, radius: f32, angle: f32, h: f32) -> Vec3 {
        let radius = radius.max(MIN_RADIUS);
        Vec3::new(radius * angle.cos(), self.height_to_y(h), radius * angle.sin())
    }

    fn foliage(&mut self) {
        for _ in 0..self.config.counts.foliage {
            let h = self.unit();
            let envelope = envelope_radius(self.config, h).max(MIN_RADIUS);
            let radius = self.unit().powf(0.3) * envelope;
            let theta = self.unit() * TAU;
            let scale = (0.2 + self.unit() * 0.3) * (1.2 - h * 0.5);
            let color = Palette::foliage(self.unit());
            let speed = 0.2 + self.unit() * 0.5;
            let phase = self.unit() * TAU;
            let rotation_speed = Vec3::new(self.unit(), self.unit(), self.unit()) * 0.5;
            let tree_position = self.on_ring(radius, theta, h);
            self.push(
                Category::Foliage,
                Placement {
                    tree_position,
                    nominal_scale: Vec3::splat(scale),
                    color,
                    speed,
                    phase,
                    rotation_speed,
                },
            );
        }
    }

    fn garland(&mut self) {
        let count = self.config.counts.garland;
        for i in 0..count {
            let t = i as f32 / count as f32;
            let radius = envelope_radius(self.config, t) + GARLAND_OFFSET;
            let angle = t * TAU * self.config.garland_turns;
            let tree_position = self.on_ring(radius, angle, t);
            self.push(
                Category::Garland,
                Placement {
                    tree_position,
                    nominal_scale: Vec3::splat(0.1),
                    color: Palette::GOLD,
                    speed: 0.5,
                    phase: i as f32 * 0.1,
                    rotation_speed: Vec3::Y,
                },
            );
        }
    }

    fn baubles(&mut self) {
        for _ in 0..self.config.counts.baubles {
            let h = self.unit() * BAUBLE_MAX_HEIGHT;
            let radius = envelope_radius(self.config, h) + BAUBLE_OFFSET;
            let theta = self.unit() * TAU;
            let scale = 0.3 + self.unit() * 0.2;
            let color = Palette::BAUBLES[self.rng.gen_range(0..Palette::BAUBLES.len())];
            let speed = 0.5 + self.unit();
            let phase = self.unit() * TAU;
            let tree_position = self.on_ring(radius, theta, h);
            self.push(
                Category::Bauble,
                Placement {
                    tree_position,
                    nominal_scale: Vec3::splat(scale),
                    color,
                    speed,
                    phase,
                    rotation_speed: Vec3::ZERO,
                },
            );
        }
    }

    fn lights(&mut self) {
        let count = self.config.counts.lights;
        for i in 0..count {
            let t = i as f32 / count as f32;
            let radius = envelope_radius(self.config, t) + LIGHT_OFFSET;
            // Opposite handedness to the garland.
            let angle = -(t * TAU * self.config.light_turns);
            let tree_position = self.on_ring(radius, angle, t);
            self.push(
                Category::Light,
                Placement {
                    tree_position,
                    nominal_scale: Vec3::splat(0.06),
                    color: Palette::WARM_WHITE,
                    speed: 0.2,
                    phase: i as f32 * 0.5,
                    rotation_speed: Vec3::ZERO,
                },
            );
        }
    }

    fn gifts(&mut self) {
        let count = self.config.counts.gifts;
        let floor_y = -self.config.tree_height / 2.0;
        for i in 0..count {
            let t = i as f32 / count as f32;
            let band = GIFT_BANDS
                .iter()
                .rev()
                .find(|(threshold, _)| t > *threshold || *threshold == 0.0)
                .map(|(_, radius)| *radius)
                .unwrap_or(GIFT_BANDS[0].1);

            let angle = i as f32 * GOLDEN_RATIO * TAU + self.unit() * GIFT_ANGLE_JITTER;
            let radius = band + self.unit() * GIFT_BAND_SPREAD;

            // Near-cubic proportions so the ribbon wrap does not visibly stretch.
            let size = 0.8 + self.unit() * 0.6;
            let sx = size * (0.9 + self.unit() * 0.2);
            let sy = size * (0.8 + self.unit() * 0.4);
            let sz = size * (0.9 + self.unit() * 0.2);

            let color = Palette::WRAPPING[self.rng.gen_range(0..Palette::WRAPPING.len())];
            let phase = self.unit();
            let placed_yaw = self.unit() * TAU;
            let tree_position = Vec3::new(
                angle.cos() * radius,
                floor_y + sy / 2.0,
                angle.sin() * radius,
            );
            self.push(
                Category::Gift,
                Placement {
                    tree_position,
                    nominal_scale: Vec3::new(sx, sy, sz),
                    color,
                    speed: 0.1,
                    phase,
                    rotation_speed: Vec3::new(0.0, placed_yaw, 0.0),
                },
            );
        }
    }

    fn star_ornaments(&mut self) {
        for _ in 0..self.config.counts.star_ornaments {
            let h = self.unit() * STAR_MAX_HEIGHT;
            let radius = self.config.base_radius * (1.0 - h) + self.unit() * STAR_RADIAL_SPREAD;
            let theta = self.unit() * TAU;
            let scale = 0.2 + self.unit() * 0.15;
            let color = if self.unit() > 0.5 {
                Palette::GOLD
            } else {
                Palette::SILVER
            };
            let phase = self.unit() * 10.0;
            let rotation_speed = Vec3::new(self.unit(), self.unit(), 0.0);
            let tree_position = self.on_ring(radius, theta, h);
            self.push(
                Category::StarOrnament,
                Placement {
                    tree_position,
                    nominal_scale: Vec3::splat(scale),
                    color,
                    speed: 0.3,
                    phase,
                    rotation_speed,
                },
            );
        }
    }
}
