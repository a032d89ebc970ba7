use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use formation::{Formation, SharedState};
use glam::{Mat3, Mat4, Quat, Vec3};
use layout::{Category, Layout, OrnamentRecord};
use tracing::debug;
use treeconfig::{AnimationConfig, EvergreenConfig};

use crate::clock::FrameSample;
use crate::instances::{BatchId, InstanceBatches, Transform};
use crate::rotation::{strategy_for_config, BoxedRotationStrategy, RotationMode};
use crate::topper::TreeTopper;

/// Summary of one animated frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub formation: Formation,
    pub yaw: f32,
    pub mode: RotationMode,
}

/// Moves every ornament toward its active formation once per frame.
///
/// Current poses live in a CPU-side array indexed like the layout records;
/// after each frame they are copied into the per-category instance batches
/// and those batches are marked dirty.
pub struct InstanceAnimator {
    layout: Arc<Layout>,
    config: AnimationConfig,
    state: Arc<SharedState>,
    transforms: Vec<Transform>,
    batches: InstanceBatches,
    rotation: BoxedRotationStrategy,
    topper: TreeTopper,
    last_formation: Option<Formation>,
}

impl InstanceAnimator {
    pub fn new(layout: Arc<Layout>, config: &EvergreenConfig, state: Arc<SharedState>) -> Self {
        let transforms = vec![Transform::IDENTITY; layout.len()];
        let batches = InstanceBatches::from_layout(&layout);
        Self {
            rotation: strategy_for_config(&config.rotation, &config.showcase),
            topper: TreeTopper::new(config.layout.tree_height, config.animation.smoothing),
            config: config.animation.clone(),
            layout,
            state,
            transforms,
            batches,
            last_formation: None,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn batches(&self) -> &InstanceBatches {
        &self.batches
    }

    pub fn batches_mut(&mut self) -> &mut InstanceBatches {
        &mut self.batches
    }

    pub fn topper(&self) -> &TreeTopper {
        &self.topper
    }

    pub fn yaw(&self) -> f32 {
        self.rotation.yaw()
    }

    pub fn rotation_mode(&self) -> RotationMode {
        self.rotation.mode()
    }

    /// World transform applied to the whole ornament group.
    pub fn group_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation.yaw())
    }

    /// Collapses every object back to the origin at unit scale.
    pub fn reset(&mut self) {
        self.transforms.fill(Transform::IDENTITY);
        self.last_formation = None;
    }

    pub fn frame(&mut self, sample: FrameSample) -> FrameReport {
        let inputs = self.state.frame_inputs();
        if self.last_formation != Some(inputs.formation) {
            debug!(formation = %inputs.formation, "animator retargeting");
            self.last_formation = Some(inputs.formation);
        }

        let yaw = self.rotation.update(&inputs, sample);
        let tree = inputs.formation.is_tree();
        let records = self.layout.records();
        let motion = Motion {
            config: &self.config,
            tree,
            sample,
        };

        for category in Category::ALL {
            let indices = self.layout.indices(category);
            for &index in indices {
                if let (Some(record), Some(transform)) =
                    (records.get(index), self.transforms.get_mut(index))
                {
                    motion.step(record, transform);
                }
            }

            sync_batch(
                &mut self.batches,
                BatchId::Category(category),
                indices,
                &self.transforms,
            );
            if category == Category::Gift {
                sync_batch(&mut self.batches, BatchId::GiftRibbon, indices, &self.transforms);
            }
        }

        self.topper.update(inputs.formation, sample);
        if let Some(batch) = self.batches.get_mut(BatchId::Topper) {
            batch.write(0, self.topper.transform());
            batch.mark_dirty();
        }

        FrameReport {
            frame_index: sample.frame_index,
            formation: inputs.formation,
            yaw,
            mode: self.rotation.mode(),
        }
    }

    /// Mean distance from each object to its un-oscillated formation target.
    pub fn mean_target_distance(&self, formation: Formation) -> f32 {
        if self.transforms.is_empty() {
            return 0.0;
        }
        let total: f32 = self
            .layout
            .records()
            .iter()
            .zip(&self.transforms)
            .map(|(record, transform)| {
                let target = match formation {
                    Formation::Tree => record.tree_position,
                    Formation::Scattered => record.scatter_position,
                };
                transform.position.distance(target)
            })
            .sum();
        total / self.transforms.len() as f32
    }
}

fn sync_batch(
    batches: &mut InstanceBatches,
    id: BatchId,
    indices: &[usize],
    transforms: &[Transform],
) {
    let Some(batch) = batches.get_mut(id) else {
        return;
    };
    if batch.len() != indices.len() {
        return;
    }
    for (slot, &index) in indices.iter().enumerate() {
        if let Some(transform) = transforms.get(index) {
            batch.write(slot, transform);
        }
    }
    batch.mark_dirty();
}

struct Motion<'a> {
    config: &'a AnimationConfig,
    tree: bool,
    sample: FrameSample,
}

impl Motion<'_> {
    fn factor(&self, rate: f32) -> f32 {
        self.config.smoothing.factor(rate, self.sample.delta)
    }

    fn target(&self, record: &OrnamentRecord) -> Vec3 {
        let t = self.sample.elapsed;
        let (mut target, noise) = if self.tree {
            (record.tree_position, self.config.tree_noise)
        } else {
            (record.scatter_position, self.config.scatter_noise)
        };
        target.y += (t * record.speed + record.phase).sin() * noise;
        if !self.tree {
            let wander = t * self.config.wander_speed + record.phase;
            target.x += wander.sin() * self.config.wander_radius;
            target.z += wander.cos() * self.config.wander_radius;
        }
        target
    }

    fn step(&self, record: &OrnamentRecord, transform: &mut Transform) {
        let t = self.sample.elapsed;
        let delta = self.sample.delta;

        let rate = if self.tree {
            self.config.tree_lerp_rate
        } else {
            self.config.scatter_lerp_rate
        };
        transform.position = transform.position.lerp(self.target(record), self.factor(rate));

        let spin = record.rotation_speed;
        match record.category {
            Category::Foliage if self.tree => {
                if let Some(facing) = outward_orientation(transform.position) {
                    let lean = Quat::from_rotation_x(FRAC_PI_2 - self.config.foliage_tilt);
                    transform.set_orientation(facing * lean);
                }
            }
            Category::Foliage => transform.set_euler(spin * t),
            Category::Gift if self.tree => {
                let placed = Quat::from_rotation_y(spin.y);
                let settle = self.factor(self.config.gift_settle_rate);
                transform.set_orientation(transform.orientation.slerp(placed, settle));
            }
            Category::Gift => {
                let euler = transform.euler + Vec3::new(spin.x, spin.y, 0.0) * delta;
                transform.set_euler(euler);
            }
            Category::StarOrnament => {
                let angle = t * record.speed;
                transform.set_euler(Vec3::new(angle, angle, 0.0));
            }
            Category::Bauble | Category::Garland | Category::Light => {
                transform.set_euler(transform.euler + spin * delta);
            }
        }

        transform.scale = transform
            .scale
            .lerp(record.nominal_scale, self.factor(self.config.scale_lerp_rate));
    }
}

/// Rotation whose +Z axis points away from the trunk through `position`.
/// `None` on the trunk axis itself.
pub fn outward_orientation(position: Vec3) -> Option<Quat> {
    let forward = Vec3::new(position.x, 0.0, position.z).try_normalize()?;
    let right = Vec3::Y.cross(forward).normalize();
    let up = forward.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, forward)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedStepClock, FrameClock};
    use formation::ChangeSource;
    use treeconfig::{LayoutConfig, RotationStrategyKind, Smoothing};

    fn small_config() -> EvergreenConfig {
        let mut config = EvergreenConfig::default();
        config.layout = LayoutConfig {
            counts: treeconfig::CategoryCounts {
                foliage: 200,
                baubles: 20,
                garland: 30,
                gifts: 12,
                lights: 30,
                star_ornaments: 10,
            },
            ..LayoutConfig::default()
        };
        config
    }

    fn animator(config: &EvergreenConfig, seed: u64) -> (InstanceAnimator, Arc<SharedState>) {
        let layout = Arc::new(layout::generate_seeded(&config.layout, seed));
        let state = Arc::new(SharedState::new(Formation::Scattered, &config.showcase));
        (
            InstanceAnimator::new(layout, config, Arc::clone(&state)),
            state,
        )
    }

    fn run(animator: &mut InstanceAnimator, clock: &mut FixedStepClock, frames: usize) {
        for _ in 0..frames {
            animator.frame(clock.sample());
        }
    }

    #[test]
    fn starts_collapsed_at_origin() {
        let (animator, _) = animator(&small_config(), 1);
        assert_eq!(animator.transforms().len(), 302);
        assert!(animator
            .transforms()
            .iter()
            .all(|t| *t == Transform::IDENTITY));
    }

    #[test]
    fn converges_on_tree_formation() {
        let config = small_config();
        let (mut animator, state) = animator(&config, 7);
        state.set_formation(Formation::Tree, ChangeSource::Manual);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 60 * 15);

        assert!(animator.mean_target_distance(Formation::Tree) < 0.1);
        for (record, transform) in animator.layout().records().iter().zip(animator.transforms()) {
            assert!((transform.scale - record.nominal_scale).length() < 1e-3);
        }
    }

    #[test]
    fn exponential_smoothing_also_converges() {
        let mut config = small_config();
        config.animation.smoothing = Smoothing::Exponential;
        let (mut animator, state) = animator(&config, 7);
        state.set_formation(Formation::Tree, ChangeSource::Gesture);
        let mut clock = FixedStepClock::from_fps(30.0);
        run(&mut animator, &mut clock, 30 * 15);
        assert!(animator.mean_target_distance(Formation::Tree) < 0.1);
    }

    #[test]
    fn manual_override_retargets_scatter() {
        let config = small_config();
        let (mut animator, state) = animator(&config, 11);
        state.set_formation(Formation::Tree, ChangeSource::Gesture);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 600);
        let in_tree = animator.mean_target_distance(Formation::Scattered);

        state.toggle_formation();
        run(&mut animator, &mut clock, 600);
        assert!(animator.mean_target_distance(Formation::Scattered) < in_tree);
    }

    #[test]
    fn gift_ribbons_mirror_gift_boxes() {
        let config = small_config();
        let (mut animator, state) = animator(&config, 5);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 30);
        state.set_formation(Formation::Tree, ChangeSource::Manual);
        run(&mut animator, &mut clock, 30);

        let gifts = animator
            .batches()
            .get(BatchId::Category(Category::Gift))
            .expect("gift batch");
        let ribbons = animator.batches().get(BatchId::GiftRibbon).expect("ribbon batch");
        assert_eq!(gifts.len(), 12);
        for (gift, ribbon) in gifts.instances().iter().zip(ribbons.instances()) {
            assert_eq!(gift.model, ribbon.model);
            assert_ne!(gift.color, [0.0; 4]);
        }
    }

    #[test]
    fn star_ornaments_spin_with_elapsed_time() {
        let config = small_config();
        let (mut animator, _) = animator(&config, 9);
        let mut clock = FixedStepClock::new(0.25);
        run(&mut animator, &mut clock, 8);

        for &index in animator.layout().indices(Category::StarOrnament) {
            let record = &animator.layout().records()[index];
            let euler = animator.transforms()[index].euler;
            assert!((euler.x - 2.0 * record.speed).abs() < 1e-5);
            assert!((euler.y - 2.0 * record.speed).abs() < 1e-5);
            assert_eq!(euler.z, 0.0);
        }
    }

    #[test]
    fn tree_foliage_faces_outward() {
        let facing = outward_orientation(Vec3::new(3.0, 1.0, 0.0)).expect("off axis");
        assert!((facing * Vec3::Z - Vec3::X).length() < 1e-5);
        assert!((facing * Vec3::Y - Vec3::Y).length() < 1e-5);
        assert!(outward_orientation(Vec3::new(0.0, 4.0, 0.0)).is_none());
    }

    #[test]
    fn tree_orientations_settle_on_placed_poses() {
        let config = small_config();
        let (mut animator, state) = animator(&config, 13);
        state.set_formation(Formation::Tree, ChangeSource::Manual);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 60 * 15);

        let records = animator.layout().records();
        for &index in animator.layout().indices(Category::Gift) {
            let placed = Quat::from_rotation_y(records[index].rotation_speed.y);
            let orientation = animator.transforms()[index].orientation;
            assert!(orientation.dot(placed).abs() > 1.0 - 1e-4);
        }

        let lean = Quat::from_rotation_x(FRAC_PI_2 - config.animation.foliage_tilt);
        for &index in animator.layout().indices(Category::Foliage) {
            let transform = &animator.transforms()[index];
            let facing = outward_orientation(transform.position).expect("foliage off axis");
            let expected = (facing * lean).normalize();
            assert!(transform.orientation.dot(expected).abs() > 1.0 - 1e-5);
        }
    }

    #[test]
    fn group_matrix_follows_yaw() {
        let config = small_config();
        let (mut animator, state) = animator(&config, 2);
        state.set_formation(Formation::Tree, ChangeSource::Gesture);
        state.set_index_up(true);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 60);

        let yaw = animator.yaw();
        assert!((yaw - 1.2).abs() < 1e-3);
        let rotated = animator.group_matrix().transform_vector3(Vec3::X);
        assert!((rotated - Vec3::new(yaw.cos(), 0.0, -yaw.sin())).length() < 1e-5);
    }

    #[test]
    fn topper_pose_reaches_its_batch() {
        let config = small_config();
        let (mut animator, state) = animator(&config, 6);
        state.set_formation(Formation::Tree, ChangeSource::Manual);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 600);

        let batch = animator.batches().get(BatchId::Topper).expect("topper batch");
        assert_eq!(batch.len(), 1);
        let expected = animator.topper().transform().matrix().to_cols_array_2d();
        assert_eq!(batch.instances()[0].model, expected);
        let height = batch.instances()[0].model[3][1];
        assert!((height - (config.layout.tree_height / 2.0 + 0.8)).abs() < 1e-3);
    }

    #[test]
    fn identical_inputs_give_identical_frames() {
        let config = small_config();
        let (mut first, first_state) = animator(&config, 21);
        let (mut second, second_state) = animator(&config, 21);
        let mut a = FixedStepClock::from_fps(60.0);
        let mut b = FixedStepClock::from_fps(60.0);
        for frame in 0..240 {
            if frame == 120 {
                first_state.set_formation(Formation::Tree, ChangeSource::Gesture);
                second_state.set_formation(Formation::Tree, ChangeSource::Gesture);
            }
            first.frame(a.sample());
            second.frame(b.sample());
        }
        assert_eq!(first.transforms(), second.transforms());
        assert_eq!(first.yaw(), second.yaw());
    }

    #[test]
    fn held_index_up_spins_group_in_tree_form() {
        let config = small_config();
        let (mut animator, state) = animator(&config, 2);
        state.set_formation(Formation::Tree, ChangeSource::Gesture);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 10);
        let before = animator.yaw();

        state.set_index_up(true);
        run(&mut animator, &mut clock, 120);
        assert_eq!(animator.rotation_mode(), RotationMode::Spin);
        let after = animator.yaw();
        assert!((after - before - 2.4).abs() < 1e-3);

        state.set_index_up(false);
        run(&mut animator, &mut clock, 60);
        assert_eq!(animator.yaw(), after);
        assert_eq!(animator.rotation_mode(), RotationMode::Still);
    }

    #[test]
    fn showcase_strategy_from_config() {
        let mut config = small_config();
        config.rotation.strategy = RotationStrategyKind::Showcase;
        let (mut animator, state) = animator(&config, 2);
        state.set_formation(Formation::Tree, ChangeSource::Gesture);
        state.set_index_up(true);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 5);
        assert_eq!(animator.rotation_mode(), RotationMode::Showcase);
    }

    #[test]
    fn frames_mark_batches_dirty() {
        let (mut animator, _) = animator(&small_config(), 4);
        for (_, batch) in animator.batches_mut().iter_mut() {
            batch.mark_clean();
        }
        assert_eq!(animator.batches().dirty_count(), 0);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 1);
        assert_eq!(animator.batches().dirty_count(), BatchId::ALL.len());
    }

    #[test]
    fn reset_collapses_poses() {
        let (mut animator, _) = animator(&small_config(), 4);
        let mut clock = FixedStepClock::from_fps(60.0);
        run(&mut animator, &mut clock, 30);
        animator.reset();
        assert!(animator
            .transforms()
            .iter()
            .all(|t| *t == Transform::IDENTITY));
    }
}
