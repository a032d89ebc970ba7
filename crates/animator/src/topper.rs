use glam::{Quat, Vec3};
use treeconfig::Smoothing;

use formation::Formation;

use crate::clock::FrameSample;
use crate::instances::Transform;

const APEX_CLEARANCE: f32 = 0.8;
const SCATTERED_HEIGHT: f32 = 10.0;
const POSITION_RATE: f32 = 2.5;
const SCALE_RATE: f32 = 5.0;
const YAW_SPEED: f32 = 1.0;
const TREE_SCALE: f32 = 1.2;
const SCATTERED_SCALE: f32 = 0.6;

/// The star that crowns the tree and hovers above the cloud when scattered.
#[derive(Debug, Clone)]
pub struct TreeTopper {
    tree_position: Vec3,
    transform: Transform,
    yaw: f32,
    smoothing: Smoothing,
}

impl TreeTopper {
    pub fn new(tree_height: f32, smoothing: Smoothing) -> Self {
        Self {
            tree_position: Vec3::new(0.0, tree_height / 2.0 + APEX_CLEARANCE, 0.0),
            transform: Transform::IDENTITY,
            yaw: 0.0,
            smoothing,
        }
    }

    pub fn target(&self, formation: Formation) -> Vec3 {
        match formation {
            Formation::Tree => self.tree_position,
            Formation::Scattered => Vec3::new(0.0, SCATTERED_HEIGHT, 0.0),
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn update(&mut self, formation: Formation, sample: FrameSample) {
        let target = self.target(formation);
        let t = self.smoothing.factor(POSITION_RATE, sample.delta);
        self.transform.position = self.transform.position.lerp(target, t);

        self.yaw += sample.delta * YAW_SPEED;
        self.transform.set_orientation(Quat::from_rotation_y(self.yaw));

        let pulse = 1.0 + (sample.elapsed * 2.0).sin() * 0.1;
        let base = if formation.is_tree() {
            TREE_SCALE
        } else {
            SCATTERED_SCALE
        };
        let s = self.smoothing.factor(SCALE_RATE, sample.delta);
        self.transform.scale = self.transform.scale.lerp(Vec3::splat(base * pulse), s);
    }
}
