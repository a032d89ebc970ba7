use serde::Deserialize;

/// Landmarks reported per detected hand.
pub const LANDMARK_COUNT: usize = 21;

const WRIST: usize = 0;
const INDEX_PIP: usize = 6;
const INDEX_TIP: usize = 8;
const MIDDLE_PIP: usize = 10;
const MIDDLE_TIP: usize = 12;
const RING_PIP: usize = 14;
const RING_TIP: usize = 16;
const PINKY_PIP: usize = 18;
const PINKY_TIP: usize = 20;

/// A normalised image-space point; `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Returns `None` unless exactly [`LANDMARK_COUNT`] points are supplied.
    pub fn from_points(points: &[Landmark]) -> Option<Self> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self { points })
    }

    pub fn point(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    /// Builds a plausible hand skeleton for the given pose.
    pub fn synthetic(pose: HandPose) -> Self {
        let extended: [bool; 5] = match pose {
            HandPose::Open => [true; 5],
            HandPose::Fist => [false; 5],
            HandPose::IndexUp => [false, true, false, false, false],
        };

        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[WRIST] = Landmark::new(0.5, 0.9, 0.0);
        for (finger, is_extended) in extended.iter().enumerate() {
            let x = 0.35 + finger as f32 * 0.07;
            let base = 1 + finger * 4;
            let joints = if *is_extended {
                [0.65, 0.5, 0.42, 0.35]
            } else {
                [0.65, 0.55, 0.62, 0.66]
            };
            for (offset, y) in joints.iter().enumerate() {
                points[base + offset] = Landmark::new(x, *y, 0.0);
            }
        }
        Self { points }
    }
}

/// Poses [`HandLandmarks::synthetic`] can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandPose {
    Open,
    Fist,
    IndexUp,
}

/// Index fingertip above its middle joint while the other three fingers fold.
pub fn is_index_up(hand: &HandLandmarks) -> bool {
    let p = &hand.points;
    let index_extended = p[INDEX_TIP].y < p[INDEX_PIP].y;
    let middle_folded = p[MIDDLE_TIP].y > p[MIDDLE_PIP].y;
    let ring_folded = p[RING_TIP].y > p[RING_PIP].y;
    let pinky_folded = p[PINKY_TIP].y > p[PINKY_PIP].y;
    index_extended && middle_folded && ring_folded && pinky_folded
}
