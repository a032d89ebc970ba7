use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::classifier::{Classification, GestureClassifier, Recognition, VideoFrame};
use crate::error::{ClassifierError, GestureError};
use crate::landmarks::{HandLandmarks, HandPose};

/// A canned sequence of classifier results, loaded from TOML:
///
/// ```toml
/// [[steps]]
/// gesture = "Closed_Fist"
/// score = 0.9
/// frames = 8
///
/// [[steps]]
/// hand = false
/// frames = 3
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GestureScript {
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep {
    #[serde(default)]
    pub gesture: Option<String>,
    #[serde(default = "default_score")]
    pub score: f32,
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Landmark pose; inferred from `gesture` when omitted.
    #[serde(default)]
    pub pose: Option<HandPose>,
    #[serde(default = "default_hand")]
    pub hand: bool,
    /// Makes every frame of the step fail classification.
    #[serde(default)]
    pub fail: bool,
}

fn default_score() -> f32 {
    0.9
}

fn default_frames() -> u32 {
    1
}

fn default_hand() -> bool {
    true
}

impl ScriptStep {
    fn recognition(&self) -> Result<Recognition, ClassifierError> {
        if self.fail {
            return Err(ClassifierError::Inference("scripted failure".into()));
        }
        let Some(gesture) = self.gesture.as_deref().filter(|_| self.hand) else {
            return Ok(Recognition::no_hand());
        };
        let pose = self.pose.unwrap_or(match gesture {
            "Closed_Fist" => HandPose::Fist,
            "Index_Up" => HandPose::IndexUp,
            _ => HandPose::Open,
        });
        Ok(Recognition::hand(
            HandLandmarks::synthetic(pose),
            vec![Classification::new(gesture, self.score)],
        ))
    }
}

impl GestureScript {
    pub fn from_toml_str(input: &str) -> Result<Self, GestureError> {
        let script: GestureScript = toml::from_str(input)?;
        script.validate()?;
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self, GestureError> {
        let contents = fs::read_to_string(path).map_err(|source| GestureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), GestureError> {
        for (index, step) in self.steps.iter().enumerate() {
            if step.frames == 0 {
                return Err(GestureError::InvalidScript(format!(
                    "step {index} must cover at least one frame"
                )));
            }
            if !(0.0..=1.0).contains(&step.score) {
                return Err(GestureError::InvalidScript(format!(
                    "step {index} score {} is outside [0, 1]",
                    step.score
                )));
            }
        }
        Ok(())
    }

    pub fn total_frames(&self) -> u64 {
        self.steps.iter().map(|step| u64::from(step.frames)).sum()
    }
}

/// Replays a [`GestureScript`] one frame at a time, then reports no hand.
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    script: GestureScript,
    step: usize,
    frame_in_step: u32,
    last_timestamp: Option<u64>,
}

impl ScriptedClassifier {
    pub fn new(script: GestureScript) -> Self {
        Self {
            script,
            step: 0,
            frame_in_step: 0,
            last_timestamp: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.step >= self.script.steps.len()
    }

    fn advance(&mut self) -> Option<&ScriptStep> {
        let step = self.script.steps.get(self.step)?;
        self.frame_in_step += 1;
        if self.frame_in_step >= step.frames {
            self.step += 1;
            self.frame_in_step = 0;
        }
        Some(step)
    }
}

impl GestureClassifier for ScriptedClassifier {
    fn recognize(
        &mut self,
        frame: &VideoFrame,
        timestamp_ms: u64,
    ) -> Result<Recognition, ClassifierError> {
        if let Some(last) = self.last_timestamp {
            if timestamp_ms <= last {
                return Err(ClassifierError::InvalidFrame(format!(
                    "timestamp {timestamp_ms} does not follow {last}"
                )));
            }
        }
        self.last_timestamp = Some(timestamp_ms);

        if !frame.is_well_formed() {
            return Err(ClassifierError::InvalidFrame(format!(
                "{}x{} frame carries {} bytes",
                frame.width,
                frame.height,
                frame.pixels.len()
            )));
        }

        match self.advance() {
            Some(step) => step.recognition(),
            None => Ok(Recognition::no_hand()),
        }
    }
}
