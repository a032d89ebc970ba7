use crate::error::ClassifierError;
use crate::landmarks::HandLandmarks;

/// One captured camera frame. Pixels are RGBA8, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    pub fn blank(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 4;
        Self {
            width,
            height,
            pixels: vec![0; len],
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() == self.width as usize * self.height as usize * 4
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: String,
    pub score: f32,
}

impl Classification {
    pub fn new(category: impl Into<String>, score: f32) -> Self {
        Self {
            category: category.into(),
            score,
        }
    }
}

/// Classifier output for one frame, covering at most one hand.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recognition {
    pub landmarks: Option<HandLandmarks>,
    pub gestures: Vec<Classification>,
}

impl Recognition {
    pub fn no_hand() -> Self {
        Self::default()
    }

    pub fn hand(landmarks: HandLandmarks, gestures: Vec<Classification>) -> Self {
        Self {
            landmarks: Some(landmarks),
            gestures,
        }
    }

    /// Highest scoring category, if any.
    pub fn top(&self) -> Option<&Classification> {
        self.gestures
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Seam for the hand-gesture model.
///
/// `timestamp_ms` is strictly increasing across calls on the same instance.
pub trait GestureClassifier: Send {
    fn recognize(
        &mut self,
        frame: &VideoFrame,
        timestamp_ms: u64,
    ) -> Result<Recognition, ClassifierError>;
}

impl<T: GestureClassifier + ?Sized> GestureClassifier for Box<T> {
    fn recognize(
        &mut self,
        frame: &VideoFrame,
        timestamp_ms: u64,
    ) -> Result<Recognition, ClassifierError> {
        (**self).recognize(frame, timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::HandPose;

    #[test]
    fn top_picks_highest_score() {
        let recognition = Recognition::hand(
            HandLandmarks::synthetic(HandPose::Open),
            vec![
                Classification::new("None", 0.2),
                Classification::new("Open_Palm", 0.8),
                Classification::new("Closed_Fist", 0.1),
            ],
        );
        assert_eq!(recognition.top().map(|c| c.category.as_str()), Some("Open_Palm"));
        assert!(Recognition::no_hand().top().is_none());
    }

    #[test]
    fn blank_frame_is_well_formed() {
        assert!(VideoFrame::blank(320, 240).is_well_formed());
        let mut frame = VideoFrame::blank(4, 4);
        frame.pixels.pop();
        assert!(!frame.is_well_formed());
    }
}
