use std::sync::Arc;
use std::time::Instant;

use formation::{ChangeSource, Formation, GestureLabel, SharedState};
use tracing::{debug, info, warn};
use treeconfig::GestureConfig;

use crate::classifier::{GestureClassifier, Recognition, VideoFrame};
use crate::debounce::{DebounceStatus, Debouncer};
use crate::error::ClassifierError;
use crate::landmarks::is_index_up;

/// What one pipeline cycle did with its frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The classifier failed; nothing changed.
    Skipped,
    /// No hand (or no gesture) was reported; the debounce run was cleared.
    NoHand,
    /// The top score did not exceed the confidence floor.
    BelowFloor { label: GestureLabel, score: f32 },
    Pending { label: GestureLabel, count: u32 },
    /// `changed` is set when this commit moved the formation.
    Committed {
        label: GestureLabel,
        changed: Option<Formation>,
    },
}

/// Monotonic millisecond timestamps that never repeat.
#[derive(Debug, Clone)]
pub struct TimestampClock {
    origin: Instant,
    last: Option<u64>,
}

impl TimestampClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: None,
        }
    }

    pub fn next(&mut self) -> u64 {
        let now = self.origin.elapsed().as_millis() as u64;
        let stamp = match self.last {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

impl Default for TimestampClock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GesturePipeline<C> {
    classifier: C,
    debouncer: Debouncer,
    min_score: f32,
    clock: TimestampClock,
    state: Arc<SharedState>,
}

impl<C: GestureClassifier> GesturePipeline<C> {
    pub fn new(classifier: C, config: &GestureConfig, state: Arc<SharedState>) -> Self {
        Self {
            classifier,
            debouncer: Debouncer::new(config.debounce_frames),
            min_score: config.min_score,
            clock: TimestampClock::new(),
            state,
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Classifies and applies a single frame.
    pub fn process_frame(&mut self, frame: &VideoFrame) -> FrameOutcome {
        match self.classify(frame) {
            Ok(recognition) => self.apply(&recognition),
            Err(err) => {
                warn!(error = %err, "gesture recognition failed; skipping frame");
                FrameOutcome::Skipped
            }
        }
    }

    pub fn classify(&mut self, frame: &VideoFrame) -> Result<Recognition, ClassifierError> {
        let timestamp_ms = self.clock.next();
        self.classifier.recognize(frame, timestamp_ms)
    }

    /// Runs debounce and commit logic on an already classified frame.
    pub fn apply(&mut self, recognition: &Recognition) -> FrameOutcome {
        let (Some(hand), Some(top)) = (recognition.landmarks.as_ref(), recognition.top()) else {
            self.hand_lost();
            return FrameOutcome::NoHand;
        };

        let mut label = GestureLabel::from_category(&top.category);
        if is_index_up(hand) {
            label = GestureLabel::IndexUp;
        }

        if top.score <= self.min_score {
            return FrameOutcome::BelowFloor {
                label,
                score: top.score,
            };
        }

        match self.debouncer.observe(label) {
            DebounceStatus::Pending { label, count } => FrameOutcome::Pending { label, count },
            DebounceStatus::Committed(label) => {
                let changed = self.commit(&label);
                FrameOutcome::Committed { label, changed }
            }
        }
    }

    fn commit(&self, label: &GestureLabel) -> Option<Formation> {
        if self.state.stable_label() != *label {
            info!(gesture = %label, "gesture committed");
        }
        self.state.set_stable_label(label.clone());

        let target = match label {
            GestureLabel::OpenPalm => Some(Formation::Scattered),
            GestureLabel::ClosedFist => Some(Formation::Tree),
            _ => None,
        };
        let changed = target.filter(|next| self.state.set_formation(*next, ChangeSource::Gesture));

        self.state.set_index_up(*label == GestureLabel::IndexUp);
        changed
    }

    fn hand_lost(&mut self) {
        if self.debouncer.consecutive() > 0 || self.state.is_index_up() {
            debug!("hand left frame; clearing gesture run");
        }
        self.debouncer.reset();
        self.state.set_stable_label(GestureLabel::None);
        self.state.set_index_up(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classification;
    use crate::landmarks::{HandLandmarks, HandPose};
    use std::collections::VecDeque;

    struct QueueClassifier {
        frames: VecDeque<Result<Recognition, ClassifierError>>,
        stamps: Vec<u64>,
    }

    impl QueueClassifier {
        fn new(frames: Vec<Result<Recognition, ClassifierError>>) -> Self {
            Self {
                frames: frames.into(),
                stamps: Vec::new(),
            }
        }
    }

    impl GestureClassifier for QueueClassifier {
        fn recognize(
            &mut self,
            _frame: &VideoFrame,
            timestamp_ms: u64,
        ) -> Result<Recognition, ClassifierError> {
            self.stamps.push(timestamp_ms);
            self.frames.pop_front().unwrap_or_else(|| Ok(Recognition::no_hand()))
        }
    }

    fn hand(category: &str, score: f32, pose: HandPose) -> Result<Recognition, ClassifierError> {
        Ok(Recognition::hand(
            HandLandmarks::synthetic(pose),
            vec![Classification::new(category, score)],
        ))
    }

    fn repeat(
        frame: Result<Recognition, ClassifierError>,
        count: usize,
    ) -> Vec<Result<Recognition, ClassifierError>> {
        std::iter::repeat(frame).take(count).collect()
    }

    fn pipeline(
        frames: Vec<Result<Recognition, ClassifierError>>,
    ) -> GesturePipeline<QueueClassifier> {
        GesturePipeline::new(
            QueueClassifier::new(frames),
            &GestureConfig::default(),
            Arc::new(SharedState::default()),
        )
    }

    fn run(pipeline: &mut GesturePipeline<QueueClassifier>, frames: usize) -> Vec<FrameOutcome> {
        let frame = VideoFrame::blank(2, 2);
        (0..frames).map(|_| pipeline.process_frame(&frame)).collect()
    }

    #[test]
    fn fist_commits_tree_once_on_seventh_frame() {
        let mut pipeline = pipeline(repeat(hand("Closed_Fist", 0.9, HandPose::Fist), 8));
        let outcomes = run(&mut pipeline, 8);

        for outcome in &outcomes[..6] {
            assert!(matches!(outcome, FrameOutcome::Pending { .. }));
        }
        assert_eq!(
            outcomes[6],
            FrameOutcome::Committed {
                label: GestureLabel::ClosedFist,
                changed: Some(Formation::Tree),
            }
        );
        assert_eq!(
            outcomes[7],
            FrameOutcome::Committed {
                label: GestureLabel::ClosedFist,
                changed: None,
            }
        );
        assert_eq!(pipeline.state().formation(), Formation::Tree);
        assert_eq!(pipeline.state().transitions(), 1);
    }

    #[test]
    fn interrupted_run_never_commits() {
        let mut frames = repeat(hand("Open_Palm", 0.9, HandPose::Open), 3);
        frames.extend(repeat(hand("Closed_Fist", 0.9, HandPose::Fist), 1));
        frames.extend(repeat(hand("Open_Palm", 0.9, HandPose::Open), 3));
        let mut pipeline = pipeline(frames);
        pipeline.state().set_formation(Formation::Tree, ChangeSource::Manual);

        let outcomes = run(&mut pipeline, 7);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, FrameOutcome::Pending { .. })));
        assert_eq!(pipeline.state().formation(), Formation::Tree);
    }

    #[test]
    fn low_confidence_frames_do_not_advance_run() {
        let mut frames = repeat(hand("Closed_Fist", 0.9, HandPose::Fist), 5);
        frames.extend(repeat(hand("Closed_Fist", 0.5, HandPose::Fist), 4));
        frames.extend(repeat(hand("Closed_Fist", 0.9, HandPose::Fist), 1));
        let mut pipeline = pipeline(frames);

        let outcomes = run(&mut pipeline, 10);
        assert!(matches!(outcomes[5], FrameOutcome::BelowFloor { .. }));
        assert!(matches!(
            outcomes[9],
            FrameOutcome::Pending { count: 5, .. }
        ));
        assert_eq!(pipeline.state().formation(), Formation::Scattered);
    }

    #[test]
    fn lost_hand_clears_index_up() {
        let mut frames = repeat(hand("None", 0.8, HandPose::IndexUp), 7);
        frames.push(Ok(Recognition::no_hand()));
        let mut pipeline = pipeline(frames);

        let outcomes = run(&mut pipeline, 7);
        assert_eq!(
            outcomes[6],
            FrameOutcome::Committed {
                label: GestureLabel::IndexUp,
                changed: None,
            }
        );
        assert!(pipeline.state().is_index_up());
        assert_eq!(pipeline.state().stable_label(), GestureLabel::IndexUp);

        assert_eq!(run(&mut pipeline, 1), vec![FrameOutcome::NoHand]);
        assert!(!pipeline.state().is_index_up());
        assert_eq!(pipeline.state().stable_label(), GestureLabel::None);
        assert_eq!(pipeline.debouncer().consecutive(), 0);
    }

    #[test]
    fn other_commit_clears_index_up_without_moving_formation() {
        let mut frames = repeat(hand("None", 0.8, HandPose::IndexUp), 7);
        frames.extend(repeat(hand("Victory", 0.8, HandPose::Open), 7));
        let mut pipeline = pipeline(frames);

        run(&mut pipeline, 7);
        assert!(pipeline.state().is_index_up());
        run(&mut pipeline, 7);
        assert!(!pipeline.state().is_index_up());
        assert_eq!(
            pipeline.state().stable_label(),
            GestureLabel::Other("Victory".into())
        );
        assert_eq!(pipeline.state().formation(), Formation::Scattered);
    }

    #[test]
    fn classifier_errors_skip_frame() {
        let mut frames = repeat(hand("Closed_Fist", 0.9, HandPose::Fist), 3);
        frames.push(Err(ClassifierError::Inference("model crashed".into())));
        frames.extend(repeat(hand("Closed_Fist", 0.9, HandPose::Fist), 4));
        let mut pipeline = pipeline(frames);

        let outcomes = run(&mut pipeline, 8);
        assert_eq!(outcomes[3], FrameOutcome::Skipped);
        assert!(matches!(outcomes[7], FrameOutcome::Committed { .. }));
    }

    #[test]
    fn timestamps_strictly_increase() {
        let mut pipeline = pipeline(Vec::new());
        run(&mut pipeline, 50);
        let stamps = &pipeline.classifier.stamps;
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
