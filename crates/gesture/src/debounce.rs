use formation::GestureLabel;

/// Result of feeding one accepted label into the [`Debouncer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceStatus {
    /// The run is still too short; `count` frames matched the previous one.
    Pending { label: GestureLabel, count: u32 },
    /// The label has been seen long enough to be acted on.
    Committed(GestureLabel),
}

/// Requires a label to repeat on consecutive accepted frames before it counts.
///
/// The first frame of a run resets the counter to zero, so with threshold `t`
/// a label commits on its `t + 2`th consecutive frame and on every frame after.
#[derive(Debug, Clone)]
pub struct Debouncer {
    threshold: u32,
    candidate: GestureLabel,
    consecutive: u32,
}

impl Debouncer {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            candidate: GestureLabel::None,
            consecutive: 0,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn candidate(&self) -> &GestureLabel {
        &self.candidate
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn observe(&mut self, label: GestureLabel) -> DebounceStatus {
        if label == self.candidate {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
            self.candidate = label.clone();
        }

        if self.consecutive > self.threshold {
            DebounceStatus::Committed(label)
        } else {
            DebounceStatus::Pending {
                label,
                count: self.consecutive,
            }
        }
    }

    /// Forgets the current run, as when the hand leaves the frame.
    pub fn reset(&mut self) {
        self.consecutive = 0;
        self.candidate = GestureLabel::None;
    }
}
