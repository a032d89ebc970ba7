//! Process-wide formation and gesture state.
//!
//! One [`SharedState`] is shared (behind an `Arc`) between the gesture
//! pipeline, which writes committed gestures into it, the per-frame
//! animator, which only reads, and any UI that issues manual overrides.
//! Every field is replaced by a single store so readers observe either the
//! previous or the new value; the last write wins.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::info;
use treeconfig::ShowcaseSettings;

/// Which target layout every object animates toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    Scattered,
    Tree,
}

impl Formation {
    fn to_raw(self) -> u8 {
        match self {
            Formation::Scattered => 0,
            Formation::Tree => 1,
        }
    }

    fn from_raw(raw: u8) -> Self {
        if raw == 1 {
            Formation::Tree
        } else {
            Formation::Scattered
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Formation::Scattered => Formation::Tree,
            Formation::Tree => Formation::Scattered,
        }
    }

    pub fn is_tree(self) -> bool {
        matches!(self, Formation::Tree)
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formation::Scattered => f.write_str("scattered"),
            Formation::Tree => f.write_str("tree"),
        }
    }
}

/// Gesture vocabulary shared by the classifier seam and downstream readers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GestureLabel {
    #[default]
    None,
    OpenPalm,
    ClosedFist,
    IndexUp,
    Other(String),
}

impl GestureLabel {
    /// Maps a classifier category name onto the vocabulary.
    pub fn from_category(name: &str) -> Self {
        match name {
            "" | "None" => GestureLabel::None,
            "Open_Palm" => GestureLabel::OpenPalm,
            "Closed_Fist" => GestureLabel::ClosedFist,
            "Index_Up" => GestureLabel::IndexUp,
            other => GestureLabel::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GestureLabel::None => "None",
            GestureLabel::OpenPalm => "Open_Palm",
            GestureLabel::ClosedFist => "Closed_Fist",
            GestureLabel::IndexUp => "Index_Up",
            GestureLabel::Other(name) => name,
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether gesture control can currently be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureAvailability {
    Loading,
    Ready,
    Unavailable(String),
}

/// Who issued a formation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Gesture,
    Manual,
}

/// Point-in-time view of the fields the animator consumes each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub formation: Formation,
    pub index_up: bool,
    pub showcase: ShowcaseState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShowcaseState {
    pub enabled: bool,
    pub duration: Duration,
    /// Increments every time a showcase is requested outside the gesture path.
    pub trigger: u64,
}

pub struct SharedState {
    formation: AtomicU8,
    index_up: AtomicBool,
    transitions: AtomicU64,
    showcase_enabled: AtomicBool,
    showcase_duration_ms: AtomicU32,
    showcase_trigger: AtomicU64,
    stable_label: Mutex<GestureLabel>,
    availability: Mutex<GestureAvailability>,
}

impl SharedState {
    pub fn new(initial: Formation, showcase: &ShowcaseSettings) -> Self {
        Self {
            formation: AtomicU8::new(initial.to_raw()),
            index_up: AtomicBool::new(false),
            transitions: AtomicU64::new(0),
            showcase_enabled: AtomicBool::new(showcase.enabled),
            showcase_duration_ms: AtomicU32::new(duration_to_ms(showcase.duration)),
            showcase_trigger: AtomicU64::new(0),
            stable_label: Mutex::new(GestureLabel::None),
            availability: Mutex::new(GestureAvailability::Loading),
        }
    }

    pub fn formation(&self) -> Formation {
        Formation::from_raw(self.formation.load(Ordering::Acquire))
    }

    /// Stores `next`; returns `true` only when the formation actually changed.
    pub fn set_formation(&self, next: Formation, source: ChangeSource) -> bool {
        let previous = Formation::from_raw(self.formation.swap(next.to_raw(), Ordering::AcqRel));
        if previous == next {
            return false;
        }
        self.transitions.fetch_add(1, Ordering::Relaxed);
        info!(from = %previous, to = %next, ?source, "formation changed");
        true
    }

    /// Manual override used by toggle controls.
    pub fn toggle_formation(&self) -> Formation {
        let next = self.formation().toggled();
        self.set_formation(next, ChangeSource::Manual);
        next
    }

    /// Number of formation changes observed since start-up.
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    pub fn is_index_up(&self) -> bool {
        self.index_up.load(Ordering::Acquire)
    }

    pub fn set_index_up(&self, value: bool) {
        self.index_up.store(value, Ordering::Release);
    }

    pub fn stable_label(&self) -> GestureLabel {
        self.stable_label
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_stable_label(&self, label: GestureLabel) {
        *self
            .stable_label
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = label;
    }

    pub fn availability(&self) -> GestureAvailability {
        self.availability
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_availability(&self, availability: GestureAvailability) {
        *self
            .availability
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = availability;
    }

    pub fn showcase(&self) -> ShowcaseState {
        ShowcaseState {
            enabled: self.showcase_enabled.load(Ordering::Acquire),
            duration: Duration::from_millis(
                u64::from(self.showcase_duration_ms.load(Ordering::Acquire)),
            ),
            trigger: self.showcase_trigger.load(Ordering::Acquire),
        }
    }

    pub fn set_showcase_enabled(&self, enabled: bool) {
        self.showcase_enabled.store(enabled, Ordering::Release);
    }

    /// Requests a single showcase turn, as a UI button would.
    pub fn trigger_showcase(&self) {
        self.showcase_trigger.fetch_add(1, Ordering::AcqRel);
    }

    pub fn frame_inputs(&self) -> FrameInputs {
        FrameInputs {
            formation: self.formation(),
            index_up: self.is_index_up(),
            showcase: self.showcase(),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(Formation::Scattered, &ShowcaseSettings::default())
    }
}

fn duration_to_ms(duration: Duration) -> u32 {
    duration.as_millis().clamp(1, u128::from(u32::MAX)) as u32
}
