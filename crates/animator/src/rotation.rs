use std::f32::consts::TAU;
use std::fmt;
use std::time::Duration;

use formation::{FrameInputs, Formation};
use tracing::debug;
use treeconfig::{RotationConfig, RotationStrategyKind, ShowcaseSettings};

use crate::clock::FrameSample;

/// What the group yaw is doing this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    Drift,
    Spin,
    Still,
    Showcase,
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RotationMode::Drift => "drift",
            RotationMode::Spin => "spin",
            RotationMode::Still => "still",
            RotationMode::Showcase => "showcase",
        };
        f.write_str(name)
    }
}

/// Drives the yaw of the whole ornament group.
pub trait RotationStrategy: Send {
    /// Advances one frame and returns the new yaw in radians.
    fn update(&mut self, inputs: &FrameInputs, sample: FrameSample) -> f32;
    fn yaw(&self) -> f32;
    fn mode(&self) -> RotationMode;
}

pub type BoxedRotationStrategy = Box<dyn RotationStrategy>;

/// Builds the strategy selected in `[rotation]`.
pub fn strategy_for_config(
    rotation: &RotationConfig,
    showcase: &ShowcaseSettings,
) -> BoxedRotationStrategy {
    match rotation.strategy {
        RotationStrategyKind::Hold => Box::new(HoldToSpin::new(rotation)),
        RotationStrategyKind::Showcase => Box::new(Showcase::new(rotation, showcase)),
    }
}

/// Drift while scattered, spin while the index finger is held up in tree
/// form, otherwise freeze in place. Rate changes are instantaneous.
#[derive(Debug, Clone)]
pub struct HoldToSpin {
    drift_speed: f32,
    spin_speed: f32,
    yaw: f32,
    mode: RotationMode,
}

impl HoldToSpin {
    pub fn new(config: &RotationConfig) -> Self {
        Self {
            drift_speed: config.drift_speed,
            spin_speed: config.spin_speed,
            yaw: 0.0,
            mode: RotationMode::Drift,
        }
    }

    fn select(inputs: &FrameInputs) -> RotationMode {
        match (inputs.formation, inputs.index_up) {
            (Formation::Scattered, _) => RotationMode::Drift,
            (Formation::Tree, true) => RotationMode::Spin,
            (Formation::Tree, false) => RotationMode::Still,
        }
    }
}

impl RotationStrategy for HoldToSpin {
    fn update(&mut self, inputs: &FrameInputs, sample: FrameSample) -> f32 {
        let mode = Self::select(inputs);
        if mode != self.mode {
            debug!(from = %self.mode, to = %mode, yaw = self.yaw, "rotation mode changed");
            self.mode = mode;
        }
        let rate = match mode {
            RotationMode::Drift => self.drift_speed,
            RotationMode::Spin => self.spin_speed,
            RotationMode::Still | RotationMode::Showcase => 0.0,
        };
        self.yaw += rate * sample.delta;
        self.yaw
    }

    fn yaw(&self) -> f32 {
        self.yaw
    }

    fn mode(&self) -> RotationMode {
        self.mode
    }
}

/// Easing applied to showcase progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaseCurve {
    Linear,
    EaseInOutCubic,
}

impl EaseCurve {
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            EaseCurve::Linear => clamped,
            EaseCurve::EaseInOutCubic => {
                if clamped < 0.5 {
                    4.0 * clamped * clamped * clamped
                } else {
                    1.0 - (-2.0 * clamped + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Progress of a single eased full turn, measured in clock seconds.
#[derive(Debug, Clone, Copy)]
struct TurnEnvelope {
    start: f32,
    duration: f32,
    start_yaw: f32,
    curve: EaseCurve,
}

impl TurnEnvelope {
    fn new(start: f32, duration: Duration, start_yaw: f32, curve: EaseCurve) -> Option<Self> {
        if duration <= Duration::ZERO {
            None
        } else {
            Some(Self {
                start,
                duration: duration.as_secs_f32(),
                start_yaw,
                curve,
            })
        }
    }

    /// Returns the yaw at `now` and whether the turn has completed.
    fn yaw_at(&self, now: f32) -> (f32, bool) {
        let progress = (now - self.start).max(0.0) / self.duration.max(f32::EPSILON);
        if progress >= 1.0 {
            ((self.start_yaw + TAU).rem_euclid(TAU), true)
        } else {
            (self.start_yaw + self.curve.sample(progress) * TAU, false)
        }
    }
}

/// One eased 360 degree turn per trigger, layered over drift/still.
///
/// A turn starts on a rising edge of index-up while in tree form once the
/// cooldown since the previous trigger has passed, or on a manual trigger.
/// Scattering cancels a turn in progress.
#[derive(Debug, Clone)]
pub struct Showcase {
    drift_speed: f32,
    cooldown: f32,
    yaw: f32,
    mode: RotationMode,
    active: Option<TurnEnvelope>,
    last_trigger: Option<f32>,
    was_index_up: bool,
    seen_manual_trigger: Option<u64>,
}

impl Showcase {
    pub fn new(rotation: &RotationConfig, showcase: &ShowcaseSettings) -> Self {
        Self {
            drift_speed: rotation.drift_speed,
            cooldown: showcase.cooldown.as_secs_f32(),
            yaw: 0.0,
            mode: RotationMode::Drift,
            active: None,
            last_trigger: None,
            was_index_up: false,
            seen_manual_trigger: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn cooled_down(&self, now: f32) -> bool {
        self.last_trigger
            .map_or(true, |last| now - last >= self.cooldown)
    }

    fn start(&mut self, now: f32, duration: Duration, reason: &'static str) {
        self.active = TurnEnvelope::new(now, duration, self.yaw, EaseCurve::EaseInOutCubic);
        self.last_trigger = Some(now);
        if self.active.is_some() {
            debug!(reason, start_yaw = self.yaw, ?duration, "showcase started");
        }
    }
}

impl RotationStrategy for Showcase {
    fn update(&mut self, inputs: &FrameInputs, sample: FrameSample) -> f32 {
        let now = sample.elapsed;
        let scattered = inputs.formation == Formation::Scattered;

        let rising = inputs.index_up && !self.was_index_up;
        self.was_index_up = inputs.index_up;
        let manual = *self.seen_manual_trigger.get_or_insert(inputs.showcase.trigger)
            != inputs.showcase.trigger;
        self.seen_manual_trigger = Some(inputs.showcase.trigger);

        if scattered && self.active.take().is_some() {
            debug!(yaw = self.yaw, "showcase cancelled");
        }

        if self.active.is_none() && !scattered {
            if manual {
                self.start(now, inputs.showcase.duration, "manual");
            } else if rising && inputs.showcase.enabled && self.cooled_down(now) {
                self.start(now, inputs.showcase.duration, "gesture");
            }
        }

        if let Some(envelope) = self.active {
            let (yaw, finished) = envelope.yaw_at(now);
            self.yaw = yaw;
            self.mode = RotationMode::Showcase;
            if finished {
                self.active = None;
                debug!(yaw, "showcase finished");
            }
        } else if scattered {
            self.mode = RotationMode::Drift;
            self.yaw += self.drift_speed * sample.delta;
        } else {
            self.mode = RotationMode::Still;
        }
        self.yaw
    }

    fn yaw(&self) -> f32 {
        self.yaw
    }

    fn mode(&self) -> RotationMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formation::ShowcaseState;

    const STEP: f32 = 1.0 / 60.0;

    fn inputs(formation: Formation, index_up: bool) -> FrameInputs {
        FrameInputs {
            formation,
            index_up,
            showcase: ShowcaseState {
                enabled: true,
                duration: Duration::from_millis(1500),
                trigger: 0,
            },
        }
    }

    struct Driver {
        frame: u64,
    }

    impl Driver {
        fn run(
            &mut self,
            strategy: &mut dyn RotationStrategy,
            inputs: &FrameInputs,
            frames: usize,
        ) -> f32 {
            for _ in 0..frames {
                self.frame += 1;
                let sample = FrameSample::new(self.frame as f32 * STEP, STEP, self.frame);
                strategy.update(inputs, sample);
            }
            strategy.yaw()
        }
    }

    #[test]
    fn hold_to_spin_accumulates_spin_speed_for_two_seconds() {
        let mut strategy = HoldToSpin::new(&RotationConfig::default());
        let mut driver = Driver { frame: 0 };
        let start = driver.run(&mut strategy, &inputs(Formation::Tree, false), 30);
        assert_eq!(strategy.mode(), RotationMode::Still);

        let spun = driver.run(&mut strategy, &inputs(Formation::Tree, true), 120);
        assert_eq!(strategy.mode(), RotationMode::Spin);
        assert!((spun - start - 1.2 * 2.0).abs() < 1e-3);

        let held = driver.run(&mut strategy, &inputs(Formation::Tree, false), 60);
        assert_eq!(held, spun);
    }

    #[test]
    fn scattered_drifts_regardless_of_index_up() {
        let mut strategy = HoldToSpin::new(&RotationConfig::default());
        let mut driver = Driver { frame: 0 };
        let yaw = driver.run(&mut strategy, &inputs(Formation::Scattered, true), 600);
        assert_eq!(strategy.mode(), RotationMode::Drift);
        assert!((yaw - 0.1 * 10.0).abs() < 1e-3);
    }

    #[test]
    fn ease_curve_hits_endpoints_and_midpoint() {
        let curve = EaseCurve::EaseInOutCubic;
        assert!(curve.sample(0.0).abs() < 1e-6);
        assert!((curve.sample(0.5) - 0.5).abs() < 1e-6);
        assert!((curve.sample(1.0) - 1.0).abs() < 1e-6);
        assert!(curve.sample(0.25) < EaseCurve::Linear.sample(0.25));
    }

    #[test]
    fn showcase_turn_completes_a_full_revolution() {
        let mut strategy = Showcase::new(&RotationConfig::default(), &ShowcaseSettings::default());
        let mut driver = Driver { frame: 0 };
        driver.run(&mut strategy, &inputs(Formation::Scattered, false), 60);
        let start = driver.run(&mut strategy, &inputs(Formation::Tree, false), 1);

        driver.run(&mut strategy, &inputs(Formation::Tree, true), 45);
        assert!(strategy.is_active());
        assert_eq!(strategy.mode(), RotationMode::Showcase);
        assert!(strategy.yaw() > start + 1.0);

        let end = driver.run(&mut strategy, &inputs(Formation::Tree, true), 60);
        assert!(!strategy.is_active());
        assert!((end - (start + TAU).rem_euclid(TAU)).abs() < 1e-4);
        assert_eq!(strategy.mode(), RotationMode::Still);
    }

    #[test]
    fn holding_index_up_triggers_only_once() {
        let mut strategy = Showcase::new(&RotationConfig::default(), &ShowcaseSettings::default());
        let mut driver = Driver { frame: 0 };
        driver.run(&mut strategy, &inputs(Formation::Tree, true), 200);
        assert!(!strategy.is_active());
        assert_eq!(strategy.mode(), RotationMode::Still);
    }

    #[test]
    fn scattering_cancels_showcase() {
        let mut strategy = Showcase::new(&RotationConfig::default(), &ShowcaseSettings::default());
        let mut driver = Driver { frame: 0 };
        driver.run(&mut strategy, &inputs(Formation::Tree, true), 20);
        assert!(strategy.is_active());

        driver.run(&mut strategy, &inputs(Formation::Scattered, true), 1);
        assert!(!strategy.is_active());
        assert_eq!(strategy.mode(), RotationMode::Drift);
    }

    #[test]
    fn manual_trigger_starts_turn_only_in_tree_form() {
        let mut strategy = Showcase::new(&RotationConfig::default(), &ShowcaseSettings::default());
        let mut driver = Driver { frame: 0 };

        let mut scattered = inputs(Formation::Scattered, false);
        driver.run(&mut strategy, &scattered, 1);
        scattered.showcase.trigger = 1;
        driver.run(&mut strategy, &scattered, 1);
        assert!(!strategy.is_active());

        let mut tree = inputs(Formation::Tree, false);
        tree.showcase.trigger = 1;
        driver.run(&mut strategy, &tree, 1);
        assert!(!strategy.is_active());
        tree.showcase.trigger = 2;
        driver.run(&mut strategy, &tree, 1);
        assert!(strategy.is_active());
    }

    #[test]
    fn cooldown_blocks_quick_retrigger() {
        let mut strategy = Showcase::new(
            &RotationConfig::default(),
            &ShowcaseSettings {
                cooldown: Duration::from_secs(5),
                ..ShowcaseSettings::default()
            },
        );
        let mut driver = Driver { frame: 0 };
        let mut raised = inputs(Formation::Tree, true);
        raised.showcase.duration = Duration::from_millis(200);

        driver.run(&mut strategy, &raised, 30);
        assert!(!strategy.is_active());
        driver.run(&mut strategy, &inputs(Formation::Tree, false), 1);
        driver.run(&mut strategy, &raised, 1);
        assert!(!strategy.is_active());
        assert_eq!(strategy.mode(), RotationMode::Still);
    }

    #[test]
    fn disabled_showcase_ignores_gesture() {
        let mut strategy = Showcase::new(&RotationConfig::default(), &ShowcaseSettings::default());
        let mut driver = Driver { frame: 0 };
        let mut raised = inputs(Formation::Tree, true);
        raised.showcase.enabled = false;
        driver.run(&mut strategy, &raised, 10);
        assert!(!strategy.is_active());
    }

    #[test]
    fn config_selects_strategy() {
        let mut rotation = RotationConfig::default();
        let showcase = ShowcaseSettings::default();
        let mut strategy = strategy_for_config(&rotation, &showcase);
        let sample = FrameSample::new(STEP, STEP, 0);
        strategy.update(&inputs(Formation::Tree, true), sample);
        assert_eq!(strategy.mode(), RotationMode::Spin);

        rotation.strategy = RotationStrategyKind::Showcase;
        let mut strategy = strategy_for_config(&rotation, &showcase);
        strategy.update(&inputs(Formation::Tree, true), sample);
        assert_eq!(strategy.mode(), RotationMode::Showcase);
    }
}
