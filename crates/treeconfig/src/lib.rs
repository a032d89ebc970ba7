use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level `evergreen.toml` document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvergreenConfig {
    pub version: u32,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub showcase: ShowcaseSettings,
    #[serde(default)]
    pub gesture: GestureConfig,
}

impl Default for EvergreenConfig {
    fn default() -> Self {
        Self {
            version: 1,
            layout: LayoutConfig::default(),
            animation: AnimationConfig::default(),
            rotation: RotationConfig::default(),
            showcase: ShowcaseSettings::default(),
            gesture: GestureConfig::default(),
        }
    }
}

/// Fixed per-category object counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryCounts {
    pub foliage: usize,
    pub baubles: usize,
    pub garland: usize,
    pub gifts: usize,
    pub lights: usize,
    pub star_ornaments: usize,
}

impl CategoryCounts {
    pub fn total(&self) -> usize {
        self.foliage + self.baubles + self.garland + self.gifts + self.lights + self.star_ornaments
    }
}

impl Default for CategoryCounts {
    fn default() -> Self {
        Self {
            foliage: 3000,
            baubles: 120,
            garland: 350,
            gifts: 45,
            lights: 400,
            star_ornaments: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub counts: CategoryCounts,
    pub tree_height: f32,
    pub base_radius: f32,
    pub scatter_radius: f32,
    /// Number of stacked branch tiers modelled by the radial wobble.
    pub tiers: u32,
    pub wobble_amplitude: f32,
    pub garland_turns: f32,
    pub light_turns: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            counts: CategoryCounts::default(),
            tree_height: 16.0,
            base_radius: 7.0,
            scatter_radius: 35.0,
            tiers: 10,
            wobble_amplitude: 1.5,
            garland_turns: 6.0,
            light_turns: 9.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    /// `factor = delta * rate`, clamped to 1. Frame-rate dependent.
    Linear,
    /// `factor = 1 - exp(-rate * delta)`.
    Exponential,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::Linear
    }
}

impl Smoothing {
    pub fn factor(self, rate: f32, delta: f32) -> f32 {
        let delta = delta.max(0.0);
        match self {
            Smoothing::Linear => (delta * rate).clamp(0.0, 1.0),
            Smoothing::Exponential => 1.0 - (-rate * delta).exp(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub smoothing: Smoothing,
    pub scatter_lerp_rate: f32,
    pub tree_lerp_rate: f32,
    pub scale_lerp_rate: f32,
    pub gift_settle_rate: f32,
    pub scatter_noise: f32,
    pub tree_noise: f32,
    pub wander_radius: f32,
    pub wander_speed: f32,
    /// Fixed pitch (radians) subtracted from a right angle for foliage lean.
    pub foliage_tilt: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            smoothing: Smoothing::default(),
            scatter_lerp_rate: 1.5,
            tree_lerp_rate: 3.0,
            scale_lerp_rate: 5.0,
            gift_settle_rate: 2.0,
            scatter_noise: 0.5,
            tree_noise: 0.05,
            wander_radius: 1.5,
            wander_speed: 0.2,
            foliage_tilt: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategyKind {
    /// Continuous spin while the index finger is held up.
    Hold,
    /// One eased turn per index-up trigger.
    Showcase,
}

impl Default for RotationStrategyKind {
    fn default() -> Self {
        Self::Hold
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RotationConfig {
    pub strategy: RotationStrategyKind,
    /// Yaw rate (rad/s) while scattered.
    pub drift_speed: f32,
    /// Yaw rate (rad/s) while spinning in tree form.
    pub spin_speed: f32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            strategy: RotationStrategyKind::default(),
            drift_speed: 0.1,
            spin_speed: 1.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShowcaseSettings {
    pub enabled: bool,
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub duration: Duration,
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub cooldown: Duration,
}

impl Default for ShowcaseSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: Duration::from_secs_f32(1.5),
            cooldown: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Frames at or below this score are ignored entirely.
    pub min_score: f32,
    /// A label commits once its consecutive count exceeds this value.
    pub debounce_frames: u32,
    pub camera_width: u32,
    pub camera_height: u32,
    pub camera_fps: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_score: 0.5,
            debounce_frames: 5,
            camera_width: 320,
            camera_height: 240,
            camera_fps: 30.0,
        }
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*duration))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl EvergreenConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: EvergreenConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Renders the configuration in the format [`Self::from_toml_str`] reads.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let layout = &self.layout;
        for (name, value) in [
            ("tree_height", layout.tree_height),
            ("base_radius", layout.base_radius),
            ("scatter_radius", layout.scatter_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "layout.{name} must be greater than zero"
                )));
            }
        }
        if layout.tiers == 0 {
            return Err(ConfigError::Invalid("layout.tiers must be at least 1".into()));
        }
        if layout.wobble_amplitude < 0.0 {
            return Err(ConfigError::Invalid(
                "layout.wobble_amplitude must be non-negative".into(),
            ));
        }

        let animation = &self.animation;
        for (name, value) in [
            ("scatter_lerp_rate", animation.scatter_lerp_rate),
            ("tree_lerp_rate", animation.tree_lerp_rate),
            ("scale_lerp_rate", animation.scale_lerp_rate),
            ("gift_settle_rate", animation.gift_settle_rate),
            ("scatter_noise", animation.scatter_noise),
            ("tree_noise", animation.tree_noise),
            ("wander_radius", animation.wander_radius),
            ("wander_speed", animation.wander_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "animation.{name} must be >= 0"
                )));
            }
        }

        if self.rotation.drift_speed < 0.0 || self.rotation.spin_speed < 0.0 {
            return Err(ConfigError::Invalid(
                "rotation speeds must be >= 0".into(),
            ));
        }

        if self.showcase.duration.is_zero() {
            return Err(ConfigError::Invalid(
                "showcase.duration must be greater than zero".into(),
            ));
        }

        let gesture = &self.gesture;
        if !(0.0..1.0).contains(&gesture.min_score) {
            return Err(ConfigError::Invalid(
                "gesture.min_score must be within [0, 1)".into(),
            ));
        }
        if !gesture.camera_fps.is_finite() || gesture.camera_fps <= 0.0 {
            return Err(ConfigError::Invalid(
                "gesture.camera_fps must be greater than zero".into(),
            ));
        }
        if gesture.camera_width == 0 || gesture.camera_height == 0 {
            return Err(ConfigError::Invalid(
                "gesture camera dimensions must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
