/*
Nightglow - Night Pond Scene
*/
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "nightglow.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f32 },
    #[error("{min_field} ({min}) must not exceed {max_field} ({max})")]
    InvertedRange {
        min_field: &'static str,
        max_field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("base_size {base} must lie within min_size {min}..=max_size {max}")]
    BaseSizeOutOfRange { base: f32, min: f32, max: f32 },
    #[error("portal target scene name is empty")]
    EmptySceneName,
}

/// Tunables for the Firefly Companion Swarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub seed: u64,
    pub count: usize,
    pub spawn_area_min: Vec2,
    pub spawn_area_max: Vec2,

    // Behavior
    pub follow_distance: f32,
    pub normal_speed: f32,
    pub follow_speed: f32,
    pub acceleration: f32,
    pub float_height: f32,
    pub prediction_time: f32,
    pub arrival_radius: f32,
    /// Seconds Between Roaming Target Picks, Drawn From min..max
    pub wander_interval_min: f32,
    pub wander_interval_max: f32,

    // Orbit
    pub orbit_radius: f32,
    /// Radians per Second
    pub orbit_speed: f32,
    pub orbit_jitter: f32,
    pub direction_change_interval: f32,
    pub smooth_time_min: f32,
    pub smooth_time_max: f32,
    pub max_smooth_speed: f32,

    // Visuals
    pub min_intensity: f32,
    pub max_intensity: f32,
    pub orbit_intensity_boost: f32,
    pub base_size: f32,
    pub orbit_size_multiplier: f32,
    pub size_lerp_speed: f32,
    pub pulse_frequency: f32,
    pub pulse_amount: f32,
    pub min_size: f32,
    pub max_size: f32,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            count: 15,
            spawn_area_min: Vec2::new(-10.0, -10.0),
            spawn_area_max: Vec2::new(10.0, 10.0),

            follow_distance: 3.0,
            normal_speed: 2.0,
            follow_speed: 5.0,
            acceleration: 3.0,
            float_height: 0.5,
            prediction_time: 0.3,
            arrival_radius: 0.2,
            wander_interval_min: 2.0,
            wander_interval_max: 5.0,

            orbit_radius: 1.2,
            orbit_speed: 1.5,
            orbit_jitter: 0.15,
            direction_change_interval: 1.5,
            smooth_time_min: 0.08,
            smooth_time_max: 0.4,
            max_smooth_speed: 12.0,

            min_intensity: 0.4,
            max_intensity: 1.0,
            orbit_intensity_boost: 1.5,
            base_size: 0.25,
            orbit_size_multiplier: 1.6,
            size_lerp_speed: 3.0,
            pulse_frequency: 2.0,
            pulse_amount: 0.15,
            min_size: 0.1,
            max_size: 1.0,
        }
    }
}

impl SwarmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("spawn_area_min.x", self.spawn_area_min.x),
            ("spawn_area_min.y", self.spawn_area_min.y),
            ("spawn_area_max.x", self.spawn_area_max.x),
            ("spawn_area_max.y", self.spawn_area_max.y),
            ("float_height", self.float_height),
            ("orbit_speed", self.orbit_speed),
            ("pulse_frequency", self.pulse_frequency),
            ("orbit_intensity_boost", self.orbit_intensity_boost),
        ] {
            finite(field, value)?;
        }

        positive("follow_distance", self.follow_distance)?;
        positive("smooth_time_min", self.smooth_time_min)?;
        positive("max_smooth_speed", self.max_smooth_speed)?;
        positive("min_size", self.min_size)?;
        positive("direction_change_interval", self.direction_change_interval)?;

        for (field, value) in [
            ("normal_speed", self.normal_speed),
            ("follow_speed", self.follow_speed),
            ("acceleration", self.acceleration),
            ("prediction_time", self.prediction_time),
            ("arrival_radius", self.arrival_radius),
            ("wander_interval_min", self.wander_interval_min),
            ("orbit_radius", self.orbit_radius),
            ("orbit_jitter", self.orbit_jitter),
            ("min_intensity", self.min_intensity),
            ("orbit_size_multiplier", self.orbit_size_multiplier),
            ("size_lerp_speed", self.size_lerp_speed),
            ("pulse_amount", self.pulse_amount),
        ] {
            non_negative(field, value)?;
        }

        ordered("spawn_area_min.x", "spawn_area_max.x", self.spawn_area_min.x, self.spawn_area_max.x)?;
        ordered("spawn_area_min.y", "spawn_area_max.y", self.spawn_area_min.y, self.spawn_area_max.y)?;
        let extent = self.spawn_area_max - self.spawn_area_min;
        finite("spawn_area width", extent.x)?;
        finite("spawn_area height", extent.y)?;
        ordered("wander_interval_min", "wander_interval_max", self.wander_interval_min, self.wander_interval_max)?;
        ordered("smooth_time_min", "smooth_time_max", self.smooth_time_min, self.smooth_time_max)?;
        ordered("min_intensity", "max_intensity", self.min_intensity, self.max_intensity)?;
        ordered("min_size", "max_size", self.min_size, self.max_size)?;

        finite("base_size", self.base_size)?;
        if !(self.min_size..=self.max_size).contains(&self.base_size) {
            return Err(ConfigError::BaseSizeOutOfRange {
                base: self.base_size,
                min: self.min_size,
                max: self.max_size,
            });
        }
        Ok(())
    }

    pub fn spawn_rect(&self) -> Rect {
        Rect::from_corners(self.spawn_area_min, self.spawn_area_max)
    }
}

/// Smoothed Camera Follow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub smooth_time: f32,
    pub offset: Vec2,
    pub max_speed: f32,
    /// Seconds of Target Velocity Added to the Aim Point
    pub prediction: f32,
    /// Prediction Only Kicks In Above This Target Speed
    pub prediction_min_speed: f32,
    pub use_bounds: bool,
    pub bounds_min: Vec2,
    pub bounds_max: Vec2,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            smooth_time: 0.1,
            offset: Vec2::ZERO,
            max_speed: 5.0,
            prediction: 0.1,
            prediction_min_speed: 0.1,
            use_bounds: true,
            bounds_min: Vec2::new(-12.0, -12.0),
            bounds_max: Vec2::new(12.0, 12.0),
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("camera.max_speed", self.max_speed)?;
        non_negative("camera.smooth_time", self.smooth_time)?;
        non_negative("camera.prediction", self.prediction)?;
        ordered("camera.bounds_min.x", "camera.bounds_max.x", self.bounds_min.x, self.bounds_max.x)?;
        ordered("camera.bounds_min.y", "camera.bounds_max.y", self.bounds_min.y, self.bounds_max.y)?;
        Ok(())
    }
}

/// Portal Fade to Black
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    pub target_scene: String,
    pub portal_position: Vec2,
    pub trigger_distance: f32,
    pub fade_duration: f32,
    /// Fade the Music Together With the Screen
    pub fade_audio: bool,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            target_scene: "dawn".into(),
            portal_position: Vec2::new(8.0, 8.0),
            trigger_distance: 1.0,
            fade_duration: 1.0,
            fade_audio: true,
        }
    }
}

impl FadeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("fade.trigger_distance", self.trigger_distance)?;
        non_negative("fade.fade_duration", self.fade_duration)?;
        if self.target_scene.trim().is_empty() {
            return Err(ConfigError::EmptySceneName);
        }
        Ok(())
    }
}

/// Background Music per Scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Asset Paths Indexed by Scene Number
    pub tracks: Vec<String>,
    pub fade_duration: f32,
    pub target_volume: f32,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            tracks: vec![
                "sounds/music/night_pond.ogg".into(),
                "sounds/music/dawn.ogg".into(),
            ],
            fade_duration: 1.5,
            target_volume: 0.8,
        }
    }
}

impl MusicConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("music.fade_duration", self.fade_duration)?;
        non_negative("music.target_volume", self.target_volume)?;
        Ok(())
    }
}

/// Ripple Push on the Boat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoatConfig {
    pub start_position: Vec2,
    pub push_force: f32,
    pub push_duration: f32,
    pub max_push_distance: f32,
    /// Degrees
    pub max_tilt_angle: f32,
    pub tilt_smoothness: f32,
    /// 0..1
    pub rotation_inertia: f32,
    /// Degrees
    pub natural_sway: f32,
    pub bounce_force_multiplier: f32,
    pub min_bounce_velocity: f32,
    /// Per-Tick Bounce Velocity Retention
    pub bounce_decay: f32,
    pub enable_bounce: bool,
    /// Pond Edges the Boat Bounces Off
    pub pond_min: Vec2,
    pub pond_max: Vec2,
}

impl Default for BoatConfig {
    fn default() -> Self {
        Self {
            start_position: Vec2::ZERO,
            push_force: 18.5,
            push_duration: 8.0,
            max_push_distance: 20.0,
            max_tilt_angle: 25.0,
            tilt_smoothness: 2.0,
            rotation_inertia: 0.8,
            natural_sway: 2.0,
            bounce_force_multiplier: 0.8,
            min_bounce_velocity: 2.0,
            bounce_decay: 0.95,
            enable_bounce: true,
            pond_min: Vec2::new(-12.0, -12.0),
            pond_max: Vec2::new(12.0, 12.0),
        }
    }
}

impl BoatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("boat.push_duration", self.push_duration)?;
        positive("boat.max_push_distance", self.max_push_distance)?;
        positive("boat.tilt_smoothness", self.tilt_smoothness)?;
        non_negative("boat.push_force", self.push_force)?;
        non_negative("boat.max_tilt_angle", self.max_tilt_angle)?;
        non_negative("boat.rotation_inertia", self.rotation_inertia)?;
        non_negative("boat.min_bounce_velocity", self.min_bounce_velocity)?;
        non_negative("boat.bounce_decay", self.bounce_decay)?;
        ordered("boat.pond_min.x", "boat.pond_max.x", self.pond_min.x, self.pond_max.x)?;
        ordered("boat.pond_min.y", "boat.pond_max.y", self.pond_min.y, self.pond_max.y)?;
        Ok(())
    }
}

/// Click Ripple Visuals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleConfig {
    pub duration: f32,
    pub max_radius: f32,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self { duration: 2.0, max_radius: 1.5 }
    }
}

/// Screen Caption Shown Once When the Scene Starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub text: String,
    /// Dismissal Distance is Measured From Here
    pub origin: Vec2,
    pub font_size: f32,
    /// Pixels Above the Bottom Edge
    pub bottom_offset: f32,
    pub fade_in: f32,
    pub display_duration: f32,
    pub fade_out: f32,
    pub destroy_distance: f32,
    pub destroy_on_leave: bool,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            text: "Click the water to send ripples toward the boat".into(),
            origin: Vec2::ZERO,
            font_size: 32.0,
            bottom_offset: 150.0,
            fade_in: 1.0,
            display_duration: 3.0,
            fade_out: 1.0,
            destroy_distance: 8.0,
            destroy_on_leave: true,
        }
    }
}

/// Sign That Fades Fully In While the Boat is Within Range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximitySignConfig {
    pub text: String,
    pub position: Vec2,
    pub trigger_distance: f32,
    /// Hidden Past This Distance From the Camera
    pub max_view_distance: f32,
    pub fade_duration: f32,
}

impl Default for ProximitySignConfig {
    fn default() -> Self {
        Self {
            text: "The fireflies follow the light of the boat".into(),
            position: Vec2::new(-4.0, 3.0),
            trigger_distance: 3.0,
            max_view_distance: 12.0,
            fade_duration: 1.0,
        }
    }
}

/// Sign Whose Opacity Grows as the Boat Gets Closer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSignConfig {
    pub text: String,
    pub position: Vec2,
    pub trigger_distance: f32,
    pub fade_duration: f32,
}

impl Default for WorldSignConfig {
    fn default() -> Self {
        Self {
            text: "Dawn waits past the pale light".into(),
            position: Vec2::new(6.0, 6.0),
            trigger_distance: 3.0,
            fade_duration: 1.0,
        }
    }
}

/// Floating Text in the Scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// `None` Skips the Opening Caption
    pub caption: Option<CaptionConfig>,
    pub proximity_signs: Vec<ProximitySignConfig>,
    pub world_signs: Vec<WorldSignConfig>,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            caption: Some(CaptionConfig::default()),
            proximity_signs: vec![ProximitySignConfig::default()],
            world_signs: vec![WorldSignConfig::default()],
        }
    }
}

impl SubtitleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(caption) = &self.caption {
            positive("caption.font_size", caption.font_size)?;
            non_negative("caption.bottom_offset", caption.bottom_offset)?;
            non_negative("caption.fade_in", caption.fade_in)?;
            non_negative("caption.display_duration", caption.display_duration)?;
            non_negative("caption.fade_out", caption.fade_out)?;
            non_negative("caption.destroy_distance", caption.destroy_distance)?;
            finite("caption.origin.x", caption.origin.x)?;
            finite("caption.origin.y", caption.origin.y)?;
        }
        for sign in &self.proximity_signs {
            non_negative("proximity_sign.trigger_distance", sign.trigger_distance)?;
            non_negative("proximity_sign.max_view_distance", sign.max_view_distance)?;
            non_negative("proximity_sign.fade_duration", sign.fade_duration)?;
            finite("proximity_sign.position.x", sign.position.x)?;
            finite("proximity_sign.position.y", sign.position.y)?;
        }
        for sign in &self.world_signs {
            // Opacity Divides by the Trigger Distance
            positive("world_sign.trigger_distance", sign.trigger_distance)?;
            non_negative("world_sign.fade_duration", sign.fade_duration)?;
            finite("world_sign.position.x", sign.position.x)?;
            finite("world_sign.position.y", sign.position.y)?;
        }
        Ok(())
    }
}

/// Everything Tunable in the Scene, Loaded Once at Startup
#[derive(Resource, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NightConfig {
    pub swarm: SwarmConfig,
    pub camera: CameraConfig,
    pub fade: FadeConfig,
    pub music: MusicConfig,
    pub boat: BoatConfig,
    pub ripple: RippleConfig,
    pub subtitles: SubtitleConfig,
}

impl NightConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.swarm.validate()?;
        self.camera.validate()?;
        self.fade.validate()?;
        self.music.validate()?;
        self.boat.validate()?;
        non_negative("ripple.duration", self.ripple.duration)?;
        non_negative("ripple.max_radius", self.ripple.max_radius)?;
        self.subtitles.validate()?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        #[cfg(debug_assertions)]
        {
            // Debug Builds: Read From Project Directory
            let mut p = std::env::current_dir().ok()?;
            p.push(CONFIG_FILE_NAME);
            Some(p)
        }
        #[cfg(not(debug_assertions))]
        {
            // Release Builds: Read From Config Directory
            dirs::config_dir().map(|mut p| {
                p.push("Nightglow");
                p.push(CONFIG_FILE_NAME);
                p
            })
        }
    }

    /// Parse RON (or JSON for `.json` Paths) Without Validating
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(contents).map_err(|e| e.to_string())
        } else {
            ron::from_str(contents).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Read + Validate; a Missing File Yields Defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(path, &contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Startup Entry Point: Any Failure is Logged and Replaced by Defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            warn!("No config directory available, using default settings");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => {
                info!("Loaded night config from {}", path.display());
                config
            }
            Err(err) => {
                warn!("{err}; falling back to default settings");
                Self::default()
            }
        }
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, Default::default())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn ordered(
    min_field: &'static str,
    max_field: &'static str,
    min: f32,
    max: f32,
) -> Result<(), ConfigError> {
    finite(min_field, min)?;
    finite(max_field, max)?;
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange { min_field, max_field, min, max })
    }
}
