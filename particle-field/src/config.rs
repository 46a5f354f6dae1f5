// config.rs - Background particle configuration
//
// Field names follow the JS object shape ({ amountOfParticles, motionAmplitude,
// speed: { min, max }, ... }) so a page can hand its config over as JSON.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::sim::rand;

/// Id of the element the field measures to scatter the initial particles.
pub const MOUNT_ID: &str = "landing";

/// Where sprites live relative to the page base URL.
pub const ASSET_DIR: &str = "assets/images";

/// Closed interval `[min, max]` sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Map `t` in `[0, 1)` onto the range.
    #[inline]
    pub fn at(&self, t: f64) -> f64 {
        t * (self.max - self.min) + self.min
    }

    #[inline]
    pub fn sample(&self, rng: &mut u32) -> f64 {
        self.at(rand(rng))
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    fn check(&self, name: &'static str) -> Result<(), FieldError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(FieldError::InvalidRange { name, min: self.min, max: self.max })
        }
    }
}

/// Motion and appearance parameters of the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub amount_of_particles: usize,
    /// Sway amplitude in pixels.
    pub motion_amplitude: f64,
    /// Sway cycles per sprite-height of vertical travel.
    pub motion_period: f64,
    /// Upward pixels per frame, fixed per particle until it recycles.
    pub speed: Range,
    pub scale: Range,
    pub opacity: Range,
}

impl FieldConfig {
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.amount_of_particles == 0 {
            return Err(FieldError::NoParticles);
        }
        if !self.motion_amplitude.is_finite() || self.motion_amplitude < 0.0 {
            return Err(FieldError::InvalidAmplitude(self.motion_amplitude));
        }
        if !self.motion_period.is_finite() || self.motion_period <= 0.0 {
            return Err(FieldError::InvalidPeriod(self.motion_period));
        }
        self.speed.check("speed")?;
        self.scale.check("scale")?;
        self.opacity.check("opacity")
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            amount_of_particles: 30,
            motion_amplitude: 150.0,
            motion_period: 0.05,
            speed: Range::new(0.5, 2.0),
            scale: Range::new(0.5, 1.0),
            opacity: Range::new(0.8, 0.9),
        }
    }
}

/// Sprite names plus field parameters, as the page configures them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundConfig {
    pub source: Vec<String>,
    #[serde(flatten)]
    pub field: FieldConfig,
}

impl BackgroundConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, FieldError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        if self.source.is_empty() {
            return Err(FieldError::NoSources);
        }
        self.field.validate()
    }

    /// Resolve every sprite name against `base`.
    pub fn asset_urls(&self, base: &str) -> Vec<String> {
        self.source.iter().map(|name| asset_url(base, name)).collect()
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        let source = [
            "small-balloons-1.png",
            "small-balloons-2.png",
            "air-balloon.png",
            "star1.png",
            "star2.png",
            "star3.png",
            "star4.png",
        ];
        Self {
            source: source.iter().map(|s| s.to_string()).collect(),
            field: FieldConfig::default(),
        }
    }
}

/// `{base}/assets/images/{name}`, without doubling a trailing slash on `base`.
pub fn asset_url(base: &str, name: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), ASSET_DIR, name)
}
