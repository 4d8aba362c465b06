//! Typed configuration for the bit matrix.
//!
//! Configurations are read from RON or JSON files. Required fields have no serde default, so
//! a file missing one of them fails to load. Every loader runs [`BitMatrixConfig::validate`],
//! which clamps out-of-range probabilities and opacities and rejects values the matrix cannot
//! work with.

use std::path::{Path, PathBuf};

use bevy::{
    color::{Color, Srgba},
    math::Vec2,
    prelude::Resource,
};
use serde::{Deserialize, Serialize};

use crate::bit::Bit;

pub const DEFAULT_FPS: f64 = 30.0;
/// above this the fixed timestep gets too small to schedule
pub const MAX_FPS: f64 = 1000.0;
pub const DEFAULT_TEXT_COLOR: &str = "#00ff41";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#000000";
pub const DEFAULT_FONT_WEIGHT: &str = "normal";

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitMatrixConfig {
    /// frames per second of the animation loop
    #[serde(default = "default_fps")]
    pub fps: f64,
    pub text: TextOptions,
    pub padding: Padding,
    pub fade: FadeOptions,
    pub bit_value: BitValueOptions,
    /// hex color the surface is cleared to
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// seed for the matrix RNG, random when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOptions {
    /// font asset path, the built-in font is used when absent
    #[serde(default)]
    pub font_family: Option<String>,
    pub font_size_px: f32,
    #[serde(default = "default_font_weight")]
    pub font_weight: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
}

/// Extra space between neighbouring bits, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub horizontal: f32,
    pub vertical: f32,
}

/// Shape and triggering of a bit's fade animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeOptions {
    pub min_bit_opacity: f32,
    pub max_bit_opacity: f32,
    /// opacity change per frame while fading
    pub bit_fade_delta: f32,
    /// ceiling of the per-frame chance that an idle bit at min opacity starts fading in
    pub fade_in_prob: f32,
    pub fade_in_prob_increment: f32,
    /// ceiling of the per-frame chance that an idle bit at max opacity starts fading out
    pub fade_out_prob: f32,
    pub fade_out_prob_increment: f32,
}

/// Initial value and value switching of bits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BitValueOptions {
    pub initial_zero_prob: f32,
    pub switch_to_zero_prob: f32,
    pub switch_to_one_prob: f32,
    #[serde(default)]
    pub only_switch_on_min_opacity: bool,
    #[serde(default)]
    pub only_switch_on_max_opacity: bool,
    #[serde(default)]
    pub only_switch_once_at_min_opacity: bool,
    #[serde(default)]
    pub only_switch_once_at_max_opacity: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format {0:?}, expected .ron or .json")]
    UnsupportedFormat(PathBuf),
    #[error("min_bit_opacity ({min}) is greater than max_bit_opacity ({max})")]
    InvalidOpacityRange { min: f32, max: f32 },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("fps must be at most {MAX_FPS}, got {0}")]
    FpsTooHigh(f64),
    #[error("padding must not be negative, got {0:?}")]
    NegativePadding(Padding),
    #[error("invalid color {value:?} for {field}")]
    InvalidColor { field: &'static str, value: String },
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}
fn default_font_weight() -> String {
    DEFAULT_FONT_WEIGHT.to_string()
}
fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}
fn default_background_color() -> String {
    DEFAULT_BACKGROUND_COLOR.to_string()
}

impl BitMatrixConfig {
    /// Loads a config file, choosing the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::from_ron_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()
    }

    /// Clamps probabilities and opacities into range and rejects unusable values.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        positive("fps", self.fps)?;
        if self.fps > MAX_FPS {
            return Err(ConfigError::FpsTooHigh(self.fps));
        }
        positive("font_size_px", self.text.font_size_px as f64)?;
        positive("bit_fade_delta", self.fade.bit_fade_delta as f64)?;
        if !(self.padding.horizontal >= 0.0 && self.padding.vertical >= 0.0) {
            return Err(ConfigError::NegativePadding(self.padding));
        }

        let fade = &mut self.fade;
        fade.min_bit_opacity = unit(fade.min_bit_opacity);
        fade.max_bit_opacity = unit(fade.max_bit_opacity);
        if fade.min_bit_opacity > fade.max_bit_opacity {
            return Err(ConfigError::InvalidOpacityRange {
                min: fade.min_bit_opacity,
                max: fade.max_bit_opacity,
            });
        }
        fade.fade_in_prob = unit(fade.fade_in_prob);
        fade.fade_out_prob = unit(fade.fade_out_prob);
        fade.fade_in_prob_increment = non_negative(fade.fade_in_prob_increment);
        fade.fade_out_prob_increment = non_negative(fade.fade_out_prob_increment);

        let bit_value = &mut self.bit_value;
        bit_value.initial_zero_prob = unit(bit_value.initial_zero_prob);
        bit_value.switch_to_zero_prob = unit(bit_value.switch_to_zero_prob);
        bit_value.switch_to_one_prob = unit(bit_value.switch_to_one_prob);

        parse_color("text_color", &self.text.text_color)?;
        parse_color("background_color", &self.background_color)?;

        Ok(self)
    }

    /// Distance between the origins of neighbouring bits.
    pub fn spacing(&self) -> Vec2 {
        Vec2::new(
            self.text.font_size_px + self.padding.horizontal,
            self.text.font_size_px + self.padding.vertical,
        )
    }

    /// Offset of the first bit from the top-left corner of the surface.
    pub fn margin(&self) -> Vec2 {
        self.spacing() * 0.5
    }

    pub fn text_color(&self) -> Color {
        // validated on load
        parse_color("text_color", &self.text.text_color)
            .unwrap_or(Color::srgb(0.0, 1.0, 0.25))
    }

    pub fn background_color(&self) -> Color {
        parse_color("background_color", &self.background_color).unwrap_or(Color::BLACK)
    }
}

impl Default for BitMatrixConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            text: TextOptions::default(),
            padding: Padding {
                horizontal: 6.0,
                vertical: 6.0,
            },
            fade: FadeOptions::default(),
            bit_value: BitValueOptions::default(),
            background_color: default_background_color(),
            seed: None,
        }
    }
}

impl TextOptions {
    /// Human readable font description, e.g. `normal 14px FiraMono`.
    pub fn describe(&self) -> String {
        format!(
            "{} {}px {}",
            self.font_weight,
            self.font_size_px,
            self.font_family.as_deref().unwrap_or("FiraMono")
        )
    }
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size_px: 14.0,
            font_weight: default_font_weight(),
            text_color: default_text_color(),
        }
    }
}

impl Default for FadeOptions {
    fn default() -> Self {
        Self {
            min_bit_opacity: 0.05,
            max_bit_opacity: 0.9,
            bit_fade_delta: 0.02,
            fade_in_prob: 0.002,
            fade_in_prob_increment: 0.00001,
            fade_out_prob: 0.02,
            fade_out_prob_increment: 0.0001,
        }
    }
}

impl BitValueOptions {
    /// Whether the eligibility gates let `bit` change its value this frame.
    pub fn allows_switch(&self, bit: &Bit) -> bool {
        let at_min = bit.is_at_min_opacity();
        let at_max = bit.is_at_max_opacity();

        !(self.only_switch_on_min_opacity && !at_min)
            && !(self.only_switch_on_max_opacity && !at_max)
            && !(self.only_switch_once_at_min_opacity && (!at_min || bit.switched()))
            && !(self.only_switch_once_at_max_opacity && (!at_max || bit.switched()))
    }
}

impl Default for BitValueOptions {
    fn default() -> Self {
        Self {
            initial_zero_prob: 0.5,
            switch_to_zero_prob: 0.002,
            switch_to_one_prob: 0.002,
            only_switch_on_min_opacity: false,
            only_switch_on_max_opacity: false,
            only_switch_once_at_min_opacity: false,
            only_switch_once_at_max_opacity: false,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

fn parse_color(field: &'static str, value: &str) -> Result<Color, ConfigError> {
    Srgba::hex(value)
        .map(Color::from)
        .map_err(|_| ConfigError::InvalidColor {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bit::{BitValue, FadeState};

    const FULL_RON: &str = r##"(
        fps: 24.0,
        text: (
            font_size_px: 10.0,
            font_weight: "bold",
            text_color: "#22ee88",
        ),
        padding: (horizontal: 2.0, vertical: 4.0),
        fade: (
            min_bit_opacity: 0.0,
            max_bit_opacity: 1.0,
            bit_fade_delta: 0.1,
            fade_in_prob: 0.5,
            fade_in_prob_increment: 0.01,
            fade_out_prob: 0.25,
            fade_out_prob_increment: 0.01,
        ),
        bit_value: (
            initial_zero_prob: 0.5,
            switch_to_zero_prob: 0.1,
            switch_to_one_prob: 0.2,
            only_switch_once_at_min_opacity: true,
        ),
        seed: Some(7),
    )"##;

    #[test]
    fn ron_config_loads_with_defaults() {
        let config = BitMatrixConfig::from_ron_str(FULL_RON).unwrap();
        assert_eq!(24.0, config.fps);
        assert_eq!(None, config.text.font_family);
        assert_eq!("bold", config.text.font_weight);
        assert_eq!(DEFAULT_BACKGROUND_COLOR, config.background_color);
        assert_eq!(Some(7), config.seed);
        assert!(config.bit_value.only_switch_once_at_min_opacity);
        assert!(!config.bit_value.only_switch_on_min_opacity);
        assert!(!config.bit_value.only_switch_on_max_opacity);
        assert!(!config.bit_value.only_switch_once_at_max_opacity);

        assert_eq!(Vec2::new(12.0, 14.0), config.spacing());
        assert_eq!(Vec2::new(6.0, 7.0), config.margin());
        assert_eq!("bold 10px FiraMono", config.text.describe());
    }

    #[test]
    fn json_config_loads() {
        let json = r##"{
            "text": { "font_size_px": 12.0, "font_family": "fonts/mono.ttf" },
            "padding": { "horizontal": 0.0, "vertical": 0.0 },
            "fade": {
                "min_bit_opacity": 0.1, "max_bit_opacity": 0.8, "bit_fade_delta": 0.05,
                "fade_in_prob": 0.1, "fade_in_prob_increment": 0.001,
                "fade_out_prob": 0.1, "fade_out_prob_increment": 0.001
            },
            "bit_value": { "initial_zero_prob": 1.0, "switch_to_zero_prob": 0.0, "switch_to_one_prob": 0.0 }
        }"##;
        let config = BitMatrixConfig::from_json_str(json).unwrap();
        assert_eq!(DEFAULT_FPS, config.fps);
        assert_eq!(Some("fonts/mono.ttf"), config.text.font_family.as_deref());
        assert_eq!(Vec2::splat(12.0), config.spacing());
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let without_fade_delta = FULL_RON.replace("bit_fade_delta: 0.1,", "");
        let err = BitMatrixConfig::from_ron_str(&without_fade_delta).unwrap_err();
        assert!(matches!(err, ConfigError::Ron(_)), "{err}");
        assert!(err.to_string().contains("bit_fade_delta"), "{err}");

        let err = BitMatrixConfig::from_json_str(r#"{ "fps": 30.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)), "{err}");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut config = BitMatrixConfig::default();
        config.fade.min_bit_opacity = -0.5;
        config.fade.max_bit_opacity = 1.5;
        config.fade.fade_in_prob = 2.0;
        config.fade.fade_out_prob_increment = -1.0;
        config.bit_value.switch_to_one_prob = f32::NAN;

        let config = config.validate().unwrap();
        assert_eq!(0.0, config.fade.min_bit_opacity);
        assert_eq!(1.0, config.fade.max_bit_opacity);
        assert_eq!(1.0, config.fade.fade_in_prob);
        assert_eq!(0.0, config.fade.fade_out_prob_increment);
        assert_eq!(0.0, config.bit_value.switch_to_one_prob);
    }

    #[test]
    fn unusable_values_are_rejected() {
        let mut config = BitMatrixConfig::default();
        config.fade.min_bit_opacity = 0.8;
        config.fade.max_bit_opacity = 0.2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOpacityRange { .. })
        ));

        let mut config = BitMatrixConfig::default();
        config.fade.bit_fade_delta = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "bit_fade_delta",
                ..
            })
        ));

        let mut config = BitMatrixConfig::default();
        config.padding.vertical = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativePadding(_))
        ));

        let mut config = BitMatrixConfig::default();
        config.text.text_color = "not a color".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidColor {
                field: "text_color",
                ..
            })
        ));
    }

    #[test]
    fn fps_must_fit_a_fixed_timestep() {
        let mut config = BitMatrixConfig::default();
        config.fps = 1e10;
        assert!(matches!(config.validate(), Err(ConfigError::FpsTooHigh(_))));

        let mut config = BitMatrixConfig::default();
        config.fps = MAX_FPS;
        let config = config.validate().unwrap();
        assert!(!std::time::Duration::from_secs_f64(1.0 / config.fps).is_zero());

        let err = BitMatrixConfig::from_ron_str(&FULL_RON.replace("fps: 24.0", "fps: 1e10"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FpsTooHigh(_)), "{err}");
    }

    fn bit_in(state: FadeState, switched: bool) -> Bit {
        let fade = FadeOptions {
            min_bit_opacity: 0.0,
            max_bit_opacity: 1.0,
            bit_fade_delta: if state == FadeState::FadingIn { 0.25 } else { 1.0 },
            ..Default::default()
        };
        let mut bit = Bit::new(BitValue::Zero, Vec2::ZERO, &fade);
        if state != FadeState::IdleMin {
            bit.trigger_animation();
            bit.advance_fade();
        }
        if switched {
            bit.switch_value();
        }
        assert_eq!(state, bit.state());
        assert_eq!(switched, bit.switched());
        bit
    }

    #[test]
    fn switch_gates() {
        let bits = [
            bit_in(FadeState::IdleMin, false),
            bit_in(FadeState::IdleMin, true),
            bit_in(FadeState::IdleMax, false),
            bit_in(FadeState::IdleMax, true),
            bit_in(FadeState::FadingIn, false),
            bit_in(FadeState::FadingIn, true),
        ];

        // gates: (on_min, on_max, once_at_min, once_at_max)
        let cases = [
            ((false, false, false, false), [true, true, true, true, true, true]),
            ((true, false, false, false), [true, true, false, false, false, false]),
            ((false, true, false, false), [false, false, true, true, false, false]),
            ((false, false, true, false), [true, false, false, false, false, false]),
            ((false, false, false, true), [false, false, true, false, false, false]),
            ((true, false, true, false), [true, false, false, false, false, false]),
            ((false, true, false, true), [false, false, true, false, false, false]),
            ((true, true, false, false), [false; 6]),
            ((false, false, true, true), [false; 6]),
        ];

        for ((on_min, on_max, once_min, once_max), expected) in cases {
            let options = BitValueOptions {
                only_switch_on_min_opacity: on_min,
                only_switch_on_max_opacity: on_max,
                only_switch_once_at_min_opacity: once_min,
                only_switch_once_at_max_opacity: once_max,
                ..Default::default()
            };
            for (i, (bit, allowed)) in bits.iter().zip(expected).enumerate() {
                assert_eq!(
                    allowed,
                    options.allows_switch(bit),
                    "gates {:?}, bit {i}",
                    (on_min, on_max, once_min, once_max)
                );
            }
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = BitMatrixConfig::load("Cargo.toml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)), "{err}");

        let err = BitMatrixConfig::load("does/not/exist.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "{err}");
    }

    #[test]
    fn shipped_configs_are_valid() {
        let config = BitMatrixConfig::load("assets/bitmatrix.ron").unwrap();
        assert_eq!(Vec2::splat(20.0), config.spacing());
        assert!(config.bit_value.only_switch_once_at_min_opacity);

        let config = BitMatrixConfig::load("assets/bitmatrix.json").unwrap();
        assert_eq!(Vec2::new(28.0, 22.0), config.spacing());
        assert!(config.bit_value.only_switch_on_min_opacity);
    }
}
