use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::box_color::{BoxColor, ColorParseError};

pub const SCALE_FACTOR_RANGE: RangeInclusive<f64> = 1.1..=2.0;
pub const MIN_NEIGHBORS_RANGE: RangeInclusive<u32> = 1..=10;

pub const DEFAULT_SCALE_FACTOR: f64 = 1.3;
pub const DEFAULT_MIN_NEIGHBORS: u32 = 5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("scale factor must be between 1.1 and 2.0, got {0}")]
    ScaleFactorOutOfRange(f64),
    #[error("min neighbors must be between 1 and 10, got {0}")]
    MinNeighborsOutOfRange(u32),
    #[error(transparent)]
    Color(#[from] ColorParseError),
}

/// Detector parameters and rectangle colour for one session.
///
/// Written by user-facing controls, read by the annotator on every tick.
/// Setters reject out-of-range values and leave the stored value as it was.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    scale_factor: f64,
    min_neighbors: u32,
    box_color: BoxColor,
}

impl Default for DetectionConfig {
    /// scaleFactor 1.3, minNeighbors 5, colour `#00FF00`.
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            box_color: BoxColor::GREEN,
        }
    }
}

impl DetectionConfig {
    pub fn new(
        scale_factor: f64,
        min_neighbors: u32,
        box_color: BoxColor,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.set_scale_factor(scale_factor)?;
        config.set_min_neighbors(min_neighbors)?;
        config.set_box_color(box_color);
        Ok(config)
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn set_scale_factor(&mut self, value: f64) -> Result<(), ConfigError> {
        if !SCALE_FACTOR_RANGE.contains(&value) {
            return Err(ConfigError::ScaleFactorOutOfRange(value));
        }
        self.scale_factor = value;
        Ok(())
    }

    pub fn min_neighbors(&self) -> u32 {
        self.min_neighbors
    }

    pub fn set_min_neighbors(&mut self, value: u32) -> Result<(), ConfigError> {
        if !MIN_NEIGHBORS_RANGE.contains(&value) {
            return Err(ConfigError::MinNeighborsOutOfRange(value));
        }
        self.min_neighbors = value;
        Ok(())
    }

    pub fn box_color(&self) -> BoxColor {
        self.box_color
    }

    pub fn set_box_color(&mut self, color: BoxColor) {
        self.box_color = color;
    }

    /// Accepts `#RRGGBB` as produced by a colour picker.
    pub fn set_box_color_hex(&mut self, hex: &str) -> Result<(), ConfigError> {
        self.box_color = BoxColor::from_hex(hex)?;
        Ok(())
    }

    /// Colour in the annotator's channel order.
    pub fn box_color_bgr(&self) -> [u8; 3] {
        self.box_color.bgr()
    }

    /// Brings values loaded from disk back into range.
    pub fn clamped(mut self) -> Self {
        self.scale_factor = if self.scale_factor.is_finite() {
            self.scale_factor
                .clamp(*SCALE_FACTOR_RANGE.start(), *SCALE_FACTOR_RANGE.end())
        } else {
            DEFAULT_SCALE_FACTOR
        };
        self.min_neighbors = self
            .min_neighbors
            .clamp(*MIN_NEIGHBORS_RANGE.start(), *MIN_NEIGHBORS_RANGE.end());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::default();
        assert_relative_eq!(config.scale_factor(), 1.3);
        assert_eq!(config.min_neighbors(), 5);
        assert_eq!(config.box_color().to_hex(), "#00FF00");
    }

    #[rstest]
    #[case(1.1)]
    #[case(1.5)]
    #[case(2.0)]
    fn test_set_scale_factor_accepts_range(#[case] value: f64) {
        let mut config = DetectionConfig::default();
        config.set_scale_factor(value).unwrap();
        assert_relative_eq!(config.scale_factor(), value);
    }

    #[rstest]
    #[case(1.0)]
    #[case(2.01)]
    #[case(f64::NAN)]
    fn test_set_scale_factor_rejects_and_keeps_value(#[case] value: f64) {
        let mut config = DetectionConfig::default();
        assert!(matches!(
            config.set_scale_factor(value),
            Err(ConfigError::ScaleFactorOutOfRange(_))
        ));
        assert_relative_eq!(config.scale_factor(), DEFAULT_SCALE_FACTOR);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(10, true)]
    #[case(11, false)]
    fn test_set_min_neighbors_bounds(#[case] value: u32, #[case] ok: bool) {
        let mut config = DetectionConfig::default();
        assert_eq!(config.set_min_neighbors(value).is_ok(), ok);
        let expected = if ok { value } else { DEFAULT_MIN_NEIGHBORS };
        assert_eq!(config.min_neighbors(), expected);
    }

    #[test]
    fn test_set_box_color_hex_converts_to_bgr() {
        let mut config = DetectionConfig::default();
        config.set_box_color_hex("#FF8000").unwrap();
        assert_eq!(config.box_color_bgr(), [0x00, 0x80, 0xFF]);
    }

    #[test]
    fn test_set_box_color_hex_rejects_and_keeps_value() {
        let mut config = DetectionConfig::default();
        assert!(matches!(
            config.set_box_color_hex("blue"),
            Err(ConfigError::Color(_))
        ));
        assert_eq!(config.box_color(), BoxColor::GREEN);
    }

    #[test]
    fn test_new_validates_all_fields() {
        assert!(DetectionConfig::new(1.3, 5, BoxColor::GREEN).is_ok());
        assert!(DetectionConfig::new(3.0, 5, BoxColor::GREEN).is_err());
        assert!(DetectionConfig::new(1.3, 0, BoxColor::GREEN).is_err());
    }

    #[test]
    fn test_clamped_repairs_loaded_values() {
        let json = r##"{"scale_factor": 9.0, "min_neighbors": 0, "box_color": "#0000FF"}"##;
        let config: DetectionConfig = serde_json::from_str(json).unwrap();
        let config = config.clamped();
        assert_relative_eq!(config.scale_factor(), 2.0);
        assert_eq!(config.min_neighbors(), 1);
        assert_eq!(config.box_color_bgr(), [0xFF, 0, 0]);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: DetectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DetectionConfig::default());
    }
}
