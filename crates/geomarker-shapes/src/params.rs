use std::fmt;
use std::str::FromStr;

use geomarker_core::{ColorBand, ConfigError, ShapeKind};
use serde::{Deserialize, Serialize};

use crate::color::ColorParams;
use crate::contour::ContourValidatorParams;
use crate::edges::{ContourExtractionParams, LineExtractionParams};
use crate::validate::LineValidatorParams;

/// Which front end turns a mask into polygon candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Canny + probabilistic Hough + combinatorial line validation.
    Lines,
    /// External contours + Douglas-Peucker + contour validation.
    Contours,
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lines" => Ok(Strategy::Lines),
            "contours" => Ok(Strategy::Contours),
            other => Err(ConfigError::invalid_parameter(
                "strategy",
                format!("expected `lines` or `contours`, got `{other}`"),
            )),
        }
    }
}

/// One marker to look for: a shape painted in a color band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSpec {
    pub shape: ShapeKind,
    pub color: ColorBand,
}

impl TargetSpec {
    pub const fn new(shape: ShapeKind, color: ColorBand) -> Self {
        Self { shape, color }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.color, self.shape)
    }
}

/// Parses `color:shape`, e.g. `red:triangle`.
impl FromStr for TargetSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (color, shape) = s.split_once(':').ok_or_else(|| {
            ConfigError::invalid_parameter("target", format!("expected `color:shape`, got `{s}`"))
        })?;
        Ok(Self {
            color: color.parse()?,
            shape: shape.parse()?,
        })
    }
}

/// Per-shape validator settings for both strategies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeParams {
    pub lines: LineValidatorParams,
    pub contours: ContourValidatorParams,
}

impl ShapeParams {
    /// Defaults tuned for `shape`.
    pub fn for_shape(shape: ShapeKind) -> Self {
        Self {
            lines: LineValidatorParams::for_shape(shape),
            contours: ContourValidatorParams::for_shape(shape),
        }
    }

    fn validate(&self, shape: ShapeKind) -> Result<(), ConfigError> {
        let l = &self.lines;
        if !(l.tolerance > 0.0 && l.tolerance <= 1.0) {
            return Err(ConfigError::invalid_parameter(
                "lines.tolerance",
                format!("{shape}: must be in (0, 1], got {}", l.tolerance),
            ));
        }
        if !(l.endpoint_proximity_px > 0.0) || l.min_side_px < 0.0 {
            return Err(ConfigError::invalid_parameter(
                "lines.endpoint_proximity_px",
                format!("{shape}: proximity must be positive and min side non-negative"),
            ));
        }
        if l.max_lines < shape.vertex_count() {
            return Err(ConfigError::invalid_parameter(
                "lines.max_lines",
                format!("{shape}: need at least {} lines", shape.vertex_count()),
            ));
        }
        let c = &self.contours;
        if !(c.epsilon_factor > 0.0) {
            return Err(ConfigError::invalid_parameter(
                "contours.epsilon_factor",
                format!("{shape}: must be positive"),
            ));
        }
        if !(c.max_aspect >= 1.0) {
            return Err(ConfigError::invalid_parameter(
                "contours.max_aspect",
                format!("{shape}: must be at least 1"),
            ));
        }
        Ok(())
    }
}

fn default_triangle() -> ShapeParams {
    ShapeParams::for_shape(ShapeKind::Triangle)
}

fn default_hexagon() -> ShapeParams {
    ShapeParams::for_shape(ShapeKind::Hexagon)
}

fn default_targets() -> Vec<TargetSpec> {
    vec![
        TargetSpec::new(ShapeKind::Triangle, ColorBand::Red),
        TargetSpec::new(ShapeKind::Hexagon, ColorBand::Blue),
    ]
}

fn default_strategy() -> Strategy {
    Strategy::Lines
}

fn default_merge_radius() -> Option<f64> {
    Some(10.0)
}

/// Full detector configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeDetectorParams {
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetSpec>,
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
    #[serde(default)]
    pub color: ColorParams,
    #[serde(default)]
    pub line_extraction: LineExtractionParams,
    #[serde(default)]
    pub contour_extraction: ContourExtractionParams,
    #[serde(default = "default_triangle")]
    pub triangle: ShapeParams,
    #[serde(default = "default_hexagon")]
    pub hexagon: ShapeParams,
    /// Merge same-kind detections whose centroids are closer than this.
    #[serde(default = "default_merge_radius")]
    pub merge_radius_px: Option<f64>,
}

impl Default for ShapeDetectorParams {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            strategy: default_strategy(),
            color: ColorParams::default(),
            line_extraction: LineExtractionParams::default(),
            contour_extraction: ContourExtractionParams::default(),
            triangle: default_triangle(),
            hexagon: default_hexagon(),
            merge_radius_px: default_merge_radius(),
        }
    }
}

impl ShapeDetectorParams {
    /// Validator settings used for `shape`.
    pub fn shape_params(&self, shape: ShapeKind) -> &ShapeParams {
        match shape {
            ShapeKind::Triangle => &self.triangle,
            ShapeKind::Hexagon => &self.hexagon,
        }
    }

    /// Same parameters with another front end.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Check every nested parameter block; called by `ShapeDetector::new`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.color.validate()?;
        self.line_extraction.canny.validate()?;
        self.line_extraction.hough.validate()?;
        self.contour_extraction.canny.validate()?;
        self.triangle.validate(ShapeKind::Triangle)?;
        self.hexagon.validate(ShapeKind::Hexagon)?;
        if let Some(r) = self.merge_radius_px {
            if !(r >= 0.0) {
                return Err(ConfigError::invalid_parameter(
                    "merge_radius_px",
                    "must be non-negative",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_target_specs() {
        assert_eq!(
            "red:triangle".parse::<TargetSpec>(),
            Ok(TargetSpec::new(ShapeKind::Triangle, ColorBand::Red))
        );
        assert_eq!(
            "green:triangle".parse::<TargetSpec>(),
            Err(ConfigError::UnsupportedColorBand("green".to_string()))
        );
        assert!(matches!(
            "blue:circle".parse::<TargetSpec>(),
            Err(ConfigError::UnsupportedShape(_))
        ));
        assert!("blue".parse::<TargetSpec>().is_err());
        assert_eq!(
            TargetSpec::new(ShapeKind::Hexagon, ColorBand::Blue).to_string(),
            "blue:hexagon"
        );
    }

    #[test]
    fn empty_json_yields_defaults() {
        let params: ShapeDetectorParams = serde_json::from_str("{}").expect("parse");
        assert_eq!(params, ShapeDetectorParams::default());
        assert!(params.validate().is_ok());
        assert_eq!(params.triangle.lines.tolerance, 0.4);
        assert_eq!(params.hexagon.contours.min_area, 150.0);
    }

    #[test]
    fn unknown_band_in_json_is_rejected() {
        let err = serde_json::from_str::<ShapeDetectorParams>(
            r#"{"targets": [{"shape": "triangle", "color": "green"}]}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut params = ShapeDetectorParams::default();
        params.hexagon.lines.tolerance = 0.0;
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter { name: "lines.tolerance", .. })
        ));
        assert!("hough".parse::<Strategy>().is_err());
        assert_eq!("Contours".parse::<Strategy>(), Ok(Strategy::Contours));
    }
}
