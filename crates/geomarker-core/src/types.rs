use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Named color band a marker is painted in.
///
/// The closed set of supported bands; each band maps to one or more HSV
/// ranges in the segmenter configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBand {
    Red,
    Blue,
}

impl ColorBand {
    pub const ALL: [ColorBand; 2] = [ColorBand::Red, ColorBand::Blue];

    pub fn name(self) -> &'static str {
        match self {
            ColorBand::Red => "red",
            ColorBand::Blue => "blue",
        }
    }
}

impl fmt::Display for ColorBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorBand {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(ColorBand::Red),
            "blue" => Ok(ColorBand::Blue),
            _ => Err(ConfigError::UnsupportedColorBand(s.trim().to_string())),
        }
    }
}

/// Target polygon family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Triangle,
    Hexagon,
}

impl ShapeKind {
    /// Number of sides (and vertices) of the target polygon.
    pub fn vertex_count(self) -> usize {
        match self {
            ShapeKind::Triangle => 3,
            ShapeKind::Hexagon => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Triangle => "triangle",
            ShapeKind::Hexagon => "hexagon",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "triangle" => Ok(ShapeKind::Triangle),
            "hexagon" => Ok(ShapeKind::Hexagon),
            _ => Err(ConfigError::UnsupportedShape(s.trim().to_string())),
        }
    }
}

/// One accepted marker in a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub shape: ShapeKind,
    pub color: ColorBand,
    /// Integer pixel centroid `(x, y)`.
    pub pixel_centroid: (i32, i32),
}

impl Detection {
    pub fn new(shape: ShapeKind, color: ColorBand, pixel_centroid: (i32, i32)) -> Self {
        Self {
            shape,
            color,
            pixel_centroid,
        }
    }

    pub fn x(&self) -> i32 {
        self.pixel_centroid.0
    }

    pub fn y(&self) -> i32 {
        self.pixel_centroid.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_band_and_shape_names() {
        assert_eq!("Red".parse::<ColorBand>(), Ok(ColorBand::Red));
        assert_eq!(" blue ".parse::<ColorBand>(), Ok(ColorBand::Blue));
        assert_eq!("hexagon".parse::<ShapeKind>(), Ok(ShapeKind::Hexagon));
        assert_eq!(ShapeKind::Triangle.vertex_count(), 3);
    }

    #[test]
    fn rejects_unknown_band() {
        let err = "green".parse::<ColorBand>().unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedColorBand("green".to_string()));
        assert!(err.to_string().contains("unsupported color band"));
        assert!(matches!(
            "square".parse::<ShapeKind>(),
            Err(ConfigError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn detection_serializes_with_snake_case_tags() {
        let det = Detection::new(ShapeKind::Hexagon, ColorBand::Blue, (12, 34));
        let json = serde_json::to_string(&det).expect("serialize");
        assert_eq!(
            json,
            r#"{"shape":"hexagon","color":"blue","pixel_centroid":[12,34]}"#
        );
        let back: Detection = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, det);
    }
}
