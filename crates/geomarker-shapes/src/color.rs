//! HSV color segmentation.

use geomarker_core::{ColorBand, ConfigError};
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Inclusive HSV box with 8-bit OpenCV scaling: H in `[0, 180]`, S and V in
/// `[0, 255]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// HSV ranges for each supported band. A band matches if any of its ranges
/// matches; red needs two because its hue wraps around 0/180.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRanges {
    pub red: Vec<HsvRange>,
    pub blue: Vec<HsvRange>,
}

impl Default for ColorRanges {
    fn default() -> Self {
        Self {
            red: vec![
                HsvRange::new([0, 120, 70], [10, 255, 255]),
                HsvRange::new([170, 120, 70], [180, 255, 255]),
            ],
            blue: vec![HsvRange::new([100, 150, 50], [140, 255, 255])],
        }
    }
}

impl ColorRanges {
    pub fn for_band(&self, band: ColorBand) -> &[HsvRange] {
        match band {
            ColorBand::Red => &self.red,
            ColorBand::Blue => &self.blue,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for band in ColorBand::ALL {
            let ranges = self.for_band(band);
            if ranges.is_empty() {
                return Err(ConfigError::invalid_parameter(
                    "color.ranges",
                    format!("no HSV range configured for {band}"),
                ));
            }
            if ranges
                .iter()
                .any(|r| (0..3).any(|c| r.lower[c] > r.upper[c]))
            {
                return Err(ConfigError::invalid_parameter(
                    "color.ranges",
                    format!("{band} range has lower bound above upper bound"),
                ));
            }
        }
        Ok(())
    }
}

/// Segmentation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorParams {
    pub ranges: ColorRanges,
    /// Side of the square structuring element used by open/close. Odd; 1
    /// disables morphology.
    pub kernel_size: u32,
}

impl Default for ColorParams {
    fn default() -> Self {
        Self {
            ranges: ColorRanges::default(),
            kernel_size: 5,
        }
    }
}

impl ColorParams {
    /// The morphology kernel must be odd and at most 511 pixels wide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 || self.kernel_size > 511 {
            return Err(ConfigError::invalid_parameter(
                "color.kernel_size",
                format!("expected an odd size in 1..=511, got {}", self.kernel_size),
            ));
        }
        self.ranges.validate()
    }
}

/// Convert one RGB pixel to 8-bit HSV (H halved into `[0, 180]`).
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };
    let h = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [(h / 2.0).round() as u8, s.round() as u8, max as u8]
}

/// Binary mask (`0`/`255`) of pixels inside a band's HSV ranges, cleaned by
/// a morphological open followed by a close.
#[derive(Clone, Debug)]
pub struct ColorSegmenter {
    params: ColorParams,
}

impl ColorSegmenter {
    pub fn new(params: ColorParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ColorParams {
        &self.params
    }

    /// Raw in-range mask without morphology.
    pub fn threshold(&self, frame: &RgbImage, band: ColorBand) -> GrayImage {
        let ranges = self.params.ranges.for_band(band);
        GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let hsv = rgb_to_hsv(frame.get_pixel(x, y).0);
            if ranges.iter().any(|r| r.contains(hsv)) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn segment(&self, frame: &RgbImage, band: ColorBand) -> GrayImage {
        let mask = self.threshold(frame, band);
        // An LInf ball of radius k is a (2k+1)x(2k+1) square.
        let radius = (self.params.kernel_size / 2) as u8;
        if radius == 0 {
            return mask;
        }
        let opened = imageproc::morphology::open(&mask, Norm::LInf, radius);
        imageproc::morphology::close(&opened, Norm::LInf, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn hsv_matches_opencv_scaling() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        // Magenta-ish red just below 360 degrees lands near the top of the range.
        assert_eq!(rgb_to_hsv([255, 0, 20])[0], 178);
    }

    #[test]
    fn red_uses_union_of_wrapped_ranges() {
        let ranges = ColorRanges::default();
        let red = ranges.for_band(ColorBand::Red);
        assert!(red.iter().any(|r| r.contains(rgb_to_hsv([230, 20, 20]))));
        assert!(red.iter().any(|r| r.contains(rgb_to_hsv([230, 20, 60]))));
        assert!(!red.iter().any(|r| r.contains(rgb_to_hsv([20, 40, 220]))));
        let blue = ranges.for_band(ColorBand::Blue);
        assert!(blue.iter().any(|r| r.contains(rgb_to_hsv([20, 40, 220]))));
    }

    #[test]
    fn open_removes_speckle_and_keeps_blob() {
        let mut frame = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));
        for y in 20..40 {
            for x in 20..40 {
                frame.put_pixel(x, y, Rgb([230, 20, 20]));
            }
        }
        frame.put_pixel(5, 5, Rgb([230, 20, 20]));

        let seg = ColorSegmenter::new(ColorParams::default()).expect("valid params");
        let mask = seg.segment(&frame, ColorBand::Red);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
        assert_eq!(mask.get_pixel(30, 30)[0], 255);
        assert_eq!(mask.get_pixel(20, 20)[0], 255);
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));

        let blue = seg.segment(&frame, ColorBand::Blue);
        assert!(blue.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn rejects_even_kernel() {
        let params = ColorParams {
            kernel_size: 4,
            ..ColorParams::default()
        };
        assert!(ColorSegmenter::new(params).is_err());
    }
}
