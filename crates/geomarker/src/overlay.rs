//! Annotated frame copies for visual inspection.

use geomarker_core::ColorBand;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_circle_mut};

use crate::LocatedDetection;

const MARKER_RADIUS: i32 = 10;

fn marker_color(band: ColorBand, located: bool) -> Rgb<u8> {
    match (band, located) {
        (_, false) => Rgb([255, 255, 255]),
        (ColorBand::Red, true) => Rgb([0, 255, 0]),
        (ColorBand::Blue, true) => Rgb([255, 255, 0]),
    }
}

/// Draw a circle and a cross at every detection centroid.
///
/// Geolocated detections get a band-specific color, the rest are white.
pub fn draw_detections(frame: &mut RgbImage, detections: &[LocatedDetection]) {
    for d in detections {
        let (x, y) = d.detection.pixel_centroid;
        let color = marker_color(d.detection.color, d.fix.is_some());
        draw_hollow_circle_mut(frame, (x, y), MARKER_RADIUS, color);
        draw_hollow_circle_mut(frame, (x, y), MARKER_RADIUS + 1, color);
        draw_cross_mut(frame, color, x, y);
    }
}

/// Annotated copy of `frame`.
pub fn render_overlay(frame: &RgbImage, detections: &[LocatedDetection]) -> RgbImage {
    let mut out = frame.clone();
    draw_detections(&mut out, detections);
    out
}
