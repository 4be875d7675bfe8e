//! Progressive probabilistic Hough transform.
//!
//! Edge pixels are visited in a random (seeded) order. Each visit votes in
//! a `(theta, rho)` accumulator; once a bin reaches the vote threshold the
//! corresponding line is walked in both directions through the edge map,
//! tolerating gaps up to `max_line_gap`. Pixels consumed by an accepted
//! segment are removed from the edge map and their votes withdrawn, so each
//! edge pixel contributes to at most one segment.

use geomarker_core::{ConfigError, LineSegment};
use image::GrayImage;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

const SHIFT: u32 = 16;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Distance resolution of the accumulator in pixels.
    pub rho: f64,
    /// Angle resolution of the accumulator in degrees.
    pub theta_deg: f64,
    /// Minimum accumulator votes for a line.
    pub threshold: u32,
    /// Minimum extent (along x or y) of an emitted segment.
    pub min_line_length: u32,
    /// Largest run of missing edge pixels bridged inside a segment.
    pub max_line_gap: u32,
    /// Stop after this many segments.
    pub max_segments: usize,
    /// Seed for the pixel visiting order.
    pub seed: u64,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta_deg: 1.0,
            threshold: 50,
            min_line_length: 30,
            max_line_gap: 10,
            max_segments: 512,
            seed: 0x9e37_79b9,
        }
    }
}

impl HoughParams {
    /// Reject resolutions and thresholds the accumulator cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rho > 0.0) {
            return Err(ConfigError::invalid_parameter("hough.rho", "must be positive"));
        }
        if !(self.theta_deg > 0.0 && self.theta_deg <= 90.0) {
            return Err(ConfigError::invalid_parameter(
                "hough.theta_deg",
                "must be in (0, 90]",
            ));
        }
        if self.threshold == 0 {
            return Err(ConfigError::invalid_parameter(
                "hough.threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

struct Accumulator {
    votes: Vec<u32>,
    num_rho: usize,
    trig: Vec<(f64, f64)>,
}

impl Accumulator {
    fn new(width: u32, height: u32, params: &HoughParams) -> Self {
        let irho = 1.0 / params.rho;
        let theta = params.theta_deg.to_radians();
        let num_angle = (std::f64::consts::PI / theta).round().max(1.0) as usize;
        let num_rho = ((((width + height) * 2 + 1) as f64) / params.rho).round() as usize;
        let trig = (0..num_angle)
            .map(|n| {
                let a = n as f64 * theta;
                (a.cos() * irho, a.sin() * irho)
            })
            .collect();
        Self {
            votes: vec![0; num_angle * num_rho],
            num_rho,
            trig,
        }
    }

    fn rho_index(&self, n: usize, x: i32, y: i32) -> usize {
        let (c, s) = self.trig[n];
        let r = (x as f64 * c + y as f64 * s).round() as i64;
        (r + (self.num_rho as i64 - 1) / 2) as usize
    }

    /// Add one vote per angle for `(x, y)`; returns the best bin.
    fn vote(&mut self, x: i32, y: i32) -> (usize, u32) {
        let mut best = (0usize, 0u32);
        for n in 0..self.trig.len() {
            let idx = n * self.num_rho + self.rho_index(n, x, y);
            self.votes[idx] += 1;
            if self.votes[idx] > best.1 {
                best = (n, self.votes[idx]);
            }
        }
        best
    }

    fn unvote(&mut self, x: i32, y: i32) {
        for n in 0..self.trig.len() {
            let idx = n * self.num_rho + self.rho_index(n, x, y);
            self.votes[idx] = self.votes[idx].saturating_sub(1);
        }
    }
}

/// Fixed-point walker along a line direction.
#[derive(Clone, Copy)]
struct Walk {
    x_major: bool,
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
}

impl Walk {
    fn new(x: i32, y: i32, dir_x: f64, dir_y: f64) -> Self {
        let half = 1i64 << (SHIFT - 1);
        let scale = (1i64 << SHIFT) as f64;
        if dir_x.abs() > dir_y.abs() {
            Self {
                x_major: true,
                x0: x as i64,
                y0: ((y as i64) << SHIFT) + half,
                dx: if dir_x > 0.0 { 1 } else { -1 },
                dy: (dir_y * scale / dir_x.abs()).round() as i64,
            }
        } else {
            Self {
                x_major: false,
                x0: ((x as i64) << SHIFT) + half,
                y0: y as i64,
                dx: (dir_x * scale / dir_y.abs()).round() as i64,
                dy: if dir_y > 0.0 { 1 } else { -1 },
            }
        }
    }

    /// Pixel positions starting at the seed, stepping forward or backward.
    fn pixels(self, backward: bool) -> impl Iterator<Item = (i64, i64)> {
        let (dx, dy) = if backward {
            (-self.dx, -self.dy)
        } else {
            (self.dx, self.dy)
        };
        (0i64..).map(move |k| {
            let (x, y) = (self.x0 + k * dx, self.y0 + k * dy);
            if self.x_major {
                (x, y >> SHIFT)
            } else {
                (x >> SHIFT, y)
            }
        })
    }
}

/// Detect line segments in a binary edge map (non-zero = edge).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(edges, params), fields(width = edges.width(), height = edges.height()))
)]
pub fn hough_lines_p(edges: &GrayImage, params: &HoughParams) -> Vec<LineSegment> {
    let (width, height) = edges.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let (w, h) = (width as i64, height as i64);
    let mut mask: Vec<bool> = edges.pixels().map(|p| p[0] != 0).collect();
    let mut points: Vec<(i32, i32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] != 0)
        .map(|(x, y, _)| (x as i32, y as i32))
        .collect();

    let mut acc = Accumulator::new(width, height, params);
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut lines = Vec::new();
    let at = |x: i64, y: i64| (y * w + x) as usize;
    let inside = |x: i64, y: i64| x >= 0 && x < w && y >= 0 && y < h;

    while !points.is_empty() {
        let (px, py) = points.swap_remove(rng.gen_range(0..points.len()));
        if !mask[at(px as i64, py as i64)] {
            continue;
        }

        let (best_n, best_votes) = acc.vote(px, py);
        if best_votes < params.threshold {
            continue;
        }

        // Direction along the line is perpendicular to its normal.
        let (c, s) = acc.trig[best_n];
        let walk = Walk::new(px, py, -s, c);

        let mut ends = [(px as i64, py as i64); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let mut gap = 0u32;
            for (x, y) in walk.pixels(k == 1) {
                if !inside(x, y) {
                    break;
                }
                if mask[at(x, y)] {
                    gap = 0;
                    *end = (x, y);
                } else {
                    gap += 1;
                    if gap > params.max_line_gap {
                        break;
                    }
                }
            }
        }

        let min_len = params.min_line_length as i64;
        let good = (ends[1].0 - ends[0].0).abs() >= min_len
            || (ends[1].1 - ends[0].1).abs() >= min_len;

        for (k, end) in ends.iter().enumerate() {
            for (x, y) in walk.pixels(k == 1) {
                if !inside(x, y) {
                    break;
                }
                let idx = at(x, y);
                if mask[idx] {
                    if good {
                        acc.unvote(x as i32, y as i32);
                    }
                    mask[idx] = false;
                }
                if (x, y) == *end {
                    break;
                }
            }
        }

        if good {
            lines.push(LineSegment::new(
                ends[0].0 as i32,
                ends[0].1 as i32,
                ends[1].0 as i32,
                ends[1].1 as i32,
            ));
            if lines.len() >= params.max_segments {
                break;
            }
        }
    }
    lines
}
