use nalgebra::{Matrix3, Point2, Unit, Vector3};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum CameraError {
    #[error("horizontal field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f64),

    #[error("image dimensions must be non-zero (width={width}, height={height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Pinhole intrinsics derived from a horizontal field of view.
///
/// The camera frame is x right, y down, z forward along the optical axis.
/// No lens distortion is modeled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
    pub hfov_deg: f64,
}

impl CameraIntrinsics {
    /// Build intrinsics for an image of `width x height` pixels.
    ///
    /// The vertical field of view is approximated as `hfov * height / width`
    /// (linear in the angle, not in its tangent). The principal point is the
    /// image centre.
    pub fn from_fov(width: u32, height: u32, hfov_deg: f64) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::EmptyImage { width, height });
        }
        if !(hfov_deg > 0.0 && hfov_deg < 180.0) {
            return Err(CameraError::InvalidFov(hfov_deg));
        }
        let (w, h) = (width as f64, height as f64);
        let hfov = hfov_deg.to_radians();
        let vfov = hfov * (h / w);
        Ok(Self {
            fx: w / (2.0 * (hfov / 2.0).tan()),
            fy: h / (2.0 * (vfov / 2.0).tan()),
            cx: w / 2.0,
            cy: h / 2.0,
            width,
            height,
            hfov_deg,
        })
    }

    /// `true` if these intrinsics were built for the given size and FOV.
    pub fn matches(&self, width: u32, height: u32, hfov_deg: f64) -> bool {
        self.width == width && self.height == height && self.hfov_deg == hfov_deg
    }

    pub fn vfov_deg(&self) -> f64 {
        self.hfov_deg * (self.height as f64 / self.width as f64)
    }

    pub fn k_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Unit ray through `pixel`, i.e. `K^-1 [x, y, 1]^T` normalized.
    pub fn pixel_to_ray(&self, pixel: Point2<f64>) -> Unit<Vector3<f64>> {
        let dir = Vector3::new(
            (pixel.x - self.cx) / self.fx,
            (pixel.y - self.cy) / self.fy,
            1.0,
        );
        Unit::new_normalize(dir)
    }

    /// Pixel hit by a camera-frame direction; `None` for rays not in front
    /// of the camera.
    pub fn project_ray(&self, dir: &Vector3<f64>) -> Option<Point2<f64>> {
        if dir.z <= 0.0 {
            return None;
        }
        Some(Point2::new(
            self.fx * dir.x / dir.z + self.cx,
            self.fy * dir.y / dir.z + self.cy,
        ))
    }
}
