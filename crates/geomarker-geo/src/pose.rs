use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};

/// Position and attitude of the observing platform at capture time.
///
/// Angles are in degrees. `height_above_ground` is in metres over the
/// flat ground plane the markers lie on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformPose {
    pub latitude: f64,
    pub longitude: f64,
    pub height_above_ground: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
}

impl PlatformPose {
    /// Camera looking straight down with the image top facing north.
    pub fn nadir(latitude: f64, longitude: f64, height_above_ground: f64) -> Self {
        Self {
            latitude,
            longitude,
            height_above_ground,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Nadir pose from an absolute altitude and the altitude of the ground
    /// (home) point, both above the same datum.
    pub fn from_absolute_altitude(
        latitude: f64,
        longitude: f64,
        altitude: f64,
        home_altitude: f64,
    ) -> Self {
        Self::nadir(latitude, longitude, altitude - home_altitude)
    }

    pub fn with_attitude(mut self, yaw: f64, pitch: f64, roll: f64) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self.roll = roll;
        self
    }

    /// Camera-to-world rotation, `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    ///
    /// The world frame is local East-South-Down. With zero attitude the
    /// camera axes coincide with it: image right is east, image down is
    /// south and the optical axis points down.
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(
            self.roll.to_radians(),
            self.pitch.to_radians(),
            self.yaw.to_radians(),
        )
    }
}
