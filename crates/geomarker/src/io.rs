//! JSON job configuration and run reports.

use std::fs;
use std::path::{Path, PathBuf};

use geomarker_core::ConfigError;
use geomarker_geo::PlatformPose;
use geomarker_shapes::ShapeDetectorParams;
use serde::{Deserialize, Serialize};

use crate::LocatedDetection;

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_hfov_deg() -> f64 {
    78.0
}

/// Pose of one frame as recorded by the capture side.
///
/// Height is either given directly or derived from an absolute altitude
/// minus the job's home altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub height_above_ground: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
}

impl PoseRecord {
    /// Platform pose for this record; `home_altitude` is needed only when
    /// the height is given as absolute altitude.
    pub fn to_pose(&self, home_altitude: Option<f64>) -> Result<PlatformPose, ConfigError> {
        let base = match (self.height_above_ground, self.altitude, home_altitude) {
            (Some(h), _, _) => PlatformPose::nadir(self.latitude, self.longitude, h),
            (None, Some(alt), Some(home)) => {
                PlatformPose::from_absolute_altitude(self.latitude, self.longitude, alt, home)
            }
            (None, Some(_), None) => {
                return Err(ConfigError::invalid_parameter(
                    "pose.altitude",
                    "absolute altitude needs `home_altitude` in the job config",
                ))
            }
            (None, None, _) => {
                return Err(ConfigError::invalid_parameter(
                    "pose",
                    "either `height_above_ground` or `altitude` is required",
                ))
            }
        };
        Ok(base.with_attitude(self.yaw, self.pitch, self.roll))
    }
}

/// One frame of a batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSpec {
    /// Image file; relative paths are relative to the job file.
    pub image_path: String,
    pub pose: PoseRecord,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl FrameSpec {
    /// Image location with a relative `image_path` joined onto `base_dir`.
    pub fn resolve_image_path(&self, base_dir: &Path) -> PathBuf {
        let path = Path::new(&self.image_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }
}

/// Batch job: frames with poses plus detector and camera settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocateConfig {
    pub frames: Vec<FrameSpec>,
    #[serde(default)]
    pub detector: ShapeDetectorParams,
    #[serde(default = "default_hfov_deg")]
    pub hfov_deg: f64,
    /// Altitude of the ground reference point, for poses given as absolute
    /// altitude.
    #[serde(default)]
    pub home_altitude: Option<f64>,
    #[serde(default)]
    pub output_path: Option<String>,
    /// JSON-lines file receiving one record per detection.
    #[serde(default)]
    pub records_path: Option<String>,
    /// Directory for annotated copies of the frames.
    #[serde(default)]
    pub overlay_dir: Option<String>,
}

impl LocateConfig {
    /// Load a job file from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the job as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Directory that relative frame paths of the job at `config_path`
    /// are resolved against.
    pub fn base_dir(config_path: &Path) -> &Path {
        config_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Report destination, `geomarker_report.json` unless configured.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("geomarker_report.json"))
    }

    /// Resolve every frame's pose up front so a bad entry fails the job
    /// before any image is read.
    pub fn resolve_poses(&self) -> Result<Vec<PlatformPose>, ConfigError> {
        self.frames
            .iter()
            .map(|f| f.pose.to_pose(self.home_altitude))
            .collect()
    }
}

/// Per-frame outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub image_path: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub pose: PlatformPose,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub detections: Vec<LocatedDetection>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FrameReport {
    /// Empty report for `frame`; fill it with `set_detections` or `set_error`.
    pub fn new(frame: &FrameSpec, pose: PlatformPose) -> Self {
        Self {
            image_path: frame.image_path.clone(),
            timestamp: frame.timestamp.clone(),
            pose,
            width: None,
            height: None,
            detections: Vec::new(),
            error: None,
        }
    }

    pub fn set_detections(&mut self, width: u32, height: u32, detections: Vec<LocatedDetection>) {
        self.width = Some(width);
        self.height = Some(height);
        self.detections = detections;
        self.error = None;
    }

    pub fn set_error(&mut self, err: impl ToString) {
        self.detections.clear();
        self.error = Some(err.to_string());
    }
}

/// Whole-run report written next to the job config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocateReport {
    pub config_path: String,
    pub hfov_deg: f64,
    pub frames: Vec<FrameReport>,
}

impl LocateReport {
    pub fn new(config_path: impl Into<String>, hfov_deg: f64) -> Self {
        Self {
            config_path: config_path.into(),
            hfov_deg,
            frames: Vec::new(),
        }
    }

    pub fn total_detections(&self) -> usize {
        self.frames.iter().map(|f| f.detections.len()).sum()
    }

    /// Load a report written by [`LocateReport::write_json`].
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomarker_shapes::Strategy;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: LocateConfig = serde_json::from_str(
            r#"{
                "frames": [
                    {"image_path": "a.png",
                     "pose": {"latitude": 41.0, "longitude": 29.0, "height_above_ground": 78.0}}
                ]
            }"#,
        )
        .expect("parse");
        assert_eq!(cfg.hfov_deg, 78.0);
        assert_eq!(cfg.detector.strategy, Strategy::Lines);
        assert_eq!(cfg.output_path(), PathBuf::from("geomarker_report.json"));
        let poses = cfg.resolve_poses().expect("valid poses");
        assert_eq!(poses[0], PlatformPose::nadir(41.0, 29.0, 78.0));
    }

    #[test]
    fn absolute_altitude_uses_home_altitude() {
        let record = PoseRecord {
            latitude: 41.0,
            longitude: 29.0,
            height_above_ground: None,
            altitude: Some(150.0),
            yaw: 15.0,
            pitch: 0.0,
            roll: 0.0,
        };
        let pose = record.to_pose(Some(72.0)).expect("valid");
        assert_eq!(pose.height_above_ground, 78.0);
        assert_eq!(pose.yaw, 15.0);
        assert!(record.to_pose(None).is_err());

        let empty = PoseRecord {
            altitude: None,
            ..record
        };
        assert!(matches!(
            empty.to_pose(Some(72.0)),
            Err(ConfigError::InvalidParameter { name: "pose", .. })
        ));
    }

    #[test]
    fn relative_image_paths_follow_the_job_file() {
        let frame = |path: &str| FrameSpec {
            image_path: path.to_string(),
            pose: PoseRecord {
                latitude: 0.0,
                longitude: 0.0,
                height_above_ground: Some(10.0),
                altitude: None,
                yaw: 0.0,
                pitch: 0.0,
                roll: 0.0,
            },
            timestamp: None,
        };
        let base = LocateConfig::base_dir(Path::new("jobs/day1/job.json"));
        assert_eq!(base, Path::new("jobs/day1"));
        assert_eq!(
            frame("img/a.png").resolve_image_path(base),
            PathBuf::from("jobs/day1/img/a.png")
        );

        let dir = tempfile::tempdir().expect("tempdir");
        let abs = dir.path().join("b.png");
        let abs_frame = frame(&abs.display().to_string());
        assert_eq!(abs_frame.resolve_image_path(base), abs);

        let bare = LocateConfig::base_dir(Path::new("job.json"));
        assert_eq!(frame("a.png").resolve_image_path(bare), PathBuf::from("a.png"));
    }

    #[test]
    fn report_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        let frame = FrameSpec {
            image_path: "a.png".to_string(),
            pose: PoseRecord {
                latitude: 1.0,
                longitude: 2.0,
                height_above_ground: Some(10.0),
                altitude: None,
                yaw: 0.0,
                pitch: 0.0,
                roll: 0.0,
            },
            timestamp: Some("2024-05-01T10:00:00Z".to_string()),
        };
        let mut report = LocateReport::new("job.json", 78.0);
        let mut fr = FrameReport::new(&frame, PlatformPose::nadir(1.0, 2.0, 10.0));
        fr.set_error("unreadable");
        report.frames.push(fr);
        report.write_json(&path).expect("write");
        let back = LocateReport::load_json(&path).expect("read");
        assert_eq!(back, report);
        assert_eq!(back.total_detections(), 0);
    }
}
