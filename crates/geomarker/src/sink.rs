//! Per-detection result records and where they go.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use geomarker_core::{ColorBand, ShapeKind};
use serde::{Deserialize, Serialize};

use crate::io::IoError;
use crate::LocatedDetection;

/// Current time as Unix seconds with millisecond precision, e.g.
/// `"1714557600.125"`.
pub fn processing_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    format!("{secs:.3}")
}

/// One row of the result log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Capture time when the frame carries one, processing time otherwise.
    pub timestamp: String,
    pub frame: String,
    pub shape: ShapeKind,
    pub color: ColorBand,
    pub pixel_x: i32,
    pub pixel_y: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl DetectionRecord {
    /// Build a record; without a capture `timestamp` the row is stamped with
    /// [`processing_timestamp`].
    pub fn from_located(frame: &str, timestamp: Option<&str>, located: &LocatedDetection) -> Self {
        let det = &located.detection;
        Self {
            timestamp: timestamp
                .map(str::to_string)
                .unwrap_or_else(processing_timestamp),
            frame: frame.to_string(),
            shape: det.shape,
            color: det.color,
            pixel_x: det.x(),
            pixel_y: det.y(),
            latitude: located.fix.map(|f| f.latitude),
            longitude: located.fix.map(|f| f.longitude),
        }
    }
}

/// Destination for detection records.
pub trait DetectionSink {
    fn write_record(&mut self, record: &DetectionRecord) -> Result<(), IoError>;

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    fn write_all(&mut self, records: &[DetectionRecord]) -> Result<(), IoError> {
        for r in records {
            self.write_record(r)?;
        }
        Ok(())
    }
}

impl DetectionSink for Vec<DetectionRecord> {
    fn write_record(&mut self, record: &DetectionRecord) -> Result<(), IoError> {
        self.push(record.clone());
        Ok(())
    }
}

/// Appends one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: BufWriter<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: BufWriter::new(writer),
        }
    }
}

impl JsonLinesSink<File> {
    /// Open `path` for appending, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> DetectionSink for JsonLinesSink<W> {
    fn write_record(&mut self, record: &DetectionRecord) -> Result<(), IoError> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.out.flush()?;
        Ok(())
    }
}
