use assert_cmd::Command;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use predicates::prelude::*;

fn write_triangle_png(path: &std::path::Path) {
    let mut frame = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
    draw_polygon_mut(
        &mut frame,
        &[Point::new(160, 40), Point::new(230, 161), Point::new(90, 161)],
        Rgb([230, 20, 20]),
    );
    frame.save(path).expect("save png");
}

#[test]
fn default_params_are_written_as_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("params.json");
    Command::cargo_bin("geomarker")
        .expect("binary")
        .args(["default-params", "--out"])
        .arg(&out)
        .assert()
        .success();
    let raw = std::fs::read_to_string(&out).expect("read");
    let params: geomarker::ShapeDetectorParams = serde_json::from_str(&raw).expect("parse");
    let defaults = geomarker::ShapeDetectorParams::default();
    assert_eq!(params.targets, defaults.targets);
    assert_eq!(params.strategy, defaults.strategy);
}

#[test]
fn detect_prints_located_triangle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let img = dir.path().join("frame.png");
    write_triangle_png(&img);
    Command::cargo_bin("geomarker")
        .expect("binary")
        .arg("detect")
        .arg("--image")
        .arg(&img)
        .args(["--lat", "41.0082", "--lon", "28.9784", "--height", "78"])
        .args(["--strategy", "contours", "--target", "red:triangle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"triangle\""))
        .stdout(predicate::str::contains("\"latitude\""));
}

#[test]
fn unknown_color_band_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let img = dir.path().join("frame.png");
    write_triangle_png(&img);
    Command::cargo_bin("geomarker")
        .expect("binary")
        .arg("detect")
        .arg("--image")
        .arg(&img)
        .args(["--lat", "0", "--lon", "0", "--height", "10"])
        .args(["--target", "green:triangle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported color band"));
}

#[test]
fn run_writes_report_and_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let elsewhere = tempfile::tempdir().expect("tempdir");
    write_triangle_png(&dir.path().join("frame.png"));
    let report = dir.path().join("report.json");
    let records = dir.path().join("records.jsonl");
    // Frame paths are relative to the job file, not to the working directory.
    let job = serde_json::json!({
        "frames": [
            {"image_path": "frame.png",
             "pose": {"latitude": 41.0, "longitude": 29.0, "height_above_ground": 60.0}},
            {"image_path": "missing.png",
             "pose": {"latitude": 41.0, "longitude": 29.0, "height_above_ground": 60.0}}
        ],
        "detector": {"strategy": "contours"},
        "output_path": report.display().to_string(),
        "records_path": records.display().to_string()
    });
    let job_path = dir.path().join("job.json");
    std::fs::write(&job_path, job.to_string()).expect("write job");

    Command::cargo_bin("geomarker")
        .expect("binary")
        .current_dir(elsewhere.path())
        .arg("run")
        .arg("--config")
        .arg(&job_path)
        .assert()
        .success();

    let report = geomarker::io::LocateReport::load_json(&report).expect("report");
    assert_eq!(report.frames.len(), 2);
    assert!(report.frames[0].error.is_none(), "{:?}", report.frames[0]);
    assert_eq!(report.frames[0].detections.len(), 1);
    assert!(report.frames[1].error.is_some());

    let text = std::fs::read_to_string(&records).expect("records");
    assert_eq!(text.lines().count(), report.total_detections());
    for line in text.lines() {
        let rec: geomarker::sink::DetectionRecord = serde_json::from_str(line).expect("record");
        assert_eq!(rec.shape, geomarker::ShapeKind::Triangle);
        assert!(rec.timestamp.parse::<f64>().is_ok(), "{}", rec.timestamp);
    }
}
