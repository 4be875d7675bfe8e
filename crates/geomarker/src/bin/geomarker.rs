use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use geomarker::io::{FrameReport, LocateConfig, LocateReport, PoseRecord};
use geomarker::overlay::render_overlay;
use geomarker::sink::{processing_timestamp, DetectionRecord, DetectionSink, JsonLinesSink};
use geomarker::{load_rgb, MarkerLocator, ShapeDetectorParams};
use geomarker::{Strategy, TargetSpec};
use log::{info, warn};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "geomarker", version, about = "Detect and geolocate colored markers")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit structured JSON logs (requires the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process every frame of a JSON job file.
    Run {
        /// Job configuration (frames, poses, detector settings).
        #[arg(long)]
        config: PathBuf,
        /// Report path; overrides `output_path` from the job.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Detect markers in one image and print them as JSON.
    Detect(DetectArgs),
    /// Print (or write) the default detector parameters.
    DefaultParams {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct DetectArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    /// Height above ground in metres.
    #[arg(long, conflicts_with = "altitude")]
    height: Option<f64>,
    /// Absolute altitude; requires --home-altitude.
    #[arg(long, requires = "home_altitude")]
    altitude: Option<f64>,
    #[arg(long)]
    home_altitude: Option<f64>,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    yaw: f64,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pitch: f64,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    roll: f64,
    /// Horizontal field of view in degrees.
    #[arg(long, default_value_t = 78.0)]
    hfov: f64,
    /// `lines` or `contours`.
    #[arg(long)]
    strategy: Option<String>,
    /// Target as `color:shape`; repeat for several. Defaults to the
    /// configured targets.
    #[arg(long = "target")]
    targets: Vec<String>,
    /// Detector parameters JSON (see `default-params`).
    #[arg(long)]
    params: Option<PathBuf>,
    /// Write an annotated copy of the image here.
    #[arg(long)]
    overlay: Option<PathBuf>,
    /// Append detection records to this JSON-lines file.
    #[arg(long)]
    records: Option<PathBuf>,
    /// Capture time written to records; defaults to the processing time.
    #[arg(long)]
    timestamp: Option<String>,
}

impl DetectArgs {
    fn detector_params(&self) -> CliResult<ShapeDetectorParams> {
        let mut params = match &self.params {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            None => ShapeDetectorParams::default(),
        };
        if let Some(strategy) = &self.strategy {
            params.strategy = strategy.parse::<Strategy>()?;
        }
        if !self.targets.is_empty() {
            params.targets = self
                .targets
                .iter()
                .map(|t| t.parse::<TargetSpec>())
                .collect::<Result<_, _>>()?;
        }
        Ok(params)
    }

    fn pose_record(&self) -> PoseRecord {
        PoseRecord {
            latitude: self.lat,
            longitude: self.lon,
            height_above_ground: self.height,
            altitude: self.altitude,
            yaw: self.yaw,
            pitch: self.pitch,
            roll: self.roll,
        }
    }
}

fn init_logging(verbose: u8, json: bool) {
    #[cfg(feature = "tracing")]
    {
        let _ = verbose;
        let _ = tracing_log::LogTracer::init();
        geomarker::core::init_tracing(json);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if json {
            eprintln!("--log-json needs the `tracing` feature; using plain logs");
        }
        let _ = geomarker::core::init_with_level(geomarker::core::level_from_verbosity(verbose));
    }
}

fn save_overlay(
    frame: &image::RgbImage,
    located: &[geomarker::LocatedDetection],
    path: &Path,
) -> CliResult<()> {
    render_overlay(frame, located)
        .save(path)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(())
}

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let params = args.detector_params()?;
    let pose = args.pose_record().to_pose(args.home_altitude)?;
    let locator = MarkerLocator::new(params, args.hfov)?;

    let frame = load_rgb(&args.image)?;
    let located = locator.locate(&frame, &pose)?;
    info!("{}: {} markers", args.image.display(), located.len());

    if let Some(path) = &args.overlay {
        save_overlay(&frame, &located, path)?;
    }
    if let Some(path) = &args.records {
        let frame_name = args.image.display().to_string();
        let stamp = args.timestamp.clone().unwrap_or_else(processing_timestamp);
        let mut sink = JsonLinesSink::append(path)?;
        for l in &located {
            let record = DetectionRecord::from_located(&frame_name, Some(stamp.as_str()), l);
            sink.write_record(&record)?;
        }
        sink.flush()?;
    }

    let json = serde_json::to_string_pretty(&located)?;
    println!("{json}");
    Ok(())
}

fn run_job(config_path: &Path, output: Option<&Path>) -> CliResult<LocateReport> {
    let config = LocateConfig::load_json(config_path)?;
    let poses = config.resolve_poses()?;
    let locator = MarkerLocator::new(config.detector.clone(), config.hfov_deg)?;

    let mut sink = match &config.records_path {
        Some(path) => Some(JsonLinesSink::append(path)?),
        None => None,
    };
    if let Some(dir) = &config.overlay_dir {
        std::fs::create_dir_all(dir)?;
    }

    let base_dir = LocateConfig::base_dir(config_path);
    let mut report = LocateReport::new(config_path.display().to_string(), config.hfov_deg);
    for (frame, pose) in config.frames.iter().zip(poses) {
        let mut fr = FrameReport::new(frame, pose);
        let result = load_rgb(frame.resolve_image_path(base_dir))
            .and_then(|img| locator.locate(&img, &pose).map(|located| (img, located)));
        match result {
            Ok((img, located)) => {
                info!("{}: {} markers", frame.image_path, located.len());
                if let Some(sink) = sink.as_mut() {
                    let stamp = frame.timestamp.clone().unwrap_or_else(processing_timestamp);
                    for l in &located {
                        sink.write_record(&DetectionRecord::from_located(
                            &frame.image_path,
                            Some(stamp.as_str()),
                            l,
                        ))?;
                    }
                }
                if let Some(dir) = &config.overlay_dir {
                    let name = Path::new(&frame.image_path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "frame.png".to_string());
                    save_overlay(&img, &located, &Path::new(dir).join(name))?;
                }
                fr.set_detections(img.width(), img.height(), located);
            }
            Err(err) => {
                warn!("{}: {err}", frame.image_path);
                fr.set_error(err);
            }
        }
        report.frames.push(fr);
    }
    if let Some(sink) = sink.as_mut() {
        sink.flush()?;
    }

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output_path());
    report.write_json(&out)?;
    info!(
        "{} frames, {} detections, report written to {}",
        report.frames.len(),
        report.total_detections(),
        out.display()
    );
    Ok(report)
}

fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Run { config, output } => {
            let report = run_job(&config, output.as_deref())?;
            println!(
                "processed {} frames, {} detections",
                report.frames.len(),
                report.total_detections()
            );
        }
        Command::Detect(args) => run_detect(&args)?,
        Command::DefaultParams { out } => {
            let json = serde_json::to_string_pretty(&ShapeDetectorParams::default())?;
            match out {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
