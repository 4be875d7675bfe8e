//! Stderr logger for the command-line front end.
//!
//! Library code only talks to the `log` facade. Binaries install either
//! [`init_with_level`] or, with the `tracing` feature, [`init_tracing`].
//!
//! The stderr logger applies the requested level to the `geomarker*` crates
//! and caps everything else (image decoders, ...) at `warn`, so `-vvv` shows
//! pipeline traces without dependency noise. Lines look like
//! `[  0.042s DEBUG shapes::detector] red: 6 line segments`.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_PREFIX: &str = "geomarker";

struct StderrLogger {
    own: LevelFilter,
    deps: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn new(level: LevelFilter) -> Self {
        Self {
            own: level,
            deps: level.min(LevelFilter::Warn),
            started: Instant::now(),
        }
    }

    fn limit_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_PREFIX) {
            self.own
        } else {
            self.deps
        }
    }
}

/// `geomarker_shapes::detector` -> `shapes::detector`; foreign targets are
/// kept as is.
fn short_target(target: &str) -> &str {
    match target.strip_prefix("geomarker_") {
        Some(rest) => rest,
        None if target == OWN_PREFIX => "geomarker",
        None => target.strip_prefix("geomarker::").unwrap_or(target),
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.limit_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{elapsed:7.3}s {:>5} {}] {}",
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger; `level` applies to the `geomarker*` crates.
///
/// Only the first call installs anything.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger::new(level));
    log::set_logger(logger)?;
    log::set_max_level(logger.own);
    Ok(())
}

/// Map a `-v` repetition count to a level: 0 warn, 1 info, 2 debug, 3+ trace.
pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install a `tracing` subscriber honouring `RUST_LOG` (default `info`).
///
/// `log` records are not bridged here; binaries add a `LogTracer`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    if json {
        let subscriber = builder.json().flatten_event(true).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = builder.with_timer(fmt::time::Uptime::default()).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn meta(level: Level, target: &str) -> Metadata<'_> {
        Metadata::builder().level(level).target(target).build()
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn dependencies_stay_at_warn() {
        let logger = StderrLogger::new(LevelFilter::Trace);
        assert!(logger.enabled(&meta(Level::Trace, "geomarker_shapes::hough")));
        assert!(logger.enabled(&meta(Level::Debug, "geomarker::detect")));
        assert!(!logger.enabled(&meta(Level::Debug, "image::codecs::png")));
        assert!(logger.enabled(&meta(Level::Warn, "image::codecs::png")));

        let quiet = StderrLogger::new(LevelFilter::Error);
        assert!(!quiet.enabled(&meta(Level::Warn, "geomarker_geo::projector")));
        assert!(!quiet.enabled(&meta(Level::Warn, "image")));
    }

    #[test]
    fn targets_are_shortened() {
        assert_eq!(short_target("geomarker_shapes::detector"), "shapes::detector");
        assert_eq!(short_target("geomarker::detect"), "detect");
        assert_eq!(short_target("geomarker"), "geomarker");
        assert_eq!(short_target("image::png"), "image::png");
    }
}
