//! log4rs setup: console output plus rolling `app.log` and `audit.log` files.
//!
//! Allow-list writes and admin reads are logged on the [`AUDIT_TARGET`] target,
//! which is routed only to `audit.log`.

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

pub const AUDIT_TARGET: &str = "mongo_search::audit";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

/// Initializes logging from a log4rs YAML file.
///
/// # Errors
/// Returns an error if the file cannot be read or a logger is already installed.
pub fn init_path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())?;
    Ok(())
}

#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(
    base: &Path,
    stem: &str,
    keep: u32,
) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Builds the process logging configuration.
///
/// - `dir`: when set, `app.log` and `audit.log` roll inside it; otherwise only the console is used.
/// - `level`: error|warn|info|debug|trace (default info).
/// - `retention`: rolled files kept per log (default 7).
///
/// # Errors
/// Returns an error if the directory or appenders cannot be created.
pub fn build_config(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let lvl = parse_level(level);
    let keep = u32::try_from(retention.unwrap_or(7)).unwrap_or(7);
    let console =
        ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(PATTERN))).build();
    let mut builder =
        Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    if let Some(base) = dir {
        let base = PathBuf::from(base);
        std::fs::create_dir_all(&base)?;
        builder = builder
            .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
            .appender(Appender::builder().build("audit", Box::new(rolling(&base, "audit", keep)?)))
            .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, lvl));
        root = root.appender("app");
    }
    builder = builder
        .logger(Logger::builder().additive(false).build("mongo_search::dev6", LevelFilter::Trace));
    Ok(builder.build(root.build(lvl))?)
}

/// Installs the configuration from [`build_config`] as the global logger.
///
/// A second call in the same process is a no-op apart from the returned error.
///
/// # Errors
/// Returns an error if the configuration cannot be built or a logger is already set.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(dir, level, retention)?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Configures logging from `MONGO_SEARCH_LOG_DIR`, `MONGO_SEARCH_LOG_LEVEL` and
/// `MONGO_SEARCH_LOG_RETENTION`.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::var("MONGO_SEARCH_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("MONGO_SEARCH_LOG_LEVEL").ok();
    let retention =
        std::env::var("MONGO_SEARCH_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention)
}
