//! Console and file tracing setup.

use std::path::Path;

use eyre::WrapErr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::FILE_GUARD;

/// Level precedence: `--log-level`, then `RUST_LOG`, then `[logging].level`,
/// then `info`.
fn env_filter(cli_level: Option<&str>, cfg_level: Option<&str>) -> eyre::Result<EnvFilter> {
    if let Some(level) = cli_level {
        return EnvFilter::try_new(level).wrap_err_with(|| format!("invalid --log-level '{level}'"));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = cfg_level.unwrap_or("info");
    EnvFilter::try_new(level).wrap_err_with(|| format!("invalid logging.level '{level}'"))
}

fn rotation(name: Option<&str>) -> Rotation {
    match name {
        Some("daily") => Rotation::DAILY,
        Some("hourly") => Rotation::HOURLY,
        _ => Rotation::NEVER,
    }
}

/// Install the global subscriber. Console output goes to stderr so stdout
/// stays clean for reports; the optional file sink always writes JSON.
pub fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &swish_config::Logging,
) -> eyre::Result<()> {
    let filter = env_filter(cli_level, logging.level.as_deref())?;

    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let console = if json {
        console.json().boxed()
    } else {
        console.boxed()
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let prefix = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("swish.log");
            let appender = RollingFileAppender::builder()
                .rotation(rotation(logging.rotation.as_deref()))
                .filename_prefix(prefix)
                .build(dir)
                .wrap_err_with(|| format!("open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
