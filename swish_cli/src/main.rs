//! `swish` command-line entry point.

mod cli;
mod error_fmt;
mod logging;
mod report;
mod session;
mod shot_log;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE, json_mode};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::session::SessionOpts;

fn load_config(path: &Path) -> eyre::Result<swish_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = swish_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn install_ctrlc() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler; stop with SIGKILL");
    }
    shutdown
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let shutdown = install_ctrlc();
    let opts = SessionOpts {
        trace: cli.trace,
        seed: cli.seed,
        realtime: cli.realtime,
        shot_log: cli.shot_log,
        json: cli.json,
    };

    match cli.cmd {
        Commands::Calibrate { out } => {
            session::run_calibrate(&opts, &cfg, out.as_deref(), shutdown)?;
        }
        Commands::Train { baseline, shots } => {
            session::run_train(&opts, &cfg, baseline.as_deref(), shots, shutdown)?;
        }
        Commands::SelfCheck => session::self_check(&cfg, cli.json, shutdown)?,
        Commands::Health => session::health(&cfg, cli.json)?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "command failed");
        if json_mode() {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}
