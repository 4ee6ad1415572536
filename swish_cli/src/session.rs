//! Hardware assembly and the calibrate / train / self-check commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use swish_config::{BaselineFile, Config, PersistedProfile, RunMode, TraceRow};
use swish_core::atomic::write_atomic;
use swish_core::error::{Result, SwishError};
use swish_core::sampler::Sampler;
use swish_core::util::samples_per_tick;
use swish_core::{
    CALIBRATION_SAMPLES, CalibrationProfile, DynTrainer, Extras, Intensity, Pattern, RunParams,
    StopReason, TracingLog, TrainerSettings, TrainingEvent, TrainingLog, Zone, build_trainer,
    runner,
};
use swish_hardware::{ReplayImu, ShotScript, SimulatedImu};
use swish_traits::{Actuator, Clock, ManualClock, MonotonicClock, SampleSource};

use crate::report;
use crate::shot_log::JsonlLog;

/// Shots the simulated IMU performs for `train` when no budget is given.
const DEFAULT_SIM_SHOTS: u32 = 10;

/// Options shared by every command that drives the trainer.
#[derive(Debug, Clone, Default)]
pub struct SessionOpts {
    pub trace: Option<PathBuf>,
    pub seed: Option<u32>,
    pub realtime: bool,
    pub shot_log: Option<PathBuf>,
    pub json: bool,
}

fn make_source<C>(
    opts: &SessionOpts,
    cfg: &Config,
    clock: C,
    sim_shots: Option<u32>,
) -> Result<Box<dyn SampleSource + Send>>
where
    C: Clock + Send + 'static,
{
    if let Some(path) = &opts.trace {
        let rows = swish_config::load_motion_csv(path)
            .wrap_err_with(|| format!("load motion trace {}", path.display()))?;
        tracing::info!(path = %path.display(), readings = rows.len(), "replaying trace");
        return Ok(Box::new(ReplayImu::new(
            rows.into_iter().map(TraceRow::to_reading),
            clock,
        )));
    }
    let mut imu = SimulatedImu::new(cfg.sensor.sample_rate_hz, clock).with_script(ShotScript {
        shots: sim_shots,
        ..ShotScript::default()
    });
    if let Some(seed) = opts.seed {
        imu = imu.with_seed(seed);
    }
    Ok(Box::new(imu))
}

fn make_actuator(cfg: &Config) -> Result<Box<dyn Actuator + Send>> {
    let pins: Vec<u8> = cfg.haptics.motors.iter().map(|m| m.pin).collect();
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let pwm = swish_hardware::pwm::PwmActuator::new(&pins, swish_hardware::pwm::DEFAULT_PWM_HZ)
            .wrap_err("open motor pins")?;
        Ok(Box::new(pwm))
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        Ok(Box::new(swish_hardware::SimulatedActuator::new().with_pins(pins)))
    }
}

fn make_log(opts: &SessionOpts, cfg: &Config) -> Result<Box<dyn TrainingLog>> {
    let path = opts
        .shot_log
        .clone()
        .or_else(|| cfg.logging.shot_log.as_ref().map(PathBuf::from));
    match path {
        Some(p) => Ok(Box::new(JsonlLog::open(&p)?)),
        None => Ok(Box::new(TracingLog)),
    }
}

/// Build a trainer over the configured source and actuator.
///
/// Virtual time (a shared `ManualClock`) is used unless `--realtime` is given
/// or the sampler thread is enabled, which needs the wall clock.
pub fn assemble(
    opts: &SessionOpts,
    cfg: &Config,
    sim_shots: Option<u32>,
) -> Result<DynTrainer> {
    let settings = TrainerSettings::from(cfg);
    let actuator = make_actuator(cfg)?;
    let log = make_log(opts, cfg)?;
    let sampler = cfg.runner.mode == RunMode::Sampler;

    let (source, clock): (Box<dyn SampleSource + Send>, Box<dyn Clock + Send + Sync>) =
        if opts.realtime || sampler {
            let source = make_source(opts, cfg, MonotonicClock::new(), sim_shots)?;
            let source: Box<dyn SampleSource + Send> = if sampler {
                Box::new(Sampler::spawn(
                    source,
                    cfg.sensor.sample_rate_hz,
                    MonotonicClock::new(),
                ))
            } else {
                source
            };
            (source, Box::new(MonotonicClock::new()))
        } else {
            let clock = ManualClock::new();
            (
                make_source(opts, cfg, clock.clone(), sim_shots)?,
                Box::new(clock),
            )
        };

    tracing::debug!(
        mode = ?cfg.runner.mode,
        realtime = opts.realtime,
        sample_rate_hz = cfg.sensor.sample_rate_hz,
        tick_hz = cfg.session.tick_hz,
        "trainer assembled"
    );
    build_trainer(
        source,
        actuator,
        settings,
        Extras {
            clock: Some(clock),
            log: Some(log),
            overheat_check: None,
            baseline: None,
        },
    )
}

fn run_params(cfg: &Config, shutdown: Arc<AtomicBool>) -> RunParams {
    RunParams {
        tick_hz: cfg.session.tick_hz,
        shutdown: Some(shutdown),
        ..RunParams::default()
    }
}

/// Record shots until a baseline completes, then persist it.
pub fn run_calibrate(
    opts: &SessionOpts,
    cfg: &Config,
    out: Option<&Path>,
    shutdown: Arc<AtomicBool>,
) -> Result<CalibrationProfile> {
    let sim_shots = u32::try_from(CALIBRATION_SAMPLES).unwrap_or(u32::MAX);
    let mut trainer = assemble(opts, cfg, Some(sim_shots))?;
    trainer.begin_calibration();

    let params = RunParams {
        stop_on_calibration: true,
        ..run_params(cfg, shutdown)
    };
    let mut outcome: Option<std::result::Result<CalibrationProfile, CalibrationProfile>> = None;
    let run = runner::run(&mut trainer, &params, |e| {
        report::emit(e, opts.json);
        match e {
            TrainingEvent::CalibrationComplete(p) => outcome = Some(Ok(p.clone())),
            TrainingEvent::CalibrationFailed(p) => outcome = Some(Err(p.clone())),
            _ => {}
        }
    })?;
    tracing::info!(stop = run.stop.as_str(), shots = run.shots, "calibration run finished");

    let profile = match outcome {
        Some(Ok(p)) => p,
        Some(Err(p)) => {
            return Err(eyre::Report::new(SwishError::State(format!(
                "calibration produced an unusable baseline (accel sd {:.3}, duration sd {:.1} ms)",
                p.std_dev_accel(),
                p.std_dev_duration_ms()
            ))));
        }
        // fewer than ten shots: surfaces CalibrationIncomplete
        None => trainer.finish_calibration()?,
    };

    let file = BaselineFile {
        baseline: PersistedProfile::from(&profile),
    };
    let text = swish_config::baseline_to_toml(&file)?;
    match out {
        Some(path) => {
            write_atomic(path, text.as_bytes())
                .wrap_err_with(|| format!("write baseline {}", path.display()))?;
            tracing::info!(path = %path.display(), "baseline saved");
            if !opts.json {
                println!("baseline written to {}", path.display());
            }
        }
        None if !opts.json => print!("{text}"),
        None => {}
    }
    Ok(profile)
}

/// Baseline precedence: `--baseline FILE`, then `[baseline]` in the config.
pub fn load_baseline(path: Option<&Path>, cfg: &Config) -> Result<Option<CalibrationProfile>> {
    if let Some(path) = path {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("read baseline {}", path.display()))?;
        let file = swish_config::load_baseline_toml(&text)
            .wrap_err_with(|| format!("parse baseline {}", path.display()))?;
        file.baseline.validate()?;
        return Ok(Some(CalibrationProfile::from(&file.baseline)));
    }
    Ok(cfg.baseline.as_ref().map(CalibrationProfile::from))
}

/// Score shots until the source runs dry, the shot budget is spent, or Ctrl-C.
pub fn run_train(
    opts: &SessionOpts,
    cfg: &Config,
    baseline_path: Option<&Path>,
    shots: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let baseline = load_baseline(baseline_path, cfg)?;
    let sim_shots = shots
        .map_or(DEFAULT_SIM_SHOTS, |n| u32::try_from(n).unwrap_or(u32::MAX));
    let mut trainer = assemble(opts, cfg, Some(sim_shots))?;
    if let Some(b) = baseline {
        trainer.set_baseline(b)?;
    }
    trainer.begin_training()?;

    let params = RunParams {
        max_shots: shots,
        ..run_params(cfg, shutdown)
    };
    let run = runner::run(&mut trainer, &params, |e| report::emit(e, opts.json))?;
    let perf = trainer.performance();
    tracing::info!(
        stop = run.stop.as_str(),
        shots = perf.total_shots,
        average = perf.average_score,
        "training finished"
    );
    report::print_session(&run, &perf, opts.json);
    Ok(())
}

/// Pulse each motor zone, then push one simulated shot through the pipeline.
pub fn self_check(cfg: &Config, json: bool, shutdown: Arc<AtomicBool>) -> Result<()> {
    let opts = SessionOpts {
        json,
        ..SessionOpts::default()
    };
    let mut trainer = assemble(&opts, cfg, Some(1))?;

    let mut zones: Vec<Zone> = Vec::new();
    for m in trainer.haptics().motors() {
        if !zones.contains(&m.zone()) {
            zones.push(m.zone());
        }
    }
    for zone in &zones {
        let now = trainer.now_ms();
        trainer
            .haptics_mut()
            .trigger(*zone, Pattern::SinglePulse, Intensity::Light.level(), 100, now)
            .wrap_err_with(|| format!("pulse {zone}"))?;
    }

    let mut peak = None;
    let run = runner::run(&mut trainer, &run_params(cfg, shutdown), |e| {
        if let TrainingEvent::ShotDetected(s) = e {
            peak = Some(s.peak_accel);
        }
    })?;
    if run.stop == StopReason::Shutdown {
        eyre::bail!("self-check interrupted");
    }
    let Some(peak) = peak else {
        eyre::bail!("self-check: the simulated shot was not detected; check [detector] thresholds");
    };
    let errors = trainer.haptics().actuator_errors();
    if errors > 0 {
        eyre::bail!("self-check: {errors} motor command(s) failed");
    }

    if json {
        println!(
            "{}",
            serde_json::json!({
                "self_check": "ok",
                "motors": trainer.haptics().motors().len(),
                "zones": zones.iter().map(|z| z.as_str()).collect::<Vec<_>>(),
                "shot_peak_accel": peak,
            })
        );
    } else {
        println!(
            "self-check ok: {} motor(s) pulsed, simulated shot detected (peak {peak:.1} m/s²)",
            trainer.haptics().motors().len()
        );
    }
    Ok(())
}

/// Static checks on a loaded config; never touches hardware.
pub fn health(cfg: &Config, json: bool) -> Result<()> {
    let per_tick = samples_per_tick(cfg.sensor.sample_rate_hz, cfg.session.tick_hz);
    let backlog = per_tick > cfg.session.max_samples_per_tick;
    if backlog {
        tracing::warn!(
            needed = per_tick,
            allowed = cfg.session.max_samples_per_tick,
            "sensor rate outpaces the per-tick sample budget; readings will queue"
        );
    }
    let calibrated = cfg.baseline.is_some();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": if backlog { "degraded" } else { "ok" },
                "calibrated": calibrated,
                "motors": cfg.haptics.motors.len(),
                "sample_rate_hz": cfg.sensor.sample_rate_hz,
                "tick_hz": cfg.session.tick_hz,
                "samples_per_tick": per_tick,
                "mode": match cfg.runner.mode {
                    RunMode::Direct => "direct",
                    RunMode::Sampler => "sampler",
                },
            })
        );
    } else {
        println!(
            "health {}: {} motor(s), {} Hz sensor, {} Hz loop, baseline {}",
            if backlog { "degraded" } else { "ok" },
            cfg.haptics.motors.len(),
            cfg.sensor.sample_rate_hz,
            cfg.session.tick_hz,
            if calibrated { "present" } else { "missing" }
        );
    }
    Ok(())
}
