// src/main.rs
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use neurostate::config::MonitorConfig;
use neurostate::drivers::{
    discover, CancellationToken, RecordingSwitch, SimulatedResolver, StatePipeline, StateReport,
    StreamInfo,
};
use neurostate::engine::spawn_monitor;
use neurostate::recorder::DataRecorder;
use neurostate::types::MonitorMessage;
// 模拟数据流参数
const SIM_RATE_HZ: f64 = 256.0;
const SIM_CHANNELS: usize = 5;
#[derive(Parser, Debug)]
#[command(name = "neurostate", about = "Real-time EEG cognitive-state monitor")]
struct Cli {
    /// JSON config file; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stream type to look for
    #[arg(long)]
    stream_type: Option<String>,
    /// Seconds between results
    #[arg(long)]
    interval: Option<f64>,
    /// Number of results in the majority vote
    #[arg(long)]
    smoothing: Option<usize>,
    /// Record raw samples to CSV under this label (Enter toggles)
    #[arg(long, value_name = "LABEL")]
    record: Option<String>,
    /// Stop after this many seconds
    #[arg(long, value_name = "SECS")]
    duration: Option<f64>,
    /// Seed of the simulated stream
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Print each report as one JSON line
    #[arg(long)]
    json: bool,
}
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = MonitorConfig::load_or_default(cli.config.as_deref())?;
    if let Some(stream_type) = &cli.stream_type {
        config.stream_type = stream_type.clone();
    }
    if let Some(interval) = cli.interval {
        config.pipeline.update_interval_secs = interval;
    }
    if let Some(smoothing) = cli.smoothing {
        config.pipeline.smoothing_window = smoothing;
    }
    config.validate().context("invalid settings")?;
    let deadline = deadline_after(cli.duration, Instant::now())?;
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel()).context("failed to install Ctrl-C handler")?;
    }
    let info = StreamInfo::new(SIM_RATE_HZ, SIM_CHANNELS, Vec::new())?;
    let mut resolver = SimulatedResolver::new("EEG", info, cli.seed);
    let source = discover(
        &mut resolver,
        &config.stream_type,
        config.discovery_timeout(),
        config.discovery_retry(),
    )
    .context("stream discovery failed")?;
    let mut pipeline = StatePipeline::new(source, config.pipeline.clone())?;
    if let Some(label) = &cli.record {
        let switch = RecordingSwitch::new(true);
        pipeline.attach_recorder(DataRecorder::new(&config.recording_dir), switch.clone(), label);
        spawn_toggle_listener(switch);
        println!("Recording `{label}` to {}. Press Enter to pause/resume.", config.recording_dir.display());
    }
    println!(
        "Monitoring `{}` (one result every {:.1}s, Ctrl-C to stop)...",
        config.stream_type, config.pipeline.update_interval_secs
    );
    let (tx, rx) = mpsc::channel();
    let handle = spawn_monitor(pipeline, cancel.clone(), tx);
    loop {
        if deadline.map_or(false, |d| Instant::now() >= d) && !cancel.is_cancelled() {
            info!("duration elapsed, stopping");
            cancel.cancel();
        }
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(MonitorMessage::Report(report)) => print_report(&report, cli.json)?,
            Ok(MonitorMessage::Status(connected)) => {
                println!("{}", if connected { "Stream connected" } else { "Stream disconnected" })
            }
            Ok(MonitorMessage::RecordingStatus(on)) => {
                println!("{}", if on { "Recording on" } else { "Recording paused" })
            }
            Ok(MonitorMessage::Log(line)) => info!("{line}"),
            Ok(MonitorMessage::Stopped(reason)) => {
                if let Some(reason) = reason {
                    warn!("monitor stopped: {reason}");
                }
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    match handle.join() {
        Ok(outcome) => outcome.context("monitoring failed")?,
        Err(_) => bail!("monitor thread panicked"),
    }
    println!("Monitoring stopped.");
    Ok(())
}
// --duration 换算成截止时间；太远的截止时间等同于不限时
fn deadline_after(secs: Option<f64>, now: Instant) -> Result<Option<Instant>> {
    let Some(secs) = secs else {
        return Ok(None);
    };
    match Duration::try_from_secs_f64(secs) {
        Ok(limit) if !limit.is_zero() => Ok(now.checked_add(limit)),
        _ => bail!("--duration must be a positive number of seconds, got {secs}"),
    }
}
// 每按一次回车切换录制状态
fn spawn_toggle_listener(switch: RecordingSwitch) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() {
                break;
            }
            switch.toggle();
        }
    });
}
fn print_report(report: &StateReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }
    let time = report.emitted_at.format("%H:%M:%S");
    if let Some(error) = &report.error {
        println!("[{time}] {} (alert level {}): {error}", report.result.state, report.result.alert_level);
        return Ok(());
    }
    let d = &report.result.details;
    println!(
        "[{time}] {} (alert level {}) | theta/beta {:.2} | alpha/beta {:.2}",
        report.result.state, report.result.alert_level, d.theta_beta_ratio, d.alpha_beta_ratio
    );
    if let Some(raw) = report.raw_state.filter(|raw| *raw != report.result.state) {
        println!("    current window: {raw}");
    }
    if let Some(brain) = &report.brain_state {
        println!(
            "    alertness {:?} | stress {:?} | fatigue {:?} | focus {:?}",
            brain.alertness, brain.stress, brain.fatigue, brain.focus
        );
    }
    for channel in &report.channels {
        println!(
            "    {:<10} {:?} (std {:.1} uV)",
            channel.name, channel.quality, channel.stats.std
        );
    }
    Ok(())
}
