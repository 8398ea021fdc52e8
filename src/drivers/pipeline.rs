use std::thread;
use std::time::{Duration, Instant};
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use crate::config::PipelineConfig;
use crate::drivers::buffer::RingBuffer;
use crate::drivers::classifier::{BrainState, ClassificationResult, CognitiveState, StateClassifier};
use crate::drivers::control::{CancellationToken, RecordingSwitch};
use crate::drivers::fft::{BandPowers, BandRatios, SpectralEstimator};
use crate::drivers::quality::{ChannelStats, SignalQuality};
use crate::drivers::smoother::TemporalSmoother;
use crate::drivers::source::{Sample, SampleSource, StreamInfo};
use crate::drivers::NeuroStateError;
use crate::recorder::DataRecorder;
/// Which channel, if any, is left out of the averaged band powers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelExclusion {
    /// The last channel of the stream (e.g. an AUX input).
    #[default]
    Last,
    Named(String),
    None,
}
impl ChannelExclusion {
    fn excluded_index(&self, names: &[String]) -> Result<Option<usize>, NeuroStateError> {
        match self {
            ChannelExclusion::Last => Ok(names.len().checked_sub(1)),
            ChannelExclusion::Named(name) => names
                .iter()
                .position(|n| n == name)
                .map(Some)
                .ok_or_else(|| {
                    NeuroStateError::InvalidConfig(format!(
                        "auxiliary channel `{name}` is not in the stream {names:?}"
                    ))
                }),
            ChannelExclusion::None => Ok(None),
        }
    }
}
/// When the pipeline leaves `WarmingUp`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupPolicy {
    /// Once a full window of real samples has arrived.
    #[default]
    BufferFill,
    /// A fixed delay after the first data.
    FixedDelay { seconds: f64 },
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    WaitingForData,
    WarmingUp,
    Running,
    Stopped,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub name: String,
    pub band_powers: BandPowers,
    pub ratios: BandRatios,
    pub stats: ChannelStats,
    pub quality: SignalQuality,
}
/// One emitted classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateReport {
    pub emitted_at: DateTime<Local>,
    /// Smoothed label; diagnostics are from the current window.
    pub result: ClassificationResult,
    /// Label of the current window before smoothing.
    pub raw_state: Option<CognitiveState>,
    pub brain_state: Option<BrainState>,
    pub channels: Vec<ChannelReport>,
    pub connected: bool,
    pub error: Option<String>,
}
impl StateReport {
    fn disconnected(reason: String) -> Self {
        Self {
            emitted_at: Local::now(),
            result: ClassificationResult::error(),
            raw_state: None,
            brain_state: None,
            channels: Vec::new(),
            connected: false,
            error: Some(reason),
        }
    }
}
/// Receives emitted reports. Connection and recording changes are
/// announced before the report of the same tick.
pub trait ReportSink {
    fn emit(&mut self, report: StateReport) -> Result<(), NeuroStateError>;
    fn connection_changed(&mut self, _connected: bool) -> Result<(), NeuroStateError> {
        Ok(())
    }
    fn recording_changed(&mut self, _recording: bool) -> Result<(), NeuroStateError> {
        Ok(())
    }
}
impl ReportSink for Vec<StateReport> {
    fn emit(&mut self, report: StateReport) -> Result<(), NeuroStateError> {
        self.push(report);
        Ok(())
    }
}
struct Recording {
    recorder: DataRecorder,
    switch: RecordingSwitch,
    label: String,
}
/// Pulls samples, keeps the rolling window and classifies it on a fixed
/// cadence. All mutable state of a monitoring session lives here.
pub struct StatePipeline<S: SampleSource> {
    source: S,
    info: StreamInfo,
    config: PipelineConfig,
    buffer: RingBuffer,
    estimator: SpectralEstimator,
    classifier: StateClassifier,
    smoother: TemporalSmoother<CognitiveState>,
    analysis_channels: Vec<usize>,
    frontal_channels: Option<Vec<usize>>,
    phase: PipelinePhase,
    first_data_at: Option<Instant>,
    last_emission: Option<Instant>,
    last_sentinel: Option<Instant>,
    connected: bool,
    recording: Option<Recording>,
}
impl<S: SampleSource> StatePipeline<S> {
    pub fn new(source: S, config: PipelineConfig) -> Result<Self, NeuroStateError> {
        config.validate()?;
        let info = source.info().clone();
        let buffer = RingBuffer::with_window_seconds(
            info.channel_count,
            info.nominal_rate_hz,
            config.window_seconds,
        )?;
        let estimator = SpectralEstimator::new(
            info.nominal_rate_hz,
            buffer.capacity(),
            config.window_function,
            config.method,
        )?;
        let excluded = config.auxiliary_channel.excluded_index(&info.channel_names)?;
        let analysis_channels: Vec<usize> = (0..info.channel_count)
            .filter(|&i| Some(i) != excluded)
            .collect();
        if analysis_channels.is_empty() {
            return Err(NeuroStateError::InvalidConfig(format!(
                "no channels left to analyse in {:?}",
                info.channel_names
            )));
        }
        let frontal_channels = if config.frontal_channels.is_empty() {
            None
        } else {
            config
                .frontal_channels
                .iter()
                .map(|name| info.channel_index(name))
                .collect::<Option<Vec<usize>>>()
        };
        if frontal_channels.is_none() && !config.frontal_channels.is_empty() {
            debug!(
                "frontal channels {:?} not all present; brain-state report disabled",
                config.frontal_channels
            );
        }
        info!(
            "pipeline ready: {} Hz, window {} samples, fft {} ({:?}, {:?}), analysing {:?}",
            info.nominal_rate_hz,
            buffer.capacity(),
            estimator.fft_size(),
            config.window_function,
            config.method,
            analysis_channels
                .iter()
                .map(|&i| info.channel_names[i].as_str())
                .collect::<Vec<_>>()
        );
        Ok(Self {
            source,
            info,
            classifier: StateClassifier::new(config.thresholds),
            smoother: TemporalSmoother::new(config.smoothing_window),
            config,
            buffer,
            estimator,
            analysis_channels,
            frontal_channels,
            phase: PipelinePhase::WaitingForData,
            first_data_at: None,
            last_emission: None,
            last_sentinel: None,
            connected: true,
            recording: None,
        })
    }
    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }
    pub fn is_connected(&self) -> bool {
        self.connected
    }
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }
    /// Forwards raw chunks to `recorder` whenever `switch` is on.
    pub fn attach_recorder(&mut self, recorder: DataRecorder, switch: RecordingSwitch, label: &str) {
        self.recording = Some(Recording {
            recorder,
            switch,
            label: label.to_string(),
        });
    }
    pub fn is_recording(&self) -> bool {
        self.recording
            .as_ref()
            .map_or(false, |rec| rec.recorder.is_recording())
    }
    /// Clears the window, the label history and the timers.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.smoother.reset();
        self.first_data_at = None;
        self.last_emission = None;
        self.set_phase(PipelinePhase::WaitingForData);
    }
    /// Stops the pipeline and closes any open recording.
    pub fn stop(&mut self) {
        if let Some(rec) = &mut self.recording {
            if let Err(err) = rec.recorder.stop() {
                warn!("failed to flush recording: {err}");
            }
        }
        self.set_phase(PipelinePhase::Stopped);
    }
    pub fn tick(&mut self) -> Result<Option<StateReport>, NeuroStateError> {
        self.tick_at(Instant::now())
    }
    /// One loop iteration at time `now`: pull, buffer, and classify when the
    /// update interval has elapsed.
    pub fn tick_at(&mut self, now: Instant) -> Result<Option<StateReport>, NeuroStateError> {
        if self.phase == PipelinePhase::Stopped {
            return Ok(None);
        }
        let last_emission = *self.last_emission.get_or_insert(now);
        let chunk = match self
            .source
            .pull_chunk(self.config.pull_timeout(), self.config.max_chunk_samples)
        {
            Ok(chunk) => chunk,
            Err(NeuroStateError::SourceDisconnected(reason)) => {
                return Ok(self.source_lost(reason, now));
            }
            Err(err) if err.is_invalid_input() => {
                warn!("dropping malformed chunk: {err}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if chunk.is_empty() {
            return Ok(None);
        }
        if let Err(err) = self.buffer.append(&chunk) {
            if err.is_invalid_input() {
                warn!("dropping malformed chunk of {} samples: {err}", chunk.len());
                return Ok(None);
            }
            return Err(err);
        }
        if !self.connected {
            info!("sample source is delivering data again");
            self.connected = true;
            self.last_sentinel = None;
        }
        self.record(&chunk);
        self.advance_phase(now);
        if self.phase != PipelinePhase::Running {
            return Ok(None);
        }
        if now.saturating_duration_since(last_emission) < self.config.update_interval() {
            return Ok(None);
        }
        self.last_emission = Some(now);
        let report = self.classify_window()?;
        debug!(
            "emitting {} (raw {:?}, alert level {})",
            report.result.state, report.raw_state, report.result.alert_level
        );
        Ok(Some(report))
    }
    /// Polls until `cancel` is set, handing every report to `sink`.
    pub fn run<K: ReportSink + ?Sized>(
        &mut self,
        cancel: &CancellationToken,
        sink: &mut K,
    ) -> Result<(), NeuroStateError> {
        info!(
            "monitoring started: one result every {:?}, polling every {:?}",
            self.config.update_interval(),
            self.config.poll_interval()
        );
        let outcome = self.poll_until_cancelled(cancel, sink);
        if let Err(err) = &outcome {
            error!("pipeline failed: {err}");
        }
        self.stop();
        outcome
    }
    fn poll_until_cancelled<K: ReportSink + ?Sized>(
        &mut self,
        cancel: &CancellationToken,
        sink: &mut K,
    ) -> Result<(), NeuroStateError> {
        let mut connected = self.is_connected();
        let mut recording = self.is_recording();
        while !cancel.is_cancelled() {
            let report = self.tick()?;
            if self.is_connected() != connected {
                connected = self.is_connected();
                sink.connection_changed(connected)?;
            }
            if self.is_recording() != recording {
                recording = self.is_recording();
                sink.recording_changed(recording)?;
            }
            if let Some(report) = report {
                sink.emit(report)?;
            }
            thread::sleep(self.config.poll_interval());
        }
        Ok(())
    }
    /// Sentinel for a failed pull: always on the first failure, then at most
    /// once per update interval while the source stays down.
    fn source_lost(&mut self, reason: String, now: Instant) -> Option<StateReport> {
        if self.connected {
            warn!("sample source disconnected: {reason}");
            self.connected = false;
        } else if let Some(last) = self.last_sentinel {
            if now.saturating_duration_since(last) < self.config.update_interval() {
                debug!("source still down: {reason}");
                return None;
            }
        }
        self.last_sentinel = Some(now);
        Some(StateReport::disconnected(reason))
    }
    fn set_phase(&mut self, phase: PipelinePhase) {
        if self.phase != phase {
            info!("pipeline {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
    fn advance_phase(&mut self, now: Instant) {
        if self.phase == PipelinePhase::WaitingForData {
            self.first_data_at = Some(now);
            self.set_phase(PipelinePhase::WarmingUp);
        }
        if self.phase == PipelinePhase::WarmingUp {
            let ready = match self.config.warmup {
                WarmupPolicy::BufferFill => self.buffer.is_filled(),
                WarmupPolicy::FixedDelay { seconds } => self.first_data_at.map_or(false, |t| {
                    let delay = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX);
                    now.saturating_duration_since(t) >= delay
                }),
            };
            if ready {
                self.set_phase(PipelinePhase::Running);
            }
        }
    }
    fn analyse_channel(&self, index: usize) -> Result<ChannelReport, NeuroStateError> {
        let window = self.buffer.snapshot(index)?;
        let band_powers = self.estimator.band_powers(&window);
        Ok(ChannelReport {
            name: self.info.channel_names[index].clone(),
            band_powers,
            ratios: band_powers.ratios(),
            stats: ChannelStats::from_samples(&window),
            quality: SignalQuality::assess(&window, self.info.nominal_rate_hz),
        })
    }
    fn classify_window(&mut self) -> Result<StateReport, NeuroStateError> {
        let channels = self
            .analysis_channels
            .iter()
            .map(|&i| self.analyse_channel(i))
            .collect::<Result<Vec<_>, _>>()?;
        let averaged = BandPowers::mean(channels.iter().map(|c| &c.band_powers));
        let raw = self.classifier.classify(&averaged, &averaged.ratios());
        let raw_state = raw.state;
        let smoothed = self.smoother.push(raw_state);
        let brain_state = match &self.frontal_channels {
            Some(indices) => {
                let mut ratios = Vec::with_capacity(indices.len());
                for &i in indices {
                    match self.analysis_channels.iter().position(|&a| a == i) {
                        Some(pos) => ratios.push(channels[pos].ratios),
                        None => ratios.push(self.analyse_channel(i)?.ratios),
                    }
                }
                BandRatios::mean(ratios.iter()).map(|r| BrainState::assess(&r))
            }
            None => None,
        };
        Ok(StateReport {
            emitted_at: Local::now(),
            result: raw.relabel(smoothed),
            raw_state: Some(raw_state),
            brain_state,
            channels,
            connected: true,
            error: None,
        })
    }
    fn record(&mut self, chunk: &[Sample]) {
        let Some(rec) = &mut self.recording else {
            return;
        };
        match (rec.switch.is_active(), rec.recorder.is_recording()) {
            (true, false) => {
                if let Err(err) = rec.recorder.start(&rec.label, &self.info.channel_names) {
                    warn!("could not start recording: {err}");
                    rec.switch.set(false);
                    return;
                }
            }
            (false, true) => {
                if let Err(err) = rec.recorder.stop() {
                    warn!("failed to flush recording: {err}");
                }
                return;
            }
            (false, false) => return,
            (true, true) => {}
        }
        if let Err(err) = rec.recorder.write_chunk(chunk) {
            warn!("recording failed, stopping it: {err}");
            let _ = rec.recorder.stop();
            rec.switch.set(false);
        }
    }
}
