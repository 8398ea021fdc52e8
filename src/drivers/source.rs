use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use crate::drivers::NeuroStateError;
/// Channel labels used when a stream does not describe its channels.
pub const DEFAULT_CHANNEL_NAMES: [&str; 5] = ["TP9", "AF7", "AF8", "TP10", "Right AUX"];
/// One multichannel reading with its monotonic timestamp (seconds).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub values: Vec<f64>,
    pub timestamp: f64,
}
impl Sample {
    pub fn new(values: Vec<f64>, timestamp: f64) -> Self {
        Self { values, timestamp }
    }
    pub fn num_channels(&self) -> usize {
        self.values.len()
    }
}
/// Checks that every sample of a chunk carries exactly `channel_count`
/// finite values.
pub fn validate_chunk(chunk: &[Sample], channel_count: usize) -> Result<(), NeuroStateError> {
    for sample in chunk {
        if sample.num_channels() != channel_count {
            return Err(NeuroStateError::ChannelMismatch {
                expected: channel_count,
                actual: sample.num_channels(),
            });
        }
        if let Some(channel) = sample.values.iter().position(|v| !v.is_finite()) {
            return Err(NeuroStateError::InvalidInput(format!(
                "non-finite reading {} on channel {channel} at t={}",
                sample.values[channel], sample.timestamp
            )));
        }
    }
    Ok(())
}
/// Stream metadata reported by a source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub nominal_rate_hz: f64,
    pub channel_count: usize,
    pub channel_names: Vec<String>,
}
impl StreamInfo {
    /// Builds stream info, falling back to [`DEFAULT_CHANNEL_NAMES`] when the
    /// declared names are missing or do not cover every channel.
    pub fn new(
        nominal_rate_hz: f64,
        channel_count: usize,
        channel_names: Vec<String>,
    ) -> Result<Self, NeuroStateError> {
        if nominal_rate_hz.is_nan() || nominal_rate_hz <= 0.0 {
            return Err(NeuroStateError::InvalidSampleRate);
        }
        let channel_names = if channel_names.len() == channel_count
            && channel_names.iter().all(|n| !n.trim().is_empty())
        {
            channel_names
        } else {
            default_channel_names(channel_count)
        };
        Ok(Self {
            nominal_rate_hz,
            channel_count,
            channel_names,
        })
    }
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names.iter().position(|n| n == name)
    }
}
fn default_channel_names(channel_count: usize) -> Vec<String> {
    (0..channel_count)
        .map(|i| match DEFAULT_CHANNEL_NAMES.get(i) {
            Some(name) => (*name).to_string(),
            None => format!("Ch{i}"),
        })
        .collect()
}
/// Something that yields chunks of multichannel samples without blocking.
///
/// `pull_chunk` returns an empty vector when nothing is ready; it only fails
/// when the underlying transport is gone (`SourceDisconnected`) or hands back
/// malformed data.
pub trait SampleSource {
    fn info(&self) -> &StreamInfo;
    fn pull_chunk(
        &mut self,
        timeout: Duration,
        max_samples: usize,
    ) -> Result<Vec<Sample>, NeuroStateError>;
}
/// Locates a stream of a given type. Adapters for concrete transports
/// implement this; [`discover`] adds the bounded wait.
pub trait StreamResolver {
    type Source: SampleSource;
    fn resolve(&mut self, stream_type: &str) -> Result<Option<Self::Source>, NeuroStateError>;
}
/// Polls `resolver` until it finds a stream or `timeout` elapses.
pub fn discover<R: StreamResolver>(
    resolver: &mut R,
    stream_type: &str,
    timeout: Duration,
    retry_interval: Duration,
) -> Result<R::Source, NeuroStateError> {
    info!("looking for a `{stream_type}` stream");
    let started = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if let Some(source) = resolver.resolve(stream_type)? {
            let info = source.info();
            info!(
                "found `{stream_type}` stream: {} channels at {} Hz ({:?})",
                info.channel_count, info.nominal_rate_hz, info.channel_names
            );
            return Ok(source);
        }
        let waited = started.elapsed();
        if waited >= timeout {
            return Err(NeuroStateError::NoStreamFound {
                stream_type: stream_type.to_string(),
                waited,
            });
        }
        debug!("no `{stream_type}` stream yet (attempt {attempts}), retrying");
        thread::sleep(retry_interval.min(timeout - waited));
    }
}
/// In-memory source useful for tests and deterministic playback.
///
/// Each pull pops one queued entry; an exhausted queue yields empty chunks.
pub struct ManualSource {
    info: StreamInfo,
    queue: VecDeque<Result<Vec<Sample>, NeuroStateError>>,
}
impl ManualSource {
    pub fn new(info: StreamInfo, chunks: impl IntoIterator<Item = Vec<Sample>>) -> Self {
        Self {
            info,
            queue: chunks.into_iter().map(Ok).collect(),
        }
    }
    pub fn push_chunk(&mut self, chunk: Vec<Sample>) {
        self.queue.push_back(Ok(chunk));
    }
    /// Queues a transport failure for the next pull.
    pub fn push_disconnect(&mut self, reason: &str) {
        self.queue
            .push_back(Err(NeuroStateError::SourceDisconnected(reason.to_string())));
    }
}
impl SampleSource for ManualSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }
    fn pull_chunk(
        &mut self,
        _timeout: Duration,
        max_samples: usize,
    ) -> Result<Vec<Sample>, NeuroStateError> {
        match self.queue.pop_front() {
            Some(Ok(mut chunk)) => {
                if chunk.len() > max_samples {
                    let rest = chunk.split_off(max_samples);
                    self.queue.push_front(Ok(rest));
                }
                Ok(chunk)
            }
            Some(Err(err)) => Err(err),
            None => Ok(Vec::new()),
        }
    }
}
/// Synthetic headset stream paced by the wall clock.
///
/// Every channel but the last carries a theta/alpha/beta mixture whose
/// dominant rhythm rotates every 15 seconds; the last channel is pure noise,
/// standing in for an auxiliary input.
pub struct SimulatedSource {
    info: StreamInfo,
    rng: StdRng,
    started: Instant,
    emitted: u64,
}
const RHYTHM_PHASE_SECS: f64 = 15.0;
impl SimulatedSource {
    pub fn new(info: StreamInfo, seed: u64) -> Self {
        Self {
            info,
            rng: StdRng::seed_from_u64(seed),
            started: Instant::now(),
            emitted: 0,
        }
    }
    /// Generates the next `count` samples regardless of the wall clock.
    pub fn generate(&mut self, count: usize) -> Vec<Sample> {
        (0..count).map(|_| self.next_sample()).collect()
    }
    fn next_sample(&mut self) -> Sample {
        let t = self.emitted as f64 / self.info.nominal_rate_hz;
        self.emitted += 1;
        let (theta, alpha, beta) = rhythm_amplitudes(t);
        let aux_index = self.info.channel_count.saturating_sub(1);
        let values = (0..self.info.channel_count)
            .map(|ch| {
                let noise: f64 = self.rng.gen_range(-1.0..1.0);
                if ch == aux_index && self.info.channel_count > 1 {
                    return 5.0 * noise;
                }
                let phase = ch as f64 * 0.7;
                theta * (TAU * 6.0 * t + phase).sin()
                    + alpha * (TAU * 10.0 * t + phase).sin()
                    + beta * (TAU * 20.0 * t + phase).sin()
                    + 2.0 * noise
            })
            .collect();
        Sample::new(values, t)
    }
}
/// (theta, alpha, beta) amplitudes in microvolts for time `t`.
fn rhythm_amplitudes(t: f64) -> (f64, f64, f64) {
    match ((t / RHYTHM_PHASE_SECS) as u64) % 4 {
        0 => (8.0, 30.0, 6.0),
        1 => (5.0, 6.0, 25.0),
        2 => (40.0, 8.0, 5.0),
        _ => (10.0, 12.0, 10.0),
    }
}
impl SampleSource for SimulatedSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }
    fn pull_chunk(
        &mut self,
        _timeout: Duration,
        max_samples: usize,
    ) -> Result<Vec<Sample>, NeuroStateError> {
        let due = (self.started.elapsed().as_secs_f64() * self.info.nominal_rate_hz) as u64;
        let pending = due.saturating_sub(self.emitted).min(max_samples as u64) as usize;
        Ok(self.generate(pending))
    }
}
/// Resolver that serves a [`SimulatedSource`] for one stream type.
pub struct SimulatedResolver {
    stream_type: String,
    info: StreamInfo,
    seed: u64,
}
impl SimulatedResolver {
    pub fn new(stream_type: &str, info: StreamInfo, seed: u64) -> Self {
        Self {
            stream_type: stream_type.to_string(),
            info,
            seed,
        }
    }
}
impl StreamResolver for SimulatedResolver {
    type Source = SimulatedSource;
    fn resolve(&mut self, stream_type: &str) -> Result<Option<SimulatedSource>, NeuroStateError> {
        if stream_type.eq_ignore_ascii_case(&self.stream_type) {
            Ok(Some(SimulatedSource::new(self.info.clone(), self.seed)))
        } else {
            Ok(None)
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn muse_info() -> StreamInfo {
        StreamInfo::new(256.0, 5, Vec::new()).unwrap()
    }
    #[test]
    fn stream_info_falls_back_to_default_names() {
        let info = muse_info();
        assert_eq!(info.channel_names, DEFAULT_CHANNEL_NAMES.map(String::from).to_vec());
        let wide = StreamInfo::new(250.0, 7, vec!["only".into()]).unwrap();
        assert_eq!(wide.channel_names[4], "Right AUX");
        assert_eq!(wide.channel_names[6], "Ch6");
        let named = StreamInfo::new(250.0, 2, vec!["Fz".into(), "Cz".into()]).unwrap();
        assert_eq!(named.channel_index("Cz"), Some(1));
    }
    #[test]
    fn stream_info_rejects_bad_rate() {
        assert!(matches!(
            StreamInfo::new(0.0, 4, Vec::new()),
            Err(NeuroStateError::InvalidSampleRate)
        ));
    }
    #[test]
    fn validate_chunk_checks_shape() {
        let good = vec![Sample::new(vec![0.0; 3], 0.0)];
        let bad = vec![Sample::new(vec![0.0; 3], 0.0), Sample::new(vec![0.0; 2], 0.1)];
        assert!(validate_chunk(&good, 3).is_ok());
        assert!(validate_chunk(&bad, 3).unwrap_err().is_invalid_input());
        assert!(validate_chunk(&[], 3).is_ok());
        for reading in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let chunk = vec![Sample::new(vec![1.0, reading, 2.0], 0.5)];
            let err = validate_chunk(&chunk, 3).unwrap_err();
            assert!(matches!(err, NeuroStateError::InvalidInput(_)));
        }
    }
    #[test]
    fn manual_source_splits_oversized_chunks() {
        let chunk: Vec<Sample> = (0..10)
            .map(|i| Sample::new(vec![i as f64; 5], i as f64))
            .collect();
        let mut source = ManualSource::new(muse_info(), vec![chunk]);
        source.push_disconnect("unplugged");
        let first = source.pull_chunk(Duration::ZERO, 4).unwrap();
        assert_eq!(first.len(), 4);
        let second = source.pull_chunk(Duration::ZERO, 100).unwrap();
        assert_eq!(second.len(), 6);
        assert_eq!(second[0].timestamp, 4.0);
        assert!(matches!(
            source.pull_chunk(Duration::ZERO, 100),
            Err(NeuroStateError::SourceDisconnected(_))
        ));
        assert!(source.pull_chunk(Duration::ZERO, 100).unwrap().is_empty());
    }
    #[test]
    fn simulated_source_is_seeded_and_shaped() {
        let mut a = SimulatedSource::new(muse_info(), 7);
        let mut b = SimulatedSource::new(muse_info(), 7);
        let chunk_a = a.generate(32);
        let chunk_b = b.generate(32);
        assert_eq!(chunk_a, chunk_b);
        assert!(chunk_a.iter().all(|s| s.num_channels() == 5));
        assert!((chunk_a[1].timestamp - 1.0 / 256.0).abs() < 1e-12);
    }
    #[test]
    fn discover_finds_matching_stream() {
        let mut resolver = SimulatedResolver::new("EEG", muse_info(), 1);
        let source = discover(
            &mut resolver,
            "eeg",
            Duration::from_millis(10),
            Duration::from_millis(1),
        )
        .unwrap();
        assert_eq!(source.info().channel_count, 5);
    }
    #[test]
    fn discover_times_out() {
        let mut resolver = SimulatedResolver::new("EEG", muse_info(), 1);
        let err = discover(
            &mut resolver,
            "PPG",
            Duration::from_millis(5),
            Duration::from_millis(1),
        )
        .err()
        .unwrap();
        match err {
            NeuroStateError::NoStreamFound {
                stream_type,
                waited,
            } => {
                assert_eq!(stream_type, "PPG");
                assert!(waited >= Duration::from_millis(5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
