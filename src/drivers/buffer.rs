use std::collections::VecDeque;
use crate::drivers::source::{validate_chunk, Sample};
use crate::drivers::NeuroStateError;
/// Largest window, in samples per channel.
pub const MAX_WINDOW_SAMPLES: usize = 1 << 22;
/// Fixed-length rolling window of the most recent samples per channel.
///
/// The window is zero-filled at construction and never changes length: every
/// appended sample evicts the oldest one.
pub struct RingBuffer {
    per_channel: Vec<VecDeque<f64>>, // channel -> samples, oldest first
    capacity: usize,
    samples_seen: u64,
}
impl RingBuffer {
    pub fn with_window_seconds(
        channel_count: usize,
        sample_rate_hz: f64,
        window_seconds: f64,
    ) -> Result<Self, NeuroStateError> {
        if sample_rate_hz.is_nan() || sample_rate_hz <= 0.0 {
            return Err(NeuroStateError::InvalidSampleRate);
        }
        let samples = (sample_rate_hz * window_seconds).round();
        if samples.is_nan() || samples < 1.0 {
            return Err(NeuroStateError::InvalidConfig(format!(
                "a {window_seconds}s window at {sample_rate_hz} Hz holds no samples"
            )));
        }
        if samples > MAX_WINDOW_SAMPLES as f64 {
            return Err(NeuroStateError::InvalidConfig(format!(
                "a {window_seconds}s window at {sample_rate_hz} Hz exceeds {MAX_WINDOW_SAMPLES} samples"
            )));
        }
        let capacity = samples as usize;
        if channel_count == 0 {
            return Err(NeuroStateError::InvalidConfig(
                "ring buffer needs at least one channel".into(),
            ));
        }
        let per_channel = (0..channel_count)
            .map(|_| VecDeque::from(vec![0.0; capacity]))
            .collect();
        Ok(Self {
            per_channel,
            capacity,
            samples_seen: 0,
        })
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    /// Whether at least `capacity` real samples have been written since the
    /// last reset.
    pub fn is_filled(&self) -> bool {
        self.samples_seen >= self.capacity as u64
    }
    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }
    /// Appends a chunk. The whole chunk is validated first, so a malformed
    /// chunk leaves the buffer untouched.
    pub fn append(&mut self, chunk: &[Sample]) -> Result<(), NeuroStateError> {
        validate_chunk(chunk, self.per_channel.len())?;
        let skip = chunk.len().saturating_sub(self.capacity);
        for sample in &chunk[skip..] {
            for (channel_queue, &value) in self.per_channel.iter_mut().zip(&sample.values) {
                channel_queue.pop_front();
                channel_queue.push_back(value);
            }
        }
        self.samples_seen += chunk.len() as u64;
        Ok(())
    }
    /// Current window for one channel, oldest sample first. Always
    /// `capacity` long.
    pub fn snapshot(&self, channel: usize) -> Result<Vec<f64>, NeuroStateError> {
        let queue = self.per_channel.get(channel).ok_or_else(|| {
            NeuroStateError::InvalidInput(format!(
                "channel {channel} out of range ({} channels)",
                self.per_channel.len()
            ))
        })?;
        Ok(queue.iter().copied().collect())
    }
    /// Zeroes the window and forgets the fill state.
    pub fn reset(&mut self) {
        for queue in &mut self.per_channel {
            queue.iter_mut().for_each(|v| *v = 0.0);
        }
        self.samples_seen = 0;
    }
}
