use std::time::Duration;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum NeuroStateError {
    #[error("no `{stream_type}` stream found after waiting {waited:?}")]
    NoStreamFound {
        stream_type: String,
        waited: Duration,
    },
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("sample source disconnected: {0}")]
    SourceDisconnected(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("report sink closed")]
    SinkClosed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
impl NeuroStateError {
    /// Malformed chunk errors: the chunk is dropped and the tick skipped.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            NeuroStateError::ChannelMismatch { .. } | NeuroStateError::InvalidInput(_)
        )
    }
}
