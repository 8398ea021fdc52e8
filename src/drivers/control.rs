use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
/// Cooperative stop signal, checked once per loop iteration.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);
impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
/// Externally owned "recording active" flag.
#[derive(Clone, Debug, Default)]
pub struct RecordingSwitch(Arc<AtomicBool>);
impl RecordingSwitch {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }
    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::SeqCst);
    }
    /// Flips the flag and returns the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
