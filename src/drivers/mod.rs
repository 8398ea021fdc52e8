// src/drivers/mod.rs
// 信号处理各阶段：采集 -> 缓冲 -> 频谱 -> 分类 -> 平滑
pub mod buffer;
pub mod classifier;
pub mod control;
pub mod error;
pub mod fft;
pub mod pipeline;
pub mod quality;
pub mod smoother;
pub mod source;
// 公开导出常用类型，方便外部调用
pub use buffer::RingBuffer;
pub use classifier::{
    AlertLevel, Alertness, BrainState, ClassificationResult, ClassifierThresholds,
    CognitiveState, Diagnostics, Fatigue, Focus, StateClassifier, Stress,
};
pub use control::{CancellationToken, RecordingSwitch};
pub use error::NeuroStateError;
pub use fft::{Band, BandPowers, BandRatios, SpectralEstimator, SpectralMethod, WindowFunction};
pub use pipeline::{
    ChannelExclusion, ChannelReport, PipelinePhase, ReportSink, StatePipeline, StateReport,
    WarmupPolicy,
};
pub use quality::{ChannelStats, SignalQuality};
pub use smoother::TemporalSmoother;
pub use source::{
    discover, ManualSource, Sample, SampleSource, SimulatedResolver, SimulatedSource, StreamInfo,
    StreamResolver,
};
