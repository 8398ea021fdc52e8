// src/engine.rs
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use log::{error, info};
use crate::drivers::{
    CancellationToken, NeuroStateError, ReportSink, SampleSource, StatePipeline, StateReport,
};
use crate::types::MonitorMessage;
impl ReportSink for Sender<MonitorMessage> {
    fn emit(&mut self, report: StateReport) -> Result<(), NeuroStateError> {
        send(self, MonitorMessage::Report(Box::new(report)))
    }
    fn connection_changed(&mut self, connected: bool) -> Result<(), NeuroStateError> {
        send(self, MonitorMessage::Status(connected))
    }
    fn recording_changed(&mut self, recording: bool) -> Result<(), NeuroStateError> {
        send(self, MonitorMessage::RecordingStatus(recording))
    }
}
fn send(tx: &Sender<MonitorMessage>, msg: MonitorMessage) -> Result<(), NeuroStateError> {
    tx.send(msg).map_err(|_| NeuroStateError::SinkClosed)
}
/// Runs `pipeline` on a background thread until `cancel` is set, the
/// receiver hangs up or the pipeline fails. Connection and recording
/// changes are reported alongside the state reports.
pub fn spawn_monitor<S>(
    mut pipeline: StatePipeline<S>,
    cancel: CancellationToken,
    tx: Sender<MonitorMessage>,
) -> JoinHandle<Result<(), NeuroStateError>>
where
    S: SampleSource + Send + 'static,
{
    thread::spawn(move || {
        let outcome = monitor(&mut pipeline, &cancel, &tx);
        // run() 已经停过一次；这里覆盖开始前就失败的情况
        pipeline.stop();
        let reason = outcome.as_ref().err().map(|e| e.to_string());
        match &reason {
            Some(reason) => error!("monitor stopped: {reason}"),
            None => info!("monitor stopped"),
        }
        // 接收端可能已经退出
        tx.send(MonitorMessage::Stopped(reason)).ok();
        outcome
    })
}
fn monitor<S: SampleSource>(
    pipeline: &mut StatePipeline<S>,
    cancel: &CancellationToken,
    tx: &Sender<MonitorMessage>,
) -> Result<(), NeuroStateError> {
    send(
        tx,
        MonitorMessage::Log(format!(
            "monitoring {} channels at {} Hz",
            pipeline.info().channel_count,
            pipeline.info().nominal_rate_hz
        )),
    )?;
    send(tx, MonitorMessage::Status(pipeline.is_connected()))?;
    pipeline.run(cancel, &mut tx.clone())
}
