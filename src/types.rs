// src/types.rs
use crate::drivers::StateReport;
// 后台监测线程发给前台的消息
#[derive(Clone, Debug)]
pub enum MonitorMessage {
    Log(String),
    Status(bool),          // 连接状态
    RecordingStatus(bool), // 录制状态
    Report(Box<StateReport>),
    // 线程结束；出错时附带原因
    Stopped(Option<String>),
}
