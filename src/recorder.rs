use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use chrono::Local;
use log::info;
use crate::drivers::Sample;
/// CSV sink for raw samples: one header row of channel names plus
/// `timestamp`, then one row per sample.
pub struct DataRecorder {
    output_dir: PathBuf,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    channel_count: usize,
    rows_written: u64,
}
impl DataRecorder {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            writer: None,
            path: None,
            channel_count: 0,
            rows_written: 0,
        }
    }
    /// Opens a new file named after `label` and the local time. A recording
    /// already in progress is finished first.
    pub fn start(&mut self, label: &str, channel_names: &[String]) -> io::Result<PathBuf> {
        self.stop()?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .output_dir
            .join(format!("eeg_recording_{label}_{stamp}.csv"));
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "{},timestamp", channel_names.join(","))?;
        self.writer = Some(w);
        self.path = Some(path.clone());
        self.channel_count = channel_names.len();
        self.rows_written = 0;
        info!("recording started: {}", path.display());
        Ok(path)
    }
    pub fn write_chunk(&mut self, chunk: &[Sample]) -> io::Result<()> {
        let Some(w) = &mut self.writer else {
            return Ok(());
        };
        for sample in chunk {
            for value in sample.values.iter().take(self.channel_count) {
                write!(w, "{value},")?;
            }
            writeln!(w, "{}", sample.timestamp)?;
            self.rows_written += 1;
        }
        Ok(())
    }
    /// Flushes and closes the current file, if any.
    pub fn stop(&mut self) -> io::Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
            if let Some(path) = self.path.take() {
                info!(
                    "recording saved: {} ({} rows)",
                    path.display(),
                    self.rows_written
                );
            }
        }
        Ok(())
    }
    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}
impl Drop for DataRecorder {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = DataRecorder::new(dir.path());
        assert!(!recorder.is_recording());
        recorder.write_chunk(&[Sample::new(vec![9.0], 0.0)]).unwrap();
        let names = vec!["TP9".to_string(), "AF7".to_string()];
        let path = recorder.start("focus", &names).unwrap();
        assert!(recorder.is_recording());
        recorder
            .write_chunk(&[
                Sample::new(vec![1.5, -2.0], 10.0),
                Sample::new(vec![3.0, 4.25], 10.5),
            ])
            .unwrap();
        assert_eq!(recorder.rows_written(), 2);
        recorder.stop().unwrap();
        assert!(!recorder.is_recording());
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["TP9,AF7,timestamp", "1.5,-2,10", "3,4.25,10.5"]);
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("eeg_recording_focus_"));
    }
}
