//! 状态行输出
//!
//! 每隔若干周期输出一行可读的录制状态。状态行只用于展示，不影响控制流程。

use std::fmt;
use std::io::Write;
use std::time::Duration;

use contracts::{RuntimeState, BYTES_PER_MB};
use tracing::debug;

/// 状态行输出方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusOutput {
    /// 终端上用 `\r` 原地刷新的单行
    Terminal,
    /// 作为 `debug!` 事件输出
    #[default]
    Log,
    /// 不输出
    Off,
}

/// 当前段文件信息
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStatus {
    pub file_name: String,
    pub size_bytes: u64,
    pub elapsed: Duration,
}

/// 一行状态
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    /// 已完成的采样周期数
    pub samples: u64,
    /// 最近一次观测到的程序状态
    pub last_state: Option<RuntimeState>,
    /// 录制中的段文件 (等待时为 None)
    pub segment: Option<SegmentStatus>,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observed = match self.last_state {
            Some(state) => state.to_string(),
            None => "UNKNOWN".to_string(),
        };

        match &self.segment {
            Some(segment) => {
                let secs = segment.elapsed.as_secs();
                write!(
                    f,
                    "Samples: {} | State: RECORDING ({}) | File: {} | Size: {:.2} MB | Elapsed: {:02}:{:02}:{:02}",
                    self.samples,
                    observed,
                    segment.file_name,
                    segment.size_bytes as f64 / BYTES_PER_MB,
                    secs / 3600,
                    (secs / 60) % 60,
                    secs % 60
                )
            }
            None => write!(
                f,
                "Samples: {} | State: WAITING ({})",
                self.samples, observed
            ),
        }
    }
}

/// 状态行输出器
#[derive(Debug)]
pub struct StatusReporter {
    output: StatusOutput,
    every: u64,
    /// 终端上是否有未换行的状态行
    line_open: bool,
}

impl StatusReporter {
    /// `every` 为 0 时不输出
    pub fn new(output: StatusOutput, every: u64) -> Self {
        Self {
            output,
            every,
            line_open: false,
        }
    }

    /// 第 `samples` 个周期后是否该输出
    pub fn is_due(&self, samples: u64) -> bool {
        self.output != StatusOutput::Off && self.every > 0 && samples % self.every == 0
    }

    /// 输出一行
    pub fn emit(&mut self, line: &StatusLine) {
        match self.output {
            StatusOutput::Terminal => {
                let mut stdout = std::io::stdout().lock();
                // 状态行写失败不影响录制
                let _ = write!(stdout, "\r{line}\x1b[K");
                let _ = stdout.flush();
                self.line_open = true;
            }
            StatusOutput::Log => debug!(status = %line, "Recorder status"),
            StatusOutput::Off => {}
        }
    }

    /// 结束终端上的状态行，使后续输出从新行开始
    pub fn finish(&mut self) {
        if std::mem::take(&mut self.line_open) {
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_line() {
        let line = StatusLine {
            samples: 250,
            last_state: Some(RuntimeState::Stopped),
            segment: None,
        };
        assert_eq!(line.to_string(), "Samples: 250 | State: WAITING (STOPPED)");
    }

    #[test]
    fn test_recording_line() {
        let line = StatusLine {
            samples: 1200,
            last_state: Some(RuntimeState::Playing),
            segment: Some(SegmentStatus {
                file_name: "robot_data_2025-03-14_09-26-53_001.csv".to_string(),
                size_bytes: 1024 * 1024 / 2,
                elapsed: Duration::from_secs(3725),
            }),
        };
        assert_eq!(
            line.to_string(),
            "Samples: 1200 | State: RECORDING (PLAYING) | \
             File: robot_data_2025-03-14_09-26-53_001.csv | Size: 0.50 MB | Elapsed: 01:02:05"
        );
    }

    #[test]
    fn test_due_cadence() {
        let reporter = StatusReporter::new(StatusOutput::Log, 10);
        assert!(reporter.is_due(10));
        assert!(!reporter.is_due(11));

        assert!(!StatusReporter::new(StatusOutput::Log, 0).is_due(10));
        assert!(!StatusReporter::new(StatusOutput::Off, 10).is_due(10));
    }
}
