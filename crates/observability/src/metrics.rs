//! 录制指标收集模块
//!
//! 基于 IterationReport / SessionEvent 收集和统计录制循环的运行指标。

use std::collections::HashMap;

use contracts::{IterationReport, RotationReason, SessionEvent};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 为导出的录制指标注册描述和单位
pub fn describe_recorder_metrics() {
    describe_counter!("rtde_recorder_samples_total", "Sampling periods completed");
    describe_histogram!(
        "rtde_recorder_iteration_work_ms",
        Unit::Milliseconds,
        "Work done inside one sampling period"
    );
    describe_gauge!("rtde_recorder_recording", "1 while a segment is open");
    describe_gauge!(
        "rtde_recorder_runtime_state",
        "Last observed runtime state code"
    );
    describe_counter!(
        "rtde_recorder_state_read_failures_total",
        "Runtime state reads that failed"
    );
    describe_counter!("rtde_recorder_rows_written_total", "CSV data rows written");
    describe_counter!(
        "rtde_recorder_bytes_written_total",
        Unit::Bytes,
        "Bytes written to segment files"
    );
    describe_counter!(
        "rtde_recorder_placeholder_cells_total",
        "Cells written as placeholders after a failed read"
    );
    describe_counter!("rtde_recorder_sessions_total", "Recording sessions started");
    describe_counter!("rtde_recorder_segments_total", "Segment files opened");
    describe_counter!("rtde_recorder_rotations_total", "Segment rotations by reason");
    describe_counter!(
        "rtde_recorder_segment_failures_total",
        "Segments abandoned after an I/O failure"
    );
}

/// 从 IterationReport 记录指标
///
/// 每个采样周期结束时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_iteration;
///
/// let report = controller.step().await?;
/// record_iteration(&report);
/// ```
pub fn record_iteration(report: &IterationReport) {
    // 采样计数器
    counter!("rtde_recorder_samples_total").increment(1);

    // 周期内工作耗时
    histogram!("rtde_recorder_iteration_work_ms").record(report.work_ms);

    // 录制状态
    gauge!("rtde_recorder_recording").set(if report.recording { 1.0 } else { 0.0 });

    // 最近一次观测到的程序状态
    if let Some(state) = report.observed_state {
        gauge!("rtde_recorder_runtime_state").set(f64::from(state.code()));
    }

    if report.state_read_failed {
        counter!("rtde_recorder_state_read_failures_total").increment(1);
    }

    if let Some(bytes) = report.row_bytes {
        counter!("rtde_recorder_rows_written_total").increment(1);
        counter!("rtde_recorder_bytes_written_total").increment(bytes as u64);
    }

    // 占位符替换
    for (variable, cells) in &report.placeholders {
        counter!(
            "rtde_recorder_placeholder_cells_total",
            "variable" => variable.clone()
        )
        .increment(*cells as u64);
    }
}

/// 记录会话事件
pub fn record_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::Started { .. } => {
            counter!("rtde_recorder_sessions_total").increment(1);
            counter!("rtde_recorder_segments_total").increment(1);
        }
        SessionEvent::Rotated { reason, .. } => {
            record_rotation(*reason);
            counter!("rtde_recorder_segments_total").increment(1);
        }
        SessionEvent::Stopped { .. } => {}
        SessionEvent::SegmentFailed { .. } => {
            counter!("rtde_recorder_segment_failures_total").increment(1);
        }
    }
}

/// 记录段轮转
pub fn record_rotation(reason: RotationReason) {
    counter!(
        "rtde_recorder_rotations_total",
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// 录制指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RecorderMetricsAggregator {
    /// 总采样周期数
    pub total_samples: u64,

    /// 录制中的周期数
    pub recording_samples: u64,

    /// 写入的数据行数
    pub rows_written: u64,

    /// 写入的数据字节数
    pub bytes_written: u64,

    /// 占位符单元格总数
    pub placeholder_cells: u64,

    /// 会话数
    pub sessions: u64,

    /// 段文件数
    pub segments: u64,

    /// 段文件故障数
    pub segment_failures: u64,

    /// 状态读取失败数
    pub state_read_failures: u64,

    /// 周期工作耗时统计
    pub work_stats: RunningStats,

    /// 各原因轮转次数
    pub rotations: HashMap<RotationReason, u64>,

    /// 各变量占位符单元格数
    pub placeholder_counts: HashMap<String, u64>,
}

impl RecorderMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新周期统计
    pub fn update(&mut self, report: &IterationReport) {
        self.total_samples += 1;
        self.work_stats.push(report.work_ms);

        if report.recording {
            self.recording_samples += 1;
        }
        if report.state_read_failed {
            self.state_read_failures += 1;
        }
        if let Some(bytes) = report.row_bytes {
            self.rows_written += 1;
            self.bytes_written += bytes as u64;
        }

        for (variable, cells) in &report.placeholders {
            self.placeholder_cells += *cells as u64;
            *self.placeholder_counts.entry(variable.clone()).or_insert(0) += *cells as u64;
        }
    }

    /// 更新会话统计
    pub fn on_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Started { .. } => {
                self.sessions += 1;
                self.segments += 1;
            }
            SessionEvent::Rotated { reason, .. } => {
                self.segments += 1;
                *self.rotations.entry(*reason).or_insert(0) += 1;
            }
            SessionEvent::Stopped { .. } => {}
            SessionEvent::SegmentFailed { .. } => self.segment_failures += 1,
        }
    }

    /// 总轮转次数
    pub fn total_rotations(&self) -> u64 {
        self.rotations.values().sum()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_samples: self.total_samples,
            recording_samples: self.recording_samples,
            rows_written: self.rows_written,
            bytes_written: self.bytes_written,
            placeholder_cells: self.placeholder_cells,
            sessions: self.sessions,
            segments: self.segments,
            rotations: self.total_rotations(),
            segment_failures: self.segment_failures,
            state_read_failures: self.state_read_failures,
            work_ms: StatsSummary::from(&self.work_stats),
            placeholder_counts: self.placeholder_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_samples: u64,
    pub recording_samples: u64,
    pub rows_written: u64,
    pub bytes_written: u64,
    pub placeholder_cells: u64,
    pub sessions: u64,
    pub segments: u64,
    pub rotations: u64,
    pub segment_failures: u64,
    pub state_read_failures: u64,
    pub work_ms: StatsSummary,
    pub placeholder_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Recording Summary ===")?;
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(f, "Recording samples: {}", self.recording_samples)?;
        writeln!(
            f,
            "Rows written: {} ({} bytes)",
            self.rows_written, self.bytes_written
        )?;
        writeln!(
            f,
            "Sessions: {}, segments: {}, rotations: {}",
            self.sessions, self.segments, self.rotations
        )?;
        writeln!(f, "Placeholder cells: {}", self.placeholder_cells)?;
        writeln!(f, "State read failures: {}", self.state_read_failures)?;
        writeln!(f, "Segment failures: {}", self.segment_failures)?;
        writeln!(f, "Iteration work (ms): {}", self.work_ms)?;

        if !self.placeholder_counts.is_empty() {
            let mut counts: Vec<_> = self.placeholder_counts.iter().collect();
            counts.sort();
            writeln!(f, "Placeholder cells by variable:")?;
            for (variable, count) in counts {
                writeln!(f, "  {}: {}", variable, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
