//! Run statistics and final summary.

use std::path::PathBuf;
use std::time::Duration;

use observability::MetricsSummary;
use recorder::StopReason;

/// Statistics from a recorder run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Telemetry source name
    pub source: String,

    /// Why the loop ended (None = fatal error)
    pub stop: Option<StopReason>,

    /// Completed sampling periods
    pub samples: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Every segment file opened, in order
    pub segment_paths: Vec<PathBuf>,

    /// Aggregated recorder metrics
    pub metrics: MetricsSummary,
}

impl RunStats {
    /// Achieved sampling rate
    pub fn sample_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.samples as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of periods spent recording, as percentage
    pub fn recording_ratio(&self) -> f64 {
        if self.samples > 0 {
            (self.metrics.recording_samples as f64 / self.samples as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let m = &self.metrics;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Recording Summary                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Source: {}", self.source);
        match self.stop {
            Some(StopReason::Interrupted) => println!("   ├─ Stopped by: interrupt"),
            Some(StopReason::SampleLimit) => println!("   ├─ Stopped by: sample limit"),
            None => println!("   ├─ Stopped by: fatal error"),
        }
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Samples: {}", self.samples);
        println!("   ├─ Sample rate: {:.2} Hz", self.sample_rate());
        println!(
            "   └─ Recording: {} samples ({:.1}%)",
            m.recording_samples,
            self.recording_ratio()
        );

        println!("\nOutput");
        println!("   ├─ Sessions: {}", m.sessions);
        println!("   ├─ Segments: {} ({} rotations)", m.segments, m.rotations);
        println!("   ├─ Rows written: {}", m.rows_written);
        println!("   └─ Bytes written: {}", m.bytes_written);

        println!("\nHealth");
        println!("   ├─ Placeholder cells: {}", m.placeholder_cells);
        println!("   ├─ State read failures: {}", m.state_read_failures);
        println!("   ├─ Segment failures: {}", m.segment_failures);
        println!("   └─ Iteration work (ms): {}", m.work_ms);

        if !m.placeholder_counts.is_empty() {
            let mut counts: Vec<_> = m.placeholder_counts.iter().collect();
            counts.sort();
            println!("\nPlaceholder cells by variable");
            for (variable, count) in counts {
                println!("   ├─ {}: {}", variable, count);
            }
        }

        if !self.segment_paths.is_empty() {
            println!("\nSegments");
            for path in &self.segment_paths {
                println!("   ├─ {}", path.display());
            }
        }

        println!();
    }
}
