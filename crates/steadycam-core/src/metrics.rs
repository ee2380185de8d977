use serde::{Deserialize, Serialize};

/// Per-engine processing telemetry, polled by the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// `process_frame` calls handled since the last reset.
    pub frame_count: u64,
    /// Frames that received a stabilizing warp.
    pub stabilized_frames: u64,
    /// Running mean of per-frame processing time (milliseconds).
    pub avg_processing_time_ms: f64,
    pub last_processing_time_ms: f64,
    /// Points that survived the most recent tracking step.
    pub tracked_features: usize,
}

impl PerformanceMetrics {
    pub fn record(&mut self, elapsed_ms: f64) {
        self.frame_count += 1;
        self.last_processing_time_ms = elapsed_ms;
        self.avg_processing_time_ms +=
            (elapsed_ms - self.avg_processing_time_ms) / self.frame_count as f64;
    }

    /// Frames per second implied by the average processing time.
    pub fn throughput_fps(&self) -> f64 {
        if self.avg_processing_time_ms > 0.0 {
            1000.0 / self.avg_processing_time_ms
        } else {
            0.0
        }
    }
}
