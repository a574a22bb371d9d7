//! Telemetry sampling and statistical aggregation.

use crate::logging::{StatSummary, TelemetryEvent};
use chrono::Utc;
use std::time::Instant;

/// Accumulates telemetry samples and computes statistics.
pub struct TelemetryAggregator {
    ber_samples: Vec<f64>,
    correlation_samples: Vec<f64>,

    last_sample_time: Instant,
    total_frames: usize,
    current_sync_locked: bool,

    sample_interval_secs: f64,
}

impl TelemetryAggregator {
    pub fn new(sample_interval_secs: f64) -> Self {
        Self {
            ber_samples: Vec::new(),
            correlation_samples: Vec::new(),
            last_sample_time: Instant::now(),
            total_frames: 0,
            current_sync_locked: false,
            sample_interval_secs,
        }
    }

    pub fn update(&mut self, ber: f64, sync_correlation: f64, frames_decoded: usize, sync_locked: bool) {
        self.total_frames = frames_decoded;
        self.current_sync_locked = sync_locked;

        self.ber_samples.push(ber);
        self.correlation_samples.push(sync_correlation);
    }

    pub fn should_sample(&self) -> bool {
        self.last_sample_time.elapsed().as_secs_f64() >= self.sample_interval_secs
    }

    pub fn sample(&mut self) -> Option<TelemetryEvent> {
        if !self.should_sample() {
            return None;
        }

        let ber = self.mean(&self.ber_samples).unwrap_or(0.0);
        let sync_correlation = self.mean(&self.correlation_samples).unwrap_or(0.0);

        let event = TelemetryEvent {
            timestamp: Utc::now(),
            ber,
            sync_correlation,
            frames_decoded: self.total_frames,
            sync_locked: self.current_sync_locked,
        };

        self.last_sample_time = Instant::now();

        Some(event)
    }

    pub fn compute_statistics(&self) -> (StatSummary, StatSummary) {
        (
            self.compute_stat_summary(&self.ber_samples),
            self.compute_stat_summary(&self.correlation_samples),
        )
    }

    fn compute_stat_summary(&self, samples: &[f64]) -> StatSummary {
        if samples.is_empty() {
            return StatSummary {
                mean: 0.0,
                stddev: 0.0,
                min: 0.0,
                max: 0.0,
                samples: 0,
            };
        }

        let mean = self.mean(samples).unwrap_or(0.0);
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        let stddev = variance.sqrt();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        StatSummary {
            mean,
            stddev,
            min,
            max,
            samples: samples.len(),
        }
    }

    fn mean(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }
}
