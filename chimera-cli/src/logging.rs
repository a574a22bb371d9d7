//! Structured logging for telemetry and frame analysis.

use crate::config::{LogFormat, LogTarget, LoggingConfig};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Structured log event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    Telemetry(TelemetryEvent),
    FrameDecode(FrameDecodeEvent),
    Statistics(StatisticsEvent),
    Info { message: String },
    Warn { message: String },
    Error { message: String, details: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    pub ber: f64,
    pub sync_correlation: f64,
    pub frames_decoded: usize,
    pub sync_locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDecodeEvent {
    pub timestamp: DateTime<Utc>,
    pub frame_index: usize,
    pub hex_dump: FrameHexDump,
    pub decoded: DecodedFrame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameHexDump {
    pub header_byte: String,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedFrame {
    pub sequence_number: u8,
    pub frame_type: u8,
    pub status: String,
    pub ldpc_converged: bool,
    pub ldpc_iterations: usize,
    pub payload_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsEvent {
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub ber: StatSummary,
    pub sync_correlation: StatSummary,
    pub total_frames: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

/// Logger that outputs structured logs.
pub struct StructuredLogger {
    config: LoggingConfig,
    writer: Box<dyn Write + Send>,
    start_time: DateTime<Utc>,
}

impl StructuredLogger {
    pub fn new(config: LoggingConfig) -> Result<Self> {
        let writer: Box<dyn Write + Send> = match &config.target {
            LogTarget::Stdout => Box::new(io::stdout()),
            LogTarget::Stderr => Box::new(io::stderr()),
            LogTarget::File => {
                let path = config
                    .file_path
                    .as_ref()
                    .ok_or_else(|| color_eyre::eyre::eyre!("File path required for file logging"))?;
                Box::new(BufWriter::new(File::create(path)?))
            }
        };

        Ok(Self {
            config,
            writer,
            start_time: Utc::now(),
        })
    }

    pub fn log(&mut self, event: LogEvent) -> Result<()> {
        let output = match self.config.format {
            LogFormat::Json => self.format_json(&event)?,
            LogFormat::Logfmt => self.format_logfmt(&event)?,
            LogFormat::Pretty => self.format_pretty(&event)?,
        };

        writeln!(self.writer, "{}", output)?;
        self.writer.flush()?;

        Ok(())
    }

    fn format_json(&self, event: &LogEvent) -> Result<String> {
        Ok(serde_json::to_string(event)?)
    }

    fn format_logfmt(&self, event: &LogEvent) -> Result<String> {
        let ts = Utc::now().to_rfc3339();

        let msg = match event {
            LogEvent::Telemetry(t) => format!(
                "ts=\"{}\" type=telemetry ber={:.6} correlation={:.4} frames={} sync_locked={}",
                ts, t.ber, t.sync_correlation, t.frames_decoded, t.sync_locked
            ),
            LogEvent::FrameDecode(f) => format!(
                "ts=\"{}\" type=frame_decode frame={} seq={} status=\"{}\"",
                ts, f.frame_index, f.decoded.sequence_number, f.decoded.status
            ),
            LogEvent::Statistics(s) => format!(
                "ts=\"{}\" type=statistics duration_secs={:.2} total_frames={} ber_mean={:.6} correlation_mean={:.4}",
                ts, s.duration_secs, s.total_frames, s.ber.mean, s.sync_correlation.mean
            ),
            LogEvent::Info { message } => format!("ts=\"{}\" level=info msg=\"{}\"", ts, message),
            LogEvent::Warn { message } => format!("ts=\"{}\" level=warn msg=\"{}\"", ts, message),
            LogEvent::Error { message, details } => {
                if let Some(d) = details {
                    format!("ts=\"{}\" level=error msg=\"{}\" details=\"{}\"", ts, message, d)
                } else {
                    format!("ts=\"{}\" level=error msg=\"{}\"", ts, message)
                }
            }
        };

        Ok(msg)
    }

    fn format_pretty(&self, event: &LogEvent) -> Result<String> {
        let ts = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");

        let msg = match event {
            LogEvent::Telemetry(t) => format!(
                "[{}] TELEMETRY: BER={:.6} | Correlation={:.4} | Frames={} | Sync={}",
                ts,
                t.ber,
                t.sync_correlation,
                t.frames_decoded,
                if t.sync_locked { "LOCKED" } else { "SEARCHING" }
            ),
            LogEvent::FrameDecode(f) => format!(
                "[{}] FRAME[{}]: seq={} type={} status={} | {}",
                ts,
                f.frame_index,
                f.decoded.sequence_number,
                f.decoded.frame_type,
                f.decoded.status,
                f.decoded.payload_preview
            ),
            LogEvent::Statistics(s) => format!(
                "[{}] STATISTICS ({:.2}s): Frames={} | BER: μ={:.6} σ={:.6} [{:.6},{:.6}] | Correlation: μ={:.4}",
                ts,
                s.duration_secs,
                s.total_frames,
                s.ber.mean,
                s.ber.stddev,
                s.ber.min,
                s.ber.max,
                s.sync_correlation.mean
            ),
            LogEvent::Info { message } => format!("[{}] INFO: {}", ts, message),
            LogEvent::Warn { message } => format!("[{}] WARN: {}", ts, message),
            LogEvent::Error { message, details } => {
                if let Some(d) = details {
                    format!("[{}] ERROR: {} | {}", ts, message, d)
                } else {
                    format!("[{}] ERROR: {}", ts, message)
                }
            }
        };

        Ok(msg)
    }

    pub fn elapsed(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}
