//! Diagnostic data structures for reporting link quality to the CLI
//! harness; nothing here is consumed by the core codec/modem pipeline.

use serde::{Deserialize, Serialize};

pub mod metrics;

/// Per-frame diagnostics attached alongside a decoded or dropped frame.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FrameDiagnostics {
    pub sync_correlation: f64,
    pub estimated_snr_db: f32,
    pub ldpc_iterations: usize,
    pub ldpc_converged: bool,
    pub bch_corrected: bool,
}

/// Summary across a full simulated or captured session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinkReport {
    pub frames_decoded: usize,
    pub frames_dropped: usize,
    pub ber: f32,
    pub recovered_message: String,
}
