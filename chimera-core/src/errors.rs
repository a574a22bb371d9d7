//! Chimera error types with granular categories.
//!
//! Channel conditions (header parity failure, LDPC non-convergence, BCH
//! detected-but-uncorrectable errors) are represented as data returned from
//! the relevant call, not as `Err` variants here — only configuration
//! mistakes and programming errors (state-machine misuse, oversized input)
//! surface through `Result`.

use thiserror::Error;

/// Top-level error type for all Chimera operations.
#[derive(Debug, Error)]
pub enum ChimeraError {
    #[error("LDPC error: {0}")]
    Ldpc(#[from] LdpcError),

    #[error("BCH error: {0}")]
    Bch(#[from] BchError),

    #[error("Framer error: {0}")]
    Framer(#[from] FramerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// LDPC-specific errors (construction-time only; decode non-convergence is
/// reported via `LdpcDecodeResult::converged`, not this enum).
#[derive(Debug, Error)]
pub enum LdpcError {
    #[error("Matrix construction failed: {reason}")]
    MatrixConstructionFailed { reason: String },

    #[error("Invalid code rate: k={k}, n={n}")]
    InvalidCodeRate { k: usize, n: usize },

    #[error("Message length {message_len} exceeds code dimension {k}")]
    MessageTooLong { message_len: usize, k: usize },
}

/// BCH-specific errors.
#[derive(Debug, Error)]
pub enum BchError {
    #[error("Data length {data_bytes} bytes exceeds BCH information capacity of {max_bytes} bytes")]
    DataTooLong { data_bytes: usize, max_bytes: usize },
}

/// Framer-specific errors, including receive-side state-machine misuse.
#[derive(Debug, Error)]
pub enum FramerError {
    #[error("Payload of {payload_bytes} bytes exceeds max length {max_bytes} bytes for ldpcNType {ldpc_n_type}")]
    ExceedsMaxLength {
        payload_bytes: usize,
        max_bytes: usize,
        ldpc_n_type: u8,
    },

    #[error("Unrecognized ldpcNType: {0}")]
    UnknownLdpcNType(u8),

    #[error("addDataBits called before initialize (state = {state:?})")]
    DataBeforeHeader { state: &'static str },

    #[error("finalize called with incomplete data: expected {expected}, got {actual}")]
    Incomplete { expected: usize, actual: usize },

    #[error("finalize called outside WAITING_DATA (state = {state:?})")]
    FinalizeBeforeData { state: &'static str },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid sample rate: {rate} Hz (must be > 0)")]
    InvalidSampleRate { rate: f64 },

    #[error("Nyquist violation: carrier {carrier_hz} Hz requires sample rate > {min_required_hz} Hz, got {actual_hz} Hz")]
    NyquistViolation {
        carrier_hz: f64,
        min_required_hz: f64,
        actual_hz: f64,
    },

    #[error("Sequence length {length} is not a Mersenne number (2^m - 1)")]
    NonMersenneSequenceLength { length: usize },

    #[error("LFSR seed must be nonzero")]
    ZeroSeed,

    #[error("Invalid frame layout: {reason}")]
    InvalidFrameLayout { reason: String },
}

/// Result type alias for Chimera operations.
pub type Result<T> = std::result::Result<T, ChimeraError>;
