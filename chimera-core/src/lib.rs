//! Chimera core library
//!
//! A Rust-native acoustic modem: Galois-field/BCH and LDPC forward error
//! correction, DSSS spreading, DPSK over a carrier, correlation-based
//! synchronization, and a streaming receiver that turns a raw audio sample
//! stream into decoded frames.

pub mod bch;
pub mod carrier;
pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod dpsk;
pub mod dsss;
pub mod errors;
pub mod framer;
pub mod galois;
pub mod ldpc;
pub mod logging;
pub mod ring_buffer;
pub mod streaming;
pub mod sync;
pub mod utils;

pub use config::ModemConfig;
pub use errors::{ChimeraError, Result};
pub use framer::{DecodedFrame, FrameStatus};
pub use streaming::{StreamingDemodulator, SyncState};

use dsss::SpreadingSequence;

/// Transmit-side pipeline: frame bits -> DSSS chips -> DPSK phases -> carrier
/// audio. Pairs with [`StreamingDemodulator`] on the receive side; both must
/// be built from the same [`ModemConfig`].
pub struct Transmitter {
    config: ModemConfig,
    sequence: SpreadingSequence,
}

impl Transmitter {
    pub fn new(config: ModemConfig) -> Result<Self> {
        config.validate()?;
        let sequence = SpreadingSequence::new(config.sequence_length, config.seed)?;
        Ok(Self { config, sequence })
    }

    /// Build one complete frame (`build(bytes, frameOptions) -> bitStream`
    /// in the external interface) and run it through the encoder pipeline,
    /// returning transmittable audio samples.
    pub fn build_frame(
        &self,
        user_data: &[u8],
        sequence_number: u8,
        frame_type: u8,
        ldpc_n_type: u8,
    ) -> Result<Vec<f32>> {
        let frame_bits = framer::build(user_data, sequence_number, frame_type, ldpc_n_type)?;
        let chips: Vec<i8> = frame_bits
            .iter()
            .flat_map(|&b| dsss::spread(b, &self.sequence))
            .collect();
        let phases = dpsk::modulate(0.0, &chips);
        Ok(carrier::modulate_block(
            self.config.sample_rate,
            self.config.carrier_freq,
            self.config.samples_per_phase,
            0,
            &phases,
        ))
    }
}
