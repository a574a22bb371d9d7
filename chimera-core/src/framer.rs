//! Frame assembly (transmit) and the three-state receive-side frame
//! assembler: preamble, sync word, parity-protected header, FEC payload.
//!
//! Channel conditions — header parity failure, LDPC non-convergence, BCH
//! detected-but-uncorrectable errors — surface as a `FrameStatus` on the
//! returned [`DecodedFrame`], never as an `Err`. Only state-machine misuse
//! and unrecognized configuration are [`FramerError`]s.

use crate::bch::{BchCode, BchStatus};
use crate::errors::FramerError;
use crate::ldpc::{self, LdpcCode};
use crate::utils::bytes_to_bits;
use std::sync::Arc;

pub const PREAMBLE_BITS: [u8; 4] = [0, 0, 0, 0];
/// 0xB4 = 1011_0100
pub const SYNC_WORD_BITS: [u8; 8] = [1, 0, 1, 1, 0, 1, 0, 0];
pub const SYNC_VALIDATION_BITS: usize = PREAMBLE_BITS.len() + SYNC_WORD_BITS.len();
pub const DEFAULT_MAX_LDPC_ITERATIONS: usize = 10;

fn even_parity(bits: &[u8]) -> u8 {
    bits.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Header fields decoded from the 8-bit header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub sequence_number: u8,
    pub frame_type: u8,
    pub ldpc_n_type: u8,
}

impl FrameHeader {
    /// Pack into the 8-bit header byte, including the even-parity bit.
    pub fn to_bits(self) -> [u8; 8] {
        let mut bits = [0u8; 8];
        bits[0] = (self.sequence_number >> 2) & 1;
        bits[1] = (self.sequence_number >> 1) & 1;
        bits[2] = self.sequence_number & 1;
        bits[3] = (self.frame_type >> 1) & 1;
        bits[4] = self.frame_type & 1;
        bits[5] = (self.ldpc_n_type >> 1) & 1;
        bits[6] = self.ldpc_n_type & 1;
        bits[7] = even_parity(&bits[0..7]);
        bits
    }

    /// Decode from 8 header bits (MSB-first). Returns `None` on parity
    /// failure — a recoverable channel condition, not an error.
    pub fn from_bits(bits: &[u8]) -> Option<Self> {
        debug_assert_eq!(bits.len(), 8);
        if even_parity(&bits[0..7]) != bits[7] {
            return None;
        }
        Some(Self {
            sequence_number: (bits[0] << 2) | (bits[1] << 1) | bits[2],
            frame_type: (bits[3] << 1) | bits[4],
            ldpc_n_type: (bits[5] << 1) | bits[6],
        })
    }
}

/// Transmit-side constructor: assembles preamble, sync word, header, and the
/// BCH-then-LDPC-encoded payload into a bitstream.
pub fn build(
    user_data: &[u8],
    sequence_number: u8,
    frame_type: u8,
    ldpc_n_type: u8,
) -> Result<Vec<u8>, FramerError> {
    let bch = BchCode::standard();
    let ldpc_code = ldpc::code_for_ldpc_n_type(ldpc_n_type)
        .map_err(|_| FramerError::UnknownLdpcNType(ldpc_n_type))?;

    let max_payload_bytes = bch.k_bytes();
    let bch_codeword = bch.encode(user_data).map_err(|_| FramerError::ExceedsMaxLength {
        payload_bytes: user_data.len(),
        max_bytes: max_payload_bytes,
        ldpc_n_type,
    })?;

    let ldpc_k_bytes = ldpc_code.k_bytes();
    let mut resized = bch_codeword;
    resized.resize(ldpc_k_bytes, 0);

    let payload_bytes = ldpc_code
        .encode(&resized)
        .expect("resized BCH codeword fits the LDPC code's message length by construction");
    let mut payload_bits = bytes_to_bits(&payload_bytes);
    payload_bits.truncate(ldpc_code.transmitted_bits);

    let header = FrameHeader {
        sequence_number,
        frame_type,
        ldpc_n_type,
    };

    let mut frame = Vec::with_capacity(SYNC_VALIDATION_BITS + 8 + payload_bits.len());
    frame.extend_from_slice(&PREAMBLE_BITS);
    frame.extend_from_slice(&SYNC_WORD_BITS);
    frame.extend_from_slice(&header.to_bits());
    frame.extend_from_slice(&payload_bits);
    Ok(frame)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    WaitingHeader,
    WaitingData,
    Completed,
}

impl FrameState {
    fn as_str(self) -> &'static str {
        match self {
            FrameState::WaitingHeader => "WAITING_HEADER",
            FrameState::WaitingData => "WAITING_DATA",
            FrameState::Completed => "COMPLETED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Success,
    BchCorrected,
    /// BCH detected an uncorrectable error, or the codeword was truncated;
    /// the frame is dropped with no partial payload.
    Dropped,
}

#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    pub user_data: Vec<u8>,
    pub status: FrameStatus,
    pub ldpc_converged: bool,
    pub ldpc_iterations: usize,
}

/// Receive-side per-frame state machine: `initialize` -> `add_data_bits`* ->
/// `finalize`. One instance decodes exactly one frame; the streaming
/// demodulator creates a fresh one per acquisition.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    state: FrameState,
    header: Option<FrameHeader>,
    ldpc_code: Option<Arc<LdpcCode>>,
    data_buffer: Vec<i8>,
    max_ldpc_iterations: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            state: FrameState::WaitingHeader,
            header: None,
            ldpc_code: None,
            data_buffer: Vec::new(),
            max_ldpc_iterations: DEFAULT_MAX_LDPC_ITERATIONS,
        }
    }

    pub fn with_max_ldpc_iterations(mut self, iterations: usize) -> Self {
        self.max_ldpc_iterations = iterations;
        self
    }

    pub fn get_state(&self) -> FrameState {
        self.state
    }

    pub fn data_length(&self) -> usize {
        self.ldpc_code.as_ref().map_or(0, |c| c.transmitted_bits)
    }

    pub fn remaining_bits(&self) -> usize {
        self.data_length().saturating_sub(self.data_buffer.len())
    }

    /// Validate header parity and select the FEC profile. Returns `Ok(false)`
    /// (not an error) on parity failure — the caller stays in
    /// `WAITING_HEADER` and should re-acquire. Errors only on an
    /// unrecognized `ldpcNType`.
    pub fn initialize(&mut self, header_byte: u8) -> Result<bool, FramerError> {
        let bits = bytes_to_bits(&[header_byte]);
        let Some(header) = FrameHeader::from_bits(&bits) else {
            return Ok(false);
        };

        let code = ldpc::code_for_ldpc_n_type(header.ldpc_n_type)
            .map_err(|_| FramerError::UnknownLdpcNType(header.ldpc_n_type))?;

        self.header = Some(header);
        self.ldpc_code = Some(code);
        self.data_buffer.clear();
        self.state = FrameState::WaitingData;
        Ok(true)
    }

    /// Append soft bits (LLRs). Must only be called in `WAITING_DATA`;
    /// excess bits beyond `dataLength` are ignored.
    pub fn add_data_bits(&mut self, llrs: &[i8]) -> Result<(), FramerError> {
        if self.state != FrameState::WaitingData {
            return Err(FramerError::DataBeforeHeader {
                state: self.state.as_str(),
            });
        }
        let remaining = self.remaining_bits();
        let take = llrs.len().min(remaining);
        self.data_buffer.extend_from_slice(&llrs[..take]);
        Ok(())
    }

    /// Run LDPC decode then BCH decode on the accumulated LLRs and complete
    /// the frame.
    pub fn finalize(&mut self) -> Result<DecodedFrame, FramerError> {
        if self.state != FrameState::WaitingData {
            return Err(FramerError::FinalizeBeforeData {
                state: self.state.as_str(),
            });
        }
        let expected = self.data_length();
        if self.data_buffer.len() != expected {
            return Err(FramerError::Incomplete {
                expected,
                actual: self.data_buffer.len(),
            });
        }

        let header = self.header.expect("header set once WAITING_DATA is reached");
        let code = self
            .ldpc_code
            .clone()
            .expect("ldpc code selected once WAITING_DATA is reached");

        let ldpc_result = code.decode(&self.data_buffer, self.max_ldpc_iterations);
        let bch = BchCode::standard();
        let bch_result = bch.decode(&ldpc_result.decoded_message);

        self.state = FrameState::Completed;

        let (status, user_data) = match bch_result.status {
            BchStatus::Success => (FrameStatus::Success, bch_result.data),
            BchStatus::Corrected => (FrameStatus::BchCorrected, bch_result.data),
            BchStatus::Detected | BchStatus::Failed => (FrameStatus::Dropped, Vec::new()),
        };
        let max_payload_bytes = bch.k_bytes();
        let user_data = if user_data.len() > max_payload_bytes {
            user_data[..max_payload_bytes].to_vec()
        } else {
            user_data
        };

        Ok(DecodedFrame {
            header,
            user_data,
            status,
            ldpc_converged: ldpc_result.converged,
            ldpc_iterations: ldpc_result.iterations,
        })
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pack_bits;

    #[test]
    fn header_roundtrips_through_bits() {
        let header = FrameHeader {
            sequence_number: 5,
            frame_type: 1,
            ldpc_n_type: 2,
        };
        let bits = header.to_bits();
        let decoded = FrameHeader::from_bits(&bits).expect("valid parity");
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_parity_failure_is_detected() {
        let header = FrameHeader {
            sequence_number: 5,
            frame_type: 1,
            ldpc_n_type: 2,
        };
        let mut bits = header.to_bits();
        bits[7] ^= 1;
        assert!(FrameHeader::from_bits(&bits).is_none());
    }

    #[test]
    fn build_then_decode_clean_channel_roundtrip() {
        let user_data = [0x42u8, 0x43, 0x44];
        let frame_bits = build(&user_data, 1, 0, 1).expect("small payload fits");

        assert_eq!(&frame_bits[0..4], &PREAMBLE_BITS);
        assert_eq!(&frame_bits[4..12], &SYNC_WORD_BITS);

        let header_byte = pack_bits(&frame_bits[12..20])[0];
        let payload_bits = &frame_bits[20..];

        let mut assembler = FrameAssembler::new();
        assert!(assembler.initialize(header_byte).unwrap());
        assert_eq!(assembler.get_state(), FrameState::WaitingData);

        let llrs: Vec<i8> = payload_bits
            .iter()
            .map(|&b| if b == 0 { 100 } else { -100 })
            .collect();
        assembler.add_data_bits(&llrs).unwrap();

        let decoded = assembler.finalize().unwrap();
        assert_eq!(decoded.status, FrameStatus::Success);
        assert_eq!(&decoded.user_data[..user_data.len()], &user_data);
        assert_eq!(decoded.header.sequence_number, 1);
    }

    #[test]
    fn oversized_payload_is_rejected_at_build() {
        let too_big = vec![0xAAu8; 16];
        assert!(build(&too_big, 0, 0, 0).is_err());
    }

    #[test]
    fn add_data_bits_before_initialize_is_an_error() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.add_data_bits(&[1, -1]).is_err());
    }

    #[test]
    fn finalize_with_incomplete_data_is_an_error() {
        let mut assembler = FrameAssembler::new();
        assembler.initialize(FrameHeader { sequence_number: 0, frame_type: 0, ldpc_n_type: 1 }.to_bits().iter().fold(0u8, |acc, &b| (acc << 1) | b)).unwrap();
        assembler.add_data_bits(&[10, 10, 10]).unwrap();
        assert!(assembler.finalize().is_err());
    }
}
