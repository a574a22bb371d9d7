//! BCH(127,120,t=1) codec over GF(2^7).
//!
//! A single canonical code profile is memoized and shared by every frame
//! configuration row — the LDPC layer resizes the fixed-width BCH output to
//! whatever `k` the selected LDPC profile needs (see [`crate::ldpc`]).

use std::sync::OnceLock;

use crate::errors::BchError;
use crate::galois::{GaloisField, SharedGaloisField};
use crate::utils::{bytes_to_bits, pack_bits};
use std::sync::Arc;

/// Primitive polynomial for GF(2^7): x^7 + x + 1.
const PRIMITIVE_POLY_M7: u32 = 0b1000_0011;

/// Outcome of a single decode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BchStatus {
    /// Syndrome was zero on receipt; no error present.
    Success,
    /// A single bit error was located and corrected.
    Corrected,
    /// The syndrome is nonzero and the single-error correction did not clear
    /// it — more than one bit is in error. Detected but not corrected.
    Detected,
    /// The codeword could not even be evaluated (wrong length).
    Failed,
}

#[derive(Debug, Clone)]
pub struct BchDecodeResult {
    pub data: Vec<u8>,
    pub status: BchStatus,
    /// Bit position (array index into the codeword, MSB-first) that was
    /// flipped, if `status == Corrected`.
    pub corrected_position: Option<usize>,
}

impl BchDecodeResult {
    pub fn is_uncorrectable(&self) -> bool {
        matches!(self.status, BchStatus::Detected | BchStatus::Failed)
    }
}

/// A systematic binary BCH code capable of correcting a single bit error.
#[derive(Debug)]
pub struct BchCode {
    pub n: usize,
    pub k: usize,
    pub m: u32,
    gf: SharedGaloisField,
    /// Generator polynomial, MSB-first (degree n-k, leading coefficient 1),
    /// length n-k+1.
    generator: Vec<u8>,
}

impl BchCode {
    pub fn new(m: u32, primitive_poly: u32) -> Self {
        let gf = Arc::new(GaloisField::new(m, primitive_poly));
        let generator = minimal_polynomial(&gf, 1);
        let n = gf.n;
        let k = n - (generator.len() - 1);
        Self {
            n,
            k,
            m,
            gf,
            generator,
        }
    }

    /// The canonical BCH(127,120,1) profile used by every frame configuration.
    pub fn standard() -> &'static BchCode {
        static CODE: OnceLock<BchCode> = OnceLock::new();
        CODE.get_or_init(|| BchCode::new(7, PRIMITIVE_POLY_M7))
    }

    pub fn k_bytes(&self) -> usize {
        self.k / 8
    }

    pub fn n_bytes(&self) -> usize {
        (self.n + 7) / 8
    }

    /// Encode up to `k_bytes()` bytes into an `n`-bit systematic codeword,
    /// right-padding the information block with zero bits.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, BchError> {
        let max_bytes = self.k_bytes();
        if data.len() > max_bytes {
            return Err(BchError::DataTooLong {
                data_bytes: data.len(),
                max_bytes,
            });
        }
        let mut info_bits = bytes_to_bits(data);
        info_bits.resize(self.k, 0);

        let codeword_bits = systematic_divide(&info_bits, self.n, self.k, &self.generator);
        Ok(pack_bits(&codeword_bits))
    }

    /// Decode an n-bit codeword (packed MSB-first), attempting to correct a
    /// single bit error.
    pub fn decode(&self, codeword: &[u8]) -> BchDecodeResult {
        let bits = bytes_to_bits(codeword);
        if bits.len() < self.n {
            return BchDecodeResult {
                data: Vec::new(),
                status: BchStatus::Failed,
                corrected_position: None,
            };
        }
        let mut word = bits[..self.n].to_vec();

        let alpha = self.gf.exp(1);
        let syndrome = self.gf.eval_poly_msb_first(&word, alpha);
        if syndrome == 0 {
            return BchDecodeResult {
                data: pack_bits(&word[..self.k]),
                status: BchStatus::Success,
                corrected_position: None,
            };
        }

        let log_s1 = self.gf.log(syndrome).expect("nonzero syndrome has a log");
        let n = self.n as i32;
        let pos = (((n - 1 - log_s1) % n) + n) % n;
        let pos = pos as usize;
        word[pos] ^= 1;

        let syndrome2 = self.gf.eval_poly_msb_first(&word, alpha);
        if syndrome2 == 0 {
            BchDecodeResult {
                data: pack_bits(&word[..self.k]),
                status: BchStatus::Corrected,
                corrected_position: Some(pos),
            }
        } else {
            BchDecodeResult {
                data: pack_bits(&bits[..self.k]),
                status: BchStatus::Detected,
                corrected_position: None,
            }
        }
    }
}

/// Minimal polynomial of `alpha^root_log` over GF(2), as the product
/// `prod_j (x - alpha^(root_log * 2^j))` over the Frobenius-conjugate class,
/// returned with coefficients MSB-first (leading coefficient 1).
fn minimal_polynomial(gf: &GaloisField, root_log: i32) -> Vec<u8> {
    let n = gf.n as i32;
    let mut conjugates = Vec::new();
    let mut c = ((root_log % n) + n) % n;
    loop {
        if conjugates.contains(&c) {
            break;
        }
        conjugates.push(c);
        c = (c * 2) % n;
    }

    // poly[i] holds the coefficient of x^i, ascending, as a field element.
    let mut poly: Vec<u16> = vec![1];
    for &root_power in &conjugates {
        let root = gf.exp(root_power);
        let mut next = vec![0u16; poly.len() + 1];
        for (i, &coeff) in poly.iter().enumerate() {
            next[i + 1] = gf.add(next[i + 1], coeff);
            next[i] = gf.add(next[i], gf.mul(root, coeff));
        }
        poly = next;
    }

    poly.iter()
        .rev()
        .map(|&c| {
            debug_assert!(c == 0 || c == 1, "minimal polynomial must be binary");
            c as u8
        })
        .collect()
}

/// Systematic cyclic-code encode: append the message with `n-k` zero bits
/// and reduce modulo `generator` via bitwise GF(2) long division, writing
/// the remainder into the low-order parity bits in place.
fn systematic_divide(message: &[u8], n: usize, k: usize, generator: &[u8]) -> Vec<u8> {
    let mut reg = vec![0u8; n];
    reg[..k].copy_from_slice(message);

    for i in 0..k {
        if reg[i] == 1 {
            for (j, &g) in generator.iter().enumerate() {
                reg[i + j] ^= g;
            }
        }
    }

    let mut codeword = vec![0u8; n];
    codeword[..k].copy_from_slice(message);
    codeword[k..].copy_from_slice(&reg[k..]);
    codeword
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_profile_has_expected_dimensions() {
        let code = BchCode::standard();
        assert_eq!(code.n, 127);
        assert_eq!(code.k, 120);
        assert_eq!(code.m, 7);
    }

    #[test]
    fn encode_decode_roundtrip_no_errors() {
        let code = BchCode::standard();
        let data = b"Hello!!";
        let codeword = code.encode(data).unwrap();
        let result = code.decode(&codeword);
        assert_eq!(result.status, BchStatus::Success);
        assert_eq!(&result.data[..data.len()], data);
    }

    #[test]
    fn corrects_single_bit_error() {
        let code = BchCode::standard();
        let data = b"Hello!!";
        let mut codeword = code.encode(data).unwrap();
        // flip one bit deep inside the codeword
        codeword[3] ^= 0b0001_0000;
        let result = code.decode(&codeword);
        assert_eq!(result.status, BchStatus::Corrected);
        assert_eq!(&result.data[..data.len()], data);
    }

    #[test]
    fn detects_uncorrectable_double_bit_error() {
        let code = BchCode::standard();
        let data = b"Hello!!";
        let mut codeword = code.encode(data).unwrap();
        codeword[0] ^= 0b1000_0000;
        codeword[5] ^= 0b0000_0001;
        let result = code.decode(&codeword);
        assert!(result.is_uncorrectable());
    }

    #[test]
    fn rejects_data_exceeding_capacity() {
        let code = BchCode::standard();
        let too_long = vec![0u8; code.k_bytes() + 1];
        assert!(code.encode(&too_long).is_err());
    }
}
