//! GF(2^m) arithmetic for the BCH codec.
//!
//! Built once per code parameter set from a primitive polynomial and memoized
//! by the caller (see [`crate::bch`]); immutable afterwards.

use std::sync::Arc;

/// A Galois field GF(2^m) with precomputed exponential and log tables.
///
/// `alpha_to[i]` is alpha^i for i in 0..n (n = 2^m - 1), and `index_of[x]` is
/// the discrete log of field element `x` (the zero element maps to `NO_LOG`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaloisField {
    pub m: u32,
    pub n: usize,
    primitive_poly: u32,
    alpha_to: Vec<u16>,
    index_of: Vec<i32>,
}

/// Sentinel log value for the zero field element.
pub const NO_LOG: i32 = -1;

impl GaloisField {
    /// Build GF(2^m) from a primitive polynomial given as its bit pattern
    /// (e.g. x^7 + x + 1 -> 0b1000_0011).
    pub fn new(m: u32, primitive_poly: u32) -> Self {
        assert!(m >= 2 && m <= 16, "unsupported field degree");
        let n = (1usize << m) - 1;
        let mut alpha_to = vec![0u16; n + 1];
        let mut index_of = vec![NO_LOG; n + 1];

        let mut reg = 1u32;
        for i in 0..n {
            alpha_to[i] = reg as u16;
            index_of[reg as usize] = i as i32;
            reg <<= 1;
            if reg & (1 << m) != 0 {
                reg ^= primitive_poly;
            }
        }
        alpha_to[n] = alpha_to[0];

        Self {
            m,
            n,
            primitive_poly,
            alpha_to,
            index_of,
        }
    }

    pub fn primitive_poly(&self) -> u32 {
        self.primitive_poly
    }

    /// alpha^i, taking `i` modulo n (negative exponents wrap).
    pub fn exp(&self, i: i32) -> u16 {
        let n = self.n as i32;
        let i = ((i % n) + n) % n;
        self.alpha_to[i as usize]
    }

    /// Discrete log of a nonzero field element; `None` for zero.
    pub fn log(&self, x: u16) -> Option<i32> {
        if x == 0 {
            None
        } else {
            Some(self.index_of[x as usize])
        }
    }

    pub fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        let la = self.index_of[a as usize];
        let lb = self.index_of[b as usize];
        self.exp(la + lb)
    }

    pub fn add(&self, a: u16, b: u16) -> u16 {
        a ^ b
    }

    /// Evaluate a polynomial (coefficients MSB-first, i.e. `coeffs[0]` is the
    /// coefficient of the highest degree term) at field element `x` via
    /// Horner's rule.
    pub fn eval_poly_msb_first(&self, coeffs: &[u8], x: u16) -> u16 {
        let mut acc: u16 = 0;
        for &c in coeffs {
            acc = self.add(self.mul(acc, x), c as u16);
        }
        acc
    }
}

pub type SharedGaloisField = Arc<GaloisField>;
