//! Bitstream conversion helpers shared by the codec and framer modules.

/// Unpack bytes into individual bits, MSB-first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |bit| (byte >> bit) & 1))
        .collect()
}

pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_to_bits_and_back_roundtrip() {
        let bytes = b"Chimera";
        let bits = bytes_to_bits(bytes);
        assert_eq!(bits.len(), bytes.len() * 8);
        assert_eq!(pack_bits(&bits), bytes);
    }
}
