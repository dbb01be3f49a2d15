//! Conversions between external entropy encodings and bit sequences.
//!
//! A bit sequence is a `Vec<u8>` holding only `0` and `1`. Byte alignment and
//! endianness carry no meaning once expanded; only order matters.

/// Expand bytes into bits, MSB first per byte.
pub fn bytes_to_bits(data: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(data.len() * 8);
    for &byte in data {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

/// Parse a textual bitstring, keeping only `'0'` and `'1'` characters.
///
/// Whitespace, separators and any other characters are skipped silently.
pub fn parse_bitstring(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c {
            '0' => Some(0),
            '1' => Some(1),
            _ => None,
        })
        .collect()
}

/// Render bits as a `'0'`/`'1'` string.
pub fn render_bits(bits: &[u8]) -> String {
    bits.iter()
        .map(|&b| if b != 0 { '1' } else { '0' })
        .collect()
}
