//! Byte-wise LZSS decompression, used by the `leaf/kcap` entry format for
//! its compressed members.
//!
//! Ported from the classic LZSS scheme (Haruhiko Okumura's reference
//! decoder, the same one arc_unpacker's `util::pack::lzss_decompress_bytewise`
//! implements): a sliding window of `WINDOW_SIZE` bytes, a control byte
//! every 8 tokens whose bits select a literal (1) or a back-reference (0),
//! and back-references encoded as a 12-bit window position plus a 4-bit
//! length biased by `MIN_MATCH`.

use crate::error::{Error, Result};

const WINDOW_SIZE: usize = 4096;
const MIN_MATCH: usize = 3;
const INITIAL_POSITION: usize = WINDOW_SIZE - 18;

/// Decompresses `input` into exactly `size_orig` bytes.
pub fn decompress(input: &[u8], size_orig: usize) -> Result<Vec<u8>> {
    let mut window = vec![0u8; WINDOW_SIZE];
    let mut window_pos = INITIAL_POSITION;
    let mut out = Vec::with_capacity(size_orig);
    let mut input_pos = 0usize;

    let mut control_bits = 0u16;
    while out.len() < size_orig {
        control_bits >>= 1;
        if control_bits & 0x100 == 0 {
            let flag = *input.get(input_pos).ok_or_else(too_short)?;
            input_pos += 1;
            control_bits = 0xff00 | flag as u16;
        }

        if control_bits & 1 != 0 {
            let byte = *input.get(input_pos).ok_or_else(too_short)?;
            input_pos += 1;
            out.push(byte);
            window[window_pos] = byte;
            window_pos = (window_pos + 1) % WINDOW_SIZE;
        } else {
            let lo = *input.get(input_pos).ok_or_else(too_short)? as usize;
            let hi = *input.get(input_pos + 1).ok_or_else(too_short)? as usize;
            input_pos += 2;
            let match_pos = lo | ((hi & 0xf0) << 4);
            let match_len = (hi & 0x0f) + MIN_MATCH;
            for i in 0..match_len {
                if out.len() >= size_orig {
                    break;
                }
                let byte = window[(match_pos + i) % WINDOW_SIZE];
                out.push(byte);
                window[window_pos] = byte;
                window_pos = (window_pos + 1) % WINDOW_SIZE;
            }
        }
    }
    Ok(out)
}

fn too_short() -> Error {
    Error::EndOfStream { requested: 1, available: 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes the trivial "every byte is a literal" LZSS stream: one
    /// control byte of all-ones per up-to-8 literals.
    fn encode_literals(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in bytes.chunks(8) {
            out.push(0xff);
            out.extend_from_slice(chunk);
        }
        out
    }

    #[test]
    fn roundtrips_literal_only_stream() {
        let original = b"hello, world! this is lzss".to_vec();
        let compressed = encode_literals(&original);
        let decompressed = decompress(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn decodes_a_back_reference() {
        // Literals "AB", then a back-reference of length 3 (MIN_MATCH) to
        // the window position the "AB" we just emitted was written to.
        let mut out = Vec::new();
        out.push(0b0000_0011); // bits: literal, literal, back-ref
        out.push(b'A');
        out.push(b'B');
        let pos = INITIAL_POSITION as usize;
        let lo = (pos & 0xff) as u8;
        let hi = (((pos >> 4) & 0xf0) | 0) as u8; // match_len - MIN_MATCH == 0
        out.push(lo);
        out.push(hi);
        let decompressed = decompress(&out, 5).unwrap();
        assert_eq!(decompressed, b"ABABA");
    }
}
