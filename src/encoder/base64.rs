/*!
 * Base64
 * Standard alphabet with padding, written as a JSON string
 */

use crate::core::{EncodeResult, Sink};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

// Input bytes per write; a multiple of 3 so only the last block pads.
const BLOCK: usize = 192;

/// Write `bytes` as a quoted base64 string
pub fn write_base64<W: Sink + ?Sized>(sink: &mut W, bytes: &[u8]) -> EncodeResult<()> {
    sink.write_byte(b'"')?;
    let mut out = [0u8; BLOCK / 3 * 4];
    for block in bytes.chunks(BLOCK) {
        let mut len = 0;
        for group in block.chunks(3) {
            let b0 = group[0];
            let b1 = group.get(1).copied().unwrap_or(0);
            let b2 = group.get(2).copied().unwrap_or(0);
            out[len] = ALPHABET[(b0 >> 2) as usize];
            out[len + 1] = ALPHABET[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize];
            out[len + 2] = if group.len() > 1 {
                ALPHABET[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize]
            } else {
                b'='
            };
            out[len + 3] = if group.len() > 2 {
                ALPHABET[(b2 & 0x3f) as usize]
            } else {
                b'='
            };
            len += 4;
        }
        sink.write_bytes(&out[..len])?;
    }
    sink.write_byte(b'"')?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(bytes: &[u8]) -> String {
        let mut out = Vec::new();
        write_base64(&mut out, bytes).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_padding() {
        assert_eq!(encoded(b""), "\"\"");
        assert_eq!(encoded(b"f"), "\"Zg==\"");
        assert_eq!(encoded(b"fo"), "\"Zm8=\"");
        assert_eq!(encoded(b"foo"), "\"Zm9v\"");
        assert_eq!(encoded(b"foobar"), "\"Zm9vYmFy\"");
    }

    #[test]
    fn test_spans_blocks() {
        let input: Vec<u8> = (0..=255u8).cycle().take(BLOCK * 2 + 1).collect();
        let text = encoded(&input);
        // 4 output chars per 3 input bytes, rounded up, plus quotes
        assert_eq!(text.len(), (input.len() + 2) / 3 * 4 + 2);
        assert!(text.ends_with("==\""));
    }
}
