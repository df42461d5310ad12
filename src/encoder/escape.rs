/*!
 * String Escaping
 *
 * Byte-oriented JSON string escaper driven by a 256-entry class table.
 * Runs of bytes that need no escaping are copied in one write.
 */

use crate::core::{EncodeResult, Sink};
use crate::shape::Text;
use std::convert::Infallible;

const PASS: u8 = 0;
const UNICODE: u8 = b'u';
const HTML: u8 = b'h';
// First byte of U+2028 / U+2029
const LINE_SEP_LEAD: u8 = b'x';

const HEX: &[u8; 16] = b"0123456789abcdef";

static ESCAPE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [PASS; 256];
    let mut i = 0;
    while i < 0x20 {
        table[i] = UNICODE;
        i += 1;
    }
    table[b'\n' as usize] = b'n';
    table[b'\r' as usize] = b'r';
    table[b'\t' as usize] = b't';
    table[0x08] = b'b';
    table[0x0c] = b'f';
    table[b'"' as usize] = b'"';
    table[b'\\' as usize] = b'\\';
    table[b'<' as usize] = HTML;
    table[b'>' as usize] = HTML;
    table[b'&' as usize] = HTML;
    table[0xe2] = LINE_SEP_LEAD;
    table
}

#[inline]
fn unicode_escape(byte: u8) -> [u8; 6] {
    [
        b'\\',
        b'u',
        b'0',
        b'0',
        HEX[(byte >> 4) as usize],
        HEX[(byte & 0x0f) as usize],
    ]
}

/// Escape `bytes` without surrounding quotes
///
/// Bytes at or above 0x80 are copied unchanged, except U+2028 and U+2029
/// which are escaped together with `<`, `>` and `&` when `html` is set.
pub fn escape_body<W: Sink + ?Sized>(sink: &mut W, bytes: &[u8], html: bool) -> EncodeResult<()> {
    escape_runs(bytes, html, |run| sink.write_bytes(run))?;
    Ok(())
}

/// Hand each verbatim run and each escape sequence of `bytes` to `emit`, in order
fn escape_runs<E>(
    bytes: &[u8],
    html: bool,
    mut emit: impl FnMut(&[u8]) -> Result<(), E>,
) -> Result<(), E> {
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        let class = ESCAPE[byte as usize];
        match class {
            PASS => {
                i += 1;
                continue;
            }
            HTML if !html => {
                i += 1;
                continue;
            }
            LINE_SEP_LEAD => {
                let separator = html
                    && bytes.get(i + 1) == Some(&0x80)
                    && matches!(bytes.get(i + 2), Some(0xa8 | 0xa9));
                if separator {
                    emit(&bytes[start..i])?;
                    let escaped: &[u8] = if bytes[i + 2] == 0xa8 {
                        b"\\u2028"
                    } else {
                        b"\\u2029"
                    };
                    emit(escaped)?;
                    i += 3;
                    start = i;
                } else {
                    i += 1;
                }
                continue;
            }
            _ => {}
        }

        emit(&bytes[start..i])?;
        match class {
            UNICODE | HTML => emit(&unicode_escape(byte))?,
            short => emit(&[b'\\', short])?,
        }
        i += 1;
        start = i;
    }
    emit(&bytes[start..])
}

/// Escape text without surrounding quotes
///
/// With `coerce`, invalid UTF-8 in raw text is replaced by `�`, one per
/// maximal invalid sequence. Without it raw bytes pass through as they are.
pub fn escape_text<W: Sink + ?Sized>(
    sink: &mut W,
    text: Text<'_>,
    html: bool,
    coerce: bool,
) -> EncodeResult<()> {
    match text {
        Text::Utf8(s) => escape_body(sink, s.as_bytes(), html),
        Text::Raw(bytes) if coerce => {
            for chunk in bytes.utf8_chunks() {
                escape_body(sink, chunk.valid().as_bytes(), html)?;
                if !chunk.invalid().is_empty() {
                    sink.write_bytes(b"\\ufffd")?;
                }
            }
            Ok(())
        }
        Text::Raw(bytes) => escape_body(sink, bytes, html),
    }
}

/// Quoted, escaped string
#[inline]
pub fn write_text<W: Sink + ?Sized>(
    sink: &mut W,
    text: Text<'_>,
    html: bool,
    coerce: bool,
) -> EncodeResult<()> {
    sink.write_byte(b'"')?;
    escape_text(sink, text, html, coerce)?;
    sink.write_byte(b'"')?;
    Ok(())
}

/// Precomputed `"key":` prefix for a struct field
pub fn quoted_key(key: &str, html: bool) -> Box<[u8]> {
    let mut out = Vec::with_capacity(key.len() + 3);
    out.push(b'"');
    let escaped = escape_runs(key.as_bytes(), html, |run| {
        out.extend_from_slice(run);
        Ok::<(), Infallible>(())
    });
    match escaped {
        Ok(()) => {}
        Err(never) => match never {},
    }
    out.extend_from_slice(b"\":");
    out.into_boxed_slice()
}
