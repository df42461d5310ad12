/*!
 * Number Formatting
 * Integers through itoa, floats in shortest round-trip form
 */

use crate::core::limits::{FLOAT_BUFFER_SIZE, FLOAT_EXP_LOWER, FLOAT_EXP_UPPER};
use crate::core::{EncodeResult, Sink, ValueError};
use std::fmt::{self, Write as _};

#[inline]
pub fn write_integer<W, I>(sink: &mut W, value: I) -> EncodeResult<()>
where
    W: Sink + ?Sized,
    I: itoa::Integer,
{
    let mut buf = itoa::Buffer::new();
    sink.write_bytes(buf.format(value).as_bytes())?;
    Ok(())
}

pub fn write_f64<W: Sink + ?Sized>(sink: &mut W, value: f64) -> EncodeResult<()> {
    if !value.is_finite() {
        return Err(ValueError::NonFinite { value }.into());
    }
    let mut buf = FloatBuf::new();
    if uses_exponent(value) {
        format_exponent(&mut buf, format_args!("{value:e}"), sink)
    } else {
        format_plain(&mut buf, format_args!("{value}"), sink)
    }
}

pub fn write_f32<W: Sink + ?Sized>(sink: &mut W, value: f32) -> EncodeResult<()> {
    if !value.is_finite() {
        return Err(ValueError::NonFinite {
            value: f64::from(value),
        }
        .into());
    }
    let mut buf = FloatBuf::new();
    if uses_exponent(f64::from(value)) {
        format_exponent(&mut buf, format_args!("{value:e}"), sink)
    } else {
        format_plain(&mut buf, format_args!("{value}"), sink)
    }
}

#[inline]
fn uses_exponent(value: f64) -> bool {
    let abs = value.abs();
    abs != 0.0 && !(FLOAT_EXP_LOWER..FLOAT_EXP_UPPER).contains(&abs)
}

fn format_plain<W: Sink + ?Sized>(
    buf: &mut FloatBuf,
    args: fmt::Arguments<'_>,
    sink: &mut W,
) -> EncodeResult<()> {
    if buf.write_fmt(args).is_ok() {
        sink.write_bytes(buf.as_bytes())?;
    } else {
        sink.write_bytes(args.to_string().as_bytes())?;
    }
    Ok(())
}

// Exponents carry an explicit sign: 1e+21, 1e-7.
fn format_exponent<W: Sink + ?Sized>(
    buf: &mut FloatBuf,
    args: fmt::Arguments<'_>,
    sink: &mut W,
) -> EncodeResult<()> {
    let owned;
    let text: &[u8] = if buf.write_fmt(args).is_ok() {
        buf.as_bytes()
    } else {
        owned = args.to_string();
        owned.as_bytes()
    };

    match text.iter().position(|&b| b == b'e') {
        Some(at) if text.get(at + 1) != Some(&b'-') => {
            sink.write_bytes(&text[..=at])?;
            sink.write_byte(b'+')?;
            sink.write_bytes(&text[at + 1..])?;
        }
        _ => sink.write_bytes(text)?,
    }
    Ok(())
}

/// Fixed stack buffer for `fmt::Write`
struct FloatBuf {
    bytes: [u8; FLOAT_BUFFER_SIZE],
    len: usize,
}

impl FloatBuf {
    fn new() -> Self {
        Self {
            bytes: [0; FLOAT_BUFFER_SIZE],
            len: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl fmt::Write for FloatBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > FLOAT_BUFFER_SIZE {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}
