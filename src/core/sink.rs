/*!
 * Output Sinks
 * Append-only byte outputs the encoder writes into
 */

use super::errors::WriteError;
use bytes::BytesMut;
use std::io;

/// Append-only byte output
///
/// The encoder never reads back from a sink. Implementations that can fail
/// report the failure on the write that hit it; nothing is retried.
pub trait Sink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteError>;

    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<(), WriteError> {
        self.write_bytes(&[byte])
    }
}

impl Sink for Vec<u8> {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<(), WriteError> {
        self.push(byte);
        Ok(())
    }
}

impl Sink for BytesMut {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        (**self).write_bytes(bytes)
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<(), WriteError> {
        (**self).write_byte(byte)
    }
}

/// Adapter for any `io::Write`
///
/// Writes go straight through; wrap the writer in a `BufWriter` for
/// unbuffered targets.
#[derive(Debug)]
pub struct IoSink<W: io::Write> {
    inner: W,
}

impl<W: io::Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> Sink for IoSink<W> {
    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.inner.write_all(bytes).map_err(WriteError::Io)
    }
}
