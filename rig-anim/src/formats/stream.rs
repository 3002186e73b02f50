//! Little-endian byte-stream primitives for the container codec.
//!
//! Reading is slice-based: [`ByteReader`] tracks a position into a borrowed
//! buffer, exposes a bytes-remaining check, and can hand out the unread tail
//! (compressed rotation blobs embed their own size header, so the channel
//! decoder needs direct access to the raw bytes). Writing goes through
//! `byteorder` over any `io::Write`.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::error::{Result, invalid_data};

/// Upper bound for length-prefixed strings, in bytes.
pub const MAX_STRING_LEN: usize = 10_000;

/// Sequential little-endian reader over a borrowed byte slice.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consume `n` bytes and return them, or fail on truncated input.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(invalid_data("unexpected end of stream"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Fill `out` with consecutive little-endian f32 values.
    pub fn read_f32_slice(&mut self, out: &mut [f32]) -> Result<()> {
        let bytes = self.take(out.len() * 4)?;
        for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    /// Read a u32-length-prefixed UTF-8 string, bounded by [`MAX_STRING_LEN`].
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        if len > MAX_STRING_LEN {
            return Err(invalid_data(format!("string too long: {len} bytes")));
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| invalid_data("string is not valid UTF-8"))
    }
}

/// Write a u32-length-prefixed UTF-8 string.
pub fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    if s.len() > MAX_STRING_LEN {
        return Err(invalid_data(format!("string too long: {} bytes", s.len())));
    }
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Write consecutive little-endian f32 values.
pub fn write_f32_slice<W: Write>(w: &mut W, values: &[f32]) -> Result<()> {
    for &value in values {
        w.write_f32::<LittleEndian>(value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_reads() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.push(0xAB);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 7);
        assert_eq!(r.read_i32().unwrap(), -1);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_fails() {
        let bytes = [0u8; 3];
        let mut r = ByteReader::new(&bytes);
        assert!(r.read_u32().is_err());
    }

    #[test]
    fn test_string_roundtrip() {
        let mut buf = Vec::new();
        write_string(&mut buf, "mixamorig:Hips").unwrap();
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_string().unwrap(), "mixamorig:Hips");
    }

    #[test]
    fn test_string_length_bound() {
        // Claimed length far beyond the bound must fail before allocation.
        let mut buf = Vec::new();
        buf.extend_from_slice(&(u32::MAX).to_le_bytes());
        let mut r = ByteReader::new(&buf);
        let err = r.read_string().unwrap_err();
        assert!(err.to_string().contains("string too long"));
    }

    #[test]
    fn test_f32_slice_roundtrip() {
        let values = [0.0f32, -2.5, 100.0, f32::MIN_POSITIVE];
        let mut buf = Vec::new();
        write_f32_slice(&mut buf, &values).unwrap();

        let mut out = [0.0f32; 4];
        let mut r = ByteReader::new(&buf);
        r.read_f32_slice(&mut out).unwrap();
        assert_eq!(out, values);
    }
}
