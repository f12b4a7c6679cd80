//! Bit-field extraction and the byte cursor every decode routine reads through.

use crate::error::{Result, Sim86Error};

/// Extract `width` bits of `byte` starting `offset` bits above the LSB.
///
/// Callers keep `offset + width <= 8`.
#[inline]
pub fn field(byte: u8, offset: u8, width: u8) -> u8 {
    debug_assert!(
        offset + width <= 8,
        "bit field {}+{} does not fit in a byte",
        offset,
        width
    );
    ((byte as u16 >> offset) & ((1u16 << width) - 1)) as u8
}

/// Split a ModR/M byte into its (mod, reg, rm) fields
#[inline]
pub fn decode_modrm(modrm: u8) -> (u8, u8, u8) {
    (field(modrm, 6, 2), field(modrm, 3, 3), field(modrm, 0, 3))
}

/// Forward-only reader over a program image.
///
/// The cursor remembers where the current instruction started so that a read
/// past the end of the image reports the offset of the instruction, not of the
/// missing byte.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    start: usize,
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8], start: usize) -> Self {
        Self {
            bytes,
            start,
            pos: start,
        }
    }

    /// Offset of the instruction being decoded
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes consumed since the instruction start
    pub fn consumed(&self) -> usize {
        self.pos - self.start
    }

    /// Look at the next byte without consuming it
    pub fn peek_u8(&self) -> Result<u8> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or(Sim86Error::Truncated { offset: self.start })
    }

    pub fn next_u8(&mut self) -> Result<u8> {
        let val = self.peek_u8()?;
        self.pos += 1;
        Ok(val)
    }

    /// Read one byte and sign-extend it to 16 bits
    pub fn next_i8_extended(&mut self) -> Result<u16> {
        Ok(self.next_u8()? as i8 as i16 as u16)
    }

    /// Read a little-endian word
    pub fn next_u16(&mut self) -> Result<u16> {
        let low_byte = self.next_u8()? as u16;
        let high_byte = self.next_u8()? as u16;
        Ok((high_byte << 8) | low_byte)
    }
}
