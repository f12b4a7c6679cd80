//! Linear-sweep disassembly of a program image

use crate::decoder::decode;
use crate::error::Result;
use crate::instruction::DecodedInstruction;

/// Decodes instructions back to back from offset 0
///
/// Yields each instruction in order and stops after the end of the image or
/// after the first error, which is yielded once.
pub struct Disassembler<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            failed: false,
        }
    }

    /// Offset of the next instruction to decode
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for Disassembler<'_> {
    type Item = Result<DecodedInstruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        match decode(self.bytes, self.offset) {
            Ok(decoded) => {
                self.offset = decoded.end();
                Some(Ok(decoded))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Render a whole image as assembler text, one instruction per line
pub fn disassemble(bytes: &[u8]) -> Result<Vec<String>> {
    Disassembler::new(bytes)
        .map(|decoded| decoded.map(|d| d.to_string()))
        .collect()
}
