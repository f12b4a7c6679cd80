//! Error type shared by the decoder, the execution engine and the clock estimator.
//!
//! Every variant is fatal to the current run: a misdecoded instruction leaves
//! the byte cursor misaligned for everything after it, so nothing is retried.

use std::fmt;

use thiserror::Error;

use crate::instruction::Mnemonic;

/// Which consumer of decoded instructions rejected a mnemonic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Simulation,
    ClockEstimation,
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecMode::Simulation => write!(f, "simulation"),
            ExecMode::ClockEstimation => write!(f, "clock estimation"),
        }
    }
}

/// Broad classification of [`Sim86Error`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte stream does not encode a supported instruction
    Decode,
    /// The instruction decoded, but the active mode has no rule for it
    Semantics,
    /// An operand combination violates an operand invariant
    OperandShape,
    /// The program image cannot be loaded
    Load,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Sim86Error {
    #[error("unsupported opcode 0x{opcode:02x} at offset 0x{offset:04x}")]
    UnsupportedOpcode { opcode: u8, offset: usize },

    #[error("reserved operation field 0b{op_bits:03b} in opcode 0x{opcode:02x} at offset 0x{offset:04x}")]
    ReservedEncoding { opcode: u8, op_bits: u8, offset: usize },

    #[error("instruction at offset 0x{offset:04x} runs past the end of the program")]
    Truncated { offset: usize },

    #[error("`{mnemonic}` at offset 0x{offset:04x} has no {mode} rule")]
    Unimplemented {
        mnemonic: Mnemonic,
        mode: ExecMode,
        offset: usize,
    },

    #[error("invalid operand at offset 0x{offset:04x}: {reason}")]
    InvalidOperand { reason: &'static str, offset: usize },

    #[error("memory operand has neither a base/index formula nor a displacement")]
    EmptyMemoryOperand,

    #[error("program is {0} bytes, larger than the 64KiB address space")]
    ProgramTooLarge(usize),
}

impl Sim86Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Sim86Error::UnsupportedOpcode { .. }
            | Sim86Error::ReservedEncoding { .. }
            | Sim86Error::Truncated { .. } => ErrorKind::Decode,
            Sim86Error::Unimplemented { .. } => ErrorKind::Semantics,
            Sim86Error::InvalidOperand { .. } | Sim86Error::EmptyMemoryOperand => {
                ErrorKind::OperandShape
            }
            Sim86Error::ProgramTooLarge(_) => ErrorKind::Load,
        }
    }
}

pub type Result<T> = std::result::Result<T, Sim86Error>;
