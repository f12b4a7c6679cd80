//! Decoder, simulator and clock estimator for a subset of the Intel 8086.
//!
//! A program image is a flat byte string loaded at address 0. It can be
//! disassembled ([`Disassembler`]), executed one instruction at a time
//! ([`Simulator`]) or annotated with estimated clock counts
//! ([`ClockEstimator`]). All three share the same [`decoder`].

pub mod bits;
pub mod clocks;
pub mod decoder;
pub mod disasm;
pub mod error;
pub mod exec;
pub mod instruction;
pub mod logging;
pub mod operand;
pub mod state;

#[cfg(test)]
mod listing_tests;

pub use clocks::{ClockEstimate, ClockEstimator};
pub use decoder::decode;
pub use disasm::{disassemble, Disassembler};
pub use error::{ErrorKind, ExecMode, Result, Sim86Error};
pub use exec::{RegisterChange, Simulator, StepTrace};
pub use instruction::{DecodedInstruction, Instruction, Mnemonic};
pub use operand::{MemoryOperand, Operand, Register};
pub use state::{Flags, MachineState};
