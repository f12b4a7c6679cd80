//! Clock estimation for mov and add
//!
//! Costs follow the 8086 timing tables without segment overrides, prefetch
//! queue effects or odd-address word penalties.

use std::fmt;

use crate::error::{ExecMode, Result, Sim86Error};
use crate::instruction::{AluOp, DecodedInstruction, Mnemonic};
use crate::logging::{log, LogCategory, LogLevel};
use crate::operand::{AddressFormula, MemoryOperand, Operand};

/// Effective-address calculation cost for a memory operand
pub fn effective_address_clocks(mem: &MemoryOperand) -> u32 {
    let Some(formula) = mem.formula() else {
        return 6;
    };
    let register_cost = match formula {
        AddressFormula::BxSi | AddressFormula::BpDi => 7,
        AddressFormula::BxDi | AddressFormula::BpSi => 8,
        _ => 5,
    };
    // an explicit zero displacement is free
    if mem.displacement().map_or(false, |disp| disp != 0) {
        register_cost + 4
    } else {
        register_cost
    }
}

/// Cost of one instruction and the running total including it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockEstimate {
    pub cycles: u32,
    pub total: u64,
}

impl fmt::Display for ClockEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Clocks: +{} = {}", self.cycles, self.total)
    }
}

/// Accumulates clock costs over a sequence of decoded instructions
#[derive(Debug, Clone, Default)]
pub struct ClockEstimator {
    total: u64,
}

impl ClockEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn estimate(&mut self, decoded: &DecodedInstruction) -> Result<ClockEstimate> {
        let instruction = &decoded.instruction;
        let unimplemented = || Sim86Error::Unimplemented {
            mnemonic: instruction.mnemonic,
            mode: ExecMode::ClockEstimation,
            offset: decoded.offset,
        };
        let (dest, src) = instruction.destination_and_source().ok_or_else(unimplemented)?;

        let cycles = match instruction.mnemonic {
            Mnemonic::Mov => mov_clocks(dest, src),
            Mnemonic::Alu(AluOp::Add) => add_clocks(dest, src),
            _ => return Err(unimplemented()),
        }
        .ok_or(Sim86Error::InvalidOperand {
            reason: "immediate destination",
            offset: decoded.offset,
        })?;

        self.total += u64::from(cycles);
        log(LogCategory::Clocks, LogLevel::Debug, || {
            format!("{:04x}: {} +{} = {}", decoded.offset, decoded, cycles, self.total)
        });
        Ok(ClockEstimate {
            cycles,
            total: self.total,
        })
    }
}

fn mov_clocks(dest: Operand, src: Operand) -> Option<u32> {
    let cycles = match (dest, src) {
        (Operand::Memory(_), Operand::Register(reg)) if reg.is_accumulator() => 10,
        (Operand::Memory(mem), Operand::Register(_)) => 9 + effective_address_clocks(&mem),
        (Operand::Memory(mem), _) => 10 + effective_address_clocks(&mem),
        (Operand::Register(reg), Operand::Memory(_)) if reg.is_accumulator() => 10,
        (Operand::Register(_), Operand::Register(_)) => 2,
        (Operand::Register(_), Operand::Immediate(_)) => 4,
        (Operand::Register(_), Operand::Memory(mem)) => 8 + effective_address_clocks(&mem),
        (Operand::Immediate(_), _) => return None,
    };
    Some(cycles)
}

fn add_clocks(dest: Operand, src: Operand) -> Option<u32> {
    let cycles = match (dest, src) {
        (Operand::Memory(mem), Operand::Immediate(_)) => 17 + effective_address_clocks(&mem),
        (Operand::Memory(mem), _) => 16 + effective_address_clocks(&mem),
        (Operand::Register(_), Operand::Memory(mem)) => 9 + effective_address_clocks(&mem),
        (Operand::Register(_), Operand::Register(_)) => 3,
        (Operand::Register(_), Operand::Immediate(_)) => 4,
        (Operand::Immediate(_), _) => return None,
    };
    Some(cycles)
}
