//! Execution engine
//!
//! [`Simulator`] owns the [`MachineState`], fetches and decodes at IP, and
//! applies the instruction. Only mov, add, sub and cmp have runtime semantics;
//! of the control transfers, je/jne, jp/jnp and js/jns are taken when their
//! flag test holds. Every other jump condition and the loop family decode and
//! print but do not move IP; each execution of one is reported on the `Stubs`
//! log category.

use std::fmt;

use crate::decoder::decode;
use crate::error::{ExecMode, Result, Sim86Error};
use crate::instruction::{AluOp, DecodedInstruction, JumpCondition, Mnemonic};
use crate::logging::{log, LogCategory, LogLevel};
use crate::operand::{Operand, Register};
use crate::state::{Flags, MachineState, FLAG_PF, FLAG_SF, FLAG_ZF};

/// A register write that changed the register file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterChange {
    /// The register named by the instruction, possibly an 8-bit half
    pub register: Register,
    /// Value of the backing 16-bit register before the write
    pub before: u16,
    /// Value of the backing 16-bit register after the write
    pub after: u16,
}

/// What one executed instruction did to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTrace {
    pub decoded: DecodedInstruction,
    pub ip_before: u16,
    pub ip_after: u16,
    pub register_change: Option<RegisterChange>,
    pub flags_before: Flags,
    pub flags_after: Flags,
}

impl fmt::Display for StepTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ; ip:0x{:x}->0x{:x}",
            self.decoded, self.ip_before, self.ip_after
        )?;
        if let Some(change) = self.register_change {
            write!(
                f,
                " {}:0x{:x}->0x{:x}",
                change.register, change.before, change.after
            )?;
        }
        if self.flags_before != self.flags_after {
            write!(f, " flags:{}->{}", self.flags_before, self.flags_after)?;
        }
        Ok(())
    }
}

/// Decode-execute loop over a program loaded at address 0
#[derive(Debug, Clone)]
pub struct Simulator {
    state: MachineState,
    program_len: usize,
    steps: u64,
    /// Set once execution falls through past the last program byte
    ran_off_end: bool,
}

impl Simulator {
    /// Zeroed machine with `program` copied to address 0
    pub fn new(program: &[u8]) -> Result<Self> {
        let mut state = MachineState::new();
        state.memory.load_program(program)?;
        Ok(Self {
            state,
            program_len: program.len(),
            steps: 0,
            ran_off_end: false,
        })
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// Mutable access for presetting registers or memory before a run
    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    pub fn program_len(&self) -> usize {
        self.program_len
    }

    /// Number of instructions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// True once IP has left the loaded program
    ///
    /// A 64KiB image ends where IP wraps, so falling through its last byte is
    /// tracked separately from the IP value.
    pub fn is_finished(&self) -> bool {
        self.ran_off_end || self.state.ip as usize >= self.program_len
    }

    /// Execute one instruction, `None` when the program has finished
    pub fn step(&mut self) -> Result<Option<StepTrace>> {
        if self.is_finished() {
            return Ok(None);
        }

        let ip_before = self.state.ip;
        let image = &self.state.memory.as_bytes()[..self.program_len];
        let decoded = decode(image, ip_before as usize)?;
        let flags_before = self.state.flags;

        let next = ip_before as usize + decoded.length;
        self.state.ip = next as u16;
        let register_change = self.execute(&decoded)?;
        self.steps += 1;
        if next >= self.program_len && self.state.ip == next as u16 {
            self.ran_off_end = true;
        }

        Ok(Some(StepTrace {
            decoded,
            ip_before,
            ip_after: self.state.ip,
            register_change,
            flags_before,
            flags_after: self.state.flags,
        }))
    }

    /// Step until the program finishes or `max_steps` instructions have run
    pub fn run(&mut self, max_steps: Option<u64>) -> Result<Vec<StepTrace>> {
        let mut traces = Vec::new();
        while max_steps.map_or(true, |max| (traces.len() as u64) < max) {
            match self.step()? {
                Some(trace) => traces.push(trace),
                None => break,
            }
        }
        Ok(traces)
    }

    fn execute(&mut self, decoded: &DecodedInstruction) -> Result<Option<RegisterChange>> {
        let instruction = &decoded.instruction;
        if let Some(displacement) = instruction.relative_displacement() {
            self.branch(decoded, displacement);
            return Ok(None);
        }

        let (dest, src) = instruction
            .destination_and_source()
            .ok_or(Sim86Error::InvalidOperand {
                reason: "missing source operand",
                offset: decoded.offset,
            })?;
        if dest.is_immediate() {
            return Err(Sim86Error::InvalidOperand {
                reason: "immediate destination",
                offset: decoded.offset,
            });
        }

        let wide = instruction.is_wide();
        let src_val = self.read_operand(src, wide);
        let dest_val = self.read_operand(dest, wide);

        let result = match instruction.mnemonic {
            Mnemonic::Mov => Some(src_val),
            Mnemonic::Alu(AluOp::Add) => {
                let result = dest_val.wrapping_add(src_val);
                self.state.flags = Flags::from_result(result, wide);
                Some(result)
            }
            Mnemonic::Alu(AluOp::Sub) => {
                let result = dest_val.wrapping_sub(src_val);
                self.state.flags = Flags::from_result(result, wide);
                Some(result)
            }
            Mnemonic::Alu(AluOp::Cmp) => {
                self.state.flags = Flags::from_result(dest_val.wrapping_sub(src_val), wide);
                None
            }
            mnemonic => {
                return Err(Sim86Error::Unimplemented {
                    mnemonic,
                    mode: ExecMode::Simulation,
                    offset: decoded.offset,
                })
            }
        };

        match result {
            Some(value) => Ok(self.write_operand(dest, value, wide)),
            None => Ok(None),
        }
    }

    fn read_operand(&self, operand: Operand, wide: bool) -> u16 {
        match operand {
            Operand::Immediate(imm) => imm.value,
            Operand::Register(reg) => self.state.read_register(reg),
            Operand::Memory(mem) => {
                let addr = self.state.effective_address(&mem);
                self.state.read_memory(addr, wide)
            }
        }
    }

    /// Shared write-back; reports the register if its backing value changed
    fn write_operand(&mut self, operand: Operand, value: u16, wide: bool) -> Option<RegisterChange> {
        match operand {
            Operand::Register(reg) => {
                let backing = Register::new(reg.backing_index(), true);
                let before = self.state.read_register(backing);
                self.state.write_register(reg, value);
                let after = self.state.read_register(backing);
                log(LogCategory::Exec, LogLevel::Debug, || {
                    format!("{} <- 0x{:04x} ({} = 0x{:04x})", reg, value, backing, after)
                });
                (before != after).then_some(RegisterChange {
                    register: reg,
                    before,
                    after,
                })
            }
            Operand::Memory(mem) => {
                let addr = self.state.effective_address(&mem);
                self.state.write_memory(addr, value, wide);
                log(LogCategory::Exec, LogLevel::Debug, || {
                    format!("[{:04x}] <- 0x{:04x} ({})", addr, value, if wide { "word" } else { "byte" })
                });
                None
            }
            Operand::Immediate(_) => None,
        }
    }

    /// Flag test for a control transfer, `None` when the condition is not modelled
    fn condition_holds(&self, mnemonic: Mnemonic) -> Option<bool> {
        let flags = self.state.flags;
        match mnemonic {
            Mnemonic::Jump(JumpCondition::E) => Some(flags.get(FLAG_ZF)),
            Mnemonic::Jump(JumpCondition::Ne) => Some(!flags.get(FLAG_ZF)),
            Mnemonic::Jump(JumpCondition::P) => Some(flags.get(FLAG_PF)),
            Mnemonic::Jump(JumpCondition::Np) => Some(!flags.get(FLAG_PF)),
            Mnemonic::Jump(JumpCondition::S) => Some(flags.get(FLAG_SF)),
            Mnemonic::Jump(JumpCondition::Ns) => Some(!flags.get(FLAG_SF)),
            _ => None,
        }
    }

    fn branch(&mut self, decoded: &DecodedInstruction, displacement: i16) {
        let mnemonic = decoded.instruction.mnemonic;
        match self.condition_holds(mnemonic) {
            Some(true) => {
                self.state.ip = self.state.ip.wrapping_add(displacement as u16);
                log(LogCategory::Exec, LogLevel::Debug, || {
                    format!("{} taken -> ip 0x{:04x}", mnemonic, self.state.ip)
                });
            }
            Some(false) => {}
            None => log(LogCategory::Stubs, LogLevel::Warn, || {
                format!(
                    "`{}` at 0x{:04x} is decoded but not simulated; falling through",
                    mnemonic, decoded.offset
                )
            }),
        }
    }
}
