//! Decoded instruction records and their assembler text.

use std::fmt;

use crate::operand::{Immediate, Operand};

/// The seven two-operand ALU operations, keyed by their 3-bit op field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    Add,
    Or,
    Adc,
    Sbb,
    And,
    Sub,
    Cmp,
}

impl AluOp {
    /// Map the op field to an operation; 0b110 is the reserved slot
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0b111 {
            0b000 => Some(AluOp::Add),
            0b001 => Some(AluOp::Or),
            0b010 => Some(AluOp::Adc),
            0b011 => Some(AluOp::Sbb),
            0b100 => Some(AluOp::And),
            0b101 => Some(AluOp::Sub),
            0b111 => Some(AluOp::Cmp),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Or => "or",
            AluOp::Adc => "adc",
            AluOp::Sbb => "sbb",
            AluOp::And => "and",
            AluOp::Sub => "sub",
            AluOp::Cmp => "cmp",
        }
    }
}

/// Condition codes for the 0x70-0x7F short jumps, in encoding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpCondition {
    O,
    No,
    B,
    Nb,
    E,
    Ne,
    Be,
    Nbe,
    S,
    Ns,
    P,
    Np,
    L,
    Nl,
    Le,
    Nle,
}

impl JumpCondition {
    const ALL: [JumpCondition; 16] = [
        JumpCondition::O,
        JumpCondition::No,
        JumpCondition::B,
        JumpCondition::Nb,
        JumpCondition::E,
        JumpCondition::Ne,
        JumpCondition::Be,
        JumpCondition::Nbe,
        JumpCondition::S,
        JumpCondition::Ns,
        JumpCondition::P,
        JumpCondition::Np,
        JumpCondition::L,
        JumpCondition::Nl,
        JumpCondition::Le,
        JumpCondition::Nle,
    ];

    pub fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0x0F) as usize]
    }

    pub fn name(&self) -> &'static str {
        match self {
            JumpCondition::O => "jo",
            JumpCondition::No => "jno",
            JumpCondition::B => "jb",
            JumpCondition::Nb => "jnb",
            JumpCondition::E => "je",
            JumpCondition::Ne => "jne",
            JumpCondition::Be => "jbe",
            JumpCondition::Nbe => "jnbe",
            JumpCondition::S => "js",
            JumpCondition::Ns => "jns",
            JumpCondition::P => "jp",
            JumpCondition::Np => "jnp",
            JumpCondition::L => "jl",
            JumpCondition::Nl => "jnl",
            JumpCondition::Le => "jle",
            JumpCondition::Nle => "jnle",
        }
    }
}

/// The 0xE0-0xE3 loop family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Loopnz,
    Loopz,
    Loop,
    Jcxz,
}

impl LoopKind {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => LoopKind::Loopnz,
            0b01 => LoopKind::Loopz,
            0b10 => LoopKind::Loop,
            _ => LoopKind::Jcxz,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoopKind::Loopnz => "loopnz",
            LoopKind::Loopz => "loopz",
            LoopKind::Loop => "loop",
            LoopKind::Jcxz => "jcxz",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Mov,
    Alu(AluOp),
    Jump(JumpCondition),
    Loop(LoopKind),
}

impl Mnemonic {
    pub fn name(&self) -> &'static str {
        match self {
            Mnemonic::Mov => "mov",
            Mnemonic::Alu(op) => op.name(),
            Mnemonic::Jump(cond) => cond.name(),
            Mnemonic::Loop(kind) => kind.name(),
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded instruction
///
/// Operands are kept in encoding order; `reversed` means the second slot is
/// the destination. A control transfer stores its relative displacement as an
/// immediate in the first slot and leaves the second slot empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub first: Operand,
    pub second: Option<Operand>,
    pub reversed: bool,
}

impl Instruction {
    pub fn new(mnemonic: Mnemonic, first: Operand, second: Operand, reversed: bool) -> Self {
        Self {
            mnemonic,
            first,
            second: Some(second),
            reversed,
        }
    }

    /// Short relative jump or loop with an 8-bit signed displacement
    pub fn relative(mnemonic: Mnemonic, displacement: u16) -> Self {
        Self {
            mnemonic,
            first: Operand::Immediate(Immediate::new(displacement, false)),
            second: None,
            reversed: false,
        }
    }

    pub fn is_control_transfer(&self) -> bool {
        self.first.is_immediate()
    }

    /// Signed displacement of a control transfer, relative to the next instruction
    pub fn relative_displacement(&self) -> Option<i16> {
        match self.first {
            Operand::Immediate(imm) => Some(imm.signed()),
            _ => None,
        }
    }

    /// Operands in (destination, source) order, `None` for control transfers
    pub fn destination_and_source(&self) -> Option<(Operand, Operand)> {
        let second = self.second?;
        if self.reversed {
            Some((second, self.first))
        } else {
            Some((self.first, second))
        }
    }

    /// Operation width; memory operands carry none, so the other operand decides
    pub fn is_wide(&self) -> bool {
        [Some(self.first), self.second]
            .into_iter()
            .flatten()
            .find_map(|op| match op {
                Operand::Register(reg) => Some(reg.wide),
                Operand::Immediate(imm) => Some(imm.wide),
                Operand::Memory(_) => None,
            })
            .unwrap_or(true)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let second = match (self.first, self.second) {
            (Operand::Immediate(imm), _) => {
                // `$` is the start of this instruction, two bytes before the
                // address the displacement is relative to
                let rel = imm.signed() as i32 + 2;
                let sign = if rel >= 0 { '+' } else { '-' };
                return write!(f, "{} ${}{}", self.mnemonic, sign, rel.abs());
            }
            (_, Some(second)) => second,
            (_, None) => return Err(fmt::Error),
        };

        // An immediate stored to memory has no register to imply its size
        let mut mnemonic_suffix = "";
        let mut source_prefix = "";
        if let (Operand::Memory(_), Operand::Immediate(imm)) = (self.first, second) {
            let size = if imm.wide { "word" } else { "byte" };
            if self.mnemonic == Mnemonic::Mov {
                source_prefix = size;
            } else {
                mnemonic_suffix = size;
            }
        }

        write!(f, "{}", self.mnemonic)?;
        if !mnemonic_suffix.is_empty() {
            write!(f, " {}", mnemonic_suffix)?;
        }
        if self.reversed {
            write!(f, " {}, {}", second, self.first)
        } else if source_prefix.is_empty() {
            write!(f, " {}, {}", self.first, second)
        } else {
            write!(f, " {}, {} {}", self.first, source_prefix, second)
        }
    }
}

/// An instruction together with where it was found and how long it was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub offset: usize,
    pub length: usize,
    pub instruction: Instruction,
}

impl DecodedInstruction {
    /// Offset of the byte following this instruction
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.instruction.fmt(f)
    }
}
