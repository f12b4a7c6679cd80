//! Operand descriptors produced by the decoder.
//!
//! An operand is either a register, a memory reference or an immediate. The
//! `Display` impls produce the canonical assembler text for each shape.

use std::fmt;

use crate::error::{Result, Sim86Error};

/// Segment registers live after the eight general-purpose registers
pub const SEGMENT_BASE: u8 = 8;

pub const REG8_NAMES: [&str; 8] = ["al", "cl", "dl", "bl", "ah", "ch", "dh", "bh"];

pub const REG16_NAMES: [&str; 12] = [
    "ax", "cx", "dx", "bx", "sp", "bp", "si", "di", "es", "cs", "ss", "ds",
];

/// Register operand: index 0-11 plus width
///
/// For 8-bit width, indices 0-3 name the low byte and 4-7 the high byte of
/// ax/cx/dx/bx. Segment registers (8-11) are always 16-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub index: u8,
    pub wide: bool,
}

impl Register {
    pub const fn new(index: u8, wide: bool) -> Self {
        Self { index, wide }
    }

    /// The primary accumulator at the given width (al or ax)
    pub const fn accumulator(wide: bool) -> Self {
        Self { index: 0, wide }
    }

    pub const fn segment(sr: u8) -> Self {
        Self {
            index: SEGMENT_BASE + sr,
            wide: true,
        }
    }

    pub fn is_accumulator(&self) -> bool {
        self.index == 0
    }

    /// Index of the 16-bit register that stores this register's bits
    pub fn backing_index(&self) -> u8 {
        if self.wide {
            self.index
        } else {
            self.index % 4
        }
    }

    /// True for ah/ch/dh/bh
    pub fn is_high_byte(&self) -> bool {
        !self.wide && self.index >= 4
    }

    pub fn name(&self) -> &'static str {
        if self.wide {
            REG16_NAMES[self.index as usize]
        } else {
            REG8_NAMES[self.index as usize]
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The eight base/index formulas selectable by the r/m field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFormula {
    BxSi,
    BxDi,
    BpSi,
    BpDi,
    Si,
    Di,
    Bp,
    Bx,
}

impl AddressFormula {
    pub fn from_rm(rm: u8) -> Self {
        match rm & 0b111 {
            0b000 => AddressFormula::BxSi,
            0b001 => AddressFormula::BxDi,
            0b010 => AddressFormula::BpSi,
            0b011 => AddressFormula::BpDi,
            0b100 => AddressFormula::Si,
            0b101 => AddressFormula::Di,
            0b110 => AddressFormula::Bp,
            _ => AddressFormula::Bx,
        }
    }

    /// Register indices (16-bit) summed by this formula
    pub fn registers(&self) -> (u8, Option<u8>) {
        const BX: u8 = 3;
        const BP: u8 = 5;
        const SI: u8 = 6;
        const DI: u8 = 7;
        match self {
            AddressFormula::BxSi => (BX, Some(SI)),
            AddressFormula::BxDi => (BX, Some(DI)),
            AddressFormula::BpSi => (BP, Some(SI)),
            AddressFormula::BpDi => (BP, Some(DI)),
            AddressFormula::Si => (SI, None),
            AddressFormula::Di => (DI, None),
            AddressFormula::Bp => (BP, None),
            AddressFormula::Bx => (BX, None),
        }
    }

    pub fn is_single_register(&self) -> bool {
        self.registers().1.is_none()
    }

    pub fn text(&self) -> &'static str {
        match self {
            AddressFormula::BxSi => "bx + si",
            AddressFormula::BxDi => "bx + di",
            AddressFormula::BpSi => "bp + si",
            AddressFormula::BpDi => "bp + di",
            AddressFormula::Si => "si",
            AddressFormula::Di => "di",
            AddressFormula::Bp => "bp",
            AddressFormula::Bx => "bx",
        }
    }
}

/// Memory reference: `[formula + displacement]`
///
/// At least one of the two parts is present; [`MemoryOperand::new`] rejects
/// the empty combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOperand {
    formula: Option<AddressFormula>,
    displacement: Option<i16>,
}

impl MemoryOperand {
    pub fn new(formula: Option<AddressFormula>, displacement: Option<i16>) -> Result<Self> {
        if formula.is_none() && displacement.is_none() {
            return Err(Sim86Error::EmptyMemoryOperand);
        }
        Ok(Self {
            formula,
            displacement,
        })
    }

    /// Direct address with no base register
    pub fn direct(address: u16) -> Self {
        Self {
            formula: None,
            displacement: Some(address as i16),
        }
    }

    pub fn formula(&self) -> Option<AddressFormula> {
        self.formula
    }

    pub fn displacement(&self) -> Option<i16> {
        self.displacement
    }
}

impl fmt::Display for MemoryOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.formula, self.displacement) {
            (Some(formula), Some(disp)) => {
                let sign = if disp >= 0 { '+' } else { '-' };
                write!(
                    f,
                    "[{} {} {}]",
                    formula.text(),
                    sign,
                    (disp as i32).abs()
                )
            }
            (Some(formula), None) => write!(f, "[{}]", formula.text()),
            // direct addresses are unsigned
            (None, Some(disp)) => write!(f, "[{}]", disp as u16),
            (None, None) => Err(fmt::Error),
        }
    }
}

/// Immediate value, already sign-extended to 16 bits
///
/// `wide` records the instruction width the value belongs to; it only
/// affects rendering (`byte`/`word` qualifiers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Immediate {
    pub value: u16,
    pub wide: bool,
}

impl Immediate {
    pub const fn new(value: u16, wide: bool) -> Self {
        Self { value, wide }
    }

    pub fn signed(&self) -> i16 {
        self.value as i16
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    Memory(MemoryOperand),
    Immediate(Immediate),
}

impl Operand {
    pub fn is_memory(&self) -> bool {
        matches!(self, Operand::Memory(_))
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, Operand::Immediate(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => reg.fmt(f),
            Operand::Memory(mem) => mem.fmt(f),
            Operand::Immediate(imm) => imm.fmt(f),
        }
    }
}
