//! Machine state: registers, flags, instruction pointer and 64KiB of memory.
//!
//! The register file stores the twelve 16-bit registers in encoding order
//! (ax, cx, dx, bx, sp, bp, si, di, es, cs, ss, ds). 8-bit registers are not
//! stored separately; the accessors below splice the high or low byte of the
//! backing 16-bit register.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, Sim86Error};
use crate::operand::{MemoryOperand, Register, REG16_NAMES};

/// Size of the flat address space
pub const MEMORY_SIZE: usize = 0x10000;

pub const REGISTER_COUNT: usize = 12;

// Flag bit positions in FLAGS register (only these three are modelled)
pub const FLAG_PF: u16 = 0x0004; // Parity Flag
pub const FLAG_ZF: u16 = 0x0040; // Zero Flag
pub const FLAG_SF: u16 = 0x0080; // Sign Flag

/// FLAGS register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(pub u16);

impl Flags {
    /// Print order of the modelled flags
    const LETTERS: [(u16, char); 3] = [(FLAG_SF, 'S'), (FLAG_ZF, 'Z'), (FLAG_PF, 'P')];

    #[inline]
    pub fn get(&self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u16, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    /// Sign, zero and parity of an arithmetic result at the given width
    pub fn from_result(result: u16, wide: bool) -> Self {
        let (truncated, sign_bit) = if wide {
            (result, 0x8000)
        } else {
            (result & 0x00FF, 0x0080)
        };
        let mut flags = Flags::default();
        flags.set(FLAG_ZF, truncated == 0);
        flags.set(FLAG_SF, (truncated & sign_bit) != 0);
        flags.set(FLAG_PF, calc_parity((result & 0xFF) as u8));
        flags
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, letter) in Self::LETTERS {
            if self.get(flag) {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

/// Calculate parity (true if even number of 1 bits in low byte)
#[inline]
pub fn calc_parity(val: u8) -> bool {
    val.count_ones() % 2 == 0
}

/// Flat 64KiB byte-addressable memory
#[derive(Clone)]
pub struct Memory {
    data: Box<[u8]>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            data: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    /// Copy a program image to address 0
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > MEMORY_SIZE {
            return Err(Sim86Error::ProgramTooLarge(program.len()));
        }
        self.data[..program.len()].copy_from_slice(program);
        Ok(())
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }

    /// Read a 16-bit word from memory (little-endian, wrapping at 64KiB)
    pub fn read_u16(&self, addr: u16) -> u16 {
        let low = self.read(addr) as u16;
        let high = self.read(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    /// Write a 16-bit word to memory (little-endian, wrapping at 64KiB)
    pub fn write_u16(&mut self, addr: u16, val: u16) {
        self.write(addr, (val & 0xFF) as u8);
        self.write(addr.wrapping_add(1), (val >> 8) as u8);
    }

    /// The whole image, suitable for a raw dump
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory").field("len", &self.data.len()).finish()
    }
}

/// Register/flag view of a machine, for JSON export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterSnapshot {
    pub ip: u16,
    pub ax: u16,
    pub cx: u16,
    pub dx: u16,
    pub bx: u16,
    pub sp: u16,
    pub bp: u16,
    pub si: u16,
    pub di: u16,
    pub es: u16,
    pub cs: u16,
    pub ss: u16,
    pub ds: u16,
    pub flags: String,
}

/// CPU registers, flags and memory, all zero at power-on
#[derive(Debug, Clone, Default)]
pub struct MachineState {
    regs: [u16; REGISTER_COUNT],
    /// IP register (instruction pointer)
    pub ip: u16,
    pub flags: Flags,
    pub memory: Memory,
}

impl MachineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get 16-bit register (0-11, segment registers included)
    #[inline]
    pub fn get_reg16(&self, reg: u8) -> u16 {
        debug_assert!(
            (reg as usize) < REGISTER_COUNT,
            "Invalid 16-bit register index: {} (must be 0-11)",
            reg
        );
        self.regs[reg as usize]
    }

    #[inline]
    pub fn set_reg16(&mut self, reg: u8, val: u16) {
        debug_assert!(
            (reg as usize) < REGISTER_COUNT,
            "Invalid 16-bit register index: {} (must be 0-11)",
            reg
        );
        self.regs[reg as usize] = val;
    }

    /// Get 8-bit register: 0-3 low bytes, 4-7 high bytes of ax/cx/dx/bx
    #[inline]
    pub fn get_reg8(&self, reg: u8) -> u8 {
        debug_assert!(reg < 8, "Invalid 8-bit register index: {} (must be 0-7)", reg);
        let backing = self.regs[(reg % 4) as usize];
        if reg >= 4 {
            (backing >> 8) as u8
        } else {
            (backing & 0xFF) as u8
        }
    }

    #[inline]
    pub fn set_reg8(&mut self, reg: u8, val: u8) {
        debug_assert!(reg < 8, "Invalid 8-bit register index: {} (must be 0-7)", reg);
        let backing = &mut self.regs[(reg % 4) as usize];
        if reg >= 4 {
            *backing = (*backing & 0x00FF) | ((val as u16) << 8);
        } else {
            *backing = (*backing & 0xFF00) | (val as u16);
        }
    }

    pub fn read_register(&self, reg: Register) -> u16 {
        if reg.wide {
            self.get_reg16(reg.index)
        } else {
            self.get_reg8(reg.index) as u16
        }
    }

    /// Write a register; 8-bit registers take the low byte of `val`
    pub fn write_register(&mut self, reg: Register, val: u16) {
        if reg.wide {
            self.set_reg16(reg.index, val);
        } else {
            self.set_reg8(reg.index, val as u8);
        }
    }

    /// Effective address of a memory operand (wraps at 16 bits)
    pub fn effective_address(&self, mem: &MemoryOperand) -> u16 {
        let base = mem.formula().map_or(0, |formula| {
            let (base, index) = formula.registers();
            let index = index.map_or(0, |index| self.get_reg16(index));
            self.get_reg16(base).wrapping_add(index)
        });
        base.wrapping_add(mem.displacement().unwrap_or(0) as u16)
    }

    /// Load at the instruction width: a little-endian word, or a single byte
    /// for 8-bit operands (the neighbouring byte is never read)
    pub fn read_memory(&self, addr: u16, wide: bool) -> u16 {
        if wide {
            self.memory.read_u16(addr)
        } else {
            self.memory.read(addr) as u16
        }
    }

    /// Store at the instruction width; 8-bit stores leave `addr + 1` untouched
    pub fn write_memory(&mut self, addr: u16, val: u16, wide: bool) {
        if wide {
            self.memory.write_u16(addr, val);
        } else {
            self.memory.write(addr, val as u8);
        }
    }

    pub fn snapshot(&self) -> RegisterSnapshot {
        let r = &self.regs;
        RegisterSnapshot {
            ip: self.ip,
            ax: r[0],
            cx: r[1],
            dx: r[2],
            bx: r[3],
            sp: r[4],
            bp: r[5],
            si: r[6],
            di: r[7],
            es: r[8],
            cs: r[9],
            ss: r[10],
            ds: r[11],
            flags: self.flags.to_string(),
        }
    }

    /// JSON save-state of the registers (memory is exported separately as a raw image)
    pub fn save_state(&self) -> Value {
        let snapshot = self.snapshot();
        serde_json::json!(snapshot)
    }

    /// End-of-run register dump
    pub fn register_dump(&self) -> RegisterDump<'_> {
        RegisterDump(self)
    }
}

/// `Display` adapter printing every register and the final flags
pub struct RegisterDump<'a>(&'a MachineState);

impl fmt::Display for RegisterDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        writeln!(f, "Final registers:")?;
        writeln!(f, "{:>8}: 0x{:04x} ({})", "ip", state.ip, state.ip)?;
        for (name, value) in REG16_NAMES.iter().zip(state.regs.iter()) {
            writeln!(f, "{:>8}: 0x{:04x} ({})", name, value, value)?;
        }
        write!(f, "{:>8}: {}", "flags", state.flags)
    }
}
