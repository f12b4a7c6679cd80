//! Instruction decoder
//!
//! The first opcode byte is classified by [`classify`], an exhaustive match
//! over opcode ranges that stands in for a 256-entry dispatch table. Each
//! [`OpcodeClass`] has one decode routine that pulls the remaining bytes from a
//! [`ByteCursor`]; the instruction length falls out of how far the cursor moved.

use crate::bits::{decode_modrm, field, ByteCursor};
use crate::error::{Result, Sim86Error};
use crate::instruction::{AluOp, DecodedInstruction, Instruction, JumpCondition, LoopKind, Mnemonic};
use crate::logging::{log, LogCategory, LogLevel};
use crate::operand::{AddressFormula, Immediate, MemoryOperand, Operand, Register};

/// Encoding shapes recognised by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeClass {
    /// `00ooo0dw` ALU op between reg/mem and a register
    AluRegMemWithReg,
    /// `00ooo10w` ALU op with an immediate into the accumulator
    AluImmToAcc,
    /// `0111cccc` short conditional jump
    Jump,
    /// `100000sw` ALU op with an immediate into reg/mem, op in the ModR/M reg field
    AluImmToRegMem,
    /// `100010dw` mov between reg/mem and a register
    MovRegMemWithReg,
    /// `10001100` mov segment register to reg/mem
    MovSegToRegMem,
    /// `10001110` mov reg/mem to segment register
    MovRegMemToSeg,
    /// `1010000w` mov direct memory to accumulator
    MovMemToAcc,
    /// `1010001w` mov accumulator to direct memory
    MovAccToMem,
    /// `1011wreg` mov immediate to register
    MovImmToReg,
    /// `1100011w` mov immediate to reg/mem
    MovImmToRegMem,
    /// `111000kk` loop family
    Loop,
}

/// Map an opcode byte to its decode shape, `None` for unsupported opcodes
pub fn classify(opcode: u8) -> Option<OpcodeClass> {
    match opcode {
        0x00..=0x3F if opcode & 0b100 == 0 => Some(OpcodeClass::AluRegMemWithReg),
        0x00..=0x3F if opcode & 0b110 == 0b100 => Some(OpcodeClass::AluImmToAcc),
        0x70..=0x7F => Some(OpcodeClass::Jump),
        0x80..=0x83 => Some(OpcodeClass::AluImmToRegMem),
        0x88..=0x8B => Some(OpcodeClass::MovRegMemWithReg),
        0x8C => Some(OpcodeClass::MovSegToRegMem),
        0x8E => Some(OpcodeClass::MovRegMemToSeg),
        0xA0 | 0xA1 => Some(OpcodeClass::MovMemToAcc),
        0xA2 | 0xA3 => Some(OpcodeClass::MovAccToMem),
        0xB0..=0xBF => Some(OpcodeClass::MovImmToReg),
        0xC6 | 0xC7 => Some(OpcodeClass::MovImmToRegMem),
        0xE0..=0xE3 => Some(OpcodeClass::Loop),
        _ => None,
    }
}

/// Decode the instruction starting at `offset` in `bytes`
pub fn decode(bytes: &[u8], offset: usize) -> Result<DecodedInstruction> {
    let mut cursor = ByteCursor::new(bytes, offset);
    let opcode = cursor.next_u8()?;
    let class = classify(opcode).ok_or(Sim86Error::UnsupportedOpcode { opcode, offset })?;

    let instruction = match class {
        OpcodeClass::AluRegMemWithReg => {
            let op = alu_op(opcode, field(opcode, 3, 3), offset)?;
            reg_mem_with_reg(&mut cursor, opcode, Mnemonic::Alu(op))?
        }
        OpcodeClass::AluImmToAcc => {
            let op = alu_op(opcode, field(opcode, 3, 3), offset)?;
            let wide = field(opcode, 0, 1) == 1;
            let imm = decode_immediate(&mut cursor, wide, false)?;
            Instruction::new(
                Mnemonic::Alu(op),
                Operand::Register(Register::accumulator(wide)),
                Operand::Immediate(imm),
                false,
            )
        }
        OpcodeClass::Jump => {
            let condition = JumpCondition::from_bits(field(opcode, 0, 4));
            let displacement = cursor.next_i8_extended()?;
            Instruction::relative(Mnemonic::Jump(condition), displacement)
        }
        OpcodeClass::AluImmToRegMem => {
            let sign_extend = field(opcode, 1, 1) == 1;
            let op_bits = field(cursor.peek_u8()?, 3, 3);
            let op = alu_op(opcode, op_bits, offset)?;
            imm_to_reg_mem(&mut cursor, opcode, Mnemonic::Alu(op), sign_extend)?
        }
        OpcodeClass::MovRegMemWithReg => reg_mem_with_reg(&mut cursor, opcode, Mnemonic::Mov)?,
        OpcodeClass::MovSegToRegMem | OpcodeClass::MovRegMemToSeg => {
            let modrm = cursor.next_u8()?;
            let (mode, _, rm) = decode_modrm(modrm);
            let sr = field(modrm, 3, 2);
            let other = decode_reg_mem(&mut cursor, true, mode, rm)?;
            Instruction::new(
                Mnemonic::Mov,
                Operand::Register(Register::segment(sr)),
                other,
                class == OpcodeClass::MovSegToRegMem,
            )
        }
        OpcodeClass::MovMemToAcc | OpcodeClass::MovAccToMem => {
            let wide = field(opcode, 0, 1) == 1;
            let address = cursor.next_u16()?;
            Instruction::new(
                Mnemonic::Mov,
                Operand::Register(Register::accumulator(wide)),
                Operand::Memory(MemoryOperand::direct(address)),
                class == OpcodeClass::MovAccToMem,
            )
        }
        OpcodeClass::MovImmToReg => {
            let wide = field(opcode, 3, 1) == 1;
            let reg = field(opcode, 0, 3);
            let imm = decode_immediate(&mut cursor, wide, false)?;
            Instruction::new(
                Mnemonic::Mov,
                Operand::Register(Register::new(reg, wide)),
                Operand::Immediate(imm),
                false,
            )
        }
        OpcodeClass::MovImmToRegMem => imm_to_reg_mem(&mut cursor, opcode, Mnemonic::Mov, false)?,
        OpcodeClass::Loop => {
            let kind = LoopKind::from_bits(field(opcode, 0, 2));
            let displacement = cursor.next_i8_extended()?;
            Instruction::relative(Mnemonic::Loop(kind), displacement)
        }
    };

    log(LogCategory::Decode, LogLevel::Trace, || {
        format!(
            "{:04x}: {:02x} ({:?}) -> {} [{} byte(s)]",
            offset,
            opcode,
            class,
            instruction,
            cursor.consumed()
        )
    });

    Ok(DecodedInstruction {
        offset,
        length: cursor.consumed(),
        instruction,
    })
}

fn alu_op(opcode: u8, op_bits: u8, offset: usize) -> Result<AluOp> {
    AluOp::from_bits(op_bits).ok_or(Sim86Error::ReservedEncoding {
        opcode,
        op_bits,
        offset,
    })
}

/// Register or memory operand selected by the mod and r/m fields
fn decode_reg_mem(cursor: &mut ByteCursor<'_>, wide: bool, mode: u8, rm: u8) -> Result<Operand> {
    if mode == 0b11 {
        return Ok(Operand::Register(Register::new(rm, wide)));
    }

    // mod=00 rm=110 would be [bp] but encodes a direct address instead
    let direct = mode == 0b00 && rm == 0b110;
    let formula = (!direct).then(|| AddressFormula::from_rm(rm));
    let displacement = match mode {
        0b00 if direct => Some(cursor.next_u16()? as i16),
        0b00 => None,
        0b01 => Some(cursor.next_i8_extended()? as i16),
        _ => Some(cursor.next_u16()? as i16),
    };
    Ok(Operand::Memory(MemoryOperand::new(formula, displacement)?))
}

fn decode_immediate(cursor: &mut ByteCursor<'_>, wide: bool, sign_extend: bool) -> Result<Immediate> {
    let value = if sign_extend || !wide {
        cursor.next_i8_extended()?
    } else {
        cursor.next_u16()?
    };
    Ok(Immediate::new(value, wide))
}

/// `xxxxxxdw mod reg r/m [disp]`
fn reg_mem_with_reg(cursor: &mut ByteCursor<'_>, opcode: u8, mnemonic: Mnemonic) -> Result<Instruction> {
    let to_reg = field(opcode, 1, 1) == 1;
    let wide = field(opcode, 0, 1) == 1;
    let (mode, reg, rm) = decode_modrm(cursor.next_u8()?);
    let reg_mem = decode_reg_mem(cursor, wide, mode, rm)?;
    Ok(Instruction::new(
        mnemonic,
        reg_mem,
        Operand::Register(Register::new(reg, wide)),
        to_reg,
    ))
}

/// `xxxxxxsw mod ooo r/m [disp] data [data]`
fn imm_to_reg_mem(
    cursor: &mut ByteCursor<'_>,
    opcode: u8,
    mnemonic: Mnemonic,
    sign_extend: bool,
) -> Result<Instruction> {
    let wide = field(opcode, 0, 1) == 1;
    let (mode, _, rm) = decode_modrm(cursor.next_u8()?);
    let reg_mem = decode_reg_mem(cursor, wide, mode, rm)?;
    let imm = decode_immediate(cursor, wide, sign_extend)?;
    Ok(Instruction::new(mnemonic, reg_mem, Operand::Immediate(imm), false))
}
