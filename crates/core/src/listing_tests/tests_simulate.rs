//! Execution of assembled listings

use super::assemble;
use crate::error::{ErrorKind, ExecMode, Sim86Error};
use crate::exec::Simulator;
use crate::instruction::{AluOp, Mnemonic};
use crate::state::{FLAG_PF, FLAG_SF, FLAG_ZF, MEMORY_SIZE};

// register indices
const AX: u8 = 0;
const CX: u8 = 1;
const BX: u8 = 3;
const SP: u8 = 4;
const BP: u8 = 5;

fn traces(program: &[u8]) -> (Simulator, Vec<String>) {
    let mut sim = Simulator::new(program).unwrap();
    let lines = sim
        .run(Some(10_000))
        .unwrap()
        .iter()
        .map(|trace| trace.to_string())
        .collect();
    (sim, lines)
}

#[test]
fn arithmetic_trace() {
    let listing: &[(&[u8], &str)] = &[
        (&[0xBB, 0x03, 0xF0], "mov bx, -4093 ; ip:0x0->0x3 bx:0x0->0xf003"),
        (&[0xB9, 0x01, 0x0F], "mov cx, 3841 ; ip:0x3->0x6 cx:0x0->0xf01"),
        (&[0x29, 0xCB], "sub bx, cx ; ip:0x6->0x8 bx:0xf003->0xe102 flags:->S"),
        (&[0xBC, 0xE6, 0x03], "mov sp, 998 ; ip:0x8->0xb sp:0x0->0x3e6"),
        (&[0xBD, 0xE7, 0x03], "mov bp, 999 ; ip:0xb->0xe bp:0x0->0x3e7"),
        (&[0x39, 0xE5], "cmp bp, sp ; ip:0xe->0x10 flags:S->"),
        (&[0x81, 0xC5, 0x03, 0x04], "add bp, 1027 ; ip:0x10->0x14 bp:0x3e7->0x7ea"),
        (&[0x81, 0xED, 0xEA, 0x07], "sub bp, 2026 ; ip:0x14->0x18 bp:0x7ea->0x0 flags:->ZP"),
    ];
    let (sim, lines) = traces(&assemble(listing));
    let expected: Vec<&str> = listing.iter().map(|(_, text)| *text).collect();
    assert_eq!(lines, expected);

    let state = sim.state();
    assert_eq!(state.get_reg16(BX), 0xE102);
    assert_eq!(state.get_reg16(CX), 0x0F01);
    assert_eq!(state.get_reg16(SP), 0x03E6);
    assert_eq!(state.get_reg16(BP), 0);
    assert_eq!(state.ip, 0x18);
    assert_eq!(state.flags.to_string(), "ZP");
}

#[test]
fn countdown_loop_with_jne() {
    let listing: &[(&[u8], &str)] = &[
        (&[0xB9, 0x03, 0x00], "mov cx, 3"),
        (&[0xBB, 0xE8, 0x03], "mov bx, 1000"),
        (&[0x83, 0xC3, 0x0A], "add bx, 10"),
        (&[0x83, 0xE9, 0x01], "sub cx, 1"),
        (&[0x75, 0xF8], "jne $-6"),
    ];
    let (sim, lines) = traces(&assemble(listing));

    // two setup moves, then three passes of the loop body
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[4], "jne $-6 ; ip:0xc->0x6");
    assert_eq!(lines[10], "jne $-6 ; ip:0xc->0xe");

    let state = sim.state();
    assert_eq!(state.get_reg16(BX), 1030);
    assert_eq!(state.get_reg16(CX), 0);
    assert_eq!(state.ip, 0x0E);
    assert!(state.flags.get(FLAG_ZF));
    assert!(state.flags.get(FLAG_PF));
}

#[test]
fn memory_round_trip_through_base_register() {
    let listing: &[(&[u8], &str)] = &[
        (&[0xC7, 0x06, 0xE8, 0x03, 0x01, 0x00], "mov [1000], word 1"),
        (&[0xBB, 0xE8, 0x03], "mov bx, 1000"),
        (&[0x8B, 0x2F], "mov bp, [bx]"),
        (&[0x03, 0x2F], "add bp, [bx]"),
    ];
    let (sim, lines) = traces(&assemble(listing));
    assert_eq!(lines[0], "mov [1000], word 1 ; ip:0x0->0x6");
    assert_eq!(lines[3], "add bp, [bx] ; ip:0xb->0xd bp:0x1->0x2");

    let state = sim.state();
    assert_eq!(state.get_reg16(BP), 2);
    assert_eq!(state.memory.read_u16(1000), 1);
}

#[test]
fn sign_jump_skips_forward() {
    // mov ax, 0 ; sub ax, 1 ; js $+5 ; mov bx, 1
    let program = [0xB8, 0x00, 0x00, 0x83, 0xE8, 0x01, 0x78, 0x03, 0xBB, 0x01, 0x00];
    let (sim, lines) = traces(&program);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "js $+5 ; ip:0x6->0xb");
    assert_eq!(sim.state().get_reg16(AX), 0xFFFF);
    assert_eq!(sim.state().get_reg16(BX), 0);
    assert!(sim.state().flags.get(FLAG_SF));
}

#[test]
fn parity_jump_not_taken_on_odd_parity() {
    // mov al, 1 ; cmp al, 0 ; jp $+4 ; mov bl, 2
    let program = [0xB0, 0x01, 0x3C, 0x00, 0x7A, 0x02, 0xB3, 0x02];
    let (sim, lines) = traces(&program);
    assert_eq!(lines.len(), 4);
    assert_eq!(sim.state().get_reg8(BX), 2);
}

#[test]
fn eight_bit_arithmetic_wraps_at_byte_width() {
    // mov ah, 0xff ; add ah, 1
    let program = [0xB4, 0xFF, 0x80, 0xC4, 0x01];
    let (sim, lines) = traces(&program);
    assert_eq!(lines[1], "add ah, 1 ; ip:0x2->0x5 ah:0xff00->0x0 flags:->ZP");
    assert_eq!(sim.state().get_reg16(AX), 0);
}

#[test]
fn memory_image_is_full_size_with_program_at_zero() {
    // mov [3], byte 0x90 overwrites one of its own bytes
    let program = [0xC6, 0x06, 0x03, 0x00, 0x90];
    let (sim, _) = traces(&program);
    let image = sim.state().memory.as_bytes();
    assert_eq!(image.len(), MEMORY_SIZE);
    assert_eq!(&image[..3], &program[..3]);
    assert_eq!(image[3], 0x90);
}

#[test]
fn unsimulated_operation_stops_with_semantics_error() {
    // mov ax, 1 ; and ax, bx
    let program = [0xB8, 0x01, 0x00, 0x21, 0xD8];
    let mut sim = Simulator::new(&program).unwrap();
    let err = sim.run(None).unwrap_err();
    assert_eq!(
        err,
        Sim86Error::Unimplemented {
            mnemonic: Mnemonic::Alu(AluOp::And),
            mode: ExecMode::Simulation,
            offset: 3,
        }
    );
    assert_eq!(err.kind(), ErrorKind::Semantics);
    assert_eq!(err.to_string(), "`and` at offset 0x0003 has no simulation rule");
    assert_eq!(sim.state().get_reg16(AX), 1);
}

#[test]
fn oversized_program_is_rejected() {
    let program = vec![0u8; MEMORY_SIZE + 1];
    let err = Simulator::new(&program).unwrap_err();
    assert_eq!(err, Sim86Error::ProgramTooLarge(MEMORY_SIZE + 1));
    assert_eq!(err.kind(), ErrorKind::Load);
}
