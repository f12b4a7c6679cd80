//! Decoding of assembled listings

use super::assemble;
use crate::decoder::decode;
use crate::disasm::{disassemble, Disassembler};
use crate::error::{ErrorKind, Sim86Error};

/// Every supported encoding shape, with the text it disassembles to
const LISTING: &[(&[u8], &str)] = &[
    // register to register
    (&[0x89, 0xD9], "mov cx, bx"),
    (&[0x88, 0xE5], "mov ch, ah"),
    // memory, every mod
    (&[0x8A, 0x00], "mov al, [bx + si]"),
    (&[0x8B, 0x1B], "mov bx, [bp + di]"),
    (&[0x8B, 0x56, 0x00], "mov dx, [bp + 0]"),
    (&[0x8A, 0x60, 0x04], "mov ah, [bx + si + 4]"),
    (&[0x8A, 0x80, 0x87, 0x13], "mov al, [bx + si + 4999]"),
    (&[0x89, 0x09], "mov [bx + di], cx"),
    (&[0x88, 0x0A], "mov [bp + si], cl"),
    (&[0x88, 0x6E, 0x00], "mov [bp + 0], ch"),
    // signed displacements
    (&[0x8B, 0x41, 0xDB], "mov ax, [bx + di - 37]"),
    (&[0x89, 0x8C, 0xD4, 0xFE], "mov [si - 300], cx"),
    (&[0x8B, 0x57, 0xE0], "mov dx, [bx - 32]"),
    // immediate to memory
    (&[0xC6, 0x03, 0x07], "mov [bp + di], byte 7"),
    (&[0xC7, 0x85, 0x85, 0x03, 0x5B, 0x01], "mov [di + 901], word 347"),
    // direct addresses
    (&[0x8B, 0x2E, 0x05, 0x00], "mov bp, [5]"),
    (&[0x8B, 0x1E, 0x82, 0x0D], "mov bx, [3458]"),
    // accumulator forms
    (&[0xA1, 0xFB, 0x09], "mov ax, [2555]"),
    (&[0xA3, 0xFA, 0x09], "mov [2554], ax"),
    // immediate to register
    (&[0xB1, 0x0C], "mov cl, 12"),
    (&[0xB9, 0xF4, 0xFF], "mov cx, -12"),
    (&[0xBA, 0x6C, 0x0F], "mov dx, 3948"),
    // arithmetic
    (&[0x03, 0x18], "add bx, [bx + si]"),
    (&[0x83, 0xC6, 0x02], "add si, 2"),
    (&[0x05, 0xE8, 0x03], "add ax, 1000"),
    (&[0x04, 0xE2], "add al, -30"),
    (&[0x83, 0x82, 0xE8, 0x03, 0x1D], "add word [bp + si + 1000], 29"),
    (&[0x2B, 0x4E, 0x00], "sub cx, [bp + 0]"),
    (&[0x80, 0x29, 0x1D], "sub byte [bx + di], 29"),
    (&[0x39, 0xCB], "cmp bx, cx"),
    (&[0x3C, 0x09], "cmp al, 9"),
    // the remaining ALU operations decode too
    (&[0x09, 0xD8], "or ax, bx"),
    (&[0x80, 0x27, 0x05], "and byte [bx], 5"),
    (&[0x83, 0xD2, 0x07], "adc dx, 7"),
    (&[0x1A, 0x07], "sbb al, [bx]"),
    // segment registers
    (&[0x8E, 0xC0], "mov es, ax"),
    (&[0x8C, 0xCB], "mov bx, cs"),
    // control transfers
    (&[0x75, 0xFA], "jne $-4"),
    (&[0x74, 0xFE], "je $+0"),
    (&[0x7C, 0x02], "jl $+4"),
    (&[0x7F, 0x00], "jnle $+2"),
    (&[0xE2, 0xFC], "loop $-2"),
    (&[0xE1, 0xF0], "loopz $-14"),
    (&[0xE0, 0x10], "loopnz $+18"),
    (&[0xE3, 0x00], "jcxz $+2"),
];

#[test]
fn each_line_decodes_to_its_text_and_length() {
    for (bytes, text) in LISTING {
        let decoded = decode(bytes, 0).unwrap();
        assert_eq!(decoded.to_string(), *text, "bytes {:02x?}", bytes);
        assert_eq!(decoded.length, bytes.len(), "{}", text);
    }
}

#[test]
fn listing_disassembles_as_one_program() {
    let program = assemble(LISTING);
    let expected: Vec<&str> = LISTING.iter().map(|(_, text)| *text).collect();
    assert_eq!(disassemble(&program).unwrap(), expected);
}

#[test]
fn offsets_follow_lengths() {
    let program = assemble(LISTING);
    let mut expected_offset = 0;
    for (decoded, (bytes, _)) in Disassembler::new(&program).zip(LISTING) {
        let decoded = decoded.unwrap();
        assert_eq!(decoded.offset, expected_offset);
        expected_offset += bytes.len();
    }
    assert_eq!(expected_offset, program.len());
}

#[test]
fn decoding_twice_gives_the_same_instruction() {
    let program = assemble(LISTING);
    let mut offset = 0;
    while offset < program.len() {
        let first = decode(&program, offset).unwrap();
        let second = decode(&program, offset).unwrap();
        assert_eq!(first, second);
        offset = first.end();
    }
}

#[test]
fn truncated_tail_is_reported_at_instruction_start() {
    let mut program = assemble(LISTING);
    // drop the last byte of the trailing `jcxz`
    program.pop();
    let last_offset = program.len() - 1;
    let results: Vec<_> = Disassembler::new(&program).collect();
    assert_eq!(results.len(), LISTING.len());
    let err = results.last().unwrap().clone().unwrap_err();
    assert_eq!(err, Sim86Error::Truncated { offset: last_offset });
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[test]
fn reserved_alu_slot_in_immediate_group() {
    // 0x80 with op field 110
    let err = decode(&[0x80, 0x30, 0x01], 0).unwrap_err();
    assert_eq!(
        err,
        Sim86Error::ReservedEncoding {
            opcode: 0x80,
            op_bits: 0b110,
            offset: 0
        }
    );
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[test]
fn unsupported_opcode_in_the_middle() {
    let program = [0x89, 0xD9, 0xCD, 0x21, 0x89, 0xD9];
    let lines: Vec<_> = Disassembler::new(&program).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        Err(Sim86Error::UnsupportedOpcode {
            opcode: 0xCD,
            offset: 2
        })
    );
}
