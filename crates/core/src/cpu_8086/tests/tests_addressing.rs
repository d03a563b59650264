use super::*;
use crate::cpu_8086::{Memory8086, AX, BP, BX, CX, DI, DX, SI, SP, SS};

#[test]
fn test_mov_reg_imm_byte_and_word() {
    // MOV AH,0x12; MOV BL,0x34; MOV CX,0xBEEF
    let mut cpu = machine(&[0xB4, 0x12, 0xB3, 0x34, 0xB9, 0xEF, 0xBE]);
    cpu.run(3);
    assert_eq!(cpu.regs.ax(), 0x1200);
    assert_eq!(cpu.regs.reg16(BX), 0x0034);
    assert_eq!(cpu.regs.cx(), 0xBEEF);
    assert_eq!(cpu.regs.ip, 7);
}

#[test]
fn test_mov_both_directions() {
    // MOV [BX+SI],AX; MOV DX,[BX+SI]
    let mut cpu = machine(&[0x89, 0x00, 0x8B, 0x10]);
    cpu.regs.set_reg16(AX, 0xCAFE);
    cpu.regs.set_reg16(BX, 0x0100);
    cpu.regs.set_reg16(SI, 0x0020);
    cpu.step();
    assert_eq!(cpu.memory.read_u16(data(0x0120)), 0xCAFE);

    cpu.step();
    assert_eq!(cpu.regs.reg16(DX), 0xCAFE);
}

#[test]
fn test_negative_disp8() {
    // MOV AL,[DI-2]
    let mut cpu = machine(&[0x8A, 0x45, 0xFE]);
    cpu.regs.set_reg16(DI, 0x0010);
    cpu.memory.write(data(0x000E), 0x5A);
    cpu.step();
    assert_eq!(cpu.regs.al(), 0x5A);
    assert_eq!(cpu.regs.ip, 3);
}

#[test]
fn test_bp_addresses_stack_segment() {
    // MOV AX,[BP+4]
    let mut cpu = machine(&[0x8B, 0x46, 0x04]);
    cpu.regs.set_reg16(BP, 0x0200);
    cpu.write_u16(STACK_SEG, 0x0204, 0x1357);
    cpu.write_u16(DATA_SEG, 0x0204, 0x9999);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x1357);
}

#[test]
fn test_segment_override_prefix() {
    // ES: MOV AX,[BX]
    let mut cpu = machine(&[0x26, 0x8B, 0x07]);
    cpu.regs.set_reg16(BX, 0x0040);
    cpu.memory.write_u16(extra(0x0040), 0x4444);
    cpu.memory.write_u16(data(0x0040), 0x3333);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x4444);
    assert_eq!(cpu.regs.ip, 3);
    // The override lasts for one instruction
    assert_eq!(cpu.prefix.segment, None);
}

#[test]
fn test_override_on_bp_form() {
    // DS: MOV AX,[BP+0]
    let mut cpu = machine(&[0x3E, 0x8B, 0x46, 0x00]);
    cpu.regs.set_reg16(BP, 0x0010);
    cpu.memory.write_u16(data(0x0010), 0x0D0D);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x0D0D);
}

#[test]
fn test_moffs_forms() {
    // MOV [0x0300],AX; MOV AL,[0x0301]
    let mut cpu = machine(&[0xA3, 0x00, 0x03, 0xA0, 0x01, 0x03]);
    cpu.regs.set_reg16(AX, 0xA1B2);
    cpu.step();
    assert_eq!(cpu.memory.read_u16(data(0x0300)), 0xA1B2);

    cpu.regs.set_reg16(AX, 0);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x00A1);
}

#[test]
fn test_mov_rm_imm_group() {
    // MOV WORD [0x0010],0x1234; MOV BYTE [BX],0x56
    let mut cpu = machine(&[0xC7, 0x06, 0x10, 0x00, 0x34, 0x12, 0xC6, 0x07, 0x56]);
    cpu.regs.set_reg16(BX, 0x0020);
    cpu.run(2);
    assert_eq!(cpu.memory.read_u16(data(0x0010)), 0x1234);
    assert_eq!(cpu.memory.read(data(0x0020)), 0x56);
    assert_eq!(cpu.regs.ip, 9);
}

#[test]
fn test_mov_segment_registers() {
    // MOV DS,AX; MOV BX,SS
    let mut cpu = machine(&[0x8E, 0xD8, 0x8C, 0xD3]);
    cpu.regs.set_reg16(AX, 0x5000);
    cpu.run(2);
    assert_eq!(cpu.regs.seg(DS), 0x5000);
    assert_eq!(cpu.regs.reg16(BX), STACK_SEG);
}

#[test]
fn test_xchg_forms() {
    // XCHG AX,CX; XCHG [BX],DL
    let mut cpu = machine(&[0x91, 0x86, 0x17]);
    cpu.regs.set_reg16(AX, 0x1111);
    cpu.regs.set_reg16(CX, 0x2222);
    cpu.regs.set_reg8(2, 0x77);
    cpu.memory.write(data(0), 0x88);
    cpu.run(2);
    assert_eq!(cpu.regs.ax(), 0x2222);
    assert_eq!(cpu.regs.cx(), 0x1111);
    assert_eq!(cpu.regs.reg8(2), 0x88);
    assert_eq!(cpu.memory.read(data(0)), 0x77);
}

#[test]
fn test_lea_computes_offset_only() {
    // LEA AX,[BX+SI+5]
    let mut cpu = machine(&[0x8D, 0x40, 0x05]);
    cpu.regs.set_reg16(BX, 0xFFF0);
    cpu.regs.set_reg16(SI, 0x0010);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x0005);
}

#[test]
fn test_lds_les() {
    // LDS SI,[0x0040]; LES DI,[0x0044]
    let mut cpu = machine(&[0xC5, 0x36, 0x40, 0x00, 0xC4, 0x3E, 0x44, 0x00]);
    cpu.memory.write_u16(data(0x0040), 0x1234);
    cpu.memory.write_u16(data(0x0042), 0x5000);
    cpu.memory.write_u16(data(0x0044), 0x0010);
    cpu.memory.write_u16(data(0x0046), 0x6000);

    cpu.step();
    assert_eq!(cpu.regs.reg16(SI), 0x1234);
    assert_eq!(cpu.regs.seg(DS), 0x5000);

    // DS has moved, so put the second pointer where it now points
    cpu.write_u16(0x5000, 0x0044, 0x0010);
    cpu.write_u16(0x5000, 0x0046, 0x6000);
    cpu.step();
    assert_eq!(cpu.regs.reg16(DI), 0x0010);
    assert_eq!(cpu.regs.seg(ES), 0x6000);
}

#[test]
fn test_xlat_table_lookup() {
    let mut cpu = machine(&[0xD7]);
    cpu.regs.set_reg16(BX, 0x0100);
    cpu.regs.set_al(0x05);
    cpu.memory.write(data(0x0105), 0xEE);
    cpu.step();
    assert_eq!(cpu.regs.al(), 0xEE);
}

#[test]
fn test_push_pop_through_memory_operands() {
    // PUSH WORD [0x0010]; POP WORD [0x0020]
    let mut cpu = machine(&[0xFF, 0x36, 0x10, 0x00, 0x8F, 0x06, 0x20, 0x00]);
    cpu.memory.write_u16(data(0x0010), 0xABCD);
    cpu.step();
    assert_eq!(cpu.regs.reg16(SP), STACK_TOP - 2);
    assert_eq!(cpu.read_u16(cpu.regs.seg(SS), STACK_TOP - 2), 0xABCD);

    cpu.step();
    assert_eq!(cpu.regs.reg16(SP), STACK_TOP);
    assert_eq!(cpu.memory.read_u16(data(0x0020)), 0xABCD);
}

#[test]
fn test_push_sp_pushes_decremented_value() {
    // PUSH SP
    let mut cpu = machine(&[0x54]);
    cpu.step();
    assert_eq!(cpu.read_u16(STACK_SEG, STACK_TOP - 2), STACK_TOP - 2);
}

#[test]
fn test_push_pop_segment_registers() {
    // PUSH ES; POP DS
    let mut cpu = machine(&[0x06, 0x1F]);
    cpu.run(2);
    assert_eq!(cpu.regs.seg(DS), EXTRA_SEG);
    assert_eq!(cpu.regs.reg16(SP), STACK_TOP);
}
