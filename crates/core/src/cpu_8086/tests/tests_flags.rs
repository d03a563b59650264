use super::*;
use crate::cpu_8086::{
    AX, BX, CX, FLAGS_RESERVED, FLAG_AF, FLAG_CF, FLAG_DF, FLAG_IF, FLAG_OF, FLAG_PF, FLAG_SF,
    FLAG_TF, FLAG_ZF, SP,
};

const ARITH_FLAGS: u16 = FLAG_CF | FLAG_PF | FLAG_AF | FLAG_ZF | FLAG_SF | FLAG_OF;

fn arith_flags(cpu: &Cpu8086<ArrayMemory>) -> u16 {
    cpu.regs.flags & ARITH_FLAGS
}

#[test]
fn test_add_al_imm_wraps_to_zero() {
    // ADD AL,1
    let mut cpu = machine(&[0x04, 0x01]);
    cpu.regs.set_al(0xFF);
    cpu.step();

    assert_eq!(cpu.regs.al(), 0x00);
    assert_eq!(arith_flags(&cpu), FLAG_CF | FLAG_PF | FLAG_AF | FLAG_ZF);
    assert_eq!(cpu.regs.ip, 2);
}

#[test]
fn test_add_al_imm_signed_overflow() {
    let mut cpu = machine(&[0x04, 0x01]);
    cpu.regs.set_al(0x7F);
    cpu.step();

    assert_eq!(cpu.regs.al(), 0x80);
    assert_eq!(arith_flags(&cpu), FLAG_AF | FLAG_SF | FLAG_OF);
}

#[test]
fn test_add_leaves_ah_alone() {
    let mut cpu = machine(&[0x04, 0x01]);
    cpu.regs.set_reg16(AX, 0x12FF);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x1200);
}

#[test]
fn test_sub_word_borrow() {
    // SUB AX,BX
    let mut cpu = machine(&[0x29, 0xD8]);
    cpu.regs.set_reg16(AX, 0x0001);
    cpu.regs.set_reg16(BX, 0x0002);
    cpu.step();

    assert_eq!(cpu.regs.ax(), 0xFFFF);
    assert!(cpu.regs.flag(FLAG_CF));
    assert!(cpu.regs.flag(FLAG_SF));
    assert!(cpu.regs.flag(FLAG_PF));
    assert!(!cpu.regs.flag(FLAG_ZF));
    assert!(!cpu.regs.flag(FLAG_OF));
}

#[test]
fn test_cmp_sets_flags_without_storing() {
    // CMP AL,0x10
    let mut cpu = machine(&[0x3C, 0x10]);
    cpu.regs.set_al(0x10);
    cpu.step();
    assert_eq!(cpu.regs.al(), 0x10);
    assert!(cpu.regs.flag(FLAG_ZF));
    assert!(!cpu.regs.flag(FLAG_CF));
}

#[test]
fn test_adc_chain_carries_into_high_word() {
    // ADD AX,0xFFFF; ADC DX,0
    let mut cpu = machine(&[0x05, 0xFF, 0xFF, 0x83, 0xD2, 0x00]);
    cpu.regs.set_reg16(AX, 0x0001);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x0000);
    assert!(cpu.regs.flag(FLAG_CF));

    cpu.step();
    assert_eq!(cpu.regs.reg16(2), 0x0001);
    assert!(!cpu.regs.flag(FLAG_CF));
}

#[test]
fn test_inc_dec_preserve_carry() {
    // STC; INC CX; DEC CX
    let mut cpu = machine(&[0xF9, 0x41, 0x49]);
    cpu.regs.set_reg16(CX, 0xFFFF);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.cx(), 0);
    assert!(cpu.regs.flag(FLAG_ZF));
    assert!(cpu.regs.flag(FLAG_CF));

    cpu.step();
    assert_eq!(cpu.regs.cx(), 0xFFFF);
    assert!(cpu.regs.flag(FLAG_SF));
    assert!(cpu.regs.flag(FLAG_CF));
}

#[test]
fn test_logic_clears_carry_and_overflow() {
    // STC; OR AL,0x80
    let mut cpu = machine(&[0xF9, 0x0C, 0x80]);
    cpu.regs.flags |= FLAG_OF;
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.al(), 0x80);
    assert!(!cpu.regs.flag(FLAG_CF));
    assert!(!cpu.regs.flag(FLAG_OF));
    assert!(cpu.regs.flag(FLAG_SF));
}

#[test]
fn test_neg_sets_carry_unless_zero() {
    // NEG AL; NEG BL
    let mut cpu = machine(&[0xF6, 0xD8, 0xF6, 0xDB]);
    cpu.regs.set_al(0x01);
    cpu.step();
    assert_eq!(cpu.regs.al(), 0xFF);
    assert!(cpu.regs.flag(FLAG_CF));

    cpu.step();
    assert_eq!(cpu.regs.reg8(3), 0x00);
    assert!(!cpu.regs.flag(FLAG_CF));
    assert!(cpu.regs.flag(FLAG_ZF));
}

#[test]
fn test_flag_opcodes() {
    // STC; CMC; STD; CLD; STI; CLI
    let mut cpu = machine(&[0xF9, 0xF5, 0xFD, 0xFC, 0xFB, 0xFA]);
    cpu.step();
    assert!(cpu.regs.flag(FLAG_CF));
    cpu.step();
    assert!(!cpu.regs.flag(FLAG_CF));
    cpu.step();
    assert!(cpu.regs.flag(FLAG_DF));
    cpu.step();
    assert!(!cpu.regs.flag(FLAG_DF));
    cpu.step();
    assert!(cpu.regs.flag(FLAG_IF));
    cpu.step();
    assert!(!cpu.regs.flag(FLAG_IF));
    assert_eq!(cpu.regs.flags, FLAGS_RESERVED);
}

#[test]
fn test_lahf_sahf() {
    // LAHF; SAHF
    let mut cpu = machine(&[0x9F, 0x9E]);
    cpu.regs.flags = FLAGS_RESERVED | FLAG_CF | FLAG_ZF | FLAG_OF;
    cpu.step();
    assert_eq!(cpu.regs.ah(), (FLAGS_RESERVED | FLAG_CF | FLAG_ZF) as u8);

    // SAHF loads SF ZF AF PF CF only
    cpu.regs.set_ah(0xFF);
    cpu.step();
    assert_eq!(
        cpu.regs.flags,
        FLAGS_RESERVED | FLAG_OF | FLAG_SF | FLAG_ZF | FLAG_AF | FLAG_PF | FLAG_CF
    );
}

#[test]
fn test_pushf_popf_round_trip() {
    let defined = [
        FLAG_CF, FLAG_PF, FLAG_AF, FLAG_ZF, FLAG_SF, FLAG_TF, FLAG_IF, FLAG_DF, FLAG_OF,
    ];
    // PUSHF; POPF
    let mut cpu = machine(&[0x9C, 0x9D]);

    for combo in 0u32..(1 << defined.len()) {
        let flags = defined
            .iter()
            .enumerate()
            .filter(|(bit, _)| combo & (1 << bit) != 0)
            .fold(FLAGS_RESERVED, |acc, (_, flag)| acc | flag);

        cpu.regs.ip = 0;
        cpu.regs.flags = flags;
        cpu.step();
        let pushed = cpu.read_u16(STACK_SEG, STACK_TOP - 2);
        assert_eq!(pushed, flags);

        cpu.regs.flags = FLAGS_RESERVED;
        cpu.step();
        assert_eq!(cpu.regs.flags, flags, "combination {:#05X}", combo);
        assert_eq!(cpu.regs.reg16(SP), STACK_TOP);
    }
}

#[test]
fn test_mul_sets_carry_on_high_half() {
    // MUL BL
    let mut cpu = machine(&[0xF6, 0xE3, 0xF6, 0xE3]);
    cpu.regs.set_al(0x10);
    cpu.regs.set_reg8(3, 0x10);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x0100);
    assert!(cpu.regs.flag(FLAG_CF));
    assert!(cpu.regs.flag(FLAG_OF));

    cpu.regs.set_reg16(AX, 0x0002);
    cpu.step();
    assert_eq!(cpu.regs.ax(), 0x0020);
    assert!(!cpu.regs.flag(FLAG_CF));
    assert!(!cpu.regs.flag(FLAG_OF));
}

#[test]
fn test_daa_after_bcd_add() {
    // ADD AL,0x38; DAA  (0x19 + 0x38 = BCD 57)
    let mut cpu = machine(&[0x04, 0x38, 0x27]);
    cpu.regs.set_al(0x19);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.al(), 0x57);
    assert!(!cpu.regs.flag(FLAG_CF));
}
