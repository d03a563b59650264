//! Data transfer: MOV in all its forms, XCHG, LEA, LDS/LES, XLAT, LAHF/SAHF
//! and port I/O.

use crate::cpu_8086::core::Cpu8086;
use crate::cpu_8086::memory::Memory8086;
use crate::cpu_8086::registry::{Handler, RegistryBuilder};
use crate::cpu_8086::state::{Width, AX, BX, DS, DX, ES};
use crate::error::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};

// SF ZF AF PF CF
const SAHF_MASK: u16 = 0x00D5;

fn register_form_stub<M: Memory8086>(cpu: &Cpu8086<M>, what: &str) {
    log(LogCategory::Stubs, LogLevel::Warn, || {
        format!(
            "Stubs: {} with a register operand at {:04X} ignored",
            what, cpu.regs.ip
        )
    });
}

// 88-8B
fn mov_rm_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    cpu.resolve_modrm(Width::from_opcode(opcode));
    if opcode & 0x02 == 0 {
        let val = cpu.reg_value();
        cpu.write_rm(val);
    } else {
        let val = cpu.rm_value();
        cpu.write_reg(val);
    }
}

// 8C
fn mov_rm_sreg<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.resolve_modrm(Width::Word);
    let val = cpu.regs.seg(cpu.modrm.reg as usize);
    cpu.write_rm(val);
}

// 8E
fn mov_sreg_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.resolve_modrm(Width::Word);
    let sreg = cpu.modrm.reg as usize;
    let val = cpu.rm_value();
    cpu.regs.set_seg(sreg, val);
}

// B0-BF: bit 3 is the width, the low three bits the register
fn mov_reg_imm<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let width = if opcode & 0x08 != 0 {
        Width::Word
    } else {
        Width::Byte
    };
    let val = cpu.fetch(width);
    cpu.regs.set_reg(width, (opcode & 7) as usize, val);
}

// C6/C7 /0
fn mov_rm_imm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let val = cpu.fetch(cpu.modrm.width);
    cpu.write_rm(val);
}

// A0-A3
fn mov_acc_moffs<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let width = Width::from_opcode(opcode);
    let offset = cpu.fetch_u16();
    let segment = cpu.data_segment(DS);
    if opcode & 0x02 == 0 {
        let val = cpu.read(width, segment, offset);
        cpu.regs.set_reg(width, AX, val);
    } else {
        let val = cpu.regs.reg(width, AX);
        cpu.write(width, segment, offset, val);
    }
}

// 86/87
fn xchg_rm_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    cpu.resolve_modrm(Width::from_opcode(opcode));
    let (rm, reg) = (cpu.rm_value(), cpu.reg_value());
    cpu.write_rm(reg);
    cpu.write_reg(rm);
}

// 90-97; 90 is NOP
fn xchg_ax_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let index = (opcode & 7) as usize;
    let ax = cpu.regs.reg16(AX);
    let other = cpu.regs.reg16(index);
    cpu.regs.set_reg16(AX, other);
    cpu.regs.set_reg16(index, ax);
}

// 8D
fn lea<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.resolve_modrm(Width::Word);
    match cpu.rm_offset() {
        Some(offset) => cpu.write_reg(offset),
        None => register_form_stub(cpu, "LEA"),
    }
}

// C4 LES / C5 LDS
fn load_far_pointer<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    cpu.resolve_modrm(Width::Word);
    let sreg = if opcode == 0xC5 { DS } else { ES };
    match cpu.rm_far_pointer() {
        Some((offset, segment)) => {
            cpu.write_reg(offset);
            cpu.regs.set_seg(sreg, segment);
        }
        None => register_form_stub(cpu, if sreg == DS { "LDS" } else { "LES" }),
    }
}

// D7
fn xlat<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let offset = cpu.regs.reg16(BX).wrapping_add(cpu.regs.al() as u16);
    let val = cpu.read_u8(cpu.data_segment(DS), offset);
    cpu.regs.set_al(val);
}

// 9F
fn lahf<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.set_ah(cpu.regs.flags as u8);
}

// 9E
fn sahf<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let ah = cpu.regs.ah() as u16;
    cpu.regs.flags = (cpu.regs.flags & !SAHF_MASK) | (ah & SAHF_MASK);
}

// E4/E5 IN acc,imm8; EC/ED IN acc,DX
fn in_acc<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let width = Width::from_opcode(opcode);
    let port = if opcode & 0x08 != 0 {
        cpu.regs.reg16(DX)
    } else {
        cpu.fetch_u8() as u16
    };
    let val = cpu.pin(width, port);
    cpu.regs.set_reg(width, AX, val);
}

// E6/E7 OUT imm8,acc; EE/EF OUT DX,acc
fn out_acc<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let width = Width::from_opcode(opcode);
    let port = if opcode & 0x08 != 0 {
        cpu.regs.reg16(DX)
    } else {
        cpu.fetch_u8() as u16
    };
    let val = cpu.regs.reg(width, AX);
    cpu.pout(width, port, val);
}

pub fn register<M: Memory8086>(b: &mut RegistryBuilder<M>) -> Result<(), ConfigError> {
    b.direct("1000_100*", Handler::operand("MOV r/m,reg", mov_rm_reg, 2, 9))?;
    b.direct("1000_101*", Handler::operand("MOV reg,r/m", mov_rm_reg, 2, 8))?;
    b.direct("1000_1100", Handler::operand("MOV r/m,sreg", mov_rm_sreg, 2, 9))?;
    b.direct("1000_1110", Handler::operand("MOV sreg,r/m", mov_sreg_rm, 2, 8))?;
    b.direct("1011_****", Handler::fixed("MOV reg,imm", mov_reg_imm, 4))?;
    b.group("1100_011*", &[("000", Handler::operand("MOV r/m,imm", mov_rm_imm, 4, 10))])?;
    b.direct("1010_00**", Handler::fixed("MOV acc,moffs", mov_acc_moffs, 10))?;

    b.direct("1000_011*", Handler::operand("XCHG r/m,reg", xchg_rm_reg, 4, 17))?;
    b.direct("1001_0***", Handler::fixed("XCHG AX,r16", xchg_ax_reg, 3))?;

    b.direct("1000_1101", Handler::fixed("LEA", lea, 2))?;
    b.direct("1100_010*", Handler::fixed("LES/LDS", load_far_pointer, 16))?;
    b.direct("1101_0111", Handler::fixed("XLAT", xlat, 11))?;
    b.direct("1001_1111", Handler::fixed("LAHF", lahf, 4))?;
    b.direct("1001_1110", Handler::fixed("SAHF", sahf, 4))?;

    b.direct("1110_010*", Handler::fixed("IN acc,imm8", in_acc, 10))?;
    b.direct("1110_011*", Handler::fixed("OUT imm8,acc", out_acc, 10))?;
    b.direct("1110_110*", Handler::fixed("IN acc,DX", in_acc, 8))?;
    b.direct("1110_111*", Handler::fixed("OUT DX,acc", out_acc, 8))?;
    Ok(())
}
