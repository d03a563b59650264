//! Arithmetic and logic: the eight ALU operations, INC/DEC, the F6/F7 group,
//! TEST, sign extension and the BCD adjusts.

use crate::cpu_8086::core::Cpu8086;
use crate::cpu_8086::flags;
use crate::cpu_8086::memory::Memory8086;
use crate::cpu_8086::modrm::ModRm;
use crate::cpu_8086::registry::{Handler, RegistryBuilder};
use crate::cpu_8086::state::{Width, AX, DX, FLAG_AF, FLAG_CF, FLAG_OF};
use crate::cpu_8086::timing::Cost;
use crate::error::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};

const ALU_ADD: u8 = 0;
const ALU_OR: u8 = 1;
const ALU_ADC: u8 = 2;
const ALU_SBB: u8 = 3;
const ALU_AND: u8 = 4;
const ALU_SUB: u8 = 5;
const ALU_XOR: u8 = 6;
const ALU_CMP: u8 = 7;

const STICKY: u16 = FLAG_CF | FLAG_AF | FLAG_OF;

/// ADC: add, then add the carry as a second pass
///
/// PF/SF/ZF come from the second pass; CF, AF and OF are set if either pass
/// set them.
fn adc(f: u16, width: Width, d: u32, s: u32) -> (u32, u16) {
    let first = d + s;
    let flags = flags::add(f, width, d, s, first);
    if f & FLAG_CF == 0 {
        return (first, flags);
    }
    let masked = first & width.mask();
    let second = masked + 1;
    let second_flags = flags::add(f, width, masked, 1, second);
    (second, (second_flags & !STICKY) | ((flags | second_flags) & STICKY))
}

/// SBB: subtract, then subtract the borrow as a second pass
fn sbb(f: u16, width: Width, d: u32, s: u32) -> (u32, u16) {
    let first = d.wrapping_sub(s);
    let flags = flags::sub(f, width, d, s, first);
    if f & FLAG_CF == 0 {
        return (first, flags);
    }
    let masked = first & width.mask();
    let second = masked.wrapping_sub(1);
    let second_flags = flags::sub(f, width, masked, 1, second);
    (second, (second_flags & !STICKY) | ((flags | second_flags) & STICKY))
}

/// Run ALU operation `op` on `dst` and `src`, updating FLAGS
///
/// Returns the value to store, or `None` for CMP.
pub fn alu<M: Memory8086>(cpu: &mut Cpu8086<M>, op: u8, width: Width, dst: u16, src: u16) -> Option<u16> {
    let (d, s) = (dst as u32 & width.mask(), src as u32 & width.mask());
    let f = cpu.regs.flags;
    let (result, flags) = match op & 7 {
        ALU_ADD => {
            let r = d + s;
            (r, flags::add(f, width, d, s, r))
        }
        ALU_OR => {
            let r = d | s;
            (r, flags::logic(f, width, r))
        }
        ALU_ADC => adc(f, width, d, s),
        ALU_SBB => sbb(f, width, d, s),
        ALU_AND => {
            let r = d & s;
            (r, flags::logic(f, width, r))
        }
        ALU_XOR => {
            let r = d ^ s;
            (r, flags::logic(f, width, r))
        }
        // `op & 7` never exceeds 7
        ALU_SUB | ALU_CMP | 8..=u8::MAX => {
            let r = d.wrapping_sub(s);
            (r, flags::sub(f, width, d, s, r))
        }
    };
    cpu.regs.flags = flags;
    if op & 7 == ALU_CMP {
        None
    } else {
        Some((result & width.mask()) as u16)
    }
}

fn divide_error<M: Memory8086>(cpu: &mut Cpu8086<M>) {
    log(LogCategory::Interrupts, LogLevel::Debug, || {
        "Interrupts: divide error".to_string()
    });
    cpu.interrupt(0);
}

// 00ooo0dw: ALU r/m, reg in either direction
fn alu_rm_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let width = Width::from_opcode(opcode);
    let op = (opcode >> 3) & 7;
    cpu.resolve_modrm(width);
    if opcode & 0x02 == 0 {
        let (dst, src) = (cpu.rm_value(), cpu.reg_value());
        if let Some(result) = alu(cpu, op, width, dst, src) {
            cpu.write_rm(result);
        }
    } else {
        let (dst, src) = (cpu.reg_value(), cpu.rm_value());
        if let Some(result) = alu(cpu, op, width, dst, src) {
            cpu.write_reg(result);
        }
    }
}

// 00ooo10w: ALU AL/AX, imm
fn alu_acc_imm<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let width = Width::from_opcode(opcode);
    let src = cpu.fetch(width);
    let dst = cpu.regs.reg(width, AX);
    if let Some(result) = alu(cpu, (opcode >> 3) & 7, width, dst, src) {
        cpu.regs.set_reg(width, AX, result);
    }
}

// 80-83 /op: ALU r/m, imm (83 sign-extends an imm8)
fn alu_rm_imm<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let ModRm { width, reg: op, .. } = cpu.modrm;
    let src = if opcode == 0x83 {
        cpu.fetch_u8() as i8 as i16 as u16
    } else {
        cpu.fetch(width)
    };
    let dst = cpu.rm_value();
    if let Some(result) = alu(cpu, op, width, dst, src) {
        cpu.write_rm(result);
    }
}

fn inc_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let index = (opcode & 7) as usize;
    let val = cpu.regs.reg16(index) as u32;
    let result = val + 1;
    cpu.regs.flags = flags::add_no_carry(cpu.regs.flags, Width::Word, val, 1, result);
    cpu.regs.set_reg16(index, result as u16);
}

fn dec_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let index = (opcode & 7) as usize;
    let val = cpu.regs.reg16(index) as u32;
    let result = val.wrapping_sub(1);
    cpu.regs.flags = flags::sub_no_carry(cpu.regs.flags, Width::Word, val, 1, result);
    cpu.regs.set_reg16(index, result as u16);
}

// FE/FF /0
fn inc_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let width = cpu.modrm.width;
    let val = cpu.rm_value() as u32;
    let result = val + 1;
    cpu.regs.flags = flags::add_no_carry(cpu.regs.flags, width, val, 1, result);
    cpu.write_rm(result as u16);
}

// FE/FF /1
fn dec_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let width = cpu.modrm.width;
    let val = cpu.rm_value() as u32;
    let result = val.wrapping_sub(1);
    cpu.regs.flags = flags::sub_no_carry(cpu.regs.flags, width, val, 1, result);
    cpu.write_rm(result as u16);
}

// 84/85
fn test_rm_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let width = Width::from_opcode(opcode);
    cpu.resolve_modrm(width);
    let result = (cpu.rm_value() & cpu.reg_value()) as u32;
    cpu.regs.flags = flags::logic(cpu.regs.flags, width, result);
}

// A8/A9
fn test_acc_imm<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let width = Width::from_opcode(opcode);
    let imm = cpu.fetch(width);
    let result = (cpu.regs.reg(width, AX) & imm) as u32;
    cpu.regs.flags = flags::logic(cpu.regs.flags, width, result);
}

// F6/F7 /0
fn test_rm_imm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let width = cpu.modrm.width;
    let imm = cpu.fetch(width);
    let result = (cpu.rm_value() & imm) as u32;
    cpu.regs.flags = flags::logic(cpu.regs.flags, width, result);
}

// F6/F7 /2
fn not_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let val = cpu.rm_value();
    cpu.write_rm(!val);
}

// F6/F7 /3
fn neg_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let width = cpu.modrm.width;
    let val = cpu.rm_value() as u32;
    let result = 0u32.wrapping_sub(val);
    cpu.regs.flags = flags::sub(cpu.regs.flags, width, 0, val, result);
    cpu.write_rm(result as u16);
}

// F6/F7 /4
fn mul_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let src = cpu.rm_value() as u32;
    let high_set = match cpu.modrm.width {
        Width::Byte => {
            let result = cpu.regs.al() as u32 * src;
            cpu.regs.set_reg16(AX, result as u16);
            result > 0xFF
        }
        Width::Word => {
            let result = cpu.regs.ax() as u32 * src;
            cpu.regs.set_reg16(AX, result as u16);
            cpu.regs.set_reg16(DX, (result >> 16) as u16);
            result > 0xFFFF
        }
    };
    cpu.regs.set_flag(FLAG_CF, high_set);
    cpu.regs.set_flag(FLAG_OF, high_set);
}

// F6/F7 /5
fn imul_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let src = cpu.rm_value();
    let extended = match cpu.modrm.width {
        Width::Byte => {
            let result = cpu.regs.al() as i8 as i16 * src as u8 as i8 as i16;
            cpu.regs.set_reg16(AX, result as u16);
            result != result as i8 as i16
        }
        Width::Word => {
            let result = cpu.regs.ax() as i16 as i32 * src as i16 as i32;
            cpu.regs.set_reg16(AX, result as u16);
            cpu.regs.set_reg16(DX, (result >> 16) as u16);
            result != result as i16 as i32
        }
    };
    cpu.regs.set_flag(FLAG_CF, extended);
    cpu.regs.set_flag(FLAG_OF, extended);
}

// F6/F7 /6
fn div_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let divisor = cpu.rm_value() as u32;
    if divisor == 0 {
        divide_error(cpu);
        return;
    }
    match cpu.modrm.width {
        Width::Byte => {
            let dividend = cpu.regs.ax() as u32;
            let quotient = dividend / divisor;
            if quotient > 0xFF {
                divide_error(cpu);
                return;
            }
            cpu.regs.set_al(quotient as u8);
            cpu.regs.set_ah((dividend % divisor) as u8);
        }
        Width::Word => {
            let dividend = ((cpu.regs.reg16(DX) as u32) << 16) | cpu.regs.ax() as u32;
            let quotient = dividend / divisor;
            if quotient > 0xFFFF {
                divide_error(cpu);
                return;
            }
            cpu.regs.set_reg16(AX, quotient as u16);
            cpu.regs.set_reg16(DX, (dividend % divisor) as u16);
        }
    }
}

// F6/F7 /7
fn idiv_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let src = cpu.rm_value();
    match cpu.modrm.width {
        Width::Byte => {
            let divisor = src as u8 as i8 as i32;
            if divisor == 0 {
                divide_error(cpu);
                return;
            }
            let dividend = cpu.regs.ax() as i16 as i32;
            let quotient = dividend / divisor;
            if !(-128..=127).contains(&quotient) {
                divide_error(cpu);
                return;
            }
            cpu.regs.set_al(quotient as u8);
            cpu.regs.set_ah((dividend % divisor) as u8);
        }
        Width::Word => {
            let divisor = src as i16 as i64;
            if divisor == 0 {
                divide_error(cpu);
                return;
            }
            let dividend = (((cpu.regs.reg16(DX) as u32) << 16) | cpu.regs.ax() as u32) as i32 as i64;
            let quotient = dividend / divisor;
            if !(-32768..=32767).contains(&quotient) {
                divide_error(cpu);
                return;
            }
            cpu.regs.set_reg16(AX, quotient as u16);
            cpu.regs.set_reg16(DX, (dividend % divisor) as u16);
        }
    }
}

fn cbw<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let ah = if cpu.regs.al() & 0x80 != 0 { 0xFF } else { 0x00 };
    cpu.regs.set_ah(ah);
}

fn cwd<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let dx = if cpu.regs.ax() & 0x8000 != 0 { 0xFFFF } else { 0x0000 };
    cpu.regs.set_reg16(DX, dx);
}

fn daa<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let old_al = cpu.regs.al();
    let old_cf = cpu.regs.flag(FLAG_CF);
    let mut al = old_al;

    let low_adjust = (al & 0x0F) > 9 || cpu.regs.flag(FLAG_AF);
    if low_adjust {
        al = al.wrapping_add(6);
    }
    let high_adjust = old_al > 0x99 || old_cf;
    if high_adjust {
        al = al.wrapping_add(0x60);
    }

    cpu.regs.set_flag(FLAG_AF, low_adjust);
    cpu.regs.set_flag(FLAG_CF, high_adjust);
    cpu.regs.set_al(al);
    cpu.regs.flags = flags::psz(cpu.regs.flags, Width::Byte, al as u32);
}

fn das<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let old_al = cpu.regs.al();
    let old_cf = cpu.regs.flag(FLAG_CF);
    let mut al = old_al;

    let low_adjust = (al & 0x0F) > 9 || cpu.regs.flag(FLAG_AF);
    if low_adjust {
        al = al.wrapping_sub(6);
    }
    let high_adjust = old_al > 0x99 || old_cf;
    if high_adjust {
        al = al.wrapping_sub(0x60);
    }

    cpu.regs.set_flag(FLAG_AF, low_adjust);
    cpu.regs.set_flag(FLAG_CF, high_adjust);
    cpu.regs.set_al(al);
    cpu.regs.flags = flags::psz(cpu.regs.flags, Width::Byte, al as u32);
}

fn aaa<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let adjust = (cpu.regs.al() & 0x0F) > 9 || cpu.regs.flag(FLAG_AF);
    if adjust {
        // AL += 6, AH += 1
        let ax = cpu.regs.ax().wrapping_add(0x106);
        cpu.regs.set_reg16(AX, ax);
    }
    cpu.regs.set_flag(FLAG_AF, adjust);
    cpu.regs.set_flag(FLAG_CF, adjust);
    let al = cpu.regs.al() & 0x0F;
    cpu.regs.set_al(al);
}

fn aas<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let adjust = (cpu.regs.al() & 0x0F) > 9 || cpu.regs.flag(FLAG_AF);
    if adjust {
        let al = cpu.regs.al().wrapping_sub(6);
        let ah = cpu.regs.ah().wrapping_sub(1);
        cpu.regs.set_al(al);
        cpu.regs.set_ah(ah);
    }
    cpu.regs.set_flag(FLAG_AF, adjust);
    cpu.regs.set_flag(FLAG_CF, adjust);
    let al = cpu.regs.al() & 0x0F;
    cpu.regs.set_al(al);
}

fn aam<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let base = cpu.fetch_u8();
    if base == 0 {
        divide_error(cpu);
        return;
    }
    let al = cpu.regs.al();
    cpu.regs.set_ah(al / base);
    cpu.regs.set_al(al % base);
    cpu.regs.flags = flags::psz(cpu.regs.flags, Width::Byte, (al % base) as u32);
}

fn aad<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let base = cpu.fetch_u8();
    let al = cpu.regs.al().wrapping_add(cpu.regs.ah().wrapping_mul(base));
    cpu.regs.set_reg16(AX, al as u16);
    cpu.regs.flags = flags::psz(cpu.regs.flags, Width::Byte, al as u32);
}

pub fn register<M: Memory8086>(b: &mut RegistryBuilder<M>) -> Result<(), ConfigError> {
    b.direct("00***00*", Handler::operand("ALU r/m,reg", alu_rm_reg, 3, 16))?;
    b.direct("00***01*", Handler::operand("ALU reg,r/m", alu_rm_reg, 3, 9))?;
    b.direct("00***10*", Handler::fixed("ALU acc,imm", alu_acc_imm, 4))?;
    b.group("1000_00**", &[("***", Handler::operand("ALU r/m,imm", alu_rm_imm, 4, 17))])?;

    b.direct("0100_0***", Handler::fixed("INC r16", inc_reg, 2))?;
    b.direct("0100_1***", Handler::fixed("DEC r16", dec_reg, 2))?;
    b.group(
        "1111_111*",
        &[
            ("000", Handler::operand("INC r/m", inc_rm, 3, 15)),
            ("001", Handler::operand("DEC r/m", dec_rm, 3, 15)),
        ],
    )?;

    b.direct("1000_010*", Handler::operand("TEST r/m,reg", test_rm_reg, 3, 9))?;
    b.direct("1010_100*", Handler::fixed("TEST acc,imm", test_acc_imm, 4))?;

    // F6 and F7 share children but differ in multiply/divide timing
    for (template, mul, imul, div, idiv) in [
        ("1111_0110", 70, 80, 80, 101),
        ("1111_0111", 118, 128, 144, 165),
    ] {
        b.group(
            template,
            &[
                ("000", Handler::operand("TEST r/m,imm", test_rm_imm, 5, 11)),
                ("010", Handler::operand("NOT r/m", not_rm, 3, 16)),
                ("011", Handler::operand("NEG r/m", neg_rm, 3, 16)),
                ("100", Handler::fixed("MUL r/m", mul_rm, mul)),
                ("101", Handler::fixed("IMUL r/m", imul_rm, imul)),
                ("110", Handler::fixed("DIV r/m", div_rm, div)),
                ("111", Handler::fixed("IDIV r/m", idiv_rm, idiv)),
            ],
        )?;
    }

    b.direct("1001_1000", Handler::fixed("CBW", cbw, 2))?;
    b.direct("1001_1001", Handler::fixed("CWD", cwd, 5))?;
    b.direct("0010_0111", Handler::fixed("DAA", daa, 4))?;
    b.direct("0010_1111", Handler::fixed("DAS", das, 4))?;
    b.direct("0011_0111", Handler::fixed("AAA", aaa, 4))?;
    b.direct("0011_1111", Handler::fixed("AAS", aas, 4))?;
    b.direct("1101_0100", Handler::new("AAM", aam, Cost::Fixed(83)))?;
    b.direct("1101_0101", Handler::fixed("AAD", aad, 60))?;
    Ok(())
}
