//! String instructions and their REP forms.
//!
//! The source operand is DS:SI (segment overridable), the destination is
//! always ES:DI. DF selects the direction. Under a repeat prefix the body runs
//! while CX is non-zero; CMPS and SCAS also stop on the ZF condition of the
//! prefix.

use crate::cpu_8086::core::Cpu8086;
use crate::cpu_8086::flags;
use crate::cpu_8086::memory::Memory8086;
use crate::cpu_8086::registry::{Handler, RegistryBuilder};
use crate::cpu_8086::state::{RepKind, Width, AX, CX, DI, DS, ES, FLAG_DF, FLAG_ZF, SI};
use crate::cpu_8086::timing::Cost;
use crate::error::ConfigError;

type Body<M> = fn(&mut Cpu8086<M>, Width);

fn advance<M: Memory8086>(cpu: &mut Cpu8086<M>, index: usize, width: Width) {
    let step = width.size();
    let val = cpu.regs.reg16(index);
    let next = if cpu.regs.flag(FLAG_DF) {
        val.wrapping_sub(step)
    } else {
        val.wrapping_add(step)
    };
    cpu.regs.set_reg16(index, next);
}

fn source<M: Memory8086>(cpu: &Cpu8086<M>, width: Width) -> u16 {
    cpu.read(width, cpu.data_segment(DS), cpu.regs.reg16(SI))
}

fn destination<M: Memory8086>(cpu: &Cpu8086<M>, width: Width) -> u16 {
    cpu.read(width, cpu.regs.seg(ES), cpu.regs.reg16(DI))
}

fn compare<M: Memory8086>(cpu: &mut Cpu8086<M>, width: Width, dst: u16, src: u16) {
    let (d, s) = (dst as u32, src as u32);
    cpu.regs.flags = flags::sub(cpu.regs.flags, width, d, s, d.wrapping_sub(s));
}

fn movs<M: Memory8086>(cpu: &mut Cpu8086<M>, width: Width) {
    let val = source(cpu, width);
    cpu.write(width, cpu.regs.seg(ES), cpu.regs.reg16(DI), val);
    advance(cpu, SI, width);
    advance(cpu, DI, width);
}

fn cmps<M: Memory8086>(cpu: &mut Cpu8086<M>, width: Width) {
    let src = source(cpu, width);
    let dst = destination(cpu, width);
    compare(cpu, width, src, dst);
    advance(cpu, SI, width);
    advance(cpu, DI, width);
}

fn scas<M: Memory8086>(cpu: &mut Cpu8086<M>, width: Width) {
    let dst = destination(cpu, width);
    let acc = cpu.regs.reg(width, AX);
    compare(cpu, width, acc, dst);
    advance(cpu, DI, width);
}

fn lods<M: Memory8086>(cpu: &mut Cpu8086<M>, width: Width) {
    let val = source(cpu, width);
    cpu.regs.set_reg(width, AX, val);
    advance(cpu, SI, width);
}

fn stos<M: Memory8086>(cpu: &mut Cpu8086<M>, width: Width) {
    let val = cpu.regs.reg(width, AX);
    cpu.write(width, cpu.regs.seg(ES), cpu.regs.reg16(DI), val);
    advance(cpu, DI, width);
}

/// Run `body` once, or repeatedly under REP/REPE/REPNE
fn repeat<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8, body: Body<M>, compares: bool) {
    let width = Width::from_opcode(opcode);
    let Some(kind) = cpu.prefix.rep else {
        body(cpu, width);
        return;
    };

    let mut iterations = 0;
    while cpu.regs.reg16(CX) != 0 {
        body(cpu, width);
        let cx = cpu.regs.reg16(CX).wrapping_sub(1);
        cpu.regs.set_reg16(CX, cx);
        iterations += 1;

        if compares {
            let zf = cpu.regs.flag(FLAG_ZF);
            match kind {
                RepKind::Repe if !zf => break,
                RepKind::Repne if zf => break,
                _ => {}
            }
        }
    }
    cpu.note_repeats(iterations);
}

fn movs_op<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    repeat(cpu, opcode, movs, false);
}

fn cmps_op<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    repeat(cpu, opcode, cmps, true);
}

fn scas_op<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    repeat(cpu, opcode, scas, true);
}

fn lods_op<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    repeat(cpu, opcode, lods, false);
}

fn stos_op<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    repeat(cpu, opcode, stos, false);
}

const fn rep(single: u32, base: u32, per_rep: u32) -> Cost {
    Cost::RepCounted {
        single,
        base,
        per_rep,
    }
}

pub fn register<M: Memory8086>(b: &mut RegistryBuilder<M>) -> Result<(), ConfigError> {
    b.direct("1010_010*", Handler::new("MOVS", movs_op, rep(18, 9, 17)))?;
    b.direct("1010_011*", Handler::new("CMPS", cmps_op, rep(22, 9, 22)))?;
    b.direct("1010_111*", Handler::new("SCAS", scas_op, rep(15, 9, 15)))?;
    b.direct("1010_110*", Handler::new("LODS", lods_op, rep(12, 9, 13)))?;
    b.direct("1010_101*", Handler::new("STOS", stos_op, rep(11, 9, 10)))?;
    Ok(())
}
