//! PUSH and POP of registers, segment registers, memory and FLAGS.

use crate::cpu_8086::core::Cpu8086;
use crate::cpu_8086::memory::Memory8086;
use crate::cpu_8086::registry::{Handler, RegistryBuilder};
use crate::cpu_8086::state::{SP, SS};
use crate::error::ConfigError;

// 50-57
fn push_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let index = (opcode & 7) as usize;
    if index == SP {
        // The 8086 pushes SP after it has been decremented
        let sp = cpu.regs.reg16(SP).wrapping_sub(2);
        cpu.regs.set_reg16(SP, sp);
        cpu.write_u16(cpu.regs.seg(SS), sp, sp);
    } else {
        cpu.push(cpu.regs.reg16(index));
    }
}

// 58-5F
fn pop_reg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let val = cpu.pop();
    cpu.regs.set_reg16((opcode & 7) as usize, val);
}

// 06 0E 16 1E
fn push_sreg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    cpu.push(cpu.regs.seg(((opcode >> 3) & 3) as usize));
}

// 07 17 1F
fn pop_sreg<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let val = cpu.pop();
    cpu.regs.set_seg(((opcode >> 3) & 3) as usize, val);
}

// FF /6
fn push_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.push(cpu.rm_value());
}

// 8F /0
fn pop_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let val = cpu.pop();
    cpu.write_rm(val);
}

fn pushf<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.push(cpu.regs.flags);
}

fn popf<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.flags = cpu.pop();
}

pub fn register<M: Memory8086>(b: &mut RegistryBuilder<M>) -> Result<(), ConfigError> {
    b.direct("0101_0***", Handler::fixed("PUSH r16", push_reg, 11))?;
    b.direct("0101_1***", Handler::fixed("POP r16", pop_reg, 8))?;
    b.direct("000*_*110", Handler::fixed("PUSH sreg", push_sreg, 10))?;
    // 0F would be POP CS, which is not part of this instruction set
    b.direct("0000_0111", Handler::fixed("POP sreg", pop_sreg, 8))?;
    b.direct("0001_*111", Handler::fixed("POP sreg", pop_sreg, 8))?;
    b.group("1000_1111", &[("000", Handler::fixed("POP r/m", pop_rm, 17))])?;
    b.group("1111_1111", &[("110", Handler::fixed("PUSH r/m", push_rm, 16))])?;
    b.direct("1001_1100", Handler::fixed("PUSHF", pushf, 10))?;
    b.direct("1001_1101", Handler::fixed("POPF", popf, 8))?;
    Ok(())
}
