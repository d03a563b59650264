//! Control transfer: conditional and unconditional jumps, calls, returns,
//! loops and software interrupts.

use crate::cpu_8086::core::Cpu8086;
use crate::cpu_8086::memory::Memory8086;
use crate::cpu_8086::registry::{Handler, RegistryBuilder};
use crate::cpu_8086::state::{CS, CX, FLAG_OF, FLAG_ZF, SP};
use crate::cpu_8086::timing::Cost;
use crate::error::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};

const fn branch(taken: u32, not_taken: u32) -> Cost {
    Cost::Conditional { taken, not_taken }
}

fn jump_relative<M: Memory8086>(cpu: &mut Cpu8086<M>, displacement: u16) {
    cpu.regs.ip = cpu.regs.ip.wrapping_add(displacement);
}

fn far_jump<M: Memory8086>(cpu: &mut Cpu8086<M>, offset: u16, segment: u16) {
    cpu.regs.ip = offset;
    cpu.regs.set_seg(CS, segment);
}

fn far_call<M: Memory8086>(cpu: &mut Cpu8086<M>, offset: u16, segment: u16) {
    cpu.push(cpu.regs.seg(CS));
    cpu.push(cpu.regs.ip);
    far_jump(cpu, offset, segment);
}

fn register_target_stub<M: Memory8086>(cpu: &Cpu8086<M>, what: &str) {
    log(LogCategory::Stubs, LogLevel::Warn, || {
        format!("Stubs: {} through a register at {:04X} ignored", what, cpu.regs.ip)
    });
}

// 70-7F
fn jcc<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let displacement = cpu.fetch_u8() as i8 as u16;
    let holds = cpu.regs.condition(opcode & 0x0F);
    if cpu.note_branch(holds) {
        jump_relative(cpu, displacement);
    }
}

// EB
fn jmp_short<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let displacement = cpu.fetch_u8() as i8 as u16;
    jump_relative(cpu, displacement);
}

// E9
fn jmp_near<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let displacement = cpu.fetch_u16();
    jump_relative(cpu, displacement);
}

// EA
fn jmp_far<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let offset = cpu.fetch_u16();
    let segment = cpu.fetch_u16();
    far_jump(cpu, offset, segment);
}

// E8
fn call_near<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let displacement = cpu.fetch_u16();
    cpu.push(cpu.regs.ip);
    jump_relative(cpu, displacement);
}

// 9A
fn call_far<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let offset = cpu.fetch_u16();
    let segment = cpu.fetch_u16();
    far_call(cpu, offset, segment);
}

// FF /2
fn call_near_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let target = cpu.rm_value();
    cpu.push(cpu.regs.ip);
    cpu.regs.ip = target;
}

// FF /3
fn call_far_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    match cpu.rm_far_pointer() {
        Some((offset, segment)) => far_call(cpu, offset, segment),
        None => register_target_stub(cpu, "CALL FAR"),
    }
}

// FF /4
fn jmp_near_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.ip = cpu.rm_value();
}

// FF /5
fn jmp_far_rm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    match cpu.rm_far_pointer() {
        Some((offset, segment)) => far_jump(cpu, offset, segment),
        None => register_target_stub(cpu, "JMP FAR"),
    }
}

// C3 RET / C2 RET imm16
fn ret_near<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let release = if opcode == 0xC2 { cpu.fetch_u16() } else { 0 };
    cpu.regs.ip = cpu.pop();
    let sp = cpu.regs.reg16(SP).wrapping_add(release);
    cpu.regs.set_reg16(SP, sp);
}

// CB RETF / CA RETF imm16
fn ret_far<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let release = if opcode == 0xCA { cpu.fetch_u16() } else { 0 };
    cpu.regs.ip = cpu.pop();
    let cs = cpu.pop();
    cpu.regs.set_seg(CS, cs);
    let sp = cpu.regs.reg16(SP).wrapping_add(release);
    cpu.regs.set_reg16(SP, sp);
}

/// Decrement CX without touching flags; returns the new value
fn count_down<M: Memory8086>(cpu: &mut Cpu8086<M>) -> u16 {
    let cx = cpu.regs.reg16(CX).wrapping_sub(1);
    cpu.regs.set_reg16(CX, cx);
    cx
}

// E2
fn loop_cx<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let displacement = cpu.fetch_u8() as i8 as u16;
    let cx = count_down(cpu);
    if cpu.note_branch(cx != 0) {
        jump_relative(cpu, displacement);
    }
}

// E1
fn loopz<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let displacement = cpu.fetch_u8() as i8 as u16;
    let cx = count_down(cpu);
    let zf = cpu.regs.flag(FLAG_ZF);
    if cpu.note_branch(cx != 0 && zf) {
        jump_relative(cpu, displacement);
    }
}

// E0
fn loopnz<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let displacement = cpu.fetch_u8() as i8 as u16;
    let cx = count_down(cpu);
    let zf = cpu.regs.flag(FLAG_ZF);
    if cpu.note_branch(cx != 0 && !zf) {
        jump_relative(cpu, displacement);
    }
}

// E3
fn jcxz<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let displacement = cpu.fetch_u8() as i8 as u16;
    let zero = cpu.regs.reg16(CX) == 0;
    if cpu.note_branch(zero) {
        jump_relative(cpu, displacement);
    }
}

// CC
fn int3<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.interrupt(3);
}

// CD
fn int_imm<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let vector = cpu.fetch_u8();
    cpu.interrupt(vector);
}

// CE
fn int_overflow<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let overflow = cpu.regs.flag(FLAG_OF);
    if cpu.note_branch(overflow) {
        cpu.interrupt(4);
    }
}

// CF
fn iret<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.ip = cpu.pop();
    let cs = cpu.pop();
    cpu.regs.set_seg(CS, cs);
    cpu.regs.flags = cpu.pop();
}

pub fn register<M: Memory8086>(b: &mut RegistryBuilder<M>) -> Result<(), ConfigError> {
    b.direct("0111_****", Handler::new("Jcc", jcc, branch(16, 4)))?;
    b.direct("1110_1011", Handler::fixed("JMP short", jmp_short, 15))?;
    b.direct("1110_1001", Handler::fixed("JMP near", jmp_near, 15))?;
    b.direct("1110_1010", Handler::fixed("JMP far", jmp_far, 15))?;
    b.direct("1110_1000", Handler::fixed("CALL near", call_near, 19))?;
    b.direct("1001_1010", Handler::fixed("CALL far", call_far, 28))?;
    b.group(
        "1111_1111",
        &[
            ("010", Handler::fixed("CALL r/m", call_near_rm, 16)),
            ("011", Handler::fixed("CALL FAR m", call_far_rm, 37)),
            ("100", Handler::fixed("JMP r/m", jmp_near_rm, 11)),
            ("101", Handler::fixed("JMP FAR m", jmp_far_rm, 24)),
        ],
    )?;

    b.direct("1100_0011", Handler::fixed("RET", ret_near, 20))?;
    b.direct("1100_0010", Handler::fixed("RET imm", ret_near, 24))?;
    b.direct("1100_1011", Handler::fixed("RETF", ret_far, 32))?;
    b.direct("1100_1010", Handler::fixed("RETF imm", ret_far, 31))?;

    b.direct("1110_0010", Handler::new("LOOP", loop_cx, branch(17, 5)))?;
    b.direct("1110_0001", Handler::new("LOOPZ", loopz, branch(18, 6)))?;
    b.direct("1110_0000", Handler::new("LOOPNZ", loopnz, branch(19, 5)))?;
    b.direct("1110_0011", Handler::new("JCXZ", jcxz, branch(18, 6)))?;

    b.direct("1100_1100", Handler::fixed("INT3", int3, 52))?;
    b.direct("1100_1101", Handler::fixed("INT", int_imm, 51))?;
    b.direct("1100_1110", Handler::new("INTO", int_overflow, branch(53, 4)))?;
    b.direct("1100_1111", Handler::fixed("IRET", iret, 44))?;
    Ok(())
}
