//! Processor control: flag operations, HLT, WAIT, ESC and the prefixes.

use crate::cpu_8086::core::Cpu8086;
use crate::cpu_8086::memory::Memory8086;
use crate::cpu_8086::registry::{Handler, RegistryBuilder};
use crate::cpu_8086::state::{
    HaltReason, RepKind, Width, FLAG_CF, FLAG_DF, FLAG_IF,
};
use crate::error::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};

fn clc<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.set_flag(FLAG_CF, false);
}

fn stc<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.set_flag(FLAG_CF, true);
}

fn cmc<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.flags ^= FLAG_CF;
}

fn cli<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.set_flag(FLAG_IF, false);
}

fn sti<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.set_flag(FLAG_IF, true);
}

fn cld<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.set_flag(FLAG_DF, false);
}

fn std_flag<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.regs.set_flag(FLAG_DF, true);
}

fn hlt<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.halt(HaltReason::Hlt);
}

// No TEST pin is modelled, so WAIT never waits
fn wait<M: Memory8086>(_cpu: &mut Cpu8086<M>, _opcode: u8) {
    log(LogCategory::Stubs, LogLevel::Trace, || "Stubs: WAIT".to_string());
}

// D8-DF: coprocessor escape; the operand is decoded and dropped
fn esc<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    cpu.resolve_modrm(Width::Word);
    log(LogCategory::Stubs, LogLevel::Debug, || {
        format!(
            "Stubs: ESC {:02X} /{} without a coprocessor",
            opcode, cpu.modrm.reg
        )
    });
}

// 26 2E 36 3E
fn segment_prefix<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let sreg = ((opcode >> 3) & 3) as usize;
    cpu.dispatch_prefixed(|prefix| prefix.segment = Some(sreg));
}

fn lock<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    cpu.dispatch_prefixed(|prefix| prefix.lock = true);
}

// F2 REPNE / F3 REP, REPE
fn rep<M: Memory8086>(cpu: &mut Cpu8086<M>, opcode: u8) {
    let kind = if opcode == 0xF2 {
        RepKind::Repne
    } else {
        RepKind::Repe
    };
    cpu.dispatch_prefixed(|prefix| prefix.rep = Some(kind));
}

pub fn register<M: Memory8086>(b: &mut RegistryBuilder<M>) -> Result<(), ConfigError> {
    b.direct("1111_1000", Handler::fixed("CLC", clc, 2))?;
    b.direct("1111_1001", Handler::fixed("STC", stc, 2))?;
    b.direct("1111_0101", Handler::fixed("CMC", cmc, 2))?;
    b.direct("1111_1010", Handler::fixed("CLI", cli, 2))?;
    b.direct("1111_1011", Handler::fixed("STI", sti, 2))?;
    b.direct("1111_1100", Handler::fixed("CLD", cld, 2))?;
    b.direct("1111_1101", Handler::fixed("STD", std_flag, 2))?;
    b.direct("1111_0100", Handler::fixed("HLT", hlt, 2))?;
    b.direct("1001_1011", Handler::fixed("WAIT", wait, 3))?;
    b.direct("1101_1***", Handler::fixed("ESC", esc, 2))?;

    b.direct("001*_*110", Handler::fixed("SEG", segment_prefix, 2))?;
    b.direct("1111_0000", Handler::fixed("LOCK", lock, 2))?;
    b.direct("1111_001*", Handler::fixed("REP", rep, 0))?;
    Ok(())
}
