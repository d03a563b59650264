//! Instruction-level tests for the 8086 engine
//!
//! Tests are organized by topic:
//! - `tests_flags`: flag results of arithmetic, logic and flag opcodes
//! - `tests_addressing`: Mod-Reg-R/M forms, segment defaults and overrides
//! - `tests_jumps`: jumps, calls, returns and loops
//! - `tests_strings`: string instructions with and without REP
//! - `tests_timing`: clock accounting
//! - `tests_interrupts`: INT/IRET, faults, HLT, port I/O and save states

mod tests_addressing;
mod tests_flags;

use super::{ArrayMemory, Cpu8086, DS, ES};
use crate::config::{EngineConfig, ResetVector, TimingMode};

pub(super) const CODE_SEG: u16 = 0x1000;
pub(super) const STACK_SEG: u16 = 0x2000;
pub(super) const DATA_SEG: u16 = 0x3000;
pub(super) const EXTRA_SEG: u16 = 0x4000;
pub(super) const STACK_TOP: u16 = 0x1000;

fn build(program: &[u8], timing: TimingMode) -> Cpu8086<ArrayMemory> {
    let config = EngineConfig {
        timing,
        reset: ResetVector {
            cs: CODE_SEG,
            ip: 0,
            ss: STACK_SEG,
            sp: STACK_TOP,
        },
        ..Default::default()
    };
    let mut cpu = Cpu8086::with_config(ArrayMemory::new(), &config).expect("standard table");
    cpu.regs.set_seg(DS, DATA_SEG);
    cpu.regs.set_seg(ES, EXTRA_SEG);
    cpu.memory.load_program((CODE_SEG as u32) << 4, program);
    cpu
}

/// Core with `program` at 1000:0000, stack at 2000:1000, DS=3000, ES=4000
pub(super) fn machine(program: &[u8]) -> Cpu8086<ArrayMemory> {
    build(program, TimingMode::Off)
}

/// Same layout as [`machine`] with cycle counting on
pub(super) fn timed_machine(program: &[u8]) -> Cpu8086<ArrayMemory> {
    build(program, TimingMode::Cycles)
}

/// Physical address of DATA_SEG:offset
pub(super) fn data(offset: u16) -> u32 {
    ((DATA_SEG as u32) << 4) + offset as u32
}

/// Physical address of EXTRA_SEG:offset
pub(super) fn extra(offset: u16) -> u32 {
    ((EXTRA_SEG as u32) << 4) + offset as u32
}
