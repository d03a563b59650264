//! Group 2 (D0-D3): rotates and shifts by one or by CL.

use crate::cpu_8086::core::Cpu8086;
use crate::cpu_8086::flags;
use crate::cpu_8086::memory::Memory8086;
use crate::cpu_8086::registry::{Handler, RegistryBuilder};
use crate::cpu_8086::state::{Width, FLAG_CF, FLAG_OF};
use crate::cpu_8086::timing::Cost;
use crate::error::ConfigError;

/// Apply shift/rotate `op` (ROL ROR RCL RCR SHL SHR SAL SAR) `count` times
///
/// CF receives the last bit shifted out. OF is only defined for a count of
/// one. SHL/SHR/SAL/SAR also update PF, SF and ZF. A zero count changes
/// nothing.
pub fn shift_rotate<M: Memory8086>(cpu: &mut Cpu8086<M>, op: u8, width: Width, value: u16, count: u32) -> u16 {
    if count == 0 {
        return value;
    }

    let mask = width.mask();
    let sign = width.sign();
    let original = value as u32 & mask;
    let mut result = original;
    let mut cf = cpu.regs.flag(FLAG_CF);

    for _ in 0..count {
        match op & 7 {
            // ROL
            0b000 => {
                cf = result & sign != 0;
                result = ((result << 1) | cf as u32) & mask;
            }
            // ROR
            0b001 => {
                cf = result & 1 != 0;
                result = (result >> 1) | if cf { sign } else { 0 };
            }
            // RCL
            0b010 => {
                let out = result & sign != 0;
                result = ((result << 1) | cf as u32) & mask;
                cf = out;
            }
            // RCR
            0b011 => {
                let out = result & 1 != 0;
                result = (result >> 1) | if cf { sign } else { 0 };
                cf = out;
            }
            // SHL/SAL
            0b100 | 0b110 => {
                cf = result & sign != 0;
                result = (result << 1) & mask;
            }
            // SHR
            0b101 => {
                cf = result & 1 != 0;
                result >>= 1;
            }
            // SAR
            _ => {
                cf = result & 1 != 0;
                result = (result >> 1) | (result & sign);
            }
        }
    }

    cpu.regs.set_flag(FLAG_CF, cf);
    if op & 0b100 != 0 {
        cpu.regs.flags = flags::psz(cpu.regs.flags, width, result);
    }
    if count == 1 {
        let msb = result & sign != 0;
        let of = match op & 7 {
            0b000 | 0b010 | 0b100 | 0b110 => msb != cf,
            0b001 | 0b011 => msb != (result & (sign >> 1) != 0),
            0b101 => original & sign != 0,
            _ => false,
        };
        cpu.regs.set_flag(FLAG_OF, of);
    }

    result as u16
}

// D0/D1
fn shift_by_one<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let (op, width, value) = (cpu.modrm.reg, cpu.modrm.width, cpu.rm_value());
    let result = shift_rotate(cpu, op, width, value, 1);
    cpu.write_rm(result);
}

// D2/D3
fn shift_by_cl<M: Memory8086>(cpu: &mut Cpu8086<M>, _opcode: u8) {
    let (op, width, value) = (cpu.modrm.reg, cpu.modrm.width, cpu.rm_value());
    let count = cpu.regs.cx() as u32 & 0xFF;
    cpu.note_count(count);
    let result = shift_rotate(cpu, op, width, value, count);
    if count != 0 {
        cpu.write_rm(result);
    }
}

pub fn register<M: Memory8086>(b: &mut RegistryBuilder<M>) -> Result<(), ConfigError> {
    b.group("1101_000*", &[("***", Handler::fixed("SHIFT r/m,1", shift_by_one, 2))])?;
    b.group(
        "1101_001*",
        &[(
            "***",
            Handler::new(
                "SHIFT r/m,CL",
                shift_by_cl,
                Cost::ClCounted {
                    base: 8,
                    per_bit: 4,
                },
            ),
        )],
    )?;
    Ok(())
}
