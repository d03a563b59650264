//! Mod-Reg-R/M decoding and operand access.
//!
//! `resolve_modrm` decodes one Mod-Reg-R/M byte at CS:IP, consumes any
//! displacement, computes the register or memory operand it names, pre-fetches
//! that operand and caches everything in [`ModRm`]. Handlers then read and
//! write the operand through the cache; group children rely on the dispatcher
//! having resolved it already.

use super::core::Cpu8086;
use super::memory::Memory8086;
use super::state::{Width, BP, BX, DI, DS, SI, SS};
use super::timing::{ea_clocks, ClockSource};

/// Where the r/m operand lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Register index, interpreted with the operand width
    Reg(usize),
    /// Memory operand: segment register slot, its value and the 16-bit offset
    Mem { sreg: usize, segment: u16, offset: u16 },
}

impl Default for Operand {
    fn default() -> Self {
        Operand::Reg(0)
    }
}

/// Decoded-operand cache for the opcode currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModRm {
    pub mode: u8,
    pub reg: u8,
    pub rm: u8,
    pub width: Width,
    pub operand: Operand,
    /// r/m operand as it was when decoded
    pub value: u16,
}

impl ModRm {
    #[inline]
    pub fn split(byte: u8) -> (u8, u8, u8) {
        (byte >> 6, (byte >> 3) & 7, byte & 7)
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.operand, Operand::Mem { .. })
    }
}

impl<M: Memory8086> Cpu8086<M> {
    /// Decode the Mod-Reg-R/M byte at CS:IP for an operand of `width`
    pub fn resolve_modrm(&mut self, width: Width) {
        let (mode, reg, rm) = ModRm::split(self.fetch_u8());

        let operand = if mode == 0b11 {
            Operand::Reg(rm as usize)
        } else {
            let (sreg, offset) = self.effective_address(mode, rm);
            Operand::Mem {
                sreg,
                segment: self.regs.seg(sreg),
                offset,
            }
        };

        let value = match operand {
            Operand::Reg(index) => self.regs.reg(width, index),
            Operand::Mem {
                segment, offset, ..
            } => self.read(width, segment, offset),
        };

        self.modrm = ModRm {
            mode,
            reg,
            rm,
            width,
            operand,
            value,
        };
    }

    /// Offset and segment slot for a memory-form Mod-Reg-R/M, consuming any
    /// displacement and charging the address clocks
    fn effective_address(&mut self, mode: u8, rm: u8) -> (usize, u16) {
        if mode == 0b00 && rm == 0b110 {
            let offset = self.fetch_u16();
            self.charge(ClockSource::Address, ea_clocks(rm, false, true));
            return (self.segment_or(DS), offset);
        }

        let r = &self.regs;
        let (base, default_seg) = match rm {
            0b000 => (r.reg16(BX).wrapping_add(r.reg16(SI)), DS),
            0b001 => (r.reg16(BX).wrapping_add(r.reg16(DI)), DS),
            0b010 => (r.reg16(BP).wrapping_add(r.reg16(SI)), SS),
            0b011 => (r.reg16(BP).wrapping_add(r.reg16(DI)), SS),
            0b100 => (r.reg16(SI), DS),
            0b101 => (r.reg16(DI), DS),
            0b110 => (r.reg16(BP), SS),
            _ => (r.reg16(BX), DS),
        };

        let displacement = match mode {
            0b01 => self.fetch_u8() as i8 as i16 as u16,
            0b10 => self.fetch_u16(),
            _ => 0,
        };

        self.charge(ClockSource::Address, ea_clocks(rm, mode != 0b00, false));
        (self.segment_or(default_seg), base.wrapping_add(displacement))
    }

    /// Cached r/m operand
    #[inline]
    pub fn rm_value(&self) -> u16 {
        self.modrm.value
    }

    /// Store to the r/m operand named by the cached Mod-Reg-R/M
    pub fn write_rm(&mut self, value: u16) {
        let width = self.modrm.width;
        match self.modrm.operand {
            Operand::Reg(index) => self.regs.set_reg(width, index, value),
            Operand::Mem {
                segment, offset, ..
            } => self.write(width, segment, offset, value),
        }
        self.modrm.value = value & width.mask() as u16;
    }

    /// Register named by the reg field
    #[inline]
    pub fn reg_value(&self) -> u16 {
        self.regs.reg(self.modrm.width, self.modrm.reg as usize)
    }

    #[inline]
    pub fn write_reg(&mut self, value: u16) {
        self.regs
            .set_reg(self.modrm.width, self.modrm.reg as usize, value);
    }

    /// Effective offset of a memory operand (LEA)
    pub fn rm_offset(&self) -> Option<u16> {
        match self.modrm.operand {
            Operand::Mem { offset, .. } => Some(offset),
            Operand::Reg(_) => None,
        }
    }

    /// (offset, segment) pair stored at a memory operand, for far jumps, far
    /// calls, LDS and LES
    pub fn rm_far_pointer(&self) -> Option<(u16, u16)> {
        match self.modrm.operand {
            Operand::Mem {
                segment, offset, ..
            } => Some((
                self.read_u16(segment, offset),
                self.read_u16(segment, offset.wrapping_add(2)),
            )),
            Operand::Reg(_) => None,
        }
    }
}
