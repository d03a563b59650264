//! Register file, flag bits and per-instruction prefix state.

use serde::{Deserialize, Serialize};

// General register slots, in Mod-Reg-R/M encoding order
pub const AX: usize = 0;
pub const CX: usize = 1;
pub const DX: usize = 2;
pub const BX: usize = 3;
pub const SP: usize = 4;
pub const BP: usize = 5;
pub const SI: usize = 6;
pub const DI: usize = 7;

// Segment register slots, in sreg encoding order
pub const ES: usize = 0;
pub const CS: usize = 1;
pub const SS: usize = 2;
pub const DS: usize = 3;

// Flag bit positions in FLAGS register
pub const FLAG_CF: u16 = 0x0001; // Carry Flag
pub const FLAG_PF: u16 = 0x0004; // Parity Flag
pub const FLAG_AF: u16 = 0x0010; // Auxiliary Carry Flag
pub const FLAG_ZF: u16 = 0x0040; // Zero Flag
pub const FLAG_SF: u16 = 0x0080; // Sign Flag
pub const FLAG_TF: u16 = 0x0100; // Trap Flag
pub const FLAG_IF: u16 = 0x0200; // Interrupt Enable Flag
pub const FLAG_DF: u16 = 0x0400; // Direction Flag
pub const FLAG_OF: u16 = 0x0800; // Overflow Flag

/// Bit 1 of FLAGS reads as one on every x86 part
pub const FLAGS_RESERVED: u16 = 0x0002;

/// Operand width selected by the `w` bit of most opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Width {
    #[default]
    Byte,
    Word,
}

impl Width {
    /// Width encoded in bit 0 of an opcode byte
    #[inline]
    pub fn from_opcode(opcode: u8) -> Self {
        if opcode & 1 != 0 {
            Width::Word
        } else {
            Width::Byte
        }
    }

    #[inline]
    pub fn is_word(self) -> bool {
        self == Width::Word
    }

    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            Width::Byte => 8,
            Width::Word => 16,
        }
    }

    #[inline]
    pub fn mask(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
        }
    }

    #[inline]
    pub fn sign(self) -> u32 {
        match self {
            Width::Byte => 0x80,
            Width::Word => 0x8000,
        }
    }

    /// Size of one operand in bytes
    #[inline]
    pub fn size(self) -> u16 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
        }
    }
}

/// Architectural register state
///
/// This is also the save-state payload: it serializes to a flat JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// AX, CX, DX, BX, SP, BP, SI, DI
    pub gp: [u16; 8],
    /// ES, CS, SS, DS
    pub seg: [u16; 4],
    pub ip: u16,
    pub flags: u16,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            gp: [0; 8],
            seg: [0; 4],
            ip: 0,
            flags: FLAGS_RESERVED,
        }
    }
}

impl Registers {
    #[inline]
    pub fn reg16(&self, index: usize) -> u16 {
        self.gp[index & 7]
    }

    #[inline]
    pub fn set_reg16(&mut self, index: usize, val: u16) {
        self.gp[index & 7] = val;
    }

    /// Byte register: 0-3 are AL, CL, DL, BL and 4-7 are AH, CH, DH, BH
    #[inline]
    pub fn reg8(&self, index: usize) -> u8 {
        let slot = self.gp[index & 3];
        if index & 4 == 0 {
            slot as u8
        } else {
            (slot >> 8) as u8
        }
    }

    /// Writes one half of AX..BX, leaving the other half untouched
    #[inline]
    pub fn set_reg8(&mut self, index: usize, val: u8) {
        let slot = &mut self.gp[index & 3];
        if index & 4 == 0 {
            *slot = (*slot & 0xFF00) | val as u16;
        } else {
            *slot = (*slot & 0x00FF) | ((val as u16) << 8);
        }
    }

    #[inline]
    pub fn reg(&self, width: Width, index: usize) -> u16 {
        match width {
            Width::Byte => self.reg8(index) as u16,
            Width::Word => self.reg16(index),
        }
    }

    #[inline]
    pub fn set_reg(&mut self, width: Width, index: usize, val: u16) {
        match width {
            Width::Byte => self.set_reg8(index, val as u8),
            Width::Word => self.set_reg16(index, val),
        }
    }

    #[inline]
    pub fn seg(&self, index: usize) -> u16 {
        self.seg[index & 3]
    }

    #[inline]
    pub fn set_seg(&mut self, index: usize, val: u16) {
        self.seg[index & 3] = val;
    }

    #[inline]
    pub fn flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: u16, value: bool) {
        if value {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Evaluate a Jcc condition code
    /// Condition codes: 0=O, 1=NO, 2=B/C, 3=NB/NC, 4=E/Z, 5=NE/NZ, 6=BE, 7=NBE,
    ///                  8=S, 9=NS, A=P, B=NP, C=L, D=NL, E=LE, F=NLE
    pub fn condition(&self, code: u8) -> bool {
        let cf = self.flag(FLAG_CF);
        let zf = self.flag(FLAG_ZF);
        let sf = self.flag(FLAG_SF);
        let of = self.flag(FLAG_OF);
        let pf = self.flag(FLAG_PF);
        let holds = match (code >> 1) & 7 {
            0 => of,
            1 => cf,
            2 => zf,
            3 => cf || zf,
            4 => sf,
            5 => pf,
            6 => sf != of,
            _ => zf || sf != of,
        };
        // Odd codes are the negated form
        holds != (code & 1 != 0)
    }

    pub fn ax(&self) -> u16 {
        self.gp[AX]
    }

    pub fn cx(&self) -> u16 {
        self.gp[CX]
    }

    pub fn al(&self) -> u8 {
        self.reg8(0)
    }

    pub fn set_al(&mut self, val: u8) {
        self.set_reg8(0, val);
    }

    pub fn ah(&self) -> u8 {
        self.reg8(4)
    }

    pub fn set_ah(&mut self, val: u8) {
        self.set_reg8(4, val);
    }
}

/// Kind of repeat prefix in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepKind {
    /// F3: REP / REPE / REPZ
    Repe,
    /// F2: REPNE / REPNZ
    Repne,
}

/// Transient state installed by prefix opcodes
///
/// A prefix handler sets one field, runs the following opcode through a nested
/// dispatch and restores the previous value when that call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrefixState {
    pub lock: bool,
    /// Segment register slot replacing the default data segment
    pub segment: Option<usize>,
    pub rep: Option<RepKind>,
}

/// Why the core stopped fetching instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    /// HLT instruction; an interrupt resumes execution
    Hlt,
    /// No handler is registered for this opcode byte; only reset resumes
    Unmapped(u8),
}
