//! Clock accounting for the 8086 core.
//!
//! Every handler in the opcode table carries a [`Cost`]. After the handler
//! runs, the core evaluates that cost against the [`Tally`] the handler filled
//! in (branch outcome, shift count, REP iterations) and charges the result to
//! the installed [`ClockSink`]. Effective-address calculation charges its own
//! clocks from [`ea_clocks`], attributed to [`ClockSource::Address`].
//!
//! Timings follow the published 8086 clock table; opcodes with a Mod-Reg-R/M
//! operand carry separate register and memory costs. The
//! `NullClock` sink turns the whole layer into a no-op.

use serde::Serialize;

/// Clock cost shape of a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cost {
    /// Same cost on every execution
    Fixed(u32),
    /// Branch-like handlers: picked by the condition the handler evaluated
    Conditional { taken: u32, not_taken: u32 },
    /// Shifts and rotates by CL
    ClCounted { base: u32, per_bit: u32 },
    /// String opcodes: `single` without REP, `base + per_rep * n` under REP
    RepCounted { single: u32, base: u32, per_rep: u32 },
    /// Mod-Reg-R/M opcodes: `reg` for a register r/m operand, `mem` otherwise
    /// (EA clocks are charged separately)
    Operand { reg: u32, mem: u32 },
}

/// Control-path facts a handler reports while executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub taken: Option<bool>,
    pub count: u32,
    pub repeats: Option<u32>,
    /// The r/m operand was in memory
    pub memory: bool,
}

impl Cost {
    pub fn clocks(&self, tally: &Tally) -> u32 {
        match *self {
            Cost::Fixed(clocks) => clocks,
            Cost::Conditional { taken, not_taken } => {
                if tally.taken.unwrap_or(false) {
                    taken
                } else {
                    not_taken
                }
            }
            Cost::ClCounted { base, per_bit } => base + per_bit * tally.count,
            Cost::RepCounted {
                single,
                base,
                per_rep,
            } => match tally.repeats {
                Some(n) => base + per_rep * n,
                None => single,
            },
            Cost::Operand { reg, mem } => {
                if tally.memory {
                    mem
                } else {
                    reg
                }
            }
        }
    }
}

/// Where a charge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// The handler's own cost
    Dispatch,
    /// Effective-address calculation in the Mod-Reg-R/M resolver
    Address,
}

/// Receiver of clock charges
pub trait ClockSink: std::fmt::Debug {
    /// When false the core skips cost evaluation entirely
    fn is_active(&self) -> bool {
        true
    }

    fn charge(&mut self, source: ClockSource, clocks: u32);

    /// Clocks charged since the last reset
    fn total(&self) -> u64;

    fn reset(&mut self);
}

/// Sink used when timing is off
#[derive(Debug, Default, Clone, Copy)]
pub struct NullClock;

impl ClockSink for NullClock {
    fn is_active(&self) -> bool {
        false
    }

    fn charge(&mut self, _source: ClockSource, _clocks: u32) {}

    fn total(&self) -> u64 {
        0
    }

    fn reset(&mut self) {}
}

/// Accumulating sink, split by source
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleCounter {
    pub dispatch: u64,
    pub address: u64,
}

impl ClockSink for CycleCounter {
    fn charge(&mut self, source: ClockSource, clocks: u32) {
        match source {
            ClockSource::Dispatch => self.dispatch += clocks as u64,
            ClockSource::Address => self.address += clocks as u64,
        }
    }

    fn total(&self) -> u64 {
        self.dispatch + self.address
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Effective-address clocks for a memory operand
///
/// `rm` selects the base/index template; `direct` is the mod=00/rm=110
/// displacement-only form.
pub fn ea_clocks(rm: u8, has_displacement: bool, direct: bool) -> u32 {
    if direct {
        return 6;
    }
    let base = match rm & 7 {
        0b000 | 0b011 => 7, // BX+SI, BP+DI
        0b001 | 0b010 => 8, // BX+DI, BP+SI
        _ => 5,             // SI, DI, BP, BX
    };
    if has_displacement {
        base + 4
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_shapes() {
        let mut tally = Tally::default();
        assert_eq!(Cost::Fixed(3).clocks(&tally), 3);

        let jcc = Cost::Conditional {
            taken: 16,
            not_taken: 4,
        };
        assert_eq!(jcc.clocks(&tally), 4);
        tally.taken = Some(true);
        assert_eq!(jcc.clocks(&tally), 16);

        tally.count = 5;
        let shift = Cost::ClCounted {
            base: 8,
            per_bit: 4,
        };
        assert_eq!(shift.clocks(&tally), 28);

        let movs = Cost::RepCounted {
            single: 18,
            base: 9,
            per_rep: 17,
        };
        assert_eq!(movs.clocks(&Tally::default()), 18);
        tally.repeats = Some(0);
        assert_eq!(movs.clocks(&tally), 9);
        tally.repeats = Some(3);
        assert_eq!(movs.clocks(&tally), 9 + 3 * 17);

        let add = Cost::Operand { reg: 3, mem: 16 };
        assert_eq!(add.clocks(&Tally::default()), 3);
        tally.memory = true;
        assert_eq!(add.clocks(&tally), 16);
    }

    #[test]
    fn test_ea_table() {
        assert_eq!(ea_clocks(0b110, false, true), 6);
        assert_eq!(ea_clocks(0b111, false, false), 5);
        assert_eq!(ea_clocks(0b110, true, false), 9);
        assert_eq!(ea_clocks(0b000, false, false), 7);
        assert_eq!(ea_clocks(0b001, true, false), 12);
        assert_eq!(ea_clocks(0b011, true, false), 11);
    }

    #[test]
    fn test_counter_split() {
        let mut c = CycleCounter::default();
        c.charge(ClockSource::Dispatch, 4);
        c.charge(ClockSource::Address, 9);
        assert_eq!(c.total(), 13);
        assert_eq!(c.address, 9);
        c.reset();
        assert_eq!(c.total(), 0);

        let mut n = NullClock;
        n.charge(ClockSource::Dispatch, 100);
        assert_eq!(n.total(), 0);
        assert!(!n.is_active());
    }
}
