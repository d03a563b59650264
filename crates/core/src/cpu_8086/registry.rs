//! Opcode registry: a 256-slot dispatch table built from bit-pattern templates.
//!
//! Opcode modules describe their bindings declaratively. A direct binding maps
//! a template such as `"0100_0***"` (INC r16) to one handler; a group binding
//! maps an opcode template to reg-field templates, for opcodes like 0xFF whose
//! operation is selected by the reg field of the Mod-Reg-R/M byte.
//!
//! [`RegistryBuilder`] merges the bindings and rejects anything ambiguous. The
//! resulting [`OpcodeTable`] is immutable and owned by the core.

use super::core::Cpu8086;
use super::memory::Memory8086;
use super::pattern::{Pattern, OPCODE_BITS, REG_BITS};
use super::timing::Cost;
use crate::error::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};

/// Uniform handler signature: the core and the raw opcode byte
pub type ExecFn<M> = fn(&mut Cpu8086<M>, u8);

/// A stateless opcode handler with its clock cost
pub struct Handler<M: Memory8086> {
    pub name: &'static str,
    pub exec: ExecFn<M>,
    pub cost: Cost,
}

impl<M: Memory8086> Handler<M> {
    pub const fn new(name: &'static str, exec: ExecFn<M>, cost: Cost) -> Self {
        Self { name, exec, cost }
    }

    pub const fn fixed(name: &'static str, exec: ExecFn<M>, clocks: u32) -> Self {
        Self::new(name, exec, Cost::Fixed(clocks))
    }

    /// Handler whose cost depends on where its r/m operand lives
    pub const fn operand(name: &'static str, exec: ExecFn<M>, reg: u32, mem: u32) -> Self {
        Self::new(name, exec, Cost::Operand { reg, mem })
    }
}

impl<M: Memory8086> Clone for Handler<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Memory8086> Copy for Handler<M> {}

impl<M: Memory8086> std::fmt::Debug for Handler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("cost", &self.cost)
            .finish()
    }
}

/// Children of a reg-field group, indexed by the reg field
pub type GroupSlots<M> = [Option<Handler<M>>; 8];

/// One entry of the dispatch table
pub enum Slot<M: Memory8086> {
    Empty,
    Direct(Handler<M>),
    Group(Box<GroupSlots<M>>),
}

/// What a registration binds its opcode template to
pub enum Binding<M: Memory8086> {
    Direct(Handler<M>),
    /// Reg-field template and handler pairs
    Group(Vec<(&'static str, Handler<M>)>),
}

/// Owned build-time state; consumed by [`RegistryBuilder::build`]
pub struct RegistryBuilder<M: Memory8086> {
    slots: Vec<Slot<M>>,
}

impl<M: Memory8086> RegistryBuilder<M> {
    pub fn new() -> Self {
        Self {
            slots: (0..256).map(|_| Slot::Empty).collect(),
        }
    }

    /// Bind every opcode matched by `template` to a single handler
    pub fn direct(&mut self, template: &str, handler: Handler<M>) -> Result<&mut Self, ConfigError> {
        self.register(template, Binding::Direct(handler))
    }

    /// Bind every opcode matched by `template` to a reg-field group
    pub fn group(
        &mut self,
        template: &str,
        children: &[(&'static str, Handler<M>)],
    ) -> Result<&mut Self, ConfigError> {
        self.register(template, Binding::Group(children.to_vec()))
    }

    pub fn register(&mut self, template: &str, binding: Binding<M>) -> Result<&mut Self, ConfigError> {
        let opcodes = Pattern::compile_width(template, OPCODE_BITS)?;

        match binding {
            Binding::Direct(handler) => {
                for &opcode in &opcodes.values {
                    let slot = &mut self.slots[opcode as usize];
                    match slot {
                        Slot::Empty => *slot = Slot::Direct(handler),
                        Slot::Direct(existing) => {
                            return Err(ConfigError::DuplicateOpcode {
                                opcode,
                                existing: existing.name,
                                new: handler.name,
                            })
                        }
                        Slot::Group(_) => return Err(ConfigError::ShapeMismatch { opcode }),
                    }
                }
            }
            Binding::Group(children) => {
                // Compile every reg template up front so a bad one aborts cleanly
                let mut compiled: GroupSlots<M> = [None; 8];
                for (reg_template, handler) in &children {
                    let regs = Pattern::compile_width(reg_template, REG_BITS)?;
                    for &reg in &regs.values {
                        if let Some(existing) = compiled[reg as usize] {
                            return Err(ConfigError::RegCollision {
                                opcode: opcodes.values.first().copied().unwrap_or(0),
                                reg,
                                existing: existing.name,
                                new: handler.name,
                            });
                        }
                        compiled[reg as usize] = Some(*handler);
                    }
                }

                for &opcode in &opcodes.values {
                    let slot = &mut self.slots[opcode as usize];
                    match slot {
                        Slot::Empty => *slot = Slot::Group(Box::new(compiled)),
                        Slot::Group(existing) => {
                            for reg in 0..8 {
                                let Some(new) = compiled[reg] else { continue };
                                if let Some(old) = existing[reg] {
                                    return Err(ConfigError::RegCollision {
                                        opcode,
                                        reg: reg as u8,
                                        existing: old.name,
                                        new: new.name,
                                    });
                                }
                                existing[reg] = Some(new);
                            }
                        }
                        Slot::Direct(_) => return Err(ConfigError::ShapeMismatch { opcode }),
                    }
                }
            }
        }

        Ok(self)
    }

    pub fn build(self) -> OpcodeTable<M> {
        let table = OpcodeTable {
            slots: self.slots.into_boxed_slice(),
        };
        log(LogCategory::Decode, LogLevel::Info, || {
            let (direct, groups) = table.shape_counts();
            format!(
                "Decode: opcode table built ({} direct, {} groups, {} unmapped)",
                direct,
                groups,
                256 - direct - groups
            )
        });
        table
    }
}

impl<M: Memory8086> Default for RegistryBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Memory8086> std::fmt::Debug for RegistryBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = self
            .slots
            .iter()
            .filter(|slot| !matches!(slot, Slot::Empty))
            .count();
        f.debug_struct("RegistryBuilder").field("bound", &bound).finish()
    }
}

/// Immutable 256-entry dispatch table
pub struct OpcodeTable<M: Memory8086> {
    slots: Box<[Slot<M>]>,
}

impl<M: Memory8086> OpcodeTable<M> {
    pub fn slot(&self, opcode: u8) -> &Slot<M> {
        &self.slots[opcode as usize]
    }

    /// Handler for a non-group opcode
    #[inline]
    pub fn direct(&self, opcode: u8) -> Option<Handler<M>> {
        match &self.slots[opcode as usize] {
            Slot::Direct(handler) => Some(*handler),
            _ => None,
        }
    }

    #[inline]
    pub fn is_group(&self, opcode: u8) -> bool {
        matches!(self.slots[opcode as usize], Slot::Group(_))
    }

    /// Handler bound to `reg` inside a group opcode
    #[inline]
    pub fn child(&self, opcode: u8, reg: u8) -> Option<Handler<M>> {
        match &self.slots[opcode as usize] {
            Slot::Group(children) => children[(reg & 7) as usize],
            _ => None,
        }
    }

    /// Name of whatever `opcode` (and `reg`, for groups) dispatches to
    pub fn describe(&self, opcode: u8, reg: u8) -> Option<&'static str> {
        match &self.slots[opcode as usize] {
            Slot::Empty => None,
            Slot::Direct(handler) => Some(handler.name),
            Slot::Group(children) => children[(reg & 7) as usize].map(|h| h.name),
        }
    }

    /// (direct slots, group slots)
    pub fn shape_counts(&self) -> (usize, usize) {
        self.slots.iter().fold((0, 0), |(d, g), slot| match slot {
            Slot::Empty => (d, g),
            Slot::Direct(_) => (d + 1, g),
            Slot::Group(_) => (d, g + 1),
        })
    }
}

impl<M: Memory8086> std::fmt::Debug for OpcodeTable<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (direct, groups) = self.shape_counts();
        f.debug_struct("OpcodeTable")
            .field("direct", &direct)
            .field("groups", &groups)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu_8086::memory::ArrayMemory;

    fn noop(_cpu: &mut Cpu8086<ArrayMemory>, _opcode: u8) {}
    fn other(_cpu: &mut Cpu8086<ArrayMemory>, _opcode: u8) {}

    fn h(name: &'static str) -> Handler<ArrayMemory> {
        Handler::fixed(name, noop, 2)
    }

    #[test]
    fn test_direct_registration_covers_template() {
        let mut b = RegistryBuilder::new();
        b.direct("0100_0***", h("INC r16")).expect("register");
        let table = b.build();
        for op in 0x40..=0x47u8 {
            assert_eq!(table.describe(op, 0), Some("INC r16"));
        }
        assert_eq!(table.describe(0x48, 0), None);
        assert_eq!(table.shape_counts(), (8, 0));
    }

    #[test]
    fn test_overlapping_direct_registrations_fail() {
        let mut b = RegistryBuilder::new();
        b.direct("1001_0***", h("XCHG AX,r16")).expect("register");
        let err = b.direct("1001_0000", h("NOP")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateOpcode {
                opcode: 0x90,
                existing: "XCHG AX,r16",
                new: "NOP"
            }
        ));
    }

    #[test]
    fn test_groups_merge_disjoint_regs() {
        let mut b = RegistryBuilder::new();
        b.group("1111_111*", &[("000", h("INC")), ("001", h("DEC"))])
            .expect("register");
        b.group("1111_1111", &[("01*", h("CALL")), ("1_0*", h("JMP"))])
            .expect("merge");
        let table = b.build();

        assert_eq!(table.describe(0xFE, 0), Some("INC"));
        assert_eq!(table.describe(0xFE, 2), None);
        assert_eq!(table.describe(0xFF, 1), Some("DEC"));
        assert_eq!(table.describe(0xFF, 3), Some("CALL"));
        assert_eq!(table.describe(0xFF, 5), Some("JMP"));
        assert_eq!(table.describe(0xFF, 7), None);
        assert!(table.is_group(0xFF));
    }

    #[test]
    fn test_group_reg_collision_fails() {
        let mut b = RegistryBuilder::new();
        b.group("1111_011*", &[("000", h("TEST"))]).expect("register");
        let err = b.group("1111_0111", &[("0*0", h("NOT"))]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RegCollision {
                opcode: 0xF7,
                reg: 0,
                ..
            }
        ));

        // Collisions inside a single registration are caught too
        let mut b = RegistryBuilder::new();
        let err = b
            .group("1101_0000", &[("00*", h("ROL")), ("001", h("ROR"))])
            .unwrap_err();
        assert!(matches!(err, ConfigError::RegCollision { reg: 1, .. }));
    }

    #[test]
    fn test_shape_mismatch_fails() {
        let mut b = RegistryBuilder::new();
        b.direct("1000_1111", h("POP r/m16")).expect("register");
        let err = b.group("1000_1111", &[("000", h("POP"))]).unwrap_err();
        assert!(matches!(err, ConfigError::ShapeMismatch { opcode: 0x8F }));

        let mut b = RegistryBuilder::new();
        b.group("1000_00**", &[("***", h("ALU"))]).expect("register");
        let err = b.direct("1000_0001", h("ADD")).unwrap_err();
        assert!(matches!(err, ConfigError::ShapeMismatch { opcode: 0x81 }));
    }

    #[test]
    fn test_bad_templates_fail() {
        let mut b = RegistryBuilder::<ArrayMemory>::new();
        assert!(matches!(
            b.direct("***", h("X")).unwrap_err(),
            ConfigError::PatternWidth { .. }
        ));
        assert!(matches!(
            b.group("1111_1111", &[("0000_0000", h("X"))]).unwrap_err(),
            ConfigError::PatternWidth { .. }
        ));
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        fn push(b: &mut RegistryBuilder<ArrayMemory>) {
            b.direct("0101_0***", h("PUSH")).expect("push");
        }
        fn inc_dec(b: &mut RegistryBuilder<ArrayMemory>) {
            b.group("1111_111*", &[("00*", h("INCDEC"))]).expect("group");
        }
        fn push_rm(b: &mut RegistryBuilder<ArrayMemory>) {
            b.group("1111_1111", &[("110", Handler::fixed("PUSH rm", other, 16))])
                .expect("merge");
        }

        fn build(order: &[usize]) -> OpcodeTable<ArrayMemory> {
            let steps: [fn(&mut RegistryBuilder<ArrayMemory>); 3] = [push, inc_dec, push_rm];
            let mut b = RegistryBuilder::new();
            for &i in order {
                steps[i](&mut b);
            }
            b.build()
        }

        let a = build(&[0, 1, 2]);
        let c = build(&[2, 1, 0]);
        for op in 0..=255u8 {
            for reg in 0..8u8 {
                assert_eq!(a.describe(op, reg), c.describe(op, reg));
                let ca = a.child(op, reg).map(|h| h.cost);
                let cc = c.child(op, reg).map(|h| h.cost);
                assert_eq!(ca, cc);
            }
        }
    }
}
