//! The 8086 execution core: fetch, dispatch, stack and interrupts.
//!
//! The core owns the register file, memory, port bus, opcode table and clock
//! sink. One [`Cpu8086::step`] fetches an opcode at CS:IP and runs whatever the
//! table binds to it; group opcodes have their Mod-Reg-R/M byte resolved first
//! so the child handler finds the operand already decoded. A prefix handler
//! re-enters [`Cpu8086::dispatch`] for the opcode it modifies; further
//! prefixes in the same instruction are collected without nesting deeper.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::memory::Memory8086;
use super::modrm::ModRm;
use super::ports::PortBus;
use super::registry::{Handler, OpcodeTable};
use super::state::{
    HaltReason, PrefixState, Registers, Width, CS, FLAG_IF, FLAG_TF, SP, SS,
};
use super::timing::{ClockSink, ClockSource, Tally};
use crate::config::{EngineConfig, ResetVector};
use crate::error::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};

/// Longest run of prefix bytes accepted in front of one opcode
pub const MAX_PREFIXES: u8 = 15;

/// Serializable core state: registers and halt status, memory excluded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreState {
    pub regs: Registers,
    pub halt: Option<HaltReason>,
}

/// Intel 8086 CPU state and execution engine
///
/// Generic over the memory system; anything implementing [`Memory8086`] can
/// back the 1 MiB address space.
pub struct Cpu8086<M: Memory8086> {
    pub regs: Registers,
    pub memory: M,
    pub ports: PortBus,
    /// Operand cache for the opcode currently executing
    pub modrm: ModRm,
    /// Prefixes in effect for the opcode currently executing
    pub prefix: PrefixState,
    table: OpcodeTable<M>,
    clock: Box<dyn ClockSink>,
    tally: Tally,
    step_clocks: u32,
    /// Prefix bytes consumed by the instruction currently executing
    prefix_bytes: u8,
    prefix_chained: bool,
    halt: Option<HaltReason>,
    reset_vector: ResetVector,
}

impl<M: Memory8086> Cpu8086<M> {
    /// Core with the standard instruction set, timing off, reset vector FFFF:0000
    pub fn new(memory: M) -> Result<Self, ConfigError> {
        Self::with_config(memory, &EngineConfig::default())
    }

    /// Core with the standard instruction set
    pub fn with_config(memory: M, config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_table(memory, OpcodeTable::standard()?, config))
    }

    /// Core running a caller-built opcode table
    pub fn with_table(memory: M, table: OpcodeTable<M>, config: &EngineConfig) -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            memory,
            ports: PortBus::new(),
            modrm: ModRm::default(),
            prefix: PrefixState::default(),
            table,
            clock: config.timing.sink(),
            tally: Tally::default(),
            step_clocks: 0,
            prefix_bytes: 0,
            prefix_chained: false,
            halt: None,
            reset_vector: config.reset,
        };
        cpu.reset();
        cpu
    }

    /// Restore the reset vector and clear flags, prefixes, halt state and clocks
    ///
    /// Memory and attached port devices are untouched.
    pub fn reset(&mut self) {
        let vector = self.reset_vector;
        self.regs = Registers::default();
        self.regs.set_seg(CS, vector.cs);
        self.regs.ip = vector.ip;
        self.regs.set_seg(SS, vector.ss);
        self.regs.set_reg16(SP, vector.sp);
        self.prefix = PrefixState::default();
        self.prefix_bytes = 0;
        self.prefix_chained = false;
        self.modrm = ModRm::default();
        self.halt = None;
        self.step_clocks = 0;
        self.clock.reset();
        log(LogCategory::CPU, LogLevel::Info, || {
            format!("CPU: reset to {:04X}:{:04X}", vector.cs, vector.ip)
        });
    }

    /// Execute one instruction, prefixes included
    ///
    /// Returns the clocks charged during the step (always 0 with timing off or
    /// while halted).
    pub fn step(&mut self) -> u32 {
        if self.halt.is_some() {
            return 0;
        }

        self.step_clocks = 0;
        self.prefix = PrefixState::default();
        self.prefix_bytes = 0;
        self.modrm = ModRm::default();
        self.dispatch();
        self.prefix = PrefixState::default();

        if self.step_clocks > 0 {
            log(LogCategory::Timing, LogLevel::Trace, || {
                format!(
                    "Timing: {} clocks, {} total",
                    self.step_clocks,
                    self.clock.total()
                )
            });
        }
        self.step_clocks
    }

    /// Step until halted or `max_steps` instructions have run
    ///
    /// Returns the number of steps executed.
    pub fn run(&mut self, max_steps: u64) -> u64 {
        let mut steps = 0;
        while steps < max_steps && self.halt.is_none() {
            self.step();
            steps += 1;
        }
        steps
    }

    /// Fetch one opcode and run its handler
    ///
    /// Prefix handlers call this again for the opcode that follows them.
    pub fn dispatch(&mut self) {
        let ip = self.regs.ip;
        let opcode = self.fetch_u8();

        if let Some(handler) = self.table.direct(opcode) {
            self.trace(ip, opcode, handler.name);
            self.run_handler(handler, opcode);
            return;
        }

        if self.table.is_group(opcode) {
            self.resolve_modrm(Width::from_opcode(opcode));
            if let Some(handler) = self.table.child(opcode, self.modrm.reg) {
                self.trace(ip, opcode, handler.name);
                self.run_handler(handler, opcode);
                return;
            }
        }

        log(LogCategory::CPU, LogLevel::Warn, || {
            format!(
                "CPU: unmapped opcode {:02X} at {:04X}:{:04X}, halting",
                opcode,
                self.regs.seg(CS),
                ip
            )
        });
        self.halt = Some(HaltReason::Unmapped(opcode));
    }

    fn run_handler(&mut self, handler: Handler<M>, opcode: u8) {
        self.tally = Tally::default();
        (handler.exec)(self, opcode);
        if self.clock.is_active() {
            self.tally.memory = self.modrm.is_memory();
            let clocks = handler.cost.clocks(&self.tally);
            self.charge(ClockSource::Dispatch, clocks);
        }
    }

    fn trace(&self, ip: u16, opcode: u8, name: &str) {
        log(LogCategory::CPU, LogLevel::Trace, || {
            format!(
                "CPU: {:04X}:{:04X} {:02X} {}",
                self.regs.seg(CS),
                ip,
                opcode,
                name
            )
        });
    }

    /// Run the next opcode with extra prefix state, restoring the previous
    /// prefix state afterwards
    ///
    /// Only the first prefix of an instruction re-enters [`Cpu8086::dispatch`].
    /// Prefixes that follow it add their state and return, and the first one
    /// keeps fetching until a non-prefix opcode runs. A chain longer than
    /// [`MAX_PREFIXES`] ends the step early with IP on the next byte.
    pub fn dispatch_prefixed(&mut self, apply: impl FnOnce(&mut PrefixState)) {
        let saved = self.prefix;
        apply(&mut self.prefix);
        self.prefix_bytes += 1;
        if self.prefix_bytes > 1 {
            self.prefix_chained = true;
            return;
        }

        loop {
            self.prefix_chained = false;
            self.dispatch();
            if !self.prefix_chained {
                break;
            }
            if self.prefix_bytes >= MAX_PREFIXES {
                log(LogCategory::CPU, LogLevel::Warn, || {
                    format!(
                        "CPU: {} prefix bytes in a row at {:04X}:{:04X}, ending step",
                        self.prefix_bytes,
                        self.regs.seg(CS),
                        self.regs.ip
                    )
                });
                break;
            }
        }
        self.prefix_bytes = 0;
        self.prefix_chained = false;
        self.prefix = saved;
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_some()
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt
    }

    /// Stop fetching until an interrupt (HLT) or reset (anything else)
    pub fn halt(&mut self, reason: HaltReason) {
        log(LogCategory::CPU, LogLevel::Debug, || {
            format!(
                "CPU: halted ({:?}) at {:04X}:{:04X}",
                reason,
                self.regs.seg(CS),
                self.regs.ip
            )
        });
        self.halt = Some(reason);
    }

    pub fn table(&self) -> &OpcodeTable<M> {
        &self.table
    }

    // Clock accounting

    /// Replace the clock sink; the new sink starts from its own state
    pub fn set_clock(&mut self, clock: Box<dyn ClockSink>) {
        self.clock = clock;
    }

    pub fn clock(&self) -> &dyn ClockSink {
        self.clock.as_ref()
    }

    /// Total clocks charged since reset
    pub fn clocks(&self) -> u64 {
        self.clock.total()
    }

    pub fn charge(&mut self, source: ClockSource, clocks: u32) {
        if self.clock.is_active() {
            self.clock.charge(source, clocks);
            self.step_clocks += clocks;
        }
    }

    /// Record a branch outcome for conditional costs; returns `taken`
    #[inline]
    pub fn note_branch(&mut self, taken: bool) -> bool {
        self.tally.taken = Some(taken);
        taken
    }

    /// Record a shift count for CL-counted costs
    #[inline]
    pub fn note_count(&mut self, count: u32) {
        self.tally.count = count;
    }

    /// Record REP iterations for REP-counted costs
    #[inline]
    pub fn note_repeats(&mut self, repeats: u32) {
        self.tally.repeats = Some(repeats);
    }

    // Memory access

    #[inline]
    pub fn physical_address(segment: u16, offset: u16) -> u32 {
        ((segment as u32) << 4) + offset as u32
    }

    #[inline]
    pub fn read_u8(&self, segment: u16, offset: u16) -> u8 {
        self.memory.read(Self::physical_address(segment, offset))
    }

    #[inline]
    pub fn write_u8(&mut self, segment: u16, offset: u16, val: u8) {
        self.memory
            .write(Self::physical_address(segment, offset), val);
    }

    /// Little-endian word; the high byte comes from offset + 1 in the same segment
    #[inline]
    pub fn read_u16(&self, segment: u16, offset: u16) -> u16 {
        let low = self.read_u8(segment, offset) as u16;
        let high = self.read_u8(segment, offset.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    #[inline]
    pub fn write_u16(&mut self, segment: u16, offset: u16, val: u16) {
        self.write_u8(segment, offset, val as u8);
        self.write_u8(segment, offset.wrapping_add(1), (val >> 8) as u8);
    }

    pub fn read(&self, width: Width, segment: u16, offset: u16) -> u16 {
        match width {
            Width::Byte => self.read_u8(segment, offset) as u16,
            Width::Word => self.read_u16(segment, offset),
        }
    }

    pub fn write(&mut self, width: Width, segment: u16, offset: u16, val: u16) {
        match width {
            Width::Byte => self.write_u8(segment, offset, val as u8),
            Width::Word => self.write_u16(segment, offset, val),
        }
    }

    #[inline]
    pub fn fetch_u8(&mut self) -> u8 {
        let val = self.read_u8(self.regs.seg(CS), self.regs.ip);
        self.regs.ip = self.regs.ip.wrapping_add(1);
        val
    }

    #[inline]
    pub fn fetch_u16(&mut self) -> u16 {
        let low = self.fetch_u8() as u16;
        let high = self.fetch_u8() as u16;
        (high << 8) | low
    }

    /// Immediate operand of the given width
    pub fn fetch(&mut self, width: Width) -> u16 {
        match width {
            Width::Byte => self.fetch_u8() as u16,
            Width::Word => self.fetch_u16(),
        }
    }

    /// Segment register slot to use for a data access that defaults to `default`
    #[inline]
    pub fn segment_or(&self, default: usize) -> usize {
        self.prefix.segment.unwrap_or(default)
    }

    /// Segment value for a data access that defaults to `default`
    #[inline]
    pub fn data_segment(&self, default: usize) -> u16 {
        self.regs.seg(self.segment_or(default))
    }

    // Stack

    #[inline]
    pub fn push(&mut self, val: u16) {
        let sp = self.regs.reg16(SP).wrapping_sub(2);
        self.regs.set_reg16(SP, sp);
        self.write_u16(self.regs.seg(SS), sp, val);
    }

    #[inline]
    pub fn pop(&mut self) -> u16 {
        let sp = self.regs.reg16(SP);
        let val = self.read_u16(self.regs.seg(SS), sp);
        self.regs.set_reg16(SP, sp.wrapping_add(2));
        val
    }

    // Interrupts and I/O

    /// Enter interrupt `vector`: push FLAGS, CS and IP, clear TF and IF, and
    /// load CS:IP from the vector table at physical `vector * 4`
    ///
    /// Used for INT, faults and external interrupts. Wakes a core halted by
    /// HLT; a core halted on an unmapped opcode stays halted.
    pub fn interrupt(&mut self, vector: u8) {
        let (from_cs, from_ip) = (self.regs.seg(CS), self.regs.ip);
        self.push(self.regs.flags);
        self.regs.set_flag(FLAG_TF, false);
        self.regs.set_flag(FLAG_IF, false);
        self.push(from_cs);
        self.push(from_ip);

        // The pushes may land on the vector table, so it is read afterwards
        let entry = vector as u32 * 4;
        let ip = self.memory.read_u16(entry);
        let cs = self.memory.read_u16(entry + 2);
        self.regs.ip = ip;
        self.regs.set_seg(CS, cs);
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!(
                "Interrupts: INT {:02X} from {:04X}:{:04X} to {:04X}:{:04X}",
                vector, from_cs, from_ip, cs, ip
            )
        });

        if self.halt == Some(HaltReason::Hlt) {
            self.halt = None;
        }
    }

    pub fn pin(&mut self, width: Width, port: u16) -> u16 {
        self.ports.pin(width.is_word(), port)
    }

    pub fn pout(&mut self, width: Width, port: u16, value: u16) {
        self.ports.pout(width.is_word(), port, value);
    }

    // Save states

    pub fn snapshot(&self) -> CoreState {
        CoreState {
            regs: self.regs.clone(),
            halt: self.halt,
        }
    }

    pub fn restore(&mut self, state: CoreState) {
        self.regs = state.regs;
        self.halt = state.halt;
        self.prefix = PrefixState::default();
        self.modrm = ModRm::default();
    }

    /// JSON save state: registers and halt status
    pub fn save_state(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.snapshot())
    }

    pub fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        let state = CoreState::deserialize(v)?;
        self.restore(state);
        Ok(())
    }
}

impl<M: Memory8086> crate::Cpu for Cpu8086<M> {
    fn reset(&mut self) {
        Cpu8086::reset(self);
    }

    fn step(&mut self) -> u32 {
        Cpu8086::step(self)
    }
}

impl<M: Memory8086> std::fmt::Debug for Cpu8086<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu8086")
            .field("regs", &self.regs)
            .field("halt", &self.halt)
            .field("clock", &self.clock)
            .field("table", &self.table)
            .finish()
    }
}
