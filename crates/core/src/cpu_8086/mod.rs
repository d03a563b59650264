//! Intel 8086 instruction decode-and-dispatch engine.
//!
//! The engine is assembled from small parts:
//!
//! - [`pattern`]: `0/1/*` bit templates expanded into opcode or reg values
//! - [`registry`]: the 256-entry dispatch table and its builder
//! - [`modrm`]: Mod-Reg-R/M decoding, effective addresses, operand access
//! - [`flags`]: status-flag helpers shared by the arithmetic opcodes
//! - [`core`]: the fetch/dispatch loop, stack and interrupt entry
//! - [`timing`]: optional clock accounting
//! - [`ops`]: the standard instruction set
//!
//! Systems supply memory through [`Memory8086`] and peripherals through
//! [`PortDevice`].

pub mod core;
pub mod flags;
pub mod memory;
pub mod modrm;
pub mod ops;
pub mod pattern;
pub mod ports;
pub mod registry;
pub mod state;
pub mod timing;

pub use self::core::{CoreState, Cpu8086, MAX_PREFIXES};
pub use memory::{ArrayMemory, Memory8086, MEMORY_SIZE};
pub use modrm::{ModRm, Operand};
pub use pattern::Pattern;
pub use ports::{DeviceId, PortBus, PortDevice};
pub use registry::{Binding, Handler, OpcodeTable, RegistryBuilder, Slot};
pub use state::*;
pub use timing::{ClockSink, ClockSource, Cost, CycleCounter, NullClock};

#[cfg(test)]
mod tests;
