//! The standard 8086 instruction set, one module per instruction family.
//!
//! Each module exposes `register`, which declares its opcode bindings on a
//! [`RegistryBuilder`]. Opcode bytes no module claims stay unmapped and halt
//! the core.

pub mod arith;
pub mod control;
pub mod jump;
pub mod shift;
pub mod stack;
pub mod string;
pub mod transfer;

use super::memory::Memory8086;
use super::registry::{OpcodeTable, RegistryBuilder};
use crate::error::ConfigError;

/// Register every standard instruction family on `b`
pub fn register_all<M: Memory8086>(b: &mut RegistryBuilder<M>) -> Result<(), ConfigError> {
    arith::register(b)?;
    shift::register(b)?;
    transfer::register(b)?;
    stack::register(b)?;
    jump::register(b)?;
    string::register(b)?;
    control::register(b)?;
    Ok(())
}

impl<M: Memory8086> OpcodeTable<M> {
    /// The full 8086 instruction set
    pub fn standard() -> Result<Self, ConfigError> {
        let mut builder = RegistryBuilder::new();
        register_all(&mut builder)?;
        Ok(builder.build())
    }
}
