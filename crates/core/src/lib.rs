//! 8086 execution core: opcode registry, addressing, flags, dispatch and
//! clock accounting.

pub mod config;
pub mod cpu_8086;
pub mod error;
pub mod logging;

pub use config::{EngineConfig, ResetVector, TimingMode};
pub use error::ConfigError;

/// A CPU-like component that can be stepped; returns cycles consumed.
pub trait Cpu {
    fn reset(&mut self);
    fn step(&mut self) -> u32;
}
