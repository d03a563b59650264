//! Configuration errors raised while building the opcode table, wiring ports
//! or loading an engine configuration.
//!
//! Everything here is fatal at startup: a core is never constructed from a
//! table or configuration that produced one of these errors. Faults caused by
//! the guest program (divide error, unmapped opcodes) are not Rust errors and
//! are handled inside the emulated machine instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pattern `{pattern}` has {found} bit positions, expected 3 or 8")]
    PatternLength { pattern: String, found: usize },

    #[error("pattern `{pattern}` contains invalid character {ch:?}")]
    PatternChar { pattern: String, ch: char },

    #[error("pattern `{pattern}` is {found} bits wide where {expected} bits are required")]
    PatternWidth {
        pattern: String,
        expected: usize,
        found: usize,
    },

    #[error("opcode {opcode:#04x} registered twice ({existing} and {new})")]
    DuplicateOpcode {
        opcode: u8,
        existing: &'static str,
        new: &'static str,
    },

    #[error("opcode {opcode:#04x} /{reg} registered twice ({existing} and {new})")]
    RegCollision {
        opcode: u8,
        reg: u8,
        existing: &'static str,
        new: &'static str,
    },

    #[error("opcode {opcode:#04x} mixes a direct handler with a reg-field group")]
    ShapeMismatch { opcode: u8 },

    #[error("port {port:#06x} is already attached to {existing}")]
    PortConflict { port: u16, existing: String },

    #[error("unknown log level `{0}`")]
    LogLevel(String),

    #[error("unknown log category `{0}`")]
    LogCategory(String),

    #[error("configuration file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}
