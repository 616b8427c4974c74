//! Bytecode errors

use thiserror::Error;

/// Errors reported by the checked (non-panicking) bytecode layers
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Byte does not name a bytecode
    #[error("Invalid opcode 0x{byte:02x} at offset {offset}")]
    InvalidOpcode {
        /// The offending byte
        byte: u8,
        /// Offset of the byte in the stream
        offset: usize,
    },

    /// A prefix bytecode followed by another prefix
    #[error("Prefix followed by another prefix at offset {offset}")]
    DoublePrefix {
        /// Offset of the first prefix
        offset: usize,
    },

    /// Unexpected end of bytecode
    #[error("Unexpected end of bytecode at offset {offset}: need {needed} bytes, {available} available")]
    UnexpectedEnd {
        /// Offset of the truncated instruction
        offset: usize,
        /// Bytes the instruction needs
        needed: usize,
        /// Bytes left in the stream
        available: usize,
    },

    /// Operand value the instruction cannot be rendered with
    #[error("Invalid operand {operand} of instruction at offset {offset}")]
    InvalidOperand {
        /// Offset of the instruction
        offset: usize,
        /// Index of the operand
        operand: usize,
    },

    /// No bytecode with this name
    #[error("Unknown mnemonic: {0}")]
    UnknownMnemonic(String),

    /// Malformed hex text
    #[error("Invalid hex byte {token:?} at position {position}")]
    InvalidHex {
        /// The offending token
        token: String,
        /// Index of the token in the input
        position: usize,
    },

    /// IO error while reading bytecode
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
