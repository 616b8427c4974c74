//! # Kestrel Bytecode
//!
//! Instruction set catalog for the Kestrel register bytecode: bytecodes,
//! operand types and widths, operand scales and registers.
//!
//! ## Encoding
//!
//! - **Register-based**: operands name virtual registers next to an implicit accumulator
//! - **Compact**: scalable operands take one byte unless a `Wide` (2 bytes) or
//!   `ExtraWide` (4 bytes) prefix precedes the bytecode
//! - **Little-endian**: multi-byte operands are stored low byte first

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bytecode;
pub mod error;
pub mod hex;
pub mod operand;

pub use bytecode::{Bytecode, Mnemonic};
pub use error::{BytecodeError, Result};
pub use operand::{OperandScale, OperandSize, OperandType, Register, RegisterName};

/// Width of the hex column of a disassembly line, in bytes
pub const BYTECODE_COLUMN_SIZE: usize = 6;
