//! # Kestrel Decoder
//!
//! Decodes and disassembles Kestrel bytecode one instruction at a time.
//!
//! - [`decode`] / [`DecodedInstruction`]: one human-readable line per instruction
//! - [`decode_signed_operand`], [`decode_unsigned_operand`],
//!   [`decode_register_operand`]: raw operand values
//! - [`BytecodeIterator`]: checked walk over a whole buffer
//!
//! The single-instruction entry points trust their input and panic on
//! contract violations; the iterator reports errors instead.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod decoder;
pub mod iterator;
pub mod operand;

pub use decoder::{
    DecodedInstruction, PrefixedBytecode, decode, decode_operand, decode_operands,
    decode_register_operand, decode_signed_operand, decode_unsigned_operand, instruction_length,
    read_prefixed_bytecode,
};
pub use iterator::{BytecodeIterator, InstructionRef};
pub use operand::{Operand, OperandDisplay};
