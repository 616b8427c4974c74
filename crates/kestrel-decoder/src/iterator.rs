//! Checked walk over a buffer of instructions
//!
//! The decoder primitives trust their input. The iterator validates each
//! opcode byte, instruction length and register run first, so a listing of
//! untrusted bytes ends in a [`BytecodeError`] instead of a panic.

use std::iter::FusedIterator;

use kestrel_bytecode::{Bytecode, BytecodeError, OperandScale, OperandType, Result};

use crate::decoder::{
    DecodedInstruction, decode_operands, decode_register_operand, decode_signed_operand,
};
use crate::operand::Operand;

/// One validated instruction inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionRef<'a> {
    offset: usize,
    bytecode: Bytecode,
    scale: OperandScale,
    prefix_len: usize,
    bytes: &'a [u8],
}

impl<'a> InstructionRef<'a> {
    /// Offset of the first byte (the prefix, if any) in the buffer
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The real bytecode
    #[inline]
    pub fn bytecode(&self) -> Bytecode {
        self.bytecode
    }

    /// Operand scale
    #[inline]
    pub fn scale(&self) -> OperandScale {
        self.scale
    }

    /// 1 if prefixed, else 0
    #[inline]
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Encoded bytes, prefix included
    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Encoded length, prefix included
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: every instruction has at least its bytecode byte
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decoded operands (none for debug breaks)
    pub fn operands(&self) -> Vec<Operand> {
        decode_operands(self.bytes)
    }

    /// Disassembly line for this instruction
    pub fn display(&self, parameter_count: i32) -> DecodedInstruction<'a> {
        DecodedInstruction::new(self.bytes, parameter_count)
    }

    /// Buffer offset a jump lands on, relative to this instruction's first byte
    pub fn jump_target(&self) -> Option<isize> {
        if !self.bytecode.is_jump() {
            return None;
        }
        let start = self.prefix_len + self.bytecode.operand_offset(0, self.scale);
        let delta = decode_signed_operand(&self.bytes[start..], OperandType::Imm, self.scale);
        Some(self.offset as isize + delta as isize)
    }
}

/// Iterator over the instructions of a buffer.
///
/// Yields `Err` at most once, then stops.
#[derive(Debug, Clone)]
pub struct BytecodeIterator<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> BytecodeIterator<'a> {
    /// Walk `bytes` from offset 0
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            failed: false,
        }
    }

    /// Offset of the next instruction
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn bytecode_at(&self, offset: usize) -> Result<Bytecode> {
        let byte = self.bytes[offset];
        Bytecode::from_byte(byte).ok_or(BytecodeError::InvalidOpcode { byte, offset })
    }

    fn read_instruction(&self, offset: usize) -> Result<InstructionRef<'a>> {
        let rest = &self.bytes[offset..];
        let first = self.bytecode_at(offset)?;

        let (bytecode, scale, prefix_len) = match OperandScale::from_prefix(first) {
            Some(scale) => {
                if rest.len() < 2 {
                    return Err(BytecodeError::UnexpectedEnd {
                        offset,
                        needed: 2,
                        available: rest.len(),
                    });
                }
                let bytecode = self.bytecode_at(offset + 1)?;
                if bytecode.is_prefix_scaling() {
                    return Err(BytecodeError::DoublePrefix { offset });
                }
                (bytecode, scale, 1)
            }
            None => (first, OperandScale::Single, 0),
        };

        let needed = prefix_len + bytecode.size(scale);
        if needed > rest.len() {
            return Err(BytecodeError::UnexpectedEnd {
                offset,
                needed,
                available: rest.len(),
            });
        }

        let bytes = &rest[..needed];
        check_register_runs(bytecode, scale, prefix_len, bytes, offset)?;

        Ok(InstructionRef {
            offset,
            bytecode,
            scale,
            prefix_len,
            bytes,
        })
    }
}

/// Every register run must end inside the register index range.
fn check_register_runs(
    bytecode: Bytecode,
    scale: OperandScale,
    prefix_len: usize,
    bytes: &[u8],
    offset: usize,
) -> Result<()> {
    // debug break operands are never decoded
    if bytecode.is_debug_break() {
        return Ok(());
    }
    for (i, &ty) in bytecode.operand_types().iter().enumerate() {
        if ty.register_run_length() < 2 {
            continue;
        }
        let start = prefix_len + bytecode.operand_offset(i, scale);
        let first = decode_register_operand(&bytes[start..], ty, scale);
        if first.run_end(ty.register_run_length()).is_none() {
            return Err(BytecodeError::InvalidOperand { offset, operand: i });
        }
    }
    Ok(())
}

impl<'a> Iterator for BytecodeIterator<'a> {
    type Item = Result<InstructionRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }

        let result = self.read_instruction(self.offset);
        match &result {
            Ok(insn) => {
                #[cfg(feature = "decode_logging")]
                tracing::trace!(
                    offset = insn.offset,
                    bytecode = insn.bytecode.name(),
                    scale = insn.scale.multiplier(),
                    len = insn.len(),
                    "decoded instruction"
                );
                self.offset += insn.len();
            }
            Err(_err) => {
                #[cfg(feature = "decode_logging")]
                tracing::debug!(offset = self.offset, error = %_err, "bytecode walk stopped");
                self.failed = true;
            }
        }
        Some(result)
    }
}

impl FusedIterator for BytecodeIterator<'_> {}
