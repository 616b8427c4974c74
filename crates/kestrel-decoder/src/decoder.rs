//! Operand decoding and single-instruction disassembly.
//!
//! Everything here works on a byte slice positioned at the first byte of an
//! instruction (or of one of its operands) and trusts the caller to supply
//! enough bytes. Contract violations (unknown bytecode, truncated slice,
//! decoding an operand with the wrong signedness) panic instead of producing
//! misaligned output. Use [`crate::BytecodeIterator`] for untrusted input.

use std::fmt;

use kestrel_bytecode::{
    BYTECODE_COLUMN_SIZE, Bytecode, OperandScale, OperandSize, OperandType, Register,
};

use crate::operand::Operand;

/// A bytecode together with the prefix that scaled it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixedBytecode {
    /// The real bytecode
    pub bytecode: Bytecode,
    /// Scale announced by the prefix, `Single` without one
    pub scale: OperandScale,
    /// 1 if a prefix byte precedes the bytecode, else 0
    pub prefix_len: usize,
}

impl PrefixedBytecode {
    /// Total encoded length, prefix included
    #[inline]
    pub fn length(&self) -> usize {
        self.prefix_len + self.bytecode.size(self.scale)
    }

    /// Offset of operand `i` from the start of the instruction, prefix included
    #[inline]
    pub fn operand_start(&self, i: usize) -> usize {
        self.prefix_len + self.bytecode.operand_offset(i, self.scale)
    }
}

fn bytecode_at(bytes: &[u8], index: usize) -> Bytecode {
    let byte = bytes[index];
    match Bytecode::from_byte(byte) {
        Some(bytecode) => bytecode,
        None => panic!("invalid bytecode 0x{byte:02x}"),
    }
}

/// Read the (possibly prefixed) bytecode at `bytes[0]`.
///
/// Panics on an unknown opcode byte or on two consecutive prefixes.
pub fn read_prefixed_bytecode(bytes: &[u8]) -> PrefixedBytecode {
    let first = bytecode_at(bytes, 0);
    match OperandScale::from_prefix(first) {
        Some(scale) => {
            let bytecode = bytecode_at(bytes, 1);
            assert!(
                !bytecode.is_prefix_scaling(),
                "{first} prefix followed by {bytecode}"
            );
            PrefixedBytecode {
                bytecode,
                scale,
                prefix_len: 1,
            }
        }
        None => PrefixedBytecode {
            bytecode: first,
            scale: OperandScale::Single,
            prefix_len: 0,
        },
    }
}

/// Encoded length of the instruction at `bytes[0]`, prefix included
pub fn instruction_length(bytes: &[u8]) -> usize {
    read_prefixed_bytecode(bytes).length()
}

#[inline]
fn read_array<const N: usize>(operand_start: &[u8]) -> [u8; N] {
    let mut raw = [0u8; N];
    raw.copy_from_slice(&operand_start[..N]);
    raw
}

/// Decode a signed operand, sign-extending it to 32 bits.
///
/// Panics if `operand_type` is unsigned or `operand_start` is too short.
pub fn decode_signed_operand(
    operand_start: &[u8],
    operand_type: OperandType,
    operand_scale: OperandScale,
) -> i32 {
    assert!(
        !operand_type.is_unsigned(),
        "signed decode of unsigned operand type {operand_type}"
    );
    match operand_type.size(operand_scale) {
        OperandSize::Byte => i8::from_le_bytes(read_array(operand_start)) as i32,
        OperandSize::Short => i16::from_le_bytes(read_array(operand_start)) as i32,
        OperandSize::Quad => i32::from_le_bytes(read_array(operand_start)),
        OperandSize::None => unreachable!("operand type {operand_type} has no encoding"),
    }
}

/// Decode an unsigned operand, zero-extending it to 32 bits.
///
/// Panics if `operand_type` is signed or `operand_start` is too short.
pub fn decode_unsigned_operand(
    operand_start: &[u8],
    operand_type: OperandType,
    operand_scale: OperandScale,
) -> u32 {
    assert!(
        operand_type.is_unsigned(),
        "unsigned decode of signed operand type {operand_type}"
    );
    match operand_type.size(operand_scale) {
        OperandSize::Byte => operand_start[0] as u32,
        OperandSize::Short => u16::from_le_bytes(read_array(operand_start)) as u32,
        OperandSize::Quad => u32::from_le_bytes(read_array(operand_start)),
        OperandSize::None => unreachable!("operand type {operand_type} has no encoding"),
    }
}

/// Decode a register operand (registers are signed-encoded)
pub fn decode_register_operand(
    operand_start: &[u8],
    operand_type: OperandType,
    operand_scale: OperandScale,
) -> Register {
    assert!(
        operand_type.is_register(),
        "register decode of non-register operand type {operand_type}"
    );
    Register::from_operand(decode_signed_operand(
        operand_start,
        operand_type,
        operand_scale,
    ))
}

/// Decode one operand to its typed value
pub fn decode_operand(
    operand_start: &[u8],
    operand_type: OperandType,
    operand_scale: OperandScale,
) -> Operand {
    match operand_type {
        OperandType::RegCount => {
            Operand::Count(decode_unsigned_operand(operand_start, operand_type, operand_scale))
        }
        OperandType::Idx => {
            Operand::Index(decode_unsigned_operand(operand_start, operand_type, operand_scale))
        }
        OperandType::RuntimeId => {
            Operand::RuntimeId(decode_unsigned_operand(operand_start, operand_type, operand_scale))
        }
        OperandType::IntrinsicId => Operand::IntrinsicId(decode_unsigned_operand(
            operand_start,
            operand_type,
            operand_scale,
        )),
        OperandType::Imm => {
            Operand::Immediate(decode_signed_operand(operand_start, operand_type, operand_scale))
        }
        OperandType::Flag8 => {
            Operand::Flag(decode_unsigned_operand(operand_start, operand_type, operand_scale))
        }
        OperandType::Reg | OperandType::MaybeReg | OperandType::RegOut => Operand::Register(
            decode_register_operand(operand_start, operand_type, operand_scale),
        ),
        OperandType::RegPair | OperandType::RegOutPair | OperandType::RegOutTriple => {
            let first = decode_register_operand(operand_start, operand_type, operand_scale);
            let Some(last) = first.run_end(operand_type.register_run_length()) else {
                panic!("{operand_type} run starting at r{} overflows", first.index());
            };
            Operand::RegisterRange { first, last }
        }
        OperandType::None => unreachable!("operand of type None in a live slot"),
    }
}

/// Decode every operand of the instruction at `bytes[0]`.
///
/// Debug breaks yield no operands: their slots belong to the instruction they
/// replaced.
pub fn decode_operands(bytes: &[u8]) -> Vec<Operand> {
    let prefixed = read_prefixed_bytecode(bytes);
    let PrefixedBytecode {
        bytecode, scale, ..
    } = prefixed;

    if bytecode.is_debug_break() {
        return Vec::new();
    }

    bytecode
        .operand_types()
        .iter()
        .enumerate()
        .map(|(i, &ty)| decode_operand(&bytes[prefixed.operand_start(i)..], ty, scale))
        .collect()
}

/// One disassembled instruction, rendered lazily through `Display`.
///
/// The line holds the raw bytes in hex (padded to a fixed column), the
/// mnemonic, and the comma-separated operands. There is no trailing newline.
#[derive(Debug, Clone, Copy)]
pub struct DecodedInstruction<'a> {
    bytes: &'a [u8],
    parameter_count: i32,
}

impl<'a> DecodedInstruction<'a> {
    /// Wrap the instruction at `bytes[0]`.
    ///
    /// `parameter_count` is the enclosing function's parameter count
    /// (receiver included); it only affects register names.
    pub fn new(bytes: &'a [u8], parameter_count: i32) -> Self {
        Self {
            bytes,
            parameter_count,
        }
    }
}

impl fmt::Display for DecodedInstruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefixed = read_prefixed_bytecode(self.bytes);
        let PrefixedBytecode {
            bytecode, scale, ..
        } = prefixed;
        let length = prefixed.length();

        for byte in &self.bytes[..length] {
            write!(f, "{byte:02x} ")?;
        }
        for _ in length..BYTECODE_COLUMN_SIZE {
            f.write_str("   ")?;
        }

        write!(f, "{} ", bytecode.mnemonic(scale))?;

        if bytecode.is_debug_break() {
            return Ok(());
        }

        for (i, &ty) in bytecode.operand_types().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let operand = decode_operand(&self.bytes[prefixed.operand_start(i)..], ty, scale);
            write!(f, "{}", operand.display(self.parameter_count))?;
        }
        Ok(())
    }
}

/// Disassemble the instruction at `bytes[0]` into `out`.
///
/// Returns `out` for chaining. Panics under the same conditions as the
/// operand decoders.
pub fn decode<'w, W: fmt::Write + ?Sized>(
    out: &'w mut W,
    bytes: &[u8],
    parameter_count: i32,
) -> Result<&'w mut W, fmt::Error> {
    write!(out, "{}", DecodedInstruction::new(bytes, parameter_count))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disassemble(bytes: &[u8]) -> String {
        DecodedInstruction::new(bytes, 1).to_string()
    }

    #[test]
    fn test_signed_byte_sign_extends() {
        assert_eq!(decode_signed_operand(&[0xFF], OperandType::Imm, OperandScale::Single), -1);
        assert_eq!(decode_signed_operand(&[0x80], OperandType::Imm, OperandScale::Single), -128);
        assert_eq!(decode_signed_operand(&[0x7F], OperandType::Imm, OperandScale::Single), 127);
        assert_eq!(decode_signed_operand(&[0x00], OperandType::Imm, OperandScale::Single), 0);
    }

    #[test]
    fn test_signed_wider_operands() {
        assert_eq!(
            decode_signed_operand(&[0xFF, 0xFF], OperandType::Imm, OperandScale::Double),
            -1
        );
        assert_eq!(
            decode_signed_operand(&[0x34, 0x12], OperandType::Imm, OperandScale::Double),
            0x1234
        );
        assert_eq!(
            decode_signed_operand(
                &[0x00, 0x00, 0x00, 0x80],
                OperandType::Imm,
                OperandScale::Quadruple
            ),
            i32::MIN
        );
    }

    #[test]
    fn test_unsigned_zero_extends() {
        assert_eq!(decode_unsigned_operand(&[0xFF], OperandType::Idx, OperandScale::Single), 255);
        assert_eq!(
            decode_unsigned_operand(&[0xFF, 0xFF], OperandType::Idx, OperandScale::Double),
            65535
        );
        assert_eq!(
            decode_unsigned_operand(&[0xFF; 4], OperandType::Idx, OperandScale::Quadruple),
            u32::MAX
        );
    }

    #[test]
    fn test_fixed_width_operands_ignore_scale() {
        // Flag8 is one byte even under ExtraWide
        assert_eq!(
            decode_unsigned_operand(&[0x81, 0xAA], OperandType::Flag8, OperandScale::Quadruple),
            0x81
        );
        // RuntimeId is always two bytes
        assert_eq!(
            decode_unsigned_operand(
                &[0x01, 0x02, 0xAA],
                OperandType::RuntimeId,
                OperandScale::Single
            ),
            0x0201
        );
    }

    #[test]
    fn test_register_operand() {
        let reg = decode_register_operand(&[0x04], OperandType::Reg, OperandScale::Single);
        assert_eq!(reg, Register::new(4));
        let param = decode_register_operand(&[0xFD], OperandType::Reg, OperandScale::Single);
        assert_eq!(param, Register::new(-3));
    }

    #[test]
    #[should_panic(expected = "signed decode of unsigned operand type")]
    fn test_signed_decode_rejects_unsigned_type() {
        decode_signed_operand(&[0x01], OperandType::Idx, OperandScale::Single);
    }

    #[test]
    #[should_panic(expected = "unsigned decode of signed operand type")]
    fn test_unsigned_decode_rejects_signed_type() {
        decode_unsigned_operand(&[0x01], OperandType::Reg, OperandScale::Single);
    }

    #[test]
    #[should_panic(expected = "RegPair run starting at r2147483647 overflows")]
    fn test_register_run_past_index_range_is_fatal() {
        decode_operand(&[0xFF, 0xFF, 0xFF, 0x7F], OperandType::RegPair, OperandScale::Quadruple);
    }

    #[test]
    #[should_panic]
    fn test_none_operand_is_fatal() {
        decode_operand(&[0x01], OperandType::None, OperandScale::Single);
    }

    #[test]
    #[should_panic(expected = "invalid bytecode 0xff")]
    fn test_unknown_bytecode_is_fatal() {
        disassemble(&[0xFF, 0x00]);
    }

    #[test]
    #[should_panic(expected = "prefix followed by")]
    fn test_double_prefix_is_fatal() {
        disassemble(&[0x00, 0x01, 0x09, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_add() {
        assert_eq!(disassemble(&[0x05, 0x02, 0x03]), "05 02 03          Add r2, r3");
    }

    #[test]
    fn test_no_operands_keeps_separator_space() {
        assert_eq!(disassemble(&[0x20]), "20                Return ");
    }

    #[test]
    fn test_wide_prefix() {
        assert_eq!(
            disassemble(&[0x00, 0x09, 0x00, 0x80]),
            "00 09 00 80       LoadSmi.Wide [-32768]"
        );
    }

    #[test]
    fn test_long_instruction_overflows_column() {
        assert_eq!(
            disassemble(&[0x01, 0x0A, 0x01, 0x00, 0x01, 0x00]),
            "01 0a 01 00 01 00 LoadConstant.ExtraWide [65537]"
        );
        assert_eq!(
            disassemble(&[0x00, 0x05, 0x01, 0x00, 0x02, 0x00]),
            "00 05 01 00 02 00 Add.Wide r1, r2"
        );
    }

    #[test]
    fn test_debug_break_has_no_operands() {
        assert_eq!(disassemble(&[0x04, 0x07, 0x08]), "04 07 08          DebugBreak2 ");
        assert!(decode_operands(&[0x04, 0x07, 0x08]).is_empty());
    }

    #[test]
    fn test_instruction_length() {
        assert_eq!(instruction_length(&[0x05, 0x00, 0x00]), 3);
        assert_eq!(instruction_length(&[0x00, 0x05]), 6);
        assert_eq!(instruction_length(&[0x01, 0x05]), 10);
    }

    #[test]
    fn test_decode_returns_sink() {
        let mut out = String::new();
        decode(&mut out, &[0x0C, 0x00], 1).unwrap().push('|');
        assert_eq!(out, format!("0c 00 {}LoadRegister r0|", " ".repeat(12)));
    }
}
