//! Bytecodes and their operand tables

use std::fmt;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::operand::{OperandScale, OperandType};

/// Bytecodes
///
/// Accumulator-based register instruction set. Most instructions read the
/// accumulator implicitly and take registers, constant-pool indices or
/// immediates as explicit operands. Operand widths are scaled by an optional
/// `Wide`/`ExtraWide` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Bytecode {
    // ==================== Prefixes ====================
    /// Next bytecode uses 2-byte scalable operands
    Wide = 0x00,
    /// Next bytecode uses 4-byte scalable operands
    ExtraWide = 0x01,

    // ==================== Debugger ====================
    /// Breakpoint over an instruction without operands
    DebugBreak0 = 0x02,
    /// Breakpoint over an instruction with one operand slot
    DebugBreak1 = 0x03,
    /// Breakpoint over an instruction with two operand slots
    DebugBreak2 = 0x04,

    // ==================== Arithmetic ====================
    /// acc = lhs + rhs
    Add = 0x05,
    /// acc = lhs - rhs
    Sub = 0x06,
    /// acc = lhs * rhs
    Mul = 0x07,
    /// acc = acc + imm, with feedback slot
    AddSmi = 0x08,

    // ==================== Loads / stores ====================
    /// acc = imm
    LoadSmi = 0x09,
    /// acc = constants\[idx\]
    LoadConstant = 0x0A,
    /// acc = undefined
    LoadUndefined = 0x0B,
    /// acc = src
    LoadRegister = 0x0C,
    /// dst = acc
    StoreRegister = 0x0D,
    /// dst = src
    Move = 0x0E,
    /// acc = globals\[name\], with feedback slot
    LoadGlobal = 0x0F,

    // ==================== Objects ====================
    /// acc = obj.name, with feedback slot
    LoadNamedProperty = 0x10,
    /// obj.name = acc, with feedback slot
    StoreNamedProperty = 0x11,
    /// acc = closure(shared_info), with feedback cell and flags
    CreateClosure = 0x12,

    // ==================== Calls ====================
    /// acc = callable.call(receiver, args...)
    CallProperty = 0x13,
    /// acc = callable(args...) with an undefined receiver
    CallUndefinedReceiver = 0x14,
    /// acc = runtime\[id\](args...)
    CallRuntime = 0x15,
    /// (dst, dst + 1) = runtime\[id\](args...)
    CallRuntimeForPair = 0x16,
    /// acc = intrinsic\[id\](args...)
    InvokeIntrinsic = 0x17,

    // ==================== Iteration ====================
    /// (cache_type, cache_array, cache_length) = prepare(acc)
    ForInPrepare = 0x18,
    /// acc = next key of receiver at index
    ForInNext = 0x19,

    // ==================== Comparison ====================
    /// acc = src == acc, with feedback slot
    TestEqual = 0x1A,

    // ==================== Control flow ====================
    /// Unconditional relative jump
    Jump = 0x1B,
    /// Jump if acc is true
    JumpIfTrue = 0x1C,
    /// Jump if acc is false
    JumpIfFalse = 0x1D,
    /// Interrupt / stack overflow check
    StackCheck = 0x1E,
    /// Throw acc
    Throw = 0x1F,
    /// Return acc
    Return = 0x20,
}

impl Bytecode {
    /// Every bytecode, in opcode order
    pub const ALL: [Bytecode; 33] = [
        Self::Wide,
        Self::ExtraWide,
        Self::DebugBreak0,
        Self::DebugBreak1,
        Self::DebugBreak2,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::AddSmi,
        Self::LoadSmi,
        Self::LoadConstant,
        Self::LoadUndefined,
        Self::LoadRegister,
        Self::StoreRegister,
        Self::Move,
        Self::LoadGlobal,
        Self::LoadNamedProperty,
        Self::StoreNamedProperty,
        Self::CreateClosure,
        Self::CallProperty,
        Self::CallUndefinedReceiver,
        Self::CallRuntime,
        Self::CallRuntimeForPair,
        Self::InvokeIntrinsic,
        Self::ForInPrepare,
        Self::ForInNext,
        Self::TestEqual,
        Self::Jump,
        Self::JumpIfTrue,
        Self::JumpIfFalse,
        Self::StackCheck,
        Self::Throw,
        Self::Return,
    ];

    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Wide),
            0x01 => Some(Self::ExtraWide),

            0x02 => Some(Self::DebugBreak0),
            0x03 => Some(Self::DebugBreak1),
            0x04 => Some(Self::DebugBreak2),

            0x05 => Some(Self::Add),
            0x06 => Some(Self::Sub),
            0x07 => Some(Self::Mul),
            0x08 => Some(Self::AddSmi),

            0x09 => Some(Self::LoadSmi),
            0x0A => Some(Self::LoadConstant),
            0x0B => Some(Self::LoadUndefined),
            0x0C => Some(Self::LoadRegister),
            0x0D => Some(Self::StoreRegister),
            0x0E => Some(Self::Move),
            0x0F => Some(Self::LoadGlobal),

            0x10 => Some(Self::LoadNamedProperty),
            0x11 => Some(Self::StoreNamedProperty),
            0x12 => Some(Self::CreateClosure),

            0x13 => Some(Self::CallProperty),
            0x14 => Some(Self::CallUndefinedReceiver),
            0x15 => Some(Self::CallRuntime),
            0x16 => Some(Self::CallRuntimeForPair),
            0x17 => Some(Self::InvokeIntrinsic),

            0x18 => Some(Self::ForInPrepare),
            0x19 => Some(Self::ForInNext),

            0x1A => Some(Self::TestEqual),

            0x1B => Some(Self::Jump),
            0x1C => Some(Self::JumpIfTrue),
            0x1D => Some(Self::JumpIfFalse),
            0x1E => Some(Self::StackCheck),
            0x1F => Some(Self::Throw),
            0x20 => Some(Self::Return),

            _ => None,
        }
    }

    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Look up a bytecode by its unscaled name
    pub fn from_name(name: &str) -> Option<Self> {
        static BY_NAME: OnceLock<FxHashMap<&'static str, Bytecode>> = OnceLock::new();
        BY_NAME
            .get_or_init(|| Self::ALL.iter().map(|&b| (b.name(), b)).collect())
            .get(name)
            .copied()
    }

    /// Check if this is a `Wide`/`ExtraWide` prefix
    #[inline]
    pub const fn is_prefix_scaling(self) -> bool {
        matches!(self, Self::Wide | Self::ExtraWide)
    }

    /// Prefix bytecode that announces `scale` (`None` for the default scale)
    pub const fn prefix_for_scale(scale: OperandScale) -> Option<Self> {
        match scale {
            OperandScale::Single => None,
            OperandScale::Double => Some(Self::Wide),
            OperandScale::Quadruple => Some(Self::ExtraWide),
        }
    }

    /// Check if this is a debugger breakpoint.
    ///
    /// The operand slots of a debug break still hold the operands of the
    /// instruction it replaced.
    #[inline]
    pub const fn is_debug_break(self) -> bool {
        matches!(self, Self::DebugBreak0 | Self::DebugBreak1 | Self::DebugBreak2)
    }

    /// Check if this bytecode transfers control
    pub const fn is_jump(self) -> bool {
        matches!(self, Self::Jump | Self::JumpIfTrue | Self::JumpIfFalse)
    }

    /// Declared operand types, in encoding order
    pub const fn operand_types(self) -> &'static [OperandType] {
        use OperandType::{
            Flag8, Idx, Imm, IntrinsicId, MaybeReg, Reg, RegCount, RegOut, RegOutPair,
            RegOutTriple, RegPair, RuntimeId,
        };

        match self {
            Self::Wide | Self::ExtraWide => &[],

            Self::DebugBreak0 => &[],
            Self::DebugBreak1 => &[Reg],
            Self::DebugBreak2 => &[Reg, Reg],

            Self::Add | Self::Sub | Self::Mul => &[Reg, Reg],
            Self::AddSmi => &[Imm, Idx],

            Self::LoadSmi => &[Imm],
            Self::LoadConstant => &[Idx],
            Self::LoadUndefined => &[],
            Self::LoadRegister => &[Reg],
            Self::StoreRegister => &[RegOut],
            Self::Move => &[Reg, RegOut],
            Self::LoadGlobal => &[Idx, Idx],

            Self::LoadNamedProperty | Self::StoreNamedProperty => &[Reg, Idx, Idx],
            Self::CreateClosure => &[Idx, Idx, Flag8],

            Self::CallProperty | Self::CallUndefinedReceiver => &[Reg, Reg, RegCount, Idx],
            Self::CallRuntime => &[RuntimeId, MaybeReg, RegCount],
            Self::CallRuntimeForPair => &[RuntimeId, MaybeReg, RegCount, RegOutPair],
            Self::InvokeIntrinsic => &[IntrinsicId, MaybeReg, RegCount],

            Self::ForInPrepare => &[RegOutTriple, Idx],
            Self::ForInNext => &[Reg, Reg, RegPair, Idx],

            Self::TestEqual => &[Reg, Idx],

            Self::Jump | Self::JumpIfTrue | Self::JumpIfFalse => &[Imm],
            Self::StackCheck | Self::Throw | Self::Return => &[],
        }
    }

    /// Number of declared operands
    #[inline]
    pub const fn operand_count(self) -> usize {
        self.operand_types().len()
    }

    /// Type of operand `i`.
    ///
    /// Panics if `i` is out of range.
    #[inline]
    pub const fn operand_type(self, i: usize) -> OperandType {
        self.operand_types()[i]
    }

    /// Byte offset of operand `i` from the bytecode byte (prefix excluded)
    pub fn operand_offset(self, i: usize, scale: OperandScale) -> usize {
        1 + self.operand_types()[..i]
            .iter()
            .map(|ty| ty.size(scale).bytes())
            .sum::<usize>()
    }

    /// Encoded size at `scale`, bytecode byte included and prefix excluded
    pub fn size(self, scale: OperandScale) -> usize {
        1 + self
            .operand_types()
            .iter()
            .map(|ty| ty.size(scale).bytes())
            .sum::<usize>()
    }

    /// Get the name of this bytecode
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wide => "Wide",
            Self::ExtraWide => "ExtraWide",
            Self::DebugBreak0 => "DebugBreak0",
            Self::DebugBreak1 => "DebugBreak1",
            Self::DebugBreak2 => "DebugBreak2",
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::AddSmi => "AddSmi",
            Self::LoadSmi => "LoadSmi",
            Self::LoadConstant => "LoadConstant",
            Self::LoadUndefined => "LoadUndefined",
            Self::LoadRegister => "LoadRegister",
            Self::StoreRegister => "StoreRegister",
            Self::Move => "Move",
            Self::LoadGlobal => "LoadGlobal",
            Self::LoadNamedProperty => "LoadNamedProperty",
            Self::StoreNamedProperty => "StoreNamedProperty",
            Self::CreateClosure => "CreateClosure",
            Self::CallProperty => "CallProperty",
            Self::CallUndefinedReceiver => "CallUndefinedReceiver",
            Self::CallRuntime => "CallRuntime",
            Self::CallRuntimeForPair => "CallRuntimeForPair",
            Self::InvokeIntrinsic => "InvokeIntrinsic",
            Self::ForInPrepare => "ForInPrepare",
            Self::ForInNext => "ForInNext",
            Self::TestEqual => "TestEqual",
            Self::Jump => "Jump",
            Self::JumpIfTrue => "JumpIfTrue",
            Self::JumpIfFalse => "JumpIfFalse",
            Self::StackCheck => "StackCheck",
            Self::Throw => "Throw",
            Self::Return => "Return",
        }
    }

    /// Mnemonic at `scale`: the name, suffixed with the prefix name when scaled
    #[inline]
    pub fn mnemonic(self, scale: OperandScale) -> Mnemonic {
        Mnemonic {
            bytecode: self,
            scale,
        }
    }
}

impl OperandScale {
    /// Scale announced by a prefix bytecode (`None` if `bytecode` is not a prefix)
    pub const fn from_prefix(bytecode: Bytecode) -> Option<Self> {
        match bytecode {
            Bytecode::Wide => Some(Self::Double),
            Bytecode::ExtraWide => Some(Self::Quadruple),
            _ => None,
        }
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `Display` adapter returned by [`Bytecode::mnemonic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mnemonic {
    bytecode: Bytecode,
    scale: OperandScale,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bytecode.name())?;
        if let Some(prefix) = self.scale.prefix_name() {
            write!(f, ".{prefix}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytecode_roundtrip() {
        for bytecode in Bytecode::ALL {
            assert_eq!(Bytecode::from_byte(bytecode.to_byte()), Some(bytecode));
        }
    }

    #[test]
    fn test_all_is_in_opcode_order() {
        for (i, bytecode) in Bytecode::ALL.iter().enumerate() {
            assert_eq!(bytecode.to_byte() as usize, i);
        }
    }

    #[test]
    fn test_invalid_bytecode() {
        assert_eq!(Bytecode::from_byte(0xFF), None);
        assert_eq!(Bytecode::from_byte(0x21), None);
    }

    #[test]
    fn test_bytecode_name() {
        assert_eq!(Bytecode::Add.name(), "Add");
        assert_eq!(Bytecode::LoadSmi.to_string(), "LoadSmi");
        assert_eq!(Bytecode::from_name("CallRuntime"), Some(Bytecode::CallRuntime));
        assert_eq!(Bytecode::from_name("Bogus"), None);
    }

    #[test]
    fn test_mnemonic_suffix() {
        assert_eq!(Bytecode::LoadSmi.mnemonic(OperandScale::Single).to_string(), "LoadSmi");
        assert_eq!(
            Bytecode::LoadSmi.mnemonic(OperandScale::Double).to_string(),
            "LoadSmi.Wide"
        );
        assert_eq!(
            Bytecode::LoadSmi.mnemonic(OperandScale::Quadruple).to_string(),
            "LoadSmi.ExtraWide"
        );
    }

    #[test]
    fn test_prefix_scaling() {
        assert!(Bytecode::Wide.is_prefix_scaling());
        assert!(Bytecode::ExtraWide.is_prefix_scaling());
        assert!(!Bytecode::Add.is_prefix_scaling());
        assert_eq!(OperandScale::from_prefix(Bytecode::Wide), Some(OperandScale::Double));
        assert_eq!(
            OperandScale::from_prefix(Bytecode::ExtraWide),
            Some(OperandScale::Quadruple)
        );
        assert_eq!(OperandScale::from_prefix(Bytecode::Add), None);
        for scale in [OperandScale::Double, OperandScale::Quadruple] {
            let prefix = Bytecode::prefix_for_scale(scale).unwrap();
            assert_eq!(OperandScale::from_prefix(prefix), Some(scale));
        }
    }

    #[test]
    fn test_sizes() {
        assert_eq!(Bytecode::Add.size(OperandScale::Single), 3);
        assert_eq!(Bytecode::Add.size(OperandScale::Double), 5);
        assert_eq!(Bytecode::Add.size(OperandScale::Quadruple), 9);
        assert_eq!(Bytecode::Return.size(OperandScale::Quadruple), 1);
        // RuntimeId is a fixed short, IntrinsicId and Flag8 fixed bytes
        assert_eq!(Bytecode::CallRuntime.size(OperandScale::Single), 5);
        assert_eq!(Bytecode::CallRuntime.size(OperandScale::Double), 7);
        assert_eq!(Bytecode::InvokeIntrinsic.size(OperandScale::Quadruple), 10);
        assert_eq!(Bytecode::CreateClosure.size(OperandScale::Double), 6);
    }

    #[test]
    fn test_operand_offsets() {
        let b = Bytecode::CallRuntimeForPair;
        assert_eq!(b.operand_offset(0, OperandScale::Single), 1);
        assert_eq!(b.operand_offset(1, OperandScale::Single), 3);
        assert_eq!(b.operand_offset(2, OperandScale::Single), 4);
        assert_eq!(b.operand_offset(3, OperandScale::Single), 5);
        assert_eq!(b.operand_offset(3, OperandScale::Quadruple), 11);
    }

    #[test]
    fn test_every_live_operand_type_is_covered() {
        let mut seen = Vec::new();
        for bytecode in Bytecode::ALL {
            for &ty in bytecode.operand_types() {
                assert_ne!(ty, OperandType::None, "{bytecode} declares a None operand");
                if !seen.contains(&ty) {
                    seen.push(ty);
                }
            }
        }
        assert_eq!(seen.len(), 12);
    }
}
