//! Bytecode operands

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte width multiplier applied to every scalable operand of an instruction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperandScale {
    /// Default width, no prefix
    #[default]
    Single = 1,
    /// Announced by the `Wide` prefix
    Double = 2,
    /// Announced by the `ExtraWide` prefix
    Quadruple = 4,
}

impl OperandScale {
    /// All scales, narrowest first
    pub const ALL: [OperandScale; 3] = [Self::Single, Self::Double, Self::Quadruple];

    /// Get the multiplier value
    #[inline]
    pub const fn multiplier(self) -> usize {
        self as usize
    }

    /// Name of the prefix that selects this scale, if any
    pub const fn prefix_name(self) -> Option<&'static str> {
        match self {
            Self::Single => None,
            Self::Double => Some("Wide"),
            Self::Quadruple => Some("ExtraWide"),
        }
    }
}

/// Encoded width of a single operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperandSize {
    /// No storage (only `OperandType::None`)
    None = 0,
    /// 1 byte
    Byte = 1,
    /// 2 bytes
    Short = 2,
    /// 4 bytes
    Quad = 4,
}

impl OperandSize {
    /// Width in bytes
    #[inline]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    const fn scaled(scale: OperandScale) -> Self {
        match scale {
            OperandScale::Single => Self::Byte,
            OperandScale::Double => Self::Short,
            OperandScale::Quadruple => Self::Quad,
        }
    }
}

/// Operand kind as declared in the per-bytecode operand tables.
///
/// The kind fixes both the signedness of the encoded value and how the
/// operand is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandType {
    /// Placeholder, never stored
    None,
    /// Number of registers in a register list
    RegCount,
    /// Index into the constant pool or feedback vector
    Idx,
    /// Runtime function id
    RuntimeId,
    /// Intrinsic function id
    IntrinsicId,
    /// Signed immediate
    Imm,
    /// 8-bit flag set
    Flag8,
    /// Input register
    Reg,
    /// Input register that may be absent (e.g. empty argument list)
    MaybeReg,
    /// Output register
    RegOut,
    /// Two consecutive input registers
    RegPair,
    /// Two consecutive output registers
    RegOutPair,
    /// Three consecutive output registers
    RegOutTriple,
}

impl OperandType {
    /// Check if the operand names a register (or register run)
    pub const fn is_register(self) -> bool {
        matches!(
            self,
            Self::Reg
                | Self::MaybeReg
                | Self::RegOut
                | Self::RegPair
                | Self::RegOutPair
                | Self::RegOutTriple
        )
    }

    /// Check if the operand is a register written by the instruction
    pub const fn is_output_register(self) -> bool {
        matches!(self, Self::RegOut | Self::RegOutPair | Self::RegOutTriple)
    }

    /// Check if the operand is encoded as an unsigned value.
    ///
    /// Every other live operand type is signed; registers are signed because
    /// parameters live at negative indices.
    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::RegCount | Self::Idx | Self::RuntimeId | Self::IntrinsicId | Self::Flag8
        )
    }

    /// Check if the operand width grows with the operand scale
    pub const fn is_scalable(self) -> bool {
        !matches!(
            self,
            Self::None | Self::Flag8 | Self::IntrinsicId | Self::RuntimeId
        )
    }

    /// Number of registers covered by a register operand (0 for non-registers)
    pub const fn register_run_length(self) -> u32 {
        match self {
            Self::Reg | Self::MaybeReg | Self::RegOut => 1,
            Self::RegPair | Self::RegOutPair => 2,
            Self::RegOutTriple => 3,
            _ => 0,
        }
    }

    /// Storage width of this operand at `scale`
    pub const fn size(self, scale: OperandScale) -> OperandSize {
        match self {
            Self::None => OperandSize::None,
            Self::Flag8 | Self::IntrinsicId => OperandSize::Byte,
            Self::RuntimeId => OperandSize::Short,
            Self::RegCount
            | Self::Idx
            | Self::Imm
            | Self::Reg
            | Self::MaybeReg
            | Self::RegOut
            | Self::RegPair
            | Self::RegOutPair
            | Self::RegOutTriple => OperandSize::scaled(scale),
        }
    }

    /// Get the name of this operand type
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::RegCount => "RegCount",
            Self::Idx => "Idx",
            Self::RuntimeId => "RuntimeId",
            Self::IntrinsicId => "IntrinsicId",
            Self::Imm => "Imm",
            Self::Flag8 => "Flag8",
            Self::Reg => "Reg",
            Self::MaybeReg => "MaybeReg",
            Self::RegOut => "RegOut",
            Self::RegPair => "RegPair",
            Self::RegOutPair => "RegOutPair",
            Self::RegOutTriple => "RegOutTriple",
        }
    }
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of the function closure register
const FUNCTION_CLOSURE_INDEX: i32 = -1;
/// Index of the current context register
const CURRENT_CONTEXT_INDEX: i32 = -2;
/// Index of the last parameter; parameters grow downwards from here
const LAST_PARAMETER_INDEX: i32 = -3;

/// Interpreter register.
///
/// Locals are `r0`, `r1`, ... at non-negative indices. The receiver and the
/// formal parameters sit below the two frame registers (`<closure>` and
/// `<context>`), so their indices are negative and depend on the parameter
/// count of the enclosing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Register(pub i32);

impl Register {
    /// The function closure register
    pub const FUNCTION_CLOSURE: Register = Register(FUNCTION_CLOSURE_INDEX);
    /// The current context register
    pub const CURRENT_CONTEXT: Register = Register(CURRENT_CONTEXT_INDEX);

    /// Create a new register
    #[inline]
    pub const fn new(index: i32) -> Self {
        Self(index)
    }

    /// Get register index
    #[inline]
    pub const fn index(self) -> i32 {
        self.0
    }

    /// Register denoted by a decoded operand value
    #[inline]
    pub const fn from_operand(operand: i32) -> Self {
        Self(operand)
    }

    /// Operand value that encodes this register
    #[inline]
    pub const fn to_operand(self) -> i32 {
        self.0
    }

    /// Register holding parameter `index` (0 is the receiver).
    ///
    /// `parameter_count` includes the receiver. `None` if the register index
    /// does not fit in an `i32`.
    #[inline]
    pub const fn from_parameter_index(index: i32, parameter_count: i32) -> Option<Self> {
        match (LAST_PARAMETER_INDEX + 1).checked_add(index) {
            Some(slot) => match slot.checked_sub(parameter_count) {
                Some(index) => Some(Self(index)),
                None => None,
            },
            None => None,
        }
    }

    /// Parameter slot of this register (0 is the receiver), `None` on overflow
    #[inline]
    pub const fn parameter_index(self, parameter_count: i32) -> Option<i32> {
        match self.0.checked_sub(LAST_PARAMETER_INDEX + 1) {
            Some(slot) => slot.checked_add(parameter_count),
            None => None,
        }
    }

    /// Check if this register lives in the parameter area
    #[inline]
    pub const fn is_parameter(self) -> bool {
        self.0 <= LAST_PARAMETER_INDEX
    }

    /// Check if this is the function closure register
    #[inline]
    pub const fn is_function_closure(self) -> bool {
        self.0 == FUNCTION_CLOSURE_INDEX
    }

    /// Check if this is the current context register
    #[inline]
    pub const fn is_current_context(self) -> bool {
        self.0 == CURRENT_CONTEXT_INDEX
    }

    /// Register `offset` slots after this one, `None` past the index range
    #[inline]
    pub const fn checked_offset(self, offset: i32) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(index) => Some(Self(index)),
            None => None,
        }
    }

    /// Last register of a run of `run_length` registers starting here
    #[inline]
    pub const fn run_end(self, run_length: u32) -> Option<Self> {
        if run_length == 0 || run_length > i32::MAX as u32 {
            return None;
        }
        self.checked_offset(run_length as i32 - 1)
    }

    /// Display name, given the parameter count of the enclosing function
    pub fn display(self, parameter_count: i32) -> RegisterName {
        RegisterName {
            register: self,
            parameter_count,
        }
    }
}

impl From<i32> for Register {
    fn from(index: i32) -> Self {
        Self(index)
    }
}

/// `Display` adapter returned by [`Register::display`]
#[derive(Debug, Clone, Copy)]
pub struct RegisterName {
    register: Register,
    parameter_count: i32,
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.register;
        if reg.is_function_closure() {
            f.write_str("<closure>")
        } else if reg.is_current_context() {
            f.write_str("<context>")
        } else if reg.is_parameter() {
            match reg.parameter_index(self.parameter_count) {
                Some(0) => f.write_str("<this>"),
                Some(n) => write!(f, "a{}", n as i64 - 1),
                // no parameter slot for this count; fall back to the raw index
                None => write!(f, "r{}", reg.index()),
            }
        } else {
            write!(f, "r{}", reg.index())
        }
    }
}
