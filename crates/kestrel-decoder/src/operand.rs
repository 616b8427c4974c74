//! Decoded operand values

use std::fmt;

use kestrel_bytecode::Register;
use serde::{Deserialize, Serialize};

/// A decoded operand.
///
/// Values only live long enough to be printed (or serialized); nothing here
/// refers back to the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Operand {
    /// Register count of a register list
    Count(u32),
    /// Constant pool / feedback slot index
    Index(u32),
    /// Runtime function id
    RuntimeId(u32),
    /// Intrinsic function id
    IntrinsicId(u32),
    /// Signed immediate
    Immediate(i32),
    /// Flag byte
    Flag(u32),
    /// Single register
    Register(Register),
    /// Contiguous register run; `last` is derived from the operand type
    RegisterRange {
        /// First register of the run
        first: Register,
        /// Last register of the run (inclusive)
        last: Register,
    },
}

impl Operand {
    /// Render with register names for a function of `parameter_count` parameters
    pub fn display(&self, parameter_count: i32) -> OperandDisplay<'_> {
        OperandDisplay {
            operand: self,
            parameter_count,
        }
    }

    /// Registers covered by this operand, in order
    pub fn registers(&self) -> impl Iterator<Item = Register> {
        let (first, last) = match *self {
            Self::Register(reg) => (reg.index(), reg.index()),
            Self::RegisterRange { first, last } => (first.index(), last.index()),
            // empty range
            _ => (0, -1),
        };
        (first..=last).map(Register::new)
    }
}

/// `Display` adapter returned by [`Operand::display`]
#[derive(Debug, Clone, Copy)]
pub struct OperandDisplay<'a> {
    operand: &'a Operand,
    parameter_count: i32,
}

impl fmt::Display for OperandDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.operand {
            Operand::Count(value) | Operand::Flag(value) => write!(f, "#{value}"),
            Operand::Index(value) | Operand::RuntimeId(value) | Operand::IntrinsicId(value) => {
                write!(f, "[{value}]")
            }
            Operand::Immediate(value) => write!(f, "[{value}]"),
            Operand::Register(reg) => write!(f, "{}", reg.display(self.parameter_count)),
            Operand::RegisterRange { first, last } => write!(
                f,
                "{}-{}",
                first.display(self.parameter_count),
                last.display(self.parameter_count)
            ),
        }
    }
}
