use crate::formatter::{InstructionFormatter, RawInstructionFormatter};
use crate::val::{Value, Var};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Comment(String),
    Nop,

    Push(Value),
    Pop,
    Dup,
    Swap,

    Load(Var),
    Store(Var),
    /// Pushes the address of a variable
    AddrOf(Var),
    /// Pops an address and pushes the value stored there
    LoadIndirect,
    /// Pops a value then an address, and stores the value at the address
    StoreIndirect,

    /// Pops an index then an array address, and pushes the address of the element. `array_ty`
    /// names an array type of the unit's array table, for bounds checking.
    Element {
        array_ty: String,
    },
    /// Pops a record address and pushes the address of field number `field` of `record_ty`
    Field {
        record_ty: String,
        field: usize,
    },

    BinOp(BinOp),
    UnOp(UnOp),

    Jump(Target),
    /// Pops a boolean and jumps if it's true
    JumpIf(Target),
    /// Pops a boolean and jumps if it's false
    JumpIfNot(Target),

    Call {
        callee: Callee,
        arg_count: usize,
    },
    /// Runtime-provided routine such as `WriteLn`
    Builtin {
        name: String,
        arg_count: usize,
    },

    /// Allocates a frame for a routine at lexical level `depth` with `locals` slots
    Enter {
        depth: usize,
        locals: usize,
    },
    Leave,
    Return,
    Halt,
}

impl Instruction {
    pub fn push(val: impl Into<Value>) -> Self {
        Instruction::Push(val.into())
    }

    pub fn call(name: impl Into<String>, arg_count: usize) -> Self {
        Instruction::Call {
            callee: Callee::Function(name.into()),
            arg_count,
        }
    }

    pub fn jump_to_label(name: impl Into<String>) -> Self {
        Instruction::Jump(Target::Label(name.into()))
    }

    // true if this instruction has no operands that still need to be resolved by the linker
    pub fn is_linked(&self) -> bool {
        match self {
            | Instruction::Load(var)
            | Instruction::Store(var)
            | Instruction::AddrOf(var) => var.is_linked(),

            | Instruction::Jump(target)
            | Instruction::JumpIf(target)
            | Instruction::JumpIfNot(target) => matches!(target, Target::Address(..)),

            Instruction::Call { callee, .. } => matches!(callee, Callee::Address(..)),

            | Instruction::Comment(..)
            | Instruction::Nop
            | Instruction::Push(..)
            | Instruction::Pop
            | Instruction::Dup
            | Instruction::Swap
            | Instruction::LoadIndirect
            | Instruction::StoreIndirect
            | Instruction::Element { .. }
            | Instruction::Field { .. }
            | Instruction::BinOp(..)
            | Instruction::UnOp(..)
            | Instruction::Builtin { .. }
            | Instruction::Enter { .. }
            | Instruction::Leave
            | Instruction::Return
            | Instruction::Halt => true,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut buf = String::new();
        RawInstructionFormatter
            .format_instruction(self, &mut buf)
            .map_err(|_| fmt::Error)?;

        f.write_str(&buf)
    }
}

/// Destination of a jump.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// a label defined in the same unit
    Label(String),
    /// an offset into the same instruction stream as the jump
    Offset(usize),
    /// an absolute address in a linked program
    Address(usize),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::Label(name) => write!(f, "{}", name),
            Target::Offset(offset) => write!(f, "+{}", offset),
            Target::Address(addr) => write!(f, "@{}", addr),
        }
    }
}

/// Target of a call.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Callee {
    /// a function of the calling unit, or an interface function of a unit it uses
    Function(String),
    /// an interface function of a specific unit, e.g. `Unit1.F`
    Qualified { unit: String, name: String },
    /// the absolute entry address of a function in a linked program
    Address(usize),
}

impl Callee {
    pub fn qualified(unit: impl Into<String>, name: impl Into<String>) -> Self {
        Callee::Qualified {
            unit: unit.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Callee::Function(name) => write!(f, "{}", name),
            Callee::Qualified { unit, name } => write!(f, "{}.{}", unit, name),
            Callee::Address(addr) => write!(f, "@{}", addr),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// real division (`/`)
    Div,
    /// integer division (`div`)
    IntDiv,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::IntDiv => "idiv",
            BinOp::Mod => "mod",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
            BinOp::Eq => "eq",
            BinOp::NotEq => "ne",
            BinOp::Lt => "lt",
            BinOp::LtEq => "le",
            BinOp::Gt => "gt",
            BinOp::GtEq => "ge",
            BinOp::In => "in",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
}

impl UnOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnOp::Neg => "neg",
            UnOp::Not => "not",
        }
    }
}
