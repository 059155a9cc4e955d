use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// A variable operand.
///
/// Units are compiled with [Var::Slot], [Var::Named] and [Var::Qualified] references to
/// unit-scope variables. The linker rewrites all of those into [Var::Global] references. Frame
/// references are relative to the active call frame and are left alone by the linker.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Var {
    /// a variable of the unit containing this instruction, by its unit-local slot
    Slot(usize),

    /// a unit-scope variable by name, looked up in the unit containing this instruction and then
    /// in the interface of each unit it uses
    Named(String),

    /// an interface variable of a specific unit, e.g. `Unit1.Counter`
    Qualified { unit: String, name: String },

    /// a local of the routine `depth` lexical levels above the current one
    Frame { depth: usize, slot: usize },

    /// a slot in the program's global variable table
    Global(usize),
}

impl Var {
    pub fn named(name: impl Into<String>) -> Self {
        Var::Named(name.into())
    }

    pub fn qualified(unit: impl Into<String>, name: impl Into<String>) -> Self {
        Var::Qualified {
            unit: unit.into(),
            name: name.into(),
        }
    }

    pub fn frame(depth: usize, slot: usize) -> Self {
        Var::Frame { depth, slot }
    }

    // true if this reference is already in its final form
    pub fn is_linked(&self) -> bool {
        matches!(self, Var::Frame { .. } | Var::Global(..))
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Var::Slot(slot) => write!(f, "%{}", slot),
            Var::Named(name) => write!(f, "{}", name),
            Var::Qualified { unit, name } => write!(f, "{}.{}", unit, name),
            Var::Frame { depth: 0, slot } => write!(f, "L{}", slot),
            Var::Frame { depth, slot } => write!(f, "L{}^{}", slot, depth),
            Var::Global(slot) => write!(f, "G{}", slot),
        }
    }
}

/// A constant pushed onto the operand stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Real(f64),
    Char(char),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(x) => write!(f, "{:.6}", x),
            Value::Char(c) => write!(f, "#{}", *c as u32),
            Value::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}
