use common::span::Span;
use common::DiagnosticMessage;
use common::DiagnosticOutput;
use std::fmt;
use unit_ir::Section;
use unit_ir::UnitError;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SymbolKind {
    Function,
    Variable,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolKind::Function => write!(f, "function"),
            SymbolKind::Variable => write!(f, "variable"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AddressSpaceKind {
    Globals,
    Code,
}

impl fmt::Display for AddressSpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressSpaceKind::Globals => write!(f, "global variable"),
            AddressSpaceKind::Code => write!(f, "instruction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error("unit `{name}` was supplied more than once")]
    DuplicateUnit { name: String, span: Option<Span> },

    #[error("`{name}` is a program and can't be linked into program `{program}`")]
    UnexpectedProgram {
        name: String,
        program: String,
        span: Option<Span>,
    },

    #[error("`{name}` is a unit, not a program")]
    NotAProgram { name: String },

    #[error("unit `{unit}` used by `{used_by}` was not found")]
    UnresolvedUnit {
        unit: String,
        used_by: String,
        span: Option<Span>,
    },

    #[error("circular unit reference: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// unit names in the order the references were followed. The first unit is repeated
        /// at the end.
        cycle: Vec<String>,
        span: Option<Span>,
    },

    #[error("{kind} `{symbol}` referenced from `{unit}` was not found")]
    UnresolvedSymbol {
        unit: String,
        symbol: String,
        kind: SymbolKind,
    },

    #[error("`{unit}` refers to `{used_unit}.{symbol}` but doesn't use `{used_unit}`")]
    UnitNotUsed {
        unit: String,
        used_unit: String,
        symbol: String,
    },

    #[error("{kind} `{symbol}` referenced from `{unit}` is ambiguous, it's exported by {}", .exporters.join(" and "))]
    DuplicateExport {
        unit: String,
        symbol: String,
        kind: SymbolKind,
        exporters: Vec<String>,
    },

    #[error("label `{label}` used in `{unit}` is not defined")]
    UndefinedLabel { unit: String, label: String },

    #[error("jump offset {offset} in the {section} of `{unit}` is past the end of the section ({len} instructions)")]
    InvalidOffset {
        unit: String,
        section: Section,
        offset: usize,
        len: usize,
    },

    #[error("entry offset {entry} of function `{function}` in `{unit}` is past the end of the body ({len} instructions)")]
    InvalidEntry {
        unit: String,
        function: String,
        entry: usize,
        len: usize,
        span: Option<Span>,
    },

    #[error("variable slot {slot} referenced in `{unit}` is out of range ({count} variables)")]
    SlotOutOfRange {
        unit: String,
        slot: usize,
        count: usize,
    },

    #[error("{space} limit of {limit} exceeded while linking `{unit}` ({used} in use, {requested} requested)")]
    AddressSpaceOverflow {
        unit: String,
        space: AddressSpaceKind,
        used: usize,
        requested: usize,
        limit: usize,
    },
}

impl DiagnosticOutput for LinkError {
    fn main(&self) -> DiagnosticMessage {
        let msg = DiagnosticMessage::new(self.to_string());

        match self {
            LinkError::Unit(err) => err.main(),

            LinkError::UnresolvedUnit { span: Some(span), .. } => {
                msg.with_label(Some("unit used here".to_string()), span.clone())
            }

            LinkError::UnresolvedUnit { unit, .. } => {
                msg.with_note(format!("`{}` must be one of the units passed to the linker", unit))
            }

            LinkError::CyclicDependency { span, .. } => match span {
                Some(span) => msg.with_label(Some("unit used here".to_string()), span.clone()),
                None => msg,
            },

            LinkError::DuplicateUnit { span: Some(span), .. } => {
                msg.with_label(Some("unit declared here".to_string()), span.clone())
            }

            LinkError::UnexpectedProgram { span: Some(span), .. } => {
                msg.with_label(Some("program declared here".to_string()), span.clone())
            }

            LinkError::InvalidEntry { span: Some(span), .. } => {
                msg.with_label(Some("function declared here".to_string()), span.clone())
            }

            LinkError::DuplicateExport { symbol, exporters, .. } => {
                let example = exporters
                    .first()
                    .map(|exporter| format!(", e.g. `{}.{}`", exporter, symbol))
                    .unwrap_or_default();

                msg.with_note(format!("qualify the reference with the unit name{}", example))
            }

            LinkError::UnitNotUsed { used_unit, .. } => {
                msg.with_note(format!("add `{}` to the uses clause", used_unit))
            }

            LinkError::AddressSpaceOverflow { .. } => {
                msg.with_note("the limit can be raised with the linker options")
            }

            _ => msg,
        }
    }
}
