use crate::unit::CodeOffset;
use common::DiagnosticMessage;
use common::DiagnosticOutput;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("label `{label}` is already defined in `{unit}`")]
    DuplicateLabel {
        unit: String,
        label: String,
        existing: CodeOffset,
    },

    #[error("function `{name}` is already declared in `{unit}`")]
    DuplicateFunction { unit: String, name: String },

    #[error("type `{name}` is already declared in `{unit}`")]
    DuplicateType { unit: String, name: String },
}

impl DiagnosticOutput for UnitError {
    fn main(&self) -> DiagnosticMessage {
        let msg = DiagnosticMessage::new(self.to_string());

        match self {
            UnitError::DuplicateLabel { existing, .. } => {
                msg.with_note(format!("previous definition is at {}", existing))
            }

            _ => msg,
        }
    }
}
