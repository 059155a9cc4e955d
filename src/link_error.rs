use common::span::Span;
use common::DiagnosticMessage;
use common::DiagnosticOutput;
use linker::LinkError;
use std::path::PathBuf;
use std::{fmt, io};

#[derive(Debug)]
pub enum LinkToolError {
    LinkError(LinkError),

    FileNotFound(PathBuf),
    ReadUnitFailed {
        path: PathBuf,
        msg: String,
    },
    UnexpectedUnit {
        path: PathBuf,
        expected: String,
        found: String,
    },
    DuplicateUnit {
        unit_name: String,
        new_path: PathBuf,
        existing_path: PathBuf,
    },
    OutputFailed(Span, io::Error),
    EncodeFailed(bincode::Error),
}

impl From<LinkError> for LinkToolError {
    fn from(err: LinkError) -> Self {
        LinkToolError::LinkError(err)
    }
}

impl From<bincode::Error> for LinkToolError {
    fn from(err: bincode::Error) -> Self {
        LinkToolError::EncodeFailed(err)
    }
}

impl DiagnosticOutput for LinkToolError {
    fn main(&self) -> DiagnosticMessage {
        match self {
            LinkToolError::LinkError(err) => err.main(),
            LinkToolError::FileNotFound(path) => DiagnosticMessage {
                title: format!("file not found: {}", path.display()),
                label: None,
                notes: Vec::new(),
            },
            LinkToolError::ReadUnitFailed { path, msg } => DiagnosticMessage {
                title: format!("failed to read compiled unit {}", path.display()),
                label: None,
                notes: vec![msg.clone()],
            },
            LinkToolError::UnexpectedUnit { path, expected, found } => DiagnosticMessage {
                title: format!("expected {} to contain unit `{}`", path.display(), expected),
                label: None,
                notes: vec![format!("it contains `{}`", found)],
            },
            LinkToolError::DuplicateUnit { unit_name, new_path, existing_path } => DiagnosticMessage {
                title: format!("`{}` @ {} was already loaded", unit_name, new_path.display()),
                label: None,
                notes: vec![format!("previously loaded from {}", existing_path.display())],
            },
            LinkToolError::OutputFailed(span, err) => DiagnosticMessage {
                title: format!(
                    "Writing output file `{}` failed: {}",
                    span.file.display(),
                    err
                ),
                label: None,
                notes: Vec::new(),
            },
            LinkToolError::EncodeFailed(err) => DiagnosticMessage {
                title: format!("failed to encode linked program: {}", err),
                label: None,
                notes: Vec::new(),
            },
        }
    }

    fn see_also(&self) -> Vec<DiagnosticMessage> {
        match self {
            LinkToolError::LinkError(err) => err.see_also(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for LinkToolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LinkToolError::LinkError(err) => write!(f, "{}", err),
            LinkToolError::FileNotFound(path) => write!(f, "file not found: {}", path.display()),
            LinkToolError::ReadUnitFailed { msg, .. } => write!(f, "{}", msg),
            LinkToolError::UnexpectedUnit { path, expected, .. } => {
                write!(f, "{} does not contain unit `{}`", path.display(), expected)
            }
            LinkToolError::DuplicateUnit { .. } => write!(f, "unit was already loaded"),
            LinkToolError::OutputFailed(span, err) => {
                write!(f, "writing to file {} failed: {}", span.file.display(), err)
            }
            LinkToolError::EncodeFailed(err) => write!(f, "{}", err),
        }
    }
}
