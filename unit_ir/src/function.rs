use common::span::Span;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// declared in the unit's interface section, visible to units that use it
    Interface,
    /// declared in the implementation section, only visible inside the unit
    Implementation,
}

impl Visibility {
    pub fn is_exported(self) -> bool {
        self == Visibility::Interface
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Visibility::Interface => write!(f, "interface"),
            Visibility::Implementation => write!(f, "implementation"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: String,
    /// `var` parameters are passed by address
    pub by_ref: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            by_ref: false,
        }
    }

    pub fn by_ref(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            by_ref: true,
            ..Self::new(name, ty)
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FunctionSig {
    pub params: Vec<Param>,
    pub return_ty: Option<String>,
}

impl FunctionSig {
    pub fn procedure(params: impl IntoIterator<Item = Param>) -> Self {
        Self {
            params: params.into_iter().collect(),
            return_ty: None,
        }
    }

    pub fn function(params: impl IntoIterator<Item = Param>, return_ty: impl Into<String>) -> Self {
        Self {
            params: params.into_iter().collect(),
            return_ty: Some(return_ty.into()),
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for FunctionSig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.return_ty {
            Some(..) => write!(f, "function")?,
            None => write!(f, "procedure")?,
        }

        if !self.params.is_empty() {
            write!(f, "(")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, "; ")?;
                }
                if param.by_ref {
                    write!(f, "var ")?;
                }
                write!(f, "{}: {}", param.name, param.ty)?;
            }
            write!(f, ")")?;
        }

        if let Some(return_ty) = &self.return_ty {
            write!(f, ": {}", return_ty)?;
        }

        Ok(())
    }
}

/// Function table entry of a compiled unit.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub sig: FunctionSig,
    pub visibility: Visibility,

    /// offset of the first instruction of the function within the unit's body stream
    pub entry: usize,

    /// lexical nesting level: 1 for routines declared at unit scope, 2 for routines nested in
    /// those, and so on
    pub depth: usize,

    /// number of frame slots the function's activation needs, parameters included
    pub locals: usize,

    pub span: Option<Span>,
}

impl FunctionDecl {
    pub fn new(sig: FunctionSig, visibility: Visibility) -> Self {
        let locals = sig.param_count();

        Self {
            sig,
            visibility,
            entry: 0,
            depth: 1,
            locals,
            span: None,
        }
    }

    pub fn nested(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_locals(mut self, locals: usize) -> Self {
        self.locals = locals;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn is_exported(&self) -> bool {
        self.visibility.is_exported()
    }
}
