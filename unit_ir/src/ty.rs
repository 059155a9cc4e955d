use serde::Deserialize;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct EnumType {
    /// value names in ordinal order, starting from 0
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|value| value == name)
    }

    pub fn high(&self) -> Option<usize> {
        self.values.len().checked_sub(1)
    }
}

impl fmt::Display for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({})", self.values.join(", "))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct IndexRange {
    pub low: i64,
    pub high: i64,
}

impl IndexRange {
    pub fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }

    pub fn len(&self) -> usize {
        if self.high < self.low {
            0
        } else {
            (self.high - self.low) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: i64) -> bool {
        index >= self.low && index <= self.high
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}..{}", self.low, self.high)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ArrayInfo {
    /// one range per dimension
    pub dims: Vec<IndexRange>,
    pub element_ty: String,
}

impl ArrayInfo {
    pub fn new(dims: impl IntoIterator<Item = IndexRange>, element_ty: impl Into<String>) -> Self {
        Self {
            dims: dims.into_iter().collect(),
            element_ty: element_ty.into(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.dims.iter().map(IndexRange::len).product()
    }
}

impl fmt::Display for ArrayInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "array[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "] of {}", self.element_ty)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RecordType {
    /// fields in declaration order; field instructions refer to them by position
    pub fields: Vec<RecordField>,
}

impl RecordType {
    pub fn new<Name, Ty>(fields: impl IntoIterator<Item = (Name, Ty)>) -> Self
    where
        Name: Into<String>,
        Ty: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, ty)| RecordField {
                    name: name.into(),
                    ty: ty.into(),
                })
                .collect(),
        }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "record")?;
        for field in &self.fields {
            write!(f, " {}: {};", field.name, field.ty)?;
        }
        write!(f, " end")
    }
}
