#[cfg(test)]
mod test;

use crate::error::UnitError;
use crate::function::FunctionDecl;
use crate::function::Visibility;
use crate::instruction::Instruction;
use crate::ty::ArrayInfo;
use crate::ty::EnumType;
use crate::ty::RecordType;
use crate::write_instruction_list;
use crate::RawInstructionFormatter;
use common::span::Span;
use linked_hash_map::LinkedHashMap;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Unit,
    Program,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnitKind::Unit => write!(f, "unit"),
            UnitKind::Program => write!(f, "program"),
        }
    }
}

/// One of the three instruction streams of a unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub enum Section {
    /// code of the unit's functions and procedures
    #[default]
    Body,
    /// the `initialization` block, or the main block of a program
    Init,
    /// the `finalization` block
    Final,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Section::Body => write!(f, "body"),
            Section::Init => write!(f, "initialization"),
            Section::Final => write!(f, "finalization"),
        }
    }
}

/// A position in one of a unit's instruction streams, before linking.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CodeOffset {
    pub section: Section,
    pub offset: usize,
}

impl fmt::Display for CodeOffset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}+{}", self.section, self.offset)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct UsesDecl {
    /// location of the unit name in the uses clause
    pub span: Option<Span>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub slot: usize,
    pub visibility: Visibility,
}

/// Enum, array and record types declared by a unit. Not touched by linking, the tables are passed
/// through to the linked program for runtime type checks.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeTables {
    pub enums: LinkedHashMap<String, EnumType>,
    pub arrays: LinkedHashMap<String, ArrayInfo>,
    pub records: LinkedHashMap<String, RecordType>,
}

impl TypeTables {
    pub fn contains(&self, name: &str) -> bool {
        self.enums.contains_key(name)
            || self.arrays.contains_key(name)
            || self.records.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty() && self.arrays.is_empty() && self.records.is_empty()
    }
}

/// A separately compiled unit or program as produced by the front end.
///
/// Declaration tables can only grow, and only through methods that keep them consistent: slots
/// are assigned in declaration order and never change, labels and functions can't be redefined.
/// All code offsets stored here are local to the unit until it's linked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledUnit {
    name: String,
    kind: UnitKind,
    span: Option<Span>,

    uses: LinkedHashMap<String, UsesDecl>,

    variables: LinkedHashMap<String, Variable>,
    labels: LinkedHashMap<String, CodeOffset>,
    functions: LinkedHashMap<String, FunctionDecl>,
    types: TypeTables,

    body: Vec<Instruction>,
    init: Vec<Instruction>,
    fini: Vec<Instruction>,

    #[serde(skip)]
    section: Section,
}

impl CompiledUnit {
    pub fn new(name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            name: name.into(),
            kind,
            span: None,

            uses: LinkedHashMap::new(),

            variables: LinkedHashMap::new(),
            labels: LinkedHashMap::new(),
            functions: LinkedHashMap::new(),
            types: TypeTables::default(),

            body: Vec::new(),
            init: Vec::new(),
            fini: Vec::new(),

            section: Section::Body,
        }
    }

    pub fn unit(name: impl Into<String>) -> Self {
        Self::new(name, UnitKind::Unit)
    }

    pub fn program(name: impl Into<String>) -> Self {
        Self::new(name, UnitKind::Program)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    /// Adds a unit to the uses clause. Returns false if it was already listed.
    pub fn add_used_unit(&mut self, name: impl Into<String>) -> bool {
        self.add_used_unit_decl(name, UsesDecl::default())
    }

    pub fn add_used_unit_at(&mut self, name: impl Into<String>, span: Span) -> bool {
        self.add_used_unit_decl(name, UsesDecl { span: Some(span) })
    }

    fn add_used_unit_decl(&mut self, name: impl Into<String>, decl: UsesDecl) -> bool {
        let name = name.into();
        if self.uses.contains_key(&name) {
            return false;
        }

        self.uses.insert(name, decl);
        true
    }

    pub fn used_units(&self) -> impl Iterator<Item = &str> + '_ {
        self.uses.keys().map(String::as_str)
    }

    pub fn uses(&self, unit_name: &str) -> bool {
        self.uses.contains_key(unit_name)
    }

    pub fn uses_span(&self, unit_name: &str) -> Option<&Span> {
        self.uses.get(unit_name)?.span.as_ref()
    }

    /// Registers an implementation-section variable and returns its slot. Declaring the same name
    /// again returns the existing slot.
    pub fn add_variable(&mut self, name: impl Into<String>) -> usize {
        self.declare_variable(name.into(), Visibility::Implementation)
    }

    /// Registers an interface-section variable, visible to units that use this one, and returns
    /// its slot. An existing variable of the same name keeps its slot and becomes exported.
    pub fn add_interface_variable(&mut self, name: impl Into<String>) -> usize {
        self.declare_variable(name.into(), Visibility::Interface)
    }

    fn declare_variable(&mut self, name: String, visibility: Visibility) -> usize {
        let next_slot = self.variables.len();

        let var = self.variables.entry(name).or_insert(Variable {
            slot: next_slot,
            visibility,
        });

        if visibility.is_exported() {
            var.visibility = Visibility::Interface;
        }

        var.slot
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.get(name).map(|var| var.slot)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> + '_ {
        self.variables.iter().map(|(name, var)| (name.as_str(), var))
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Selects the stream that [Self::emit], [Self::define_label] and [Self::current_offset]
    /// operate on.
    pub fn begin_section(&mut self, section: Section) {
        self.section = section;
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn current_offset(&self) -> usize {
        self.instructions(self.section).len()
    }

    /// Appends to the active stream and returns the offset of the new instruction.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.emit_to(self.section, instruction)
    }

    pub fn emit_finalization(&mut self, instruction: Instruction) -> usize {
        self.emit_to(Section::Final, instruction)
    }

    pub fn emit_to(&mut self, section: Section, instruction: Instruction) -> usize {
        let stream = self.instructions_mut(section);
        stream.push(instruction);
        stream.len() - 1
    }

    /// Defines a label at the end of the active stream.
    pub fn define_label(&mut self, name: impl Into<String>) -> Result<CodeOffset, UnitError> {
        let name = name.into();

        if let Some(existing) = self.labels.get(&name) {
            return Err(UnitError::DuplicateLabel {
                unit: self.name.clone(),
                label: name,
                existing: *existing,
            });
        }

        let at = CodeOffset {
            section: self.section,
            offset: self.current_offset(),
        };
        self.labels.insert(name, at);

        Ok(at)
    }

    pub fn label(&self, name: &str) -> Option<CodeOffset> {
        self.labels.get(name).copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, CodeOffset)> + '_ {
        self.labels.iter().map(|(name, at)| (name.as_str(), *at))
    }

    /// Declares a function whose code starts at the current end of the body stream.
    pub fn begin_function(
        &mut self,
        name: impl Into<String>,
        decl: FunctionDecl,
    ) -> Result<&FunctionDecl, UnitError> {
        let entry = self.body.len();
        self.declare_function(name, FunctionDecl { entry, ..decl })
    }

    /// Declares a function with the entry offset already set in `decl`.
    pub fn declare_function(
        &mut self,
        name: impl Into<String>,
        decl: FunctionDecl,
    ) -> Result<&FunctionDecl, UnitError> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(UnitError::DuplicateFunction {
                unit: self.name.clone(),
                name,
            });
        }

        self.functions.insert(name.clone(), decl);
        Ok(&self.functions[&name])
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &FunctionDecl)> + '_ {
        self.functions.iter().map(|(name, decl)| (name.as_str(), decl))
    }

    pub fn exported_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.function(name).filter(|decl| decl.is_exported())
    }

    pub fn add_enum_type(&mut self, name: impl Into<String>, ty: EnumType) -> Result<(), UnitError> {
        let name = self.check_type_name(name.into())?;
        self.types.enums.insert(name, ty);
        Ok(())
    }

    pub fn add_array_type(&mut self, name: impl Into<String>, ty: ArrayInfo) -> Result<(), UnitError> {
        let name = self.check_type_name(name.into())?;
        self.types.arrays.insert(name, ty);
        Ok(())
    }

    pub fn add_record_type(&mut self, name: impl Into<String>, ty: RecordType) -> Result<(), UnitError> {
        let name = self.check_type_name(name.into())?;
        self.types.records.insert(name, ty);
        Ok(())
    }

    fn check_type_name(&self, name: String) -> Result<String, UnitError> {
        if self.types.contains(&name) {
            return Err(UnitError::DuplicateType {
                unit: self.name.clone(),
                name,
            });
        }

        Ok(name)
    }

    pub fn types(&self) -> &TypeTables {
        &self.types
    }

    pub fn into_types(self) -> TypeTables {
        self.types
    }

    pub fn instructions(&self, section: Section) -> &[Instruction] {
        match section {
            Section::Body => &self.body,
            Section::Init => &self.init,
            Section::Final => &self.fini,
        }
    }

    fn instructions_mut(&mut self, section: Section) -> &mut Vec<Instruction> {
        match section {
            Section::Body => &mut self.body,
            Section::Init => &mut self.init,
            Section::Final => &mut self.fini,
        }
    }

    pub fn body(&self) -> &[Instruction] {
        &self.body
    }

    pub fn init(&self) -> &[Instruction] {
        &self.init
    }

    pub fn finalization(&self) -> &[Instruction] {
        &self.fini
    }
}

impl fmt::Display for CompiledUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} {}", self.kind, self.name)?;

        if !self.uses.is_empty() {
            let uses: Vec<_> = self.used_units().collect();
            writeln!(f, "uses {}", uses.join(", "))?;
        }
        writeln!(f)?;

        writeln!(f, "* Variables")?;
        for (name, var) in &self.variables {
            writeln!(f, "{}: {} ({})", var.slot, name, var.visibility)?;
        }
        writeln!(f)?;

        writeln!(f, "* Types")?;
        for (name, ty) in &self.types.enums {
            writeln!(f, "{} = {}", name, ty)?;
        }
        for (name, ty) in &self.types.arrays {
            writeln!(f, "{} = {}", name, ty)?;
        }
        for (name, ty) in &self.types.records {
            writeln!(f, "{} = {}", name, ty)?;
        }
        writeln!(f)?;

        writeln!(f, "* Functions")?;
        for (name, decl) in &self.functions {
            writeln!(f, "{}: {} {} @ {}", decl.visibility, name, decl.sig, decl.entry)?;
        }
        writeln!(f)?;

        writeln!(f, "* Labels")?;
        for (name, at) in &self.labels {
            writeln!(f, "{}: {}", name, at)?;
        }
        writeln!(f)?;

        for section in [Section::Body, Section::Init, Section::Final] {
            writeln!(f, "* {}:", section)?;
            write_instruction_list(f, &RawInstructionFormatter, self.instructions(section), 0)?;
            writeln!(f)?;
        }

        Ok(())
    }
}
