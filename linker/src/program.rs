use linked_hash_map::LinkedHashMap;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use unit_ir::write_instruction_list;
use unit_ir::Callee;
use unit_ir::FunctionSig;
use unit_ir::Instruction;
use unit_ir::InstructionFormatter;
use unit_ir::RawInstructionFormatter;
use unit_ir::Target;
use unit_ir::TypeTables;
use unit_ir::UnitKind;
use unit_ir::Value;
use unit_ir::Var;
use unit_ir::Visibility;

/// Owner of a slot in the global variable table.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GlobalVar {
    pub unit: String,
    pub name: String,
}

impl fmt::Display for GlobalVar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.unit, self.name)
    }
}

/// A unit's initialization or finalization block in the linked program.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    pub unit: String,
    pub address: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FunctionSymbol {
    pub address: usize,
    pub visibility: Visibility,
    pub sig: FunctionSig,
    pub depth: usize,
    pub locals: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct VariableSymbol {
    pub global: usize,
    pub visibility: Visibility,
}

/// Where the linker placed one unit.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UnitMap {
    pub kind: UnitKind,

    /// slots of the unit's variables in the global table
    pub globals: Range<usize>,

    /// addresses of the unit's body
    pub body: Range<usize>,
    /// address of the initialization block (the main block, for the program)
    pub init: usize,
    /// address of the finalization block
    pub fini: usize,
    /// one past the last instruction of the unit
    pub end: usize,

    pub functions: LinkedHashMap<String, FunctionSymbol>,
    pub variables: LinkedHashMap<String, VariableSymbol>,
    pub types: TypeTables,
}

impl UnitMap {
    pub fn code(&self) -> Range<usize> {
        self.body.start..self.end
    }

    pub fn exported_function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.functions
            .get(name)
            .filter(|func| func.visibility.is_exported())
    }

    pub fn exported_variable(&self, name: &str) -> Option<&VariableSymbol> {
        self.variables
            .get(name)
            .filter(|var| var.visibility.is_exported())
    }
}

/// The result of linking: one instruction stream and one global variable table for the whole
/// program, with every address resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedProgram {
    pub instructions: Vec<Instruction>,
    pub globals: Vec<GlobalVar>,

    /// initialization blocks in dependency order, the program's main block last
    pub init_order: Vec<EntryPoint>,
    /// finalization blocks, in the reverse order of `init_order`
    pub final_order: Vec<EntryPoint>,

    /// address of the program's main block
    pub main: usize,

    pub units: LinkedHashMap<String, UnitMap>,
}

impl LinkedProgram {
    pub fn unit(&self, name: &str) -> Option<&UnitMap> {
        self.units.get(name)
    }

    pub fn function_address(&self, unit: &str, name: &str) -> Option<usize> {
        let func = self.unit(unit)?.functions.get(name)?;
        Some(func.address)
    }

    pub fn global_slot(&self, unit: &str, name: &str) -> Option<usize> {
        let var = self.unit(unit)?.variables.get(name)?;
        Some(var.global)
    }

    /// True if no instruction refers to anything by name or unit-local position.
    pub fn is_fully_linked(&self) -> bool {
        self.instructions.iter().all(Instruction::is_linked)
    }

    /// Displays the placement of every unit and symbol instead of the instruction listing.
    pub fn link_map(&self) -> LinkMap<'_> {
        LinkMap(self)
    }
}

impl fmt::Display for LinkedProgram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let formatter = ProgramFormatter::new(self);

        writeln!(f, "* Globals")?;
        for (slot, global) in self.globals.iter().enumerate() {
            writeln!(f, "{}: {}", slot, global)?;
        }
        writeln!(f)?;

        for (name, unit) in &self.units {
            let sections = [
                ("body", unit.body.clone()),
                ("initialization", unit.init..unit.fini),
                ("finalization", unit.fini..unit.end),
            ];

            for (section, range) in sections {
                if range.is_empty() {
                    continue;
                }

                writeln!(f, "* {} {} {}:", unit.kind, name, section)?;
                write_instruction_list(f, &formatter, &self.instructions[range.clone()], range.start)?;
                writeln!(f)?;
            }
        }

        writeln!(f, "main: @{}", self.main)
    }
}

pub struct LinkMap<'a>(&'a LinkedProgram);

impl<'a> fmt::Display for LinkMap<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let program = self.0;

        for (name, unit) in &program.units {
            writeln!(f, "{} {}", unit.kind, name)?;
            writeln!(f, "  globals  {}..{}", unit.globals.start, unit.globals.end)?;
            writeln!(f, "  code     {}..{}", unit.body.start, unit.end)?;
            writeln!(f, "  init     @{}", unit.init)?;
            writeln!(f, "  final    @{}", unit.fini)?;

            for (func_name, func) in &unit.functions {
                writeln!(f, "  @{:<6} {} {}", func.address, func_name, func.sig)?;
            }
            for (var_name, var) in &unit.variables {
                writeln!(f, "  G{:<6} {} ({})", var.global, var_name, var.visibility)?;
            }
            writeln!(f)?;
        }

        let init: Vec<_> = program.init_order.iter().map(|entry| entry.unit.as_str()).collect();
        writeln!(f, "init order: {}", init.join(", "))?;

        let fini: Vec<_> = program.final_order.iter().map(|entry| entry.unit.as_str()).collect();
        writeln!(f, "final order: {}", fini.join(", "))
    }
}

/// Formats a linked program's instructions with the names of the globals and functions
/// that their addresses refer to.
pub struct ProgramFormatter<'a> {
    globals: &'a [GlobalVar],
    functions: HashMap<usize, (&'a str, &'a str)>,
}

impl<'a> ProgramFormatter<'a> {
    pub fn new(program: &'a LinkedProgram) -> Self {
        let functions = program
            .units
            .iter()
            .flat_map(|(unit_name, unit)| {
                unit.functions
                    .iter()
                    .map(move |(name, func)| (func.address, (unit_name.as_str(), name.as_str())))
            })
            .collect();

        Self {
            globals: &program.globals,
            functions,
        }
    }
}

impl<'a> InstructionFormatter for ProgramFormatter<'a> {
    fn format_val(&self, val: &Value, f: &mut dyn fmt::Write) -> fmt::Result {
        RawInstructionFormatter.format_val(val, f)
    }

    fn format_var(&self, var: &Var, f: &mut dyn fmt::Write) -> fmt::Result {
        match var {
            Var::Global(slot) => match self.globals.get(*slot) {
                Some(global) => write!(f, "G{} ({})", slot, global),
                None => write!(f, "G{}", slot),
            },
            _ => RawInstructionFormatter.format_var(var, f),
        }
    }

    fn format_target(&self, target: &Target, f: &mut dyn fmt::Write) -> fmt::Result {
        RawInstructionFormatter.format_target(target, f)
    }

    fn format_callee(&self, callee: &Callee, f: &mut dyn fmt::Write) -> fmt::Result {
        match callee {
            Callee::Address(addr) => match self.functions.get(addr) {
                Some((unit, name)) => write!(f, "@{} ({}.{})", addr, unit, name),
                None => write!(f, "@{}", addr),
            },
            _ => RawInstructionFormatter.format_callee(callee, f),
        }
    }
}
