#[cfg(test)]
mod test;

use crate::alloc::AddressSpace;
use crate::dep_sort::resolve_order;
use crate::error::AddressSpaceKind;
use crate::error::LinkError;
use crate::error::SymbolKind;
use crate::options::LinkOptions;
use crate::program::EntryPoint;
use crate::program::FunctionSymbol;
use crate::program::GlobalVar;
use crate::program::LinkedProgram;
use crate::program::UnitMap;
use crate::program::VariableSymbol;
use linked_hash_map::LinkedHashMap;
use log::debug;
use log::info;
use log::trace;
use log::warn;
use unit_ir::Callee;
use unit_ir::CompiledUnit;
use unit_ir::Instruction;
use unit_ir::Section;
use unit_ir::Target;
use unit_ir::Var;

/// Links `program` and the units it uses into a single program.
///
/// Units are laid out in dependency order with the program last. Each unit's body,
/// initialization and finalization blocks are placed one after the other, and a `Return` is
/// appended to the initialization and finalization blocks. Either the whole program links or
/// an error is returned.
pub fn link(
    units: Vec<CompiledUnit>,
    program: CompiledUnit,
    opts: &LinkOptions,
) -> Result<LinkedProgram, LinkError> {
    let order = resolve_order(&units, &program, opts.strip_unused)?;

    if log::log_enabled!(log::Level::Debug) {
        let names: Vec<_> = order.iter().map(|i| units[*i].name()).collect();
        debug!("link order: {} then {}", names.join(", "), program.name());
    }

    let mut units: Vec<Option<CompiledUnit>> = units.into_iter().map(Some).collect();

    let mut linker = Linker::new(opts);
    for i in order {
        if let Some(unit) = units[i].take() {
            linker.link_unit(unit)?;
        }
    }

    let main = linker.link_unit(program)?;

    Ok(linker.finish(main))
}

struct Linker {
    globals: AddressSpace,
    code: AddressSpace,

    instructions: Vec<Instruction>,
    global_vars: Vec<GlobalVar>,

    init_order: Vec<EntryPoint>,
    fini_order: Vec<EntryPoint>,

    units: LinkedHashMap<String, UnitMap>,
}

impl Linker {
    fn new(opts: &LinkOptions) -> Self {
        Self {
            globals: AddressSpace::new(AddressSpaceKind::Globals, opts.max_globals),
            code: AddressSpace::new(AddressSpaceKind::Code, opts.max_instructions),

            instructions: Vec::new(),
            global_vars: Vec::new(),

            init_order: Vec::new(),
            fini_order: Vec::new(),

            units: LinkedHashMap::new(),
        }
    }

    // returns the address of the unit's initialization block
    fn link_unit(&mut self, unit: CompiledUnit) -> Result<usize, LinkError> {
        let name = unit.name().to_string();

        let globals = self.globals.reserve(&name, unit.variable_count())?;

        // each init and final block gets a trailing return
        let body_len = unit.body().len();
        let init_len = unit.init().len() + 1;
        let fini_len = unit.finalization().len() + 1;

        let code = self
            .code
            .reserve(&name, body_len.saturating_add(init_len).saturating_add(fini_len))?;

        let body = code.start..code.start + body_len;
        let init = body.end;
        let fini = init + init_len;

        debug!(
            "linking {} {}: globals {}..{}, code {}..{}",
            unit.kind(),
            name,
            globals.start,
            globals.end,
            code.start,
            code.end
        );

        let mut functions = LinkedHashMap::new();
        for (func_name, decl) in unit.functions() {
            if decl.entry >= body_len {
                return Err(LinkError::InvalidEntry {
                    unit: name,
                    function: func_name.to_string(),
                    entry: decl.entry,
                    len: body_len,
                    span: decl.span.clone(),
                });
            }

            let func = FunctionSymbol {
                address: body.start + decl.entry,
                visibility: decl.visibility,
                sig: decl.sig.clone(),
                depth: decl.depth,
                locals: decl.locals,
            };
            functions.insert(func_name.to_string(), func);
        }

        let mut variables = LinkedHashMap::new();
        for (var_name, var) in unit.variables() {
            let symbol = VariableSymbol {
                global: globals.start + var.slot,
                visibility: var.visibility,
            };
            variables.insert(var_name.to_string(), symbol);
        }

        let mut map = UnitMap {
            kind: unit.kind(),
            globals,
            body,
            init,
            fini,
            end: code.end,
            functions,
            variables,
            types: Default::default(),
        };

        let linked = Relocation {
            unit: &unit,
            map: &map,
            linked: &self.units,
        }
        .relocate_all()?;

        // slots are assigned in declaration order so the table is already sorted by slot
        for (var_name, _) in unit.variables() {
            self.global_vars.push(GlobalVar {
                unit: name.clone(),
                name: var_name.to_string(),
            });
        }

        self.instructions.extend(linked);

        self.init_order.push(EntryPoint {
            unit: name.clone(),
            address: init,
        });
        self.fini_order.push(EntryPoint {
            unit: name.clone(),
            address: fini,
        });

        map.types = unit.into_types();
        self.units.insert(name, map);

        Ok(init)
    }

    fn finish(self, main: usize) -> LinkedProgram {
        let final_order: Vec<_> = self.fini_order.into_iter().rev().collect();

        info!(
            "linked {} units: {} instructions, {} globals",
            self.units.len(),
            self.instructions.len(),
            self.global_vars.len()
        );

        LinkedProgram {
            instructions: self.instructions,
            globals: self.global_vars,
            init_order: self.init_order,
            final_order,
            main,
            units: self.units,
        }
    }
}

// rewrites one unit's instructions, given where the unit and everything linked before it ended up
struct Relocation<'a> {
    unit: &'a CompiledUnit,
    map: &'a UnitMap,
    linked: &'a LinkedHashMap<String, UnitMap>,
}

impl<'a> Relocation<'a> {
    fn relocate_all(&self) -> Result<Vec<Instruction>, LinkError> {
        let mut result = Vec::with_capacity(self.map.end - self.map.body.start);

        for section in [Section::Body, Section::Init, Section::Final] {
            for instruction in self.unit.instructions(section) {
                result.push(self.relocate(section, instruction)?);
            }

            if section != Section::Body {
                result.push(Instruction::Return);
            }
        }

        Ok(result)
    }

    fn relocate(&self, section: Section, instruction: &Instruction) -> Result<Instruction, LinkError> {
        let linked = match instruction {
            Instruction::Load(var) => Instruction::Load(self.resolve_var(var)?),
            Instruction::Store(var) => Instruction::Store(self.resolve_var(var)?),
            Instruction::AddrOf(var) => Instruction::AddrOf(self.resolve_var(var)?),

            Instruction::Jump(target) => Instruction::Jump(self.resolve_target(section, target)?),
            Instruction::JumpIf(target) => Instruction::JumpIf(self.resolve_target(section, target)?),
            Instruction::JumpIfNot(target) => {
                Instruction::JumpIfNot(self.resolve_target(section, target)?)
            }

            Instruction::Call { callee, arg_count } => Instruction::Call {
                callee: self.resolve_callee(callee)?,
                arg_count: *arg_count,
            },

            other => other.clone(),
        };

        Ok(linked)
    }

    fn section_base(&self, section: Section) -> usize {
        match section {
            Section::Body => self.map.body.start,
            Section::Init => self.map.init,
            Section::Final => self.map.fini,
        }
    }

    fn resolve_var(&self, var: &Var) -> Result<Var, LinkError> {
        let global = match var {
            Var::Slot(slot) => {
                let count = self.unit.variable_count();
                if *slot >= count {
                    return Err(LinkError::SlotOutOfRange {
                        unit: self.unit.name().to_string(),
                        slot: *slot,
                        count,
                    });
                }

                self.map.globals.start + slot
            }

            Var::Named(name) => match self.map.variables.get(name) {
                Some(var) => var.global,
                None => self.find_export(name, SymbolKind::Variable, |unit| {
                    unit.exported_variable(name).map(|var| var.global)
                })?,
            },

            Var::Qualified { unit, name } if unit == self.unit.name() => {
                match self.map.variables.get(name) {
                    Some(var) => var.global,
                    None => return Err(self.unresolved(format!("{}.{}", unit, name), SymbolKind::Variable)),
                }
            }

            Var::Qualified { unit, name } => {
                self.find_qualified(unit, name, SymbolKind::Variable, |used| {
                    used.exported_variable(name).map(|var| var.global)
                })?
            }

            Var::Frame { .. } => return Ok(var.clone()),

            Var::Global(..) => {
                warn!("{} contains an already linked variable reference {}", self.unit.name(), var);
                return Ok(var.clone());
            }
        };

        trace!("{}: variable {} -> G{}", self.unit.name(), var, global);
        Ok(Var::Global(global))
    }

    fn resolve_target(&self, section: Section, target: &Target) -> Result<Target, LinkError> {
        let (section, offset) = match target {
            Target::Label(label) => match self.unit.label(label) {
                Some(at) => (at.section, at.offset),
                None => {
                    return Err(LinkError::UndefinedLabel {
                        unit: self.unit.name().to_string(),
                        label: label.clone(),
                    });
                }
            },

            Target::Offset(offset) => (section, *offset),

            Target::Address(..) => {
                warn!("{} contains an already linked jump target {}", self.unit.name(), target);
                return Ok(target.clone());
            }
        };

        // init and final blocks end in an appended return, which their end offset refers to. The
        // body has nothing after it except the unit's init block.
        let len = self.unit.instructions(section).len();
        let past_end = match section {
            Section::Body => offset >= len,
            Section::Init | Section::Final => offset > len,
        };
        if past_end {
            return Err(LinkError::InvalidOffset {
                unit: self.unit.name().to_string(),
                section,
                offset,
                len,
            });
        }

        Ok(Target::Address(self.section_base(section) + offset))
    }

    fn resolve_callee(&self, callee: &Callee) -> Result<Callee, LinkError> {
        let address = match callee {
            Callee::Function(name) => match self.map.functions.get(name) {
                Some(func) => func.address,
                None => self.find_export(name, SymbolKind::Function, |unit| {
                    unit.exported_function(name).map(|func| func.address)
                })?,
            },

            Callee::Qualified { unit, name } if unit == self.unit.name() => {
                match self.map.functions.get(name) {
                    Some(func) => func.address,
                    None => return Err(self.unresolved(format!("{}.{}", unit, name), SymbolKind::Function)),
                }
            }

            Callee::Qualified { unit, name } => {
                self.find_qualified(unit, name, SymbolKind::Function, |used| {
                    used.exported_function(name).map(|func| func.address)
                })?
            }

            Callee::Address(..) => {
                warn!("{} contains an already linked call target {}", self.unit.name(), callee);
                return Ok(callee.clone());
            }
        };

        trace!("{}: function {} -> @{}", self.unit.name(), callee, address);
        Ok(Callee::Address(address))
    }

    // unqualified names are looked up in the interface of every unit in the uses clause, and
    // must be exported by exactly one of them
    fn find_export(
        &self,
        name: &str,
        kind: SymbolKind,
        lookup: impl Fn(&UnitMap) -> Option<usize>,
    ) -> Result<usize, LinkError> {
        let mut found = Vec::new();
        for used in self.unit.used_units() {
            if let Some(result) = self.linked.get(used).and_then(&lookup) {
                found.push((used, result));
            }
        }

        if found.len() > 1 {
            return Err(LinkError::DuplicateExport {
                unit: self.unit.name().to_string(),
                symbol: name.to_string(),
                kind,
                exporters: found.iter().map(|(used, _)| used.to_string()).collect(),
            });
        }

        match found.pop() {
            Some((_, result)) => Ok(result),
            None => Err(self.unresolved(name.to_string(), kind)),
        }
    }

    fn find_qualified(
        &self,
        unit_name: &str,
        name: &str,
        kind: SymbolKind,
        lookup: impl Fn(&UnitMap) -> Option<usize>,
    ) -> Result<usize, LinkError> {
        if !self.unit.uses(unit_name) {
            return Err(LinkError::UnitNotUsed {
                unit: self.unit.name().to_string(),
                used_unit: unit_name.to_string(),
                symbol: name.to_string(),
            });
        }

        self.linked
            .get(unit_name)
            .and_then(lookup)
            .ok_or_else(|| self.unresolved(format!("{}.{}", unit_name, name), kind))
    }

    fn unresolved(&self, symbol: String, kind: SymbolKind) -> LinkError {
        LinkError::UnresolvedSymbol {
            unit: self.unit.name().to_string(),
            symbol,
            kind,
        }
    }
}
