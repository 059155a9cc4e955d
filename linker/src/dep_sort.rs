
use crate::error::LinkError;
use linked_hash_map::LinkedHashMap;
use log::debug;
use std::collections::HashSet;
use unit_ir::CompiledUnit;
use unit_ir::UnitKind;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

struct DependencySort<'a> {
    units: &'a [CompiledUnit],
    by_name: LinkedHashMap<&'a str, usize>,

    marks: Vec<Mark>,
    path: Vec<usize>,
    order: Vec<usize>,
}

/// Orders `units` so that every unit comes after all the units it uses, and returns their indices
/// in that order. The program isn't part of the result, it's always linked last.
///
/// Roots are visited in the order the units were supplied and the units in a uses clause in
/// the order they're listed, so the same input always produces the same order. With
/// `strip_unused`, units the program can't reach through uses clauses are left out.
pub fn resolve_order(
    units: &[CompiledUnit],
    program: &CompiledUnit,
    strip_unused: bool,
) -> Result<Vec<usize>, LinkError> {
    if program.kind() != UnitKind::Program {
        return Err(LinkError::NotAProgram {
            name: program.name().to_string(),
        });
    }

    let by_name = index_units(units, program)?;

    // missing dependencies of the program itself are reported before anything else
    for used in program.used_units() {
        if !by_name.contains_key(used) {
            return Err(LinkError::UnresolvedUnit {
                unit: used.to_string(),
                used_by: program.name().to_string(),
                span: program.uses_span(used).cloned(),
            });
        }
    }

    let roots: Vec<usize> = if strip_unused {
        let reachable = reachable_from(program, units, &by_name);
        (0..units.len()).filter(|i| reachable.contains(i)).collect()
    } else {
        (0..units.len()).collect()
    };

    let mut sort = DependencySort {
        units,
        by_name,
        marks: vec![Mark::Unvisited; units.len()],
        path: Vec::new(),
        order: Vec::with_capacity(roots.len()),
    };

    for root in roots {
        if sort.marks[root] == Mark::Unvisited {
            sort.visit(root)?;
        }
    }

    Ok(sort.order)
}

fn index_units<'a>(
    units: &'a [CompiledUnit],
    program: &CompiledUnit,
) -> Result<LinkedHashMap<&'a str, usize>, LinkError> {
    let mut by_name = LinkedHashMap::new();

    for (i, unit) in units.iter().enumerate() {
        if unit.kind() == UnitKind::Program {
            return Err(LinkError::UnexpectedProgram {
                name: unit.name().to_string(),
                program: program.name().to_string(),
                span: unit.span().cloned(),
            });
        }

        if unit.name() == program.name() || by_name.contains_key(unit.name()) {
            return Err(LinkError::DuplicateUnit {
                name: unit.name().to_string(),
                span: unit.span().cloned(),
            });
        }

        by_name.insert(unit.name(), i);
    }

    Ok(by_name)
}

// missing names are skipped here, they're reported by the sort if a linked unit refers to them
fn reachable_from(
    program: &CompiledUnit,
    units: &[CompiledUnit],
    by_name: &LinkedHashMap<&str, usize>,
) -> HashSet<usize> {
    let mut reachable = HashSet::new();
    let mut pending: Vec<usize> = program
        .used_units()
        .filter_map(|used| by_name.get(used).copied())
        .collect();

    while let Some(i) = pending.pop() {
        if !reachable.insert(i) {
            continue;
        }

        let deps = units[i]
            .used_units()
            .filter_map(|used| by_name.get(used).copied());
        pending.extend(deps);
    }

    for (i, unit) in units.iter().enumerate() {
        if !reachable.contains(&i) {
            debug!("unit {} is not used by {}, leaving it out", unit.name(), program.name());
        }
    }

    reachable
}

impl<'a> DependencySort<'a> {
    // each frame is a unit on the current path and the position in its uses clause to continue from
    fn visit(&mut self, root: usize) -> Result<(), LinkError> {
        let units = self.units;

        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        self.marks[root] = Mark::InProgress;
        self.path.push(root);

        while let Some(frame) = frames.last_mut() {
            let (i, next) = *frame;
            let unit = &units[i];

            let used = match unit.used_units().nth(next) {
                Some(used) => used,
                None => {
                    frames.pop();
                    self.path.pop();
                    self.marks[i] = Mark::Done;
                    self.order.push(i);
                    continue;
                }
            };
            frame.1 += 1;

            let dep = match self.by_name.get(used) {
                Some(dep) => *dep,
                None => {
                    return Err(LinkError::UnresolvedUnit {
                        unit: used.to_string(),
                        used_by: unit.name().to_string(),
                        span: unit.uses_span(used).cloned(),
                    });
                }
            };

            match self.marks[dep] {
                Mark::Done => {}
                Mark::Unvisited => {
                    self.marks[dep] = Mark::InProgress;
                    self.path.push(dep);
                    frames.push((dep, 0));
                }
                Mark::InProgress => {
                    return Err(LinkError::CyclicDependency {
                        cycle: self.cycle_to(dep),
                        span: unit.uses_span(used).cloned(),
                    });
                }
            }
        }

        Ok(())
    }

    // the current path from `dep` to the end, back to `dep`
    fn cycle_to(&self, dep: usize) -> Vec<String> {
        let start = self
            .path
            .iter()
            .position(|i| *i == dep)
            .unwrap_or(0);

        self.path[start..]
            .iter()
            .chain(Some(&dep))
            .map(|i| self.units[*i].name().to_string())
            .collect()
    }
}
