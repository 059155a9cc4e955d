use crate::link_error::LinkToolError;
use crate::Args;
use linked_hash_map::LinkedHashMap;
use log::debug;
use std::collections::HashSet;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use unit_ir::CompiledUnit;

pub const UNIT_FILE_EXT: &str = "unit";
pub const UNITS_DIR_VAR: &str = "PASCAL_UNITS";

fn find_in_paths(filename: &Path, search_paths: &[PathBuf]) -> Option<PathBuf> {
    for search_path in search_paths.iter() {
        if search_path.exists() && search_path.is_dir() {
            let file_path = search_path.join(filename);

            if file_path.exists() {
                // try to canonicalize the filename (not the rest of the path)
                let file_path_with_canon_name = file_path.canonicalize().ok()
                    .and_then(|canon_path| {
                        let canon_filename = canon_path.file_name()?;
                        Some(file_path.with_file_name(canon_filename))
                    })
                    .unwrap_or(file_path);

                return Some(file_path_with_canon_name);
            }
        }
    }

    None
}

pub fn load_unit_file(path: &Path) -> Result<CompiledUnit, LinkToolError> {
    let mut unit_bytes = Vec::new();

    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut unit_bytes))
        .map_err(|err| LinkToolError::ReadUnitFailed {
            msg: err.to_string(),
            path: path.to_path_buf(),
        })?;

    let unit: CompiledUnit = bincode::deserialize(&unit_bytes)
        .map_err(|err| LinkToolError::ReadUnitFailed {
            msg: err.to_string(),
            path: path.to_path_buf(),
        })?;

    Ok(unit)
}

/// The compiled units passed to the linker, in the order they were loaded.
pub struct UnitCollection {
    search_dirs: Vec<PathBuf>,

    units: LinkedHashMap<String, (PathBuf, CompiledUnit)>,

    // names looked up in the search dirs and not found, left for the linker to report
    missing: HashSet<String>,
}

impl UnitCollection {
    pub fn new(args: &Args) -> Self {
        let units_dir = env::var(UNITS_DIR_VAR).ok().map(PathBuf::from);
        Self::with_search_dirs(&args.search_dirs, units_dir)
    }

    fn with_search_dirs(dirs: &[PathBuf], units_dir: Option<PathBuf>) -> Self {
        let search_dirs = dirs.iter()
            .filter(|dir| dir.exists())
            .cloned()
            .chain({
                let cwd = env::current_dir().ok();

                [cwd, units_dir]
                    .into_iter()
                    .flatten()
                    .filter(|dir| dir.exists())
            })
            .collect();

        Self {
            search_dirs,
            units: LinkedHashMap::new(),
            missing: HashSet::new(),
        }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Loads a unit file given on the command line, either as a path or as a name in the search
    /// dirs.
    pub fn add(&mut self, unit_filename: &Path) -> Result<(), LinkToolError> {
        let path = if unit_filename.exists() {
            unit_filename.to_path_buf()
        } else {
            find_in_paths(unit_filename, &self.search_dirs)
                .ok_or_else(|| LinkToolError::FileNotFound(unit_filename.to_path_buf()))?
        };

        let unit = load_unit_file(&path)?;
        self.insert(path, unit)
    }

    /// Finds the units named in the uses clauses of `program` and every loaded unit that haven't
    /// been loaded yet, following the uses clauses of the units it finds.
    pub fn add_used_units(&mut self, program: &CompiledUnit) -> Result<(), LinkToolError> {
        let mut pending: Vec<String> = program.used_units().map(str::to_string).collect();
        for (_, unit) in self.units.values() {
            pending.extend(unit.used_units().map(str::to_string));
        }

        while let Some(unit_name) = pending.pop() {
            if self.units.contains_key(&unit_name) || self.missing.contains(&unit_name) {
                continue;
            }

            let unit_filename = PathBuf::from(format!("{}.{}", unit_name, UNIT_FILE_EXT));
            let path = match find_in_paths(&unit_filename, &self.search_dirs) {
                Some(path) => path,
                None => {
                    debug!("unit {} not found in search dirs", unit_name);
                    self.missing.insert(unit_name);
                    continue;
                }
            };

            let unit = load_unit_file(&path)?;
            if unit.name() != unit_name {
                return Err(LinkToolError::UnexpectedUnit {
                    path,
                    expected: unit_name,
                    found: unit.name().to_string(),
                });
            }

            debug!("unit {} loaded from {}", unit_name, path.display());
            pending.extend(unit.used_units().map(str::to_string));
            self.insert(path, unit)?;
        }

        Ok(())
    }

    fn insert(&mut self, path: PathBuf, unit: CompiledUnit) -> Result<(), LinkToolError> {
        if let Some((existing_path, _)) = self.units.get(unit.name()) {
            let same_file = match (existing_path.canonicalize(), path.canonicalize()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            };

            if same_file {
                return Ok(());
            }

            return Err(LinkToolError::DuplicateUnit {
                unit_name: unit.name().to_string(),
                new_path: path,
                existing_path: existing_path.clone(),
            });
        }

        self.units.insert(unit.name().to_string(), (path, unit));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn into_units(self) -> Vec<CompiledUnit> {
        self.units
            .into_iter()
            .map(|(_, (_, unit))| unit)
            .collect()
    }
}
