use linker::LinkOptions;
use std::path::PathBuf;
use structopt::*;

#[derive(StructOpt, Debug)]
pub struct Args {
    /// compiled main program
    #[structopt(name = "PROGRAM", parse(from_os_str))]
    pub program: PathBuf,

    /// compiled units to link, in addition to the units found in the search dirs
    #[structopt(long = "unit", short = "u", parse(from_os_str))]
    pub units: Vec<PathBuf>,

    /// directory to search for compiled units named in a uses clause
    #[structopt(long = "search-dir", short = "s", parse(from_os_str))]
    pub search_dirs: Vec<PathBuf>,

    /// output file for the linked program.
    /// If no output path is provided the program listing is printed instead.
    #[structopt(name = "OUTPUT", short = "o", parse(from_os_str))]
    pub output: Option<PathBuf>,

    /// print the linked program as human-readable text
    #[structopt(long = "print", short = "p")]
    pub print: bool,

    /// print where each unit and symbol was placed
    #[structopt(long = "map")]
    pub map: bool,

    /// leave out units the program doesn't use
    #[structopt(long = "strip-unused")]
    pub strip_unused: bool,

    #[structopt(long = "max-globals", default_value = "65536")]
    pub max_globals: usize,

    #[structopt(long = "max-instructions", default_value = "16777216")]
    pub max_instructions: usize,

    #[structopt(long = "verbose", short = "v")]
    pub verbose: bool,
}

impl Args {
    pub fn link_options(&self) -> LinkOptions {
        LinkOptions {
            strip_unused: self.strip_unused,
            max_globals: self.max_globals,
            max_instructions: self.max_instructions,
        }
    }
}
