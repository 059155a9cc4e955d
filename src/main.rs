mod args;
mod link_error;
mod reporting;
mod unit_files;

use crate::args::*;
use crate::link_error::*;
use crate::reporting::report_err;
use crate::unit_files::*;
use codespan_reporting::diagnostic::Severity;
use common::span::*;
use linker::LinkedProgram;
use log::debug;
use log::info;
use log::LevelFilter;
use std::fs;
use std::fs::File;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    // RUST_LOG takes priority over the default level
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

fn link_program(args: &Args) -> Result<LinkedProgram, LinkToolError> {
    if !args.program.exists() {
        return Err(LinkToolError::FileNotFound(args.program.clone()));
    }

    let program = load_unit_file(&args.program)?;

    let mut units = UnitCollection::new(args);

    debug!("unit search dirs:");
    for path in units.search_dirs() {
        debug!("\t{}", path.display());
    }

    for unit_arg in &args.units {
        units.add(unit_arg)?;
    }

    units.add_used_units(&program)?;

    info!("linking {} with {} units", program.name(), units.len());

    let linked = linker::link(units.into_units(), program, &args.link_options())?;
    Ok(linked)
}

fn print_output<F>(out_path: Option<&PathBuf>, f: F) -> Result<(), LinkToolError>
where
    F: FnOnce(&mut dyn io::Write) -> io::Result<()>,
{
    let out_span;

    let io_result = match out_path {
        Some(out_path) => {
            let create_dirs = match out_path.parent() {
                Some(parent) => fs::create_dir_all(parent),
                None => Ok(()),
            };

            out_span = Span::zero(out_path.clone());

            create_dirs
                .and_then(|_| File::create(out_path))
                .and_then(|mut file| f(&mut file))
        },

        None => {
            let stdout = io::stdout();
            let mut stdout_lock = stdout.lock();

            out_span = Span::zero("stdout");

            f(&mut stdout_lock)
        },
    };

    io_result.map_err(|io_err| LinkToolError::OutputFailed(out_span, io_err))
}

fn handle_output(program: &LinkedProgram, args: &Args) -> Result<(), LinkToolError> {
    if let Some(output_arg) = args.output.as_ref() {
        let program_bytes = bincode::serialize(program)?;

        print_output(Some(output_arg), |dst| dst.write_all(&program_bytes))?;
        info!("wrote {} ({} bytes)", output_arg.display(), program_bytes.len());
    }

    if args.print || args.output.is_none() {
        print_output(None, |dst| write!(dst, "{}", program))?;
    }

    if args.map {
        print_output(None, |dst| write!(dst, "{}", program.link_map()))?;
    }

    Ok(())
}

fn main() {
    let args: Args = Args::from_args();

    init_logging(args.verbose);

    if let Err(err) = link_program(&args)
        .and_then(|program| handle_output(&program, &args))
    {
        if let Err(output_err) = report_err(&err, Severity::Error) {
            eprintln!("error: {}", err);
            eprintln!("error reporting output: {}", output_err);
        }

        process::exit(1)
    }
}
