//! Interpreter CLI.
//!
//! Loads the MX records of a domain from a zone file, decodes them into a
//! program and runs it on the terminal.
//!
//! # Usage
//! ```text
//! mexigo <zonefile> [OPTIONS]
//! ```
//!
//! # Options
//! - `-d, --domain <name>`: Only run records owned by this domain
//! - `--dump`: Log the tape and stack once the run is over
//! - `-v, --verbose`: Trace every executed instruction
//! - `-q, --quiet`: Only log warnings and errors

use mexico::utils::log::{self, Level};
use mexico::virtual_machine::decoder::decode;
use mexico::virtual_machine::program::Program;
use mexico::virtual_machine::vm::{IoConsole, VM};
use mexico::virtual_machine::zone::read_zone_file;
use mexico::{error, info};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let zone_path = &args[1];
    let mut domain: Option<String> = None;
    let mut dump = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--domain" | "-d") => {
                i += 1;
                let Some(value) = args.get(i) else {
                    error!("{k} requires an argument");
                    process::exit(1);
                };
                domain = Some(value.clone());
                i += 1;
            }
            "--dump" => {
                dump = true;
                i += 1;
            }
            "--verbose" | "-v" => {
                log::set_min_level(Level::Debug);
                i += 1;
            }
            "--quiet" | "-q" => {
                log::set_min_level(Level::Warn);
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let records = read_zone_file(zone_path, domain.as_deref()).unwrap_or_else(|e| {
        error!("Failed to load records: {e}");
        process::exit(1)
    });

    let code = decode(&records);
    if code.is_empty() {
        error!(
            "No instructions found in {} ({} MX records, none under the mexico namespace)",
            zone_path,
            records.len()
        );
        process::exit(1);
    }
    info!("Loaded {} instructions from {}", code.len(), zone_path);

    let mut vm = VM::new(Program::new(code)).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });

    let result = vm.run(&mut IoConsole::stdio());

    if dump {
        info!(
            "Tape is {} cells, stack is {} rows",
            vm.tape().cells().len(),
            vm.stack().len()
        );
        for line in vm.dump() {
            info!("{line}");
        }
    }

    if let Err(e) = result {
        error!("Execution stopped after {} instructions: {e}", vm.steps());
        process::exit(1);
    }
    info!("Halted after {} instructions", vm.steps());
}

const USAGE: &str = "\
Mexico Interpreter

USAGE:
    {program} <zonefile> [OPTIONS]

ARGS:
    <zonefile>    Zone file holding the program's MX records

OPTIONS:
    -d, --domain <name>    Only run records owned by this domain
        --dump             Log the tape and stack after the run
    -v, --verbose          Trace every executed instruction
    -q, --quiet            Only log warnings and errors
    -h, --help             Print this help message

EXAMPLES:
    {program} hello.zone
    {program} hello.zone -d hello.example.com --dump
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
