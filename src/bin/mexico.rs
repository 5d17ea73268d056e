//! Source to zone file compiler CLI.
//!
//! Reads a program source file and writes a zone file holding one MX record
//! per instruction, ready to be loaded by a DNS server.
//!
//! # Usage
//! ```text
//! mexico <input> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input`: Program source file to compile
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.zone`)
//! - `-d, --domain <name>`: Base domain the records are published under
//! - `-s, --serial <serial>`: SOA serial (defaults to the current UTC hour)
//! - `-q, --quiet`: Only log warnings and errors
//!
//! # Examples
//! ```text
//! mexico hello.mx
//! mexico hello.mx -d hello.example.com -o hello.zone
//! ```

use mexico::utils::log::{self, Level};
use mexico::virtual_machine::assembler::assemble_file;
use mexico::virtual_machine::zone::{DEFAULT_BASE_DOMAIN, ZoneConfig, write_zone_file};
use mexico::{error, info};
use std::env;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut config = ZoneConfig::new(DEFAULT_BASE_DOMAIN);

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o" | "--domain" | "-d" | "--serial" | "-s") => {
                i += 1;
                let Some(value) = args.get(i) else {
                    error!("{k} requires an argument");
                    process::exit(1);
                };
                match k {
                    "--output" | "-o" => output_path = Some(value.clone()),
                    "--domain" | "-d" => config.base_domain = value.clone(),
                    _ => config.serial = Some(value.clone()),
                }
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

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.zone", stem))
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    let code = match assemble_file(input_path) {
        Ok(code) => code,
        Err(e) => {
            error!("Compilation failed: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_zone_file(&output_path, &config, &code) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Compiled {} -> {} ({} records under {})",
        input_path,
        output_path,
        code.len(),
        config.origin()
    );
}

const USAGE: &str = "\
Mexico Compiler

USAGE:
    {program} <input> [OPTIONS]

ARGS:
    <input>    Program source file to compile

OPTIONS:
    -o, --output <file>      Output file path (defaults to <input>.zone)
    -d, --domain <name>      Base domain for the records (defaults to mexico.invalid)
    -s, --serial <serial>    SOA serial (defaults to the current UTC hour, YYYYMMDDHH)
    -q, --quiet              Only log warnings and errors
    -h, --help               Print this help message

EXAMPLES:
    # Compile to default output name
    {program} hello.mx

    # Publish under your own domain
    {program} hello.mx -d hello.example.com -o hello.zone
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
