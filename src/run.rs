use std::io::{stdin, stdout, Read};
use std::path::PathBuf;

use docopt::Docopt;
use serde::Deserialize;

use crate::error::ErrorExt;
use crate::generator;
use crate::io::{Input, Output};
use crate::preprocess::Preprocessor;
use crate::watcher;

pub const USAGE: &str = "
sitepp

Usage:
    sitepp build [<sourcedir> [<outputdir>]]
    sitepp watch [<sourcedir> [<outputdir>]]
    sitepp preprocess [<source> [<target>]]
    sitepp (-h | --help)
    sitepp --version

Commands:
    build       Preprocess the whole site tree once.
    watch       Build, then rebuild on every change until interrupted.
    preprocess  Preprocess a single file (reads stdin/writes stdout by default).

Options:
    -h --help     Show usage information and exit.
       --version  Print the version number and exit.
";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
pub struct Args {
    cmd_build: bool,
    cmd_watch: bool,
    cmd_preprocess: bool,
    flag_version: bool,
    arg_sourcedir: Option<String>,
    arg_outputdir: Option<String>,
    arg_source: Option<String>,
    arg_target: Option<String>,
}

const DEFAULT_SOURCE_DIR: &str = ".";
const DEFAULT_OUTPUT_DIR: &str = "build";

fn get_input(args: &Args) -> std::io::Result<Input> {
    if let Some(ref source) = args.arg_source {
        Ok(Input::File(std::fs::File::open(source)?))
    } else {
        let mut buffer: Vec<u8> = Vec::new();
        stdin().read_to_end(&mut buffer)?;
        Ok(Input::Cursor(std::io::Cursor::new(buffer.into_boxed_slice())))
    }
}

fn get_output(args: &Args) -> std::io::Result<Output> {
    if let Some(ref target) = args.arg_target {
        Ok(Output::File(std::fs::File::create(target)?))
    } else {
        Ok(Output::Standard(stdout()))
    }
}

fn cmd_preprocess(args: &Args) -> std::io::Result<()> {
    use std::io::Write;

    let mut input = get_input(args)?;
    let mut content = String::new();
    input.read_to_string(&mut content)?;

    let origin = args.arg_source.as_ref().map(PathBuf::from);
    let mut preprocessor = Preprocessor::new();
    match preprocessor.process(&content, origin).print_error() {
        Some(output) => {
            let mut out = get_output(args)?;
            out.write_all(output.as_bytes())?;
            Ok(())
        }
        None => Ok(()),
    }
}

fn run_command(args: &Args) -> std::io::Result<()> {
    let source_dir = PathBuf::from(args.arg_sourcedir.as_deref().unwrap_or(DEFAULT_SOURCE_DIR));
    let output_dir = PathBuf::from(args.arg_outputdir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR));

    if args.cmd_build {
        generator::generate(&source_dir, &output_dir)
    } else if args.cmd_watch {
        watcher::watch(&source_dir, &output_dir)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    } else if args.cmd_preprocess {
        cmd_preprocess(args)
    } else {
        unreachable!()
    }
}

pub fn args(args: &Args) {
    if args.flag_version {
        println!("v{}", VERSION);
        std::process::exit(0);
    }

    if let Err(e) = run_command(args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

pub fn parse_args() -> Args {
    Docopt::new(USAGE).and_then(|d| d.deserialize()).unwrap_or_else(|e| e.exit())
}
