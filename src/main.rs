use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::process::ExitCode;

use easel::{check, Error, FinalState, Interpreter, Op, RecordingSurface};

#[derive(Parser)]
#[command(name = "easel")]
#[command(version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (rev ", env!("EASEL_GIT_REV"),
    ", built ", env!("EASEL_BUILD_UNIX"), ")"
))]
#[command(about = "easel - a tiny drawing command language")]
struct Cli {
    /// Path to a .easel program to run
    file: Option<String>,

    /// Validate the program without executing it
    #[arg(long)]
    check: bool,

    /// Execute a single command against a fresh canvas
    #[arg(short = 'c', long, value_name = "LINE")]
    command: Option<String>,

    /// Print every drawing primitive the program issues
    #[arg(long)]
    trace: bool,

    /// Emit the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    state: FinalState,
    ops: &'a [Op],
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(line) = &cli.command {
        return run_single(line, &cli);
    }
    let Some(file) = &cli.file else {
        println!("easel - run a .easel drawing program, e.g.: easel shapes.easel");
        return Ok(ExitCode::SUCCESS);
    };
    let source = fs::read_to_string(file)?;

    if let Err(err) = check(&source) {
        return report_error(err, &cli);
    }
    if cli.check {
        if cli.json {
            println!("{}", serde_json::json!({ "ok": true }));
        } else {
            println!("syntax check successful");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut interp = Interpreter::new();
    let mut surface = RecordingSurface::new();
    match interp.run(&source, &mut surface) {
        Ok(state) => {
            report_outcome(state, &surface, &cli);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_error(err, &cli),
    }
}

fn run_single(line: &str, cli: &Cli) -> Result<ExitCode> {
    let mut interp = Interpreter::new();
    let mut surface = RecordingSurface::new();
    match interp.execute_line(line, &mut surface) {
        Ok(()) => {
            report_outcome(interp.state(), &surface, cli);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_error(err, cli),
    }
}

fn report_outcome(state: FinalState, surface: &RecordingSurface, cli: &Cli) {
    if cli.json {
        let report = Report { state, ops: &surface.ops };
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error: {}", e),
        }
        return;
    }
    if cli.trace {
        for op in &surface.ops {
            println!("{}", op);
        }
    }
    println!("position: ({}, {})", state.x, state.y);
    println!("fill: {}", if state.fill { "on" } else { "off" });
    println!("color: {}", state.pen);
}

fn report_error(err: Error, cli: &Cli) -> Result<ExitCode> {
    if cli.json {
        println!("{}", serde_json::json!({ "ok": false, "error": &err }));
    }
    eprintln!("error: {}", err);
    Ok(ExitCode::FAILURE)
}
