//! Siew CLI
//!
//! `siew` with no arguments starts an interactive REPL; `siew <path>` runs a
//! script file. Exit codes follow the sysexits convention the interpreter
//! has always used: 64 usage, 65 compile error, 70 runtime error, 74 I/O
//! error.

use clap::Parser;
use siew_runtime::{InterpretError, Vm, VmOptions};
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

mod config;
use config::CliConfig;

const PROMPT: &str = "siew> ";

const EX_USAGE: i32 = 64;
const EX_COMPILE: i32 = 65;
const EX_RUNTIME: i32 = 70;
const EX_IO: i32 = 74;

#[derive(Parser)]
#[command(name = "siew")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Siew interpreter - run a script or start a REPL", long_about = None)]
struct Cli {
    /// Script file to run; starts an interactive REPL when omitted
    script: Option<PathBuf>,

    /// Print a disassembly of the compiled bytecode before running
    #[arg(long)]
    dump_bytecode: bool,

    /// Trace every VM instruction and the value stack while running
    #[arg(long)]
    trace: bool,
}

fn main() {
    // Set up logging before anything can fail. RUST_LOG controls verbosity.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("siew=warn".parse().unwrap()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            if err.use_stderr() {
                process::exit(EX_USAGE);
            }
            return; // --help / --version
        }
    };

    let file_config = CliConfig::load();
    let options = VmOptions {
        trace_execution: cli.trace || file_config.trace,
        print_code: cli.dump_bytecode || file_config.dump_bytecode,
    };
    tracing::debug!(?options, "starting");
    let mut vm = Vm::with_options(options);

    match cli.script {
        Some(path) => run_file(&mut vm, &path),
        None => repl(&mut vm, &file_config),
    }
}

fn run_file(vm: &mut Vm, path: &Path) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("Could not open file \"{}\".", path.display());
            process::exit(EX_IO);
        }
    };

    match vm.interpret(&source) {
        Ok(_) => {}
        Err(InterpretError::Compile) => process::exit(EX_COMPILE),
        Err(InterpretError::Runtime { .. }) => process::exit(EX_RUNTIME),
    }
}

/// Each line is a full program. The loop keeps going whatever the outcome of
/// a line; diagnostics already went to stderr.
fn repl(vm: &mut Vm, config: &CliConfig) {
    if io::stdin().is_terminal() {
        interactive_repl(vm, config);
    } else {
        piped_repl(vm);
    }
}

fn interactive_repl(vm: &mut Vm, config: &CliConfig) {
    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Could not start line editor: {}", err);
            return piped_repl(vm);
        }
    };

    let history = config.history_path();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                let _ = vm.interpret(&line);
            }
            Err(rustyline::error::ReadlineError::Interrupted) => continue,
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("REPL error: {}", err);
                break;
            }
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
}

/// Line-at-a-time loop for non-interactive stdin (pipes, heredocs, tests).
fn piped_repl(vm: &mut Vm) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("{}", PROMPT);
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let _ = vm.interpret(&line);
            }
            Err(err) => {
                eprintln!("Could not read input: {}", err);
                break;
            }
        }
    }
}
