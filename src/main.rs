//! qbvm - run BASIC programs on the bytecode VM
//!
//! This is the command-line driver: it compiles a source file and runs it
//! against the terminal and the local file system.

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::Duration;

use qbvm::builtins::Registry;
use qbvm::lexer::{TokenKind, tokenize};
use qbvm::vm::{Devices, Vm, VmConfig};
use qbvm::{CompileError, compile};
use qbvm_runtime::{StdFileSystem, StdioConsole};

/// qbvm - an interactive BASIC dialect on a cooperatively scheduled VM
#[derive(Parser, Debug)]
#[command(name = "qbvm")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input BASIC source file (.bas)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Only run lexer and print tokens (for debugging)
    #[arg(long)]
    tokens: bool,

    /// Stop after type checking and report diagnostics
    #[arg(long)]
    check: bool,

    /// Print the linked bytecode instead of running it
    #[arg(long)]
    disasm: bool,

    /// Run under the tick-driven tokio scheduler
    #[arg(long = "async")]
    run_async: bool,

    /// Instructions per scheduler tick
    #[arg(long, value_name = "N")]
    budget: Option<usize>,

    /// Wall-clock milliseconds per scheduler tick
    #[arg(long, value_name = "N")]
    slice_ms: Option<u64>,

    /// Milliseconds between scheduler ticks
    #[arg(long, value_name = "N")]
    tick_ms: Option<u64>,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> VmConfig {
        let defaults = VmConfig::default();
        VmConfig {
            instruction_budget: self.budget.unwrap_or(defaults.instruction_budget),
            time_slice: self.slice_ms.map(Duration::from_millis).unwrap_or(defaults.time_slice),
            tick_interval: self.tick_ms.map(Duration::from_millis).unwrap_or(defaults.tick_interval),
            ..defaults
        }
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.trace {
        logger.filter_module("qbvm::vm", log::LevelFilter::Trace);
    }
    logger.init();

    // Read source file
    let source = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    if args.verbose {
        eprintln!("Compiling: {}", args.input.display());
        eprintln!("Source length: {} bytes", source.len());
    }

    if args.tokens {
        print_tokens(&args, &source);
        return;
    }

    let registry = Rc::new(Registry::standard());
    let program = match compile(&source, &registry) {
        Ok(program) => program,
        Err(err) => {
            report(&args, &err);
            process::exit(1);
        }
    };
    if args.check {
        println!("{}: OK", args.input.display());
        return;
    }
    if args.disasm {
        print!("{}", program);
        return;
    }

    let root = args
        .input
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let devices = Devices::new(StdioConsole::new()).with_fs(StdFileSystem::new(root));
    let mut vm = Vm::new(devices, registry).with_config(args.config());

    let result = if args.run_async {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("Error starting scheduler: {}", e);
                process::exit(1);
            }
        };
        runtime.block_on(vm.run_async(program))
    } else {
        vm.run(program)
    };

    if let Err(err) = result {
        eprintln!("{}: runtime error: {}", args.input.display(), err);
        process::exit(2);
    }
}

fn print_tokens(args: &Args, source: &str) {
    println!("Tokens for {}:", args.input.display());
    println!("{:-<60}", "");

    let (tokens, errors) = tokenize(source);
    for token in tokens {
        // Skip newlines in output for readability unless verbose
        if token.kind == TokenKind::Newline && !args.verbose {
            continue;
        }
        println!(
            "{:>4}:{:<4} {:20} {:?}",
            token.locus.line,
            token.locus.column,
            format!("{:?}", token.kind),
            token.text
        );
    }
    for err in errors {
        eprintln!("{}:{}: {}", args.input.display(), err.locus(), err);
    }
}

/// Prints every diagnostic as `file:line:column: message`.
fn report(args: &Args, err: &CompileError) {
    let file = args.input.display();
    match err {
        CompileError::Lex(errors) => {
            for e in errors {
                eprintln!("{}:{}: {}", file, e.locus(), e);
            }
        }
        CompileError::Parse(errors) => {
            for e in errors {
                eprintln!("{}:{}: {}", file, e.locus(), e);
            }
        }
        CompileError::Semantic(errors) => {
            for e in errors {
                eprintln!("{}:{}: {}", file, e.locus(), e);
            }
        }
        CompileError::CodeGen(e) => eprintln!("{}: {}", file, e),
    }
    if args.verbose {
        eprintln!("{} error(s)", err.count());
    }
}
