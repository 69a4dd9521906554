//! mindc, the Mind compiler driver.
//!
//! Takes a source file and prints the requested stage: the token
//! stream, the AST, the TAC, the per-function flow graphs with their
//! liveness solution, or (the default) the final RV32 assembly.

use std::error::Error;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::process;

use clap::{Parser, ValueEnum};

use mind_backend::{dump_flow_graphs, emit_assembly};
use mind_core::dump::dump_program;
use mind_frontend::{compile_to_tac, lex, parse};

#[derive(Debug, Parser)]
#[command(version, about = "Mind compiler targeting 32-bit RISC-V", long_about = None)]
struct Args {
    /// the input file
    file: String,
    /// write the output to a file instead of stdout
    #[arg(short, long)]
    output: Option<String>,
    /// the stage to stop at
    #[arg(value_enum, long = "out", default_value = "asm")]
    out: Output,
    /// enable the peephole pass and suppress TAC comments
    #[arg(short = 'O', default_value_t = false)]
    optimize: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    /// the token stream
    Tokens,
    /// the abstract syntax tree
    Ast,
    /// the three-address code
    Tac,
    /// the flow graphs with their liveness solution
    Cfg,
    /// the resulting assembly code
    Asm,
}

fn run(args: &Args, input: &str, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    match args.out {
        Output::Tokens => {
            for tok in lex::tokenize(input)? {
                writeln!(out, "{} {:?} {:?}", tok.pos, tok.kind, tok.text)?;
            }
        }
        Output::Ast => {
            let ast = parse(input)?;
            writeln!(out, "{ast:#?}")?;
        }
        Output::Tac => {
            let prog = compile_to_tac(input)?;
            dump_program(&prog, out)?;
        }
        Output::Cfg => {
            let prog = compile_to_tac(input)?;
            dump_flow_graphs(&prog, out)?;
        }
        Output::Asm => {
            let mut prog = compile_to_tac(input)?;
            emit_assembly(&mut prog, out, args.optimize)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let input = fs::read_to_string(&args.file).unwrap_or_else(|e| {
        let p = &args.file;
        eprintln!("cannot read {p}: {e}");
        process::exit(1);
    });

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            let f = fs::File::create(path).unwrap_or_else(|e| {
                eprintln!("cannot create {path}: {e}");
                process::exit(1);
            });
            Box::new(BufWriter::new(f))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if let Err(e) = run(&args, &input, &mut out) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
