use std::env;
use std::fs;
use std::io;
use std::process;

use anyhow::{Result, anyhow};
use minipy::interpreter::Interpreter;
use minipy::{lexer, parser};

/// The lexer only ever sees `\n` line terminators.
fn normalize_line_endings(source: &str) -> String {
    source.replace("\r\n", "\n").replace('\r', "\n")
}

fn run(path: &str) -> Result<()> {
    let raw = fs::read_to_string(path).map_err(|_| anyhow!("Cannot open file {path}"))?;
    let source = normalize_line_endings(&raw);

    let tokens = lexer::tokenize(&source)?;
    let program = parser::parse_tokens(tokens)?;

    let stdout = io::stdout();
    let mut interpreter = Interpreter::new(stdout.lock());
    interpreter.run(&program)?;
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        let arg0 = args
            .first()
            .map(String::as_str)
            .unwrap_or(env!("CARGO_PKG_NAME"));
        eprintln!("Usage: {arg0} <source_file>");
        process::exit(1);
    }

    if let Err(error) = run(&args[1]) {
        eprintln!("Error: {error}");
        process::exit(1);
    }
}
