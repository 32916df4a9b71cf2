//! Headless runner for Slate programs.
//!
//! Assembles one source file and executes it to completion.  `INPUT`
//! instructions prompt on stdin, `OUTPUT` writes to stdout: characters
//! verbatim, numeric types one value per line.

use std::{
    env, fs,
    io::{self, BufRead, Write},
    process::ExitCode,
    sync::Arc,
};

use slate::{TypeModifier, Word4};
use slate_core::{
    format_value, parse_value, InputCallback, Machine, ProcessorIo,
};

/// Console endpoint: prompted stdin for `INPUT`, typed stdout for `OUTPUT`
struct ConsoleIo;

impl ProcessorIo for ConsoleIo {
    fn input_request(
        &self,
        type_modifier: TypeModifier,
        callback: InputCallback,
    ) {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            print!("? ");
            let _ = io::stdout().flush();
            line.clear();
            if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                // End of input reads as zero
                callback(Word4::ZERO);
                return;
            }
            if let Some(value) = parse_value(&line, type_modifier) {
                callback(value);
                return;
            }
            eprintln!("expected a {type_modifier} value");
        }
    }

    fn output_request(&self, value: Word4, type_modifier: TypeModifier) {
        if type_modifier == TypeModifier::C {
            print!("{}", format_value(value, type_modifier));
            let _ = io::stdout().flush();
        } else {
            println!("{}", format_value(value, type_modifier));
        }
    }
}

fn main() -> ExitCode {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: slate-cli <program.slate>");
        return ExitCode::FAILURE;
    };
    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{path}: {error}");
            return ExitCode::FAILURE;
        }
    };
    let bytecode = match slate_asm::compile(&source) {
        Ok(bytecode) => bytecode,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let mut machine = Machine::with_io(Arc::new(ConsoleIo));
    if let Err(error) = machine.load(&bytecode) {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }
    if let Err(error) = machine.run() {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
