use std::io::{self, Write};

use sorrel_compiler::compile_into;
use sorrel_exec::Exec;
use sorrel_icode::{Program, Value};

use crate::corelib;

/// One interactive session: a single executor whose program grows with
/// every accepted input. Variables, functions and natives persist across
/// inputs because only the instruction stream is swapped.
pub struct Session {
    exec: Exec,
    program: Program,
    pub history: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        let program = Program::new();
        let mut exec = Exec::new(program.clone());
        corelib::register(&mut exec);
        Self { exec, program, history: Vec::new() }
    }

    /// Compile one input onto the shared program and run the new tail.
    /// A failed compile leaves the session untouched. A failed run keeps
    /// the grown program (whatever executed before the fault stands) but
    /// discards the faulted statement's partial operands from the stack.
    pub fn eval(&mut self, line: &str) -> Result<(), String> {
        let watermark = self.program.len();
        let depth = self.exec.stack_len();
        let out = compile_into(line, self.program.clone()).map_err(|e| e.to_string())?;
        self.program = out.program;
        self.exec.set_program(self.program.clone());
        self.exec.register_all(out.funcs);
        self.history.push(line.to_string());
        self.exec.run_from(watermark).map_err(|e| {
            self.exec.truncate_stack(depth);
            e.to_string()
        })
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.exec.var(name)
    }
}

pub fn run() -> anyhow::Result<()> {
    println!("Sorrel REPL — 'exit' or Ctrl-D to leave");
    let mut session = Session::new();
    let stdin = io::stdin();
    loop {
        print!("sorrel> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            return Ok(());
        }
        if let Err(e) = session.eval(line) {
            eprintln!("{}", e);
        }
    }
}
