use std::io::Read;
use std::{env, fs};

use anyhow::{Context, Result};
use sorrel_compiler::compile;
use sorrel_exec::Exec;
use sorrel_scanner::{Scanner, TokenKind};

mod corelib;
mod repl;

fn print_help() {
    println!("Sorrel CLI\n");
    println!("Commands:");
    println!("  run <file.sl>     Compile and run a Sorrel script ('-' reads stdin)");
    println!("  lex <file.sl>     Dump the token stream (debug)");
    println!("  icode <file.sl>   Dump the compiled instruction listing (debug)");
    println!("  repl              Interactive session\n");
    println!("Usage:");
    println!("  sorrelc <command> [args]\n");
    println!("Examples:");
    println!("  sorrelc run demos/hello.sl");
    println!("  echo 'println(\"hi\")' | sorrelc run -");
}

fn read_source(path: &str) -> Result<String> {
    if path == "-" {
        let mut src = String::new();
        std::io::stdin().read_to_string(&mut src).context("read stdin")?;
        return Ok(src);
    }
    fs::read_to_string(path).with_context(|| format!("read {}", path))
}

fn cmd_run(path: Option<String>) -> Result<()> {
    let Some(path) = path else {
        eprintln!("usage: sorrelc run <file.sl>");
        std::process::exit(2)
    };
    let src = read_source(&path)?;
    let out = compile(&src)?;
    let mut ex = Exec::new(out.program);
    corelib::register(&mut ex);
    ex.register_all(out.funcs);
    ex.run()?;
    Ok(())
}

fn cmd_lex(path: Option<String>) -> Result<()> {
    let Some(path) = path else {
        eprintln!("usage: sorrelc lex <file.sl>");
        std::process::exit(2)
    };
    let src = read_source(&path)?;
    let mut sc = Scanner::new(&src);
    loop {
        let t = sc.next()?;
        match t.error {
            Some(e) => println!("{}\t{}\t[{}]", t.pos, t, e),
            None => println!("{}\t{}", t.pos, t),
        }
        if t.is(TokenKind::Eof) {
            return Ok(());
        }
    }
}

fn cmd_icode(path: Option<String>) -> Result<()> {
    let Some(path) = path else {
        eprintln!("usage: sorrelc icode <file.sl>");
        std::process::exit(2)
    };
    let src = read_source(&path)?;
    let out = compile(&src)?;
    for ins in out.program.iter() {
        println!("{}", ins);
    }
    for f in &out.funcs {
        println!("{:?}", f);
    }
    Ok(())
}

fn main() {
    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        print_help();
        return;
    }
    let cmd = args.remove(0);

    let result = match cmd.as_str() {
        "run" => cmd_run(args.first().cloned()),
        "lex" => cmd_lex(args.first().cloned()),
        "icode" => cmd_icode(args.first().cloned()),
        "repl" => repl::run(),
        other => {
            eprintln!("unknown command: '{}'\n", other);
            print_help();
            std::process::exit(2);
        }
    };
    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
