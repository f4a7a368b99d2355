/*

 ▄▄▄▄    ██▓    ▄▄▄       ▄████▄   ██ ▄█▀ ██▀███   █    ██   ██████  ██░ ██
▓█████▄ ▓██▒   ▒████▄    ▒██▀ ▀█   ██▄█▒ ▓██ ▒ ██▒ ██  ▓██▒▒██    ▒ ▓██░ ██▒
▒██▒ ▄██▒██░   ▒██  ▀█▄  ▒▓█    ▄ ▓███▄░ ▓██ ░▄█ ▒▓██  ▒██░░ ▓██▄   ▒██▀▀██░
▒██░█▀  ▒██░   ░██▄▄▄▄██ ▒▓▓▄ ▄██▒▓██ █▄ ▒██▀▀█▄  ▓▓█  ░██░  ▒   ██▒░▓█ ░██
░▓█  ▀█▓░██████▒▓█   ▓██▒▒ ▓███▀ ░▒██▒ █▄░██▓ ▒██▒▒▒█████▓ ▒██████▒▒░▓█▒░██▓
░▒▓███▀▒░ ▒░▓  ░▒▒   ▓▒█░░ ░▒ ▒  ░▒ ▒▒ ▓▒░ ▒▓ ░▒▓░░▒▓▒ ▒ ▒ ▒ ▒▓▒ ▒ ░ ▒ ░░▒░▒
▒░▒   ░ ░ ░ ▒  ░ ▒   ▒▒ ░  ░  ▒   ░ ░▒ ▒░  ░▒ ░ ▒░░░▒░ ░ ░ ░ ░▒  ░ ░ ▒ ░▒░ ░
 ░    ░   ░ ░    ░   ▒   ░        ░ ░░ ░   ░░   ░  ░░░ ░ ░ ░  ░  ░   ░  ░░ ░
 ░          ░  ░     ░  ░░ ░      ░  ░      ░        ░           ░   ░  ░  ░
      ░                  ░
Copyright (C) 2026, Blackrush LLC
Created by Erik Olson, Tarpon Springs, Florida
For more information, visit BlackrushDrive.com

MIT License

Copyright (c) 2026 Erik Lee Olson for Blackrush, LLC

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.

*/

//! Recursive-descent compiler: tokens in, icode out, no AST in between.
//! Each grammar rule emits instructions as it recognizes its operands;
//! `if`/`while`/`func` back-patch relative jump offsets once their
//! targets are known.
use sorrel_common::{Result, SorrelError};
use sorrel_icode::{Function, Op, Program, Value};
use sorrel_scanner::{Scanner, Token, TokenKind};

/// Statement-position keywords. Names are otherwise unreserved.
const KEYWORDS: [&str; 5] = ["if", "else", "end", "while", "func"];

#[derive(Debug)]
pub struct CompileOut {
    pub program: Program,
    /// Interpreted functions registered while compiling, in definition
    /// order. Callable from anywhere in the compile unit, including
    /// call sites earlier than the definition.
    pub funcs: Vec<Function>,
}

/// Compile a whole source text into a fresh program.
pub fn compile(src: &str) -> Result<CompileOut> {
    compile_into(src, Program::new())
}

/// Compile `src` appended to an existing program. The REPL uses this to
/// grow one shared instruction stream across inputs.
pub fn compile_into(src: &str, program: Program) -> Result<CompileOut> {
    let mut c = Compiler { sc: Scanner::new(src), prog: program, funcs: Vec::new() };
    c.parse_program()?;
    Ok(CompileOut { program: c.prog, funcs: c.funcs })
}

struct Compiler<'a> {
    sc: Scanner<'a>,
    prog: Program,
    funcs: Vec<Function>,
}

impl<'a> Compiler<'a> {
    fn parse_program(&mut self) -> Result<()> {
        loop {
            let t = self.next()?;
            if t.is(TokenKind::Eof) {
                return Ok(());
            }
            if t.is_separator() {
                continue;
            }
            self.sc.push(t);
            self.parse_statement()?;
            self.end_statement()?;
        }
    }

    fn parse_statement(&mut self) -> Result<()> {
        let t = self.next()?;
        if t.is(TokenKind::Name) {
            match t.text.as_str() {
                "if" => return self.parse_if(&t),
                "while" => return self.parse_while(&t),
                "func" => return self.parse_func(&t),
                "else" | "end" => {
                    return Err(SorrelError(format!(
                        "parse error at {}: unexpected '{}'", t.pos, t.text)));
                }
                _ => {}
            }
        }
        self.sc.push(t);
        self.parse_expr_stmt()
    }

    /// expr-stmt := expr ('=' expr)?
    /// Without '=' the result is discarded (POP); an assignment leaves
    /// the assigned value behind, as ASSIGN pushes it back.
    fn parse_expr_stmt(&mut self) -> Result<()> {
        self.parse_expr()?;
        let t = self.next()?;
        if t.is(TokenKind::Equal) {
            self.parse_expr()?;
            self.prog.emit(Op::Assign, None, t.pos)?;
        } else {
            self.sc.push(t.clone());
            self.prog.emit(Op::Pop, None, t.pos)?;
        }
        Ok(())
    }

    /// if cond ... (else if cond ...)* (else ...)? end
    ///
    /// Each condition gets a JZ placeholder. Reaching an `else` emits an
    /// unconditional end-of-block JMP (queued for the final patch) and
    /// then resolves the previous JZ to the current address. `end`
    /// resolves the last pending JZ (when no final else took it) and
    /// every queued JMP, so all branches converge past the chain.
    fn parse_if(&mut self, kw: &Token) -> Result<()> {
        let mut end_jumps = Vec::new();
        loop {
            self.parse_expr()?;
            let jz = self.prog.emit(Op::Jz, Some(Value::Int(0)), kw.pos)?;
            let stop = self.parse_block(&["else", "end"], kw)?;
            if stop == "end" {
                let here = self.prog.here();
                self.prog.patch_jump(jz, here);
                break;
            }
            let jmp = self.prog.emit(Op::Jmp, Some(Value::Int(0)), kw.pos)?;
            end_jumps.push(jmp);
            let here = self.prog.here();
            self.prog.patch_jump(jz, here);

            let t = self.next()?;
            if t.is(TokenKind::Name) && t.text == "if" {
                continue; // else if: next condition
            }
            self.sc.push(t);
            self.parse_block(&["end"], kw)?;
            break;
        }
        let after = self.prog.here();
        for jmp in end_jumps {
            self.prog.patch_jump(jmp, after);
        }
        Ok(())
    }

    /// while cond ... end — terminal JMP carries a negative offset back
    /// to the condition; the JZ is patched to the address past it.
    fn parse_while(&mut self, kw: &Token) -> Result<()> {
        let start = self.prog.here();
        self.parse_expr()?;
        let jz = self.prog.emit(Op::Jz, Some(Value::Int(0)), kw.pos)?;
        self.parse_block(&["end"], kw)?;
        let jmp = self.prog.emit(Op::Jmp, Some(Value::Int(0)), kw.pos)?;
        self.prog.patch_jump(jmp, start);
        let here = self.prog.here();
        self.prog.patch_jump(jz, here);
        Ok(())
    }

    /// func name(params) ... end
    ///
    /// A guard JMP keeps straight-line execution from falling into the
    /// body. The body ends in JST, the return jump that pops the offset
    /// FCALL pushed for it. Parameters contribute arity only; there is
    /// no binding — the body shares the caller's variable table.
    fn parse_func(&mut self, kw: &Token) -> Result<()> {
        let name = self.next()?;
        if !name.is(TokenKind::Name) || KEYWORDS.contains(&name.text.as_str()) {
            return Err(SorrelError(format!(
                "parse error at {}: expected function name", name.pos)));
        }
        self.expect(TokenKind::ParenL, "'('")?;
        let mut arity = 0usize;
        let t = self.next()?;
        if !t.is(TokenKind::ParenR) {
            self.sc.push(t);
            loop {
                let p = self.next()?;
                if !p.is(TokenKind::Name) {
                    return Err(SorrelError(format!(
                        "parse error at {}: expected parameter name", p.pos)));
                }
                arity += 1;
                let sep = self.next()?;
                if sep.is(TokenKind::Comma) {
                    continue;
                }
                if sep.is(TokenKind::ParenR) {
                    break;
                }
                return Err(SorrelError(format!(
                    "parse error at {}: expected ',' or ')' in parameter list", sep.pos)));
            }
        }

        let guard = self.prog.emit(Op::Jmp, Some(Value::Int(0)), kw.pos)?;
        let start = self.prog.here();
        self.parse_block(&["end"], kw)?;
        let ret = self.prog.emit(Op::Jst, None, kw.pos)?;
        let here = self.prog.here();
        self.prog.patch_jump(guard, here);
        self.funcs.push(Function::interp(name.text, arity, start, ret));
        Ok(())
    }

    /// Statements up to one of the stop keywords; returns the keyword.
    fn parse_block(&mut self, stops: &[&str], opener: &Token) -> Result<String> {
        loop {
            let t = self.next()?;
            if t.is(TokenKind::Eof) {
                return Err(SorrelError(format!(
                    "parse error at {}: unterminated '{}' block", opener.pos, opener.text)));
            }
            if t.is_separator() {
                continue;
            }
            if t.is(TokenKind::Name) && stops.contains(&t.text.as_str()) {
                return Ok(t.text);
            }
            self.sc.push(t);
            self.parse_statement()?;
            self.end_statement()?;
        }
    }

    /// expr := simple (cmp simple)*
    fn parse_expr(&mut self) -> Result<()> {
        self.parse_simple()?;
        loop {
            let t = self.next()?;
            let op = match cmp_op(&t) {
                Some(op) => op,
                None => {
                    self.sc.push(t);
                    return Ok(());
                }
            };
            self.parse_simple()?;
            self.prog.emit(op, None, t.pos)?;
        }
    }

    /// simple := ['-'] term (('+'|'-') term)*
    ///
    /// Leading minus binds to the first term only and compiles to a
    /// multiply by -1.
    fn parse_simple(&mut self) -> Result<()> {
        let t = self.next()?;
        let negated = t.is(TokenKind::Unknown) && t.text == "-";
        if negated {
            self.prog.emit(Op::Push, Some(Value::Int(-1)), t.pos)?;
        } else {
            self.sc.push(t.clone());
        }
        self.parse_term()?;
        if negated {
            self.prog.emit(Op::Mul, None, t.pos)?;
        }
        loop {
            let t = self.next()?;
            let op = if t.is(TokenKind::Plus) {
                Op::Add
            } else if t.is(TokenKind::Unknown) && t.text == "-" {
                Op::Sub
            } else {
                self.sc.push(t);
                return Ok(());
            };
            self.parse_term()?;
            self.prog.emit(op, None, t.pos)?;
        }
    }

    /// term := factor (('*'|'/') factor)*
    fn parse_term(&mut self) -> Result<()> {
        self.parse_factor()?;
        loop {
            let t = self.next()?;
            let op = if t.is(TokenKind::Unknown) && t.text == "*" {
                Op::Mul
            } else if t.is(TokenKind::Unknown) && t.text == "/" {
                Op::Div
            } else {
                self.sc.push(t);
                return Ok(());
            };
            self.parse_factor()?;
            self.prog.emit(op, None, t.pos)?;
        }
    }

    /// factor := '(' expr ')' | NUM | STR | NAME ['(' args ')']
    fn parse_factor(&mut self) -> Result<()> {
        let t = self.next()?;
        match t.kind {
            TokenKind::ParenL => {
                self.parse_expr()?;
                self.expect(TokenKind::ParenR, "')'")?;
                Ok(())
            }
            TokenKind::Num => {
                let n: i32 = t.text.parse().map_err(|_| SorrelError(format!(
                    "parse error at {}: bad number literal '{}'", t.pos, t.text)))?;
                self.prog.emit(Op::Push, Some(Value::Int(n)), t.pos)?;
                Ok(())
            }
            TokenKind::Str => {
                self.prog.emit(Op::Push, Some(Value::Str(t.text)), t.pos)?;
                Ok(())
            }
            TokenKind::Name => {
                let t2 = self.next()?;
                if t2.is(TokenKind::ParenL) {
                    self.parse_call(t)
                } else {
                    self.sc.push(t2);
                    self.prog.emit(Op::Push, Some(Value::Var(t.text)), t.pos)?;
                    Ok(())
                }
            }
            _ => Err(SorrelError(format!(
                "parse error at {}: unexpected token {}", t.pos, t))),
        }
    }

    /// Arguments compile left to right, each leaving one value; FCALL
    /// carries the pending-call descriptor.
    fn parse_call(&mut self, name: Token) -> Result<()> {
        let mut argc = 0usize;
        let t = self.next()?;
        if !t.is(TokenKind::ParenR) {
            self.sc.push(t);
            loop {
                self.parse_expr()?;
                argc += 1;
                let sep = self.next()?;
                if sep.is(TokenKind::Comma) {
                    continue;
                }
                if sep.is(TokenKind::ParenR) {
                    break;
                }
                return Err(SorrelError(format!(
                    "parse error at {}: expected ',' or ')' in argument list", sep.pos)));
            }
        }
        self.prog.emit(Op::Fcall, Some(Value::FnCall { name: name.text, argc }), name.pos)?;
        Ok(())
    }

    /// A statement ends at EOL, ';', EOF, or right before a block
    /// keyword (which its block parser consumes).
    fn end_statement(&mut self) -> Result<()> {
        let t = self.next()?;
        match t.kind {
            TokenKind::Eol | TokenKind::Semi => Ok(()),
            TokenKind::Eof => {
                self.sc.push(t);
                Ok(())
            }
            TokenKind::Name if t.text == "end" || t.text == "else" => {
                self.sc.push(t);
                Ok(())
            }
            _ => Err(SorrelError(format!(
                "parse error at {}: expected end of statement, found {}", t.pos, t))),
        }
    }

    /// Next token; an error-tagged scan token aborts the compile here.
    fn next(&mut self) -> Result<Token> {
        let t = self.sc.next()?;
        if t.is(TokenKind::Error) {
            let what = match t.error {
                Some(e) => e.to_string(),
                None => "scan error".to_string(),
            };
            return Err(SorrelError(format!("scan error at {}: {}", t.pos, what)));
        }
        Ok(t)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        let t = self.next()?;
        if t.kind != kind {
            return Err(SorrelError(format!(
                "parse error at {}: expected {}, found {}", t.pos, what, t)));
        }
        Ok(t)
    }
}

fn cmp_op(t: &Token) -> Option<Op> {
    match t.kind {
        TokenKind::Lt => Some(Op::Lt),
        TokenKind::Gt => Some(Op::Gt),
        TokenKind::Unknown => match t.text.as_str() {
            "==" => Some(Op::Eq),
            "!=" => Some(Op::Ne),
            "<=" => Some(Op::Le),
            ">=" => Some(Op::Ge),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorrel_icode::FnKind;

    fn ops(src: &str) -> Vec<Op> {
        compile(src).unwrap().program.iter().map(|i| i.op).collect()
    }

    fn operand(src: &str, addr: usize) -> Value {
        compile(src).unwrap().program[addr].operand.clone().unwrap()
    }

    #[test]
    fn expression_statement_pops_its_value() {
        assert_eq!(ops("1 + 2"), vec![Op::Push, Op::Push, Op::Add, Op::Pop]);
    }

    #[test]
    fn assignment_pushes_var_then_value() {
        let out = compile("x = 5").unwrap();
        assert_eq!(out.program[0].operand, Some(Value::Var("x".into())));
        assert_eq!(out.program[1].operand, Some(Value::Int(5)));
        assert_eq!(out.program[2].op, Op::Assign);
        assert_eq!(out.program.len(), 3);
    }

    #[test]
    fn precedence_multiplicative_over_additive() {
        // 1 + 2 * 3 => 1 2 3 MUL ADD
        assert_eq!(ops("1 + 2 * 3"), vec![Op::Push, Op::Push, Op::Push, Op::Mul, Op::Add, Op::Pop]);
    }

    #[test]
    fn comparison_binds_loosest() {
        // 1 + 2 == 3 => 1 2 ADD 3 EQ
        assert_eq!(ops("1 + 2 == 3"), vec![Op::Push, Op::Push, Op::Add, Op::Push, Op::Eq, Op::Pop]);
    }

    #[test]
    fn unary_minus_is_multiply_by_negative_one() {
        let out = compile("-2 + 3").unwrap();
        assert_eq!(out.program[0].operand, Some(Value::Int(-1)));
        assert_eq!(out.program[1].operand, Some(Value::Int(2)));
        assert_eq!(out.program[2].op, Op::Mul);
        assert_eq!(out.program[4].op, Op::Add);
    }

    #[test]
    fn if_jz_skips_block() {
        // if 1; x = 2; end
        let out = compile("if 1; x = 2; end").unwrap();
        // 0 PUSH 1, 1 JZ, 2 PUSH x, 3 PUSH 2, 4 ASSIGN
        assert_eq!(out.program[1].op, Op::Jz);
        assert_eq!(out.program[1].operand, Some(Value::Int(4))); // 1 -> 5
        assert_eq!(out.program.len(), 5);
    }

    #[test]
    fn if_else_branches_converge() {
        let out = compile("if 1; x = 2; else; x = 3; end").unwrap();
        // 0 PUSH 1, 1 JZ ->6, 2..4 then-branch, 5 JMP ->9, 6..8 else-branch
        assert_eq!(out.program[1].op, Op::Jz);
        assert_eq!(out.program[1].operand, Some(Value::Int(5)));
        assert_eq!(out.program[5].op, Op::Jmp);
        assert_eq!(out.program[5].operand, Some(Value::Int(4)));
        assert_eq!(out.program.len(), 9);
    }

    #[test]
    fn while_jumps_backward() {
        let out = compile("while x; x = x - 1; end").unwrap();
        // 0 PUSH x, 1 JZ, 2 PUSH x, 3 PUSH x, 4 PUSH 1, 5 SUB, 6 ASSIGN, 7 JMP
        assert_eq!(out.program[7].op, Op::Jmp);
        assert_eq!(out.program[7].operand, Some(Value::Int(-7)));
        assert_eq!(out.program[1].operand, Some(Value::Int(7))); // 1 -> 8
    }

    #[test]
    fn func_emits_guard_and_return_jump() {
        let out = compile("func f(a, b)\nx = 1\nend").unwrap();
        // 0 JMP over body, 1 PUSH x, 2 PUSH 1, 3 ASSIGN, 4 JST
        assert_eq!(out.program[0].op, Op::Jmp);
        assert_eq!(out.program[0].operand, Some(Value::Int(5)));
        assert_eq!(out.program[4].op, Op::Jst);
        assert_eq!(out.funcs.len(), 1);
        let f = &out.funcs[0];
        assert_eq!(f.name, "f");
        assert_eq!(f.arity, 2);
        match f.kind {
            FnKind::Interp { start, end } => assert_eq!((start, end), (1, 4)),
            _ => panic!("expected interpreted function"),
        }
    }

    #[test]
    fn call_compiles_args_left_to_right() {
        let out = compile("f(1, 2, 3)").unwrap();
        assert_eq!(out.program[0].operand, Some(Value::Int(1)));
        assert_eq!(out.program[1].operand, Some(Value::Int(2)));
        assert_eq!(out.program[2].operand, Some(Value::Int(3)));
        assert_eq!(
            out.program[3].operand,
            Some(Value::FnCall { name: "f".into(), argc: 3 })
        );
        assert_eq!(out.program[4].op, Op::Pop);
    }

    #[test]
    fn bare_name_pushes_var_reference() {
        assert_eq!(operand("x", 0), Value::Var("x".into()));
    }

    #[test]
    fn literals_round_trip_through_source_form() {
        for v in [Value::Int(42), Value::Str("a\nb \"quoted\"".into())] {
            let src = format!("x = {}", v.to_literal());
            let out = compile(&src).unwrap();
            assert_eq!(out.program[1].operand, Some(v));
        }
    }

    #[test]
    fn syntax_error_is_positioned() {
        let err = compile("x = )").unwrap_err();
        assert!(err.0.contains("parse error at line 1, col 5"), "{}", err.0);
    }

    #[test]
    fn stray_end_is_rejected() {
        let err = compile("end").unwrap_err();
        assert!(err.0.contains("unexpected 'end'"), "{}", err.0);
    }

    #[test]
    fn unterminated_while_is_rejected() {
        let err = compile("while 1\nx = 1\n").unwrap_err();
        assert!(err.0.contains("unterminated 'while' block"), "{}", err.0);
    }

    #[test]
    fn scan_error_aborts_compile() {
        let err = compile("x = \"oops").unwrap_err();
        assert!(err.0.contains("unterminated string literal"), "{}", err.0);
    }

    #[test]
    fn output_cap_is_fatal() {
        let out = compile_into("1 + 2 + 3", Program::with_max_output(3));
        let err = out.unwrap_err();
        assert!(err.0.contains("exceeds 3 instructions"), "{}", err.0);
    }

    #[test]
    fn compile_into_appends() {
        let first = compile("x = 1").unwrap();
        let base = first.program.len();
        let second = compile_into("y = 2", first.program).unwrap();
        assert_eq!(second.program[base].operand, Some(Value::Var("y".into())));
    }
}
