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

//! Stack-machine executor for Sorrel icode. One value stack, one shared
//! variable table, a flat function registry, and a cursor over the
//! instruction stream. Jumps are relative signed offsets; the step
//! function applies them directly as the next cursor value.
use std::collections::HashMap;

use sorrel_common::{Result, SorrelError};
use sorrel_icode::{FnKind, Function, Instruction, Op, Program, Value};

/// Flat function registry: linear scan, exact case-sensitive name, first
/// match wins. Hosts register natives before running; compiled function
/// definitions are merged in afterwards.
#[derive(Default)]
pub struct Funcs {
    list: Vec<Function>,
}

impl Funcs {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn add(&mut self, f: Function) {
        self.list.push(f);
    }

    pub fn find(&self, name: &str) -> Option<&Function> {
        self.list.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

pub struct Exec {
    program: Program,
    stack: Vec<Value>,
    vars: HashMap<String, Value>,
    funcs: Funcs,
    ip: usize,
}

impl Exec {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            stack: Vec::new(),
            vars: HashMap::new(),
            funcs: Funcs::new(),
            ip: 0,
        }
    }

    pub fn register(&mut self, f: Function) {
        self.funcs.add(f);
    }

    pub fn register_all(&mut self, fs: Vec<Function>) {
        for f in fs {
            self.funcs.add(f);
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Swap in a longer program while keeping variables, functions and
    /// the stack. The REPL grows one instruction stream this way.
    pub fn set_program(&mut self, program: Program) {
        self.program = program;
    }

    /// Current value of a variable, if assigned.
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Drop everything pushed above `len`. Hosts use this to discard the
    /// partial operands a faulted statement left behind.
    pub fn truncate_stack(&mut self, len: usize) {
        self.stack.truncate(len);
    }

    pub fn run(&mut self) -> Result<()> {
        self.run_from(0)
    }

    /// Execute from `start` until the cursor walks off the end of the
    /// program or an instruction faults.
    pub fn run_from(&mut self, start: usize) -> Result<()> {
        self.ip = start;
        while self.ip < self.program.len() {
            self.step()?;
        }
        Ok(())
    }

    /// Execute the instruction under the cursor and advance it.
    pub fn step(&mut self) -> Result<()> {
        let ins = self.program[self.ip].clone();
        let mut next = self.ip as i64 + 1;

        match ins.op {
            Op::Nop => {}
            Op::Push => {
                let v = match &ins.operand {
                    Some(v) => v.clone(),
                    None => return Err(self.fault(&ins, "PUSH without an operand")),
                };
                self.stack.push(v);
            }
            Op::Pop => {
                self.pop(&ins)?;
            }
            Op::Add | Op::Sub | Op::Mul | Op::Div
            | Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                self.binary(&ins)?;
            }
            Op::Assign => self.assign(&ins)?,
            Op::Jmp => next = self.ip as i64 + self.offset(&ins)?,
            Op::Jz => {
                let v = self.pop_value(&ins)?;
                let falsy = matches!(v, Value::Int(0) | Value::Bool(false) | Value::Null);
                if falsy {
                    next = self.ip as i64 + self.offset(&ins)?;
                }
            }
            Op::Jst => {
                let v = self.pop(&ins)?;
                let Value::Int(off) = v else {
                    return Err(self.fault(&ins, "JST needs an int offset on the stack"));
                };
                next = self.ip as i64 + off as i64;
            }
            Op::Fcall => self.fcall(&ins, &mut next)?,
        }

        if next < 0 || next as usize > self.program.len() {
            return Err(self.fault(&ins, &format!("jump out of range to {}", next)));
        }
        self.ip = next as usize;
        Ok(())
    }

    fn fault(&self, ins: &Instruction, msg: &str) -> SorrelError {
        SorrelError(format!("runtime error at {}: {} ({})", ins.pos, msg, ins.op))
    }

    /// Relative jump offset stored in the instruction's operand.
    fn offset(&self, ins: &Instruction) -> Result<i64> {
        match &ins.operand {
            Some(Value::Int(off)) => Ok(*off as i64),
            _ => Err(self.fault(ins, "jump without an int offset operand")),
        }
    }

    fn pop(&mut self, ins: &Instruction) -> Result<Value> {
        match self.stack.pop() {
            Some(v) => Ok(v),
            None => Err(self.fault(ins, "stack underflow")),
        }
    }

    /// Pop and resolve variable references against the variable table.
    fn pop_value(&mut self, ins: &Instruction) -> Result<Value> {
        let v = self.pop(ins)?;
        self.deref(v, ins)
    }

    fn deref(&self, v: Value, ins: &Instruction) -> Result<Value> {
        match v {
            Value::Var(name) => match self.vars.get(&name) {
                Some(v) => Ok(v.clone()),
                None => Err(self.fault(ins, &format!("undefined variable '{}'", name))),
            },
            other => Ok(other),
        }
    }

    fn want_int(&self, v: Value, ins: &Instruction) -> Result<i32> {
        match v {
            Value::Int(n) => Ok(n),
            other => Err(self.fault(ins, &format!("expected int, got {}", other.type_name()))),
        }
    }

    /// Two-operand ops see popped, dereferenced values; ADD also accepts
    /// string + string and string + int. Everything else is int-only.
    fn binary(&mut self, ins: &Instruction) -> Result<()> {
        let b = self.pop_value(ins)?;
        let a = self.pop_value(ins)?;
        let v = match ins.op {
            Op::Add => match (a, b) {
                (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_add(y)),
                (Value::Str(x), Value::Str(y)) => Value::Str(x + &y),
                (Value::Str(x), Value::Int(y)) => Value::Str(format!("{}{}", x, y)),
                (a, b) => {
                    return Err(self.fault(ins, &format!(
                        "cannot add {} and {}", a.type_name(), b.type_name())));
                }
            },
            Op::Sub => Value::Int(self.want_int(a, ins)?.wrapping_sub(self.want_int(b, ins)?)),
            Op::Mul => Value::Int(self.want_int(a, ins)?.wrapping_mul(self.want_int(b, ins)?)),
            Op::Div => {
                let x = self.want_int(a, ins)?;
                let y = self.want_int(b, ins)?;
                if y == 0 {
                    return Err(self.fault(ins, "division by zero"));
                }
                Value::Int(x.wrapping_div(y))
            }
            Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                let x = self.want_int(a, ins)?;
                let y = self.want_int(b, ins)?;
                let r = match ins.op {
                    Op::Eq => x == y,
                    Op::Ne => x != y,
                    Op::Lt => x < y,
                    Op::Gt => x > y,
                    Op::Le => x <= y,
                    _ => x >= y,
                };
                Value::Int(r as i32)
            }
            _ => return Err(self.fault(ins, "not a two-operand instruction")),
        };
        self.stack.push(v);
        Ok(())
    }

    /// Pop value, pop assignee. The assignee stays a Var reference; the
    /// value is resolved. A variable keeps its type tag for life, and the
    /// assigned value is pushed back as the statement's result.
    fn assign(&mut self, ins: &Instruction) -> Result<()> {
        let value = self.pop_value(ins)?;
        let target = self.pop(ins)?;
        let Value::Var(name) = target else {
            return Err(self.fault(ins, "assignment target is not a variable"));
        };
        if let Some(existing) = self.vars.get(&name) {
            if !existing.same_type(&value) {
                return Err(self.fault(ins, &format!(
                    "cannot retype variable '{}' from {} to {}",
                    name, existing.type_name(), value.type_name())));
            }
        }
        self.vars.insert(name, value.clone());
        self.stack.push(value);
        Ok(())
    }

    /// Pop argc values back into left-to-right order, resolved. Natives
    /// get the slice and an out-value (they decide their own arity);
    /// interpreted calls check arity, park a Null call result under the
    /// return offset the terminal JST will pop, and jump into the body.
    fn fcall(&mut self, ins: &Instruction, next: &mut i64) -> Result<()> {
        let Some(Value::FnCall { name, argc }) = ins.operand.clone() else {
            return Err(self.fault(ins, "FCALL without a call descriptor"));
        };
        let f = match self.funcs.find(&name) {
            Some(f) => f.clone(),
            None => return Err(self.fault(ins, &format!("unknown function '{}'", name))),
        };
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.pop_value(ins)?);
        }
        args.reverse();

        match f.kind {
            FnKind::Native(call) => {
                let mut ret = Value::Null;
                call(&f, &args, &mut ret)?;
                self.stack.push(ret);
            }
            FnKind::Interp { start, end } => {
                if f.arity != argc {
                    return Err(self.fault(ins, &format!(
                        "function '{}' takes {} arguments, got {}", name, f.arity, argc)));
                }
                self.stack.push(Value::Null);
                self.stack.push(Value::Int((self.ip as i64 + 1 - end as i64) as i32));
                *next = start as i64;
            }
        }
        Ok(())
    }
}
