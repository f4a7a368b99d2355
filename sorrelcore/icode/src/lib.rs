//! Icode for Sorrel: tagged values, opcodes, the flat instruction
//! sequence, and function records shared by the compiler and executor.
use std::fmt;

use sorrel_common::{Pos, Result, SorrelError};

/// Default cap on emitted instructions. Hosts can lower or raise it with
/// [`Program::with_max_output`].
pub const DEFAULT_MAX_OUTPUT: usize = 65536;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(String),
    /// Unresolved variable reference; the executor dereferences it
    /// against the variable table before use.
    Var(String),
    /// Compile-time operand of an FCALL: a pending call descriptor.
    FnCall { name: String, argc: usize },
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Var(_) => "var",
            Value::FnCall { .. } => "fcall",
        }
    }

    /// Render the value as source text the scanner would accept back.
    /// Ints render as digits, strings as a quoted, escaped literal.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Str(s) => format!("\"{}\"", sorrel_common::escape_string(s)),
            other => other.to_string(),
        }
    }

    /// Two values share a type tag. Assignment uses this to forbid
    /// retyping an existing variable.
    pub fn same_type(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Var(name) => write!(f, "{}", name),
            Value::FnCall { name, argc } => write!(f, "{}/{}", name, argc),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    Push,
    Pop,
    Fcall,
    Add,
    Sub,
    Mul,
    Div,
    Assign,
    Eq,
    Ne,
    Jmp,
    Jz,
    /// Jump by the offset found on top of the stack.
    Jst,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Nop => "NOP", Op::Push => "PUSH", Op::Pop => "POP",
            Op::Fcall => "FCALL", Op::Add => "ADD", Op::Sub => "SUB",
            Op::Mul => "MUL", Op::Div => "DIV", Op::Assign => "ASSIGN",
            Op::Eq => "EQ", Op::Ne => "NE", Op::Jmp => "JMP", Op::Jz => "JZ",
            Op::Jst => "JST", Op::Lt => "LT", Op::Gt => "GT",
            Op::Le => "LE", Op::Ge => "GE",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: Op,
    pub operand: Option<Value>,
    /// Position in the program; assigned at emission and stable (only
    /// jump operands are patched afterwards, never instruction order).
    pub addr: usize,
    /// Position of the originating token, for runtime diagnostics.
    pub pos: Pos,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(v) => write!(f, "{:4} {} {}", self.addr, self.op, v.to_literal()),
            None => write!(f, "{:4} {}", self.addr, self.op),
        }
    }
}

/// The append-only instruction sequence. Addresses are indexes into it.
#[derive(Debug, Clone)]
pub struct Program {
    code: Vec<Instruction>,
    max_output: usize,
}

impl Default for Program {
    fn default() -> Self { Self::new() }
}

impl Program {
    pub fn new() -> Self {
        Self { code: Vec::new(), max_output: DEFAULT_MAX_OUTPUT }
    }

    pub fn with_max_output(max_output: usize) -> Self {
        Self { code: Vec::new(), max_output }
    }

    /// Next address to be emitted.
    pub fn here(&self) -> usize { self.code.len() }

    pub fn len(&self) -> usize { self.code.len() }
    pub fn is_empty(&self) -> bool { self.code.is_empty() }

    pub fn get(&self, addr: usize) -> Option<&Instruction> { self.code.get(addr) }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> { self.code.iter() }

    /// Append an instruction, returning its address. Exceeding the
    /// output cap is a fatal compile error, not a partial result.
    pub fn emit(&mut self, op: Op, operand: Option<Value>, pos: Pos) -> Result<usize> {
        if self.code.len() >= self.max_output {
            return Err(SorrelError(format!(
                "compile error at {}: program exceeds {} instructions", pos, self.max_output)));
        }
        let addr = self.code.len();
        self.code.push(Instruction { op, operand, addr, pos });
        Ok(addr)
    }

    /// Patch the relative offset of an already-emitted jump.
    pub fn patch_jump(&mut self, addr: usize, target: usize) {
        let offset = target as i64 - addr as i64;
        self.code[addr].operand = Some(Value::Int(offset as i32));
    }
}

impl std::ops::Index<usize> for Program {
    type Output = Instruction;
    fn index(&self, addr: usize) -> &Instruction { &self.code[addr] }
}

pub type NativeFn = fn(&Function, &[Value], &mut Value) -> Result<()>;

#[derive(Clone)]
pub enum FnKind {
    /// Host-supplied callable.
    Native(NativeFn),
    /// Span of the shared instruction stream: `start` is the first body
    /// instruction, `end` the address of the terminal return jump.
    Interp { start: usize, end: usize },
}

#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub arity: usize,
    pub kind: FnKind,
}

impl Function {
    pub fn native(name: &str, f: NativeFn) -> Self {
        Self { name: name.to_string(), arity: 0, kind: FnKind::Native(f) }
    }
    pub fn interp(name: String, arity: usize, start: usize, end: usize) -> Self {
        Self { name, arity, kind: FnKind::Interp { start, end } }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FnKind::Native(_) => write!(f, "<native {}>", self.name),
            FnKind::Interp { start, end } => write!(f, "<func {} @{}..{}>", self.name, start, end),
        }
    }
}
