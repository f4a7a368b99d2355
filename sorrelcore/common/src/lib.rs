//! Shared error type and source positions for Sorrel.

/// Source position of a token or instruction. Rows and columns are
/// 0-based internally; diagnostics add 1 when rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos { pub row: u32, pub col: u32 }
impl Pos { pub fn new(row: u32, col: u32) -> Self { Self { row, col } } }

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, col {}", self.row + 1, self.col + 1)
    }
}

#[derive(Debug)]
pub struct SorrelError(pub String);
impl std::fmt::Display for SorrelError { fn fmt(&self, f:&mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) } }
impl std::error::Error for SorrelError {}

pub type Result<T> = std::result::Result<T, SorrelError>;

/// Escape a string the way a C-formatted literal would, for diagnostics
/// and token dumps. Returns a fresh String; nothing is cached.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\'' | '"' | '\\' => { out.push('\\'); out.push(c); }
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
