//! 256-entry byte classifier, built once on first use.
use once_cell::sync::Lazy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    Unknown,
    Eol,
    Space,
    Digit,
    Alpha,
    Op,
    Delim,
    Quote,
}

pub const OPERATORS: &[u8] = b"~!@%^&*-+=|?/<>";
pub const DELIMITERS: &[u8] = b"()[]{}.:,;";
pub const QUOTES: &[u8] = b"\"'`";

static CC_TABLE: Lazy<[CharClass; 256]> = Lazy::new(build_table);

fn build_table() -> [CharClass; 256] {
    let mut table = [CharClass::Unknown; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let c = i as u8;
        *slot = if c == b'\r' || c == b'\n' {
            CharClass::Eol
        } else if c.is_ascii_digit() {
            CharClass::Digit
        } else if c.is_ascii_alphabetic() {
            CharClass::Alpha
        } else if c.is_ascii_whitespace() {
            CharClass::Space
        } else if OPERATORS.contains(&c) {
            CharClass::Op
        } else if QUOTES.contains(&c) {
            CharClass::Quote
        } else if DELIMITERS.contains(&c) {
            CharClass::Delim
        } else {
            CharClass::Unknown
        };
    }
    table
}

/// Classify a single input byte. Pure function; EOF is not a byte and is
/// modeled by the scanner as the end of its source.
pub fn class_of(c: u8) -> CharClass {
    CC_TABLE[c as usize]
}
