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
//! Pull-based scanner for Sorrel with token pushback and row/col tracking
use sorrel_common::{escape_string, Pos, Result};

pub mod charclass;
pub use charclass::{class_of, CharClass};

/// A number longer than this is returned as an error token.
pub const MAX_NUM_LEN: usize = 9;
/// A name longer than this is returned as an error token.
pub const MAX_NAME_LEN: usize = 64;
/// A string literal longer than this is truncated and returned as an
/// error token.
pub const MAX_STRING_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Unknown,
    Error,
    Eol,
    Eof,
    Num,
    Name,
    Equal,
    Plus,
    ParenL,
    ParenR,
    Comma,
    Semi,
    Str,
    Lt,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    NumTooLong,
    NameTooLong,
    StrTooLong,
    UnterminatedStr,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ScanError::NumTooLong => "number literal too long",
            ScanError::NameTooLong => "name too long",
            ScanError::StrTooLong => "string literal too long",
            ScanError::UnterminatedStr => "unterminated string literal",
        };
        write!(f, "{}", msg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub error: Option<ScanError>,
    pub pos: Pos,
}

impl Token {
    fn new(kind: TokenKind, text: String, pos: Pos) -> Self {
        Self { kind, text, error: None, pos }
    }

    pub fn is(&self, kind: TokenKind) -> bool { self.kind == kind }

    /// True for the tokens that separate statements.
    pub fn is_separator(&self) -> bool {
        matches!(self.kind, TokenKind::Eol | TokenKind::Semi)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{:?} '{}'>", self.kind, escape_string(&self.text))
    }
}

/// Pull scanner over a byte source with one byte of lookahead and a
/// multi-level token pushback stack.
pub struct Scanner<'a> {
    src: &'a [u8],
    cursor: usize,
    cur: Option<u8>,
    row: u32,
    col: u32,
    primed: bool,
    pending_eol: Option<u8>,
    pushback: Vec<Token>,
    current: Token,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut s = Self {
            src: src.as_bytes(),
            cursor: 0,
            cur: None,
            row: 0,
            col: 0,
            primed: false,
            pending_eol: None,
            pushback: Vec::new(),
            current: Token::new(TokenKind::Unknown, String::new(), Pos::default()),
        };
        s.advance(); // prime the lookahead
        s
    }

    /// Last token handed out, without advancing.
    pub fn current(&self) -> &Token { &self.current }

    /// Un-consume a token; served again (LIFO) by the next `next()`.
    pub fn push(&mut self, token: Token) {
        self.pushback.push(token);
    }

    /// Produce the next token. Idempotent at end of input: every call
    /// past the end returns another Eof token.
    pub fn next(&mut self) -> Result<Token> {
        if let Some(tok) = self.pushback.pop() {
            self.current = tok.clone();
            return Ok(tok);
        }

        self.skip_whitespace();

        let tok = match self.cur {
            None => Token::new(TokenKind::Eof, String::new(), self.pos()),
            Some(c) => match class_of(c) {
                CharClass::Eol => self.scan_eol(),
                CharClass::Digit => self.scan_num(),
                CharClass::Alpha => self.scan_name(),
                CharClass::Op => self.scan_op(),
                CharClass::Delim => self.scan_delim(),
                CharClass::Quote => self.scan_str(),
                _ if c == b'_' => self.scan_name(),
                _ => {
                    let text = String::from_utf8_lossy(&[c]).into_owned();
                    let tok = Token::new(TokenKind::Unknown, text, self.pos());
                    self.advance();
                    tok
                }
            },
        };

        self.current = tok.clone();
        Ok(tok)
    }

    fn pos(&self) -> Pos { Pos::new(self.row, self.col) }

    /// Advance the lookahead one byte, maintaining row/col. Column
    /// resets and row bumps exactly once per logical EOL (`\r`, `\n`,
    /// or `\r\n`) already consumed. `pending_eol` remembers which byte
    /// opened the pending EOL: only a `\n` directly after `\r` extends
    /// the same logical EOL, every other byte starts the next row.
    fn advance(&mut self) {
        self.cur = self.src.get(self.cursor).copied();
        let Some(c) = self.cur else { return };
        self.cursor += 1;

        if self.primed {
            self.col += 1;
        } else {
            self.primed = true;
        }
        if c == b'\n' && self.pending_eol == Some(b'\r') {
            self.pending_eol = Some(b'\n');
            return;
        }
        if self.pending_eol.is_some() {
            self.row += 1;
            self.col = 0;
        }
        self.pending_eol = match c {
            b'\r' | b'\n' => Some(c),
            _ => None,
        };
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.cur {
            if class_of(c) != CharClass::Space {
                break;
            }
            self.advance();
        }
    }

    /// `\r`, optionally followed by `\n`, or a lone `\n`: one token.
    fn scan_eol(&mut self) -> Token {
        let pos = self.pos();
        let mut text = String::new();
        if self.cur == Some(b'\r') {
            text.push('\r');
            self.advance();
            if self.cur == Some(b'\n') {
                text.push('\n');
                self.advance();
            }
        } else {
            text.push('\n');
            self.advance();
        }
        Token::new(TokenKind::Eol, text, pos)
    }

    fn scan_num(&mut self) -> Token {
        let pos = self.pos();
        let mut bytes = Vec::new();
        while let Some(c) = self.cur {
            if class_of(c) != CharClass::Digit {
                break;
            }
            bytes.push(c);
            self.advance();
        }
        let mut tok = Token::new(TokenKind::Num, String::from_utf8_lossy(&bytes).into_owned(), pos);
        if tok.text.len() > MAX_NUM_LEN {
            tok.kind = TokenKind::Error;
            tok.error = Some(ScanError::NumTooLong);
        }
        tok
    }

    fn scan_name(&mut self) -> Token {
        let pos = self.pos();
        let mut bytes = Vec::new();
        while let Some(c) = self.cur {
            if !(c.is_ascii_alphanumeric() || c == b'_') {
                break;
            }
            bytes.push(c);
            self.advance();
        }
        let mut tok = Token::new(TokenKind::Name, String::from_utf8_lossy(&bytes).into_owned(), pos);
        if tok.text.len() > MAX_NAME_LEN {
            tok.kind = TokenKind::Error;
            tok.error = Some(ScanError::NameTooLong);
        }
        tok
    }

    /// Maximal run of operator-class bytes. Only the single-character
    /// runs `+ = < >` have their own kind; everything else (including
    /// `-`, `*`, `/` and the two-character comparisons) comes out as
    /// Unknown and is recognized by the compiler from its text.
    fn scan_op(&mut self) -> Token {
        let pos = self.pos();
        let mut text = String::new();
        while let Some(c) = self.cur {
            if class_of(c) != CharClass::Op {
                break;
            }
            text.push(c as char);
            self.advance();
        }
        let kind = match text.as_str() {
            "+" => TokenKind::Plus,
            "=" => TokenKind::Equal,
            "<" => TokenKind::Lt,
            ">" => TokenKind::Gt,
            _ => TokenKind::Unknown,
        };
        Token::new(kind, text, pos)
    }

    fn scan_delim(&mut self) -> Token {
        let c = self.cur.unwrap_or(0);
        let kind = match c {
            b'(' => TokenKind::ParenL,
            b')' => TokenKind::ParenR,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semi,
            _ => TokenKind::Unknown,
        };
        let tok = Token::new(kind, (c as char).to_string(), self.pos());
        self.advance();
        tok
    }

    /// String literal delimited by the opening quote character, with
    /// `\n`, `\r`, `\b` escapes (any other escaped byte is itself).
    /// Content is gathered as raw bytes so multi-byte UTF-8 sequences
    /// pass through intact; invalid sequences become U+FFFD.
    fn scan_str(&mut self) -> Token {
        let pos = self.pos();
        let quote = self.cur.unwrap_or(b'"');
        self.advance();

        let mut bytes = Vec::new();
        let mut error = None;
        loop {
            match self.cur {
                None => {
                    error = Some(ScanError::UnterminatedStr);
                    break;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    let Some(esc) = self.cur else {
                        error = Some(ScanError::UnterminatedStr);
                        break;
                    };
                    let decoded = match esc {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b'b' => 0x08,
                        other => other,
                    };
                    if bytes.len() < MAX_STRING_LEN {
                        bytes.push(decoded);
                    } else if error.is_none() {
                        error = Some(ScanError::StrTooLong);
                    }
                    self.advance();
                }
                Some(c) => {
                    if bytes.len() < MAX_STRING_LEN {
                        bytes.push(c);
                    } else if error.is_none() {
                        error = Some(ScanError::StrTooLong);
                    }
                    self.advance();
                }
            }
        }

        let mut tok = Token::new(TokenKind::Str, String::from_utf8_lossy(&bytes).into_owned(), pos);
        if let Some(e) = error {
            tok.kind = TokenKind::Error;
            tok.error = Some(e);
        }
        tok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut sc = Scanner::new(src);
        let mut out = Vec::new();
        loop {
            let t = sc.next().unwrap();
            let eof = t.is(TokenKind::Eof);
            out.push(t.kind);
            if eof {
                break;
            }
        }
        out
    }

    #[test]
    fn scans_assignment_line() {
        let mut sc = Scanner::new("x = 5");
        let x = sc.next().unwrap();
        assert_eq!(x.kind, TokenKind::Name);
        assert_eq!(x.text, "x");
        let eq = sc.next().unwrap();
        assert_eq!(eq.kind, TokenKind::Equal);
        let n = sc.next().unwrap();
        assert_eq!(n.kind, TokenKind::Num);
        assert_eq!(n.text, "5");
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn eof_is_idempotent() {
        let mut sc = Scanner::new("");
        for _ in 0..3 {
            assert_eq!(sc.next().unwrap().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn operator_runs() {
        let mut sc = Scanner::new("a == b != c <= 1");
        let mut ops = Vec::new();
        loop {
            let t = sc.next().unwrap();
            if t.is(TokenKind::Eof) {
                break;
            }
            if t.is(TokenKind::Unknown) {
                ops.push(t.text);
            }
        }
        assert_eq!(ops, vec!["==", "!=", "<="]);
    }

    #[test]
    fn single_char_ops_have_own_kind() {
        assert_eq!(
            kinds("a + b < c > d = e"),
            vec![
                TokenKind::Name, TokenKind::Plus, TokenKind::Name,
                TokenKind::Lt, TokenKind::Name, TokenKind::Gt,
                TokenKind::Name, TokenKind::Equal, TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn minus_and_star_are_unknown_runs() {
        let mut sc = Scanner::new("1 - 2 * 3");
        sc.next().unwrap();
        let minus = sc.next().unwrap();
        assert_eq!(minus.kind, TokenKind::Unknown);
        assert_eq!(minus.text, "-");
        sc.next().unwrap();
        let star = sc.next().unwrap();
        assert_eq!(star.kind, TokenKind::Unknown);
        assert_eq!(star.text, "*");
    }

    #[test]
    fn rows_and_cols() {
        let mut sc = Scanner::new("ab\ncd");
        let ab = sc.next().unwrap();
        assert_eq!((ab.pos.row, ab.pos.col), (0, 0));
        let eol = sc.next().unwrap();
        assert_eq!(eol.kind, TokenKind::Eol);
        let cd = sc.next().unwrap();
        assert_eq!(cd.text, "cd");
        assert_eq!((cd.pos.row, cd.pos.col), (1, 0));
    }

    #[test]
    fn crlf_is_one_eol() {
        let mut sc = Scanner::new("a\r\nb");
        sc.next().unwrap();
        let eol = sc.next().unwrap();
        assert_eq!(eol.kind, TokenKind::Eol);
        assert_eq!(eol.text, "\r\n");
        let b = sc.next().unwrap();
        assert_eq!((b.pos.row, b.pos.col), (1, 0));
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn blank_lines_advance_rows() {
        let mut sc = Scanner::new("a\n\nb");
        sc.next().unwrap();
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eol);
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eol);
        let b = sc.next().unwrap();
        assert_eq!(b.text, "b");
        assert_eq!((b.pos.row, b.pos.col), (2, 0));
    }

    #[test]
    fn blank_crlf_lines_advance_rows() {
        let mut sc = Scanner::new("a\r\n\r\nb");
        sc.next().unwrap();
        let first = sc.next().unwrap();
        assert_eq!((first.kind, first.text.as_str()), (TokenKind::Eol, "\r\n"));
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eol);
        let b = sc.next().unwrap();
        assert_eq!((b.pos.row, b.pos.col), (2, 0));
    }

    #[test]
    fn bare_cr_lines_advance_rows() {
        let mut sc = Scanner::new("a\r\rb");
        sc.next().unwrap();
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eol);
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eol);
        let b = sc.next().unwrap();
        assert_eq!((b.pos.row, b.pos.col), (2, 0));
    }

    #[test]
    fn pushback_is_lifo() {
        let mut sc = Scanner::new("a b c");
        let a = sc.next().unwrap();
        let b = sc.next().unwrap();
        sc.push(b.clone());
        sc.push(a.clone());
        assert_eq!(sc.next().unwrap().text, "a");
        assert_eq!(sc.next().unwrap().text, "b");
        assert_eq!(sc.next().unwrap().text, "c");
    }

    #[test]
    fn string_escapes() {
        let mut sc = Scanner::new(r#""a\nb\\c\"d""#);
        let t = sc.next().unwrap();
        assert_eq!(t.kind, TokenKind::Str);
        assert_eq!(t.text, "a\nb\\c\"d");
    }

    #[test]
    fn string_quote_styles() {
        let mut sc = Scanner::new("'hi' `there`");
        assert_eq!(sc.next().unwrap().text, "hi");
        assert_eq!(sc.next().unwrap().text, "there");
    }

    #[test]
    fn multibyte_string_content_survives() {
        let mut sc = Scanner::new("\"é ↑ßé\"");
        let t = sc.next().unwrap();
        assert_eq!(t.kind, TokenKind::Str);
        assert_eq!(t.text, "é ↑ßé");
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn unterminated_string_is_error_token() {
        let mut sc = Scanner::new("\"oops");
        let t = sc.next().unwrap();
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(t.error, Some(ScanError::UnterminatedStr));
        assert_eq!(t.text, "oops");
    }

    #[test]
    fn long_number_is_error_token_but_returned() {
        let mut sc = Scanner::new("1234567890123");
        let t = sc.next().unwrap();
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(t.error, Some(ScanError::NumTooLong));
        assert_eq!(t.text, "1234567890123");
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn long_name_is_error_token_but_returned() {
        let long = "n".repeat(MAX_NAME_LEN + 1);
        let mut sc = Scanner::new(&long);
        let t = sc.next().unwrap();
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(t.error, Some(ScanError::NameTooLong));
        assert_eq!(t.text, long);
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn long_string_is_truncated_and_error_tagged() {
        let src = format!("\"{}\"", "s".repeat(MAX_STRING_LEN + 10));
        let mut sc = Scanner::new(&src);
        let t = sc.next().unwrap();
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(t.error, Some(ScanError::StrTooLong));
        assert_eq!(t.text.len(), MAX_STRING_LEN);
        assert!(t.text.bytes().all(|b| b == b's'));
        assert_eq!(sc.next().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn names_with_underscore_and_digits() {
        let mut sc = Scanner::new("_tmp1 x9");
        let t = sc.next().unwrap();
        assert_eq!(t.kind, TokenKind::Name);
        assert_eq!(t.text, "_tmp1");
        assert_eq!(sc.next().unwrap().text, "x9");
    }

    #[test]
    fn delimiters() {
        assert_eq!(
            kinds("f(a, b);"),
            vec![
                TokenKind::Name, TokenKind::ParenL, TokenKind::Name,
                TokenKind::Comma, TokenKind::Name, TokenKind::ParenR,
                TokenKind::Semi, TokenKind::Eof,
            ]
        );
    }
}
