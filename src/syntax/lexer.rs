//! Hand-rolled tokenizer for the MiniLua lexical surface (spec §6.4).
//!
//! Structured the way the teacher's `compiler::parser::lua_tokenize` module
//! is: a cursor over the source bytes producing one [`LuaToken`] at a time,
//! plus a keyword table. Long-bracket strings/comments track their `=` count
//! per spec §4.2 / §6.4.

use super::token::{LuaToken, LuaTokenKind, TokenSpan};

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<LuaToken>, String> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let line = self.line;
            if self.is_eof() {
                tokens.push(LuaToken {
                    kind: LuaTokenKind::TkEof,
                    span: TokenSpan::new(start, 0),
                    text: String::new(),
                    line,
                });
                break;
            }
            let kind = self.lex_one()?;
            let span = TokenSpan::new(start, self.pos - start);
            tokens.push(LuaToken {
                kind,
                span,
                text: self.source[start..self.pos].to_string(),
                line,
            });
        }
        Ok(tokens)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn cur(&self) -> u8 {
        self.bytes[self.pos]
    }

    fn peek(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> u8 {
        let c = self.cur();
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        c
    }

    fn skip_trivia(&mut self) -> Result<(), String> {
        loop {
            if self.is_eof() {
                return Ok(());
            }
            match self.cur() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'-' if self.peek(1) == Some(b'-') => {
                    self.pos += 2;
                    if self.cur_is(b'[') {
                        if let Some(level) = self.try_long_bracket_open() {
                            self.skip_long_bracket_body(level)?;
                            continue;
                        }
                    }
                    while !self.is_eof() && self.cur() != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn cur_is(&self, b: u8) -> bool {
        !self.is_eof() && self.cur() == b
    }

    /// If positioned at `[=*[`, consumes the opener and returns the `=` count.
    fn try_long_bracket_open(&mut self) -> Option<usize> {
        let save = self.pos;
        if !self.cur_is(b'[') {
            return None;
        }
        let mut p = self.pos + 1;
        let mut level = 0;
        while self.bytes.get(p) == Some(&b'=') {
            level += 1;
            p += 1;
        }
        if self.bytes.get(p) == Some(&b'[') {
            self.pos = p + 1;
            Some(level)
        } else {
            self.pos = save;
            None
        }
    }

    fn skip_long_bracket_body(&mut self, level: usize) -> Result<(), String> {
        self.scan_long_bracket_body(level).map(|_| ())
    }

    /// Consumes up to and including the matching `]=*]`, returning the raw
    /// body text (a leading newline right after the opener is dropped, per
    /// spec §4.2).
    fn scan_long_bracket_body(&mut self, level: usize) -> Result<String, String> {
        if self.cur_is(b'\r') {
            self.bump();
        }
        if self.cur_is(b'\n') {
            self.bump();
        }
        let start = self.pos;
        loop {
            if self.is_eof() {
                return Err("unterminated long bracket".to_string());
            }
            if self.cur_is(b']') {
                let save = self.pos;
                self.pos += 1;
                let mut n = 0;
                while self.bytes.get(self.pos) == Some(&b'=') {
                    n += 1;
                    self.pos += 1;
                }
                if n == level && self.bytes.get(self.pos) == Some(&b']') {
                    let body = self.source[start..save].to_string();
                    self.pos += 1;
                    return Ok(body);
                }
                self.pos = save + 1;
            } else {
                self.bump();
            }
        }
    }

    fn lex_one(&mut self) -> Result<LuaTokenKind, String> {
        let c = self.cur();
        match c {
            b'+' => {
                self.bump();
                Ok(LuaTokenKind::TkPlus)
            }
            b'-' => {
                self.bump();
                Ok(LuaTokenKind::TkMinus)
            }
            b'*' => {
                self.bump();
                Ok(LuaTokenKind::TkMul)
            }
            b'/' => {
                self.bump();
                Ok(LuaTokenKind::TkDiv)
            }
            b'%' => {
                self.bump();
                Ok(LuaTokenKind::TkMod)
            }
            b'^' => {
                self.bump();
                Ok(LuaTokenKind::TkPow)
            }
            b'#' => {
                self.bump();
                Ok(LuaTokenKind::TkLen)
            }
            b'&' => {
                // not in the Lua 5.1 operator subset we support; reuse for none
                self.bump();
                Err("unsupported operator '&'".to_string())
            }
            b'$' => {
                self.bump();
                Ok(LuaTokenKind::TkStrip)
            }
            b'\\' => {
                self.bump();
                Ok(LuaTokenKind::TkEval)
            }
            b'~' => {
                self.bump();
                if self.cur_is(b'=') {
                    self.bump();
                    Ok(LuaTokenKind::TkNe)
                } else {
                    Err("unexpected '~'".to_string())
                }
            }
            b'<' => {
                self.bump();
                if self.cur_is(b'=') {
                    self.bump();
                    Ok(LuaTokenKind::TkLe)
                } else {
                    Ok(LuaTokenKind::TkLt)
                }
            }
            b'>' => {
                self.bump();
                if self.cur_is(b'=') {
                    self.bump();
                    Ok(LuaTokenKind::TkGe)
                } else {
                    Ok(LuaTokenKind::TkGt)
                }
            }
            b'=' => {
                self.bump();
                if self.cur_is(b'=') {
                    self.bump();
                    Ok(LuaTokenKind::TkEq)
                } else {
                    Ok(LuaTokenKind::TkAssign)
                }
            }
            b'(' => {
                self.bump();
                Ok(LuaTokenKind::TkLParen)
            }
            b')' => {
                self.bump();
                Ok(LuaTokenKind::TkRParen)
            }
            b'{' => {
                self.bump();
                Ok(LuaTokenKind::TkLBrace)
            }
            b'}' => {
                self.bump();
                Ok(LuaTokenKind::TkRBrace)
            }
            b'[' => {
                if let Some(level) = self.try_long_bracket_open() {
                    let _ = self.scan_long_bracket_body(level)?;
                    return Ok(LuaTokenKind::TkString);
                }
                self.bump();
                Ok(LuaTokenKind::TkLBracket)
            }
            b']' => {
                self.bump();
                Ok(LuaTokenKind::TkRBracket)
            }
            b':' => {
                self.bump();
                if self.cur_is(b':') {
                    self.bump();
                    Ok(LuaTokenKind::TkDbColon)
                } else {
                    Ok(LuaTokenKind::TkColon)
                }
            }
            b';' => {
                self.bump();
                Ok(LuaTokenKind::TkSemicolon)
            }
            b',' => {
                self.bump();
                Ok(LuaTokenKind::TkComma)
            }
            b'.' => {
                self.bump();
                if self.cur_is(b'.') {
                    self.bump();
                    if self.cur_is(b'.') {
                        self.bump();
                        Ok(LuaTokenKind::TkDots)
                    } else {
                        Ok(LuaTokenKind::TkConcat)
                    }
                } else if self.cur().is_ascii_digit() {
                    self.pos -= 1;
                    self.lex_number()
                } else {
                    Ok(LuaTokenKind::TkDot)
                }
            }
            b'"' | b'\'' => self.lex_short_string(c),
            b'0'..=b'9' => self.lex_number(),
            c if c == b'_' || c.is_ascii_alphabetic() => self.lex_name(),
            other => Err(format!("unexpected character '{}'", other as char)),
        }
    }

    fn lex_name(&mut self) -> Result<LuaTokenKind, String> {
        let start = self.pos;
        while !self.is_eof() && (self.cur() == b'_' || self.cur().is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        Ok(match text {
            "and" => LuaTokenKind::TkAnd,
            "break" => LuaTokenKind::TkBreak,
            "do" => LuaTokenKind::TkDo,
            "else" => LuaTokenKind::TkElse,
            "elseif" => LuaTokenKind::TkElseIf,
            "end" => LuaTokenKind::TkEnd,
            "false" => LuaTokenKind::TkFalse,
            "for" => LuaTokenKind::TkFor,
            "function" => LuaTokenKind::TkFunction,
            "if" => LuaTokenKind::TkIf,
            "in" => LuaTokenKind::TkIn,
            "local" => LuaTokenKind::TkLocal,
            "nil" => LuaTokenKind::TkNil,
            "not" => LuaTokenKind::TkNot,
            "or" => LuaTokenKind::TkOr,
            "repeat" => LuaTokenKind::TkRepeat,
            "return" => LuaTokenKind::TkReturn,
            "then" => LuaTokenKind::TkThen,
            "true" => LuaTokenKind::TkTrue,
            "until" => LuaTokenKind::TkUntil,
            "while" => LuaTokenKind::TkWhile,
            _ => LuaTokenKind::TkName,
        })
    }

    fn lex_number(&mut self) -> Result<LuaTokenKind, String> {
        let start = self.pos;
        if self.cur_is(b'0') && matches!(self.peek(1), Some(b'x') | Some(b'X')) {
            self.pos += 2;
            while !self.is_eof() && self.cur().is_ascii_hexdigit() {
                self.pos += 1;
            }
            let _ = start;
            return Ok(LuaTokenKind::TkNumber);
        }
        while !self.is_eof() && self.cur().is_ascii_digit() {
            self.pos += 1;
        }
        if self.cur_is(b'.') {
            self.pos += 1;
            while !self.is_eof() && self.cur().is_ascii_digit() {
                self.pos += 1;
            }
        }
        if matches!(self.bytes.get(self.pos), Some(b'e') | Some(b'E')) {
            self.pos += 1;
            if matches!(self.bytes.get(self.pos), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            while !self.is_eof() && self.cur().is_ascii_digit() {
                self.pos += 1;
            }
        }
        Ok(LuaTokenKind::TkNumber)
    }

    fn lex_short_string(&mut self, quote: u8) -> Result<LuaTokenKind, String> {
        self.bump();
        loop {
            if self.is_eof() {
                return Err("unterminated string literal".to_string());
            }
            let c = self.cur();
            if c == quote {
                self.bump();
                return Ok(LuaTokenKind::TkString);
            }
            if c == b'\\' {
                self.bump();
                if !self.is_eof() {
                    self.bump();
                }
            } else if c == b'\n' {
                return Err("unterminated string literal".to_string());
            } else {
                self.bump();
            }
        }
    }
}
