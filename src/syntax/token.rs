//! Token spans and the lexical token kind table.
//!
//! The concrete tokenizer is ambient glue, not part of the core this crate
//! reimplements (see `SPEC_FULL.md` §A) — but every AST node still needs a
//! byte-accurate [`TokenSpan`] to build an [`crate::origin::Origin`] from, so
//! tokens are modeled with the same care as the rest of the value/origin
//! machinery.

/// A byte range in the original source text, used to anchor origins and to
/// address replacements in a [`crate::source_change::SourceChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenSpan {
    pub offset: usize,
    pub len: usize,
}

impl TokenSpan {
    pub fn new(offset: usize, len: usize) -> Self {
        TokenSpan { offset, len }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.offset..self.end()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaTokenKind {
    TkAnd,
    TkBreak,
    TkDo,
    TkElse,
    TkElseIf,
    TkEnd,
    TkFalse,
    TkFor,
    TkFunction,
    TkIf,
    TkIn,
    TkLocal,
    TkNil,
    TkNot,
    TkOr,
    TkRepeat,
    TkReturn,
    TkThen,
    TkTrue,
    TkUntil,
    TkWhile,

    TkName,
    TkNumber,
    TkString,

    TkPlus,
    TkMinus,
    TkMul,
    TkDiv,
    TkMod,
    TkPow,
    TkLen,
    TkConcat,
    TkDots,
    TkEq,
    TkNe,
    TkLe,
    TkGe,
    TkLt,
    TkGt,
    TkAssign,
    TkLParen,
    TkRParen,
    TkLBrace,
    TkRBrace,
    TkLBracket,
    TkRBracket,
    TkDbColon,
    TkSemicolon,
    TkColon,
    TkComma,
    TkDot,
    TkStrip,
    TkEval,

    TkEof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuaToken {
    pub kind: LuaTokenKind,
    pub span: TokenSpan,
    pub text: String,
    pub line: usize,
}
