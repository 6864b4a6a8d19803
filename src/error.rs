//! Host-API-boundary error type (`SPEC_FULL.md` §B), grounded in the
//! teacher's `LuaError`/`LuaFullError` split
//! (`examples/CppCXY-lua-rs/crates/luars/src/lua_vm/lua_error.rs`): a small
//! `Display`/`Error`-implementing type that composes with `?`. Unlike the
//! teacher, MiniLua's evaluator itself never throws (spec §7: "errors are
//! values") — this type exists one layer up, at [`crate::interpreter::Interpreter`].

use std::fmt;

/// Failures that can cross the [`crate::interpreter::Interpreter`] boundary
/// (spec §7 "Error taxonomy" minus the in-language `Type error`/`Arity`
/// cases, which stay inside `EvalOutcome::Error` until a native function or
/// the top-level `evaluate()` call surfaces them here).
#[derive(Debug, Clone)]
pub enum LuaError {
    /// Surfaced from the parser as a list of messages (spec §7 "Parse
    /// error").
    ParseError(Vec<String>),
    /// `evaluate()` called before any successful `parse()` (spec §6.1:
    /// "evaluate on an un-parsed source is undefined" — made a recoverable
    /// error here rather than left undefined).
    NotParsed,
    /// The evaluator's error-value channel (spec §7), wrapping whatever
    /// message a type error, arity error, or the visit-limit guard
    /// produced.
    RuntimeError(String),
    /// The applier detected an invariant violation (e.g. overlapping edits,
    /// spec §3.3) rather than a language-level runtime error.
    SourceChangeError(String),
}

impl fmt::Display for LuaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaError::ParseError(msgs) => write!(f, "parse error: {}", msgs.join("; ")),
            LuaError::NotParsed => write!(f, "evaluate() called before a successful parse()"),
            LuaError::RuntimeError(msg) => write!(f, "{}", msg),
            LuaError::SourceChangeError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LuaError {}
