//! Host-facing API (spec §6.1), grounded in the teacher's top-level
//! `execute`/`execute_with_vm` entry points
//! (`examples/CppCXY-lua-rs/crates/luars/src/lib.rs`) generalized into a
//! stateful handle that remembers the most recently parsed chunk between a
//! `parse()` and `evaluate()` call, plus `apply_source_changes` so a host
//! can round-trip an edit and re-parse.

use crate::ast::Chunk;
use crate::env::{EvalConfig, Environment};
use crate::error::LuaError;
use crate::eval::{self, StmtOutcome};
use crate::source_change::{self, RangeMap, Single, SourceChange};
use crate::stdlib;
use crate::value::Value;

/// `parse()`'s result (spec §6.1): boolean-convertible — `if result { .. }`
/// reads as "did this parse cleanly".
pub struct ParseResult {
    pub errors: Vec<String>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<&ParseResult> for bool {
    fn from(r: &ParseResult) -> bool {
        r.is_ok()
    }
}

/// `evaluate()`'s result (spec §6.1): the top-level value plus whatever
/// `SourceChange` bubbled up from `force` calls inside the program.
pub struct EvalResult {
    pub value: Value,
    pub source_change: Option<SourceChange>,
}

/// The MiniLua host-facing handle (spec §6.1). Owns the current source
/// text, the most recently parsed [`Chunk`] (if any), and the
/// [`Environment`] built-ins are installed into.
pub struct Interpreter {
    source: String,
    chunk: Option<Chunk>,
    env: Environment,
}

impl Interpreter {
    /// `new()`: an empty interpreter with the mandated built-ins installed
    /// (spec §6.3) and default [`EvalConfig`].
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        let env = Environment::new(config);
        stdlib::install(&env);
        Interpreter {
            source: String::new(),
            chunk: None,
            env,
        }
    }

    /// `new(source)`: construct, optionally preloading source, parsing it
    /// immediately.
    pub fn with_source(source: impl Into<String>) -> (Self, ParseResult) {
        let mut interp = Self::new();
        let result = interp.parse(source);
        (interp, result)
    }

    /// `environment()`: the environment built-ins and host bindings live in.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// `source_code()`: borrow the current text.
    pub fn source_code(&self) -> &str {
        &self.source
    }

    /// `parse(source)`: replaces the stored source and attempts to parse it
    /// into a fresh AST, clearing any previously parsed chunk on failure.
    pub fn parse(&mut self, source: impl Into<String>) -> ParseResult {
        self.source = source.into();
        match crate::syntax::parse(&self.source) {
            Ok(chunk) => {
                self.chunk = Some(chunk);
                ParseResult { errors: Vec::new() }
            }
            Err(errors) => {
                self.chunk = None;
                ParseResult { errors }
            }
        }
    }

    /// `evaluate()`: run the most recently parsed source (spec §6.1).
    /// Undefined in the spec when nothing has been parsed yet; here that is
    /// a recoverable [`LuaError::NotParsed`] rather than a panic.
    pub fn evaluate(&self) -> Result<EvalResult, LuaError> {
        let chunk = self.chunk.as_ref().ok_or(LuaError::NotParsed)?;
        self.env.reset_visit_count();
        match eval::eval_chunk(&self.env, chunk) {
            Ok(StmtOutcome::Normal(sc)) => Ok(EvalResult {
                value: Value::nil(),
                source_change: sc,
            }),
            Ok(StmtOutcome::Return(mut values, sc)) => Ok(EvalResult {
                value: values.drain(..).next().unwrap_or_else(Value::nil),
                source_change: sc,
            }),
            Ok(StmtOutcome::Break(_)) => Err(LuaError::RuntimeError(
                "break used outside a loop".to_string(),
            )),
            Err(msg) => Err(LuaError::RuntimeError(msg)),
        }
    }

    /// `apply_source_changes(list<Single>)`: rewrites the stored source text
    /// in place and returns the [`RangeMap`] the host should use to rebase
    /// any stored origins (spec §4.5 "Range map").
    pub fn apply_source_changes(&mut self, changes: &[Single]) -> Result<RangeMap, LuaError> {
        let (new_source, map) =
            source_change::apply(&self.source, changes).map_err(LuaError::SourceChangeError)?;
        self.source = new_source;
        self.chunk = None;
        Ok(map)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience one-shot entry point, mirroring the teacher's free
/// `execute(source)` function (`SPEC_FULL.md` §A).
pub fn execute(source: &str) -> Result<EvalResult, LuaError> {
    let mut interp = Interpreter::new();
    let parsed = interp.parse(source);
    if !parsed.is_ok() {
        return Err(LuaError::ParseError(parsed.errors));
    }
    interp.evaluate()
}
