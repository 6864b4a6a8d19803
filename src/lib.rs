//! MiniLua — a bidirectional tree-walking interpreter for a subset of Lua 5.
//!
//! Every runtime value carries an optional [`origin::Origin`] recording how
//! it was derived from source-code literals, so the interpreter can answer
//! the inverse question — "which edit to the source text would make this
//! expression evaluate to a different value?" — via [`value::Value::force`].
//! See `SPEC_FULL.md` for the full module map.

pub mod ast;
pub mod env;
pub mod error;
pub mod eval;
pub mod interpreter;
pub mod operators;
pub mod origin;
pub mod source_change;
pub mod stdlib;
pub mod syntax;
pub mod value;

pub use env::{EvalConfig, Environment};
pub use error::LuaError;
pub use interpreter::{execute, EvalResult, Interpreter, ParseResult};
pub use origin::Origin;
pub use source_change::{RangeMap, Single, SourceChange};
pub use value::{CallResult, Table, Value};
