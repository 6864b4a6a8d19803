//! `print` and `force` (spec §6.3), grounded in
//! `examples/CppCXY-lua-rs/crates/luars/src/stdlib/basic.rs`'s `lua_print`
//! for tab/newline formatting, and `force`'s argument contract taken
//! directly from `examples/original_source/tests/integration_tests.cpp`'s
//! `add_force_function_to_env` (arity check, then `args[0].forceValue(args[1])`).

use crate::env::Environment;
use crate::value::{CallResult, Value};
use std::rc::Rc;

pub fn install(env: &Environment) {
    env.set_global(
        "print",
        Value::cfunction("print", Rc::new(lua_print)),
    );
    env.set_global(
        "force",
        Value::cfunction("force", Rc::new(lua_force)),
    );
}

/// `print(...)`: tab-separated, newline-terminated, written to the
/// environment's configured stdout (spec §6.3, §4.4).
fn lua_print(env: &Environment, args: &[Value]) -> CallResult {
    let rendered: Vec<String> = args.iter().map(Value::to_display_string).collect();
    env.write_stdout(&rendered.join("\t"));
    env.write_stdout("\n");
    CallResult::Values(Vec::new())
}

/// `force(target, desired)`: shorthand for `target.force(desired)`, surfaced
/// as the call's `SourceChange` payload rather than its value result when a
/// change is found; the call itself evaluates to `nil` either way, matching
/// the original's `cfunction::result` which carries no vallist alongside a
/// produced source change.
fn lua_force(_env: &Environment, args: &[Value]) -> CallResult {
    if args.len() != 2 {
        return CallResult::Error("wrong number of arguments (expected 2)".to_string());
    }
    match args[0].force(&args[1]) {
        Some(sc) => CallResult::Change(Vec::new(), sc),
        None => CallResult::Values(Vec::new()),
    }
}
