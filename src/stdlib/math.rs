//! `math.{sin,cos,tan,sqrt}` (spec §6.3 "optional stdlib extensions"),
//! forward semantics grounded in
//! `examples/CppCXY-lua-rs/crates/luars/src/stdlib/math.rs`, with each
//! result's [`crate::origin::Origin::Lambda`] built by
//! [`crate::operators::sin_origin`]/`cos_origin`/`tan_origin`/`sqrt_origin`
//! — the concrete Lambda-origin demonstration spec §4.1 calls for.

use crate::env::Environment;
use crate::operators::{cos_origin, sin_origin, sqrt_origin, tan_origin};
use crate::value::{CallResult, Table, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub fn install(env: &Environment) {
    let table = Rc::new(RefCell::new(Table::new()));
    {
        let mut t = table.borrow_mut();
        t.set(
            Value::string("sin"),
            Value::cfunction("math.sin", Rc::new(lua_sin)),
        );
        t.set(
            Value::string("cos"),
            Value::cfunction("math.cos", Rc::new(lua_cos)),
        );
        t.set(
            Value::string("tan"),
            Value::cfunction("math.tan", Rc::new(lua_tan)),
        );
        t.set(
            Value::string("sqrt"),
            Value::cfunction("math.sqrt", Rc::new(lua_sqrt)),
        );
    }
    env.set_global("math", Value::table(table));
}

fn one_number_arg(name: &str, args: &[Value]) -> Result<Value, CallResult> {
    match args.first() {
        Some(v) if v.as_number().is_some() => Ok(v.clone()),
        Some(v) => Err(CallResult::Error(format!(
            "bad argument #1 to '{}' (number expected, got {})",
            name,
            v.type_name()
        ))),
        None => Err(CallResult::Error(format!(
            "bad argument #1 to '{}' (number expected, got no value)",
            name
        ))),
    }
}

fn lua_sin(_env: &Environment, args: &[Value]) -> CallResult {
    let x = match one_number_arg("sin", args) {
        Ok(x) => x,
        Err(e) => return e,
    };
    let n = x.as_number().unwrap();
    let result = Value::number(n.sin()).with_origin(sin_origin(x));
    CallResult::Values(vec![result])
}

fn lua_cos(_env: &Environment, args: &[Value]) -> CallResult {
    let x = match one_number_arg("cos", args) {
        Ok(x) => x,
        Err(e) => return e,
    };
    let n = x.as_number().unwrap();
    let result = Value::number(n.cos()).with_origin(cos_origin(x));
    CallResult::Values(vec![result])
}

fn lua_tan(_env: &Environment, args: &[Value]) -> CallResult {
    let x = match one_number_arg("tan", args) {
        Ok(x) => x,
        Err(e) => return e,
    };
    let n = x.as_number().unwrap();
    let result = Value::number(n.tan()).with_origin(tan_origin(x));
    CallResult::Values(vec![result])
}

fn lua_sqrt(_env: &Environment, args: &[Value]) -> CallResult {
    let x = match one_number_arg("sqrt", args) {
        Ok(x) => x,
        Err(e) => return e,
    };
    let n = x.as_number().unwrap();
    let result = Value::number(n.sqrt()).with_origin(sqrt_origin(x));
    CallResult::Values(vec![result])
}
