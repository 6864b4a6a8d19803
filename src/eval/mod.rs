//! The tree-walking evaluator (spec §4.2), grounded in
//! `examples/original_source/include/luainterpreter.h` / `src/core/luainterpreter.cpp`'s
//! `ASTEvaluator` visitor — one function per AST node kind, threading
//! `(value, source-change)` pairs per spec §4.2, with control flow encoded
//! in a dedicated sum type rather than tagged `Value`s (spec §4.2 explicitly
//! sanctions this: "implementers may equivalently use sum types with
//! distinct variants").

mod strings;

use crate::ast::*;
use crate::env::Environment;
use crate::operators::{self, OpResult};
use crate::origin::Origin;
use crate::source_change::{and_opt, SourceChange};
use crate::syntax::token::TokenSpan;
use crate::value::{flatten, fst, CallResult, LuaFunctionDef, Table, Value, ValueData};
use std::cell::RefCell;
use std::rc::Rc;

pub type ExprEval = Result<(Value, Option<SourceChange>), String>;

/// What executing a statement produced (spec §4.2's four-way discriminator,
/// expressed as a real sum type rather than tagged `Value`s).
pub enum StmtOutcome {
    Normal(Option<SourceChange>),
    Return(Vec<Value>, Option<SourceChange>),
    Break(Option<SourceChange>),
}

pub type StmtEval = Result<StmtOutcome, String>;

fn tick(env: &Environment) -> Result<(), String> {
    env.tick_visit()?;
    env.trace_visit(|| env.visit_count().to_string().into());
    Ok(())
}

pub fn eval_chunk(env: &Environment, chunk: &Chunk) -> StmtEval {
    let mut pending: Option<SourceChange> = None;
    for stat in &chunk.0 {
        match exec_stat(env, stat)? {
            StmtOutcome::Normal(sc) => pending = and_opt(pending, sc),
            other => return Ok(merge_leading(other, pending)),
        }
    }
    Ok(StmtOutcome::Normal(pending))
}

fn merge_leading(outcome: StmtOutcome, leading: Option<SourceChange>) -> StmtOutcome {
    match outcome {
        StmtOutcome::Normal(sc) => StmtOutcome::Normal(and_opt(leading, sc)),
        StmtOutcome::Return(vs, sc) => StmtOutcome::Return(vs, and_opt(leading, sc)),
        StmtOutcome::Break(sc) => StmtOutcome::Break(and_opt(leading, sc)),
    }
}

fn exec_stat(env: &Environment, stat: &Stat) -> StmtEval {
    tick(env)?;
    match stat {
        Stat::Assignment {
            local,
            targets,
            values,
        } => exec_assignment(env, *local, targets, values),
        Stat::FunctionCall(expr) => {
            let (_, sc) = eval_expr(env, expr)?;
            Ok(StmtOutcome::Normal(sc))
        }
        Stat::Return(exprs) => {
            let (values, sc) = eval_exprlist_flattened(env, exprs)?;
            Ok(StmtOutcome::Return(values, sc))
        }
        Stat::Break => Ok(StmtOutcome::Break(None)),
        Stat::NumericFor {
            var,
            start,
            end,
            step,
            body,
        } => exec_numeric_for(env, var, start, end, step.as_ref(), body),
        Stat::GenericFor { names, exprs, body } => exec_generic_for(env, names, exprs, body),
        Stat::Loop {
            head_controlled,
            cond,
            body,
        } => exec_loop(env, *head_controlled, cond, body),
        Stat::If {
            branches,
            else_branch,
        } => exec_if(env, branches, else_branch.as_ref()),
        Stat::FunctionDecl {
            target,
            is_method: _,
            body,
        } => {
            let func = make_closure(env, body);
            assign_var(env, target, func)
        }
        Stat::Do(body) => {
            let child = env.child();
            eval_chunk(&child, body)
        }
    }
}

fn exec_assignment(
    env: &Environment,
    local: bool,
    targets: &[Var],
    values: &[Expr],
) -> StmtEval {
    let (mut vs, sc) = eval_exprlist_flattened(env, values)?;
    vs.resize_with(targets.len(), Value::nil);
    for (target, value) in targets.iter().zip(vs.into_iter()) {
        name_closure_if_anonymous(target, &value);
        if local {
            if let Var::Name(name, _) = target {
                env.declare_local(name);
                env.set_local(name, value);
                continue;
            }
        }
        assign_one(env, target, value)?;
    }
    Ok(StmtOutcome::Normal(sc))
}

fn assign_var(env: &Environment, target: &Var, value: Value) -> StmtEval {
    name_closure_if_anonymous(target, &value);
    assign_one(env, target, value)?;
    Ok(StmtOutcome::Normal(None))
}

/// Tags a freshly created closure with the name it is first bound to, so
/// `to_display_string`/tracing can show `function: foo` instead of a bare
/// pointer (spec §4.4's closures have no name of their own; `function` and
/// `local function` declarations are the only sources of one).
fn name_closure_if_anonymous(target: &Var, value: &Value) {
    if let ValueData::LuaFunction(def) = &value.data {
        let mut slot = def.name.borrow_mut();
        if slot.is_none() {
            *slot = match target {
                Var::Name(n, _) | Var::Member(_, n, _) => Some(n.clone()),
                Var::Index(..) => None,
            };
        }
    }
}

fn assign_one(env: &Environment, target: &Var, value: Value) -> Result<(), String> {
    match target {
        Var::Name(name, _) => {
            env.set_var(name, value);
            Ok(())
        }
        Var::Index(obj, idx) => {
            let (obj_v, _) = eval_expr(env, obj)?;
            let obj_v = fst(obj_v);
            let (idx_v, _) = eval_expr(env, idx)?;
            let idx_v = fst(idx_v);
            let table = obj_v
                .as_table()
                .ok_or_else(|| format!("attempted to index a {} value", obj_v.type_name()))?;
            table.borrow_mut().set(idx_v, value);
            Ok(())
        }
        Var::Member(obj, name, _) => {
            let (obj_v, _) = eval_expr(env, obj)?;
            let obj_v = fst(obj_v);
            let table = obj_v
                .as_table()
                .ok_or_else(|| format!("attempted to index a {} value", obj_v.type_name()))?;
            table.borrow_mut().set(Value::string(name.as_str()), value);
            Ok(())
        }
    }
}

/// Lua's `v > end` termination rule (spec §4.2): `start`/`end`/`step` are
/// each evaluated exactly once before the loop runs — the numeric-for
/// re-evaluation deviation flagged in spec §9 is dropped here per
/// `SPEC_FULL.md` §F.
fn exec_numeric_for(
    env: &Environment,
    var: &str,
    start: &Expr,
    end: &Expr,
    step: Option<&Expr>,
    body: &Chunk,
) -> StmtEval {
    let (start_v, sc0) = eval_expr(env, start)?;
    let start_v = fst(start_v);
    let (end_v, sc1) = eval_expr(env, end)?;
    let end_v = fst(end_v);
    let (step_v, sc2) = match step {
        Some(e) => eval_expr(env, e)?,
        None => (Value::number(1.0), None),
    };
    let step_v = fst(step_v);
    let mut leading = and_opt(and_opt(sc0, sc1), sc2);

    let start_n = start_v
        .as_number()
        .ok_or_else(|| "'for' initial value must be a number".to_string())?;
    let end_n = end_v
        .as_number()
        .ok_or_else(|| "'for' limit must be a number".to_string())?;
    let step_n = step_v
        .as_number()
        .ok_or_else(|| "'for' step must be a number".to_string())?;

    let mut i = start_n;
    loop {
        if step_n >= 0.0 {
            if i > end_n {
                break;
            }
        } else if i < end_n {
            break;
        }
        let child = env.child();
        child.declare_local(var);
        child.set_local(var, Value::number(i));
        match eval_chunk(&child, body)? {
            StmtOutcome::Normal(sc) => leading = and_opt(leading, sc),
            StmtOutcome::Break(sc) => return Ok(StmtOutcome::Normal(and_opt(leading, sc))),
            ret @ StmtOutcome::Return(..) => return Ok(merge_leading(ret, leading)),
        }
        i += step_n;
    }
    Ok(StmtOutcome::Normal(leading))
}

/// Desugars to spec §4.2's shown expansion:
/// `local f, s, var = exprs; while true do local names = f(s, var); if
/// names[1] == nil then break end; var = names[1]; body end`.
fn exec_generic_for(env: &Environment, names: &[String], exprs: &[Expr], body: &Chunk) -> StmtEval {
    let (mut init, mut leading) = eval_exprlist_flattened(env, exprs)?;
    init.resize_with(3, Value::nil);
    let f = init.remove(0);
    let s = init.remove(0);
    let mut control = init.remove(0);

    loop {
        tick(env)?;
        let results = call_value(env, &f, vec![s.clone(), control.clone()])?;
        let first = results.first().cloned().unwrap_or_else(Value::nil);
        if first.is_nil() {
            break;
        }
        control = first.clone();
        let child = env.child();
        for (i, name) in names.iter().enumerate() {
            child.declare_local(name);
            child.set_local(name, results.get(i).cloned().unwrap_or_else(Value::nil));
        }
        match eval_chunk(&child, body)? {
            StmtOutcome::Normal(sc) => leading = and_opt(leading, sc),
            StmtOutcome::Break(sc) => return Ok(StmtOutcome::Normal(and_opt(leading, sc))),
            ret @ StmtOutcome::Return(..) => return Ok(merge_leading(ret, leading)),
        }
    }
    Ok(StmtOutcome::Normal(leading))
}

fn exec_loop(env: &Environment, head_controlled: bool, cond: &Expr, body: &Chunk) -> StmtEval {
    let mut leading = None;
    loop {
        if head_controlled {
            let (c, sc) = eval_expr(env, cond)?;
            let c = fst(c);
            leading = and_opt(leading, sc);
            if !c.to_bool() {
                break;
            }
        }
        let child = env.child();
        match eval_chunk(&child, body)? {
            StmtOutcome::Normal(sc) => leading = and_opt(leading, sc),
            StmtOutcome::Break(sc) => return Ok(StmtOutcome::Normal(and_opt(leading, sc))),
            ret @ StmtOutcome::Return(..) => return Ok(merge_leading(ret, leading)),
        }
        if !head_controlled {
            let (c, sc) = eval_expr(env, cond)?;
            let c = fst(c);
            leading = and_opt(leading, sc);
            if c.to_bool() {
                break;
            }
        }
    }
    Ok(StmtOutcome::Normal(leading))
}

fn exec_if(env: &Environment, branches: &[(Expr, Chunk)], else_branch: Option<&Chunk>) -> StmtEval {
    let mut leading = None;
    for (cond, body) in branches {
        let (c, sc) = eval_expr(env, cond)?;
        let c = fst(c);
        leading = and_opt(leading, sc);
        if c.to_bool() {
            let child = env.child();
            return Ok(merge_leading(eval_chunk(&child, body)?, leading));
        }
    }
    if let Some(body) = else_branch {
        let child = env.child();
        return Ok(merge_leading(eval_chunk(&child, body)?, leading));
    }
    Ok(StmtOutcome::Normal(leading))
}

fn make_closure(env: &Environment, body: &Rc<FunctionBody>) -> Value {
    Value::lua_function(LuaFunctionDef {
        params: body.params.clone(),
        has_vararg: body.has_vararg,
        body: Rc::new(body.body.clone()),
        captured_env: env.clone(),
        name: RefCell::new(None),
    })
}

pub fn eval_expr(env: &Environment, expr: &Expr) -> ExprEval {
    match expr {
        Expr::Value(lit, span) => eval_literal(lit, *span),
        Expr::Name(name, _) => Ok((env.get_var(name), None)),
        Expr::Index(obj, idx) => {
            let (obj_v, sc0) = eval_expr(env, obj)?;
            let obj_v = fst(obj_v);
            let (idx_v, sc1) = eval_expr(env, idx)?;
            let idx_v = fst(idx_v);
            let table = obj_v
                .as_table()
                .ok_or_else(|| format!("attempted to index a {} value", obj_v.type_name()))?;
            let v = table.borrow().get(&idx_v);
            Ok((v, and_opt(sc0, sc1)))
        }
        Expr::Member(obj, name, _) => {
            let (obj_v, sc0) = eval_expr(env, obj)?;
            let obj_v = fst(obj_v);
            let table = obj_v
                .as_table()
                .ok_or_else(|| format!("attempted to index a {} value", obj_v.type_name()))?;
            let v = table.borrow().get(&Value::string(name.as_str()));
            Ok((v, sc0))
        }
        Expr::Op(lhs, op, span, rhs) => eval_binop(env, lhs, *op, *span, rhs),
        Expr::UnOp(op, span, operand) => {
            let (v, sc) = eval_expr(env, operand)?;
            let (result, sc2) = operators::unary(*op, *span, fst(v))?;
            Ok((result, and_opt(sc, sc2)))
        }
        Expr::Call(callee, args) => {
            let (callee_v, sc0) = eval_expr(env, callee)?;
            let callee_v = fst(callee_v);
            let (arg_vs, sc1) = eval_exprlist_flattened(env, args)?;
            let (results, sc2) = call_value_with_change(env, &callee_v, arg_vs)?;
            Ok((Value::vallist(results), and_opt(and_opt(sc0, sc1), sc2)))
        }
        Expr::MethodCall(obj, name, args) => {
            let (obj_v, sc0) = eval_expr(env, obj)?;
            let obj_v = fst(obj_v);
            let method = obj_v
                .as_table()
                .ok_or_else(|| format!("attempted to index a {} value", obj_v.type_name()))?
                .borrow()
                .get(&Value::string(name.as_str()));
            let (mut arg_vs, sc1) = eval_exprlist_flattened(env, args)?;
            arg_vs.insert(0, obj_v);
            let (results, sc2) = call_value_with_change(env, &method, arg_vs)?;
            Ok((Value::vallist(results), and_opt(and_opt(sc0, sc1), sc2)))
        }
        Expr::Function(body) => Ok((make_closure(env, body), None)),
        Expr::TableConstructor(fields) => eval_table_constructor(env, fields),
        Expr::Vararg => {
            let list = env.get_varargs().unwrap_or_else(|| Rc::new(Vec::new()));
            Ok((Value::vallist((*list).clone()), None))
        }
    }
}

fn eval_binop(env: &Environment, lhs: &Expr, op: BinOpKind, span: TokenSpan, rhs: &Expr) -> ExprEval {
    let (lv, sc0) = eval_expr(env, lhs)?;
    // Non-tail position: a vallist collapses to its head before taking part
    // in an operator (spec §3.1.4).
    let lv = fst(lv);
    // `and`/`or` short-circuit: the right side is only evaluated when needed.
    if matches!(op, BinOpKind::And) && !lv.to_bool() {
        return Ok((lv, sc0));
    }
    if matches!(op, BinOpKind::Or) && lv.to_bool() {
        return Ok((lv, sc0));
    }
    let (rv, sc1) = eval_expr(env, rhs)?;
    let rv = fst(rv);
    let (result, sc2) = operators::binary(lv, op, span, rv)?;
    Ok((result, and_opt(and_opt(sc0, sc1), sc2)))
}

fn eval_literal(lit: &Literal, span: TokenSpan) -> ExprEval {
    let origin_hint = |h: &str| Origin::Literal {
        tokens: vec![span],
        hint: h.to_string(),
    };
    let v = match lit {
        Literal::Nil => Value::nil().with_origin(origin_hint("nil")),
        Literal::True => Value::bool(true).with_origin(origin_hint("true")),
        Literal::False => Value::bool(false).with_origin(origin_hint("false")),
        Literal::Number(n) => Value::number(*n).with_origin(origin_hint("number")),
        Literal::RawString(raw) => {
            let decoded = strings::decode_string_literal(raw)?;
            Value::string(decoded).with_origin(origin_hint("string"))
        }
    };
    Ok((v, None))
}

fn eval_table_constructor(env: &Environment, fields: &[TableField]) -> ExprEval {
    let table = Rc::new(RefCell::new(Table::new()));
    let mut sc = None;
    let mut next_index = 1i64;
    for (i, field) in fields.iter().enumerate() {
        match field {
            TableField::Positional(expr) => {
                if i + 1 == fields.len() {
                    // tail position: a vallist result spreads across
                    // consecutive integer keys (spec §3.1.4 `flatten`).
                    let (v, s) = eval_expr(env, expr)?;
                    sc = and_opt(sc, s);
                    match v.data {
                        ValueData::Vallist(list) => {
                            for item in list.iter() {
                                table
                                    .borrow_mut()
                                    .set(Value::number(next_index as f64), item.clone());
                                next_index += 1;
                            }
                        }
                        _ => {
                            table.borrow_mut().set(Value::number(next_index as f64), v);
                            next_index += 1;
                        }
                    }
                } else {
                    let (v, s) = eval_expr(env, expr)?;
                    sc = and_opt(sc, s);
                    table
                        .borrow_mut()
                        .set(Value::number(next_index as f64), fst(v));
                    next_index += 1;
                }
            }
            TableField::Named(name, expr) => {
                let (v, s) = eval_expr(env, expr)?;
                sc = and_opt(sc, s);
                table
                    .borrow_mut()
                    .set(Value::string(name.as_str()), fst(v));
            }
            TableField::Keyed(key_expr, expr) => {
                let (k, sk) = eval_expr(env, key_expr)?;
                let (v, sv) = eval_expr(env, expr)?;
                sc = and_opt(and_opt(sc, sk), sv);
                table.borrow_mut().set(fst(k), fst(v));
            }
        }
    }
    Ok((Value::table(table), sc))
}

fn eval_exprlist_flattened(env: &Environment, exprs: &[Expr]) -> Result<(Vec<Value>, Option<SourceChange>), String> {
    let mut values = Vec::with_capacity(exprs.len());
    let mut sc = None;
    for expr in exprs {
        let (v, s) = eval_expr(env, expr)?;
        sc = and_opt(sc, s);
        values.push(v);
    }
    Ok((flatten(values), sc))
}

/// Function call dispatch (spec §4.2 "Function call"): native functions run
/// directly; Lua functions get a fresh child scope of their captured
/// environment with parameters bound (missing → Nil, extra → discarded,
/// extra captured as `...` when the function declares a vararg); `nil`
/// errors.
pub fn call_value(env: &Environment, callee: &Value, args: Vec<Value>) -> Result<Vec<Value>, String> {
    env.trace_call(|| format!("call {}", callee.to_display_string()).into());
    match &callee.data {
        ValueData::CFunction(f) => match (f.func)(env, &args) {
            CallResult::Values(vs) => Ok(vs),
            CallResult::Error(e) => Err(e),
            // Callers that need the surfaced change go through
            // `call_value_with_change` instead.
            CallResult::Change(vs, _sc) => Ok(vs),
        },
        ValueData::LuaFunction(def) => {
            let call_env = def.captured_env.child();
            for (i, param) in def.params.iter().enumerate() {
                call_env.declare_local(param);
                call_env.set_local(param, args.get(i).cloned().unwrap_or_else(Value::nil));
            }
            if def.has_vararg {
                let extra: Vec<Value> = args.iter().skip(def.params.len()).cloned().collect();
                call_env.set_varargs(Some(Rc::new(extra)));
            }
            match eval_chunk(&call_env, &def.body)? {
                StmtOutcome::Return(vs, _) => Ok(vs),
                StmtOutcome::Normal(_) | StmtOutcome::Break(_) => Ok(Vec::new()),
            }
        }
        ValueData::Nil => Err("attempted to call a nil value".to_string()),
        _ => Err(format!(
            "attempted to call a {} value",
            callee.type_name()
        )),
    }
}

/// Like [`call_value`] but also surfaces any `SourceChange` a native
/// function (notably `force`) returned — used at `Expr::Call` sites so the
/// change can propagate to the top-level `evaluate()` result.
pub fn call_value_with_change(
    env: &Environment,
    callee: &Value,
    args: Vec<Value>,
) -> Result<(Vec<Value>, Option<SourceChange>), String> {
    match &callee.data {
        ValueData::CFunction(f) => match (f.func)(env, &args) {
            CallResult::Values(vs) => Ok((vs, None)),
            CallResult::Error(e) => Err(e),
            CallResult::Change(vs, sc) => Ok((vs, Some(sc))),
        },
        _ => Ok((call_value(env, callee, args)?, None)),
    }
}
