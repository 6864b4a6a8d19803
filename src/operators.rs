//! Operator kernel (spec §4.3): per-operator forward semantics plus origin
//! attachment, grounded directly in
//! `examples/original_source/src/core/operators.cpp`'s `op_*` functions.

use crate::ast::{BinOpKind, UnOpKind};
use crate::origin::Origin;
use crate::source_change::SourceChange;
use crate::syntax::token::TokenSpan;
use crate::value::{Value, ValueData};
use std::rc::Rc;

/// `(value, surfaced source-change)` — the pair every expression-level
/// evaluation produces (spec §4.2).
pub type OpResult = Result<(Value, Option<SourceChange>), String>;

fn ok(v: Value) -> OpResult {
    Ok((v, None))
}

pub fn binary(lhs: Value, op: BinOpKind, token: TokenSpan, rhs: Value) -> OpResult {
    match op {
        BinOpKind::Add => arith(lhs, rhs, op, token, "add", |a, b| a + b),
        BinOpKind::Sub => arith(lhs, rhs, op, token, "subtract", |a, b| a - b),
        BinOpKind::Mul => arith(lhs, rhs, op, token, "multiply", |a, b| a * b),
        BinOpKind::Div => arith(lhs, rhs, op, token, "divide", |a, b| a / b),
        BinOpKind::Pow => arith(lhs, rhs, op, token, "exponentiate", |a, b| a.powf(b)),
        BinOpKind::Mod => arith(lhs, rhs, op, token, "mod", |a, b| a - (a / b).floor() * b),
        BinOpKind::Concat => op_concat(lhs, rhs),
        BinOpKind::Lt => op_lt(lhs, rhs),
        BinOpKind::Le => op_leq(lhs, rhs),
        BinOpKind::Gt => op_gt(lhs, rhs),
        BinOpKind::Ge => op_geq(lhs, rhs),
        BinOpKind::Eq => ok(op_eq(&lhs, &rhs)),
        BinOpKind::Ne => {
            let eq = op_eq(&lhs, &rhs);
            ok(Value::bool(!eq.to_bool()))
        }
        BinOpKind::And | BinOpKind::Or => ok(op_logical(lhs, rhs, op, token)),
        BinOpKind::Eval => op_eval(lhs, rhs, token),
    }
}

pub fn unary(op: UnOpKind, token: TokenSpan, operand: Value) -> OpResult {
    match op {
        UnOpKind::Neg => op_neg(operand, token),
        UnOpKind::Not => ok(Value::bool(!operand.to_bool())),
        UnOpKind::Len => op_len(operand),
        UnOpKind::Strip => ok(Value { origin: None, ..operand }),
        UnOpKind::Eval => op_postfix_eval(operand, token),
    }
}

fn arith(
    a: Value,
    b: Value,
    op: BinOpKind,
    token: TokenSpan,
    verb: &str,
    f: impl Fn(f64, f64) -> f64,
) -> OpResult {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => {
            let result = f(x, y);
            let origin = Origin::BinaryOp {
                lhs: a,
                rhs: b,
                op,
                token,
            };
            ok(Value::number(result).with_origin(origin))
        }
        _ => Err(format!(
            "could not {} values of type other than number ({}, {})",
            verb,
            a.type_name(),
            b.type_name()
        )),
    }
}

/// `and`/`or` (spec §4.3): short-circuit survivor selection, with a Binary
/// origin attached so reverse goes through `reverse_logical` rather than the
/// survivor's own prior origin.
fn op_logical(lhs: Value, rhs: Value, op: BinOpKind, token: TokenSpan) -> Value {
    let survivor = match op {
        BinOpKind::And if lhs.to_bool() => rhs.clone(),
        BinOpKind::And => lhs.clone(),
        BinOpKind::Or if lhs.to_bool() => lhs.clone(),
        BinOpKind::Or => rhs.clone(),
        _ => unreachable!("op_logical only called for And/Or"),
    };
    survivor.with_origin(Origin::BinaryOp { lhs, rhs, op, token })
}

fn op_concat(a: Value, b: Value) -> OpResult {
    let stringish = |v: &Value| match &v.data {
        ValueData::Number(_) | ValueData::String(_) => Some(v.to_display_string()),
        _ => None,
    };
    match (stringish(&a), stringish(&b)) {
        (Some(sa), Some(sb)) => ok(Value::string(format!("{}{}", sa, sb))),
        _ => Err("could not concatenate other types than strings or numbers".to_string()),
    }
}

fn op_lt(a: Value, b: Value) -> OpResult {
    compare(a, b, |x, y| x < y, |x, y| x < y)
}
fn op_leq(a: Value, b: Value) -> OpResult {
    compare(a, b, |x, y| x <= y, |x, y| x <= y)
}
fn op_gt(a: Value, b: Value) -> OpResult {
    compare(a, b, |x, y| x > y, |x, y| x > y)
}
fn op_geq(a: Value, b: Value) -> OpResult {
    compare(a, b, |x, y| x >= y, |x, y| x >= y)
}

fn compare(
    a: Value,
    b: Value,
    fnum: impl Fn(f64, f64) -> bool,
    fstr: impl Fn(&str, &str) -> bool,
) -> OpResult {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return ok(Value::bool(fnum(x, y)));
    }
    if let (Some(x), Some(y)) = (a.as_string(), b.as_string()) {
        return ok(Value::bool(fstr(x.as_str(), y.as_str())));
    }
    Err("only strings and numbers can be compared".to_string())
}

fn op_eq(a: &Value, b: &Value) -> Value {
    Value::bool(a.lua_eq(b))
}

fn op_len(v: Value) -> OpResult {
    match v.as_table() {
        Some(t) => ok(Value::number(t.borrow().border() as f64)),
        None => Err(format!(
            "unary # can only be applied to a table (is {})",
            v.type_name()
        )),
    }
}

fn op_neg(v: Value, token: TokenSpan) -> OpResult {
    match v.as_number() {
        Some(n) => {
            let origin = Origin::UnaryOp {
                operand: v,
                op: UnOpKind::Neg,
                token,
            };
            ok(Value::number(-n).with_origin(origin))
        }
        None => Err("unary - can only be applied to a number".to_string()),
    }
}

/// `a \ b` (binary live-eval): result is `a`; if `b`'s origin is a bare
/// `Literal`, surfaces a change rewriting `b`'s tokens to `a`'s literal text
/// (spec §4.3, `examples/original_source/src/core/operators.cpp`'s
/// `op_eval` — "make this work with rhs expressions" was left a TODO there
/// and is preserved as the same limitation here).
fn op_eval(a: Value, b: Value, token: TokenSpan) -> OpResult {
    let origin = Origin::BinaryOp {
        lhs: a.clone(),
        rhs: b.clone(),
        op: BinOpKind::Eval,
        token,
    };
    let result = a.clone().with_origin(origin);

    if let Some(origin) = b.origin.as_ref() {
        if let crate::origin::Origin::Literal { tokens, hint } = origin.as_ref() {
            let mut iter = tokens.iter();
            let Some(first) = iter.next() else {
                return Ok((result, None));
            };
            let mut sc = SourceChange::single(*first, a.to_literal(), hint.clone());
            for rest in iter {
                sc = sc.and(SourceChange::single(*rest, "", hint.clone()));
            }
            return Ok((result, Some(sc)));
        }
    }
    Ok((result, None))
}

/// Postfix `a\`: origin becomes a `UnaryOp`, and the operator itself always
/// surfaces a change rewriting its own token to `\` + the operand's literal
/// text (spec §9's "undertested... left to implementer discretion" case,
/// resolved by adopting `op_postfix_eval`'s concrete behavior).
fn op_postfix_eval(a: Value, token: TokenSpan) -> OpResult {
    let origin = Origin::UnaryOp {
        operand: a.clone(),
        op: UnOpKind::Eval,
        token,
    };
    let result = a.clone().with_origin(origin);
    let sc = SourceChange::single(token, format!("\\{}", a.to_literal()), "live-eval");
    Ok((result, Some(sc)))
}

/// `math.sqrt`'s Lambda-origin demo (spec §4.1), grounded in `operators.cpp`'s
/// local `sqrt_exp` struct: forcing the result to `v'` forces the argument to
/// `v'^2` whenever that stays finite.
pub fn sqrt_origin(x: Value) -> Origin {
    Origin::Lambda(Rc::new(move |new_value: &Value| {
        let v_new = new_value.as_number()?;
        let squared = v_new * v_new;
        if !squared.is_finite() {
            return None;
        }
        x.force(&Value::number(squared))
    }))
}

pub fn sin_origin(x: Value) -> Origin {
    Origin::Lambda(Rc::new(move |new_value: &Value| {
        let v_new = new_value.as_number()?;
        if v_new.abs() > 1.0 {
            return None;
        }
        x.force(&Value::number(v_new.asin()))
    }))
}

pub fn cos_origin(x: Value) -> Origin {
    Origin::Lambda(Rc::new(move |new_value: &Value| {
        let v_new = new_value.as_number()?;
        if v_new.abs() > 1.0 {
            return None;
        }
        x.force(&Value::number(v_new.acos()))
    }))
}

pub fn tan_origin(x: Value) -> Origin {
    Origin::Lambda(Rc::new(move |new_value: &Value| {
        let v_new = new_value.as_number()?;
        x.force(&Value::number(v_new.atan()))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> TokenSpan {
        TokenSpan::new(0, 0)
    }

    #[test]
    fn add_attaches_binary_op_origin() {
        let (v, sc) = binary(Value::number(1.0), BinOpKind::Add, t(), Value::number(2.0)).unwrap();
        assert_eq!(v.as_number(), Some(3.0));
        assert!(sc.is_none());
        assert!(v.origin.is_some());
    }

    #[test]
    fn divide_by_non_number_is_a_type_error() {
        let err = binary(Value::number(1.0), BinOpKind::Div, t(), Value::string("x")).unwrap_err();
        assert!(err.contains("divide"));
    }

    #[test]
    fn concat_accepts_numbers_and_strings_but_not_tables() {
        let (v, _) = binary(Value::number(1.0), BinOpKind::Concat, t(), Value::string("x")).unwrap();
        assert_eq!(v.as_string().unwrap(), "1x");
        let table = Value::table(Rc::new(std::cell::RefCell::new(crate::value::Table::new())));
        assert!(binary(table, BinOpKind::Concat, t(), Value::string("x")).is_err());
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        let (v, _) = binary(Value::string("a"), BinOpKind::Lt, t(), Value::string("b")).unwrap();
        assert!(v.to_bool());
    }

    #[test]
    fn len_requires_a_table() {
        assert!(unary(UnOpKind::Len, t(), Value::number(1.0)).is_err());
        let table = Value::table(Rc::new(std::cell::RefCell::new(crate::value::Table::new())));
        let (v, _) = unary(UnOpKind::Len, t(), table).unwrap();
        assert_eq!(v.as_number(), Some(0.0));
    }

    #[test]
    fn strip_clears_origin_but_keeps_value() {
        let (v, _) = binary(Value::number(1.0), BinOpKind::Add, t(), Value::number(2.0)).unwrap();
        assert!(v.origin.is_some());
        let (stripped, _) = unary(UnOpKind::Strip, t(), v).unwrap();
        assert!(stripped.origin.is_none());
        assert_eq!(stripped.as_number(), Some(3.0));
    }

    #[test]
    fn and_or_short_circuit_to_the_surviving_operand() {
        let (v, _) = binary(Value::bool(false), BinOpKind::And, t(), Value::number(9.0)).unwrap();
        assert!(!v.to_bool());
        let (v, _) = binary(Value::number(1.0), BinOpKind::And, t(), Value::number(9.0)).unwrap();
        assert_eq!(v.as_number(), Some(9.0));
        let (v, _) = binary(Value::number(1.0), BinOpKind::Or, t(), Value::number(9.0)).unwrap();
        assert_eq!(v.as_number(), Some(1.0));
    }

    #[test]
    fn and_or_attach_a_binary_origin_that_reverses_through_the_survivor() {
        let lhs = Value::number(1.0).with_origin(Origin::Literal {
            tokens: vec![t()],
            hint: "number".to_string(),
        });
        let (v, _) = binary(lhs, BinOpKind::And, t(), Value::number(9.0)).unwrap();
        // `rhs` (the survivor here) has no origin, so reverse yields nothing,
        // unlike the old pass-through-the-literal-operand's-own-origin shape.
        assert!(v.force(&Value::number(2.0)).is_none());
    }
}
