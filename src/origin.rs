//! Origin tree and the reverse-evaluation protocol (spec §3.2, §4.1),
//! grounded in `examples/original_source/include/MiniLua/sourceexp.hpp`'s
//! `sourceval`/`sourcebinop`/`sourceunop` hierarchy and the `forceValue`
//! switch statements in `examples/original_source/src/core/sourceexp.cpp`.
//! The Lambda escape hatch (used by `math.sin`/`cos`/`tan`/`sqrt`) is
//! grounded in `operators.cpp`'s local `sqrt_exp` struct.

use crate::ast::{BinOpKind, UnOpKind};
use crate::source_change::{or_opt, SourceChange};
use crate::syntax::token::TokenSpan;
use crate::value::{Value, ValueData};
use std::rc::Rc;

/// Sum of four variants describing how a value was derived (spec §3.2).
pub enum Origin {
    /// value came from a source literal at these byte ranges.
    Literal { tokens: Vec<TokenSpan>, hint: String },
    /// value = op(operand); reverse delegates to the operand.
    UnaryOp {
        operand: Value,
        op: UnOpKind,
        token: TokenSpan,
    },
    /// value = lhs op rhs; reverse computes a partial algebraic inverse.
    BinaryOp {
        lhs: Value,
        rhs: Value,
        op: BinOpKind,
        token: TokenSpan,
    },
    /// Escape hatch: arbitrary captured state + reverse closure, used by
    /// stdlib functions that want custom inversion (spec §4.1).
    Lambda(Rc<dyn Fn(&Value) -> Option<SourceChange>>),
}

impl Origin {
    /// An origin is dirty if any operand value is dirty (spec §3.2).
    pub fn is_dirty(&self) -> bool {
        match self {
            Origin::Literal { .. } => false,
            Origin::UnaryOp { operand, .. } => operand.is_dirty(),
            Origin::BinaryOp { lhs, rhs, .. } => lhs.is_dirty() || rhs.is_dirty(),
            Origin::Lambda(_) => false,
        }
    }

    /// `reverse(v')`: returns a `SourceChange` that, applied and re-run,
    /// would make this subexpression evaluate to `v'` — or `None` if no
    /// such change exists (spec §4.1 "Origin.reverse contract").
    pub fn reverse(&self, new_value: &Value) -> Option<SourceChange> {
        match self {
            Origin::Literal { tokens, hint } => Some(reverse_literal(tokens, hint, new_value)),
            Origin::UnaryOp { operand, op, token } => {
                reverse_unary(operand, *op, token, new_value)
            }
            Origin::BinaryOp { lhs, rhs, op, token } => match op {
                BinOpKind::And | BinOpKind::Or => reverse_logical(lhs, rhs, *op, new_value),
                _ => reverse_binary(lhs, rhs, *op, token, new_value),
            },
            Origin::Lambda(f) => f(new_value),
        }
    }
}

/// Literal reverse (spec §4.1): a single token rewrites directly; a
/// multi-token literal rewrites its first token and blanks the rest, all
/// tagged with the origin's hint.
fn reverse_literal(tokens: &[TokenSpan], hint: &str, new_value: &Value) -> SourceChange {
    let literal = new_value.to_literal();
    let mut iter = tokens.iter();
    let first = iter.next().expect("Literal origin always has >=1 token");
    let mut sc = SourceChange::single(*first, literal, hint);
    for rest in iter {
        sc = sc.and(SourceChange::single(*rest, "", hint));
    }
    sc
}

fn reverse_unary(
    operand: &Value,
    op: UnOpKind,
    token: &TokenSpan,
    new_value: &Value,
) -> Option<SourceChange> {
    match op {
        UnOpKind::Neg => {
            let v_new = new_value.as_number()?;
            // Alternative 1: force the operand to -v', keeping the leading '-'.
            let keep_minus = operand.force(&Value::number(-v_new));
            // Alternative 2: force the operand to v' and delete the leading '-'.
            let drop_minus = operand
                .force(new_value)
                .map(|sc| sc.and(SourceChange::single(*token, "", "remove unary minus")));
            or_opt(keep_minus, drop_minus)
        }
        UnOpKind::Not => {
            let desired = match new_value.data {
                ValueData::Bool(b) => b,
                _ => return None,
            };
            let old = !operand.to_bool();
            if old != desired {
                operand.force(&Value::bool(!desired))
            } else {
                None
            }
        }
        // Length, strip, and live-eval results don't support reverse in the
        // reference implementation either.
        UnOpKind::Len | UnOpKind::Strip | UnOpKind::Eval => None,
    }
}

fn reverse_binary(
    lhs: &Value,
    rhs: &Value,
    op: BinOpKind,
    _token: &TokenSpan,
    new_value: &Value,
) -> Option<SourceChange> {
    let v_new = new_value.as_number()?;
    let a = lhs.as_number();
    let b = rhs.as_number();
    let mut candidates: Option<SourceChange> = None;

    macro_rules! try_lhs {
        ($target:expr) => {
            if lhs.origin.is_some() {
                candidates = or_opt(candidates, lhs.force(&Value::number($target)));
            }
        };
    }
    macro_rules! try_rhs {
        ($target:expr) => {
            if rhs.origin.is_some() {
                candidates = or_opt(candidates, rhs.force(&Value::number($target)));
            }
        };
    }

    match op {
        BinOpKind::Add => {
            if let Some(b) = b {
                try_lhs!(v_new - b);
            }
            if let Some(a) = a {
                try_rhs!(v_new - a);
            }
        }
        BinOpKind::Sub => {
            if let Some(b) = b {
                try_lhs!(v_new + b);
            }
            if let Some(a) = a {
                try_rhs!(a - v_new);
            }
        }
        BinOpKind::Mul => {
            if let Some(b) = b {
                if b != 0.0 {
                    try_lhs!(v_new / b);
                }
            }
            if let Some(a) = a {
                if a != 0.0 {
                    try_rhs!(v_new / a);
                }
            }
        }
        BinOpKind::Div => {
            if let Some(b) = b {
                try_lhs!(v_new * b);
            }
            if let Some(a) = a {
                if v_new != 0.0 {
                    try_rhs!(a / v_new);
                }
            }
        }
        BinOpKind::Pow => {
            if let Some(b) = b {
                if b != 0.0 {
                    let inv = v_new.powf(1.0 / b);
                    if inv.is_finite() {
                        try_lhs!(inv);
                    }
                }
            }
            if let Some(a) = a {
                let inv = v_new.ln() / a.ln();
                if inv.is_finite() {
                    try_rhs!(inv);
                }
            }
        }
        BinOpKind::Mod => {
            // Partial/asymmetric on purpose — matches
            // `examples/original_source/src/core/sourceexp.cpp`'s MOD case,
            // preserved verbatim per `SPEC_FULL.md` §F rather than "fixed".
            if let Some(b) = b {
                if b > v_new {
                    try_lhs!(v_new);
                }
            }
            if let Some(a) = a {
                try_rhs!(a - v_new);
            }
        }
        _ => return None,
    }

    candidates
}

/// `and`/`or` reverse (spec §4.3): the result is always a copy of whichever
/// operand survived short-circuiting, so reverse just forces that same
/// operand — recomputing the surviving side from `lhs`'s own truthiness
/// rather than assuming which branch was taken.
fn reverse_logical(lhs: &Value, rhs: &Value, op: BinOpKind, new_value: &Value) -> Option<SourceChange> {
    let survivor = match op {
        BinOpKind::And if lhs.to_bool() => rhs,
        BinOpKind::And => lhs,
        BinOpKind::Or if lhs.to_bool() => lhs,
        BinOpKind::Or => rhs,
        _ => unreachable!("reverse_logical only called for And/Or"),
    };
    survivor.force(new_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_change::and_opt;

    fn literal(n: f64, offset: usize, len: usize) -> Value {
        Value::number(n).with_origin(Origin::Literal {
            tokens: vec![TokenSpan::new(offset, len)],
            hint: "number".to_string(),
        })
    }

    #[test]
    fn reverse_literal_rewrites_its_own_token() {
        let v = literal(2.0, 4, 1);
        let sc = v.origin.as_ref().unwrap().reverse(&Value::number(3.0)).unwrap();
        let singles = sc.collect_first_alternative();
        assert_eq!(singles.len(), 1);
        assert_eq!(singles[0].span, TokenSpan::new(4, 1));
        assert_eq!(singles[0].replacement, "3");
    }

    #[test]
    fn reverse_add_forces_the_operand_that_has_an_origin() {
        let a = literal(1.0, 0, 1);
        let b = Value::number(2.0);
        let sum = crate::operators::binary(a, BinOpKind::Add, TokenSpan::new(1, 1), b).unwrap().0;
        let sc = sum.force(&Value::number(5.0)).expect("add should be reversible");
        let singles = sc.collect_first_alternative();
        assert_eq!(singles.len(), 1);
        assert_eq!(singles[0].replacement, "3");
    }

    #[test]
    fn reverse_mod_is_partial_on_the_left_operand() {
        let a = literal(7.0, 0, 1);
        let b = literal(10.0, 2, 2);
        let rem = crate::operators::binary(a, BinOpKind::Mod, TokenSpan::new(4, 1), b).unwrap().0;
        // b (10) > desired (3), so forcing the left operand succeeds.
        let forced_ok = rem.force(&Value::number(3.0));
        assert!(forced_ok.is_some());
        // b (10) does not exceed desired (12), so the left alternative is dropped,
        // leaving only the right-operand alternative.
        let forced_partial = rem.force(&Value::number(12.0)).unwrap();
        let singles = forced_partial.collect_first_alternative();
        assert_eq!(singles[0].span, TokenSpan::new(2, 2));
    }

    #[test]
    fn and_opt_keeps_both_contributions() {
        let a = literal(1.0, 0, 1).force(&Value::number(2.0));
        let b = literal(3.0, 5, 1).force(&Value::number(4.0));
        let combined = and_opt(a, b).unwrap();
        assert_eq!(combined.collect_first_alternative().len(), 2);
    }
}
