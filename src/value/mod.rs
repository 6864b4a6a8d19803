//! The Lua value model (spec §3.1 / §4.1), grounded in the `Rc<RefCell<..>>`
//! reference-semantics representation used throughout the pack's Lua-in-Rust
//! corpus (`other_examples/iGentAI-ferrous`'s `rc_value.rs`), adapted here so
//! every value additionally carries an optional [`Origin`] — a field the
//! teacher's packed `LuaValue` union has no room for, which is why this
//! crate does not reuse that representation (see `DESIGN.md`).

mod table;

pub use table::Table;

use crate::ast::Chunk;
use crate::env::Environment;
use crate::origin::Origin;
use crate::source_change::SourceChange;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type TableHandle = Rc<RefCell<Table>>;

/// A native, host-provided callable (spec §3.1.3).
#[derive(Clone)]
pub struct CFunction {
    pub name: SmolStr,
    pub func: Rc<dyn Fn(&Environment, &[Value]) -> CallResult>,
}

impl fmt::Debug for CFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CFunction({})", self.name)
    }
}

/// The three-way result a native function can produce (spec §3.1.3): plain
/// values, an error message, or a source-change tree it wants surfaced to
/// the top-level `evaluate()` result (used by `force`).
pub enum CallResult {
    Values(Vec<Value>),
    Error(String),
    Change(Vec<Value>, SourceChange),
}

/// A Lua closure: AST body + parameter names + the captured defining scope
/// (spec §3.1.2).
pub struct LuaFunctionDef {
    pub params: Vec<String>,
    pub has_vararg: bool,
    pub body: Rc<Chunk>,
    pub captured_env: Environment,
    pub name: RefCell<Option<String>>,
}

#[derive(Clone)]
pub enum ValueData {
    Nil,
    Bool(bool),
    Number(f64),
    String(SmolStr),
    Table(TableHandle),
    CFunction(CFunction),
    LuaFunction(Rc<LuaFunctionDef>),
    /// Packs multiple values (spec §3.1.4): collapses to its head outside
    /// tail position, spreads within it.
    Vallist(Rc<Vec<Value>>),
}

/// A Lua value paired with an optional origin, mirroring the original
/// reference's `val` type (a `std::variant` with an extra `source` field) —
/// see `examples/original_source/include/MiniLua/val.hpp`.
#[derive(Clone)]
pub struct Value {
    pub data: ValueData,
    pub origin: Option<Rc<Origin>>,
}

impl Value {
    pub fn nil() -> Self {
        Value {
            data: ValueData::Nil,
            origin: None,
        }
    }

    pub fn bool(b: bool) -> Self {
        Value {
            data: ValueData::Bool(b),
            origin: None,
        }
    }

    pub fn number(n: f64) -> Self {
        Value {
            data: ValueData::Number(n),
            origin: None,
        }
    }

    pub fn string(s: impl Into<SmolStr>) -> Self {
        Value {
            data: ValueData::String(s.into()),
            origin: None,
        }
    }

    pub fn table(t: TableHandle) -> Self {
        Value {
            data: ValueData::Table(t),
            origin: None,
        }
    }

    pub fn cfunction(name: impl Into<SmolStr>, func: Rc<dyn Fn(&Environment, &[Value]) -> CallResult>) -> Self {
        Value {
            data: ValueData::CFunction(CFunction {
                name: name.into(),
                func,
            }),
            origin: None,
        }
    }

    pub fn lua_function(def: LuaFunctionDef) -> Self {
        Value {
            data: ValueData::LuaFunction(Rc::new(def)),
            origin: None,
        }
    }

    pub fn vallist(values: Vec<Value>) -> Self {
        Value {
            data: ValueData::Vallist(Rc::new(values)),
            origin: None,
        }
    }

    pub fn with_origin(&self, origin: Origin) -> Self {
        let mut v = self.clone();
        v.origin = Some(Rc::new(origin));
        v
    }

    /// `type()`: one of nil/bool/number/string/function/table/vallist
    /// (spec §4.1).
    pub fn type_name(&self) -> &'static str {
        match &self.data {
            ValueData::Nil => "nil",
            ValueData::Bool(_) => "bool",
            ValueData::Number(_) => "number",
            ValueData::String(_) => "string",
            ValueData::Table(_) => "table",
            ValueData::CFunction(_) | ValueData::LuaFunction(_) => "function",
            ValueData::Vallist(_) => "vallist",
        }
    }

    /// Lua truthiness: only `nil` and `false` are falsey (spec §3.1).
    pub fn to_bool(&self) -> bool {
        !matches!(self.data, ValueData::Nil | ValueData::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.data, ValueData::Nil)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.data {
            ValueData::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&SmolStr> {
        match &self.data {
            ValueData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableHandle> {
        match &self.data {
            ValueData::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Human-readable form used by `print`.
    pub fn to_display_string(&self) -> String {
        match &self.data {
            ValueData::Nil => "nil".to_string(),
            ValueData::Bool(b) => b.to_string(),
            ValueData::Number(n) => format_number(*n),
            ValueData::String(s) => s.to_string(),
            ValueData::Table(t) => format!("table: {:p}", Rc::as_ptr(t)),
            ValueData::CFunction(f) => format!("function: builtin<{}>", f.name),
            ValueData::LuaFunction(f) => match f.name.borrow().as_deref() {
                Some(name) => format!("function: {} ({:p})", name, Rc::as_ptr(f)),
                None => format!("function: {:p}", Rc::as_ptr(f)),
            },
            ValueData::Vallist(v) => v
                .first()
                .map(Value::to_display_string)
                .unwrap_or_else(|| "nil".to_string()),
        }
    }

    /// Source-level syntax used when emitting replacements: strings quoted,
    /// numbers minimally formatted (spec §3.1 "Stringification").
    pub fn to_literal(&self) -> String {
        match &self.data {
            ValueData::String(s) => format!("\"{}\"", escape_for_literal(s)),
            _ => self.to_display_string(),
        }
    }

    /// Whether re-evaluation of this value's subtree could change its
    /// result (spec §3.2 "Dirty flag").
    pub fn is_dirty(&self) -> bool {
        self.origin.as_ref().map(|o| o.is_dirty()).unwrap_or(false)
    }

    /// `force(v_target)`: shorthand for `origin().reverse(v_target)` if
    /// present, else `None` (spec §4.1).
    pub fn force(&self, target: &Value) -> Option<SourceChange> {
        self.origin.as_ref().and_then(|o| o.reverse(target))
    }

    /// Structural equality for Nil/Bool/Number/String; reference equality
    /// for Table/CFunction/LuaFunction (spec §3.1). Origins never
    /// participate in equality.
    pub fn lua_eq(&self, other: &Value) -> bool {
        use ValueData::*;
        match (&self.data, &other.data) {
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Table(a), Table(b)) => Rc::ptr_eq(a, b),
            (LuaFunction(a), LuaFunction(b)) => Rc::ptr_eq(a, b),
            (CFunction(a), CFunction(b)) => Rc::ptr_eq(&a.func, &b.func),
            _ => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        n.to_string()
    }
}

fn escape_for_literal(s: &str) -> String {
    let mut out = std::string::String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Collapses a value to its head (or Nil if a vallist is empty) — the
/// non-tail-position rule from spec §3.1.4.
pub fn fst(v: Value) -> Value {
    match v.data {
        ValueData::Vallist(list) => list.first().cloned().unwrap_or_else(Value::nil),
        _ => v,
    }
}

/// Spreads tail-position vallists into a flat sequence, collapsing all
/// non-tail ones along the way (spec §3.1.4 `flatten`).
pub fn flatten(values: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::with_capacity(values.len());
    let last_index = values.len().checked_sub(1);
    for (i, v) in values.into_iter().enumerate() {
        if Some(i) == last_index {
            match v.data {
                ValueData::Vallist(list) => {
                    out.extend(Rc::try_unwrap(list).unwrap_or_else(|rc| (*rc).clone()));
                }
                _ => out.push(v),
            }
        } else {
            out.push(fst(v));
        }
    }
    out
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fst_collapses_a_vallist_to_its_head() {
        let vl = Value::vallist(vec![Value::number(1.0), Value::number(2.0)]);
        assert_eq!(fst(vl).as_number(), Some(1.0));
        assert!(fst(Value::vallist(Vec::new())).is_nil());
    }

    #[test]
    fn flatten_spreads_only_the_tail_position() {
        let values = vec![
            Value::vallist(vec![Value::number(1.0), Value::number(2.0)]),
            Value::vallist(vec![Value::number(3.0), Value::number(4.0)]),
        ];
        let flat = flatten(values);
        let nums: Vec<f64> = flat.iter().map(|v| v.as_number().unwrap()).collect();
        assert_eq!(nums, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn integral_numbers_format_without_a_decimal_point() {
        assert_eq!(Value::number(3.0).to_display_string(), "3");
        assert_eq!(Value::number(3.5).to_display_string(), "3.5");
    }

    #[test]
    fn strings_render_quoted_as_a_literal_but_plain_as_display() {
        let s = Value::string("hi\n\"there\"");
        assert_eq!(s.to_display_string(), "hi\n\"there\"");
        assert_eq!(s.to_literal(), "\"hi\\n\\\"there\\\"\"");
    }

    #[test]
    fn lua_eq_is_structural_for_primitives_and_by_reference_for_tables() {
        assert!(Value::number(1.0).lua_eq(&Value::number(1.0)));
        assert!(!Value::number(1.0).lua_eq(&Value::string("1")));
        let t1 = Value::table(Rc::new(RefCell::new(Table::new())));
        let t2 = Value::table(Rc::new(RefCell::new(Table::new())));
        assert!(!t1.lua_eq(&t2));
        assert!(t1.lua_eq(&t1.clone()));
    }
}
