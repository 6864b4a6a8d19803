//! Lua table: hybrid array/hash map (spec §3.1.1), grounded in
//! `other_examples/iGentAI-ferrous`'s `Table` (`array: Vec<Value>` +
//! `map: HashMap<HashableValue, Value>`), minus the metatable field — out of
//! scope per spec §1's explicit Non-goals.

use super::{Value, ValueData};
use ahash::AHashMap;
use std::rc::Rc;

/// Wraps a `Value` so it can key an `AHashMap`, matching spec §3.1's
/// equality rule (structural for primitives, pointer identity for
/// tables/functions) rather than deriving a structural `Hash`/`Eq` on
/// `Value` itself (which would be wrong for table/function keys).
#[derive(Clone)]
struct Key(Value);

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0.lua_eq(&other.0)
    }
}
impl Eq for Key {}

impl std::hash::Hash for Key {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match &self.0.data {
            ValueData::Nil => 0u8.hash(state),
            ValueData::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            ValueData::Number(n) => {
                2u8.hash(state);
                n.to_bits().hash(state);
            }
            ValueData::String(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            ValueData::Table(t) => {
                4u8.hash(state);
                (Rc::as_ptr(t) as usize).hash(state);
            }
            ValueData::LuaFunction(f) => {
                5u8.hash(state);
                (Rc::as_ptr(f) as usize).hash(state);
            }
            ValueData::CFunction(f) => {
                6u8.hash(state);
                (Rc::as_ptr(&f.func) as *const () as usize).hash(state);
            }
            ValueData::Vallist(v) => {
                7u8.hash(state);
                (Rc::as_ptr(v) as usize).hash(state);
            }
        }
    }
}

#[derive(Default)]
pub struct Table {
    /// `array[i]` holds the value for integer key `i + 1`.
    array: Vec<Value>,
    map: AHashMap<Key, Value>,
}

impl Table {
    pub fn new() -> Self {
        Table {
            array: Vec::new(),
            map: AHashMap::new(),
        }
    }

    fn array_index(key: &Value) -> Option<usize> {
        match key.data {
            ValueData::Number(n) if n.fract() == 0.0 && n >= 1.0 => Some(n as usize - 1),
            _ => None,
        }
    }

    pub fn get(&self, key: &Value) -> Value {
        if let Some(idx) = Self::array_index(key) {
            if idx < self.array.len() {
                return self.array[idx].clone();
            }
        }
        self.map
            .get(&Key(key.clone()))
            .cloned()
            .unwrap_or_else(Value::nil)
    }

    pub fn set(&mut self, key: Value, value: Value) {
        if let Some(idx) = Self::array_index(&key) {
            if idx < self.array.len() {
                self.array[idx] = value;
                return;
            }
            if idx == self.array.len() {
                self.array.push(value);
                // absorb any contiguous successors already stashed in `map`
                loop {
                    let next_key = Value::number((self.array.len() + 1) as f64);
                    match self.map.remove(&Key(next_key)) {
                        Some(v) => self.array.push(v),
                        None => break,
                    }
                }
                return;
            }
        }
        if value.is_nil() {
            self.map.remove(&Key(key));
        } else {
            self.map.insert(Key(key), value);
        }
    }

    /// Linear border scan (spec §4.3 `#`): the largest `n` such that
    /// `t[1..n]` are all non-nil.
    pub fn border(&self) -> i64 {
        let mut n = 0usize;
        while n < self.array.len() && !self.array[n].is_nil() {
            n += 1;
        }
        if n == self.array.len() {
            loop {
                let probe = Value::number((n + 1) as f64);
                match self.map.get(&Key(probe)) {
                    Some(v) if !v.is_nil() => n += 1,
                    _ => break,
                }
            }
        }
        n as i64
    }

    pub fn iter(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.array
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nil())
            .map(|(i, v)| (Value::number((i + 1) as f64), v.clone()))
            .chain(self.map.iter().map(|(k, v)| (k.0.clone(), v.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_part_grows_contiguously() {
        let mut t = Table::new();
        t.set(Value::number(1.0), Value::string("a"));
        t.set(Value::number(2.0), Value::string("b"));
        assert_eq!(t.get(&Value::number(1.0)).as_string().unwrap(), "a");
        assert_eq!(t.border(), 2);
    }

    #[test]
    fn out_of_order_inserts_absorb_into_array_once_contiguous() {
        let mut t = Table::new();
        t.set(Value::number(2.0), Value::string("b"));
        t.set(Value::number(1.0), Value::string("a"));
        assert_eq!(t.border(), 2);
        assert_eq!(t.get(&Value::number(2.0)).as_string().unwrap(), "b");
    }

    #[test]
    fn setting_nil_removes_hash_entry() {
        let mut t = Table::new();
        t.set(Value::string("k"), Value::number(1.0));
        assert!(!t.get(&Value::string("k")).is_nil());
        t.set(Value::string("k"), Value::nil());
        assert!(t.get(&Value::string("k")).is_nil());
    }

    #[test]
    fn missing_key_reads_as_nil() {
        let t = Table::new();
        assert!(t.get(&Value::string("missing")).is_nil());
    }

    #[test]
    fn table_identity_keys_distinguish_equal_valued_tables() {
        let mut outer = Table::new();
        let a = Rc::new(std::cell::RefCell::new(Table::new()));
        let b = Rc::new(std::cell::RefCell::new(Table::new()));
        outer.set(Value::table(a.clone()), Value::number(1.0));
        assert!(outer.get(&Value::table(b)).is_nil());
        assert_eq!(outer.get(&Value::table(a)).as_number(), Some(1.0));
    }
}
