//! The source-change algebra and its application over the source text
//! (spec §3.3, §4.5), grounded in
//! `examples/original_source/include/luainterpreter.h`'s
//! `SourceChange`/`SourceChangeAnd`/`SourceChangeOr`/`SourceAssignment`
//! hierarchy and `examples/original_source/include/MiniLua/source_change.hpp`'s
//! field layout (a `Single` carries `{range, replacement}` plus an
//! `{origin, hint}` label pair).

use crate::syntax::token::TokenSpan;

#[derive(Debug, Clone)]
pub struct Single {
    pub span: TokenSpan,
    pub replacement: String,
    pub hint: String,
}

/// A tree of candidate edits (spec §3.3): `Single` leaves, `And` groups that
/// must all be applied together, `Or` groups of alternatives where the first
/// is preferred.
#[derive(Debug, Clone)]
pub enum SourceChange {
    Single(Single),
    And(Vec<SourceChange>),
    Or(Vec<SourceChange>),
}

impl SourceChange {
    pub fn single(span: TokenSpan, replacement: impl Into<String>, hint: impl Into<String>) -> Self {
        SourceChange::Single(Single {
            span,
            replacement: replacement.into(),
            hint: hint.into(),
        })
    }

    /// `&` combinator: And-combines two trees. Null-absorbing combination
    /// lives in [`and_opt`]; this is the non-optional two-child builder.
    /// Spec §4.5 asks implementers *not* to flatten during construction (to
    /// preserve labels) — flattening happens only in the applier/collector.
    pub fn and(self, other: SourceChange) -> SourceChange {
        SourceChange::And(vec![self, other])
    }

    /// `|` combinator: Or-combines two trees, preferring `self`.
    pub fn or(self, other: SourceChange) -> SourceChange {
        SourceChange::Or(vec![self, other])
    }

    /// Walks the tree depth-first, picking the first child of every `Or`
    /// and accumulating every encountered `Single` into a linear list (spec
    /// §4.5 `collect_first_alternative`).
    pub fn collect_first_alternative(&self) -> Vec<Single> {
        let mut out = Vec::new();
        self.collect_first_into(&mut out);
        out
    }

    fn collect_first_into(&self, out: &mut Vec<Single>) {
        match self {
            SourceChange::Single(s) => out.push(s.clone()),
            SourceChange::And(children) => {
                for c in children {
                    c.collect_first_into(out);
                }
            }
            SourceChange::Or(children) => {
                if let Some(first) = children.first() {
                    first.collect_first_into(out);
                }
            }
        }
    }
}

/// Null-absorbing `&`: a `None` operand yields the other operand unchanged
/// (spec §4.5 "Construction algebra").
pub fn and_opt(a: Option<SourceChange>, b: Option<SourceChange>) -> Option<SourceChange> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (Some(x), Some(y)) => Some(x.and(y)),
    }
}

/// Null-absorbing `|`.
pub fn or_opt(a: Option<SourceChange>, b: Option<SourceChange>) -> Option<SourceChange> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (Some(x), Some(y)) => Some(x.or(y)),
    }
}

/// Monotone reindexing of byte offsets after an applied edit (spec §4.5
/// "Range map"): values whose origins still point at pre-edit offsets call
/// this to rebase.
pub struct RangeMap {
    /// `(old_start, old_len, new_len)`, sorted ascending by `old_start`.
    edits: Vec<(usize, usize, usize)>,
}

impl RangeMap {
    fn new(mut edits: Vec<(usize, usize, usize)>) -> Self {
        edits.sort_by_key(|e| e.0);
        RangeMap { edits }
    }

    pub fn map(&self, old_offset: usize) -> usize {
        let mut delta: isize = 0;
        for &(start, old_len, new_len) in &self.edits {
            if old_offset < start {
                break;
            }
            if old_offset < start + old_len {
                return (start as isize + delta).max(0) as usize;
            }
            delta += new_len as isize - old_len as isize;
        }
        (old_offset as isize + delta).max(0) as usize
    }
}

/// Applies a flat list of `Single`s to `source` (spec §4.5 "Applier"):
/// sorts by descending byte offset, rewrites each span's text, and detects
/// overlaps — a programmer error, not a recoverable situation.
pub fn apply(source: &str, changes: &[Single]) -> Result<(String, RangeMap), String> {
    let mut sorted: Vec<&Single> = changes.iter().collect();
    sorted.sort_by(|a, b| b.span.offset.cmp(&a.span.offset));

    for pair in sorted.windows(2) {
        let (later, earlier) = (pair[0], pair[1]);
        if earlier.span.end() > later.span.offset {
            return Err(format!(
                "overlapping source changes at byte {} and byte {}",
                earlier.span.offset, later.span.offset
            ));
        }
    }

    let mut text = source.to_string();
    let mut edits = Vec::with_capacity(sorted.len());
    for s in &sorted {
        let start = s.span.offset;
        let end = s.span.end();
        text.replace_range(start..end, &s.replacement);
        edits.push((start, s.span.len, s.replacement.len()));
    }
    Ok((text, RangeMap::new(edits)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(offset: usize, len: usize) -> TokenSpan {
        TokenSpan { offset, len }
    }

    fn single(offset: usize, len: usize, replacement: &str) -> SourceChange {
        SourceChange::single(span(offset, len), replacement, "test")
    }

    #[test]
    fn and_opt_absorbs_none() {
        let a = single(0, 1, "x");
        assert!(and_opt(None, None).is_none());
        assert_eq!(and_opt(Some(a.clone()), None).unwrap().collect_first_alternative().len(), 1);
        assert_eq!(and_opt(None, Some(a)).unwrap().collect_first_alternative().len(), 1);
    }

    #[test]
    fn or_prefers_first_alternative() {
        let preferred = single(0, 1, "a");
        let fallback = single(5, 1, "b");
        let combined = preferred.or(fallback);
        let picked = combined.collect_first_alternative();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].replacement, "a");
    }

    #[test]
    fn and_collects_every_leaf_in_order() {
        let combined = single(0, 1, "a").and(single(10, 1, "b"));
        let leaves = combined.collect_first_alternative();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].replacement, "a");
        assert_eq!(leaves[1].replacement, "b");
    }

    #[test]
    fn apply_rewrites_rightmost_first_without_disturbing_earlier_offsets() {
        let source = "aa bb cc";
        let changes = vec![
            Single { span: span(0, 2), replacement: "xx".to_string(), hint: "t".into() },
            Single { span: span(6, 2), replacement: "yyyy".to_string(), hint: "t".into() },
        ];
        let (text, map) = apply(source, &changes).unwrap();
        assert_eq!(text, "xx bb yyyy");
        assert_eq!(map.map(3), 3);
        assert_eq!(map.map(7), 9);
    }

    #[test]
    fn apply_rejects_overlapping_changes() {
        let source = "abcdef";
        let changes = vec![
            Single { span: span(0, 3), replacement: "x".to_string(), hint: "t".into() },
            Single { span: span(2, 3), replacement: "y".to_string(), hint: "t".into() },
        ];
        assert!(apply(source, &changes).is_err());
    }
}
