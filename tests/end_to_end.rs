//! Black-box `Interpreter` host-API tests (`SPEC_FULL.md` §E), including the
//! six numbered scenarios from spec §8. Placed under `tests/` rather than
//! the teacher's `src/test/` tree because that layout is a binary-crate
//! convention the teacher uses to support its CLI binaries
//! (`examples/CppCXY-lua-rs/crates/luars/src/test/mod.rs`); MiniLua is a
//! pure library crate, for which `tests/` is the idiomatic black-box
//! location.

use minilua::Interpreter;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

#[derive(Clone, Default)]
struct CapturedOutput(Rc<RefCell<Vec<u8>>>);

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedOutput {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn run(source: &str) -> (Interpreter, minilua::EvalResult) {
    let mut interp = Interpreter::new();
    let parsed = interp.parse(source);
    assert!(parsed.is_ok(), "parse errors: {:?}", parsed.errors);
    let result = interp.evaluate().expect("evaluation should succeed");
    (interp, result)
}

fn run_with_capture(source: &str) -> String {
    let mut interp = Interpreter::new();
    let out = CapturedOutput::default();
    interp.environment().set_stdout(Box::new(out.clone()));
    let parsed = interp.parse(source);
    assert!(parsed.is_ok(), "parse errors: {:?}", parsed.errors);
    interp.evaluate().expect("evaluation should succeed");
    out.text()
}

/// Scenario 1: `force(2, 3)` rewrites the literal `2` in the call to `3`.
#[test]
fn scenario_force_literal() {
    let source = "x = force(2, 3)";
    let (_interp, result) = run(source);
    let sc = result.source_change.expect("force should produce a change");
    let singles = sc.collect_first_alternative();
    assert_eq!(singles.len(), 1);
    assert_eq!(singles[0].replacement, "3");
    assert_eq!(&source[singles[0].span.offset..singles[0].span.end()], "2");
}

/// Scenario 2: `i = 1 + 1.5; force(-i, 3)` — applying the preferred
/// alternative and re-evaluating makes `-i` equal 3.
#[test]
fn scenario_force_through_unary_and_binary() {
    let source = "i = 1 + 1.5\nforce(-i, 3)\nreturn -i";
    let (mut interp, result) = run(source);
    let sc = result
        .source_change
        .expect("force should produce alternatives");
    let singles = sc.collect_first_alternative();
    assert!(!singles.is_empty());

    let map = interp.apply_source_changes(&singles).expect("apply should succeed");
    let _ = map;

    let new_source = interp.source_code().to_string();
    let parsed = interp.parse(new_source);
    assert!(parsed.is_ok());
    let edited = interp.evaluate().expect("re-evaluation should succeed");
    let n = edited.value.as_number().expect("return value is a number");
    assert!((n - 3.0).abs() < 1e-9, "expected -i to force to 3, got {n}");
}

/// Scenario 3: a numeric `for` loop prints 10 lines; the top-level result
/// is `nil` and no source-changes are produced.
#[test]
fn scenario_numeric_for_loop() {
    let out = run_with_capture("for i=1,10,1 do print('hello world ', i) end");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 10);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("hello world \t{}", i + 1));
    }
}

/// Scenario 4: forcing `math.sin(x)` to `0.5` rewrites `x`'s literal to
/// `asin(0.5)`.
#[test]
fn scenario_force_through_lambda_origin() {
    let source = "x = 0.3\ny = math.sin(x)\nforce(y, 0.5)";
    let (_interp, result) = run(source);
    let sc = result.source_change.expect("force should produce a change");
    let singles = sc.collect_first_alternative();
    assert_eq!(singles.len(), 1);
    let replacement: f64 = singles[0].replacement.parse().expect("numeric replacement");
    assert!((replacement - 0.5f64.asin()).abs() < 1e-9);
    assert_eq!(&source[singles[0].span.offset..singles[0].span.end()], "0.3");
}

/// Scenario 5: nested local shadows the global, restored once the `if`
/// block ends.
#[test]
fn scenario_nested_local_shadowing() {
    let out = run_with_capture("a=2\nif true then local a=3; print(a) end\nprint(a)");
    assert_eq!(out, "3\n2\n");
}

/// Scenario 6: a closure captures its defining scope by reference, so
/// repeated calls observe mutations made by earlier calls.
#[test]
fn scenario_closure_capture() {
    let out = run_with_capture(
        "local function mk() local i=0; return function() i=i+1; return i end end\nf = mk()\nprint(f(), f(), f())",
    );
    assert_eq!(out, "1\t2\t3\n");
}

#[test]
fn undefined_name_reads_as_nil_never_errors() {
    let (_interp, result) = run("return never_defined");
    assert!(result.value.is_nil());
}

#[test]
fn globals_table_self_reference() {
    let (_interp, result) = run("return _G._G._G == _G");
    assert!(result.value.to_bool());
}

#[test]
fn visit_limit_aborts_pathological_loops() {
    let mut interp = Interpreter::with_config(minilua::EvalConfig {
        visit_limit: 50,
        ..Default::default()
    });
    let parsed = interp.parse("local n = 0\nwhile true do n = n + 1 end");
    assert!(parsed.is_ok());
    let err = interp.evaluate().expect_err("should hit the visit limit");
    assert!(matches!(err, minilua::LuaError::RuntimeError(msg) if msg.contains("visit limit")));
}

#[test]
fn call_of_nil_is_a_runtime_error() {
    let mut interp = Interpreter::new();
    let parsed = interp.parse("return undefined_function()");
    assert!(parsed.is_ok());
    let err = interp.evaluate().expect_err("calling nil should error");
    assert!(matches!(err, minilua::LuaError::RuntimeError(_)));
}
