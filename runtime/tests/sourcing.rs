use sapling_runtime::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Write a script that pushes its own name onto the global `trace` list.
fn tracing_script(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(format!("{}.sap", name));
    fs::write(&path, format!("(set! trace (cons \"{}\" trace))", name)).unwrap();
    path
}

fn path_value(path: &Path) -> Value {
    Value::from(path.display().to_string())
}

fn tracing_interpreter() -> Interpreter {
    let mut interpreter = Interpreter::new();
    interpreter.eval("(def trace '())").unwrap();
    interpreter
}

#[test]
fn nested_targets_are_sourced_depth_first_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = tracing_script(&dir, "a");
    let b = tracing_script(&dir, "b");
    let c = tracing_script(&dir, "c");

    let mut interpreter = tracing_interpreter();
    let target = Value::from(vec![path_value(&a), Value::from(vec![path_value(&b), path_value(&c)])]);

    interpreter.source_value(&target).unwrap();

    assert_eq!(interpreter.get("trace").unwrap().to_string(), r#"("c" "b" "a")"#);
}

#[test]
fn missing_file_aborts_remaining_targets() {
    let dir = tempfile::tempdir().unwrap();
    let a = tracing_script(&dir, "a");
    let b = dir.path().join("b.sap");
    let c = tracing_script(&dir, "c");

    let mut interpreter = tracing_interpreter();
    let target = Value::from(vec![path_value(&a), Value::from(vec![path_value(&b), path_value(&c)])]);

    let error = interpreter.source_value(&target).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::FileNotFound);
    assert!(error.message().contains("b.sap"));

    // Whatever ran before the failure stays in effect.
    assert_eq!(interpreter.get("trace").unwrap().to_string(), r#"("a")"#);
}

#[test]
fn lists_are_sourced_like_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let a = tracing_script(&dir, "a");
    let b = tracing_script(&dir, "b");

    let mut interpreter = tracing_interpreter();
    let target = vec![path_value(&a), path_value(&b)].into_iter().collect::<Value>();

    interpreter.source_value(&target).unwrap();

    assert_eq!(interpreter.get("trace").unwrap().to_string(), r#"("b" "a")"#);
}

#[test]
fn invalid_targets_are_rejected() {
    let mut interpreter = Interpreter::new();

    let error = interpreter.source_value(&Value::from(vec![Value::from(42i64)])).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InvalidSourceArgument);
}

#[test]
fn source_builtin_runs_mid_program() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib.sap");
    fs::write(&lib, "(def sourced 41)\n(def double (fn [x] (* x 2)))").unwrap();

    let mut interpreter = Interpreter::new();
    let value = interpreter
        .eval(format!(
            "(def before 1) (source \"{}\") (+ before sourced (double 0))",
            lib.display()
        ))
        .unwrap();

    assert_eq!(value, 42i64);
    assert!(interpreter.reached_end());
    assert_eq!(interpreter.continuation().function().name(), "__idle");
}

#[test]
fn sourced_files_can_source_more_files() {
    let dir = tempfile::tempdir().unwrap();
    let inner = dir.path().join("inner.sap");
    let outer = dir.path().join("outer.sap");

    fs::write(&inner, "(def inner-value \"from inner\")").unwrap();
    fs::write(&outer, format!("(load \"{}\")\n(def outer-value inner-value)", inner.display())).unwrap();

    let mut interpreter = Interpreter::new();
    interpreter.source_file(&outer).unwrap();

    assert_eq!(interpreter.get("outer-value").unwrap(), "from inner");
}

#[test]
fn definitions_land_in_the_live_scope() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("local.sap");
    fs::write(&lib, "(def from-file 10)").unwrap();

    let mut interpreter = Interpreter::new();
    let value = interpreter
        .eval(format!(
            "(def f (fn [x] (source \"{}\") (+ x from-file))) (f 1)",
            lib.display()
        ))
        .unwrap();

    assert_eq!(value, 11i64);

    // The definition went into the closure's frame, which is gone now.
    assert_eq!(interpreter.get("from-file").unwrap_err().kind(), ErrorKind::SymbolNotFound);
}

#[test]
fn interpreter_is_usable_after_failed_sourcing() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.sap");
    fs::write(&bad, "(def partial 1)\n(let [x 1] (undefined x))").unwrap();

    let mut interpreter = Interpreter::new();
    let error = interpreter
        .eval(format!("(let [y 2] (source \"{}\"))", bad.display()))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::SymbolNotFound);
    assert_eq!(interpreter.scopes().depth(), 1);
    assert!(interpreter.reached_end());

    // `partial` was defined inside the let frame, which has been unwound.
    assert!(interpreter.get("partial").is_err());
    assert_eq!(interpreter.eval("(+ 1 1)").unwrap(), 2i64);
}

#[test]
fn parse_errors_in_files_report_line() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.sap");
    fs::write(&bad, "(def a 1)\n(def b 2)\n(def c").unwrap();

    let mut interpreter = Interpreter::new();
    let error = interpreter.source_file(&bad).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Parse);
    assert!(error.message().contains("line 3"), "{}", error.message());

    // Nothing ran, since the file could not be read as a whole.
    assert!(interpreter.get("a").is_err());
}
