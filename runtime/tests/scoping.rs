use sapling_runtime::{prelude::*, scope::ScopeStack, symbols::SymbolTable};

#[test]
fn non_global_boundary_on_four_frames() {
    let mut symbols = SymbolTable::new();
    let mut stack = ScopeStack::new();
    let names = ["g", "f1", "f2", "f3"];

    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            stack.push_new_frame();
        }
        stack.bind_in_top(&symbols.intern(name), Value::from(*name)).unwrap();
    }

    assert_eq!(stack.depth(), 4);

    // Skipping the bottom `n` frames leaves the top `4 - n` visible.
    for skip in 0..=4 {
        for (i, name) in names.iter().enumerate() {
            let symbol = symbols.intern(name);
            assert_eq!(
                stack.lookup(&symbol, skip).is_ok(),
                i >= skip,
                "lookup of {} skipping {} frames",
                name,
                skip
            );
        }
    }
}

#[test]
fn let_shadows_and_restores() {
    let mut interpreter = Interpreter::new();

    let value = interpreter
        .eval(
            "(def x 1)
             (def seen (let [x 2] (let [x 3] x)))
             (array seen x)",
        )
        .unwrap();

    assert_eq!(value.to_string(), "[3 1]");
    assert_eq!(interpreter.scopes().depth(), 1);
}

#[test]
fn set_updates_innermost_owner() {
    let mut interpreter = Interpreter::new();

    let value = interpreter
        .eval(
            "(def x \"global\")
             (def inner (let [x \"outer\"] (let [y 0] (set! x \"changed\")) x))
             (array inner x)",
        )
        .unwrap();

    assert_eq!(value.to_string(), r#"["changed" "global"]"#);
}

#[test]
fn set_of_unbound_symbol_fails_without_binding_it() {
    let mut interpreter = Interpreter::new();

    let error = interpreter.eval("(set! nowhere 1)").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::UnboundSymbol);
    assert!(interpreter.get("nowhere").is_err());
}

#[test]
fn closures_share_captured_frames() {
    let mut interpreter = Interpreter::new();

    let value = interpreter
        .eval(
            "(def make (fn []
               (let [n 0]
                 (list (fn [] (set! n (+ n 1))) (fn [] n)))))
             (def fns (make))
             ((car fns))
             ((car fns))
             ((car (cdr fns)))",
        )
        .unwrap();

    assert_eq!(value, 2i64);
}

#[test]
fn globals_defined_by_separate_interpreters_are_independent() {
    let mut a = Interpreter::new();
    let mut b = Interpreter::new();

    a.eval("(def only-here 1)").unwrap();
    b.eval("(def only-there 2)").unwrap();

    assert!(a.get("only-there").is_err());
    assert!(b.get("only-here").is_err());
}
