//! Implementations of built-in global functions that are always available.

use crate::prelude::*;
use std::io::{self, Write};

type Builtin = fn(&mut Interpreter, Vec<Value>) -> Result<Value, Exception>;

/// Register every builtin in the interpreter's global frame.
pub fn init(interpreter: &mut Interpreter) {
    let builtins: [(&str, Builtin); 17] = [
        ("source", source),
        ("load", source),
        ("eval-string", eval_string),
        ("+", add),
        ("-", sub),
        ("*", mul),
        ("<", less_than),
        ("=", equal),
        ("cons", cons),
        ("car", car),
        ("cdr", cdr),
        ("list", list),
        ("array", array),
        ("typeof", type_of),
        ("println", println),
        ("show-scopes", show_scopes),
        ("show-stacks", show_stacks),
    ];

    for (name, function) in builtins {
        interpreter.register_fn(name, function);
    }
}

/// Source each argument in turn: a file path, or an array or list of further
/// targets.
fn source(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    if args.is_empty() {
        throw!("source expects at least one file");
    }

    for arg in args.iter() {
        interpreter.source_value(arg)?;
    }

    Ok(Value::Nil)
}

/// Parse a string as code and source it into the current scope.
fn eval_string(interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    let script = match args.first().and_then(Value::as_string) {
        Some(s) => s.to_owned(),
        None => throw!("first argument must be a string"),
    };

    interpreter.source_str("<eval-string>", &script)?;

    Ok(Value::Nil)
}

fn add(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    fold_numbers("+", Value::Int(0), args, i64::checked_add, |a, b| a + b)
}

fn sub(_: &mut Interpreter, mut args: Vec<Value>) -> Result<Value, Exception> {
    match args.len() {
        0 => throw!("- expects at least one argument"),
        1 => fold_numbers("-", Value::Int(0), args, i64::checked_sub, |a, b| a - b),
        _ => {
            let first = args.remove(0);
            fold_numbers("-", first, args, i64::checked_sub, |a, b| a - b)
        }
    }
}

fn mul(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    fold_numbers("*", Value::Int(1), args, i64::checked_mul, |a, b| a * b)
}

fn fold_numbers(
    name: &str,
    init: Value,
    args: Vec<Value>,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, Exception> {
    args.into_iter().try_fold(init, |lhs, rhs| match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => match int_op(a, b) {
            Some(result) => Ok(Value::Int(result)),
            None => throw!("integer overflow in {}", name),
        },
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(a as f64, b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(a, b as f64))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(a, b))),
        (a, b) => throw!("{} expects numbers, got {} and {}", name, a.type_name(), b.type_name()),
    })
}

fn less_than(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    let result = match args.as_slice() {
        [Value::Int(a), Value::Int(b)] => a < b,
        [Value::Int(a), Value::Float(b)] => (*a as f64) < *b,
        [Value::Float(a), Value::Int(b)] => *a < *b as f64,
        [Value::Float(a), Value::Float(b)] => a < b,
        _ => throw!("< expects two numbers"),
    };

    Ok(Value::Bool(result))
}

fn equal(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    if args.len() < 2 {
        throw!("= expects at least two arguments");
    }

    Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn cons(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    match <[Value; 2]>::try_from(args) {
        Ok([head, tail]) => Ok(Value::cons(head, tail)),
        Err(_) => throw!("cons expects two arguments"),
    }
}

fn car(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    match args.first() {
        Some(Value::Pair(pair)) => Ok(pair.head.clone()),
        Some(Value::Nil) => Ok(Value::Nil),
        Some(value) => throw!("car expects a list, got {}", value.type_name()),
        None => throw!("car expects a list"),
    }
}

fn cdr(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    match args.first() {
        Some(Value::Pair(pair)) => Ok(pair.tail.clone()),
        Some(Value::Nil) => Ok(Value::Nil),
        Some(value) => throw!("cdr expects a list, got {}", value.type_name()),
        None => throw!("cdr expects a list"),
    }
}

fn list(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(args.into_iter().collect())
}

fn array(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::from(args))
}

/// Returns the name of the primitive type of the given argument.
fn type_of(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(args.first().map(Value::type_name).map(Value::from).unwrap_or(Value::Nil))
}

fn println(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
    let mut stdout = io::stdout().lock();

    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(stdout, " ")?;
        }
        write!(stdout, "{}", arg)?;
    }
    writeln!(stdout)?;

    Ok(Value::Nil)
}

fn show_scopes(interpreter: &mut Interpreter, _: Vec<Value>) -> Result<Value, Exception> {
    interpreter.scopes().show(&mut io::stdout().lock(), 0)?;

    Ok(Value::Nil)
}

fn show_stacks(interpreter: &mut Interpreter, _: Vec<Value>) -> Result<Value, Exception> {
    interpreter.show_stacks(&mut io::stdout().lock())?;

    Ok(Value::Nil)
}
