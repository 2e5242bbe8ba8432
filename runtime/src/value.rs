//! Structures and implementations of the built-in data types.

use crate::{foreign::ForeignFn, scope::FrameRef, symbols::Symbol, vm::Lambda};
use std::{fmt, iter::FromIterator, rc::Rc};

/// A Sapling value.
///
/// Scalars are stored inline, while heavier types are stored behind a
/// reference-counted pointer so that copying a value is always cheap. Values
/// are immutable once constructed; only scope frames hold mutable state.
#[derive(Clone)]
pub enum Value {
    /// The "empty" value, which also terminates proper lists.
    Nil,

    Bool(bool),

    Int(i64),

    Float(f64),

    /// An immutable string, stored by reference.
    String(Rc<str>),

    /// A quoted symbol.
    Symbol(Symbol),

    /// A cons cell. Lists are chains of pairs ending in `Nil`.
    Pair(Rc<Pair>),

    /// An immutable array of values.
    Array(Rc<[Value]>),

    /// A function defined in the language, along with the frames it closes over.
    Closure(Rc<Closure>),

    /// Reference to a foreign (native) function.
    ForeignFn(ForeignFn),
}

/// A single cons cell.
pub struct Pair {
    pub head: Value,
    pub tail: Value,
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:?} . {:?})", self.head, self.tail)
    }
}

/// A callable function value created by evaluating a `fn` form.
pub struct Closure {
    pub(crate) lambda: Rc<Lambda>,

    /// Frames above the global one at creation time, outermost first. These
    /// are shared with the stack they were found on, never copied.
    pub(crate) captured: Vec<FrameRef>,
}

impl Value {
    /// Build a cons cell.
    pub fn cons(head: impl Into<Value>, tail: impl Into<Value>) -> Self {
        Value::Pair(Rc::new(Pair {
            head: head.into(),
            tail: tail.into(),
        }))
    }

    /// Get the type of value, rendered as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "list",
            Value::Array(_) => "array",
            Value::Closure(_) => "function",
            Value::ForeignFn(_) => "native",
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Only `nil` and `false` are falsey; every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// If this value is a string, get its string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(string) => Some(string),
            _ => None,
        }
    }

    /// If this value is a pair, get a reference to it.
    pub fn as_pair(&self) -> Option<&Pair> {
        match self {
            Value::Pair(pair) => Some(pair),
            _ => None,
        }
    }

    /// Iterate over the items of a list. Iteration stops at the first tail that
    /// is not a pair, so an improper tail is silently skipped.
    pub fn iter_list(&self) -> ListIter<'_> {
        ListIter {
            next: self,
        }
    }

    /// Compare two values by identity where they are reference types, and by
    /// content otherwise.
    pub fn ptr_eq(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Value::String(lhs), Value::String(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Pair(lhs), Value::Pair(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Array(lhs), Value::Array(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Closure(lhs), Value::Closure(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::ForeignFn(lhs), Value::ForeignFn(rhs)) => lhs == rhs,
            (lhs, rhs) => lhs == rhs,
        }
    }
}

pub struct ListIter<'a> {
    next: &'a Value,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        match self.next {
            Value::Pair(pair) => {
                self.next = &pair.tail;
                Some(&pair.head)
            }
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<ForeignFn> for Value {
    fn from(function: ForeignFn) -> Self {
        Value::ForeignFn(function)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items.into())
    }
}

/// Collects into a proper list.
impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let items = iter.into_iter().collect::<Vec<_>>();

        items.into_iter().rev().fold(Value::Nil, |tail, head| Value::cons(head, tail))
    }
}

impl PartialEq for Value {
    fn eq(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
            (Value::Int(lhs), Value::Int(rhs)) => lhs == rhs,
            (Value::Float(lhs), Value::Float(rhs)) => lhs == rhs,
            (Value::Int(lhs), Value::Float(rhs)) | (Value::Float(rhs), Value::Int(lhs)) => *lhs as f64 == *rhs,
            (Value::String(lhs), Value::String(rhs)) => lhs == rhs,
            (Value::Symbol(lhs), Value::Symbol(rhs)) => lhs == rhs,
            (Value::Pair(lhs), Value::Pair(rhs)) => lhs.head == rhs.head && lhs.tail == rhs.tail,
            (Value::Array(lhs), Value::Array(rhs)) => lhs == rhs,
            (Value::Closure(lhs), Value::Closure(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::ForeignFn(lhs), Value::ForeignFn(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, rhs: &&str) -> bool {
        self.as_string() == Some(*rhs)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, rhs: &i64) -> bool {
        matches!(self, Value::Int(value) if value == rhs)
    }
}

/// Renders a value the way it would be written in source, with strings quoted.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(string) => write!(f, "{:?}", string),
            Value::Pair(_) => {
                write!(f, "(")?;
                let mut next = self;
                let mut first = true;

                while let Value::Pair(pair) = next {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{:?}", pair.head)?;
                    first = false;
                    next = &pair.tail;
                }

                if !next.is_nil() {
                    write!(f, " . {:?}", next)?;
                }

                write!(f, ")")
            }
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                write!(f, "]")
            }
            value => fmt::Display::fmt(value, f),
        }
    }
}

/// Renders a value for output: strings appear without quotes, containers
/// render their contents as source.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{:?}", value),
            Value::String(string) => write!(f, "{}", string),
            Value::Symbol(symbol) => write!(f, "{}", symbol),
            Value::Pair(_) | Value::Array(_) => fmt::Debug::fmt(self, f),
            Value::Closure(closure) => write!(f, "<function {}>", closure.lambda.function.name()),
            Value::ForeignFn(function) => write!(f, "<native {}>", function.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists() {
        let list: Value = vec![Value::from(1i64), Value::from("two"), Value::Nil].into_iter().collect();

        assert_eq!(list.iter_list().count(), 3);
        assert_eq!(format!("{:?}", list), r#"(1 "two" nil)"#);
        assert_eq!(list.to_string(), r#"(1 "two" nil)"#);
        assert_eq!(format!("{:?}", Value::cons(1i64, 2i64)), "(1 . 2)");
    }

    #[test]
    fn equality() {
        let a = Value::from("hello");
        let b = Value::from("hello");

        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
        assert_eq!(Value::from(2i64), Value::from(2.0));
        assert_eq!(a, "hello");
        assert_eq!(Value::from(7i64), 7);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::from(0i64).is_truthy());
        assert!(Value::from("").is_truthy());
    }
}
