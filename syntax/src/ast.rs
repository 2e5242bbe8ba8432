//! Abstract syntax tree definitions for the language syntax.
//!
//! The reader produces plain data: every expression is either an atom or a
//! list/array of further expressions, tagged with the span it was read from.

use crate::source::Span;
use std::fmt;

/// A single expression read from source text.
#[derive(Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,

    /// Where in the source this expression was read from.
    pub span: Span,
}

/// Contains a variant for each different expression type.
#[derive(Clone, PartialEq)]
pub enum ExprKind {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Symbol(String),

    /// A parenthesized list, with an optional dotted tail: `(a b . c)`.
    List(Vec<Expr>, Option<Box<Expr>>),

    /// A bracketed array literal: `[a b c]`.
    Array(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: impl Into<Span>) -> Self {
        Self {
            kind,
            span: span.into(),
        }
    }

    /// The line this expression starts on.
    pub fn line(&self) -> usize {
        self.span.start.line
    }

    /// If this expression is a symbol, get its name.
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// If this expression is a proper list, get its items.
    pub fn as_list(&self) -> Option<&[Expr]> {
        match &self.kind {
            ExprKind::List(items, None) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.kind, f)
    }
}

impl fmt::Debug for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExprKind::Nil => write!(f, "nil"),
            ExprKind::Bool(value) => write!(f, "{}", value),
            ExprKind::Int(value) => write!(f, "{}", value),
            ExprKind::Float(value) => write!(f, "{:?}", value),
            ExprKind::String(value) => write!(f, "{:?}", value),
            ExprKind::Symbol(name) => write!(f, "{}", name),
            ExprKind::List(items, tail) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                if let Some(tail) = tail {
                    write!(f, " . {:?}", tail)?;
                }
                write!(f, ")")
            }
            ExprKind::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}
