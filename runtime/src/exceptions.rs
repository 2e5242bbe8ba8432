use crate::symbols::Symbol;
use sapling_syntax::error::ParseError;
use std::{error::Error, fmt, io};

/// Broad category of an exception, so that callers can react to specific
/// failures without matching on message text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A lookup found no frame owning the symbol in the scanned range.
    SymbolNotFound,

    /// A mutation targeted a symbol with no existing binding.
    UnboundSymbol,

    /// A frame operation was attempted with no frames on the stack.
    EmptyStack,

    /// A file to be sourced does not exist.
    FileNotFound,

    /// Any other filesystem or stream failure.
    Io,

    /// A sourcing target was neither a string, an array, nor a list.
    InvalidSourceArgument,

    /// Source text could not be read.
    Parse,

    /// Expressions could not be compiled to instructions.
    Compile,

    /// Failure raised while running instructions.
    Execution,
}

/// An exception raised by the interpreter.
///
/// Every exception is recoverable: the interpreter remains usable after any of
/// them is returned.
#[derive(Clone)]
pub struct Exception {
    kind: ErrorKind,
    message: String,
    cause: Option<Box<Exception>>,
}

impl Exception {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Create a new exception with a message and another exception that caused this one.
    ///
    /// Causes can be chained together, almost like a linked list. This is useful for debugging, as it can provide a
    /// poor man's kind of "trace" of errors to help find the root cause.
    pub fn with_cause(kind: ErrorKind, message: impl Into<String>, cause: Exception) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub(crate) fn symbol_not_found(symbol: &Symbol) -> Self {
        Self::new(ErrorKind::SymbolNotFound, format!("symbol {} not found", symbol))
    }

    pub(crate) fn unbound_symbol(symbol: &Symbol) -> Self {
        Self::new(ErrorKind::UnboundSymbol, format!("symbol {} is not bound", symbol))
    }

    pub(crate) fn empty_stack() -> Self {
        Self::new(ErrorKind::EmptyStack, "no scope available")
    }

    pub(crate) fn compile(line: usize, message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Compile, format!("error compiling on line {}: {}", line, message))
    }

    /// Get the kind of failure this exception describes.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the exception message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the cause of the exception, if present.
    #[inline]
    pub fn cause(&self) -> Option<&Exception> {
        self.cause.as_deref()
    }
}

impl From<String> for Exception {
    fn from(message: String) -> Self {
        Self::new(ErrorKind::Execution, message)
    }
}

impl From<&str> for Exception {
    fn from(message: &str) -> Self {
        Self::new(ErrorKind::Execution, message)
    }
}

impl From<io::Error> for Exception {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::new(ErrorKind::FileNotFound, error.to_string()),
            _ => Self::new(ErrorKind::Io, error.to_string()),
        }
    }
}

impl From<ParseError> for Exception {
    fn from(error: ParseError) -> Self {
        Self::new(
            ErrorKind::Parse,
            format!("error parsing on line {}: {}", error.line(), error.message),
        )
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: ", self.kind)?;
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)?;

        let mut cause = self.cause.as_ref();
        while let Some(c) = cause {
            write!(f, "\ncaused by: {}", c.message)?;
            cause = c.cause.as_ref();
        }

        Ok(())
    }
}

impl Error for Exception {}
