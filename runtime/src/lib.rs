//! The Sapling interpreter runtime.
//!
//! Source text is read by `sapling-syntax`, compiled to bytecode by
//! [`compiler`] and executed by the VM in [`vm`] against a stack of scope
//! frames. Code can be sourced into a running program at any point; see
//! [`source`].

/// Convenience macro for throwing a runtime exception.
#[macro_export]
macro_rules! throw {
    ($($arg:tt)*) => {
        return Err($crate::exceptions::Exception::from(format!($($arg)*)))
    };
}

mod builtins;
pub mod compiler;
pub mod exceptions;
mod foreign;
pub mod runtime;
pub mod scope;
pub mod source;
pub mod symbols;
pub mod value;
pub mod vm;

// Re-export syntax crate.
pub mod syntax {
    pub use sapling_syntax::*;
}

pub mod prelude {
    pub use crate::exceptions::{ErrorKind, Exception};
    pub use crate::runtime::Interpreter;
    pub use crate::value::Value;
}

pub use crate::{
    foreign::ForeignFn,
    runtime::{Continuation, Interpreter, InterpreterBuilder},
};

/// Evaluate source text in a fresh interpreter with the builtins loaded.
pub fn eval(source: &str) -> Result<prelude::Value, prelude::Exception> {
    Interpreter::new().eval(source)
}
