//! The core Sapling syntax implementation.
//!
//! The reader turns source text into a list of spanned expressions, which the
//! runtime compiles to bytecode. Positions are kept on every expression so
//! that later stages can report errors against the original line.

pub mod ast;
pub mod error;
mod grammar;
mod parser;
pub mod source;

pub use parser::parse;
