//! Sourcing code into a running interpreter.
//!
//! Sourced code runs against the live scope stack, so anything it defines
//! stays visible to the caller. The caller's continuation is saved before
//! the sourced code is installed and restored afterwards on every exit path.

use crate::{
    compiler,
    prelude::*,
    value::Pair,
    vm::{Function, Instruction},
};
use sapling_syntax::{ast::Expr, parse, source::SourceFile};
use std::{fs::File, io::Read, path::Path, rc::Rc};

/// Something that can be sourced: a file path, or a collection of further
/// targets.
#[derive(Clone, Copy, Debug)]
pub enum SourceTarget<'a> {
    Path(&'a str),
    Array(&'a [Value]),
    List(&'a Pair),
}

impl<'a> TryFrom<&'a Value> for SourceTarget<'a> {
    type Error = Exception;

    fn try_from(value: &'a Value) -> Result<Self, Exception> {
        match value {
            Value::String(path) => Ok(SourceTarget::Path(path)),
            Value::Array(items) => Ok(SourceTarget::Array(items)),
            Value::Pair(pair) => Ok(SourceTarget::List(pair)),
            value => Err(Exception::new(
                ErrorKind::InvalidSourceArgument,
                format!("cannot source a value of type {}: {:?}", value.type_name(), value),
            )),
        }
    }
}

impl Interpreter {
    /// Compile and run expressions in the current scope, then resume
    /// whatever was running before.
    pub fn source_expressions(&mut self, exprs: &[Expr]) -> Result<(), Exception> {
        let prefix = if self.reached_end() {
            Vec::new()
        } else {
            vec![Instruction::Pop]
        };

        let code = compiler::compile_begin_after(&mut self.symbols, prefix, exprs)?;
        let function = Rc::new(Function::new("__source", 0, code));

        log::debug!(
            "sourcing {} expressions from {} at pc {}",
            exprs.len(),
            self.curfunc.name(),
            self.pc
        );

        self.with_continuation(|interpreter| {
            interpreter.install(function);
            interpreter.datastack.push(Value::Nil);
            interpreter.run()?;
            interpreter.pop()?;
            Ok(())
        })
    }

    /// Read all of a stream, then source it. `name` is used in diagnostics.
    pub fn source_stream(&mut self, name: &str, reader: impl Read) -> Result<(), Exception> {
        let file = SourceFile::from_reader(name, reader)?;
        self.source_file_contents(file)
    }

    /// Source a string of code.
    pub fn source_str(&mut self, name: &str, text: &str) -> Result<(), Exception> {
        self.source_file_contents(SourceFile::named(name, text))
    }

    /// Source the file at the given path.
    ///
    /// The file is read to the end and closed before any of its code runs.
    pub fn source_file(&mut self, path: impl AsRef<Path>) -> Result<(), Exception> {
        let path = path.as_ref();
        log::debug!("sourcing file {}", path.display());

        let file = File::open(path)
            .and_then(|handle| SourceFile::from_reader(path.display().to_string(), handle))
            .map_err(|error| {
                let cause = Exception::from(error);
                Exception::with_cause(cause.kind(), format!("cannot source {}", path.display()), cause)
            })?;

        self.source_file_contents(file)
    }

    /// Source a file path, or every target in an array or list, depth first.
    ///
    /// Stops at the first failure; targets after it are not sourced, while
    /// anything sourced before it stays in effect.
    pub fn source_value(&mut self, value: &Value) -> Result<(), Exception> {
        match SourceTarget::try_from(value)? {
            SourceTarget::Path(path) => self.source_file(path),
            SourceTarget::Array(items) => items.iter().try_for_each(|item| self.source_value(item)),
            SourceTarget::List(pair) => {
                self.source_value(&pair.head)?;

                match &pair.tail {
                    Value::Nil => Ok(()),
                    tail @ Value::Pair(_) => self.source_value(tail),
                    tail => {
                        log::warn!("ignoring improper list tail {:?} while sourcing", tail);
                        Ok(())
                    }
                }
            }
        }
    }

    fn source_file_contents(&mut self, file: SourceFile) -> Result<(), Exception> {
        let exprs = parse(file)?;
        self.source_expressions(&exprs)
    }
}
