use crate::prelude::*;
use std::{fmt, rc::Rc};

type NativeBody = dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Exception>;

/// A native function that can be invoked by scripts through an interpreter as
/// well as in native code.
///
/// Native functions receive the interpreter mutably, so they may re-enter it,
/// for example to source more code while a program is running.
#[derive(Clone)]
pub struct ForeignFn {
    name: Rc<str>,
    body: Rc<NativeBody>,
}

impl ForeignFn {
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Exception> + 'static,
    {
        Self {
            name: Rc::from(name),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
        (self.body)(interpreter, args)
    }
}

impl PartialEq for ForeignFn {
    fn eq(&self, rhs: &ForeignFn) -> bool {
        Rc::ptr_eq(&self.body, &rhs.body)
    }
}

impl fmt::Debug for ForeignFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<native {}>", self.name)
    }
}
