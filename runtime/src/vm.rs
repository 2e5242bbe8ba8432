//! The bytecode virtual machine.
//!
//! Execution state lives entirely in the [`Interpreter`]: the active function,
//! the program counter, the data stack and the stack of call records. The run
//! loop reads those fields afresh for every instruction, so a native function
//! may re-enter the interpreter (for example to source a file) as long as it
//! restores the continuation before returning.

use crate::{
    prelude::*,
    scope::{FrameRef, NON_GLOBAL},
    symbols::Symbol,
    value::Closure,
};
use std::{fmt, rc::Rc};

#[derive(Clone)]
pub enum Instruction {
    /// Push a constant.
    Push(Value),

    /// Discard the top of the data stack.
    Pop,

    /// Push the value bound to a symbol.
    Get(Symbol),

    /// Bind the top of the data stack in the innermost frame, leaving it in
    /// place.
    Def(Symbol),

    /// Assign the top of the data stack to an existing binding, leaving it in
    /// place.
    Set(Symbol),

    PushScope,
    PopScope,

    Jump(usize),

    /// Pop a condition and jump if it is falsey.
    BranchIfFalse(usize),

    /// Collect the top `n` values into an array.
    MakeArray(usize),

    /// Create a closure over the frames above the global one.
    MakeClosure(Rc<Lambda>),

    /// Call the function below the top `n` arguments.
    Call(usize),
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::Push(value) => write!(f, "push {:?}", value),
            Instruction::Pop => write!(f, "pop"),
            Instruction::Get(symbol) => write!(f, "get {}", symbol),
            Instruction::Def(symbol) => write!(f, "def {}", symbol),
            Instruction::Set(symbol) => write!(f, "set {}", symbol),
            Instruction::PushScope => write!(f, "push-scope"),
            Instruction::PopScope => write!(f, "pop-scope"),
            Instruction::Jump(target) => write!(f, "jump {}", target),
            Instruction::BranchIfFalse(target) => write!(f, "branch-if-false {}", target),
            Instruction::MakeArray(n) => write!(f, "make-array {}", n),
            Instruction::MakeClosure(lambda) => write!(f, "make-closure {}", lambda.function.name()),
            Instruction::Call(n) => write!(f, "call {}", n),
        }
    }
}

/// A unit of bytecode that can be installed as the active function.
#[derive(Debug)]
pub struct Function {
    name: String,
    arity: usize,
    code: Vec<Instruction>,
}

impl Function {
    pub fn new(name: impl Into<String>, arity: usize, code: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            arity,
            code,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }
}

/// A compiled `fn` form, not yet closed over any frames.
#[derive(Debug)]
pub struct Lambda {
    pub(crate) function: Rc<Function>,
    pub(crate) params: Vec<Symbol>,

    /// Symbols referenced by the body that are not parameters.
    pub(crate) free: Vec<Symbol>,
}

/// Return record for a closure invocation.
pub(crate) struct CallFrame {
    function: Rc<Function>,
    pc: usize,

    /// The caller's frames above the global one.
    locals: Vec<FrameRef>,
}

impl Interpreter {
    /// Execute the active function from the current program counter until it
    /// reaches its end at the call depth `run` was entered with.
    ///
    /// The function's value is left on the data stack and a copy returned. If
    /// an error occurs, call records and scope frames entered during this run
    /// are unwound before the error is returned.
    pub fn run(&mut self) -> Result<Value, Exception> {
        let base_calls = self.calls.len();
        let base_depth = self.scopes.depth();

        match self.run_loop(base_calls) {
            Ok(value) => Ok(value),
            Err(exception) => {
                self.unwind(base_calls, base_depth);
                Err(exception)
            }
        }
    }

    fn run_loop(&mut self, base_calls: usize) -> Result<Value, Exception> {
        loop {
            let function = self.curfunc.clone();

            match function.code.get(self.pc) {
                Some(instruction) => {
                    self.pc += 1;
                    self.execute_instruction(instruction)?;
                }
                None if self.calls.len() > base_calls => self.return_from_call(),
                None => break,
            }
        }

        self.peek().cloned()
    }

    fn execute_instruction(&mut self, instruction: &Instruction) -> Result<(), Exception> {
        match instruction {
            Instruction::Push(value) => self.datastack.push(value.clone()),
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Get(symbol) => {
                let (value, _) = self.scopes.lookup_symbol(symbol)?;
                self.datastack.push(value);
            }
            Instruction::Def(symbol) => {
                let value = self.peek()?.clone();
                self.scopes.bind_in_top(symbol, value)?;
            }
            Instruction::Set(symbol) => {
                let value = self.peek()?.clone();
                self.scopes.update_existing(symbol, value)?;
            }
            Instruction::PushScope => self.scopes.push_new_frame(),
            Instruction::PopScope => self.scopes.pop_frame()?,
            Instruction::Jump(target) => self.pc = *target,
            Instruction::BranchIfFalse(target) => {
                if !self.pop()?.is_truthy() {
                    self.pc = *target;
                }
            }
            Instruction::MakeArray(n) => {
                let items = self.pop_n(*n)?;
                self.datastack.push(Value::from(items));
            }
            Instruction::MakeClosure(lambda) => {
                let closure = self.make_closure(lambda);
                self.datastack.push(Value::Closure(Rc::new(closure)));
            }
            Instruction::Call(n) => {
                let args = self.pop_n(*n)?;
                let callee = self.pop()?;
                self.call(callee, args)?;
            }
        }

        Ok(())
    }

    /// Capture, by handle, every frame above the global one, outermost first.
    ///
    /// Bindings made in an enclosing frame after the closure is created are
    /// visible when it runs. Globals stay reachable through the global frame
    /// and are never captured. A body with no free variables needs nothing.
    fn make_closure(&self, lambda: &Rc<Lambda>) -> Closure {
        let captured = if lambda.free.is_empty() {
            Vec::new()
        } else {
            self.scopes.frames().skip(NON_GLOBAL).cloned().collect()
        };

        Closure {
            lambda: lambda.clone(),
            captured,
        }
    }

    fn call(&mut self, callee: Value, args: Vec<Value>) -> Result<(), Exception> {
        match callee {
            Value::ForeignFn(function) => {
                let result = function.call(self, args)?;
                self.datastack.push(result);
            }
            Value::Closure(closure) => {
                let lambda = &closure.lambda;

                if args.len() != lambda.params.len() {
                    throw!(
                        "function {} expects {} arguments, got {}",
                        lambda.function.name(),
                        lambda.params.len(),
                        args.len()
                    );
                }

                self.calls.push(CallFrame {
                    function: self.curfunc.clone(),
                    pc: self.pc,
                    locals: self.scopes.take_locals(),
                });

                for frame in closure.captured.iter() {
                    self.scopes.push_frame(frame.clone());
                }

                self.scopes.push_new_frame();
                for (param, arg) in lambda.params.iter().zip(args) {
                    self.scopes.bind_in_top(param, arg)?;
                }

                self.install(lambda.function.clone());
            }
            value => throw!("cannot invoke {:?} as a function", value),
        }

        Ok(())
    }

    fn return_from_call(&mut self) {
        if let Some(frame) = self.calls.pop() {
            self.scopes.restore_locals(frame.locals);
            self.curfunc = frame.function;
            self.pc = frame.pc;
        }
    }

    /// Drop call records and scope frames back to the given depths.
    fn unwind(&mut self, base_calls: usize, base_depth: usize) {
        while self.calls.len() > base_calls {
            self.return_from_call();
        }

        if self.scopes.depth() > base_depth {
            log::debug!("unwinding {} scope frames after error", self.scopes.depth() - base_depth);
            self.scopes.truncate(base_depth);
        }
    }

    pub(crate) fn pop(&mut self) -> Result<Value, Exception> {
        match self.datastack.pop() {
            Some(value) => Ok(value),
            None => throw!("data stack underflow"),
        }
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Exception> {
        if n > self.datastack.len() {
            throw!("data stack underflow");
        }

        Ok(self.datastack.split_off(self.datastack.len() - n))
    }

    fn peek(&self) -> Result<&Value, Exception> {
        match self.datastack.last() {
            Some(value) => Ok(value),
            None => throw!("data stack underflow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_see_captured_frames() {
        let mut interpreter = Interpreter::new();

        let value = interpreter
            .eval(
                "(def make-adder (fn [n] (fn [x] (+ x n))))
                 (def add5 (make-adder 5))
                 (add5 10)",
            )
            .unwrap();

        assert_eq!(value, 15i64);
    }

    #[test]
    fn closures_share_frames_by_reference() {
        let mut interpreter = Interpreter::new();

        let value = interpreter
            .eval(
                "(def make-counter
                   (fn [] (let [count 0]
                     (fn [] (set! count (+ count 1))))))
                 (def tick (make-counter))
                 (tick) (tick)
                 (tick)",
            )
            .unwrap();

        assert_eq!(value, 3i64);
    }

    #[test]
    fn closures_do_not_capture_globals() {
        let mut interpreter = Interpreter::new();

        interpreter.eval("(def g 1) (def read-g (fn [] g))").unwrap();
        let closure = interpreter.get("read-g").unwrap();

        match closure {
            Value::Closure(closure) => assert!(closure.captured.is_empty()),
            other => panic!("expected closure, got {:?}", other),
        }

        // The global is read at call time, so redefinitions are visible.
        assert_eq!(interpreter.eval("(set! g 2) (read-g)").unwrap(), 2i64);
    }

    #[test]
    fn local_helpers_can_recurse() {
        let mut interpreter = Interpreter::new();

        let value = interpreter
            .eval(
                "(def outer (fn []
                   (def helper (fn [n] (if (< n 1) 0 (helper (- n 1)))))
                   (helper 3)))
                 (outer)",
            )
            .unwrap();

        assert_eq!(value, 0i64);
    }

    #[test]
    fn closures_see_later_definitions_in_enclosing_frames() {
        let mut interpreter = Interpreter::new();

        let value = interpreter
            .eval("(let [a 1] (def g (fn [] (+ a y))) (def y 5) (g))")
            .unwrap();

        assert_eq!(value, 6i64);
    }

    #[test]
    fn closures_capture_frames_in_stack_order() {
        let mut interpreter = Interpreter::new();

        let value = interpreter
            .eval("(let [x 1] (let [x 2] (def inner (fn [] x)) (inner)))")
            .unwrap();

        assert_eq!(value, 2i64);
    }

    #[test]
    fn closures_are_lexically_scoped() {
        let mut interpreter = Interpreter::new();

        let value = interpreter
            .eval(
                "(def x \"global\")
                 (def read-x (fn [] x))
                 (let [x \"caller\"] (read-x))",
            )
            .unwrap();

        assert_eq!(value, "global");
    }

    #[test]
    fn recursion_through_globals() {
        let mut interpreter = Interpreter::new();

        let value = interpreter
            .eval("(def fact (fn [n] (if (< n 2) 1 (* n (fact (- n 1)))))) (fact 10)")
            .unwrap();

        assert_eq!(value, 3628800i64);
    }

    #[test]
    fn errors_unwind_calls_and_frames() {
        let mut interpreter = Interpreter::new();

        interpreter.eval("(def boom (fn [x] (let [y 1] (missing x y))))").unwrap();
        let error = interpreter.eval("(let [a 1] (boom a))").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::SymbolNotFound);
        assert!(interpreter.calls.is_empty());
        assert!(interpreter.datastack.is_empty());
        assert_eq!(interpreter.scopes.depth(), 1);

        assert_eq!(interpreter.eval("(boom 1)").unwrap_err().kind(), ErrorKind::SymbolNotFound);
        assert_eq!(interpreter.eval("(+ 1 2)").unwrap(), 3i64);
    }

    #[test]
    fn arity_is_checked() {
        let mut interpreter = Interpreter::new();

        let error = interpreter.eval("((fn [a b] a) 1)").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Execution);
        assert!(error.message().contains("expects 2 arguments"));
    }

    #[test]
    fn invoking_non_function_fails() {
        let mut interpreter = Interpreter::new();

        let error = interpreter.eval("(1 2)").unwrap_err();
        assert!(error.message().contains("cannot invoke 1"));
    }
}
