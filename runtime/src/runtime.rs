//! The Sapling interpreter state.

use crate::{
    builtins,
    compiler,
    foreign::ForeignFn,
    prelude::*,
    scope::ScopeStack,
    symbols::{Symbol, SymbolTable},
    vm::{CallFrame, Function},
};
use sapling_syntax::{ast::Expr, parse, source::SourceFile};
use std::{io, rc::Rc, time::Instant};

/// Configure an interpreter.
pub struct InterpreterBuilder {
    builtins: bool,
    debug_symbol_not_found: bool,
    show_global_scope: bool,
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new().with_builtins()
    }
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self {
            builtins: false,
            debug_symbol_not_found: false,
            show_global_scope: false,
        }
    }

    /// Register the builtin functions in the global frame.
    pub fn with_builtins(mut self) -> Self {
        self.builtins = true;
        self
    }

    /// Dump the whole scope stack through the logger whenever a symbol lookup
    /// fails.
    pub fn debug_symbol_not_found(mut self, enabled: bool) -> Self {
        self.debug_symbol_not_found = enabled;
        self
    }

    /// Include the global frame contents in scope dumps.
    pub fn show_global_scope(mut self, enabled: bool) -> Self {
        self.show_global_scope = enabled;
        self
    }

    pub fn build(self) -> Interpreter {
        let start_time = Instant::now();

        let mut scopes = ScopeStack::new();
        scopes.dump_on_miss = self.debug_symbol_not_found;
        scopes.show_global = self.show_global_scope;

        let mut interpreter = Interpreter {
            symbols: SymbolTable::new(),
            scopes,
            datastack: Vec::new(),
            calls: Vec::new(),
            curfunc: Rc::new(Function::new("__idle", 0, Vec::new())),
            pc: 0,
        };

        if self.builtins {
            builtins::init(&mut interpreter);
        }

        log::debug!("interpreter took {:?} to initialize", start_time.elapsed());

        interpreter
    }
}

/// Where execution resumes: the active function and the index of the next
/// instruction to run in it.
#[derive(Clone, Debug)]
pub struct Continuation {
    pub(crate) function: Rc<Function>,
    pub(crate) pc: usize,

    /// Data stack depth at the time of capture.
    pub(crate) depth: usize,
}

impl Continuation {
    pub fn function(&self) -> &Rc<Function> {
        &self.function
    }

    pub fn pc(&self) -> usize {
        self.pc
    }
}

/// Holds all of the state of a Sapling interpreter.
///
/// The scope stack, the data stack and the active continuation are shared by
/// every nested evaluation within one instance. Separate instances share
/// nothing.
pub struct Interpreter {
    pub(crate) symbols: SymbolTable,

    pub(crate) scopes: ScopeStack,

    /// Operand stack of the VM.
    pub(crate) datastack: Vec<Value>,

    /// Return records of closures currently being executed.
    pub(crate) calls: Vec<CallFrame>,

    /// The function currently executing.
    pub(crate) curfunc: Rc<Function>,

    /// Index of the next instruction to execute in `curfunc`.
    pub(crate) pc: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        InterpreterBuilder::default().build()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Intern a symbol name in this interpreter's symbol table.
    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeStack {
        &mut self.scopes
    }

    /// Bind a value in the global frame.
    pub fn define_global(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Exception> {
        let symbol = self.symbols.intern(name);

        match self.scopes.global() {
            Some(global) => {
                global.borrow_mut().bind(&symbol, value.into());
                Ok(())
            }
            None => Err(Exception::empty_stack()),
        }
    }

    /// Register a native function in the global frame.
    pub fn register_fn<F>(&mut self, name: &str, body: F)
    where
        F: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Exception> + 'static,
    {
        let symbol = self.symbols.intern(name);

        if let Some(global) = self.scopes.global() {
            global.borrow_mut().bind(&symbol, ForeignFn::new(name, body).into());
        }
    }

    /// Look up a variable by name in the current scope.
    pub fn get(&mut self, name: &str) -> Result<Value, Exception> {
        let symbol = self.symbols.intern(name);
        self.scopes.lookup_symbol(&symbol).map(|(value, _)| value)
    }

    /// Snapshot the current continuation.
    pub fn continuation(&self) -> Continuation {
        Continuation {
            function: self.curfunc.clone(),
            pc: self.pc,
            depth: self.datastack.len(),
        }
    }

    /// Reinstate a captured continuation. Any values pushed on the data stack
    /// since it was captured are dropped.
    pub(crate) fn restore_continuation(&mut self, continuation: Continuation) {
        self.curfunc = continuation.function;
        self.pc = continuation.pc;
        self.datastack.truncate(continuation.depth);
    }

    /// Run `f`, then restore the continuation that was active before it, on
    /// every exit path.
    pub(crate) fn with_continuation<T>(
        &mut self,
        f: impl FnOnce(&mut Interpreter) -> Result<T, Exception>,
    ) -> Result<T, Exception> {
        let saved = self.continuation();
        let mut guard = scopeguard::guard(self, move |interpreter| interpreter.restore_continuation(saved));

        f(&mut **guard)
    }

    /// Whether the active function has no instructions left to run.
    pub fn reached_end(&self) -> bool {
        self.pc >= self.curfunc.code().len()
    }

    /// Install a function as the active one, starting from its first
    /// instruction.
    pub(crate) fn install(&mut self, function: Rc<Function>) {
        self.curfunc = function;
        self.pc = 0;
    }

    /// Evaluate the given source text and return the value of its last
    /// expression.
    ///
    /// This is safe to call while another program is running; the active
    /// continuation is restored afterwards.
    pub fn eval(&mut self, file: impl Into<SourceFile>) -> Result<Value, Exception> {
        let expressions = parse(file)?;
        self.execute(&expressions)
    }

    /// Compile and run already-parsed expressions, returning the value of the
    /// last one.
    pub fn execute(&mut self, expressions: &[Expr]) -> Result<Value, Exception> {
        let code = compiler::compile_begin(&mut self.symbols, expressions)?;
        let function = Rc::new(Function::new("__main", 0, code));

        self.with_continuation(|interpreter| {
            interpreter.install(function);
            interpreter.run()?;
            interpreter.pop()
        })
    }

    /// Write the data stack and the scope stack, for debugging.
    pub fn show_stacks(&self, out: &mut dyn io::Write) -> io::Result<()> {
        writeln!(out, "data stack (depth {}):", self.datastack.len())?;
        for (i, value) in self.datastack.iter().enumerate().rev() {
            writeln!(out, "   {}: {:?}", i, value)?;
        }

        writeln!(
            out,
            "active function: {} at pc {} (call depth {})",
            self.curfunc.name(),
            self.pc,
            self.calls.len()
        )?;

        self.scopes.show(out, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_do_not_share_globals() {
        let mut a = Interpreter::new();
        let mut b = Interpreter::new();

        a.define_global("shared", 1i64).unwrap();

        assert!(a.get("shared").is_ok());
        assert_eq!(b.get("shared").unwrap_err().kind(), ErrorKind::SymbolNotFound);
    }

    #[test]
    fn eval_returns_last_value() {
        let mut interpreter = Interpreter::new();

        assert_eq!(interpreter.eval("(def x 40) (+ x 2)").unwrap(), 42i64);
        assert_eq!(interpreter.eval("").unwrap(), Value::Nil);
        assert!(interpreter.reached_end());
        assert!(interpreter.datastack.is_empty());
    }

    #[test]
    fn bare_interpreter_has_no_builtins() {
        let mut interpreter = Interpreter::builder().build();

        assert!(interpreter.get("source").is_err());
        assert_eq!(interpreter.eval("(def x 1) x").unwrap(), 1i64);
    }

    #[test]
    fn show_stacks_lists_everything() {
        let mut interpreter = Interpreter::new();
        interpreter.eval("(def answer 42)").unwrap();

        let mut out = Vec::new();
        interpreter.show_stacks(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("data stack (depth 0):"));
        assert!(out.contains("active function: __idle"));
        assert!(out.contains("global scope - omitting content"));
    }
}
