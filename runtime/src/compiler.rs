//! Compiles expressions into VM instructions.
//!
//! Special forms are recognized by the symbol in head position: `quote`,
//! `def`, `set!`, `begin`, `if`, `let` and `fn`. Every other list is a call.

use crate::{
    prelude::*,
    symbols::{Symbol, SymbolTable},
    vm::{Function, Instruction, Lambda},
};
use sapling_syntax::ast::{Expr, ExprKind};
use std::rc::Rc;

/// Compile a sequence of expressions so that each is evaluated in order and
/// only the value of the last one is left on the data stack.
///
/// An empty sequence evaluates to `nil`.
pub fn compile_begin(symbols: &mut SymbolTable, exprs: &[Expr]) -> Result<Vec<Instruction>, Exception> {
    compile_begin_after(symbols, Vec::new(), exprs)
}

/// Like [`compile_begin`], but emits after the given instructions. Jump
/// targets account for the prefix.
pub(crate) fn compile_begin_after(
    symbols: &mut SymbolTable,
    prefix: Vec<Instruction>,
    exprs: &[Expr],
) -> Result<Vec<Instruction>, Exception> {
    let mut compiler = Compiler::new(symbols, prefix);
    compiler.begin(exprs)?;

    Ok(compiler.code)
}

struct Compiler<'s> {
    symbols: &'s mut SymbolTable,
    code: Vec<Instruction>,

    /// Every symbol read or assigned, used to find a lambda's free variables.
    referenced: Vec<Symbol>,
}

impl<'s> Compiler<'s> {
    fn new(symbols: &'s mut SymbolTable, code: Vec<Instruction>) -> Self {
        Self {
            symbols,
            code,
            referenced: Vec::new(),
        }
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.code.push(instruction);
        self.code.len() - 1
    }

    fn reference(&mut self, symbol: &Symbol) {
        if !self.referenced.contains(symbol) {
            self.referenced.push(symbol.clone());
        }
    }

    fn begin(&mut self, exprs: &[Expr]) -> Result<(), Exception> {
        if exprs.is_empty() {
            self.emit(Instruction::Push(Value::Nil));
            return Ok(());
        }

        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.emit(Instruction::Pop);
            }
            self.expr(expr)?;
        }

        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), Exception> {
        match &expr.kind {
            ExprKind::Nil => {
                self.emit(Instruction::Push(Value::Nil));
            }
            ExprKind::Bool(value) => {
                self.emit(Instruction::Push(Value::Bool(*value)));
            }
            ExprKind::Int(value) => {
                self.emit(Instruction::Push(Value::Int(*value)));
            }
            ExprKind::Float(value) => {
                self.emit(Instruction::Push(Value::Float(*value)));
            }
            ExprKind::String(value) => {
                self.emit(Instruction::Push(Value::from(value.as_str())));
            }
            ExprKind::Symbol(name) => {
                let symbol = self.symbols.intern(name);
                self.reference(&symbol);
                self.emit(Instruction::Get(symbol));
            }
            ExprKind::Array(items) => {
                for item in items {
                    self.expr(item)?;
                }
                self.emit(Instruction::MakeArray(items.len()));
            }
            ExprKind::List(_, Some(_)) => {
                return Err(Exception::compile(expr.line(), "cannot evaluate a dotted list"));
            }
            ExprKind::List(items, None) => match items.split_first() {
                None => {
                    self.emit(Instruction::Push(Value::Nil));
                }
                Some((head, args)) => match head.as_symbol() {
                    Some("quote") => self.quote(expr, args)?,
                    Some("def") => self.assign(expr, args, "def")?,
                    Some("set!") => self.assign(expr, args, "set!")?,
                    Some("begin") => self.begin(args)?,
                    Some("if") => self.if_form(expr, args)?,
                    Some("let") => self.let_form(expr, args)?,
                    Some("fn") => self.lambda(expr, args, "lambda")?,
                    _ => {
                        self.expr(head)?;
                        for arg in args {
                            self.expr(arg)?;
                        }
                        self.emit(Instruction::Call(args.len()));
                    }
                },
            },
        }

        Ok(())
    }

    fn quote(&mut self, form: &Expr, args: &[Expr]) -> Result<(), Exception> {
        match args {
            [datum] => {
                let value = self.datum(datum);
                self.emit(Instruction::Push(value));
                Ok(())
            }
            _ => Err(Exception::compile(form.line(), "quote expects exactly one argument")),
        }
    }

    /// Convert an expression to the value it denotes when quoted.
    fn datum(&mut self, expr: &Expr) -> Value {
        match &expr.kind {
            ExprKind::Nil => Value::Nil,
            ExprKind::Bool(value) => Value::Bool(*value),
            ExprKind::Int(value) => Value::Int(*value),
            ExprKind::Float(value) => Value::Float(*value),
            ExprKind::String(value) => Value::from(value.as_str()),
            ExprKind::Symbol(name) => Value::Symbol(self.symbols.intern(name)),
            ExprKind::List(items, tail) => {
                let tail = match tail {
                    Some(tail) => self.datum(tail),
                    None => Value::Nil,
                };

                let items = items.iter().map(|item| self.datum(item)).collect::<Vec<_>>();
                items.into_iter().rev().fold(tail, |tail, head| Value::cons(head, tail))
            }
            ExprKind::Array(items) => Value::from(items.iter().map(|item| self.datum(item)).collect::<Vec<_>>()),
        }
    }

    /// `(def name value)` and `(set! name value)`.
    fn assign(&mut self, form: &Expr, args: &[Expr], keyword: &str) -> Result<(), Exception> {
        let (name, value) = match args {
            [target, value] => match target.as_symbol() {
                Some(name) => (name, value),
                None => {
                    return Err(Exception::compile(
                        target.line(),
                        format!("{} expects a symbol, got {:?}", keyword, target),
                    ))
                }
            },
            _ => {
                return Err(Exception::compile(
                    form.line(),
                    format!("{} expects a symbol and a value", keyword),
                ))
            }
        };

        let symbol = self.symbols.intern(name);

        match value.as_list() {
            Some([head, rest @ ..]) if head.as_symbol() == Some("fn") => self.lambda(value, rest, name)?,
            _ => self.expr(value)?,
        }

        if keyword == "def" {
            self.emit(Instruction::Def(symbol));
        } else {
            self.reference(&symbol);
            self.emit(Instruction::Set(symbol));
        }

        Ok(())
    }

    fn if_form(&mut self, form: &Expr, args: &[Expr]) -> Result<(), Exception> {
        let (condition, then, otherwise) = match args {
            [condition, then] => (condition, then, None),
            [condition, then, otherwise] => (condition, then, Some(otherwise)),
            _ => return Err(Exception::compile(form.line(), "if expects a condition and one or two branches")),
        };

        self.expr(condition)?;
        let branch = self.emit(Instruction::BranchIfFalse(0));

        self.expr(then)?;
        let jump = self.emit(Instruction::Jump(0));

        self.code[branch] = Instruction::BranchIfFalse(self.code.len());
        match otherwise {
            Some(otherwise) => self.expr(otherwise)?,
            None => {
                self.emit(Instruction::Push(Value::Nil));
            }
        }

        self.code[jump] = Instruction::Jump(self.code.len());

        Ok(())
    }

    /// `(let [name value ...] body...)`
    fn let_form(&mut self, form: &Expr, args: &[Expr]) -> Result<(), Exception> {
        let (bindings, body) = match args.split_first() {
            Some((Expr { kind: ExprKind::Array(bindings), .. }, body)) if bindings.len() % 2 == 0 => (bindings, body),
            _ => {
                return Err(Exception::compile(
                    form.line(),
                    "let expects an array of name and value pairs",
                ))
            }
        };

        self.emit(Instruction::PushScope);

        for pair in bindings.chunks(2) {
            let symbol = match pair[0].as_symbol() {
                Some(name) => self.symbols.intern(name),
                None => {
                    return Err(Exception::compile(
                        pair[0].line(),
                        format!("let binding name must be a symbol, got {:?}", pair[0]),
                    ))
                }
            };

            self.expr(&pair[1])?;
            self.emit(Instruction::Def(symbol));
            self.emit(Instruction::Pop);
        }

        self.begin(body)?;
        self.emit(Instruction::PopScope);

        Ok(())
    }

    /// `(fn [params...] body...)`
    fn lambda(&mut self, form: &Expr, args: &[Expr], name: &str) -> Result<(), Exception> {
        let (params, body) = match args.split_first() {
            Some((Expr { kind: ExprKind::Array(params), .. }, body)) => (params, body),
            _ => return Err(Exception::compile(form.line(), "fn expects an array of parameters")),
        };

        let params = params
            .iter()
            .map(|param| match param.as_symbol() {
                Some(name) => Ok(self.symbols.intern(name)),
                None => Err(Exception::compile(
                    param.line(),
                    format!("parameter must be a symbol, got {:?}", param),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut nested = Compiler::new(&mut *self.symbols, Vec::new());
        nested.begin(body)?;

        let free = nested
            .referenced
            .into_iter()
            .filter(|symbol| !params.contains(symbol))
            .collect::<Vec<_>>();
        let function = Function::new(name, params.len(), nested.code);

        // Whatever the inner body needs from enclosing frames, the enclosing
        // closure needs to capture as well.
        for symbol in free.iter() {
            self.reference(symbol);
        }

        self.emit(Instruction::MakeClosure(Rc::new(Lambda {
            function: Rc::new(function),
            params,
            free,
        })));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sapling_syntax::parse;

    fn compile(source: &str) -> Result<Vec<Instruction>, Exception> {
        let mut symbols = SymbolTable::new();
        compile_begin(&mut symbols, &parse(source).unwrap())
    }

    fn listing(source: &str) -> String {
        format!("{:?}", compile(source).unwrap())
    }

    #[test]
    fn begin_pops_all_but_last() {
        assert_eq!(listing("1 2 3"), "[push 1, pop, push 2, pop, push 3]");
        assert_eq!(listing(""), "[push nil]");
        assert_eq!(listing("()"), "[push nil]");
    }

    #[test]
    fn calls_push_callee_before_arguments() {
        assert_eq!(listing("(f 1 \"two\")"), r#"[get f, push 1, push "two", call 2]"#);
        assert_eq!(listing("[a 2]"), "[get a, push 2, make-array 2]");
    }

    #[test]
    fn if_patches_branch_targets() {
        assert_eq!(listing("(if c 1 2)"), "[get c, branch-if-false 4, push 1, jump 5, push 2]");
        assert_eq!(listing("(if c 1)"), "[get c, branch-if-false 4, push 1, jump 5, push nil]");
    }

    #[test]
    fn branch_targets_account_for_prefix() {
        let mut symbols = SymbolTable::new();
        let code = compile_begin_after(&mut symbols, vec![Instruction::Pop], &parse("(if c 1 2)").unwrap()).unwrap();

        assert_eq!(
            format!("{:?}", code),
            "[pop, get c, branch-if-false 5, push 1, jump 6, push 2]"
        );
    }

    #[test]
    fn let_scopes_its_bindings() {
        assert_eq!(
            listing("(let [a 1] a)"),
            "[push-scope, push 1, def a, pop, get a, pop-scope]"
        );
    }

    #[test]
    fn quote_builds_data() {
        assert_eq!(listing("'(a \"b\" . 3)"), r#"[push (a "b" . 3)]"#);
        assert_eq!(listing("(quote [x 1])"), "[push [x 1]]");
    }

    #[test]
    fn lambda_free_variables_exclude_params() {
        let code = compile("(def add (fn [x] (+ x y)))").unwrap();

        match &code[0] {
            Instruction::MakeClosure(lambda) => {
                let free = lambda.free.iter().map(|symbol| symbol.name()).collect::<Vec<_>>();

                assert_eq!(free, vec!["+", "y"]);
                assert_eq!(lambda.function.name(), "add");
                assert_eq!(lambda.function.arity(), 1);
            }
            other => panic!("expected closure, got {:?}", other),
        }
    }

    #[test]
    fn nested_lambda_free_variables_propagate() {
        let code = compile("(fn [a] (fn [b] (list a b c)))").unwrap();

        match &code[0] {
            Instruction::MakeClosure(lambda) => {
                let free = lambda.free.iter().map(|symbol| symbol.name()).collect::<Vec<_>>();
                assert_eq!(free, vec!["list", "c"]);
            }
            other => panic!("expected closure, got {:?}", other),
        }
    }

    #[test]
    fn errors_report_line() {
        let error = compile("(def x 1)\n\n(def 1 2)").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Compile);
        assert!(error.message().starts_with("error compiling on line 3:"), "{}", error.message());

        assert_eq!(compile("(a . b)").unwrap_err().kind(), ErrorKind::Compile);
        assert_eq!(compile("(let [a] a)").unwrap_err().kind(), ErrorKind::Compile);
        assert_eq!(compile("(if)").unwrap_err().kind(), ErrorKind::Compile);
    }
}
