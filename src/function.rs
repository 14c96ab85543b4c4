//! User‑defined function objects and their call protocol.

use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::interpreter::{IResult, InterpretError, Interpreter};
use crate::parser::FunctionDecl;
use crate::value::Value;

/// A function value: the shared declaration plus the environment captured at
/// definition time.  The closure is what makes scoping lexical — calls run
/// against it, never against the caller's environment.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<RefCell<Environment>>) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Executes the function body.  The caller has already checked arity and
    /// evaluated `arguments` in its own environment.
    ///
    /// A fresh frame parented to the captured closure receives the parameter
    /// bindings; the body runs as a block against it.  A `ReturnSignal`
    /// becomes the call's result, normal completion yields `nil`, and a
    /// runtime failure inside the body fails the call itself.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: &[Value]) -> IResult<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        let mut environment = Environment::with_enclosing(self.closure.clone());

        for (param, argument) in self.declaration.params.iter().zip(arguments.iter()) {
            debug!("Binding parameter '{}' to {}", param.lexeme, argument);
            environment.define(&param.lexeme, argument.clone(), param.line)?;
        }

        let result =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(environment)));

        match result {
            Ok(()) => Ok(Value::Nil),
            Err(InterpretError::ReturnSignal(value)) => Ok(value),
            Err(e) => Err(e),
        }
    }
}

impl Debug for LoxFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
