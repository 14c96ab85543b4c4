//! Tree-walking evaluator.
//!
//! Executes resolved statements for effect and evaluates expressions to
//! [`Value`]s against a chain of lexically-scoped environments rooted at a
//! dedicated globals frame.  Evaluation is strictly recursive and
//! single-threaded: the host stack mirrors the nesting of the source program.
//!
//! Failure is a `Result` discipline throughout — any expression error fails
//! its enclosing statement, a failing statement stops its block (the block's
//! environment is still restored), and a failing function body fails the call
//! itself.  Early `return` travels as the dedicated [`InterpretError::ReturnSignal`]
//! variant and is caught only at function-call boundaries, so every block and
//! loop stops at a return with no per-site flag to check.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};
use thiserror::Error;

use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::LoxError;
use crate::function::LoxFunction;
use crate::parser::{Binding, Expr, FunctionDecl, LiteralValue, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error(transparent)]
    Runtime(#[from] LoxError),

    /// Early return unwinding towards the nearest function-call boundary.
    /// Never escapes a call: the resolver rejects top-level `return`.
    #[error("Return signal with value: {0}")]
    ReturnSignal(Value),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, InterpretError>;

pub struct Interpreter {
    /// Current scope; swapped on block and call entry/exit.
    environment: Rc<RefCell<Environment>>,

    /// Fixed root frame.  Every reference the resolver marked global goes
    /// through this handle at depth 0, never through the chain walk, so
    /// natives and top-level declarations stay visible from inside deeply
    /// nested closures.
    globals: Rc<RefCell<Environment>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter and installs native functions such as `time`.
    pub fn new() -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'time'");

        globals
            .borrow_mut()
            .define(
                "time",
                Value::NativeFunction {
                    name: "time".to_string(),
                    arity: 0,
                    func: |_args: &[Value]| {
                        debug!("Calling native function 'time'");
                        Ok(Value::Number(Utc::now().timestamp()))
                    },
                },
                0,
            )
            .expect("fresh globals frame");

        Self {
            environment: globals.clone(),
            globals,
        }
    }

    /// The root environment.  Exposed so drivers and tests can observe
    /// top-level program state.
    pub fn globals(&self) -> &Rc<RefCell<Environment>> {
        &self.globals
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());
        for stmt in statements {
            self.execute(stmt)?;
        }
        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                // Capture the current environment as the closure.
                let function = LoxFunction::new(decl.clone(), self.environment.clone());
                self.environment.borrow_mut().define(
                    &decl.name.lexeme,
                    Value::Function(Rc::new(function)),
                    decl.name.line,
                )?;
                info!(
                    "Function '{}' defined with {} parameters",
                    decl.name.lexeme,
                    decl.params.len()
                );
                Ok(())
            }

            Stmt::Expression(expr) => {
                debug!("Evaluating expression statement");
                let _ = self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                debug!("Evaluating print statement");
                let value = self.evaluate(expr)?;
                println!("{}", value);
                info!("Printed value: {}", value);
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);
                let value = if let Some(expr) = initializer {
                    self.evaluate(expr)?
                } else {
                    Value::Nil
                };
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, value.clone(), name.line)?;
                info!("Variable '{}' defined with value: {}", name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                debug!("Evaluating if condition");
                let cond_value = self.evaluate(condition)?;
                if is_truthy(&cond_value) {
                    self.execute(then_branch)?;
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)?;
                }
                Ok(())
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");
                // A failing body or a return stops iterating immediately —
                // both propagate as Err before the next condition check.
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }
                info!("Exited while loop");
                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                debug!("Executing return statement");
                let value = match value {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Err(InterpretError::ReturnSignal(value))
            }

            Stmt::Class { name, methods } => {
                debug!("Defining class '{}'", name.lexeme);
                // Two-step define-then-assign, mirroring function recursion
                // support: the name exists (as nil) while the class value is
                // being constructed.
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil, name.line)?;

                let mut table: HashMap<String, Rc<FunctionDecl>> = HashMap::new();
                for method in methods {
                    table.insert(method.name.lexeme.clone(), method.clone());
                }

                let class = LoxClass::new(name.lexeme.clone(), table);
                self.environment.borrow_mut().assign_here(
                    &name.lexeme,
                    Value::Class(Rc::new(class)),
                    name.line,
                )?;
                info!("Class '{}' defined", name.lexeme);
                Ok(())
            }
        }
    }

    /// Executes `statements` against `environment`, then restores the prior
    /// environment — also when a statement failed or returned early.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<()> {
        debug!("Entering block with {} statements", statements.len());

        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;

        debug!("Exited block");
        result
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        debug!("Evaluating expression: {:?}", expr);
        let value = match expr {
            Expr::Literal(lit) => evaluate_literal(lit),

            Expr::Grouping(e) => self.evaluate(e)?,

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right)?,

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right)?,

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right)?,

            Expr::Variable { name, binding } => self.lookup_variable(name, binding.get())?,

            Expr::Assign {
                name,
                value,
                binding,
            } => {
                let val = self.evaluate(value)?;
                self.assign_variable(name, binding.get(), val.clone())?;
                val
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                debug!("Evaluating call");
                let callee_val = self.evaluate(callee)?;

                // Arguments are evaluated left-to-right in the caller's
                // environment, before any callee frame exists.
                let mut arg_values = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.invoke_callable(&callee_val, paren, &arg_values)?
            }
        };
        debug!("Expression evaluated to: {}", value);
        Ok(value)
    }

    /// Reads a variable through its resolved binding: locals walk the chain
    /// by depth, globals go straight through the root handle.
    fn lookup_variable(&self, name: &Token, binding: Binding) -> IResult<Value> {
        let value = match binding {
            Binding::Local { depth, slot } => {
                debug!(
                    "Reading local '{}' at depth {} (slot {})",
                    name.lexeme, depth, slot
                );
                Environment::get_at(&self.environment, depth, &name.lexeme, name.line)?
            }

            Binding::Global => {
                debug!("Reading global '{}'", name.lexeme);
                Environment::get_at(&self.globals, 0, &name.lexeme, name.line)?
            }
        };

        Ok(value)
    }

    /// Writes a variable through its resolved binding, analogous to
    /// [`Self::lookup_variable`].
    fn assign_variable(&self, name: &Token, binding: Binding, value: Value) -> IResult<()> {
        match binding {
            Binding::Local { depth, slot } => {
                debug!(
                    "Assigning local '{}' at depth {} (slot {})",
                    name.lexeme, depth, slot
                );
                Environment::assign_at(&self.environment, depth, &name.lexeme, value, name.line)?;
            }

            Binding::Global => {
                debug!("Assigning global '{}'", name.lexeme);
                Environment::assign_at(&self.globals, 0, &name.lexeme, value, name.line)?;
            }
        }

        Ok(())
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, op: &Token, expr: &Expr) -> IResult<Value> {
        debug!("Evaluating unary operation: {}", op.lexeme);
        let right_val = self.evaluate(expr)?;
        let result = match op.token_type {
            TokenType::MINUS => {
                if let Value::Number(n) = right_val {
                    Value::Number(-n)
                } else {
                    return Err(LoxError::runtime_at(op, "Operand must be a number").into());
                }
            }

            TokenType::BANG => Value::Bool(!is_truthy(&right_val)),

            _ => {
                return Err(LoxError::runtime_at(op, "Unknown operand").into());
            }
        };
        Ok(result)
    }

    /// Evaluates a binary expression.  Both operands are evaluated eagerly,
    /// left to right; only `and`/`or` (a separate node kind) short-circuit.
    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> IResult<Value> {
        debug!("Evaluating binary operation: {}", op.lexeme);
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match op.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), b) => concatenate(a, b, op),
                _ => Err(LoxError::runtime_at(op, "Operands must be numbers").into()),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(LoxError::runtime_at(op, "Operands must be numbers").into()),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(LoxError::runtime_at(op, "Operands must be numbers").into()),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(LoxError::runtime_at(op, "Operands must be numbers").into()),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(LoxError::runtime_at(op, "Operands must be numbers").into()),
            },

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(LoxError::runtime_at(op, "Operands must be numbers").into()),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime_at(op, "Operands must be numbers").into()),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_val, &right_val))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_val, &right_val))),

            // Division lands here: the factor rule parses `/` but the
            // evaluator's operator set does not include it.
            _ => Err(LoxError::runtime_at(op, "Unknown operand").into()),
        }
    }

    /// Short-circuiting `and` / `or`: the right operand is only evaluated
    /// when the left doesn't decide the result.
    fn evaluate_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> IResult<Value> {
        debug!("Evaluating logical operation: {}", op.lexeme);
        let left_val = self.evaluate(left)?;

        if op.token_type == TokenType::OR {
            if is_truthy(&left_val) {
                return Ok(left_val);
            }
        } else if !is_truthy(&left_val) {
            return Ok(left_val);
        }

        self.evaluate(right)
    }

    /// Invokes a callable: native function, user-defined function, or class
    /// constructor.
    fn invoke_callable(
        &mut self,
        callee_val: &Value,
        paren: &Token,
        arg_values: &[Value],
    ) -> IResult<Value> {
        match callee_val {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);
                check_arity(*arity, arg_values.len(), paren)?;

                let result = func(arg_values)
                    .map_err(|msg| LoxError::runtime(paren.line, msg))?;
                info!("Native function '{}' returned: {}", name, result);
                Ok(result)
            }

            Value::Function(function) => {
                check_arity(function.arity(), arg_values.len(), paren)?;

                let result = function.call(self, arg_values)?;
                info!("Function '{}' returned: {}", function.name(), result);
                Ok(result)
            }

            Value::Class(class) => {
                debug!("Constructing instance of '{}'", class.name);
                check_arity(0, arg_values.len(), paren)?;

                Ok(Value::Instance(Rc::new(LoxInstance::new(class.clone()))))
            }

            _ => Err(LoxError::runtime_at(paren, "Callee is not a function").into()),
        }
    }
}

/// Materialises a parsed literal constant.
fn evaluate_literal(lit: &LiteralValue) -> Value {
    match lit {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// String concatenation for `string + other`.  `nil` on the right is absorbed
/// (the left operand is returned unchanged); callables and objects have no
/// textual rendering and fail.
fn concatenate(mut left: String, right: Value, op: &Token) -> IResult<Value> {
    match right {
        Value::Nil => Ok(Value::String(left)),

        Value::Bool(b) => {
            left.push_str(if b { "true" } else { "false" });
            Ok(Value::String(left))
        }

        Value::Number(n) => {
            let mut buf: itoa::Buffer = itoa::Buffer::new();
            left.push_str(buf.format(n));
            Ok(Value::String(left))
        }

        Value::String(s) => {
            left.push_str(&s);
            Ok(Value::String(left))
        }

        _ => Err(LoxError::runtime_at(op, "Operands must be numbers").into()),
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> IResult<()> {
    if expected != got {
        let msg = format!("Expected {} args but got {}", expected, got);
        debug!("Error: {}", msg);
        return Err(LoxError::runtime_at(paren, &msg).into());
    }

    Ok(())
}

/// Truthiness: nil is false, strings are always true, everything else goes by
/// its numeric representation being positive.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::String(_) => true,
        Value::Bool(b) => *b,
        Value::Number(n) => *n > 0,
        _ => false,
    }
}

/// Language equality: nil equals only nil, strings compare by content (and
/// only against strings), every other pairing compares numeric
/// representations — so `1 == true` holds.
pub fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,
        (Value::Nil, _) | (_, Value::Nil) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::String(_), _) | (_, Value::String(_)) => false,
        _ => left.numeric_repr() == right.numeric_repr(),
    }
}
