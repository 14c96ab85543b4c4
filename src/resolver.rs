//! Static resolver pass for the **ilox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (a stack of frames tracking declared/defined names
//!    and their slot order, plus a persistent global table that is never
//!    popped — it outlives the walk so a REPL can resolve line after line).
//! 2. Report static errors (redeclaration, forward‑read in initializer,
//!    invalid `return`), accumulating *all* of them across the program rather
//!    than stopping at the first, so a single run surfaces every diagnostic.
//! 3. Record, for each variable occurrence, whether it is a local (and at
//!    what depth and slot) or a global — written into the node's
//!    `Cell<Binding>` so the interpreter never falls back to dynamic lookup
//!    that would see a later shadowing local.

use crate::error::LoxError;
use crate::parser::{Binding, Expr, FunctionDecl, Stmt};
use crate::token::Token;
use log::{debug, info};
use std::cell::Cell;
use std::collections::HashMap;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Declaration status of one name within one scope.
#[derive(Debug, Clone)]
struct VarState {
    /// Position within the scope, in declaration order.
    slot: usize,

    /// False between `declare` and `define` — the initializer window.
    defined: bool,
}

/// One level of the nested name‑to‑status mapping.
#[derive(Debug, Default)]
struct Scope {
    vars: HashMap<String, VarState>,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances (locals vs. globals) into the AST's resolution cells.
pub struct Resolver {
    scopes: Vec<Scope>,
    globals: Scope,
    current_function: FunctionType,
    errors: Vec<LoxError>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            globals: Scope::default(),
            current_function: FunctionType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements.
    ///
    /// The walk never aborts early: every reachable statement is visited and
    /// every static error collected, then returned as one batch.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<(), Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        debug!("Resolving stmt: {:?}", stmt);
        match stmt {
            Stmt::Class { name, methods } => {
                // Class name is visible in the enclosing scope; method bodies
                // are validated like any function even though the evaluator
                // never dispatches to them.
                self.declare(name);
                self.define(name);

                for method in methods {
                    self.resolve_function(method);
                }
            }

            Stmt::Block(statements) => {
                // Push a new anonymous scope for `{ … }`
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // var declaration: declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // function declaration: name is visible *inside* its own body
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                // return only allowed inside a function
                if self.current_function == FunctionType::None {
                    self.errors.push(LoxError::resolve(
                        keyword.line,
                        "'return' used outside of function",
                    ));
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        debug!("Resolving expr: {:?}", expr);
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { name, binding } => {
                // Cannot read a name inside its own initializer.  The check
                // applies to the innermost scope — the global table when no
                // block or function scope is active.
                let in_own_initializer = self
                    .scopes
                    .last()
                    .unwrap_or(&self.globals)
                    .vars
                    .get(&name.lexeme)
                    .is_some_and(|state| !state.defined);

                if in_own_initializer {
                    self.errors.push(LoxError::resolve_at(
                        name,
                        "Cannot read local variable in its own initializer",
                    ));
                }

                self.resolve_local(binding, name);
            }

            Expr::Assign {
                name,
                value,
                binding,
            } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(binding, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, decl: &FunctionDecl) {
        let enclosing = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// The scope a declaration lands in: the innermost frame, or the
    /// persistent global table when no frames are active.
    fn current_scope(&mut self) -> &mut Scope {
        match self.scopes.last_mut() {
            Some(scope) => scope,
            None => &mut self.globals,
        }
    }

    fn declare(&mut self, name: &Token) {
        if self.current_scope().vars.contains_key(&name.lexeme) {
            self.errors.push(LoxError::resolve_at(
                name,
                "Variable already declared in this scope",
            ));
            return;
        }

        let scope = self.current_scope();
        let slot = scope.vars.len();
        scope.vars.insert(
            name.lexeme.clone(),
            VarState {
                slot,
                defined: false,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(state) = self.current_scope().vars.get_mut(&name.lexeme) {
            state.defined = true;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as either:
    ///  - a local at depth `d`, slot `s`, or
    ///  - the global sentinel if not found in *any* local scope.
    fn resolve_local(&mut self, binding: &Cell<Binding>, name: &Token) {
        // 1. check innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(state) = scope.vars.get(&name.lexeme) {
                debug!(
                    "Resolved '{}' at depth {} (slot {})",
                    name.lexeme, depth, state.slot
                );
                binding.set(Binding::Local {
                    depth,
                    slot: state.slot,
                });
                return;
            }
        }

        // 2. not found in any local scope ⇒ global
        debug!("Resolved '{}' as global", name.lexeme);

        binding.set(Binding::Global);
    }
}
