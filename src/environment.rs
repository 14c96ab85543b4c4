//! Runtime scope chain.
//!
//! Each `Environment` is one frame in a singly-linked chain of scopes.
//! Frames are shared (`Rc<RefCell<_>>`) because closures capture the
//! environment that was current at their definition; a frame lives until the
//! interpreter's current pointer has moved past it *and* no closure retains
//! it.
//!
//! Lookups are depth-addressed: the resolver has already computed how many
//! parent links to walk, so `get_at`/`assign_at` traverse exactly that many
//! frames and then consult a single map.  Globally-resolved names never walk
//! the chain at all — the interpreter holds a dedicated handle to the root
//! frame and addresses it at depth 0.

use crate::error::{LoxError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Inserts a fresh binding into this frame.
    ///
    /// Redefinition within one frame is an error — `var x; var x;` in the
    /// same block is caught here even when the resolver missed it.
    pub fn define(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            return Err(LoxError::runtime(
                line,
                format!("Variable already defined at {}", name),
            ));
        }

        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Overwrites an existing binding in this exact frame.  Used by the
    /// class-declaration two-step (define as nil, then assign the class).
    pub fn assign_here(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable at {}", name),
            ))
        }
    }

    /// Walks exactly `depth` parent links from `env`, or fails when the chain
    /// is shorter than the resolver believed.
    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        depth: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = env.clone();

        for _ in 0..depth {
            let parent = current.borrow().enclosing.clone()?;
            current = parent;
        }

        Some(current)
    }

    /// Reads `name` from the frame exactly `depth` hops out.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        name: &str,
        line: usize,
    ) -> Result<Value> {
        Self::ancestor(env, depth)
            .and_then(|frame| frame.borrow().values.get(name).cloned())
            .ok_or_else(|| LoxError::runtime(line, format!("Undefined variable at {}", name)))
    }

    /// Mutates an existing binding in the frame exactly `depth` hops out.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<()> {
        match Self::ancestor(env, depth) {
            Some(frame) => frame.borrow_mut().assign_here(name, value, line),
            None => Err(LoxError::runtime(
                line,
                format!("Undefined variable at {}", name),
            )),
        }
    }
}
