//! Class and instance objects.
//!
//! Classes in this dialect are constructors only: a class value is callable
//! with zero arguments and yields a fresh instance.  Methods are parsed and
//! carried in the class's method table, but no property or method lookup
//! exists yet — the instance→class back‑reference is the foundation it would
//! build on.

use std::collections::HashMap;
use std::rc::Rc;

use crate::parser::FunctionDecl;

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,

    /// Method declarations by name.  Populated at class definition time.
    pub methods: HashMap<String, Rc<FunctionDecl>>,
}

impl LoxClass {
    pub fn new(name: impl Into<String>, methods: HashMap<String, Rc<FunctionDecl>>) -> Self {
        Self {
            name: name.into(),
            methods,
        }
    }
}

#[derive(Debug)]
pub struct LoxInstance {
    /// Shared back‑reference: many instances, one class.
    pub class: Rc<LoxClass>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self { class }
    }
}
