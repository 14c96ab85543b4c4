//! Runtime values for the ilox interpreter.
//!
//! `Value` is the tagged union every expression evaluates to.  Numbers are
//! integers.  Heap objects (functions, classes, instances) are shared via
//! `Rc`, since several variables may be bound to the same object.

use std::rc::Rc;

use crate::class::{LoxClass, LoxInstance};
use crate::function::LoxFunction;

/// Signature of a host‑provided callable.  Natives have a fixed arity and no
/// closure; a failure is reported as a plain message and mapped to a runtime
/// error at the call site.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Debug, Clone)]
pub enum Value {
    NativeFunction {
        name: String,
        arity: usize,
        func: NativeFn,
    },
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
    Number(i64),
    String(String),
    Bool(bool),
    Nil,
}

impl Value {
    /// The numeric representation used by the language's loose equality:
    /// booleans are 0/1, numbers are themselves, callables and objects are 0.
    pub fn numeric_repr(&self) -> i64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b) => *b as i64,
            _ => 0,
        }
    }
}

/// Host‑level equality, used by tests and assertions.  Distinct from the
/// language's `==` (see `interpreter::is_equal`): heap objects compare by
/// identity here, and there is no cross‑type numeric coercion.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (
                Value::NativeFunction { name: a, .. },
                Value::NativeFunction { name: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),

            Value::Number(n) => write!(f, "{}", n),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}
