use std::rc::Rc;

use crate::callable::LoxFunction;
use crate::class::{LoxClass, LoxInstance};

/// Runtime value — the full tagged union the evaluator operates on.
///
/// Every operation site matches exhaustively on this enum, so adding a
/// variant forces each site to handle it.  Callables come in three shapes
/// (native, user function, class-as-constructor) unified only by the
/// call/arity dispatch in the interpreter.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    /// Host-provided function, e.g. `clock`.
    NativeFunction {
        name: String,
        arity: usize,
        func: fn(&[Value<'a>]) -> Result<Value<'a>, String>,
    },

    /// User-defined function or method closure.
    Function(Rc<LoxFunction<'a>>),

    /// Class object — also the constructor callable.
    Class(Rc<LoxClass<'a>>),

    /// Instance of a class.
    Instance(Rc<LoxInstance<'a>>),

    Number(f64),

    String(String),

    Bool(bool),

    Nil,
}

impl std::fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(func) => write!(f, "<fn {}>", func.name()),

            Value::Class(class) => write!(f, "{}", class.name()),

            Value::Instance(instance) => write!(f, "{} instance", instance.class_name()),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}
