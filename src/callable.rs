//! User-defined functions and method closures.
//!
//! A [`LoxFunction`] pairs a shared [`FunctionDecl`] with the environment
//! that was current at its declaration site.  That captured frame — never
//! the caller's environment — becomes the enclosing frame of every call,
//! which is what makes scoping lexical rather than dynamic.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::parser::FunctionDecl;
use crate::value::Value;

#[derive(Debug)]
pub struct LoxFunction<'a> {
    declaration: Rc<FunctionDecl<'a>>,
    closure: Rc<RefCell<Environment<'a>>>,
    is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(
        declaration: Rc<FunctionDecl<'a>>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Execute the function body.  The caller has already checked arity.
    ///
    /// A `Return` signal is consumed here — this is the call boundary the
    /// signal unwinds to.  Initializers always yield `this`, regardless of
    /// how the body exited (an explicit `return <expr>` inside `init` was
    /// already rejected by the resolver, so only an implicit nil can be
    /// overridden at runtime).
    pub fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Calling function '{}'", self.name());

        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(param.lexeme, argument);
        }

        let flow = interpreter.execute_block(
            &self.declaration.body,
            Rc::new(RefCell::new(environment)),
        )?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this", self.declaration.name.line);
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }

    /// Produce a bound method: same declaration, but the closure gains a
    /// one-link frame defining `this` = `instance`.
    pub fn bind(&self, instance: Rc<LoxInstance<'a>>) -> LoxFunction<'a> {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }
}
