//! Class and instance runtime objects.
//!
//! A [`LoxClass`] is immutable after construction: name, optional
//! superclass link, and method table.  Calling a class allocates a
//! [`LoxInstance`] and, if an `init` method exists, runs it bound to the
//! new instance — construction always yields the instance, whatever
//! `init` returns.  Instance fields are created lazily on first
//! assignment; there is no declared field list.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::callable::LoxFunction;
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

#[derive(Debug)]
pub struct LoxClass<'a> {
    name: String,
    superclass: Option<Rc<LoxClass<'a>>>,
    methods: HashMap<String, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass<'a>>>,
        methods: HashMap<String, Rc<LoxFunction<'a>>>,
    ) -> Self {
        LoxClass {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a method on this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class-as-callable takes as many arguments as its `init` method,
    /// or none if it has no initializer.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    /// Constructor call: allocate the instance, run a bound `init` if one
    /// exists (its result is discarded), and yield the instance.
    pub fn call(
        class: &Rc<LoxClass<'a>>,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Constructing instance of '{}'", class.name);

        let instance: Rc<LoxInstance<'a>> = Rc::new(LoxInstance {
            class: Rc::clone(class),
            fields: RefCell::new(HashMap::new()),
        });

        if let Some(initializer) = class.find_method("init") {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

#[derive(Debug)]
pub struct LoxInstance<'a> {
    class: Rc<LoxClass<'a>>,
    fields: RefCell<HashMap<String, Value<'a>>>,
}

impl<'a> LoxInstance<'a> {
    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Property read: fields shadow methods; a method hit is bound to the
    /// receiver so its body can resolve `this`.
    pub fn get(instance: &Rc<LoxInstance<'a>>, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = instance.fields.borrow().get(name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.class.find_method(name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance)))));
        }

        Err(LoxError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property write: unconditional — fields come into existence on first
    /// assignment.
    pub fn set(&self, name: &Token<'a>, value: Value<'a>) {
        self.fields
            .borrow_mut()
            .insert(name.lexeme.to_string(), value);
    }
}
