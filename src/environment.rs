//! Scope frames for the interpreter.
//!
//! An [`Environment`] owns a name→value map and an optional handle to its
//! enclosing frame, fixed at creation.  Frames are shared via
//! `Rc<RefCell<_>>`: a closure keeps its defining frame alive after the
//! block that created it has returned.  Enclosing links form a tree, so
//! reference counting alone is enough — no cycles can arise.

use crate::error::{LoxError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    pub enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    /// The root frame — only `globals` is created this way.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite a binding in *this* frame only.  Redefinition in
    /// the same frame is legal at runtime; duplicate declarations are a
    /// separate static error caught by the resolver.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Look up `name` here, delegating to the enclosing frame when absent.
    pub fn get(&self, name: &str, line: usize) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Mutate the first frame (walking outward) that already defines `name`.
    pub fn assign(&mut self, name: &str, value: Value<'a>, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Walk exactly `distance` enclosing links and return that frame, or
    /// `None` if the chain is shallower than `distance`.
    ///
    /// The resolver only hands out distances it has verified against the
    /// lexical scope stack, so a `None` here means the binding table and
    /// the frame chain have diverged.
    pub fn ancestor(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment<'a>>>> {
        let mut frame: Rc<RefCell<Environment<'a>>> = Rc::clone(env);

        for _ in 0..distance {
            let enclosing = frame.borrow().enclosing.clone()?;

            frame = enclosing;
        }

        Some(frame)
    }

    /// Read `name` directly from the frame `distance` links away — no
    /// further walking.  Used only for resolver-bound locals.
    pub fn get_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value<'a>> {
        let frame = Self::ancestor(env, distance)
            .ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))?;
        let value = frame.borrow().values.get(name).cloned();

        value.ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))
    }

    /// Write `name` directly into the frame `distance` links away.
    pub fn assign_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
        value: Value<'a>,
        line: usize,
    ) -> Result<()> {
        let frame = Self::ancestor(env, distance)
            .ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))?;
        frame.borrow_mut().values.insert(name.to_string(), value);

        Ok(())
    }
}

impl Default for Environment<'_> {
    fn default() -> Self {
        Self::new()
    }
}
