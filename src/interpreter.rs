//! The tree-walking evaluator.
//!
//! Execution is single-threaded, depth-first recursion over the AST.  The
//! interpreter owns the `globals` frame (seeded with the `clock` native),
//! a mutable current-environment handle, and the binding table filled in
//! by the resolver.  Variable-like nodes with a binding-table entry are
//! read at an exact lexical distance via `Environment::get_at`; nodes
//! without an entry fall back to the global frame.
//!
//! Statement execution returns [`Flow`]: the non-local `return` signal is
//! a value in the success channel, kept strictly apart from runtime
//! errors, and propagated unchanged by every block and loop until a
//! function-call boundary consumes it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::callable::LoxFunction;
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::parser::{Expr, LiteralValue, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing a statement: either fall through to the next
/// statement, or unwind to the nearest enclosing call boundary carrying
/// the returned value.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

pub struct Interpreter<'a> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    /// Binding table: expression node id → lexical distance.  Filled by the
    /// resolver; absence of an entry means "global".
    locals: HashMap<usize, usize>,
    /// Where `print` writes.  Stdout by default; tests inject a buffer.
    output: Box<dyn Write>,
}

impl<'a> Interpreter<'a> {
    /// Creates a new Interpreter printing to stdout, with native functions
    /// such as `clock` bound in `globals`.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an Interpreter writing `print` output to the given sink.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args| {
                    let seconds: f64 = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
                    Ok(Value::Number(seconds))
                },
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Record a resolved local binding: `id` refers to the frame `depth`
    /// links out from the environment current when the node executes.
    /// Called by the resolver; distances depend only on lexical structure.
    pub fn note_local(&mut self, id: usize, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Flow::Return(_) = self.execute(stmt)? {
                // The resolver rejects top-level `return`; a signal reaching
                // this loop means the resolve pass was skipped.
                return Err(LoxError::runtime(0, "Cannot return from top-level code."));
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ───────────────────────── statement execution ─────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                let _ = self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let child = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(child)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_value = self.evaluate(condition)?;

                if is_truthy(&cond_value) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                loop {
                    let cond_value = self.evaluate(condition)?;
                    if !is_truthy(&cond_value) {
                        break;
                    }

                    // A return inside the loop body unwinds through it.
                    if let flow @ Flow::Return(_) = self.execute(body)? {
                        return Ok(flow);
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure is the environment at the declaration site,
                // which makes nested functions and recursion work.
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Raising return signal with value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Execute `statements` inside `environment`, restoring the previous
    /// current-environment handle unconditionally — on normal completion,
    /// on an in-flight return signal, and on the error path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = self.run_sequence(statements);

        self.environment = previous;
        result
    }

    fn run_sequence(&mut self, statements: &[Stmt<'a>]) -> Result<Flow<'a>> {
        for statement in statements {
            if let flow @ Flow::Return(_) = self.execute(statement)? {
                return Ok(flow);
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&Expr<'a>>,
        methods: &[Rc<crate::parser::FunctionDecl<'a>>],
    ) -> Result<Flow<'a>> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass_value: Option<Rc<LoxClass<'a>>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(LoxError::runtime(
                        name.line,
                        "Superclass must be a class.",
                    ));
                }
            },
            None => None,
        };

        // Predefine the name so methods can refer to the class once
        // construction completes.
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        // With a superclass, method closures capture an extra frame that
        // binds `super`.
        let enclosing = if let Some(ref sc) = superclass_value {
            let enclosing = Rc::clone(&self.environment);

            let mut super_env = Environment::with_enclosing(Rc::clone(&self.environment));
            super_env.define("super", Value::Class(Rc::clone(sc)));
            self.environment = Rc::new(RefCell::new(super_env));

            Some(enclosing)
        } else {
            None
        };

        let mut method_table: HashMap<String, Rc<LoxFunction<'a>>> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function =
                LoxFunction::new(Rc::clone(method), Rc::clone(&self.environment), is_initializer);

            method_table.insert(method.name.lexeme.to_string(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.to_string(), superclass_value, method_table);

        if let Some(enclosing) = enclosing {
            self.environment = enclosing;
        }

        self.environment
            .borrow_mut()
            .assign(name.lexeme, Value::Class(Rc::new(class)), name.line)?;

        Ok(Flow::Normal)
    }

    // ───────────────────────── expression evaluation ────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.lookup_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            name.lexeme,
                            value.clone(),
                            name.line,
                        )?;
                    }
                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(name.lexeme, value.clone(), name.line)?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(callee_value, args, paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let instance = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    _ => {
                        return Err(LoxError::runtime(
                            name.line,
                            "Only instances have fields.",
                        ));
                    }
                };

                let value = self.evaluate(value)?;
                instance.set(name, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.lookup_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    /// Binding-table driven variable access: resolved locals are read at
    /// their exact distance; everything else comes from `globals`.
    fn lookup_variable(&self, name: &Token<'a>, id: usize) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, name.lexeme, name.line)
            }
            None => self.globals.borrow().get(name.lexeme, name.line),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token<'a>, right: &Expr<'a>) -> Result<Value<'a>> {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            // Unary plus passes its operand through untouched.
            TokenType::PLUS => Ok(right_value),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator")),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr<'a>,
        operator: &Token<'a>,
        right: &Expr<'a>,
    ) -> Result<Value<'a>> {
        // The right operand is evaluated before the left — an observable
        // order when operands have side effects, and part of the language.
        let right_value = self.evaluate(right)?;
        let left_value = self.evaluate(left)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                // Any other operand combination quietly yields nil.
                _ => Ok(Value::Nil),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::SLASH => match (left_value, right_value) {
                // IEEE-754 division; x/0 is an infinity, not an error.
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_value, &right_value))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_value, &right_value))),

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be numbers.",
                )),
            },

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator")),
        }
    }

    /// `and`/`or` short-circuit and yield the operand value itself, not a
    /// coerced boolean.
    fn evaluate_logical(
        &mut self,
        left: &Expr<'a>,
        operator: &Token<'a>,
        right: &Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_value = self.evaluate(left)?;

        if operator.token_type == TokenType::OR {
            if is_truthy(&left_value) {
                return Ok(left_value);
            }
        } else if !is_truthy(&left_value) {
            return Ok(left_value);
        }

        self.evaluate(right)
    }

    /// Dispatch a call on whatever the callee evaluated to.  Arity is
    /// checked *before* the body runs for every callable shape.
    fn call_value(
        &mut self,
        callee: Value<'a>,
        arguments: Vec<Value<'a>>,
        paren: &Token<'a>,
    ) -> Result<Value<'a>> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                self.check_arity(arity, arguments.len(), paren)?;
                func(&arguments).map_err(|message| LoxError::runtime(paren.line, message))
            }

            Value::Function(function) => {
                self.check_arity(function.arity(), arguments.len(), paren)?;
                function.call(self, arguments)
            }

            Value::Class(class) => {
                self.check_arity(class.arity(), arguments.len(), paren)?;
                LoxClass::call(&class, self, arguments)
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    fn check_arity(&self, expected: usize, got: usize, paren: &Token<'a>) -> Result<()> {
        if got != expected {
            return Err(LoxError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", expected, got),
            ));
        }

        Ok(())
    }

    /// `super.method` — the search starts at the *superclass*, never at the
    /// receiver's runtime class, and the hit is bound to the current `this`.
    fn evaluate_super(
        &mut self,
        id: usize,
        keyword: &Token<'a>,
        method: &Token<'a>,
    ) -> Result<Value<'a>> {
        let distance: usize = *self.locals.get(&id).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Cannot use 'super' outside of a class.")
        })?;

        let superclass = match Environment::get_at(
            &self.environment,
            distance,
            "super",
            keyword.line,
        )? {
            Value::Class(class) => class,
            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Cannot use 'super' outside of a class.",
                ));
            }
        };

        // `this` lives one frame closer than `super`.
        let object = match Environment::get_at(
            &self.environment,
            distance - 1,
            "this",
            keyword.line,
        )? {
            Value::Instance(instance) => instance,
            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Cannot use 'super' outside of a class.",
                ));
            }
        };

        let found = superclass.find_method(method.lexeme).ok_or_else(|| {
            LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(found.bind(object))))
    }
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────── free helpers ─────────────────────────────

fn literal_value<'a>(literal: &LiteralValue) -> Value<'a> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// nil and `false` are falsy; every other value is truthy.
pub fn is_truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Value equality for numbers/strings/booleans/nil; reference identity for
/// instances, classes, and functions.  Mixed types are never equal.
fn is_equal<'a>(left: &Value<'a>, right: &Value<'a>) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Nil, Value::Nil) => true,
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}
