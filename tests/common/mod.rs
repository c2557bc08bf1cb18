//! Shared harness for the end-to-end tests: runs a source string through
//! the full scan → parse → resolve → interpret pipeline and captures
//! everything the program printed.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use rlox::error::{LoxError, Result};
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;
use rlox::token::Token;

/// A cloneable in-memory sink so the test can read what the interpreter
/// wrote after the run finishes.
#[derive(Clone, Default)]
pub struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl SharedSink {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("print output is valid UTF-8")
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `source` as a full program and return its print output.
pub fn run(source: &str) -> Result<String> {
    let tokens: Vec<Token<'_>> = Scanner::new(source).collect::<Result<Vec<_>>>()?;

    let mut parser = Parser::new(&tokens);
    let statements = parser.parse()?;

    let sink = SharedSink::default();
    let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));

    {
        let mut resolver = Resolver::new(&mut interpreter);
        resolver.resolve(&statements)?;
    }

    interpreter.interpret(&statements)?;

    Ok(sink.contents())
}

/// Run `source` expecting a failure; panics if the program succeeds.
pub fn run_err(source: &str) -> LoxError {
    match run(source) {
        Ok(output) => panic!(
            "expected an error but program succeeded with output: {:?}",
            output
        ),
        Err(e) => e,
    }
}

/// Run `source` expecting a failure, returning the output printed before
/// the failure alongside the error.
pub fn run_partial(source: &str) -> (String, LoxError) {
    let tokens: Vec<Token<'_>> = Scanner::new(source)
        .collect::<Result<Vec<_>>>()
        .expect("source lexes cleanly");

    let mut parser = Parser::new(&tokens);
    let statements = parser.parse().expect("source parses cleanly");

    let sink = SharedSink::default();
    let mut interpreter = Interpreter::with_output(Box::new(sink.clone()));

    {
        let mut resolver = Resolver::new(&mut interpreter);
        resolver.resolve(&statements).expect("source resolves cleanly");
    }

    let err = interpreter
        .interpret(&statements)
        .expect_err("expected a runtime error");

    (sink.contents(), err)
}
