mod common;

use common::{run, run_err, run_partial};
use rlox::error::LoxError;

#[test]
fn prints_literals_and_arithmetic() {
    let output = run("print 1 + 2 * 3; print \"hi\"; print true; print nil;").unwrap();
    assert_eq!(output, "7\nhi\ntrue\nnil\n");
}

#[test]
fn shadowing_binds_to_innermost_declaration() {
    let output = run(
        "var x = 1;
         {
           var x = 2;
           print x;
         }
         print x;",
    )
    .unwrap();

    assert_eq!(output, "2\n1\n");
}

#[test]
fn reference_in_loop_body_binds_to_same_declaration_every_iteration() {
    // The binding distance is lexical: re-running the block must not
    // rebind the inner reference.
    let output = run(
        "var i = 0;
         while (i < 3) {
           var x = i;
           print x;
           i = i + 1;
         }",
    )
    .unwrap();

    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn closure_retains_defining_scope_after_outer_function_returns() {
    let output = run(
        "fun makeCounter() {
           var count = 0;
           fun increment() {
             count = count + 1;
             print count;
           }
           return increment;
         }
         var counter = makeCounter();
         counter();
         counter();",
    )
    .unwrap();

    assert_eq!(output, "1\n2\n");
}

#[test]
fn two_closures_share_one_captured_environment() {
    let output = run(
        "fun makePair() {
           var value = 0;
           fun set(v) { value = v; }
           fun get() { print value; }
           set(41);
           get();
           set(42);
           get();
         }
         makePair();",
    )
    .unwrap();

    assert_eq!(output, "41\n42\n");
}

#[test]
fn closure_captures_frame_not_snapshot() {
    // The classic trap from the resolver chapter: the reference inside
    // the closure must keep pointing at the global, even after a local
    // with the same name appears later in the block.
    let output = run(
        "var a = \"global\";
         {
           fun show() { print a; }
           show();
           var a = \"block\";
           show();
         }",
    )
    .unwrap();

    assert_eq!(output, "global\nglobal\n");
}

#[test]
fn named_function_can_recurse() {
    let output = run(
        "fun fib(n) {
           if (n < 2) return n;
           return fib(n - 1) + fib(n - 2);
         }
         print fib(10);",
    )
    .unwrap();

    assert_eq!(output, "55\n");
}

#[test]
fn for_loop_desugars_and_runs() {
    let output = run("for (var i = 0; i < 3; i = i + 1) print i;").unwrap();
    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn if_else_follows_truthiness() {
    let output = run(
        "if (nil) print \"a\"; else print \"b\";
         if (0) print \"zero is truthy\";
         if (\"\") print \"empty string is truthy\";",
    )
    .unwrap();

    assert_eq!(output, "b\nzero is truthy\nempty string is truthy\n");
}

#[test]
fn logical_operators_return_operand_values() {
    let output = run(
        "print \"hi\" or 2;
         print nil or \"yes\";
         print nil and 1;
         print 1 and 2;",
    )
    .unwrap();

    assert_eq!(output, "hi\nyes\nnil\n2\n");
}

#[test]
fn logical_operators_short_circuit() {
    let output = run(
        "fun loud(v) { print v; return v; }
         var a = loud(false) and loud(\"skipped\");
         var b = loud(true) or loud(\"also skipped\");",
    )
    .unwrap();

    assert_eq!(output, "false\ntrue\n");
}

#[test]
fn plus_concatenates_strings_and_adds_numbers() {
    let output = run("print 1 + 2; print \"a\" + \"b\";").unwrap();
    assert_eq!(output, "3\nab\n");
}

#[test]
fn plus_on_mixed_operands_yields_nil() {
    let output = run("print 1 + \"a\"; print nil + 2; print true + false;").unwrap();
    assert_eq!(output, "nil\nnil\nnil\n");
}

#[test]
fn binary_right_operand_evaluates_before_left() {
    let output = run(
        "fun loud(label, v) { print label; return v; }
         var sum = loud(\"left\", 1) + loud(\"right\", 2);
         print sum;",
    )
    .unwrap();

    assert_eq!(output, "right\nleft\n3\n");
}

#[test]
fn unary_operators() {
    let output = run("print -3; print !nil; print !0; print +5;").unwrap();
    assert_eq!(output, "-3\ntrue\nfalse\n5\n");
}

#[test]
fn unary_minus_requires_a_number() {
    let err = run_err("print -\"muffin\";");
    assert!(matches!(err, LoxError::Runtime { .. }));
    assert!(err.to_string().contains("Operand must be a number."));
}

#[test]
fn comparison_requires_numbers() {
    let err = run_err("print \"a\" < \"b\";");
    assert!(matches!(err, LoxError::Runtime { .. }));
    assert!(err.to_string().contains("Operands must be numbers."));
}

#[test]
fn equality_on_values() {
    let output = run(
        "print 1 == 1;
         print 1 == 2;
         print \"a\" == \"a\";
         print nil == nil;
         print 1 == \"1\";
         print true != false;",
    )
    .unwrap();

    assert_eq!(output, "true\nfalse\ntrue\ntrue\nfalse\ntrue\n");
}

#[test]
fn function_and_class_equality_is_identity() {
    let output = run(
        "fun f() {}
         fun g() {}
         var h = f;
         print f == f;
         print f == h;
         print f == g;
         class A {}
         var B = A;
         print A == B;",
    )
    .unwrap();

    assert_eq!(output, "true\ntrue\nfalse\ntrue\n");
}

#[test]
fn division_by_zero_is_ieee_infinity() {
    let output = run("print 1 / 0;").unwrap();
    assert_eq!(output, "inf\n");
}

#[test]
fn arity_mismatch_rejected_before_body_runs() {
    let (output, err) = run_partial(
        "fun f(a, b) { print \"entered\"; }
         f(1, 2, 3);",
    );

    // No partial execution of the body.
    assert_eq!(output, "");
    assert!(err.to_string().contains("Expected 2 arguments but got 3."));
}

#[test]
fn calling_a_non_callable_fails() {
    let err = run_err("var x = 1; x();");
    assert!(err
        .to_string()
        .contains("Can only call functions and classes."));
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    let err = run_err("print missing;");
    assert!(matches!(err, LoxError::Runtime { .. }));
    assert!(err.to_string().contains("Undefined variable 'missing'."));
}

#[test]
fn assignment_to_undeclared_variable_fails() {
    let err = run_err("ghost = 1;");
    assert!(err.to_string().contains("Undefined variable 'ghost'."));
}

#[test]
fn assignment_is_an_expression_yielding_the_value() {
    let output = run("var a = 1; print a = 2; print a;").unwrap();
    assert_eq!(output, "2\n2\n");
}

#[test]
fn return_without_value_yields_nil() {
    let output = run("fun f() { return; } print f();").unwrap();
    assert_eq!(output, "nil\n");
}

#[test]
fn return_unwinds_out_of_nested_blocks_and_loops() {
    let output = run(
        "fun firstOverTen() {
           var n = 0;
           while (true) {
             {
               if (n > 10) return n;
             }
             n = n + 3;
           }
         }
         print firstOverTen();",
    )
    .unwrap();

    assert_eq!(output, "12\n");
}

#[test]
fn output_printed_before_a_runtime_error_is_kept() {
    let (output, err) = run_partial("print \"before\"; print -\"boom\"; print \"after\";");

    assert_eq!(output, "before\n");
    assert!(matches!(err, LoxError::Runtime { .. }));
}

#[test]
fn overdeep_frame_distance_is_an_error_not_a_panic() {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rlox::environment::Environment;
    use rlox::value::Value;

    let globals = Rc::new(RefCell::new(Environment::new()));
    globals.borrow_mut().define("x", Value::Number(1.0));

    let child = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
        &globals,
    ))));

    // Distances deeper than the chain come back as undefined-variable
    // errors, even though no well-resolved program produces them.
    let err = Environment::get_at(&child, 5, "x", 3).unwrap_err();
    assert!(err.to_string().contains("Undefined variable 'x'."));

    let err = Environment::assign_at(&child, 5, "x", Value::Number(2.0), 3).unwrap_err();
    assert!(err.to_string().contains("Undefined variable 'x'."));

    // Exact distances still reach the right frame.
    let value = Environment::get_at(&child, 1, "x", 3).unwrap();
    assert_eq!(value.to_string(), "1");
}

#[test]
fn clock_native_is_callable() {
    let output = run("print clock() >= 0;").unwrap();
    assert_eq!(output, "true\n");
}

#[test]
fn function_values_print_their_name() {
    let output = run("fun f() {} print f; print clock;").unwrap();
    assert_eq!(output, "<fn f>\n<native fn clock>\n");
}
