mod common;

use common::{run, run_err};
use rlox::error::LoxError;

#[test]
fn class_and_instance_display() {
    let output = run(
        "class Bagel {}
         print Bagel;
         print Bagel();",
    )
    .unwrap();

    assert_eq!(output, "Bagel\nBagel instance\n");
}

#[test]
fn fields_come_into_existence_on_first_assignment() {
    let output = run(
        "class Box {}
         var box = Box();
         box.contents = \"chocolate\";
         print box.contents;",
    )
    .unwrap();

    assert_eq!(output, "chocolate\n");
}

#[test]
fn set_expression_yields_the_assigned_value() {
    let output = run(
        "class Box {}
         var box = Box();
         print box.value = 7;",
    )
    .unwrap();

    assert_eq!(output, "7\n");
}

#[test]
fn reading_a_missing_property_fails() {
    let err = run_err(
        "class Box {}
         print Box().nothing;",
    );

    assert!(matches!(err, LoxError::Runtime { .. }));
    assert!(err.to_string().contains("Undefined property 'nothing'."));
}

#[test]
fn only_instances_have_properties() {
    let err = run_err("print (1).field;");
    assert!(err.to_string().contains("Only instances have properties."));

    let err = run_err("\"str\".field = 1;");
    assert!(err.to_string().contains("Only instances have fields."));
}

#[test]
fn methods_bind_this_to_the_receiver() {
    let output = run(
        "class Person {
           sayName() { print this.name; }
         }
         var jane = Person();
         jane.name = \"Jane\";
         jane.sayName();",
    )
    .unwrap();

    assert_eq!(output, "Jane\n");
}

#[test]
fn extracted_method_stays_bound_to_its_instance() {
    let output = run(
        "class Person {
           sayName() { print this.name; }
         }
         var jane = Person();
         jane.name = \"Jane\";
         var bill = Person();
         bill.name = \"Bill\";
         var method = jane.sayName;
         bill.sayName = method;
         bill.sayName();",
    )
    .unwrap();

    // The stored closure still carries Jane's `this`.
    assert_eq!(output, "Jane\n");
}

#[test]
fn fields_shadow_methods() {
    let output = run(
        "class Thing {
           describe() { print \"method\"; }
         }
         var t = Thing();
         fun replacement() { print \"field\"; }
         t.describe = replacement;
         t.describe();",
    )
    .unwrap();

    assert_eq!(output, "field\n");
}

#[test]
fn initializer_runs_on_construction() {
    let output = run(
        "class Point {
           init(x, y) {
             this.x = x;
             this.y = y;
           }
         }
         var p = Point(3, 4);
         print p.x;
         print p.y;",
    )
    .unwrap();

    assert_eq!(output, "3\n4\n");
}

#[test]
fn class_arity_follows_its_initializer() {
    let err = run_err(
        "class Point {
           init(x, y) {}
         }
         Point(1);",
    );

    assert!(err.to_string().contains("Expected 2 arguments but got 1."));
}

#[test]
fn constructor_yields_instance_despite_early_return() {
    let output = run(
        "class Maybe {
           init(flag) {
             if (flag) return;
             this.tag = \"late\";
           }
         }
         print Maybe(true);
         print Maybe(false).tag;",
    )
    .unwrap();

    assert_eq!(output, "Maybe instance\nlate\n");
}

#[test]
fn calling_init_directly_returns_this() {
    let output = run(
        "class Thing {
           init() { this.n = 1; }
         }
         var t = Thing();
         print t.init();",
    )
    .unwrap();

    assert_eq!(output, "Thing instance\n");
}

#[test]
fn methods_resolve_up_the_superclass_chain() {
    let output = run(
        "class Doughnut {
           cook() { print \"Fry until golden brown.\"; }
         }
         class BostonCream < Doughnut {}
         BostonCream().cook();",
    )
    .unwrap();

    assert_eq!(output, "Fry until golden brown.\n");
}

#[test]
fn subclass_override_wins_over_inherited_method() {
    let output = run(
        "class A { greet() { print \"A\"; } }
         class B < A { greet() { print \"B\"; } }
         B().greet();",
    )
    .unwrap();

    assert_eq!(output, "B\n");
}

#[test]
fn super_skips_the_receivers_own_override() {
    let output = run(
        "class A {
           greet() { return \"A\"; }
         }
         class B < A {
           greet() { return super.greet() + \"B\"; }
         }
         print B().greet();",
    )
    .unwrap();

    assert_eq!(output, "AB\n");
}

#[test]
fn super_binds_statically_not_to_runtime_class() {
    // From the inheritance chapter: C inherits B's test(), whose `super`
    // must still mean A's method even though the receiver is a C.
    let output = run(
        "class A {
           method() { print \"A method\"; }
         }
         class B < A {
           method() { print \"B method\"; }
           test() { super.method(); }
         }
         class C < B {}
         C().test();",
    )
    .unwrap();

    assert_eq!(output, "A method\n");
}

#[test]
fn initializers_chain_through_super() {
    let output = run(
        "class A {
           init() { print \"a\"; }
         }
         class B < A {
           init() { super.init(); print \"b\"; }
         }
         class C < B {
           init() { super.init(); print \"c\"; }
         }
         C();",
    )
    .unwrap();

    assert_eq!(output, "a\nb\nc\n");
}

#[test]
fn inherited_method_reads_the_receivers_fields() {
    let output = run(
        "class Base {
           describe() { print this.kind; }
         }
         class Derived < Base {
           init() { this.kind = \"derived\"; }
         }
         Derived().describe();",
    )
    .unwrap();

    assert_eq!(output, "derived\n");
}

#[test]
fn super_on_a_missing_method_fails() {
    let err = run_err(
        "class A {}
         class B < A {
           go() { super.missing(); }
         }
         B().go();",
    );

    assert!(err.to_string().contains("Undefined property 'missing'."));
}

#[test]
fn superclass_expression_must_evaluate_to_a_class() {
    let err = run_err(
        "var NotAClass = \"so not a class\";
         class Broken < NotAClass {}",
    );

    assert!(matches!(err, LoxError::Runtime { .. }));
    assert!(err.to_string().contains("Superclass must be a class."));
}

#[test]
fn class_can_reference_itself_in_methods() {
    let output = run(
        "class Counter {
           make() { return Counter(); }
         }
         print Counter().make();",
    )
    .unwrap();

    assert_eq!(output, "Counter instance\n");
}

#[test]
fn instance_equality_is_identity() {
    let output = run(
        "class Empty {}
         var a = Empty();
         var b = Empty();
         print a == a;
         print a == b;",
    )
    .unwrap();

    assert_eq!(output, "true\nfalse\n");
}
