#[cfg(test)]
mod interpreter_tests {
    use loxide::interpreter::{InterpretError, Interpreter};
    use loxide::parser::Parser;
    use loxide::resolver::Resolver;
    use loxide::scanner::Scanner;
    use loxide::token::Token;
    use loxide::value::Value;

    /// Scan, parse, resolve and interpret `source` inside `interpreter`.
    fn run_in(interpreter: &mut Interpreter, source: &str) -> Result<(), InterpretError> {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("lex error in test source");

        let statements = Parser::new(tokens)
            .parse()
            .expect("parse error in test source");

        let locals = Resolver::new()
            .resolve(&statements)
            .expect("resolve error in test source");

        interpreter.interpret(&statements, locals)
    }

    /// Run `source` in a fresh interpreter, expecting success.
    fn run(source: &str) -> Interpreter {
        let mut interpreter = Interpreter::new();

        if let Err(e) = run_in(&mut interpreter, source) {
            panic!("unexpected runtime error: {}", e);
        }

        interpreter
    }

    /// Run `source` in a fresh interpreter, expecting a runtime error, and
    /// return its message.
    fn run_expect_error(source: &str) -> String {
        let mut interpreter = Interpreter::new();

        match run_in(&mut interpreter, source) {
            Ok(()) => panic!("expected a runtime error"),
            Err(InterpretError::Runtime { message, .. }) => message,
            Err(other) => panic!("expected a runtime error, got: {}", other),
        }
    }

    /// Fetch a global by name after a program ran.
    fn global(interpreter: &Interpreter, name: &str) -> Value {
        interpreter
            .globals()
            .borrow()
            .get(name)
            .unwrap_or_else(|e| panic!("global '{}': {}", name, e))
    }

    // ── variables, scoping, closures ───────────────────────────────────────

    #[test]
    fn closures_capture_by_reference() {
        let interpreter = run(
            "fun make() {
                 var n = 0;
                 fun inc() { n = n + 1; return n; }
                 return inc;
             }
             var f = make();
             var first = f();
             var second = f();",
        );

        assert_eq!(global(&interpreter, "first"), Value::Number(1.0));
        assert_eq!(global(&interpreter, "second"), Value::Number(2.0));
    }

    #[test]
    fn block_shadowing_leaves_outer_untouched() {
        let interpreter = run(
            "var x = \"outer\";
             var seen = nil;
             {
                 var x = \"inner\";
                 seen = x;
             }
             var after = x;",
        );

        assert_eq!(
            global(&interpreter, "seen"),
            Value::String("inner".to_string())
        );
        assert_eq!(
            global(&interpreter, "after"),
            Value::String("outer".to_string())
        );
    }

    #[test]
    fn closure_binds_lexically_not_dynamically() {
        // The resolver pins `a` in `show` to the global before the block
        // declares a shadowing local.
        let interpreter = run(
            "var a = \"global\";
             var r = nil;
             {
                 fun show() { return a; }
                 var a = \"block\";
                 r = show();
             }",
        );

        assert_eq!(
            global(&interpreter, "r"),
            Value::String("global".to_string())
        );
    }

    #[test]
    fn unassigned_and_undefined_are_distinct_errors() {
        let unassigned = run_expect_error("var x; var y = x;");
        assert_eq!(unassigned, "Unassigned variable 'x'.");

        let undefined = run_expect_error("var y = zzz;");
        assert_eq!(undefined, "Undefined variable 'zzz'.");
    }

    #[test]
    fn assignment_promotes_unassigned_variable() {
        let interpreter = run("var x; x = 9; var y = x;");

        assert_eq!(global(&interpreter, "y"), Value::Number(9.0));
    }

    #[test]
    fn assignment_never_creates_a_binding() {
        let message = run_expect_error("ghost = 5;");

        assert_eq!(message, "Undefined variable 'ghost'.");
    }

    #[test]
    fn environment_restored_after_runtime_error() {
        let mut interpreter = Interpreter::new();

        run_in(&mut interpreter, "var x = \"outer\";").expect("setup failed");

        let result = run_in(
            &mut interpreter,
            "{
                 var x = \"inner\";
                 boom();
             }",
        );
        assert!(result.is_err());

        // The failed block must not leak its frame; the next round still
        // sees the global `x`, and earlier effects persist.
        run_in(&mut interpreter, "var y = x;").expect("interpreter state corrupted");
        assert_eq!(
            global(&interpreter, "y"),
            Value::String("outer".to_string())
        );
    }

    // ── control flow ──────────────────────────────────────────────────────

    #[test]
    fn for_loop_desugars_and_runs() {
        let interpreter = run(
            "var sum = 0;
             for (var i = 1; i <= 5; i = i + 1) {
                 sum = sum + i;
             }",
        );

        assert_eq!(global(&interpreter, "sum"), Value::Number(15.0));
    }

    #[test]
    fn return_unwinds_through_blocks_and_loops() {
        let interpreter = run(
            "fun find() {
                 var i = 0;
                 while (true) {
                     { if (i > 2) return i; }
                     i = i + 1;
                 }
             }
             var found = find();",
        );

        assert_eq!(global(&interpreter, "found"), Value::Number(3.0));
    }

    #[test]
    fn function_without_return_yields_nil() {
        let interpreter = run("fun noop() {} var r = noop();");

        assert_eq!(global(&interpreter, "r"), Value::Nil);
    }

    // ── operators, truthiness, equality ───────────────────────────────────

    #[test]
    fn string_number_concatenation() {
        let interpreter = run(
            "var a = \"foo\" + 1;
             var b = 1 + \"foo\";
             var c = \"foo\" + \"bar\";
             var d = 2.5 + \"!\";",
        );

        assert_eq!(global(&interpreter, "a"), Value::String("foo1".to_string()));
        assert_eq!(global(&interpreter, "b"), Value::String("1foo".to_string()));
        assert_eq!(
            global(&interpreter, "c"),
            Value::String("foobar".to_string())
        );
        assert_eq!(global(&interpreter, "d"), Value::String("2.5!".to_string()));
    }

    #[test]
    fn adding_number_and_bool_is_a_type_error() {
        let message = run_expect_error("var x = 1 + true;");

        assert_eq!(message, "Operands must be two numbers or two strings.");
    }

    #[test]
    fn comparison_requires_numbers() {
        let message = run_expect_error("var x = \"a\" < \"b\";");

        assert_eq!(message, "Operands must be numbers.");
    }

    #[test]
    fn logical_operators_return_operand_values() {
        // Only nil and false are falsy: 0 is truthy, so `0 or "x"` is 0.
        let interpreter = run(
            "var a = 0 or \"x\";
             var b = nil or \"x\";
             var c = 0 and 1;
             var d = false and 2;
             var e = \"\" or \"fallback\";",
        );

        assert_eq!(global(&interpreter, "a"), Value::Number(0.0));
        assert_eq!(global(&interpreter, "b"), Value::String("x".to_string()));
        assert_eq!(global(&interpreter, "c"), Value::Number(1.0));
        assert_eq!(global(&interpreter, "d"), Value::Bool(false));
        assert_eq!(global(&interpreter, "e"), Value::String("".to_string()));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let interpreter = run(
            "var called = false;
             fun touch() { called = true; return true; }
             var r = false and touch();",
        );

        assert_eq!(global(&interpreter, "called"), Value::Bool(false));
        assert_eq!(global(&interpreter, "r"), Value::Bool(false));
    }

    #[test]
    fn value_equality_primitives_by_value_objects_by_identity() {
        let interpreter = run(
            "var nums = 1 == 1;
             var nils = nil == nil;
             var mixed = 1 == \"1\";
             fun f() {}
             var g = f;
             var same_fn = f == g;
             class C {}
             var a = C();
             var b = C();
             var same_instance = a == a;
             var different_instances = a == b;",
        );

        assert_eq!(global(&interpreter, "nums"), Value::Bool(true));
        assert_eq!(global(&interpreter, "nils"), Value::Bool(true));
        assert_eq!(global(&interpreter, "mixed"), Value::Bool(false));
        assert_eq!(global(&interpreter, "same_fn"), Value::Bool(true));
        assert_eq!(global(&interpreter, "same_instance"), Value::Bool(true));
        assert_eq!(
            global(&interpreter, "different_instances"),
            Value::Bool(false)
        );
    }

    #[test]
    fn unary_minus_requires_number() {
        let message = run_expect_error("var x = -\"muffin\";");

        assert_eq!(message, "Operand must be a number.");
    }

    // ── calls ─────────────────────────────────────────────────────────────

    #[test]
    fn calling_a_non_callable_fails() {
        let message = run_expect_error("var five = 5; five();");

        assert_eq!(message, "Can only call functions and classes.");
    }

    #[test]
    fn arity_is_checked() {
        let message = run_expect_error("fun one(a) {} one(1, 2);");

        assert_eq!(message, "Expected 1 arguments but got 2.");
    }

    #[test]
    fn native_clock_is_predefined() {
        let interpreter = run("var t = clock(); var numeric = t + 0;");

        match global(&interpreter, "numeric") {
            Value::Number(n) => assert!(n > 0.0),
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn host_seeded_natives_are_callable() {
        let mut interpreter = Interpreter::new();

        interpreter.define_native("answer", 0, |_args| Ok(Value::Number(42.0)));

        run_in(&mut interpreter, "var a = answer();").expect("native call failed");
        assert_eq!(global(&interpreter, "a"), Value::Number(42.0));
    }

    // ── classes, instances, inheritance ───────────────────────────────────

    #[test]
    fn constructor_protocol() {
        let interpreter = run(
            "class C { init(v) { this.v = v; } }
             var c = C(5);
             var v = c.v;
             // Calling init directly re-runs it and still yields this.
             var again = c.init(7);
             var same = again == c;
             var v2 = c.v;",
        );

        assert_eq!(global(&interpreter, "v"), Value::Number(5.0));
        assert_eq!(global(&interpreter, "same"), Value::Bool(true));
        assert_eq!(global(&interpreter, "v2"), Value::Number(7.0));
    }

    #[test]
    fn initializer_with_bare_return_still_yields_instance() {
        let interpreter = run(
            "class D { init() { return; } }
             var d = D();
             var is_nil = d == nil;",
        );

        assert_eq!(global(&interpreter, "is_nil"), Value::Bool(false));

        match global(&interpreter, "d") {
            Value::Instance(_) => {}
            other => panic!("expected an instance, got {:?}", other),
        }
    }

    #[test]
    fn class_arity_follows_init() {
        let message = run_expect_error("class C { init(a, b) {} } C(1);");

        assert_eq!(message, "Expected 2 arguments but got 1.");
    }

    #[test]
    fn fields_shadow_methods() {
        let interpreter = run(
            "class Box { label() { return \"method\"; } }
             var box = Box();
             box.label = \"field\";
             var l = box.label;",
        );

        assert_eq!(
            global(&interpreter, "l"),
            Value::String("field".to_string())
        );
    }

    #[test]
    fn set_expression_yields_assigned_value() {
        let interpreter = run(
            "class Bag {}
             var bag = Bag();
             var r = bag.thing = 3;",
        );

        assert_eq!(global(&interpreter, "r"), Value::Number(3.0));
    }

    #[test]
    fn undefined_property_fails() {
        let message = run_expect_error("class Empty {} var e = Empty(); e.missing;");

        assert_eq!(message, "Undefined property 'missing'.");
    }

    #[test]
    fn property_access_on_non_instance_fails() {
        let message = run_expect_error("var n = 7; n.x;");

        assert_eq!(message, "Only instances have properties.");
    }

    #[test]
    fn methods_bind_this_on_access() {
        let interpreter = run(
            "class Cake {
                 flavor() { return this.kind; }
             }
             var cake = Cake();
             cake.kind = \"chocolate\";
             var m = cake.flavor;
             var got = m();",
        );

        assert_eq!(
            global(&interpreter, "got"),
            Value::String("chocolate".to_string())
        );
    }

    #[test]
    fn inherited_method_dispatch_prefers_override() {
        let interpreter = run(
            "class A { method() { return \"A\"; } }
             class B < A { method() { return \"B\"; } }
             var got = B().method();",
        );

        assert_eq!(global(&interpreter, "got"), Value::String("B".to_string()));
    }

    #[test]
    fn super_skips_the_override() {
        let interpreter = run(
            "class A { method() { return \"A method\"; } }
             class B < A {
                 method() { return \"B method\"; }
                 test() { return super.method(); }
             }
             class C < B {}
             var got = C().test();",
        );

        assert_eq!(
            global(&interpreter, "got"),
            Value::String("A method".to_string())
        );
    }

    #[test]
    fn inherited_initializer_runs_for_subclass() {
        let interpreter = run(
            "class Base { init() { this.tag = \"base\"; } }
             class Derived < Base {}
             var d = Derived();
             var tag = d.tag;",
        );

        assert_eq!(
            global(&interpreter, "tag"),
            Value::String("base".to_string())
        );
    }

    #[test]
    fn superclass_must_be_a_class() {
        let message = run_expect_error("var NotAClass = \"so close\"; class Sub < NotAClass {}");

        assert_eq!(message, "Superclass must be a class.");
    }

    #[test]
    fn methods_can_refer_to_their_class_by_name() {
        let interpreter = run(
            "class Counter {
                 make() { return Counter(); }
             }
             var other = Counter().make();
             var is_nil = other == nil;",
        );

        assert_eq!(global(&interpreter, "is_nil"), Value::Bool(false));
    }

    // ── static members ────────────────────────────────────────────────────

    #[test]
    fn static_methods_are_called_on_the_class() {
        let interpreter = run(
            "class Math {
                 class square(n) { return n * n; }
             }
             var nine = Math.square(3);",
        );

        assert_eq!(global(&interpreter, "nine"), Value::Number(9.0));
    }

    #[test]
    fn static_members_live_beside_instance_methods() {
        let interpreter = run(
            "class Math {
                 class square(n) { return n * n; }
                 double(n) { return n + n; }
             }
             var four = Math.square(2);
             var six = Math().double(3);",
        );

        assert_eq!(global(&interpreter, "four"), Value::Number(4.0));
        assert_eq!(global(&interpreter, "six"), Value::Number(6.0));
    }

    #[test]
    fn static_fields_can_be_set_and_read() {
        let interpreter = run(
            "class Math {
                 class square(n) { return n * n; }
             }
             Math.tau = 6.28;
             var t = Math.tau;",
        );

        assert_eq!(global(&interpreter, "t"), Value::Number(6.28));
    }

    #[test]
    fn undefined_static_property_fails() {
        let message = run_expect_error(
            "class Math { class square(n) { return n * n; } } Math.missing;",
        );

        assert_eq!(message, "Undefined property 'missing'.");
    }

    // ── stringification ───────────────────────────────────────────────────

    #[test]
    fn value_display_matches_print_output() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Number(2.0).to_string(), "2");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::String("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn class_and_instance_display() {
        let interpreter = run("class Bagel {} var b = Bagel();");

        assert_eq!(global(&interpreter, "Bagel").to_string(), "Bagel");
        assert_eq!(global(&interpreter, "b").to_string(), "Bagel instance");
    }

    // ── error/effect boundary ─────────────────────────────────────────────

    #[test]
    fn effects_before_a_runtime_error_persist() {
        let mut interpreter = Interpreter::new();

        let result = run_in(&mut interpreter, "var done = \"yes\"; boom(); var never = 1;");
        assert!(result.is_err());

        assert_eq!(
            global(&interpreter, "done"),
            Value::String("yes".to_string())
        );
        assert!(interpreter.globals().borrow().get("never").is_err());
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        let interpreter = run("var q = 1 / 0; var neg = -1 / 0;");

        match global(&interpreter, "q") {
            Value::Number(n) => assert!(n.is_infinite() && n > 0.0),
            other => panic!("expected a number, got {:?}", other),
        }

        match global(&interpreter, "neg") {
            Value::Number(n) => assert!(n.is_infinite() && n < 0.0),
            other => panic!("expected a number, got {:?}", other),
        }
    }
}
