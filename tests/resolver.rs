#[cfg(test)]
mod resolver_tests {
    use loxide::error::LoxError;
    use loxide::parser::Parser;
    use loxide::resolver::{Locals, Resolver};
    use loxide::scanner::Scanner;
    use loxide::stmt::Stmt;
    use loxide::token::Token;

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("lex error in test source");

        Parser::new(tokens)
            .parse()
            .expect("parse error in test source")
    }

    fn resolve_errors(source: &str) -> Vec<LoxError> {
        let statements = parse(source);

        match Resolver::new().resolve(&statements) {
            Ok(_) => Vec::new(),
            Err(errors) => errors,
        }
    }

    fn assert_single_error(source: &str, expected_message: &str) {
        let errors = resolve_errors(source);

        assert_eq!(
            errors.len(),
            1,
            "expected exactly one static error, got: {:?}",
            errors
        );
        assert!(
            errors[0].to_string().contains(expected_message),
            "expected '{}' in '{}'",
            expected_message,
            errors[0]
        );
    }

    #[test]
    fn duplicate_declaration_in_same_scope() {
        assert_single_error(
            "{ var a = 1; var a = 2; }",
            "Already a variable with this name in this scope.",
        );
    }

    #[test]
    fn shadowing_across_scopes_is_legal() {
        let errors = resolve_errors("var a = 1; { var a = 2; { var a = 3; } }");

        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn read_in_own_initializer() {
        assert_single_error(
            "{ var a = a; }",
            "Can't read local variable in its own initializer.",
        );
    }

    #[test]
    fn return_at_top_level() {
        assert_single_error("return 1;", "Can't return from top-level code.");
    }

    #[test]
    fn return_value_from_initializer() {
        assert_single_error(
            "class Thing { init() { return 5; } }",
            "Can't return a value from an initializer.",
        );
    }

    #[test]
    fn bare_return_from_initializer_is_legal() {
        let errors = resolve_errors("class Thing { init() { return; } }");

        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn this_outside_class() {
        assert_single_error("print this;", "Can't use 'this' outside of a class.");
    }

    #[test]
    fn this_in_standalone_function() {
        assert_single_error(
            "fun alone() { return this; }",
            "Can't use 'this' outside of a class.",
        );
    }

    #[test]
    fn super_outside_class() {
        assert_single_error(
            "fun alone() { super.cook(); }",
            "Can't use 'super' outside of a class.",
        );
    }

    #[test]
    fn super_without_superclass() {
        assert_single_error(
            "class Orphan { method() { return super.method(); } }",
            "Can't use 'super' in a class with no superclass.",
        );
    }

    #[test]
    fn class_inheriting_from_itself() {
        assert_single_error("class Ouroboros < Ouroboros {}", "A class can't inherit from itself.");
    }

    #[test]
    fn errors_are_aggregated_not_fail_fast() {
        // One pass must surface every problem.
        let errors = resolve_errors("return 1; { var a; var a; } print this;");

        assert_eq!(errors.len(), 3, "expected three errors, got: {:?}", errors);
    }

    #[test]
    fn resolving_twice_yields_identical_side_table() {
        let source = r#"
            var a = "global";
            fun outer() {
                var b = a;
                fun inner(c) {
                    return b + c;
                }
                return inner;
            }
            class Pair < Object {
                init(x) { this.x = x; }
                sum(other) { return this.x + other.x; }
            }
        "#;

        let statements = parse(source);

        let first: Locals = Resolver::new()
            .resolve(&statements)
            .expect("resolve error in test source");
        let second: Locals = Resolver::new()
            .resolve(&statements)
            .expect("resolve error in test source");

        assert_eq!(first, second);
    }

    #[test]
    fn globals_are_not_in_the_side_table() {
        // Top-level names resolve by name at run time, so the table stays
        // empty for a program with no nested scopes.
        let statements = parse("var a = 1; var b = a; b = a + b;");

        let locals = Resolver::new()
            .resolve(&statements)
            .expect("resolve error in test source");

        assert!(locals.is_empty(), "unexpected entries: {:?}", locals);
    }

    #[test]
    fn locals_are_recorded() {
        let statements = parse("{ var a = 1; var b = a; }");

        let locals = Resolver::new()
            .resolve(&statements)
            .expect("resolve error in test source");

        // Exactly one occurrence (the read of `a`) lives in a local scope.
        assert_eq!(locals.len(), 1);
        assert!(locals.values().all(|&distance| distance == 0));
    }
}
