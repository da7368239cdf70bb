#[cfg(test)]
mod scanner_tests {
    use loxide::scanner::*;
    use loxide::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_class_keywords() {
        assert_token_sequence(
            "class Cruller < Doughnut { }",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Cruller"),
                (TokenType::LESS, "<"),
                (TokenType::IDENTIFIER, "Doughnut"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_this_super() {
        assert_token_sequence(
            "return super.cook(this);",
            &[
                (TokenType::RETURN, "return"),
                (TokenType::SUPER, "super"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "cook"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::THIS, "this"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literals() {
        let scanner = Scanner::new(b"\"hi\" 3.14 42".as_slice());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 4);

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hi"),
            other => panic!("Expected STRING, got {:?}", other),
        }

        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 3.14),
            ref other => panic!("Expected NUMBER, got {:?}", other),
        }

        match tokens[2].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 42.0),
            ref other => panic!("Expected NUMBER, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_05_line_comment() {
        assert_token_sequence(
            "a // the rest vanishes ({*\nb",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_block_comment() {
        // Inner stars and slashes must not terminate the comment early; only
        // the two-character "*/" does.
        assert_token_sequence(
            "a /* comment ** with * stars / and *x*  slashes */ b",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_07_block_comment_tracks_lines() {
        let scanner = Scanner::new(b"/* one\ntwo\nthree */ after".as_slice());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "after");
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_scanner_08_unterminated_block_comment() {
        let scanner = Scanner::new(b"a /* never closed *".as_slice());
        let results: Vec<_> = scanner.collect();

        let errors: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

        assert_eq!(errors.len(), 1);
        assert!(
            errors[0].to_string().contains("Unterminated block comment"),
            "Unexpected error: {}",
            errors[0]
        );
    }

    #[test]
    fn test_scanner_09_unexpected_chars() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }
    }
}
