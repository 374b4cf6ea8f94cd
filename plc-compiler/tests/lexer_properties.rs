//! Property-based tests for token offsets.
//!
//! Inputs mix unquoted code with well-formed character and string literals,
//! so every input lexes successfully and the properties only have to reason
//! about token spans. Literal bodies hold no whitespace.

use plc_compiler::{lex, TokenKind};
use proptest::prelude::*;

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-zA-Z0-9@_.+*/^<>=!&|(),;:\\[\\] \t\n-]{1,16}",
        1 => "'([a-zA-Z0-9_.,;\"]|\\\\[bnrt'\"\\\\])'",
        1 => "\"([a-zA-Z0-9_.,;']|\\\\[bnrt'\"\\\\]){0,8}\"",
    ]
}

fn well_formed_source() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..8).prop_map(|fragments| fragments.concat())
}

proptest! {
    #[test]
    fn tokens_reproduce_non_whitespace_input(source in well_formed_source()) {
        let tokens = lex(&source).expect("well-formed input always lexes");

        let joined: String = tokens.iter().map(|token| token.literal.as_str()).collect();
        let expected: String = source.chars().filter(|ch| !ch.is_whitespace()).collect();
        prop_assert_eq!(joined, expected);
    }

    #[test]
    fn token_indices_point_at_their_literals(source in well_formed_source()) {
        let chars: Vec<char> = source.chars().collect();
        let tokens = lex(&source).expect("well-formed input always lexes");

        let mut previous_end = 0;
        for token in &tokens {
            prop_assert!(token.index >= previous_end);
            let span: String = chars[token.index..token.end()].iter().collect();
            prop_assert_eq!(&span, &token.literal);
            previous_end = token.end();
        }
    }

    #[test]
    fn quoted_literals_lex_as_single_tokens(source in well_formed_source()) {
        for token in lex(&source).expect("well-formed input always lexes") {
            match token.literal.chars().next() {
                Some('\'') => prop_assert_eq!(token.kind, TokenKind::Character),
                Some('"') => prop_assert_eq!(token.kind, TokenKind::String),
                _ => prop_assert!(!matches!(token.kind, TokenKind::Character | TokenKind::String)),
            }
        }
    }

    #[test]
    fn integers_never_carry_leading_zeroes(source in "[0-9 -]{1,32}") {
        for token in lex(&source).expect("digits always lex") {
            if token.kind == TokenKind::Integer {
                let digits = token.literal.trim_start_matches('-');
                prop_assert!(digits == "0" || !digits.starts_with('0'), "token {:?}", token);
            }
        }
    }
}
