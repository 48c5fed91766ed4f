// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::expr::{
    error::Reason,
    lexer::{Lexer, Token},
};

macro_rules! test_lex {
    ($text:expr, [$($token:expr),* $(,)?]) => {
        let tokens: Vec<_> = Lexer::tokenize($text).unwrap().into_iter().map(|t| t.token).collect();
        assert_eq!(tokens, vec![$($token),*], "{}", $text);
    };
}

#[test]
fn words_and_operators() {
    test_lex!("FOO && !BAR", [Token::Word("FOO"), Token::And, Token::Not, Token::Word("BAR")]);
    test_lex!("(A||B)!=C", [
        Token::OpenParen,
        Token::Word("A"),
        Token::Or,
        Token::Word("B"),
        Token::CloseParen,
        Token::Ne,
        Token::Word("C"),
    ]);
    test_lex!("X <= 0x10 >= -1", [
        Token::Word("X"),
        Token::Le,
        Token::Word("0x10"),
        Token::Ge,
        Token::Word("-1"),
    ]);
    test_lex!("  ", []);
}

#[test]
fn quoted() {
    test_lex!(r#"default "a b" if FOO"#, [
        Token::Word("default"),
        Token::Str("a b".into()),
        Token::Word("if"),
        Token::Word("FOO"),
    ]);
    test_lex!(r#""say \"hi\"" 'single'"#, [
        Token::Str(r#"say "hi""#.into()),
        Token::Str("single".into()),
    ]);
}

#[test]
fn spans() {
    let tokens = Lexer::tokenize("A = \"x\"").unwrap();
    assert_eq!(tokens[0].span, 0..1);
    assert_eq!(tokens[1].span, 2..3);
    assert_eq!(tokens[2].span, 4..7);
}

#[test]
fn errors() {
    let e = Lexer::tokenize("FOO = \"bar").unwrap_err();
    assert_eq!(e.reason, Reason::UnclosedQuotes);
    assert_eq!(e.span, 6..10);

    let e = Lexer::tokenize("FOO & BAR").unwrap_err();
    assert_eq!(e.reason, Reason::InvalidCharacter);
    assert_eq!(e.span, 4..5);
}
