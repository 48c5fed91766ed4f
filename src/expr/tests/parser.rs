// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    expr::{error::Reason, Expression, Operand, Relation},
    value::Tristate,
};

fn sym(name: &str) -> Box<Expression> {
    Box::new(Expression::symbol(name))
}

#[test]
fn precedence() {
    // `&&` binds tighter than `||`
    assert_eq!(
        Expression::parse("A || B && C").unwrap(),
        Expression::Or(sym("A"), Box::new(Expression::And(sym("B"), sym("C"))))
    );
    assert_eq!(
        Expression::parse("(A || B) && !C").unwrap(),
        Expression::And(
            Box::new(Expression::Or(sym("A"), sym("B"))),
            Box::new(Expression::Not(sym("C")))
        )
    );
}

#[test]
fn comparisons() {
    assert_eq!(
        Expression::parse("ARCH = \"arm\"").unwrap(),
        Expression::Compare(
            Relation::Eq,
            Operand::Symbol("ARCH".into()),
            Operand::Const("arm".into())
        )
    );
    assert_eq!(
        Expression::parse("FOO != y").unwrap(),
        Expression::Compare(Relation::Ne, Operand::Symbol("FOO".into()), Operand::Tristate(Tristate::Y))
    );
    assert_eq!(
        Expression::parse("m").unwrap(),
        Expression::Operand(Operand::Tristate(Tristate::M))
    );
}

#[test]
fn display_roundtrip() {
    for s in ["A && (B || C)", "!(A && B)", "A || B && C", "X >= 10 && !Y", "S = \"v\""] {
        let e = Expression::parse(s).unwrap();
        assert_eq!(e.to_string(), s);
        assert_eq!(Expression::parse(&e.to_string()).unwrap(), e);
    }
}

#[test]
fn errors() {
    macro_rules! test_err {
        ($text:expr, $span:expr, $reason:expr) => {
            let e = Expression::parse($text).unwrap_err();
            assert_eq!(e.reason, $reason, "{}", $text);
            assert_eq!(e.span, $span, "{}", $text);
        };
    }

    test_err!("", 0..0, Reason::Empty);
    test_err!("(A && B", 0..7, Reason::UnclosedParens);
    test_err!("A && B)", 6..7, Reason::UnopenedParens);
    test_err!("A B", 2..3, Reason::Unexpected(&["&&", "||"]));
    test_err!("A &&", 4..4, Reason::Unexpected(&["<symbol>", "!", "("]));
    test_err!("A = ", 3..3, Reason::Unexpected(&["<symbol>"]));
}

#[test]
fn error_display() {
    let e = Expression::parse("A B").unwrap_err();
    assert_eq!(e.to_string(), "expected one of `&&`, `||` at column 3 of `A B`");
    let e = Expression::parse("(A").unwrap_err();
    assert_eq!(e.to_string(), "unclosed `(` at column 1 of `(A`");
    let e = Expression::parse("A = ").unwrap_err();
    assert_eq!(e.to_string(), "expected `<symbol>` at column 4 of `A = `");
    assert_eq!(Expression::parse("").unwrap_err().to_string(), "empty expression");
}
