//! Operator semantics on runtime values
//!
//! Integer operands promote to the wider of the two kinds and wrap into
//! it. A float on either side makes the operation a float operation.
//! Comparisons and logic yield `U8` 0 or 1.

use super::RuntimeError;
use crate::object::Object;
use crate::span::Span;
use crate::token::TokenKind;
use crate::types::BaseType;
use std::cmp::Ordering;

/// Binary operator applied by a compound assignment
///
/// `None` for plain `=` and for `~=`, which stores the complement of the
/// right-hand side instead of combining it with the target.
pub(super) fn compound_base(op: TokenKind) -> Option<TokenKind> {
    Some(match op {
        TokenKind::PlusEqual => TokenKind::Plus,
        TokenKind::MinusEqual => TokenKind::Minus,
        TokenKind::StarEqual => TokenKind::Star,
        TokenKind::SlashEqual => TokenKind::Slash,
        TokenKind::PercentEqual => TokenKind::Percent,
        TokenKind::StarStarEqual => TokenKind::StarStar,
        TokenKind::AmpEqual => TokenKind::Ampersand,
        TokenKind::PipeEqual => TokenKind::Pipe,
        TokenKind::CaretEqual => TokenKind::Caret,
        TokenKind::LessLessEqual => TokenKind::LessLess,
        TokenKind::GreaterGreaterEqual => TokenKind::GreaterGreater,
        _ => return None,
    })
}

/// Apply a non-short-circuit binary operator
pub(super) fn binary(
    op: TokenKind,
    left: &Object,
    right: &Object,
    span: Span,
) -> Result<Object, RuntimeError> {
    let (left, right) = (left.inner(), right.inner());
    match op {
        TokenKind::EqualEqual => Ok(Object::boolean(equals(left, right))),
        TokenKind::BangEqual => Ok(Object::boolean(!equals(left, right))),
        TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual => {
            let ordering = compare(op, left, right, span)?;
            let result = match (op, ordering) {
                (_, None) => false,
                (TokenKind::Less, Some(ord)) => ord == Ordering::Less,
                (TokenKind::LessEqual, Some(ord)) => ord != Ordering::Greater,
                (TokenKind::Greater, Some(ord)) => ord == Ordering::Greater,
                (_, Some(ord)) => ord != Ordering::Less,
            };
            Ok(Object::boolean(result))
        }
        TokenKind::Plus
            if matches!(left, Object::String(_)) || matches!(right, Object::String(_)) =>
        {
            concat(left, right, span)
        }
        TokenKind::Plus
        | TokenKind::Minus
        | TokenKind::Star
        | TokenKind::Slash
        | TokenKind::Percent
        | TokenKind::StarStar => arithmetic(op, left, right, span),
        TokenKind::Ampersand
        | TokenKind::Pipe
        | TokenKind::Caret
        | TokenKind::LessLess
        | TokenKind::GreaterGreater => bitwise(op, left, right, span),
        _ => Err(RuntimeError::unsupported(
            format!("'{}' is not a binary operator", op.as_str()),
            span,
        )),
    }
}

/// Apply a prefix operator
pub(super) fn unary(op: TokenKind, operand: &Object, span: Span) -> Result<Object, RuntimeError> {
    let operand = operand.inner();
    match op {
        TokenKind::Bang => Ok(Object::boolean(!operand.is_truthy())),
        TokenKind::Minus => match operand {
            Object::Float(v) => Ok(Object::Float(-v)),
            int => match int.as_i128() {
                Some(v) if int.base_type().is_signed() => int_result(int.base_type(), -v, span),
                Some(v) => Ok(Object::I64(-v as i64)),
                None => Err(operand_error(op, operand, span)),
            },
        },
        TokenKind::Tilde => match operand.as_i128() {
            Some(v) => int_result(operand.base_type(), !v, span),
            None => Err(operand_error(op, operand, span)),
        },
        _ => Err(RuntimeError::unsupported(
            format!("'{}' is not a prefix operator", op.as_str()),
            span,
        )),
    }
}

fn equals(left: &Object, right: &Object) -> bool {
    if let (Some(l), Some(r)) = (left.as_i128(), right.as_i128()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l == r;
    }
    match (left, right) {
        (Object::String(l), Object::String(r)) => l == r,
        (
            Object::Array {
                segments: ls,
                items: li,
            },
            Object::Array {
                segments: rs,
                items: ri,
            },
        ) => ls == rs && li.iter().zip(ri).all(|(l, r)| equals(l.inner(), r.inner())),
        (Object::UserDefined { object_id: l }, Object::UserDefined { object_id: r }) => l == r,
        (Object::Nil, Object::Nil) => true,
        _ => false,
    }
}

/// Order two values; `None` when a float comparison is undefined
fn compare(
    op: TokenKind,
    left: &Object,
    right: &Object,
    span: Span,
) -> Result<Option<Ordering>, RuntimeError> {
    if let (Some(l), Some(r)) = (left.as_i128(), right.as_i128()) {
        return Ok(Some(l.cmp(&r)));
    }
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return Ok(l.partial_cmp(&r));
    }
    match (left, right) {
        (Object::String(l), Object::String(r)) => Ok(Some(l.cmp(r))),
        _ => Err(operands_error(op, left, right, span)),
    }
}

fn concat(left: &Object, right: &Object, span: Span) -> Result<Object, RuntimeError> {
    let displayable = |o: &Object| !matches!(o, Object::Array { .. } | Object::UserDefined { .. });
    if !displayable(left) || !displayable(right) {
        return Err(operands_error(TokenKind::Plus, left, right, span));
    }
    Ok(Object::String(format!("{}{}", left, right)))
}

fn arithmetic(
    op: TokenKind,
    left: &Object,
    right: &Object,
    span: Span,
) -> Result<Object, RuntimeError> {
    if let (Some(l), Some(r)) = (left.as_i128(), right.as_i128()) {
        let kind = promoted(left, right);
        let value = match op {
            TokenKind::Plus => l.wrapping_add(r),
            TokenKind::Minus => l.wrapping_sub(r),
            TokenKind::Star => l.wrapping_mul(r),
            TokenKind::Slash | TokenKind::Percent if r == 0 => {
                return Err(RuntimeError::DivideByZero { span })
            }
            TokenKind::Slash => l.wrapping_div(r),
            TokenKind::Percent => l.wrapping_rem(r),
            _ => {
                if r < 0 {
                    return Err(RuntimeError::type_error(
                        "Integer power with a negative exponent",
                        span,
                    ));
                }
                wrapping_pow(l, r as u128)
            }
        };
        return int_result(kind, value, span);
    }

    let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
        return Err(operands_error(op, left, right, span));
    };
    let value = match op {
        TokenKind::Plus => l + r,
        TokenKind::Minus => l - r,
        TokenKind::Star => l * r,
        TokenKind::Slash | TokenKind::Percent if r == 0.0 => {
            return Err(RuntimeError::DivideByZero { span })
        }
        TokenKind::Slash => l / r,
        TokenKind::Percent => l % r,
        _ => l.powf(r),
    };
    Ok(Object::Float(value))
}

fn bitwise(
    op: TokenKind,
    left: &Object,
    right: &Object,
    span: Span,
) -> Result<Object, RuntimeError> {
    let (Some(l), Some(r)) = (left.as_i128(), right.as_i128()) else {
        return Err(operands_error(op, left, right, span));
    };
    match op {
        TokenKind::Ampersand => int_result(promoted(left, right), l & r, span),
        TokenKind::Pipe => int_result(promoted(left, right), l | r, span),
        TokenKind::Caret => int_result(promoted(left, right), l ^ r, span),
        _ => {
            if r < 0 {
                return Err(RuntimeError::type_error("Negative shift amount", span));
            }
            // Shifts keep the kind of the shifted value
            let amount = r.min(127) as u32;
            let value = if op == TokenKind::LessLess {
                l.wrapping_shl(amount)
            } else {
                l >> amount
            };
            int_result(left.base_type(), value, span)
        }
    }
}

/// Kind two integer operands promote to
fn promoted(left: &Object, right: &Object) -> BaseType {
    left.base_type()
        .wider(right.base_type())
        .unwrap_or(BaseType::I64)
}

fn int_result(kind: BaseType, value: i128, span: Span) -> Result<Object, RuntimeError> {
    Object::from_int(kind, value)
        .ok_or_else(|| RuntimeError::type_error(format!("'{}' is not an integer kind", kind), span))
}

/// Square-and-multiply power, wrapping at 128 bits
fn wrapping_pow(mut base: i128, mut exp: u128) -> i128 {
    let mut acc: i128 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

fn operand_error(op: TokenKind, operand: &Object, span: Span) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "Cannot apply '{}' to a '{}' value",
            op.as_str(),
            operand.base_type()
        ),
        span,
    )
}

fn operands_error(op: TokenKind, left: &Object, right: &Object, span: Span) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "Cannot apply '{}' to '{}' and '{}'",
            op.as_str(),
            left.base_type(),
            right.base_type()
        ),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn apply(op: TokenKind, left: Object, right: Object) -> Result<Object, RuntimeError> {
        binary(op, &left, &right, Span::dummy())
    }

    #[rstest]
    #[case(TokenKind::Plus, Object::U8(250), Object::U8(10), Object::U8(4))]
    #[case(TokenKind::Plus, Object::U8(1), Object::I32(-3), Object::I32(-2))]
    #[case(TokenKind::Minus, Object::U16(0), Object::U16(1), Object::U16(u16::MAX))]
    #[case(TokenKind::Star, Object::I8(100), Object::I8(2), Object::I8(-56))]
    #[case(TokenKind::Slash, Object::I32(-7), Object::I32(2), Object::I32(-3))]
    #[case(TokenKind::Percent, Object::I32(-7), Object::I32(2), Object::I32(-1))]
    #[case(TokenKind::StarStar, Object::U32(2), Object::U8(10), Object::U32(1024))]
    #[case(TokenKind::Plus, Object::I64(1), Object::Float(0.5), Object::Float(1.5))]
    #[case(TokenKind::StarStar, Object::Float(2.0), Object::Float(3.0), Object::Float(8.0))]
    fn test_arithmetic(
        #[case] op: TokenKind,
        #[case] left: Object,
        #[case] right: Object,
        #[case] expected: Object,
    ) {
        assert_eq!(apply(op, left, right), Ok(expected));
    }

    #[rstest]
    #[case(TokenKind::Ampersand, Object::U8(0b1100), Object::U8(0b1010), Object::U8(0b1000))]
    #[case(TokenKind::Pipe, Object::U8(0b1100), Object::U8(0b1010), Object::U8(0b1110))]
    #[case(TokenKind::Caret, Object::U8(0b1100), Object::U8(0b1010), Object::U8(0b0110))]
    #[case(TokenKind::LessLess, Object::U8(1), Object::I32(9), Object::U8(0))]
    #[case(TokenKind::LessLess, Object::U16(1), Object::U8(9), Object::U16(512))]
    #[case(TokenKind::GreaterGreater, Object::I8(-8), Object::U8(1), Object::I8(-4))]
    fn test_bitwise(
        #[case] op: TokenKind,
        #[case] left: Object,
        #[case] right: Object,
        #[case] expected: Object,
    ) {
        assert_eq!(apply(op, left, right), Ok(expected));
    }

    #[rstest]
    #[case(TokenKind::EqualEqual, Object::U8(3), Object::I64(3), true)]
    #[case(TokenKind::EqualEqual, Object::U8(3), Object::Float(3.0), true)]
    #[case(TokenKind::BangEqual, Object::String("a".into()), Object::String("b".into()), true)]
    #[case(TokenKind::EqualEqual, Object::Nil, Object::U8(0), false)]
    #[case(TokenKind::Less, Object::I8(-1), Object::U64(0), true)]
    #[case(TokenKind::GreaterEqual, Object::Float(2.5), Object::U8(2), true)]
    #[case(TokenKind::Less, Object::String("abc".into()), Object::String("abd".into()), true)]
    #[case(TokenKind::Greater, Object::Float(f64::NAN), Object::Float(1.0), false)]
    fn test_comparisons_yield_u8(
        #[case] op: TokenKind,
        #[case] left: Object,
        #[case] right: Object,
        #[case] expected: bool,
    ) {
        assert_eq!(apply(op, left, right), Ok(Object::boolean(expected)));
    }

    #[test]
    fn test_string_concatenation() {
        let result = apply(TokenKind::Plus, Object::String("n=".into()), Object::U8(4));
        assert_eq!(result, Ok(Object::String("n=4".into())));
    }

    #[test]
    fn test_array_equality() {
        let array = |items: Vec<Object>| Object::Array {
            segments: vec![items.len() as u64],
            items,
        };
        let a = array(vec![Object::U8(1), Object::U8(2)]);
        let b = array(vec![Object::I32(1), Object::I32(2)]);
        assert_eq!(apply(TokenKind::EqualEqual, a, b), Ok(Object::boolean(true)));
    }

    #[rstest]
    #[case(TokenKind::Slash, Object::U8(1), Object::U8(0))]
    #[case(TokenKind::Percent, Object::I32(1), Object::I32(0))]
    #[case(TokenKind::Slash, Object::Float(1.0), Object::Float(0.0))]
    fn test_divide_by_zero(#[case] op: TokenKind, #[case] left: Object, #[case] right: Object) {
        assert!(matches!(
            apply(op, left, right),
            Err(RuntimeError::DivideByZero { .. })
        ));
    }

    #[test]
    fn test_type_errors() {
        let err = apply(TokenKind::Minus, Object::String("a".into()), Object::U8(1)).unwrap_err();
        assert_eq!(err.to_string(), "Type error: Cannot apply '-' to 'string' and 'u8'");
        assert!(apply(TokenKind::Ampersand, Object::Float(1.0), Object::U8(1)).is_err());
        assert!(apply(TokenKind::StarStar, Object::U8(2), Object::I8(-1)).is_err());
        assert!(apply(TokenKind::Less, Object::Nil, Object::U8(1)).is_err());
    }

    #[rstest]
    #[case(TokenKind::Minus, Object::I8(5), Object::I8(-5))]
    #[case(TokenKind::Minus, Object::U8(5), Object::I64(-5))]
    #[case(TokenKind::Minus, Object::Float(1.5), Object::Float(-1.5))]
    #[case(TokenKind::Tilde, Object::U8(5), Object::U8(250))]
    #[case(TokenKind::Tilde, Object::I16(0), Object::I16(-1))]
    #[case(TokenKind::Bang, Object::U8(0), Object::U8(1))]
    #[case(TokenKind::Bang, Object::String("x".into()), Object::U8(0))]
    fn test_unary(#[case] op: TokenKind, #[case] operand: Object, #[case] expected: Object) {
        assert_eq!(unary(op, &operand, Span::dummy()), Ok(expected));
    }

    #[test]
    fn test_compound_base() {
        assert_eq!(compound_base(TokenKind::PlusEqual), Some(TokenKind::Plus));
        assert_eq!(
            compound_base(TokenKind::GreaterGreaterEqual),
            Some(TokenKind::GreaterGreater)
        );
        assert_eq!(compound_base(TokenKind::Equal), None);
        assert_eq!(compound_base(TokenKind::TildeEqual), None);
    }
}
