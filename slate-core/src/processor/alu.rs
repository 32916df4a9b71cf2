use core::cmp::Ordering;

use slate::{TypeModifier, Word4};

use crate::error::{CoreError, CoreResult};

/// The five binary arithmetic operations
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum ArithOp {
    /// Wrapping addition
    Add,
    /// Wrapping subtraction
    Sub,
    /// Wrapping multiplication
    Mul,
    /// Zero-checked division
    Div,
    /// Zero-checked remainder
    Rem,
}

/// The three skip predicates
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum Comparison {
    /// A < B
    Lower,
    /// A > B
    Greater,
    /// A = B
    Equal,
}

/// Generates the arithmetic function for one integer width.  Overflow wraps
/// (two's complement for the signed word, so `i32::MIN / -1` wraps too);
/// division and remainder by zero are runtime errors.
macro_rules! integer_alu {
    ($name:ident, $ty:ty) => {
        /// Integer arithmetic through one type lens
        fn $name(op: ArithOp, lhs: $ty, rhs: $ty) -> CoreResult<$ty> {
            match op {
                ArithOp::Add => Ok(lhs.wrapping_add(rhs)),
                ArithOp::Sub => Ok(lhs.wrapping_sub(rhs)),
                ArithOp::Mul => Ok(lhs.wrapping_mul(rhs)),
                ArithOp::Div => {
                    if rhs == 0 {
                        Err(CoreError::Arithmetic("division by zero"))
                    } else {
                        Ok(lhs.wrapping_div(rhs))
                    }
                }
                ArithOp::Rem => {
                    if rhs == 0 {
                        Err(CoreError::Arithmetic("modulo by zero"))
                    } else {
                        Ok(lhs.wrapping_rem(rhs))
                    }
                }
            }
        }
    };
}

integer_alu!(byte, u8);
integer_alu!(word, u32);
integer_alu!(signed, i32);

/// Real arithmetic.  The remainder is the IEEE single-precision remainder;
/// real division and remainder by zero are runtime errors rather than
/// infinities.
fn real(op: ArithOp, lhs: f32, rhs: f32) -> CoreResult<f32> {
    match op {
        ArithOp::Add => Ok(lhs + rhs),
        ArithOp::Sub => Ok(lhs - rhs),
        ArithOp::Mul => Ok(lhs * rhs),
        ArithOp::Div => {
            if rhs == 0.0 {
                Err(CoreError::Arithmetic("division by zero"))
            } else {
                Ok(lhs / rhs)
            }
        }
        ArithOp::Rem => {
            if rhs == 0.0 {
                Err(CoreError::Arithmetic("modulo by zero"))
            } else {
                Ok(lhs % rhs)
            }
        }
    }
}

/// Applies one arithmetic operation through the chosen type lens.
///
/// Both operands are reinterpreted, never converted; the result is stored
/// back through the same lens, zero-extended for the byte type.
///
/// # Errors
///
/// Returns [`CoreError::Arithmetic`] on division or modulo by zero.
pub(super) fn apply(
    op: ArithOp,
    type_modifier: TypeModifier,
    lhs: Word4,
    rhs: Word4,
) -> CoreResult<Word4> {
    match type_modifier {
        TypeModifier::C => {
            byte(op, lhs.as_byte(), rhs.as_byte()).map(Word4::from)
        }
        TypeModifier::W => {
            word(op, lhs.as_word(), rhs.as_word()).map(Word4::from)
        }
        TypeModifier::SW => {
            signed(op, lhs.as_signed(), rhs.as_signed()).map(Word4::from)
        }
        TypeModifier::R => {
            real(op, lhs.as_real(), rhs.as_real()).map(Word4::from)
        }
    }
}

/// Evaluates one skip predicate through the chosen type lens.
///
/// Both registers are cast through the type before comparing, so `SKIPLO C`
/// compares low bytes unsigned while `SKIPLO SW` compares signed words.
/// Comparisons involving a real NaN are never taken.
pub(super) fn compare(
    comparison: Comparison,
    type_modifier: TypeModifier,
    lhs: Word4,
    rhs: Word4,
) -> bool {
    let ordering = match type_modifier {
        TypeModifier::C => lhs.as_byte().partial_cmp(&rhs.as_byte()),
        TypeModifier::W => lhs.as_word().partial_cmp(&rhs.as_word()),
        TypeModifier::SW => lhs.as_signed().partial_cmp(&rhs.as_signed()),
        TypeModifier::R => lhs.as_real().partial_cmp(&rhs.as_real()),
    };
    ordering.is_some_and(|ordering| match comparison {
        Comparison::Lower => ordering == Ordering::Less,
        Comparison::Greater => ordering == Ordering::Greater,
        Comparison::Equal => ordering == Ordering::Equal,
    })
}
