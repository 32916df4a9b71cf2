use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char, digit1, satisfy},
    combinator::{map, map_res, opt, recognize, verify},
    error::VerboseError,
    sequence::{delimited, pair, tuple},
    IResult,
};

/// Result type shared by the token parsers
pub(crate) type TokenResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// A label identifier: `_` or an ASCII letter, then `_`, letters, and digits
pub(crate) fn identifier(input: &str) -> TokenResult<'_, &str> {
    recognize(pair(
        satisfy(|c| c == '_' || c.is_ascii_alphabetic()),
        take_while(|c: char| c == '_' || c.is_ascii_alphanumeric()),
    ))(input)
}

/// A character literal: one code point between single quotes, `'X'`
pub(crate) fn char_literal(input: &str) -> TokenResult<'_, char> {
    delimited(char('\''), anychar, char('\''))(input)
}

/// A parsed numeric literal, before the type modifier is applied
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum NumericLiteral {
    /// A `0b…`/`0x…` literal: a raw 32-bit pattern, whatever the type
    Bits(u32),
    /// A decimal integer, stored as its two's-complement word
    Integer(i64),
    /// A decimal real, meaningful only under the `R` modifier
    Real(f32),
}

/// `0b[01]+`, at most 32 digits
fn binary_literal(input: &str) -> TokenResult<'_, u32> {
    let digits = verify(
        take_while1(|c| c == '0' || c == '1'),
        |s: &str| s.len() <= 32,
    );
    map_res(pair(tag("0b"), digits), |(_, s): (&str, &str)| {
        u32::from_str_radix(s, 2)
    })(input)
}

/// `0x[0-9A-Fa-f]+`, at most 8 nibbles
fn hex_literal(input: &str) -> TokenResult<'_, u32> {
    let digits = verify(
        take_while1(|c: char| c.is_ascii_hexdigit()),
        |s: &str| s.len() <= 8,
    );
    map_res(pair(tag("0x"), digits), |(_, s): (&str, &str)| {
        u32::from_str_radix(s, 16)
    })(input)
}

/// `-?[0-9]+\.[0-9]+`
fn real_literal(input: &str) -> TokenResult<'_, f32> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
        str::parse::<f32>,
    )(input)
}

/// `-?[0-9]+`
fn integer_literal(input: &str) -> TokenResult<'_, i64> {
    map_res(
        recognize(pair(opt(char('-')), digit1)),
        str::parse::<i64>,
    )(input)
}

/// Any numeric literal.  The real form is tried before the integer form so
/// that `1.5` is not read as `1` with a stray tail.
pub(crate) fn numeric_literal(input: &str) -> TokenResult<'_, NumericLiteral> {
    alt((
        map(binary_literal, NumericLiteral::Bits),
        map(hex_literal, NumericLiteral::Bits),
        map(real_literal, NumericLiteral::Real),
        map(integer_literal, NumericLiteral::Integer),
    ))(input)
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;
    use nom::combinator::all_consuming;

    use super::*;

    #[test]
    fn check_identifier_parsing() {
        assert_eq!(identifier("_loop9:"), Ok((":", "_loop9")));
        assert_eq!(identifier("end"), Ok(("", "end")));
        assert!(identifier("9tail").is_err());
        assert!(identifier("&ref").is_err());
    }

    #[test]
    fn check_char_literal_parsing() {
        assert_eq!(char_literal("'A'"), Ok(("", 'A')));
        assert_eq!(char_literal("' '"), Ok(("", ' ')));
        assert!(char_literal("''").is_err());
        assert!(all_consuming(char_literal)("'ab'").is_err());
    }

    #[test]
    fn check_numeric_literal_parsing() {
        assert_eq!(
            numeric_literal("0b101"),
            Ok(("", NumericLiteral::Bits(5)))
        );
        assert_eq!(
            numeric_literal("0xFF"),
            Ok(("", NumericLiteral::Bits(255)))
        );
        assert_eq!(
            numeric_literal("-42"),
            Ok(("", NumericLiteral::Integer(-42)))
        );
        assert_eq!(
            numeric_literal("3.5"),
            Ok(("", NumericLiteral::Real(3.5)))
        );
        assert_eq!(
            numeric_literal("-0.5"),
            Ok(("", NumericLiteral::Real(-0.5)))
        );
    }

    #[test]
    fn oversized_literals_are_rejected() {
        let bits33 = format!("0b{}", "1".repeat(33));
        assert!(all_consuming(numeric_literal)(bits33.as_str()).is_err());
        assert!(all_consuming(numeric_literal)("0x123456789").is_err());
    }

    #[test]
    fn malformed_literals_are_rejected() {
        for input in ["0b12", "0xZZ", "1.", ".5", "--3", "12ab"] {
            assert!(
                all_consuming(numeric_literal)(input).is_err(),
                "{input} should not parse as a numeric literal"
            );
        }
    }
}
