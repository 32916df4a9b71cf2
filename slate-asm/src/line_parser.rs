use nom::combinator::all_consuming;
use slate::{
    properties, ArgModifier, Instruction, Opcode, TypeModifier, Word4,
};

use crate::{
    diagnostics::Diagnostic,
    primitives::{char_literal, identifier, numeric_literal, NumericLiteral},
};

/// The parsed content of one non-empty source line.
///
/// Every line yields exactly one instruction; a line holding only a label
/// yields the default data-slot instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParsedLine {
    /// Label defined on this line, as written in the source
    pub label: Option<String>,
    /// The instruction, complete except for an unresolved label operand
    pub instruction: Instruction,
    /// Label referenced as the operand, resolved in pass two
    pub label_ref: Option<String>,
    /// 1-based physical source line
    pub line: u32,
}

/// The operand position of a line: either a finished value or a label
/// reference for pass two
enum Operand {
    /// An immediate value, already encoded
    Value(Word4),
    /// A reference to a label, as written
    Label(String),
}

/// Splits a line into whitespace separated tokens, keeping a single-quoted
/// character (including a quoted space) as one token
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = line;
    loop {
        rest = rest.trim_start_matches([' ', '\t']);
        if rest.is_empty() {
            break;
        }
        let length = if rest.starts_with('\'') {
            let mut chars = rest.char_indices().skip(1);
            match (chars.next(), chars.next()) {
                (Some(_), Some((index, c))) => index + c.len_utf8(),
                _ => rest.len(),
            }
        } else {
            rest.find([' ', '\t']).unwrap_or(rest.len())
        };
        let (token, tail) = rest.split_at(length);
        tokens.push(token);
        rest = tail;
    }
    tokens
}

/// The type modifier encoded when the source omits one: `SW` where the
/// opcode allows it, otherwise `W`
fn default_type(opcode: Opcode) -> TypeModifier {
    if properties(opcode).allows_type(TypeModifier::SW) {
        TypeModifier::SW
    } else {
        TypeModifier::W
    }
}

/// Wraps a parsed integer into the 32-bit word, negatives as two's
/// complement
fn integer_word(value: i64) -> Word4 {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "integers wrap into the 32-bit word, negatives as two's \
                  complement"
    )]
    let word = value as u32;
    Word4::from(word)
}

/// Reads the operand token under the already chosen type modifier.
///
/// Binary and hex literals are raw bit patterns whatever the type.  A real
/// literal denotes a real only under `R`; under the integer lenses integer
/// parsing applies, which reads the digits before the point and drops the
/// fraction.
fn parse_operand(
    token: &str,
    type_modifier: TypeModifier,
    line: u32,
    text: &str,
) -> Result<Operand, Diagnostic> {
    if let Ok((_, c)) = all_consuming(char_literal)(token) {
        return Ok(Operand::Value(Word4::from(c as u32)));
    }
    if all_consuming(identifier)(token).is_ok() {
        return Ok(Operand::Label(token.to_owned()));
    }
    match all_consuming(numeric_literal)(token) {
        Ok((_, NumericLiteral::Bits(bits))) => {
            Ok(Operand::Value(Word4::from(bits)))
        }
        Ok((_, NumericLiteral::Real(value))) => {
            if matches!(type_modifier, TypeModifier::R) {
                Ok(Operand::Value(Word4::from(value)))
            } else {
                let prefix = token.split('.').next().unwrap_or_default();
                match prefix.parse::<i64>() {
                    Ok(integer) => Ok(Operand::Value(integer_word(integer))),
                    Err(_) => Err(Diagnostic::syntax(
                        line,
                        format!("Invalid instruction: {text}"),
                    )),
                }
            }
        }
        Ok((_, NumericLiteral::Integer(value))) => {
            if matches!(type_modifier, TypeModifier::R) {
                // Under R an integer literal still denotes a real value
                #[allow(
                    clippy::cast_precision_loss,
                    reason = "R literals round like any other real input"
                )]
                let real = value as f32;
                Ok(Operand::Value(Word4::from(real)))
            } else {
                Ok(Operand::Value(integer_word(value)))
            }
        }
        Err(_) => Err(Diagnostic::syntax(
            line,
            format!("Invalid instruction: {text}"),
        )),
    }
}

/// Parses one comment-stripped, trimmed, non-empty source line.
///
/// Layout is positional: `[label:] [opcode] [type] [arg] [operand]`, any
/// prefix may be absent.  Keywords, sigils and label names compare
/// case-insensitively.
pub(crate) fn parse_line(
    text: &str,
    line: u32,
) -> Result<ParsedLine, Diagnostic> {
    let mut tokens = tokenize(text).into_iter().peekable();

    let mut label = None;
    if let Some(&token) = tokens.peek() {
        if let Some(name) = token.strip_suffix(':') {
            if all_consuming(identifier)(name).is_err() {
                return Err(Diagnostic::syntax(
                    line,
                    format!("Invalid label name: {name}"),
                ));
            }
            label = Some(name.to_owned());
            tokens.next();
        }
    }

    let mut instruction = Instruction::default();
    if let Some(&token) = tokens.peek() {
        if let Some(opcode) = Opcode::from_name(token) {
            instruction.opcode = opcode;
            tokens.next();
        }
    }
    let props = properties(instruction.opcode);

    let mut explicit_type = None;
    if let Some(&token) = tokens.peek() {
        if let Some(type_modifier) = TypeModifier::from_name(token) {
            if !props.allows_type(type_modifier) {
                return Err(Diagnostic::semantic(
                    line,
                    format!(
                        "Modifier {token} cannot be used with {}",
                        instruction.opcode
                    ),
                ));
            }
            explicit_type = Some(type_modifier);
            tokens.next();
        }
    }
    instruction.type_modifier =
        explicit_type.unwrap_or_else(|| default_type(instruction.opcode));

    if let Some(&token) = tokens.peek() {
        if let Some(arg_modifier) = ArgModifier::from_sigil(token) {
            if !props.allows_arg_modifier(arg_modifier) {
                return Err(Diagnostic::semantic(
                    line,
                    format!(
                        "Modifier {token} cannot be used with {}",
                        instruction.opcode
                    ),
                ));
            }
            instruction.arg_modifier = arg_modifier;
            tokens.next();
        }
    }

    let mut label_ref = None;
    let mut has_operand = false;
    if props.argument_available {
        if let Some(&token) = tokens.peek() {
            match parse_operand(token, instruction.type_modifier, line, text)?
            {
                Operand::Value(value) => instruction.argument = value,
                Operand::Label(name) => label_ref = Some(name),
            }
            has_operand = true;
            tokens.next();
        }
    }

    if props.argument_required && !has_operand {
        return Err(Diagnostic::semantic(
            line,
            format!("{} requires an argument", instruction.opcode),
        ));
    }

    if tokens.next().is_some() {
        return Err(Diagnostic::syntax(
            line,
            format!("Invalid instruction: {text}"),
        ));
    }

    Ok(ParsedLine {
        label,
        instruction,
        label_ref,
        line,
    })
}
