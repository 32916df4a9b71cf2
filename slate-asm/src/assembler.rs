use std::collections::HashMap;

use slate::{
    Address, Instruction, SourceToAddressMap, Word4, INSTRUCTION_SIZE,
    MEMORY_SIZE,
};

use crate::{
    diagnostics::{CompileError, Diagnostic},
    line_parser::{parse_line, ParsedLine},
};

/// Everything pass one knows about a source text
struct ParsedSource {
    /// One entry per emitted instruction slot, in address order
    instructions: Vec<ParsedLine>,
    /// Upper-cased label name to the address it marks
    labels: HashMap<String, Address>,
    /// Diagnostics collected while parsing
    diagnostics: Vec<Diagnostic>,
}

/// Strips a `//` comment, leaving the code portion of the line
fn strip_comment(line: &str) -> &str {
    line.find("//").map_or(line, |position| {
        line.get(..position).unwrap_or_default()
    })
}

/// Pass one: tokenize and validate every line, assign sequential addresses,
/// and record label definitions.
///
/// A line that fails to parse still occupies its address slot so that later
/// lines keep their addresses and all diagnostics can be reported at once.
fn parse_source(source: &str) -> ParsedSource {
    let mut instructions: Vec<ParsedLine> = Vec::new();
    let mut labels = HashMap::new();
    let mut diagnostics = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "sources with 2^32 lines are rejected long before this \
                      by the address-space check"
        )]
        let line_number = index as u32 + 1;
        let text = strip_comment(raw).trim_matches([' ', '\t']);
        if text.is_empty() {
            continue;
        }

        if instructions.len() >= MEMORY_SIZE {
            diagnostics.push(Diagnostic::semantic(
                line_number,
                format!("Program exceeds {MEMORY_SIZE} instructions"),
            ));
            break;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "guarded by the address-space check above"
        )]
        let address = instructions.len() as Address;

        match parse_line(text, line_number) {
            Ok(parsed) => {
                if let Some(name) = &parsed.label {
                    let key = name.to_uppercase();
                    if labels.contains_key(&key) {
                        diagnostics.push(Diagnostic::semantic(
                            line_number,
                            format!("Label {name} already exists"),
                        ));
                    } else {
                        labels.insert(key, address);
                    }
                }
                instructions.push(parsed);
            }
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                instructions.push(ParsedLine {
                    label: None,
                    instruction: Instruction::default(),
                    label_ref: None,
                    line: line_number,
                });
            }
        }
    }

    ParsedSource {
        instructions,
        labels,
        diagnostics,
    }
}

/// Both passes plus emission
fn compile_internal(
    source: &str,
) -> Result<(Vec<u8>, SourceToAddressMap), CompileError> {
    let ParsedSource {
        mut instructions,
        labels,
        mut diagnostics,
    } = parse_source(source);

    // Pass two: substitute label addresses into operand slots
    for parsed in &mut instructions {
        if let Some(name) = &parsed.label_ref {
            match labels.get(&name.to_uppercase()) {
                Some(&address) => {
                    parsed.instruction.argument =
                        Word4::from(u32::from(address));
                }
                None => diagnostics.push(Diagnostic::semantic(
                    parsed.line,
                    format!("Label {name} does not exist"),
                )),
            }
        }
    }

    if !diagnostics.is_empty() {
        return Err(CompileError::new(diagnostics));
    }

    let mut bytecode =
        Vec::with_capacity(instructions.len().saturating_mul(INSTRUCTION_SIZE));
    let mut source_map = SourceToAddressMap::new();
    for (address, parsed) in instructions.iter().enumerate() {
        bytecode.extend_from_slice(&parsed.instruction.encode());
        #[allow(
            clippy::cast_possible_truncation,
            reason = "pass one caps the instruction count at the address space"
        )]
        source_map.insert(parsed.line, address as Address);
    }
    Ok((bytecode, source_map))
}

/// Assembles a source text into the flat bytecode stream.
///
/// # Errors
///
/// Returns a [`CompileError`] aggregating every diagnostic from both passes;
/// no bytecode is produced if any line is invalid.
pub fn compile(source: &str) -> Result<Vec<u8>, CompileError> {
    compile_internal(source).map(|(bytecode, _)| bytecode)
}

/// Assembles a source text, also returning the source-line → address map
/// used for debugger stepping.
///
/// # Errors
///
/// Returns a [`CompileError`] aggregating every diagnostic from both passes;
/// no bytecode is produced if any line is invalid.
pub fn compile_with_debug(
    source: &str,
) -> Result<(Vec<u8>, SourceToAddressMap), CompileError> {
    compile_internal(source)
}

/// Checks a source text without assembling it, returning every pass-one
/// diagnostic.  Never fails; a clean source yields an empty list.
#[must_use]
pub fn test_source(source: &str) -> Vec<Diagnostic> {
    parse_source(source).diagnostics
}
