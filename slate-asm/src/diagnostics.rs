use core::fmt;
use std::error::Error;

/// Broad classification of an assembly diagnostic
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DiagnosticKind {
    /// Malformed token, bad literal, illegal label name
    Syntax,
    /// Unknown or misused opcode/modifier, missing required argument,
    /// duplicate or unresolved label, address overflow
    Semantic,
}

/// One assembly error, anchored to the 1-based source line it came from
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Diagnostic {
    /// 1-based physical source line
    pub line: u32,
    /// Syntax or semantic classification
    pub kind: DiagnosticKind,
    /// Human readable description, without the line prefix
    pub message: String,
}

impl Diagnostic {
    /// A syntax diagnostic for `line`
    pub(crate) const fn syntax(line: u32, message: String) -> Self {
        Self {
            line,
            kind: DiagnosticKind::Syntax,
            message,
        }
    }

    /// A semantic diagnostic for `line`
    pub(crate) const fn semantic(line: u32, message: String) -> Self {
        Self {
            line,
            kind: DiagnosticKind::Semantic,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

impl Error for Diagnostic {}

/// Every diagnostic collected across both assembler passes.
///
/// Compilation is atomic: if this error is returned, no bytecode was
/// produced, and the list carries one entry per problem found.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompileError {
    /// The aggregated diagnostics in source order
    diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    /// Wraps a non-empty diagnostic list
    pub(crate) const fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// The aggregated diagnostics in source order
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the error, returning the diagnostics
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for diagnostic in &self.diagnostics {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
            first = false;
        }
        Ok(())
    }
}

impl Error for CompileError {}
