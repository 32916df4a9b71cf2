// Make clippy as annoying as possible
#![deny(
    // All typically enabled warnings are converted into errors
    // includes correctness, suspicious, style, complexity, and perf
    clippy::all,
    // Error on cargo lints
    clippy::cargo,
)]
#![warn(
    clippy::pedantic,
    clippy::nursery,
    // Lints from "restriction" group - enforce a consistent if arbitrary style
    clippy::arithmetic_side_effects,
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_docs_in_private_items,
    clippy::panic,
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::todo,
    clippy::unreachable,
    clippy::unwrap_in_result,
    clippy::unwrap_used,
    clippy::use_debug,
)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! The Slate assembler.
//!
//! Lowers Slate assembly source into the flat 5-byte-per-instruction
//! bytecode stream executed by `slate-core`.  One instruction per line:
//!
//! ```text
//! [label:] [opcode] [type_modifier] [arg_modifier] [operand]   // comment
//! ```
//!
//! Assembly runs in two passes: pass one tokenizes each line, validates
//! modifiers against the opcode property table, assigns sequential addresses
//! and collects label definitions; pass two substitutes label addresses into
//! operand slots.  All diagnostics from both passes are aggregated, and
//! [`compile`] either succeeds completely or reports every error at once.

/// The two-pass driver and the public `compile`/`test_source` surface
mod assembler;
pub use assembler::{compile, compile_with_debug, test_source};

/// Per-line diagnostics and the aggregated compile error
mod diagnostics;
pub use diagnostics::{CompileError, Diagnostic, DiagnosticKind};

/// Internal functions which evaluate the content of a single source line
mod line_parser;

/// Internal parsers for well defined atoms of the grammar: identifiers,
/// character literals, and numeric literals
mod primitives;
