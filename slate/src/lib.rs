//! Representations for the Slate assembly language, a small accumulator
//! machine used for teaching how processors execute programs.
//!
//! A Slate instruction occupies exactly five bytes: one packed opcode byte
//! followed by a four-byte little-endian operand.  This crate defines the
//! instruction set, the modifier enums, the per-opcode property table shared
//! by the assembler and any editor tooling, the [`Word4`] operand container,
//! and the bit-exact byte encoding.

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
// Prevent coverage reports from including lines in #[test]s
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// used to convert opcode and modifier enums to and from packed byte values
#[macro_use]
extern crate num_derive;

/// Opcodes, modifiers, the opcode property table, and the packed byte layout
mod isa;
pub use crate::isa::*;

/// The four-byte little-endian operand container
mod word;
pub use crate::word::Word4;
