//! # Slate-Core
//!
//! Slate-Core executes the bytecode produced by the Slate assembler: a
//! [`MemoryManager`] holding the program image, a [`Processor`] driving the
//! fetch-decode-execute loop, and a [`Machine`] facade wiring the two
//! together for hosts.
//!
//! ## Usage
//!
//! ```rust
//! use slate::{ArgModifier, Instruction, Opcode, TypeModifier, Word4};
//! use slate_core::Machine;
//!
//! // Load 255 / Add 1 / Halt
//! let program = [
//!     Instruction {
//!         opcode: Opcode::Load,
//!         type_modifier: TypeModifier::SW,
//!         arg_modifier: ArgModifier::None,
//!         argument: Word4::from(255u32),
//!     },
//!     Instruction {
//!         opcode: Opcode::Add,
//!         type_modifier: TypeModifier::SW,
//!         arg_modifier: ArgModifier::None,
//!         argument: Word4::from(1u32),
//!     },
//!     Instruction {
//!         opcode: Opcode::Halt,
//!         type_modifier: TypeModifier::W,
//!         arg_modifier: ArgModifier::None,
//!         argument: Word4::ZERO,
//!     },
//! ];
//! let bytecode: Vec<u8> =
//!     program.iter().flat_map(|instruction| instruction.encode()).collect();
//!
//! let mut machine = Machine::new();
//! machine.load(&bytecode).unwrap();
//! machine.run().unwrap();
//! assert_eq!(machine.registers().accumulator.as_word(), 256);
//! ```
//!
//! ## Lifecycle and hosts
//!
//! The processor is single-threaded and cooperative: memory, registers, and
//! dispatch are touched only by the thread inside `run`/`step`.  Two
//! surfaces cross threads, both safe to use while a worker thread runs a
//! program:
//!
//! * a [`Controller`] stops the processor or reads its state, and
//! * the [`ProcessorIo`] `INPUT` callback, which suspends the processor in
//!   `PausedByIo` until the host answers.
//!
//! Hosts observe execution through [`ProcessorObserver`]: one notification
//! after every visible register, memory, or lifecycle mutation.  IDE-style
//! hosts load programs with the assembler's debug map and translate between
//! source lines and addresses while stepping.

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

/// Error kinds shared by loading and execution
mod error;
pub use error::{CoreError, CoreResult};

/// The `INPUT`/`OUTPUT` collaborator interface
mod io;
pub use io::{InputCallback, ProcessorIo};

/// The facade hosts embed, plus console value formatting
mod machine;
pub use machine::{format_value, parse_value, Machine};

/// The program image: parallel opcode and argument columns with a
/// load-time snapshot
mod memory;
pub use memory::MemoryManager;

/// Notification hooks for register, memory, and lifecycle mutations
mod observer;
pub use observer::ProcessorObserver;

/// The fetch-decode-execute engine and its lifecycle state machine
mod processor;
pub use processor::{
    Controller, Processor, ProcessorState, Registers,
};
