use core::fmt;
use std::error::Error;

use slate::Address;

/// Result type shared by the core components
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/// Possible error kinds for loading and executing programs
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoreError {
    /// A bytecode stream with broken framing: its length is not a multiple
    /// of the instruction size, or it holds more instructions than the
    /// address space
    BadImage(&'static str),

    /// An address outside the loaded program or past the address space
    OutOfRange(u32),

    /// Division or modulo by zero
    Arithmetic(&'static str),

    /// A packed byte whose dispatch key has no registered instruction.
    /// Executing one stops the processor.
    UnknownOpcode {
        /// The offending byte
        code: u8,
        /// Where it was fetched from
        address: Address,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BadImage(message) => {
                write!(f, "invalid bytecode image: {message}")
            }
            Self::OutOfRange(address) => {
                write!(f, "address {address} exceeds available memory")
            }
            Self::Arithmetic(message) => write!(f, "{message}"),
            Self::UnknownOpcode { code, address } => {
                write!(f, "instruction {code:08b} at {address} is undefined")
            }
        }
    }
}

impl Error for CoreError {}
