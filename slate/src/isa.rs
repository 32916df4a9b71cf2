use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::word::Word4;

/// A code/data address.  The two address spaces coincide: `STORE` writes into
/// the argument slot of the instruction at the target address.
pub type Address = u16;

/// Number of addressable instruction slots
pub const MEMORY_SIZE: usize = Address::MAX as usize + 1;

/// Width in bytes of one encoded instruction
pub const INSTRUCTION_SIZE: usize = 5;

/// The packed byte of the terminator.  `HALT` does not participate in the
/// regular opcode byte layout; the fetcher recognizes this sentinel directly.
pub const HALT_BYTE: u8 = 0xFF;

/// Maps 1-based source line numbers to instruction addresses.  Produced by
/// the assembler when debug information is requested.
pub type SourceToAddressMap = HashMap<u32, Address>;

/// The inverse of [`SourceToAddressMap`], derived when a program is loaded
pub type AddressToSourceMap = HashMap<Address, u32>;

/// The operation portion of an instruction.
///
/// Discriminants are the opcode index stored in the high bits of the packed
/// byte, so the declaration order here is the wire encoding order.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    FromPrimitive,
    ToPrimitive,
    Serialize,
    Deserialize,
)]
pub enum Opcode {
    /// Advance to the next instruction.  Also the carrier of label-only data
    /// slots, whose argument cell is the data.
    Nope = 0,

    /// A ← A + B
    Add,

    /// A ← A − B
    Sub,

    /// A ← A × B
    Mul,

    /// A ← A ÷ B; division by zero is a runtime error
    Div,

    /// A ← A mod B; modulo by zero is a runtime error
    Mod,

    /// A ← B reinterpreted through the instruction type
    Load,

    /// mem[B] ← A
    Store,

    /// Request one value from the I/O collaborator and suspend until the
    /// answer arrives
    Input,

    /// Emit A through the I/O collaborator
    Output,

    /// IP ← B
    Jump,

    /// Jump-and-store, the subroutine call primitive: mem[B] ← IP + 1,
    /// then IP ← B + 1
    Jns,

    /// Skip the next instruction if A < B
    SkipLo,

    /// Skip the next instruction if A > B
    SkipGt,

    /// Skip the next instruction if A = B
    SkipEq,

    /// Stop the processor.  Encoded as the [`HALT_BYTE`] sentinel.
    Halt,
}

impl Opcode {
    /// Every opcode in encoding order
    pub const ALL: [Self; 16] = [
        Self::Nope,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Load,
        Self::Store,
        Self::Input,
        Self::Output,
        Self::Jump,
        Self::Jns,
        Self::SkipLo,
        Self::SkipGt,
        Self::SkipEq,
        Self::Halt,
    ];

    /// The canonical upper-case mnemonic
    #[must_use]
    pub const fn name(self) -> &'static str {
        properties(self).name
    }

    /// Looks up an opcode by mnemonic, case-insensitively.
    ///
    /// The assembler builds its keyword table from this, so the set of
    /// recognized spellings is exactly the property-table names.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Selects the numeric interpretation of the operand and the accumulator.
///
/// The two bits above the argument-modifier bits in the packed byte.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    FromPrimitive,
    ToPrimitive,
    Serialize,
    Deserialize,
)]
pub enum TypeModifier {
    /// Unsigned byte, zero-extended in its four-byte slot
    C = 0,
    /// Unsigned 32-bit word
    W,
    /// Two's-complement signed 32-bit word
    SW,
    /// IEEE-754 single precision
    R,
}

impl TypeModifier {
    /// The source-language spelling
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::W => "W",
            Self::SW => "SW",
            Self::R => "R",
        }
    }

    /// Looks up a type modifier by spelling, case-insensitively
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::C, Self::W, Self::SW, Self::R]
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TypeModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Selects how the encoded argument becomes the operand register B.
///
/// The low two bits of the packed byte.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    FromPrimitive,
    ToPrimitive,
    Serialize,
    Deserialize,
)]
pub enum ArgModifier {
    /// Immediate: B ← argument
    None = 0,
    /// One level of indirection, spelled `&`: B ← mem[argument]
    Ref,
    /// Two levels of indirection, spelled `&&`: B ← mem[mem[argument]]
    RefRef,
}

impl ArgModifier {
    /// The source sigil; immediate operands have no sigil
    #[must_use]
    pub const fn sigil(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Ref => "&",
            Self::RefRef => "&&",
        }
    }

    /// Looks up an argument modifier by source sigil
    #[must_use]
    pub fn from_sigil(sigil: &str) -> Option<Self> {
        match sigil {
            "&" => Some(Self::Ref),
            "&&" => Some(Self::RefRef),
            _ => None,
        }
    }
}

impl fmt::Display for ArgModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sigil())
    }
}

/// Static constraints and the canonical name of one opcode.
///
/// One immutable table drives the whole toolchain: the assembler validates
/// modifiers and builds its keyword list from it, and the byte decoder admits
/// exactly the `(opcode, type)` pairs it allows.
#[derive(Debug)]
pub struct OpcodeProperties {
    /// Type modifiers this opcode may be encoded with
    pub type_modifiers: &'static [TypeModifier],
    /// Argument modifiers this opcode may be encoded with
    pub arg_modifiers: &'static [ArgModifier],
    /// Whether source code must supply an operand
    pub argument_required: bool,
    /// Whether source code may supply an operand at all
    pub argument_available: bool,
    /// Canonical upper-case mnemonic
    pub name: &'static str,
}

impl OpcodeProperties {
    /// Whether `type_modifier` is in the allowed set
    #[must_use]
    pub fn allows_type(&self, type_modifier: TypeModifier) -> bool {
        self.type_modifiers.contains(&type_modifier)
    }

    /// Whether `arg_modifier` is in the allowed set
    #[must_use]
    pub fn allows_arg_modifier(&self, arg_modifier: ArgModifier) -> bool {
        self.arg_modifiers.contains(&arg_modifier)
    }
}

/// All four type modifiers, for opcodes without type restrictions
const ANY_TYPE: &[TypeModifier] = &[
    TypeModifier::C,
    TypeModifier::W,
    TypeModifier::SW,
    TypeModifier::R,
];

/// All three argument modifiers, for opcodes without addressing restrictions
const ANY_ARG: &[ArgModifier] =
    &[ArgModifier::None, ArgModifier::Ref, ArgModifier::RefRef];

/// The property table entry for an opcode
#[must_use]
pub const fn properties(opcode: Opcode) -> &'static OpcodeProperties {
    match opcode {
        Opcode::Nope => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: &[ArgModifier::None],
            argument_required: false,
            argument_available: true,
            name: "NOPE",
        },
        Opcode::Add => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "ADD",
        },
        Opcode::Sub => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "SUB",
        },
        Opcode::Mul => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "MUL",
        },
        Opcode::Div => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "DIV",
        },
        Opcode::Mod => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "MOD",
        },
        Opcode::Load => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "LOAD",
        },
        Opcode::Store => &OpcodeProperties {
            type_modifiers: &[TypeModifier::W],
            arg_modifiers: &[ArgModifier::None, ArgModifier::Ref],
            argument_required: true,
            argument_available: true,
            name: "STORE",
        },
        Opcode::Input => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: &[ArgModifier::None],
            argument_required: false,
            argument_available: false,
            name: "INPUT",
        },
        Opcode::Output => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: &[ArgModifier::None],
            argument_required: false,
            argument_available: false,
            name: "OUTPUT",
        },
        Opcode::Jump => &OpcodeProperties {
            type_modifiers: &[TypeModifier::W],
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "JUMP",
        },
        Opcode::Jns => &OpcodeProperties {
            type_modifiers: &[TypeModifier::W],
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "JNS",
        },
        Opcode::SkipLo => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "SKIPLO",
        },
        Opcode::SkipGt => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "SKIPGT",
        },
        Opcode::SkipEq => &OpcodeProperties {
            type_modifiers: ANY_TYPE,
            arg_modifiers: ANY_ARG,
            argument_required: true,
            argument_available: true,
            name: "SKIPEQ",
        },
        Opcode::Halt => &OpcodeProperties {
            type_modifiers: &[],
            arg_modifiers: &[ArgModifier::None],
            argument_required: false,
            argument_available: false,
            name: "HALT",
        },
    }
}

/// Packs an instruction byte: the opcode index and type modifier fill the
/// high six bits, the argument modifier the low two.  `HALT` packs to the
/// [`HALT_BYTE`] sentinel regardless of the modifiers.
#[must_use]
pub const fn instruction_byte(
    opcode: Opcode,
    type_modifier: TypeModifier,
    arg_modifier: ArgModifier,
) -> u8 {
    if matches!(opcode, Opcode::Halt) {
        return HALT_BYTE;
    }
    (opcode as u8) << 4 | (type_modifier as u8) << 2 | (arg_modifier as u8)
}

/// The portion of a packed byte that selects the executed operation.
///
/// Distinct valid `(opcode, type)` pairs have distinct dispatch keys; the
/// argument-modifier bits are masked off.
#[must_use]
pub const fn dispatch_key(code: u8) -> u8 {
    code & 0b1111_1100
}

/// A packed opcode byte, decoded.
///
/// Decoding succeeds for exactly the `(opcode, type)` pairs the property
/// table allows, plus the `HALT` sentinel; every other byte value is an
/// unknown opcode.  This is the machine's dispatch table expressed as a sum
/// type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DecodedInstruction {
    /// The operation to execute
    pub opcode: Opcode,
    /// The numeric lens for the operation
    pub type_modifier: TypeModifier,
    /// How the argument becomes the operand register
    pub arg_modifier: ArgModifier,
}

impl DecodedInstruction {
    /// Decodes a packed opcode byte, or `None` if the byte encodes nothing
    #[must_use]
    pub fn decode(code: u8) -> Option<Self> {
        use num_traits::FromPrimitive;

        if code == HALT_BYTE {
            return Some(Self {
                opcode: Opcode::Halt,
                type_modifier: TypeModifier::W,
                arg_modifier: ArgModifier::None,
            });
        }
        let opcode = Opcode::from_u8(code >> 4)?;
        if matches!(opcode, Opcode::Halt) {
            // The halt index appears only in the 0xFF sentinel
            return None;
        }
        let type_modifier = TypeModifier::from_u8((code >> 2) & 0b11)?;
        let arg_modifier = ArgModifier::from_u8(code & 0b11)?;
        properties(opcode)
            .allows_type(type_modifier)
            .then_some(Self {
                opcode,
                type_modifier,
                arg_modifier,
            })
    }
}

/// A complete instruction: the packed-byte fields plus the operand word.
///
/// ```
/// # use slate::*;
/// let instruction = Instruction {
///     opcode: Opcode::Add,
///     type_modifier: TypeModifier::W,
///     arg_modifier: ArgModifier::Ref,
///     argument: Word4::from(123u32),
/// };
///
/// assert_eq!(instruction.to_string(), "ADD W & 123");
/// assert_eq!(instruction.encode(), [0b0001_0101, 123, 0, 0, 0]);
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// The operation
    pub opcode: Opcode,
    /// The numeric lens
    pub type_modifier: TypeModifier,
    /// The addressing mode of the argument
    pub arg_modifier: ArgModifier,
    /// The encoded argument word
    pub argument: Word4,
}

impl Instruction {
    /// Encodes into the 5-byte wire form: packed byte, then the argument in
    /// little-endian order
    #[must_use]
    pub const fn encode(&self) -> [u8; INSTRUCTION_SIZE] {
        let [a0, a1, a2, a3] = self.argument.to_le_bytes();
        [
            instruction_byte(
                self.opcode,
                self.type_modifier,
                self.arg_modifier,
            ),
            a0,
            a1,
            a2,
            a3,
        ]
    }

    /// Decodes one 5-byte record, or `None` if the opcode byte is invalid
    #[must_use]
    pub fn decode(bytes: [u8; INSTRUCTION_SIZE]) -> Option<Self> {
        let [code, a0, a1, a2, a3] = bytes;
        let decoded = DecodedInstruction::decode(code)?;
        Some(Self {
            opcode: decoded.opcode,
            type_modifier: decoded.type_modifier,
            arg_modifier: decoded.arg_modifier,
            argument: Word4::from_le_bytes([a0, a1, a2, a3]),
        })
    }
}

impl Default for Instruction {
    /// The default instruction is `NOPE SW` with a zero argument: the slot
    /// the assembler emits for a line holding nothing but a label, which
    /// programs use as a one-word data cell.
    fn default() -> Self {
        Self {
            opcode: Opcode::Nope,
            type_modifier: TypeModifier::SW,
            arg_modifier: ArgModifier::None,
            argument: Word4::ZERO,
        }
    }
}

impl fmt::Display for Instruction {
    /// Formats an instruction in assembler syntax (the argument is rendered
    /// as an unsigned word)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = properties(self.opcode);
        write!(f, "{}", self.opcode)?;
        if !props.type_modifiers.is_empty() {
            write!(f, " {}", self.type_modifier)?;
        }
        if !matches!(self.arg_modifier, ArgModifier::None) {
            write!(f, " {}", self.arg_modifier)?;
        }
        if props.argument_available {
            write!(f, " {}", self.argument.as_word())?;
        }
        Ok(())
    }
}

/// Utilities for enumerating valid instruction encodings
pub mod test_utils {
    use super::{properties, ArgModifier, Opcode, TypeModifier};

    /// All type modifiers in encoding order
    pub const TYPE_MODIFIERS: [TypeModifier; 4] = [
        TypeModifier::C,
        TypeModifier::W,
        TypeModifier::SW,
        TypeModifier::R,
    ];

    /// All argument modifiers in encoding order
    pub const ARG_MODIFIERS: [ArgModifier; 3] =
        [ArgModifier::None, ArgModifier::Ref, ArgModifier::RefRef];

    /// Iterate over every `(opcode, type)` pair with a registered meaning.
    ///
    /// `HALT` is excluded; it has no place in the regular byte layout.
    pub fn valid_dispatch_pairs(
    ) -> impl Iterator<Item = (Opcode, TypeModifier)> {
        itertools::iproduct!(Opcode::ALL, TYPE_MODIFIERS)
            .filter(|&(op, ty)| properties(op).allows_type(ty))
    }

    /// Iterate over every `(opcode, type, arg)` combination the assembler
    /// accepts in source code
    pub fn valid_combinations(
    ) -> impl Iterator<Item = (Opcode, TypeModifier, ArgModifier)> {
        itertools::iproduct!(Opcode::ALL, TYPE_MODIFIERS, ARG_MODIFIERS)
            .filter(|&(op, ty, m)| {
                let props = properties(op);
                props.allows_type(ty) && props.allows_arg_modifier(m)
            })
    }
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;
    use itertools::Itertools;

    use super::*;
    use crate::test_utils::{valid_combinations, valid_dispatch_pairs};

    #[test]
    fn default_instruction_is_a_data_slot() {
        let default: Instruction = Default::default();
        let manual = Instruction {
            opcode: Opcode::Nope,
            type_modifier: TypeModifier::SW,
            arg_modifier: ArgModifier::None,
            argument: Word4::ZERO,
        };
        assert_eq!(default, manual);
    }

    #[test]
    fn names_are_canonical_and_unique() {
        for op in Opcode::ALL {
            assert_eq!(op.name(), op.name().to_uppercase());
            assert_eq!(Opcode::from_name(op.name()), Some(op));
            assert_eq!(Opcode::from_name(&op.name().to_lowercase()), Some(op));
        }
        assert_eq!(Opcode::ALL.iter().map(|op| op.name()).unique().count(), 16);
        assert_eq!(Opcode::from_name("FROB"), None);
    }

    #[test]
    fn halt_packs_to_the_sentinel() {
        for ty in test_utils::TYPE_MODIFIERS {
            for m in test_utils::ARG_MODIFIERS {
                assert_eq!(instruction_byte(Opcode::Halt, ty, m), HALT_BYTE);
            }
        }
    }

    #[test]
    fn packed_byte_round_trips() {
        for (op, ty, m) in valid_combinations() {
            let code = instruction_byte(op, ty, m);
            let decoded = DecodedInstruction::decode(code)
                .unwrap_or_else(|| panic!("{op} {ty} {m} must decode"));
            assert_eq!(decoded.opcode, op);
            assert_eq!(decoded.type_modifier, ty);
            assert_eq!(decoded.arg_modifier, m);
        }
    }

    #[test]
    fn dispatch_keys_are_distinct() {
        let keys: Vec<u8> = valid_dispatch_pairs()
            .map(|(op, ty)| {
                dispatch_key(instruction_byte(op, ty, ArgModifier::None))
            })
            .collect();
        assert_eq!(keys.iter().unique().count(), keys.len());
    }

    #[test]
    fn exactly_the_valid_bytes_decode() {
        // 3 argument modifiers per valid (opcode, type) pair, plus HALT
        let expected = valid_dispatch_pairs().count() * 3 + 1;
        let decodable =
            (0..=u8::MAX).filter(|&b| DecodedInstruction::decode(b).is_some());
        assert_eq!(decodable.count(), expected);
    }

    #[test]
    fn sentinel_neighbors_do_not_decode() {
        // High-nibble 15 encodes nothing except the full 0xFF sentinel
        for code in 0xF0..=0xFE {
            assert_eq!(DecodedInstruction::decode(code), None);
        }
        assert_eq!(
            DecodedInstruction::decode(0xFF).map(|d| d.opcode),
            Some(Opcode::Halt)
        );
    }

    #[test]
    fn store_is_word_only() {
        let code =
            instruction_byte(Opcode::Store, TypeModifier::C, ArgModifier::None);
        assert_eq!(DecodedInstruction::decode(code), None);
    }

    #[test]
    fn five_byte_records_round_trip() {
        for (op, ty, m) in valid_combinations() {
            let instruction = Instruction {
                opcode: op,
                type_modifier: ty,
                arg_modifier: m,
                argument: Word4::from(0xDEAD_BEEFu32),
            };
            assert_eq!(
                Instruction::decode(instruction.encode()),
                Some(instruction)
            );
        }
    }

    #[test]
    fn all_valid_combinations_have_unique_display() {
        let rendered: Vec<String> = valid_combinations()
            .map(|(op, ty, m)| {
                Instruction {
                    opcode: op,
                    type_modifier: ty,
                    arg_modifier: m,
                    argument: Word4::from(123u32),
                }
                .to_string()
            })
            .collect();
        assert_eq!(rendered.iter().unique().count(), rendered.len());
    }
}
