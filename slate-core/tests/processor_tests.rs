//! Per-instruction semantics, exercised through every argument modifier.
//!
//! Each case stages one instruction at address zero, arranging the operand
//! directly, through one indirection cell, or through a pointer chain, then
//! single-steps the processor and inspects registers, memory, and state.

use slate::{
    instruction_byte, test_utils, ArgModifier, Opcode, TypeModifier, Word4,
};
use slate_core::{
    CoreError, CoreResult, MemoryManager, Processor, ProcessorState,
};

/// Cell holding the operand for single-indirect cases
const REF_CELL: u32 = 256;
/// Cell holding the pointer for double-indirect cases
const POINTER_CELL: u32 = 9000;
/// Cell holding the operand for double-indirect cases
const VALUE_CELL: u32 = 10_000;

/// The three argument modifiers every case is repeated with
const MODIFIERS: [ArgModifier; 3] =
    [ArgModifier::None, ArgModifier::Ref, ArgModifier::RefRef];

struct Bench {
    memory: MemoryManager,
    processor: Processor,
}

impl Bench {
    fn new() -> Self {
        Self {
            memory: MemoryManager::new(),
            processor: Processor::new(),
        }
    }

    /// Writes one instruction at address zero whose resolved operand is
    /// `operand` under the given argument modifier
    fn stage(
        &mut self,
        opcode: Opcode,
        type_modifier: TypeModifier,
        arg_modifier: ArgModifier,
        operand: Word4,
    ) {
        let code = instruction_byte(opcode, type_modifier, arg_modifier);
        match arg_modifier {
            ArgModifier::None => {
                self.memory.write_instruction(code, operand, 0);
            }
            ArgModifier::Ref => {
                self.memory.write_instruction(
                    code,
                    Word4::from(REF_CELL),
                    0,
                );
                self.memory.write_argument(operand, REF_CELL).unwrap();
            }
            ArgModifier::RefRef => {
                self.memory.write_instruction(
                    code,
                    Word4::from(POINTER_CELL),
                    0,
                );
                self.memory
                    .write_argument(Word4::from(VALUE_CELL), POINTER_CELL)
                    .unwrap();
                self.memory.write_argument(operand, VALUE_CELL).unwrap();
            }
        }
    }

    fn step(&mut self) -> CoreResult<()> {
        self.processor.step(&mut self.memory)
    }
}

/// Stages and executes one instruction, returning the bench for inspection
fn exec(
    opcode: Opcode,
    type_modifier: TypeModifier,
    arg_modifier: ArgModifier,
    accumulator: Word4,
    operand: Word4,
) -> Bench {
    let mut bench = Bench::new();
    bench.processor.set_accumulator(accumulator);
    bench.stage(opcode, type_modifier, arg_modifier, operand);
    bench.step().unwrap();
    bench
}

/// As [`exec`], but surfaces the execution result instead of unwrapping
fn try_exec(
    opcode: Opcode,
    type_modifier: TypeModifier,
    arg_modifier: ArgModifier,
    accumulator: Word4,
    operand: Word4,
) -> (Bench, CoreResult<()>) {
    let mut bench = Bench::new();
    bench.processor.set_accumulator(accumulator);
    bench.stage(opcode, type_modifier, arg_modifier, operand);
    let result = bench.step();
    (bench, result)
}

/// The accumulator after one arithmetic-style instruction
fn calc(
    opcode: Opcode,
    type_modifier: TypeModifier,
    arg_modifier: ArgModifier,
    accumulator: Word4,
    operand: Word4,
) -> Word4 {
    exec(opcode, type_modifier, arg_modifier, accumulator, operand)
        .processor
        .accumulator()
}

#[test]
fn add() {
    for m in MODIFIERS {
        let r = calc(
            Opcode::Add,
            TypeModifier::C,
            m,
            Word4::from(128u32),
            Word4::from(127u32),
        );
        assert_eq!(r.as_byte(), 255);

        let r = calc(
            Opcode::Add,
            TypeModifier::W,
            m,
            Word4::from(1_000_000_000u32),
            Word4::from(1_034_567_892u32),
        );
        assert_eq!(r.as_word(), 2_034_567_892);

        let r = calc(
            Opcode::Add,
            TypeModifier::SW,
            m,
            Word4::from(i32::MIN),
            Word4::from(i32::MAX),
        );
        assert_eq!(r.as_signed(), -1);

        let r = calc(
            Opcode::Add,
            TypeModifier::R,
            m,
            Word4::from(1.0f32 / 3.0),
            Word4::from(2.0f32 / 3.0),
        );
        assert_eq!(r.as_real(), 1.0);
    }
}

#[test]
fn add_wraps_each_integer_width() {
    for m in MODIFIERS {
        let r = calc(
            Opcode::Add,
            TypeModifier::C,
            m,
            Word4::from(255u8),
            Word4::from(2u8),
        );
        assert_eq!(r.as_byte(), 1);

        let r = calc(
            Opcode::Add,
            TypeModifier::W,
            m,
            Word4::from(u32::MAX),
            Word4::from(2u32),
        );
        assert_eq!(r.as_word(), 1);
    }
}

#[test]
fn sub() {
    for m in MODIFIERS {
        let r = calc(
            Opcode::Sub,
            TypeModifier::C,
            m,
            Word4::from(128u32),
            Word4::from(127u32),
        );
        assert_eq!(r.as_byte(), 1);

        let r = calc(
            Opcode::Sub,
            TypeModifier::W,
            m,
            Word4::from(1_034_567_892u32),
            Word4::from(1_000_000_000u32),
        );
        assert_eq!(r.as_word(), 34_567_892);

        let r = calc(
            Opcode::Sub,
            TypeModifier::SW,
            m,
            Word4::from(i32::MIN),
            Word4::from(-i32::MAX),
        );
        assert_eq!(r.as_signed(), -1);

        let r = calc(
            Opcode::Sub,
            TypeModifier::R,
            m,
            Word4::from(2.0f32 / 3.0),
            Word4::from(1.0f32 / 3.0),
        );
        assert_eq!(r.as_real(), 2.0f32 / 3.0 - 1.0f32 / 3.0);
    }
}

#[test]
fn mul() {
    for m in MODIFIERS {
        let r = calc(
            Opcode::Mul,
            TypeModifier::C,
            m,
            Word4::from(5u32),
            Word4::from(6u32),
        );
        assert_eq!(r.as_byte(), 30);

        let r = calc(
            Opcode::Mul,
            TypeModifier::W,
            m,
            Word4::from(123_456u32),
            Word4::from(789_012u32),
        );
        assert_eq!(r.as_word(), 123_456u32.wrapping_mul(789_012));

        let r = calc(
            Opcode::Mul,
            TypeModifier::SW,
            m,
            Word4::from(-12_345i32),
            Word4::from(78_901i32),
        );
        assert_eq!(r.as_signed(), -12_345 * 78_901);

        let r = calc(
            Opcode::Mul,
            TypeModifier::R,
            m,
            Word4::from(2.0f32 / 3.0),
            Word4::from(1.0f32 / 3.0),
        );
        assert_eq!(r.as_real(), (2.0f32 / 3.0) * (1.0f32 / 3.0));
    }
}

#[test]
fn div() {
    for m in MODIFIERS {
        let r = calc(
            Opcode::Div,
            TypeModifier::C,
            m,
            Word4::from(6u32),
            Word4::from(5u32),
        );
        assert_eq!(r.as_byte(), 1);

        let r = calc(
            Opcode::Div,
            TypeModifier::W,
            m,
            Word4::from(789_012u32),
            Word4::from(123_456u32),
        );
        assert_eq!(r.as_word(), 789_012 / 123_456);

        let r = calc(
            Opcode::Div,
            TypeModifier::SW,
            m,
            Word4::from(78_901i32),
            Word4::from(-12_345i32),
        );
        assert_eq!(r.as_signed(), 78_901 / -12_345);

        let r = calc(
            Opcode::Div,
            TypeModifier::R,
            m,
            Word4::from(1.0f32),
            Word4::from(3.0f32),
        );
        assert_eq!(r.as_real(), 1.0f32 / 3.0);
    }
}

#[test]
fn div_by_zero_stops_the_processor() {
    for m in MODIFIERS {
        let (bench, result) = try_exec(
            Opcode::Div,
            TypeModifier::W,
            m,
            Word4::from(1u32),
            Word4::ZERO,
        );
        assert_eq!(result, Err(CoreError::Arithmetic("division by zero")));
        assert_eq!(bench.processor.state(), ProcessorState::Stopped);
        // The failed instruction leaves the accumulator untouched
        assert_eq!(bench.processor.accumulator(), Word4::from(1u32));
    }
}

#[test]
fn modulo() {
    for m in MODIFIERS {
        let r = calc(
            Opcode::Mod,
            TypeModifier::C,
            m,
            Word4::from(6u32),
            Word4::from(5u32),
        );
        assert_eq!(r.as_byte(), 1);

        let r = calc(
            Opcode::Mod,
            TypeModifier::W,
            m,
            Word4::from(789_012u32),
            Word4::from(123_456u32),
        );
        assert_eq!(r.as_word(), 789_012 % 123_456);

        let r = calc(
            Opcode::Mod,
            TypeModifier::SW,
            m,
            Word4::from(78_901i32),
            Word4::from(-12_345i32),
        );
        assert_eq!(r.as_signed(), 78_901 % -12_345);

        // The real remainder is the IEEE single remainder
        let r = calc(
            Opcode::Mod,
            TypeModifier::R,
            m,
            Word4::from(7.5f32),
            Word4::from(2.0f32),
        );
        assert_eq!(r.as_real(), 1.5);
    }
}

#[test]
fn modulo_by_zero_stops_the_processor() {
    for m in MODIFIERS {
        let (bench, result) = try_exec(
            Opcode::Mod,
            TypeModifier::W,
            m,
            Word4::from(1u32),
            Word4::ZERO,
        );
        assert_eq!(result, Err(CoreError::Arithmetic("modulo by zero")));
        assert_eq!(bench.processor.state(), ProcessorState::Stopped);
    }
}

#[test]
fn load() {
    for m in MODIFIERS {
        let r = calc(
            Opcode::Load,
            TypeModifier::C,
            m,
            Word4::ZERO,
            Word4::from(255u32),
        );
        assert_eq!(r.as_byte(), 255);

        // The byte lens narrows; the word lenses carry all bits
        let r = calc(
            Opcode::Load,
            TypeModifier::C,
            m,
            Word4::ZERO,
            Word4::from(0x0102u32),
        );
        assert_eq!(r, Word4::from(2u32));

        let r = calc(
            Opcode::Load,
            TypeModifier::W,
            m,
            Word4::ZERO,
            Word4::from(u32::MAX),
        );
        assert_eq!(r.as_word(), u32::MAX);

        let r = calc(
            Opcode::Load,
            TypeModifier::SW,
            m,
            Word4::ZERO,
            Word4::from(i32::MIN),
        );
        assert_eq!(r.as_signed(), i32::MIN);

        let r = calc(
            Opcode::Load,
            TypeModifier::R,
            m,
            Word4::ZERO,
            Word4::from(f32::MAX),
        );
        assert_eq!(r.as_real(), f32::MAX);
    }
}

#[test]
fn store() {
    for m in [ArgModifier::None, ArgModifier::Ref] {
        let target = 1234u32;
        let bench = exec(
            Opcode::Store,
            TypeModifier::W,
            m,
            Word4::from(f32::MAX),
            Word4::from(target),
        );
        assert_eq!(
            bench.memory.read_argument(target),
            Word4::from(f32::MAX)
        );
        assert_eq!(bench.processor.instruction_pointer(), 1);
    }
}

#[test]
fn store_past_the_address_space_stops_the_processor() {
    let (bench, result) = try_exec(
        Opcode::Store,
        TypeModifier::W,
        ArgModifier::None,
        Word4::from(1u32),
        Word4::from(70_000u32),
    );
    assert_eq!(result, Err(CoreError::OutOfRange(70_000)));
    assert_eq!(bench.processor.state(), ProcessorState::Stopped);
}

#[test]
fn jump() {
    for m in MODIFIERS {
        let bench = exec(
            Opcode::Jump,
            TypeModifier::W,
            m,
            Word4::ZERO,
            Word4::from(1234u32),
        );
        assert_eq!(bench.processor.instruction_pointer(), 1234);
    }
}

#[test]
fn skip_lower_taken() {
    let cases = [
        (TypeModifier::C, Word4::from(1u32), Word4::from(5u32)),
        (
            TypeModifier::W,
            Word4::from(u32::MAX - 1),
            Word4::from(u32::MAX),
        ),
        (
            TypeModifier::SW,
            Word4::from(i32::MIN),
            Word4::from(i32::MIN + 1),
        ),
        (TypeModifier::R, Word4::from(3.12f32), Word4::from(3.14f32)),
    ];
    for m in MODIFIERS {
        for (ty, a, b) in cases {
            let bench = exec(Opcode::SkipLo, ty, m, a, b);
            assert_eq!(bench.processor.instruction_pointer(), 2);
        }
    }
}

#[test]
fn skip_lower_not_taken() {
    let cases = [
        (TypeModifier::C, Word4::from(5u32), Word4::from(1u32)),
        (
            TypeModifier::W,
            Word4::from(u32::MAX),
            Word4::from(u32::MAX - 1),
        ),
        (
            TypeModifier::SW,
            Word4::from(i32::MIN + 1),
            Word4::from(i32::MIN),
        ),
        (TypeModifier::R, Word4::from(3.14f32), Word4::from(3.12f32)),
    ];
    for m in MODIFIERS {
        for (ty, a, b) in cases {
            let bench = exec(Opcode::SkipLo, ty, m, a, b);
            assert_eq!(bench.processor.instruction_pointer(), 1);
        }
    }
}

#[test]
fn skip_lower_casts_before_comparing() {
    // As unsigned words A < B, but through the byte lens A > B
    let a = Word4::from(0x0000_0009u32);
    let b = Word4::from(0xFF00_0001u32);
    let bench = exec(Opcode::SkipLo, TypeModifier::C, ArgModifier::None, a, b);
    assert_eq!(bench.processor.instruction_pointer(), 1);
    let bench = exec(Opcode::SkipLo, TypeModifier::W, ArgModifier::None, a, b);
    assert_eq!(bench.processor.instruction_pointer(), 2);
}

#[test]
fn skip_greater() {
    for m in MODIFIERS {
        let bench = exec(
            Opcode::SkipGt,
            TypeModifier::SW,
            m,
            Word4::from(0i32),
            Word4::from(i32::MIN),
        );
        assert_eq!(bench.processor.instruction_pointer(), 2);

        let bench = exec(
            Opcode::SkipGt,
            TypeModifier::SW,
            m,
            Word4::from(i32::MIN),
            Word4::from(789i32),
        );
        assert_eq!(bench.processor.instruction_pointer(), 1);
    }
}

#[test]
fn skip_equal() {
    for m in MODIFIERS {
        let bench = exec(
            Opcode::SkipEq,
            TypeModifier::R,
            m,
            Word4::from(3.14f32),
            Word4::from(3.14f32),
        );
        assert_eq!(bench.processor.instruction_pointer(), 2);

        let bench = exec(
            Opcode::SkipEq,
            TypeModifier::W,
            m,
            Word4::from(123u32),
            Word4::from(u32::MAX),
        );
        assert_eq!(bench.processor.instruction_pointer(), 1);
    }
}

#[test]
fn jump_and_store() {
    for m in MODIFIERS {
        let target = 5u32;
        let bench = exec(
            Opcode::Jns,
            TypeModifier::W,
            m,
            Word4::ZERO,
            Word4::from(target),
        );
        // The return address lands in the target cell, execution after it
        assert_eq!(bench.processor.instruction_pointer(), 6);
        assert_eq!(bench.memory.read_argument(target), Word4::from(1u32));
    }
}

#[test]
fn nope_only_advances() {
    let bench = exec(
        Opcode::Nope,
        TypeModifier::SW,
        ArgModifier::None,
        Word4::from(9u32),
        Word4::from(1234u32),
    );
    assert_eq!(bench.processor.instruction_pointer(), 1);
    assert_eq!(bench.processor.accumulator(), Word4::from(9u32));
}

#[test]
fn halt_stops_without_advancing() {
    let mut bench = Bench::new();
    bench.stage(
        Opcode::Halt,
        TypeModifier::W,
        ArgModifier::None,
        Word4::ZERO,
    );
    bench.step().unwrap();
    assert_eq!(bench.processor.state(), ProcessorState::Stopped);
    assert_eq!(bench.processor.instruction_pointer(), 0);
}

#[test]
fn fetch_past_the_end_stops_silently() {
    let mut bench = Bench::new();
    assert_eq!(bench.step(), Ok(()));
    assert_eq!(bench.processor.state(), ProcessorState::Stopped);
}

#[test]
fn unknown_opcode_byte_is_an_error() {
    // High-nibble 15 without the full sentinel decodes to nothing
    let mut bench = Bench::new();
    bench.memory.write_instruction(0xF0, Word4::ZERO, 0);
    assert_eq!(
        bench.step(),
        Err(CoreError::UnknownOpcode {
            code: 0xF0,
            address: 0
        })
    );
    assert_eq!(bench.processor.state(), ProcessorState::Stopped);
}

#[test]
fn every_registered_dispatch_key_executes() {
    for (opcode, type_modifier) in test_utils::valid_dispatch_pairs() {
        let mut bench = Bench::new();
        bench.processor.set_accumulator(Word4::from(2u32));
        bench.stage(
            opcode,
            type_modifier,
            ArgModifier::None,
            Word4::from(1u32),
        );
        let result = bench.step();
        assert!(
            !matches!(result, Err(CoreError::UnknownOpcode { .. })),
            "{opcode} {type_modifier} should have a registered handler"
        );
    }
}

#[test]
fn every_unregistered_byte_is_rejected() {
    use slate::DecodedInstruction;

    for code in 0..=u8::MAX {
        if DecodedInstruction::decode(code).is_some() {
            continue;
        }
        let mut bench = Bench::new();
        bench.memory.write_instruction(code, Word4::ZERO, 0);
        assert_eq!(
            bench.step(),
            Err(CoreError::UnknownOpcode { code, address: 0 }),
            "byte {code:#04x} has no handler and must be rejected"
        );
    }
}

#[test]
fn step_pauses_between_instructions() {
    let mut bench = Bench::new();
    bench.stage(
        Opcode::Nope,
        TypeModifier::SW,
        ArgModifier::None,
        Word4::ZERO,
    );
    bench.memory.write_instruction(
        instruction_byte(Opcode::Nope, TypeModifier::SW, ArgModifier::None),
        Word4::ZERO,
        1,
    );
    bench.step().unwrap();
    assert_eq!(bench.processor.state(), ProcessorState::Paused);
    bench.step().unwrap();
    assert_eq!(bench.processor.state(), ProcessorState::Stopped);
}

#[test]
fn reset_zeroes_the_registers() {
    let mut bench = exec(
        Opcode::Jump,
        TypeModifier::W,
        ArgModifier::None,
        Word4::from(7u32),
        Word4::from(1234u32),
    );
    bench.processor.reset();
    let registers = bench.processor.registers();
    assert_eq!(registers.accumulator, Word4::ZERO);
    assert_eq!(registers.auxiliary, Word4::ZERO);
    assert_eq!(registers.instruction_pointer, 0);
    assert_eq!(bench.processor.state(), ProcessorState::Stopped);
}

#[test]
fn set_ip_past_the_program_stops() {
    let mut bench = Bench::new();
    bench.stage(
        Opcode::Nope,
        TypeModifier::SW,
        ArgModifier::None,
        Word4::ZERO,
    );
    bench.memory.write_instruction(
        instruction_byte(Opcode::Nope, TypeModifier::SW, ArgModifier::None),
        Word4::ZERO,
        1,
    );
    bench.step().unwrap();
    assert_eq!(bench.processor.state(), ProcessorState::Paused);

    // Pointing back inside the program keeps it paused
    bench.processor.set_instruction_pointer(0, &bench.memory);
    assert_eq!(bench.processor.state(), ProcessorState::Paused);

    // Pointing past the end stops it
    bench
        .processor
        .set_instruction_pointer(500, &bench.memory);
    assert_eq!(bench.processor.state(), ProcessorState::Stopped);
    assert_eq!(bench.processor.instruction_pointer(), 500);
}
