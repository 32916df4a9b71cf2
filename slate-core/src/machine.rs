use std::sync::Arc;

use slate::{Address, SourceToAddressMap, TypeModifier, Word4};

use crate::{
    error::CoreResult,
    io::ProcessorIo,
    memory::MemoryManager,
    observer::ProcessorObserver,
    processor::{Controller, Processor, ProcessorState, Registers},
};

/// A memory manager and processor wired together behind one surface.
///
/// This is the object hosts embed: load a compiled program, run it or step
/// through it, poke registers and memory between steps, and wire up the
/// observer and I/O collaborators.  Nothing here adds semantics; every call
/// forwards to the owned components.
#[derive(Default)]
pub struct Machine {
    /// The program image
    memory: MemoryManager,
    /// The execution engine
    processor: Processor,
}

impl Machine {
    /// An empty machine with no program, observer, or I/O endpoint
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty machine with an I/O endpoint already wired
    #[must_use]
    pub fn with_io(io: Arc<dyn ProcessorIo>) -> Self {
        let machine = Self::new();
        machine.processor.set_io(Some(io));
        machine
    }

    /// Loads a compiled bytecode stream.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::BadImage`] on broken framing; the
    /// previous program is retained.
    pub fn load(&mut self, bytecode: &[u8]) -> CoreResult<()> {
        self.memory.load(bytecode)
    }

    /// Loads a compiled bytecode stream together with its debug map.
    ///
    /// # Errors
    ///
    /// As [`Machine::load`].
    pub fn load_with_debug(
        &mut self,
        bytecode: &[u8],
        source_map: SourceToAddressMap,
    ) -> CoreResult<()> {
        self.memory.load_with_debug(bytecode, source_map)
    }

    /// Runs the loaded program to completion.
    ///
    /// # Errors
    ///
    /// Returns the [`crate::CoreError`] of the instruction that failed.
    pub fn run(&mut self) -> CoreResult<()> {
        self.processor.run(&mut self.memory)
    }

    /// Executes one instruction.
    ///
    /// # Errors
    ///
    /// Returns the [`crate::CoreError`] of the instruction that failed.
    pub fn step(&mut self) -> CoreResult<()> {
        self.processor.step(&mut self.memory)
    }

    /// Stops the processor, cancelling any pending input wait
    pub fn stop(&self) {
        self.processor.stop();
    }

    /// Stops the processor, zeroes the registers, and discards the program
    pub fn reset(&mut self) {
        self.processor.reset();
        self.memory.reset();
    }

    /// Reverts self-modified argument slots to their load-time values, so
    /// the program can run again without re-assembling
    pub fn reset_data(&mut self) {
        self.memory.reset_data();
    }

    /// The argument word at `address`, zero past the end of the program
    #[must_use]
    pub fn read_memory(&self, address: u32) -> Word4 {
        self.memory.read_argument(address)
    }

    /// Writes the argument word at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::OutOfRange`] past the 16-bit address
    /// space.
    pub fn write_memory(
        &mut self,
        address: u32,
        value: Word4,
    ) -> CoreResult<()> {
        self.memory.write_argument(value, address)
    }

    /// A copy of the register file
    #[must_use]
    pub const fn registers(&self) -> Registers {
        self.processor.registers()
    }

    /// The current lifecycle state
    #[must_use]
    pub fn state(&self) -> ProcessorState {
        self.processor.state()
    }

    /// Whether the processor is in any state other than `Stopped`
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.processor.is_running()
    }

    /// Writes the instruction pointer; pointing past the program end stops
    /// the processor
    pub fn set_instruction_pointer(&mut self, value: Address) {
        self.processor.set_instruction_pointer(value, &self.memory);
    }

    /// Writes the accumulator
    pub fn set_accumulator(&mut self, value: Word4) {
        self.processor.set_accumulator(value);
    }

    /// Writes the auxiliary register
    pub fn set_auxiliary(&mut self, value: Word4) {
        self.processor.set_auxiliary(value);
    }

    /// Replaces or clears the observer
    pub fn set_observer(&self, observer: Option<Arc<dyn ProcessorObserver>>) {
        self.processor.set_observer(observer);
    }

    /// Replaces or clears the I/O endpoint
    pub fn set_io(&self, io: Option<Arc<dyn ProcessorIo>>) {
        self.processor.set_io(io);
    }

    /// A cross-thread handle for stopping the machine while it runs
    #[must_use]
    pub fn controller(&self) -> Controller {
        self.processor.controller()
    }

    /// Read access to the program image
    #[must_use]
    pub const fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// The source line of the instruction at `address`, if debug
    /// information was loaded
    #[must_use]
    pub fn source_line(&self, address: Address) -> Option<u32> {
        self.memory.source_line(address)
    }

    /// The instruction address of the 1-based source line, if debug
    /// information was loaded
    #[must_use]
    pub fn address_of_line(&self, line: u32) -> Option<Address> {
        self.memory.address_of_line(line)
    }
}

/// Renders a value the way console hosts display it: `C` as its character,
/// the word types as decimal, `R` as a decimal real
#[must_use]
pub fn format_value(value: Word4, type_modifier: TypeModifier) -> String {
    match type_modifier {
        TypeModifier::C => char::from(value.as_byte()).to_string(),
        TypeModifier::W => value.as_word().to_string(),
        TypeModifier::SW => value.as_signed().to_string(),
        TypeModifier::R => value.as_real().to_string(),
    }
}

/// Parses user input under a type lens, the inverse of [`format_value`] for
/// the numeric types.  Returns `None` when the text does not read as a
/// value of that type.
#[must_use]
pub fn parse_value(text: &str, type_modifier: TypeModifier) -> Option<Word4> {
    let text = text.trim();
    match type_modifier {
        TypeModifier::C => text.parse::<u8>().ok().map(Word4::from),
        TypeModifier::W => text.parse::<u32>().ok().map(Word4::from),
        TypeModifier::SW => text.parse::<i32>().ok().map(Word4::from),
        TypeModifier::R => text.parse::<f32>().ok().map(Word4::from),
    }
}
