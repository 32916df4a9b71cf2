use core::time::Duration;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};

use slate::{
    Address, ArgModifier, DecodedInstruction, Opcode, TypeModifier, Word4,
    HALT_BYTE,
};

use crate::{
    error::{CoreError, CoreResult},
    io::ProcessorIo,
    memory::MemoryManager,
    observer::ProcessorObserver,
};

/// Typed arithmetic and comparison through the four numeric lenses
mod alu;

/// How long the run loop sleeps between polls while an input is pending
const IO_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle of the processor
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ProcessorState {
    /// Not started, finished, halted, or stopped by the host
    Stopped,
    /// Executing instructions
    Running,
    /// Waiting for the I/O collaborator to answer an `INPUT` request
    PausedByIo,
    /// Suspended between single steps
    Paused,
}

/// The register file.
///
/// The auxiliary register is not addressable from assembly; it is where the
/// resolved operand stages before each instruction executes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Registers {
    /// Accumulator, destination of arithmetic and loads
    pub accumulator: Word4,
    /// Auxiliary, the resolved operand
    pub auxiliary: Word4,
    /// Address of the next instruction to fetch
    pub instruction_pointer: Address,
}

/// What the input slot currently holds
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum PendingInput {
    /// No outstanding request
    Idle,
    /// A request was issued and no answer has arrived yet
    Waiting,
    /// The collaborator answered; the processor thread applies it
    Ready(Word4),
}

/// State reachable from other threads: the lifecycle, the input slot, and
/// the host collaborators
struct Shared {
    /// Current lifecycle state
    state: Mutex<ProcessorState>,
    /// The `INPUT` deposit slot
    pending_input: Mutex<PendingInput>,
    /// Host observer, replaceable at any time
    observer: Mutex<Option<Arc<dyn ProcessorObserver>>>,
    /// Host I/O endpoint, replaceable at any time
    io: Mutex<Option<Arc<dyn ProcessorIo>>>,
}

/// Recovers the guard from a poisoned lock; these mutexes hold plain data
/// that stays consistent whether or not a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// A clone of the current observer handle
    fn observer(&self) -> Option<Arc<dyn ProcessorObserver>> {
        lock(&self.observer).clone()
    }

    /// A clone of the current I/O handle
    fn io(&self) -> Option<Arc<dyn ProcessorIo>> {
        lock(&self.io).clone()
    }

    /// The current lifecycle state
    fn state(&self) -> ProcessorState {
        *lock(&self.state)
    }

    /// Transitions the lifecycle and notifies the observer once per actual
    /// change.  A `PausedByIo` processor ignores `Paused` requests: the I/O
    /// wait keeps precedence until the answer arrives or the processor is
    /// stopped.
    fn set_state(&self, state: ProcessorState) {
        {
            let mut current = lock(&self.state);
            if *current == state {
                return;
            }
            if *current == ProcessorState::PausedByIo
                && state == ProcessorState::Paused
            {
                return;
            }
            *current = state;
        }
        if let Some(observer) = self.observer() {
            observer.on_state_changed(state);
        }
    }

    /// Cancels an outstanding input request; a late callback then finds the
    /// slot no longer waiting and deposits nothing
    fn cancel_input(&self) {
        *lock(&self.pending_input) = PendingInput::Idle;
    }

    /// Cancels any input wait and stops the processor
    fn stop(&self) {
        self.cancel_input();
        self.set_state(ProcessorState::Stopped);
    }
}

/// A cloneable cross-thread handle to a processor's lifecycle.
///
/// `run` borrows the processor for as long as the program executes, so a
/// host that runs programs on a worker thread uses a controller taken
/// beforehand to stop the processor or watch its state.
#[derive(Clone)]
pub struct Controller {
    /// The processor's shared block
    shared: Arc<Shared>,
}

impl Controller {
    /// Stops the processor.  The run loop notices within one poll quantum;
    /// a pending input wait is cancelled.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// The current lifecycle state
    #[must_use]
    pub fn state(&self) -> ProcessorState {
        self.shared.state()
    }

    /// Whether the processor is in any state other than `Stopped`
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.state() != ProcessorState::Stopped
    }
}

/// The virtual processor: registers, lifecycle, and the
/// fetch-decode-execute loop.
///
/// The processor performs no internal concurrency.  Memory, registers, and
/// dispatch run on whichever single thread is inside [`Processor::run`] or
/// [`Processor::step`]; the only cross-thread surfaces are [`Controller`]
/// and the `INPUT` callback, both of which funnel through the shared block.
pub struct Processor {
    /// The register file, touched only by the executing thread
    registers: Registers,
    /// Lifecycle and collaborator handles, shared with controllers and
    /// input callbacks
    shared: Arc<Shared>,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    /// A stopped processor with zeroed registers and no collaborators
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: Registers::default(),
            shared: Arc::new(Shared {
                state: Mutex::new(ProcessorState::Stopped),
                pending_input: Mutex::new(PendingInput::Idle),
                observer: Mutex::new(None),
                io: Mutex::new(None),
            }),
        }
    }

    /// Replaces or clears the observer
    pub fn set_observer(&self, observer: Option<Arc<dyn ProcessorObserver>>) {
        *lock(&self.shared.observer) = observer;
    }

    /// Replaces or clears the I/O endpoint
    pub fn set_io(&self, io: Option<Arc<dyn ProcessorIo>>) {
        *lock(&self.shared.io) = io;
    }

    /// A cross-thread handle to this processor's lifecycle
    #[must_use]
    pub fn controller(&self) -> Controller {
        Controller {
            shared: Arc::clone(&self.shared),
        }
    }

    /// A copy of the register file
    #[must_use]
    pub const fn registers(&self) -> Registers {
        self.registers
    }

    /// The accumulator
    #[must_use]
    pub const fn accumulator(&self) -> Word4 {
        self.registers.accumulator
    }

    /// The auxiliary register
    #[must_use]
    pub const fn auxiliary(&self) -> Word4 {
        self.registers.auxiliary
    }

    /// The instruction pointer
    #[must_use]
    pub const fn instruction_pointer(&self) -> Address {
        self.registers.instruction_pointer
    }

    /// The current lifecycle state
    #[must_use]
    pub fn state(&self) -> ProcessorState {
        self.shared.state()
    }

    /// Whether the processor is in any state other than `Stopped`
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() != ProcessorState::Stopped
    }

    /// Writes the accumulator and notifies the observer
    pub fn set_accumulator(&mut self, value: Word4) {
        self.registers.accumulator = value;
        if let Some(observer) = self.shared.observer() {
            observer.on_acc_changed(value);
        }
    }

    /// Writes the auxiliary register and notifies the observer
    pub fn set_auxiliary(&mut self, value: Word4) {
        self.registers.auxiliary = value;
        if let Some(observer) = self.shared.observer() {
            observer.on_aux_changed(value);
        }
    }

    /// Writes the instruction pointer and notifies the observer.  Pointing
    /// past the end of the loaded program stops the processor.
    pub fn set_instruction_pointer(
        &mut self,
        value: Address,
        memory: &MemoryManager,
    ) {
        self.registers.instruction_pointer = value;
        if let Some(observer) = self.shared.observer() {
            observer.on_ip_changed(value);
        }
        if usize::from(value) >= memory.size() {
            self.shared.set_state(ProcessorState::Stopped);
        }
    }

    /// Stops the processor, cancelling any pending input wait
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Zeroes the registers and stops the processor
    pub fn reset(&mut self) {
        self.set_accumulator(Word4::ZERO);
        self.set_auxiliary(Word4::ZERO);
        self.registers.instruction_pointer = 0;
        if let Some(observer) = self.shared.observer() {
            observer.on_ip_changed(0);
        }
        self.shared.stop();
    }

    /// Executes instructions until the processor stops: a `HALT`, a fetch
    /// past the program end, a runtime error, or a `stop()` from a
    /// controller.  While an `INPUT` answer is pending the loop idles in
    /// short timed waits instead of fetching.
    ///
    /// # Errors
    ///
    /// Returns the [`CoreError`] of the instruction that failed; the
    /// processor is already stopped when it surfaces.
    pub fn run(&mut self, memory: &mut MemoryManager) -> CoreResult<()> {
        if self.state() != ProcessorState::PausedByIo {
            self.shared.set_state(ProcessorState::Running);
        }
        let result = loop {
            match self.state() {
                ProcessorState::Stopped => break Ok(()),
                ProcessorState::PausedByIo => {
                    if !self.try_finish_input(memory) {
                        thread::sleep(IO_POLL_INTERVAL);
                    }
                }
                ProcessorState::Running | ProcessorState::Paused => {
                    if let Err(error) = self.execute_instruction(memory) {
                        break Err(error);
                    }
                }
            }
        };
        self.shared.set_state(ProcessorState::Stopped);
        result
    }

    /// Executes one instruction, then suspends in `Paused` if the program
    /// has not ended.  A pending `INPUT` answer is applied as the step; an
    /// unanswered one leaves the processor in `PausedByIo`.
    ///
    /// # Errors
    ///
    /// Returns the [`CoreError`] of the instruction that failed; the
    /// processor is already stopped when it surfaces.
    pub fn step(&mut self, memory: &mut MemoryManager) -> CoreResult<()> {
        if self.state() == ProcessorState::PausedByIo {
            if self.try_finish_input(memory) && self.is_running() {
                self.shared.set_state(ProcessorState::Paused);
            }
            return Ok(());
        }
        self.shared.set_state(ProcessorState::Running);
        match self.execute_instruction(memory) {
            Ok(()) => {
                if self.is_running() {
                    self.shared.set_state(ProcessorState::Paused);
                }
                Ok(())
            }
            Err(error) => {
                self.shared.set_state(ProcessorState::Stopped);
                Err(error)
            }
        }
    }

    /// Applies a deposited input value if one is ready: accumulator write,
    /// IP advance, and the transition back to `Running`, all on this
    /// thread, and only while the processor still waits for I/O.
    fn try_finish_input(&mut self, memory: &MemoryManager) -> bool {
        let ready = {
            let mut pending = lock(&self.shared.pending_input);
            match *pending {
                PendingInput::Ready(value) => {
                    *pending = PendingInput::Idle;
                    Some(value)
                }
                PendingInput::Idle | PendingInput::Waiting => None,
            }
        };
        match ready {
            Some(value) if self.state() == ProcessorState::PausedByIo => {
                self.shared.set_state(ProcessorState::Running);
                self.set_accumulator(value);
                self.next_instruction(memory);
                true
            }
            _ => false,
        }
    }

    /// One round of the fetch-decode-execute loop.
    ///
    /// Operand resolution happens before dispatch: the encoded argument,
    /// dereferenced zero, one, or two times, becomes the auxiliary
    /// register.  `HALT` bypasses both decoding and resolution.
    fn execute_instruction(
        &mut self,
        memory: &mut MemoryManager,
    ) -> CoreResult<()> {
        let address = self.registers.instruction_pointer;
        let Ok((code, argument)) = memory.read_instruction(address) else {
            // Fetching past the end is normal termination
            self.shared.set_state(ProcessorState::Stopped);
            return Ok(());
        };
        if code == HALT_BYTE {
            self.shared.set_state(ProcessorState::Stopped);
            return Ok(());
        }
        let Some(decoded) = DecodedInstruction::decode(code) else {
            self.shared.set_state(ProcessorState::Stopped);
            return Err(CoreError::UnknownOpcode { code, address });
        };

        let operand = match decoded.arg_modifier {
            ArgModifier::None => argument,
            ArgModifier::Ref => memory.read_argument(argument.as_word()),
            ArgModifier::RefRef => {
                let target = memory.read_argument(argument.as_word());
                memory.read_argument(target.as_word())
            }
        };
        self.set_auxiliary(operand);

        self.dispatch(decoded, memory)
    }

    /// Executes one decoded instruction
    fn dispatch(
        &mut self,
        decoded: DecodedInstruction,
        memory: &mut MemoryManager,
    ) -> CoreResult<()> {
        let ty = decoded.type_modifier;
        match decoded.opcode {
            Opcode::Nope => {
                self.next_instruction(memory);
                Ok(())
            }
            Opcode::Add => self.arithmetic(alu::ArithOp::Add, ty, memory),
            Opcode::Sub => self.arithmetic(alu::ArithOp::Sub, ty, memory),
            Opcode::Mul => self.arithmetic(alu::ArithOp::Mul, ty, memory),
            Opcode::Div => self.arithmetic(alu::ArithOp::Div, ty, memory),
            Opcode::Mod => self.arithmetic(alu::ArithOp::Rem, ty, memory),
            Opcode::Load => {
                self.load(ty, memory);
                Ok(())
            }
            Opcode::Store => self.store(memory),
            Opcode::Input => {
                self.input(ty);
                Ok(())
            }
            Opcode::Output => {
                self.output(ty, memory);
                Ok(())
            }
            Opcode::Jump => {
                self.jump(memory);
                Ok(())
            }
            Opcode::Jns => self.jump_and_store(memory),
            Opcode::SkipLo => {
                self.skip(alu::Comparison::Lower, ty, memory);
                Ok(())
            }
            Opcode::SkipGt => {
                self.skip(alu::Comparison::Greater, ty, memory);
                Ok(())
            }
            Opcode::SkipEq => {
                self.skip(alu::Comparison::Equal, ty, memory);
                Ok(())
            }
            Opcode::Halt => {
                self.shared.set_state(ProcessorState::Stopped);
                Ok(())
            }
        }
    }

    /// Advances the instruction pointer by one slot
    fn next_instruction(&mut self, memory: &MemoryManager) {
        let next = self.registers.instruction_pointer.wrapping_add(1);
        self.set_instruction_pointer(next, memory);
    }

    /// Notifies the observer of a program write to an argument slot
    fn notify_memory_changed(&self, address: u32) {
        if let Some(observer) = self.shared.observer() {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "the write was already bounds-checked against the \
                          16-bit address space"
            )]
            let address = address as Address;
            observer.on_memory_changed(address);
        }
    }

    /// A ← A op B through the type lens, then advance
    fn arithmetic(
        &mut self,
        op: alu::ArithOp,
        type_modifier: TypeModifier,
        memory: &MemoryManager,
    ) -> CoreResult<()> {
        let result = alu::apply(
            op,
            type_modifier,
            self.registers.accumulator,
            self.registers.auxiliary,
        )?;
        self.set_accumulator(result);
        self.next_instruction(memory);
        Ok(())
    }

    /// A ← B through the type lens, then advance.  Only the byte lens
    /// narrows; the three word-width lenses carry the bits unchanged.
    fn load(&mut self, type_modifier: TypeModifier, memory: &MemoryManager) {
        let value = self.registers.auxiliary;
        let loaded = match type_modifier {
            TypeModifier::C => Word4::from(value.as_byte()),
            TypeModifier::W | TypeModifier::SW | TypeModifier::R => value,
        };
        self.set_accumulator(loaded);
        self.next_instruction(memory);
    }

    /// mem[B] ← A, then advance
    fn store(&mut self, memory: &mut MemoryManager) -> CoreResult<()> {
        let address = self.registers.auxiliary.as_word();
        memory.write_argument(self.registers.accumulator, address)?;
        self.notify_memory_changed(address);
        self.next_instruction(memory);
        Ok(())
    }

    /// Suspend and ask the I/O collaborator for one value.
    ///
    /// The callback only deposits the answer; the processor thread applies
    /// it via [`Processor::try_finish_input`].  Without an I/O endpoint the
    /// instruction has no effect.
    fn input(&mut self, type_modifier: TypeModifier) {
        let Some(io) = self.shared.io() else {
            return;
        };
        self.shared.set_state(ProcessorState::PausedByIo);
        *lock(&self.shared.pending_input) = PendingInput::Waiting;
        let shared = Arc::clone(&self.shared);
        io.input_request(
            type_modifier,
            Box::new(move |value| {
                let mut pending = lock(&shared.pending_input);
                // A cancelled or superseded request deposits nothing
                if *pending == PendingInput::Waiting {
                    *pending = PendingInput::Ready(value);
                }
            }),
        );
    }

    /// Emit A through the I/O collaborator, then advance
    fn output(&mut self, type_modifier: TypeModifier, memory: &MemoryManager) {
        if let Some(io) = self.shared.io() {
            io.output_request(self.registers.accumulator, type_modifier);
        }
        self.next_instruction(memory);
    }

    /// IP ← B.  The low 16 bits of the operand address the code space.
    fn jump(&mut self, memory: &MemoryManager) {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "the low 16 bits of the operand address the code space"
        )]
        let target = self.registers.auxiliary.as_word() as Address;
        self.set_instruction_pointer(target, memory);
    }

    /// Skip the next instruction when the predicate holds for (A, B)
    fn skip(
        &mut self,
        comparison: alu::Comparison,
        type_modifier: TypeModifier,
        memory: &MemoryManager,
    ) {
        let taken = alu::compare(
            comparison,
            type_modifier,
            self.registers.accumulator,
            self.registers.auxiliary,
        );
        if taken {
            let target = self.registers.instruction_pointer.wrapping_add(2);
            self.set_instruction_pointer(target, memory);
        } else {
            self.next_instruction(memory);
        }
    }

    /// mem[B] ← IP + 1, then IP ← B + 1.
    ///
    /// The stored return address is what makes the `Jump & target` return
    /// idiom work; re-running such self-modified programs is what
    /// `reset_data` exists for.
    fn jump_and_store(&mut self, memory: &mut MemoryManager) -> CoreResult<()> {
        let address = self.registers.auxiliary.as_word();
        let return_address =
            u32::from(self.registers.instruction_pointer).wrapping_add(1);
        memory.write_argument(Word4::from(return_address), address)?;
        self.notify_memory_changed(address);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "the low 16 bits of the operand address the code space"
        )]
        let target = address.wrapping_add(1) as Address;
        self.set_instruction_pointer(target, memory);
        Ok(())
    }
}
