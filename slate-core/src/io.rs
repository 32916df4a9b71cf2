use slate::{TypeModifier, Word4};

/// One-shot continuation handed out by an `INPUT` instruction.
///
/// The I/O collaborator must invoke it exactly once with the user's value,
/// encoded according to the requested type.  It may be invoked from any
/// thread; invoking it after the processor stopped or moved on is harmless.
pub type InputCallback = Box<dyn FnOnce(Word4) + Send + 'static>;

/// The processor's window to the outside world.
///
/// `INPUT` and `OUTPUT` instructions are delegated here; the host decides
/// whether that means a console, a GUI widget, or a test harness.
pub trait ProcessorIo: Send + Sync {
    /// Asynchronously request one value of the given type.
    ///
    /// The processor suspends (`PausedByIo`) until `callback` has been
    /// invoked, or until it is stopped.
    fn input_request(
        &self,
        type_modifier: TypeModifier,
        callback: InputCallback,
    );

    /// Emit one value of the given type.
    ///
    /// Must not block; a collaborator that cannot deliver immediately is
    /// expected to buffer.
    fn output_request(&self, value: Word4, type_modifier: TypeModifier);
}
