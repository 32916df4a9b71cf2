use slate::{Address, Word4};

use crate::processor::ProcessorState;

/// Receives a notification after every visible mutation the processor
/// performs: register writes, memory writes, and lifecycle transitions.
///
/// Hosts use this to keep register views, memory views, and run controls in
/// sync while a program executes.  Every method has an empty default body,
/// so an implementation overrides only what it needs.  Notifications are
/// delivered on whichever thread performed the mutation (usually the thread
/// inside `run`/`step`, but a `stop()` from another thread notifies from
/// there), so implementations must be callable from any of them.
pub trait ProcessorObserver: Send + Sync {
    /// The instruction pointer changed
    fn on_ip_changed(&self, _instruction_pointer: Address) {}

    /// The accumulator changed
    fn on_acc_changed(&self, _accumulator: Word4) {}

    /// The auxiliary register changed
    fn on_aux_changed(&self, _auxiliary: Word4) {}

    /// A program write changed the argument slot at `address`
    fn on_memory_changed(&self, _address: Address) {}

    /// The lifecycle state changed
    fn on_state_changed(&self, _state: ProcessorState) {}
}
