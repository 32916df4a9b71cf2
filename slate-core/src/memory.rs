use slate::{
    Address, AddressToSourceMap, SourceToAddressMap, Word4, INSTRUCTION_SIZE,
    MEMORY_SIZE,
};

use crate::error::{CoreError, CoreResult};

/// The program image: code and data in one address space.
///
/// Two parallel columns are indexed by instruction address, one opcode byte
/// and one [`Word4`] argument per slot.  Programs deliberately self-modify
/// (`STORE` and `JNS` write into argument slots), so a third column keeps
/// the arguments exactly as loaded, and [`MemoryManager::reset_data`]
/// reverts to them without re-assembling.
#[derive(Debug, Default)]
pub struct MemoryManager {
    /// Packed opcode byte per instruction slot
    opcodes: Vec<u8>,
    /// Argument word per instruction slot, mutated by running programs
    arguments: Vec<Word4>,
    /// Snapshot of `arguments` taken at load time, written only by `load`
    arguments_original: Vec<Word4>,
    /// Debug map from 1-based source line to instruction address
    source_map: SourceToAddressMap,
    /// Inverse of `source_map`, derived at load time
    address_map: AddressToSourceMap,
}

impl MemoryManager {
    /// An empty memory with no program loaded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a flat bytecode stream of 5-byte records.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BadImage`] if the stream length is not a
    /// multiple of the instruction size or describes more instructions than
    /// the address space holds.  Validation happens before any state is
    /// touched, so a failed load retains the previous image.
    pub fn load(&mut self, bytecode: &[u8]) -> CoreResult<()> {
        self.load_with_debug(bytecode, SourceToAddressMap::new())
    }

    /// Loads a bytecode stream together with its source-line map, deriving
    /// the address-to-line inverse for debugger stepping.
    ///
    /// # Errors
    ///
    /// As [`MemoryManager::load`].
    pub fn load_with_debug(
        &mut self,
        bytecode: &[u8],
        source_map: SourceToAddressMap,
    ) -> CoreResult<()> {
        if bytecode.len() % INSTRUCTION_SIZE != 0 {
            return Err(CoreError::BadImage(
                "length is not a multiple of the instruction size",
            ));
        }
        if bytecode.len() / INSTRUCTION_SIZE > MEMORY_SIZE {
            return Err(CoreError::BadImage(
                "more instructions than the address space holds",
            ));
        }

        self.opcodes.clear();
        self.arguments.clear();
        for record in bytecode.chunks_exact(INSTRUCTION_SIZE) {
            let &[code, a0, a1, a2, a3] = record else {
                // chunks_exact only yields full records
                continue;
            };
            self.opcodes.push(code);
            self.arguments.push(Word4::from_le_bytes([a0, a1, a2, a3]));
        }
        self.arguments_original = self.arguments.clone();
        self.address_map = source_map
            .iter()
            .map(|(&line, &address)| (address, line))
            .collect();
        self.source_map = source_map;
        Ok(())
    }

    /// The opcode byte and argument stored at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] past the end of the program; the
    /// processor treats that as normal termination.
    pub fn read_instruction(&self, address: Address) -> CoreResult<(u8, Word4)> {
        let index = usize::from(address);
        match (self.opcodes.get(index), self.arguments.get(index)) {
            (Some(&code), Some(&argument)) => Ok((code, argument)),
            _ => Err(CoreError::OutOfRange(u32::from(address))),
        }
    }

    /// Writes a whole instruction slot, growing the image as needed.
    ///
    /// Used by tests and tooling; running programs only ever write argument
    /// slots.
    pub fn write_instruction(
        &mut self,
        code: u8,
        argument: Word4,
        address: Address,
    ) {
        let index = usize::from(address);
        self.grow_to(index.saturating_add(1));
        if let Some(slot) = self.opcodes.get_mut(index) {
            *slot = code;
        }
        if let Some(slot) = self.arguments.get_mut(index) {
            *slot = argument;
        }
    }

    /// Writes the argument slot at `address`, growing the image as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] for addresses past the 16-bit
    /// address space.
    pub fn write_argument(
        &mut self,
        argument: Word4,
        address: u32,
    ) -> CoreResult<()> {
        let Ok(index) = usize::try_from(address) else {
            return Err(CoreError::OutOfRange(address));
        };
        if index >= MEMORY_SIZE {
            return Err(CoreError::OutOfRange(address));
        }
        self.grow_to(index.saturating_add(1));
        if let Some(slot) = self.arguments.get_mut(index) {
            *slot = argument;
        }
        Ok(())
    }

    /// The argument slot at `address`, or zero past the end of the image.
    ///
    /// The tolerant read is what lets programs treat unwritten slots as
    /// zero-initialized data cells.
    #[must_use]
    pub fn read_argument(&self, address: u32) -> Word4 {
        usize::try_from(address)
            .ok()
            .and_then(|index| self.arguments.get(index))
            .copied()
            .unwrap_or(Word4::ZERO)
    }

    /// Discards the program, the snapshot, and the debug maps
    pub fn reset(&mut self) {
        self.opcodes.clear();
        self.arguments.clear();
        self.arguments_original.clear();
        self.source_map.clear();
        self.address_map.clear();
    }

    /// Reverts every argument slot to its load-time value, leaving opcodes
    /// untouched.  Slots grown after load revert to zero, keeping the
    /// opcode and argument columns the same length.
    pub fn reset_data(&mut self) {
        self.arguments = self.arguments_original.clone();
        self.arguments.resize(self.opcodes.len(), Word4::ZERO);
    }

    /// Number of loaded instruction slots
    #[must_use]
    pub fn size(&self) -> usize {
        self.opcodes.len()
    }

    /// The source line that produced the instruction at `address`, if the
    /// program was loaded with debug information
    #[must_use]
    pub fn source_line(&self, address: Address) -> Option<u32> {
        self.address_map.get(&address).copied()
    }

    /// The instruction address produced by the 1-based source line, if the
    /// program was loaded with debug information
    #[must_use]
    pub fn address_of_line(&self, line: u32) -> Option<Address> {
        self.source_map.get(&line).copied()
    }

    /// Extends both columns with zeroed slots up to `len`
    fn grow_to(&mut self, len: usize) {
        if self.opcodes.len() < len {
            self.opcodes.resize(len, 0);
            self.arguments.resize(len, Word4::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;

    use super::*;

    /// A well-formed two-instruction image
    const IMAGE: [u8; 10] = [0x18, 1, 0, 0, 0, 0xFF, 0, 0, 0, 0];

    #[test]
    fn load_and_read_back() {
        let mut memory = MemoryManager::new();
        memory.load(&IMAGE).unwrap();
        assert_eq!(memory.size(), 2);
        assert_eq!(
            memory.read_instruction(0),
            Ok((0x18, Word4::from(1u32)))
        );
        assert_eq!(memory.read_instruction(1), Ok((0xFF, Word4::ZERO)));
        assert_eq!(memory.read_instruction(2), Err(CoreError::OutOfRange(2)));
    }

    #[test]
    fn load_rejects_ragged_streams() {
        let mut memory = MemoryManager::new();
        assert!(matches!(
            memory.load(&[1, 2, 3]),
            Err(CoreError::BadImage(_))
        ));
    }

    #[test]
    fn failed_load_retains_previous_image() {
        let mut memory = MemoryManager::new();
        memory.load(&IMAGE).unwrap();
        assert!(memory.load(&[1, 2, 3]).is_err());
        assert_eq!(memory.size(), 2);
        assert_eq!(memory.read_instruction(0), Ok((0x18, Word4::from(1u32))));
    }

    #[test]
    fn argument_write_read_identity() {
        let mut memory = MemoryManager::new();
        for address in [0u32, 1, 255, 9000, 65_535] {
            let value = Word4::from(address.wrapping_mul(2_654_435_761));
            memory.write_argument(value, address).unwrap();
            assert_eq!(memory.read_argument(address), value);
        }
    }

    #[test]
    fn argument_write_rejects_the_address_space_end() {
        let mut memory = MemoryManager::new();
        assert_eq!(
            memory.write_argument(Word4::ZERO, 65_536),
            Err(CoreError::OutOfRange(65_536))
        );
    }

    #[test]
    fn reads_past_the_end_are_zero() {
        let mut memory = MemoryManager::new();
        memory.load(&IMAGE).unwrap();
        assert_eq!(memory.read_argument(2), Word4::ZERO);
        assert_eq!(memory.read_argument(u32::MAX), Word4::ZERO);
    }

    #[test]
    fn columns_stay_parallel_after_growth() {
        let mut memory = MemoryManager::new();
        memory.load(&IMAGE).unwrap();
        memory.write_argument(Word4::from(7u32), 10).unwrap();
        assert_eq!(memory.size(), 11);
        // The grown opcode slots fetch as instructions, not as garbage
        assert_eq!(memory.read_instruction(5), Ok((0, Word4::ZERO)));
    }

    #[test]
    fn reset_data_restores_the_snapshot() {
        let mut memory = MemoryManager::new();
        memory.load(&IMAGE).unwrap();
        memory.write_argument(Word4::from(42u32), 0).unwrap();
        memory.write_argument(Word4::from(42u32), 6).unwrap();
        memory.reset_data();
        assert_eq!(memory.read_argument(0), Word4::from(1u32));
        // Slots grown after load revert to zero, columns stay parallel
        assert_eq!(memory.read_argument(6), Word4::ZERO);
        assert_eq!(memory.size(), 7);
    }

    #[test]
    fn reset_discards_everything() {
        let mut memory = MemoryManager::new();
        let map = SourceToAddressMap::from([(1, 0), (2, 1)]);
        memory.load_with_debug(&IMAGE, map).unwrap();
        memory.reset();
        assert_eq!(memory.size(), 0);
        assert_eq!(memory.source_line(0), None);
    }

    #[test]
    fn debug_maps_answer_both_directions() {
        let mut memory = MemoryManager::new();
        let map = SourceToAddressMap::from([(3, 0), (5, 1)]);
        memory.load_with_debug(&IMAGE, map).unwrap();
        assert_eq!(memory.source_line(0), Some(3));
        assert_eq!(memory.source_line(1), Some(5));
        assert_eq!(memory.address_of_line(5), Some(1));
        assert_eq!(memory.address_of_line(4), None);
    }

    #[test]
    fn write_instruction_grows_the_image() {
        let mut memory = MemoryManager::new();
        memory.write_instruction(0x18, Word4::from(9u32), 256);
        assert_eq!(memory.size(), 257);
        assert_eq!(memory.read_instruction(256), Ok((0x18, Word4::from(9u32))));
        assert_eq!(memory.read_instruction(0), Ok((0, Word4::ZERO)));
    }
}
