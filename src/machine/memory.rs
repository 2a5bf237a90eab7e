//! Split instruction/data memory.
//!
//! The simulated machine keeps two independent address spaces: instruction
//! memory holds the program text one line per address, data memory holds
//! numeric words. Both are fixed-size and bounds-checked; an out-of-range
//! address is a hard error, never clamped.

use crate::machine::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default total memory size, split evenly between the two spaces.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// The machine's memory: instruction lines and data words, addressed
/// separately.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    instructions: Vec<String>,
    data: Vec<Word>,
}

impl Memory {
    /// Create a memory with `total` cells, split evenly between
    /// instruction and data space.
    pub fn new(total: usize) -> Self {
        Self::with_sizes(total / 2, total / 2)
    }

    /// Create a memory with explicit instruction/data space sizes.
    pub fn with_sizes(instruction_size: usize, data_size: usize) -> Self {
        Self {
            instructions: vec![String::new(); instruction_size],
            data: vec![0; data_size],
        }
    }

    /// Number of instruction memory slots.
    pub fn instruction_size(&self) -> usize {
        self.instructions.len()
    }

    /// Number of data memory words.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Read the instruction line at `addr`.
    ///
    /// Returns the empty string for a slot nothing was stored in; fetching
    /// distinguishes that case itself.
    pub fn load_instruction(&self, addr: i64) -> Result<&str, MemoryError> {
        let index = self.check(addr, self.instructions.len(), Space::Instruction)?;
        Ok(&self.instructions[index])
    }

    /// Store an instruction line at `addr`.
    pub fn store_instruction(&mut self, addr: i64, text: &str) -> Result<(), MemoryError> {
        let index = self.check(addr, self.instructions.len(), Space::Instruction)?;
        self.instructions[index] = text.to_string();
        Ok(())
    }

    /// Read the data word at `addr`.
    pub fn load_data(&self, addr: i64) -> Result<Word, MemoryError> {
        let index = self.check(addr, self.data.len(), Space::Data)?;
        Ok(self.data[index])
    }

    /// Write a data word at `addr`.
    pub fn store_data(&mut self, addr: i64, value: Word) -> Result<(), MemoryError> {
        let index = self.check(addr, self.data.len(), Space::Data)?;
        self.data[index] = value;
        Ok(())
    }

    /// Clear both spaces back to their initial state.
    pub fn clear(&mut self) {
        for slot in &mut self.instructions {
            slot.clear();
        }
        for word in &mut self.data {
            *word = 0;
        }
    }

    /// Read-only view of data memory, for display.
    pub fn data_cells(&self) -> &[Word] {
        &self.data
    }

    /// Read-only view of instruction memory, for display.
    pub fn instruction_lines(&self) -> &[String] {
        &self.instructions
    }

    fn check(&self, addr: i64, size: usize, space: Space) -> Result<usize, MemoryError> {
        if addr < 0 || addr as usize >= size {
            return Err(MemoryError::InvalidAddress { space, addr, size });
        }
        Ok(addr as usize)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded = self.instructions.iter().filter(|l| !l.is_empty()).count();
        let non_zero = self.data.iter().filter(|w| **w != 0).count();
        f.debug_struct("Memory")
            .field("instructions_loaded", &loaded)
            .field("instruction_size", &self.instructions.len())
            .field("non_zero_data", &non_zero)
            .field("data_size", &self.data.len())
            .finish()
    }
}

/// Which address space an access targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Space {
    Instruction,
    Data,
}

impl std::fmt::Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Space::Instruction => write!(f, "instruction"),
            Space::Data => write!(f, "data"),
        }
    }
}

/// Errors raised by memory accesses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("invalid {space} memory address {addr} (valid range 0..{size})")]
    InvalidAddress { space: Space, addr: i64, size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_read_write() {
        let mut mem = Memory::new(64);
        mem.store_data(10, 42).unwrap();
        assert_eq!(mem.load_data(10).unwrap(), 42);
    }

    #[test]
    fn instruction_read_write() {
        let mut mem = Memory::new(64);
        mem.store_instruction(0, "LOAD R1, 5").unwrap();
        assert_eq!(mem.load_instruction(0).unwrap(), "LOAD R1, 5");
        assert_eq!(mem.load_instruction(1).unwrap(), "");
    }

    #[test]
    fn split_sizes() {
        let mem = Memory::new(256);
        assert_eq!(mem.instruction_size(), 128);
        assert_eq!(mem.data_size(), 128);

        let mem = Memory::with_sizes(16, 4);
        assert_eq!(mem.instruction_size(), 16);
        assert_eq!(mem.data_size(), 4);
    }

    #[test]
    fn bounds_rejected_on_every_entry_point() {
        let mut mem = Memory::with_sizes(8, 8);

        assert!(mem.load_instruction(-1).is_err());
        assert!(mem.load_instruction(8).is_err());
        assert!(mem.store_instruction(-1, "X").is_err());
        assert!(mem.store_instruction(8, "X").is_err());
        assert!(mem.load_data(-1).is_err());
        assert!(mem.load_data(8).is_err());
        assert!(mem.store_data(-1, 0).is_err());
        assert!(mem.store_data(8, 0).is_err());

        // In-bounds edges are fine.
        assert!(mem.load_data(0).is_ok());
        assert!(mem.load_data(7).is_ok());
    }

    #[test]
    fn address_spaces_are_independent() {
        let mut mem = Memory::with_sizes(4, 4);
        mem.store_instruction(2, "ADD R1, R2").unwrap();
        mem.store_data(2, 99).unwrap();

        assert_eq!(mem.load_instruction(2).unwrap(), "ADD R1, R2");
        assert_eq!(mem.load_data(2).unwrap(), 99);
    }

    #[test]
    fn clear_resets_both_spaces() {
        let mut mem = Memory::with_sizes(4, 4);
        mem.store_instruction(0, "MOVE R1, R2").unwrap();
        mem.store_data(3, 7).unwrap();

        mem.clear();

        assert_eq!(mem.load_instruction(0).unwrap(), "");
        assert_eq!(mem.load_data(3).unwrap(), 0);
    }
}
