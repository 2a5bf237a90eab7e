//! Register bank and special registers.
//!
//! The machine has a fixed set of general-purpose registers (default
//! `R1`..`R8`) plus four special registers with reserved roles:
//! - PC: program counter, address of the next instruction to fetch
//! - MAR: memory address register, mirrors the address in flight
//! - IR: instruction register, holds the most recently fetched text
//! - MBR: memory buffer register, mirrors the datum in flight
//!
//! IR and MBR are observability registers: the engine keeps them updated
//! for display but never reads them back during computation.

use crate::machine::Word;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default general-purpose register names.
pub const DEFAULT_REGISTERS: [&str; 8] = ["R1", "R2", "R3", "R4", "R5", "R6", "R7", "R8"];

/// The register file: general-purpose bank plus the special registers.
///
/// The general-purpose name set is fixed at construction; registers are
/// never added or removed afterwards, only overwritten.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterFile {
    general: BTreeMap<String, Word>,

    /// Program counter.
    pub pc: usize,
    /// Memory address register.
    pub mar: usize,
    /// Instruction register (fetched instruction text).
    pub ir: String,
    /// Memory buffer register (last datum or instruction in flight).
    pub mbr: String,
}

impl RegisterFile {
    /// Create a register file with the default general-purpose names.
    pub fn new() -> Self {
        Self::with_registers(DEFAULT_REGISTERS)
    }

    /// Create a register file with a custom general-purpose name set.
    pub fn with_registers<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            general: names.into_iter().map(|n| (n.into(), 0)).collect(),
            pc: 0,
            mar: 0,
            ir: String::new(),
            mbr: String::new(),
        }
    }

    /// Whether `name` is a general-purpose register in this file.
    pub fn contains(&self, name: &str) -> bool {
        self.general.contains_key(name)
    }

    /// Read a general-purpose register, or `None` if `name` is not one.
    pub fn lookup(&self, name: &str) -> Option<Word> {
        self.general.get(name).copied()
    }

    /// Read a general-purpose register.
    pub fn get(&self, name: &str) -> Result<Word, RegisterError> {
        self.general
            .get(name)
            .copied()
            .ok_or_else(|| RegisterError::Unknown(name.to_string()))
    }

    /// Overwrite a general-purpose register.
    pub fn set(&mut self, name: &str, value: Word) -> Result<(), RegisterError> {
        match self.general.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RegisterError::Unknown(name.to_string())),
        }
    }

    /// Read-only view of the general-purpose bank, for display.
    pub fn general_registers(&self) -> &BTreeMap<String, Word> {
        &self.general
    }

    /// Increment the program counter by 1 and mirror it into MAR.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> usize {
        let old = self.pc;
        self.pc += 1;
        self.mar = self.pc;
        old
    }

    /// Reset every register, keeping the general-purpose name set.
    pub fn reset(&mut self) {
        for value in self.general.values_mut() {
            *value = 0;
        }
        self.pc = 0;
        self.mar = 0;
        self.ir.clear();
        self.mbr.clear();
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised by register access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("unknown register '{0}'")]
    Unknown(String),
}
