//! # fetchex
//!
//! A didactic fetch-decode-execute simulator for a small accumulator-style
//! CPU. Programs are plain-text assembly lines (`LOAD R1, 5`,
//! `ADD R1, R2`, `LOAD R2, *R3`); the machine steps them through a full
//! instruction cycle, updating a fixed register bank, split
//! instruction/data memory, and the Zero/Carry/Sign/Overflow status flags.

pub mod loader;
pub mod machine;

// Re-export commonly used types
pub use machine::{
    ControlSignals, Flags, Instruction, Machine, MachineError, Memory, Opcode, RegisterFile, Word,
};
