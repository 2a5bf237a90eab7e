//! The simulated machine.
//!
//! This module implements the whole instruction-cycle core:
//! - split instruction/data memory, bounds-checked
//! - a fixed register bank plus the PC/MAR/IR/MBR special registers
//! - the ALU with its Zero/Carry/Sign/Overflow status flags
//! - control-signal generation and the dispatch driven by it
//! - the fetch → decode → resolve → execute engine

pub mod alu;
pub mod control;
pub mod decode;
pub mod execute;
pub mod memory;
pub mod registers;

/// The machine's word: registers and data memory hold signed 64-bit
/// values, wide enough that the 32-bit flag semantics can observe results
/// outside the 32-bit range.
pub type Word = i64;

pub use alu::{Alu, AluError, Flags};
pub use control::ControlSignals;
pub use decode::{DecodeError, Instruction, Opcode};
pub use execute::{Machine, MachineError};
pub use memory::{Memory, MemoryError};
pub use registers::{RegisterFile, RegisterError};
