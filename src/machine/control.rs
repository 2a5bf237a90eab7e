//! Control-signal generation.
//!
//! For each opcode the control unit produces a fixed vector of signals
//! describing which subsystems activate during the cycle. The engine
//! dispatches on this vector alone; it never re-inspects the opcode to
//! pick an execution path, so the two components cannot disagree.

use crate::machine::decode::Opcode;
use serde::{Deserialize, Serialize};

/// The control-signal vector for one instruction. Produced fresh per
/// cycle, never persisted.
///
/// `fetch`/`decode`/`execute` mark cycle-phase activity and are on for
/// every instruction. `alu_operation` carries the opcode to run on the
/// ALU, or nothing for pure data-movement instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSignals {
    pub fetch: bool,
    pub decode: bool,
    pub execute: bool,
    pub memory_read: bool,
    pub memory_write: bool,
    pub register_read: bool,
    pub register_write: bool,
    pub alu_operation: Option<Opcode>,
}

impl ControlSignals {
    /// Generate the signal vector for an opcode. Total over the opcode
    /// enum.
    pub fn generate(opcode: Opcode) -> Self {
        let mut signals = Self {
            fetch: true,
            decode: true,
            execute: true,
            memory_read: false,
            memory_write: false,
            register_read: false,
            register_write: false,
            alu_operation: None,
        };

        match opcode {
            Opcode::Load => {
                signals.memory_read = true;
                signals.register_write = true;
            }
            Opcode::Store => {
                signals.memory_write = true;
                signals.register_read = true;
            }
            Opcode::Move => {
                signals.register_read = true;
                signals.register_write = true;
            }
            // Everything else, jumps included, runs on the ALU.
            op => {
                signals.alu_operation = Some(op);
                signals.register_read = true;
                signals.register_write = true;
            }
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_signals_always_on() {
        for op in Opcode::ALL {
            let s = ControlSignals::generate(op);
            assert!(s.fetch && s.decode && s.execute, "{op}");
        }
    }

    #[test]
    fn alu_opcodes_carry_their_operation() {
        for op in Opcode::ALL.into_iter().filter(|op| op.is_alu()) {
            let s = ControlSignals::generate(op);
            assert_eq!(s.alu_operation, Some(op));
            assert!(s.register_read && s.register_write, "{op}");
            assert!(!s.memory_read && !s.memory_write, "{op}");
        }
    }

    #[test]
    fn jumps_route_through_the_alu() {
        assert_eq!(
            ControlSignals::generate(Opcode::Jp).alu_operation,
            Some(Opcode::Jp)
        );
        assert_eq!(
            ControlSignals::generate(Opcode::Jpz).alu_operation,
            Some(Opcode::Jpz)
        );
    }

    #[test]
    fn load_signals() {
        let s = ControlSignals::generate(Opcode::Load);
        assert_eq!(s.alu_operation, None);
        assert!(s.memory_read);
        assert!(!s.memory_write);
        assert!(s.register_write);
    }

    #[test]
    fn store_signals() {
        let s = ControlSignals::generate(Opcode::Store);
        assert_eq!(s.alu_operation, None);
        assert!(s.memory_write);
        assert!(!s.memory_read);
        assert!(s.register_read);
    }

    #[test]
    fn move_signals_touch_registers_only() {
        let s = ControlSignals::generate(Opcode::Move);
        assert_eq!(s.alu_operation, None);
        assert!(s.register_read && s.register_write);
        assert!(!s.memory_read && !s.memory_write);
    }
}
