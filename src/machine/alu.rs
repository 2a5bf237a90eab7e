//! Arithmetic-logic unit.
//!
//! The ALU is a function of `(opcode, operand1, operand2)` to a value plus
//! the PSW flags; it keeps the last value and flags around for display but
//! carries no other state. Flag semantics are defined on the 32-bit bit
//! patterns of the operands regardless of the wider word the machine
//! computes with:
//!
//! - Carry: ADD/MUL set it when the result exceeds `0xFFFF_FFFF`; SUB sets
//!   it on borrow (`operand1 < operand2`).
//! - Overflow: ADD/SUB use the classic signed-overflow test on bit 31.
//!   MUL does not touch the overflow flag, so it keeps whatever the
//!   previous operation left there. That staleness is part of the machine's
//!   observable behavior and is kept as-is.
//! - Zero/Sign are recomputed from the final value after every operation.
//!
//! JPZ may produce no value at all (jump not taken); that is an explicit
//! absent result, not zero, and the Zero/Sign recomputation treats it as
//! neither zero nor negative.

use crate::machine::decode::Opcode;
use crate::machine::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const UNSIGNED_32_MAX: Word = 0xFFFF_FFFF;

/// The processor status word: four independent flags reflecting only the
/// most recent ALU result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub zero: bool,
    pub carry: bool,
    pub sign: bool,
    pub overflow: bool,
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Z={} C={} S={} O={}",
            self.zero as u8, self.carry as u8, self.sign as u8, self.overflow as u8
        )
    }
}

/// The arithmetic-logic unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alu {
    value: Option<Word>,
    flags: Flags,
}

/// Sign bit (bit 31) of a word's 32-bit pattern.
fn sign_bit(value: Word) -> bool {
    value as u32 & 0x8000_0000 != 0
}

/// Floor division, matching the semantics programs were written against.
fn floor_div(a: Word, b: Word) -> Word {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

impl Alu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute one operation.
    ///
    /// Operands arrive as resolved values; `None` means the operand token
    /// resolved to no value. Operands an opcode actually uses must be
    /// present, the rest are ignored (NOT only reads `operand2`, JP only
    /// `operand1`).
    pub fn execute(
        &mut self,
        opcode: Opcode,
        operand1: Option<Word>,
        operand2: Option<Word>,
    ) -> Result<Option<Word>, AluError> {
        let need = |operand: Option<Word>, which: &'static str| {
            operand.ok_or(AluError::MissingOperand { opcode, which })
        };

        self.flags.carry = false;
        // None here means "leave the overflow flag untouched" (MUL quirk).
        let mut overflow = Some(false);

        let value = match opcode {
            Opcode::Add => {
                let (a, b) = (need(operand1, "first")?, need(operand2, "second")?);
                let sum = a.wrapping_add(b);
                self.flags.carry = sum > UNSIGNED_32_MAX;
                overflow = Some(sign_bit(a) == sign_bit(b) && sign_bit(sum) != sign_bit(a));
                Some(sum)
            }
            Opcode::Sub => {
                let (a, b) = (need(operand1, "first")?, need(operand2, "second")?);
                let diff = a.wrapping_sub(b);
                self.flags.carry = a < b;
                overflow = Some(sign_bit(a) != sign_bit(b) && sign_bit(diff) != sign_bit(a));
                Some(diff)
            }
            Opcode::Mul => {
                let (a, b) = (need(operand1, "first")?, need(operand2, "second")?);
                let product = a.wrapping_mul(b);
                self.flags.carry = product > UNSIGNED_32_MAX;
                overflow = None;
                Some(product)
            }
            Opcode::Div => {
                let (a, b) = (need(operand1, "first")?, need(operand2, "second")?);
                // Division by zero is a defined outcome: value 0, Zero set.
                if b == 0 {
                    Some(0)
                } else {
                    Some(floor_div(a, b))
                }
            }
            Opcode::And => {
                let (a, b) = (need(operand1, "first")?, need(operand2, "second")?);
                Some(a & b)
            }
            Opcode::Or => {
                let (a, b) = (need(operand1, "first")?, need(operand2, "second")?);
                Some(a | b)
            }
            Opcode::Xor => {
                let (a, b) = (need(operand1, "first")?, need(operand2, "second")?);
                Some(a ^ b)
            }
            // NOT is unary on operand2; operand1 is ignored entirely.
            Opcode::Not => Some(!need(operand2, "second")?),
            // The jump target passes through; the engine decides what to
            // do with it.
            Opcode::Jp => Some(need(operand1, "first")?),
            Opcode::Jpz => {
                let (a, b) = (need(operand1, "first")?, need(operand2, "second")?);
                if b == 0 {
                    Some(a)
                } else {
                    None
                }
            }
            Opcode::Load | Opcode::Store | Opcode::Move => {
                return Err(AluError::NotAluOpcode(opcode));
            }
        };

        if let Some(o) = overflow {
            self.flags.overflow = o;
        }
        self.flags.zero = value == Some(0);
        self.flags.sign = matches!(value, Some(v) if v < 0);
        self.value = value;

        Ok(value)
    }

    /// The last computed value, if the last operation produced one.
    pub fn value(&self) -> Option<Word> {
        self.value
    }

    /// The current PSW flags.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Reset value and flags.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Errors raised by the ALU.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AluError {
    #[error("{opcode} is missing its {which} operand")]
    MissingOperand { opcode: Opcode, which: &'static str },

    #[error("{0} is not an ALU operation")]
    NotAluOpcode(Opcode),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn exec(alu: &mut Alu, opcode: Opcode, a: Word, b: Word) -> Option<Word> {
        alu.execute(opcode, Some(a), Some(b)).unwrap()
    }

    #[test]
    fn add_basic_flags() {
        let mut alu = Alu::new();

        assert_eq!(exec(&mut alu, Opcode::Add, 5, 3), Some(8));
        let f = alu.flags();
        assert!(!f.zero && !f.carry && !f.sign && !f.overflow);

        assert_eq!(exec(&mut alu, Opcode::Add, 5, -5), Some(0));
        assert!(alu.flags().zero);

        assert_eq!(exec(&mut alu, Opcode::Add, 2, -5), Some(-3));
        assert!(alu.flags().sign);
    }

    #[test]
    fn add_carry_past_unsigned_32_bits() {
        let mut alu = Alu::new();

        exec(&mut alu, Opcode::Add, 0xFFFF_FFFF, 0);
        assert!(!alu.flags().carry);

        exec(&mut alu, Opcode::Add, 0xFFFF_FFFF, 1);
        assert!(alu.flags().carry);
    }

    #[test]
    fn add_signed_overflow_at_boundaries() {
        let mut alu = Alu::new();

        // 0x7FFFFFFF + 1 flips the sign bit of the 32-bit pattern.
        exec(&mut alu, Opcode::Add, 0x7FFF_FFFF, 1);
        assert!(alu.flags().overflow);

        exec(&mut alu, Opcode::Add, 0x7FFF_FFFF, 0);
        assert!(!alu.flags().overflow);

        // Most negative plus most negative overflows too.
        exec(&mut alu, Opcode::Add, -0x8000_0000, -0x8000_0000);
        assert!(alu.flags().overflow);

        exec(&mut alu, Opcode::Add, -1, 1);
        assert!(!alu.flags().overflow);
    }

    #[test]
    fn sub_borrow_and_overflow() {
        let mut alu = Alu::new();

        exec(&mut alu, Opcode::Sub, 3, 5);
        assert!(alu.flags().carry);
        assert!(alu.flags().sign);

        exec(&mut alu, Opcode::Sub, 5, 3);
        assert!(!alu.flags().carry);

        exec(&mut alu, Opcode::Sub, -0x8000_0000, 1);
        assert!(alu.flags().overflow);

        exec(&mut alu, Opcode::Sub, 0x7FFF_FFFF, -1);
        assert!(alu.flags().overflow);
    }

    #[test]
    fn mul_leaves_overflow_stale() {
        let mut alu = Alu::new();

        // Set overflow with an ADD first.
        exec(&mut alu, Opcode::Add, 0x7FFF_FFFF, 1);
        assert!(alu.flags().overflow);

        // MUL recomputes carry but must not touch overflow.
        exec(&mut alu, Opcode::Mul, 2, 3);
        assert_eq!(alu.value(), Some(6));
        assert!(!alu.flags().carry);
        assert!(alu.flags().overflow, "MUL must keep the stale overflow");

        exec(&mut alu, Opcode::Mul, 0x1_0000_0000, 1);
        assert!(alu.flags().carry);
        assert!(alu.flags().overflow);
    }

    #[test]
    fn div_by_zero_is_defined() {
        let mut alu = Alu::new();
        for dividend in [-100, -1, 0, 1, 10, 0x7FFF_FFFF] {
            assert_eq!(exec(&mut alu, Opcode::Div, dividend, 0), Some(0));
            assert!(alu.flags().zero);
            assert!(!alu.flags().sign);
        }
    }

    #[test]
    fn div_is_floor_division() {
        let mut alu = Alu::new();
        assert_eq!(exec(&mut alu, Opcode::Div, 7, 2), Some(3));
        assert_eq!(exec(&mut alu, Opcode::Div, -7, 2), Some(-4));
        assert_eq!(exec(&mut alu, Opcode::Div, 7, -2), Some(-4));
        assert_eq!(exec(&mut alu, Opcode::Div, -7, -2), Some(3));
    }

    #[test]
    fn bitwise_operations() {
        let mut alu = Alu::new();
        assert_eq!(exec(&mut alu, Opcode::And, 0b1100, 0b1010), Some(0b1000));
        assert_eq!(exec(&mut alu, Opcode::Or, 0b1100, 0b1010), Some(0b1110));
        assert_eq!(exec(&mut alu, Opcode::Xor, 0b1100, 0b1010), Some(0b0110));
    }

    #[test]
    fn not_ignores_operand1() {
        let mut alu = Alu::new();
        let expected = !0b1010;
        for op1 in [-1000, 0, 1, 0x7FFF_FFFF] {
            assert_eq!(exec(&mut alu, Opcode::Not, op1, 0b1010), Some(expected));
        }
        // operand1 may even be absent.
        assert_eq!(
            alu.execute(Opcode::Not, None, Some(0)).unwrap(),
            Some(!0)
        );
    }

    #[test]
    fn jp_passes_target_through() {
        let mut alu = Alu::new();
        assert_eq!(alu.execute(Opcode::Jp, Some(7), None).unwrap(), Some(7));
    }

    #[test]
    fn jpz_not_taken_yields_no_value() {
        let mut alu = Alu::new();

        assert_eq!(exec(&mut alu, Opcode::Jpz, 7, 0), Some(7));
        assert!(!alu.flags().zero);

        let result = exec(&mut alu, Opcode::Jpz, 7, 1);
        assert_eq!(result, None);
        assert_eq!(alu.value(), None);
        // An absent value is neither zero nor negative.
        assert!(!alu.flags().zero);
        assert!(!alu.flags().sign);
    }

    #[test]
    fn missing_required_operand_is_an_error() {
        let mut alu = Alu::new();
        assert_eq!(
            alu.execute(Opcode::Add, Some(1), None),
            Err(AluError::MissingOperand {
                opcode: Opcode::Add,
                which: "second"
            })
        );
        assert_eq!(
            alu.execute(Opcode::Jp, None, Some(1)),
            Err(AluError::MissingOperand {
                opcode: Opcode::Jp,
                which: "first"
            })
        );
    }

    #[test]
    fn non_alu_opcodes_rejected() {
        let mut alu = Alu::new();
        for op in [Opcode::Load, Opcode::Store, Opcode::Move] {
            assert_eq!(
                alu.execute(op, Some(0), Some(0)),
                Err(AluError::NotAluOpcode(op))
            );
        }
    }

    proptest! {
        // ADD flags agree with 32-bit two's-complement arithmetic for any
        // operands within the signed 32-bit range.
        #[test]
        fn add_flags_match_i32_reference(a in i32::MIN..=i32::MAX, b in i32::MIN..=i32::MAX) {
            let mut alu = Alu::new();
            let value = exec(&mut alu, Opcode::Add, a as Word, b as Word).unwrap();

            prop_assert_eq!(value, a as Word + b as Word);
            prop_assert_eq!(alu.flags().overflow, a.checked_add(b).is_none());
            prop_assert_eq!(alu.flags().carry, (a as Word + b as Word) > 0xFFFF_FFFF);
            prop_assert_eq!(alu.flags().zero, value == 0);
            prop_assert_eq!(alu.flags().sign, value < 0);
        }

        #[test]
        fn sub_flags_match_i32_reference(a in i32::MIN..=i32::MAX, b in i32::MIN..=i32::MAX) {
            let mut alu = Alu::new();
            let value = exec(&mut alu, Opcode::Sub, a as Word, b as Word).unwrap();

            prop_assert_eq!(value, a as Word - b as Word);
            prop_assert_eq!(alu.flags().overflow, a.checked_sub(b).is_none());
            prop_assert_eq!(alu.flags().carry, a < b);
        }

        #[test]
        fn not_depends_only_on_operand2(a in any::<i32>(), a2 in any::<i32>(), b in any::<i32>()) {
            let mut alu = Alu::new();
            let first = exec(&mut alu, Opcode::Not, a as Word, b as Word);
            let second = exec(&mut alu, Opcode::Not, a2 as Word, b as Word);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first, Some(!(b as Word)));
        }

        #[test]
        fn div_by_zero_always_zero(a in any::<i32>()) {
            let mut alu = Alu::new();
            prop_assert_eq!(exec(&mut alu, Opcode::Div, a as Word, 0), Some(0));
            prop_assert!(alu.flags().zero);
        }
    }
}
