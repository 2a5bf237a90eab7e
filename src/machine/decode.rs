//! Instruction decoding.
//!
//! Programs are plain text, one instruction per line: a mnemonic followed
//! by up to two operand tokens separated by whitespace and/or commas, e.g.
//! `ADD R1, R2` or `LOAD R2, *R3`. Tokens are kept as raw strings at
//! decode time and only interpreted during operand resolution.

use crate::machine::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The instruction set: arithmetic/logic, jumps, and data movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Not,
    Xor,
    /// Unconditional jump; the ALU passes the target address through.
    Jp,
    /// Jump if operand2 is zero; produces no value otherwise.
    Jpz,
    Load,
    Store,
    Move,
}

impl Opcode {
    /// Every opcode, for exhaustive table tests.
    pub const ALL: [Opcode; 13] = [
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::And,
        Opcode::Or,
        Opcode::Not,
        Opcode::Xor,
        Opcode::Jp,
        Opcode::Jpz,
        Opcode::Load,
        Opcode::Store,
        Opcode::Move,
    ];

    /// Whether this opcode executes on the ALU. Jumps are included: they
    /// compute their target through the ALU like any arithmetic result.
    pub fn is_alu(self) -> bool {
        !matches!(self, Opcode::Load | Opcode::Store | Opcode::Move)
    }

    /// The instruction mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Xor => "XOR",
            Opcode::Jp => "JP",
            Opcode::Jpz => "JPZ",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Move => "MOVE",
        }
    }
}

impl std::str::FromStr for Opcode {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(Opcode::Add),
            "SUB" => Ok(Opcode::Sub),
            "MUL" => Ok(Opcode::Mul),
            "DIV" => Ok(Opcode::Div),
            "AND" => Ok(Opcode::And),
            "OR" => Ok(Opcode::Or),
            "NOT" => Ok(Opcode::Not),
            "XOR" => Ok(Opcode::Xor),
            "JP" => Ok(Opcode::Jp),
            "JPZ" => Ok(Opcode::Jpz),
            "LOAD" => Ok(Opcode::Load),
            "STORE" => Ok(Opcode::Store),
            "MOVE" => Ok(Opcode::Move),
            _ => Err(DecodeError::UnknownOpcode(s.to_string())),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction: opcode plus the two raw operand tokens.
///
/// Immutable once decoded; a fresh one is produced each cycle. A missing
/// token is kept as the empty string, which resolves to no value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: String,
    pub src: String,
}

impl Instruction {
    /// Decode one line of program text.
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let mut tokens = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty());

        let mnemonic = tokens.next().ok_or(DecodeError::EmptyLine)?;
        let opcode: Opcode = mnemonic.parse()?;
        let dest = tokens.next().unwrap_or("").to_string();
        let src = tokens.next().unwrap_or("").to_string();

        Ok(Self { opcode, dest, src })
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.dest.is_empty() {
            write!(f, " {}", self.dest)?;
        }
        if !self.src.is_empty() {
            write!(f, ", {}", self.src)?;
        }
        Ok(())
    }
}

/// Lexical form of an operand token, before any register lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandKind {
    /// `*NAME`: register-indirect, the register's value is a data address.
    Indirect(String),
    /// A decimal literal.
    Immediate(Word),
    /// A bare word, possibly a register name.
    Name(String),
    /// An empty token; resolves to no value.
    Missing,
}

/// Classify an operand token by its lexical shape alone. Whether a `Name`
/// is actually a register is decided against the register file at
/// resolution time.
pub fn classify(token: &str) -> OperandKind {
    if token.is_empty() {
        OperandKind::Missing
    } else if let Some(name) = token.strip_prefix('*') {
        OperandKind::Indirect(name.to_string())
    } else if token.bytes().all(|b| b.is_ascii_digit()) {
        // Only unsigned decimal literals; a literal too large for a word
        // falls back to being an ordinary name.
        match token.parse() {
            Ok(value) => OperandKind::Immediate(value),
            Err(_) => OperandKind::Name(token.to_string()),
        }
    } else {
        OperandKind::Name(token.to_string())
    }
}

/// Errors raised while decoding an instruction line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("empty instruction line")]
    EmptyLine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_two_operand_instruction() {
        let instr = Instruction::decode("ADD R1, R2").unwrap();
        assert_eq!(instr.opcode, Opcode::Add);
        assert_eq!(instr.dest, "R1");
        assert_eq!(instr.src, "R2");
    }

    #[test]
    fn decode_tolerates_separator_variants() {
        for line in ["LOAD R1, 5", "LOAD R1,5", "LOAD  R1  5", "LOAD\tR1,\t5"] {
            let instr = Instruction::decode(line).unwrap();
            assert_eq!(instr.opcode, Opcode::Load);
            assert_eq!(instr.dest, "R1");
            assert_eq!(instr.src, "5");
        }
    }

    #[test]
    fn decode_missing_tokens_become_empty() {
        let instr = Instruction::decode("JP R1").unwrap();
        assert_eq!(instr.dest, "R1");
        assert_eq!(instr.src, "");
    }

    #[test]
    fn decode_rejects_unknown_mnemonic() {
        assert_eq!(
            Instruction::decode("FROB R1, R2"),
            Err(DecodeError::UnknownOpcode("FROB".to_string()))
        );
        assert_eq!(Instruction::decode("   "), Err(DecodeError::EmptyLine));
    }

    #[test]
    fn mnemonic_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(op.mnemonic().parse::<Opcode>().unwrap(), op);
        }
    }

    #[test]
    fn classify_operand_forms() {
        assert_eq!(classify("*R3"), OperandKind::Indirect("R3".to_string()));
        assert_eq!(classify("42"), OperandKind::Immediate(42));
        assert_eq!(classify("R1"), OperandKind::Name("R1".to_string()));
        assert_eq!(classify("1x"), OperandKind::Name("1x".to_string()));
        assert_eq!(classify("-3"), OperandKind::Name("-3".to_string()));
        assert_eq!(classify(""), OperandKind::Missing);
    }

    #[test]
    fn alu_opcode_partition() {
        for op in Opcode::ALL {
            let routed_through_alu = !matches!(op, Opcode::Load | Opcode::Store | Opcode::Move);
            assert_eq!(op.is_alu(), routed_through_alu, "{op}");
        }
    }
}
