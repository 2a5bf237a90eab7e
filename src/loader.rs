//! Program loading.
//!
//! Programs are plain text, one instruction per line. The loader stores
//! lines into instruction memory at consecutive addresses starting at 0,
//! skipping blank lines without consuming an address. No validation is
//! done here; malformed lines surface as decode errors at fetch time.

use crate::machine::memory::{Memory, MemoryError};

/// Load instruction lines into `mem` and return how many were stored.
pub fn load_lines<I, S>(mem: &mut Memory, lines: I) -> Result<usize, MemoryError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut addr: i64 = 0;
    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        mem.store_instruction(addr, line)?;
        addr += 1;
    }
    Ok(addr as usize)
}

/// Load a program from whole source text.
pub fn load_source(mem: &mut Memory, source: &str) -> Result<usize, MemoryError> {
    load_lines(mem, source.lines())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_consecutively_from_zero() {
        let mut mem = Memory::new(32);
        let n = load_lines(&mut mem, ["LOAD R1, 5", "ADD R1, R1"]).unwrap();

        assert_eq!(n, 2);
        assert_eq!(mem.load_instruction(0).unwrap(), "LOAD R1, 5");
        assert_eq!(mem.load_instruction(1).unwrap(), "ADD R1, R1");
    }

    #[test]
    fn blank_lines_do_not_consume_addresses() {
        let mut mem = Memory::new(32);
        let n = load_source(&mut mem, "LOAD R1, 5\n\n  \t\nADD R1, R1\n\n").unwrap();

        assert_eq!(n, 2);
        assert_eq!(mem.load_instruction(1).unwrap(), "ADD R1, R1");
        assert_eq!(mem.load_instruction(2).unwrap(), "");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let mut mem = Memory::new(32);
        load_lines(&mut mem, ["   MOVE R1, R2   "]).unwrap();
        assert_eq!(mem.load_instruction(0).unwrap(), "MOVE R1, R2");
    }

    #[test]
    fn program_larger_than_instruction_memory_fails() {
        let mut mem = Memory::with_sizes(2, 2);
        let lines = ["LOAD R1, 1", "LOAD R2, 2", "LOAD R3, 3"];
        assert!(load_lines(&mut mem, lines).is_err());
    }
}
