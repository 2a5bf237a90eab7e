//! The instruction-cycle engine.
//!
//! [`Machine`] owns the register file, memory, and ALU, and runs the
//! fetch → decode → resolve → dispatch → writeback cycle. One call to
//! [`Machine::step`] is one full cycle; [`Machine::run`] steps until the
//! program counter runs past the last loaded instruction.
//!
//! A failed cycle aborts with a typed error and leaves the machine as of
//! the last completed phase. There is no transaction boundary: writes
//! already performed (the PC increment included) stay in place.

use crate::machine::alu::{Alu, AluError, Flags};
use crate::machine::control::ControlSignals;
use crate::machine::decode::{classify, DecodeError, Instruction, Opcode, OperandKind};
use crate::machine::memory::{Memory, MemoryError};
use crate::machine::registers::RegisterFile;
use crate::machine::Word;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The simulated machine: registers, split memory, ALU, and the cycle
/// engine that drives them. All state mutation goes through here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Register file (general-purpose bank plus PC/MAR/IR/MBR).
    pub regs: RegisterFile,
    /// Instruction and data memory.
    pub mem: Memory,
    alu: Alu,
    /// Number of instructions loaded; `run` stops when PC reaches this.
    program_len: usize,
    /// Cycles executed since construction or reset.
    cycles: u64,
    last_instr: Option<Instruction>,
    last_signals: Option<ControlSignals>,
    last_alu_expr: Option<String>,
}

fn operand_display(value: Option<Word>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

impl Machine {
    /// Create a machine with the default register set and memory size.
    pub fn new() -> Self {
        Self::with_parts(RegisterFile::new(), Memory::default())
    }

    /// Create a machine from an explicit register file and memory.
    pub fn with_parts(regs: RegisterFile, mem: Memory) -> Self {
        Self {
            regs,
            mem,
            alu: Alu::new(),
            program_len: 0,
            cycles: 0,
            last_instr: None,
            last_signals: None,
            last_alu_expr: None,
        }
    }

    /// Load a program into instruction memory, one line per address
    /// starting at 0. Blank lines are skipped without consuming an
    /// address. Returns the number of instructions loaded.
    pub fn load_program<I, S>(&mut self, lines: I) -> Result<usize, MachineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.program_len = crate::loader::load_lines(&mut self.mem, lines)?;
        debug!("loaded {} instructions", self.program_len);
        Ok(self.program_len)
    }

    /// Load a program from whole source text (see [`load_program`]).
    ///
    /// [`load_program`]: Machine::load_program
    pub fn load_source(&mut self, source: &str) -> Result<usize, MachineError> {
        self.load_program(source.lines())
    }

    /// Execute one full instruction cycle.
    pub fn step(&mut self) -> Result<Instruction, MachineError> {
        // FETCH: the instruction text at PC, with MAR mirroring the
        // address in flight.
        let pc = self.regs.pc;
        self.regs.mar = pc;
        let text = self.mem.load_instruction(pc as i64)?.to_string();
        if text.trim().is_empty() {
            return Err(MachineError::NoInstruction { addr: pc });
        }
        trace!("fetch @{pc}: {text}");

        // DECODE: split into opcode + raw tokens, expose the text through
        // IR/MBR, and advance PC. Branches that want to redirect control
        // would have to overwrite PC after this point.
        let instr = Instruction::decode(&text)
            .map_err(|source| MachineError::Decode { addr: pc, source })?;
        self.regs.ir = text.clone();
        self.regs.mbr = text;
        self.regs.advance_pc();

        // RESOLVE both operand tokens to values.
        let dest_value = self.resolve_dest(&instr)?;
        let src_value = self.resolve_src(&instr)?;
        trace!(
            "resolve {}: dest={} src={}",
            instr,
            operand_display(dest_value),
            operand_display(src_value)
        );

        // DISPATCH on the control-signal vector alone.
        let signals = ControlSignals::generate(instr.opcode);
        if let Some(alu_op) = signals.alu_operation {
            self.execute_alu(alu_op, &instr, dest_value, src_value)?;
        } else if signals.memory_read {
            self.execute_load(&instr, src_value)?;
        } else if signals.memory_write {
            self.execute_store(&instr, dest_value, src_value)?;
        } else {
            self.execute_move(&instr)?;
        }

        self.last_signals = Some(signals);
        self.cycles += 1;
        self.last_instr = Some(instr.clone());
        debug!("executed {instr} ({})", self.alu.flags());

        Ok(instr)
    }

    /// Run until PC passes the last loaded instruction. Returns the
    /// number of cycles executed.
    pub fn run(&mut self) -> Result<u64, MachineError> {
        let start = self.cycles;
        while self.regs.pc < self.program_len {
            self.step()?;
        }
        Ok(self.cycles - start)
    }

    /// Run for at most `max_cycles` cycles.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, MachineError> {
        let start = self.cycles;
        let limit = self.cycles + max_cycles;
        while self.regs.pc < self.program_len && self.cycles < limit {
            self.step()?;
        }
        Ok(self.cycles - start)
    }

    /// Reset registers, memory, ALU, and counters; the loaded program is
    /// discarded.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.alu.reset();
        self.program_len = 0;
        self.cycles = 0;
        self.last_instr = None;
        self.last_signals = None;
        self.last_alu_expr = None;
    }

    // ---- execution paths -------------------------------------------------

    /// ALU path: arithmetic, logic, and jumps. The result, when there is
    /// one, lands in the register named by `dest` — jumps included: the
    /// computed target is written there, never into PC, and control falls
    /// through to the sequential PC already advanced during decode.
    fn execute_alu(
        &mut self,
        alu_op: Opcode,
        instr: &Instruction,
        dest_value: Option<Word>,
        src_value: Option<Word>,
    ) -> Result<(), MachineError> {
        let result = self.alu.execute(alu_op, dest_value, src_value)?;
        self.last_alu_expr = Some(format!(
            "{} {} {} = {}",
            operand_display(dest_value),
            alu_op,
            operand_display(src_value),
            operand_display(result)
        ));
        if let Some(value) = result {
            self.write_register(&instr.dest, value, instr.opcode)?;
        }
        Ok(())
    }

    /// LOAD: for a `*R` source re-read data memory at the indirect
    /// address, otherwise use the already-resolved source value; the
    /// datum goes through MBR into the destination register.
    fn execute_load(
        &mut self,
        instr: &Instruction,
        src_value: Option<Word>,
    ) -> Result<(), MachineError> {
        let value = match classify(&instr.src) {
            OperandKind::Indirect(name) => {
                let addr = self.read_register(&name, instr.opcode)?;
                self.mem.load_data(addr)?
            }
            _ => src_value.ok_or_else(|| MachineError::MissingOperand {
                opcode: instr.opcode,
                token: instr.src.clone(),
            })?,
        };
        self.regs.mbr = value.to_string();
        self.write_register(&instr.dest, value, instr.opcode)
    }

    /// STORE: operand roles are swapped relative to LOAD — the address
    /// comes from the resolved `src` value and the datum from the
    /// resolved `dest` value.
    fn execute_store(
        &mut self,
        instr: &Instruction,
        dest_value: Option<Word>,
        src_value: Option<Word>,
    ) -> Result<(), MachineError> {
        let addr = src_value.ok_or_else(|| MachineError::MissingOperand {
            opcode: instr.opcode,
            token: instr.src.clone(),
        })?;
        let datum = dest_value.ok_or_else(|| MachineError::MissingOperand {
            opcode: instr.opcode,
            token: instr.dest.clone(),
        })?;
        self.mem.store_data(addr, datum)?;
        self.regs.mbr = datum.to_string();
        Ok(())
    }

    /// MOVE: re-reads `src` as a register name directly, ignoring the
    /// generic resolution, and copies its current value into `dest`.
    fn execute_move(&mut self, instr: &Instruction) -> Result<(), MachineError> {
        let value = self.read_register(&instr.src, instr.opcode)?;
        self.write_register(&instr.dest, value, instr.opcode)
    }

    // ---- operand resolution ----------------------------------------------

    /// Resolve the `dest` token by register-direct lookup. Fails for a
    /// token that is not a register name, except for opcodes that ignore
    /// their first operand (NOT), where it resolves to no value.
    fn resolve_dest(&self, instr: &Instruction) -> Result<Option<Word>, MachineError> {
        if let OperandKind::Name(name) = classify(&instr.dest) {
            if let Some(value) = self.regs.lookup(&name) {
                return Ok(Some(value));
            }
        }
        if instr.opcode == Opcode::Not {
            return Ok(None);
        }
        Err(MachineError::UnknownRegister {
            name: instr.dest.clone(),
            opcode: instr.opcode,
        })
    }

    /// Resolve the `src` token by the addressing rules: `*R` is a
    /// register-indirect data load, a digit string is an immediate, a
    /// register name reads that register, anything else is no value.
    fn resolve_src(&self, instr: &Instruction) -> Result<Option<Word>, MachineError> {
        match classify(&instr.src) {
            OperandKind::Indirect(name) => {
                let addr = self.read_register(&name, instr.opcode)?;
                Ok(Some(self.mem.load_data(addr)?))
            }
            OperandKind::Immediate(value) => Ok(Some(value)),
            OperandKind::Name(name) => Ok(self.regs.lookup(&name)),
            OperandKind::Missing => Ok(None),
        }
    }

    fn read_register(&self, name: &str, opcode: Opcode) -> Result<Word, MachineError> {
        self.regs
            .lookup(name)
            .ok_or_else(|| MachineError::UnknownRegister {
                name: name.to_string(),
                opcode,
            })
    }

    fn write_register(&mut self, name: &str, value: Word, opcode: Opcode) -> Result<(), MachineError> {
        self.regs
            .set(name, value)
            .map_err(|_| MachineError::UnknownRegister {
                name: name.to_string(),
                opcode,
            })
    }

    // ---- presentation queries --------------------------------------------

    /// The current PSW flags.
    pub fn flags(&self) -> Flags {
        self.alu.flags()
    }

    /// The ALU's last value, if its last operation produced one.
    pub fn alu_value(&self) -> Option<Word> {
        self.alu.value()
    }

    /// The last ALU expression in `a OP b = r` form, for display.
    pub fn last_alu_expression(&self) -> Option<&str> {
        self.last_alu_expr.as_deref()
    }

    /// The control-signal vector of the last executed instruction.
    pub fn last_signals(&self) -> Option<ControlSignals> {
        self.last_signals
    }

    /// The last executed instruction.
    pub fn last_instruction(&self) -> Option<&Instruction> {
        self.last_instr.as_ref()
    }

    /// Number of instructions currently loaded.
    pub fn program_len(&self) -> usize {
        self.program_len
    }

    /// Cycles executed since construction or reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that abort an instruction cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("no instruction at address {addr}")]
    NoInstruction { addr: usize },

    #[error("cannot decode instruction at address {addr}: {source}")]
    Decode {
        addr: usize,
        source: DecodeError,
    },

    #[error("{opcode}: unknown register '{name}'")]
    UnknownRegister { name: String, opcode: Opcode },

    #[error("{opcode}: operand '{token}' resolved to no value")]
    MissingOperand { opcode: Opcode, token: String },

    #[error(transparent)]
    Alu(#[from] AluError),
}
