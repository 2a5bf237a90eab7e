//! fetchex - CLI entry point.
//!
//! Commands:
//! - `fetchex run <program>` - run an assembly text file to completion
//! - `fetchex step <program>` - run one cycle at a time, printing state

use clap::{Parser, Subcommand};
use fetchex::{Machine, Memory, RegisterFile, Word};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "fetchex")]
#[command(version)]
#[command(about = "A didactic fetch-decode-execute simulator for a small accumulator-style CPU")]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it passes the last instruction
    Run {
        /// Path to the program text file
        program: String,
        /// Maximum number of cycles to run
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Print each executed instruction with registers and flags
        #[arg(short, long)]
        trace: bool,
        /// Dump the final machine state as JSON
        #[arg(long)]
        json: bool,
        /// Preload a data-memory word, e.g. --data 4=7 (repeatable)
        #[arg(long, value_name = "ADDR=VALUE")]
        data: Vec<String>,
        /// Preload a register, e.g. --reg R3=4 (repeatable)
        #[arg(long, value_name = "NAME=VALUE")]
        reg: Vec<String>,
        /// Total memory size, split evenly between instructions and data
        #[arg(long, default_value = "256")]
        memory_size: usize,
    },
    /// Run a program one cycle at a time, printing state after each
    Step {
        /// Path to the program text file
        program: String,
    },
}

fn main() {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init()
        .unwrap();

    match cli.command {
        Some(Commands::Run {
            program,
            max_cycles,
            trace,
            json,
            data,
            reg,
            memory_size,
        }) => {
            run_program(&program, max_cycles, trace, json, &data, &reg, memory_size);
        }
        Some(Commands::Step { program }) => {
            step_program(&program);
        }
        None => {
            println!("fetchex - a small accumulator-style CPU simulator");
            println!();
            println!("Programs are plain text, one instruction per line:");
            println!("    LOAD R1, 5");
            println!("    LOAD R2, 3");
            println!("    ADD R1, R2");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn build_machine(path: &str, memory_size: usize, data: &[String], reg: &[String]) -> Machine {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to read {path}: {e}");
            std::process::exit(1);
        }
    };

    let mut machine = Machine::with_parts(RegisterFile::new(), Memory::new(memory_size));

    for spec in data {
        let (addr, value) = parse_preload(spec);
        if let Err(e) = machine.mem.store_data(addr, value) {
            eprintln!("cannot preload data {spec}: {e}");
            std::process::exit(1);
        }
    }
    for spec in reg {
        let (name, value) = parse_reg_preload(spec);
        if let Err(e) = machine.regs.set(&name, value) {
            eprintln!("cannot preload register {spec}: {e}");
            std::process::exit(1);
        }
    }

    match machine.load_source(&source) {
        Ok(n) => println!("loaded {n} instructions from {path}"),
        Err(e) => {
            eprintln!("failed to load program: {e}");
            std::process::exit(1);
        }
    }

    machine
}

fn run_program(
    path: &str,
    max_cycles: u64,
    trace: bool,
    json: bool,
    data: &[String],
    reg: &[String],
    memory_size: usize,
) {
    let mut machine = build_machine(path, memory_size, data, reg);

    while machine.regs.pc < machine.program_len() && machine.cycles() < max_cycles {
        let pc = machine.regs.pc;
        match machine.step() {
            Ok(instr) => {
                if trace {
                    println!("{pc:03}: {instr}  [{}]", machine.flags());
                }
            }
            Err(e) => {
                eprintln!("cycle failed at PC={pc}: {e}");
                std::process::exit(1);
            }
        }
    }

    if machine.cycles() >= max_cycles && machine.regs.pc < machine.program_len() {
        eprintln!(
            "reached max cycles limit ({max_cycles}); use --max-cycles to raise it"
        );
    }

    if json {
        match serde_json::to_string_pretty(&machine) {
            Ok(dump) => println!("{dump}"),
            Err(e) => {
                eprintln!("failed to serialize machine state: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!();
    print_state(&machine);
}

fn step_program(path: &str) {
    let mut machine = build_machine(path, 256, &[], &[]);

    println!("program:");
    for (addr, line) in machine
        .mem
        .instruction_lines()
        .iter()
        .take(machine.program_len())
        .enumerate()
    {
        println!("  {addr:03}: {line}");
    }
    println!();

    while machine.regs.pc < machine.program_len() {
        let pc = machine.regs.pc;
        match machine.step() {
            Ok(instr) => {
                println!("--- cycle {} ---", machine.cycles());
                println!("{pc:03}: {instr}");
                print_state(&machine);
                println!();
            }
            Err(e) => {
                eprintln!("cycle failed at PC={pc}: {e}");
                std::process::exit(1);
            }
        }
    }
    println!("execution completed");
}

fn print_state(machine: &Machine) {
    println!("cycles: {}", machine.cycles());
    println!(
        "PC={} MAR={} IR=\"{}\" MBR=\"{}\"",
        machine.regs.pc, machine.regs.mar, machine.regs.ir, machine.regs.mbr
    );
    println!("flags: {}", machine.flags());
    if let Some(expr) = machine.last_alu_expression() {
        println!("ALU: {expr}");
    }

    let registers: Vec<String> = machine
        .regs
        .general_registers()
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    println!("registers: {}", registers.join(" "));

    let non_zero: Vec<(usize, Word)> = machine
        .mem
        .data_cells()
        .iter()
        .enumerate()
        .filter(|(_, w)| **w != 0)
        .map(|(i, w)| (i, *w))
        .collect();
    if !non_zero.is_empty() {
        let cells: Vec<String> = non_zero
            .iter()
            .map(|(addr, value)| format!("[{addr}]={value}"))
            .collect();
        println!("data: {}", cells.join(" "));
    }
}

fn parse_preload(spec: &str) -> (i64, Word) {
    match spec.split_once('=') {
        Some((addr, value)) => match (addr.trim().parse(), value.trim().parse()) {
            (Ok(addr), Ok(value)) => (addr, value),
            _ => {
                eprintln!("invalid preload '{spec}', expected ADDR=VALUE");
                std::process::exit(1);
            }
        },
        None => {
            eprintln!("invalid preload '{spec}', expected ADDR=VALUE");
            std::process::exit(1);
        }
    }
}

fn parse_reg_preload(spec: &str) -> (String, Word) {
    match spec.split_once('=') {
        Some((name, value)) => match value.trim().parse() {
            Ok(value) => (name.trim().to_string(), value),
            Err(_) => {
                eprintln!("invalid preload '{spec}', expected NAME=VALUE");
                std::process::exit(1);
            }
        },
        None => {
            eprintln!("invalid preload '{spec}', expected NAME=VALUE");
            std::process::exit(1);
        }
    }
}
