use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use ls8::bytecode::disassemble;
use ls8::loader::{read_program, Program};
use ls8::memory::DEFAULT_MEMORY_SIZE;
use ls8::registers::DEFAULT_REGISTER_COUNT;
use ls8::{ConsoleObserver, Cpu, CpuConfig};

/// Runs an LS-8 program.
#[derive(Parser, Debug)]
#[command(name = "ls8", version, about)]
struct Args {
  /// Program to run: `.ls8` (one binary byte per line) or `.asm` (mnemonic assembly).
  program: PathBuf,

  /// Address the program is loaded at and execution begins from.
  #[arg(long, default_value_t = 0)]
  start: usize,

  #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
  memory_size: usize,

  #[arg(long, default_value_t = DEFAULT_REGISTER_COUNT)]
  registers: usize,

  /// Print a listing of the program instead of running it.
  #[arg(long)]
  disassemble: bool,

  /// More output: -v info, -vv debug, -vvv a trace line per instruction.
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn main() -> Result<()> {
  color_eyre::install()?;
  let args = Args::parse();

  let level = match args.verbose {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };
  SimpleLogger::new().with_level(level).init()?;

  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  let program = read_program(&args.program)
    .wrap_err_with(|| format!("could not read {}", args.program.display()))?;

  if args.disassemble {
    print_listing(&program, args.start);
    return Ok(());
  }

  let config  = CpuConfig { memory_size: args.memory_size, register_count: args.registers };
  let mut cpu = Cpu::with_config(config, ConsoleObserver)?;

  cpu.load_bytes(args.start, &program.code)
     .wrap_err("program does not fit in memory")?;
  cpu.run(args.start)?;

  Ok(())
}

fn print_listing(program: &Program, start: usize) {
  for (offset, decoded) in disassemble(&program.code) {
    if let Some(label) = program.symbols.get_symbol(offset) {
      println!("{}:", label);
    }
    match decoded {
      Ok(instruction) => println!("  {:#06x}  {}", start + offset, instruction),
      Err(_)          => println!("  {:#06x}  .byte {:#04x}", start + offset, program.code[offset]),
    }
  }
}
