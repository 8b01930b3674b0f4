//! The fetch-decode-execute loop.

use std::fmt::{Display, Formatter};

use log::{debug, info, trace};
use prettytable::{format as TableFormat, Table};

use crate::alu::Flags;
use crate::bytecode::decode_instruction;
use crate::config::CpuConfig;
use crate::dispatch::{Core, DispatchTable, Output, Step};
use crate::error::{ConfigError, Fault, FaultKind, LoadError};
use crate::loader::checked_bytes;
use crate::memory::Memory;
use crate::observer::{ConsoleObserver, Event, EventKind, Observer};
use crate::registers::RegisterFile;
use crate::stack::Stack;

/// Bytes of memory shown on either side of the instruction pointer by `Display`.
const MEMORY_WINDOW: usize = 6;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum State {
  Running,
  Halted,
}

/**
  An LS-8 machine: memory, registers, stack, the opcode table and an observer for its output.

  A `Cpu` starts `Halted`. Load a program, then either `run` it to completion or `start` it and
  drive it one instruction at a time with `step`. Either way execution ends at `HLT` or at the
  first fault; faults are reported to the observer and returned to the caller.
*/
pub struct Cpu<O: Observer = ConsoleObserver> {
  core     : Core,
  table    : DispatchTable,
  state    : State,
  cycles   : u64,
  observer : O,
}

impl Cpu<ConsoleObserver> {
  pub fn new() -> Cpu<ConsoleObserver> {
    Cpu::with_observer(ConsoleObserver)
  }
}

impl Default for Cpu<ConsoleObserver> {
  fn default() -> Self {
    Cpu::new()
  }
}

impl<O: Observer> Cpu<O> {

  // region Construction and loading

  /// A machine with the default configuration.
  pub fn with_observer(observer: O) -> Cpu<O> {
    Cpu::build(&CpuConfig::default(), observer)
  }

  pub fn with_config(config: CpuConfig, observer: O) -> Result<Cpu<O>, ConfigError> {
    config.validate()?;
    Ok(Cpu::build(&config, observer))
  }

  fn build(config: &CpuConfig, observer: O) -> Cpu<O> {
    Cpu {
      core     : Core::new(config),
      table    : DispatchTable::new(),
      state    : State::Halted,
      cycles   : 0,
      observer,
    }
  }

  /**
    Copies `bytes` into memory at `start` and records the end of the program image, which the
    stack may not grow into. Returns that end address. With several loads the image ends after
    whichever reaches highest.
  */
  pub fn load_bytes(&mut self, start: usize, bytes: &[u8]) -> Result<usize, FaultKind> {
    self.core.memory.load(start, bytes)?;
    let program_end = (start + bytes.len()).max(self.core.stack.program_end());
    self.core.stack.set_program_end(program_end);
    debug!("loaded {} bytes at {:#06x}, program ends at {:#06x}", bytes.len(), start, program_end);
    Ok(program_end)
  }

  /// Like `load_bytes`, for values that have not yet been checked to fit in a byte.
  pub fn load_values(&mut self, start: usize, values: &[u32]) -> Result<usize, LoadError> {
    let bytes = checked_bytes(values)?;
    Ok(self.load_bytes(start, &bytes)?)
  }

  // endregion

  // region Execution

  /// Runs from `start_ip` until `HLT` or a fault.
  pub fn run(&mut self, start_ip: usize) -> Result<(), Fault> {
    self.start(start_ip);
    while self.step()? == State::Running {}
    Ok(())
  }

  pub fn start(&mut self, start_ip: usize) {
    self.core.ip = start_ip;
    self.state   = State::Running;
  }

  /// Executes one instruction. Does nothing once the machine has halted.
  pub fn step(&mut self) -> Result<State, Fault> {
    if self.state == State::Halted {
      return Ok(State::Halted);
    }

    #[cfg(feature = "trace_computation")] println!("{}", self);
    trace!("{}", self.trace_line());

    let ip = self.core.ip;
    let opcode = match self.core.memory.read(ip) {
      Ok(opcode) => opcode,
      Err(kind)  => return Err(self.fault(kind, None)),
    };

    match self.execute(opcode) {
      Ok(())    => Ok(self.state),
      Err(kind) => Err(self.fault(kind, Some(opcode))),
    }
  }

  fn execute(&mut self, opcode: u8) -> Result<(), FaultKind> {
    let entry = *self.table.lookup(opcode)?;
    let step  = (entry.handler)(&mut self.core, entry.opcode)?;
    self.cycles += 1;

    match step {

      Step::Next => {
        self.core.ip += entry.width;
      }

      Step::Jump(address) => {
        self.core.ip = address;
      }

      Step::Output(output) => {
        let kind = match output {
          Output::Number { register, value } => EventKind::Print { register, value },
          Output::Char { register, value }   => EventKind::PrintChar { register, value },
        };
        self.emit(kind, Some(opcode));
        self.core.ip += entry.width;
      }

      Step::Halt => {
        self.state = State::Halted;
        info!("halted at {:#06x} after {} instructions", self.core.ip, self.cycles);
      }

    }
    Ok(())
  }

  /// Halts the machine and tells the observer. The returned fault is for the caller.
  fn fault(&mut self, kind: FaultKind, opcode: Option<u8>) -> Fault {
    let fault = Fault { kind, ip: self.core.ip, opcode };
    self.state = State::Halted;
    self.emit(EventKind::Fault(fault.clone()), opcode);
    fault
  }

  fn emit(&mut self, kind: EventKind, opcode: Option<u8>) {
    let event = Event {
      kind,
      ip        : self.core.ip,
      opcode,
      registers : self.core.registers.snapshot(),
    };
    self.observer.observe(&event);
  }

  // endregion

  // region Accessors

  pub fn state(&self) -> State {
    self.state
  }

  pub fn ip(&self) -> usize {
    self.core.ip
  }

  /// Instructions completed so far.
  pub fn cycles(&self) -> u64 {
    self.cycles
  }

  pub fn register(&self, index: usize) -> Result<u8, FaultKind> {
    self.core.registers.get(index)
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.core.registers
  }

  pub fn memory(&self) -> &Memory {
    &self.core.memory
  }

  pub fn stack(&self) -> &Stack {
    &self.core.stack
  }

  pub fn stack_depth(&self) -> usize {
    self.core.stack.depth()
  }

  pub fn program_end(&self) -> usize {
    self.core.stack.program_end()
  }

  pub fn flags(&self) -> Flags {
    self.core.flags
  }

  pub fn observer(&self) -> &O {
    &self.observer
  }

  pub fn observer_mut(&mut self) -> &mut O {
    &mut self.observer
  }

  pub fn into_observer(self) -> O {
    self.observer
  }

  // endregion

  // region Display methods

  /// One line of machine state: `TRACE: ip | opcode operand operand | registers`.
  pub fn trace_line(&self) -> String {
    let ip     = self.core.ip;
    let memory = &self.core.memory;
    let byte   = |address: usize| memory.peek(address).unwrap_or(0);

    let mut line = format!(
      "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
      ip, byte(ip), byte(ip + 1), byte(ip + 2)
    );
    for value in self.core.registers.as_slice() {
      line.push_str(&format!(" {:02X}", value));
    }
    line
  }

  fn make_register_table<T>(
      rows      : impl Iterator<Item = (String, T)>,
      highlight : Option<usize>
    ) -> Table
    where T: Display
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, (name, value)) in rows.enumerate() {
      match Some(i) == highlight {

        true  => {
          table.add_row(row![r->format!("* --> {} =", name), format!("{}", value)]);
        }

        false => {
          table.add_row(row![r->format!("{} =", name), format!("{}", value)]);
        }

      } // end match on highlight
    } // end for
    table
  }

  fn memory_window(&self) -> (Vec<(String, String)>, Option<usize>) {
    let ip    = self.core.ip;
    let start = ip.saturating_sub(MEMORY_WINDOW);
    let end   = (ip + MEMORY_WINDOW).min(self.core.memory.capacity());

    let rows: Vec<(String, String)> =
      (start..end)
        .filter_map(|address| self.core.memory.peek(address).map(|byte| (address, byte)))
        .map(|(address, byte)| {
          let listing = match address == ip {
            true  => match decode_instruction(self.core.memory.bytes(), address) {
              Ok(instruction) => format!("{:08b}  {}", byte, instruction),
              Err(_)          => format!("{:08b}  ??", byte)
            },
            false => format!("{:08b}", byte)
          };
          (format!("M[{:#06x}]", address), listing)
        })
        .collect();

    let highlight = match ip < end {
      true  => Some(ip - start),
      false => None
    };
    (rows, highlight)
  }

  // endregion
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl<O: Observer> Display for Cpu<O> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let r_table = Cpu::<O>::make_register_table(
      self.core.registers
          .as_slice()
          .iter()
          .enumerate()
          .map(|(i, value)| (format!("R{}", i), *value)),
      None
    );

    let s_table = Cpu::<O>::make_register_table(
      self.core.stack
          .entries(&self.core.memory)
          .into_iter()
          .map(|(address, value)| (format!("S[{:#06x}]", address), value)),
      Some(0)
    );

    let (memory_rows, highlight) = self.memory_window();
    let m_table = Cpu::<O>::make_register_table(memory_rows.into_iter(), highlight);

    let mut combined_table = table!([r_table, s_table, m_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Stack", ub->"Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let state = match self.state {
      State::Running => "Running",
      State::Halted  => "Halted"
    };

    write!(
      f,
      "State: {}\tIP: {:#06x}\tFL: {}\tCycles: {}\n{}",
      state, self.core.ip, self.core.flags, self.cycles, combined_table
    )
  }
}
