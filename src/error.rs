//! Error types. Faults are raised by the machine while executing; the remaining types belong to
//! the configuration, loading and assembly front ends.

use std::fmt::{Display, Formatter};
use std::io;

use thiserror::Error;

use crate::bytecode::Opcode;

/// What went wrong during a single memory, register, stack or ALU access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FaultKind {
  #[error("memory address {address:#06x} is out of bounds")]
  OutOfBounds { address: usize },
  #[error("register R{index} does not exist")]
  InvalidRegister { index: usize },
  #[error("stack overflow: writing {address:#06x} would collide with the program")]
  StackOverflow { address: usize },
  #[error("stack underflow")]
  StackUnderflow,
  #[error("illegal instruction {opcode:#010b}")]
  IllegalInstruction { opcode: u8 },
  #[error("unsupported ALU operation {operation}")]
  UnsupportedOperation { operation: String },
  #[error("division by zero")]
  DivisionByZero,
}

/**
  A fatal condition raised by the dispatch loop, together with where it happened. `opcode` is
  `None` only when the instruction fetch itself faulted.
*/
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct Fault {
  pub kind   : FaultKind,
  pub ip     : usize,
  pub opcode : Option<u8>,
}

impl Display for Fault {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.opcode {
      Some(opcode) => write!(f, "fault at ip {:#06x} (opcode {:#04x}): {}", self.ip, opcode, self.kind),
      None         => write!(f, "fault at ip {:#06x}: {}", self.ip, self.kind),
    }
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("memory size must be between 1 and 65536 bytes, got {0}")]
  MemorySize(usize),
  #[error("register count must be between 1 and 256, got {0}")]
  RegisterCount(usize),
}

/// Errors raised while turning assembly text into bytes. Lines count from 1.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
  #[error("line {line}: cannot parse `{text}`")]
  Syntax { line: usize, text: String },
  #[error("line {line}: {name} is not an operation")]
  NotAnOperation { line: usize, name: String },
  #[error("line {line}: {operation} requires {expected} operands but was given {found}")]
  WrongArity { line: usize, operation: Opcode, expected: usize, found: usize },
  #[error("line {line}: operand {position} of {operation} must be a register")]
  ExpectedRegister { line: usize, operation: Opcode, position: usize },
  #[error("line {line}: operand {position} of {operation} must be an immediate value")]
  ExpectedImmediate { line: usize, operation: Opcode, position: usize },
  #[error("line {line}: value {value} does not fit in a byte")]
  ValueOutOfRange { line: usize, value: u32 },
  #[error("line {line}: undefined symbol `{name}`")]
  UndefinedSymbol { line: usize, name: String },
  #[error("line {line}: label `{name}` is already defined")]
  DuplicateLabel { line: usize, name: String },
  #[error("line {line}: address {address} already carries a label, cannot add `{name}`")]
  AddressAlreadyLabeled { line: usize, name: String, address: usize },
}

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("could not read program: {0}")]
  Io(#[from] io::Error),
  #[error("line {line}: `{text}` is not a binary byte")]
  Syntax { line: usize, text: String },
  #[error("value {value} at position {index} does not fit in a byte")]
  ValueOutOfRange { index: usize, value: u32 },
  #[error("program does not fit in memory: {0}")]
  Memory(#[from] FaultKind),
  #[error(transparent)]
  Assembly(#[from] AssemblyError),
}
