/*!
  An emulator for the LS-8, a small 8-bit computer.

  The machine has a flat byte-addressable memory, eight general purpose registers, a flags
  register written by `CMP`, and a stack carved out of the top of memory that grows down toward
  the loaded program. Programs are byte sequences; the `bytecode` module describes the encoding
  and provides an assembler and a disassembler, and `loader` reads programs from disk.

  ```text
  .asm ─[`assemble`]─┐
                     ├─> bytes ─[`Cpu::load_bytes`]─> memory ─[`Cpu::run`]─> events ─> `Observer`
  .ls8 ─[`parse_ls8`]┘
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod alu;
pub mod bytecode;
pub mod config;
pub mod cpu;
pub mod dispatch;
pub mod error;
pub mod loader;
pub mod memory;
pub mod observer;
pub mod registers;
pub mod stack;
pub mod symboltable;

pub use crate::config::CpuConfig;
pub use crate::cpu::{Cpu, State};
pub use crate::error::{AssemblyError, ConfigError, Fault, FaultKind, LoadError};
pub use crate::observer::{
  ConsoleObserver, Event, EventKind, LogObserver, NullObserver, Observer, RecordingObserver
};
