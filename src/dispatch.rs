/*!
  Instruction handlers and the opcode table that maps bytes to them.

  A handler is a plain function over the machine state. It reads its own operands from memory
  just past the instruction pointer, performs its effect, and reports how the instruction pointer
  moves next with a `Step`. Handlers never write the instruction pointer themselves; the `Cpu`
  applies the step, advancing by the instruction's width unless the handler asked for a jump.

  The table is a flat array indexed by opcode byte and is built once, when the `Cpu` is
  constructed. An empty slot is an illegal instruction.
*/

use std::convert::TryFrom;
use std::fmt::{Debug, Formatter};

use strum::IntoEnumIterator;

use crate::alu::{self, AluOp, Flags};
use crate::bytecode::Opcode;
use crate::config::CpuConfig;
use crate::error::FaultKind;
use crate::memory::Memory;
use crate::registers::RegisterFile;
use crate::stack::Stack;

/// Everything an instruction can touch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Core {
  pub memory    : Memory,
  pub registers : RegisterFile,
  pub stack     : Stack,
  pub flags     : Flags,
  /// Address of the instruction being executed.
  pub ip        : usize,
}

impl Core {

  pub fn new(config: &CpuConfig) -> Core {
    let memory = Memory::new(config.memory_size);
    let stack  = Stack::new(&memory);
    Core {
      memory,
      registers : RegisterFile::new(config.register_count),
      stack,
      flags     : Flags::default(),
      ip        : 0,
    }
  }

  /// The operand byte `offset` bytes past the opcode.
  pub fn operand(&self, offset: usize) -> Result<u8, FaultKind> {
    self.memory.read(self.ip + offset)
  }

  /// The operand at `offset` taken as a register index. The index is validated.
  fn register_index(&self, offset: usize) -> Result<usize, FaultKind> {
    let index = self.operand(offset)? as usize;
    self.registers.get(index)?;
    Ok(index)
  }

  /// The value of the register named by the operand at `offset`.
  fn register_value(&self, offset: usize) -> Result<u8, FaultKind> {
    self.registers.get(self.operand(offset)? as usize)
  }
}

/// Something the machine shows to the outside world.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Output {
  Number { register: usize, value: u8 },
  Char { register: usize, value: u8 },
}

/// What the dispatch loop does after a handler returns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
  /// Advance past this instruction.
  Next,
  /// Continue at the given address.
  Jump(usize),
  /// Hand the output to the observer, then advance.
  Output(Output),
  Halt,
}

pub type Handler = fn(&mut Core, Opcode) -> Result<Step, FaultKind>;

/// A slot of the opcode table. `width` is the opcode byte plus its operands.
#[derive(Clone, Copy)]
pub struct Entry {
  pub opcode  : Opcode,
  pub width   : usize,
  pub handler : Handler,
}

impl Debug for Entry {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Entry")
     .field("opcode", &self.opcode)
     .field("width", &self.width)
     .finish()
  }
}

pub struct DispatchTable {
  entries: [Option<Entry>; 256]
}

impl DispatchTable {

  pub fn new() -> DispatchTable {
    let mut entries: [Option<Entry>; 256] = [None; 256];
    for opcode in Opcode::iter() {
      entries[opcode.code() as usize] = Some(Entry {
        opcode,
        width   : opcode.width(),
        handler : handler_for(opcode),
      });
    }
    DispatchTable { entries }
  }

  pub fn lookup(&self, byte: u8) -> Result<&Entry, FaultKind> {
    self.entries[byte as usize]
        .as_ref()
        .ok_or(FaultKind::IllegalInstruction { opcode: byte })
  }

  /// Number of registered opcodes.
  pub fn len(&self) -> usize {
    self.entries.iter().filter(|entry| entry.is_some()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for DispatchTable {
  fn default() -> Self {
    DispatchTable::new()
  }
}

fn handler_for(opcode: Opcode) -> Handler {
  match opcode {
    Opcode::Nop  => nop,
    Opcode::Hlt  => hlt,
    Opcode::Ret  => ret,
    Opcode::Push => push,
    Opcode::Pop  => pop,
    Opcode::Prn  => prn,
    Opcode::Pra  => pra,
    Opcode::Call => call,
    Opcode::Jmp  => jmp,

    | Opcode::Jeq
    | Opcode::Jne
    | Opcode::Jgt
    | Opcode::Jlt
    | Opcode::Jle
    | Opcode::Jge => jump_if,

    | Opcode::Inc
    | Opcode::Dec
    | Opcode::Not => alu_unary,

    Opcode::Ldi  => ldi,
    Opcode::Ld   => ld,
    Opcode::St   => st,
    Opcode::Cmp  => cmp,

    | Opcode::Add
    | Opcode::Sub
    | Opcode::Mul
    | Opcode::Div
    | Opcode::Mod
    | Opcode::And
    | Opcode::Or
    | Opcode::Xor
    | Opcode::Shl
    | Opcode::Shr => alu_binary,
  }
}

// region Handlers

fn nop(_core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  Ok(Step::Next)
}

fn hlt(_core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  Ok(Step::Halt)
}

fn ldi(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let register = core.register_index(1)?;
  let value    = core.operand(2)?;
  core.registers.set(register, value)?;
  Ok(Step::Next)
}

fn ld(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let register = core.register_index(1)?;
  let address  = core.register_value(2)? as usize;
  let value    = core.memory.read(address)?;
  core.registers.set(register, value)?;
  Ok(Step::Next)
}

fn st(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let address = core.register_value(1)? as usize;
  let value   = core.register_value(2)?;
  core.memory.write(address, value)?;
  Ok(Step::Next)
}

fn prn(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let register = core.register_index(1)?;
  let value    = core.registers.get(register)?;
  Ok(Step::Output(Output::Number { register, value }))
}

fn pra(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let register = core.register_index(1)?;
  let value    = core.registers.get(register)?;
  Ok(Step::Output(Output::Char { register, value }))
}

fn push(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let value = core.register_value(1)?;
  core.stack.push(&mut core.memory, value)?;
  Ok(Step::Next)
}

fn pop(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  // Validate the destination before the stack is touched.
  let register = core.register_index(1)?;
  let value    = core.stack.pop(&mut core.memory)?;
  core.registers.set(register, value)?;
  Ok(Step::Next)
}

/// Pushes the address of the `CALL` itself; `ret` compensates.
fn call(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let target = core.register_value(1)? as usize;
  core.stack.push_address(&mut core.memory, core.ip)?;
  Ok(Step::Jump(target))
}

fn ret(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let call_site = core.stack.pop_address(&mut core.memory)?;
  Ok(Step::Jump(call_site + Opcode::Call.width()))
}

fn jmp(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let target = core.register_value(1)? as usize;
  Ok(Step::Jump(target))
}

fn jump_if(core: &mut Core, opcode: Opcode) -> Result<Step, FaultKind> {
  let target = core.register_value(1)? as usize;
  let flags  = core.flags;
  let taken  = match opcode {
    Opcode::Jeq => flags.equal(),
    Opcode::Jne => !flags.equal(),
    Opcode::Jgt => flags.greater(),
    Opcode::Jlt => flags.less(),
    Opcode::Jle => flags.less() || flags.equal(),
    Opcode::Jge => flags.greater() || flags.equal(),
    other       => {
      return Err(FaultKind::IllegalInstruction { opcode: other.code() });
    }
  };

  match taken {
    true  => Ok(Step::Jump(target)),
    false => Ok(Step::Next)
  }
}

fn cmp(core: &mut Core, _opcode: Opcode) -> Result<Step, FaultKind> {
  let a = core.register_value(1)?;
  let b = core.register_value(2)?;
  core.flags = alu::compare(a, b);
  Ok(Step::Next)
}

fn alu_binary(core: &mut Core, opcode: Opcode) -> Result<Step, FaultKind> {
  let op       = AluOp::try_from(opcode)?;
  let register = core.register_index(1)?;
  let a        = core.registers.get(register)?;
  let b        = core.register_value(2)?;
  core.registers.set(register, alu::apply(op, a, b)?)?;
  Ok(Step::Next)
}

fn alu_unary(core: &mut Core, opcode: Opcode) -> Result<Step, FaultKind> {
  let op       = AluOp::try_from(opcode)?;
  let register = core.register_index(1)?;
  let a        = core.registers.get(register)?;
  core.registers.set(register, alu::apply(op, a, 0)?)?;
  Ok(Step::Next)
}

// endregion

#[cfg(test)]
mod tests {
  use super::*;

  fn core_with(code: &[u8]) -> Core {
    let mut core = Core::new(&CpuConfig { memory_size: 64, register_count: 8 });
    core.memory.load(0, code).unwrap();
    core.stack.set_program_end(code.len());
    core
  }

  fn execute(core: &mut Core) -> Result<Step, FaultKind> {
    let table = DispatchTable::new();
    let entry = *table.lookup(core.memory.read(core.ip)?)?;
    (entry.handler)(core, entry.opcode)
  }

  #[test]
  fn every_opcode_is_registered() {
    let table = DispatchTable::new();
    assert_eq!(table.len(), Opcode::iter().count());
    for opcode in Opcode::iter() {
      let entry = table.lookup(opcode.code()).unwrap();
      assert_eq!(entry.opcode, opcode);
      assert_eq!(entry.width, opcode.width());
    }
  }

  #[test]
  fn unregistered_bytes_are_illegal() {
    let table = DispatchTable::new();
    assert_eq!(
      table.lookup(0b1111_1111).unwrap_err(),
      FaultKind::IllegalInstruction { opcode: 0b1111_1111 }
    );
  }

  #[test]
  fn ldi_writes_register() {
    let mut core = core_with(&[Opcode::Ldi.code(), 3, 42]);
    assert_eq!(execute(&mut core), Ok(Step::Next));
    assert_eq!(core.registers.get(3), Ok(42));
  }

  #[test]
  fn ldi_rejects_bad_register() {
    let mut core = core_with(&[Opcode::Ldi.code(), 8, 42]);
    assert_eq!(execute(&mut core), Err(FaultKind::InvalidRegister { index: 8 }));
  }

  #[test]
  fn operands_past_memory_fault() {
    let mut core = core_with(&[]);
    core.memory.write(63, Opcode::Prn.code()).unwrap();
    core.ip = 63;
    assert_eq!(execute(&mut core), Err(FaultKind::OutOfBounds { address: 64 }));
  }

  #[test]
  fn prn_reports_output() {
    let mut core = core_with(&[Opcode::Prn.code(), 2]);
    core.registers.set(2, 99).unwrap();
    assert_eq!(execute(&mut core), Ok(Step::Output(Output::Number { register: 2, value: 99 })));
  }

  #[test]
  fn call_pushes_its_own_address() {
    let mut core = core_with(&[Opcode::Nop.code(), Opcode::Call.code(), 0]);
    core.registers.set(0, 40).unwrap();
    core.ip = 1;
    assert_eq!(execute(&mut core), Ok(Step::Jump(40)));
    assert_eq!(core.stack.depth(), 2);

    core.memory.write(40, Opcode::Ret.code()).unwrap();
    core.ip = 40;
    assert_eq!(execute(&mut core), Ok(Step::Jump(3)));
    assert_eq!(core.stack.depth(), 0);
  }

  #[test]
  fn pop_into_bad_register_leaves_stack() {
    let mut core = core_with(&[Opcode::Pop.code(), 9]);
    core.stack.push(&mut core.memory, 5).unwrap();
    assert_eq!(execute(&mut core), Err(FaultKind::InvalidRegister { index: 9 }));
    assert_eq!(core.stack.depth(), 1);
  }

  #[test]
  fn conditional_jumps_follow_flags() {
    let mut core = core_with(&[Opcode::Jeq.code(), 0]);
    core.registers.set(0, 20).unwrap();
    core.flags = alu::compare(1, 2);
    assert_eq!(execute(&mut core), Ok(Step::Next));
    core.flags = alu::compare(2, 2);
    assert_eq!(execute(&mut core), Ok(Step::Jump(20)));

    core.memory.write(0, Opcode::Jle.code()).unwrap();
    core.flags = alu::compare(1, 2);
    assert_eq!(execute(&mut core), Ok(Step::Jump(20)));
    core.flags = alu::compare(3, 2);
    assert_eq!(execute(&mut core), Ok(Step::Next));
  }

  #[test]
  fn load_and_store() {
    // R0 = 50 (address), R1 = 7 (value)
    let mut core = core_with(&[Opcode::St.code(), 0, 1, Opcode::Ld.code(), 2, 0]);
    core.registers.set(0, 50).unwrap();
    core.registers.set(1, 7).unwrap();
    assert_eq!(execute(&mut core), Ok(Step::Next));
    assert_eq!(core.memory.read(50), Ok(7));
    core.ip = 3;
    assert_eq!(execute(&mut core), Ok(Step::Next));
    assert_eq!(core.registers.get(2), Ok(7));
  }

  #[test]
  fn division_by_zero_leaves_register() {
    let mut core = core_with(&[Opcode::Div.code(), 0, 1]);
    core.registers.set(0, 10).unwrap();
    assert_eq!(execute(&mut core), Err(FaultKind::DivisionByZero));
    assert_eq!(core.registers.get(0), Ok(10));
  }
}
