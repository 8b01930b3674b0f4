/*!
  The stack lives in main memory rather than in a separate array. It starts at the highest
  address and grows down toward the loaded program, so its capacity is whatever memory the
  program leaves free, and an overflow is a collision with the program image.

  ```text
  0          program_end                       top = capacity - 1
  │ program  │ (gap) ···· free ···· │ ← pushes │
  ```

  The stack only keeps a depth counter; the values themselves are in `Memory`.
*/

use crate::error::FaultKind;
use crate::memory::Memory;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stack {
  /// Address of the first slot, `capacity - 1`.
  top         : usize,
  /// Number of bytes currently pushed.
  depth       : usize,
  /// First free address after the program image.
  program_end : usize,
}

impl Stack {

  pub fn new(memory: &Memory) -> Stack {
    Stack {
      top         : memory.capacity().saturating_sub(1),
      depth       : 0,
      program_end : 0,
    }
  }

  pub fn top(&self) -> usize {
    self.top
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  pub fn program_end(&self) -> usize {
    self.program_end
  }

  pub fn set_program_end(&mut self, program_end: usize) {
    self.program_end = program_end;
  }

  /**
    Writes `value` to the next free slot, `top - depth`. The push is refused when it would leave
    no free byte between the stack and the program, that is when
    `top - depth - 1 <= program_end`.
  */
  pub fn push(&mut self, memory: &mut Memory, value: u8) -> Result<(), FaultKind> {
    self.check_room(1)?;
    let address = self.top - self.depth;
    memory.write(address, value)?;
    self.depth += 1;
    Ok(())
  }

  /// Removes and returns the most recently pushed value, zeroing its slot.
  pub fn pop(&mut self, memory: &mut Memory) -> Result<u8, FaultKind> {
    if self.depth == 0 {
      return Err(FaultKind::StackUnderflow);
    }
    self.depth -= 1;
    let address = self.top - self.depth;
    let value   = memory.read(address)?;
    memory.write(address, 0)?;
    Ok(value)
  }

  /// Pushes a 16 bit address, high byte first, so the low byte ends up on top.
  /// Both bytes fit or neither is written.
  pub fn push_address(&mut self, memory: &mut Memory, address: usize) -> Result<(), FaultKind> {
    self.check_room(2)?;
    self.push(memory, (address >> 8) as u8)?;
    self.push(memory, address as u8)
  }

  /// Fails without popping anything unless a whole address is on the stack.
  pub fn pop_address(&mut self, memory: &mut Memory) -> Result<usize, FaultKind> {
    if self.depth < 2 {
      return Err(FaultKind::StackUnderflow);
    }
    let low  = self.pop(memory)? as usize;
    let high = self.pop(memory)? as usize;
    Ok(high << 8 | low)
  }

  /// Refuses `count` more bytes when the lowest of them would reach `program_end + 1`.
  fn check_room(&self, count: usize) -> Result<(), FaultKind> {
    let address = (self.top + 1).saturating_sub(self.depth + count);
    match address <= self.program_end + 1 {
      true  => Err(FaultKind::StackOverflow { address }),
      false => Ok(())
    }
  }

  /// The pushed values with their addresses, most recent first.
  pub fn entries(&self, memory: &Memory) -> Vec<(usize, u8)> {
    (0..self.depth)
      .rev()
      .map(|offset| self.top - offset)
      .map(|address| (address, memory.peek(address).unwrap_or(0)))
      .collect()
  }
}
