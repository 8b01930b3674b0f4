//! Flat byte-addressable memory. Every access is bounds checked; an address outside the store is
//! a fault rather than a silent clamp or a panic.

use crate::error::FaultKind;

pub const DEFAULT_MEMORY_SIZE: usize = 10_000;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
  cells: Vec<u8>
}

impl Memory {

  /// Zero-initialized memory of `capacity` bytes.
  pub fn new(capacity: usize) -> Memory {
    Memory {
      cells: vec![0; capacity]
    }
  }

  pub fn capacity(&self) -> usize {
    self.cells.len()
  }

  pub fn read(&self, address: usize) -> Result<u8, FaultKind> {
    self.cells
        .get(address)
        .copied()
        .ok_or(FaultKind::OutOfBounds { address })
  }

  pub fn write(&mut self, address: usize, value: u8) -> Result<(), FaultKind> {
    match self.cells.get_mut(address) {
      Some(cell) => {
        *cell = value;
        Ok(())
      }
      None => Err(FaultKind::OutOfBounds { address })
    }
  }

  /**
    Copies `bytes` into memory starting at `start`. Either every byte is written or, if the range
    does not fit, nothing is and the first offending address is reported.
  */
  pub fn load(&mut self, start: usize, bytes: &[u8]) -> Result<(), FaultKind> {
    let end = start.checked_add(bytes.len())
                   .ok_or(FaultKind::OutOfBounds { address: start })?;
    if end > self.capacity() {
      return Err(FaultKind::OutOfBounds { address: self.capacity().max(start) });
    }
    self.cells[start..end].copy_from_slice(bytes);
    Ok(())
  }

  /// A non-faulting read for diagnostics.
  pub fn peek(&self, address: usize) -> Option<u8> {
    self.cells.get(address).copied()
  }

  pub fn bytes(&self) -> &[u8] {
    &self.cells
  }
}

impl Default for Memory {
  fn default() -> Self {
    Memory::new(DEFAULT_MEMORY_SIZE)
  }
}
