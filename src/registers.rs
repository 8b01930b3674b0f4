//! The general purpose register file. Registers are 8 bits wide and hold raw values.

use crate::error::FaultKind;

pub const DEFAULT_REGISTER_COUNT: usize = 8;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterFile {
  values: Vec<u8>
}

impl RegisterFile {

  pub fn new(count: usize) -> RegisterFile {
    RegisterFile {
      values: vec![0; count]
    }
  }

  pub fn get(&self, index: usize) -> Result<u8, FaultKind> {
    self.values
        .get(index)
        .copied()
        .ok_or(FaultKind::InvalidRegister { index })
  }

  pub fn set(&mut self, index: usize, value: u8) -> Result<(), FaultKind> {
    match self.values.get_mut(index) {
      Some(register) => {
        *register = value;
        Ok(())
      }
      None => Err(FaultKind::InvalidRegister { index })
    }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn snapshot(&self) -> Vec<u8> {
    self.values.clone()
  }

  pub fn as_slice(&self) -> &[u8] {
    &self.values
  }
}

impl Default for RegisterFile {
  fn default() -> Self {
    RegisterFile::new(DEFAULT_REGISTER_COUNT)
  }
}
