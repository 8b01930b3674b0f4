use crate::error::ConfigError;
use crate::memory::DEFAULT_MEMORY_SIZE;
use crate::registers::DEFAULT_REGISTER_COUNT;

/// Return addresses are pushed as two bytes, which caps addressable memory at 64 KiB.
pub const MAX_MEMORY_SIZE: usize = 1 << 16;
/// Register operands are single bytes.
pub const MAX_REGISTER_COUNT: usize = 256;

/// Sizes of the machine's stores. Fixed for the lifetime of a `Cpu`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct CpuConfig {
  pub memory_size    : usize,
  pub register_count : usize,
}

impl CpuConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.memory_size == 0 || self.memory_size > MAX_MEMORY_SIZE {
      return Err(ConfigError::MemorySize(self.memory_size));
    }
    if self.register_count == 0 || self.register_count > MAX_REGISTER_COUNT {
      return Err(ConfigError::RegisterCount(self.register_count));
    }
    Ok(())
  }
}

impl Default for CpuConfig {
  fn default() -> Self {
    CpuConfig {
      memory_size    : DEFAULT_MEMORY_SIZE,
      register_count : DEFAULT_REGISTER_COUNT,
    }
  }
}
