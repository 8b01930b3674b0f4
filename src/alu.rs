/*!
  The arithmetic logic unit. It is a set of pure functions over register values: callers read
  the operands, call `apply`, and write the result back. All arithmetic wraps modulo 256.
*/

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum_macros::{Display as StrumDisplay, EnumString};

use crate::bytecode::Opcode;
use crate::error::FaultKind;

#[derive(StrumDisplay, EnumString, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[strum(serialize_all = "shouty_snake_case")]
pub enum AluOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  And,
  Or,
  Xor,
  Shl,
  Shr,
  // Unary; the second operand is ignored.
  Inc,
  Dec,
  Not,
}

impl AluOp {
  /// Looks an operation up by name, for callers that carry operations as text.
  pub fn from_mnemonic(name: &str) -> Result<AluOp, FaultKind> {
    AluOp::from_str(&name.to_ascii_uppercase())
      .map_err(|_| FaultKind::UnsupportedOperation { operation: name.to_string() })
  }
}

impl TryFrom<Opcode> for AluOp {
  type Error = FaultKind;

  fn try_from(opcode: Opcode) -> Result<Self, Self::Error> {
    let op = match opcode {
      Opcode::Add => AluOp::Add,
      Opcode::Sub => AluOp::Sub,
      Opcode::Mul => AluOp::Mul,
      Opcode::Div => AluOp::Div,
      Opcode::Mod => AluOp::Mod,
      Opcode::And => AluOp::And,
      Opcode::Or  => AluOp::Or,
      Opcode::Xor => AluOp::Xor,
      Opcode::Shl => AluOp::Shl,
      Opcode::Shr => AluOp::Shr,
      Opcode::Inc => AluOp::Inc,
      Opcode::Dec => AluOp::Dec,
      Opcode::Not => AluOp::Not,
      other       => {
        return Err(FaultKind::UnsupportedOperation { operation: other.to_string() });
      }
    };
    Ok(op)
  }
}

pub fn apply(op: AluOp, a: u8, b: u8) -> Result<u8, FaultKind> {
  let result = match op {
    AluOp::Add => a.wrapping_add(b),
    AluOp::Sub => a.wrapping_sub(b),
    AluOp::Mul => a.wrapping_mul(b),
    AluOp::Div => a.checked_div(b).ok_or(FaultKind::DivisionByZero)?,
    AluOp::Mod => a.checked_rem(b).ok_or(FaultKind::DivisionByZero)?,
    AluOp::And => a & b,
    AluOp::Or  => a | b,
    AluOp::Xor => a ^ b,
    // Shifting by the full width or more clears the register.
    AluOp::Shl => a.checked_shl(b as u32).unwrap_or(0),
    AluOp::Shr => a.checked_shr(b as u32).unwrap_or(0),
    AluOp::Inc => a.wrapping_add(1),
    AluOp::Dec => a.wrapping_sub(1),
    AluOp::Not => !a,
  };
  Ok(result)
}

/// The flags register, `0b00000LGE`, as left by the last `CMP`.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Hash)]
pub struct Flags(u8);

impl Flags {
  pub const EQUAL   : u8 = 0b001;
  pub const GREATER : u8 = 0b010;
  pub const LESS    : u8 = 0b100;

  pub fn bits(&self) -> u8 {
    self.0
  }

  pub fn equal(&self) -> bool {
    self.0 & Flags::EQUAL != 0
  }

  pub fn greater(&self) -> bool {
    self.0 & Flags::GREATER != 0
  }

  pub fn less(&self) -> bool {
    self.0 & Flags::LESS != 0
  }
}

impl Display for Flags {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:08b}", self.0)
  }
}

pub fn compare(a: u8, b: u8) -> Flags {
  match a.cmp(&b) {
    std::cmp::Ordering::Less    => Flags(Flags::LESS),
    std::cmp::Ordering::Greater => Flags(Flags::GREATER),
    std::cmp::Ordering::Equal   => Flags(Flags::EQUAL),
  }
}
