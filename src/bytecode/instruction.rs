use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

/**
  Opcodes of the LS-8.

  The byte value of an opcode is not arbitrary. Its bits are laid out as `AABCDDDD`:

    AA    Number of operands, so the instruction is `1 + AA` bytes wide
    B     1 if this is an ALU operation
    C     1 if the instruction sets the instruction pointer
    DDDD  Instruction identifier

  Consequently the discriminants below are significant. Order-dependencies:
      ```
      Opcode::operand_count()
      Opcode::is_alu()
      Opcode::sets_ip()
      alu::AluOp::try_from()
      ```
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,            Hash
)]
#[strum(serialize_all = "shouty_snake_case")]
#[repr(u8)]
pub enum Opcode {
  // No operands //
  Nop  = 0b0000_0000, // nop
  Hlt  = 0b0000_0001, // hlt
  Ret  = 0b0001_0001, // ret

  // One operand //
  Push = 0b0100_0101, // push( register )
  Pop  = 0b0100_0110, // pop( register )
  Prn  = 0b0100_0111, // prn( register )
  Pra  = 0b0100_1000, // pra( register )
  Call = 0b0101_0000, // call( register )
  Jmp  = 0b0101_0100, // jmp( register )
  Jeq  = 0b0101_0101, // jeq( register )
  Jne  = 0b0101_0110, // jne( register )
  Jgt  = 0b0101_0111, // jgt( register )
  Jlt  = 0b0101_1000, // jlt( register )
  Jle  = 0b0101_1001, // jle( register )
  Jge  = 0b0101_1010, // jge( register )
  Inc  = 0b0110_0101, // inc( register )
  Dec  = 0b0110_0110, // dec( register )
  Not  = 0b0110_1001, // not( register )

  // Two operands //
  Ldi  = 0b1000_0010, // ldi( register, immediate )
  Ld   = 0b1000_0011, // ld( register, register )
  St   = 0b1000_0100, // st( register, register )
  Add  = 0b1010_0000, // add( register, register )
  Sub  = 0b1010_0001, // sub( register, register )
  Mul  = 0b1010_0010, // mul( register, register )
  Div  = 0b1010_0011, // div( register, register )
  Mod  = 0b1010_0100, // mod( register, register )
  Cmp  = 0b1010_0111, // cmp( register, register )
  And  = 0b1010_1000, // and( register, register )
  Or   = 0b1010_1010, // or( register, register )
  Xor  = 0b1010_1011, // xor( register, register )
  Shl  = 0b1010_1100, // shl( register, register )
  Shr  = 0b1010_1101, // shr( register, register )
}

/// What an operand byte means to the instruction that reads it.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum OperandKind {
  Register,
  Immediate,
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn operand_count(&self) -> usize {
    (self.code() >> 6) as usize
  }

  /// Size in bytes of the whole instruction, opcode included.
  pub fn width(&self) -> usize {
    1 + self.operand_count()
  }

  pub fn is_alu(&self) -> bool {
    self.code() & 0b0010_0000 != 0
  }

  pub fn sets_ip(&self) -> bool {
    self.code() & 0b0001_0000 != 0
  }

  /// `LDI` is the only instruction taking an immediate; every other operand names a register.
  pub fn operand_kind(&self, position: usize) -> OperandKind {
    match (self, position) {
      (Opcode::Ldi, 1) => OperandKind::Immediate,
      _                => OperandKind::Register,
    }
  }
}

/// Holds the unencoded components of an instruction. As such, it enumerates the possible
/// instruction argument combinations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [OpCode:8][Operand:8][Operand:8]
  Binary {
    opcode : Opcode,
    first  : u8,
    second : u8
  },
  /// [OpCode:8][Operand:8]
  Unary {
    opcode  : Opcode,
    operand : u8
  },
  /// [OpCode:8]
  Nullary(Opcode),
}

impl Instruction {
  /// Builds the instruction if `operands` has exactly as many bytes as `opcode` expects.
  pub fn new(opcode: Opcode, operands: &[u8]) -> Option<Instruction> {
    if operands.len() != opcode.operand_count() {
      return None;
    }
    match operands {
      [first, second] => Some(Instruction::Binary { opcode, first: *first, second: *second }),
      [operand]       => Some(Instruction::Unary { opcode, operand: *operand }),
      []              => Some(Instruction::Nullary(opcode)),
      _               => None
    }
  }

  pub fn opcode(&self) -> Opcode {
    match self {
      | Instruction::Binary { opcode, .. }
      | Instruction::Unary { opcode, .. }
      | Instruction::Nullary(opcode) => *opcode
    }
  }

  pub fn width(&self) -> usize {
    self.opcode().width()
  }
}

fn fmt_operand(f: &mut Formatter<'_>, opcode: Opcode, position: usize, value: u8)
  -> std::fmt::Result
{
  match opcode.operand_kind(position) {
    OperandKind::Register  => write!(f, "R{}", value),
    OperandKind::Immediate => write!(f, "{}", value),
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Binary { opcode, first, second } => {
        write!(f, "{} ", opcode)?;
        fmt_operand(f, *opcode, 0, *first)?;
        write!(f, ", ")?;
        fmt_operand(f, *opcode, 1, *second)
      }

      Instruction::Unary { opcode, operand } => {
        write!(f, "{} ", opcode)?;
        fmt_operand(f, *opcode, 0, *operand)
      }

      Instruction::Nullary(opcode) => {
        write!(f, "{}", opcode)
      }

    }
  }
}
