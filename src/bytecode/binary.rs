/*!
  This module is responsible for the encoding and decoding of binary instructions.

*/
use std::convert::TryFrom;

use super::{Instruction, Opcode};
use crate::error::FaultKind;

/// Appends the encoded bytes of `instruction` to `code`.
pub fn encode_instruction(instruction: &Instruction, code: &mut Vec<u8>) {
  match *instruction {

    Instruction::Binary { opcode, first, second } => {
      // [OpCode:8][Operand:8][Operand:8]
      code.extend_from_slice(&[opcode.code(), first, second]);
    }

    Instruction::Unary { opcode, operand } => {
      // [OpCode:8][Operand:8]
      code.extend_from_slice(&[opcode.code(), operand]);
    }

    Instruction::Nullary(opcode) => {
      // [OpCode:8]
      code.push(opcode.code());
    }

  }
}

pub fn encode_program(instructions: &[Instruction]) -> Vec<u8> {
  let mut code = Vec::with_capacity(instructions.len() * 3);
  for instruction in instructions {
    encode_instruction(instruction, &mut code);
  }
  code
}

/**
  Decodes the instruction starting at `address`. Fails with `IllegalInstruction` for a byte that
  is not an opcode and with `OutOfBounds` when the instruction runs past the end of `code`.
*/
pub fn decode_instruction(code: &[u8], address: usize) -> Result<Instruction, FaultKind> {
  let byte = *code.get(address).ok_or(FaultKind::OutOfBounds { address })?;
  let opcode = Opcode::try_from(byte)
      .map_err(|_| FaultKind::IllegalInstruction { opcode: byte })?;

  let end = address + opcode.width();
  let operands = code.get(address + 1..end)
                     .ok_or(FaultKind::OutOfBounds { address: code.len() })?;

  // The slice length always matches the opcode's arity.
  Instruction::new(opcode, operands).ok_or(FaultKind::IllegalInstruction { opcode: byte })
}

/**
  Produces a listing of `code`. Bytes that do not decode are reported individually and skipped,
  so data mixed into a program does not derail the rest of the listing.
*/
pub fn disassemble(code: &[u8]) -> Vec<(usize, Result<Instruction, FaultKind>)> {
  let mut listing = Vec::new();
  let mut address = 0;

  while address < code.len() {
    let decoded = decode_instruction(code, address);
    let width   = match &decoded {
      Ok(instruction) => instruction.width(),
      Err(_)          => 1
    };
    listing.push((address, decoded));
    address += width;
  }

  listing
}
