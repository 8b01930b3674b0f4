/*!
  The human readable textual form of bytecode is called assembly. This module leverages the
  `strum` derives of `Opcode` to read mnemonics, and `nom` to parse each line.

  One statement per line, every part optional:

  ```text
  label:  MNEMONIC operand, operand   # comment (`;` works too)
  ```

  Operands are registers (`R0`..), numbers (`42`, `0x2A`, `0b101010`), or label names, which
  stand for the address of the labeled instruction. Labels may be used before they are defined.
*/

use std::convert::TryFrom;
use std::str::FromStr;

use log::debug;
use nom::{
  IResult,
  branch::alt,
  bytes::complete::{tag_no_case, take_while, take_while1, take_while_m_n},
  character::complete::{char as one_char, digit1, hex_digit1, not_line_ending, space0, space1},
  combinator::{all_consuming, map, map_res, not, opt, recognize},
  multi::separated_nonempty_list,
  sequence::{delimited, pair, preceded, terminated, tuple},
};

use super::{encode_instruction, Instruction, Opcode, OperandKind};
use crate::error::AssemblyError;
use crate::symboltable::SymbolTable;

/// The output of the assembler: code to be loaded at address 0, and the labels it defines.
#[derive(Clone, Debug)]
pub struct Assembled {
  pub code    : Vec<u8>,
  pub symbols : SymbolTable,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum OperandSyntax<'a> {
  Register(u32),
  Number(u32),
  Symbol(&'a str),
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Statement<'a> {
  label     : Option<&'a str>,
  operation : Option<(&'a str, Option<Vec<OperandSyntax<'a>>>)>,
}

/// An instruction whose operands wait for every label to be known.
struct Pending<'a> {
  line     : usize,
  opcode   : Opcode,
  operands : Vec<OperandSyntax<'a>>,
}

// region Parsers

fn is_identifier_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> IResult<&str, &str> {
  recognize(
    pair(
      take_while_m_n(1, 1, |c: char| c.is_ascii_alphabetic() || c == '_'),
      take_while(is_identifier_char)
    )
  )(input)
}

fn register(input: &str) -> IResult<&str, u32> {
  preceded(
    alt((one_char('R'), one_char('r'))),
    terminated(
      map_res(digit1, |digits: &str| digits.parse::<u32>()),
      not(take_while1(is_identifier_char))
    )
  )(input)
}

fn number(input: &str) -> IResult<&str, u32> {
  alt((
    map_res(
      preceded(tag_no_case("0x"), hex_digit1),
      |digits: &str| u32::from_str_radix(digits, 16)
    ),
    map_res(
      preceded(tag_no_case("0b"), take_while1(|c: char| c == '0' || c == '1')),
      |digits: &str| u32::from_str_radix(digits, 2)
    ),
    map_res(digit1, |digits: &str| digits.parse::<u32>())
  ))(input)
}

fn operand(input: &str) -> IResult<&str, OperandSyntax> {
  alt((
    map(register, OperandSyntax::Register),
    map(number, OperandSyntax::Number),
    map(identifier, OperandSyntax::Symbol)
  ))(input)
}

fn operation(input: &str) -> IResult<&str, (&str, Option<Vec<OperandSyntax>>)> {
  pair(
    identifier,
    opt(preceded(
      space1,
      separated_nonempty_list(delimited(space0, one_char(','), space0), operand)
    ))
  )(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
  preceded(alt((one_char('#'), one_char(';'))), not_line_ending)(input)
}

fn statement(input: &str) -> IResult<&str, Statement> {
  let label = terminated(identifier, pair(space0, one_char(':')));
  map(
    all_consuming(delimited(
      space0,
      tuple((opt(terminated(label, space0)), opt(operation))),
      pair(space0, opt(comment))
    )),
    |(label, operation)| Statement { label, operation }
  )(input)
}

// endregion

fn to_byte(line: usize, value: u32) -> Result<u8, AssemblyError> {
  u8::try_from(value).map_err(|_| AssemblyError::ValueOutOfRange { line, value })
}

fn resolve(pending: &Pending, position: usize, symbols: &SymbolTable) -> Result<u8, AssemblyError> {
  let line      = pending.line;
  let operation = pending.opcode;

  match (operation.operand_kind(position), pending.operands[position]) {

    (OperandKind::Register, OperandSyntax::Register(index)) => to_byte(line, index),

    (OperandKind::Register, _) => {
      Err(AssemblyError::ExpectedRegister { line, operation, position })
    }

    (OperandKind::Immediate, OperandSyntax::Number(value)) => to_byte(line, value),

    (OperandKind::Immediate, OperandSyntax::Symbol(name)) => {
      let address =
        symbols.get_address(name)
               .ok_or_else(|| AssemblyError::UndefinedSymbol { line, name: name.to_string() })?;
      to_byte(line, address as u32)
    }

    (OperandKind::Immediate, OperandSyntax::Register(_)) => {
      Err(AssemblyError::ExpectedImmediate { line, operation, position })
    }

  }
}

/**
  Assembles `text` into bytecode. The first pass parses every line and assigns addresses to
  labels; the second resolves operands and encodes.
*/
pub fn assemble(text: &str) -> Result<Assembled, AssemblyError> {
  let mut symbols = SymbolTable::new();
  let mut pending: Vec<Pending> = Vec::new();
  let mut address = 0usize;

  for (index, text_line) in text.lines().enumerate() {
    let line = index + 1;

    let parsed = match statement(text_line) {
      Ok((_rest, parsed)) => parsed,
      Err(_e)             => {
        return Err(AssemblyError::Syntax { line, text: text_line.trim().to_string() });
      }
    };

    if let Some(name) = parsed.label {
      if symbols.get_address(name).is_some() {
        return Err(AssemblyError::DuplicateLabel { line, name: name.to_string() });
      }
      symbols.insert(name, address).map_err(|_| {
        AssemblyError::AddressAlreadyLabeled { line, name: name.to_string(), address }
      })?;
    }

    if let Some((mnemonic, operands)) = parsed.operation {
      let opcode =
        Opcode::from_str(&mnemonic.to_ascii_uppercase())
          .map_err(|_| AssemblyError::NotAnOperation { line, name: mnemonic.to_string() })?;
      let operands = operands.unwrap_or_default();

      if operands.len() != opcode.operand_count() {
        return Err(AssemblyError::WrongArity {
          line,
          operation : opcode,
          expected  : opcode.operand_count(),
          found     : operands.len()
        });
      }

      address += opcode.width();
      pending.push(Pending { line, opcode, operands });
    }
  }

  let mut code = Vec::with_capacity(address);
  for item in &pending {
    let mut bytes = Vec::with_capacity(item.operands.len());
    for position in 0..item.operands.len() {
      bytes.push(resolve(item, position, &symbols)?);
    }
    // Arity was checked in the first pass.
    if let Some(instruction) = Instruction::new(item.opcode, &bytes) {
      encode_instruction(&instruction, &mut code);
    }
  }

  debug!("assembled {} bytes with {} labels", code.len(), symbols.len());
  Ok(Assembled { code, symbols })
}
