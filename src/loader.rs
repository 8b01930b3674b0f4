/*!
  Reading programs from disk. Two formats are understood:

  `.ls8`: one byte per line, written in binary. Anything after `#` is a comment, and blank
  lines are ignored.

  ```text
  10000010 # LDI R0,8
  00000000
  00001000
  ```

  `.asm`: mnemonic assembly, see `bytecode::assemble`.
*/

use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use log::debug;
use nom::{
  IResult,
  bytes::complete::take_while1,
  character::complete::{char as one_char, not_line_ending, space0},
  combinator::{all_consuming, map_res, opt},
  sequence::{delimited, pair, preceded},
};

use crate::bytecode::assemble;
use crate::cpu::Cpu;
use crate::error::LoadError;
use crate::observer::Observer;
use crate::symboltable::SymbolTable;

/// A program ready to be copied into memory.
#[derive(Clone, Debug)]
pub struct Program {
  pub code    : Vec<u8>,
  /// Labels, when the program was assembled from source.
  pub symbols : SymbolTable,
}

fn binary_value(input: &str) -> IResult<&str, u32> {
  map_res(
    take_while1(|c: char| c == '0' || c == '1'),
    |digits: &str| u32::from_str_radix(digits, 2)
  )(input)
}

fn ls8_line(input: &str) -> IResult<&str, Option<u32>> {
  all_consuming(delimited(
    space0,
    opt(binary_value),
    pair(space0, opt(preceded(one_char('#'), not_line_ending)))
  ))(input)
}

/// Parses `.ls8` text into values. Values are not yet checked to fit in a byte.
pub fn parse_ls8(text: &str) -> Result<Vec<u32>, LoadError> {
  let mut values = Vec::new();

  for (index, text_line) in text.lines().enumerate() {
    match ls8_line(text_line) {
      Ok((_rest, Some(value))) => values.push(value),
      Ok((_rest, None))        => {}
      Err(_e)                  => {
        return Err(LoadError::Syntax { line: index + 1, text: text_line.trim().to_string() });
      }
    }
  }

  Ok(values)
}

/// Narrows every value to a byte, reporting the first that does not fit.
pub fn checked_bytes(values: &[u32]) -> Result<Vec<u8>, LoadError> {
  values
    .iter()
    .enumerate()
    .map(|(index, value)| {
      u8::try_from(*value).map_err(|_| LoadError::ValueOutOfRange { index, value: *value })
    })
    .collect()
}

/// Reads `path`, assembling it if it has the `.asm` extension and parsing it as `.ls8` otherwise.
pub fn read_program(path: &Path) -> Result<Program, LoadError> {
  let text = fs::read_to_string(path)?;

  let is_assembly = path.extension()
                        .map(|extension| extension.eq_ignore_ascii_case("asm"))
                        .unwrap_or(false);

  let program = match is_assembly {

    true  => {
      let assembled = assemble(&text)?;
      Program { code: assembled.code, symbols: assembled.symbols }
    }

    false => {
      let values = parse_ls8(&text)?;
      Program { code: checked_bytes(&values)?, symbols: SymbolTable::new() }
    }

  };

  debug!("read {} bytes from {}", program.code.len(), path.display());
  Ok(program)
}

/// Reads the program at `path` into `cpu` at `start`. Returns the end of the program image.
pub fn load_file<O: Observer>(cpu: &mut Cpu<O>, path: &Path, start: usize)
  -> Result<usize, LoadError>
{
  let program = read_program(path)?;
  Ok(cpu.load_bytes(start, &program.code)?)
}
