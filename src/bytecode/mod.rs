/*!

  The LS-8 is an 8-bit machine: every register holds a byte, and instructions are a sequence of
  one to three bytes. The first byte is the opcode, and the number of operand bytes that follow
  is encoded in the opcode itself (its two high bits). The sizes of instruction components are as
  follows:

    Opcode:     8 bits
    Register:   8 bits (an index into the register file)
    Immediate:  8 bits

  There is no alignment: instructions are packed back to back starting at the load address.

  As in the rest of this codebase, an enum is used for the opcode alone rather than the whole
  instruction. The machine decodes operands lazily, straight from memory, so the `Instruction`
  type only exists for the assembler, the disassembler and diagnostics.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{assemble, Assembled};
pub use binary::{decode_instruction, disassemble, encode_instruction, encode_program};
pub use instruction::{Instruction, Opcode, OperandKind};
