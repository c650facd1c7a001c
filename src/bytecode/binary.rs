/*!
  This module is responsible for the encoding and decoding of binary instructions.

  Every instruction is one 24-bit word, carried in the low bits of a `Word`. The top two
  bits are the opcode tag; the remaining fields depend on the opcode:

  ```text
  bits  | 23..22 | 21..16 | 15 | 14 | 13..8     | 7..5      | 4..0
  ------+--------+--------+----+----+-----------+-----------+-----
  PROG  |   00   |  ptr   | -  | -  | -         | -         | -
  MEM   |   01   |  ptr   | rd | wr | addr 8..3 | addr 2..0 | -
  EXE   |   10   |  -     | -  | -  | step      | -         | -
  END   |   11   |  -     | -  | -  | -         | -         | -
  ```

  Encoding never fails. Fields wider than their slot are truncated to fit.
*/

use std::convert::TryFrom;

use super::{Instruction, Operation};
use crate::address::{Address, ADDRESS_MASK};
use crate::error::{IsaError, Result};

// If you change this you must also change `encode` and `try_decode_instruction`.
pub type Word = u32;

/// Bits of a word that may be set.
pub const WORD_MASK       : Word  = 0xFF_FFFF;
/// Bytes per word in a binary listing.
pub const WORD_BYTES      : usize = 3;

pub const TAG_SHIFT       : u32   = 22;
pub const PTR_SHIFT       : u32   = 16;
pub const PTR_MASK        : Word  = 0x3F;
pub const READ_SHIFT      : u32   = 15;
pub const WRITE_SHIFT     : u32   = 14;
pub const FLAG_MASK       : Word  = 0x1;
pub const ADDR_SHIFT      : u32   = 5;
pub const ADDR_MASK       : Word  = ADDRESS_MASK as Word;
pub const STEP_SHIFT      : u32   = 8;
pub const STEP_MASK       : Word  = 0x3F;

/**
  Encodes the raw fields of an instruction. Fields the opcode does not use are ignored,
  and each used field is masked to its width, so this is total over all inputs.
*/
pub fn encode(operation: Operation, ptr: Word, rd: Word, wr: Word, addr: Word) -> Word {
  let tag = (operation.tag() as Word) << TAG_SHIFT;
  match operation {

    Operation::Prog => {
      tag | (ptr & PTR_MASK) << PTR_SHIFT
    }

    Operation::Mem => {
      tag
        | (ptr  & PTR_MASK)  << PTR_SHIFT
        | (rd   & FLAG_MASK) << READ_SHIFT
        | (wr   & FLAG_MASK) << WRITE_SHIFT
        | (addr & ADDR_MASK) << ADDR_SHIFT
    }

    // The step index travels in the `ptr` argument.
    Operation::Exe => {
      tag | (ptr & STEP_MASK) << STEP_SHIFT
    }

    Operation::End => tag,

  }
}

pub fn encode_instruction(instruction: &Instruction) -> Word {
  match *instruction {
    Instruction::Prog { ptr } => {
      encode(Operation::Prog, ptr as Word, 0, 0, 0)
    }
    Instruction::Mem { ptr, read, write, address } => {
      encode(Operation::Mem, ptr as Word, read as Word, write as Word, address.value())
    }
    Instruction::Exe { step } => {
      encode(Operation::Exe, step as Word, 0, 0, 0)
    }
    Instruction::End => {
      encode(Operation::End, 0, 0, 0, 0)
    }
  }
}

/// The opcode named by the top two bits of a 24-bit word.
pub fn operation_of(word: Word) -> Operation {
  match Operation::try_from(((word >> TAG_SHIFT) & 0b11) as u8) {
    Ok(operation) => operation,
    // Two bits cover all four variants.
    Err(_) => unreachable!(),
  }
}

/// Recovers the fields of a word. Returns `None` when the word is not one `encode` can
/// produce: bits set above bit 23 or in a reserved field.
pub fn try_decode_instruction(word: Word) -> Option<Instruction> {
  if word & !WORD_MASK != 0 {
    return None;
  }

  let instruction =
    match operation_of(word) {
      Operation::Prog => Instruction::Prog {
        ptr: ((word >> PTR_SHIFT) & PTR_MASK) as u8
      },
      Operation::Mem => Instruction::Mem {
        ptr     : ((word >> PTR_SHIFT) & PTR_MASK) as u8,
        read    : (word >> READ_SHIFT)  & FLAG_MASK == 1,
        write   : (word >> WRITE_SHIFT) & FLAG_MASK == 1,
        address : Address::wrapping(((word >> ADDR_SHIFT) & ADDR_MASK) as usize),
      },
      Operation::Exe => Instruction::Exe {
        step: ((word >> STEP_SHIFT) & STEP_MASK) as u8
      },
      Operation::End => Instruction::End,
    };

  match encode_instruction(&instruction) == word {
    true  => Some(instruction),
    false => None
  }
}

/// The listing form of a word: `0x` followed by six uppercase hex digits.
pub fn format_word(word: Word) -> String {
  format!("0x{:06X}", word & WORD_MASK)
}

/// Packs words into a binary listing, three big-endian bytes per word.
pub fn to_bytes(words: &[Word]) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(words.len() * WORD_BYTES);
  for word in words {
    bytes.extend_from_slice(&word.to_be_bytes()[1..]);
  }
  bytes
}

/// Unpacks a binary listing produced by `to_bytes`.
pub fn from_bytes(bytes: &[u8]) -> Result<Vec<Word>> {
  if bytes.len() % WORD_BYTES != 0 {
    return Err(IsaError::Listing {
      line    : bytes.len() / WORD_BYTES + 1,
      message : format!("{} bytes is not a whole number of 3-byte words", bytes.len()),
    });
  }
  Ok(
    bytes
      .chunks(WORD_BYTES)
      .map(|chunk| Word::from_be_bytes([0, chunk[0], chunk[1], chunk[2]]))
      .collect()
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn prog_places_ptr_at_bit_16(){
    assert_eq!(encode(Operation::Prog, 0x1F, 0, 0, 0), 0x1F_0000);
    assert_eq!(encode(Operation::Prog, 0xFF, 1, 1, 0x1FF), 0x3F_0000);
  }

  #[test]
  fn mem_fields(){
    assert_eq!(encode(Operation::Mem, 0, 1, 0, 0x1FF), 0x40_BFE0);
    assert_eq!(encode(Operation::Mem, 0, 0, 1, 0x100), 0x40_6000);
    assert_eq!(encode(Operation::Mem, 0x3F, 1, 1, 0x1FF), 0x7F_FFE0);
    // Out-of-range fields are masked, not rejected.
    assert_eq!(encode(Operation::Mem, 0x40, 2, 2, 0x200), 0x40_0000);
  }

  #[test]
  fn exe_steps_increase_by_0x100(){
    let words: Vec<Word> = (0..9).map(|k| encode(Operation::Exe, k, 0, 0, 0)).collect();
    assert_eq!(words[0], 0x80_0000);
    assert_eq!(words[8], 0x80_0800);
    for pair in words.windows(2) {
      assert_eq!(pair[1] - pair[0], 0x100);
    }
    assert!(words.iter().all(|w| w >> TAG_SHIFT == 0b10));
  }

  #[test]
  fn field_positions(){
    // Each field's lowest and highest bit, set alone.
    assert_eq!(encode(Operation::Prog, 0x01, 0, 0, 0), 0x01_0000);
    assert_eq!(encode(Operation::Prog, 0x3F, 0, 0, 0), 0x3F_0000);
    assert_eq!(encode(Operation::Mem, 0, 1, 0, 0), 0x40_8000);
    assert_eq!(encode(Operation::Mem, 0, 0, 1, 0), 0x40_4000);
    assert_eq!(encode(Operation::Mem, 0, 0, 0, 0x001), 0x40_0020);
    assert_eq!(encode(Operation::Mem, 0, 0, 0, 0x1FF), 0x40_3FE0);
    assert_eq!(encode(Operation::Exe, 0x01, 0, 0, 0), 0x80_0100);
    assert_eq!(encode(Operation::Exe, 0x3F, 0, 0, 0), 0x80_3F00);
    // Bits 4..0 are never set.
    assert_eq!(encode(Operation::Mem, 0x3F, 1, 1, 0x1FF) & 0x1F, 0);
  }

  #[test]
  fn end_ignores_arguments(){
    assert_eq!(encode(Operation::End, 0, 0, 0, 0), 0xC0_0000);
    assert_eq!(encode(Operation::End, 0x3F, 1, 1, 0x1FF), 0xC0_0000);
  }

  #[test]
  fn format_is_six_hex_digits(){
    assert_eq!(format_word(0x40_BFE0), "0x40BFE0");
    assert_eq!(format_word(0x1F_0000), "0x1F0000");
    assert_eq!(format_word(0), "0x000000");
  }

  #[test]
  fn decode_rejects_reserved_bits(){
    assert_eq!(try_decode_instruction(0x100_0000), None);
    assert_eq!(try_decode_instruction(0xC0_0001), None);
    assert_eq!(try_decode_instruction(0x80_0001), None);
    assert_eq!(try_decode_instruction(0xC0_0000), Some(Instruction::End));
  }

  #[test]
  fn bytes(){
    let words = vec![0x1F_0000, 0x40_BFE0, 0xC0_0000];
    let bytes = to_bytes(&words);
    assert_eq!(bytes, vec![0x1F, 0, 0, 0x40, 0xBF, 0xE0, 0xC0, 0, 0]);
    assert_eq!(from_bytes(&bytes).unwrap(), words);
    assert_eq!(from_bytes(&bytes[..4]).unwrap_err().kind(), "listing");
  }

  fn any_instruction() -> impl Strategy<Value = Instruction> {
    prop_oneof![
      (0u8..64).prop_map(|ptr| Instruction::Prog{ ptr }),
      (0u8..64, any::<bool>(), any::<bool>(), 0usize..512).prop_map(|(ptr, read, write, a)| {
        Instruction::Mem{ ptr, read, write, address: Address::wrapping(a) }
      }),
      (0u8..64).prop_map(|step| Instruction::Exe{ step }),
      Just(Instruction::End),
    ]
  }

  proptest! {
    #[test]
    fn top_bits_identify_operation(instruction in any_instruction()) {
      let word = encode_instruction(&instruction);
      prop_assert!(word <= WORD_MASK);
      prop_assert_eq!(operation_of(word), instruction.operation());
      prop_assert_eq!(try_decode_instruction(word), Some(instruction));
    }
  }
}
