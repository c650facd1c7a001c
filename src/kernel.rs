/*!
  Functions to produce the instruction stream of a matrix-multiply kernel. Accepts a
  shape and the addresses of its operands and turns them into an ordered listing of
  annotated instruction words.

  The emitted program is:
  ```text
  PROG                                  once, configures every core
  for i in rows(C):
    for j in cols(C):
      MEM read 0x1FF                    dummy read, primes the accumulator
      for k in inner:
        MEM read A[i][k]
        MEM read B[k][j]
        EXE 0 .. EXE 8                  one multiply-accumulate
      MEM write C[i][j]
      END
  ```
  Nothing is scheduled or reordered; emission order is execution order.
*/

use std::fmt::{Display, Formatter};

use tracing::debug;
#[cfg(feature = "trace_emission")]
use tracing::trace;

use crate::address::{compute_addresses, Address, AddressTable};
use crate::bank::BankMap;
use crate::bytecode::{encode_instruction, format_word, Instruction, Word};
use crate::dimension::Dimension;
use crate::error::Result;

/// Pointer for the configuration instruction: 4-bit MAC mode on every core.
pub const MAC_MODE_ALL_CORES: u8 = 0x1F;
/// Micro-steps in one multiply-accumulate. Fixed by the accelerator model.
pub const MAC_STEPS: u8 = 9;
/// The dummy read that opens every dot-product sequence targets this address.
pub const DUMMY_READ_ADDRESS: usize = 0x1FF;

/// An instruction together with its encoding and a note for the listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Annotated {
  pub instruction : Instruction,
  pub word        : Word,
  pub comment     : Option<String>,
}

impl Annotated {
  fn new(instruction: Instruction, comment: String) -> Annotated {
    Annotated {
      word: encode_instruction(&instruction),
      instruction,
      comment: Some(comment),
    }
  }
}

impl Display for Annotated {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match &self.comment {
      Some(comment) => write!(f, "{}  ; {}", format_word(self.word), comment),
      None          => write!(f, "{}", format_word(self.word)),
    }
  }
}

/// One line of the listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Line {
  Instruction(Annotated),
  Comment(String),
  Blank,
}

impl Display for Line {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Line::Instruction(annotated) => write!(f, "{}", annotated),
      Line::Comment(text)          => write!(f, "; {}", text),
      Line::Blank                  => Ok(()),
    }
  }
}

/// The complete, immutable output of one kernel invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstructionStream {
  dimension : Dimension,
  lines     : Vec<Line>,
}

impl InstructionStream {

  pub fn dimension(&self) -> Dimension {
    self.dimension
  }

  pub fn lines(&self) -> &[Line] {
    &self.lines
  }

  /// The instructions in emission order, without comment or blank lines.
  pub fn instructions(&self) -> impl Iterator<Item = &Annotated> + '_ {
    self.lines.iter().filter_map(|line| match line {
      Line::Instruction(annotated) => Some(annotated),
      _ => None
    })
  }

  pub fn words(&self) -> Vec<Word> {
    self.instructions().map(|annotated| annotated.word).collect()
  }

  /// Number of instructions; comments and blank lines are not counted.
  pub fn len(&self) -> usize {
    self.instructions().count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The listing text, one line per `Line`, joined with newlines.
  pub fn to_text(&self) -> String {
    self.lines
        .iter()
        .map(Line::to_string)
        .collect::<Vec<String>>()
        .join("\n")
  }
}

impl Display for InstructionStream {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.to_text())
  }
}

/// Accumulates lines while the kernel is emitted.
struct Emitter {
  lines: Vec<Line>,
}

impl Emitter {
  fn instruction(&mut self, instruction: Instruction, comment: String) {
    let annotated = Annotated::new(instruction, comment);
    #[cfg(feature = "trace_emission")]
    trace!(word = %format_word(annotated.word), %instruction, "emit");
    self.lines.push(Line::Instruction(annotated));
  }

  fn comment(&mut self, text: String) {
    self.lines.push(Line::Comment(text));
  }
}

fn shape_comment(dim: Dimension) -> String {
  match dim {
    Dimension::Square { .. } => {
      format!("Square matrix multiplication kernel ({})", dim)
    }
    Dimension::Rectangular { .. } => {
      format!("Rectangular matrix multiplication kernel ({})", dim)
    }
  }
}

/**
  Emits the kernel for `dim` using the operand addresses in `table`.

  Performs no validation. `table` must come from `compute_addresses` with the same
  `dim`. A zero extent gives a stream holding only the configuration instruction.
*/
pub fn emit(dim: Dimension, table: &AddressTable) -> InstructionStream {
  let (rows, inner, cols) = dim.extents();
  let mut emitter = Emitter {
    lines: Vec::with_capacity(dim.instruction_count() + rows * (cols + 1) + 1)
  };

  emitter.instruction(
    Instruction::Prog { ptr: MAC_MODE_ALL_CORES },
    "Program cores for 4-bit MAC".to_string()
  );
  emitter.comment(shape_comment(dim));

  // A zero extent leaves nothing to multiply.
  let rows = if inner == 0 || cols == 0 { 0 } else { rows };

  for i in 0..rows {
    emitter.comment(format!("--- Row {} ---", i));

    for j in 0..cols {
      emitter.instruction(
        Instruction::read(Address::wrapping(DUMMY_READ_ADDRESS)),
        "Dummy read".to_string()
      );

      for k in 0..inner {
        emitter.instruction(Instruction::read(table.a[(i, k)]), format!("A[{}][{}]", i, k));
        emitter.instruction(Instruction::read(table.b[(k, j)]), format!("B[{}][{}]", k, j));
        for step in 0..MAC_STEPS {
          emitter.instruction(Instruction::Exe { step }, format!("MAC_STEP{}", step + 1));
        }
      }

      emitter.instruction(Instruction::write(table.c[(i, j)]), format!("C[{}][{}]", i, j));
      emitter.instruction(Instruction::End, "End sequence".to_string());
      emitter.lines.push(Line::Blank);
    }
  }

  let stream = InstructionStream { dimension: dim, lines: emitter.lines };
  debug!(shape = %dim, instructions = stream.len(), "emitted kernel");
  stream
}

/// Validates `dim`, maps its operands onto `banks`, and emits the kernel. Either the
/// whole stream is returned or nothing is.
pub fn compile(dim: Dimension, banks: &BankMap) -> Result<InstructionStream> {
  dim.validate()?;
  let table = compute_addresses(dim, banks);
  Ok(emit(dim, &table))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{operation_of, parse_listing, listing_words, Operation};

  fn square(n: usize) -> InstructionStream {
    compile(Dimension::Square{ n }, &BankMap::default()).unwrap()
  }

  #[test]
  fn square_two_has_101_instructions(){
    // PROG plus four (i, j) blocks of 1 + 2 * 11 + 1 + 1 = 25 words.
    assert_eq!(square(2).len(), 101);
    assert_eq!(square(2).len(), Dimension::Square{ n: 2 }.instruction_count());
  }

  #[test]
  fn square_one_listing(){
    let stream = square(1);
    assert_eq!(stream.len(), 15);
    let expected = [
      "0x1F0000  ; Program cores for 4-bit MAC",
      "; Square matrix multiplication kernel (1x1)",
      "; --- Row 0 ---",
      "0x40BFE0  ; Dummy read",
      "0x408000  ; A[0][0]",
      "0x409000  ; B[0][0]",
      "0x800000  ; MAC_STEP1",
      "0x800100  ; MAC_STEP2",
      "0x800200  ; MAC_STEP3",
      "0x800300  ; MAC_STEP4",
      "0x800400  ; MAC_STEP5",
      "0x800500  ; MAC_STEP6",
      "0x800600  ; MAC_STEP7",
      "0x800700  ; MAC_STEP8",
      "0x800800  ; MAC_STEP9",
      "0x406000  ; C[0][0]",
      "0xC00000  ; End sequence",
      "",
    ].join("\n");
    assert_eq!(stream.to_text(), expected);
  }

  #[test]
  fn block_structure(){
    let stream = square(2);
    let words = stream.words();
    assert_eq!(words[0], 0x1F_0000);

    // Each (i, j) block is 1 + 2 * 11 + 2 = 25 words long.
    for block in words[1..].chunks(25) {
      assert_eq!(block[0], 0x40_BFE0);
      assert_eq!(operation_of(block[23]), Operation::Mem);
      assert_eq!(block[23] & 0x4000, 0x4000);
      assert_eq!(block[24], 0xC0_0000);
    }
  }

  #[test]
  fn square_reads_transposed_b(){
    let stream = square(2);
    let comments: Vec<&Annotated> = stream.instructions().collect();
    // Block (0, 1): dummy read, then A[0][0], B[0][1].
    let b01 = comments[1 + 25 + 2];
    assert_eq!(b01.comment.as_deref(), Some("B[0][1]"));
    assert_eq!(b01.instruction, Instruction::read(Address::wrapping(0x082)));
  }

  #[test]
  fn rectangular_listing_shape(){
    let dim = Dimension::rectangular(2, 3, 4).unwrap();
    let stream = compile(dim, &BankMap::default()).unwrap();
    assert_eq!(stream.len(), dim.instruction_count());
    assert_eq!(stream.len(), 1 + 2 * 4 * (3 + 3 * 11));

    let text = stream.to_text();
    assert!(text.contains("; Rectangular matrix multiplication kernel (2x3 * 3x4)"));
    assert!(text.contains("; --- Row 1 ---"));
    assert!(!text.contains("; --- Row 2 ---"));
    // B is row-major here: B[1][0] sits 4 words past B's base.
    assert!(text.contains(&format!("0x{:06X}  ; B[1][0]", 0x40_8000 | (0x084 << 5))));
  }

  #[test]
  fn blank_line_after_every_sequence(){
    let stream = square(3);
    let blanks = stream.lines().iter().filter(|line| **line == Line::Blank).count();
    assert_eq!(blanks, 9);
    let text = stream.to_text();
    assert_eq!(text.matches("End sequence\n\n").count(), 8);
    assert!(text.ends_with("End sequence\n"));
  }

  #[test]
  fn deterministic(){
    assert_eq!(square(3).to_text(), square(3).to_text());
    assert_eq!(square(3), square(3));
  }

  #[test]
  fn zero_extent_emits_only_prog(){
    let dim = Dimension::Square{ n: 0 };
    let stream = emit(dim, &compute_addresses(dim, &BankMap::default()));
    assert_eq!(stream.words(), vec![0x1F_0000]);

    let dim = Dimension::Rectangular{ m: 3, n: 0, p: 2 };
    let stream = emit(dim, &compute_addresses(dim, &BankMap::default()));
    assert_eq!(stream.len(), 1);
    assert!(!stream.to_text().contains("Row"));
  }

  #[test]
  fn compile_rejects_invalid_shapes(){
    let err = compile(Dimension::Square{ n: 0 }, &BankMap::default()).unwrap_err();
    assert_eq!(err.kind(), "invalid_dimension");
    assert!(compile(Dimension::Rectangular{ m: 1, n: 257, p: 1 }, &BankMap::default()).is_err());
  }

  #[test]
  fn opcodes_survive_the_listing(){
    let stream = compile(Dimension::rectangular(3, 2, 2).unwrap(), &BankMap::default()).unwrap();
    let text = stream.to_text();
    assert_eq!(listing_words(&text).unwrap(), stream.words());
    assert_eq!(parse_listing(&text).unwrap().len(), stream.lines().len());
    for annotated in stream.instructions() {
      assert_eq!(operation_of(annotated.word), annotated.instruction.operation());
    }
  }
}
