/*!

  The accelerator uses a fixed 24-bit instruction word. There are four opcodes, told
  apart by the top two bits of the word:

    PROG  00   configure the cores
    MEM   01   read or write one memory word
    EXE   10   one micro-step of a multiply-accumulate
    END   11   end of a dot-product sequence

  `Instruction` holds the unencoded fields, `binary` packs and unpacks them, and
  `assembly` reads the textual listing the kernel emitter writes.

*/

mod binary;
mod instruction;
mod assembly;

pub use binary::{encode, encode_instruction, try_decode_instruction, operation_of, format_word,
                 to_bytes, from_bytes, Word, WORD_MASK};
pub use instruction::{Instruction, Operation};
pub use assembly::{parse_listing, listing_words, disassembly_table, ListingLine};
