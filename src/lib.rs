/*!
  Generates instruction streams for a processing-in-memory accelerator that multiplies
  matrices. The pipeline runs one way:

  ```text
  Dimension -> [`compute_addresses`] -> AddressTable -> [`emit`] -> InstructionStream
                                                          │
                                               [`encode_instruction`] per word
  ```

  `compile` runs the whole pipeline after validating the shape.
*/

#[macro_use] extern crate lazy_static;

pub mod error;
pub mod dimension;
pub mod bank;
pub mod address;
pub mod bytecode;
pub mod kernel;
pub mod report;

use prettytable::format as TableFormat;

pub use address::{compute_addresses, Address, AddressTable, Grid};
pub use bank::{BankMap, MemoryMap, Operand};
pub use bytecode::{encode, encode_instruction, Instruction, Operation, Word};
pub use dimension::Dimension;
pub use error::{IsaError, Result};
pub use kernel::{compile, emit, InstructionStream, Line};
pub use report::{CompileReport, ErrorReport};

lazy_static! {
  pub(crate) static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}
