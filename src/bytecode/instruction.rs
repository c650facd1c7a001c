use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::address::Address;

/**
  Opcodes of the accelerator. The discriminant of each variant is the 2-bit tag stored
  in bits 22 and 23 of the encoded word, so a word's opcode can be recovered from its top
  bits alone. The order the opcodes are listed below is therefore significant.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u8)]
pub enum Operation {
  /// Configure the cores.
  #[strum(serialize = "PROG")]
  Prog = 0b00,
  /// Read or write one memory word.
  #[strum(serialize = "MEM")]
  Mem  = 0b01,
  /// One micro-step of a multiply-accumulate.
  #[strum(serialize = "EXE")]
  Exe  = 0b10,
  /// Terminates a dot-product sequence.
  #[strum(serialize = "END")]
  End  = 0b11,
}

impl Operation {
  pub fn tag(&self) -> u8 {
    Into::<u8>::into(*self)
  }
}

/// Holds the unencoded fields of an instruction. Each opcode carries only the fields
/// it uses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [Tag:2][Ptr:6][Reserved:16]
  Prog { ptr: u8 },
  /// [Tag:2][Ptr:6][Rd:1][Wr:1][Addr:9][Reserved:5]
  Mem { ptr: u8, read: bool, write: bool, address: Address },
  /// [Tag:2][Reserved:8][Step:6][Reserved:8]
  Exe { step: u8 },
  /// [Tag:2][Reserved:22]
  End,
}

impl Instruction {

  /// A memory read of `address` on core 0.
  pub fn read(address: Address) -> Instruction {
    Instruction::Mem { ptr: 0, read: true, write: false, address }
  }

  /// A memory write of `address` on core 0.
  pub fn write(address: Address) -> Instruction {
    Instruction::Mem { ptr: 0, read: false, write: true, address }
  }

  pub fn operation(&self) -> Operation {
    match self {
      Instruction::Prog { .. } => Operation::Prog,
      Instruction::Mem { .. }  => Operation::Mem,
      Instruction::Exe { .. }  => Operation::Exe,
      Instruction::End         => Operation::End,
    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Prog { ptr } => {
        write!(f, "{}({:#04X})", self.operation(), ptr)
      }

      Instruction::Mem { ptr, read, write, address } => {
        write!(
          f,
          "{}(ptr={}, rd={}, wr={}, {})",
          self.operation(), ptr, *read as u8, *write as u8, address
        )
      }

      Instruction::Exe { step } => {
        write!(f, "{}({})", self.operation(), step)
      }

      Instruction::End => {
        write!(f, "{}", self.operation())
      }

    }
  }
}
