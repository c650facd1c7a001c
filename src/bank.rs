/*!
  Memory banks. Each operand of the multiply lives in its own bank, which is nothing
  more than a base address in the shared 9-bit address space. The map is fixed for the
  lifetime of a run and may be shared freely.

  On disk the map is the JSON document

  ```text
  {
    "banks": {
      "A": {"bank_id": 0, "base_row": "0x000"},
      "B": {"bank_id": 1, "base_row": "0x080"},
      "C": {"bank_id": 2, "base_row": "0x100"}
    }
  }
  ```
*/

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use nom::{
  branch::alt,
  bytes::complete::tag,
  character::complete::hex_digit1,
  combinator::all_consuming,
  sequence::preceded,
  IResult
};
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use tracing::debug;

use crate::address::{Address, ADDRESS_MASK};
use crate::error::{IsaError, Result};

/// The three operands of `C = A * B`.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, Serialize, Deserialize,
  Clone,        Copy,          Eq,         PartialEq, Ord, PartialOrd, Debug, Hash
)]
pub enum Operand {
  A,
  B,
  C,
}

impl Operand {
  pub const ALL: [Operand; 3] = [Operand::A, Operand::B, Operand::C];

  fn bank_id(&self) -> u8 {
    match self {
      Operand::A => 0,
      Operand::B => 1,
      Operand::C => 2,
    }
  }
}

/// One entry of the on-disk memory map.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BankEntry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bank_id  : Option<u8>,
  /// Hexadecimal base address, e.g. `"0x080"`.
  pub base_row : String,
}

/// The serialized form of a `BankMap`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MemoryMap {
  pub banks: BTreeMap<Operand, BankEntry>,
}

/// Base address of each operand's bank.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BankMap {
  a: Address,
  b: Address,
  c: Address,
}

impl BankMap {

  /// Fails if any base does not fit in 9 bits. Unlike element addresses, bases are
  /// never wrapped.
  pub fn new(a: usize, b: usize, c: usize) -> Result<BankMap> {
    Ok(BankMap {
      a: checked_base(Operand::A, a)?,
      b: checked_base(Operand::B, b)?,
      c: checked_base(Operand::C, c)?,
    })
  }

  pub fn base(&self, operand: Operand) -> Address {
    match operand {
      Operand::A => self.a,
      Operand::B => self.b,
      Operand::C => self.c,
    }
  }

  pub fn from_memory_map(map: &MemoryMap) -> Result<BankMap> {
    let mut bases = [0usize; 3];
    for (slot, operand) in bases.iter_mut().zip(Operand::ALL.iter()) {
      let entry = map.banks.get(operand).ok_or_else(|| {
        IsaError::Config(format!("memory map has no entry for bank {}", operand))
      })?;
      *slot = parse_base_address(*operand, &entry.base_row)?;
    }
    let banks = BankMap::new(bases[0], bases[1], bases[2])?;
    debug!(a = %banks.a, b = %banks.b, c = %banks.c, "loaded bank map");
    Ok(banks)
  }

  pub fn from_json(text: &str) -> Result<BankMap> {
    let map: MemoryMap = serde_json::from_str(text)?;
    BankMap::from_memory_map(&map)
  }

  /// Reads a JSON memory map from disk.
  pub fn load<P: AsRef<Path>>(path: P) -> Result<BankMap> {
    let text = fs::read_to_string(path)?;
    BankMap::from_json(&text)
  }

  pub fn to_memory_map(&self) -> MemoryMap {
    let banks =
      Operand::ALL
        .iter()
        .map(|operand| {
          let entry = BankEntry {
            bank_id  : Some(operand.bank_id()),
            base_row : self.base(*operand).to_string(),
          };
          (*operand, entry)
        })
        .collect();
    MemoryMap { banks }
  }
}

impl Default for BankMap {
  /// A at `0x000`, B at `0x080`, C at `0x100`.
  fn default() -> BankMap {
    BankMap {
      a: Address::wrapping(0x000),
      b: Address::wrapping(0x080),
      c: Address::wrapping(0x100),
    }
  }
}

fn checked_base(operand: Operand, value: usize) -> Result<Address> {
  if value > ADDRESS_MASK {
    return Err(IsaError::InvalidBaseAddress {
      operand : operand.to_string(),
      value   : format!("{:#X}", value)
    });
  }
  Ok(Address::wrapping(value))
}

fn hex_digits(input: &str) -> IResult<&str, &str> {
  preceded(alt((tag("0x"), tag("0X"))), hex_digit1)(input)
}

/// Parses the `0x`-prefixed hexadecimal base address of `operand`'s bank. Digits too
/// many for a `usize` are out of range like any other value above `0x1FF`; range
/// checking of the rest is left to `BankMap::new`.
pub fn parse_base_address(operand: Operand, text: &str) -> Result<usize> {
  let digits = match all_consuming(hex_digits)(text.trim()) {
    Ok((_, digits)) => digits,
    Err(_)          => {
      return Err(IsaError::Config(format!("`{}` is not a hexadecimal address", text)));
    }
  };
  usize::from_str_radix(digits, 16).map_err(|_| IsaError::InvalidBaseAddress {
    operand : operand.to_string(),
    value   : text.trim().to_string()
  })
}
