//! The JSON payload handed back to a caller that asked for a kernel: the listing itself,
//! plus a summary of the shape and memory map it was generated for. Transport is the
//! caller's business; this only builds and serializes the document.

use serde::Serialize;

use crate::bank::{BankMap, MemoryMap};
use crate::dimension::Dimension;
use crate::error::{IsaError, Result};
use crate::kernel::InstructionStream;

/// `n` for a square kernel, `"MxN * NxP"` for a rectangular one.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MatrixSize {
  Square(usize),
  Rectangular(String),
}

impl From<Dimension> for MatrixSize {
  fn from(dim: Dimension) -> MatrixSize {
    match dim {
      Dimension::Square { n }         => MatrixSize::Square(n),
      Dimension::Rectangular { .. }   => MatrixSize::Rectangular(dim.to_string()),
    }
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MemoryInfo {
  pub matrix_size         : MatrixSize,
  pub memory_map          : MemoryMap,
  /// Whether the size had to be supplied separately from the source.
  pub requires_size_input : bool,
  pub is_square           : bool,
  /// `[M, N, P]` for rectangular kernels.
  pub dimensions          : Option<[usize; 3]>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CompileReport {
  pub success          : bool,
  pub isa_instructions : String,
  pub memory_info      : MemoryInfo,
}

impl CompileReport {
  pub fn new(stream: &InstructionStream, banks: &BankMap, requires_size_input: bool) -> CompileReport {
    let dim = stream.dimension();
    let dimensions = match dim {
      Dimension::Square { .. }          => None,
      Dimension::Rectangular { m, n, p } => Some([m, n, p]),
    };

    CompileReport {
      success          : true,
      isa_instructions : stream.to_text(),
      memory_info      : MemoryInfo {
        matrix_size : dim.into(),
        memory_map  : banks.to_memory_map(),
        requires_size_input,
        is_square   : dim.is_square(),
        dimensions,
      },
    }
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}

/// A failed request: the error's kind and message. Nothing partial is reported.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ErrorReport {
  pub success             : bool,
  pub kind                : String,
  pub error               : String,
  pub requires_size_input : bool,
}

impl ErrorReport {
  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}

impl From<&IsaError> for ErrorReport {
  fn from(error: &IsaError) -> ErrorReport {
    ErrorReport {
      success             : false,
      kind                : error.kind().to_string(),
      error               : error.to_string(),
      // Only an out-of-range size can be fixed by asking for another one.
      requires_size_input : match error {
        IsaError::InvalidDimension(_) => true,
        _                             => false
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kernel::compile;
  use serde_json::{json, Value};

  #[test]
  fn square_report(){
    let banks = BankMap::default();
    let stream = compile(Dimension::Square{ n: 2 }, &banks).unwrap();
    let report = CompileReport::new(&stream, &banks, false);
    let value: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(value["success"], json!(true));
    assert_eq!(value["memory_info"]["matrix_size"], json!(2));
    assert_eq!(value["memory_info"]["is_square"], json!(true));
    assert_eq!(value["memory_info"]["dimensions"], Value::Null);
    assert_eq!(value["memory_info"]["memory_map"]["banks"]["B"]["base_row"], json!("0x080"));
    assert_eq!(value["isa_instructions"].as_str().unwrap(), stream.to_text());
  }

  #[test]
  fn rectangular_report(){
    let banks = BankMap::default();
    let stream = compile(Dimension::Rectangular{ m: 2, n: 3, p: 4 }, &banks).unwrap();
    let report = CompileReport::new(&stream, &banks, true);

    assert_eq!(report.memory_info.matrix_size, MatrixSize::Rectangular("2x3 * 3x4".to_string()));
    assert_eq!(report.memory_info.dimensions, Some([2, 3, 4]));
    assert!(!report.memory_info.is_square);
    assert!(report.memory_info.requires_size_input);
  }

  #[test]
  fn error_report(){
    let error = Dimension::square(300).unwrap_err();
    let report = ErrorReport::from(&error);
    assert!(!report.success);
    assert_eq!(report.kind, "invalid_dimension");
    assert!(report.error.contains("300"));
    assert!(report.requires_size_input);
  }

  #[test]
  fn shape_mismatch_does_not_ask_for_sizes(){
    let error = Dimension::from_shapes(2, 3, 4, 5).unwrap_err();
    let report = ErrorReport::from(&error);
    assert_eq!(report.kind, "incompatible_shapes");
    assert_eq!(report.error, "Incompatible matrix dimensions: 3 != 4");
    assert!(!report.requires_size_input);
  }
}
