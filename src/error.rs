//! Error types for the ISA generator.

use thiserror::Error;

/// Everything that can go wrong between a shape request and a finished listing. The
/// core itself (address mapping, encoding, emission) is total; these come from
/// validation, configuration, and I/O.
#[derive(Debug, Error)]
pub enum IsaError {
  /// An extent outside `[1, 256]`, or no size given at all.
  #[error("Invalid dimension: {0}")]
  InvalidDimension(String),

  /// Operand shapes whose inner extents disagree: `A` has `a_cols` columns but `B`
  /// has `b_rows` rows.
  #[error("Incompatible matrix dimensions: {a_cols} != {b_rows}")]
  IncompatibleShapes {
    a_cols: usize,
    b_rows: usize,
  },

  /// A bank base address that does not fit in 9 bits. `value` is the address as
  /// written, since it may not fit in a machine word either.
  #[error("Invalid base address for bank {operand}: {value} exceeds 0x1FF")]
  InvalidBaseAddress {
    operand: String,
    value: String,
  },

  /// Malformed memory map.
  #[error("Configuration error: {0}")]
  Config(String),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  /// A text or binary listing that cannot be read back.
  #[error("Listing error on line {line}: {message}")]
  Listing {
    line: usize,
    message: String,
  },
}

impl IsaError {
  /// Stable snake-case name of the error kind, used in structured error payloads.
  pub fn kind(&self) -> &'static str {
    match self {
      IsaError::InvalidDimension(_)        => "invalid_dimension",
      IsaError::IncompatibleShapes { .. }  => "incompatible_shapes",
      IsaError::InvalidBaseAddress { .. }  => "invalid_base_address",
      IsaError::Config(_)                  => "config",
      IsaError::Json(_)                    => "json",
      IsaError::Io(_)                      => "io",
      IsaError::Listing { .. }             => "listing",
    }
  }
}

pub type Result<T> = std::result::Result<T, IsaError>;
