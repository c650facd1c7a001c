/*!
  The shape of a matrix multiply `C = A * B`. `A` is `m x n`, `B` is `n x p`, and `C` is
  `m x p`, so `n` is always the shared inner dimension. A square multiply has
  `m = n = p` and is kept as its own variant because its address layout differs (see
  `crate::address`).
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  branch::alt,
  character::complete::{char as one_char, digit1, space0},
  combinator::{all_consuming, map, map_res},
  sequence::{delimited, separated_pair},
  IResult
};

use crate::error::{IsaError, Result};

/// Largest extent the accelerator model accepts for any one side of a matrix.
pub const MAX_EXTENT: usize = 256;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Dimension {
  Square { n: usize },
  Rectangular { m: usize, n: usize, p: usize },
}

impl Dimension {

  /// A validated square shape.
  pub fn square(n: usize) -> Result<Dimension> {
    let dim = Dimension::Square { n };
    dim.validate()?;
    Ok(dim)
  }

  /// A validated rectangular shape: `A` is `m x n`, `B` is `n x p`.
  pub fn rectangular(m: usize, n: usize, p: usize) -> Result<Dimension> {
    let dim = Dimension::Rectangular { m, n, p };
    dim.validate()?;
    Ok(dim)
  }

  /**
    Builds a dimension from the two operand shapes `a_rows x a_cols` and
    `b_rows x b_cols`. The inner extents have to agree. When all four extents are equal
    the result is `Square`, otherwise `Rectangular`.
  */
  pub fn from_shapes(a_rows: usize, a_cols: usize, b_rows: usize, b_cols: usize)
    -> Result<Dimension>
  {
    if a_cols != b_rows {
      return Err(IsaError::IncompatibleShapes { a_cols, b_rows });
    }
    if a_rows == a_cols && b_rows == b_cols && a_rows == b_cols {
      Dimension::square(a_rows)
    } else {
      Dimension::rectangular(a_rows, a_cols, b_cols)
    }
  }

  /// Rows of `A` and of `C`.
  pub fn rows(&self) -> usize {
    match *self {
      Dimension::Square { n }            => n,
      Dimension::Rectangular { m, .. }   => m,
    }
  }

  /// The reduction extent: columns of `A`, rows of `B`.
  pub fn inner(&self) -> usize {
    match *self {
      Dimension::Square { n }            => n,
      Dimension::Rectangular { n, .. }   => n,
    }
  }

  /// Columns of `B` and of `C`.
  pub fn cols(&self) -> usize {
    match *self {
      Dimension::Square { n }            => n,
      Dimension::Rectangular { p, .. }   => p,
    }
  }

  pub fn is_square(&self) -> bool {
    match self {
      Dimension::Square { .. } => true,
      _                        => false
    }
  }

  /// `(m, n, p)`, with all three equal for a square shape.
  pub fn extents(&self) -> (usize, usize, usize) {
    (self.rows(), self.inner(), self.cols())
  }

  /// Checks every extent is in `[1, MAX_EXTENT]`.
  pub fn validate(&self) -> Result<()> {
    let (m, n, p) = self.extents();
    for (name, value) in &[("M", m), ("N", n), ("P", p)] {
      if *value == 0 || *value > MAX_EXTENT {
        return Err(IsaError::InvalidDimension(format!(
          "{} = {} is outside 1..={}", name, value, MAX_EXTENT
        )));
      }
    }
    Ok(())
  }

  /// Number of instructions `crate::kernel::emit` produces for this shape.
  pub fn instruction_count(&self) -> usize {
    let (rows, inner, cols) = self.extents();
    if rows == 0 || inner == 0 || cols == 0 {
      return 1;
    }
    1 + rows * cols * (3 + inner * 11)
  }
}

impl Display for Dimension {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Dimension::Square { n } => {
        write!(f, "{}x{}", n, n)
      }
      Dimension::Rectangular { m, n, p } => {
        write!(f, "{}x{} * {}x{}", m, n, n, p)
      }
    }
  }
}

// region Shape text

enum ShapeText {
  Size(usize),
  Single(usize, usize),
  Pair((usize, usize), (usize, usize)),
}

fn extent(input: &str) -> IResult<&str, usize> {
  map_res(digit1, |digits: &str| digits.parse::<usize>())(input)
}

fn matrix_shape(input: &str) -> IResult<&str, (usize, usize)> {
  separated_pair(extent, alt((one_char('x'), one_char('X'))), extent)(input)
}

fn shape_text(input: &str) -> IResult<&str, ShapeText> {
  alt((
    map(
      separated_pair(matrix_shape, delimited(space0, one_char('*'), space0), matrix_shape),
      |(a, b)| ShapeText::Pair(a, b)
    ),
    map(matrix_shape, |(rows, cols)| ShapeText::Single(rows, cols)),
    map(extent, ShapeText::Size),
  ))(input)
}

/// Accepts `"N"`, `"NxN"`, or `"MxN * NxP"`.
impl FromStr for Dimension {
  type Err = IsaError;

  fn from_str(text: &str) -> Result<Dimension> {
    let parsed = all_consuming(delimited(space0, shape_text, space0))(text);
    match parsed {
      Ok((_, ShapeText::Size(n)))                      => Dimension::square(n),
      Ok((_, ShapeText::Single(rows, cols))) if rows == cols => Dimension::square(rows),
      Ok((_, ShapeText::Single(rows, cols)))           => Err(IsaError::InvalidDimension(
        format!("a single shape must be square, got {}x{}", rows, cols)
      )),
      Ok((_, ShapeText::Pair((m, n), (k, p))))         => Dimension::from_shapes(m, n, k, p),
      Err(_) => Err(IsaError::InvalidDimension(format!("cannot parse shape `{}`", text))),
    }
  }
}

// endregion

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accessors(){
    let d = Dimension::rectangular(2, 3, 5).unwrap();
    assert_eq!(d.extents(), (2, 3, 5));
    assert!(!d.is_square());
    let s = Dimension::square(4).unwrap();
    assert_eq!(s.extents(), (4, 4, 4));
    assert!(s.is_square());
  }

  #[test]
  fn rejects_out_of_range(){
    assert!(Dimension::square(0).is_err());
    assert!(Dimension::square(257).is_err());
    assert!(Dimension::square(256).is_ok());
    assert!(Dimension::rectangular(1, 0, 1).is_err());
    assert!(Dimension::Rectangular{ m: 3, n: 300, p: 1 }.validate().is_err());
  }

  #[test]
  fn from_shapes_checks_inner_dimension(){
    let err = Dimension::from_shapes(2, 3, 4, 5).unwrap_err();
    assert_eq!(err.kind(), "incompatible_shapes");
    assert_eq!(Dimension::from_shapes(3, 3, 3, 3).unwrap(), Dimension::Square{ n: 3 });
    assert_eq!(
      Dimension::from_shapes(2, 3, 3, 5).unwrap(),
      Dimension::Rectangular{ m: 2, n: 3, p: 5 }
    );
  }

  #[test]
  fn display(){
    assert_eq!(Dimension::Square{ n: 4 }.to_string(), "4x4");
    assert_eq!(Dimension::Rectangular{ m: 2, n: 3, p: 5 }.to_string(), "2x3 * 3x5");
  }

  #[test]
  fn parse_shape_text(){
    assert_eq!("4".parse::<Dimension>().unwrap(), Dimension::Square{ n: 4 });
    assert_eq!(" 8x8 ".parse::<Dimension>().unwrap(), Dimension::Square{ n: 8 });
    assert_eq!(
      "2x3 * 3x5".parse::<Dimension>().unwrap(),
      Dimension::Rectangular{ m: 2, n: 3, p: 5 }
    );
    assert_eq!("2X3*3X5".parse::<Dimension>().unwrap().extents(), (2, 3, 5));
    assert!("2x3".parse::<Dimension>().is_err());
    assert_eq!("2x3 * 4x5".parse::<Dimension>().unwrap_err().kind(), "incompatible_shapes");
    assert!("0".parse::<Dimension>().is_err());
    assert!("four".parse::<Dimension>().is_err());
  }

  #[test]
  fn instruction_count_formula(){
    assert_eq!(Dimension::Square{ n: 2 }.instruction_count(), 101);
    assert_eq!(Dimension::Square{ n: 1 }.instruction_count(), 15);
    assert_eq!(Dimension::Rectangular{ m: 2, n: 3, p: 4 }.instruction_count(), 1 + 8 * 36);
    assert_eq!(Dimension::Rectangular{ m: 3, n: 0, p: 2 }.instruction_count(), 1);
  }
}
