//! Element addresses. Every cell of every operand gets a 9-bit address computed from its
//! bank's base and its linear offset. Offsets past the end of the address space wrap
//! around, so large matrices alias; that is how the accelerator addresses memory.

use std::fmt::{Display, Formatter};
use std::ops::Index;

use prettytable::{Cell, Row, Table};

use crate::bank::{BankMap, Operand};
use crate::dimension::Dimension;
use crate::TABLE_DISPLAY_FORMAT;

/// Addresses are 9 bits wide.
pub const ADDRESS_MASK: usize = 0x1FF;

/// A 9-bit memory address.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default)]
pub struct Address(u16);

impl Address {
  /// Truncates `offset` to 9 bits. Not an error; values above `0x1FF` alias.
  pub fn wrapping(offset: usize) -> Address {
    Address((offset & ADDRESS_MASK) as u16)
  }

  pub fn value(&self) -> u32 {
    self.0 as u32
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "0x{:03X}", self.0)
  }
}

/// A row-major `rows x cols` array of addresses for one operand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Grid {
  rows  : usize,
  cols  : usize,
  cells : Vec<Address>,
}

impl Grid {

  /// Fills the grid with `offset(row, col)`, wrapped to 9 bits.
  fn build<F>(rows: usize, cols: usize, offset: F) -> Grid
    where F: Fn(usize, usize) -> usize
  {
    let mut cells = Vec::with_capacity(rows * cols);
    for i in 0..rows {
      for j in 0..cols {
        cells.push(Address::wrapping(offset(i, j)));
      }
    }
    Grid { rows, cols, cells }
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn get(&self, row: usize, col: usize) -> Option<Address> {
    if row < self.rows && col < self.cols {
      Some(self.cells[row * self.cols + col])
    } else {
      None
    }
  }

  /// Renders the grid with one table row per matrix row.
  pub fn to_table(&self, name: &str) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);

    let mut titles = vec![Cell::new("").style_spec("ubr")];
    titles.extend((0..self.cols).map(|j| Cell::new(&format!("[{}]", j)).style_spec("ub")));
    table.set_titles(Row::new(titles));

    for i in 0..self.rows {
      let mut cells = vec![Cell::new(&format!("{}[{}]", name, i)).style_spec("r")];
      cells.extend(
        self.cells[i * self.cols..(i + 1) * self.cols]
            .iter()
            .map(|address| Cell::new(&address.to_string()))
      );
      table.add_row(Row::new(cells));
    }
    table
  }
}

/// Panics when `(row, col)` is outside the grid.
impl Index<(usize, usize)> for Grid {
  type Output = Address;

  fn index(&self, (row, col): (usize, usize)) -> &Address {
    assert!(
      row < self.rows && col < self.cols,
      "index ({}, {}) outside {}x{} grid", row, col, self.rows, self.cols
    );
    &self.cells[row * self.cols + col]
  }
}

/// Addresses of every element of `A`, `B`, and `C` for one kernel.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddressTable {
  pub a: Grid,
  pub b: Grid,
  pub c: Grid,
}

impl AddressTable {
  pub fn grid(&self, operand: Operand) -> &Grid {
    match operand {
      Operand::A => &self.a,
      Operand::B => &self.b,
      Operand::C => &self.c,
    }
  }
}

/**
  Computes the address of every operand element.

  Square kernels store `A` and `C` row-major and `B` transposed (column-major), so that
  `B` streams by column during the inner product. Rectangular kernels store all three
  operands row-major. The two cases intentionally differ.
*/
pub fn compute_addresses(dim: Dimension, banks: &BankMap) -> AddressTable {
  let base_a = banks.base(Operand::A).value() as usize;
  let base_b = banks.base(Operand::B).value() as usize;
  let base_c = banks.base(Operand::C).value() as usize;

  match dim {
    Dimension::Square { n } => {
      AddressTable {
        a: Grid::build(n, n, |i, j| base_a + i * n + j),
        b: Grid::build(n, n, |i, j| base_b + j * n + i),
        c: Grid::build(n, n, |i, j| base_c + i * n + j),
      }
    }

    Dimension::Rectangular { m, n, p } => {
      AddressTable {
        a: Grid::build(m, n, |i, j| base_a + i * n + j),
        b: Grid::build(n, p, |i, j| base_b + i * p + j),
        c: Grid::build(m, p, |i, j| base_c + i * p + j),
      }
    }
  }
}
