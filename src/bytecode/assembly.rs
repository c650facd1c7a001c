/*!
  The human readable textual form of the bytecode is called a listing. Every line is one
  of three things:

  ```text
  0x40BFE0  ; Dummy read          an instruction word with an optional comment
  ; --- Row 0 ---                 a comment on its own
                                  a blank line
  ```

  This module reads listings back into words, which is how a listing written by the
  driver is disassembled or checked.
*/

use std::fmt::{Display, Formatter};

use nom::{
  branch::alt,
  bytes::complete::tag,
  character::complete::{char as one_char, hex_digit1, space0},
  combinator::{all_consuming, map, opt, rest},
  sequence::{pair, preceded, tuple},
  IResult
};
use prettytable::{Cell, Row, Table};

use super::binary::{format_word, try_decode_instruction, Word, WORD_MASK};
use crate::error::{IsaError, Result};
use crate::TABLE_DISPLAY_FORMAT;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ListingLine {
  Instruction {
    word    : Word,
    comment : Option<String>
  },
  Comment(String),
  Blank,
}

impl Display for ListingLine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ListingLine::Instruction { word, comment: Some(comment) } => {
        write!(f, "{}  ; {}", format_word(*word), comment)
      }
      ListingLine::Instruction { word, comment: None } => {
        write!(f, "{}", format_word(*word))
      }
      ListingLine::Comment(text) => {
        write!(f, "; {}", text)
      }
      ListingLine::Blank => Ok(())
    }
  }
}

// region Parsers

/// A parsed line. An instruction's word is `None` when its digits overflow a `Word`.
enum RawLine {
  Instruction {
    word    : Option<Word>,
    comment : Option<String>
  },
  Other(ListingLine),
}

fn comment(input: &str) -> IResult<&str, &str> {
  preceded(pair(one_char(';'), space0), rest)(input)
}

fn hex_word(input: &str) -> IResult<&str, Option<Word>> {
  preceded(
    alt((tag("0x"), tag("0X"))),
    map(hex_digit1, |digits: &str| Word::from_str_radix(digits, 16).ok())
  )(input)
}

fn listing_line(input: &str) -> IResult<&str, RawLine> {
  alt((
    map(all_consuming(space0), |_: &str| RawLine::Other(ListingLine::Blank)),
    map(
      preceded(space0, comment),
      |text: &str| RawLine::Other(ListingLine::Comment(text.trim_end().to_string()))
    ),
    map(
      tuple((preceded(space0, hex_word), space0, opt(comment))),
      |(word, _, comment): (Option<Word>, &str, Option<&str>)| RawLine::Instruction {
        word,
        comment: comment.map(|text| text.trim_end().to_string())
      }
    ),
  ))(input)
}

// endregion

/**
  Parses a whole listing. Lines are split on `\n` only, so a trailing empty line is
  kept and joining the result's `Display` forms with `\n` reproduces the text. Line
  numbers in errors count from 1.
*/
pub fn parse_listing(text: &str) -> Result<Vec<ListingLine>> {
  let mut lines = Vec::new();

  for (index, line_text) in text.split('\n').enumerate() {
    let line = index + 1;
    let parsed = all_consuming(listing_line)(line_text.trim_end());

    match parsed {
      Ok((_, RawLine::Instruction { word: Some(word), comment })) if word <= WORD_MASK => {
        lines.push(ListingLine::Instruction { word, comment });
      }
      Ok((_, RawLine::Instruction { .. })) => {
        return Err(IsaError::Listing {
          line,
          message: format!("`{}` does not fit in 24 bits", line_text.trim())
        });
      }
      Ok((_, RawLine::Other(listing_line))) => lines.push(listing_line),
      Err(_) => {
        return Err(IsaError::Listing {
          line,
          message: format!("cannot parse `{}`", line_text.trim())
        });
      }
    }
  }

  Ok(lines)
}

/// Just the instruction words of a listing, in order.
pub fn listing_words(text: &str) -> Result<Vec<Word>> {
  let words =
    parse_listing(text)?
      .into_iter()
      .filter_map(|line| match line {
        ListingLine::Instruction { word, .. } => Some(word),
        _ => None
      })
      .collect();
  Ok(words)
}

/// A table with one row per instruction word: its index, the word, and its decoding.
pub fn disassembly_table(lines: &[ListingLine]) -> Table {
  let mut table = Table::new();
  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(Row::new(vec![
    Cell::new("#").style_spec("ubr"),
    Cell::new("Word").style_spec("ub"),
    Cell::new("Decoded").style_spec("ubl"),
    Cell::new("Comment").style_spec("ubl"),
  ]));

  let instructions =
    lines.iter().filter_map(|line| match line {
      ListingLine::Instruction { word, comment } => Some((*word, comment)),
      _ => None
    });

  for (index, (word, comment)) in instructions.enumerate() {
    let decoded = match try_decode_instruction(word) {
      Some(instruction) => instruction.to_string(),
      None              => "??".to_string()
    };
    table.add_row(Row::new(vec![
      Cell::new(&index.to_string()).style_spec("r"),
      Cell::new(&format_word(word)),
      Cell::new(&decoded),
      Cell::new(comment.as_ref().map(String::as_str).unwrap_or("")),
    ]));
  }
  table
}
