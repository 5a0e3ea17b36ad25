//! Fixed-column element line checks

use crate::{LINE1_TAG, LINE2_TAG};
use tletypes::prelude::ELEMENT_LINE_LEN;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ElementLineError {
    #[error("Element line {line} is {len} characters, expected {}", ELEMENT_LINE_LEN)]
    Length { line: u8, len: usize },
    #[error("Element line {line} is not tagged '{line} '")]
    Tag { line: u8 },
    #[error("Element lines carry different catalog numbers")]
    CatalogNumberMismatch,
    #[error("Element line {line} checksum is {found}, computed {computed}")]
    Checksum { line: u8, found: u8, computed: u8 },
}

/// Modulo-10 checksum over the first 68 columns.
/// Digits add their value, a minus sign adds one, everything else is ignored.
pub fn checksum(line: &str) -> u8 {
    let sum: u32 = line
        .chars()
        .take(ELEMENT_LINE_LEN - 1)
        .map(|c| match c {
            '-' => 1,
            c => c.to_digit(10).unwrap_or(0),
        })
        .sum();
    (sum % 10) as u8
}

/// Structural checks on a pair of element lines.
///
/// `strict` additionally verifies the column 69 checksum of both lines.
pub fn validate_element_lines(
    line1: &str,
    line2: &str,
    strict: bool,
) -> Result<(), ElementLineError> {
    validate_line(1, LINE1_TAG, line1, strict)?;
    validate_line(2, LINE2_TAG, line2, strict)?;

    if line1.get(2..7) != line2.get(2..7) {
        return Err(ElementLineError::CatalogNumberMismatch);
    }

    Ok(())
}

fn validate_line(line: u8, tag: char, s: &str, strict: bool) -> Result<(), ElementLineError> {
    let mut chars = s.chars();
    if chars.next() != Some(tag) || chars.next() != Some(' ') {
        return Err(ElementLineError::Tag { line });
    }

    let len = s.chars().count();
    if len != ELEMENT_LINE_LEN || !s.is_ascii() {
        return Err(ElementLineError::Length { line, len });
    }

    if strict {
        let computed = checksum(s);
        let found = s
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .map(|d| d as u8)
            .unwrap_or(u8::MAX);
        if found != computed {
            return Err(ElementLineError::Checksum {
                line,
                found,
                computed,
            });
        }
    }

    Ok(())
}
