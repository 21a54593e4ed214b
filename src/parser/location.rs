//! Feature location parser.
//!
//! Turns the text of a `<GBFeature_location>` line into one range, or two
//! ranges for a `join(a..b,c..d)` location. Everything that is not a digit,
//! the `..` operator or (for joins) the separating comma is discarded, so
//! `complement(...)` wrappers, partial-end markers (`<`, `>`) and the XML
//! tags themselves do not need to be handled explicitly.

use crate::error::{CdsError, Result};
use crate::types::CoordinateRange;

const RANGE_OPERATOR: &str = "..";
const JOIN_KEYWORD: &str = "join";

/// Parse a location fragment into its coordinate range(s).
///
/// Returns one range for `start..end` and two ranges, in encounter order,
/// when the fragment contains `join`.
pub fn parse_location(fragment: &str) -> Result<Vec<CoordinateRange>> {
    if fragment.contains(JOIN_KEYWORD) {
        let stripped: String = fragment
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect();

        let (first, second) = stripped
            .split_once(',')
            .ok_or_else(|| CdsError::malformed(fragment, "join without a second range"))?;

        Ok(vec![
            parse_simple(first, fragment)?,
            parse_simple(second, fragment)?,
        ])
    } else {
        let stripped: String = fragment
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        Ok(vec![parse_simple(&stripped, fragment)?])
    }
}

/// Parse an already stripped `start..end` token.
fn parse_simple(token: &str, fragment: &str) -> Result<CoordinateRange> {
    let (start, end) = token
        .split_once(RANGE_OPERATOR)
        .ok_or_else(|| CdsError::malformed(fragment, "missing '..' range operator"))?;

    let start = parse_position(start, fragment)?;
    let end = parse_position(end, fragment)?;

    if start > end {
        return Err(CdsError::malformed(
            fragment,
            format!("start {} is greater than end {}", start, end),
        ));
    }

    Ok(CoordinateRange::new(start, end))
}

fn parse_position(text: &str, fragment: &str) -> Result<u64> {
    let value: u64 = text
        .parse()
        .map_err(|_| CdsError::malformed(fragment, format!("'{}' is not a position", text)))?;
    if value == 0 {
        return Err(CdsError::malformed(fragment, "positions are 1-based"));
    }
    Ok(value)
}
