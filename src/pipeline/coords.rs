// The text form of a coordinate pair, as stored in the legacy columns of the pair table.

use std::num::ParseFloatError;

use proximity_divergence::Coordinates;
use snafu::prelude::*;

#[derive(Debug, Snafu, PartialEq)]
pub enum CoordinateParseError {
    #[snafu(display("empty coordinate text"))]
    EmptyText {},
    #[snafu(display("expected 2 components, found {}", found))]
    WrongArity { found: usize },
    #[snafu(display("unbalanced parentheses in {:?}", token))]
    UnbalancedWrapper { token: String },
    #[snafu(display("invalid number {:?}", token))]
    InvalidNumber {
        token: String,
        source: ParseFloatError,
    },
    #[snafu(display("non-finite number {:?}", token))]
    NotFinite { token: String },
}

/// `(lat, lon)` with the shortest representation of each value, so that
/// [parse_coordinates] gives back the exact same numbers.
pub fn format_coordinates(c: &Coordinates) -> String {
    format!("({}, {})", c.latitude, c.longitude)
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

// Removes a type wrapper such as `np.float64(...)` around a single number.
fn unwrap_component(token: &str) -> Result<&str, CoordinateParseError> {
    let token = token.trim();
    match token.find('(') {
        None => {
            ensure!(
                !token.contains(')'),
                UnbalancedWrapperSnafu { token }
            );
            Ok(token)
        }
        Some(open) => {
            let tag = &token[..open];
            ensure!(
                !tag.is_empty() && tag.chars().all(is_tag_char) && token.ends_with(')'),
                UnbalancedWrapperSnafu { token }
            );
            let inner = &token[open + 1..token.len() - 1];
            ensure!(
                !inner.contains('(') && !inner.contains(')'),
                UnbalancedWrapperSnafu { token }
            );
            Ok(inner.trim())
        }
    }
}

fn parse_component(token: &str) -> Result<f64, CoordinateParseError> {
    let inner = unwrap_component(token)?;
    let x: f64 = inner.parse().context(InvalidNumberSnafu { token: inner })?;
    ensure!(x.is_finite(), NotFiniteSnafu { token: inner });
    Ok(x)
}

/// Parses `(lat, lon)`. The outer parentheses are optional and each number may be
/// wrapped in a type tag, as in `(np.float64(41.7), np.float64(44.8))`.
pub fn parse_coordinates(text: &str) -> Result<Coordinates, CoordinateParseError> {
    let mut body = text.trim();
    ensure!(!body.is_empty(), EmptyTextSnafu {});
    if body.starts_with('(') {
        ensure!(
            body.ends_with(')') && body.len() >= 2,
            UnbalancedWrapperSnafu { token: body }
        );
        body = &body[1..body.len() - 1];
    }

    let parts: Vec<&str> = body.split(',').collect();
    ensure!(parts.len() == 2, WrongAritySnafu { found: parts.len() });
    let latitude = parse_component(parts[0])?;
    let longitude = parse_component(parts[1])?;
    Ok(Coordinates::new(latitude, longitude))
}
