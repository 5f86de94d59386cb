//! CSV serializer
//!
//! Header and row rendering for segment files. Every cell is fixed-point with
//! six decimals. A variable that cannot be read contributes its full catalog
//! width of `0.000000` placeholders, so a row always has exactly as many cells
//! as the header has columns.

use std::fmt::Write as _;

use contracts::{ordered_columns, FetchError, TelemetrySource, VariableSpec, VariableValue};
use tracing::debug;

use crate::clock::TimestampAnchor;

/// Cell text for a value that could not be read
pub const PLACEHOLDER: &str = "0.000000";

/// A rendered data row
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    /// Newline-terminated row text
    pub line: String,
    /// Variables substituted with placeholders, with their cell counts
    pub placeholders: Vec<(String, usize)>,
}

/// Newline-terminated header line
pub fn header_line(variables: &[VariableSpec]) -> String {
    let mut line = ordered_columns(variables).join(",");
    line.push('\n');
    line
}

/// Render one sample
///
/// The timestamp variable is written as physical time through `anchor`; while
/// no anchor exists yet it is a placeholder like any other unreadable value.
pub fn render_row<S: TelemetrySource>(
    source: &mut S,
    variables: &[VariableSpec],
    anchor: Option<&TimestampAnchor>,
) -> RenderedRow {
    let mut line = String::with_capacity(variables.len() * 12);
    let mut placeholders = Vec::new();

    for (idx, variable) in variables.iter().enumerate() {
        if idx > 0 {
            line.push(',');
        }

        match fetch_checked(source, variable, anchor) {
            Ok(value) => push_values(&mut line, value.as_slice()),
            Err(e) => {
                debug!(variable = %variable.name, error = %e, "Placeholder substituted");
                let width = variable.arity.width();
                push_placeholders(&mut line, width);
                placeholders.push((variable.name.clone(), width));
            }
        }
    }

    line.push('\n');
    RenderedRow { line, placeholders }
}

/// Fetch a value and check it against the catalog width
fn fetch_checked<S: TelemetrySource>(
    source: &mut S,
    variable: &VariableSpec,
    anchor: Option<&TimestampAnchor>,
) -> Result<VariableValue, FetchError> {
    let value = source.fetch(&variable.name)?;

    let expected = variable.arity.width();
    if value.width() != expected {
        return Err(FetchError::ArityMismatch {
            variable: variable.name.clone(),
            expected,
            actual: value.width(),
        });
    }

    if variable.is_timestamp() {
        let anchor = anchor
            .ok_or_else(|| FetchError::unavailable(&variable.name, "session not anchored yet"))?;
        return Ok(VariableValue::Scalar(
            anchor.physical_time(value.as_slice()[0]),
        ));
    }

    Ok(value)
}

/// Fixed six-decimal cell
pub fn format_cell(line: &mut String, value: f64) {
    // Writing to a String cannot fail
    let _ = write!(line, "{value:.6}");
}

fn push_values(line: &mut String, values: &[f64]) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        format_cell(line, *value);
    }
}

fn push_placeholders(line: &mut String, width: usize) {
    for i in 0..width {
        if i > 0 {
            line.push(',');
        }
        line.push_str(PLACEHOLDER);
    }
}
