//! Result comparison.
//!
//! Decides whether a user's query result is equivalent to the reference
//! result for a practice question. Equivalence is row-set equality: row
//! order, column order and the order of the column list are irrelevant, the
//! set of column names and every cell value are not.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::db::{cmp_int_float, Incomparable, QueryResult, ResultSet, Row, Value};

/// The match/non-match judgment for a user result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the user result matches the reference result.
    #[serde(rename = "match")]
    pub matches: bool,

    /// Human-readable explanation.
    pub message: String,
}

impl Verdict {
    /// A matching verdict.
    pub fn matched(message: impl Into<String>) -> Self {
        Self {
            matches: true,
            message: message.into(),
        }
    }

    /// A non-matching verdict.
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self {
            matches: false,
            message: message.into(),
        }
    }
}

/// Compares a user result against the reference result.
pub fn compare_results(user: &QueryResult, expected: &QueryResult) -> Verdict {
    if let Some(error) = user.error() {
        return Verdict::mismatch(format!("User query failed: {error}"));
    }
    if let Some(error) = expected.error() {
        return Verdict::mismatch(format!("Expected query failed: {error}"));
    }

    match (user.result_set(), expected.result_set()) {
        (Some(user_set), Some(expected_set)) => compare_result_sets(user_set, expected_set),
        _ => compare_row_counts(user.row_count(), expected.row_count()),
    }
}

fn compare_result_sets(user: &ResultSet, expected: &ResultSet) -> Verdict {
    if user.row_count() != expected.row_count() {
        return Verdict::mismatch(format!(
            "Row count mismatch: User has {}, expected {}",
            user.row_count(),
            expected.row_count()
        ));
    }

    let user_columns: BTreeSet<&str> = user.columns.iter().map(String::as_str).collect();
    let expected_columns: BTreeSet<&str> = expected.columns.iter().map(String::as_str).collect();
    if user_columns != expected_columns {
        return Verdict::mismatch(format!(
            "Column mismatch: User has {}, expected {}",
            format_columns(&user_columns),
            format_columns(&expected_columns)
        ));
    }

    let canonical = canonicalize(&user.rows).and_then(|user_rows| {
        canonicalize(&expected.rows).map(|expected_rows| (user_rows, expected_rows))
    });

    match canonical {
        Ok((user_rows, expected_rows)) if user_rows == expected_rows => {
            Verdict::matched("Perfect match!")
        }
        Ok(_) => Verdict::mismatch("Data content does not match exactly"),
        Err(e) => Verdict::mismatch(format!("Error comparing data: {e}")),
    }
}

fn compare_row_counts(user: Option<u64>, expected: Option<u64>) -> Verdict {
    if user == expected {
        Verdict::matched("Row counts match")
    } else {
        Verdict::mismatch(format!(
            "Row count mismatch: User affected {}, expected {}",
            format_count(user),
            format_count(expected)
        ))
    }
}

fn format_count(count: Option<u64>) -> String {
    count.map_or_else(|| "none".to_string(), |n| n.to_string())
}

fn format_columns(columns: &BTreeSet<&str>) -> String {
    let joined = columns.iter().copied().collect::<Vec<_>>().join(", ");
    format!("{{{joined}}}")
}

/// A row with its fields sorted by column name.
type CanonicalRow<'a> = Vec<(&'a str, &'a Value)>;

/// Raised when two rows can only be ordered by comparing incomparable values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonError {
    pub column: String,
    pub source: Incomparable,
}

impl fmt::Display for ComparisonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in column \"{}\"", self.source, self.column)
    }
}

impl std::error::Error for ComparisonError {}

/// Brings rows into an order-independent form.
///
/// Fields are sorted by name and rows by their sorted fields. Sorting itself
/// uses a total order; afterwards every pair of neighbouring rows is checked,
/// and if the first cell that tells them apart holds values with no natural
/// order (NULL against a number, text against a number, ...) the comparison
/// is reported as failed rather than guessed.
fn canonicalize(rows: &[Row]) -> Result<Vec<CanonicalRow<'_>>, ComparisonError> {
    let mut canonical: Vec<CanonicalRow<'_>> = rows
        .iter()
        .map(|row| {
            let mut fields: CanonicalRow<'_> = row.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            fields
        })
        .collect();

    canonical.sort_by(|a, b| cmp_rows_total(a, b));

    for pair in canonical.windows(2) {
        ensure_orderable(&pair[0], &pair[1])?;
    }

    Ok(canonical)
}

fn cmp_rows_total(a: &CanonicalRow<'_>, b: &CanonicalRow<'_>) -> Ordering {
    for ((a_name, a_value), (b_name, b_value)) in a.iter().zip(b.iter()) {
        let ordering = a_name
            .cmp(b_name)
            .then_with(|| cmp_values_total(a_value, b_value));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

/// Total order over values used only to arrange rows: NULL, then numbers,
/// then text, then blobs.
fn cmp_values_total(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Bytes(_) => 3,
        }
    }

    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => cmp_floats(*x, *y),
        (Value::Int(x), Value::Float(y)) => {
            cmp_int_float(*x, *y).unwrap_or_else(|| (*x as f64).total_cmp(y))
        }
        (Value::Float(x), Value::Int(y)) => {
            cmp_int_float(*y, *x).map_or_else(|| x.total_cmp(&(*y as f64)), Ordering::reverse)
        }
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Orders floats so that values equal under `==` tie, with NaN placed by
/// `total_cmp`.
fn cmp_floats(x: f64, y: f64) -> Ordering {
    x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
}

/// Checks that the first cell distinguishing two rows has a natural order.
fn ensure_orderable(a: &CanonicalRow<'_>, b: &CanonicalRow<'_>) -> Result<(), ComparisonError> {
    for ((a_name, a_value), (b_name, b_value)) in a.iter().zip(b.iter()) {
        if a_name != b_name {
            return Ok(());
        }
        if a_value != b_value {
            return a_value
                .try_cmp(b_value)
                .map(|_| ())
                .map_err(|source| ComparisonError {
                    column: a_name.to_string(),
                    source,
                });
        }
    }
    Ok(())
}
