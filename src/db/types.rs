//! Query result types for the practice database.
//!
//! Defines the structures used to represent query results from the
//! ephemeral database and the JSON shape they take on the wire.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Represents a single value from a database query.
///
/// The variants mirror the SQLite storage classes; values are decoded from
/// the runtime type of each cell, not the declared column type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the SQLite storage class name of this value.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
        }
    }

    /// Attempts to convert the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Orders two values, failing when they have no meaningful order.
    ///
    /// Equal values always compare as `Equal`, including two NULLs. Integers
    /// and floats order numerically against each other. Any other pairing of
    /// different kinds, or NULL against a non-NULL value, is incomparable.
    pub fn try_cmp(&self, other: &Value) -> Result<Ordering, Incomparable> {
        if self == other {
            return Ok(Ordering::Equal);
        }

        let ordering = match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => cmp_int_float(*a, *b),
            (Value::Float(a), Value::Int(b)) => cmp_int_float(*b, *a).map(Ordering::reverse),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        };

        ordering.ok_or_else(|| Incomparable {
            left: self.kind(),
            right: other.kind(),
        })
    }
}

/// SQL-style equality: numbers compare by value regardless of integer or
/// float storage; every other kind must match in both kind and value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                cmp_int_float(*a, *b) == Some(Ordering::Equal)
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

/// Compares an integer with a float exactly, without rounding the integer.
///
/// Returns `None` when the float is NaN.
pub fn cmp_int_float(int: i64, float: f64) -> Option<Ordering> {
    // Rounding to f64 is monotonic, so a strict inequality here holds exactly.
    match (int as f64).partial_cmp(&float)? {
        Ordering::Equal => {}
        unequal => return Some(unequal),
    }
    // The float is now integral and within one ulp of i64 range.
    if float >= 9_223_372_036_854_775_808.0 {
        return Some(Ordering::Less);
    }
    Some(int.cmp(&(float as i64)))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// Two values that cannot be placed in a common order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incomparable {
    pub left: &'static str,
    pub right: &'static str,
}

impl fmt::Display for Incomparable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot order {} against {}", self.left, self.right)
    }
}

impl std::error::Error for Incomparable {}

// Conversion implementations for common types
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// A row of data keyed by column name, in result column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, replacing the value if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style variant of [`Row::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the column names of this row in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Column names and rows produced by a read query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names, in result order.
    pub columns: Vec<String>,

    /// Rows of data, each keyed by the names in `columns`.
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set with the given columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Represents the result of executing one SQL statement.
///
/// Serializes to the tagged JSON shape the browser page consumes:
/// `{success, columns, rows, row_count}` for reads,
/// `{success, message, row_count}` for other statements and
/// `{success: false, error}` for failures.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// A read query with tabular output.
    Rows(ResultSet),

    /// A statement without tabular output and its affected-row count.
    Affected { rows_affected: u64 },

    /// Execution failed; the message is ready for display.
    Failed { error: String },
}

impl QueryResult {
    /// Creates a failed result with the given message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Returns true unless this result is a failure.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Returns the failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Returns the tabular output, if any.
    pub fn result_set(&self) -> Option<&ResultSet> {
        match self {
            Self::Rows(set) => Some(set),
            _ => None,
        }
    }

    /// Number of returned or affected rows. Failures have none.
    pub fn row_count(&self) -> Option<u64> {
        match self {
            Self::Rows(set) => Some(set.row_count() as u64),
            Self::Affected { rows_affected } => Some(*rows_affected),
            Self::Failed { .. } => None,
        }
    }

    /// Status message for statements without tabular output.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Affected { rows_affected } => Some(format!(
                "Query executed successfully. Rows affected: {rows_affected}"
            )),
            _ => None,
        }
    }
}

impl From<ResultSet> for QueryResult {
    fn from(set: ResultSet) -> Self {
        Self::Rows(set)
    }
}

impl Serialize for QueryResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Rows(set) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("columns", &set.columns)?;
                map.serialize_entry("rows", &set.rows)?;
                map.serialize_entry("row_count", &set.row_count())?;
                map.end()
            }
            Self::Affected { rows_affected } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("message", &self.message())?;
                map.serialize_entry("row_count", rows_affected)?;
                map.end()
            }
            Self::Failed { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}
