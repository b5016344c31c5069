//! Tagged column values, records and dataset schemas.
//!
//! Values arrive from a record source already resolved into a [`ColumnValue`],
//! so every accumulator downstream operates on one concrete type. Coercion from
//! a value to what a column's declared [`ColumnType`] needs happens exactly once,
//! in [`ColumnValue::coerce`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ColumnValue {
    /// A numeric value. NaN and the infinities serialize as the strings
    /// `"NaN"`, `"inf"` and `"-inf"`.
    Numeric(#[serde(with = "non_finite")] f64),
    /// Categorical or free text.
    Text(String),
    /// A point in time.
    Date(DateTime<Utc>),
    /// A boolean flag.
    Boolean(bool),
    /// Absent or null.
    Missing,
}

impl ColumnValue {
    /// Returns true if the value is [`ColumnValue::Missing`].
    pub fn is_missing(&self) -> bool {
        matches!(self, ColumnValue::Missing)
    }

    /// Returns the name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnValue::Numeric(_) => "numeric",
            ColumnValue::Text(_) => "text",
            ColumnValue::Date(_) => "date",
            ColumnValue::Boolean(_) => "boolean",
            ColumnValue::Missing => "missing",
        }
    }

    /// Approximate heap + inline footprint of this value in bytes.
    pub fn estimated_size_bytes(&self) -> usize {
        let inline = std::mem::size_of::<ColumnValue>();
        match self {
            ColumnValue::Text(s) => inline + s.capacity(),
            _ => inline,
        }
    }

    /// Coerces the value into what a column of type `column_type` consumes.
    pub fn coerce(&self, column_type: ColumnType) -> Coerced {
        match self {
            ColumnValue::Missing => Coerced::Missing,
            _ => match column_type {
                ColumnType::Numeric => self.as_number().map_or(Coerced::Invalid, Coerced::Number),
                ColumnType::Date => self
                    .as_epoch_seconds()
                    .map_or(Coerced::Invalid, Coerced::Number),
                ColumnType::Boolean => self.as_bool().map_or(Coerced::Invalid, Coerced::Flag),
                ColumnType::Categorical => self
                    .as_category()
                    .map_or(Coerced::Invalid, Coerced::Category),
                ColumnType::Text => Coerced::Present,
            },
        }
    }

    fn as_number(&self) -> Option<f64> {
        let value = match self {
            ColumnValue::Numeric(v) => *v,
            ColumnValue::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    fn as_epoch_seconds(&self) -> Option<f64> {
        match self {
            ColumnValue::Date(ts) => Some(ts.timestamp_millis() as f64 / 1000.0),
            ColumnValue::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|ts| ts.timestamp_millis() as f64 / 1000.0),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Boolean(b) => Some(*b),
            ColumnValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_category(&self) -> Option<String> {
        match self {
            ColumnValue::Text(s) => Some(s.clone()),
            ColumnValue::Numeric(v) if v.is_finite() => Some(v.to_string()),
            ColumnValue::Numeric(_) => None,
            ColumnValue::Boolean(b) => Some(b.to_string()),
            ColumnValue::Date(ts) => Some(ts.to_rfc3339()),
            ColumnValue::Missing => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Numeric(v) => write!(f, "{v}"),
            ColumnValue::Text(s) => write!(f, "{s}"),
            ColumnValue::Date(ts) => write!(f, "{}", ts.to_rfc3339()),
            ColumnValue::Boolean(b) => write!(f, "{b}"),
            ColumnValue::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Numeric(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Numeric(value as f64)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Boolean(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(value: DateTime<Utc>) -> Self {
        ColumnValue::Date(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ColumnValue::Missing, Into::into)
    }
}

/// Serde for `f64` cells that keeps non-finite values readable from JSON,
/// which has no literal for them.
mod non_finite {
    use serde::de::{self, Deserializer, Unexpected};
    use serde::Deserialize;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::invalid_value(
                    Unexpected::Str(other),
                    &"a number, \"NaN\", \"inf\" or \"-inf\"",
                )),
            },
        }
    }
}

/// Result of coercing a cell for a specific column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Value for the moment/quantile accumulators.
    Number(f64),
    /// Value for the frequency counter.
    Category(String),
    /// Boolean value (feeds both frequency and moments).
    Flag(bool),
    /// Present but not analysed beyond counting.
    Present,
    /// Null or absent.
    Missing,
    /// Present but unusable for the declared type.
    Invalid,
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Continuous numeric data.
    Numeric,
    /// Low-cardinality labels.
    Categorical,
    /// Free text; only counted.
    Text,
    /// Timestamps, analysed as epoch seconds.
    Date,
    /// True/false flags.
    Boolean,
}

impl ColumnType {
    /// Whether values of this type feed the moment accumulator.
    pub fn is_numeric_like(self) -> bool {
        matches!(self, ColumnType::Numeric | ColumnType::Date | ColumnType::Boolean)
    }

    /// Whether values of this type feed a frequency counter.
    pub fn tracks_frequencies(self) -> bool {
        matches!(self, ColumnType::Categorical | ColumnType::Boolean)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// A single row: column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, ColumnValue>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<ColumnValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Returns the value for `column`, if present.
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.values.get(column)
    }

    /// Returns the value for `column`, treating an absent column as missing.
    pub fn value(&self, column: &str) -> &ColumnValue {
        const MISSING: &ColumnValue = &ColumnValue::Missing;
        self.values.get(column).unwrap_or(MISSING)
    }

    /// Number of columns carried by this record.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the record carries no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(column, value)` pairs in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnValue)> {
        self.values.iter()
    }

    /// Approximate in-memory footprint, used for chunk sizing.
    pub fn estimated_size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self
                .values
                .iter()
                .map(|(k, v)| k.capacity() + v.estimated_size_bytes())
                .sum::<usize>()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<ColumnValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Declared name and type of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

/// Column-type metadata for a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    columns: Vec<ColumnSpec>,
}

impl DatasetSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column declaration.
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.push(name, column_type);
        self
    }

    /// Declares a column, replacing the type of an existing one with the same name.
    pub fn push(&mut self, name: impl Into<String>, column_type: ColumnType) {
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.column_type = column_type,
            None => self.columns.push(ColumnSpec { name, column_type }),
        }
    }

    /// Declared columns in declaration order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Looks up the declared type of a column.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    /// Returns true if the schema declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.column_type(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// What the record source knows about the dataset's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowCountHint {
    /// The exact number of rows.
    Exact(u64),
    /// A best-effort estimate.
    Estimate(u64),
    /// Nothing is known upfront.
    Unknown,
}

impl RowCountHint {
    /// Returns the known or estimated row count.
    pub fn rows(self) -> Option<u64> {
        match self {
            RowCountHint::Exact(n) | RowCountHint::Estimate(n) => Some(n),
            RowCountHint::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(
            ColumnValue::Numeric(3.5).coerce(ColumnType::Numeric),
            Coerced::Number(3.5)
        );
        assert_eq!(
            ColumnValue::from(" 42 ").coerce(ColumnType::Numeric),
            Coerced::Number(42.0)
        );
        assert_eq!(
            ColumnValue::from("abc").coerce(ColumnType::Numeric),
            Coerced::Invalid
        );
        assert_eq!(
            ColumnValue::Numeric(f64::NAN).coerce(ColumnType::Numeric),
            Coerced::Invalid
        );
        assert_eq!(
            ColumnValue::Missing.coerce(ColumnType::Numeric),
            Coerced::Missing
        );
    }

    #[test]
    fn test_boolean_and_category_coercion() {
        assert_eq!(
            ColumnValue::from("Yes").coerce(ColumnType::Boolean),
            Coerced::Flag(true)
        );
        assert_eq!(
            ColumnValue::from("maybe").coerce(ColumnType::Boolean),
            Coerced::Invalid
        );
        assert_eq!(
            ColumnValue::Numeric(2.0).coerce(ColumnType::Categorical),
            Coerced::Category("2".to_string())
        );
        assert_eq!(
            ColumnValue::from("free form").coerce(ColumnType::Text),
            Coerced::Present
        );
    }

    #[test]
    fn test_date_coercion() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            ColumnValue::Date(ts).coerce(ColumnType::Date),
            Coerced::Number(1_577_836_800.0)
        );
        assert_eq!(
            ColumnValue::from("2020-01-01T00:00:00Z").coerce(ColumnType::Date),
            Coerced::Number(1_577_836_800.0)
        );
        assert_eq!(
            ColumnValue::Numeric(1.0).coerce(ColumnType::Date),
            Coerced::Invalid
        );
    }

    #[test]
    fn test_record_access() {
        let record = Record::new().with("a", 1.0).with("b", "x");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(&ColumnValue::Numeric(1.0)));
        assert_eq!(record.value("zzz"), &ColumnValue::Missing);
        assert!(record.estimated_size_bytes() > 0);

        let from_iter: Record = vec![("a", 1.0), ("b", 2.0)].into_iter().collect();
        assert_eq!(from_iter.value("b"), &ColumnValue::Numeric(2.0));
    }

    #[test]
    fn test_non_finite_numbers_survive_json() {
        let record = Record::new()
            .with("nan", f64::NAN)
            .with("up", f64::INFINITY)
            .with("down", f64::NEG_INFINITY)
            .with("plain", 2.5)
            .with("text", "NaN");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("null"));

        let restored: Record = serde_json::from_str(&json).unwrap();
        assert!(matches!(restored.value("nan"), ColumnValue::Numeric(v) if v.is_nan()));
        assert_eq!(restored.value("up"), &ColumnValue::Numeric(f64::INFINITY));
        assert_eq!(restored.value("down"), &ColumnValue::Numeric(f64::NEG_INFINITY));
        assert_eq!(restored.value("plain"), &ColumnValue::Numeric(2.5));
        assert_eq!(restored.value("text"), &ColumnValue::from("NaN"));

        let bad = r#"{"values":{"x":{"type":"Numeric","value":"lots"}}}"#;
        assert!(serde_json::from_str::<Record>(bad).is_err());
    }

    #[test]
    fn test_schema_redeclaration() {
        let schema = DatasetSchema::new()
            .column("a", ColumnType::Numeric)
            .column("a", ColumnType::Categorical);
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.column_type("a"), Some(ColumnType::Categorical));
        assert!(!schema.contains("b"));
    }

    #[test]
    fn test_row_count_hint() {
        assert_eq!(RowCountHint::Exact(10).rows(), Some(10));
        assert_eq!(RowCountHint::Estimate(7).rows(), Some(7));
        assert_eq!(RowCountHint::Unknown.rows(), None);
    }
}
