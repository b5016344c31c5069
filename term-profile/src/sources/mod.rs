//! Record sources the profiler pulls chunks from.
//!
//! A source owns decoding; by the time records reach the profiler every cell
//! is a typed [`ColumnValue`](crate::value::ColumnValue).

use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Debug;

use crate::error::Result;
use crate::value::{DatasetSchema, Record, RowCountHint};

mod arrow;

pub use self::arrow::ArrowBatchSource;

/// An ordered stream of records with column-type metadata.
///
/// # Examples
///
/// ```rust
/// use term_profile::sources::{RecordSource, VecSource};
/// use term_profile::value::{ColumnType, DatasetSchema, Record};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let schema = DatasetSchema::new().column("x", ColumnType::Numeric);
/// let mut source = VecSource::new(schema, vec![Record::new().with("x", 1.0)]);
/// let chunk = source.next_chunk(10).await.unwrap().unwrap();
/// assert_eq!(chunk.len(), 1);
/// assert!(source.next_chunk(10).await.unwrap().is_none());
/// # })
/// ```
#[async_trait]
pub trait RecordSource: Debug + Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Declared column types.
    fn schema(&self) -> &DatasetSchema;

    /// What is known about the number of records upfront.
    fn row_count_hint(&self) -> RowCountHint;

    /// Returns up to `max_rows` records, or `None` once the stream is exhausted.
    async fn next_chunk(&mut self, max_rows: usize) -> Result<Option<Vec<Record>>>;
}

/// In-memory record source.
#[derive(Debug, Clone)]
pub struct VecSource {
    name: String,
    schema: DatasetSchema,
    records: VecDeque<Record>,
    hint: RowCountHint,
}

impl VecSource {
    pub fn new(schema: DatasetSchema, records: Vec<Record>) -> Self {
        let hint = RowCountHint::Exact(records.len() as u64);
        Self {
            name: "memory".to_string(),
            schema,
            records: records.into(),
            hint,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the advertised row count, e.g. to simulate a stream of unknown length.
    pub fn with_row_count_hint(mut self, hint: RowCountHint) -> Self {
        self.hint = hint;
        self
    }

    /// Records not yet handed out.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl RecordSource for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    fn row_count_hint(&self) -> RowCountHint {
        self.hint
    }

    async fn next_chunk(&mut self, max_rows: usize) -> Result<Option<Vec<Record>>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        let take = max_rows.max(1).min(self.records.len());
        Ok(Some(self.records.drain(..take).collect()))
    }
}
