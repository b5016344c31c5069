//! Record source over Arrow `RecordBatch`es.

use std::collections::VecDeque;

use ::arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, StringArray, TimestampMillisecondArray,
};
use ::arrow::compute::cast;
use ::arrow::datatypes::{DataType, Float64Type, SchemaRef, TimeUnit, TimestampMillisecondType};
use ::arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::DateTime;
use tracing::{debug, warn};

use super::RecordSource;
use crate::error::{ProfileError, Result};
use crate::value::{ColumnType, ColumnValue, DatasetSchema, Record, RowCountHint};

const SOURCE_TYPE: &str = "arrow";

/// Declared column type for an Arrow data type, if the profiler understands it.
///
/// Integers, floats and decimals are numeric, strings are categorical, and
/// dates and timestamps are dates. Nested types are not profiled.
pub fn infer_column_type(data_type: &DataType) -> Option<ColumnType> {
    match data_type {
        DataType::Boolean => Some(ColumnType::Boolean),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Some(ColumnType::Categorical),
        DataType::Dictionary(_, value)
            if matches!(value.as_ref(), DataType::Utf8 | DataType::LargeUtf8) =>
        {
            Some(ColumnType::Categorical)
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => Some(ColumnType::Date),
        other if other.is_numeric() => Some(ColumnType::Numeric),
        _ => None,
    }
}

/// One column of a batch, cast to the representation its values are read from.
enum ColumnReader {
    Numeric(Float64Array),
    Text(StringArray),
    Flag(BooleanArray),
    Timestamp(TimestampMillisecondArray),
}

impl ColumnReader {
    fn new(name: &str, array: &ArrayRef) -> Result<Self> {
        let mismatch = || {
            ProfileError::source(
                SOURCE_TYPE,
                format!("column '{name}' could not be read as {}", array.data_type()),
            )
        };

        let reader = match array.data_type() {
            DataType::Boolean => Self::Flag(array.as_boolean_opt().ok_or_else(mismatch)?.clone()),
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
                let millis = cast(array, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
                Self::Timestamp(
                    millis
                        .as_primitive_opt::<TimestampMillisecondType>()
                        .ok_or_else(mismatch)?
                        .clone(),
                )
            }
            data_type if data_type.is_numeric() => {
                let floats = cast(array, &DataType::Float64)?;
                Self::Numeric(
                    floats
                        .as_primitive_opt::<Float64Type>()
                        .ok_or_else(mismatch)?
                        .clone(),
                )
            }
            _ => {
                let text = cast(array, &DataType::Utf8)?;
                Self::Text(text.as_string_opt::<i32>().ok_or_else(mismatch)?.clone())
            }
        };
        Ok(reader)
    }

    fn value(&self, row: usize) -> ColumnValue {
        match self {
            Self::Numeric(array) if array.is_valid(row) => ColumnValue::Numeric(array.value(row)),
            Self::Text(array) if array.is_valid(row) => {
                ColumnValue::Text(array.value(row).to_string())
            }
            Self::Flag(array) if array.is_valid(row) => ColumnValue::Boolean(array.value(row)),
            Self::Timestamp(array) if array.is_valid(row) => {
                DateTime::from_timestamp_millis(array.value(row))
                    .map_or(ColumnValue::Missing, ColumnValue::Date)
            }
            _ => ColumnValue::Missing,
        }
    }
}

/// Streams rows out of in-memory Arrow record batches.
///
/// Column types are inferred from the Arrow schema and can be overridden,
/// e.g. to treat an integer code column as categorical.
#[derive(Debug, Clone)]
pub struct ArrowBatchSource {
    name: String,
    arrow_schema: SchemaRef,
    schema: DatasetSchema,
    batches: VecDeque<RecordBatch>,
    /// Rows of the front batch already handed out.
    offset: usize,
    total_rows: u64,
    skipped: Vec<String>,
}

impl ArrowBatchSource {
    /// Creates a source from batches sharing the schema of the first one.
    pub fn try_new(batches: Vec<RecordBatch>) -> Result<Self> {
        let arrow_schema = batches
            .first()
            .map(RecordBatch::schema)
            .ok_or_else(|| ProfileError::source(SOURCE_TYPE, "no record batches given"))?;
        Self::with_schema(arrow_schema, batches)
    }

    /// Creates a source with an explicit schema; every batch must match it.
    pub fn with_schema(arrow_schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        if let Some(index) = batches.iter().position(|b| b.schema() != arrow_schema) {
            return Err(ProfileError::source(
                SOURCE_TYPE,
                format!("batch {index} does not match the source schema"),
            ));
        }

        let mut schema = DatasetSchema::new();
        let mut skipped = Vec::new();
        for field in arrow_schema.fields() {
            match infer_column_type(field.data_type()) {
                Some(column_type) => schema.push(field.name().as_str(), column_type),
                None => {
                    warn!(
                        column = field.name().as_str(),
                        data_type = %field.data_type(),
                        "Skipping column with unsupported Arrow type"
                    );
                    skipped.push(field.name().clone());
                }
            }
        }

        let total_rows = batches.iter().map(|b| b.num_rows() as u64).sum();
        Ok(Self {
            name: SOURCE_TYPE.to_string(),
            arrow_schema,
            schema,
            batches: batches.into(),
            offset: 0,
            total_rows,
            skipped,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the inferred type of a column.
    pub fn with_column_type(mut self, column: &str, column_type: ColumnType) -> Result<Self> {
        if self.arrow_schema.field_with_name(column).is_err() {
            return Err(ProfileError::column_not_found(column));
        }
        self.schema.push(column, column_type);
        self.skipped.retain(|name| name != column);
        Ok(self)
    }

    /// Columns left out of the schema because their Arrow type is not profiled.
    pub fn skipped_columns(&self) -> &[String] {
        &self.skipped
    }

    fn convert(&self, batch: &RecordBatch) -> Result<Vec<Record>> {
        let readers = self
            .schema
            .columns()
            .iter()
            .map(|spec| {
                let array = batch
                    .column_by_name(&spec.name)
                    .ok_or_else(|| ProfileError::column_not_found(spec.name.as_str()))?;
                Ok((spec.name.as_str(), ColumnReader::new(&spec.name, array)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((0..batch.num_rows())
            .map(|row| {
                readers
                    .iter()
                    .map(|(name, reader)| (*name, reader.value(row)))
                    .collect()
            })
            .collect())
    }
}

#[async_trait]
impl RecordSource for ArrowBatchSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    fn row_count_hint(&self) -> RowCountHint {
        RowCountHint::Exact(self.total_rows)
    }

    async fn next_chunk(&mut self, max_rows: usize) -> Result<Option<Vec<Record>>> {
        let max_rows = max_rows.max(1);
        let mut records = Vec::new();

        while records.len() < max_rows {
            let Some(batch) = self.batches.front() else {
                break;
            };
            let available = batch.num_rows() - self.offset;
            if available == 0 {
                self.batches.pop_front();
                self.offset = 0;
                continue;
            }

            let take = available.min(max_rows - records.len());
            let slice = batch.slice(self.offset, take);
            records.extend(self.convert(&slice)?);
            self.offset += take;
        }

        if records.is_empty() {
            return Ok(None);
        }
        debug!(rows = records.len(), "Read Arrow chunk");
        Ok(Some(records))
    }
}
