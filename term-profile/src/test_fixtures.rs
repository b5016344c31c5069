//! Seeded synthetic transaction data for tests and benchmarks.
//!
//! Each row is a retail transaction with a mix of numeric, categorical, date
//! and boolean columns. About 10% of ratings are missing and about 20% of
//! transactions are returned. The same seed always yields the same rows.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::value::{ColumnType, ColumnValue, DatasetSchema, Record};

/// Seed used by fixtures that don't pick their own.
pub const FIXTURE_SEED: u64 = 42;

const CATEGORIES: &[&str] = &[
    "Electronics",
    "Clothing",
    "Food",
    "Home",
    "Sports",
    "Books",
    "Toys",
    "Beauty",
];
const PAYMENT_METHODS: &[&str] = &[
    "Credit Card",
    "Debit Card",
    "Cash",
    "Mobile Payment",
    "Gift Card",
];
const LOCATIONS: &[&str] = &[
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "Philadelphia",
];
const SEGMENTS: &[&str] = &["Regular", "Silver", "Gold", "Platinum"];
const DISCOUNTS: &[f64] = &[0.0, 0.0, 0.0, 0.1, 0.15, 0.2, 0.25];

/// 2020-01-01T00:00:00Z
const START_EPOCH_SECONDS: i64 = 1_577_836_800;

/// Preset dataset sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSize {
    Small,
    Medium,
    Large,
    XLarge,
}

impl DatasetSize {
    pub fn rows(self) -> usize {
        match self {
            DatasetSize::Small => 10_000,
            DatasetSize::Medium => 100_000,
            DatasetSize::Large => 1_000_000,
            DatasetSize::XLarge => 5_000_000,
        }
    }
}

/// Declared column types of the transaction dataset.
pub fn transaction_schema() -> DatasetSchema {
    DatasetSchema::new()
        .column("transaction_id", ColumnType::Text)
        .column("timestamp", ColumnType::Date)
        .column("customer_id", ColumnType::Categorical)
        .column("product_id", ColumnType::Categorical)
        .column("category", ColumnType::Categorical)
        .column("quantity", ColumnType::Numeric)
        .column("unit_price", ColumnType::Numeric)
        .column("total_amount", ColumnType::Numeric)
        .column("payment_method", ColumnType::Categorical)
        .column("store_location", ColumnType::Categorical)
        .column("discount_applied", ColumnType::Numeric)
        .column("customer_age", ColumnType::Numeric)
        .column("customer_segment", ColumnType::Categorical)
        .column("rating", ColumnType::Numeric)
        .column("returned", ColumnType::Boolean)
}

#[derive(Debug, Clone)]
struct Transaction {
    id: u64,
    timestamp: i64,
    customer: u32,
    product: u32,
    category: &'static str,
    quantity: i64,
    unit_price: f64,
    total_amount: f64,
    payment_method: &'static str,
    store_location: &'static str,
    discount: f64,
    customer_age: i64,
    segment: &'static str,
    rating: Option<f64>,
    returned: bool,
}

impl Transaction {
    fn transaction_id(&self) -> String {
        format!("TXN{:08}", self.id)
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("transaction_id", self.transaction_id())
            .with(
                "timestamp",
                DateTime::from_timestamp(self.timestamp, 0)
                    .map_or(ColumnValue::Missing, ColumnValue::Date),
            )
            .with("customer_id", format!("CUST{:06}", self.customer))
            .with("product_id", format!("PROD{:05}", self.product))
            .with("category", self.category)
            .with("quantity", self.quantity)
            .with("unit_price", self.unit_price)
            .with("total_amount", self.total_amount)
            .with("payment_method", self.payment_method)
            .with("store_location", self.store_location)
            .with("discount_applied", self.discount)
            .with("customer_age", self.customer_age)
            .with("customer_segment", self.segment)
            .with("rating", self.rating)
            .with("returned", if self.returned { "Yes" } else { "No" })
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

/// Infinite, seeded stream of transaction records.
#[derive(Debug, Clone)]
pub struct TransactionGenerator {
    rng: StdRng,
    next_id: u64,
}

impl TransactionGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    fn next_transaction(&mut self) -> Transaction {
        let rng = &mut self.rng;
        let id = self.next_id;
        self.next_id += 1;

        let days = rng.random_range(0..=1095_i64);
        let hours = rng.random_range(0..=23_i64);
        let minutes = rng.random_range(0..=59_i64);
        let customer = rng.random_range(1..=50_000);
        let product = rng.random_range(1..=5_000);
        let category = pick(rng, CATEGORIES);
        let quantity = rng.random_range(1..=10_i64);
        let unit_price = round_cents(rng.random_range(5.99..=999.99));
        let discount = pick(rng, DISCOUNTS);
        let payment_method = pick(rng, PAYMENT_METHODS);
        let store_location = pick(rng, LOCATIONS);
        let customer_age = rng.random_range(18..=80_i64);
        let segment = pick(rng, SEGMENTS);
        let rating_value = (rng.random_range(1.0..=5.0_f64) * 10.0).round() / 10.0;
        let rating = (rng.random::<f64>() > 0.1).then_some(rating_value);
        let returned = rng.random_range(0..5) == 0;

        Transaction {
            id,
            timestamp: START_EPOCH_SECONDS + days * 86_400 + hours * 3_600 + minutes * 60,
            customer,
            product,
            category,
            quantity,
            unit_price,
            total_amount: round_cents(quantity as f64 * unit_price * (1.0 - discount)),
            payment_method,
            store_location,
            discount,
            customer_age,
            segment,
            rating,
            returned,
        }
    }

    /// Generates the next `rows` records.
    pub fn records(&mut self, rows: usize) -> Vec<Record> {
        self.by_ref().take(rows).collect()
    }
}

impl Iterator for TransactionGenerator {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        Some(self.next_transaction().to_record())
    }
}

/// `rows` seeded transaction records.
pub fn transactions(rows: usize, seed: u64) -> Vec<Record> {
    TransactionGenerator::new(seed).records(rows)
}

/// The same rows as [`transactions`], split into consecutive chunks.
pub fn transaction_chunks(rows: usize, chunk_size: usize, seed: u64) -> Vec<Vec<Record>> {
    let mut generator = TransactionGenerator::new(seed);
    let mut chunks = Vec::new();
    let mut remaining = rows;
    while remaining > 0 {
        let size = remaining.min(chunk_size.max(1));
        chunks.push(generator.records(size));
        remaining -= size;
    }
    chunks
}

/// The same rows as [`transactions`], as Arrow record batches.
///
/// `returned` is a `"Yes"`/`"No"` string column, as it would arrive from a
/// CSV export, and `timestamp` is a second-precision UTC timestamp.
pub fn transaction_batches(rows: usize, batch_size: usize, seed: u64) -> Result<Vec<RecordBatch>> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("transaction_id", DataType::Utf8, false),
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Second, Some("UTC".into())),
            false,
        ),
        Field::new("customer_id", DataType::Utf8, false),
        Field::new("product_id", DataType::Utf8, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("quantity", DataType::Int64, false),
        Field::new("unit_price", DataType::Float64, false),
        Field::new("total_amount", DataType::Float64, false),
        Field::new("payment_method", DataType::Utf8, false),
        Field::new("store_location", DataType::Utf8, false),
        Field::new("discount_applied", DataType::Float64, false),
        Field::new("customer_age", DataType::Int64, false),
        Field::new("customer_segment", DataType::Utf8, false),
        Field::new("rating", DataType::Float64, true),
        Field::new("returned", DataType::Utf8, false),
    ]));

    let mut generator = TransactionGenerator::new(seed);
    let mut batches = Vec::new();
    let mut remaining = rows;
    while remaining > 0 {
        let size = remaining.min(batch_size.max(1));
        remaining -= size;
        let rows: Vec<Transaction> = (0..size).map(|_| generator.next_transaction()).collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(Transaction::transaction_id))),
            Arc::new(
                TimestampSecondArray::from_iter_values(rows.iter().map(|t| t.timestamp))
                    .with_timezone("UTC"),
            ),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|t| format!("CUST{:06}", t.customer)),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|t| format!("PROD{:05}", t.product)),
            )),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|t| t.category))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|t| t.quantity))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|t| t.unit_price))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|t| t.total_amount))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|t| t.payment_method))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|t| t.store_location))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|t| t.discount))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|t| t.customer_age))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|t| t.segment))),
            Arc::new(Float64Array::from(rows.iter().map(|t| t.rating).collect::<Vec<_>>())),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|t| if t.returned { "Yes" } else { "No" }),
            )),
        ];
        batches.push(RecordBatch::try_new(schema.clone(), columns)?);
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_seeded() {
        assert_eq!(transactions(50, 7), transactions(50, 7));
        assert_ne!(transactions(50, 7), transactions(50, 8));
    }

    #[test]
    fn test_rows_match_schema() {
        let schema = transaction_schema();
        for record in transactions(20, FIXTURE_SEED) {
            assert_eq!(record.len(), schema.len());
            for spec in schema.columns() {
                assert!(record.get(&spec.name).is_some(), "missing {}", spec.name);
            }
        }
    }

    #[test]
    fn test_chunks_and_batches_cover_same_rows() {
        let chunks = transaction_chunks(1_050, 500, FIXTURE_SEED);
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![500, 500, 50]);
        assert_eq!(
            chunks.into_iter().flatten().collect::<Vec<_>>(),
            transactions(1_050, FIXTURE_SEED)
        );

        let batches = transaction_batches(1_050, 400, FIXTURE_SEED).unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 1_050);
        assert_eq!(batches[0].num_columns(), 15);
    }

    #[test]
    fn test_missing_and_returned_rates() {
        let records = transactions(5_000, FIXTURE_SEED);
        let missing = records.iter().filter(|r| r.value("rating").is_missing()).count();
        let returned = records
            .iter()
            .filter(|r| r.value("returned") == &ColumnValue::from("Yes"))
            .count();
        assert!((350..650).contains(&missing), "missing ratings: {missing}");
        assert!((850..1_150).contains(&returned), "returned: {returned}");
    }
}
