//! Data layer: order rows pulled from the sales database, the validated
//! records the model trains on, and the reporting aggregations over them

pub mod errors;
pub mod source;
pub mod summary;

// Re-export commonly used types
pub use errors::{ForecastError, ForecastResult};
pub use source::{InMemorySource, OrderSource, PgOrderSource};
pub use summary::SalesSummary;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Raw row of the `orders ⋈ order_details ⋈ products` join.
/// Every column is nullable in the source schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderRow {
    pub customer_id: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub category_id: Option<i32>,
    pub product_id: Option<i32>,
    pub unit_price: Option<f64>,
    pub quantity: Option<i32>,
    pub discount: Option<f64>,
}

/// One historical order line with every required field present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub category_id: i32,
    pub product_id: i32,
    pub unit_price: f64,
    pub quantity: u32,
    pub discount: f64,
}

impl OrderRecord {
    pub fn order_month(&self) -> u32 {
        self.order_date.month()
    }

    pub fn order_day(&self) -> u32 {
        self.order_date.day()
    }

    /// Amount paid for the line after discount
    pub fn total_spent(&self) -> f64 {
        self.unit_price * f64::from(self.quantity) * (1.0 - self.discount)
    }

    /// Convert a source row, failing on the first NULL required column
    pub fn from_row(row: OrderRow) -> ForecastResult<Self> {
        fn required<T>(value: Option<T>, column: &str) -> ForecastResult<T> {
            value.ok_or_else(|| {
                ForecastError::training_error(format!(
                    "required column `{}` is missing",
                    column
                ))
            })
        }

        let quantity = required(row.quantity, "quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| ForecastError::validation_error("quantity", "Quantity cannot be negative"))?;

        let record = OrderRecord {
            customer_id: required(row.customer_id, "customer_id")?,
            order_date: required(row.order_date, "order_date")?,
            category_id: required(row.category_id, "category_id")?,
            product_id: required(row.product_id, "product_id")?,
            unit_price: required(row.unit_price, "unit_price")?,
            quantity,
            discount: required(row.discount, "discount")?,
        };
        validation::validate_record(&record)?;
        Ok(record)
    }
}

/// Product as listed by the read endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub product_id: i32,
    pub product_name: String,
}

/// Validated training data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<OrderRecord>,
}

impl Dataset {
    pub fn new(records: Vec<OrderRecord>) -> Self {
        Self { records }
    }

    /// Build a dataset from source rows. Any malformed row fails the whole
    /// dataset with a training error naming the row.
    pub fn from_rows(rows: Vec<OrderRow>) -> ForecastResult<Self> {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                OrderRecord::from_row(row).map_err(|e| match e {
                    ForecastError::Training(msg) => {
                        ForecastError::training_error(format!("row {}: {}", idx, msg))
                    }
                    other => ForecastError::training_error(format!("row {}: {}", idx, other)),
                })
            })
            .collect::<ForecastResult<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Validation helpers
pub mod validation {
    use super::*;

    /// Validate the invariants of an order line
    pub fn validate_record(record: &OrderRecord) -> ForecastResult<()> {
        if record.customer_id.trim().is_empty() {
            return Err(ForecastError::validation_error("customer_id", "Customer id cannot be empty"));
        }

        validate_unit_price(record.unit_price)?;
        validate_discount(record.discount)?;

        Ok(())
    }

    pub fn validate_unit_price(unit_price: f64) -> ForecastResult<()> {
        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(ForecastError::validation_error("unit_price", "Unit price must be a non-negative number"));
        }
        Ok(())
    }

    pub fn validate_discount(discount: f64) -> ForecastResult<()> {
        if !(0.0..=1.0).contains(&discount) {
            return Err(ForecastError::validation_error("discount", "Discount must be between 0.0 and 1.0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> OrderRow {
        OrderRow {
            customer_id: Some("ALFKI".to_string()),
            order_date: NaiveDate::from_ymd_opt(1997, 8, 25),
            category_id: Some(1),
            product_id: Some(28),
            unit_price: Some(45.6),
            quantity: Some(15),
            discount: Some(0.0),
        }
    }

    #[test]
    fn test_record_derived_fields() {
        let mut r = row();
        r.unit_price = Some(14.0);
        r.quantity = Some(10);
        r.discount = Some(0.1);
        let record = OrderRecord::from_row(r).expect("valid row");
        assert_eq!(record.order_month(), 8);
        assert_eq!(record.order_day(), 25);
        assert!((record.total_spent() - 126.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_column_is_training_error() {
        let mut r = row();
        r.order_date = None;
        let err = OrderRecord::from_row(r).unwrap_err();
        assert!(matches!(err, ForecastError::Training(_)));
        assert!(err.to_string().contains("order_date"));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let mut r = row();
        r.quantity = Some(-1);
        let err = OrderRecord::from_row(r).unwrap_err();
        assert!(matches!(err, ForecastError::Validation { .. }));
    }

    #[test]
    fn test_discount_out_of_range_rejected() {
        let mut r = row();
        r.discount = Some(1.5);
        assert!(OrderRecord::from_row(r).is_err());
    }

    #[test]
    fn test_dataset_from_rows_names_bad_row() {
        let mut bad = row();
        bad.customer_id = None;
        let err = Dataset::from_rows(vec![row(), bad]).unwrap_err();
        assert!(matches!(err, ForecastError::Training(_)));
        assert!(err.to_string().contains("row 1"));
        assert!(err.to_string().contains("customer_id"));
    }

    #[test]
    fn test_dataset_from_rows() {
        let dataset = Dataset::from_rows(vec![row(), row()]).expect("valid rows");
        assert_eq!(dataset.len(), 2);
        assert!(!dataset.is_empty());
        assert!(Dataset::from_rows(vec![]).expect("empty ok").is_empty());
    }
}
