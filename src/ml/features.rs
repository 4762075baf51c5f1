//! Feature encoding shared by training and serving.
//!
//! Both paths go through [`FeatureEncoder::encode`], so the vector a request
//! produces is laid out exactly like the vectors the model was fitted on.
//! Categorical identifiers become integer codes from the
//! [`CategoryCodeTable`]; there is no one-hot expansion, so an unseen
//! customer can never shift column positions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::{validation, ForecastError, ForecastResult, OrderRecord};

use super::codes::CategoryCodeTable;

/// Bumped whenever the feature list or its meaning changes
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Feature order of every vector fed to the model
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "product_id",
    "category_id",
    "unit_price",
    "discount",
    "order_month",
    "order_day",
    "total_spent",
    "customer_code",
];

pub const FEATURE_COUNT: usize = 8;

/// Versioned, ordered feature list stored with every artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub names: Vec<String>,
}

impl FeatureSchema {
    /// The schema this build encodes with
    pub fn current() -> Self {
        Self {
            version: FEATURE_SCHEMA_VERSION,
            names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fail unless `other` is element-for-element the same schema
    pub fn ensure_matches(&self, other: &FeatureSchema) -> ForecastResult<()> {
        if self == other {
            return Ok(());
        }
        Err(ForecastError::SchemaMismatch {
            expected: self.describe(),
            found: other.describe(),
        })
    }

    fn describe(&self) -> String {
        format!("v{} [{}]", self.version, self.names.join(", "))
    }
}

/// Raw fields before encoding, common to historical records and requests
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInput {
    pub product_id: i64,
    pub category_id: i64,
    pub unit_price: f64,
    pub discount: f64,
    pub order_month: u32,
    pub order_day: u32,
    pub total_spent: f64,
    pub customer_key: String,
}

impl FeatureInput {
    pub fn from_record(record: &OrderRecord) -> Self {
        Self {
            product_id: i64::from(record.product_id),
            category_id: i64::from(record.category_id),
            unit_price: record.unit_price,
            discount: record.discount,
            order_month: record.order_month(),
            order_day: record.order_day(),
            total_spent: record.total_spent(),
            customer_key: record.customer_id.clone(),
        }
    }

    /// Parse a prediction request body.
    ///
    /// Numbers and numeric strings are accepted. A missing field, a
    /// non-numeric value, or a value outside its domain is a validation
    /// error naming the field.
    pub fn from_payload(payload: &Value) -> ForecastResult<Self> {
        let fields = payload
            .as_object()
            .ok_or_else(|| ForecastError::validation_error("body", "expected a JSON object"))?;

        let unit_price = number_field(fields, "unit_price")?;
        validation::validate_unit_price(unit_price)?;

        let discount = number_field(fields, "discount")?;
        validation::validate_discount(discount)?;

        let total_spent = number_field(fields, "total_spent")?;
        if total_spent < 0.0 {
            return Err(ForecastError::validation_error("total_spent", "must not be negative"));
        }

        Ok(Self {
            product_id: integer_field(fields, "product_id")?,
            category_id: integer_field(fields, "category_id")?,
            unit_price,
            discount,
            order_month: ranged_field(fields, "order_month", 1, 12)?,
            order_day: ranged_field(fields, "order_day", 1, 31)?,
            total_spent,
            customer_key: key_field(fields, "customer_id")?,
        })
    }
}

/// Encoded vector plus what the encoder had to assume to build it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedFeatures {
    pub values: [f64; FEATURE_COUNT],
    pub customer_code: u32,
    /// The customer key was not in the code table and got the default code
    pub unknown_customer: bool,
}

/// Pure mapping from raw fields to the model's feature vector
pub struct FeatureEncoder<'a> {
    codes: &'a CategoryCodeTable,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(codes: &'a CategoryCodeTable) -> Self {
        Self { codes }
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::current()
    }

    pub fn encode(&self, input: &FeatureInput) -> ForecastResult<EncodedFeatures> {
        let lookup = self.codes.resolve(&input.customer_key);

        // keep in sync with FEATURE_NAMES
        let values = [
            input.product_id as f64,
            input.category_id as f64,
            input.unit_price,
            input.discount,
            f64::from(input.order_month),
            f64::from(input.order_day),
            input.total_spent,
            f64::from(lookup.code),
        ];

        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::validation_error(
                FEATURE_NAMES[idx],
                "value is not a finite number",
            ));
        }

        Ok(EncodedFeatures {
            values,
            customer_code: lookup.code,
            unknown_customer: !lookup.known,
        })
    }

    pub fn encode_record(&self, record: &OrderRecord) -> ForecastResult<EncodedFeatures> {
        self.encode(&FeatureInput::from_record(record))
    }
}

fn field<'v>(fields: &'v Map<String, Value>, name: &str) -> ForecastResult<&'v Value> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(ForecastError::validation_error(name, "missing required field")),
        Some(value) => Ok(value),
    }
}

fn number_field(fields: &Map<String, Value>, name: &str) -> ForecastResult<f64> {
    let parsed = match field(fields, name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ForecastError::validation_error(name, "expected a number")),
    }
}

fn integer_field(fields: &Map<String, Value>, name: &str) -> ForecastResult<i64> {
    let value = number_field(fields, name)?;
    if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return Err(ForecastError::validation_error(name, "expected an integer"));
    }
    Ok(value as i64)
}

fn ranged_field(fields: &Map<String, Value>, name: &str, min: u32, max: u32) -> ForecastResult<u32> {
    let value = integer_field(fields, name)?;
    if value < i64::from(min) || value > i64::from(max) {
        return Err(ForecastError::validation_error(
            name,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(value as u32)
}

/// Categorical keys may arrive as strings or numbers
fn key_field(fields: &Map<String, Value>, name: &str) -> ForecastResult<String> {
    match field(fields, name)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ForecastError::validation_error(name, "expected a string or number identifier")),
    }
}
