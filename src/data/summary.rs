//! Sales reporting aggregations over the order history

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::OrderRecord;

/// Order-count tier of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Segment {
    /// Tier for a number of order lines: up to 50 is Bronze, up to 100
    /// Silver, up to 150 Gold, anything above Platinum.
    pub fn for_order_count(count: u64) -> Self {
        match count {
            0..=50 => Segment::Bronze,
            51..=100 => Segment::Silver,
            101..=150 => Segment::Gold,
            _ => Segment::Platinum,
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Bronze => write!(f, "Bronze"),
            Segment::Silver => write!(f, "Silver"),
            Segment::Gold => write!(f, "Gold"),
            Segment::Platinum => write!(f, "Platinum"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub quantity: u64,
    pub total_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub order_counts: u64,
    pub segment: Segment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    /// customer -> product -> quantity, zero-filled for products a customer never bought
    pub sales_table: BTreeMap<String, BTreeMap<i32, u64>>,
    /// order month -> quantity
    pub monthly_sales: BTreeMap<u32, u64>,
    pub product_sales: BTreeMap<i32, ProductSales>,
    pub customer_segments: BTreeMap<String, CustomerSegment>,
}

impl SalesSummary {
    pub fn from_records(records: &[OrderRecord]) -> Self {
        let products: BTreeSet<i32> = records.iter().map(|r| r.product_id).collect();

        let mut summary = SalesSummary::default();
        for record in records {
            let row = summary
                .sales_table
                .entry(record.customer_id.clone())
                .or_insert_with(|| products.iter().map(|p| (*p, 0)).collect());
            *row.entry(record.product_id).or_insert(0) += u64::from(record.quantity);

            *summary.monthly_sales.entry(record.order_month()).or_insert(0) +=
                u64::from(record.quantity);

            let product = summary.product_sales.entry(record.product_id).or_default();
            product.quantity += u64::from(record.quantity);
            product.total_spent += record.total_spent();

            summary
                .customer_segments
                .entry(record.customer_id.clone())
                .or_insert(CustomerSegment {
                    order_counts: 0,
                    segment: Segment::Bronze,
                })
                .order_counts += 1;
        }

        for customer in summary.customer_segments.values_mut() {
            customer.segment = Segment::for_order_count(customer.order_counts);
        }

        summary
    }
}
