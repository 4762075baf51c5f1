#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use salesforecast::api::AppState;
use salesforecast::data::InMemorySource;
use salesforecast::orchestrator::{RetrainCoordinator, RetrainSettings, SnapshotStore};
use salesforecast::{OrderRow, Product};

pub const CUSTOMERS: [&str; 6] = ["ALFKI", "ANATR", "ANTON", "AROUT", "BERGS", "BLAUS"];

pub fn products() -> Vec<Product> {
    [
        (1, "Chai"),
        (2, "Chang"),
        (3, "Aniseed Syrup"),
        (11, "Queso Cabrales"),
        (42, "Singaporean Hokkien Fried Mee"),
        (72, "Mozzarella di Giovanni"),
    ]
    .into_iter()
    .map(|(product_id, name)| Product {
        product_id,
        product_name: name.to_string(),
    })
    .collect()
}

/// Deterministic order lines shaped like the Northwind join
pub fn order_rows(count: usize) -> Vec<OrderRow> {
    let catalogue = [(1, 1, 18.0), (2, 1, 19.0), (3, 2, 10.0), (11, 4, 21.0), (42, 5, 14.0), (72, 4, 34.8)];
    (0..count)
        .map(|i| {
            let (product_id, category_id, unit_price) = catalogue[i % catalogue.len()];
            let customer = CUSTOMERS[(i / 3) % CUSTOMERS.len()];
            OrderRow {
                customer_id: Some(customer.to_string()),
                order_date: NaiveDate::from_ymd_opt(1996 + (i % 3) as i32, (i % 12) as u32 + 1, (i % 28) as u32 + 1),
                category_id: Some(category_id),
                product_id: Some(product_id),
                unit_price: Some(unit_price),
                quantity: Some(((i * 7 + product_id as usize) % 45) as i32 + 1),
                discount: Some([0.0, 0.05, 0.1, 0.0][i % 4]),
            }
        })
        .collect()
}

pub fn source(rows: usize) -> Arc<InMemorySource> {
    Arc::new(InMemorySource::new(order_rows(rows), products()))
}

pub fn coordinator(source: Arc<InMemorySource>, settings: RetrainSettings) -> Arc<RetrainCoordinator> {
    Arc::new(RetrainCoordinator::new(source, Arc::new(SnapshotStore::new()), settings))
}

pub fn app_state(source: Arc<InMemorySource>, retrainer: Arc<RetrainCoordinator>) -> AppState {
    AppState::new(source, retrainer)
}

/// The request body from the API documentation
pub fn example_payload() -> serde_json::Value {
    serde_json::json!({
        "product_id": 11,
        "customer_id": "ALFKI",
        "category_id": 4,
        "unit_price": 21.0,
        "discount": 0.0,
        "order_month": 7,
        "order_day": 15,
        "total_spent": 252.0
    })
}
