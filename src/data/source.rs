//! Row sources for order history and the product catalogue

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{ForecastResult, OrderRow, Product};

/// Joined order lines with the columns the model needs. Numeric columns are
/// cast so the decoded types do not depend on how the schema declared them.
const ORDER_ROWS_SQL: &str = r#"
    SELECT
        o.customer_id::text AS customer_id,
        o.order_date AS order_date,
        p.category_id::int4 AS category_id,
        p.product_id::int4 AS product_id,
        od.unit_price::float8 AS unit_price,
        od.quantity::int4 AS quantity,
        od.discount::float8 AS discount
    FROM orders AS o
    INNER JOIN order_details AS od ON o.order_id = od.order_id
    INNER JOIN products AS p ON p.product_id = od.product_id
    ORDER BY o.order_id, p.product_id
"#;

const PRODUCTS_SQL: &str = r#"
    SELECT product_id::int4 AS product_id, product_name::text AS product_name
    FROM products
    ORDER BY product_id
"#;

const PRODUCT_BY_ID_SQL: &str = r#"
    SELECT product_id::int4 AS product_id, product_name::text AS product_name
    FROM products
    WHERE product_id = $1
"#;

/// Data-access collaborator: everything the service reads from the sales schema
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetch every order line used for training and reporting
    async fn fetch_orders(&self) -> ForecastResult<Vec<OrderRow>>;

    async fn list_products(&self) -> ForecastResult<Vec<Product>>;

    async fn get_product(&self, product_id: i32) -> ForecastResult<Option<Product>>;
}

/// Postgres-backed source
pub struct PgOrderSource {
    pool: PgPool,
}

impl PgOrderSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderSource for PgOrderSource {
    async fn fetch_orders(&self) -> ForecastResult<Vec<OrderRow>> {
        // Use persistent(false) to avoid prepared statements behind pgBouncer
        let rows = sqlx::query_as::<_, OrderRow>(ORDER_ROWS_SQL)
            .persistent(false)
            .fetch_all(&self.pool)
            .await?;

        info!(rows = rows.len(), "Fetched order rows");
        Ok(rows)
    }

    async fn list_products(&self) -> ForecastResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(PRODUCTS_SQL)
            .persistent(false)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    async fn get_product(&self, product_id: i32) -> ForecastResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(PRODUCT_BY_ID_SQL)
            .bind(product_id)
            .persistent(false)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }
}

/// In-memory source for tests and offline runs
#[derive(Default)]
pub struct InMemorySource {
    orders: RwLock<Vec<OrderRow>>,
    products: RwLock<Vec<Product>>,
}

impl InMemorySource {
    pub fn new(orders: Vec<OrderRow>, products: Vec<Product>) -> Self {
        Self {
            orders: RwLock::new(orders),
            products: RwLock::new(products),
        }
    }

    /// Replace the order history, e.g. to simulate new sales before a retrain
    pub async fn replace_orders(&self, orders: Vec<OrderRow>) {
        *self.orders.write().await = orders;
    }
}

#[async_trait]
impl OrderSource for InMemorySource {
    async fn fetch_orders(&self) -> ForecastResult<Vec<OrderRow>> {
        Ok(self.orders.read().await.clone())
    }

    async fn list_products(&self) -> ForecastResult<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn get_product(&self, product_id: i32) -> ForecastResult<Option<Product>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.product_id == product_id)
            .cloned())
    }
}
