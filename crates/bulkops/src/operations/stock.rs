//! Stock and price zeroing operations.

use tracing::info;

use super::{OperationOutcome, OperationsManager};
use crate::compensation::{OperationType, PriceChange, QuantityChange, Snapshot};
use crate::errors::BulkOpsResult;

impl OperationsManager {
    /// Set every non-zero stock quantity to zero
    pub async fn zero_all_stock(&self) -> BulkOpsResult<OperationOutcome> {
        self.zero_stock_where(OperationType::ZeroStock, |qty| qty != 0.0)
            .await
    }

    /// Set every negative stock quantity to zero
    pub async fn zero_negative_stock(&self) -> BulkOpsResult<OperationOutcome> {
        self.zero_stock_where(OperationType::ZeroNegativeStock, |qty| qty < 0.0)
            .await
    }

    async fn zero_stock_where(
        &self,
        op_type: OperationType,
        selects: impl Fn(f64) -> bool,
    ) -> BulkOpsResult<OperationOutcome> {
        let deadline = self.deadline();

        let stocks = self
            .within(op_type, deadline, self.store.list_stocks())
            .await?;
        let changes: Vec<QuantityChange> = stocks
            .into_iter()
            .filter(|s| selects(s.quantity))
            .map(|s| QuantityChange {
                entity_id: s.id,
                previous: s.quantity,
            })
            .collect();
        info!(op_type = %op_type, captured = changes.len(), "captured stock levels");

        let store = self.store.as_ref();
        let applied = self
            .apply_each(op_type, deadline, changes, move |change: &QuantityChange| {
                let id = change.entity_id.clone();
                async move { store.set_stock_quantity(&id, 0.0).await }
            })
            .await;

        let negative_only = op_type == OperationType::ZeroNegativeStock;
        self.finish(
            op_type,
            applied,
            |n| {
                if negative_only {
                    format!("Zeroed {n} negative stock levels")
                } else {
                    format!("Zeroed {n} stock levels")
                }
            },
            Snapshot::Quantities,
        )
    }

    /// Set cost and sale price of every priced product to zero
    pub async fn zero_all_prices(&self) -> BulkOpsResult<OperationOutcome> {
        let op_type = OperationType::ZeroPrices;
        let deadline = self.deadline();

        let products = self
            .within(op_type, deadline, self.store.list_products())
            .await?;
        let changes: Vec<PriceChange> = products
            .into_iter()
            .filter(|p| p.cost_price != 0.0 || p.sale_price != 0.0)
            .map(|p| PriceChange {
                entity_id: p.id,
                previous_cost: p.cost_price,
                previous_sale: p.sale_price,
            })
            .collect();
        info!(captured = changes.len(), "captured product prices");

        let store = self.store.as_ref();
        let applied = self
            .apply_each(op_type, deadline, changes, move |change: &PriceChange| {
                let id = change.entity_id.clone();
                async move { store.set_prices(&id, 0.0, 0.0).await }
            })
            .await;

        self.finish(
            op_type,
            applied,
            |n| format!("Zeroed prices of {n} products"),
            Snapshot::Prices,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cancel::CancellationToken;
    use crate::compensation::CompensationLog;
    use crate::config::Settings;
    use crate::entities::{Catalog, Product, StockLevel};
    use crate::storage::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, OperationsManager) {
        let store = Arc::new(MemoryStore::new(Catalog {
            products: vec![
                Product::new("p1", "Rice").with_prices(3.5, 6.0),
                Product::new("p2", "Gift card"),
            ],
            stocks: vec![
                StockLevel::new("s1", 12.0),
                StockLevel::new("s2", -3.0),
                StockLevel::new("s3", 0.0),
            ],
            ..Catalog::default()
        }));
        let ops = OperationsManager::new(
            Arc::clone(&store) as Arc<dyn crate::storage::CatalogStore>,
            Arc::new(CancellationToken::new()),
            Arc::new(CompensationLog::new(5)),
            Settings::default(),
        );
        (store, ops)
    }

    #[tokio::test]
    async fn test_zero_all_stock_captures_non_zero_levels() {
        let (store, ops) = setup();
        let outcome = ops.zero_all_stock().await.unwrap();

        assert_eq!(outcome.processed, 2);
        let record = ops.history().get(&outcome.record.unwrap()).unwrap();
        assert_eq!(
            record.snapshot,
            Snapshot::Quantities(vec![
                QuantityChange {
                    entity_id: "s1".to_string(),
                    previous: 12.0
                },
                QuantityChange {
                    entity_id: "s2".to_string(),
                    previous: -3.0
                },
            ])
        );
        assert_eq!(store.stock("s1").await.unwrap().quantity, 0.0);
    }

    #[tokio::test]
    async fn test_zero_negative_stock_leaves_positive_levels() {
        let (store, ops) = setup();
        let outcome = ops.zero_negative_stock().await.unwrap();

        assert_eq!(outcome.processed, 1);
        assert_eq!(store.stock("s1").await.unwrap().quantity, 12.0);
        assert_eq!(store.stock("s2").await.unwrap().quantity, 0.0);
        let record = ops.history().get(&outcome.record.unwrap()).unwrap();
        assert_eq!(record.label, "Zeroed 1 negative stock levels");
    }

    #[tokio::test]
    async fn test_zero_all_prices_captures_both_prices() {
        let (store, ops) = setup();
        let outcome = ops.zero_all_prices().await.unwrap();

        assert_eq!(outcome.processed, 1);
        let product = store.product("p1").await.unwrap();
        assert_eq!((product.cost_price, product.sale_price), (0.0, 0.0));
        let record = ops.history().get(&outcome.record.unwrap()).unwrap();
        assert_eq!(
            record.snapshot,
            Snapshot::Prices(vec![PriceChange {
                entity_id: "p1".to_string(),
                previous_cost: 3.5,
                previous_sale: 6.0,
            }])
        );
    }
}
