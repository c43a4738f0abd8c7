//! Product activation operations.

use std::collections::HashSet;

use tracing::info;

use super::{OperationOutcome, OperationsManager};
use crate::compensation::{FlagChange, OperationType, Snapshot};
use crate::entities::ProductFilter;
use crate::errors::{BulkOpsError, BulkOpsResult};

impl OperationsManager {
    /// Activate or deactivate a selection of products
    pub async fn bulk_activate(
        &self,
        product_ids: &[String],
        activate: bool,
    ) -> BulkOpsResult<OperationOutcome> {
        let op_type = OperationType::ActivateToggle;
        if product_ids.is_empty() {
            return Err(BulkOpsError::InvalidArgument {
                reason: "no products selected".to_string(),
            });
        }

        let deadline = self.deadline();
        info!(selected = product_ids.len(), activate, "toggling product activation");

        let products = self
            .within(op_type, deadline, self.store.get_products(product_ids))
            .await?;
        let changes: Vec<FlagChange> = products
            .into_iter()
            .filter(|p| p.active != activate)
            .map(|p| FlagChange {
                entity_id: p.id,
                previous: p.active,
            })
            .collect();

        let store = self.store.as_ref();
        let applied = self
            .apply_each(op_type, deadline, changes, move |change: &FlagChange| {
                let id = change.entity_id.clone();
                async move { store.set_product_active(&id, activate).await }
            })
            .await;

        self.finish(
            op_type,
            applied,
            |n| {
                let verb = if activate { "Activated" } else { "Deactivated" };
                format!("{verb} {n} products")
            },
            Snapshot::Activation,
        )
    }

    /// Activate or deactivate every product matching `filter`
    pub async fn bulk_activate_by_filter(
        &self,
        filter: &ProductFilter,
        activate: bool,
    ) -> BulkOpsResult<OperationOutcome> {
        let op_type = OperationType::ActivateToggle;
        let deadline = self.deadline();

        let products = self
            .within(op_type, deadline, self.store.list_products())
            .await?;
        let matched = products.iter().filter(|p| filter.matches(p)).count();
        let changes: Vec<FlagChange> = products
            .into_iter()
            .filter(|p| filter.matches(p) && p.active != activate)
            .map(|p| FlagChange {
                entity_id: p.id,
                previous: p.active,
            })
            .collect();
        info!(matched, candidates = changes.len(), activate, "toggling filtered products");

        let store = self.store.as_ref();
        let applied = self
            .apply_each(op_type, deadline, changes, move |change: &FlagChange| {
                let id = change.entity_id.clone();
                async move { store.set_product_active(&id, activate).await }
            })
            .await;

        self.finish(
            op_type,
            applied,
            |n| {
                let verb = if activate { "Activated" } else { "Deactivated" };
                format!("{verb} {n} filtered products")
            },
            Snapshot::Activation,
        )
    }

    /// Deactivate active products whose stock is zero or negative
    pub async fn inactivate_zero_stock(&self) -> BulkOpsResult<OperationOutcome> {
        let op_type = OperationType::InactivateZeroStock;
        let deadline = self.deadline();

        let stocks = self
            .within(op_type, deadline, self.store.list_stocks())
            .await?;
        let empty: HashSet<String> = stocks
            .into_iter()
            .filter(|s| s.quantity <= 0.0)
            .map(|s| s.id)
            .collect();

        let products = self
            .within(op_type, deadline, self.store.list_products())
            .await?;
        let changes: Vec<FlagChange> = products
            .into_iter()
            .filter(|p| p.active)
            .filter(|p| p.stock_id.as_ref().is_some_and(|s| empty.contains(s)))
            .map(|p| FlagChange {
                entity_id: p.id,
                previous: true,
            })
            .collect();
        info!(candidates = changes.len(), "deactivating products without stock");

        let store = self.store.as_ref();
        let applied = self
            .apply_each(op_type, deadline, changes, move |change: &FlagChange| {
                let id = change.entity_id.clone();
                async move { store.set_product_active(&id, false).await }
            })
            .await;

        self.finish(
            op_type,
            applied,
            |n| format!("Deactivated {n} products without stock"),
            Snapshot::Activation,
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
    use crate::entities::{Catalog, Product, StockLevel, TaxScope};
    use crate::storage::MemoryStore;

    fn manager(store: Arc<MemoryStore>) -> OperationsManager {
        OperationsManager::new(
            store,
            Arc::new(CancellationToken::new()),
            Arc::new(CompensationLog::new(5)),
            Settings::default(),
        )
    }

    fn catalog() -> Catalog {
        Catalog {
            products: vec![
                Product::new("p1", "Rice").with_stock("s1"),
                Product::new("p2", "Beans").with_stock("s2"),
                Product::new("p3", "Salt").with_stock("s3"),
            ],
            stocks: vec![
                StockLevel::new("s1", 0.0),
                StockLevel::new("s2", -2.0),
                StockLevel::new("s3", 0.5),
            ],
            ..Catalog::default()
        }
    }

    #[tokio::test]
    async fn test_bulk_activate_records_previous_flags() {
        let store = Arc::new(MemoryStore::new(catalog()));
        let ops = manager(Arc::clone(&store));

        let ids = vec!["p1".to_string(), "p2".to_string(), "missing".to_string()];
        let outcome = ops.bulk_activate(&ids, false).await.unwrap();

        assert_eq!(outcome.processed, 2);
        assert!(!outcome.cancelled);
        let record = ops.history().get(&outcome.record.unwrap()).unwrap();
        assert_eq!(record.label, "Deactivated 2 products");
        assert_eq!(record.snapshot.len(), 2);
        assert!(!store.product("p1").await.unwrap().active);
    }

    #[tokio::test]
    async fn test_bulk_activate_without_changes_records_nothing() {
        let store = Arc::new(MemoryStore::new(catalog()));
        let ops = manager(store);

        let outcome = ops.bulk_activate(&["p1".to_string()], true).await.unwrap();
        assert_eq!(outcome.processed, 0);
        assert!(outcome.record.is_none());
        assert!(ops.history().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_activate_requires_selection() {
        let ops = manager(Arc::new(MemoryStore::new(catalog())));
        let err = ops.bulk_activate(&[], true).await.unwrap_err();
        assert!(matches!(err, BulkOpsError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_filtered_deactivation_records_only_matches() {
        let mut seed = catalog();
        seed.products[0] = Product::new("p1", "Rice").with_ncm("10063021");
        seed.products[1] = Product::new("p2", "Brown Rice").with_ncm("10063011");
        seed.products[2] = Product::new("p3", "Salt")
            .with_ncm("25010019")
            .with_tax(TaxScope::State, "t1");
        let store = Arc::new(MemoryStore::new(seed));
        let ops = manager(Arc::clone(&store));

        let filter = ProductFilter {
            ncms: vec!["1006".to_string()],
            ..ProductFilter::default()
        };
        let outcome = ops.bulk_activate_by_filter(&filter, false).await.unwrap();

        assert_eq!(outcome.processed, 2);
        let record = ops.history().get(&outcome.record.unwrap()).unwrap();
        assert_eq!(record.op_type, OperationType::ActivateToggle);
        assert_eq!(record.label, "Deactivated 2 filtered products");
        assert_eq!(
            record.snapshot,
            Snapshot::Activation(vec![
                FlagChange {
                    entity_id: "p1".to_string(),
                    previous: true,
                },
                FlagChange {
                    entity_id: "p2".to_string(),
                    previous: true,
                },
            ])
        );
        assert!(store.product("p3").await.unwrap().active);
    }

    #[tokio::test]
    async fn test_filtered_activation_cancelled_before_start_records_nothing() {
        let store = Arc::new(MemoryStore::new(catalog()));
        let ops = manager(Arc::clone(&store));
        ops.cancel_all();

        let outcome = ops
            .bulk_activate_by_filter(&ProductFilter::default(), false)
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.processed, 0);
        assert!(outcome.record.is_none());
        assert!(store.product("p1").await.unwrap().active);
    }

    #[tokio::test]
    async fn test_inactivate_zero_stock_skips_fractional_stock() {
        let store = Arc::new(MemoryStore::new(catalog()));
        let ops = manager(Arc::clone(&store));

        let outcome = ops.inactivate_zero_stock().await.unwrap();

        assert_eq!(outcome.processed, 2);
        assert!(!store.product("p1").await.unwrap().active);
        assert!(!store.product("p2").await.unwrap().active);
        assert!(store.product("p3").await.unwrap().active);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_processes_nothing() {
        let store = Arc::new(MemoryStore::new(catalog()));
        let ops = manager(Arc::clone(&store));
        ops.cancel_all();

        let outcome = ops.inactivate_zero_stock().await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.processed, 0);
        assert!(ops.history().is_empty());
        assert!(store.product("p1").await.unwrap().active);
    }
}
