//! Storage trait definitions.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::entities::{Ledger, Product, StockLevel, TaxScope};
use crate::errors::BulkOpsResult;

/// Catalog database seen by the bulk operations.
///
/// Setters report whether the stored value actually changed, the way a bulk
/// update reports its modified count.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Get storage type identifier
    fn storage_type(&self) -> &'static str;

    // === Products ===

    /// Load every product
    async fn list_products(&self) -> BulkOpsResult<Vec<Product>>;

    /// Load the products with the given ids, skipping unknown ones
    async fn get_products(&self, ids: &[String]) -> BulkOpsResult<Vec<Product>>;

    /// Products whose NCM code starts with `prefix`
    async fn products_by_ncm_prefix(&self, prefix: &str) -> BulkOpsResult<Vec<Product>>;

    /// Set the active flag of a product
    async fn set_product_active(&self, product_id: &str, active: bool) -> BulkOpsResult<bool>;

    /// Overwrite cost and sale price of a product
    async fn set_prices(&self, product_id: &str, cost: f64, sale: f64) -> BulkOpsResult<bool>;

    /// Point a product at a tax classification, or remove the reference with `None`
    async fn set_tax_reference(
        &self,
        product_id: &str,
        scope: TaxScope,
        tax_id: Option<String>,
    ) -> BulkOpsResult<bool>;

    // === Stock ===

    /// Load every stock level
    async fn list_stocks(&self) -> BulkOpsResult<Vec<StockLevel>>;

    /// Overwrite the quantity of a stock level
    async fn set_stock_quantity(&self, stock_id: &str, quantity: f64) -> BulkOpsResult<bool>;

    // === Reference data ===

    /// Check that a tax classification exists
    async fn tax_exists(&self, scope: TaxScope, tax_id: &str) -> BulkOpsResult<bool>;

    /// Enable MEI stock adjustment on every emitter, returning how many changed
    async fn enable_mei_all(&self) -> BulkOpsResult<usize>;

    // === Ledgers ===

    /// Delete the entries of a ledger dated strictly before `before`, returning how many went
    async fn delete_ledger_before(&self, ledger: Ledger, before: NaiveDate) -> BulkOpsResult<usize>;
}
