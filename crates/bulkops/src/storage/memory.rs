//! In-memory storage implementation with JSON file persistence.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::fs;
use tokio::sync::RwLock;

use super::traits::CatalogStore;
use crate::entities::{Catalog, Ledger, Product, StockLevel, TaxScope};
use crate::errors::{BulkOpsError, BulkOpsResult};

/// Catalog held in memory behind an async lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

fn product_not_found(id: &str) -> BulkOpsError {
    BulkOpsError::EntityNotFound {
        collection: "Product".to_string(),
        id: id.to_string(),
    }
}

impl MemoryStore {
    /// Create a store over the given catalog
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    /// Load a catalog JSON file; a missing file yields an empty catalog
    pub async fn load(path: impl AsRef<Path>) -> BulkOpsResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Self::new(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(BulkOpsError::FileRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Write the catalog as pretty JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> BulkOpsResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&*self.catalog.read().await)?;
        fs::write(path, content)
            .await
            .map_err(|e| BulkOpsError::FileWrite {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Copy of the current catalog
    pub async fn snapshot(&self) -> Catalog {
        self.catalog.read().await.clone()
    }

    /// Look up a single product
    pub async fn product(&self, id: &str) -> Option<Product> {
        self.catalog.read().await.product(id).cloned()
    }

    /// Look up a single stock level
    pub async fn stock(&self, id: &str) -> Option<StockLevel> {
        self.catalog.read().await.stock(id).cloned()
    }

    /// Delete a product, returning it if it existed
    pub async fn remove_product(&self, id: &str) -> Option<Product> {
        let mut catalog = self.catalog.write().await;
        let idx = catalog.products.iter().position(|p| p.id == id)?;
        Some(catalog.products.remove(idx))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn storage_type(&self) -> &'static str {
        "memory"
    }

    async fn list_products(&self) -> BulkOpsResult<Vec<Product>> {
        Ok(self.catalog.read().await.products.clone())
    }

    async fn get_products(&self, ids: &[String]) -> BulkOpsResult<Vec<Product>> {
        let catalog = self.catalog.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| catalog.product(id).cloned())
            .collect())
    }

    async fn products_by_ncm_prefix(&self, prefix: &str) -> BulkOpsResult<Vec<Product>> {
        Ok(self
            .catalog
            .read()
            .await
            .products
            .iter()
            .filter(|p| p.matches_ncm(prefix))
            .cloned()
            .collect())
    }

    async fn set_product_active(&self, product_id: &str, active: bool) -> BulkOpsResult<bool> {
        let mut catalog = self.catalog.write().await;
        let product = catalog
            .product_mut(product_id)
            .ok_or_else(|| product_not_found(product_id))?;
        let changed = product.active != active;
        product.active = active;
        Ok(changed)
    }

    async fn set_prices(&self, product_id: &str, cost: f64, sale: f64) -> BulkOpsResult<bool> {
        let mut catalog = self.catalog.write().await;
        let product = catalog
            .product_mut(product_id)
            .ok_or_else(|| product_not_found(product_id))?;
        let changed = product.cost_price != cost || product.sale_price != sale;
        product.cost_price = cost;
        product.sale_price = sale;
        Ok(changed)
    }

    async fn set_tax_reference(
        &self,
        product_id: &str,
        scope: TaxScope,
        tax_id: Option<String>,
    ) -> BulkOpsResult<bool> {
        let mut catalog = self.catalog.write().await;
        let product = catalog
            .product_mut(product_id)
            .ok_or_else(|| product_not_found(product_id))?;
        let slot = product.tax_ref_mut(scope);
        let changed = *slot != tax_id;
        *slot = tax_id;
        Ok(changed)
    }

    async fn list_stocks(&self) -> BulkOpsResult<Vec<StockLevel>> {
        Ok(self.catalog.read().await.stocks.clone())
    }

    async fn set_stock_quantity(&self, stock_id: &str, quantity: f64) -> BulkOpsResult<bool> {
        let mut catalog = self.catalog.write().await;
        let stock = catalog
            .stock_mut(stock_id)
            .ok_or_else(|| BulkOpsError::EntityNotFound {
                collection: "Stock".to_string(),
                id: stock_id.to_string(),
            })?;
        let changed = stock.quantity != quantity;
        stock.quantity = quantity;
        Ok(changed)
    }

    async fn tax_exists(&self, scope: TaxScope, tax_id: &str) -> BulkOpsResult<bool> {
        Ok(self
            .catalog
            .read()
            .await
            .taxes(scope)
            .iter()
            .any(|t| t.id == tax_id))
    }

    async fn enable_mei_all(&self) -> BulkOpsResult<usize> {
        let mut catalog = self.catalog.write().await;
        let mut changed = 0;
        for emitter in catalog.emitters.iter_mut().filter(|e| !e.mei_enabled) {
            emitter.mei_enabled = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_ledger_before(&self, ledger: Ledger, before: NaiveDate) -> BulkOpsResult<usize> {
        let mut catalog = self.catalog.write().await;
        let entries = catalog.ledger_mut(ledger);
        let kept = entries.len();
        entries.retain(|e| e.date >= before);
        Ok(kept - entries.len())
    }
}
