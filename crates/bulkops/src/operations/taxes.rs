//! Tax classification reassignment by NCM prefix.

use std::collections::HashSet;

use futures::future::try_join_all;
use tracing::{debug, info};

use super::{OperationOutcome, OperationsManager};
use crate::compensation::{OperationType, ReferenceChange, Snapshot};
use crate::entities::TaxScope;
use crate::errors::{BulkOpsError, BulkOpsResult};

impl OperationsManager {
    /// Point every product whose NCM starts with one of `ncms` at `tax_id`.
    ///
    /// Products that had no reference before get the field removed again on undo.
    pub async fn change_tax_by_ncm(
        &self,
        scope: TaxScope,
        ncms: &[String],
        tax_id: &str,
    ) -> BulkOpsResult<OperationOutcome> {
        let op_type = match scope {
            TaxScope::State => OperationType::ChangeStateTax,
            TaxScope::Federal => OperationType::ChangeFederalTax,
        };

        let tax_id = tax_id.trim();
        if tax_id.is_empty() {
            return Err(BulkOpsError::InvalidArgument {
                reason: "tax id is empty".to_string(),
            });
        }
        let prefixes: Vec<&str> = ncms
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        if prefixes.is_empty() {
            return Err(BulkOpsError::InvalidArgument {
                reason: "no NCM informed".to_string(),
            });
        }

        let exists = tokio::time::timeout(
            self.settings.lookup_timeout(),
            self.store.tax_exists(scope, tax_id),
        )
        .await
        .map_err(|_| BulkOpsError::Timeout {
            operation: format!("{op_type} lookup"),
            after: self.settings.lookup_timeout(),
        })??;
        if !exists {
            return Err(BulkOpsError::EntityNotFound {
                collection: format!("{scope} tax"),
                id: tax_id.to_string(),
            });
        }

        let deadline = self.deadline();
        let lookups = prefixes
            .iter()
            .map(|prefix| self.store.products_by_ncm_prefix(prefix));
        let matches = self.within(op_type, deadline, try_join_all(lookups)).await?;

        let mut seen = HashSet::new();
        let mut changes = Vec::new();
        for (prefix, matched) in prefixes.iter().zip(matches) {
            debug!(ncm = *prefix, matched = matched.len(), "matched products");
            for product in matched {
                if product.tax_ref(scope) == Some(tax_id) || !seen.insert(product.id.clone()) {
                    continue;
                }
                changes.push(ReferenceChange {
                    previous: product.tax_ref(scope).map(str::to_string),
                    entity_id: product.id,
                });
            }
        }
        info!(scope = %scope, tax_id, captured = changes.len(), "reassigning tax classification");

        let store = self.store.as_ref();
        let target = tax_id.to_string();
        let applied = self
            .apply_each(op_type, deadline, changes, move |change: &ReferenceChange| {
                let id = change.entity_id.clone();
                let target = target.clone();
                async move { store.set_tax_reference(&id, scope, Some(target)).await }
            })
            .await;

        self.finish(
            op_type,
            applied,
            |n| format!("Changed {scope} tax of {n} products to {tax_id}"),
            |changes| Snapshot::TaxReferences { scope, changes },
        )
    }
}
