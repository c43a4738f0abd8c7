//! Operation records and their typed snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::TaxScope;
use crate::errors::BulkOpsError;

/// Opaque identity of a history record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Generate a fresh unique id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OperationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of bulk change a record describes.
///
/// Adding a kind means adding a label here and an arm in the store compensator;
/// the history itself never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Explicit activation or deactivation of a product selection
    ActivateToggle,
    /// Deactivation of products without stock
    #[serde(rename = "InactivateProducts")]
    InactivateZeroStock,
    ZeroStock,
    ZeroNegativeStock,
    #[serde(rename = "ZeroAllPrices")]
    ZeroPrices,
    #[serde(rename = "ChangeTributation")]
    ChangeStateTax,
    #[serde(rename = "ChangeTributationFederal")]
    ChangeFederalTax,
    EnableMei,
    /// Purge of dated ledger entries; never recorded
    #[serde(rename = "CleanDatabaseByDate")]
    CleanByDate,
}

impl OperationType {
    pub const ALL: [Self; 9] = [
        Self::ActivateToggle,
        Self::InactivateZeroStock,
        Self::ZeroStock,
        Self::ZeroNegativeStock,
        Self::ZeroPrices,
        Self::ChangeStateTax,
        Self::ChangeFederalTax,
        Self::EnableMei,
        Self::CleanByDate,
    ];

    /// Stable label, also used on the wire to the presentation layer
    pub fn label(self) -> &'static str {
        match self {
            Self::ActivateToggle => "ActivateToggle",
            Self::InactivateZeroStock => "InactivateProducts",
            Self::ZeroStock => "ZeroStock",
            Self::ZeroNegativeStock => "ZeroNegativeStock",
            Self::ZeroPrices => "ZeroAllPrices",
            Self::ChangeStateTax => "ChangeTributation",
            Self::ChangeFederalTax => "ChangeTributationFederal",
            Self::EnableMei => "EnableMei",
            Self::CleanByDate => "CleanDatabaseByDate",
        }
    }

    /// Snapshot shape the compensating handler expects for this type
    pub fn snapshot_kind(self) -> SnapshotKind {
        match self {
            Self::ActivateToggle | Self::InactivateZeroStock => SnapshotKind::Activation,
            Self::ZeroStock | Self::ZeroNegativeStock => SnapshotKind::Quantities,
            Self::ZeroPrices => SnapshotKind::Prices,
            Self::ChangeStateTax => SnapshotKind::TaxReferences(TaxScope::State),
            Self::ChangeFederalTax => SnapshotKind::TaxReferences(TaxScope::Federal),
            Self::EnableMei | Self::CleanByDate => SnapshotKind::None,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for OperationType {
    type Err = BulkOpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| BulkOpsError::InvalidOperationType {
                label: s.to_string(),
            })
    }
}

/// Previous active flag of one product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagChange {
    pub entity_id: String,
    pub previous: bool,
}

/// Previous quantity of one stock level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityChange {
    pub entity_id: String,
    pub previous: f64,
}

/// Previous prices of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub entity_id: String,
    pub previous_cost: f64,
    pub previous_sale: f64,
}

/// Previous tax reference of one product; `None` means the field was absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceChange {
    pub entity_id: String,
    pub previous: Option<String>,
}

/// Shape of a snapshot, used to check it against its operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Activation,
    Quantities,
    Prices,
    TaxReferences(TaxScope),
    None,
}

/// Pre-mutation state captured by a bulk operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "changes", rename_all = "camelCase")]
pub enum Snapshot {
    Activation(Vec<FlagChange>),
    Quantities(Vec<QuantityChange>),
    Prices(Vec<PriceChange>),
    TaxReferences {
        scope: TaxScope,
        changes: Vec<ReferenceChange>,
    },
    /// Nothing captured; the record can only be informational
    None,
}

impl Snapshot {
    pub fn kind(&self) -> SnapshotKind {
        match self {
            Self::Activation(_) => SnapshotKind::Activation,
            Self::Quantities(_) => SnapshotKind::Quantities,
            Self::Prices(_) => SnapshotKind::Prices,
            Self::TaxReferences { scope, .. } => SnapshotKind::TaxReferences(*scope),
            Self::None => SnapshotKind::None,
        }
    }

    /// Number of entities covered
    pub fn len(&self) -> usize {
        match self {
            Self::Activation(changes) => changes.len(),
            Self::Quantities(changes) => changes.len(),
            Self::Prices(changes) => changes.len(),
            Self::TaxReferences { changes, .. } => changes.len(),
            Self::None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of the covered entities, in capture order
    pub fn entity_ids(&self) -> Vec<&str> {
        match self {
            Self::Activation(changes) => changes.iter().map(|c| c.entity_id.as_str()).collect(),
            Self::Quantities(changes) => changes.iter().map(|c| c.entity_id.as_str()).collect(),
            Self::Prices(changes) => changes.iter().map(|c| c.entity_id.as_str()).collect(),
            Self::TaxReferences { changes, .. } => {
                changes.iter().map(|c| c.entity_id.as_str()).collect()
            }
            Self::None => Vec::new(),
        }
    }
}

/// One entry of the undo history. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: OperationId,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub snapshot: Snapshot,
    pub undoable: bool,
}

impl OperationRecord {
    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            id: self.id.clone(),
            op_type: self.op_type,
            timestamp: self.timestamp,
            label: self.label.clone(),
            undoable: self.undoable,
        }
    }
}

/// What the presentation layer sees of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub id: OperationId,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub undoable: bool,
}

impl OperationSummary {
    /// Local wall-clock time as `HH:MM:SS`
    pub fn time_label(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_labels_round_trip() {
        for op_type in OperationType::ALL {
            assert_eq!(op_type.label().parse::<OperationType>().unwrap(), op_type);
        }
        assert!("DropDatabase".parse::<OperationType>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&OperationType::ChangeFederalTax).unwrap();
        assert_eq!(json, "\"ChangeTributationFederal\"");
    }

    #[test]
    fn test_snapshot_kind_matches_type() {
        let snapshot = Snapshot::TaxReferences {
            scope: TaxScope::Federal,
            changes: vec![],
        };
        assert_eq!(
            snapshot.kind(),
            OperationType::ChangeFederalTax.snapshot_kind()
        );
        assert_ne!(snapshot.kind(), OperationType::ChangeStateTax.snapshot_kind());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_entity_ids_keep_capture_order() {
        let snapshot = Snapshot::Quantities(vec![
            QuantityChange {
                entity_id: "s2".to_string(),
                previous: 1.0,
            },
            QuantityChange {
                entity_id: "s1".to_string(),
                previous: 4.0,
            },
        ]);
        assert_eq!(snapshot.entity_ids(), vec!["s2", "s1"]);
        assert!(Snapshot::None.entity_ids().is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(OperationId::generate(), OperationId::generate());
    }
}
