//! Dated ledger entries that can be purged by date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Collection of dated documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ledger {
    /// Stock movements, dated by movement date
    Movements,
    /// Accounts receivable, dated by issue date
    Receivables,
    /// Accounts payable, dated by issue date
    Payables,
    /// Outgoing fiscal documents, dated by issue date
    FiscalDocuments,
}

impl Ledger {
    /// Purge order
    pub const ALL: [Self; 4] = [
        Self::Movements,
        Self::Receivables,
        Self::Payables,
        Self::FiscalDocuments,
    ];
}

impl std::fmt::Display for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Movements => "movements",
            Self::Receivables => "receivables",
            Self::Payables => "payables",
            Self::FiscalDocuments => "fiscal documents",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub date: NaiveDate,
}

impl LedgerEntry {
    pub fn new(id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            date,
        }
    }
}
