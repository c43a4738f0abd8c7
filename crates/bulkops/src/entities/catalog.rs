//! Serializable catalog content.

use serde::{Deserialize, Serialize};

use super::{Emitter, Ledger, LedgerEntry, Product, StockLevel, TaxScope};

/// Tax classification that products may reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    pub id: String,
    #[serde(default)]
    pub description: String,
}

impl TaxRate {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Everything a catalog store holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub products: Vec<Product>,

    #[serde(default)]
    pub stocks: Vec<StockLevel>,

    #[serde(default)]
    pub emitters: Vec<Emitter>,

    #[serde(default)]
    pub state_taxes: Vec<TaxRate>,

    #[serde(default)]
    pub federal_taxes: Vec<TaxRate>,

    #[serde(default)]
    pub movements: Vec<LedgerEntry>,

    #[serde(default)]
    pub receivables: Vec<LedgerEntry>,

    #[serde(default)]
    pub payables: Vec<LedgerEntry>,

    #[serde(default)]
    pub fiscal_documents: Vec<LedgerEntry>,
}

impl Catalog {
    /// Tax table for a scope
    pub fn taxes(&self, scope: TaxScope) -> &[TaxRate] {
        match scope {
            TaxScope::State => &self.state_taxes,
            TaxScope::Federal => &self.federal_taxes,
        }
    }

    pub fn ledger(&self, ledger: Ledger) -> &[LedgerEntry] {
        match ledger {
            Ledger::Movements => &self.movements,
            Ledger::Receivables => &self.receivables,
            Ledger::Payables => &self.payables,
            Ledger::FiscalDocuments => &self.fiscal_documents,
        }
    }

    pub fn ledger_mut(&mut self, ledger: Ledger) -> &mut Vec<LedgerEntry> {
        match ledger {
            Ledger::Movements => &mut self.movements,
            Ledger::Receivables => &mut self.receivables,
            Ledger::Payables => &mut self.payables,
            Ledger::FiscalDocuments => &mut self.fiscal_documents,
        }
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn product_mut(&mut self, id: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    pub fn stock(&self, id: &str) -> Option<&StockLevel> {
        self.stocks.iter().find(|s| s.id == id)
    }

    pub fn stock_mut(&mut self, id: &str) -> Option<&mut StockLevel> {
        self.stocks.iter_mut().find(|s| s.id == id)
    }
}
