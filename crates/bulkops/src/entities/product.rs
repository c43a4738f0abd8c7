//! Product, stock and emitter entities.

use serde::{Deserialize, Serialize};

use crate::errors::BulkOpsError;

/// Which tax classification a reference change targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxScope {
    State,
    Federal,
}

impl std::fmt::Display for TaxScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State => write!(f, "state"),
            Self::Federal => write!(f, "federal"),
        }
    }
}

impl std::str::FromStr for TaxScope {
    type Err = BulkOpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "state" | "estadual" => Ok(Self::State),
            "federal" => Ok(Self::Federal),
            _ => Err(BulkOpsError::InvalidArgument {
                reason: format!("unknown tax scope '{s}'"),
            }),
        }
    }
}

/// A sellable product with its company-level pricing and tax data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_active")]
    pub active: bool,

    /// Mercosur classification code, matched by prefix
    #[serde(default)]
    pub ncm: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_id: Option<String>,

    #[serde(default)]
    pub cost_price: f64,

    #[serde(default)]
    pub sale_price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_tax_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federal_tax_ref: Option<String>,
}

const fn default_active() -> bool {
    true
}

impl Product {
    /// Create an active product with no stock, prices or tax references
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            active: true,
            ncm: String::new(),
            stock_id: None,
            cost_price: 0.0,
            sale_price: 0.0,
            state_tax_ref: None,
            federal_tax_ref: None,
        }
    }

    /// Set the NCM code
    pub fn with_ncm(mut self, ncm: impl Into<String>) -> Self {
        self.ncm = ncm.into();
        self
    }

    /// Link a stock level
    pub fn with_stock(mut self, stock_id: impl Into<String>) -> Self {
        self.stock_id = Some(stock_id.into());
        self
    }

    /// Set cost and sale prices
    pub fn with_prices(mut self, cost: f64, sale: f64) -> Self {
        self.cost_price = cost;
        self.sale_price = sale;
        self
    }

    /// Set the reference for a tax scope
    pub fn with_tax(mut self, scope: TaxScope, tax_id: impl Into<String>) -> Self {
        *self.tax_ref_mut(scope) = Some(tax_id.into());
        self
    }

    /// Current tax reference for a scope
    pub fn tax_ref(&self, scope: TaxScope) -> Option<&str> {
        match scope {
            TaxScope::State => self.state_tax_ref.as_deref(),
            TaxScope::Federal => self.federal_tax_ref.as_deref(),
        }
    }

    /// Mutable tax reference for a scope
    pub fn tax_ref_mut(&mut self, scope: TaxScope) -> &mut Option<String> {
        match scope {
            TaxScope::State => &mut self.state_tax_ref,
            TaxScope::Federal => &mut self.federal_tax_ref,
        }
    }

    /// Whether the NCM code starts with the given prefix (case-insensitive)
    pub fn matches_ncm(&self, prefix: &str) -> bool {
        let prefix = prefix.trim();
        !prefix.is_empty()
            && self
                .ncm
                .to_lowercase()
                .starts_with(&prefix.to_lowercase())
    }
}

/// Stock quantity of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: String,
    #[serde(default)]
    pub quantity: f64,
}

impl StockLevel {
    pub fn new(id: impl Into<String>, quantity: f64) -> Self {
        Self {
            id: id.into(),
            quantity,
        }
    }
}

/// Invoice emitter (the company itself)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emitter {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Individual micro-entrepreneur stock adjustment enabled
    #[serde(default)]
    pub mei_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_scope_parsing() {
        assert_eq!("state".parse::<TaxScope>().unwrap(), TaxScope::State);
        assert_eq!("FEDERAL".parse::<TaxScope>().unwrap(), TaxScope::Federal);
        assert!("county".parse::<TaxScope>().is_err());
    }

    #[test]
    fn test_matches_ncm_prefix() {
        let product = Product::new("p1", "Rice").with_ncm("10063021");
        assert!(product.matches_ncm("1006"));
        assert!(product.matches_ncm(" 10063021 "));
        assert!(!product.matches_ncm("2202"));
        assert!(!product.matches_ncm("   "));
    }

    #[test]
    fn test_tax_ref_by_scope() {
        let mut product = Product::new("p1", "Rice").with_tax(TaxScope::Federal, "f1");
        assert_eq!(product.tax_ref(TaxScope::Federal), Some("f1"));
        assert_eq!(product.tax_ref(TaxScope::State), None);

        *product.tax_ref_mut(TaxScope::Federal) = None;
        assert_eq!(product.tax_ref(TaxScope::Federal), None);
    }

    #[test]
    fn test_product_defaults_when_deserialized() {
        let product: Product = serde_json::from_str(r#"{"id":"p9"}"#).unwrap();
        assert!(product.active);
        assert!(product.stock_id.is_none());
        assert!(product.state_tax_ref.is_none());
    }
}
