//! Product selection criteria.

use serde::{Deserialize, Serialize};

use super::{Product, TaxScope};

/// Criteria a product must meet to be selected. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    /// Case-insensitive substring of the description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// NCM prefixes, any of which may match; blank entries are ignored
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ncms: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_tax: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federal_tax: Option<String>,

    /// Only products currently in this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if !product
                .description
                .to_lowercase()
                .contains(&name.to_lowercase())
            {
                return false;
            }
        }

        let mut prefixes = self.ncms.iter().filter(|n| !n.trim().is_empty()).peekable();
        if prefixes.peek().is_some() && !prefixes.any(|n| product.matches_ncm(n)) {
            return false;
        }

        for (scope, wanted) in [
            (TaxScope::State, &self.state_tax),
            (TaxScope::Federal, &self.federal_tax),
        ] {
            if let Some(wanted) = wanted {
                if product.tax_ref(scope) != Some(wanted.as_str()) {
                    return false;
                }
            }
        }

        !matches!(self.active, Some(active) if product.active != active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rice() -> Product {
        Product::new("p1", "Parboiled Rice 5kg")
            .with_ncm("10063021")
            .with_tax(TaxScope::State, "t1")
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(ProductFilter::default().matches(&rice()));
    }

    #[test]
    fn test_name_is_case_insensitive_substring() {
        let filter = ProductFilter {
            name: Some("rice".to_string()),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&rice()));
        assert!(!filter.matches(&Product::new("p2", "Beans")));
    }

    #[test]
    fn test_any_ncm_prefix_matches() {
        let filter = ProductFilter {
            ncms: vec![" ".to_string(), "0713".to_string(), "1006".to_string()],
            ..ProductFilter::default()
        };
        assert!(filter.matches(&rice()));

        let filter = ProductFilter {
            ncms: vec!["0713".to_string()],
            ..ProductFilter::default()
        };
        assert!(!filter.matches(&rice()));
    }

    #[test]
    fn test_tax_and_state_criteria() {
        let filter = ProductFilter {
            state_tax: Some("t1".to_string()),
            active: Some(true),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&rice()));

        let mut inactive = rice();
        inactive.active = false;
        assert!(!filter.matches(&inactive));

        let filter = ProductFilter {
            federal_tax: Some("f1".to_string()),
            ..ProductFilter::default()
        };
        assert!(!filter.matches(&rice()));
    }
}
