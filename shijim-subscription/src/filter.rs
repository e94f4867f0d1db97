//! Contract filtering, grounded on
//! `examples/original_source/shijim/gateway/filter.py`'s `ContractFilter`.
//!
//! The Python version probes broker contract objects with `getattr`
//! (`exchange`, `type`); here a broker-specific implementation resolves
//! codes into a typed [`ContractInfo`] through the [`ContractLookup`]
//! trait instead, so the filter itself never reaches for a dynamic
//! attribute.

use shijim_core::event::AssetType;
use std::collections::BTreeSet;

/// The subset of a resolved broker contract the filter cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInfo {
    pub exchange: String,
    pub contract_type: Option<String>,
}

/// Resolves a `(asset_type, code)` pair to its contract metadata, if
/// known. Implemented once per broker by the crate that owns the real
/// contract catalogue; `shijim-subscription` only depends on the trait.
pub trait ContractLookup {
    fn lookup(&self, asset_type: AssetType, code: &str) -> Option<ContractInfo>;
}

/// Screens codes before they are subscribed (spec §4.5 "Filtering").
#[derive(Debug, Clone)]
pub struct ContractFilter {
    allowed_exchanges: BTreeSet<String>,
    blocked_suffixes: BTreeSet<String>,
}

impl Default for ContractFilter {
    fn default() -> Self {
        Self {
            allowed_exchanges: ["TSE", "OTC"].into_iter().map(String::from).collect(),
            blocked_suffixes: ["L", "Q", "F", "R"].into_iter().map(String::from).collect(),
        }
    }
}

impl ContractFilter {
    pub fn new(allowed_exchanges: BTreeSet<String>, blocked_suffixes: BTreeSet<String>) -> Self {
        Self { allowed_exchanges, blocked_suffixes }
    }

    /// Whether `code` may be subscribed, consulting `lookup` for stock
    /// exchange/type metadata.
    pub fn is_allowed(&self, code: &str, asset_type: AssetType, lookup: &dyn ContractLookup) -> bool {
        if self.blocked_suffixes.iter().any(|suffix| code.ends_with(suffix.as_str())) {
            tracing::debug!(code, reason = "suffix", "contract filter blocked code");
            return false;
        }

        if asset_type == AssetType::Stock {
            if !code.chars().all(|c| c.is_ascii_digit()) {
                tracing::debug!(code, reason = "non_digit", "contract filter blocked code");
                return false;
            }

            let Some(contract) = lookup.lookup(asset_type, code) else {
                tracing::warn!(code, "contract filter blocking: metadata missing");
                return false;
            };

            if !self.allowed_exchanges.contains(&contract.exchange) {
                tracing::debug!(code, reason = "exchange", exchange = %contract.exchange, "contract filter blocked code");
                return false;
            }

            if contract.contract_type.as_deref() == Some("ETFLeveraged") {
                tracing::debug!(code, reason = "leveraged_type", "contract filter blocked code");
                return false;
            }
        }

        true
    }

    /// Filter a list of codes, preserving input order.
    pub fn filter_codes<'a>(
        &self,
        codes: &'a [String],
        asset_type: AssetType,
        lookup: &dyn ContractLookup,
    ) -> Vec<&'a str> {
        codes
            .iter()
            .filter(|code| self.is_allowed(code, asset_type, lookup))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLookup(Option<ContractInfo>);

    impl ContractLookup for FakeLookup {
        fn lookup(&self, _asset_type: AssetType, _code: &str) -> Option<ContractInfo> {
            self.0.clone()
        }
    }

    fn tse_stock() -> FakeLookup {
        FakeLookup(Some(ContractInfo { exchange: "TSE".to_string(), contract_type: None }))
    }

    #[test]
    fn rejects_blocked_suffix_before_any_lookup() {
        let filter = ContractFilter::default();
        assert!(!filter.is_allowed("2330L", AssetType::Stock, &FakeLookup(None)));
    }

    #[test]
    fn rejects_non_digit_stock_code() {
        let filter = ContractFilter::default();
        assert!(!filter.is_allowed("AAPL", AssetType::Stock, &tse_stock()));
    }

    #[test]
    fn rejects_stock_with_missing_metadata() {
        let filter = ContractFilter::default();
        assert!(!filter.is_allowed("2330", AssetType::Stock, &FakeLookup(None)));
    }

    #[test]
    fn rejects_stock_on_disallowed_exchange() {
        let filter = ContractFilter::default();
        let lookup = FakeLookup(Some(ContractInfo { exchange: "NYSE".to_string(), contract_type: None }));
        assert!(!filter.is_allowed("2330", AssetType::Stock, &lookup));
    }

    #[test]
    fn rejects_leveraged_etf() {
        let filter = ContractFilter::default();
        let lookup = FakeLookup(Some(ContractInfo {
            exchange: "TSE".to_string(),
            contract_type: Some("ETFLeveraged".to_string()),
        }));
        assert!(!filter.is_allowed("0050", AssetType::Stock, &lookup));
    }

    #[test]
    fn accepts_well_formed_stock() {
        let filter = ContractFilter::default();
        assert!(filter.is_allowed("2330", AssetType::Stock, &tse_stock()));
    }

    #[test]
    fn futures_codes_skip_stock_only_checks() {
        let filter = ContractFilter::default();
        assert!(filter.is_allowed("TXFR1", AssetType::Futures, &FakeLookup(None)));
    }

    #[test]
    fn filter_codes_preserves_order_of_survivors() {
        let filter = ContractFilter::default();
        let codes = vec!["2330".to_string(), "2330L".to_string(), "2317".to_string()];
        let survivors = filter.filter_codes(&codes, AssetType::Stock, &tse_stock());
        assert_eq!(survivors, vec!["2330", "2317"]);
    }
}
