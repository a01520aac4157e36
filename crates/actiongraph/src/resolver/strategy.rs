//! Strategy chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::telemetry::AttemptSource;
use crate::registry::SelectorType;

/// Environment variable holding a comma-separated strategy order
pub const STRATEGY_ORDER_ENV: &str = "ACTIONGRAPH_SELECTOR_STRATEGIES";

/// One resolution technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Registry role entries
    Role,
    /// Registry label entries
    Label,
    /// Accessible name regex
    Text,
    /// `type` attribute of buttons and inputs
    Type,
    /// `name` attribute contains
    Name,
    /// `placeholder` attribute contains
    Placeholder,
    /// Registry CSS entries
    Css,
    /// Registry test-id entries
    #[serde(rename = "testid")]
    TestId,
}

impl Strategy {
    /// Default chain order
    pub const DEFAULT_ORDER: [Self; 8] = [
        Self::Role,
        Self::Label,
        Self::Text,
        Self::Type,
        Self::Name,
        Self::Placeholder,
        Self::Css,
        Self::TestId,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Label => "label",
            Self::Text => "text",
            Self::Type => "type",
            Self::Name => "name",
            Self::Placeholder => "placeholder",
            Self::Css => "css",
            Self::TestId => "testid",
        }
    }

    /// Registry entry type this strategy consults, if any
    #[must_use]
    pub const fn registry_type(self) -> Option<SelectorType> {
        match self {
            Self::Role => Some(SelectorType::Role),
            Self::Label => Some(SelectorType::Label),
            Self::Css => Some(SelectorType::Css),
            Self::TestId => Some(SelectorType::TestId),
            Self::Text | Self::Type | Self::Name | Self::Placeholder => None,
        }
    }

    /// Where candidates of this strategy come from
    #[must_use]
    pub const fn source(self) -> AttemptSource {
        match self {
            Self::Role | Self::Label | Self::Css | Self::TestId => AttemptSource::Registry,
            Self::Type | Self::Name | Self::Placeholder => AttemptSource::Attribute,
            Self::Text => AttemptSource::Heuristic,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "role" => Ok(Self::Role),
            "label" => Ok(Self::Label),
            "text" => Ok(Self::Text),
            "type" => Ok(Self::Type),
            "name" => Ok(Self::Name),
            "placeholder" => Ok(Self::Placeholder),
            "css" => Ok(Self::Css),
            "testid" | "test-id" | "test_id" => Ok(Self::TestId),
            other => Err(format!("unknown selector strategy '{other}'")),
        }
    }
}

/// Requested order first (deduplicated), then every omitted default.
///
/// The result is always a permutation of [`Strategy::DEFAULT_ORDER`].
#[must_use]
pub fn effective_strategy_order(requested: &[Strategy]) -> Vec<Strategy> {
    let mut order: Vec<Strategy> = Vec::with_capacity(Strategy::DEFAULT_ORDER.len());
    for strategy in requested.iter().chain(Strategy::DEFAULT_ORDER.iter()) {
        if !order.contains(strategy) {
            order.push(*strategy);
        }
    }
    order
}

/// Parse a comma-separated list, dropping unknown names with a warning.
#[must_use]
pub fn parse_strategy_list(raw: &str) -> Vec<Strategy> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match name.parse::<Strategy>() {
            Ok(strategy) => Some(strategy),
            Err(err) => {
                tracing::warn!(%err, "ignoring selector strategy");
                None
            }
        })
        .collect()
}

/// Strategy order from [`STRATEGY_ORDER_ENV`], if set
#[must_use]
pub fn strategies_from_env() -> Option<Vec<Strategy>> {
    let raw = std::env::var(STRATEGY_ORDER_ENV).ok()?;
    let parsed = parse_strategy_list(&raw);
    (!parsed.is_empty()).then_some(parsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    // The enum, not proptest's trait of the same name.
    use super::Strategy;

    #[test]
    fn test_default_order_unchanged_without_request() {
        assert_eq!(effective_strategy_order(&[]), Strategy::DEFAULT_ORDER.to_vec());
    }

    #[test]
    fn test_partial_order_appends_defaults() {
        let order = effective_strategy_order(&[Strategy::TestId, Strategy::Css]);
        assert_eq!(
            order,
            vec![
                Strategy::TestId,
                Strategy::Css,
                Strategy::Role,
                Strategy::Label,
                Strategy::Text,
                Strategy::Type,
                Strategy::Name,
                Strategy::Placeholder,
            ]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let order = effective_strategy_order(&[Strategy::Name, Strategy::Name]);
        assert_eq!(order.len(), 8);
        assert_eq!(order[0], Strategy::Name);
    }

    #[test]
    fn test_parse_list_skips_unknown() {
        assert_eq!(
            parse_strategy_list("testid, XPATH ,css,,"),
            vec![Strategy::TestId, Strategy::Css]
        );
    }

    #[test]
    fn test_sources() {
        assert_eq!(Strategy::Role.source(), AttemptSource::Registry);
        assert_eq!(Strategy::Name.source(), AttemptSource::Attribute);
        assert_eq!(Strategy::Text.source(), AttemptSource::Heuristic);
        assert_eq!(Strategy::TestId.registry_type(), Some(SelectorType::TestId));
        assert_eq!(Strategy::Type.registry_type(), None);
    }

    proptest! {
        #[test]
        fn prop_chain_is_complete_permutation(
            requested in prop::collection::vec(prop::sample::select(Strategy::DEFAULT_ORDER.to_vec()), 0..12)
        ) {
            let order = effective_strategy_order(&requested);
            prop_assert_eq!(order.len(), Strategy::DEFAULT_ORDER.len());
            for strategy in Strategy::DEFAULT_ORDER {
                prop_assert!(order.contains(&strategy));
            }
            // Requested strategies keep their relative order at the front.
            let mut firsts: Vec<Strategy> = Vec::new();
            for s in &requested {
                if !firsts.contains(s) {
                    firsts.push(*s);
                }
            }
            prop_assert_eq!(&order[..firsts.len()], firsts.as_slice());
        }
    }
}
