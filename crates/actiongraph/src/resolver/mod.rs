//! Selector resolution.
//!
//! Turns a registry id or a free-text hint into exactly one element handle:
//!
//! 1. **Id shortcut.** A hint equal to a registry id tries that entry first.
//!    A tag mismatch falls through to the chain instead of failing.
//! 2. **Graph locator.** A locator supplied with the call
//!    ([`ResolveOptions::with_locator`]) is tried next, so selectors that
//!    only exist in a scenario's local map still resolve.
//! 3. **Strategy chain.** `role, label, text, type, name, placeholder, css,
//!    testid` by default; a partial override is completed with the omitted
//!    defaults (see [`effective_strategy_order`]).
//!
//! A candidate with exactly one tag-satisfying match wins. Several matches are
//! handled by the [`AmbiguityPolicy`]. Candidates run sequentially against one
//! page so match counts stay coherent.

mod cache;
mod strategy;
mod telemetry;

pub use cache::RegistryCache;
pub use strategy::{
    effective_strategy_order, parse_strategy_list, strategies_from_env, Strategy,
    STRATEGY_ORDER_ENV,
};
pub use telemetry::{AttemptKind, AttemptSource, ResolutionAttempt, ResolutionSink, TracingSink};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::locator::{Locator, NameMatch};
use crate::page::{ElementHandle, Page, PageError};
use crate::registry::{RegistryError, SelectorEntry, SelectorRegistry};

/// Behaviour when a candidate matches more than one element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Fail with a diagnostic listing every candidate
    Error,
    /// Log and take the first match
    Warn,
    /// Take the first match in document order
    #[default]
    First,
}

impl AmbiguityPolicy {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::First => "first",
        }
    }
}

impl fmt::Display for AmbiguityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AmbiguityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "first" => Ok(Self::First),
            other => Err(format!("unknown ambiguity policy '{other}'")),
        }
    }
}

/// A selector tried during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Strategy (or id shortcut)
    pub strategy: AttemptKind,
    /// Selector text
    pub selector: String,
    /// Registry id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    /// Tag-satisfying matches
    pub match_count: usize,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [strategy {}", self.selector, self.strategy)?;
        if let Some(id) = &self.entry_id {
            write!(f, ", registry id {id}")?;
        }
        write!(f, ", {} matched]", self.match_count)
    }
}

/// Errors from selector resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// More than one element matched under the `error` policy
    #[error(
        "Selector '{hint}' is ambiguous: {} elements matched via {strategy} ({}). Candidates tried: {}. {suggestion}",
        matches.len(),
        matches.join(", "),
        candidates.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    Ambiguous {
        /// Hint being resolved
        hint: String,
        /// Candidate that matched several elements
        strategy: AttemptKind,
        /// Every candidate tried up to the ambiguity
        candidates: Vec<Candidate>,
        /// Descriptions of the matched elements
        matches: Vec<String>,
        /// Remediation hint
        suggestion: String,
    },

    /// No strategy matched anything
    #[error(
        "No element found for '{hint}' after trying strategies [{}]. {suggestion}",
        strategies.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    )]
    NotFound {
        /// Hint being resolved
        hint: String,
        /// Every strategy attempted, in order
        strategies: Vec<Strategy>,
        /// Remediation hint
        suggestion: String,
    },

    /// The page failed while probing
    #[error(transparent)]
    Page(#[from] PageError),

    /// The registry could not be loaded
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Per-call resolution options
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Strategy order; omitted defaults are appended
    pub strategy_order: Option<Vec<Strategy>>,
    /// Acceptable tag names (lower-case); empty accepts any
    pub expected_tag_names: Vec<String>,
    /// Explicit visible-text hint for the `text` strategy
    pub text_hint: Option<String>,
    /// `type` attribute hint (`submit`, `reset`, `button`)
    pub type_hint: Option<String>,
    /// ARIA role hint for the `text` strategy
    pub role_hint: Option<String>,
    /// Restrict matches to this element's subtree
    pub scope: Option<ElementHandle>,
    /// Overrides the resolver default
    pub ambiguity_policy: Option<AmbiguityPolicy>,
    /// Registry to consult instead of the default
    pub registry_path: Option<PathBuf>,
    /// Locator known for the hint outside the registry (a graph's
    /// scenario-local selector map), tried after the id shortcut
    pub locator: Option<String>,
}

impl ResolveOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy order
    #[must_use]
    pub fn with_strategy_order(mut self, order: Vec<Strategy>) -> Self {
        self.strategy_order = Some(order);
        self
    }

    /// Accept only these tags
    #[must_use]
    pub fn with_expected_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.expected_tag_names = tags.into_iter().map(|t| t.as_ref().to_lowercase()).collect();
        self
    }

    /// Set the text hint
    #[must_use]
    pub fn with_text_hint(mut self, text: impl Into<String>) -> Self {
        self.text_hint = Some(text.into());
        self
    }

    /// Set the type hint
    #[must_use]
    pub fn with_type_hint(mut self, kind: impl Into<String>) -> Self {
        self.type_hint = Some(kind.into());
        self
    }

    /// Set the role hint
    #[must_use]
    pub fn with_role_hint(mut self, role: impl Into<String>) -> Self {
        self.role_hint = Some(role.into());
        self
    }

    /// Restrict to a subtree
    #[must_use]
    pub fn within(mut self, scope: ElementHandle) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Set the ambiguity policy
    #[must_use]
    pub const fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity_policy = Some(policy);
        self
    }

    /// Consult another registry file
    #[must_use]
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    /// Locator to try when the registry has no usable entry for the hint
    #[must_use]
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }
}

/// Successful resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The element
    pub element: ElementHandle,
    /// Candidate that produced it
    pub strategy: AttemptKind,
    /// Selector text that matched
    pub selector: String,
    /// Registry id, when the selector came from the registry
    pub entry_id: Option<String>,
    /// Tag-satisfying matches of the winning candidate
    pub match_count: usize,
    /// Every attempt made, in order
    pub attempts: Vec<ResolutionAttempt>,
}

impl Resolution {
    /// Whether the winning candidate matched more than one element
    #[must_use]
    pub const fn was_ambiguous(&self) -> bool {
        self.match_count > 1
    }
}

struct Lookup {
    locator: Locator,
    entry_id: Option<String>,
    source: AttemptSource,
}

impl Lookup {
    fn registry(entry: &SelectorEntry) -> Self {
        Self {
            locator: entry.locator(),
            entry_id: Some(entry.id.clone()),
            source: AttemptSource::Registry,
        }
    }

    const fn built(locator: Locator, source: AttemptSource) -> Self {
        Self {
            locator,
            entry_id: None,
            source,
        }
    }
}

enum Outcome {
    Resolved(Resolution),
    Continue,
}

/// Registry-backed selector resolver
pub struct Resolver {
    cache: RegistryCache,
    sink: Box<dyn ResolutionSink>,
    default_policy: AmbiguityPolicy,
    default_order: Option<Vec<Strategy>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("cache", &self.cache)
            .field("default_policy", &self.default_policy)
            .field("default_order", &self.default_order)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver over a registry cache, logging through [`TracingSink`].
    ///
    /// The default strategy order comes from [`STRATEGY_ORDER_ENV`] when set.
    #[must_use]
    pub fn new(cache: RegistryCache) -> Self {
        Self {
            cache,
            sink: Box::new(TracingSink),
            default_policy: AmbiguityPolicy::default(),
            default_order: strategies_from_env(),
        }
    }

    /// Replace the telemetry sink
    #[must_use]
    pub fn with_sink(mut self, sink: impl ResolutionSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Set the default ambiguity policy
    #[must_use]
    pub const fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Set the default strategy order
    #[must_use]
    pub fn with_strategy_order(mut self, order: Vec<Strategy>) -> Self {
        self.default_order = Some(order);
        self
    }

    /// The registry cache
    #[must_use]
    pub const fn cache(&self) -> &RegistryCache {
        &self.cache
    }

    /// Chain used for `options`
    #[must_use]
    pub fn strategy_order(&self, options: &ResolveOptions) -> Vec<Strategy> {
        let requested = options
            .strategy_order
            .as_deref()
            .or(self.default_order.as_deref())
            .unwrap_or(&[]);
        effective_strategy_order(requested)
    }

    /// Resolve `hint` to exactly one element.
    pub async fn resolve(
        &self,
        page: &dyn Page,
        hint: &str,
        options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        let hint = hint.trim();
        let registry = self.cache.get(options.registry_path.as_deref())?;
        let tokens: Vec<String> = hint.split_whitespace().map(str::to_lowercase).collect();
        let policy = options.ambiguity_policy.unwrap_or(self.default_policy);
        let mut run = Run {
            resolver: self,
            page,
            hint,
            tokens: &tokens,
            options,
            policy,
            attempts: Vec::new(),
            candidates: Vec::new(),
        };

        if let Some(entry) = registry.get(hint) {
            let lookup = Lookup::registry(entry);
            if let Outcome::Resolved(resolution) = run.try_lookup(AttemptKind::RegistryId, lookup).await? {
                return Ok(resolution);
            }
        }

        if let Some(raw) = options.locator.as_deref().filter(|raw| !raw.trim().is_empty()) {
            let lookup = Lookup {
                locator: Locator::parse(raw),
                entry_id: Some(hint.to_string()),
                source: AttemptSource::Registry,
            };
            if let Outcome::Resolved(resolution) = run.try_lookup(AttemptKind::GraphLocator, lookup).await? {
                return Ok(resolution);
            }
        }

        let order = self.strategy_order(options);
        for strategy in &order {
            for lookup in build_lookups(*strategy, &registry, hint, &tokens, options) {
                if let Outcome::Resolved(resolution) =
                    run.try_lookup(AttemptKind::Strategy(*strategy), lookup).await?
                {
                    return Ok(resolution);
                }
            }
        }

        Err(ResolveError::NotFound {
            hint: hint.to_string(),
            strategies: order,
            suggestion: format!(
                "Register '{hint}' in the selector registry or add a disambiguating attribute (data-testid, aria-label) to the element."
            ),
        })
    }
}

/// State of one resolution call
struct Run<'a> {
    resolver: &'a Resolver,
    page: &'a dyn Page,
    hint: &'a str,
    tokens: &'a [String],
    options: &'a ResolveOptions,
    policy: AmbiguityPolicy,
    attempts: Vec<ResolutionAttempt>,
    candidates: Vec<Candidate>,
}

impl Run<'_> {
    async fn try_lookup(&mut self, kind: AttemptKind, lookup: Lookup) -> Result<Outcome, ResolveError> {
        let selector = lookup.locator.to_string();
        let found = match self
            .page
            .query(&lookup.locator, self.options.scope.as_ref())
            .await
        {
            Ok(found) => Some(found),
            Err(PageError::InvalidSelector { message, .. }) => {
                tracing::warn!(%selector, %message, "skipping unusable selector");
                None
            }
            Err(err) => return Err(err.into()),
        };
        let matches: Vec<ElementHandle> = found
            .unwrap_or_default()
            .into_iter()
            .filter(|el| self.tag_allowed(el))
            .collect();

        let attempt = ResolutionAttempt {
            strategy: kind,
            selector: selector.clone(),
            entry_id: lookup.entry_id.clone(),
            tokens: self.tokens.to_vec(),
            source: lookup.source,
            match_count: Some(matches.len()),
        };
        self.resolver.sink.record(&attempt);
        self.attempts.push(attempt);
        self.candidates.push(Candidate {
            strategy: kind,
            selector: selector.clone(),
            entry_id: lookup.entry_id.clone(),
            match_count: matches.len(),
        });

        let Some(first) = matches.first().cloned() else {
            return Ok(Outcome::Continue);
        };
        if matches.len() > 1 {
            match self.policy {
                AmbiguityPolicy::Error => {
                    return Err(ResolveError::Ambiguous {
                        hint: self.hint.to_string(),
                        strategy: kind,
                        candidates: std::mem::take(&mut self.candidates),
                        matches: matches.iter().map(ElementHandle::describe).collect(),
                        suggestion: format!(
                            "Give the intended element a unique data-testid or accessible name and register it under '{}'.",
                            self.hint
                        ),
                    });
                }
                AmbiguityPolicy::Warn => tracing::warn!(
                    hint = %self.hint,
                    %selector,
                    matches = matches.len(),
                    "ambiguous selector, using first match"
                ),
                AmbiguityPolicy::First => {}
            }
        }
        Ok(Outcome::Resolved(Resolution {
            element: first,
            strategy: kind,
            selector,
            entry_id: lookup.entry_id,
            match_count: matches.len(),
            attempts: std::mem::take(&mut self.attempts),
        }))
    }

    fn tag_allowed(&self, element: &ElementHandle) -> bool {
        self.options.expected_tag_names.is_empty()
            || self
                .options
                .expected_tag_names
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(&element.tag_name))
    }
}

const TYPE_HINTS: [&str; 3] = ["submit", "reset", "button"];
const TEXT_ROLES: [&str; 2] = ["button", "link"];

/// Lookups for one strategy, most preferred first.
fn build_lookups(
    strategy: Strategy,
    registry: &SelectorRegistry,
    hint: &str,
    tokens: &[String],
    options: &ResolveOptions,
) -> Vec<Lookup> {
    match strategy {
        Strategy::Role | Strategy::Label | Strategy::Css | Strategy::TestId => {
            let mut lookups = registry_lookups(strategy, registry, tokens);
            match strategy {
                Strategy::Css if looks_like_css(hint) => {
                    lookups.push(Lookup::built(Locator::css(hint), AttemptSource::Heuristic));
                }
                Strategy::TestId if !hint.is_empty() && !hint.contains(char::is_whitespace) => {
                    lookups.push(Lookup::built(Locator::test_id(hint), AttemptSource::Attribute));
                }
                _ => {}
            }
            lookups
        }
        Strategy::Name | Strategy::Placeholder => tokens
            .iter()
            .map(|token| {
                let css = format!("[{}*=\"{}\" i]", strategy.as_str(), css_escape(token));
                Lookup::built(Locator::css(css), AttemptSource::Attribute)
            })
            .collect(),
        Strategy::Text => text_lookups(tokens, options),
        Strategy::Type => {
            let kind = options
                .type_hint
                .as_deref()
                .map(str::to_lowercase)
                .or_else(|| {
                    tokens
                        .iter()
                        .find(|t| TYPE_HINTS.contains(&t.as_str()))
                        .cloned()
                });
            kind.map(|kind| {
                let kind = css_escape(&kind);
                let css = format!(
                    "input[type=\"{kind}\"], button[type=\"{kind}\"], a[type=\"{kind}\"]"
                );
                Lookup::built(Locator::css(css), AttemptSource::Attribute)
            })
            .into_iter()
            .collect()
        }
    }
}

/// Registry entries of the strategy's type containing every token, by
/// ascending priority then id.
fn registry_lookups(strategy: Strategy, registry: &SelectorRegistry, tokens: &[String]) -> Vec<Lookup> {
    let Some(kind) = strategy.registry_type() else {
        return Vec::new();
    };
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut entries: Vec<&SelectorEntry> = registry
        .entries_of_type(kind)
        .filter(|entry| {
            let haystack = entry.search_text();
            tokens.iter().all(|token| haystack.contains(token.as_str()))
        })
        .collect();
    entries.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    entries.into_iter().map(Lookup::registry).collect()
}

/// Accessible-name regex lookups for the likely interactive roles, then a
/// plain visible-text lookup.
fn text_lookups(tokens: &[String], options: &ResolveOptions) -> Vec<Lookup> {
    let pattern = match &options.text_hint {
        Some(text) if !text.trim().is_empty() => regex::escape(text.trim()),
        _ if tokens.is_empty() => return Vec::new(),
        _ => tokens
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join(".*"),
    };
    let Ok(name) = NameMatch::pattern(&pattern) else {
        return Vec::new();
    };
    let roles: Vec<&str> = options
        .role_hint
        .as_deref()
        .map_or_else(|| TEXT_ROLES.to_vec(), |role| vec![role]);
    let mut lookups: Vec<Lookup> = roles
        .into_iter()
        .map(|role| {
            Lookup::built(
                Locator::Role {
                    role: role.to_string(),
                    name: Some(name.clone()),
                },
                AttemptSource::Heuristic,
            )
        })
        .collect();
    let visible = options
        .text_hint
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| tokens.join(" "));
    lookups.push(Lookup::built(Locator::Text(visible), AttemptSource::Heuristic));
    lookups
}

fn looks_like_css(hint: &str) -> bool {
    !hint.is_empty()
        && hint.contains(['#', '.', '[', '>'])
        && !hint.contains("://")
        && Locator::parse(hint).engine() == "css"
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dom::{DomElement, StaticPage};
    use crate::registry::SelectorType;
    use std::sync::{Arc, Mutex};

    fn registry() -> SelectorRegistry {
        let mut registry = SelectorRegistry::new();
        for entry in [
            SelectorEntry::new("log-in-button", SelectorType::Role, r#"role=button[name="Log in"]"#, "/login"),
            SelectorEntry::new("email-input", SelectorType::Label, "label=Email", "/login"),
            SelectorEntry::new("login-button", SelectorType::TestId, "testid=login-button", "/login"),
            SelectorEntry::new("hero", SelectorType::Css, "section.hero", "/"),
        ] {
            registry.upsert(entry).unwrap();
        }
        registry
    }

    fn resolver() -> Resolver {
        Resolver::new(RegistryCache::with_registry("mem.json", registry()))
            .with_strategy_order(Vec::new())
    }

    fn login_page() -> StaticPage {
        StaticPage::with_elements(
            "/login",
            vec![DomElement::new("form")
                .child(
                    DomElement::new("input")
                        .label("Email")
                        .attr("name", "user_email")
                        .attr("placeholder", "Your email"),
                )
                .child(
                    DomElement::new("input")
                        .label("Password")
                        .attr("name", "password")
                        .attr("type", "password"),
                )
                .child(
                    DomElement::new("button")
                        .text("Log in")
                        .attr("type", "submit")
                        .attr("data-testid", "login-button"),
                )],
        )
    }

    fn two_save_buttons() -> StaticPage {
        StaticPage::with_elements(
            "/",
            vec![
                DomElement::new("button").text("Save").attr("data-testid", "save-top"),
                DomElement::new("button").text("Save").attr("data-testid", "save-bottom"),
            ],
        )
    }

    mod shortcut_tests {
        use super::*;

        #[tokio::test]
        async fn test_registry_id_shortcut() {
            let page = login_page();
            let res = resolver()
                .resolve(&page, "email-input", &ResolveOptions::new())
                .await
                .unwrap();
            assert_eq!(res.strategy, AttemptKind::RegistryId);
            assert_eq!(res.entry_id.as_deref(), Some("email-input"));
            assert_eq!(res.element.tag_name, "input");
            assert_eq!(res.attempts.len(), 1);
        }

        #[tokio::test]
        async fn test_graph_locator_without_registry_entry() {
            let page = login_page();
            let empty = Resolver::new(RegistryCache::with_registry("mem.json", SelectorRegistry::new()))
                .with_strategy_order(Vec::new());
            let options = ResolveOptions::new().with_locator("label=Password");
            let res = empty.resolve(&page, "secret-field", &options).await.unwrap();
            assert_eq!(res.strategy, AttemptKind::GraphLocator);
            assert_eq!(res.selector, "label=Password");
            assert_eq!(res.entry_id.as_deref(), Some("secret-field"));
            assert_eq!(res.attempts.len(), 1);
        }

        #[tokio::test]
        async fn test_registry_entry_wins_over_graph_locator() {
            let page = login_page();
            let options = ResolveOptions::new().with_locator("label=Password");
            let res = resolver().resolve(&page, "email-input", &options).await.unwrap();
            assert_eq!(res.strategy, AttemptKind::RegistryId);
            assert_eq!(res.selector, "label=Email");
        }

        #[tokio::test]
        async fn test_stale_graph_locator_falls_through() {
            let page = login_page();
            let options = ResolveOptions::new().with_locator("testid=gone");
            let res = resolver().resolve(&page, "log in", &options).await.unwrap();
            assert_eq!(res.attempts[0].strategy, AttemptKind::GraphLocator);
            assert_eq!(res.attempts[0].match_count, Some(0));
            assert_eq!(res.element.tag_name, "button");
        }

        #[tokio::test]
        async fn test_tag_mismatch_falls_through() {
            let page = login_page();
            let options = ResolveOptions::new().with_expected_tags(["button"]);
            let res = resolver().resolve(&page, "login-button", &options).await.unwrap();
            // testid shortcut matches a <button>, so it succeeds
            assert_eq!(res.strategy, AttemptKind::RegistryId);

            let options = ResolveOptions::new().with_expected_tags(["a"]);
            let err = resolver().resolve(&page, "login-button", &options).await.unwrap_err();
            assert!(matches!(err, ResolveError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_scope_restricts_matches() {
            let page = StaticPage::with_elements(
                "/",
                vec![
                    DomElement::new("section").id("a").child(DomElement::new("input").label("Email")),
                    DomElement::new("section").id("b"),
                ],
            );
            let sections = page.query(&Locator::css("section#b"), None).await.unwrap();
            let options = ResolveOptions::new().within(sections[0].clone());
            let err = resolver().resolve(&page, "email-input", &options).await.unwrap_err();
            assert!(matches!(err, ResolveError::NotFound { .. }));
        }
    }

    mod chain_tests {
        use super::*;

        #[tokio::test]
        async fn test_registry_strategy_by_tokens() {
            let page = login_page();
            let res = resolver()
                .resolve(&page, "log in", &ResolveOptions::new())
                .await
                .unwrap();
            assert_eq!(res.strategy, AttemptKind::Strategy(Strategy::Role));
            assert_eq!(res.entry_id.as_deref(), Some("log-in-button"));
        }

        #[tokio::test]
        async fn test_name_attribute_strategy() {
            let page = login_page();
            let options = ResolveOptions::new().with_strategy_order(vec![Strategy::Name]);
            let res = resolver().resolve(&page, "EMAIL", &options).await.unwrap();
            assert_eq!(res.strategy, AttemptKind::Strategy(Strategy::Name));
            assert_eq!(res.selector, r#"[name*="email" i]"#);
        }

        #[tokio::test]
        async fn test_placeholder_strategy() {
            let page = login_page();
            let options = ResolveOptions::new().with_strategy_order(vec![Strategy::Placeholder]);
            let res = resolver().resolve(&page, "your", &options).await.unwrap();
            assert_eq!(res.strategy, AttemptKind::Strategy(Strategy::Placeholder));
        }

        #[tokio::test]
        async fn test_type_strategy() {
            let page = login_page();
            let options = ResolveOptions::new()
                .with_strategy_order(vec![Strategy::Type])
                .with_type_hint("submit");
            let res = resolver().resolve(&page, "primary action", &options).await.unwrap();
            assert_eq!(res.strategy, AttemptKind::Strategy(Strategy::Type));
            assert_eq!(res.element.tag_name, "button");
        }

        #[tokio::test]
        async fn test_text_strategy() {
            let page = login_page();
            let options = ResolveOptions::new()
                .with_strategy_order(vec![Strategy::Text])
                .with_text_hint("LOG IN");
            let res = resolver().resolve(&page, "whatever", &options).await.unwrap();
            assert_eq!(res.strategy, AttemptKind::Strategy(Strategy::Text));
            assert_eq!(res.element.tag_name, "button");
        }

        #[tokio::test]
        async fn test_not_found_lists_every_strategy() {
            let page = login_page();
            let options = ResolveOptions::new().with_strategy_order(vec![Strategy::Css]);
            let err = resolver().resolve(&page, "nonexistent widget", &options).await.unwrap_err();
            match &err {
                ResolveError::NotFound { strategies, .. } => {
                    assert_eq!(strategies.len(), 8);
                    assert_eq!(strategies[0], Strategy::Css);
                }
                other => panic!("unexpected {other:?}"),
            }
            let message = err.to_string();
            assert!(message.contains("css, role, label, text, type, name, placeholder, testid"));
            assert!(message.contains("Register"));
        }

        #[tokio::test]
        async fn test_telemetry_for_every_attempt() {
            let page = login_page();
            let seen: Arc<Mutex<Vec<ResolutionAttempt>>> = Arc::default();
            let sink_seen = Arc::clone(&seen);
            let resolver = resolver().with_sink(move |a: &ResolutionAttempt| {
                sink_seen.lock().unwrap().push(a.clone());
            });
            let options = ResolveOptions::new().with_strategy_order(vec![Strategy::Name]);
            let res = resolver.resolve(&page, "missing email", &options).await.unwrap();

            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0].match_count, Some(0));
            assert_eq!(seen[0].source, AttemptSource::Attribute);
            assert_eq!(seen[1].match_count, Some(1));
            assert_eq!(seen[0].tokens, vec!["missing".to_string(), "email".to_string()]);
            assert_eq!(res.attempts, *seen);
        }

        #[tokio::test]
        async fn test_registry_override_path() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("alt.json");
            let mut alt = SelectorRegistry::new();
            alt.upsert(SelectorEntry::new("pw", SelectorType::Label, "label=Password", "/login"))
                .unwrap();
            alt.save(&path).unwrap();

            let page = login_page();
            let options = ResolveOptions::new().with_registry_path(&path);
            let res = resolver().resolve(&page, "pw", &options).await.unwrap();
            assert_eq!(res.strategy, AttemptKind::RegistryId);
        }
    }

    mod ambiguity_tests {
        use super::*;

        #[tokio::test]
        async fn test_error_policy_enumerates_candidates() {
            let page = two_save_buttons();
            let options = ResolveOptions::new()
                .with_strategy_order(vec![Strategy::Text])
                .with_policy(AmbiguityPolicy::Error);
            let err = resolver().resolve(&page, "save", &options).await.unwrap_err();
            let message = err.to_string();
            match err {
                ResolveError::Ambiguous { matches, candidates, .. } => {
                    assert_eq!(matches.len(), 2);
                    assert!(!candidates.is_empty());
                }
                other => panic!("unexpected {other:?}"),
            }
            assert!(message.contains("<button#e0>"));
            assert!(message.contains("<button#e1>"));
            assert!(message.contains("strategy text"));
        }

        #[tokio::test]
        async fn test_first_policy_returns_first_in_document_order() {
            let page = two_save_buttons();
            let options = ResolveOptions::new().with_strategy_order(vec![Strategy::Text]);
            let res = resolver().resolve(&page, "save", &options).await.unwrap();
            assert_eq!(res.element.id, "e0");
            assert!(res.was_ambiguous());
        }

        #[tokio::test]
        async fn test_warn_policy_returns_first() {
            let page = two_save_buttons();
            let resolver = resolver().with_policy(AmbiguityPolicy::Warn);
            let options = ResolveOptions::new().with_strategy_order(vec![Strategy::Text]);
            let res = resolver.resolve(&page, "save", &options).await.unwrap();
            assert_eq!(res.element.id, "e0");
        }

        #[test]
        fn test_policy_parsing() {
            assert_eq!("WARN".parse::<AmbiguityPolicy>().unwrap(), AmbiguityPolicy::Warn);
            assert!("random".parse::<AmbiguityPolicy>().is_err());
            assert_eq!(AmbiguityPolicy::default(), AmbiguityPolicy::First);
        }
    }
}
