//! Selector collection.
//!
//! Visits each route, asks the page for its selector candidates and turns
//! them into registry entries:
//!
//! | source  | id                    | selector                    | priority |
//! |---------|-----------------------|-----------------------------|----------|
//! | role    | `slug(name)-role`     | `role=button[name="Log in"]`| 1        |
//! | label   | `slug(label)-tag`     | `label=Email`               | 2        |
//! | test id | lower-cased test id   | `testid=login-button`       | 3        |
//!
//! Routes that fail or time out are skipped with a warning and listed in
//! [`ScanResult::skipped_routes`].

use std::time::Duration;

use crate::locator::Locator;
use crate::page::{navigate_with_timeout, Page, ScannedElement};
use crate::registry::{ScanResult, SelectorEntry, SelectorType, SkippedRoute, Stability};
use crate::slug::slugify;

/// Default per-route navigation budget
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Roles that never make a useful selector
const IGNORED_ROLES: [&str; 4] = ["generic", "none", "presentation", "document"];

/// Form-control tags eligible for label selectors
const LABELLED_TAGS: [&str; 3] = ["input", "select", "textarea"];

/// What to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    /// Application base URL
    pub base_url: String,
    /// Route paths to visit
    pub routes: Vec<String>,
    /// Per-route navigation budget
    pub navigation_timeout: Duration,
}

impl CollectOptions {
    /// Scan `routes` under `base_url`
    pub fn new<I, S>(base_url: impl Into<String>, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_url: base_url.into(),
            routes: routes.into_iter().map(Into::into).collect(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }

    /// Override the navigation budget
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Absolute URL of a route
    #[must_use]
    pub fn url_for(&self, route: &str) -> String {
        if route.contains("://") {
            return route.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

/// Scan every route and collect selector candidates.
///
/// Routes are visited one after another on the same page. A failing route
/// never aborts the scan.
pub async fn collect_selectors<P: Page + ?Sized>(page: &mut P, options: &CollectOptions) -> ScanResult {
    let mut scan = ScanResult::new(options.base_url.clone());
    scan.routes.clone_from(&options.routes);

    for route in &options.routes {
        let url = options.url_for(route);
        if let Err(err) = navigate_with_timeout(page, &url, options.navigation_timeout).await {
            tracing::warn!(%route, error = %err, "skipping route");
            scan.skipped_routes.push(SkippedRoute {
                route: route.clone(),
                reason: err.to_string(),
            });
            continue;
        }
        let elements = match page.scan().await {
            Ok(elements) => elements,
            Err(err) => {
                tracing::warn!(%route, error = %err, "scan failed, skipping route");
                scan.skipped_routes.push(SkippedRoute {
                    route: route.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let before = scan.entries.len();
        for element in &elements {
            for entry in candidates(element, route) {
                scan.insert(entry.seen_at(scan.scanned_at));
            }
        }
        tracing::debug!(%route, elements = elements.len(), new = scan.entries.len() - before, "route scanned");
    }

    tracing::info!(
        routes = options.routes.len(),
        skipped = scan.skipped_routes.len(),
        candidates = scan.entries.len(),
        "selector scan complete"
    );
    scan
}

/// Registry candidates for one scanned element.
#[must_use]
pub fn candidates(element: &ScannedElement, route: &str) -> Vec<SelectorEntry> {
    let mut out = Vec::new();

    if let (Some(role), Some(name)) = (element.role.as_deref(), non_empty(element.name.as_deref())) {
        let slug = slugify(name);
        if !slug.is_empty() && !IGNORED_ROLES.contains(&role) {
            let selector = Locator::role(role, Some(name)).to_string();
            out.push(
                SelectorEntry::new(format!("{slug}-{role}"), SelectorType::Role, selector, route)
                    .with_stability(Stability::High),
            );
        }
    }

    if let Some(label) = non_empty(element.label.as_deref()) {
        let slug = slugify(label);
        if !slug.is_empty() && LABELLED_TAGS.contains(&element.tag.as_str()) {
            out.push(
                SelectorEntry::new(
                    format!("{slug}-{}", element.tag),
                    SelectorType::Label,
                    Locator::label(label).to_string(),
                    route,
                )
                .with_stability(Stability::Medium),
            );
        }
    }

    if let Some(test_id) = non_empty(element.test_id.as_deref()) {
        out.push(
            SelectorEntry::new(
                test_id.to_lowercase(),
                SelectorType::TestId,
                Locator::test_id(test_id).to_string(),
                route,
            )
            .with_stability(Stability::Medium),
        );
    }

    out
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
