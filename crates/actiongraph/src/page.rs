//! Page - abstract handle onto one live document.
//!
//! The resolver, the route scanner and the step runtime only ever talk to a
//! page through this trait, so a CDP-backed browser session, a recorded DOM
//! snapshot ([`crate::dom::StaticPage`]) and test doubles are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::locator::Locator;

/// Result type for page operations
pub type PageResult<T> = Result<T, PageError>;

/// Errors reported by a page driver
#[derive(Debug, Clone, Error)]
pub enum PageError {
    /// Navigation did not complete
    #[error("Navigation to {url} failed: {message}")]
    NavigationFailed {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation exceeded its time budget
    #[error("Page operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The selector could not be evaluated by the driver
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector {
        /// Offending selector text
        selector: String,
        /// Parser message
        message: String,
    },

    /// Element handle no longer refers to a node in the document
    #[error("Element {id} is detached from the document")]
    Detached {
        /// Element handle id
        id: String,
    },

    /// Element exists but cannot receive the interaction
    #[error("Element {id} is not interactable: {reason}")]
    NotInteractable {
        /// Element handle id
        id: String,
        /// Why the interaction was refused
        reason: String,
    },

    /// Driver-specific failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },
}

impl PageError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }
}

/// Element handle for DOM interactions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-scoped unique identifier for the element
    pub id: String,
    /// Element tag name (lower-case)
    pub tag_name: String,
    /// Element text content, when the driver captured it
    pub text_content: Option<String>,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into().to_lowercase(),
            text_content: None,
        }
    }

    /// Attach captured text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Short human-readable description for diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.text_content {
            Some(text) if !text.is_empty() => {
                let text: String = text.chars().take(40).collect();
                format!("<{}#{}> \"{}\"", self.tag_name, self.id, text)
            }
            _ => format!("<{}#{}>", self.tag_name, self.id),
        }
    }
}

/// A selector candidate discovered while scanning a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedElement {
    /// Element tag name
    pub tag: String,
    /// Explicit or implicit ARIA role
    pub role: Option<String>,
    /// Accessible name
    pub name: Option<String>,
    /// Associated label text (form controls)
    pub label: Option<String>,
    /// `data-testid` attribute
    pub test_id: Option<String>,
}

/// Abstract page driver.
///
/// `query` must return matches in document order; ambiguity policies rely on
/// it.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to a URL and wait for the document to load
    async fn navigate(&mut self, url: &str) -> PageResult<()>;

    /// Get current URL
    async fn current_url(&self) -> PageResult<String>;

    /// All elements matching `locator`, restricted to the `scope` subtree
    async fn query(
        &self,
        locator: &Locator,
        scope: Option<&ElementHandle>,
    ) -> PageResult<Vec<ElementHandle>>;

    /// Read an attribute value
    async fn attribute(&self, element: &ElementHandle, name: &str) -> PageResult<Option<String>>;

    /// Read the element's text content
    async fn text_content(&self, element: &ElementHandle) -> PageResult<String>;

    /// Whether the element is rendered and visible
    async fn is_visible(&self, element: &ElementHandle) -> PageResult<bool>;

    /// Click element
    async fn click(&mut self, element: &ElementHandle) -> PageResult<()>;

    /// Replace the value of a text control
    async fn fill(&mut self, element: &ElementHandle, value: &str) -> PageResult<()>;

    /// Select an option of a `<select>` by value or label
    async fn select_option(&mut self, element: &ElementHandle, value: &str) -> PageResult<()>;

    /// Set a checkbox or radio state
    async fn set_checked(&mut self, element: &ElementHandle, checked: bool) -> PageResult<()>;

    /// Enumerate selector candidates on the current document
    async fn scan(&self) -> PageResult<Vec<ScannedElement>>;
}

/// Navigate with an explicit time budget.
///
/// Dropping the navigation future on expiry cancels the in-flight request.
pub async fn navigate_with_timeout<P: Page + ?Sized>(
    page: &mut P,
    url: &str,
    budget: Duration,
) -> PageResult<()> {
    match tokio::time::timeout(budget, page.navigate(url)).await {
        Ok(result) => result,
        Err(_) => Err(PageError::Timeout {
            ms: budget.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod element_handle_tests {
        use super::*;

        #[test]
        fn test_element_handle_creation() {
            let elem = ElementHandle::new("btn-1", "BUTTON");
            assert_eq!(elem.id, "btn-1");
            assert_eq!(elem.tag_name, "button");
            assert!(elem.text_content.is_none());
        }

        #[test]
        fn test_describe_truncates_text() {
            let long = "x".repeat(100);
            let elem = ElementHandle::new("e1", "p").with_text(long);
            let described = elem.describe();
            assert!(described.starts_with("<p#e1>"));
            assert!(described.len() < 60);
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_navigation_error_display() {
            let err = PageError::NavigationFailed {
                url: "http://x/login".into(),
                message: "connection refused".into(),
            };
            assert!(err.to_string().contains("http://x/login"));
        }
    }
}
