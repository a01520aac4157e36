//! Locator abstraction for element selection.
//!
//! A [`Locator`] is the parsed form of the raw selector strings stored in the
//! selector registry. Raw strings carry an engine prefix:
//!
//! ```text
//! role=button[name="Log in"]     accessible role, optional accessible name
//! role=link[name=/sign ?up/i]    accessible role, name regex
//! label=Email address            form control by associated label text
//! testid=login-button            data-testid attribute
//! text=Welcome back              visible text content
//! input[name*="email" i]         anything else is CSS
//! ```

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::SelectorType;

/// How an accessible name is matched.
#[derive(Debug, Clone)]
pub enum NameMatch {
    /// Case-insensitive substring match
    Text(String),
    /// Regular expression match
    Pattern(Regex),
}

impl NameMatch {
    /// Build a case-insensitive pattern match.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self::Pattern)
    }

    /// Check a candidate accessible name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Text(text) => name.to_lowercase().contains(&text.to_lowercase()),
            Self::Pattern(re) => re.is_match(name),
        }
    }
}

impl PartialEq for NameMatch {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for NameMatch {}

/// Parsed element locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Accessible role with optional accessible-name filter
    Role {
        /// ARIA role (button, link, textbox, ...)
        role: String,
        /// Accessible name filter
        name: Option<NameMatch>,
    },
    /// Form control labelled by the given text
    Label(String),
    /// `data-testid` attribute
    TestId(String),
    /// Visible text content
    Text(String),
}

impl Locator {
    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a role locator with an accessible-name substring filter
    #[must_use]
    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.map(|n| NameMatch::Text(n.to_string())),
        }
    }

    /// Create a label locator
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label(text.into())
    }

    /// Create a test ID locator
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Parse a raw registry selector string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("role=") {
            return parse_role(rest);
        }
        if let Some(rest) = raw.strip_prefix("label=") {
            return Self::Label(rest.trim().to_string());
        }
        if let Some(rest) = raw.strip_prefix("testid=") {
            return Self::TestId(rest.trim().to_string());
        }
        if let Some(rest) = raw.strip_prefix("text=") {
            return Self::Text(rest.trim().to_string());
        }
        Self::Css(raw.to_string())
    }

    /// Parse a raw selector, interpreting un-prefixed strings by entry type.
    ///
    /// Older registries stored `login-button` for a testid entry rather than
    /// `testid=login-button`; the entry type disambiguates.
    #[must_use]
    pub fn for_entry(kind: SelectorType, raw: &str) -> Self {
        let parsed = Self::parse(raw);
        match (kind, parsed) {
            (SelectorType::TestId, Self::Css(raw)) if !looks_like_css(&raw) => Self::TestId(raw),
            (SelectorType::Label, Self::Css(raw)) if !looks_like_css(&raw) => Self::Label(raw),
            (SelectorType::Role, Self::Css(raw)) if !looks_like_css(&raw) => parse_role(&raw),
            (_, parsed) => parsed,
        }
    }

    /// The selector engine this locator uses.
    #[must_use]
    pub const fn engine(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::Role { .. } => "role",
            Self::Label(_) => "label",
            Self::TestId(_) => "testid",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "{css}"),
            Self::Role { role, name: None } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(NameMatch::Text(name)),
            } => write!(f, "role={role}[name={name:?}]"),
            Self::Role {
                role,
                name: Some(NameMatch::Pattern(re)),
            } => write!(f, "role={role}[name=/{}/i]", re.as_str()),
            Self::Label(text) => write!(f, "label={text}"),
            Self::TestId(id) => write!(f, "testid={id}"),
            Self::Text(text) => write!(f, "text={text}"),
        }
    }
}

impl Serialize for Locator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

fn looks_like_css(raw: &str) -> bool {
    raw.contains(['[', '#', '.', ' ', '>', ':', '*'])
}

fn parse_role(spec: &str) -> Locator {
    let spec = spec.trim();
    let Some(open) = spec.find('[') else {
        return Locator::Role {
            role: spec.to_string(),
            name: None,
        };
    };
    let role = spec[..open].trim().to_string();
    let filter = spec[open + 1..].trim_end_matches(']').trim();
    let name = filter.strip_prefix("name=").and_then(|value| {
        let value = value.trim();
        if let Some(pattern) = value.strip_prefix('/') {
            let pattern = pattern
                .strip_suffix("/i")
                .or_else(|| pattern.strip_suffix('/'))
                .unwrap_or(pattern);
            NameMatch::pattern(pattern).ok()
        } else {
            Some(NameMatch::Text(
                value.trim_matches(|c| c == '"' || c == '\'').to_string(),
            ))
        }
    });
    Locator::Role { role, name }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_role_with_name() {
            let locator = Locator::parse(r#"role=button[name="Log in"]"#);
            assert_eq!(locator, Locator::role("button", Some("Log in")));
        }

        #[test]
        fn test_role_without_name() {
            assert_eq!(Locator::parse("role=navigation"), Locator::role("navigation", None));
        }

        #[test]
        fn test_role_with_pattern() {
            let locator = Locator::parse("role=link[name=/sign ?up/i]");
            match locator {
                Locator::Role {
                    role,
                    name: Some(name),
                } => {
                    assert_eq!(role, "link");
                    assert!(name.matches("SIGN UP"));
                    assert!(name.matches("signup"));
                }
                other => panic!("unexpected locator {other:?}"),
            }
        }

        #[test]
        fn test_prefixed_engines() {
            assert_eq!(Locator::parse("label=Email"), Locator::label("Email"));
            assert_eq!(Locator::parse("testid=login-button"), Locator::test_id("login-button"));
            assert_eq!(Locator::parse("text=Welcome"), Locator::Text("Welcome".into()));
        }

        #[test]
        fn test_css_fallback() {
            assert_eq!(
                Locator::parse(r#"input[name*="email" i]"#),
                Locator::css(r#"input[name*="email" i]"#)
            );
        }

        #[test]
        fn test_for_entry_bare_testid() {
            assert_eq!(
                Locator::for_entry(SelectorType::TestId, "login-button"),
                Locator::test_id("login-button")
            );
            assert_eq!(
                Locator::for_entry(SelectorType::TestId, "[data-testid=x]"),
                Locator::css("[data-testid=x]")
            );
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_display_is_parseable() {
            for raw in [
                r#"role=button[name="Log in"]"#,
                "role=main",
                "label=Email",
                "testid=save",
                "text=Welcome",
                "form > button.primary",
            ] {
                let locator = Locator::parse(raw);
                assert_eq!(locator.to_string(), raw);
                assert_eq!(Locator::parse(&locator.to_string()), locator);
            }
        }

        #[test]
        fn test_engine_names() {
            assert_eq!(Locator::css("a").engine(), "css");
            assert_eq!(Locator::role("a", None).engine(), "role");
            assert_eq!(Locator::label("a").engine(), "label");
        }
    }
}
