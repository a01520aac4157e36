//! Step runtime.
//!
//! [`StepRuntime`] is the API generated step definitions call. Every
//! element-targeting call goes through the [`Resolver`], so a step written
//! against `email-input` keeps working when the registry entry behind it is
//! updated.
//!
//! [`StepCall`] is the planned form of one node; the step compiler renders it
//! as source and [`StepRuntime::execute`] runs it directly during replay.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::graph::{ActionNode, DeterministicAction, NodeType};
use crate::locator::Locator;
use crate::page::{navigate_with_timeout, ElementHandle, Page};
use crate::resolver::{ResolveOptions, Resolver};
use crate::result::{ActionGraphError, ActionGraphResult};

/// Result type of a step body
pub type StepResult = ActionGraphResult<()>;

/// Default navigation budget
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(15);

/// A node's deterministic instruction cannot be executed as written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid instruction on {node_id}: {message}")]
pub struct InstructionError {
    /// Offending node
    pub node_id: String,
    /// What is wrong
    pub message: String,
}

impl InstructionError {
    fn new(node: &ActionNode, message: impl Into<String>) -> Self {
        Self {
            node_id: node.node_id.clone(),
            message: message.into(),
        }
    }
}

/// Element a step acts on: a registry id or free-text hint, plus the
/// locator the graph recorded for it, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Registry id or free-text hint
    pub hint: String,
    /// Verified locator from the graph's selector map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

impl Target {
    /// Target resolved by hint only
    #[must_use]
    pub fn new(hint: impl Into<String>) -> Self {
        Self {
            hint: hint.into(),
            locator: None,
        }
    }

    /// Add the graph's locator for this hint
    #[must_use]
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }
}

impl From<&str> for Target {
    fn from(hint: &str) -> Self {
        Self::new(hint)
    }
}

impl From<String> for Target {
    fn from(hint: String) -> Self {
        Self::new(hint)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hint)
    }
}

/// What a node does when executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum StepCall {
    /// Click the resolved element
    Click { target: Target },
    /// Fill the resolved element
    Fill { target: Target, value: String },
    /// Choose an option of the resolved element
    Select { target: Target, value: String },
    /// Set the checked state of the resolved element
    Check { target: Target, checked: bool },
    /// Go to a URL
    Navigate { url: String },
    /// Pause
    Wait { ms: u64 },
    /// Text containment, in the resolved element or anywhere on the page
    AssertText { target: Option<Target>, expected: String },
    /// The resolved element is visible
    AssertVisible { target: Target },
    /// Nothing to execute
    Observe,
}

impl StepCall {
    /// Plan the call for a node.
    ///
    /// Element actions without a selector fall back to the step sentence as
    /// the resolver hint. Nodes without an instruction are observational,
    /// except `assert` nodes carrying a selector reference, which check
    /// visibility.
    pub fn plan(node: &ActionNode) -> Result<Self, InstructionError> {
        let target = node_target(node);
        let Some(instruction) = node.instruction() else {
            return Ok(match (node.node_type, target) {
                (NodeType::Assert, Some(target)) => Self::AssertVisible { target },
                _ => Self::Observe,
            });
        };
        let value = instruction.value.clone();

        let Some(action) = instruction.action else {
            if node.node_type != NodeType::Assert {
                return Ok(Self::Observe);
            }
            return Ok(match (value, target) {
                (Some(expected), target) => Self::AssertText { target, expected },
                (None, Some(target)) => Self::AssertVisible { target },
                (None, None) => Self::Observe,
            });
        };

        let element = || {
            target
                .clone()
                .unwrap_or_else(|| Target::new(node.instructions.natural.clone()))
        };
        let required = |what: &str| {
            value
                .clone()
                .ok_or_else(|| InstructionError::new(node, format!("{} needs a {what}", action.as_str())))
        };
        Ok(match action {
            DeterministicAction::Click => Self::Click { target: element() },
            DeterministicAction::Fill => Self::Fill {
                target: element(),
                value: required("value")?,
            },
            DeterministicAction::Select => Self::Select {
                target: element(),
                value: required("value")?,
            },
            DeterministicAction::Check => Self::Check {
                target: element(),
                checked: value.as_deref().map_or(true, parse_checked),
            },
            DeterministicAction::Navigate => Self::Navigate {
                url: required("url")?,
            },
            DeterministicAction::Wait => {
                let raw = required("duration")?;
                let ms = raw.trim().parse::<u64>().map_err(|_| {
                    InstructionError::new(node, format!("wait duration '{raw}' is not milliseconds"))
                })?;
                Self::Wait { ms }
            }
        })
    }

    /// Whether the call touches the page
    #[must_use]
    pub const fn is_observational(&self) -> bool {
        matches!(self, Self::Observe)
    }
}

/// The node's selector hint with the locator its graph verified for it
fn node_target(node: &ActionNode) -> Option<Target> {
    let hint = node.selector_hint()?;
    let target = Target::new(hint);
    Some(match node.selector_locator(hint) {
        Some(locator) => target.with_locator(locator),
        None => target,
    })
}

fn parse_checked(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off" | "unchecked"
    )
}

/// Executes steps against a [`Page`] through a shared [`Resolver`].
#[derive(Debug)]
pub struct StepRuntime<P: Page> {
    page: P,
    resolver: Arc<Resolver>,
    options: ResolveOptions,
    base_url: Option<String>,
    navigation_timeout: Duration,
    current_step: Option<String>,
}

impl<P: Page> StepRuntime<P> {
    /// Runtime over `page`
    pub fn new(page: P, resolver: Arc<Resolver>) -> Self {
        Self {
            page,
            resolver,
            options: ResolveOptions::default(),
            base_url: None,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            current_step: None,
        }
    }

    /// Prefix for relative navigation targets
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Base resolve options for every lookup
    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Navigation budget
    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// The page
    pub fn page(&self) -> &P {
        &self.page
    }

    /// The page, mutably
    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    /// Give the page back
    pub fn into_page(self) -> P {
        self.page
    }

    /// Resolve a target with the runtime's base options
    pub async fn resolve(&self, target: impl Into<Target>) -> ActionGraphResult<ElementHandle> {
        self.resolve_with(&target.into(), self.options.clone()).await
    }

    async fn resolve_with(
        &self,
        target: &Target,
        mut options: ResolveOptions,
    ) -> ActionGraphResult<ElementHandle> {
        if let Some(locator) = &target.locator {
            options = options.with_locator(locator.clone());
        }
        let resolution = self.resolver.resolve(&self.page, &target.hint, &options).await?;
        Ok(resolution.element)
    }

    fn options_for_tags(&self, tags: &[&str]) -> ResolveOptions {
        if self.options.expected_tag_names.is_empty() {
            self.options.clone().with_expected_tags(tags)
        } else {
            self.options.clone()
        }
    }

    /// Click
    pub async fn click(&mut self, target: impl Into<Target>) -> StepResult {
        let element = self.resolve(target).await?;
        self.page.click(&element).await?;
        Ok(())
    }

    /// Fill a text control
    pub async fn fill(&mut self, target: impl Into<Target>, value: &str) -> StepResult {
        let options = self.options_for_tags(&["input", "textarea"]);
        let element = self.resolve_with(&target.into(), options).await?;
        self.page.fill(&element, value).await?;
        Ok(())
    }

    /// Choose an option
    pub async fn select(&mut self, target: impl Into<Target>, value: &str) -> StepResult {
        let options = self.options_for_tags(&["select"]);
        let element = self.resolve_with(&target.into(), options).await?;
        self.page.select_option(&element, value).await?;
        Ok(())
    }

    /// Set a checkbox or radio
    pub async fn check(&mut self, target: impl Into<Target>, checked: bool) -> StepResult {
        let options = self.options_for_tags(&["input"]);
        let element = self.resolve_with(&target.into(), options).await?;
        self.page.set_checked(&element, checked).await?;
        Ok(())
    }

    /// Navigate, joining relative targets onto the base URL
    pub async fn navigate(&mut self, url: &str) -> StepResult {
        let target = self.absolute_url(url);
        tracing::debug!(url = %target, "navigate");
        navigate_with_timeout(&mut self.page, &target, self.navigation_timeout).await?;
        Ok(())
    }

    /// Pause
    pub async fn wait_ms(&self, ms: u64) -> StepResult {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    }

    /// `expected` appears in the resolved element, or anywhere visible on
    /// the page when no target is given
    pub async fn assert_text(&self, target: Option<Target>, expected: &str) -> StepResult {
        let found = match &target {
            Some(target) => {
                let element = self.resolve(target.clone()).await?;
                let text = self.page.text_content(&element).await?;
                text.to_lowercase().contains(&expected.to_lowercase())
            }
            None => {
                let mut found = false;
                for element in self.page.query(&Locator::Text(expected.to_string()), None).await? {
                    if self.page.is_visible(&element).await? {
                        found = true;
                        break;
                    }
                }
                found
            }
        };
        if found {
            Ok(())
        } else {
            Err(self.assertion(match target {
                Some(target) => format!("expected '{target}' to contain text \"{expected}\""),
                None => format!("expected page to contain text \"{expected}\""),
            }))
        }
    }

    /// The resolved element is visible
    pub async fn assert_visible(&self, target: impl Into<Target>) -> StepResult {
        let target = target.into();
        let element = self.resolve(target.clone()).await?;
        if self.page.is_visible(&element).await? {
            Ok(())
        } else {
            Err(self.assertion(format!("expected '{target}' to be visible")))
        }
    }

    /// Run a planned call
    pub async fn run(&mut self, call: &StepCall) -> StepResult {
        match call {
            StepCall::Click { target } => self.click(target.clone()).await,
            StepCall::Fill { target, value } => self.fill(target.clone(), value).await,
            StepCall::Select { target, value } => self.select(target.clone(), value).await,
            StepCall::Check { target, checked } => self.check(target.clone(), *checked).await,
            StepCall::Navigate { url } => self.navigate(url).await,
            StepCall::Wait { ms } => self.wait_ms(*ms).await,
            StepCall::AssertText { target, expected } => {
                self.assert_text(target.clone(), expected).await
            }
            StepCall::AssertVisible { target } => self.assert_visible(target.clone()).await,
            StepCall::Observe => Ok(()),
        }
    }

    /// Plan and run a node
    pub async fn execute(&mut self, node: &ActionNode) -> StepResult {
        let call = StepCall::plan(node)?;
        self.current_step = Some(node.node_id.clone());
        let result = self.run(&call).await;
        self.current_step = None;
        result
    }

    fn absolute_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !url.contains("://") => {
                format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }

    fn assertion(&self, message: String) -> ActionGraphError {
        ActionGraphError::AssertionFailed {
            node_id: self
                .current_step
                .clone()
                .unwrap_or_else(|| "step".to_string()),
            message,
        }
    }
}
