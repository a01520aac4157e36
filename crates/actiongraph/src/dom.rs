//! In-memory [`Page`] over a recorded DOM snapshot.
//!
//! Snapshot files look like
//!
//! ```json
//! {
//!   "url": "http://localhost:3000",
//!   "pages": {
//!     "/login": [
//!       { "tag": "form", "children": [
//!         { "tag": "input", "label": "Email", "attributes": { "name": "email", "type": "email" } },
//!         { "tag": "button", "text": "Log in", "attributes": { "type": "submit" } }
//!       ]}
//!     ]
//!   }
//! }
//! ```
//!
//! Roles and accessible names follow the common implicit-role table. CSS
//! support is limited to compound selectors (type, `#id`, `.class`,
//! `[attr]`, `[attr="v"]`, `[attr*="v" i]`) and comma-separated lists of
//! them; combinators and pseudo-classes are rejected as invalid.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::locator::Locator;
use crate::page::{ElementHandle, Page, PageError, PageResult, ScannedElement};

/// One element in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomElement {
    /// Tag name
    pub tag: String,
    /// `id` attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Class list
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Remaining attributes
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Explicit role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Explicit accessible name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Associated `<label>` text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Own text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Rendered and visible
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Child elements
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomElement>,
}

const fn default_visible() -> bool {
    true
}

impl Default for DomElement {
    fn default() -> Self {
        Self {
            tag: String::new(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            role: None,
            name: None,
            label: None,
            text: None,
            visible: true,
            children: Vec::new(),
        }
    }
}

impl DomElement {
    /// Element with a tag and nothing else
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            ..Self::default()
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set an explicit role
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Mark hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            "role" => self
                .attributes
                .get("role")
                .cloned()
                .or_else(|| self.role.clone()),
            _ => self.attributes.get(name).cloned(),
        }
    }

    /// Explicit role, else the implicit role of the tag
    #[must_use]
    pub fn effective_role(&self) -> Option<String> {
        if let Some(role) = self.role.clone().or_else(|| self.attributes.get("role").cloned()) {
            return Some(role);
        }
        let input_type = self.attributes.get("type").map(|t| t.to_lowercase());
        let role = match self.tag.as_str() {
            "button" => "button",
            "a" if self.attributes.contains_key("href") => "link",
            "select" => "combobox",
            "textarea" => "textbox",
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
            "nav" => "navigation",
            "main" => "main",
            "img" => "img",
            "form" => "form",
            "input" => match input_type.as_deref() {
                Some("checkbox") => "checkbox",
                Some("radio") => "radio",
                Some("submit" | "button" | "reset") => "button",
                Some("search") => "searchbox",
                Some("hidden") => return None,
                _ => "textbox",
            },
            _ => return None,
        };
        Some(role.to_string())
    }

    /// Accessible name: explicit name, `aria-label`, label, text, then the
    /// `value` of button-like inputs.
    #[must_use]
    pub fn accessible_name(&self) -> Option<String> {
        self.name
            .clone()
            .or_else(|| self.attributes.get("aria-label").cloned())
            .or_else(|| self.label.clone())
            .or_else(|| self.text.clone())
            .or_else(|| {
                if self.tag == "input" {
                    self.attributes.get("value").cloned()
                } else {
                    None
                }
            })
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn test_id(&self) -> Option<String> {
        self.attributes.get("data-testid").cloned()
    }
}

/// Recorded DOM for a set of routes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSnapshot {
    /// Base URL the snapshot was taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Top-level elements by route
    #[serde(default)]
    pub pages: BTreeMap<String, Vec<DomElement>>,
}

impl DomSnapshot {
    /// Load a snapshot JSON file
    pub fn load(path: &Path) -> PageResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PageError::driver(format!("cannot read snapshot {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PageError::driver(format!("invalid snapshot {}: {e}", path.display()))
        })
    }

    /// Add a route
    #[must_use]
    pub fn with_page(mut self, route: impl Into<String>, elements: Vec<DomElement>) -> Self {
        self.pages.insert(route.into(), elements);
        self
    }
}

#[derive(Debug, Clone)]
struct FlatNode {
    element: DomElement,
    parent: Option<usize>,
}

#[derive(Debug, Default)]
struct FormState {
    values: HashMap<usize, String>,
    checked: HashMap<usize, bool>,
}

/// [`Page`] implementation backed by a [`DomSnapshot`].
///
/// Interactions are recorded in [`StaticPage::history`] the way a mock
/// driver records its calls.
#[derive(Debug)]
pub struct StaticPage {
    snapshot: DomSnapshot,
    current: Option<String>,
    nodes: Vec<FlatNode>,
    form: FormState,
    history: Mutex<Vec<String>>,
    latency: HashMap<String, Duration>,
}

impl StaticPage {
    /// Page over a snapshot, not yet navigated
    #[must_use]
    pub fn new(snapshot: DomSnapshot) -> Self {
        Self {
            snapshot,
            current: None,
            nodes: Vec::new(),
            form: FormState::default(),
            history: Mutex::new(Vec::new()),
            latency: HashMap::new(),
        }
    }

    /// Single-route page already navigated to `route`
    #[must_use]
    pub fn with_elements(route: &str, elements: Vec<DomElement>) -> Self {
        let mut page = Self::new(DomSnapshot::default().with_page(route, elements));
        page.load_route(route);
        page
    }

    /// Delay navigation to `route`, for exercising timeouts
    #[must_use]
    pub fn with_latency(mut self, route: impl Into<String>, delay: Duration) -> Self {
        self.latency.insert(route.into(), delay);
        self
    }

    /// Recorded interactions, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Current value of a filled control
    #[must_use]
    pub fn value_of(&self, element: &ElementHandle) -> Option<String> {
        self.index_of(element)
            .ok()
            .and_then(|index| self.form.values.get(&index).cloned())
    }

    /// Current checked state of a control
    #[must_use]
    pub fn is_checked(&self, element: &ElementHandle) -> bool {
        self.index_of(element)
            .ok()
            .and_then(|index| self.form.checked.get(&index).copied())
            .unwrap_or(false)
    }

    fn record(&self, entry: String) {
        if let Ok(mut history) = self.history.lock() {
            history.push(entry);
        }
    }

    fn load_route(&mut self, route: &str) -> bool {
        let Some(elements) = self.snapshot.pages.get(route) else {
            return false;
        };
        let mut nodes = Vec::new();
        for element in elements {
            flatten(element, None, &mut nodes);
        }
        self.nodes = nodes;
        self.form = FormState::default();
        self.current = Some(route.to_string());
        true
    }

    fn handle(&self, index: usize) -> ElementHandle {
        let element = &self.nodes[index].element;
        let handle = ElementHandle::new(format!("e{index}"), element.tag.clone());
        match element.text.as_ref().or(element.label.as_ref()) {
            Some(text) => handle.with_text(text.clone()),
            None => handle,
        }
    }

    fn index_of(&self, element: &ElementHandle) -> PageResult<usize> {
        element
            .id
            .strip_prefix('e')
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|index| *index < self.nodes.len())
            .ok_or_else(|| PageError::Detached {
                id: element.id.clone(),
            })
    }

    fn node(&self, element: &ElementHandle) -> PageResult<&DomElement> {
        Ok(&self.nodes[self.index_of(element)?].element)
    }

    fn is_descendant(&self, index: usize, ancestor: usize) -> bool {
        let mut cursor = self.nodes[index].parent;
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            cursor = self.nodes[parent].parent;
        }
        false
    }

    fn matches(&self, index: usize, locator: &Locator, css: Option<&SelectorList>) -> bool {
        let element = &self.nodes[index].element;
        match locator {
            Locator::Css(_) => css.is_some_and(|list| list.matches(element)),
            Locator::Role { role, name } => {
                element.effective_role().as_deref() == Some(role.as_str())
                    && name.as_ref().map_or(true, |name| {
                        element
                            .accessible_name()
                            .is_some_and(|accessible| name.matches(&accessible))
                    })
            }
            Locator::Label(text) => {
                let needle = text.to_lowercase();
                element
                    .label
                    .iter()
                    .chain(element.attributes.get("aria-label"))
                    .any(|label| label.to_lowercase().contains(&needle))
            }
            Locator::TestId(id) => element.test_id().as_deref() == Some(id.as_str()),
            Locator::Text(text) => {
                let needle = text.to_lowercase();
                element
                    .text
                    .as_ref()
                    .is_some_and(|own| own.to_lowercase().contains(&needle))
            }
        }
    }

    fn ensure_enabled(&self, element: &ElementHandle) -> PageResult<usize> {
        let index = self.index_of(element)?;
        let node = &self.nodes[index].element;
        if node.attributes.contains_key("disabled") {
            return Err(PageError::NotInteractable {
                id: element.id.clone(),
                reason: "element is disabled".to_string(),
            });
        }
        if !node.visible {
            return Err(PageError::NotInteractable {
                id: element.id.clone(),
                reason: "element is hidden".to_string(),
            });
        }
        Ok(index)
    }
}

fn flatten(element: &DomElement, parent: Option<usize>, out: &mut Vec<FlatNode>) {
    let index = out.len();
    let mut own = element.clone();
    own.tag = own.tag.to_lowercase();
    own.children.clear();
    out.push(FlatNode {
        element: own,
        parent,
    });
    for child in &element.children {
        flatten(child, Some(index), out);
    }
}

/// Route component of a URL (`http://host/login?x=1` → `/login`).
fn route_of(url: &str) -> String {
    let without_scheme = url.find("://").map_or(url, |pos| &url[pos + 3..]);
    let path = if url.contains("://") {
        without_scheme
            .find('/')
            .map_or("/", |pos| &without_scheme[pos..])
    } else {
        without_scheme
    };
    let path = path.split(['?', '#']).next().unwrap_or("/");
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[async_trait]
impl Page for StaticPage {
    async fn navigate(&mut self, url: &str) -> PageResult<()> {
        let route = route_of(url);
        if let Some(delay) = self.latency.get(&route).copied() {
            tokio::time::sleep(delay).await;
        }
        self.record(format!("navigate {url}"));
        if self.load_route(&route) {
            Ok(())
        } else {
            Err(PageError::NavigationFailed {
                url: url.to_string(),
                message: "404 route not in snapshot".to_string(),
            })
        }
    }

    async fn current_url(&self) -> PageResult<String> {
        let route = self.current.clone().unwrap_or_else(|| "about:blank".into());
        Ok(match &self.snapshot.url {
            Some(base) if route.starts_with('/') => {
                format!("{}{route}", base.trim_end_matches('/'))
            }
            _ => route,
        })
    }

    async fn query(
        &self,
        locator: &Locator,
        scope: Option<&ElementHandle>,
    ) -> PageResult<Vec<ElementHandle>> {
        let css = match locator {
            Locator::Css(raw) => Some(SelectorList::parse(raw).map_err(|message| {
                PageError::InvalidSelector {
                    selector: raw.clone(),
                    message,
                }
            })?),
            _ => None,
        };
        let scope = scope.map(|s| self.index_of(s)).transpose()?;
        Ok((0..self.nodes.len())
            .filter(|&index| scope.map_or(true, |root| self.is_descendant(index, root)))
            .filter(|&index| self.matches(index, locator, css.as_ref()))
            .map(|index| self.handle(index))
            .collect())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> PageResult<Option<String>> {
        Ok(self.node(element)?.attribute(name))
    }

    async fn text_content(&self, element: &ElementHandle) -> PageResult<String> {
        let root = self.index_of(element)?;
        let mut parts: Vec<&str> = Vec::new();
        for index in root..self.nodes.len() {
            if index == root || self.is_descendant(index, root) {
                if let Some(text) = &self.nodes[index].element.text {
                    parts.push(text.as_str());
                }
            }
        }
        Ok(parts.join(" "))
    }

    async fn is_visible(&self, element: &ElementHandle) -> PageResult<bool> {
        let mut cursor = Some(self.index_of(element)?);
        while let Some(index) = cursor {
            if !self.nodes[index].element.visible {
                return Ok(false);
            }
            cursor = self.nodes[index].parent;
        }
        Ok(true)
    }

    async fn click(&mut self, element: &ElementHandle) -> PageResult<()> {
        let index = self.ensure_enabled(element)?;
        let node = &self.nodes[index].element;
        if matches!(node.effective_role().as_deref(), Some("checkbox")) {
            let entry = self.form.checked.entry(index).or_insert(false);
            *entry = !*entry;
        }
        self.record(format!("click {}", element.id));
        Ok(())
    }

    async fn fill(&mut self, element: &ElementHandle, value: &str) -> PageResult<()> {
        let index = self.ensure_enabled(element)?;
        let tag = self.nodes[index].element.tag.as_str();
        if !matches!(tag, "input" | "textarea") {
            return Err(PageError::NotInteractable {
                id: element.id.clone(),
                reason: format!("cannot fill <{tag}>"),
            });
        }
        self.form.values.insert(index, value.to_string());
        self.record(format!("fill {} {value}", element.id));
        Ok(())
    }

    async fn select_option(&mut self, element: &ElementHandle, value: &str) -> PageResult<()> {
        let index = self.ensure_enabled(element)?;
        if self.nodes[index].element.tag != "select" {
            return Err(PageError::NotInteractable {
                id: element.id.clone(),
                reason: "not a <select>".to_string(),
            });
        }
        self.form.values.insert(index, value.to_string());
        self.record(format!("select {} {value}", element.id));
        Ok(())
    }

    async fn set_checked(&mut self, element: &ElementHandle, checked: bool) -> PageResult<()> {
        let index = self.ensure_enabled(element)?;
        self.form.checked.insert(index, checked);
        self.record(format!("check {} {checked}", element.id));
        Ok(())
    }

    async fn scan(&self) -> PageResult<Vec<ScannedElement>> {
        Ok(self
            .nodes
            .iter()
            .filter(|node| node.element.visible)
            .map(|node| {
                let element = &node.element;
                ScannedElement {
                    tag: element.tag.clone(),
                    role: element.effective_role(),
                    name: element.accessible_name(),
                    label: element
                        .label
                        .clone()
                        .or_else(|| element.attributes.get("aria-label").cloned()),
                    test_id: element.test_id(),
                }
            })
            .collect())
    }
}

// CSS subset

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
}

#[derive(Debug, Clone)]
struct AttrSelector {
    name: String,
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

impl AttrSelector {
    fn matches(&self, element: &DomElement) -> bool {
        let Some(actual) = element.attribute(&self.name) else {
            return false;
        };
        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), self.value.to_lowercase())
        } else {
            (actual, self.value.clone())
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => actual.contains(&expected),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn matches(&self, element: &DomElement) -> bool {
        self.tag.as_ref().map_or(true, |tag| *tag == element.tag)
            && self
                .id
                .as_ref()
                .map_or(true, |id| element.id.as_ref() == Some(id))
            && self.classes.iter().all(|class| element.classes.contains(class))
            && self.attrs.iter().all(|attr| attr.matches(element))
    }
}

#[derive(Debug, Clone)]
struct SelectorList(Vec<Compound>);

impl SelectorList {
    fn parse(raw: &str) -> Result<Self, String> {
        let mut list = Vec::new();
        for part in split_top_level(raw) {
            list.push(parse_compound(part.trim())?);
        }
        if list.is_empty() {
            return Err("empty selector".to_string());
        }
        Ok(Self(list))
    }

    fn matches(&self, element: &DomElement) -> bool {
        self.0.iter().any(|compound| compound.matches(element))
    }
}

/// Split on commas outside brackets and quotes.
fn split_top_level(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_ident(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn parse_compound(raw: &str) -> Result<Compound, String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;
    if chars.first() == Some(&'*') {
        i += 1;
    } else if chars.first().copied().is_some_and(is_ident) {
        let (tag, next) = read_ident(&chars, 0);
        compound.tag = Some(tag.to_lowercase());
        i = next;
    }
    while i < chars.len() {
        match chars[i] {
            '#' => {
                let (id, next) = read_ident(&chars, i + 1);
                compound.id = Some(id);
                i = next;
            }
            '.' => {
                let (class, next) = read_ident(&chars, i + 1);
                compound.classes.push(class);
                i = next;
            }
            '[' => {
                let end = find_closing_bracket(&chars, i)?;
                let body: String = chars[i + 1..end].iter().collect();
                compound.attrs.push(parse_attr(&body)?);
                i = end + 1;
            }
            ':' => return Err("pseudo-classes are not supported".to_string()),
            c if c.is_whitespace() || c == '>' || c == '+' || c == '~' => {
                return Err(format!("combinators are not supported in '{raw}'"));
            }
            c => return Err(format!("unexpected character '{c}'")),
        }
    }
    if i == 0 {
        return Err("empty compound selector".to_string());
    }
    Ok(compound)
}

fn find_closing_bracket(chars: &[char], open: usize) -> Result<usize, String> {
    let mut quote: Option<char> = None;
    for (offset, &c) in chars[open + 1..].iter().enumerate() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return Ok(open + 1 + offset),
            _ => {}
        }
    }
    Err("unterminated attribute selector".to_string())
}

fn parse_attr(body: &str) -> Result<AttrSelector, String> {
    let body = body.trim();
    let Some(eq) = body.find('=') else {
        return Ok(AttrSelector {
            name: body.to_string(),
            op: AttrOp::Exists,
            value: String::new(),
            case_insensitive: false,
        });
    };
    let (name, op) = match body[..eq].chars().last() {
        Some('*') => (&body[..eq - 1], AttrOp::Contains),
        Some(c @ ('^' | '$' | '~' | '|')) => {
            return Err(format!("attribute operator '{c}=' is not supported"));
        }
        _ => (&body[..eq], AttrOp::Equals),
    };
    let rest = body[eq + 1..].trim();
    let (value, flags) = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let close = rest[1..]
                .find(q)
                .ok_or_else(|| "unterminated attribute value".to_string())?;
            (rest[1..=close].to_string(), rest[close + 2..].trim())
        }
        _ => match rest.split_once(char::is_whitespace) {
            Some((value, flags)) => (value.to_string(), flags.trim()),
            None => (rest.to_string(), ""),
        },
    };
    let case_insensitive = match flags {
        "" | "s" => false,
        "i" | "I" => true,
        other => return Err(format!("unknown attribute flag '{other}'")),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err("attribute selector without a name".to_string());
    }
    Ok(AttrSelector {
        name: name.to_string(),
        op,
        value,
        case_insensitive,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn login_page() -> StaticPage {
        StaticPage::with_elements(
            "/login",
            vec![
                DomElement::new("nav").child(DomElement::new("a").attr("href", "/").text("Home")),
                DomElement::new("form").id("login").class("card").child(
                    DomElement::new("div")
                        .class("field")
                        .child(
                            DomElement::new("input")
                                .label("Email address")
                                .attr("name", "email")
                                .attr("type", "email")
                                .attr("placeholder", "you@example.com"),
                        )
                        .child(
                            DomElement::new("input")
                                .label("Password")
                                .attr("name", "password")
                                .attr("type", "password"),
                        ),
                )
                .child(
                    DomElement::new("button")
                        .text("Log in")
                        .attr("type", "submit")
                        .attr("data-testid", "login-button"),
                ),
                DomElement::new("p").class("hint").text("Forgot password?").hidden(),
            ],
        )
    }

    async fn count(page: &StaticPage, locator: &str) -> usize {
        page.query(&Locator::parse(locator), None).await.unwrap().len()
    }

    mod css_tests {
        use super::*;

        #[tokio::test]
        async fn test_type_id_class() {
            let page = login_page();
            assert_eq!(count(&page, "input").await, 2);
            assert_eq!(count(&page, "#login").await, 1);
            assert_eq!(count(&page, "form.card").await, 1);
            assert_eq!(count(&page, "div.missing").await, 0);
        }

        #[tokio::test]
        async fn test_attribute_operators() {
            let page = login_page();
            assert_eq!(count(&page, r#"input[name="email"]"#).await, 1);
            assert_eq!(count(&page, r#"input[name*="EMA" i]"#).await, 1);
            assert_eq!(count(&page, r#"input[name*="EMA"]"#).await, 0);
            assert_eq!(count(&page, "[placeholder*=you]").await, 1);
            assert_eq!(count(&page, "[data-testid]").await, 1);
        }

        #[tokio::test]
        async fn test_selector_lists() {
            let page = login_page();
            assert_eq!(count(&page, "a, button").await, 2);
            assert_eq!(count(&page, "#login, .field, .missing").await, 2);
            assert_eq!(
                count(&page, r#"input[type="submit"], button[type="submit"]"#).await,
                1
            );
        }

        #[tokio::test]
        async fn test_invalid_selector() {
            let page = login_page();
            let err = page.query(&Locator::css("a:hover"), None).await.unwrap_err();
            assert!(matches!(err, PageError::InvalidSelector { .. }));
        }

        #[tokio::test]
        async fn test_combinators_rejected() {
            let page = login_page();
            for raw in ["form input", "form > button", "[placeholder^=you]"] {
                let err = page.query(&Locator::css(raw), None).await.unwrap_err();
                assert!(matches!(err, PageError::InvalidSelector { .. }), "{raw}");
            }
        }
    }

    mod semantic_tests {
        use super::*;

        #[tokio::test]
        async fn test_role_and_name() {
            let page = login_page();
            assert_eq!(count(&page, r#"role=button[name="log in"]"#).await, 1);
            assert_eq!(count(&page, "role=textbox").await, 2);
            assert_eq!(count(&page, "role=link[name=/^home$/i]").await, 1);
        }

        #[tokio::test]
        async fn test_label_testid_text() {
            let page = login_page();
            assert_eq!(count(&page, "label=email").await, 1);
            assert_eq!(count(&page, "testid=login-button").await, 1);
            assert_eq!(count(&page, "text=forgot").await, 1);
        }

        #[tokio::test]
        async fn test_scoped_query() {
            let page = login_page();
            let form = page.query(&Locator::css("form"), None).await.unwrap();
            let scoped = page.query(&Locator::css("a"), Some(&form[0])).await.unwrap();
            assert!(scoped.is_empty());
            let inputs = page.query(&Locator::css("input"), Some(&form[0])).await.unwrap();
            assert_eq!(inputs.len(), 2);
        }

        #[tokio::test]
        async fn test_document_order() {
            let page = login_page();
            let matches = page.query(&Locator::css("input"), None).await.unwrap();
            let first = page.attribute(&matches[0], "name").await.unwrap();
            assert_eq!(first.as_deref(), Some("email"));
        }
    }

    mod interaction_tests {
        use super::*;

        #[tokio::test]
        async fn test_fill_and_history() {
            let mut page = login_page();
            let input = page.query(&Locator::label("Email"), None).await.unwrap();
            page.fill(&input[0], "a@b.com").await.unwrap();
            assert_eq!(page.value_of(&input[0]).as_deref(), Some("a@b.com"));
            assert_eq!(page.history().len(), 1);
        }

        #[tokio::test]
        async fn test_hidden_element_not_clickable() {
            let mut page = login_page();
            let hint = page.query(&Locator::css("p.hint"), None).await.unwrap();
            assert!(!page.is_visible(&hint[0]).await.unwrap());
            assert!(page.click(&hint[0]).await.is_err());
        }

        #[tokio::test]
        async fn test_navigation() {
            let snapshot = DomSnapshot {
                url: Some("http://localhost:3000".into()),
                ..DomSnapshot::default()
            }
            .with_page("/a", vec![DomElement::new("main")]);
            let mut page = StaticPage::new(snapshot);
            page.navigate("http://localhost:3000/a?x=1").await.unwrap();
            assert_eq!(page.current_url().await.unwrap(), "http://localhost:3000/a");
            assert!(page.navigate("http://localhost:3000/b").await.is_err());
        }

        #[tokio::test]
        async fn test_text_content_includes_descendants() {
            let page = login_page();
            let form = page.query(&Locator::css("form"), None).await.unwrap();
            assert_eq!(page.text_content(&form[0]).await.unwrap(), "Log in");
        }
    }

    #[test]
    fn test_route_of() {
        assert_eq!(route_of("http://x/login"), "/login");
        assert_eq!(route_of("https://x"), "/");
        assert_eq!(route_of("/settings#tab"), "/settings");
    }

    #[test]
    fn test_snapshot_deserializes_defaults() {
        let snapshot: DomSnapshot =
            serde_json::from_str(r#"{"pages":{"/":[{"tag":"button","text":"Go"}]}}"#).unwrap();
        assert!(snapshot.pages["/"][0].visible);
    }
}
