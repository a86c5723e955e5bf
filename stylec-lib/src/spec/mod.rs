//! The canonical tree a raw style object is normalized into.
//!
//! Every map is an [`IndexMap`] so that declaration order, which decides the CSS
//! cascade, survives normalization and generation unchanged.

mod key;
mod normalize;

pub use key::{classify_key, KeyKind};
pub use normalize::normalize;
pub(crate) use normalize::kind_name;

use indexmap::IndexMap;
use std::fmt;

/// A single declaration value. Numbers get a unit appended when serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Text(text) => f.write_str(text),
            RuleValue::Number(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for RuleValue {
    fn from(text: &str) -> Self {
        RuleValue::Text(text.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(text: String) -> Self {
        RuleValue::Text(text)
    }
}

impl From<f64> for RuleValue {
    fn from(number: f64) -> Self {
        RuleValue::Number(number)
    }
}

impl From<i32> for RuleValue {
    fn from(number: i32) -> Self {
        RuleValue::Number(number.into())
    }
}

/// Property name (camelCase, as written in the source) → value.
pub type Rules = IndexMap<String, RuleValue>;

/// Rules for one composed selector fragment such as `:hover` or `[disabled]:active`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorBlock {
    pub rules: Rules,
}

/// Content of one media query for one style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaQueryBlock {
    pub rules: Rules,
    pub selectors: IndexMap<String, SelectorBlock>,
}

impl MediaQueryBlock {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.selectors.values().all(|s| s.rules.is_empty())
    }
}

/// Normalized form of one style name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specification {
    pub rules: Rules,
    pub selectors: IndexMap<String, SelectorBlock>,
    /// Keyed by query name without the leading `@`.
    pub media_queries: IndexMap<String, MediaQueryBlock>,
    /// The same content scoped under a parent selector, e.g. `body.dark`.
    pub parents: IndexMap<String, Specification>,
}

impl Specification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, property: &str, value: impl Into<RuleValue>) -> Self {
        self.rules.insert(property.to_string(), value.into());
        self
    }

    pub fn selector(mut self, fragment: &str, rules: Rules) -> Self {
        self.selectors
            .entry(fragment.to_string())
            .or_default()
            .rules
            .extend(rules);
        self
    }

    pub fn media_query(mut self, query: &str, block: MediaQueryBlock) -> Self {
        self.media_queries.insert(query.to_string(), block);
        self
    }

    pub fn parent(mut self, selector: &str, spec: Specification) -> Self {
        self.parents.insert(selector.to_string(), spec);
        self
    }
}

/// One declared stylesheet: style name → specification, in declaration order.
pub type StyleSheet = IndexMap<String, Specification>;

/// Whether a style name is a global selector (`$body`) rather than a class.
pub fn is_global(name: &str) -> bool {
    name.starts_with('$')
}
