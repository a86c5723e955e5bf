//! Raw nested style objects → [`StyleSheet`].
//!
//! Nesting rules are enforced by threading a [`Context`] down the recursion: each way
//! of going one level deeper is a single transition on it, and each illegal
//! transition is the single place its error is raised.

use super::key::{classify_key, is_selector_like, KeyKind};
use super::{Rules, RuleValue, Specification, StyleSheet};
use crate::error::{Error, NestingViolation, Result, RuleValueProblem};
use log::debug;
use serde_json::{Map, Value};

/// Where in a style block the normalizer currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Context {
    /// Directly inside a style block.
    Style,
    /// Inside a selector block. `composed` once a second fragment has been appended.
    Selector { fragment: String, composed: bool },
    /// Inside a media query, directly inside the style block.
    Media { query: String },
    /// Inside a selector block inside a media query.
    MediaSelector {
        query: String,
        fragment: String,
        composed: bool,
    },
}

impl Context {
    fn enter_media(&self, query: &str, key: &str) -> Result<Context> {
        match self {
            Context::Style => Ok(Context::Media {
                query: query.to_string(),
            }),
            Context::Media { .. } | Context::MediaSelector { .. } => {
                Err(nesting(NestingViolation::MediaInMedia, key))
            }
            Context::Selector { .. } => Err(nesting(NestingViolation::MediaInSelector, key)),
        }
    }

    fn enter_selector(&self, fragment: &str, key: &str) -> Result<Context> {
        match self {
            Context::Style => Ok(Context::Selector {
                fragment: fragment.to_string(),
                composed: false,
            }),
            Context::Media { query } => Ok(Context::MediaSelector {
                query: query.clone(),
                fragment: fragment.to_string(),
                composed: false,
            }),
            Context::Selector {
                fragment: outer,
                composed: false,
            } => Ok(Context::Selector {
                fragment: format!("{}{}", outer, fragment),
                composed: true,
            }),
            Context::MediaSelector {
                query,
                fragment: outer,
                composed: false,
            } => Ok(Context::MediaSelector {
                query: query.clone(),
                fragment: format!("{}{}", outer, fragment),
                composed: true,
            }),
            Context::Selector { composed: true, .. }
            | Context::MediaSelector { composed: true, .. } => {
                Err(nesting(NestingViolation::SelectorInSelector, key))
            }
        }
    }

    /// Enter the fragment carried by a style key, if any.
    fn with_fragment(self, fragment: &str, key: &str) -> Result<Context> {
        if fragment.is_empty() {
            Ok(self)
        } else {
            self.enter_selector(fragment, key)
        }
    }

    /// The rule map this context writes into, created on first use.
    fn rules_mut<'s>(&self, spec: &'s mut Specification) -> &'s mut Rules {
        match self {
            Context::Style => &mut spec.rules,
            Context::Selector { fragment, .. } => {
                &mut spec.selectors.entry(fragment.clone()).or_default().rules
            }
            Context::Media { query } => {
                &mut spec.media_queries.entry(query.clone()).or_default().rules
            }
            Context::MediaSelector {
                query, fragment, ..
            } => {
                &mut spec
                    .media_queries
                    .entry(query.clone())
                    .or_default()
                    .selectors
                    .entry(fragment.clone())
                    .or_default()
                    .rules
            }
        }
    }
}

/// Validate and reshape a raw style object.
///
/// Entries that resolve to the same style name are merged in declaration order; a
/// later value for the same property replaces the earlier one in place.
pub fn normalize(raw: &Value) -> Result<StyleSheet> {
    let object = expect_object(raw, "<stylesheet>")?;
    let mut sheet = StyleSheet::new();

    for (key, value) in object {
        match classify_key(key)? {
            KeyKind::MediaQuery(query) => {
                normalize_top_level_media(&mut sheet, key, query, value)?;
            }
            KeyKind::Selector(_) => {
                return Err(Error::StandaloneSelectorNotAllowed { key: key.clone() });
            }
            kind if kind.is_standalone_global() => {
                return Err(Error::StandaloneSelectorNotAllowed { key: key.clone() });
            }
            KeyKind::Style { base, fragment } | KeyKind::Global { base, fragment } => {
                let block = expect_object(value, key)?;
                let context = Context::Style.with_fragment(fragment, key)?;
                let spec = sheet.entry(base.to_string()).or_default();
                normalize_block(spec, &context, block, key)?;
            }
        }
    }

    debug!("normalized {} style(s)", sheet.len());
    Ok(sheet)
}

fn normalize_top_level_media(
    sheet: &mut StyleSheet,
    media_key: &str,
    query: &str,
    value: &Value,
) -> Result<()> {
    let block = expect_object(value, media_key)?;

    for (key, value) in block {
        match classify_key(key)? {
            KeyKind::MediaQuery(_) => {
                return Err(nesting(NestingViolation::MediaInMedia, key));
            }
            KeyKind::Selector(_) => {
                return Err(standalone_in_media(key, query));
            }
            kind if kind.is_standalone_global() => {
                return Err(standalone_in_media(key, query));
            }
            KeyKind::Style { base, fragment } | KeyKind::Global { base, fragment } => {
                let style_block = expect_object(value, key)?;
                let context = Context::Media {
                    query: query.to_string(),
                }
                .with_fragment(fragment, key)?;
                let spec = sheet.entry(base.to_string()).or_default();
                normalize_block(spec, &context, style_block, key)?;
            }
        }
    }
    Ok(())
}

fn normalize_block(
    spec: &mut Specification,
    context: &Context,
    block: &Map<String, Value>,
    path: &str,
) -> Result<()> {
    // Entering a block creates its entry even if it ends up holding no rules.
    context.rules_mut(spec);

    for (key, value) in block {
        let key_path = format!("{} > {}", path, key);

        if let Value::Object(nested) = value {
            let nested_context = match classify_key(key)? {
                KeyKind::MediaQuery(query) => context.enter_media(query, key)?,
                KeyKind::Selector(fragment) => context.enter_selector(fragment, key)?,
                KeyKind::Style { fragment: "", .. } => {
                    return Err(Error::InvalidRuleValue {
                        property: key_path,
                        reason: RuleValueProblem::NotScalar,
                    });
                }
                KeyKind::Style { .. } | KeyKind::Global { .. } => {
                    return Err(nesting(NestingViolation::SelectorInSelector, key));
                }
            };
            normalize_block(spec, &nested_context, nested, &key_path)?;
        } else if is_selector_like(key) {
            return Err(Error::InvalidInputKind {
                path: key_path,
                found: kind_name(value),
            });
        } else {
            let rule = rule_value(key, value, &key_path)?;
            context.rules_mut(spec).insert(key.clone(), rule);
        }
    }
    Ok(())
}

/// Only strings and numbers are rule values; only `content` may be blank.
fn rule_value(property: &str, value: &Value, path: &str) -> Result<RuleValue> {
    let problem = |reason| Error::InvalidRuleValue {
        property: path.to_string(),
        reason,
    };

    match value {
        Value::String(text) => {
            if property != "content" && text.trim().is_empty() {
                return Err(problem(RuleValueProblem::Blank));
            }
            Ok(RuleValue::Text(text.clone()))
        }
        Value::Number(number) => number
            .as_f64()
            .map(RuleValue::Number)
            .ok_or_else(|| problem(RuleValueProblem::NotScalar)),
        _ => Err(problem(RuleValueProblem::NotScalar)),
    }
}

fn expect_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidInputKind {
            path: path.to_string(),
            found: kind_name(other),
        }),
    }
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn nesting(violation: NestingViolation, key: &str) -> Error {
    Error::IllegalNesting {
        violation,
        key: key.to_string(),
    }
}

fn standalone_in_media(key: &str, query: &str) -> Error {
    Error::StandaloneSelectorInMediaQuery {
        key: key.to_string(),
        query: query.to_string(),
    }
}
