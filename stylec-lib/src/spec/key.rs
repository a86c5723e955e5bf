//! Classification of raw style-object keys.
//!
//! Keys are told apart purely by their leading character (`@`, `:`, `[`, `$`); this is
//! the only place that looks at those prefixes.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind<'k> {
    /// `@media screen` → `media screen`.
    MediaQuery(&'k str),
    /// A bare fragment such as `:hover` or `[disabled]:focus`.
    Selector(&'k str),
    /// `button` or `button:hover`. `fragment` is empty when there is none.
    Style { base: &'k str, fragment: &'k str },
    /// `$body` or `$body:hover`. `base` keeps the `$` and is `"$"` when nothing follows.
    Global { base: &'k str, fragment: &'k str },
}

impl KeyKind<'_> {
    /// A global key with no selector text of its own, such as `$` or `$:hover`.
    pub fn is_standalone_global(&self) -> bool {
        matches!(self, KeyKind::Global { base: "$", .. })
    }
}

/// Whether `key` has to be classified rather than read as a property name.
pub fn is_selector_like(key: &str) -> bool {
    key.starts_with(['@', ':', '['])
}

pub fn classify_key(key: &str) -> Result<KeyKind<'_>> {
    if let Some(query) = key.strip_prefix('@') {
        if query.trim().is_empty() {
            return Err(invalid(key));
        }
        return Ok(KeyKind::MediaQuery(query));
    }

    if key.starts_with([':', '[']) {
        validate_fragment(key, key)?;
        return Ok(KeyKind::Selector(key));
    }

    if let Some(selector) = key.strip_prefix('$') {
        // `$ :hover` has no selector text of its own either.
        let own_text = selector.trim_start();
        if own_text.is_empty() || own_text.starts_with([':', '[']) {
            validate_fragment(key, own_text)?;
            return Ok(KeyKind::Global {
                base: "$",
                fragment: own_text,
            });
        }
        // Literal selector text with combinators is taken as-is.
        if selector.contains(char::is_whitespace) {
            return Ok(KeyKind::Global {
                base: key,
                fragment: "",
            });
        }
        let (base, fragment) = split_fragment(key);
        validate_fragment(key, fragment)?;
        return Ok(KeyKind::Global { base, fragment });
    }

    let (base, fragment) = split_fragment(key);
    if base.is_empty() || base.contains(char::is_whitespace) {
        return Err(invalid(key));
    }
    validate_fragment(key, fragment)?;
    Ok(KeyKind::Style { base, fragment })
}

fn split_fragment(key: &str) -> (&str, &str) {
    match key.find([':', '[']) {
        Some(index) => key.split_at(index),
        None => (key, ""),
    }
}

/// A fragment is a run of `:pseudo`, `:pseudo(args)`, `::element` and `[attr...]`
/// parts. Whitespace is only allowed inside brackets or parentheses.
fn validate_fragment(key: &str, fragment: &str) -> Result<()> {
    let mut closers = Vec::new();
    let mut after_attribute = false;

    for c in fragment.chars() {
        if after_attribute && closers.is_empty() && c != ':' && c != '[' {
            return Err(invalid(key));
        }
        after_attribute = false;

        match c {
            '[' => closers.push(']'),
            '(' => closers.push(')'),
            ']' | ')' => {
                if closers.pop() != Some(c) {
                    return Err(invalid(key));
                }
                after_attribute = c == ']' && closers.is_empty();
            }
            c if c.is_whitespace() && closers.is_empty() => return Err(invalid(key)),
            _ => {}
        }
    }

    if closers.is_empty() {
        Ok(())
    } else {
        Err(invalid(key))
    }
}

fn invalid(key: &str) -> Error {
    Error::InvalidStyleName {
        name: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classifies_each_kind() {
        assert_eq!(
            classify_key("@media print").unwrap(),
            KeyKind::MediaQuery("media print")
        );
        assert_eq!(classify_key(":hover").unwrap(), KeyKind::Selector(":hover"));
        assert_eq!(
            classify_key("foo").unwrap(),
            KeyKind::Style {
                base: "foo",
                fragment: ""
            }
        );
        assert_eq!(
            classify_key("foo[disabled]:active").unwrap(),
            KeyKind::Style {
                base: "foo",
                fragment: "[disabled]:active"
            }
        );
        assert_eq!(
            classify_key("$body:hover").unwrap(),
            KeyKind::Global {
                base: "$body",
                fragment: ":hover"
            }
        );
    }

    #[test]
    fn test_global_with_combinators_is_literal() {
        assert_eq!(
            classify_key("$body > p:first-child").unwrap(),
            KeyKind::Global {
                base: "$body > p:first-child",
                fragment: ""
            }
        );
    }

    #[test]
    fn test_standalone_globals() {
        assert!(classify_key("$").unwrap().is_standalone_global());
        assert!(classify_key("$:hover").unwrap().is_standalone_global());
        assert!(!classify_key("$html").unwrap().is_standalone_global());
        assert!(classify_key("$ :hover").unwrap().is_standalone_global());
        assert!(classify_key("$  ").unwrap().is_standalone_global());
        assert!(classify_key("$ [open]").unwrap().is_standalone_global());
    }

    #[test]
    fn test_whitespace_only_inside_brackets() {
        assert!(classify_key("foo bar").is_err());
        assert!(classify_key("foo :hover").is_err());
        assert!(classify_key("foo[title='a b']").is_ok());
        assert!(classify_key("foo:not(.a .b)").is_ok());
    }

    #[test]
    fn test_malformed_fragments_are_rejected() {
        assert!(classify_key("foo[disabled").is_err());
        assert!(classify_key("foo[a]b").is_err());
        assert!(classify_key("foo:not(.a]").is_err());
        assert!(classify_key("@").is_err());
    }
}
