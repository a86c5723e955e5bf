//! Class names for logical style names.
//!
//! Uncompressed names stay readable (`x_y_js-styles-button`) so generated CSS can be
//! traced back to its source. Compressed names are short tokens handed out by a
//! [`NameCache`], keyed by the uncompressed name.

use crate::cache::NameCache;
use crate::error::Result;

const SEPARATOR: char = '-';
const REPLACEMENT: char = '_';

/// Build the class name for `name` under `prefixes`.
///
/// # Arguments
///
/// * `name` - The logical style name, without any selector fragment.
/// * `prefixes` - Ordered scope parts, e.g. the source file and the sheet identifier.
/// * `compress` - Replace the readable name with a cached short token.
/// * `cache` - Token store consulted only when `compress` is set.
pub fn generate_class_name(
    name: &str,
    prefixes: &[String],
    compress: bool,
    cache: &NameCache,
) -> Result<String> {
    let class_name = readable_class_name(name, prefixes);
    if compress {
        compress_class_name(&class_name, cache)
    } else {
        Ok(class_name)
    }
}

/// `prefixes ++ [name]`, sanitized and joined with `-`. Empty parts are skipped.
pub fn readable_class_name(name: &str, prefixes: &[String]) -> String {
    let mut class_name = String::new();
    for part in prefixes
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(name))
        .filter(|part| !part.is_empty())
    {
        if !class_name.is_empty() {
            class_name.push(SEPARATOR);
        }
        class_name.extend(part.chars().map(sanitize_char));
    }
    class_name
}

/// Look up (or assign) the short token for an uncompressed class name.
pub fn compress_class_name(class_name: &str, cache: &NameCache) -> Result<String> {
    cache.fetch(class_name, |existing| compressed_token(existing.len()))
}

/// `_` followed by the base-36 digits of `index`, least significant first.
///
/// Distinct indices always give distinct tokens, and every token is a valid CSS
/// identifier because it starts with `_`.
pub fn compressed_token(index: usize) -> String {
    let mut token = String::from("_");
    let mut rest = index;
    loop {
        let digit = (rest % 36) as u32;
        token.push(std::char::from_digit(digit, 36).unwrap_or('0'));
        rest /= 36;
        if rest == 0 {
            break;
        }
    }
    token
}

fn sanitize_char(c: char) -> char {
    if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
        c
    } else {
        REPLACEMENT
    }
}
