//! `property: value;` lines from camelCase property names and raw values.

use crate::spec::RuleValue;

const DEFAULT_UNIT: &str = "px";

/// Properties whose numeric values are meaningful without a unit.
const UNITLESS_PROPERTIES: &[&str] = &[
    "animationIterationCount",
    "borderImageOutset",
    "borderImageSlice",
    "borderImageWidth",
    "boxFlex",
    "boxFlexGroup",
    "boxOrdinalGroup",
    "columnCount",
    "columns",
    "flex",
    "flexGrow",
    "flexPositive",
    "flexShrink",
    "flexNegative",
    "flexOrder",
    "gridArea",
    "gridRow",
    "gridRowEnd",
    "gridRowSpan",
    "gridRowStart",
    "gridColumn",
    "gridColumnEnd",
    "gridColumnSpan",
    "gridColumnStart",
    "fontWeight",
    "lineClamp",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "tabSize",
    "widows",
    "zIndex",
    "zoom",
    "fillOpacity",
    "floodOpacity",
    "stopOpacity",
    "strokeDasharray",
    "strokeDashoffset",
    "strokeMiterlimit",
    "strokeOpacity",
    "strokeWidth",
];

/// `content` values that must not be quoted.
const CONTENT_KEYWORDS: &[&str] = &[
    "none",
    "normal",
    "open-quote",
    "close-quote",
    "no-open-quote",
    "no-close-quote",
    "inherit",
    "initial",
    "unset",
    "revert",
];

/// Serialize one declaration, e.g. `("marginTop", 0)` → `margin-top: 0px;`.
pub fn build_css_rule(property: &str, value: &RuleValue) -> String {
    format!("{}: {};", hyphenate(property), css_value(property, value))
}

/// `marginTop` → `margin-top`, `WebkitFlex` → `-webkit-flex`, `msFlex` → `-ms-flex`.
pub fn hyphenate(property: &str) -> String {
    let mut name = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            name.push('-');
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    if name.starts_with("ms-") {
        name.insert(0, '-');
    }
    name
}

fn css_value(property: &str, value: &RuleValue) -> String {
    match value {
        RuleValue::Number(number) if is_unitless(property) => number.to_string(),
        RuleValue::Number(number) => format!("{}{}", number, DEFAULT_UNIT),
        RuleValue::Text(text) if property == "content" => content_value(text),
        RuleValue::Text(text) => text.clone(),
    }
}

fn is_unitless(property: &str) -> bool {
    UNITLESS_PROPERTIES.contains(&property)
}

fn content_value(text: &str) -> String {
    let trimmed = text.trim();
    let already_literal = trimmed.starts_with('"')
        || trimmed.starts_with('\'')
        || CONTENT_KEYWORDS.contains(&trimmed)
        || is_function_call(trimmed);

    if already_literal && !trimmed.is_empty() {
        text.to_string()
    } else {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// `attr(title)`, `counter(item) ". "` and the like.
fn is_function_call(text: &str) -> bool {
    match text.find('(') {
        Some(open) if open > 0 => {
            text[..open]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
                && text.contains(')')
        }
        _ => false,
    }
}
