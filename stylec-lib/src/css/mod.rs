//! Specification trees → CSS text.

mod generate;
mod postprocess;
mod rule;

pub use generate::{generate_css, CssGenerator};
pub use postprocess::{add_vendor_prefixes, minify_css};
pub use rule::{build_css_rule, hyphenate};
