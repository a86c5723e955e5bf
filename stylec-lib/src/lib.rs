//! Build-time compiler for nested style objects.
//!
//! A raw style object (style name → properties, selectors and media queries) is
//! normalized into [`spec::Specification`] trees, which are turned into CSS text plus a
//! table of generated class names:
//!
//! ```ignore
//! let cache = NameCache::for_options(&options);
//! let compiled = compile_source("src/Button.js", &sheets, &options, &cache)?;
//! // compiled.class_names["styles"]["button"] == "src_Button_js-styles-button"
//! ```

pub mod cache;
pub mod class_name;
pub mod css;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod spec;

pub use cache::{clear_cache, NameCache};
pub use error::{Error, NestingViolation, Result};
pub use options::{BrowserTargets, Options, VendorPrefixes};
pub use pipeline::{build_css, compile_source, source_identifier, CompiledSource};
pub use spec::{normalize, Specification, StyleSheet};
