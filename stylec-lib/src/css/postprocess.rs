//! Vendor prefixing and minification of generated CSS, delegated to LightningCSS.
//!
//! Each top-level block is handed to LightningCSS on its own, so blocks produced for
//! different styles are never merged into one rule. Blocks for at-rules LightningCSS
//! does not know (an unmapped media alias such as `@mobile`) are kept as written.

use crate::error::{Error, Result};
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use log::warn;

/// Add the prefixed forms `browsers` need. Output stays pretty-printed.
pub fn add_vendor_prefixes(css: &str, browsers: Browsers) -> Result<String> {
    let blocks = transform_blocks(css, Some(browsers), false)?;
    if blocks.is_empty() {
        return Ok(String::new());
    }
    Ok(blocks.join("\n") + "\n")
}

/// Minify without any browser-specific rewriting.
pub fn minify_css(css: &str) -> Result<String> {
    Ok(transform_blocks(css, None, true)?.concat())
}

fn transform_blocks(css: &str, browsers: Option<Browsers>, minify: bool) -> Result<Vec<String>> {
    top_level_blocks(css)
        .iter()
        .map(|block| transform(block, browsers, minify))
        .collect()
}

fn transform(block: &str, browsers: Option<Browsers>, minify: bool) -> Result<String> {
    let mut stylesheet = StyleSheet::parse(block, ParserOptions::default())
        .map_err(|e| Error::PostProcess(format!("parse error: {}", e)))?;

    let unknown = stylesheet.rules.0.iter().find_map(|rule| match rule {
        CssRule::Unknown(at_rule) => Some(at_rule.name.to_string()),
        _ => None,
    });
    if let Some(name) = unknown {
        warn!("`@{}` is not a known at-rule, left as written", name);
        return Ok(block.trim_end().to_string());
    }

    let targets = browsers.map(Targets::from).unwrap_or_default();

    stylesheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..Default::default()
        })
        .map_err(|e| Error::PostProcess(format!("transform error: {}", e)))?;

    let printer_options = PrinterOptions {
        minify,
        targets,
        ..Default::default()
    };

    let output = stylesheet
        .to_css(printer_options)
        .map_err(|e| Error::PostProcess(format!("print error: {}", e)))?;

    Ok(output.code.trim_end().to_string())
}

/// Split pretty-printed CSS into its top-level blocks. A block ends at a line that is
/// exactly `}`.
fn top_level_blocks(css: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in css.lines() {
        if line.trim().is_empty() {
            continue;
        }
        current.push_str(line);
        current.push('\n');
        if line == "}" {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        blocks.push(current);
    }
    blocks
}
