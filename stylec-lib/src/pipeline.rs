//! One compiled source file: normalize its stylesheets, name their classes, build CSS.

use crate::cache::NameCache;
use crate::class_name::generate_class_name;
use crate::css::{add_vendor_prefixes, generate_css, minify_css};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::spec::{is_global, kind_name, normalize, StyleSheet};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use serde_json::Value;
use std::path::{Component, Path};

/// Identifier used for sources that have no file name.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Style name → class name, for one stylesheet.
pub type ClassNames = IndexMap<String, String>;

/// Everything the host needs after compiling one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompiledSource {
    pub file: String,
    /// Sheet id → style name → class name. Global selectors are not listed.
    pub class_names: IndexMap<String, ClassNames>,
    /// Empty when nothing was generated; there is then nothing to write.
    pub css: String,
}

/// Compile every stylesheet declared in one source file.
///
/// # Arguments
///
/// * `file` - The source identifier, usually its path relative to the project root.
/// * `sheets` - Sheet id → raw style object, as extracted from the source.
/// * `options` - Compiler options.
/// * `cache` - Token store used when class names are compressed.
pub fn compile_source(
    file: &str,
    sheets: &Value,
    options: &Options,
    cache: &NameCache,
) -> Result<CompiledSource> {
    let Value::Object(raw_sheets) = sheets else {
        return Err(Error::InvalidInputKind {
            path: file.to_string(),
            found: kind_name(sheets),
        });
    };

    let mut stylesheets = IndexMap::new();
    let mut class_names = IndexMap::new();

    for (sheet_id, raw) in raw_sheets {
        let sheet = normalize(raw)?;
        class_names.insert(
            sheet_id.clone(),
            name_table(&sheet, file, sheet_id, options, cache)?,
        );
        stylesheets.insert(sheet_id.clone(), sheet);
    }

    let css = build_css(&stylesheets, file, options, cache)?;
    debug!(
        "compiled {}: {} sheet(s), {} bytes of CSS",
        file,
        stylesheets.len(),
        css.len()
    );

    Ok(CompiledSource {
        file: file.to_string(),
        class_names,
        css,
    })
}

/// Generate and concatenate CSS for every stylesheet of one source file, then hand the
/// result to the vendor prefixer and the minifier (in that order) when enabled.
///
/// Returns an empty string when no stylesheet produced any CSS.
pub fn build_css(
    stylesheets: &IndexMap<String, StyleSheet>,
    file: &str,
    options: &Options,
    cache: &NameCache,
) -> Result<String> {
    let mut css = String::new();

    for (sheet_id, sheet) in stylesheets {
        let sheet_options = sheet_options(options, file, sheet_id);
        let fragment = generate_css(sheet, &sheet_options, cache)?;
        debug!("{} / {}: {} bytes", file, sheet_id, fragment.len());

        if !fragment.is_empty() {
            css.push_str(&fragment);
            css.push('\n');
        }
    }

    if css.is_empty() {
        return Ok(css);
    }

    if let Some(browsers) = options.vendor_prefixes.browsers() {
        css = add_vendor_prefixes(&css, browsers)?;
    }

    if options.minify {
        css = minify_css(&css)?;
    }

    Ok(css)
}

/// Turn a source path into the identifier used in class names: relative to `root`
/// when possible, always with `/` separators.
pub fn source_identifier(path: Option<&Path>, root: &Path) -> String {
    let Some(path) = path else {
        return UNKNOWN_SOURCE.to_string();
    };
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The options one sheet is generated with: class names scoped to `[file, sheet]`.
fn sheet_options(options: &Options, file: &str, sheet_id: &str) -> Options {
    Options {
        prefixes: vec![file.to_string(), sheet_id.to_string()],
        ..options.clone()
    }
}

fn name_table(
    sheet: &StyleSheet,
    file: &str,
    sheet_id: &str,
    options: &Options,
    cache: &NameCache,
) -> Result<ClassNames> {
    let prefixes = sheet_options(options, file, sheet_id).class_prefixes();
    let mut names = ClassNames::new();
    for style_name in sheet.keys().filter(|name| !is_global(name)) {
        let class_name = generate_class_name(
            style_name,
            &prefixes,
            options.compress_class_names,
            cache,
        )?;
        names.insert(style_name.clone(), class_name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_source_identifier() {
        let root = PathBuf::from("/project");
        assert_eq!(
            source_identifier(Some(Path::new("/project/x/y.js")), &root),
            "x/y.js"
        );
        assert_eq!(
            source_identifier(Some(Path::new("other/z.js")), &root),
            "other/z.js"
        );
        assert_eq!(
            source_identifier(Some(Path::new("/elsewhere/./a.js")), &root),
            "elsewhere/a.js"
        );
        assert_eq!(source_identifier(None, &root), UNKNOWN_SOURCE);
    }

    #[test]
    fn test_empty_stylesheet_produces_no_css() {
        let cache = NameCache::in_memory("pipeline-test-empty");
        let compiled =
            compile_source("test", &json!({ "styles": {} }), &Options::default(), &cache).unwrap();

        assert_eq!(compiled.css, "");
        assert_eq!(compiled.class_names["styles"], ClassNames::new());
    }

    #[test]
    fn test_sheets_must_be_an_object() {
        let cache = NameCache::in_memory("pipeline-test-kind");
        let err = compile_source("test", &json!([]), &Options::default(), &cache).unwrap_err();
        assert!(matches!(err, Error::InvalidInputKind { .. }));
    }

    #[test]
    fn test_name_table_skips_globals() {
        let cache = NameCache::in_memory("pipeline-test-globals");
        let compiled = compile_source(
            "x/y.js",
            &json!({ "styles": { "$body": { "margin": 0 }, "foo": { "margin": 0 } } }),
            &Options::default(),
            &cache,
        )
        .unwrap();

        let names = &compiled.class_names["styles"];
        assert_eq!(names.len(), 1);
        assert_eq!(names["foo"], "x_y_js-styles-foo");
        assert_eq!(
            compiled.css,
            "body {\n  margin: 0px;\n}\n.x_y_js-styles-foo {\n  margin: 0px;\n}\n"
        );
    }
}
