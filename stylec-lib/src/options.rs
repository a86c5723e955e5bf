//! Compiler options, deserialized from the same camelCase JSON shape the host
//! integration accepts.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use lightningcss::targets::Browsers;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Every option the pipeline recognizes. All fields have defaults, so `{}` is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Options {
    /// Name of the call the host looks for when extracting style objects.
    pub identifier: String,
    pub vendor_prefixes: VendorPrefixes,
    pub minify: bool,
    pub compress_class_names: bool,
    /// Short alias → literal media query text, e.g. `mobile` → `media (max-width: 600px)`.
    pub media_map: IndexMap<String, String>,
    /// `None` keeps compressed class names in a process-wide in-memory cache.
    pub cache_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub prefixes: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            identifier: "cssInJS".to_string(),
            vendor_prefixes: VendorPrefixes::default(),
            minify: false,
            compress_class_names: false,
            media_map: IndexMap::new(),
            cache_dir: None,
            prefix: None,
            prefixes: Vec::new(),
        }
    }
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// The ordered class-name prefixes: `prefix` first, then `prefixes`.
    pub fn class_prefixes(&self) -> Vec<String> {
        self.prefix
            .iter()
            .chain(self.prefixes.iter())
            .cloned()
            .collect()
    }

    /// Resolve a media query name through `mediaMap`. Names that already carry an `@`
    /// are literal and never remapped.
    pub fn resolve_media_query<'a>(&'a self, name: &'a str) -> &'a str {
        if name.starts_with('@') {
            return &name[1..];
        }
        match self.media_map.get(name) {
            Some(literal) => literal.strip_prefix('@').unwrap_or(literal),
            None => name,
        }
    }
}

/// `vendorPrefixes: false | true | { chrome: 40, safari: 9, ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VendorPrefixes {
    Enabled(bool),
    Targets(BrowserTargets),
}

impl Default for VendorPrefixes {
    fn default() -> Self {
        VendorPrefixes::Enabled(false)
    }
}

impl VendorPrefixes {
    /// Browser targets to prefix for, or `None` when prefixing is off.
    pub fn browsers(&self) -> Option<Browsers> {
        match self {
            VendorPrefixes::Enabled(false) => None,
            VendorPrefixes::Enabled(true) => Some(BrowserTargets::legacy().into()),
            VendorPrefixes::Targets(targets) => Some(targets.clone().into()),
        }
    }
}

/// Oldest major version to support per browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BrowserTargets {
    pub android: Option<u32>,
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub ie: Option<u32>,
    pub ios_saf: Option<u32>,
    pub opera: Option<u32>,
    pub safari: Option<u32>,
    pub samsung: Option<u32>,
}

impl BrowserTargets {
    /// Targets old enough that flexbox, transforms and friends still need prefixes.
    pub fn legacy() -> Self {
        BrowserTargets {
            android: Some(4),
            chrome: Some(20),
            firefox: Some(20),
            ie: Some(10),
            safari: Some(8),
            ..Default::default()
        }
    }
}

impl From<BrowserTargets> for Browsers {
    fn from(targets: BrowserTargets) -> Self {
        // lightningcss packs versions as major << 16 | minor << 8 | patch.
        let version = |major: Option<u32>| major.map(|m| m << 16);
        Browsers {
            android: version(targets.android),
            chrome: version(targets.chrome),
            edge: version(targets.edge),
            firefox: version(targets.firefox),
            ie: version(targets.ie),
            ios_saf: version(targets.ios_saf),
            opera: version(targets.opera),
            safari: version(targets.safari),
            samsung: version(targets.samsung),
        }
    }
}
