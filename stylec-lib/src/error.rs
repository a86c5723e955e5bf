//! Error types shared by every stage of the stylesheet compiler.
//!
//! All variants are fatal for the source file being compiled: the pipeline never
//! downgrades them or produces partial output.

use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which nesting rule a style object broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingViolation {
    /// A style key inside a style block, or a fragment nested past one composition.
    SelectorInSelector,
    /// An `@` block inside another media query.
    MediaInMedia,
    /// An `@` block inside a pseudo/attribute selector block.
    MediaInSelector,
}

impl fmt::Display for NestingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            NestingViolation::SelectorInSelector => "styles cannot be nested into each other",
            NestingViolation::MediaInMedia => "media queries cannot be nested into each other",
            NestingViolation::MediaInSelector => "media queries cannot be nested into selectors",
        };
        f.write_str(message)
    }
}

/// Why a rule value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleValueProblem {
    NotScalar,
    Blank,
}

impl fmt::Display for RuleValueProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValueProblem::NotScalar => f.write_str("value must be a number or a string"),
            RuleValueProblem::Blank => f.write_str("string value cannot be blank"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("value must be a plain object (found {found} at `{path}`)")]
    InvalidInputKind { path: String, found: &'static str },

    #[error("style name is invalid: `{name}`")]
    InvalidStyleName { name: String },

    #[error("{reason}: `{property}`")]
    InvalidRuleValue {
        property: String,
        reason: RuleValueProblem,
    },

    #[error("{violation}: `{key}`")]
    IllegalNesting {
        violation: NestingViolation,
        key: String,
    },

    #[error("stand-alone selectors are not allowed at the top-level: `{key}`")]
    StandaloneSelectorNotAllowed { key: String },

    #[error("stand-alone selectors are not allowed in top-level media queries: `{key}` in `@{query}`")]
    StandaloneSelectorInMediaQuery { key: String, query: String },

    #[error("class name cache storage failed at {}: {source}", path.display())]
    CacheStorage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSS post-processing failed: {0}")]
    PostProcess(String),

    #[error("invalid options: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn cache(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::CacheStorage {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_messages_name_the_broken_rule() {
        let err = Error::IllegalNesting {
            violation: NestingViolation::MediaInSelector,
            key: "@media".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "media queries cannot be nested into selectors: `@media`"
        );
    }

    #[test]
    fn test_blank_rule_value_message() {
        let err = Error::InvalidRuleValue {
            property: "color".to_string(),
            reason: RuleValueProblem::Blank,
        };
        assert_eq!(err.to_string(), "string value cannot be blank: `color`");
    }
}
