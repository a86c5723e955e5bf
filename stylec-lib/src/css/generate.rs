use super::rule::build_css_rule;
use crate::cache::NameCache;
use crate::class_name::generate_class_name;
use crate::error::Result;
use crate::options::Options;
use crate::spec::{is_global, MediaQueryBlock, Rules, Specification, StyleSheet};
use log::trace;

const INDENT: &str = "  ";

/// Generate CSS for one stylesheet with the class-name settings in `options`.
pub fn generate_css(sheet: &StyleSheet, options: &Options, cache: &NameCache) -> Result<String> {
    CssGenerator::new(options, cache).generate(sheet)
}

/// Walks specifications depth-first and emits rule blocks in declaration order.
///
/// Empty rule sets never produce a block, and a media query whose content is
/// entirely empty is dropped along with its `@` wrapper.
pub struct CssGenerator<'a> {
    options: &'a Options,
    prefixes: Vec<String>,
    cache: &'a NameCache,
}

impl<'a> CssGenerator<'a> {
    pub fn new(options: &'a Options, cache: &'a NameCache) -> Self {
        CssGenerator {
            options,
            prefixes: options.class_prefixes(),
            cache,
        }
    }

    pub fn generate(&self, sheet: &StyleSheet) -> Result<String> {
        let mut css = Vec::new();
        for (name, spec) in sheet {
            self.process_style(&mut css, name, spec, 0, None)?;
        }
        Ok(css.join("\n"))
    }

    fn process_style(
        &self,
        css: &mut Vec<String>,
        name: &str,
        spec: &Specification,
        level: usize,
        parent: Option<&str>,
    ) -> Result<()> {
        trace!("generating `{}` (parent: {:?})", name, parent);

        self.process_rules(css, name, "", &spec.rules, level, parent)?;
        for (fragment, block) in &spec.selectors {
            self.process_rules(css, name, fragment, &block.rules, level, parent)?;
        }
        for (query, block) in &spec.media_queries {
            self.process_media_query(css, name, query, block, level, parent)?;
        }
        for (parent_selector, parent_spec) in &spec.parents {
            let scope = match parent {
                Some(outer) => format!("{} {}", outer, parent_selector),
                None => parent_selector.clone(),
            };
            self.process_style(css, name, parent_spec, level, Some(&scope))?;
        }
        Ok(())
    }

    fn process_rules(
        &self,
        css: &mut Vec<String>,
        name: &str,
        fragment: &str,
        rules: &Rules,
        level: usize,
        parent: Option<&str>,
    ) -> Result<()> {
        if rules.is_empty() {
            return Ok(());
        }

        let selector = self.selector(name, fragment, parent)?;
        css.push(format!("{}{} {{", indent(level), selector));
        for (property, value) in rules {
            css.push(format!("{}{}", indent(level + 1), build_css_rule(property, value)));
        }
        css.push(format!("{}}}", indent(level)));
        Ok(())
    }

    fn process_media_query(
        &self,
        css: &mut Vec<String>,
        name: &str,
        query: &str,
        block: &MediaQueryBlock,
        level: usize,
        parent: Option<&str>,
    ) -> Result<()> {
        let mut media_css = Vec::new();
        self.process_rules(&mut media_css, name, "", &block.rules, level + 1, parent)?;
        for (fragment, selector_block) in &block.selectors {
            self.process_rules(
                &mut media_css,
                name,
                fragment,
                &selector_block.rules,
                level + 1,
                parent,
            )?;
        }

        if !media_css.is_empty() {
            let resolved = self.options.resolve_media_query(query);
            css.push(format!("{}@{} {{", indent(level), resolved));
            css.append(&mut media_css);
            css.push(format!("{}}}", indent(level)));
        }
        Ok(())
    }

    /// `.class-name:fragment`, `parent .class-name:fragment`, or the literal text of a
    /// global selector (which ignores parents).
    fn selector(&self, name: &str, fragment: &str, parent: Option<&str>) -> Result<String> {
        if is_global(name) {
            return Ok(format!("{}{}", &name[1..], fragment));
        }

        let class_name = generate_class_name(
            name,
            &self.prefixes,
            self.options.compress_class_names,
            self.cache,
        )?;
        Ok(match parent {
            Some(parent) => format!("{} .{}{}", parent, class_name, fragment),
            None => format!(".{}{}", class_name, fragment),
        })
    }
}

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}
