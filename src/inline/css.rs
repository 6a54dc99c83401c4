//! CSS inlining.
//!
//! Every `<style>` carrying the inline marker is pulled out of the document,
//! its rules are matched against the remaining elements, and the matched
//! declarations are written into each element's `style` attribute.
//!
//! The cascade is deliberately flat:
//!
//! - rules apply in stylesheet order, a later declaration replaces an earlier
//!   one for the same property (no specificity)
//! - any selector containing `:` is skipped outright
//! - within one rule, `!important` declarations follow the normal ones, as
//!   lightningcss keeps the two groups apart
//! - authored inline styles are appended after the generated ones, so they
//!   still win in the client
//! - `class` is removed from every styled element

use super::{context::InlinerContext, selector};
use crate::dom::{Document, NodeId};
use crate::error::{ErrorCategory, InlineError};
use lightningcss::{
    properties::Property,
    rules::CssRule,
    stylesheet::{ParserOptions, PrinterOptions, StyleSheet},
    traits::ToCss,
};
use rustc_hash::FxHashMap;

const STYLE_TAG: &str = "style";
const INLINE_MARKER: &str = "inline";

/// Ordered `property → value` pairs collected for one element.
#[derive(Debug, Default)]
struct StyleMap(Vec<(String, String)>);

impl StyleMap {
    fn set(&mut self, property: &str, value: String) {
        match self.0.iter_mut().find(|(p, _)| p == property) {
            Some(entry) => entry.1 = value,
            None => self.0.push((property.to_owned(), value)),
        }
    }

    fn render(&self) -> String {
        self.0
            .iter()
            .map(|(p, v)| format!("{p}:{v};"))
            .collect()
    }
}

/// Inline all marked stylesheets into `doc`.
pub fn inline_styles(doc: &mut Document, ctx: &mut InlinerContext) -> Result<(), InlineError> {
    let css = extract_marked_styles(doc);
    if css.trim().is_empty() {
        return Ok(());
    }

    let sheet = StyleSheet::parse(
        &css,
        ParserOptions {
            error_recovery: true,
            ..ParserOptions::default()
        },
    )
    .map_err(|e| InlineError::Css(e.to_string()))?;

    let mut styles: FxHashMap<NodeId, StyleMap> = FxHashMap::default();
    let mut order: Vec<NodeId> = Vec::new();

    for rule in &sheet.rules.0 {
        let CssRule::Style(rule) = rule else {
            continue;
        };
        let Ok(selector_text) = rule.selectors.to_css_string(PrinterOptions::default()) else {
            continue;
        };
        if selector_text.contains(':') {
            continue;
        }
        if !rule.selectors.0.iter().all(selector::is_supported) {
            ctx.warn(
                ErrorCategory::Parse,
                format!("unsupported selector `{selector_text}`"),
            );
            continue;
        }

        let declarations: Vec<(String, String)> = rule
            .declarations
            .iter()
            .filter_map(|(p, important)| declaration(p, important))
            .collect();
        if declarations.is_empty() {
            continue;
        }

        for element in selector::select(&rule.selectors, doc) {
            let map = styles.entry(element).or_insert_with(|| {
                order.push(element);
                StyleMap::default()
            });
            for (property, value) in &declarations {
                map.set(property, value.clone());
            }
        }
    }

    for element in order {
        let Some(map) = styles.get(&element) else {
            continue;
        };
        let Some(el) = doc.element_mut(element) else {
            continue;
        };
        let mut style = map.render();
        if let Some(existing) = el.attr("style") {
            style.push_str(existing);
        }
        el.set_attr("style", style);
        el.remove_attr("class");
    }

    Ok(())
}

/// Remove every marked `<style>` and return their concatenated text.
fn extract_marked_styles(doc: &mut Document) -> String {
    let mut css = String::new();
    for style in doc.elements_by_name(doc.root(), STYLE_TAG) {
        if doc
            .element(style)
            .is_some_and(|el| el.has_marker(INLINE_MARKER))
        {
            css.push_str(&doc.text_content(style));
            css.push('\n');
            doc.detach(style);
        }
    }
    css
}

/// Split a declaration into `(property, value)`.
fn declaration(property: &Property<'_>, important: bool) -> Option<(String, String)> {
    let text = property
        .to_css_string(false, PrinterOptions::default())
        .ok()?;
    let (name, value) = text.split_once(':')?;
    let value = value.trim();
    let value = if important {
        format!("{value} !important")
    } else {
        value.to_owned()
    };
    Some((name.trim().to_owned(), value))
}
