//! Mustache-style placeholder substitution.

use super::{MergeEngine, MergeError, Merger};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

/// `{{{ raw }}}` or `{{ escaped }}`.
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\{[ \t\r\n]*([^{}]*?)[ \t\r\n]*\}\}\}|\{\{[ \t\r\n]*([^{}]*?)[ \t\r\n]*\}\}")
        .unwrap()
});

#[derive(Debug, Default)]
pub struct PlaceholderMerger;

impl Merger for PlaceholderMerger {
    fn engine(&self) -> MergeEngine {
        MergeEngine::Placeholder
    }

    fn merge(&self, document: &str, data: &Value) -> Result<String, MergeError> {
        let mut failure = None;
        let output = TAG.replace_all(document, |caps: &Captures<'_>| {
            if let Some(raw) = caps.get(1) {
                return render(lookup(data, raw.as_str()));
            }
            let expr = caps.get(2).map_or("", |m| m.as_str());
            match expr.chars().next() {
                // comment
                Some('!') => String::new(),
                Some('&') => render(lookup(data, expr[1..].trim())),
                Some('#' | '/' | '^' | '>') => {
                    failure.get_or_insert_with(|| {
                        MergeError::Template(format!("unsupported tag `{}`", &caps[0]))
                    });
                    String::new()
                }
                _ => escape_html(&render(lookup(data, expr))),
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(output.into_owned()),
        }
    }
}

/// Resolve a dotted path (`user.name`, `items.0`) against `data`.
fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path == "this" || path == "." {
        return Some(data);
    }
    path.split('.').try_fold(data, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
    out
}
