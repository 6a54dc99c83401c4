//! Static selector matching over a [`Document`].
//!
//! Works on the selectors lightningcss already parsed. Covered components:
//! type, universal, `#id`, `.class`, attribute selectors (`[a]`, `=`, `~=`,
//! `|=`, `^=`, `$=`, `*=`, optional `i`/`s` flag) and the four combinators.
//! Anything with dynamic state never reaches this module.
//!
//! Components are stored in match order, right to left:
//!
//! ```text
//! table > td.a   →   [Class(a), LocalName(td), Combinator(Child), LocalName(table)]
//! ```

use crate::dom::{Document, Element, NodeId};
use lightningcss::selector::{Combinator, Component, Selector, SelectorList};
use parcel_selectors::attr::{
    AttrSelectorOperator, ParsedAttrSelectorOperation, ParsedCaseSensitivity,
};

/// Elements matching any selector of `list`, in document order.
pub fn select(list: &SelectorList<'_>, doc: &Document) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|&id| {
            doc.element(id).is_some()
                && list
                    .0
                    .iter()
                    .any(|selector| matches_from(doc, id, components(selector)))
        })
        .collect()
}

/// Whether every component of `selector` is one this module can match.
pub fn is_supported(selector: &Selector<'_>) -> bool {
    components(selector).iter().all(|component| match component {
        Component::Combinator(combinator) => matches!(
            combinator,
            Combinator::Child
                | Combinator::Descendant
                | Combinator::NextSibling
                | Combinator::LaterSibling
        ),
        Component::ExplicitUniversalType
        | Component::ExplicitAnyNamespace
        | Component::LocalName(_)
        | Component::ID(_)
        | Component::Class(_)
        | Component::AttributeInNoNamespaceExists { .. }
        | Component::AttributeInNoNamespace { .. } => true,
        Component::AttributeOther(attr) => attr.namespace.is_none(),
        _ => false,
    })
}

fn components<'a, 'i>(selector: &'a Selector<'i>) -> &'a [Component<'i>] {
    selector.iter_raw_match_order().as_slice()
}

// ============================================================================
// Matching
// ============================================================================

/// Match the rightmost compound of `components` at `id`, then walk the
/// remaining compounds through their combinators.
fn matches_from(doc: &Document, id: NodeId, components: &[Component<'_>]) -> bool {
    let Some(el) = doc.element(id) else {
        return false;
    };
    let split = components
        .iter()
        .position(|c| matches!(c, Component::Combinator(_)))
        .unwrap_or(components.len());
    let (compound, rest) = components.split_at(split);
    if !compound.iter().all(|c| component_matches(c, el)) {
        return false;
    }

    let Some((Component::Combinator(combinator), rest)) = rest.split_first() else {
        return true;
    };
    match combinator {
        Combinator::Child => {
            parent_element(doc, id).is_some_and(|parent| matches_from(doc, parent, rest))
        }
        Combinator::Descendant => {
            let mut current = parent_element(doc, id);
            while let Some(ancestor) = current {
                if matches_from(doc, ancestor, rest) {
                    return true;
                }
                current = parent_element(doc, ancestor);
            }
            false
        }
        Combinator::NextSibling => previous_elements(doc, id)
            .first()
            .is_some_and(|&prev| matches_from(doc, prev, rest)),
        Combinator::LaterSibling => previous_elements(doc, id)
            .into_iter()
            .any(|prev| matches_from(doc, prev, rest)),
        _ => false,
    }
}

fn component_matches(component: &Component<'_>, el: &Element) -> bool {
    match component {
        Component::ExplicitUniversalType | Component::ExplicitAnyNamespace => true,
        Component::LocalName(name) => el.name.eq_ignore_ascii_case(&name.name),
        Component::ID(id) => el.attr("id") == Some(&**id),
        Component::Class(class) => el
            .attr("class")
            .is_some_and(|value| value.split_whitespace().any(|token| token == &**class)),
        Component::AttributeInNoNamespaceExists { local_name, .. } => el.has_attr(local_name),
        Component::AttributeInNoNamespace {
            local_name,
            operator,
            value,
            case_sensitivity,
            never_matches,
        } => {
            !never_matches
                && el.attr(local_name).is_some_and(|actual| {
                    attr_matches(actual, *operator, value, *case_sensitivity)
                })
        }
        Component::AttributeOther(attr) => {
            if attr.never_matches {
                return false;
            }
            let Some(actual) = el.attr(&attr.local_name) else {
                return false;
            };
            match &attr.operation {
                ParsedAttrSelectorOperation::Exists => true,
                ParsedAttrSelectorOperation::WithValue {
                    operator,
                    case_sensitivity,
                    expected_value,
                } => attr_matches(actual, *operator, expected_value, *case_sensitivity),
            }
        }
        _ => false,
    }
}

fn attr_matches(
    actual: &str,
    operator: AttrSelectorOperator,
    expected: &str,
    case_sensitivity: ParsedCaseSensitivity,
) -> bool {
    let (actual, expected) = match case_sensitivity {
        ParsedCaseSensitivity::AsciiCaseInsensitive
        | ParsedCaseSensitivity::AsciiCaseInsensitiveIfInHtmlElementInHtmlDocument => {
            (actual.to_ascii_lowercase(), expected.to_ascii_lowercase())
        }
        ParsedCaseSensitivity::CaseSensitive | ParsedCaseSensitivity::ExplicitCaseSensitive => {
            (actual.to_owned(), expected.to_owned())
        }
    };
    match operator {
        AttrSelectorOperator::Equal => actual == expected,
        AttrSelectorOperator::Includes => actual.split_whitespace().any(|t| t == expected),
        AttrSelectorOperator::DashMatch => {
            actual == expected || actual.starts_with(&format!("{expected}-"))
        }
        AttrSelectorOperator::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttrSelectorOperator::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttrSelectorOperator::Substring => !expected.is_empty() && actual.contains(&expected),
    }
}

fn parent_element(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.parent(id).filter(|&p| doc.element(p).is_some())
}

/// Element siblings before `id`, nearest first.
fn previous_elements(doc: &Document, id: NodeId) -> Vec<NodeId> {
    let Some(parent) = doc.parent(id) else {
        return Vec::new();
    };
    let siblings = doc.children(parent);
    let pos = siblings.iter().position(|&s| s == id).unwrap_or(0);
    siblings[..pos]
        .iter()
        .rev()
        .copied()
        .filter(|&s| doc.element(s).is_some())
        .collect()
}
