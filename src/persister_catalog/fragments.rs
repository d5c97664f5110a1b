/// Filter and ordering fragment templates.
///
/// Persisters carry SQL snippets with two kinds of placeholders:
/// - `{alias}` is replaced by the table alias chosen for the joined table
/// - `:param` names a filter parameter and is qualified with the filter name
///   (`:tenantId` in filter `tenant` becomes `:tenant.tenantId`) so parameters of
///   different filters never collide in one statement
///
/// Examples:
/// - `{alias}.tenant_id = :tenantId`
/// - `{alias}.line_no asc`
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const ALIAS_PLACEHOLDER: &str = "{alias}";

lazy_static! {
    // Group 1 keeps the preceding character so `x::int` casts stay untouched;
    // group 3 detects parameters that are already qualified.
    static ref FILTER_PARAM: Regex =
        Regex::new(r"(^|[^:\w]):([A-Za-z_][A-Za-z0-9_]*)(\.[A-Za-z_][A-Za-z0-9_]*)?")
            .expect("filter parameter pattern is valid");
}

/// Names of the row filters enabled for a load.
///
/// The condition text lives on each persister; only the set of enabled names is
/// part of a statement's identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnabledFilters(BTreeSet<String>);

impl EnabledFilters {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for EnabledFilters {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        EnabledFilters(iter.into_iter().map(Into::into).collect())
    }
}

/// Substitute the table alias into a template.
pub fn render_template(template: &str, alias: &str) -> String {
    template.replace(ALIAS_PLACEHOLDER, alias)
}

/// Render one filter condition for `alias`, qualifying its parameters.
pub fn render_filter(filter_name: &str, template: &str, alias: &str) -> String {
    let rendered = render_template(template, alias);
    FILTER_PARAM
        .replace_all(&rendered, |caps: &Captures| {
            if caps.get(3).is_some() {
                caps[0].to_string()
            } else {
                format!("{}:{}.{}", &caps[1], filter_name, &caps[2])
            }
        })
        .into_owned()
}

/// Conjunction of every enabled filter of a persister, in filter-name order.
///
/// Returns `None` when no declared filter is enabled.
pub fn filter_fragment(
    templates: &BTreeMap<String, String>,
    enabled: &EnabledFilters,
    alias: &str,
) -> Option<String> {
    let parts: Vec<String> = templates
        .iter()
        .filter(|(name, _)| enabled.is_enabled(name))
        .map(|(name, template)| parenthesize(&render_filter(name, template, alias)))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" and "))
    }
}

/// Conjunction of the enabled filters of several persisters sharing one alias
/// (a one-to-many collection and its element entity, for instance).
pub fn combined_filter_fragment(
    template_sets: &[&BTreeMap<String, String>],
    enabled: &EnabledFilters,
    alias: &str,
) -> Option<String> {
    let parts: Vec<String> = template_sets
        .iter()
        .filter_map(|templates| filter_fragment(templates, enabled, alias))
        .map(|fragment| parenthesize(&fragment))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" and "))
    }
}

/// Wrap a fragment containing a top-level `or` so AND-joining keeps its meaning.
pub fn parenthesize(fragment: &str) -> String {
    if has_top_level_or(fragment) {
        format!("({})", fragment)
    } else {
        fragment.to_string()
    }
}

/// Whether `fragment` has an `or` keyword outside parentheses and quoted
/// literals. Words end at whitespace or parentheses, so `x OR(y)` and
/// tab-separated disjunctions count while `a.orders` does not.
pub fn has_top_level_or(fragment: &str) -> bool {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut word = String::new();

    for c in fragment.chars().chain(std::iter::once(' ')) {
        if c == '\'' {
            in_quote = !in_quote;
            word.clear();
            continue;
        }
        if in_quote {
            continue;
        }
        if c == '(' || c == ')' || c.is_ascii_whitespace() {
            if depth == 0 && word.eq_ignore_ascii_case("or") {
                return true;
            }
            word.clear();
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ => {}
            }
        } else {
            word.push(c);
        }
    }
    false
}
