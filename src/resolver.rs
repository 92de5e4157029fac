//! Placeholder substitution.
//!
//! A placeholder is `#` followed by a field name. The name ends at
//! whitespace, `,`, `.`, `*`, the next `#`, or the end of the text, so
//! inline punctuation like `"Cuota: #fee_month."` works without a space.

use std::collections::BTreeSet;

use crate::record::Record;
use crate::template::{CellTemplate, ItemKind};

const FIELD_MARKER: char = '#';

fn ends_field_name(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '.' | '*' | FIELD_MARKER)
}

/// Field names referenced in `text`, left to right, duplicates included.
fn placeholders(text: &str) -> impl Iterator<Item = &str> {
    text.split(FIELD_MARKER)
        .skip(1)
        .map(|after| &after[..after.find(ends_field_name).unwrap_or(after.len())])
        .filter(|name| !name.is_empty())
}

/// Replace every placeholder in `text` with the record's value for it.
/// Absent fields become empty, and so does a bare `#`.
pub fn substitute(text: &str, record: &Record) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(FIELD_MARKER) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + FIELD_MARKER.len_utf8()..];
        let end = after.find(ends_field_name).unwrap_or(after.len());
        let name = &after[..end];

        if let Some(value) = record.get(name) {
            out.push_str(&value.to_string());
        }
        rest = &after[end..];
    }

    out.push_str(rest);
    out
}

/// Produce a copy of `template` with every text item filled from `record`.
/// Neither input is modified.
pub fn resolve(template: &CellTemplate, record: &Record) -> CellTemplate {
    let mut resolved = template.clone();
    for item in &mut resolved.items {
        if let ItemKind::Text { text, .. } = &mut item.kind {
            if text.contains(FIELD_MARKER) {
                *text = substitute(text, record);
            }
        }
    }
    resolved
}

/// Every field name the template refers to.
pub fn referenced_fields(template: &CellTemplate) -> BTreeSet<String> {
    template
        .items
        .iter()
        .filter_map(|item| item.content())
        .flat_map(placeholders)
        .map(str::to_string)
        .collect()
}

/// Referenced fields that `known` does not define, sorted.
pub fn unknown_fields(template: &CellTemplate, known: &[&str]) -> Vec<String> {
    referenced_fields(template)
        .into_iter()
        .filter(|name| !known.contains(&name.as_str()))
        .collect()
}
