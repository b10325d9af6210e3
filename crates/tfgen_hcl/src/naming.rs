//! Resource naming.
//!
//! The management plane prefixes resource names with a tenant scope such as
//! `duploservices-<tenant>-`. Generated configuration uses the short name
//! for file names and as the source of block labels.

/// Characters that are always mapped to `_`.
const SEPARATORS: [char; 4] = ['/', '-', '.', ' '];

/// Convert a name into a token usable as a block label and in references.
///
/// The result only contains `[a-z0-9_]` and never starts with a digit.
pub fn safe_identifier(name: &str) -> String {
    let mut token: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if SEPARATORS.contains(&c) || !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
                '_'
            } else {
                c
            }
        })
        .collect();

    if token.is_empty() || token.starts_with(|c: char| c.is_ascii_digit()) {
        token.insert(0, '_');
    }
    token
}

/// Strip `prefix` from `full_name`.
///
/// A name without the prefix is considered already short and returned as
/// is. The prefix is stripped repeatedly so applying this twice gives the
/// same answer as applying it once.
pub fn short_name<'a>(full_name: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return full_name;
    }
    let mut name = full_name;
    while let Some(rest) = name.strip_prefix(prefix) {
        if rest.is_empty() {
            break;
        }
        name = rest;
    }
    name
}

/// Build the `<namespace>-<account>-` prefix used for tenant scoped names.
pub fn tenant_prefix(namespace: &str, account: &str) -> String {
    format!("{}-{}-", namespace, account)
}
