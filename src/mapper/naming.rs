use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[_\-\s]+").expect("separator pattern is valid");
}

/// Normalizes a column or field name for matching.
///
/// Names containing separators are treated as upper-separated
/// (`USER_NAME`, `user-name`) and converted to lower camel case (`userName`);
/// anything else is returned unchanged.
pub fn normalize_name(name: &str) -> String {
    if !SEPARATORS.is_match(name) {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    for part in SEPARATORS.split(name).filter(|part| !part.is_empty()) {
        let lower = part.to_lowercase();
        if out.is_empty() {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Case-insensitive comparison of two names after normalization.
pub fn names_match(column: &str, field: &str) -> bool {
    normalize_name(column).eq_ignore_ascii_case(&normalize_name(field))
}
