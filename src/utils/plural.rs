//! Pluralization for log messages.

/// Plural suffix for `noun` at `count`: `""`, `"s"` or `"es"`.
#[inline]
fn plural_suffix(count: usize, noun: &str) -> &'static str {
    if count == 1 {
        ""
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|end| noun.ends_with(end)) {
        "es"
    } else {
        "s"
    }
}

/// Format a count with its noun: `plural_count(3, "asset")` -> `"3 assets"`.
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, plural_suffix(count, noun))
}
