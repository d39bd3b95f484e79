//! Dotted numeric version ordering.
//!
//! Versions are compared segment by segment as unsigned integers. A segment
//! that is missing (the shorter version ran out) or that does not parse as a
//! number counts as `0`, so `"1.0"` equals `"1.0.0"` and `"1.x.0"` equals
//! `"1.0.0"`.

use std::cmp::Ordering;

/// Compare two dotted version strings.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use doc_catalog_core::version::compare_versions;
///
/// assert_eq!(compare_versions("1.0.0", "1.0"), Ordering::Equal);
/// assert_eq!(compare_versions("2.1.0", "2.0.5"), Ordering::Greater);
/// assert_eq!(compare_versions("0.9.0", "1.0.0"), Ordering::Less);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<u64> = segments(a);
    let right: Vec<u64> = segments(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn segments(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|s| s.trim().parse::<u64>().unwrap_or(0))
        .collect()
}
