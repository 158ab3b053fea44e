//! Version ordering.
//!
//! Spack version strings are treated as dotted numeric tuples: `4.1.10`
//! sorts after `4.1.9`, and `4.1` before `4.1.0`. This is not a
//! semantic-version comparison.

use std::cmp::Ordering;
use std::collections::BTreeSet;

fn numeric_components(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two versions as numeric tuples, falling back to the raw string
/// so that distinct spellings (`1.02` vs `1.2`) still order deterministically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    numeric_components(a)
        .cmp(&numeric_components(b))
        .then_with(|| a.cmp(b))
}

/// Deduplicate and sort ascending.
pub fn sort_versions<I>(versions: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut unique: Vec<String> = versions
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    unique.sort_by(|a, b| compare_versions(a, b));
    unique
}
