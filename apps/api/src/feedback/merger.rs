//! Overlap Merger — collapses overlapping/adjacent findings of the same category.
//!
//! Findings of different categories are never merged, even when their spans overlap.
//! Merging only considers neighbours in start order, so two same-category spans with a
//! different-category finding sorted between them stay separate.

use crate::feedback::detector::{slice_chars, Finding};

/// Sorts by `start` (stable) and merges same-category neighbours whose spans touch.
///
/// The merged `text` is always re-sliced from `answer`, never concatenated.
pub fn merge_overlaps(mut findings: Vec<Finding>, answer: &str) -> Vec<Finding> {
    if findings.len() < 2 {
        return findings;
    }

    findings.sort_by_key(|f| f.start);

    let mut merged = Vec::with_capacity(findings.len());
    let mut iter = findings.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for next in iter {
        if next.start <= current.end && next.category == current.category {
            current.end = current.end.max(next.end);
            current.text = slice_chars(answer, current.start, current.end).to_string();
        } else {
            merged.push(std::mem::replace(&mut current, next));
        }
    }
    merged.push(current);

    debug_assert!(merged.iter().all(|f| f.start <= f.end));
    merged
}
