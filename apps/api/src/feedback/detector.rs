//! Span Detector — applies the fixed rubric rules to a single answer.
//!
//! Rules run in a fixed order (vague → no_metric → no_jd_match) so output is
//! deterministic. Findings are NOT sorted here; `merger::merge_overlaps` sorts them.
//!
//! Offsets are char offsets (Unicode scalar values), never byte offsets.

use std::sync::LazyLock;

use regex::Regex;

use crate::feedback::models::{mentions_any_keyword, Category};

/// Hedging / filler markers. Only the FIRST occurrence is reported.
static VAGUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("했다|좋았다|같다|도움|개선").expect("valid regex"));

/// A number followed by a unit or named KPI counts as quantitative evidence.
static METRIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9]+(?:\.[0-9]+)?\s*(?:%|ms|초|점|LCP|CLS|CTR|전환율)").expect("valid regex")
});

/// Minimum width of the `no_metric` anchor span.
const NO_METRIC_MIN_SPAN: usize = 16;
/// Width of the `no_jd_match` anchor span.
const NO_JD_MATCH_SPAN: usize = 12;

/// A single rule violation, pre-merge. `[start, end)` in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub category: Category,
}

impl Finding {
    fn from_range(answer: &str, start: usize, end: usize, category: Category) -> Self {
        debug_assert!(start <= end, "finding start {start} > end {end}");
        debug_assert!(end <= char_len(answer), "finding end {end} past answer");
        Self {
            start,
            end,
            text: slice_chars(answer, start, end).to_string(),
            category,
        }
    }
}

/// Runs every rubric rule against `answer`.
///
/// Blank answers produce nothing. An empty `jd_keywords` slice always yields a
/// `no_jd_match` finding for a non-blank answer.
pub fn detect(answer: &str, jd_keywords: &[String]) -> Vec<Finding> {
    let mut findings = Vec::new();
    if answer.trim().is_empty() {
        return findings;
    }

    let len = char_len(answer);

    if let Some(m) = VAGUE_RE.find(answer) {
        let start = char_offset(answer, m.start());
        let end = char_offset(answer, m.end());
        findings.push(Finding::from_range(answer, start, end, Category::Vague));
    }

    if !METRIC_RE.is_match(answer) {
        let end = NO_METRIC_MIN_SPAN.max(len / 3).min(len);
        findings.push(Finding::from_range(answer, 0, end, Category::NoMetric));
    }

    if !mentions_any_keyword(answer, jd_keywords) {
        let end = NO_JD_MATCH_SPAN.min(len);
        findings.push(Finding::from_range(answer, 0, end, Category::NoJdMatch));
    }

    findings
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Converts a byte index (on a char boundary) into a char offset.
fn char_offset(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx].chars().count()
}

/// Slices `s` by char offsets, clamping out-of-range bounds. Empty when `start > end`.
pub(crate) fn slice_chars(s: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let byte_at = |idx: usize| {
        s.char_indices()
            .nth(idx)
            .map(|(b, _)| b)
            .unwrap_or(s.len())
    };
    &s[byte_at(start)..byte_at(end)]
}
