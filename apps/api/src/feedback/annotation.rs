//! Annotation Builder — maps a merged finding to a comment/suggestion pair.

use crate::feedback::detector::Finding;
use crate::feedback::models::{Annotation, Category, Span};

/// Comment used for categories without a dedicated message.
pub const GENERIC_COMMENT: &str = "개선이 필요합니다";

/// Returns `(comment, suggest)` for a category. Unknown categories get the generic
/// comment and no example.
pub fn category_message(category: &Category) -> (&'static str, Option<&'static str>) {
    match category {
        Category::NoMetric => (
            "전후 수치를 넣어주세요",
            Some("예) LCP 4.3초→2.6초, 오류율 1.2%→0.6%"),
        ),
        Category::Vague => (
            "방법을 더 구체적으로 써주세요",
            Some("예) lazy-loading, code splitting, 캐시 전략 등"),
        ),
        Category::NoJdMatch => (
            "JD 키워드를 1개 이상 자연스럽게 포함하세요",
            Some("예) Spring Boot, Kafka, REST API, Docker 중 1개 이상"),
        ),
        Category::Other(_) => (GENERIC_COMMENT, None),
    }
}

/// Materializes a finding as a user-facing annotation.
pub fn build_annotation(finding: Finding) -> Annotation {
    let (comment, suggest) = category_message(&finding.category);
    Annotation {
        span: Span {
            start: finding.start,
            end: finding.end,
            text: finding.text,
        },
        category: finding.category,
        comment: comment.to_string(),
        suggest: suggest.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(category: Category) -> Finding {
        Finding {
            start: 0,
            end: 4,
            text: "text".to_string(),
            category,
        }
    }

    #[test]
    fn test_known_categories_carry_comment_and_example() {
        for category in [Category::Vague, Category::NoMetric, Category::NoJdMatch] {
            let ann = build_annotation(finding(category.clone()));
            assert_eq!(ann.category, category);
            assert!(!ann.comment.is_empty());
            assert_ne!(ann.comment, GENERIC_COMMENT);
            assert!(ann.suggest.as_deref().is_some_and(|s| s.starts_with("예)")));
        }
    }

    #[test]
    fn test_no_metric_message() {
        let ann = build_annotation(finding(Category::NoMetric));
        assert_eq!(ann.comment, "전후 수치를 넣어주세요");
    }

    #[test]
    fn test_unknown_category_falls_back_to_generic_comment() {
        let ann = build_annotation(finding(Category::Other("passive_voice".to_string())));
        assert_eq!(ann.comment, GENERIC_COMMENT);
        assert!(ann.suggest.is_none());
        assert_eq!(ann.category.as_str(), "passive_voice");
    }

    #[test]
    fn test_span_copied_from_finding() {
        let ann = build_annotation(Finding {
            start: 3,
            end: 7,
            text: "abcd".to_string(),
            category: Category::Vague,
        });
        assert_eq!(ann.span, Span { start: 3, end: 7, text: "abcd".to_string() });
    }
}
