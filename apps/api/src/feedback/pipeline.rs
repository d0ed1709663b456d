//! Feedback pipeline — public surface consumed by the HTTP layer.
//!
//! Flow: detect → merge_overlaps → build_annotation (per item, sync)
//!       → RewriteOrchestrator::rewrite_all (parallel per item) → response.

use std::sync::Arc;

use crate::feedback::annotation::build_annotation;
use crate::feedback::detector::detect;
use crate::feedback::merger::merge_overlaps;
use crate::feedback::models::{Annotation, FeedbackResponse, RubricContext};
use crate::feedback::orchestrator::RewriteOrchestrator;

/// Rubric annotations for one answer. Deterministic and side-effect free.
pub fn annotate(answer: &str, jd_keywords: &[String]) -> Vec<Annotation> {
    merge_overlaps(detect(answer, jd_keywords), answer)
        .into_iter()
        .map(build_annotation)
        .collect()
}

/// Replaces every item's annotations with fresh ones from the rule set.
pub fn annotate_response(mut response: FeedbackResponse, jd_keywords: &[String]) -> FeedbackResponse {
    for item in &mut response.items {
        item.annotations = annotate(&item.answer, jd_keywords);
    }
    response
}

/// Fills `rewrite` / `jdInsert` for every item, keeping the response's item order.
pub async fn rewrite_response(
    orchestrator: &RewriteOrchestrator,
    mut response: FeedbackResponse,
    jd_keywords: Vec<String>,
) -> FeedbackResponse {
    let ctx = Arc::new(RubricContext::new(response.checklist.clone(), jd_keywords));
    let items = std::mem::take(&mut response.items);
    response.items = orchestrator.rewrite_all(items, ctx).await;
    response
}

/// One-shot: annotate, then rewrite.
pub async fn process(
    orchestrator: &RewriteOrchestrator,
    response: FeedbackResponse,
    jd_keywords: Vec<String>,
) -> FeedbackResponse {
    let annotated = annotate_response(response, &jd_keywords);
    rewrite_response(orchestrator, annotated, jd_keywords).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::feedback::models::{default_checklist, AnswerItem, Category};
    use crate::feedback::prompts::RubricPromptBuilder;
    use crate::llm_client::FakeLlmClient;

    fn kafka() -> Vec<String> {
        vec!["Kafka".to_string()]
    }

    fn fake_orchestrator() -> RewriteOrchestrator {
        RewriteOrchestrator::new(
            Arc::new(FakeLlmClient),
            Arc::new(RubricPromptBuilder),
            4,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_annotate_worked_example_three_categories() {
        let anns = annotate("저는 열심히 했다", &kafka());
        let cats: Vec<_> = anns.iter().map(|a| a.category.clone()).collect();
        assert_eq!(cats.len(), 3);
        assert!(cats.contains(&Category::Vague));
        assert!(cats.contains(&Category::NoMetric));
        assert!(cats.contains(&Category::NoJdMatch));
        // sorted by start
        assert!(anns.windows(2).all(|w| w[0].span.start <= w[1].span.start));
        let vague = anns.iter().find(|a| a.category == Category::Vague).unwrap();
        assert_eq!(vague.span.text, "했다");
    }

    #[test]
    fn test_annotate_clean_answer_is_empty() {
        let anns = annotate("Kafka 컨슈머 재시도 로직을 도입해 오류율 40%→10%로 낮췄습니다", &kafka());
        assert!(anns.is_empty());
    }

    #[test]
    fn test_annotate_response_overwrites_stale_annotations() {
        let mut item = AnswerItem::new("q1", None, "Kafka 처리량 30% 증가");
        item.annotations = annotate("저는 열심히 했다", &[]);
        let response = FeedbackResponse::new("s1", default_checklist(), vec![item]);

        let annotated = annotate_response(response, &kafka());

        assert!(annotated.items[0].annotations.is_empty());
    }

    #[tokio::test]
    async fn test_process_clean_answer_keeps_original_and_flagged_gets_rewrite() {
        let clean = "Kafka 컨슈머 재시도 로직을 도입해 오류율 40%→10%로 낮췄습니다";
        let response = FeedbackResponse::new(
            "s1",
            default_checklist(),
            vec![
                AnswerItem::new("q1", None, clean),
                AnswerItem::new("q2", None, "저는 열심히 했다"),
            ],
        );

        let out = process(&fake_orchestrator(), response, kafka()).await;

        assert_eq!(out.session_id, "s1");
        assert_eq!(out.items[0].rewrite, clean);
        assert!(out.items[0].jd_insert.is_empty());
        assert_eq!(out.items[1].rewrite, "FAKE");
        assert_eq!(out.items[1].jd_insert, vec!["fake"]);
        assert_eq!(out.items[1].annotations.len(), 3);
    }

    #[tokio::test]
    async fn test_every_item_ends_with_non_empty_rewrite() {
        let response = FeedbackResponse::new(
            "s1",
            vec![],
            vec![
                AnswerItem::new("q1", None, "짧은 답"),
                AnswerItem::new("q2", None, "Kafka로 지연 20ms 단축"),
            ],
        );
        let out = process(&fake_orchestrator(), response, kafka()).await;
        assert!(out.items.iter().all(|i| !i.rewrite.trim().is_empty()));
    }
}
