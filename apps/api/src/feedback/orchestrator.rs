//! Rewrite Orchestrator — per-item LLM rewrite with no-op escalation and safe fallback.
//!
//! Per item:
//! ```text
//! no annotations            → Skipped        (rewrite = answer, jdInsert = [])
//! pass 1 fails              → FallbackOriginal (rewrite = answer, jdInsert = [])
//! pass 1 ok, real change    → Pass1
//! pass 1 ok, no-op          → strict pass 2 → Pass2Strict
//!                             (blank or failed pass 2 → answer; empty pass-2 jdInsert → pass-1 list)
//! ```
//!
//! Items run as independent tokio tasks gated by ONE semaphore shared by every request
//! (the global worker pool). Output order always equals input order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::feedback::models::{AnswerItem, RubricContext};
use crate::feedback::prompts::PromptBuilder;
use crate::llm_client::{LlmError, LlmGateway, LlmRewrite};

pub const DEFAULT_MAX_PARALLEL: usize = 4;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Which branch of the state machine produced the final rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteSource {
    Skipped,
    Pass1,
    Pass2Strict,
    FallbackOriginal,
}

impl RewriteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteSource::Skipped => "skipped",
            RewriteSource::Pass1 => "pass1",
            RewriteSource::Pass2Strict => "pass2-strict",
            RewriteSource::FallbackOriginal => "fallback-original",
        }
    }
}

/// Final values for one item, decided inside the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    pub rewrite_text: String,
    pub jd_insert: Vec<String>,
    pub source: RewriteSource,
}

impl RewriteOutcome {
    fn original(answer: &str, source: RewriteSource) -> Self {
        Self {
            rewrite_text: answer.to_string(),
            jd_insert: Vec::new(),
            source,
        }
    }

    fn apply_to(self, mut item: AnswerItem) -> AnswerItem {
        item.rewrite = self.rewrite_text;
        item.jd_insert = self.jd_insert;
        item
    }
}

/// True when `candidate` is blank or equals `original` ignoring whitespace and case.
pub fn is_noop(original: &str, candidate: &str) -> bool {
    if candidate.trim().is_empty() {
        return true;
    }
    normalize(original) == normalize(candidate)
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Fan-out/fan-in rewrite driver. Cheap to clone; clones share the same worker pool.
#[derive(Clone)]
pub struct RewriteOrchestrator {
    llm: Arc<dyn LlmGateway>,
    prompts: Arc<dyn PromptBuilder>,
    pool: Arc<Semaphore>,
    call_timeout: Duration,
}

impl RewriteOrchestrator {
    /// `max_parallel` is the global pool width (clamped to at least 1).
    pub fn new(
        llm: Arc<dyn LlmGateway>,
        prompts: Arc<dyn PromptBuilder>,
        max_parallel: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            prompts,
            pool: Arc::new(Semaphore::new(max_parallel.max(1))),
            call_timeout,
        }
    }

    /// Rewrites every item and returns them in input order.
    ///
    /// Never fails: LLM errors, timeouts and task panics degrade the affected item to
    /// its original answer without touching its siblings.
    pub async fn rewrite_all(&self, items: Vec<AnswerItem>, ctx: Arc<RubricContext>) -> Vec<AnswerItem> {
        let batch_id = Uuid::new_v4();
        let total = items.len();
        let needs_llm = items.iter().filter(|i| !i.annotations.is_empty()).count();
        info!(
            %batch_id,
            items = total,
            jd_keywords = ctx.jd_keywords.len(),
            llm_items = needs_llm,
            skipped = total - needs_llm,
            "starting rewrite batch"
        );

        let mut pending = Vec::with_capacity(total);
        for item in items {
            if item.annotations.is_empty() {
                debug!(qid = %item.qid, "no annotations, skipping LLM");
                let outcome = RewriteOutcome::original(&item.answer, RewriteSource::Skipped);
                pending.push(Pending::Ready(outcome.apply_to(item)));
                continue;
            }

            let original = item.clone();
            let worker = self.clone();
            let ctx = Arc::clone(&ctx);
            let handle = tokio::spawn(async move {
                let outcome = worker.run_item(&item, &ctx).await;
                debug!(qid = %item.qid, source = outcome.source.as_str(), "item finished");
                outcome.apply_to(item)
            });
            pending.push(Pending::Spawned { original, handle });
        }

        let mut finished = Vec::with_capacity(total);
        for entry in pending {
            match entry {
                Pending::Ready(item) => finished.push(item),
                Pending::Spawned { original, handle } => match handle.await {
                    Ok(item) => finished.push(item),
                    Err(e) => {
                        error!(qid = %original.qid, "rewrite task failed: {e}");
                        let outcome =
                            RewriteOutcome::original(&original.answer, RewriteSource::FallbackOriginal);
                        finished.push(outcome.apply_to(original));
                    }
                },
            }
        }

        info!(%batch_id, items = finished.len(), "rewrite batch complete");
        finished
    }

    /// Runs the pass-1 / strict pass-2 state machine for one item while holding a pool slot.
    pub async fn run_item(&self, item: &AnswerItem, ctx: &RubricContext) -> RewriteOutcome {
        if item.annotations.is_empty() {
            return RewriteOutcome::original(&item.answer, RewriteSource::Skipped);
        }

        let _permit = match self.pool.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(qid = %item.qid, "worker pool closed: {e}");
                return RewriteOutcome::original(&item.answer, RewriteSource::FallbackOriginal);
            }
        };

        let system = self.prompts.system_prompt(false);
        let user = self.prompts.user_prompt(ctx, item, false);
        debug!(
            qid = %item.qid,
            annotations = item.annotations.len(),
            system_len = system.len(),
            user_len = user.len(),
            "calling LLM (pass 1)"
        );

        let pass1 = match self.call(&system, &user).await {
            Ok(out) => out,
            Err(e) => {
                warn!(qid = %item.qid, "LLM pass 1 failed, falling back to original: {e}");
                return RewriteOutcome::original(&item.answer, RewriteSource::FallbackOriginal);
            }
        };

        if !is_noop(&item.answer, &pass1.rewrite) {
            return RewriteOutcome {
                rewrite_text: pass1.rewrite,
                jd_insert: pass1.jd_insert,
                source: RewriteSource::Pass1,
            };
        }

        warn!(qid = %item.qid, "pass 1 was a no-op, escalating to strict prompt");
        let system = self.prompts.system_prompt(true);
        let user = self.prompts.user_prompt(ctx, item, true);

        let pass2 = match self.call(&system, &user).await {
            Ok(out) => out,
            Err(e) => {
                warn!(qid = %item.qid, "LLM pass 2 failed, treating as blank: {e}");
                LlmRewrite::default()
            }
        };

        let rewrite_text = if pass2.rewrite.trim().is_empty() {
            item.answer.clone()
        } else {
            pass2.rewrite
        };
        let jd_insert = if pass2.jd_insert.is_empty() {
            pass1.jd_insert
        } else {
            pass2.jd_insert
        };

        RewriteOutcome {
            rewrite_text,
            jd_insert,
            source: RewriteSource::Pass2Strict,
        }
    }

    async fn call(&self, system: &str, user: &str) -> Result<LlmRewrite, LlmError> {
        match tokio::time::timeout(self.call_timeout, self.llm.rewrite(system, user)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }
}

enum Pending {
    Ready(AnswerItem),
    Spawned {
        original: AnswerItem,
        handle: tokio::task::JoinHandle<AnswerItem>,
    },
}
