//! Axum route handlers for the Feedback API.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::feedback::detector::char_len;
use crate::feedback::models::{default_checklist, AnswerItem, FeedbackResponse};
use crate::feedback::pipeline::{annotate_response, process, rewrite_response};
use crate::feedback::simulation::SimulationPayload;
use crate::state::AppState;

pub const MAX_QAS: usize = 10;
pub const MAX_ANSWER_CHARS: usize = 1500;
pub const MAX_JD_KEYWORDS: usize = 12;
pub const SIM_SECRET_HEADER: &str = "x-sim-secret";

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub api_version: Option<String>,
    #[serde(default)]
    pub session_id: String,
    pub job_role: Option<String>,
    pub persona: Option<Persona>,
    #[serde(default)]
    pub jd_keywords: Vec<String>,
    #[serde(default)]
    pub qas: Vec<QaInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QaInput {
    #[serde(default)]
    pub qid: String,
    pub question: Option<String>,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub response: FeedbackResponse,
    pub jd_keywords: Option<Vec<String>>,
}

impl FeedbackRequest {
    /// Un-annotated response carrying the request's items in order.
    fn into_feedback(self) -> (FeedbackResponse, Vec<String>) {
        let items = self
            .qas
            .into_iter()
            .map(|qa| AnswerItem::new(qa.qid, qa.question, qa.answer))
            .collect();
        (
            FeedbackResponse::new(self.session_id, default_checklist(), items),
            self.jd_keywords,
        )
    }
}

/// Rejects requests the pipeline should never see.
pub fn validate_request(req: &FeedbackRequest) -> Result<(), AppError> {
    if req.session_id.trim().is_empty() {
        return Err(AppError::Validation("sessionId must not be blank".into()));
    }
    if req.qas.is_empty() || req.qas.len() > MAX_QAS {
        return Err(AppError::Validation(format!(
            "qas must contain between 1 and {MAX_QAS} entries (got {})",
            req.qas.len()
        )));
    }
    if req.jd_keywords.len() > MAX_JD_KEYWORDS {
        return Err(AppError::Validation(format!(
            "at most {MAX_JD_KEYWORDS} jdKeywords are allowed (got {})",
            req.jd_keywords.len()
        )));
    }
    for (i, qa) in req.qas.iter().enumerate() {
        if qa.qid.trim().is_empty() {
            return Err(AppError::Validation(format!("qas[{i}].qid must not be blank")));
        }
        if qa.answer.trim().is_empty() {
            return Err(AppError::Validation(format!("qas[{i}].answer must not be blank")));
        }
        let len = char_len(&qa.answer);
        if len > MAX_ANSWER_CHARS {
            return Err(AppError::Validation(format!(
                "qas[{i}].answer exceeds {MAX_ANSWER_CHARS} characters ({len})"
            )));
        }
    }
    Ok(())
}

fn log_request(route: &str, req: &FeedbackRequest) {
    let persona = req.persona.as_ref();
    info!(
        route,
        session_id = %req.session_id,
        api_version = req.api_version.as_deref().unwrap_or("-"),
        job_role = req.job_role.as_deref().unwrap_or("-"),
        persona_type = persona.and_then(|p| p.kind.as_deref()).unwrap_or("-"),
        persona_difficulty = persona.and_then(|p| p.difficulty.as_deref()).unwrap_or("-"),
        qas = req.qas.len(),
        jd_keywords = req.jd_keywords.len(),
        "Feedback request"
    );
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/feedback/annotate
pub async fn handle_annotate(
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    validate_request(&req)?;
    log_request("annotate", &req);
    let (response, jd_keywords) = req.into_feedback();
    Ok(Json(annotate_response(response, &jd_keywords)))
}

/// POST /api/feedback/rewrite
///
/// Rewrites whatever annotations the caller sends; items without any skip the LLM.
pub async fn handle_rewrite(
    State(state): State<AppState>,
    Json(req): Json<RewriteRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let jd_keywords = req.jd_keywords.unwrap_or_default();
    if jd_keywords.len() > MAX_JD_KEYWORDS {
        return Err(AppError::Validation(format!(
            "at most {MAX_JD_KEYWORDS} jdKeywords are allowed (got {})",
            jd_keywords.len()
        )));
    }
    info!(
        session_id = %req.response.session_id,
        items = req.response.items.len(),
        jd_keywords = jd_keywords.len(),
        "Rewrite request"
    );
    let response = rewrite_response(&state.orchestrator, req.response, jd_keywords).await;
    Ok(Json(response))
}

/// POST /api/feedback/process
pub async fn handle_process(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    validate_request(&req)?;
    log_request("process", &req);
    let (response, jd_keywords) = req.into_feedback();
    Ok(Json(process(&state.orchestrator, response, jd_keywords).await))
}

/// POST /api/sim/feedback
pub async fn handle_simulation_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SimulationPayload>,
) -> Result<Json<FeedbackResponse>, AppError> {
    if let Some(expected) = state.config.sim_shared_secret.as_deref() {
        let provided = headers
            .get(SIM_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            return Err(AppError::Unauthorized);
        }
    }

    let (response, jd_keywords) = payload.into_feedback();
    info!(
        session_id = %response.session_id,
        entries = response.items.len(),
        jd_keywords = jd_keywords.len(),
        "Simulation feedback"
    );
    Ok(Json(process(&state.orchestrator, response, jd_keywords).await))
}
