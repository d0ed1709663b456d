//! Simulation adapter — turns a mock-interview webhook payload into a feedback response.

use serde::Deserialize;

use crate::feedback::models::{default_checklist, AnswerItem, FeedbackResponse};

pub const UNKNOWN_SESSION_ID: &str = "sim_unknown";

/// Payload posted by the interview simulator. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPayload {
    pub session_id: Option<String>,
    #[serde(default)]
    pub entries: Vec<SimulationEntry>,
    pub jd_keywords: Option<Vec<String>>,
    pub checklist: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationEntry {
    pub sim_question_id: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
}

impl SimulationPayload {
    /// Splits the payload into an un-annotated response and its JD keywords.
    ///
    /// Entries without an id are numbered `q1, q2, …` in order of appearance (ids that
    /// are present do not consume a number). Missing answers become empty.
    pub fn into_feedback(self) -> (FeedbackResponse, Vec<String>) {
        let session_id = self
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_SESSION_ID.to_string());

        let checklist = match self.checklist {
            Some(list) if !list.is_empty() => list,
            _ => default_checklist(),
        };

        let mut next_generated = 0;
        let items = self
            .entries
            .into_iter()
            .map(|entry| {
                let qid = entry.sim_question_id.unwrap_or_else(|| {
                    next_generated += 1;
                    format!("q{next_generated}")
                });
                AnswerItem::new(qid, entry.question, entry.answer.unwrap_or_default())
            })
            .collect();

        (
            FeedbackResponse::new(session_id, checklist, items),
            self.jd_keywords.unwrap_or_default(),
        )
    }
}
