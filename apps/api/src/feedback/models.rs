//! Shared data types for the annotation & rewrite pipeline.
//!
//! Field names on the wire are camelCase (`jdInsert`, `sessionId`) so the payloads
//! produced by `/annotate` can be fed back unchanged into `/rewrite`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const API_VERSION: &str = "1.0";

/// Rubric checklist used when the caller does not supply one.
pub const DEFAULT_CHECKLIST: &[&str] = &["전후 수치 1개 포함", "STAR 3문장 유지", "JD 키워드 1개 명시"];

pub fn default_checklist() -> Vec<String> {
    DEFAULT_CHECKLIST.iter().map(|s| s.to_string()).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Category
// ────────────────────────────────────────────────────────────────────────────

/// Rubric category of a finding.
///
/// Serialized as its snake_case tag. Tags this build does not know about round-trip
/// through `Other` so annotations produced by newer rule sets still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Vague,
    NoMetric,
    NoJdMatch,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Vague => "vague",
            Category::NoMetric => "no_metric",
            Category::NoJdMatch => "no_jd_match",
            Category::Other(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "vague" => Category::Vague,
            "no_metric" => Category::NoMetric,
            "no_jd_match" => Category::NoJdMatch,
            other => Category::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Category::from_tag(&tag))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Annotation / AnswerItem
// ────────────────────────────────────────────────────────────────────────────

/// Half-open `[start, end)` range into the answer, counted in chars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub text: String,
}

/// User-facing materialization of a merged finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub span: Span,
    pub category: Category,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggest: Option<String>,
}

/// One question/answer pair flowing through both pipeline stages.
///
/// `annotations` is filled by the detector stage; `rewrite` and `jd_insert` by the
/// rewrite stage. Lifetime is a single request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerItem {
    pub qid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub rewrite: String,
    #[serde(default)]
    pub jd_insert: Vec<String>,
}

impl AnswerItem {
    pub fn new(qid: impl Into<String>, question: Option<String>, answer: impl Into<String>) -> Self {
        Self {
            qid: qid.into(),
            question,
            answer: answer.into(),
            ..Default::default()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rubric context / response envelope
// ────────────────────────────────────────────────────────────────────────────

/// Read-only rubric inputs shared by every item of one request.
#[derive(Debug, Clone, Default)]
pub struct RubricContext {
    pub checklist: Vec<String>,
    pub jd_keywords: Vec<String>,
}

impl RubricContext {
    pub fn new(checklist: Vec<String>, jd_keywords: Vec<String>) -> Self {
        Self {
            checklist,
            jd_keywords,
        }
    }
}

/// Case-insensitive keyword membership: true if any keyword occurs in `text`.
pub fn mentions_any_keyword(text: &str, keywords: &[String]) -> bool {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .any(|k| haystack.contains(&k.to_lowercase()))
}

/// Response envelope returned by every feedback endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub checklist: Vec<String>,
    #[serde(default)]
    pub items: Vec<AnswerItem>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

impl FeedbackResponse {
    pub fn new(session_id: impl Into<String>, checklist: Vec<String>, items: Vec<AnswerItem>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            session_id: session_id.into(),
            checklist,
            items,
        }
    }
}
