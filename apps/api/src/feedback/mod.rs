//! Interview-answer feedback.
//!
//! Rule-based annotation (detector → merger → annotation) followed by an
//! LLM rewrite pass with no-op escalation and fallback (orchestrator).

pub mod annotation;
pub mod detector;
pub mod handlers;
pub mod merger;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod simulation;
