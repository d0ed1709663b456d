//! Rewrite prompts — pass-1 (standard) and pass-2 (strict, anti no-op) templates.
//!
//! Reuses cross-cutting fragments from `llm_client::prompts`.

use crate::feedback::models::{AnswerItem, RubricContext};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_FABRICATION_INSTRUCTION, REWRITE_JSON_SCHEMA};

/// Builds the system/user prompt pair for one item. Pure string construction.
pub trait PromptBuilder: Send + Sync {
    fn system_prompt(&self, strict: bool) -> String;
    fn user_prompt(&self, ctx: &RubricContext, item: &AnswerItem, strict: bool) -> String;
}

/// Pass-1 system prompt: STAR restructure with at least 20% lexical change.
pub const REWRITE_SYSTEM: &str = r#"You are an editor who polishes interview answers for job candidates.
Follow every rule below. Write the rewrite in Korean.

[OUTPUT SCHEMA]
{schema}

[EDITING RULES]
1) Do not copy the original: keep the meaning but change at least 20% of the wording.
2) Restructure into exactly 3 STAR sentences:
   - sentence 1: situation / task
   - sentence 2: action (what was done and how)
   - sentence 3: result with a before/after figure or concrete impact
3) Include at least one JD keyword naturally in a core sentence.
4) Normalize numbers and units (e.g. 4.3s -> 4.3초, 40%). Turn arrows (→) into prose.
5) Length: 120-200 Korean characters.
6) Tone: active voice, concise and clear. Remove repetition and filler.
7) Address the comment/suggest of every annotation.

[SELF-CHECK]
If any of the following holds, do NOT return the same text; rewrite again:
- no JD keyword included
- no improvement of figures/units
- not 3 STAR sentences
- less than 20% wording difference from the original

{no_fabrication}

{json_only}"#;

/// Pass-2 system prompt: forced rewrite after a no-op pass 1.
pub const REWRITE_STRICT_SYSTEM: &str = r#"STRICT MODE: copying the original answer is forbidden. Write the rewrite in Korean.

[OUTPUT SCHEMA]
{schema}

- Keep the meaning but change at least 30% of the wording AND reorder the sentence structure.
- If the result is not 3 STAR sentences or lacks a JD keyword, rewrite it unconditionally.
- Normalize figures and units (초, %), 120-200 characters, active voice.

{no_fabrication}

{json_only}"#;

/// Pass-1 user prompt. Replace: {checklist}, {jd_keywords}, {question}, {answer}, {annotations}
pub const REWRITE_PROMPT_TEMPLATE: &str = r#"Rewrite the answer below following the rules. Return pure JSON only.

[CHECKLIST]
{checklist}

[JD KEYWORDS]
{jd_keywords}
{question}
[ORIGINAL ANSWER]
{answer}

[RULE FINDINGS (annotations)]
{annotations}"#;

/// Pass-2 user prompt. Replace: {jd_keywords}, {answer}
pub const REWRITE_STRICT_PROMPT_TEMPLATE: &str = r#"[JD KEYWORDS] {jd_keywords}

[ORIGINAL]
{answer}

[MANDATORY CHANGES]
- replace 30%+ of wording/expressions, 3 STAR sentences, 1+ JD keyword
- normalize units/figures (초/%), turn symbols (→) into prose"#;

const NONE_MARKER: &str = "(none)";

/// Default prompt builder backed by the templates above.
#[derive(Debug, Clone, Default)]
pub struct RubricPromptBuilder;

impl PromptBuilder for RubricPromptBuilder {
    fn system_prompt(&self, strict: bool) -> String {
        let template = if strict {
            REWRITE_STRICT_SYSTEM
        } else {
            REWRITE_SYSTEM
        };
        fill_template(
            template,
            &[
                ("schema", REWRITE_JSON_SCHEMA),
                ("no_fabrication", NO_FABRICATION_INSTRUCTION),
                ("json_only", JSON_ONLY_SYSTEM),
            ],
        )
    }

    fn user_prompt(&self, ctx: &RubricContext, item: &AnswerItem, strict: bool) -> String {
        let jd_keywords = format_keywords(&ctx.jd_keywords);

        if strict {
            return fill_template(
                REWRITE_STRICT_PROMPT_TEMPLATE,
                &[("jd_keywords", jd_keywords.as_str()), ("answer", item.answer.as_str())],
            );
        }

        let question = match item.question.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => format!("\n[QUESTION]\n{q}\n"),
            _ => String::new(),
        };

        fill_template(
            REWRITE_PROMPT_TEMPLATE,
            &[
                ("checklist", format_checklist(&ctx.checklist).as_str()),
                ("jd_keywords", jd_keywords.as_str()),
                ("question", question.as_str()),
                ("answer", item.answer.as_str()),
                ("annotations", summarize_annotations(item).as_str()),
            ],
        )
    }
}

/// Substitutes `{name}` placeholders in one left-to-right pass over `template`.
/// Inserted values are never rescanned; unknown `{…}` sequences stay as written.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn format_checklist(checklist: &[String]) -> String {
    if checklist.is_empty() {
        return format!("- {NONE_MARKER}");
    }
    checklist
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_keywords(keywords: &[String]) -> String {
    if keywords.is_empty() {
        NONE_MARKER.to_string()
    } else {
        keywords.join(", ")
    }
}

/// One line per annotation: `- {category}: {comment} [span="…"] | suggest: …`
fn summarize_annotations(item: &AnswerItem) -> String {
    if item.annotations.is_empty() {
        return format!("- {NONE_MARKER}");
    }
    item.annotations
        .iter()
        .map(|a| {
            let mut line = format!("- {}: {}", a.category, a.comment);
            if !a.span.text.trim().is_empty() {
                line.push_str(&format!(" [span=\"{}\"]", a.span.text));
            }
            if let Some(suggest) = a.suggest.as_deref().filter(|s| !s.trim().is_empty()) {
                line.push_str(&format!(" | suggest: {suggest}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
