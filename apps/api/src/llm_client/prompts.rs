// Shared prompt fragments for every rewrite prompt.
// Task-specific templates live next to the code that builds them (feedback/prompts.rs).

/// Output contract: the gateway parses exactly this JSON shape.
pub const REWRITE_JSON_SCHEMA: &str = r#"{
  "rewrite": "string",
  "jdInsert": ["string"]
}"#;

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only, matching the schema above. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT add extra keys, explanations or apologies.";

/// Keeps rewrites faithful to the candidate's own experience.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Keep the meaning of the original answer. Do NOT invent projects, employers, \
    numbers or results that the answer does not support.";
