// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it and pulls cross-cutting pieces from here.

/// Appended to every system prompt so JSON mode has an explicit instruction to follow.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies outside the JSON fields.";
