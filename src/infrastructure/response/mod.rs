use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

/// A reply wrapped whole in a ```markdown fence.
static WRAPPING_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:markdown|md)?[ \t]*\n([\s\S]*?)\n```$").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip reasoning blocks and an outer code fence from an engine reply so it
/// renders as plain markdown.
pub fn clean_llm_response(response: &str) -> String {
    let without_think = THINK_TAG_PATTERN.replace_all(response, "");
    let trimmed = without_think.trim();

    let unfenced = match WRAPPING_FENCE_PATTERN.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    };

    MULTIPLE_NEWLINES_PATTERN
        .replace_all(unfenced.trim(), "\n\n")
        .to_string()
}
