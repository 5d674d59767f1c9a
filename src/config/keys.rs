// src/config/keys.rs
use std::env;

pub const OPENAI_KEY_VARS: &[&str] = &["OPENAI_API_KEY"];
pub const EXA_KEY_VARS: &[&str] = &["EXA_API_KEY"];
/// LangSmith accepts the older LangChain variable name as well.
pub const LANGSMITH_KEY_VARS: &[&str] = &["LANGSMITH_API_KEY", "LANGCHAIN_API_KEY"];

/// Resolve a configured key.
///
/// * missing or `"ENV"` (case-insensitive): first non-empty variable in `vars`
/// * placeholder text (`"YOUR API KEY"`) or blank: treated as unset
/// * anything else: used as-is
pub fn resolve_key(raw: Option<String>, vars: &[&str]) -> Option<String> {
    let from_env = || {
        vars.iter()
            .filter_map(|name| env::var(name).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    };

    match raw {
        None => from_env(),
        Some(v) if v.trim().eq_ignore_ascii_case("env") => from_env(),
        Some(v) if is_placeholder(&v) => None,
        Some(v) => Some(v.trim().to_string()),
    }
}

fn is_placeholder(v: &str) -> bool {
    let t = v.trim();
    t.is_empty() || t.eq_ignore_ascii_case("your api key")
}
