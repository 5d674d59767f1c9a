// src/llm/openai.rs
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Generation, LanguageModel};
use crate::config::LlmConfig;
use crate::error::{AdvisorError, Result};

/// OpenAI Chat Completions provider.
///
/// Construction never fails on a missing key; the key is checked by
/// [`LanguageModel::check_credentials`] so callers can fail fast per request.
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("llm_calls_total", "Language model calls attempted.");
        describe_counter!("llm_errors_total", "Language model calls that failed.");
        describe_counter!("llm_tokens_total", "Tokens reported by the provider.");
    });
}

impl OpenAiChat {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ipl-fantasy-advisor/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::LanguageModel {
                message: format!("building http client: {e}"),
            })?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
            model: cfg.model.clone(),
            endpoint: cfg.endpoint.clone(),
        })
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(AdvisorError::Credential { service: "OpenAI" })
    }
}

/// Single user message, as the prompt templates are self-contained.
fn request_body<'a>(model: &'a str, prompt: &'a str) -> Req<'a> {
    Req {
        model,
        messages: vec![Msg {
            role: "user",
            content: prompt,
        }],
    }
}

fn parse_response(body: &str) -> Result<Generation> {
    let resp: Resp = serde_json::from_str(body).map_err(|e| AdvisorError::LanguageModel {
        message: format!("parsing chat response: {e}"),
    })?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AdvisorError::LanguageModel {
            message: "chat response had no content".to_string(),
        })?;
    Ok(Generation {
        content,
        total_tokens: resp.usage.map(|u| u.total_tokens),
    })
}

#[async_trait::async_trait]
impl LanguageModel for OpenAiChat {
    fn check_credentials(&self) -> Result<()> {
        self.key().map(|_| ())
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let key = self.key()?;
        ensure_metrics_described();
        counter!("llm_calls_total").increment(1);

        let fail = |message: String| {
            counter!("llm_errors_total").increment(1);
            AdvisorError::LanguageModel { message }
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&request_body(&self.model, prompt))
            .send()
            .await
            .map_err(|e| {
                warn!(error = ?e, model = %self.model, "chat completion http error");
                fail(format!("request failed: {e}"))
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| fail(format!("reading body: {e}")))?;
        if !status.is_success() {
            return Err(fail(format!("provider returned {status}")));
        }

        let generation = parse_response(&body).map_err(|e| fail(e.to_string()))?;
        if let Some(t) = generation.total_tokens {
            counter!("llm_tokens_total").increment(u64::from(t));
        }
        debug!(model = %self.model, tokens = ?generation.total_tokens, "chat completion done");
        Ok(generation)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_fails_credential_check() {
        let chat = OpenAiChat::new(&LlmConfig::default()).unwrap();
        assert!(matches!(
            chat.check_credentials().unwrap_err(),
            AdvisorError::Credential { service: "OpenAI" }
        ));
    }

    #[tokio::test]
    async fn generate_without_key_never_hits_the_network() {
        let cfg = LlmConfig {
            endpoint: "http://127.0.0.1:9/unreachable".into(),
            ..LlmConfig::default()
        };
        let chat = OpenAiChat::new(&cfg).unwrap();
        let err = chat.generate("hello").await.unwrap_err();
        assert!(matches!(err, AdvisorError::Credential { .. }));
    }

    #[test]
    fn body_is_single_user_message() {
        let v = serde_json::to_value(request_body("gpt-3.5-turbo", "hi")).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{ "role": "user", "content": "hi" }]
            })
        );
    }

    #[test]
    fn parses_content_and_usage() {
        let body = r#"{
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Pick Gill."}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}
        }"#;
        let g = parse_response(body).unwrap();
        assert_eq!(g.content, "Pick Gill.");
        assert_eq!(g.total_tokens, Some(120));
    }

    #[test]
    fn empty_choices_is_an_error() {
        assert!(parse_response(r#"{"choices": []}"#).is_err());
    }
}
