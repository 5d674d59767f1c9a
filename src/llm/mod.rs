//! Language-model abstraction + OpenAI chat provider + scripted test model.

pub mod openai;

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

pub use openai::OpenAiChat;

/// Text returned by a model, plus token usage when the provider reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub content: String,
    pub total_tokens: Option<u32>,
}

impl Generation {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            total_tokens: None,
        }
    }
}

#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Precondition check run before any evidence is gathered or scored.
    fn check_credentials(&self) -> Result<()> {
        Ok(())
    }
    async fn generate(&self, prompt: &str) -> Result<Generation>;
    fn model_name(&self) -> &str;
}

/// Replays queued answers in order, then repeats the last one.
/// Prompts are recorded so tests can assert on them.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    answers: Mutex<VecDeque<Generation>>,
    last: Mutex<Option<Generation>>,
    prompts: Mutex<Vec<String>>,
    missing_credentials: bool,
}

impl ScriptedModel {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Generation::text).collect()),
            ..Self::default()
        }
    }

    /// A model that fails its credential check, like an unconfigured provider.
    pub fn without_credentials() -> Self {
        Self {
            missing_credentials: true,
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    fn check_credentials(&self) -> Result<()> {
        if self.missing_credentials {
            Err(AdvisorError::Credential { service: "scripted" })
        } else {
            Ok(())
        }
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        self.check_credentials()?;
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());

        let next = self.answers.lock().expect("answers poisoned").pop_front();
        let mut last = self.last.lock().expect("answers poisoned");
        match next {
            Some(g) => {
                *last = Some(g.clone());
                Ok(g)
            }
            None => last.clone().ok_or_else(|| AdvisorError::LanguageModel {
                message: "scripted model has no answers".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
