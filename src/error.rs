//! Error types shared by the advisor and its collaborators.

use thiserror::Error;

/// Main error type for the fantasy advisor.
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// A collaborator needs an API key that is not configured.
    #[error("Credential error: {service} API key is not set")]
    Credential { service: &'static str },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Search provider error: {message}")]
    Search { message: String },

    #[error("Language model error: {message}")]
    LanguageModel { message: String },

    #[error("Embedding provider error: {message}")]
    Embedding { message: String },

    #[error("Monitoring error: {message}")]
    Monitor { message: String },

    #[error("Similarity store error: {message}")]
    Store { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdvisorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl AdvisorError {
    pub fn monitor(message: impl Into<String>) -> Self {
        Self::Monitor {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AdvisorError {
    fn from(err: serde_json::Error) -> Self {
        AdvisorError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AdvisorError {
    fn from(err: toml::de::Error) -> Self {
        AdvisorError::Config {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_error_names_the_service() {
        let e = AdvisorError::Credential { service: "OpenAI" };
        assert_eq!(e.to_string(), "Credential error: OpenAI API key is not set");
    }

    #[test]
    fn json_errors_map_to_serialization() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let e: AdvisorError = err.into();
        assert!(matches!(e, AdvisorError::Serialization { .. }));
    }
}
