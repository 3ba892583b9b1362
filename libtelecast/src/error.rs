//! Error types for Telecast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelecastError>;

#[derive(Error, Debug)]
pub enum TelecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("No profile to add")]
    NoCandidates,

    #[error("{0}")]
    QuotaExceeded(String),
}

impl TelecastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TelecastError::Validation(_) => 3,
            TelecastError::Unauthorized => 2,
            TelecastError::Provider(e) if e.is_unauthorized() => 2,
            TelecastError::Provider(_) => 1,
            TelecastError::NoCandidates => 1,
            TelecastError::QuotaExceeded(_) => 1,
            TelecastError::Session(_) => 1,
            TelecastError::Config(_) => 1,
            TelecastError::Database(_) => 1,
        }
    }

    /// Text shown to the person driving the action.
    ///
    /// Errors the user can act on carry their bare message. Infrastructure
    /// errors keep their category prefix.
    pub fn user_message(&self) -> String {
        match self {
            TelecastError::Provider(ProviderError::Api { description, .. }) => description.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failures talking to the Telegram Bot API
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The request never produced a response (DNS, TLS, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// A response arrived but was not a Bot API envelope
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The Bot API answered with `ok: false`
    #[error("Telegram API error{}: {}", .code.map(|c| format!(" {c}")).unwrap_or_default(), .description)]
    Api {
        code: Option<i64>,
        description: String,
    },
}

impl ProviderError {
    /// Whether the provider rejected the bot token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ProviderError::Api { code: Some(401), .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_validation() {
        let error = TelecastError::Validation("Please enter access token".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_unauthorized() {
        assert_eq!(TelecastError::Unauthorized.exit_code(), 2);

        let provider = TelecastError::Provider(ProviderError::Api {
            code: Some(401),
            description: "Unauthorized".to_string(),
        });
        assert_eq!(provider.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        assert_eq!(TelecastError::NoCandidates.exit_code(), 1);
        assert_eq!(
            TelecastError::Provider(ProviderError::Network("refused".to_string())).exit_code(),
            1
        );
        assert_eq!(
            TelecastError::Config(ConfigError::MissingField("database.path".to_string()))
                .exit_code(),
            1
        );
        assert_eq!(
            TelecastError::QuotaExceeded("limit reached".to_string()).exit_code(),
            1
        );
    }

    #[test]
    fn test_user_facing_messages_are_bare() {
        assert_eq!(TelecastError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(TelecastError::NoCandidates.to_string(), "No profile to add");
        assert_eq!(
            TelecastError::Validation("Please select a profile to add".to_string()).to_string(),
            "Please select a profile to add"
        );
    }

    #[test]
    fn test_user_message_uses_provider_description() {
        let error = TelecastError::Provider(ProviderError::Api {
            code: Some(400),
            description: "Bad Request: chat not found".to_string(),
        });
        assert_eq!(error.user_message(), "Bad Request: chat not found");
        assert_eq!(
            error.to_string(),
            "Provider error: Telegram API error 400: Bad Request: chat not found"
        );
    }

    #[test]
    fn test_api_error_without_code() {
        let error = ProviderError::Api {
            code: None,
            description: "Not Found".to_string(),
        };
        assert_eq!(error.to_string(), "Telegram API error: Not Found");
        assert!(!error.is_unauthorized());
    }

    #[test]
    fn test_error_conversion_from_config_error() {
        let config_error = ConfigError::MissingField("test".to_string());
        let error: TelecastError = config_error.into();

        match error {
            TelecastError::Config(_) => {}
            _ => panic!("Expected TelecastError::Config"),
        }
    }

    #[test]
    fn test_error_conversion_from_provider_error() {
        let error: TelecastError = ProviderError::Network("timeout".to_string()).into();

        match error {
            TelecastError::Provider(ProviderError::Network(msg)) => assert_eq!(msg, "timeout"),
            _ => panic!("Expected TelecastError::Provider"),
        }
    }
}
