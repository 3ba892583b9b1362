//! Telegram Bot API abstraction
//!
//! Only the five calls the linking and publishing flows need are modelled.
//! Each account carries its own bot token, so callers go through a
//! [`BotApiConnector`] to get a [`BotApi`] bound to a token.
//!
//! # Examples
//!
//! ```no_run
//! use libtelecast::config::TelegramConfig;
//! use libtelecast::telegram::{client::HttpConnector, BotApiConnector};
//!
//! # async fn example() -> libtelecast::Result<()> {
//! let connector = HttpConnector::new(&TelegramConfig::default())?;
//! let api = connector.connect("123456:ABC-DEF");
//!
//! let me = api.get_me().await?;
//! if me.ok {
//!     println!("token accepted");
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ProviderError, Result};

pub mod client;
pub mod mock;

/// Envelope every Bot API method answers with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(result: T) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error_code: None,
            description: None,
        }
    }

    pub fn failure(error_code: i64, description: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error_code: Some(error_code),
            description: Some(description.into()),
        }
    }

    /// Turn an `ok: false` envelope into a provider error
    pub fn into_result(self) -> std::result::Result<Option<T>, ProviderError> {
        if self.ok {
            Ok(self.result)
        } else {
            Err(ProviderError::Api {
                code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl Chat {
    /// Group and supergroup chats are the ones that can be linked
    pub fn is_group(&self) -> bool {
        matches!(self.kind.as_str(), "group" | "supergroup")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Bot API calls bound to one bot token
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Check the token; `ok: false` means the bot is unknown or revoked
    async fn get_me(&self) -> Result<ApiResponse<User>>;

    /// Recent updates the bot has received
    async fn get_updates(&self) -> Result<ApiResponse<Vec<Update>>>;

    /// Send a photo by URL, file id or local path
    async fn send_photo(&self, chat_id: &str, photo: &str) -> Result<ApiResponse<Message>>;

    /// Send a video by URL, file id or local path
    async fn send_video(&self, chat_id: &str, video: &str) -> Result<ApiResponse<Message>>;

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<ApiResponse<Message>>;
}

/// Builds a [`BotApi`] for a bot token
pub trait BotApiConnector: Send + Sync {
    fn connect(&self, token: &str) -> Arc<dyn BotApi>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_get_me_success() {
        let body = r#"{"ok":true,"result":{"id":42,"is_bot":true,"first_name":"Poster","username":"poster_bot"}}"#;
        let response: ApiResponse<User> = serde_json::from_str(body).unwrap();
        assert!(response.ok);
        assert_eq!(response.result.unwrap().username.as_deref(), Some("poster_bot"));
    }

    #[test]
    fn test_decode_unauthorized() {
        let body = r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#;
        let response: ApiResponse<User> = serde_json::from_str(body).unwrap();
        assert!(!response.ok);

        let err = response.into_result().unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Telegram API error 401: Unauthorized");
    }

    #[test]
    fn test_decode_updates_with_mixed_payloads() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 1, "message": {"message_id": 5, "chat": {"id": -100555, "type": "supergroup", "title": "Ops", "username": "ops_team"}, "text": "hi"}},
                {"update_id": 2, "edited_message": {"message_id": 5}},
                {"update_id": 3, "message": {"message_id": 6, "chat": {"id": 99, "type": "private", "first_name": "Ann"}}}
            ]
        }"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let updates = response.result.unwrap();
        assert_eq!(updates.len(), 3);

        let chat = &updates[0].message.as_ref().unwrap().chat;
        assert!(chat.is_group());
        assert_eq!(chat.title.as_deref(), Some("Ops"));
        assert!(updates[1].message.is_none());
        assert!(!updates[2].message.as_ref().unwrap().chat.is_group());
    }

    #[test]
    fn test_failure_without_description() {
        let response: ApiResponse<Message> = ApiResponse {
            ok: false,
            result: None,
            error_code: None,
            description: None,
        };
        match response.into_result() {
            Err(ProviderError::Api { code, description }) => {
                assert_eq!(code, None);
                assert_eq!(description, "Unknown error");
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }
}
