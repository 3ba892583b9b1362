//! Core types for Telecast

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TelecastError;

/// Value of `social_network` for every row this integration writes
pub const SOCIAL_NETWORK: &str = "telegram";

/// Value of `category` for linked group chats
pub const GROUP_CATEGORY: &str = "group";

const WEB_CHAT_URL: &str = "https://web.telegram.org/#/im?p=@";

/// Web client link for a chat handle
pub fn chat_url(username: &str) -> String {
    format!("{}{}", WEB_CHAT_URL, username)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountStatus {
    Deactivated,
    Active,
}

impl AccountStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            AccountStatus::Active => 1,
            AccountStatus::Deactivated => 0,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 1 {
            AccountStatus::Active
        } else {
            AccountStatus::Deactivated
        }
    }
}

/// A row of the shared `sp_account_manager` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: i64,
    pub ids: String,
    pub social_network: String,
    pub category: String,
    pub login_type: i64,
    pub can_post: i64,
    pub team_id: i64,
    pub pid: String,
    pub name: String,
    pub username: String,
    pub token: String,
    pub avatar: String,
    pub url: String,
    pub data: Option<String>,
    pub status: AccountStatus,
    pub changed: i64,
    pub created: i64,
}

/// Values written when a chat is linked or relinked
///
/// The row id, public id and `created` timestamp are owned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountDraft {
    pub team_id: i64,
    pub pid: String,
    pub name: String,
    pub username: String,
    pub token: String,
    pub avatar: String,
}

impl AccountDraft {
    pub fn url(&self) -> String {
        chat_url(&self.username)
    }
}

/// A chat discovered through `getUpdates`, waiting for the user to pick it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateProfile {
    pub id: String,
    pub name: String,
    pub avatar: String,
    /// Chat username, or the title when the chat has none
    pub desc: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Photo,
    Video,
    Link,
    Text,
}

impl PostType {
    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Photo => "photo",
            PostType::Video => "video",
            PostType::Link => "link",
            PostType::Text => "text",
        }
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostType {
    type Err = TelecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "photo" => Ok(PostType::Photo),
            "video" => Ok(PostType::Video),
            "link" => Ok(PostType::Link),
            "text" => Ok(PostType::Text),
            other => Err(TelecastError::Validation(format!(
                "Unsupported post type '{}'. Valid options: photo, video, link, text",
                other
            ))),
        }
    }
}

/// One recorded publish attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRecord {
    pub id: Option<i64>,
    pub account_id: i64,
    pub post_type: PostType,
    pub platform_post_id: Option<String>,
    pub url: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub posted_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// JSON body returned by every action
///
/// Optional fields are omitted when unset, so `token` answers
/// `{"status":"success","message":"Success"}` while a post answers with its
/// message id, permalink and type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub post_type: Option<PostType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl ActionResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: Some(message.into()),
            id: None,
            url: None,
            post_type: None,
            result: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            ..Self::success(message)
        }
    }

    pub fn from_error(error: &TelecastError) -> Self {
        Self::error(error.user_message())
    }

    pub fn with_result<T: Serialize>(mut self, result: &T) -> Self {
        self.result = serde_json::to_value(result).ok();
        self
    }

    pub fn with_type(mut self, post_type: PostType) -> Self {
        self.post_type = Some(post_type);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Fresh public identifier for a new account row
pub fn new_public_id() -> String {
    Uuid::new_v4().simple().to_string()
}
