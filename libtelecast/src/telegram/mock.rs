//! Recording Bot API double
//!
//! `MockBotApi` answers every call with a configurable response and records
//! what was asked of it, so linking and publishing can be tested without a
//! network. It is compiled for all builds so integration tests and the CLI
//! tests can use it.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ProviderError, Result};
use crate::telegram::{ApiResponse, BotApi, BotApiConnector, Chat, Message, Update, User};

/// One recorded Bot API call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    GetMe { token: String },
    GetUpdates { token: String },
    SendPhoto { token: String, chat_id: String, photo: String },
    SendVideo { token: String, chat_id: String, video: String },
    SendMessage { token: String, chat_id: String, text: String },
}

impl MockCall {
    pub fn method(&self) -> &'static str {
        match self {
            MockCall::GetMe { .. } => "getMe",
            MockCall::GetUpdates { .. } => "getUpdates",
            MockCall::SendPhoto { .. } => "sendPhoto",
            MockCall::SendVideo { .. } => "sendVideo",
            MockCall::SendMessage { .. } => "sendMessage",
        }
    }
}

/// Canned answers, replaced wholesale or per method
#[derive(Debug, Clone)]
pub struct MockResponses {
    pub get_me: std::result::Result<ApiResponse<User>, ProviderError>,
    pub get_updates: std::result::Result<ApiResponse<Vec<Update>>, ProviderError>,
    pub send: std::result::Result<ApiResponse<Message>, ProviderError>,
    /// Answer for `sendMessage` only; falls back to `send` when unset
    pub send_message: Option<std::result::Result<ApiResponse<Message>, ProviderError>>,
}

impl Default for MockResponses {
    fn default() -> Self {
        Self {
            get_me: Ok(ApiResponse::success(User {
                id: 1,
                is_bot: true,
                first_name: "Mock".to_string(),
                username: Some("mock_bot".to_string()),
            })),
            get_updates: Ok(ApiResponse::success(Vec::new())),
            send: Ok(ApiResponse::success(sent_message(1, "mock_group"))),
            send_message: None,
        }
    }
}

/// Message as returned by a successful send
pub fn sent_message(message_id: i64, chat_username: &str) -> Message {
    Message {
        message_id,
        chat: Chat {
            id: -100,
            kind: "supergroup".to_string(),
            title: Some("Mock group".to_string()),
            username: Some(chat_username.to_string()),
        },
        text: None,
    }
}

/// Update carrying a message posted in a group chat
pub fn group_update(update_id: i64, chat_id: i64, title: &str, username: Option<&str>) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id: update_id,
            chat: Chat {
                id: chat_id,
                kind: "group".to_string(),
                title: Some(title.to_string()),
                username: username.map(str::to_string),
            },
            text: Some("hello".to_string()),
        }),
    }
}

/// Update carrying a direct message to the bot
pub fn private_update(update_id: i64, chat_id: i64) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id: update_id,
            chat: Chat {
                id: chat_id,
                kind: "private".to_string(),
                title: None,
                username: Some("someone".to_string()),
            },
            text: Some("hi bot".to_string()),
        }),
    }
}

#[derive(Default)]
struct MockState {
    responses: MockResponses,
    calls: Vec<MockCall>,
}

/// Shared mock: every connected token talks to the same state
#[derive(Clone, Default)]
pub struct MockBotApi {
    state: Arc<Mutex<MockState>>,
}

impl MockBotApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: MockResponses) -> Self {
        let mock = Self::default();
        mock.lock().responses = responses;
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_get_me(&self, response: ApiResponse<User>) {
        self.lock().responses.get_me = Ok(response);
    }

    pub fn set_updates(&self, updates: Vec<Update>) {
        self.lock().responses.get_updates = Ok(ApiResponse::success(updates));
    }

    pub fn set_get_updates(&self, response: std::result::Result<ApiResponse<Vec<Update>>, ProviderError>) {
        self.lock().responses.get_updates = response;
    }

    pub fn set_send(&self, response: std::result::Result<ApiResponse<Message>, ProviderError>) {
        self.lock().responses.send = response;
    }

    pub fn set_send_message(&self, response: std::result::Result<ApiResponse<Message>, ProviderError>) {
        self.lock().responses.send_message = Some(response);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn record<T: Clone>(
        &self,
        call: MockCall,
        pick: impl FnOnce(&MockResponses) -> &std::result::Result<ApiResponse<T>, ProviderError>,
    ) -> Result<ApiResponse<T>> {
        let mut state = self.lock();
        state.calls.push(call);
        pick(&state.responses).clone().map_err(Into::into)
    }
}

impl BotApiConnector for MockBotApi {
    fn connect(&self, token: &str) -> Arc<dyn BotApi> {
        Arc::new(BoundMock {
            mock: self.clone(),
            token: token.to_string(),
        })
    }
}

struct BoundMock {
    mock: MockBotApi,
    token: String,
}

#[async_trait]
impl BotApi for BoundMock {
    async fn get_me(&self) -> Result<ApiResponse<User>> {
        let call = MockCall::GetMe {
            token: self.token.clone(),
        };
        self.mock.record(call, |r| &r.get_me)
    }

    async fn get_updates(&self) -> Result<ApiResponse<Vec<Update>>> {
        let call = MockCall::GetUpdates {
            token: self.token.clone(),
        };
        self.mock.record(call, |r| &r.get_updates)
    }

    async fn send_photo(&self, chat_id: &str, photo: &str) -> Result<ApiResponse<Message>> {
        let call = MockCall::SendPhoto {
            token: self.token.clone(),
            chat_id: chat_id.to_string(),
            photo: photo.to_string(),
        };
        self.mock.record(call, |r| &r.send)
    }

    async fn send_video(&self, chat_id: &str, video: &str) -> Result<ApiResponse<Message>> {
        let call = MockCall::SendVideo {
            token: self.token.clone(),
            chat_id: chat_id.to_string(),
            video: video.to_string(),
        };
        self.mock.record(call, |r| &r.send)
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<ApiResponse<Message>> {
        let call = MockCall::SendMessage {
            token: self.token.clone(),
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        };
        self.mock
            .record(call, |r| r.send_message.as_ref().unwrap_or(&r.send))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls_with_token() {
        let mock = MockBotApi::new();
        let api = mock.connect("123:ABC");

        assert!(api.get_me().await.unwrap().ok);
        api.send_message("-100", "hello").await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                MockCall::GetMe {
                    token: "123:ABC".to_string()
                },
                MockCall::SendMessage {
                    token: "123:ABC".to_string(),
                    chat_id: "-100".to_string(),
                    text: "hello".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_failure_response() {
        let mock = MockBotApi::new();
        mock.set_send(Ok(ApiResponse::failure(401, "Unauthorized")));

        let response = mock.connect("t").send_video("1", "clip.mp4").await.unwrap();
        assert!(!response.ok);
        assert_eq!(response.error_code, Some(401));
        assert_eq!(mock.calls()[0].method(), "sendVideo");
    }

    #[tokio::test]
    async fn test_send_message_override() {
        let mock = MockBotApi::new();
        mock.set_send_message(Ok(ApiResponse::failure(400, "Bad Request: message is too long")));
        let api = mock.connect("t");

        assert!(api.send_photo("1", "a.jpg").await.unwrap().ok);
        assert!(!api.send_message("1", "caption").await.unwrap().ok);
    }

    #[tokio::test]
    async fn test_mock_transport_error() {
        let mock = MockBotApi::new();
        mock.set_get_updates(Err(ProviderError::Network("connection reset".to_string())));

        let result = mock.connect("t").get_updates().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("connection reset"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_update_helpers() {
        let mock = MockBotApi::new();
        mock.set_updates(vec![group_update(1, 555, "Ops", Some("ops")), private_update(2, 9)]);

        let updates = mock.connect("t").get_updates().await.unwrap().result.unwrap();
        assert!(updates[0].message.as_ref().unwrap().chat.is_group());
        assert!(!updates[1].message.as_ref().unwrap().chat.is_group());
    }
}
