//! HTTP implementation of the Bot API over reqwest

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

use crate::config::TelegramConfig;
use crate::error::{ProviderError, Result};
use crate::telegram::{ApiResponse, BotApi, BotApiConnector, Message, Update, User};

/// Shares one HTTP client between every token it connects
#[derive(Clone)]
pub struct HttpConnector {
    client: Client,
    api_url: String,
}

impl HttpConnector {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

impl BotApiConnector for HttpConnector {
    fn connect(&self, token: &str) -> Arc<dyn BotApi> {
        Arc::new(TelegramClient {
            client: self.client.clone(),
            base_url: format!("{}/bot{}", self.api_url, token),
        })
    }
}

pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// POST a JSON payload and decode the envelope.
    ///
    /// The Bot API reports failures with a non-2xx status and an `ok: false`
    /// body, so the body is decoded whatever the status.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<ApiResponse<T>> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("{} request failed: {}", method, e)))?;

        decode(method, response).await
    }

    async fn upload<T: DeserializeOwned>(
        &self,
        method: &str,
        chat_id: &str,
        field: &str,
        path: &Path,
    ) -> Result<ApiResponse<T>> {
        let file_bytes = tokio::fs::read(path).await.map_err(|e| {
            ProviderError::Network(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(field)
            .to_string();

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field.to_string(), Part::bytes(file_bytes).file_name(file_name));

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("{} upload failed: {}", method, e)))?;

        decode(method, response).await
    }

    /// Local files are uploaded; anything else (URL, file id) is passed by reference
    async fn send_media(
        &self,
        method: &str,
        field: &str,
        chat_id: &str,
        media: &str,
    ) -> Result<ApiResponse<Message>> {
        let path = Path::new(media);
        if path.is_file() {
            tracing::debug!("Uploading {} for {}", path.display(), method);
            return self.upload(method, chat_id, field, path).await;
        }

        let payload = serde_json::json!({ "chat_id": chat_id, field: media });
        self.call(method, &payload).await
    }
}

async fn decode<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<ApiResponse<T>> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Network(format!("{} response failed: {}", method, e)))?;

    let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
        ProviderError::Decode(format!("{} returned HTTP {}: {}", method, status, e))
    })?;

    if !envelope.ok {
        tracing::debug!(
            "{} returned ok=false (code {:?}): {:?}",
            method,
            envelope.error_code,
            envelope.description
        );
    }

    Ok(envelope)
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_me(&self) -> Result<ApiResponse<User>> {
        self.call("getMe", &serde_json::json!({})).await
    }

    async fn get_updates(&self) -> Result<ApiResponse<Vec<Update>>> {
        // Telegram keeps any `allowed_updates` filter for later polls of the bot
        self.call("getUpdates", &serde_json::json!({})).await
    }

    async fn send_photo(&self, chat_id: &str, photo: &str) -> Result<ApiResponse<Message>> {
        self.send_media("sendPhoto", "photo", chat_id, photo).await
    }

    async fn send_video(&self, chat_id: &str, video: &str) -> Result<ApiResponse<Message>> {
        self.send_media("sendVideo", "video", chat_id, video).await
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<ApiResponse<Message>> {
        let payload = serde_json::json!({ "chat_id": chat_id, "text": text });
        self.call("sendMessage", &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(api_url: &str) -> HttpConnector {
        HttpConnector::new(&TelegramConfig {
            api_url: api_url.to_string(),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_method_url_includes_token() {
        let client = TelegramClient {
            client: Client::new(),
            base_url: "https://api.telegram.org/bot123:ABC".to_string(),
        };
        assert_eq!(
            client.method_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
        assert_eq!(
            client.method_url("sendPhoto"),
            "https://api.telegram.org/bot123:ABC/sendPhoto"
        );
    }

    #[test]
    fn test_connector_trims_trailing_slash() {
        let connector = connector("http://localhost:8081/");
        assert_eq!(connector.api_url, "http://localhost:8081");
    }

    /// True once the headers and the declared body have arrived
    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= end + 4 + length
    }

    #[tokio::test]
    async fn test_get_updates_sends_no_update_filter() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&raw) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let body = r#"{"ok":true,"result":[]}"#;
            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });

        let api = connector(&format!("http://{}", addr)).connect("123:ABC");
        let response = api.get_updates().await.unwrap();
        assert!(response.ok);
        assert_eq!(response.result.map(|updates| updates.len()), Some(0));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /bot123:ABC/getUpdates"), "{}", request);
        assert!(!request.contains("allowed_updates"), "{}", request);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_network_error() {
        // Port 9 (discard) is closed on test machines
        let api = connector("http://127.0.0.1:9").connect("123:ABC");
        let result = api.get_me().await;
        assert!(matches!(
            result,
            Err(crate::error::TelecastError::Provider(ProviderError::Network(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_sent_by_reference() {
        let api = connector("http://127.0.0.1:9").connect("123:ABC");
        // Not a file on disk, so no upload is attempted; the request itself fails
        let result = api.send_photo("-100", "/definitely/not/here.jpg").await;
        assert!(matches!(
            result,
            Err(crate::error::TelecastError::Provider(ProviderError::Network(msg))) if msg.starts_with("sendPhoto request failed")
        ));
    }
}
