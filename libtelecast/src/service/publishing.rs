//! Publishing to linked Telegram groups

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Result, TelecastError};
use crate::media::Watermark;
use crate::spintax;
use crate::telegram::{ApiResponse, BotApi, BotApiConnector, Message};
use crate::types::{
    chat_url, Account, AccountStatus, ActionResponse, PostRecord, PostType,
};

/// One publish action against a linked account
#[derive(Debug, Clone)]
pub struct PostRequest {
    pub post_type: PostType,
    pub account: Account,
    /// Local paths or URLs; photo and video posts use the first one
    pub medias: Vec<String>,
    pub link: Option<String>,
    /// Scheduling options; opaque here
    pub advance: serde_json::Value,
    pub caption: String,
    pub is_schedule: bool,
}

impl PostRequest {
    pub fn new(post_type: PostType, account: Account, caption: impl Into<String>) -> Self {
        Self {
            post_type,
            account,
            medias: Vec::new(),
            link: None,
            advance: serde_json::Value::Null,
            caption: caption.into(),
            is_schedule: false,
        }
    }
}

#[derive(Clone)]
pub struct Publisher {
    db: Arc<Database>,
    connector: Arc<dyn BotApiConnector>,
    watermark: Arc<dyn Watermark>,
}

impl Publisher {
    pub fn new(
        db: Arc<Database>,
        connector: Arc<dyn BotApiConnector>,
        watermark: Arc<dyn Watermark>,
    ) -> Self {
        Self {
            db,
            connector,
            watermark,
        }
    }

    /// Load the account a post is aimed at
    pub async fn account(&self, team_id: i64, account_id: i64) -> Result<Account> {
        self.db
            .get_account(team_id, account_id)
            .await?
            .ok_or_else(|| {
                TelecastError::Validation(format!("Account {} not found", account_id))
            })
    }

    /// Publish `request` and describe the outcome
    ///
    /// Provider rejections and transport failures come back as an error
    /// response, not as `Err`; the attempt is recorded either way. A 401
    /// deactivates the account.
    ///
    /// # Errors
    ///
    /// `Validation` when a photo or video post has no media.
    pub async fn post(&self, request: PostRequest) -> Result<ActionResponse> {
        let post_type = request.post_type;

        if request.is_schedule {
            debug!("Post for account {} is scheduled, nothing sent", request.account.id);
            return Ok(ActionResponse::success("Success").with_type(post_type));
        }

        let account = &request.account;
        let caption = spintax::spin(&request.caption);
        let api = self.connector.connect(&account.token);
        let chat_id = account.pid.as_str();

        let outcome = match post_type {
            PostType::Photo => {
                let mut medias = request.medias.clone();
                let first = medias.first_mut().ok_or_else(|| missing_media(post_type))?;
                let prepared = self.watermark.apply(first, account.team_id, account.id);
                *first = prepared;

                let sent = api.send_photo(chat_id, &medias[0]).await;
                self.follow_up(api.as_ref(), chat_id, &caption).await;
                self.watermark.release(&medias);
                sent
            }
            PostType::Video => {
                let media = request.medias.first().ok_or_else(|| missing_media(post_type))?;
                let sent = api.send_video(chat_id, media).await;
                self.follow_up(api.as_ref(), chat_id, &caption).await;
                sent
            }
            PostType::Link => {
                let text = link_text(&caption, request.link.as_deref());
                api.send_message(chat_id, &text).await
            }
            PostType::Text => api.send_message(chat_id, &caption).await,
        };

        let (response, record) = match outcome {
            Ok(envelope) => self.settle(account, post_type, envelope).await,
            Err(TelecastError::Provider(e)) => {
                warn!("Post to account {} failed: {}", account.id, e);
                let message = e.to_string();
                (
                    ActionResponse::error(message.clone()).with_type(post_type),
                    failed_record(account.id, post_type, message),
                )
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.db.create_post_record(&record).await {
            warn!("Failed to record post for account {}: {}", account.id, e);
        }

        Ok(response)
    }

    async fn settle(
        &self,
        account: &Account,
        post_type: PostType,
        envelope: ApiResponse<Message>,
    ) -> (ActionResponse, PostRecord) {
        if envelope.ok {
            let message = envelope.result;
            let handle = message
                .as_ref()
                .and_then(|m| m.chat.username.clone())
                .unwrap_or_else(|| account.username.clone());
            let url = chat_url(&handle);
            let message_id = message.as_ref().map(|m| m.message_id);

            info!("Posted {} to account {} ({})", post_type, account.id, account.name);

            let mut response = ActionResponse::success("Success").with_type(post_type);
            response.id = message_id;
            response.url = Some(url.clone());

            let record = PostRecord {
                id: None,
                account_id: account.id,
                post_type,
                platform_post_id: message_id.map(|id| id.to_string()),
                url: Some(url),
                success: true,
                error_message: None,
                posted_at: chrono::Utc::now().timestamp(),
            };
            return (response, record);
        }

        let description = envelope
            .description
            .unwrap_or_else(|| "Unknown error".to_string());

        if envelope.error_code == Some(401) {
            warn!(
                "Telegram rejected the token of account {}, deactivating it",
                account.id
            );
            if let Err(e) = self
                .db
                .set_account_status(account.id, AccountStatus::Deactivated)
                .await
            {
                warn!("Failed to deactivate account {}: {}", account.id, e);
            }
        } else {
            warn!(
                "Post to account {} rejected (code {:?}): {}",
                account.id, envelope.error_code, description
            );
        }

        (
            ActionResponse::error(description.clone()).with_type(post_type),
            failed_record(account.id, post_type, description),
        )
    }

    /// Send the caption after a photo or video; failures are only logged
    async fn follow_up(&self, api: &dyn BotApi, chat_id: &str, caption: &str) {
        if caption.trim().is_empty() {
            return;
        }

        match api.send_message(chat_id, caption).await {
            Ok(envelope) if envelope.ok => {}
            Ok(envelope) => warn!(
                "Caption follow-up to {} rejected: {}",
                chat_id,
                envelope.description.unwrap_or_default()
            ),
            Err(e) => warn!("Caption follow-up to {} failed: {}", chat_id, e),
        }
    }

    /// Recorded attempts for an account, newest first
    pub async fn history(&self, account_id: i64, limit: usize) -> Result<Vec<PostRecord>> {
        self.db.get_post_records(account_id, limit).await
    }
}

fn missing_media(post_type: PostType) -> TelecastError {
    TelecastError::Validation(format!("A {} post needs a media item", post_type))
}

fn failed_record(account_id: i64, post_type: PostType, message: String) -> PostRecord {
    PostRecord {
        id: None,
        account_id,
        post_type,
        platform_post_id: None,
        url: None,
        success: false,
        error_message: Some(message),
        posted_at: chrono::Utc::now().timestamp(),
    }
}

/// Text of a link post
pub fn link_text(caption: &str, link: Option<&str>) -> String {
    match link {
        Some(link) => format!("{}\n{}", caption, link),
        None => caption.to_string(),
    }
}
