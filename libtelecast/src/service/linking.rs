//! Linking Telegram groups to a team
//!
//! The flow has three steps, each a separate call carrying the same
//! [`LinkSession`]:
//!
//! 1. [`AccountLinker::token`] checks a bot token with `getMe` and keeps it.
//! 2. [`AccountLinker::list_profiles`] reads `getUpdates` and keeps the group
//!    chats the bot has seen as candidates.
//! 3. [`AccountLinker::save`] upserts the selected candidates as account rows
//!    and ends the session.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::avatar::AvatarCache;
use crate::db::Database;
use crate::error::{Result, TelecastError};
use crate::quota::AccountQuota;
use crate::session::{LinkSession, SessionStore};
use crate::telegram::{BotApiConnector, Update};
use crate::types::{Account, AccountDraft, CandidateProfile};

const AVATAR_SERVICE: &str = "https://ui-avatars.com/api";

#[derive(Clone)]
pub struct AccountLinker {
    db: Arc<Database>,
    connector: Arc<dyn BotApiConnector>,
    avatars: Arc<dyn AvatarCache>,
    sessions: SessionStore,
    quota: AccountQuota,
}

impl AccountLinker {
    pub fn new(
        db: Arc<Database>,
        connector: Arc<dyn BotApiConnector>,
        avatars: Arc<dyn AvatarCache>,
        sessions: SessionStore,
        quota: AccountQuota,
    ) -> Self {
        Self {
            db,
            connector,
            avatars,
            sessions,
            quota,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Start a new link flow, dropping anything left from an earlier one
    pub fn start(&self, session: &mut LinkSession) -> Result<()> {
        self.sessions.clear(session)
    }

    /// Verify a bot token and keep it in the session
    ///
    /// # Errors
    ///
    /// - `Validation` if the token is blank; the provider is not contacted
    /// - `Unauthorized` if `getMe` answers `ok: false` or cannot be reached
    pub async fn token(&self, session: &mut LinkSession, access_token: &str) -> Result<()> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(TelecastError::Validation(
                "Please enter access token".to_string(),
            ));
        }

        let me = match self.connector.connect(access_token).get_me().await {
            Ok(me) if me.ok => me,
            Ok(me) => {
                warn!(
                    "getMe rejected the submitted token (code {:?}): {:?}",
                    me.error_code, me.description
                );
                return Err(TelecastError::Unauthorized);
            }
            Err(e) => {
                warn!("getMe failed: {}", e);
                return Err(TelecastError::Unauthorized);
            }
        };

        if let Some(bot) = me.result.as_ref() {
            info!("Bot token accepted for {}", bot.username.as_deref().unwrap_or(&bot.first_name));
        }

        session.set_access_token(access_token);
        // Candidates found with another bot no longer apply
        session.set_profiles(Vec::new());
        self.sessions.save(session)?;

        Ok(())
    }

    /// Discover the group chats the session's bot has received messages from
    ///
    /// # Errors
    ///
    /// `NoCandidates` when there is no token, the provider call fails, or no
    /// group chat shows up in the updates.
    pub async fn list_profiles(&self, session: &mut LinkSession) -> Result<Vec<CandidateProfile>> {
        let Some(token) = session.access_token().map(str::to_string) else {
            warn!("Listing profiles without a token in session {}", session.key());
            return Err(TelecastError::NoCandidates);
        };

        let response = match self.connector.connect(&token).get_updates().await {
            Ok(response) if response.ok => response,
            Ok(response) => {
                warn!(
                    "getUpdates failed (code {:?}): {:?}",
                    response.error_code, response.description
                );
                return Err(TelecastError::NoCandidates);
            }
            Err(e) => {
                warn!("getUpdates failed: {}", e);
                return Err(TelecastError::NoCandidates);
            }
        };

        let profiles = candidates_from_updates(response.result.as_deref().unwrap_or_default());
        session.set_profiles(profiles.clone());
        self.sessions.save(session)?;

        if profiles.is_empty() {
            return Err(TelecastError::NoCandidates);
        }

        info!("Found {} candidate group(s)", profiles.len());
        Ok(profiles)
    }

    /// Link the selected candidates to `team_id`
    ///
    /// Each chat is inserted, or updated when the team already has it. The
    /// session is cleared afterwards whether or not saving succeeded.
    ///
    /// Returns the number of accounts written.
    pub async fn save(
        &self,
        session: &mut LinkSession,
        selected_ids: &[String],
        team_id: i64,
    ) -> Result<usize> {
        let outcome = self.save_selected(session, selected_ids, team_id).await;

        if let Err(e) = self.sessions.clear(session) {
            warn!("Failed to clear session {}: {}", session.key(), e);
        }

        outcome
    }

    async fn save_selected(
        &self,
        session: &LinkSession,
        selected_ids: &[String],
        team_id: i64,
    ) -> Result<usize> {
        if selected_ids.is_empty() {
            return Err(TelecastError::Validation(
                "Please select a profile to add".to_string(),
            ));
        }

        let Some(token) = session.access_token() else {
            return Err(TelecastError::Validation(
                "Please enter access token".to_string(),
            ));
        };

        let selected: HashSet<&str> = selected_ids.iter().map(String::as_str).collect();
        let now = chrono::Utc::now().timestamp();
        let mut processed = 0;

        for profile in session
            .profiles()
            .iter()
            .filter(|p| selected.contains(p.id.as_str()))
        {
            let existing = self.db.find_account(team_id, &profile.id).await?;

            match existing {
                None => {
                    self.quota.check(&self.db, team_id).await?;
                    let draft = self.draft(team_id, profile, token).await;
                    let id = self.db.insert_account(&draft, now).await?;
                    info!("Linked group {} ({}) as account {}", profile.name, profile.id, id);
                }
                Some(account) => {
                    let draft = self.draft(team_id, profile, token).await;
                    self.avatars.remove(&account.avatar);
                    self.db.update_account(account.id, &draft, now).await?;
                    info!("Relinked group {} ({}) on account {}", profile.name, profile.id, account.id);
                }
            }

            processed += 1;
        }

        if processed == 0 {
            return Err(TelecastError::NoCandidates);
        }

        Ok(processed)
    }

    async fn draft(&self, team_id: i64, profile: &CandidateProfile, token: &str) -> AccountDraft {
        AccountDraft {
            team_id,
            pid: profile.id.clone(),
            name: profile.name.clone(),
            username: profile.desc.clone(),
            token: token.to_string(),
            avatar: self.avatars.store(&profile.avatar).await,
        }
    }

    /// Linked groups of a team, newest first
    pub async fn list_accounts(&self, team_id: i64) -> Result<Vec<Account>> {
        self.db.list_accounts(team_id).await
    }
}

/// Group chats seen in `updates`, one per chat id, in first-seen order
pub fn candidates_from_updates(updates: &[Update]) -> Vec<CandidateProfile> {
    let mut seen = HashSet::new();

    updates
        .iter()
        .filter_map(|update| update.message.as_ref())
        .map(|message| &message.chat)
        .filter(|chat| chat.is_group())
        .filter(|chat| seen.insert(chat.id))
        .map(|chat| {
            let title = chat.title.clone().unwrap_or_else(|| chat.id.to_string());
            CandidateProfile {
                id: chat.id.to_string(),
                avatar: avatar_url(&title),
                desc: chat.username.clone().unwrap_or_else(|| title.clone()),
                name: title,
            }
        })
        .collect()
}

/// Generated letter avatar for a chat title
pub fn avatar_url(title: &str) -> String {
    let params = [
        ("name", title),
        ("size", "128"),
        ("background", "0088cc"),
        ("color", "fff"),
    ];

    match reqwest::Url::parse_with_params(AVATAR_SERVICE, &params) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}?name={}", AVATAR_SERVICE, title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::mock::{group_update, private_update};

    #[test]
    fn test_candidates_skip_private_and_empty_updates() {
        let updates = vec![
            private_update(1, 42),
            Update {
                update_id: 2,
                message: None,
            },
            group_update(3, -100555, "Ops", Some("ops_team")),
        ];

        let candidates = candidates_from_updates(&updates);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "-100555");
        assert_eq!(candidates[0].name, "Ops");
        assert_eq!(candidates[0].desc, "ops_team");
    }

    #[test]
    fn test_candidates_first_occurrence_wins() {
        let updates = vec![
            group_update(1, 555, "First title", Some("first")),
            group_update(2, 777, "Other", None),
            group_update(3, 555, "Renamed", Some("second")),
        ];

        let candidates = candidates_from_updates(&updates);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "555");
        assert_eq!(candidates[0].name, "First title");
        assert_eq!(candidates[0].desc, "first");
        assert_eq!(candidates[1].id, "777");
    }

    #[test]
    fn test_desc_falls_back_to_title() {
        let candidates = candidates_from_updates(&[group_update(1, 9, "No Handle", None)]);
        assert_eq!(candidates[0].desc, "No Handle");
    }

    #[test]
    fn test_avatar_url_encodes_title() {
        let url = avatar_url("Dev & Ops");
        assert!(url.starts_with("https://ui-avatars.com/api?name="));
        assert!(url.contains("size=128"));
        assert!(url.contains("background=0088cc"));
        assert!(url.contains("color=fff"));
        assert!(!url.contains("Dev & Ops"));
    }
}
