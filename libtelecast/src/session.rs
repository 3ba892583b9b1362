//! Link session: state carried between the steps of linking a group
//!
//! The flow spans several invocations (submit token, list chats, save
//! selection), so the session is persisted as a small TOML file per session
//! key. It holds the submitted bot token and the candidate chats found by the
//! last `getUpdates`. `save` clears it whatever the outcome.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TelecastError};
use crate::types::CandidateProfile;

/// In-memory view of one link session
#[derive(Debug)]
pub struct LinkSession {
    key: String,
    access_token: Option<SecretString>,
    profiles: Vec<CandidateProfile>,
}

impl LinkSession {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            access_token: None,
            profiles: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(|t| t.expose_secret())
    }

    pub fn set_access_token(&mut self, token: &str) {
        self.access_token = Some(SecretString::from(token.to_string()));
    }

    pub fn profiles(&self) -> &[CandidateProfile] {
        &self.profiles
    }

    pub fn set_profiles(&mut self, profiles: Vec<CandidateProfile>) {
        self.profiles = profiles;
    }

    /// Forget the token and the candidates
    pub fn clear(&mut self) {
        self.access_token = None;
        self.profiles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.profiles.is_empty()
    }
}

/// On-disk layout. Profiles are kept JSON-encoded under their historical key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    telegram_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    telegram_profiles: Option<String>,
}

/// Directory of session files, one per session key
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Session keys become file names, so they are restricted
    pub fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(TelecastError::Validation(
                "Session name cannot be empty".to_string(),
            ));
        }

        if key.len() > 64 {
            return Err(TelecastError::Validation(format!(
                "Session name too long: {} characters (max 64)",
                key.len()
            )));
        }

        if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(TelecastError::Validation(format!(
                "Invalid session name '{}'. Must be alphanumeric with hyphens/underscores only",
                key
            )));
        }

        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", key))
    }

    /// Load a session, or start an empty one when none is stored
    ///
    /// A corrupted file is treated as an empty session.
    pub fn load(&self, key: &str) -> Result<LinkSession> {
        Self::validate_key(key)?;
        let mut session = LinkSession::new(key);

        let path = self.path_for(key);
        if !path.exists() {
            return Ok(session);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| TelecastError::Session(format!("Failed to read session file: {}", e)))?;

        let file = match toml::from_str::<SessionFile>(&content) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Corrupted session file {}, starting fresh: {}", path.display(), e);
                return Ok(session);
            }
        };

        if let Some(token) = file.telegram_access_token.filter(|t| !t.is_empty()) {
            session.set_access_token(&token);
        }

        if let Some(encoded) = file.telegram_profiles {
            match serde_json::from_str::<Vec<CandidateProfile>>(&encoded) {
                Ok(profiles) => session.set_profiles(profiles),
                Err(e) => tracing::warn!("Ignoring unreadable candidate list: {}", e),
            }
        }

        Ok(session)
    }

    /// Persist a session; an empty session removes its file
    pub fn save(&self, session: &LinkSession) -> Result<()> {
        Self::validate_key(session.key())?;
        let path = self.path_for(session.key());

        if session.is_empty() {
            return remove_file(&path);
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            TelecastError::Session(format!("Failed to create session directory: {}", e))
        })?;

        let profiles = serde_json::to_string(session.profiles()).map_err(|e| {
            TelecastError::Session(format!("Failed to encode candidate list: {}", e))
        })?;

        let file = SessionFile {
            telegram_access_token: session.access_token().map(str::to_string),
            telegram_profiles: Some(profiles),
        };

        let content = toml::to_string_pretty(&file)
            .map_err(|e| TelecastError::Session(format!("Failed to serialize session: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| TelecastError::Session(format!("Failed to write session file: {}", e)))?;

        // The file holds a bot token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| TelecastError::Session(format!("Failed to set permissions: {}", e)),
            )?;
        }

        Ok(())
    }

    /// Clear a session in memory and on disk
    pub fn clear(&self, session: &mut LinkSession) -> Result<()> {
        session.clear();
        self.save(session)
    }
}

fn remove_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TelecastError::Session(format!(
            "Failed to remove session file: {}",
            e
        ))),
    }
}
