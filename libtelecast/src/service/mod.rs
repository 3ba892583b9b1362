//! Service layer for Telecast
//!
//! `TelecastService` wires the shared database, Bot API connector and caches
//! into the two sub-services the binaries drive:
//!
//! - `AccountLinker`: token check, group discovery and account upsert
//! - `Publisher`: sending posts through a linked account
//!
//! # Example
//!
//! ```no_run
//! use libtelecast::service::TelecastService;
//!
//! # async fn example() -> libtelecast::Result<()> {
//! let service = TelecastService::new().await?;
//!
//! let mut session = service.linking().sessions().load("default")?;
//! service.linking().token(&mut session, "123456:ABC-DEF").await?;
//! let profiles = service.linking().list_profiles(&mut session).await?;
//! println!("{} group(s) available", profiles.len());
//! # Ok(())
//! # }
//! ```

pub mod linking;
pub mod publishing;

use std::sync::Arc;

use self::linking::AccountLinker;
use self::publishing::Publisher;
use crate::avatar::{AvatarCache, HttpAvatarCache};
use crate::error::{ConfigError, TelecastError};
use crate::media::{NoWatermark, Watermark};
use crate::quota::AccountQuota;
use crate::session::SessionStore;
use crate::telegram::client::HttpConnector;
use crate::telegram::BotApiConnector;
use crate::{Config, Database, Result};

/// Main service facade
///
/// Both sub-services share one `Arc<Database>` and one connector.
pub struct TelecastService {
    db: Arc<Database>,
    linking: AccountLinker,
    publishing: Publisher,
}

impl TelecastService {
    /// Create a service from the configuration file, or defaults when there is none
    pub async fn new() -> Result<Self> {
        let config = Config::load_or_default()?;
        Self::from_config(config).await
    }

    /// Create a service talking to the real Bot API
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the database
    /// cannot be opened and migrated.
    pub async fn from_config(config: Config) -> Result<Self> {
        let connector = HttpConnector::new(&config.telegram)?;
        let avatars = HttpAvatarCache::new(connector.http_client().clone(), config.avatar_dir());

        Self::with_parts(config, Arc::new(connector), Arc::new(avatars), Arc::new(NoWatermark)).await
    }

    /// Create a service with caller-supplied collaborators
    pub async fn with_parts(
        config: Config,
        connector: Arc<dyn BotApiConnector>,
        avatars: Arc<dyn AvatarCache>,
        watermark: Arc<dyn Watermark>,
    ) -> Result<Self> {
        let db_path = crate::config::expand_path(&config.database.path);
        let db_path_str = db_path.to_str().ok_or_else(|| {
            TelecastError::Config(ConfigError::MissingField(
                "Invalid database path".to_string(),
            ))
        })?;
        let db = Arc::new(Database::new(db_path_str).await?);

        let linking = AccountLinker::new(
            Arc::clone(&db),
            Arc::clone(&connector),
            avatars,
            SessionStore::new(config.session_dir()),
            AccountQuota::new(config.accounts.max_per_team),
        );
        let publishing = Publisher::new(Arc::clone(&db), connector, watermark);

        Ok(Self {
            db,
            linking,
            publishing,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn linking(&self) -> &AccountLinker {
        &self.linking
    }

    pub fn publishing(&self) -> &Publisher {
        &self.publishing
    }
}
