//! Per-team limit on linked Telegram accounts

use crate::db::Database;
use crate::error::{Result, TelecastError};

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountQuota {
    max_per_team: Option<u32>,
}

impl AccountQuota {
    pub fn new(max_per_team: Option<u32>) -> Self {
        Self { max_per_team }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn max_per_team(&self) -> Option<u32> {
        self.max_per_team
    }

    /// Fail when the team cannot take one more account
    ///
    /// Only consulted before inserting a new row; relinking an existing chat
    /// never counts against the limit.
    pub async fn check(&self, db: &Database, team_id: i64) -> Result<()> {
        let Some(max) = self.max_per_team else {
            return Ok(());
        };

        let current = db.count_accounts(team_id).await?;
        if current >= i64::from(max) {
            tracing::info!(
                "Team {} is at its Telegram account limit ({}/{})",
                team_id,
                current,
                max
            );
            return Err(TelecastError::QuotaExceeded(format!(
                "You have reached the maximum of {} Telegram accounts",
                max
            )));
        }

        Ok(())
    }
}
