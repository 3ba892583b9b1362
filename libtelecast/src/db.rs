//! Database operations for Telecast
//!
//! Accounts live in the shared `sp_account_manager` table. Every lookup is
//! scoped by team; a row is identified within a team by
//! `(social_network, category, pid)`.

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::error::{DbError, Result};
use crate::types::{
    new_public_id, Account, AccountDraft, AccountStatus, PostRecord, PostType, GROUP_CATEGORY,
    SOCIAL_NETWORK,
};

const ACCOUNT_COLUMNS: &str = "id, ids, social_network, category, login_type, can_post, team_id, \
     pid, name, username, token, avatar, url, data, status, changed, created";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // mode=rwc creates the file on first use
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Find a linked Telegram group by team and chat id
    pub async fn find_account(&self, team_id: i64, pid: &str) -> Result<Option<Account>> {
        let query = format!(
            "SELECT {} FROM sp_account_manager \
             WHERE social_network = ? AND category = ? AND team_id = ? AND pid = ?",
            ACCOUNT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(SOCIAL_NETWORK)
            .bind(GROUP_CATEGORY)
            .bind(team_id)
            .bind(pid)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(row.as_ref().map(account_from_row))
    }

    /// Get an account by row id, restricted to one team
    pub async fn get_account(&self, team_id: i64, id: i64) -> Result<Option<Account>> {
        let query = format!(
            "SELECT {} FROM sp_account_manager WHERE team_id = ? AND id = ?",
            ACCOUNT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(team_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(row.as_ref().map(account_from_row))
    }

    /// All linked Telegram groups of a team, newest first
    pub async fn list_accounts(&self, team_id: i64) -> Result<Vec<Account>> {
        let query = format!(
            "SELECT {} FROM sp_account_manager \
             WHERE social_network = ? AND category = ? AND team_id = ? \
             ORDER BY created DESC, id DESC",
            ACCOUNT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(SOCIAL_NETWORK)
            .bind(GROUP_CATEGORY)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(rows.iter().map(account_from_row).collect())
    }

    /// Number of Telegram accounts a team holds, any category
    pub async fn count_accounts(&self, team_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sp_account_manager
            WHERE social_network = ? AND team_id = ?
            "#,
        )
        .bind(SOCIAL_NETWORK)
        .bind(team_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(count)
    }

    /// Insert a newly linked group with status active
    pub async fn insert_account(&self, draft: &AccountDraft, now: i64) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO sp_account_manager
                (ids, social_network, category, login_type, can_post, team_id, pid,
                 name, username, token, avatar, url, data, status, changed, created)
            VALUES (?, ?, ?, 1, 1, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?)
            "#,
        )
        .bind(new_public_id())
        .bind(SOCIAL_NETWORK)
        .bind(GROUP_CATEGORY)
        .bind(draft.team_id)
        .bind(&draft.pid)
        .bind(&draft.name)
        .bind(&draft.username)
        .bind(&draft.token)
        .bind(&draft.avatar)
        .bind(draft.url())
        .bind(AccountStatus::Active.as_i64())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.last_insert_rowid())
    }

    /// Refresh a relinked group; `created` is left untouched
    pub async fn update_account(&self, id: i64, draft: &AccountDraft, now: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sp_account_manager
            SET login_type = 1, can_post = 1, name = ?, username = ?, token = ?,
                avatar = ?, url = ?, status = ?, changed = ?
            WHERE id = ? AND team_id = ?
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.username)
        .bind(&draft.token)
        .bind(&draft.avatar)
        .bind(draft.url())
        .bind(AccountStatus::Active.as_i64())
        .bind(now)
        .bind(id)
        .bind(draft.team_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Set the status of an account row
    pub async fn set_account_status(&self, id: i64, status: AccountStatus) -> Result<()> {
        sqlx::query("UPDATE sp_account_manager SET status = ? WHERE id = ?")
            .bind(status.as_i64())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Record a publish attempt
    pub async fn create_post_record(&self, record: &PostRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO post_records
                (account_id, post_type, platform_post_id, url, success, error_message, posted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.account_id)
        .bind(record.post_type.as_str())
        .bind(&record.platform_post_id)
        .bind(&record.url)
        .bind(if record.success { 1 } else { 0 })
        .bind(&record.error_message)
        .bind(record.posted_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.last_insert_rowid())
    }

    /// Publish attempts for an account, newest first
    pub async fn get_post_records(&self, account_id: i64, limit: usize) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, post_type, platform_post_id, url, success, error_message, posted_at
            FROM post_records
            WHERE account_id = ?
            ORDER BY posted_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(account_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows
            .iter()
            .map(|r| PostRecord {
                id: r.get("id"),
                account_id: r.get("account_id"),
                post_type: r
                    .get::<String, _>("post_type")
                    .parse()
                    .unwrap_or(PostType::Text),
                platform_post_id: r.get("platform_post_id"),
                url: r.get("url"),
                success: r.get::<i64, _>("success") != 0,
                error_message: r.get("error_message"),
                posted_at: r.get("posted_at"),
            })
            .collect())
    }
}

fn account_from_row(r: &SqliteRow) -> Account {
    Account {
        id: r.get("id"),
        ids: r.get("ids"),
        social_network: r.get("social_network"),
        category: r.get("category"),
        login_type: r.get("login_type"),
        can_post: r.get("can_post"),
        team_id: r.get("team_id"),
        pid: r.get("pid"),
        name: r.get("name"),
        username: r.get("username"),
        token: r.get("token"),
        avatar: r.get("avatar"),
        url: r.get("url"),
        data: r.get("data"),
        status: AccountStatus::from_i64(r.get("status")),
        changed: r.get("changed"),
        created: r.get("created"),
    }
}
