//! Telecast - link Telegram groups to a team and publish to them
//!
//! This library holds the account linker, the publisher and the storage they
//! share. The `tele-link` and `tele-post` binaries are thin wrappers around
//! [`service::TelecastService`].

pub mod avatar;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod media;
pub mod quota;
pub mod service;
pub mod session;
pub mod spintax;
pub mod telegram;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{Result, TelecastError};
pub use session::{LinkSession, SessionStore};
pub use types::{Account, AccountStatus, ActionResponse, CandidateProfile, PostRecord, PostType};
