//! Media preparation before upload

/// Stamps a team's watermark onto an image before it is published
///
/// `apply` may write a temporary file and return its path; `release` is
/// called with the prepared media once the upload is done.
pub trait Watermark: Send + Sync {
    fn apply(&self, media: &str, team_id: i64, account_id: i64) -> String;

    fn release(&self, medias: &[String]);
}

/// Publishes media unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWatermark;

impl Watermark for NoWatermark {
    fn apply(&self, media: &str, _team_id: i64, _account_id: i64) -> String {
        media.to_string()
    }

    fn release(&self, _medias: &[String]) {}
}
