//! Outbound write of comment submissions

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::CommentSubmission;
use crate::config::CommentsConfig;

/// Submission transport errors
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Comment endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Comment endpoint timed out")]
    Timeout,

    #[error("Failed to set up HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SubmitError::Timeout
        } else {
            SubmitError::Transport(e)
        }
    }
}

/// Destination of new comments
#[async_trait]
pub trait CommentSink: Send + Sync {
    /// Deliver one submission; exactly one attempt is made
    async fn send(&self, submission: &CommentSubmission) -> Result<(), SubmitError>;
}

/// Posts submissions as JSON to the moderation endpoint
#[derive(Debug, Clone)]
pub struct HttpCommentSink {
    endpoint: String,
    client: Client,
}

impl HttpCommentSink {
    pub fn new(config: &CommentsConfig) -> Result<Self, SubmitError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client: builder.build().map_err(SubmitError::Client)?,
        })
    }
}

#[async_trait]
impl CommentSink for HttpCommentSink {
    /// Any HTTP response counts as delivered; only transport failures are errors
    async fn send(&self, submission: &CommentSubmission) -> Result<(), SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Comment for post {} submitted", submission.post_id);
        } else {
            tracing::warn!(
                "Comment endpoint answered {} for post {}",
                status,
                submission.post_id
            );
        }
        Ok(())
    }
}
