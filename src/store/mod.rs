//! Content store client
//!
//! Two read queries are issued against the store: the list of all post
//! slugs, and a single post by slug with its author embedded and its
//! comments filtered down to approved ones. Filtering happens inside the
//! store query, so unapproved comments never reach the page model.

mod memory;
pub mod queries;
mod sanity;

use async_trait::async_trait;
use thiserror::Error;

use crate::content::{Post, SlugDoc};

pub use memory::MemoryStore;
pub use sanity::SanityClient;

/// Content store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Query returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode query result: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid dataset export at line {line}: {message}")]
    Export { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to post documents
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All post documents, projected to id and slug, in store order
    async fn post_slugs(&self) -> Result<Vec<SlugDoc>, StoreError>;

    /// One post with embedded author and approved comments, if it exists
    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError>;
}
