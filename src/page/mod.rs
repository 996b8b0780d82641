//! Static path enumeration and post page building

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::content::Post;
use crate::store::ContentStore;

/// Route parameter for one post page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugParam {
    pub slug: String,
}

/// How requests for slugs missing from the enumerated set are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Build the page inside the request and wait for it
    Blocking,
}

/// All post routes known at build time
#[derive(Debug, Clone, PartialEq)]
pub struct StaticPaths {
    pub paths: Vec<SlugParam>,
    pub fallback: Fallback,
}

/// Result of building one post page
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    NotFound,
    Found {
        post: Post,
        /// How long the built page may be served before a rebuild
        revalidate: Duration,
    },
}

/// Builds post page models from the content store
#[derive(Clone)]
pub struct PageBuilder {
    store: Arc<dyn ContentStore>,
    revalidate: Duration,
}

impl PageBuilder {
    pub fn new(store: Arc<dyn ContentStore>, revalidate: Duration) -> Self {
        Self { store, revalidate }
    }

    /// Enumerate the slugs of every post in the store
    pub async fn static_paths(&self) -> Result<StaticPaths> {
        let docs = self
            .store
            .post_slugs()
            .await
            .context("failed to enumerate post slugs")?;

        let paths = docs
            .into_iter()
            .filter_map(|doc| match doc.slug {
                Some(slug) if !slug.current.is_empty() => Some(SlugParam { slug: slug.current }),
                _ => {
                    tracing::debug!("Skipping post {} without slug", doc.id);
                    None
                }
            })
            .collect();

        Ok(StaticPaths {
            paths,
            fallback: Fallback::Blocking,
        })
    }

    /// Fetch one post and produce its page model
    ///
    /// Store errors are returned as-is; there is no retry here.
    pub async fn build(&self, slug: &str) -> Result<PageOutcome> {
        if slug.is_empty() {
            return Ok(PageOutcome::NotFound);
        }

        let post = self
            .store
            .post_by_slug(slug)
            .await
            .with_context(|| format!("failed to fetch post {:?}", slug))?;

        Ok(match post {
            Some(post) => {
                tracing::debug!(
                    "Built page {:?} with {} approved comments",
                    slug,
                    post.comments.len()
                );
                PageOutcome::Found {
                    post,
                    revalidate: self.revalidate,
                }
            }
            None => PageOutcome::NotFound,
        })
    }
}
