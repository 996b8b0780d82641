//! Revalidation cache for built post pages
//!
//! Each built page is kept for its revalidation window. A request inside the
//! window is served from memory. The first request after the window still
//! gets the cached page, and a single background rebuild replaces it. A
//! request for a slug with no entry builds the page before responding.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::content::Post;
use crate::page::{PageBuilder, PageOutcome, StaticPaths};

/// A built page and when it was built
#[derive(Debug, Clone)]
struct CacheEntry {
    post: Arc<Post>,
    built_at: Instant,
    revalidate: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.built_at) < self.revalidate
    }
}

/// How a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a fresh entry
    Hit,
    /// Served from an expired entry while a rebuild runs
    Stale,
    /// Built inside the request
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Stale => "STALE",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Result of a cache lookup; `page` is `None` when the post does not exist
#[derive(Debug, Clone)]
pub struct Lookup {
    pub page: Option<Arc<Post>>,
    pub status: CacheStatus,
}

/// Slug-keyed cache of built post pages
pub struct RevalidationCache {
    builder: PageBuilder,
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Serializes blocking builds of the same slug
    build_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Slugs with a background rebuild in progress
    refreshing: std::sync::Mutex<HashSet<String>>,
}

impl RevalidationCache {
    pub fn new(builder: PageBuilder) -> Self {
        Self {
            builder,
            entries: RwLock::new(HashMap::new()),
            build_locks: Mutex::new(HashMap::new()),
            refreshing: std::sync::Mutex::new(HashSet::new()),
        }
    }

    pub fn builder(&self) -> &PageBuilder {
        &self.builder
    }

    /// Look up a page, building or scheduling a rebuild as needed
    pub async fn get(self: &Arc<Self>, slug: &str) -> Result<Lookup> {
        if let Some(entry) = self.cached(slug).await {
            if entry.is_fresh(Instant::now()) {
                return Ok(Lookup {
                    page: Some(entry.post),
                    status: CacheStatus::Hit,
                });
            }
            self.spawn_refresh(slug);
            return Ok(Lookup {
                page: Some(entry.post),
                status: CacheStatus::Stale,
            });
        }

        let lock = self.build_lock(slug).await;
        let guard = lock.lock().await;

        // Another request may have finished the build while we waited
        let lookup = match self.cached(slug).await {
            Some(entry) => Ok(Lookup {
                page: Some(entry.post),
                status: CacheStatus::Hit,
            }),
            None => self.build_and_store(slug).await.map(|page| Lookup {
                page,
                status: CacheStatus::Miss,
            }),
        };

        drop(guard);
        self.release_build_lock(slug, &lock).await;
        lookup
    }

    /// Build every enumerated page up front
    ///
    /// Fails on the first store error, like a failed static build.
    pub async fn warm(&self, paths: &StaticPaths) -> Result<usize> {
        let mut built = 0;
        for param in &paths.paths {
            if self.build_and_store(&param.slug).await?.is_some() {
                built += 1;
            } else {
                tracing::warn!("Post {:?} disappeared during warm-up", param.slug);
            }
        }
        tracing::info!("Pre-built {} of {} pages", built, paths.paths.len());
        Ok(built)
    }

    /// Drop one page so the next request rebuilds it
    pub async fn invalidate(&self, slug: &str) -> bool {
        self.entries.write().await.remove(slug).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn cached(&self, slug: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(slug).cloned()
    }

    async fn build_lock(&self, slug: &str) -> Arc<Mutex<()>> {
        self.build_locks
            .lock()
            .await
            .entry(slug.to_string())
            .or_default()
            .clone()
    }

    /// Forget a slug's build lock once nobody else holds or waits on it
    async fn release_build_lock(&self, slug: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.build_locks.lock().await;
        // Held by the map and by `lock` only
        let idle = locks
            .get(slug)
            .is_some_and(|current| Arc::ptr_eq(current, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(slug);
        }
    }

    /// Build a page and record the outcome; not-found pages are not cached
    async fn build_and_store(&self, slug: &str) -> Result<Option<Arc<Post>>> {
        match self.builder.build(slug).await? {
            PageOutcome::Found { post, revalidate } => {
                let post = Arc::new(post);
                self.entries.write().await.insert(
                    slug.to_string(),
                    CacheEntry {
                        post: post.clone(),
                        built_at: Instant::now(),
                        revalidate,
                    },
                );
                Ok(Some(post))
            }
            PageOutcome::NotFound => {
                self.entries.write().await.remove(slug);
                Ok(None)
            }
        }
    }

    fn spawn_refresh(self: &Arc<Self>, slug: &str) {
        {
            let mut refreshing = self.refreshing.lock().unwrap_or_else(|e| e.into_inner());
            if !refreshing.insert(slug.to_string()) {
                return;
            }
        }

        let cache = Arc::clone(self);
        let slug = slug.to_string();
        tokio::spawn(async move {
            tracing::debug!("Revalidating {:?}", slug);
            match cache.build_and_store(&slug).await {
                Ok(Some(_)) => tracing::debug!("Revalidated {:?}", slug),
                Ok(None) => tracing::info!("Post {:?} no longer exists, evicted", slug),
                Err(e) => tracing::error!("Revalidation of {:?} failed, keeping stale page: {:#}", slug, e),
            }
            cache
                .refreshing
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&slug);
        });
    }
}
