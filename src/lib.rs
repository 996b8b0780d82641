//! sanity-blog-rs: a server-rendered blog backed by a Sanity content store
//!
//! Post pages are built from the store, kept in a revalidation cache and
//! rendered with embedded Tera templates. Comments are collected through a
//! form and forwarded to an external moderation endpoint.

pub mod cache;
pub mod commands;
pub mod comments;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod image;
pub mod page;
pub mod render;
pub mod server;
pub mod store;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use store::{ContentStore, MemoryStore, SanityClient};

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets directory
    pub assets_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    ///
    /// Reads `_config.yml` when present, then applies environment overrides.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        // Assets are served from their own route and cannot share the site root
        if config.assets_dir.trim_matches('/').is_empty() {
            anyhow::bail!("assets_dir must name a directory, got {:?}", config.assets_dir);
        }

        let public_dir = base_dir.join(&config.public_dir);
        let assets_dir = base_dir.join(&config.assets_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            assets_dir,
        })
    }

    /// Open the content store
    ///
    /// A dataset export file takes precedence over the remote store.
    pub fn store(&self, dataset_file: Option<&Path>) -> Result<Arc<dyn ContentStore>> {
        if let Some(path) = dataset_file {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.base_dir.join(path)
            };
            let store = MemoryStore::load(&path)
                .with_context(|| format!("failed to load dataset export {:?}", path))?;
            return Ok(Arc::new(store));
        }

        if self.config.store.project_id.is_empty() {
            anyhow::bail!(
                "No content store configured: set store.project_id in _config.yml, \
                 SANITY_PROJECT_ID, or pass --dataset-file"
            );
        }
        Ok(Arc::new(SanityClient::new(&self.config.store)))
    }

    /// Page builder over the given store
    pub fn page_builder(&self, store: Arc<dyn ContentStore>) -> page::PageBuilder {
        page::PageBuilder::new(store, self.config.revalidate_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_loads_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            "title: My Blog\npublic_dir: out\nrevalidate: 30\n",
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.config.title, "My Blog");
        assert_eq!(blog.public_dir, dir.path().join("out"));
        assert_eq!(blog.assets_dir, dir.path().join("assets"));
        assert_eq!(blog.config.revalidate, 30);
    }

    #[test]
    fn test_rejects_root_assets_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.yml"), "assets_dir: /\n").unwrap();
        assert!(Blog::new(dir.path()).is_err());

        fs::write(dir.path().join("_config.yml"), "assets_dir: \"\"\n").unwrap();
        assert!(Blog::new(dir.path()).is_err());
    }

    #[tokio::test]
    async fn test_store_from_dataset_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("export.ndjson"),
            r#"{"_id":"p1","_type":"post","_createdAt":"2022-01-01T00:00:00Z","title":"Hi","slug":{"current":"hi"}}"#,
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        let store = blog.store(Some(Path::new("export.ndjson"))).unwrap();
        let slugs = store.post_slugs().await.unwrap();
        assert_eq!(slugs.len(), 1);
    }

    #[test]
    fn test_missing_dataset_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert!(blog.store(Some(Path::new("nope.ndjson"))).is_err());
    }
}
