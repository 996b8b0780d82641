//! Static export of every known post page
//!
//! Pages are rendered with an empty comment form and written to
//! `public/post/<slug>/index.html`. A manifest of content hashes lets a
//! second run skip pages whose HTML did not change.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::helpers::encode_segment;
use crate::page::{PageBuilder, PageOutcome};
use crate::render::{PageRenderer, SubmissionView};
use crate::Blog;

/// Manifest file name, relative to the site directory
const MANIFEST_FILE: &str = ".blog-cache/manifest.json";

/// One exported page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Hash of the rendered HTML
    pub content_hash: u64,
    /// Output path relative to the public dir
    pub output_path: String,
}

/// Exported pages keyed by slug
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub pages: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load the manifest from disk; a missing or outdated file gives an empty one
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(manifest) = serde_json::from_str::<Manifest>(&content) {
                if manifest.version == Self::VERSION {
                    return manifest;
                }
                tracing::info!("Manifest version mismatch, exporting everything");
            }
        }
        Self::new()
    }

    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let path = base_dir.join(MANIFEST_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("failed to write {:?}", path))?;
        Ok(())
    }

    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(MANIFEST_FILE)
    }
}

/// Hash rendered page content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// What an export run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub written: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// Enumerated slugs that had no post by the time they were built
    pub missing: usize,
}

/// Static exporter for post pages
pub struct Generator {
    base_dir: PathBuf,
    public_dir: PathBuf,
    assets_dir: PathBuf,
    assets_name: String,
    renderer: PageRenderer,
}

impl Generator {
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            base_dir: blog.base_dir.clone(),
            public_dir: blog.public_dir.clone(),
            assets_dir: blog.assets_dir.clone(),
            assets_name: blog.config.assets_dir.clone(),
            renderer: PageRenderer::new(&blog.config)?,
        })
    }

    /// Export every enumerated post
    ///
    /// Any store error aborts the run, leaving the previous manifest intact.
    pub async fn generate(&self, builder: &PageBuilder, force: bool) -> Result<ExportReport> {
        let previous = Manifest::load(&self.base_dir);
        let mut manifest = Manifest::new();
        let mut report = ExportReport::default();

        let paths = builder.static_paths().await?;
        tracing::info!("Exporting {} posts", paths.paths.len());

        for param in &paths.paths {
            let Some(relative) = output_path(&param.slug) else {
                tracing::warn!("Skipping post with unusable slug {:?}", param.slug);
                continue;
            };

            let post = match builder.build(&param.slug).await? {
                PageOutcome::Found { post, .. } => post,
                PageOutcome::NotFound => {
                    tracing::warn!("Post {:?} disappeared during export", param.slug);
                    report.missing += 1;
                    continue;
                }
            };

            let html = self
                .renderer
                .render_post(&post, &SubmissionView::fresh(None))
                .with_context(|| format!("failed to render post {:?}", param.slug))?;
            let entry = ManifestEntry {
                content_hash: hash_content(&html),
                output_path: relative,
            };
            let dest = self.public_dir.join(&entry.output_path);

            if !force && previous.pages.get(&param.slug) == Some(&entry) && dest.exists() {
                tracing::debug!("Unchanged: {}", entry.output_path);
                report.unchanged += 1;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&dest, html).with_context(|| format!("failed to write {:?}", dest))?;
                tracing::debug!("Wrote: {}", entry.output_path);
                report.written += 1;
            }

            manifest.pages.insert(param.slug.clone(), entry);
        }

        for (slug, entry) in &previous.pages {
            if manifest.pages.contains_key(slug) {
                continue;
            }
            let dest = self.public_dir.join(&entry.output_path);
            if dest.exists() {
                fs::remove_file(&dest)?;
                if let Some(parent) = dest.parent() {
                    // Only removes the directory when it is empty
                    let _ = fs::remove_dir(parent);
                }
                tracing::info!("Removed: {}", entry.output_path);
                report.removed += 1;
            }
        }

        self.copy_assets()?;
        manifest.save(&self.base_dir)?;

        Ok(report)
    }

    /// Copy the static assets directory into the public directory
    fn copy_assets(&self) -> Result<()> {
        if !self.assets_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(&self.assets_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() {
                let relative = path.strip_prefix(&self.assets_dir)?;
                let dest = self.public_dir.join(&self.assets_name).join(relative);

                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(path, &dest)?;
            }
        }

        Ok(())
    }
}

/// Output path of a post page relative to the public dir
fn output_path(slug: &str) -> Option<String> {
    let segment = encode_segment(slug);
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(format!("post/{}/index.html", segment))
}
