//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::generator::Manifest;
use crate::Blog;

/// Remove the exported pages and the export manifest
pub fn run(blog: &Blog) -> Result<()> {
    if blog.public_dir.exists() {
        fs::remove_dir_all(&blog.public_dir)?;
        tracing::info!("Deleted: {:?}", blog.public_dir);
    }

    let manifest = Manifest::path(&blog.base_dir);
    if manifest.exists() {
        fs::remove_file(&manifest)?;
        tracing::info!("Deleted: {:?}", manifest);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_output_and_manifest() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        fs::create_dir_all(blog.public_dir.join("post/hello")).unwrap();
        fs::write(blog.public_dir.join("post/hello/index.html"), "<html>").unwrap();
        Manifest::new().save(dir.path()).unwrap();

        run(&blog).unwrap();
        assert!(!blog.public_dir.exists());
        assert!(!Manifest::path(dir.path()).exists());

        // Cleaning an already clean site is fine
        run(&blog).unwrap();
    }
}
