//! List posts known to the content store

use anyhow::Result;
use std::sync::Arc;

use crate::helpers::post_path;
use crate::store::ContentStore;
use crate::Blog;

/// Print the route of every enumerated post
pub async fn run(blog: &Blog, store: Arc<dyn ContentStore>) -> Result<()> {
    let lines = routes(blog, store).await?;
    println!("Posts ({}):", lines.len());
    for line in lines {
        println!("  {}", line);
    }
    Ok(())
}

async fn routes(blog: &Blog, store: Arc<dyn ContentStore>) -> Result<Vec<String>> {
    let paths = blog.page_builder(store).static_paths().await?;
    Ok(paths
        .paths
        .iter()
        .map(|p| format!("{} [{}]", p.slug, post_path(&blog.config, &p.slug)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_post_routes() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let store = Arc::new(MemoryStore::from_documents(vec![
            json!({ "_id": "p1", "_type": "post", "slug": { "current": "hello-world" } }),
            json!({ "_id": "p2", "_type": "post" }),
        ]));

        let lines = routes(&blog, store).await.unwrap();
        assert_eq!(lines, vec!["hello-world [/post/hello-world]".to_string()]);
    }
}
