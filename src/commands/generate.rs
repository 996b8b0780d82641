//! Generate static files

use anyhow::Result;
use std::sync::Arc;

use crate::generator::Generator;
use crate::store::ContentStore;
use crate::Blog;

/// Export every post page to the public directory
pub async fn run(blog: &Blog, store: Arc<dyn ContentStore>, force: bool) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog)?;
    let report = generator.generate(&blog.page_builder(store), force).await?;

    tracing::info!(
        "{} written, {} unchanged, {} removed, {} missing",
        report.written,
        report.unchanged,
        report.removed,
        report.missing
    );
    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}
