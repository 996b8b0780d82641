//! CLI entry point for sanity-blog-rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sanity-blog-rs")]
#[command(author = "Yukang Chen")]
#[command(version = "0.1.0")]
#[command(about = "A server-rendered blog backed by a Sanity content store", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Read content from a Sanity NDJSON export instead of the API
    #[arg(long, global = true)]
    dataset_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the blog server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to server.ip)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// Export every post page as static HTML
    #[command(alias = "g")]
    Generate {
        /// Rewrite every page even if unchanged
        #[arg(short, long)]
        force: bool,
    },

    /// Clean the public folder and export manifest
    Clean,

    /// List the posts in the content store
    List,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "sanity_blog_rs=debug,tower_http=debug,info"
    } else {
        "sanity_blog_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let dataset_file = cli.dataset_file.as_deref();

    match cli.command {
        Commands::Serve { port, ip } => {
            let blog = sanity_blog_rs::Blog::new(&base_dir)?;
            let store = blog.store(dataset_file)?;
            let ip = ip.unwrap_or_else(|| blog.config.server.ip.clone());
            let port = port.unwrap_or(blog.config.server.port);

            tracing::info!("Starting server at http://{}:{}", ip, port);
            sanity_blog_rs::server::start(&blog, store, &ip, port).await?;
        }

        Commands::Generate { force } => {
            let blog = sanity_blog_rs::Blog::new(&base_dir)?;
            let store = blog.store(dataset_file)?;
            tracing::info!("Generating static files...");
            sanity_blog_rs::commands::generate::run(&blog, store, force).await?;
            println!("Generated successfully!");
        }

        Commands::Clean => {
            let blog = sanity_blog_rs::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            sanity_blog_rs::commands::clean::run(&blog)?;
            println!("Cleaned successfully!");
        }

        Commands::List => {
            let blog = sanity_blog_rs::Blog::new(&base_dir)?;
            let store = blog.store(dataset_file)?;
            sanity_blog_rs::commands::list::run(&blog, store).await?;
        }

        Commands::Version => {
            println!("sanity-blog-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
