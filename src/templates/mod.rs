//! Built-in page templates using Tera template engine
//!
//! Templates are embedded directly in the binary. Autoescaping is on for
//! every template; pre-rendered HTML (the post body, meta tags) is passed
//! through with `| safe`.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Template renderer with the embedded blog templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("post.html", include_str!("blog/post.html")),
            ("not_found.html", include_str!("blog/not_found.html")),
            ("error.html", include_str!("blog/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("blog/partials/header.html"),
            ),
            (
                "partials/comments.html",
                include_str!("blog/partials/comments.html"),
            ),
            (
                "partials/comment_form.html",
                include_str!("blog/partials/comment_form.html"),
            ),
            (
                "partials/confirmation.html",
                include_str!("blog/partials/confirmation.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
    pub root: String,
    pub assets: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub main_image: Option<String>,
    pub author: AuthorData,
    pub published_at: String,
    pub published_at_xml: String,
    pub body: String,
    pub comments: Vec<CommentData>,
    pub meta: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorData {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentData {
    pub id: String,
    pub name: String,
    pub comment: String,
}

/// Comment form or confirmation panel
#[derive(Debug, Clone, Serialize)]
pub struct FormData {
    /// Where the form posts to
    pub action: String,
    /// One of `unsubmitted`, `submitting`, `submitted`, `failed`
    pub state: &'static str,
    pub name: String,
    pub email: String,
    pub comment: String,
    pub token: Option<u64>,
    /// Field name to inline error message
    pub errors: serde_json::Value,
    pub failure: Option<String>,
}
