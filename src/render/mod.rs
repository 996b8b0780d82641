//! Post page rendering
//!
//! Rendering is a pure function of the page model and the comment form
//! state; it never touches the store.

use anyhow::Result;
use tera::Context;

use crate::comments::{CommentForm, FieldErrors, SubmissionState};
use crate::config::SiteConfig;
use crate::content::{ImageRef, PortableTextRenderer, Post};
use crate::helpers::{date_xml, format_in_timezone, full_url_for, open_graph, post_path, url_for};
use crate::image::ImageResolver;
use crate::templates::{AuthorData, CommentData, FormData, PostData, SiteData, TemplateRenderer};

/// Everything the renderer needs to know about the comment form
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionView {
    pub state: SubmissionState,
    /// Values to refill the form with
    pub form: CommentForm,
    pub errors: FieldErrors,
    /// Token for the next submission; `None` for static exports
    pub token: Option<u64>,
}

impl SubmissionView {
    /// Empty form for a fresh page view
    pub fn fresh(token: Option<u64>) -> Self {
        Self {
            state: SubmissionState::Unsubmitted,
            form: CommentForm::default(),
            errors: FieldErrors::default(),
            token,
        }
    }
}

/// Renders post pages and error pages
pub struct PageRenderer {
    config: SiteConfig,
    templates: TemplateRenderer,
    images: ImageResolver,
}

impl PageRenderer {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            templates: TemplateRenderer::new()?,
            images: ImageResolver::from_config(&config.store),
        })
    }

    /// Render a post page with the given comment form state
    pub fn render_post(&self, post: &Post, submission: &SubmissionView) -> Result<String> {
        let mut context = self.base_context();
        context.insert("post", &self.post_data(post));
        context.insert("form", &self.form_data(post, submission)?);
        self.templates.render("post.html", &context)
    }

    /// Render the not-found page for a request path
    pub fn render_not_found(&self, path: &str) -> Result<String> {
        let mut context = self.base_context();
        context.insert("path", path);
        self.templates.render("not_found.html", &context)
    }

    /// Render the generic error page
    pub fn render_error(&self) -> Result<String> {
        self.templates.render("error.html", &self.base_context())
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert(
            "site",
            &SiteData {
                title: self.config.title.clone(),
                language: self.config.language.clone(),
                root: url_for(&self.config, ""),
                assets: url_for(&self.config, &format!("{}/", self.config.assets_dir)),
            },
        );
        context
    }

    fn image_url(&self, image: Option<&ImageRef>, width: u32) -> Option<String> {
        let image = image?;
        match self.images.builder(image) {
            Ok(builder) => Some(builder.width(width).auto_format().url()),
            Err(e) => {
                tracing::warn!("Unusable image reference: {}", e);
                None
            }
        }
    }

    fn post_data(&self, post: &Post) -> PostData {
        let main_image = self.image_url(post.main_image.as_ref(), 1600);
        let body = PortableTextRenderer::new(&self.images).render(&post.body);
        let permalink = full_url_for(&self.config, &post_path(&self.config, post.slug.as_str()));
        let meta = open_graph(
            &post.title,
            &post.description,
            &permalink,
            main_image.as_deref(),
            &self.config.title,
        );

        PostData {
            id: post.id.clone(),
            slug: post.slug.current.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            author: AuthorData {
                name: post.author_name().to_string(),
                image: self.image_url(
                    post.author.as_ref().and_then(|a| a.image.as_ref()),
                    80,
                ),
            },
            published_at: format_in_timezone(
                &post.created_at,
                &self.config.date_format,
                &self.config.timezone,
            ),
            published_at_xml: date_xml(&post.created_at),
            main_image,
            body,
            comments: post
                .comments
                .iter()
                .filter(|c| c.approved)
                .map(|c| CommentData {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    comment: c.comment.clone(),
                })
                .collect(),
            meta,
        }
    }

    fn form_data(&self, post: &Post, submission: &SubmissionView) -> Result<FormData> {
        let (state, failure) = match &submission.state {
            SubmissionState::Unsubmitted => ("unsubmitted", None),
            SubmissionState::Submitting { .. } => ("submitting", None),
            SubmissionState::Submitted => ("submitted", None),
            SubmissionState::Failed { reason } => ("failed", Some(reason.clone())),
        };

        Ok(FormData {
            action: format!("{}/comment", post_path(&self.config, post.slug.as_str())),
            state,
            name: submission.form.name.clone(),
            email: submission.form.email.clone(),
            comment: submission.form.comment.clone(),
            token: submission.token,
            errors: serde_json::to_value(&submission.errors)?,
            failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::Field;
    use serde_json::json;

    fn renderer() -> PageRenderer {
        let mut config = SiteConfig::default();
        config.store.project_id = "proj".to_string();
        config.timezone = "UTC".to_string();
        PageRenderer::new(&config).unwrap()
    }

    fn post(comments: serde_json::Value) -> Post {
        serde_json::from_value(json!({
            "_id": "p1",
            "_createdAt": "2022-03-01T15:04:05Z",
            "title": "Hello World",
            "description": "A first post",
            "slug": { "current": "hello-world" },
            "mainImage": { "asset": { "_ref": "image-main-800x400-jpg" } },
            "author": { "name": "Ann Author", "image": { "asset": { "_ref": "image-face-64x64-png" } } },
            "body": [
                { "_type": "block", "style": "h1", "children": [{ "text": "Intro" }] },
                { "_type": "mystery" }
            ],
            "comments": comments
        }))
        .unwrap()
    }

    fn comment(id: &str, name: &str, approved: bool) -> serde_json::Value {
        json!({ "_id": id, "name": name, "email": "x@y.z", "comment": format!("from {}", name),
                "approved": approved, "post": { "_ref": "p1" } })
    }

    #[test]
    fn test_renders_post_fields() {
        let html = renderer()
            .render_post(&post(json!([])), &SubmissionView::fresh(Some(42)))
            .unwrap();

        assert!(html.contains("Hello World"));
        assert!(html.contains("A first post"));
        assert!(html.contains("Ann Author"));
        // Autoescaping turns `/` into `&#x2F;`
        assert!(html.contains("3&#x2F;1&#x2F;2022, 3:04:05 PM"));
        assert!(html.contains(r#"<h1 class="text-2xl font-bold my-5">Intro</h1>"#));
        assert!(html.contains(r#"data-block-type="mystery""#));
        assert!(html.contains("main-800x400.jpg"));
        assert!(html.contains("face-64x64.png"));
        assert!(html.contains(r#"name="submission_token" value="42""#));
    }

    #[test]
    fn test_no_comments_renders_empty_list() {
        let html = renderer()
            .render_post(&post(json!([])), &SubmissionView::fresh(None))
            .unwrap();
        assert!(html.contains("Comments"));
        assert!(!html.contains(r#"class="comment""#));
        assert!(!html.contains("submission_token"));
    }

    #[test]
    fn test_only_approved_comments_are_listed() {
        let html = renderer()
            .render_post(
                &post(json!([comment("c1", "Ann", true), comment("c2", "Bob", false)])),
                &SubmissionView::fresh(None),
            )
            .unwrap();
        assert!(html.contains("from Ann"));
        assert!(!html.contains("from Bob"));
    }

    #[test]
    fn test_comment_text_is_escaped() {
        let html = renderer()
            .render_post(
                &post(json!([comment("c1", "<b>Eve</b>", true)])),
                &SubmissionView::fresh(None),
            )
            .unwrap();
        assert!(!html.contains("<b>Eve</b>"));
        assert!(html.contains("&lt;b&gt;Eve&lt;"));
    }

    #[test]
    fn test_submitted_shows_confirmation_not_form() {
        let view = SubmissionView {
            state: SubmissionState::Submitted,
            ..SubmissionView::fresh(Some(1))
        };
        let html = renderer().render_post(&post(json!([])), &view).unwrap();
        assert!(html.contains("Thank you for submitting your comment!"));
        assert!(!html.contains(r#"id="comment-form""#));
    }

    #[test]
    fn test_failed_keeps_input_and_offers_retry() {
        let view = SubmissionView {
            state: SubmissionState::Failed {
                reason: "Comment endpoint timed out".to_string(),
            },
            form: CommentForm {
                name: "Ann".to_string(),
                email: "ann@example.com".to_string(),
                comment: "Still here".to_string(),
                submission_token: Some(5),
            },
            errors: FieldErrors::default(),
            token: Some(5),
        };
        let html = renderer().render_post(&post(json!([])), &view).unwrap();
        assert!(html.contains(r#"id="comment-failure""#));
        assert!(html.contains("Still here"));
        assert!(html.contains(r#"value="Ann""#));
        assert!(html.contains("Try again"));
        assert!(!html.contains("Thank you for submitting"));
    }

    #[test]
    fn test_submit_button_is_only_disabled_client_side() {
        let view = SubmissionView {
            state: SubmissionState::Submitting { token: Some(1) },
            ..SubmissionView::fresh(Some(1))
        };
        let html = renderer().render_post(&post(json!([])), &view).unwrap();
        assert!(html.contains(r#"id="comment-form""#));
        assert!(html.contains("b.disabled = true"));
        assert!(!html.contains(" disabled"));
    }

    #[test]
    fn test_field_errors_are_shown() {
        let errors = CommentForm {
            name: "Ann".to_string(),
            ..CommentForm::default()
        }
        .validate("p1")
        .unwrap_err();
        assert!(errors.contains(Field::Email));

        let view = SubmissionView {
            errors,
            ..SubmissionView::fresh(None)
        };
        let html = renderer().render_post(&post(json!([])), &view).unwrap();
        assert!(html.contains("Please fill in the Email input"));
        assert!(html.contains("Please enter a comment"));
        assert!(!html.contains("Please fill in the Name input"));
    }

    #[test]
    fn test_not_found_page() {
        let html = renderer().render_not_found("/post/missing").unwrap();
        assert!(html.contains("404"));
    }
}
