//! Post, Author and Comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::Block;

/// A blog post as returned by the post-by-slug query
///
/// The author is an embedded copy and `comments` only ever holds approved
/// comments; both are resolved by the store at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Document id
    #[serde(rename = "_id")]
    pub id: String,

    /// Creation timestamp
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,

    /// Post title
    #[serde(default)]
    pub title: String,

    /// Short description shown under the title
    #[serde(default)]
    pub description: String,

    /// Hero image
    #[serde(rename = "mainImage", default, deserialize_with = "lenient_image")]
    pub main_image: Option<ImageRef>,

    /// URL slug
    pub slug: Slug,

    /// Portable Text body
    #[serde(default)]
    pub body: Vec<Block>,

    /// Embedded author
    #[serde(default)]
    pub author: Option<Author>,

    /// Approved comments in store order
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Author name, or an empty string for posts without an author
    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

/// Embedded author record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_image")]
    pub image: Option<ImageRef>,
}

/// A comment document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub approved: bool,
    /// Back-reference to the owning post
    #[serde(default)]
    pub post: Option<Reference>,
}

/// Slug object (`{ "current": "hello-world" }`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug {
    pub current: String,
}

impl Slug {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.current
    }
}

/// Result row of the all-slugs query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlugDoc {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub slug: Option<Slug>,
}

/// Reference to another document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub id: String,
}

/// Image field: an opaque reference to an image asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub asset: Reference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Image fields left empty in the editor (no asset yet) read as absent
fn lenient_image<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}
