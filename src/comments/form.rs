//! Comment form input and validation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Raw form input as posted by the browser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub comment: String,
    /// Token issued with the rendered form, used to drop duplicate posts
    #[serde(default, deserialize_with = "token_from_field")]
    pub submission_token: Option<u64>,
}

/// Accept the token as a form string; blank or garbage means no token
fn token_from_field<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

/// Body of the outbound write request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CommentSubmission {
    /// Id of the post the comment belongs to
    #[serde(rename = "_id")]
    pub post_id: String,
    pub name: String,
    pub email: String,
    pub comment: String,
}

/// Required form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Comment,
}

impl Field {
    /// Inline message shown when the field is left empty
    pub fn message(self) -> &'static str {
        match self {
            Field::Name => "Please fill in the Name input",
            Field::Email => "Please fill in the Email input",
            Field::Comment => "Please enter a comment",
        }
    }
}

/// Per-field validation errors, in form order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldErrors(IndexMap<Field, &'static str>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    fn add(&mut self, field: Field) {
        self.0.insert(field, field.message());
    }
}

impl CommentForm {
    /// Check required fields and build the outbound record
    ///
    /// Values are trimmed; whitespace-only input counts as empty.
    pub fn validate(&self, post_id: &str) -> Result<CommentSubmission, FieldErrors> {
        let mut errors = FieldErrors::default();
        for (field, value) in [
            (Field::Name, &self.name),
            (Field::Email, &self.email),
            (Field::Comment, &self.comment),
        ] {
            if value.trim().is_empty() {
                errors.add(field);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CommentSubmission {
            post_id: post_id.to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            comment: self.comment.trim().to_string(),
        })
    }
}
