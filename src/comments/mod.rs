//! Comment submission
//!
//! A submission goes through field validation, then a single outbound write
//! to the moderation endpoint. Nothing is stored locally; a comment becomes
//! visible only once the store reports it as approved.

mod flow;
mod form;
mod sink;

pub use flow::{SubmissionFlow, SubmissionGuard, SubmissionState};
pub use form::{CommentForm, CommentSubmission, Field, FieldErrors};
pub use sink::{CommentSink, HttpCommentSink, SubmitError};
