//! Content module - documents fetched from the content store and body rendering

mod portable_text;
mod post;

pub use portable_text::{Block, ImageBlock, ListKind, MarkDef, PortableTextRenderer, Span, TextBlock};
pub use post::{Author, Comment, ImageRef, Post, Reference, Slug, SlugDoc};
