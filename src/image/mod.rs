//! Image reference resolution
//!
//! Image fields carry an asset reference of the form
//! `image-<id>-<width>x<height>-<format>`. The resolver turns that into a
//! CDN URL for the configured project and dataset, optionally with sizing
//! parameters.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::content::ImageRef;

const CDN_BASE: &str = "https://cdn.sanity.io";

lazy_static! {
    static ref ASSET_REF: Regex =
        Regex::new(r"^image-([A-Za-z0-9]+)-(\d+)x(\d+)-([a-z0-9]+)$").unwrap();
}

/// Image resolution errors
#[derive(Error, Debug, PartialEq)]
pub enum ImageError {
    #[error("Malformed image asset reference: {0}")]
    MalformedRef(String),
}

/// Parsed components of an image asset reference
#[derive(Debug, Clone, PartialEq)]
pub struct AssetId {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl AssetId {
    /// Parse an `image-<id>-<w>x<h>-<ext>` reference
    pub fn parse(reference: &str) -> Result<Self, ImageError> {
        let caps = ASSET_REF
            .captures(reference)
            .ok_or_else(|| ImageError::MalformedRef(reference.to_string()))?;

        let dimension = |i: usize| {
            caps[i]
                .parse::<u32>()
                .map_err(|_| ImageError::MalformedRef(reference.to_string()))
        };

        Ok(Self {
            id: caps[1].to_string(),
            width: dimension(2)?,
            height: dimension(3)?,
            format: caps[4].to_string(),
        })
    }

    fn file_name(&self) -> String {
        format!("{}-{}x{}.{}", self.id, self.width, self.height, self.format)
    }
}

/// Maps image references to fetchable CDN URLs
#[derive(Debug, Clone)]
pub struct ImageResolver {
    base_url: String,
    project_id: String,
    dataset: String,
}

impl ImageResolver {
    pub fn new(project_id: &str, dataset: &str) -> Self {
        Self {
            base_url: CDN_BASE.to_string(),
            project_id: project_id.to_string(),
            dataset: dataset.to_string(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(&config.project_id, &config.dataset)
    }

    /// Plain URL for an image, without transformation parameters
    pub fn url(&self, image: &ImageRef) -> Result<String, ImageError> {
        Ok(self.builder(image)?.url())
    }

    /// Start building a URL with sizing options
    pub fn builder(&self, image: &ImageRef) -> Result<ImageUrlBuilder<'_>, ImageError> {
        Ok(ImageUrlBuilder {
            resolver: self,
            asset: AssetId::parse(&image.asset.id)?,
            width: None,
            height: None,
            auto_format: false,
        })
    }
}

/// Builder for a single image URL
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder<'a> {
    resolver: &'a ImageResolver,
    asset: AssetId,
    width: Option<u32>,
    height: Option<u32>,
    auto_format: bool,
}

impl ImageUrlBuilder<'_> {
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Let the CDN pick the best format for the requesting client
    pub fn auto_format(mut self) -> Self {
        self.auto_format = true;
        self
    }

    pub fn url(&self) -> String {
        let mut url = format!(
            "{}/images/{}/{}/{}",
            self.resolver.base_url,
            self.resolver.project_id,
            self.resolver.dataset,
            self.asset.file_name()
        );

        let mut params = Vec::new();
        if let Some(w) = self.width {
            params.push(format!("w={}", w));
        }
        if let Some(h) = self.height {
            params.push(format!("h={}", h));
        }
        if self.auto_format {
            params.push("auto=format".to_string());
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Reference;

    fn image(reference: &str) -> ImageRef {
        ImageRef {
            asset: Reference {
                id: reference.to_string(),
            },
            alt: None,
        }
    }

    #[test]
    fn test_parse_asset_ref() {
        let asset = AssetId::parse("image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg").unwrap();
        assert_eq!(asset.id, "Tb9Ew8CXIwaY6R1kjMvI0uRR");
        assert_eq!(asset.width, 2000);
        assert_eq!(asset.height, 3000);
        assert_eq!(asset.format, "jpg");
    }

    #[test]
    fn test_plain_url() {
        let resolver = ImageResolver::new("abc123", "production");
        let url = resolver.url(&image("image-xyz-800x600-png")).unwrap();
        assert_eq!(
            url,
            "https://cdn.sanity.io/images/abc123/production/xyz-800x600.png"
        );
    }

    #[test]
    fn test_builder_params() {
        let resolver = ImageResolver::new("abc123", "production");
        let img = image("image-xyz-800x600-png");
        let url = resolver
            .builder(&img)
            .unwrap()
            .width(40)
            .height(40)
            .auto_format()
            .url();
        assert!(url.ends_with("xyz-800x600.png?w=40&h=40&auto=format"));
    }

    #[test]
    fn test_malformed_ref() {
        let resolver = ImageResolver::new("abc123", "production");
        assert_eq!(
            resolver.url(&image("file-xyz-pdf")),
            Err(ImageError::MalformedRef("file-xyz-pdf".to_string()))
        );
    }
}
