use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

use super::parse_amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Product {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Decimal string, e.g. "19.99"
    pub price: String,
    pub category: Option<Category>,
    pub image: Option<String>,
    /// Username of the seller
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Product {
    pub fn price_value(&self) -> f64 {
        parse_amount(&self.price)
    }

    pub fn category_name(&self) -> &str {
        self.category.as_ref().map(|c| c.name.as_str()).unwrap_or("Uncategorized")
    }
}

/// An image file attached to a product form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Read an image from disk; the type comes from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(image_mime)
            .with_context(|| format!("Unsupported image type: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("Not a file: {}", path.display()))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image: {}", path.display()))?;

        Ok(Self {
            file_name,
            mime: mime.to_string(),
            bytes,
        })
    }
}

fn image_mime(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Fields sent when listing or editing a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    /// Decimal string, e.g. "19.99"
    pub price: String,
    pub category_id: Option<i64>,
    pub is_active: bool,
    /// New image; `None` keeps the current one when editing
    pub image: Option<ImageUpload>,
}

impl ProductDraft {
    pub fn new(title: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            price: price.into(),
            category_id: None,
            is_active: true,
            image: None,
        }
    }

    /// Prefill from an existing product, as the edit form does
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.clone(),
            category_id: product.category.as_ref().map(|c| c.id),
            is_active: product.is_active,
            image: None,
        }
    }

    /// Reject drafts the backend would refuse anyway
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("Product title is required");
        }
        match self.price.trim().parse::<f64>() {
            Ok(price) if price.is_finite() && price >= 0.0 => Ok(()),
            _ => bail!("Invalid price '{}'", self.price),
        }
    }
}

/// Query filters for the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    /// Only products listed by this user id
    pub created_by: Option<i64>,
}

impl ProductFilter {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(created_by) = self.created_by {
            pairs.push(("created_by".to_string(), created_by.to_string()));
        }
        if let Some(category_id) = self.category_id {
            pairs.push(("category_id".to_string(), category_id.to_string()));
        }
        pairs
    }
}
