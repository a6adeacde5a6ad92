//! Content pages and uploaded media.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nexx_core::{MediaId, PageId, Slug};

/// A content page written in markdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub slug: Slug,
    pub content: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

/// A page with its markdown rendered to HTML.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    #[serde(flatten)]
    pub page: Page,
    pub content_html: String,
}

/// Request body for creating a page.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub title: String,
    pub slug: Slug,
    pub content: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Partial page update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub slug: Option<Slug>,
    pub content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub active: Option<bool>,
}

/// Metadata of an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: MediaId,
    pub original_filename: String,
    /// Name on disk inside the media directory.
    pub filename: String,
    /// Public URL under `/media/`.
    pub url: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}
