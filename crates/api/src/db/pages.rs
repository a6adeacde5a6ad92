//! Content page repository.

use chrono::Utc;

use nexx_core::{PageId, Slug};

use super::{Database, RepositoryError};
use crate::models::{NewPage, Page, PageUpdate};

/// Repository for content pages.
pub struct PageRepository<'a> {
    db: &'a Database,
}

impl<'a> PageRepository<'a> {
    /// Create a new page repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Pages, optionally filtered by the active flag, sorted by title.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn list(&self, active: Option<bool>) -> Result<Vec<Page>, RepositoryError> {
        let mut pages = self.db.pages().load().await?;
        pages.retain(|p| active.is_none_or(|a| p.active == a));
        pages.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(pages)
    }

    /// Get a page by slug.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>, RepositoryError> {
        Ok(self
            .db
            .pages()
            .load()
            .await?
            .into_iter()
            .find(|p| p.slug.as_str() == slug))
    }

    /// Create a page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: NewPage) -> Result<Page, RepositoryError> {
        self.db
            .pages()
            .update(move |pages| {
                ensure_slug_free(pages, &input.slug, None)?;
                let page = Page {
                    id: PageId::generate(),
                    title: input.title,
                    slug: input.slug,
                    content: input.content,
                    meta_title: input.meta_title,
                    meta_description: input.meta_description,
                    meta_keywords: input.meta_keywords,
                    active: input.active,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                pages.push(page.clone());
                Ok(page)
            })
            .await
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the page does not exist and
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(&self, id: PageId, changes: PageUpdate) -> Result<Page, RepositoryError> {
        self.db
            .pages()
            .update(move |pages| {
                if let Some(slug) = &changes.slug {
                    ensure_slug_free(pages, slug, Some(id))?;
                }
                let page = pages
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(RepositoryError::NotFound)?;

                if let Some(title) = changes.title {
                    page.title = title;
                }
                if let Some(slug) = changes.slug {
                    page.slug = slug;
                }
                if let Some(content) = changes.content {
                    page.content = content;
                }
                if let Some(meta_title) = changes.meta_title {
                    page.meta_title = Some(meta_title);
                }
                if let Some(meta_description) = changes.meta_description {
                    page.meta_description = Some(meta_description);
                }
                if let Some(meta_keywords) = changes.meta_keywords {
                    page.meta_keywords = Some(meta_keywords);
                }
                if let Some(active) = changes.active {
                    page.active = active;
                }
                page.updated_at = Some(Utc::now());
                Ok(page.clone())
            })
            .await
    }

    /// Delete a page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the page does not exist.
    pub async fn delete(&self, id: PageId) -> Result<(), RepositoryError> {
        self.db
            .pages()
            .update(|pages| {
                let before = pages.len();
                pages.retain(|p| p.id != id);
                if pages.len() == before {
                    return Err(RepositoryError::NotFound);
                }
                Ok(())
            })
            .await
    }
}

fn ensure_slug_free(
    pages: &[Page],
    slug: &Slug,
    except: Option<PageId>,
) -> Result<(), RepositoryError> {
    if pages.iter().any(|p| &p.slug == slug && Some(p.id) != except) {
        return Err(RepositoryError::Conflict(format!(
            "page with slug '{slug}' already exists"
        )));
    }
    Ok(())
}
