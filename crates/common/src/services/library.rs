//! Owner library, single-paper access, and the public gallery

use crate::db::models::{Paper, PaperSummary, DEFAULT_CATEGORY};
use crate::db::{GalleryFilter, Store};
use crate::errors::{AppError, Result};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Maximum characters of explanation shown in a gallery entry
pub const EXCERPT_CHARS: usize = 200;

/// Gallery summary used when a paper has no explanation text
pub const NO_SUMMARY: &str = "No summary available";

/// Author shown when the owner cannot be resolved
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Source label for user-published papers
pub const USER_POST_SOURCE: &str = "User Post";

/// Parse a path identifier, rejecting malformed ids before any lookup
pub fn parse_paper_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidFormat {
        message: "Invalid paper ID format".to_string(),
    })
}

/// Ensure `user_id` owns `paper`.
///
/// A foreign paper is reported exactly like a missing one.
pub fn authorize_owner(paper: Paper, user_id: Uuid) -> Result<Paper> {
    if paper.user_id == user_id {
        Ok(paper)
    } else {
        tracing::debug!(paper_id = %paper.id, user_id = %user_id, "Ownership check failed");
        Err(AppError::PaperNotFound {
            id: paper.id.to_string(),
        })
    }
}

/// Shorten an explanation for gallery display
pub fn gallery_excerpt(explanation: &str) -> String {
    if explanation.trim().is_empty() {
        return NO_SUMMARY.to_string();
    }

    match explanation.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &explanation[..cut]),
        None => explanation.to_string(),
    }
}

/// One public gallery entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub category: String,
    pub summary: String,
    pub source: &'static str,
    pub created_at: DateTime<FixedOffset>,
}

impl GalleryEntry {
    fn from_row(paper: Paper, author: Option<String>) -> Self {
        let category = if paper.category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            paper.category
        };

        Self {
            id: paper.id,
            title: paper.filename,
            author: author
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            category,
            summary: gallery_excerpt(&paper.explanation),
            source: USER_POST_SOURCE,
            created_at: paper.created_at,
        }
    }
}

/// Read and visibility operations over stored papers
#[derive(Clone)]
pub struct PaperLibrary {
    store: Arc<dyn Store>,
}

impl PaperLibrary {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All papers owned by `user_id`, newest first
    pub async fn list_owned(&self, user_id: Uuid) -> Result<Vec<PaperSummary>> {
        self.store.list_papers_by_owner(user_id).await
    }

    /// A single paper owned by `user_id`
    pub async fn get_owned(&self, user_id: Uuid, paper_id: Uuid) -> Result<Paper> {
        let paper = self
            .store
            .find_paper_by_id(paper_id)
            .await?
            .ok_or_else(|| AppError::PaperNotFound {
                id: paper_id.to_string(),
            })?;

        authorize_owner(paper, user_id)
    }

    /// Delete a paper owned by `user_id`
    pub async fn delete_owned(&self, user_id: Uuid, paper_id: Uuid) -> Result<()> {
        self.get_owned(user_id, paper_id).await?;

        if !self.store.delete_paper(paper_id, user_id).await? {
            return Err(AppError::PaperNotFound {
                id: paper_id.to_string(),
            });
        }

        tracing::info!(paper_id = %paper_id, user_id = %user_id, "Paper deleted");
        Ok(())
    }

    /// Make a paper public, optionally recategorizing it
    pub async fn publish(
        &self,
        user_id: Uuid,
        paper_id: Uuid,
        category: Option<String>,
    ) -> Result<Paper> {
        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let paper = self.set_visibility(user_id, paper_id, true, category).await?;
        tracing::info!(
            paper_id = %paper_id,
            user_id = %user_id,
            category = %paper.category,
            "Paper posted to gallery"
        );
        Ok(paper)
    }

    /// Make a paper private again
    pub async fn unpublish(&self, user_id: Uuid, paper_id: Uuid) -> Result<Paper> {
        let paper = self.set_visibility(user_id, paper_id, false, None).await?;
        tracing::info!(paper_id = %paper_id, user_id = %user_id, "Paper removed from gallery");
        Ok(paper)
    }

    async fn set_visibility(
        &self,
        user_id: Uuid,
        paper_id: Uuid,
        is_public: bool,
        category: Option<String>,
    ) -> Result<Paper> {
        self.get_owned(user_id, paper_id).await?;

        self.store
            .set_paper_visibility(paper_id, user_id, is_public, category)
            .await?
            .ok_or_else(|| AppError::PaperNotFound {
                id: paper_id.to_string(),
            })
    }

    /// Public papers matching `filter`, formatted for display
    pub async fn gallery(&self, filter: &GalleryFilter) -> Result<Vec<GalleryEntry>> {
        let rows = self.store.list_gallery(filter).await?;

        Ok(rows
            .into_iter()
            .map(|(paper, author)| GalleryEntry::from_row(paper, author))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::User;
    use crate::db::MemoryStore;
    use chrono::{Duration, Utc};

    fn paper(user_id: Uuid, filename: &str, explanation: &str, is_public: bool) -> Paper {
        Paper {
            id: Uuid::now_v7(),
            user_id,
            filename: filename.to_string(),
            original_name: format!("{}.pdf", filename),
            explanation: explanation.to_string(),
            age_level: "college".to_string(),
            is_public,
            category: DEFAULT_CATEGORY.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn owner() -> User {
        User {
            id: Uuid::new_v4(),
            email: "curie@example.com".to_string(),
            subscription: "free".to_string(),
            papers_processed: 0,
            papers_limit: 5,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_parse_paper_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_paper_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_paper_id("not-an-id"),
            Err(AppError::InvalidFormat { .. })
        ));
        assert!(parse_paper_id("507f1f77bcf86cd79943901").is_err());
    }

    #[test]
    fn test_excerpt_truncates_long_text() {
        let long = "a".repeat(250);
        let excerpt = gallery_excerpt(&long);
        assert_eq!(excerpt, format!("{}...", "a".repeat(200)));
    }

    #[test]
    fn test_excerpt_keeps_short_text() {
        assert_eq!(gallery_excerpt("short text"), "short text");
        assert_eq!(gallery_excerpt(&"b".repeat(200)), "b".repeat(200));
    }

    #[test]
    fn test_excerpt_default_when_empty() {
        assert_eq!(gallery_excerpt(""), NO_SUMMARY);
    }

    #[test]
    fn test_excerpt_counts_characters_not_bytes() {
        let text = "é".repeat(201);
        let excerpt = gallery_excerpt(&text);
        assert_eq!(excerpt.chars().count(), 203);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_authorize_owner() {
        let owner_id = Uuid::new_v4();
        let p = paper(owner_id, "mine", "x", false);
        assert!(authorize_owner(p.clone(), owner_id).is_ok());
        assert!(matches!(
            authorize_owner(p, Uuid::new_v4()),
            Err(AppError::PaperNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_foreign_paper_looks_missing() {
        let store = Arc::new(MemoryStore::new());
        let library = PaperLibrary::new(store.clone());
        let owner_id = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let p = paper(owner_id, "mine", "x", false);
        store.insert_paper(p.clone()).await;

        let missing = library.get_owned(stranger, Uuid::new_v4()).await.unwrap_err();
        let foreign = library.get_owned(stranger, p.id).await.unwrap_err();
        assert_eq!(missing.status_code(), foreign.status_code());
        assert_eq!(missing.public_message(), foreign.public_message());

        assert!(library.delete_owned(stranger, p.id).await.is_err());
        assert!(library.publish(stranger, p.id, None).await.is_err());
        assert!(library.unpublish(stranger, p.id).await.is_err());
        assert_eq!(store.paper_count().await, 1);
    }

    #[tokio::test]
    async fn test_publish_then_filter_by_category() {
        let store = Arc::new(MemoryStore::new());
        let library = PaperLibrary::new(store.clone());
        let user = owner();
        store.insert_user(user.clone()).await;
        let p = paper(user.id, "quantum", "Quarks are tiny.", false);
        store.insert_paper(p.clone()).await;

        let published = library
            .publish(user.id, p.id, Some("Physics".into()))
            .await
            .unwrap();
        assert!(published.is_public);
        assert_eq!(published.category, "Physics");

        let entries = library
            .gallery(&GalleryFilter::new(None, Some("Physics".into())))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "quantum");
        assert_eq!(entries[0].author, "curie@example.com");
        assert_eq!(entries[0].category, "Physics");
        assert_eq!(entries[0].summary, "Quarks are tiny.");
        assert_eq!(entries[0].source, USER_POST_SOURCE);
    }

    #[tokio::test]
    async fn test_blank_category_keeps_existing() {
        let store = Arc::new(MemoryStore::new());
        let library = PaperLibrary::new(store.clone());
        let owner_id = Uuid::new_v4();
        let p = paper(owner_id, "mine", "x", false);
        store.insert_paper(p.clone()).await;

        let published = library.publish(owner_id, p.id, Some("  ".into())).await.unwrap();
        assert_eq!(published.category, DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_gallery_excludes_private_and_marks_anonymous() {
        let store = Arc::new(MemoryStore::new());
        let library = PaperLibrary::new(store.clone());
        let orphan_owner = Uuid::new_v4();

        let mut older = paper(orphan_owner, "older", "x", true);
        older.created_at = (Utc::now() - Duration::hours(1)).into();
        store.insert_paper(older).await;
        store.insert_paper(paper(orphan_owner, "newer", "y", true)).await;
        store.insert_paper(paper(orphan_owner, "hidden", "z", false)).await;

        let entries = library.gallery(&GalleryFilter::default()).await.unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
        assert!(entries.iter().all(|e| e.author == ANONYMOUS_AUTHOR));
    }

    #[tokio::test]
    async fn test_unpublish_hides_from_gallery() {
        let store = Arc::new(MemoryStore::new());
        let library = PaperLibrary::new(store.clone());
        let owner_id = Uuid::new_v4();
        let p = paper(owner_id, "mine", "x", true);
        store.insert_paper(p.clone()).await;

        let hidden = library.unpublish(owner_id, p.id).await.unwrap();
        assert!(!hidden.is_public);
        assert!(library.gallery(&GalleryFilter::default()).await.unwrap().is_empty());
    }
}
