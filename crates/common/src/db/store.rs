//! Storage abstraction shared by the SeaORM repository and the in-memory store

use crate::db::models::{Paper, PaperSummary, User};
use crate::errors::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Maximum number of entries returned by a gallery listing
pub const GALLERY_LIMIT: u64 = 100;

/// Fields of a paper created by the processing workflow
#[derive(Debug, Clone)]
pub struct NewPaper {
    pub user_id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub explanation: String,
    pub age_level: String,
}

/// A public paper together with its owner's email, if the owner still exists
pub type GalleryRow = (Paper, Option<String>);

/// Gallery query options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryFilter {
    search: Option<String>,
    category: Option<String>,
}

impl GalleryFilter {
    /// Build a filter, treating blank values as absent
    pub fn new(search: Option<String>, category: Option<String>) -> Self {
        fn normalize(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            search: normalize(search),
            category: normalize(category),
        }
    }

    /// Case-insensitive substring matched against filename or category
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Exact category match
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Evaluate the filter against a paper in memory.
    ///
    /// Mirrors the predicate the repository pushes into SQL.
    pub fn matches(&self, paper: &Paper) -> bool {
        if !paper.is_public {
            return false;
        }

        if let Some(search) = self.search() {
            let needle = search.to_lowercase();
            let hit = paper.filename.to_lowercase().contains(&needle)
                || paper.category.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        match self.category() {
            Some(category) => paper.category == category,
            None => true,
        }
    }
}

/// Escape `%`, `_` and `\` so user input is matched literally by LIKE
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Persistence operations needed by the paper services.
///
/// Listings are ordered newest first, ties broken by ascending id.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check backing storage connectivity
    async fn ping(&self) -> Result<()>;

    /// Find a user by ID
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Persist a processed paper and, when metered, bump the owner's counter.
    ///
    /// Both writes succeed or fail together. Returns the stored paper and
    /// the owner's new `papers_processed` when the counter was incremented.
    async fn record_processed_paper(
        &self,
        paper: NewPaper,
        count_against_quota: bool,
    ) -> Result<(Paper, Option<i32>)>;

    /// Find a paper by ID regardless of owner
    async fn find_paper_by_id(&self, id: Uuid) -> Result<Option<Paper>>;

    /// All papers owned by a user, without explanations
    async fn list_papers_by_owner(&self, user_id: Uuid) -> Result<Vec<PaperSummary>>;

    /// Public papers matching the filter, capped at [`GALLERY_LIMIT`]
    async fn list_gallery(&self, filter: &GalleryFilter) -> Result<Vec<GalleryRow>>;

    /// Set a paper's visibility, optionally replacing its category.
    ///
    /// Only touches the paper when `user_id` owns it.
    async fn set_paper_visibility(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_public: bool,
        category: Option<String>,
    ) -> Result<Option<Paper>>;

    /// Delete a paper owned by `user_id`. Returns whether a row was removed.
    async fn delete_paper(&self, id: Uuid, user_id: Uuid) -> Result<bool>;
}
