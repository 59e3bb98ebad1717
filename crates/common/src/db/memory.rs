//! In-memory [`Store`] for tests and local development

use crate::db::models::{Paper, PaperSummary, User, DEFAULT_CATEGORY};
use crate::db::store::{GalleryFilter, GalleryRow, NewPaper, Store, GALLERY_LIMIT};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    papers: Vec<Paper>,
}

/// Store backed by process memory.
///
/// Counts every call made through the [`Store`] trait so callers can assert
/// that a request was rejected before touching storage.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    calls: AtomicUsize,
}

fn newest_first(a: &Paper, b: &Paper) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user
    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// Seed a fully-formed paper
    pub async fn insert_paper(&self, paper: Paper) {
        self.state.write().await.papers.push(paper);
    }

    /// Current copy of a user, bypassing the call counter
    pub async fn user(&self, id: Uuid) -> Option<User> {
        self.state.read().await.users.get(&id).cloned()
    }

    /// Number of stored papers, bypassing the call counter
    pub async fn paper_count(&self) -> usize {
        self.state.read().await.papers.len()
    }

    /// Number of calls made through the [`Store`] trait
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.record_call();
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.record_call();
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn record_processed_paper(
        &self,
        paper: NewPaper,
        count_against_quota: bool,
    ) -> Result<(Paper, Option<i32>)> {
        self.record_call();
        let mut state = self.state.write().await;

        // Check the user before any write so a failure leaves nothing behind.
        let processed = if count_against_quota {
            let user =
                state
                    .users
                    .get_mut(&paper.user_id)
                    .ok_or_else(|| AppError::UserNotFound {
                        id: paper.user_id.to_string(),
                    })?;
            user.papers_processed += 1;
            Some(user.papers_processed)
        } else {
            None
        };

        let stored = Paper {
            id: Uuid::now_v7(),
            user_id: paper.user_id,
            filename: paper.filename,
            original_name: paper.original_name,
            explanation: paper.explanation,
            age_level: paper.age_level,
            is_public: false,
            category: DEFAULT_CATEGORY.to_string(),
            created_at: chrono::Utc::now().into(),
        };
        state.papers.push(stored.clone());

        Ok((stored, processed))
    }

    async fn find_paper_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        self.record_call();
        let state = self.state.read().await;
        Ok(state.papers.iter().find(|p| p.id == id).cloned())
    }

    async fn list_papers_by_owner(&self, user_id: Uuid) -> Result<Vec<PaperSummary>> {
        self.record_call();
        let state = self.state.read().await;

        let mut owned: Vec<&Paper> = state
            .papers
            .iter()
            .filter(|p| p.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| newest_first(a, b));

        Ok(owned.into_iter().map(PaperSummary::from).collect())
    }

    async fn list_gallery(&self, filter: &GalleryFilter) -> Result<Vec<GalleryRow>> {
        self.record_call();
        let state = self.state.read().await;

        let mut public: Vec<&Paper> = state.papers.iter().filter(|p| filter.matches(p)).collect();
        public.sort_by(|a, b| newest_first(a, b));

        Ok(public
            .into_iter()
            .take(GALLERY_LIMIT as usize)
            .map(|paper| {
                let author = state.users.get(&paper.user_id).map(|u| u.email.clone());
                (paper.clone(), author)
            })
            .collect())
    }

    async fn set_paper_visibility(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_public: bool,
        category: Option<String>,
    ) -> Result<Option<Paper>> {
        self.record_call();
        let mut state = self.state.write().await;

        let Some(paper) = state
            .papers
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
        else {
            return Ok(None);
        };

        paper.is_public = is_public;
        if let Some(category) = category {
            paper.category = category;
        }

        Ok(Some(paper.clone()))
    }

    async fn delete_paper(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.record_call();
        let mut state = self.state.write().await;

        let before = state.papers.len();
        state
            .papers
            .retain(|p| !(p.id == id && p.user_id == user_id));

        Ok(state.papers.len() < before)
    }
}
