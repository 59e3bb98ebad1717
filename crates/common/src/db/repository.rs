//! Repository pattern for database operations
//!
//! SeaORM implementation of [`Store`] with transactional writes for the
//! processing workflow.

use crate::db::models::*;
use crate::db::store::{escape_like, GalleryFilter, GalleryRow, NewPaper, Store, GALLERY_LIMIT};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, SelectTwo, Set, TransactionTrait,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    fn search_condition(search: &str) -> Condition {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));

        Condition::any()
            .add(
                Expr::expr(Func::lower(Expr::col((PaperEntity, PaperColumn::Filename))))
                    .like(pattern.clone()),
            )
            .add(
                Expr::expr(Func::lower(Expr::col((PaperEntity, PaperColumn::Category))))
                    .like(pattern),
            )
    }

    fn owned_papers_query(user_id: Uuid) -> Select<PaperEntity> {
        PaperEntity::find()
            .select_only()
            .columns(paper_summary_columns())
            .filter(PaperColumn::UserId.eq(user_id))
            .order_by_desc(PaperColumn::CreatedAt)
            .order_by_asc(PaperColumn::Id)
    }

    fn gallery_query(filter: &GalleryFilter) -> SelectTwo<PaperEntity, UserEntity> {
        let mut query = PaperEntity::find()
            .find_also_related(UserEntity)
            .filter(PaperColumn::IsPublic.eq(true));

        if let Some(search) = filter.search() {
            query = query.filter(Self::search_condition(search));
        }

        if let Some(category) = filter.category() {
            query = query.filter(PaperColumn::Category.eq(category));
        }

        query
            .order_by_desc(PaperColumn::CreatedAt)
            .order_by_asc(PaperColumn::Id)
            .limit(GALLERY_LIMIT)
    }
}

#[async_trait]
impl Store for Repository {
    // ========================================================================
    // Health Check
    // ========================================================================

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    async fn record_processed_paper(
        &self,
        paper: NewPaper,
        count_against_quota: bool,
    ) -> Result<(Paper, Option<i32>)> {
        let user_id = paper.user_id;
        let txn = self.conn().begin().await?;

        let model = PaperActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(paper.user_id),
            filename: Set(paper.filename),
            original_name: Set(paper.original_name),
            explanation: Set(paper.explanation),
            age_level: Set(paper.age_level),
            is_public: Set(false),
            category: Set(DEFAULT_CATEGORY.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        let stored = model.insert(&txn).await?;

        let processed = if count_against_quota {
            // Atomic increment, so concurrent submissions cannot lose updates.
            let updated = UserEntity::update_many()
                .col_expr(
                    UserColumn::PapersProcessed,
                    Expr::col(UserColumn::PapersProcessed).add(1),
                )
                .filter(UserColumn::Id.eq(user_id))
                .exec_with_returning(&txn)
                .await?;

            let user = updated
                .into_iter()
                .next()
                .ok_or_else(|| AppError::UserNotFound {
                    id: user_id.to_string(),
                })?;
            Some(user.papers_processed)
        } else {
            None
        };

        txn.commit().await?;

        Ok((stored, processed))
    }

    async fn find_paper_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_papers_by_owner(&self, user_id: Uuid) -> Result<Vec<PaperSummary>> {
        Self::owned_papers_query(user_id)
            .into_model::<PaperSummary>()
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_gallery(&self, filter: &GalleryFilter) -> Result<Vec<GalleryRow>> {
        let rows = Self::gallery_query(filter).all(self.conn()).await?;

        Ok(rows
            .into_iter()
            .map(|(paper, owner)| (paper, owner.map(|user| user.email)))
            .collect())
    }

    async fn set_paper_visibility(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_public: bool,
        category: Option<String>,
    ) -> Result<Option<Paper>> {
        let existing = PaperEntity::find_by_id(id)
            .filter(PaperColumn::UserId.eq(user_id))
            .one(self.conn())
            .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut paper: PaperActiveModel = existing.into();
        paper.is_public = Set(is_public);
        if let Some(category) = category {
            paper.category = Set(category);
        }

        let updated = paper.update(self.conn()).await?;
        Ok(Some(updated))
    }

    async fn delete_paper(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = PaperEntity::delete_many()
            .filter(PaperColumn::Id.eq(id))
            .filter(PaperColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
