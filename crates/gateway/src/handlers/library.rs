//! Library handler

use axum::{extract::State, Json};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use resplain_common::{
    auth::AuthContext,
    db::models::{PaperSummary, DEFAULT_CATEGORY},
    errors::Result,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: Uuid,
    pub name: String,
    pub original_name: String,
    pub age_level: String,
    pub category: String,
    pub is_public: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<PaperSummary> for LibraryItem {
    fn from(paper: PaperSummary) -> Self {
        let category = if paper.category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            paper.category
        };

        Self {
            id: paper.id,
            name: paper.filename,
            original_name: paper.original_name,
            age_level: paper.age_level,
            category,
            is_public: paper.is_public,
            created_at: paper.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct LibraryResponse {
    pub library: Vec<LibraryItem>,
}

/// The caller's papers in library form
pub async fn library(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<LibraryResponse>> {
    let papers = state.library.list_owned(auth.user_id).await?;

    Ok(Json(LibraryResponse {
        library: papers.into_iter().map(LibraryItem::from).collect(),
    }))
}
