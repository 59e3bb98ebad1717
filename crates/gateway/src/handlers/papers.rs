//! Paper processing and owner-scoped paper handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use resplain_common::{
    auth::AuthContext,
    db::models::{Paper, PaperSummary, DEFAULT_CATEGORY},
    errors::{AppError, Result},
    services::{parse_paper_id, Submission, Usage},
};

/// Request to process a paper
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaperRequest {
    #[validate(length(max = 1024))]
    pub filename: Option<String>,

    pub age_level: Option<String>,
}

/// Paper as returned right after processing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPaperView {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub explanation: String,
    pub age_level: String,
    pub category: String,
    pub is_public: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<Paper> for ProcessedPaperView {
    fn from(paper: Paper) -> Self {
        Self {
            id: paper.id,
            filename: paper.filename,
            original_name: paper.original_name,
            explanation: paper.explanation,
            age_level: paper.age_level,
            category: paper.category,
            is_public: paper.is_public,
            created_at: paper.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProcessPaperResponse {
    pub message: &'static str,
    pub paper: ProcessedPaperView,
    pub user: Usage,
}

/// Entry in the caller's paper list; `filename` carries the uploaded name
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperListItem {
    pub id: Uuid,
    pub filename: String,
    pub age_level: String,
    pub category: String,
    pub is_public: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<PaperSummary> for PaperListItem {
    fn from(paper: PaperSummary) -> Self {
        let category = if paper.category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            paper.category
        };

        Self {
            id: paper.id,
            filename: paper.original_name,
            age_level: paper.age_level,
            category,
            is_public: paper.is_public,
            created_at: paper.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct PaperListResponse {
    pub papers: Vec<PaperListItem>,
}

/// Full stored paper
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub explanation: String,
    pub age_level: String,
    pub is_public: bool,
    pub category: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<Paper> for PaperDetail {
    fn from(paper: Paper) -> Self {
        Self {
            id: paper.id,
            user_id: paper.user_id,
            filename: paper.filename,
            original_name: paper.original_name,
            explanation: paper.explanation,
            age_level: paper.age_level,
            is_public: paper.is_public,
            category: paper.category,
            created_at: paper.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct PaperResponse {
    pub paper: PaperDetail,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Generate and store an explanation for a paper
pub async fn process_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    body: std::result::Result<Json<ProcessPaperRequest>, JsonRejection>,
) -> Result<Json<ProcessPaperResponse>> {
    let Json(request) = body.map_err(|e| AppError::Validation {
        message: e.body_text(),
        field: None,
    })?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("filename".to_string()),
    })?;

    let submission = Submission::new(request.filename.as_deref(), request.age_level.as_deref())?;

    tracing::debug!(
        user_id = %auth.user_id,
        request_id = %auth.request_id,
        filename = %submission.filename(),
        "Processing paper"
    );

    let processed = state.processor.process(auth.user_id, submission).await?;

    Ok(Json(ProcessPaperResponse {
        message: "Paper processed successfully",
        paper: processed.paper.into(),
        user: processed.usage,
    }))
}

/// List the caller's papers without explanations
pub async fn my_papers(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<PaperListResponse>> {
    let papers = state.library.list_owned(auth.user_id).await?;

    Ok(Json(PaperListResponse {
        papers: papers.into_iter().map(PaperListItem::from).collect(),
    }))
}

/// Get one of the caller's papers
pub async fn get_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<String>,
) -> Result<Json<PaperResponse>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let paper = state.library.get_owned(auth.user_id, paper_id).await?;

    Ok(Json(PaperResponse {
        paper: paper.into(),
    }))
}

/// Delete one of the caller's papers
pub async fn delete_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let paper_id = parse_paper_id(&paper_id)?;
    state.library.delete_owned(auth.user_id, paper_id).await?;

    Ok(Json(MessageResponse {
        message: "Paper deleted successfully",
    }))
}
