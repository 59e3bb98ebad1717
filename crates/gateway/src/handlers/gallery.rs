//! Public gallery handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::papers::MessageResponse;
use crate::AppState;
use resplain_common::{
    auth::AuthContext,
    db::GalleryFilter,
    errors::{AppError, Result},
    services::{parse_paper_id, GalleryEntry},
};

#[derive(Debug, Default, Deserialize)]
pub struct GalleryQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct GalleryResponse {
    pub papers: Vec<GalleryEntry>,
}

/// Optional body when publishing a paper
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PostToGalleryRequest {
    #[validate(length(max = 100))]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPaper {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub is_public: bool,
}

#[derive(Serialize)]
pub struct PostToGalleryResponse {
    pub message: &'static str,
    pub paper: PublishedPaper,
}

/// Parse the optional publish body; a blank body means no changes
fn parse_publish_body(body: &[u8]) -> Result<PostToGalleryRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PostToGalleryRequest::default());
    }

    serde_json::from_slice(body).map_err(|e| AppError::Validation {
        message: format!("Invalid request body: {}", e),
        field: None,
    })
}

/// List public papers
pub async fn list_gallery(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<GalleryResponse>> {
    let filter = GalleryFilter::new(query.search, query.category);
    let papers = state.library.gallery(&filter).await?;

    Ok(Json(GalleryResponse { papers }))
}

/// Make one of the caller's papers public
pub async fn post_to_gallery(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<String>,
    body: Bytes,
) -> Result<Json<PostToGalleryResponse>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let request = parse_publish_body(&body)?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("category".to_string()),
    })?;

    let paper = state
        .library
        .publish(auth.user_id, paper_id, request.category)
        .await?;

    Ok(Json(PostToGalleryResponse {
        message: "Paper posted to gallery successfully",
        paper: PublishedPaper {
            id: paper.id,
            title: paper.filename,
            category: paper.category,
            is_public: paper.is_public,
        },
    }))
}

/// Make one of the caller's papers private
pub async fn remove_from_gallery(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let paper_id = parse_paper_id(&paper_id)?;
    state.library.unpublish(auth.user_id, paper_id).await?;

    Ok(Json(MessageResponse {
        message: "Paper removed from gallery successfully",
    }))
}
