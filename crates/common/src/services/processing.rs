//! Paper processing workflow
//!
//! limit check → generation → persistence → counter update, for one submission.

use crate::db::models::{Paper, SubscriptionTier};
use crate::db::{NewPaper, Store};
use crate::errors::{AppError, Result};
use crate::generation::{AgeLevel, ExplanationGenerator};
use crate::metrics;
use regex_lite::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// A validated processing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    filename: String,
    age_level: AgeLevel,
}

impl Submission {
    /// Validate raw request fields.
    ///
    /// Both fields are required and non-blank; the age level must be one of
    /// the configured values.
    pub fn new(filename: Option<&str>, age_level: Option<&str>) -> Result<Self> {
        let filename = filename.map(str::trim).filter(|f| !f.is_empty());
        let age_level = age_level.map(str::trim).filter(|a| !a.is_empty());

        let (Some(filename), Some(age_level)) = (filename, age_level) else {
            return Err(AppError::Validation {
                message: "Filename and age level are required".to_string(),
                field: None,
            });
        };

        Ok(Self {
            filename: filename.to_string(),
            age_level: AgeLevel::parse(age_level)?,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn age_level(&self) -> AgeLevel {
        self.age_level
    }
}

fn extension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\.[^/.]+$").expect("extension pattern is valid"))
}

/// Remove the final extension from a filename.
///
/// A name that is nothing but an extension (".bashrc") is kept as-is.
pub fn strip_extension(filename: &str) -> String {
    let stripped = extension_pattern().replace(filename, "");
    if stripped.is_empty() {
        filename.to_string()
    } else {
        stripped.into_owned()
    }
}

/// Usage counters returned after processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub papers_processed: i32,
    pub papers_limit: i32,
}

/// Outcome of a successful submission
#[derive(Debug, Clone)]
pub struct ProcessedPaper {
    pub paper: Paper,
    pub usage: Usage,
}

/// Orchestrates a single paper submission
#[derive(Clone)]
pub struct PaperProcessor {
    store: Arc<dyn Store>,
    generator: Arc<dyn ExplanationGenerator>,
}

impl PaperProcessor {
    pub fn new(store: Arc<dyn Store>, generator: Arc<dyn ExplanationGenerator>) -> Self {
        Self { store, generator }
    }

    /// Process one submission for `user_id`
    pub async fn process(&self, user_id: Uuid, submission: Submission) -> Result<ProcessedPaper> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound {
                id: user_id.to_string(),
            })?;

        if user.quota_exhausted() {
            metrics::record_quota_rejection();
            tracing::warn!(
                user_id = %user_id,
                papers_processed = user.papers_processed,
                papers_limit = user.papers_limit,
                "Paper limit reached"
            );
            return Err(AppError::QuotaExceeded {
                processed: user.papers_processed,
                limit: user.papers_limit,
            });
        }

        let level = submission.age_level();
        let explanation = self
            .generator
            .generate(submission.filename(), level.as_str())
            .await?;

        let metered = user.tier() == SubscriptionTier::Free;
        let new_paper = NewPaper {
            user_id,
            filename: strip_extension(submission.filename()),
            original_name: submission.filename().to_string(),
            explanation,
            age_level: level.as_str().to_string(),
        };

        let (paper, processed) = self.store.record_processed_paper(new_paper, metered).await?;

        metrics::record_paper_processed(level.as_str());
        tracing::info!(
            paper_id = %paper.id,
            user_id = %user_id,
            age_level = %level,
            model = self.generator.model_name(),
            "Paper processed"
        );

        Ok(ProcessedPaper {
            paper,
            usage: Usage {
                papers_processed: processed.unwrap_or(user.papers_processed),
                papers_limit: user.papers_limit,
            },
        })
    }
}
