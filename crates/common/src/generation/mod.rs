//! Explanation generation
//!
//! Provides a unified interface over generative-language providers:
//! - Google Gemini (`generateContent` REST API)
//! - A deterministic mock for tests and local development

mod prompt;

pub use prompt::{build_prompt, AgeLevel, AgeProfile};

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Trait for explanation generation
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    /// Produce an explanation of `filename` for the given age level key.
    ///
    /// Unknown keys fall back to the default level. Every provider failure
    /// surfaces as [`AppError::GenerationFailed`].
    async fn generate(&self, filename: &str, age_level: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Gemini client
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiGenerator {
    /// Create a new Gemini generator
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn make_request(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "gemini".to_string(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "gemini".to_string(),
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: GenerateResponse = response.json().await.map_err(|e| AppError::Upstream {
            service: "gemini".to_string(),
            message: format!("Failed to parse response: {}", e),
        })?;

        result.into_text().ok_or_else(|| AppError::Upstream {
            service: "gemini".to_string(),
            message: "Response contained no text".to_string(),
        })
    }
}

#[async_trait]
impl ExplanationGenerator for GeminiGenerator {
    async fn generate(&self, filename: &str, age_level: &str) -> Result<String> {
        let level = AgeLevel::resolve(Some(age_level));
        let prompt = build_prompt(filename, level);
        let start = Instant::now();

        match self.make_request(&prompt).await {
            Ok(text) => {
                metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, true);
                Ok(text)
            }
            Err(e) => {
                metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, false);
                tracing::error!(
                    error = %e,
                    model = %self.model,
                    age_level = %level,
                    "Gemini API error"
                );
                Err(AppError::GenerationFailed)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock generator for testing
#[derive(Default)]
pub struct MockGenerator {
    fail: bool,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generate calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExplanationGenerator for MockGenerator {
    async fn generate(&self, filename: &str, age_level: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(AppError::GenerationFailed);
        }

        let profile = AgeLevel::resolve(Some(age_level)).profile();
        Ok(format!(
            "SUMMARY\n{} explained for a {} audience.\n\nTHE ANALOGY\nLike building blocks.\n\n\
             THE IMPACT\nIt matters.\n\nKEY TAKEAWAYS\nOne. Two. Three.",
            filename, profile.label
        ))
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn ExplanationGenerator>> {
    match config.provider.as_str() {
        "gemini" => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| AppError::Configuration {
                    message: "Gemini API key required".to_string(),
                })?;
            Ok(Arc::new(GeminiGenerator::new(
                key,
                config.model.clone(),
                config.api_base.clone(),
            )))
        }
        "mock" => Ok(Arc::new(MockGenerator::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown generation provider: {}", other),
        }),
    }
}
