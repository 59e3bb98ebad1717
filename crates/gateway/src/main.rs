//! Resplain API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Authentication
//! - Paper processing and library routes
//! - The public gallery
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    http::Uri,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use resplain_common::{
    auth::JwtManager,
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository, Store},
    errors::AppError,
    generation::{create_generator, ExplanationGenerator},
    metrics,
    services::{PaperLibrary, PaperProcessor},
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt: Arc<JwtManager>,
    pub processor: PaperProcessor,
    pub library: PaperLibrary,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        generator: Arc<dyn ExplanationGenerator>,
        jwt: Arc<JwtManager>,
    ) -> Self {
        Self {
            processor: PaperProcessor::new(store.clone(), generator),
            library: PaperLibrary::new(store.clone()),
            store,
            jwt,
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config.observability);
    info!(
        service = %config.observability.service_name,
        "Starting Resplain API Gateway v{}",
        resplain_common::VERSION
    );

    // Initialize metrics
    init_metrics(&config.observability)?;

    // Initialize database connection
    let pool = DbPool::new(&config.database).await?;
    if config.database.auto_create_schema {
        pool.ensure_schema().await?;
    }
    let store: Arc<dyn Store> = Arc::new(Repository::new(pool));

    let generator = create_generator(&config.generation)?;
    info!(model = generator.model_name(), "Explanation generator ready");

    let secret = config
        .auth
        .jwt_secret
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("auth.jwt_secret is not configured"))?;
    let jwt = Arc::new(JwtManager::new(secret, config.auth.jwt_expiration_secs));

    // Create app state
    let state = AppState::new(store, generator, jwt);

    // Build the router
    let app = create_router(state);

    // Start the server
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = shutdown_tx.send(());
            })
            .await
    });

    // Resolves on a shutdown signal, or immediately if the server task ended on its own
    let _ = shutdown_rx.await;

    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Shutdown timeout elapsed, dropping open connections"
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber; `RUST_LOG` wins over configuration
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Start the Prometheus exporter unless disabled with port 0
fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("generation_duration_seconds".to_string()),
            metrics::GENERATION_BUCKETS,
        )?
        .install()?;

    metrics::register_metrics();
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Paper endpoints
        .route("/papers/process", post(handlers::papers::process_paper))
        .route("/papers/my-papers", get(handlers::papers::my_papers))
        .route(
            "/papers/{paper_id}",
            get(handlers::papers::get_paper).delete(handlers::papers::delete_paper),
        )

        // Gallery endpoints
        .route("/gallery", get(handlers::gallery::list_gallery))
        .route(
            "/gallery/{paper_id}",
            post(handlers::gallery::post_to_gallery)
                .delete(handlers::gallery::remove_from_gallery),
        )

        // Library
        .route("/library", get(handlers::library::library))
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_metrics));

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        resource_type: "route".to_string(),
        id: uri.path().to_string(),
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());

    AppError::Internal { message }.into_response()
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use resplain_common::{
        db::models::{Paper, User, DEFAULT_CATEGORY},
        db::MemoryStore,
        generation::MockGenerator,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    struct Harness {
        app: Router,
        store: Arc<MemoryStore>,
        generator: Arc<MockGenerator>,
        jwt: Arc<JwtManager>,
    }

    impl Harness {
        async fn new(users: &[User]) -> Self {
            let store = Arc::new(MemoryStore::new());
            for user in users {
                store.insert_user(user.clone()).await;
            }
            let generator = Arc::new(MockGenerator::new());
            let jwt = Arc::new(JwtManager::new("router-test-secret", 3600));
            let state = AppState::new(
                store.clone(),
                generator.clone(),
                jwt.clone(),
            );

            Self {
                app: create_router(state),
                store,
                generator,
                jwt,
            }
        }

        fn token(&self, user_id: Uuid) -> String {
            self.jwt.generate_token(user_id).unwrap()
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            user: Option<Uuid>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            self.send_raw(method, uri, user, body.map(|body| body.to_string()))
                .await
        }

        /// Send an unparsed body labelled as JSON
        async fn send_raw(
            &self,
            method: Method,
            uri: &str,
            user: Option<Uuid>,
            body: Option<String>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(user_id) = user {
                builder = builder.header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", self.token(user_id)),
                );
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }
    }

    fn user(subscription: &str, processed: i32) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", subscription),
            subscription: subscription.to_string(),
            papers_processed: processed,
            papers_limit: 5,
            created_at: Utc::now().into(),
        }
    }

    fn paper(user_id: Uuid, filename: &str, is_public: bool, minutes_ago: i64) -> Paper {
        Paper {
            id: Uuid::now_v7(),
            user_id,
            filename: filename.to_string(),
            original_name: format!("{}.pdf", filename),
            explanation: format!("{} explained", filename),
            age_level: "college".to_string(),
            is_public,
            category: DEFAULT_CATEGORY.to_string(),
            created_at: (Utc::now() - Duration::minutes(minutes_ago)).into(),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let h = Harness::new(&[]).await;
        let (status, body) = h.send(Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_ready_reports_database() {
        let h = Harness::new(&[]).await;
        let (status, body) = h.send(Method::GET, "/api/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["database"]["status"], "up");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let h = Harness::new(&[]).await;
        let (status, body) = h.send(Method::GET, "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let h = Harness::new(&[]).await;
        let (status, body) = h
            .send(
                Method::POST,
                "/api/papers/process",
                None,
                Some(json!({"filename": "paper.pdf", "ageLevel": "college"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"]["message"].is_string());
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_process_free_user_first_paper() {
        let owner = user("free", 0);
        let h = Harness::new(&[owner.clone()]).await;

        let (status, body) = h
            .send(
                Method::POST,
                "/api/papers/process",
                Some(owner.id),
                Some(json!({"filename": "quantum.pdf", "ageLevel": "preschool"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Paper processed successfully");
        assert_eq!(body["paper"]["filename"], "quantum");
        assert_eq!(body["paper"]["originalName"], "quantum.pdf");
        assert_eq!(body["paper"]["ageLevel"], "preschool");
        assert_eq!(body["user"]["papersProcessed"], 1);
        assert_eq!(body["user"]["papersLimit"], 5);
    }

    #[tokio::test]
    async fn test_process_missing_fields_is_bad_request() {
        let owner = user("free", 0);
        let h = Harness::new(&[owner.clone()]).await;

        let (status, body) = h
            .send(
                Method::POST,
                "/api/papers/process",
                Some(owner.id),
                Some(json!({"filename": "paper.pdf"})),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_process_at_limit_is_forbidden() {
        let owner = user("free", 5);
        let h = Harness::new(&[owner.clone()]).await;

        let (status, body) = h
            .send(
                Method::POST,
                "/api/papers/process",
                Some(owner.id),
                Some(json!({"filename": "paper.pdf", "ageLevel": "college"})),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "QUOTA_EXCEEDED");
        assert_eq!(body["error"]["details"]["papersProcessed"], 5);
        assert_eq!(h.store.paper_count().await, 0);
    }

    #[tokio::test]
    async fn test_process_unknown_user_is_not_found() {
        let h = Harness::new(&[]).await;
        let (status, _) = h
            .send(
                Method::POST,
                "/api/papers/process",
                Some(Uuid::new_v4()),
                Some(json!({"filename": "paper.pdf", "ageLevel": "college"})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_id_rejected_before_store() {
        let owner = user("free", 0);
        let h = Harness::new(&[]).await;

        for (method, uri) in [
            (Method::GET, "/api/papers/not-an-id"),
            (Method::DELETE, "/api/papers/not-an-id"),
            (Method::POST, "/api/gallery/not-an-id"),
            (Method::DELETE, "/api/gallery/not-an-id"),
        ] {
            let (status, body) = h.send(method, uri, Some(owner.id), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "INVALID_FORMAT");
        }

        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_cross_owner_access_is_not_found() {
        let owner = user("free", 0);
        let stranger = user("free", 0);
        let h = Harness::new(&[owner.clone(), stranger.clone()]).await;
        let p = paper(owner.id, "secret", false, 0);
        h.store.insert_paper(p.clone()).await;

        let get_uri = format!("/api/papers/{}", p.id);
        let gallery_uri = format!("/api/gallery/{}", p.id);

        let (status, body) = h.send(Method::GET, &get_uri, Some(stranger.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Paper not found");

        let (status, _) = h.send(Method::DELETE, &get_uri, Some(stranger.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = h.send(Method::POST, &gallery_uri, Some(stranger.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = h
            .send(Method::DELETE, &gallery_uri, Some(stranger.id), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = h.send(Method::GET, &get_uri, Some(owner.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paper"]["isPublic"], false);
        assert_eq!(h.store.paper_count().await, 1);
    }

    #[tokio::test]
    async fn test_my_papers_and_library_are_newest_first() {
        let owner = user("pro", 0);
        let h = Harness::new(&[owner.clone()]).await;
        h.store.insert_paper(paper(owner.id, "older", false, 10)).await;
        h.store.insert_paper(paper(owner.id, "newer", true, 1)).await;
        h.store.insert_paper(paper(Uuid::new_v4(), "foreign", true, 0)).await;

        let (status, body) = h
            .send(Method::GET, "/api/papers/my-papers", Some(owner.id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let papers = body["papers"].as_array().unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0]["filename"], "newer.pdf");
        assert!(papers[0].get("explanation").is_none());

        let (status, body) = h.send(Method::GET, "/api/library", Some(owner.id), None).await;
        assert_eq!(status, StatusCode::OK);
        let library = body["library"].as_array().unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library[0]["name"], "newer");
        assert_eq!(library[0]["originalName"], "newer.pdf");
        assert_eq!(library[1]["isPublic"], false);
    }

    #[tokio::test]
    async fn test_delete_paper() {
        let owner = user("free", 0);
        let h = Harness::new(&[owner.clone()]).await;
        let p = paper(owner.id, "gone", false, 0);
        h.store.insert_paper(p.clone()).await;

        let uri = format!("/api/papers/{}", p.id);
        let (status, body) = h.send(Method::DELETE, &uri, Some(owner.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Paper deleted successfully");

        let (status, _) = h.send(Method::GET, &uri, Some(owner.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_publish_then_browse_by_category() {
        let owner = user("free", 0);
        let h = Harness::new(&[owner.clone()]).await;

        let (_, body) = h
            .send(
                Method::POST,
                "/api/papers/process",
                Some(owner.id),
                Some(json!({"filename": "quantum.pdf", "ageLevel": "college"})),
            )
            .await;
        let id = body["paper"]["id"].as_str().unwrap().to_string();

        let (status, body) = h
            .send(
                Method::POST,
                &format!("/api/gallery/{}", id),
                Some(owner.id),
                Some(json!({"category": "Physics"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Paper posted to gallery successfully");
        assert_eq!(body["paper"]["title"], "quantum");
        assert_eq!(body["paper"]["category"], "Physics");
        assert_eq!(body["paper"]["isPublic"], true);

        let (status, body) = h
            .send(Method::GET, "/api/gallery?category=Physics", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let papers = body["papers"].as_array().unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0]["id"], id.as_str());
        assert_eq!(papers[0]["author"], "free@example.com");
        assert_eq!(papers[0]["source"], "User Post");
        assert!(papers[0]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_gallery_excludes_private_papers() {
        let owner = user("free", 0);
        let h = Harness::new(&[owner.clone()]).await;
        h.store.insert_paper(paper(owner.id, "shared", true, 1)).await;
        h.store.insert_paper(paper(owner.id, "hidden", false, 0)).await;

        let (status, body) = h.send(Method::GET, "/api/gallery", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body["papers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["shared"]);

        let (_, body) = h.send(Method::GET, "/api/gallery?search=HID", None, None).await;
        assert!(body["papers"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_from_gallery() {
        let owner = user("free", 0);
        let h = Harness::new(&[owner.clone()]).await;
        let p = paper(owner.id, "shared", true, 0);
        h.store.insert_paper(p.clone()).await;

        let (status, body) = h
            .send(
                Method::DELETE,
                &format!("/api/gallery/{}", p.id),
                Some(owner.id),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Paper removed from gallery successfully");

        let (_, body) = h.send(Method::GET, "/api/gallery", None, None).await;
        assert!(body["papers"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_with_empty_json_body_keeps_category() {
        let owner = user("free", 0);
        let h = Harness::new(&[owner.clone()]).await;
        let p = paper(owner.id, "quantum", false, 0);
        h.store.insert_paper(p.clone()).await;

        let (status, body) = h
            .send_raw(
                Method::POST,
                &format!("/api/gallery/{}", p.id),
                Some(owner.id),
                Some(String::new()),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paper"]["category"], p.category.as_str());
        assert_eq!(body["paper"]["isPublic"], true);

        let (_, body) = h.send(Method::GET, "/api/gallery", None, None).await;
        assert_eq!(body["papers"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_with_mistyped_category_is_bad_request() {
        let owner = user("free", 0);
        let h = Harness::new(&[owner.clone()]).await;
        let p = paper(owner.id, "quantum", false, 0);
        h.store.insert_paper(p.clone()).await;

        let (status, body) = h
            .send_raw(
                Method::POST,
                &format!("/api/gallery/{}", p.id),
                Some(owner.id),
                Some(r#"{"category":5}"#.to_string()),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (_, body) = h.send(Method::GET, "/api/gallery", None, None).await;
        assert!(body["papers"].as_array().unwrap().is_empty());
    }
}
