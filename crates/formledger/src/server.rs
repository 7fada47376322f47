//! HTTP server for the registration form and dataset endpoint.
//!
//! Routes:
//! - `GET /`: registration form
//! - `GET /completion`: shown after a successful registration
//! - `POST /register`: form submission
//! - `GET /data`: dataset rows as a JSON array
//! - `GET /health`: liveness check
//!
//! Anything else falls through to the configured static directory.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, ServerConfig};
use crate::dataset::DatasetReader;
use crate::error::{Error, Result};
use crate::registration::{self, Outcome, RegistrationForm, COMPLETION_PATH};
use crate::storage::{RecordSink, RecordStore, RecordWriter};

const REGISTRATION_PAGE: &str = include_str!("web/registration.html");
const COMPLETION_PAGE: &str = include_str!("web/completion.html");

/// Body of the `500` response from `GET /data`.
pub const READ_ERROR_MESSAGE: &str = "Internal Server Error";

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Destination for accepted registrations.
    pub records: Arc<dyn RecordSink>,
    /// Source of the `GET /data` rows.
    pub dataset: DatasetReader,
}

impl AppState {
    /// Creates state from its parts.
    #[must_use]
    pub fn new(records: Arc<dyn RecordSink>, dataset: DatasetReader) -> Self {
        Self { records, dataset }
    }
}

/// Build the router for the given state.
#[must_use]
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(registration_page))
        .route(COMPLETION_PATH, get(completion_page))
        .route("/register", post(register))
        .route("/data", get(dataset))
        .route("/health", get(health))
        .with_state(state);

    if let Some(dir) = &config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router = router.layer(TraceLayer::new_for_http());

    if config.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

/// The HTTP server.
#[derive(Debug)]
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    /// Open the registrations file, start its writer and prepare the routes.
    ///
    /// Must be called from within a Tokio runtime. A registrations file that
    /// cannot be written only fails registrations; the dataset is still served.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let store = RecordStore::open(config.registrations_path());
        let writer = RecordWriter::spawn(store, config.storage.writer_queue);
        let dataset = DatasetReader::new(config.dataset_path())
            .with_excluded_columns(config.storage.excluded_columns.clone());

        let state = AppState::new(Arc::new(writer), dataset);
        Self { config, state }
    }

    /// Shared state used by the handlers.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Creates the router.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config.server)
    }

    /// Runs the server until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or serving fails.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.bind;
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        info!(
            %addr,
            registrations = %self.config.registrations_path().display(),
            dataset = %self.config.dataset_path().display(),
            "Server running at http://{addr}"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Serve(e.to_string()))?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down gracefully"),
        () = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}

// === Handlers ===

async fn registration_page() -> Html<&'static str> {
    Html(REGISTRATION_PAGE)
}

async fn completion_page() -> Html<&'static str> {
    Html(COMPLETION_PAGE)
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> Outcome {
    registration::handle(form, state.records.as_ref()).await
}

async fn dataset(State(state): State<AppState>) -> Response {
    match state.dataset.load().await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => {
            error!(kind = err.kind(), "Error reading the dataset: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, READ_ERROR_MESSAGE).into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, LOCATION};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::logging::init_test_logging;
    use crate::registration::{MISMATCH_MESSAGE, STORE_ERROR_MESSAGE};

    struct Fixture {
        dir: TempDir,
        router: Router,
    }

    impl Fixture {
        fn new(dataset: Option<&str>) -> Self {
            Self::with_setup(dataset, |_| {})
        }

        fn with_setup(dataset: Option<&str>, setup: impl FnOnce(&std::path::Path)) -> Self {
            init_test_logging();

            let dir = TempDir::new().unwrap();
            if let Some(contents) = dataset {
                std::fs::write(dir.path().join("data.csv"), contents).unwrap();
            }
            setup(dir.path());

            let mut config = Config::default();
            config.storage.registrations_path = dir.path().join("registrations.csv");
            config.storage.dataset_path = dir.path().join("data.csv");
            config.server.static_dir = Some(dir.path().join("public"));

            let server = Server::new(config);
            let router = server.router();
            Self { dir, router }
        }

        fn registrations(&self) -> String {
            std::fs::read_to_string(self.dir.path().join("registrations.csv")).unwrap()
        }

        async fn send(&self, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
            let resp = self.router.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
                .await
                .unwrap();
            (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
        }

        async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
            self.send(Request::get(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post_form(&self, body: &str) -> (StatusCode, axum::http::HeaderMap, String) {
            let req = Request::post("/register")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(req).await
        }
    }

    const ALICE: &str = "username=alice&password=p1&repeatPassword=p1&email=a%40x.com&phone=555&gender=F&dob=2000-01-01";

    #[tokio::test]
    async fn test_index_serves_form() {
        let fx = Fixture::new(None);
        let (status, headers, body) = fx.get("/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers[CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
        assert!(body.contains("name=\"repeatPassword\""));
    }

    #[tokio::test]
    async fn test_completion_page() {
        let fx = Fixture::new(None);
        let (status, _, body) = fx.get("/completion").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("registration has been received"));
    }

    #[tokio::test]
    async fn test_register_success_redirects() {
        let fx = Fixture::new(None);
        let (status, headers, _) = fx.post_form(ALICE).await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[LOCATION], "/completion");
        assert!(fx
            .registrations()
            .ends_with("alice,p1,a@x.com,555,F,2000-01-01\n"));
    }

    #[tokio::test]
    async fn test_register_mismatch() {
        let fx = Fixture::new(None);
        let before = fx.registrations();

        let (status, _, body) = fx
            .post_form("username=alice&password=p1&repeatPassword=p2")
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, MISMATCH_MESSAGE);
        assert_eq!(fx.registrations(), before);
    }

    #[tokio::test]
    async fn test_register_store_failure() {
        let fx = Fixture::new(None);
        let path = fx.dir.path().join("registrations.csv");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let (status, _, body) = fx.post_form(ALICE).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, STORE_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_unwritable_registrations_keep_dataset_served() {
        let fx = Fixture::with_setup(
            Some("Category,Subcategory,Note,Amount\nFood,Fruit,fresh,5\n"),
            |dir| std::fs::create_dir(dir.join("registrations.csv")).unwrap(),
        );

        let (status, _, body) = fx.get("/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"[{"Category":"Food","Amount":"5"}]"#);

        let (status, headers, body) = fx.post_form(ALICE).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(LOCATION).is_none());
        assert_eq!(body, STORE_ERROR_MESSAGE);

        let (status, _, _) = fx.get("/").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_data_returns_projected_rows() {
        let fx = Fixture::new(Some(
            "Category,Subcategory,Note,Amount\nFood,Fruit,fresh,5\n",
        ));
        let (status, headers, body) = fx.get("/data").await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        assert_eq!(body, r#"[{"Category":"Food","Amount":"5"}]"#);
    }

    #[tokio::test]
    async fn test_data_header_only() {
        let fx = Fixture::new(Some("Category,Subcategory,Note,Amount\n"));
        let (status, _, body) = fx.get("/data").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_data_missing_file() {
        let fx = Fixture::new(None);
        let (status, _, body) = fx.get("/data").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, READ_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let fx = Fixture::new(None);
        std::fs::create_dir(fx.dir.path().join("public")).unwrap();
        std::fs::write(fx.dir.path().join("public/style.css"), "body {}").unwrap();

        let (status, _, body) = fx.get("/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body {}");

        let (status, _, _) = fx.get("/missing.css").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let fx = Fixture::new(None);
        let (status, _, body) = fx.get("/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_cors_header_present() {
        let fx = Fixture::new(None);
        let req = Request::get("/health")
            .header("origin", "http://example.com")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = fx.send(req).await;

        assert_eq!(headers["access-control-allow-origin"], "*");
    }
}
