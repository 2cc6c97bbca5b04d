//! Sample-data HTTP server
//!
//! Serves the bundled JSON datasets so the Druid web console, running
//! on another port, can ingest them over HTTP. Every response carries
//! permissive CORS headers; there is no TLS and no auth, this is
//! ingest plumbing for a demo cluster, not a public endpoint.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode, header},
    routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

#[derive(Clone)]
struct ServeState {
    root: PathBuf,
}

/// Body of `GET /`: the datasets available for ingestion
#[derive(Debug, Serialize)]
pub struct FileListing {
    pub directory: String,
    pub files: Vec<String>,
}

/// Wide-open CORS: any origin may GET the sample files, which is the
/// whole point of serving them next to the Druid console.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Router: `/` lists the datasets, everything else is served straight
/// from the sample-data directory
pub fn build_router(root: &Path) -> Router {
    let state = ServeState {
        root: root.to_path_buf(),
    };

    Router::new()
        .route("/", get(list_files))
        .fallback_service(ServeDir::new(root))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

async fn list_files(State(state): State<ServeState>) -> Result<Json<FileListing>, StatusCode> {
    read_listing(&state.root)
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Regular files in the sample-data directory, sorted by name
pub async fn read_listing(root: &Path) -> std::io::Result<FileListing> {
    let mut entries = tokio::fs::read_dir(root).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();

    Ok(FileListing {
        directory: root.display().to_string(),
        files,
    })
}

/// Bind and serve until interrupted
pub async fn run(port: u16, root: PathBuf) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, build_router(&root))
        .await
        .context("Sample-data server terminated")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const DEMO_ROWS: &str = r#"[
  {"time": "2024-06-01T10:00:00Z", "page": "Main_Page", "edits": 3},
  {"time": "2024-06-02T10:00:00Z", "page": "Apache_Druid", "edits": 7}
]"#;

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("two-partition-demo.json"), DEMO_ROWS).unwrap();
        std::fs::write(dir.path().join("rollup-demo.json"), "[]").unwrap();
        dir
    }

    fn get_request(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header(header::ORIGIN, "http://localhost:9088")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_serves_file_bytes_unmodified() {
        let dir = fixture_dir();
        let router = build_router(dir.path());

        let response = router
            .oneshot(get_request("/two-partition-demo.json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .map(|v| v.to_str().unwrap()),
            Some("*")
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], DEMO_ROWS.as_bytes());
        // Still a valid JSON array after the trip
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed.is_array());
    }

    #[tokio::test]
    async fn test_listing_at_root() {
        let dir = fixture_dir();
        let router = build_router(dir.path());

        let response = router.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let listing: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let files: Vec<&str> = listing["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f.as_str().unwrap())
            .collect();
        assert_eq!(files, vec!["rollup-demo.json", "two-partition-demo.json"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_404_with_cors() {
        let dir = fixture_dir();
        let router = build_router(dir.path());

        let response = router.oneshot(get_request("/nope.json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[tokio::test]
    async fn test_preflight_allows_get() {
        let dir = fixture_dir();
        let router = build_router(dir.path());

        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/two-partition-demo.json")
            .header(header::ORIGIN, "http://localhost:9088")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(preflight).await.unwrap();
        assert!(response.status().is_success());
        let allow_methods = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        assert!(allow_methods.contains("GET"));
    }
}
