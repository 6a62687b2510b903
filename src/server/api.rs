use axum::{
    body::{Bytes, StreamBody},
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{error, info};
use crate::file::{LocalFileStore, StorageError, StorageInfo};

#[derive(Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    name: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct AppState {
    store: Arc<LocalFileStore>,
}

enum ApiError {
    Storage(StorageError),
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Storage(e @ StorageError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Storage(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Runs a store call on the blocking pool; the store only does synchronous I/O.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&LocalFileStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| {
            error!("Storage task failed: {}", e);
            ApiError::Internal("storage task failed".to_string())
        })
}

async fn list_files(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(blocking(&state, |store| store.list()).await?))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let name = blocking(&state, move |store| {
        store.store(&body, params.filename.as_deref())
    })
    .await??;

    Ok((StatusCode::CREATED, Json(UploadResponse { name })))
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let lookup = name.clone();
    let opened = blocking(&state, move |store| {
        store
            .load(&lookup)
            .map(|file| file.open().map(|handle| (file, handle)))
    })
    .await?;

    let (file, handle) = match opened {
        None => return Ok(StatusCode::NOT_FOUND.into_response()),
        Some(Ok(opened)) => opened,
        // deleted between lookup and open
        Some(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(StatusCode::NOT_FOUND.into_response())
        }
        Some(Err(e)) => {
            error!("Failed to open {}: {}", name, e);
            return Err(ApiError::Internal(format!("failed to open {}", name)));
        }
    };

    let mime = mime_guess::from_path(file.name()).first_or_octet_stream();
    let body = StreamBody::new(ReaderStream::new(tokio::fs::File::from_std(handle)));
    Ok(([(header::CONTENT_TYPE, mime.to_string())], body).into_response())
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |store| store.delete(&name)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn storage_info(State(state): State<Arc<AppState>>) -> Result<Json<StorageInfo>, ApiError> {
    Ok(Json(blocking(&state, |store| store.storage_info()).await?))
}

pub fn router(store: Arc<LocalFileStore>) -> Router {
    let app_state = Arc::new(AppState { store });

    Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route("/files/:name", get(download_file).delete(delete_file))
        .route("/info", get(storage_info))
        .with_state(app_state)
}

pub async fn run_server(port: u16, store: Arc<LocalFileStore>) -> anyhow::Result<()> {
    let app = router(store);

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    info!("Upload store listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn test_app() -> (tempfile::TempDir, Arc<LocalFileStore>, Router) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            LocalFileStore::init(&StoreConfig::new(dir.path().join("images"))).unwrap(),
        );
        let app = router(store.clone());
        (dir, store, app)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        hyper::body::to_bytes(response.into_body()).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_upload_download_delete() {
        let (_dir, store, app) = test_app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/files?filename=photo.jpg")
                    .body(Body::from(vec![1u8, 2, 3]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let uploaded: serde_json::Value =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        let name = uploaded["name"].as_str().unwrap().to_string();
        assert!(name.ends_with(".jpg"));
        assert_eq!(store.list(), vec![name.clone()]);

        let response = app
            .clone()
            .oneshot(Request::get(format!("/files/{}", name)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(body_bytes(response).await, vec![1, 2, 3]);

        let response = app
            .clone()
            .oneshot(Request::get("/files").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed: Vec<String> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(listed, vec![name.clone()]);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/files/{}", name))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::get(format!("/files/{}", name)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_empty_body_is_bad_request() {
        let (_dir, store, app) = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/files")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.list().is_empty());
    }

    #[tokio::test]
    async fn test_info_and_missing_delete() {
        let (_dir, store, app) = test_app();
        store.store(b"x", None).unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/files/missing.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::get("/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let info: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(info["exists"], true);
        assert_eq!(info["writable"], true);
        assert_eq!(info["file_count"], 1);
    }
}
