//! # Git Smart HTTP Adapter
//!
//! Maps HTTP routes onto the [`gitwire_git`] wire-protocol engine:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/{owner}/{repo}/info/refs?service=<svc>` | Reference advertisement |
//! | GET | `/{owner}/{repo}/HEAD` | Plain-text HEAD symref |
//! | POST | `/{owner}/{repo}/git-upload-pack` | Fetch/clone negotiation |
//! | POST | `/{owner}/{repo}/git-receive-pack` | Push negotiation |
//! | GET | `/health`, `/health/live`, `/health/ready`, `/health/startup` | Process health |
//!
//! ## Authorization
//!
//! Every git route is gated by [`gitwire_auth::CredentialChecker`]: the
//! caller's `Authorization: Basic` header is decoded into a principal, then
//! checked against the repository's `"{owner}/{repo}"` key for `Read`
//! (upload-pack) or `Write` (receive-pack). A missing or rejected principal
//! gets a `401` with a `WWW-Authenticate: Basic realm="..."` challenge.
//!
//! ## Request bodies
//!
//! POST bodies are fully buffered before being handed to the protocol
//! engine — these are request/response services, not streams. A
//! `Content-Encoding: gzip` body is inflated first.

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use gitwire_auth::{decode_basic_auth, CredentialChecker, Permission};
use gitwire_git::{GitError, InMemoryAgent, Service, ServiceKind};
use gitwire_storage::{RepoStore, StorageError};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::health::{health_routes, HealthState};
use crate::observability::request_id_middleware;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository store backing the bundled in-memory repository agent.
    pub repos: Arc<RepoStore>,
    /// Credential checker gating every git route.
    pub auth: Arc<dyn CredentialChecker>,
    /// Realm string sent in `WWW-Authenticate` challenges.
    pub realm: String,
}

/// Errors the HTTP adapter can surface, mapped to status codes at the edge.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The named repository does not exist.
    #[error("repository not found: {0}")]
    RepoNotFound(String),
    /// No (or invalid) credentials were supplied.
    #[error("unauthenticated")]
    Unauthenticated,
    /// Credentials were valid but don't grant the required capability.
    #[error("unauthorized")]
    Unauthorized,
    /// A request parameter or body could not be understood.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The wire-protocol engine (or the agent backing it) failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::RepoNotFound(key) => ApiError::RepoNotFound(key),
            other => ApiError::Git(GitError::Storage(other)),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn realm_challenge(realm: &str) -> String {
        format!("Basic realm=\"{realm}\"")
    }
}

/// Carries the realm so `IntoResponse` can attach `WWW-Authenticate`;
/// handlers build this once the realm is known and return it via `?`.
pub struct ApiErrorWithRealm {
    error: ApiError,
    realm: String,
}

impl IntoResponse for ApiErrorWithRealm {
    fn into_response(self) -> Response {
        let status = match &self.error {
            ApiError::RepoNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Git(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.error.to_string();
        tracing::warn!(error = %message, status = %status.as_u16(), "request failed");

        // Internal errors get a short plain-text body; everything else (the
        // client-facing 4xx statuses) stays JSON.
        let mut response = if status == StatusCode::INTERNAL_SERVER_ERROR {
            (status, message).into_response()
        } else {
            (status, Json(ErrorBody { error: message })).into_response()
        };
        if matches!(self.error, ApiError::Unauthenticated | ApiError::Unauthorized) {
            if let Ok(value) = ApiError::realm_challenge(&self.realm).parse() {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

/// Decodes the caller's `Authorization` header and checks it grants
/// `required` on `repo_key`.
fn check_auth(
    state: &AppState,
    headers: &HeaderMap,
    repo_key: &str,
    required: Permission,
) -> Result<(), ApiErrorWithRealm> {
    let wrap = |error: ApiError| ApiErrorWithRealm {
        error,
        realm: state.realm.clone(),
    };

    let principal = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(decode_basic_auth)
        .and_then(|(login, password)| state.auth.authenticate(&login, &password));

    match principal {
        None => Err(wrap(ApiError::Unauthenticated)),
        Some(principal) => {
            if state.auth.authorize(&principal, repo_key, required) {
                Ok(())
            } else {
                Err(wrap(ApiError::Unauthorized))
            }
        }
    }
}

/// Decodes a fully-buffered request body, inflating it first if the client
/// marked it `Content-Encoding: gzip`.
fn decode_body(headers: &HeaderMap, body: Bytes) -> Result<Vec<u8>, ApiError> {
    let is_gzip = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);

    if !is_gzip {
        return Ok(body.to_vec());
    }

    let mut decoder = flate2::read::GzDecoder::new(&body[..]);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ApiError::BadRequest(format!("invalid gzip body: {e}")))?;
    Ok(out)
}

/// Creates the application router: git routes, health routes, and the
/// ambient request-id/tracing/body-limit layers.
pub fn create_router(state: AppState, health_state: HealthState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/{owner}/{repo}/info/refs",
            get(git_info_refs),
        )
        .route("/{owner}/{repo}/HEAD", get(git_head))
        .route(
            "/{owner}/{repo}/git-upload-pack",
            axum::routing::post(git_upload_pack),
        )
        .route(
            "/{owner}/{repo}/git-receive-pack",
            axum::routing::post(git_receive_pack),
        )
        .merge(health_routes(health_state))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /{owner}/{repo}/info/refs?service=<svc>` — reference advertisement.
async fn git_info_refs(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiErrorWithRealm> {
    let wrap = |error: ApiError| ApiErrorWithRealm {
        error,
        realm: state.realm.clone(),
    };

    let service_name = params.get("service").cloned().unwrap_or_default();
    let kind = ServiceKind::from_name(&service_name)
        .ok_or_else(|| wrap(ApiError::BadRequest(format!("unknown service: {service_name}"))))?;

    let repo_key = format!("{owner}/{name}");
    let repo = state.repos.get(&owner, &name).map_err(|e| wrap(e.into()))?;

    let required = match kind {
        ServiceKind::UploadPack => Permission::Read,
        ServiceKind::ReceivePack => Permission::Write,
    };
    check_auth(&state, &headers, &repo_key, required)?;

    let agent = InMemoryAgent::new(repo);
    let service = Service::new(kind, &agent);

    let mut body = Vec::new();
    {
        use gitwire_git::PktLineWriter;
        let mut writer = PktLineWriter::new(&mut body);
        writer
            .write_line(&format!("# service={}", kind.name()))
            .map_err(|e| wrap(ApiError::Git(e)))?;
        writer.flush_pkt().map_err(|e| wrap(ApiError::Git(e)))?;
        writer.flush().map_err(|e| wrap(ApiError::Git(e)))?;
    }
    body.extend_from_slice(&service.advertise().map_err(|e| wrap(ApiError::Git(e)))?);

    let content_type = format!("application/x-{}-advertisement", kind.name());
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(body))
        .expect("valid response"))
}

/// `GET /{owner}/{repo}/HEAD` — HEAD as a plain-text symref.
async fn git_head(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiErrorWithRealm> {
    let wrap = |error: ApiError| ApiErrorWithRealm {
        error,
        realm: state.realm.clone(),
    };

    let repo_key = format!("{owner}/{name}");
    let repo = state.repos.get(&owner, &name).map_err(|e| wrap(e.into()))?;
    check_auth(&state, &headers, &repo_key, Permission::Read)?;

    let branch = repo.current_branch().unwrap_or_else(|| "main".to_string());
    let body = format!("ref: refs/heads/{branch}\n");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(body))
        .expect("valid response"))
}

/// `POST /{owner}/{repo}/git-upload-pack` — fetch/clone negotiation.
async fn git_upload_pack(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiErrorWithRealm> {
    let wrap = |error: ApiError| ApiErrorWithRealm {
        error,
        realm: state.realm.clone(),
    };

    let repo_key = format!("{owner}/{name}");
    let repo = state.repos.get(&owner, &name).map_err(|e| wrap(e.into()))?;
    check_auth(&state, &headers, &repo_key, Permission::Read)?;

    let decoded = decode_body(&headers, body).map_err(wrap)?;
    let agent = InMemoryAgent::new(repo);
    let service = Service::new(ServiceKind::UploadPack, &agent);
    let output = service
        .step(&mut Cursor::new(decoded))
        .map_err(|e| wrap(ApiError::Git(e)))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-git-upload-pack-result")
        .body(Body::from(output))
        .expect("valid response"))
}

/// `POST /{owner}/{repo}/git-receive-pack` — push negotiation.
async fn git_receive_pack(
    State(state): State<AppState>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiErrorWithRealm> {
    let wrap = |error: ApiError| ApiErrorWithRealm {
        error,
        realm: state.realm.clone(),
    };

    let repo_key = format!("{owner}/{name}");
    let repo = state.repos.get(&owner, &name).map_err(|e| wrap(e.into()))?;
    check_auth(&state, &headers, &repo_key, Permission::Write)?;

    let decoded = decode_body(&headers, body).map_err(wrap)?;
    let agent = InMemoryAgent::new(repo);
    let service = Service::new(ServiceKind::ReceivePack, &agent);
    let output = service
        .step(&mut Cursor::new(decoded))
        .map_err(|e| wrap(ApiError::Git(e)))?;

    tracing::info!(owner = %owner, name = %name, "push completed");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "application/x-git-receive-pack-result",
        )
        .body(Body::from(output))
        .expect("valid response"))
}
