//! Purpose: HTTP/JSON screen-document server for screenbrew.
//! Exports: `ServeConfig`, `AccessMode`, `serve`.
//! Role: Axum-based loopback server implementing the screen v0 protocol.
//! Invariants: JSON envelopes match `api::remote`; error kinds remain stable.
//! Invariants: Loopback-only unless explicitly allowed.

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Path as AxumPath, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use screenbrew::api::{DirStore, Error, ErrorKind, document_from_str};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub screens_dir: PathBuf,
    pub token: Option<String>,
    pub access_mode: AccessMode,
    pub allow_non_loopback: bool,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: u64,
}

#[derive(Clone)]
struct AppState {
    store: DirStore,
    token: Option<String>,
    access_mode: AccessMode,
}

#[derive(Clone, Copy, Debug)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    fn allows_read(self) -> bool {
        !matches!(self, AccessMode::WriteOnly)
    }

    fn allows_write(self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();

    let body_limit = usize::try_from(config.max_body_bytes)
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let state = Arc::new(AppState {
        store: DirStore::new().with_screens_dir(config.screens_dir),
        token: config.token,
        access_mode: config.access_mode,
    });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v0/screens", get(list_screens))
        .route(
            "/v0/screens/:key",
            get(get_screen).post(publish_screen).delete(delete_screen),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("could not bind {}", config.bind))
                .with_source(err)
        })?;
    tracing::info!(bind = %config.bind, "screen server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("server terminated abnormally")
                .with_source(err)
        })
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be positive")
            .with_hint("Try 1048576 (1 MiB)."));
    }
    if config.bind.ip().is_loopback() {
        return Ok(());
    }
    if !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("refusing a non-loopback bind without explicit opt-in")
            .with_hint("Pass --allow-non-loopback, or bind 127.0.0.1."));
    }
    if config.access_mode.allows_write() && config.token.is_none() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("a non-loopback server accepting writes needs --token")
            .with_hint("Set --token, or restrict with --access read."));
    }
    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, Error> {
    if origins.is_empty() {
        return Ok(CorsLayer::new());
    }
    let values = origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("--cors-origin is not a valid header value")
                .with_source(err)
        })?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods([Method::GET])
        .allow_headers([header::AUTHORIZATION, header::ACCEPT]))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Token check plus access-mode check for one request.
fn guard(state: &AppState, headers: &HeaderMap, write: bool) -> Result<(), Error> {
    check_token(state, headers)?;
    let allowed = if write {
        state.access_mode.allows_write()
    } else {
        state.access_mode.allows_read()
    };
    if allowed {
        return Ok(());
    }
    let verb = if write { "writes" } else { "reads" };
    Err(Error::new(ErrorKind::Permission)
        .with_message(format!("forbidden: this server does not accept {verb}"))
        .with_hint("Start the server with a different --access mode."))
}

fn check_token(state: &AppState, headers: &HeaderMap) -> Result<(), Error> {
    let Some(expected) = state.token.as_deref() else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == expected => Ok(()),
        Some(_) => {
            Err(Error::new(ErrorKind::Permission).with_message("bearer token does not match"))
        }
        None => {
            Err(Error::new(ErrorKind::Permission).with_message("request carries no bearer token"))
        }
    }
}

async fn healthz() -> Response {
    json_response(json!({ "ok": true }))
}

async fn list_screens(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(err) = guard(&state, &headers, false) {
        return error_response(err);
    }
    match state.store.screen_keys() {
        Ok(keys) => {
            let screens: Vec<Value> = keys.iter().map(|key| json!({ "key": key })).collect();
            json_response(json!({ "screens": screens }))
        }
        Err(err) => error_response(err),
    }
}

async fn get_screen(
    State(state): State<Arc<AppState>>,
    AxumPath(key): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(err) = guard(&state, &headers, false) {
        return error_response(err);
    }
    match state.store.read_document(&key) {
        Ok(document) => json_response(json!({
            "screen": { "key": key, "document": Value::Object(document) },
        })),
        Err(err) => error_response(err),
    }
}

async fn publish_screen(
    State(state): State<Arc<AppState>>,
    AxumPath(key): AxumPath<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(err) = guard(&state, &headers, true) {
        return error_response(err);
    }
    let document = match document_from_str(&body) {
        Ok(document) => document,
        Err(err) => {
            return error_response(
                Error::new(ErrorKind::Usage)
                    .with_message("request body must be a json object document")
                    .with_key(key)
                    .with_source(err),
            );
        }
    };
    match state.store.write_document(&key, &document) {
        Ok(()) => json_response(json!({ "screen": { "key": key } })),
        Err(err) => error_response(err),
    }
}

async fn delete_screen(
    State(state): State<Arc<AppState>>,
    AxumPath(key): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(err) = guard(&state, &headers, true) {
        return error_response(err);
    }
    match state.store.remove_document(&key) {
        Ok(()) => json_response(json!({ "deleted": { "key": key } })),
        Err(err) => error_response(err),
    }
}

fn json_response(payload: Value) -> Response {
    with_version(Json(payload).into_response())
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Permission if is_access_forbidden(&err) => StatusCode::FORBIDDEN,
        ErrorKind::Permission => StatusCode::UNAUTHORIZED,
        ErrorKind::Corrupt | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let mut body = serde_json::Map::new();
    body.insert("kind".to_string(), json!(err.kind().name()));
    body.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("error")),
    );
    if let Some(hint) = err.hint() {
        body.insert("hint".to_string(), json!(hint));
    }
    if let Some(key) = err.key() {
        body.insert("key".to_string(), json!(key));
    }
    with_version((status, Json(json!({ "error": Value::Object(body) }))).into_response())
}

fn is_access_forbidden(err: &Error) -> bool {
    err.message()
        .is_some_and(|message| message.starts_with("forbidden:"))
}

fn with_version(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert("screenbrew-version", HeaderValue::from_static("0"));
    response
}

#[cfg(test)]
mod tests {
    use super::{AccessMode, ErrorKind, ServeConfig, serve, validate_config};

    fn config(bind: &str) -> ServeConfig {
        ServeConfig {
            bind: bind.parse().expect("bind"),
            screens_dir: std::env::temp_dir(),
            token: None,
            access_mode: AccessMode::ReadWrite,
            allow_non_loopback: false,
            cors_origins: Vec::new(),
            max_body_bytes: 1024 * 1024,
        }
    }

    #[tokio::test]
    async fn serve_rejects_non_loopback_bind() {
        let err = serve(config("0.0.0.0:0")).await.expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn non_loopback_write_requires_token() {
        let mut cfg = config("0.0.0.0:0");
        cfg.allow_non_loopback = true;
        let err = validate_config(&cfg).expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);

        cfg.token = Some("secret".to_string());
        validate_config(&cfg).expect("valid with token");
    }

    #[test]
    fn zero_body_limit_is_rejected() {
        let mut cfg = config("127.0.0.1:0");
        cfg.max_body_bytes = 0;
        let err = validate_config(&cfg).expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn access_modes_partition_read_and_write() {
        assert!(AccessMode::ReadOnly.allows_read());
        assert!(!AccessMode::ReadOnly.allows_write());
        assert!(!AccessMode::WriteOnly.allows_read());
        assert!(AccessMode::WriteOnly.allows_write());
        assert!(AccessMode::ReadWrite.allows_read());
        assert!(AccessMode::ReadWrite.allows_write());
    }
}
