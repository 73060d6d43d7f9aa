//! Purpose: HTTP client for the screenbrew v0 screen protocol.
//! Exports: `RemoteStore`.
//! Role: Transport client mirroring the local directory store over the wire.
//! Invariants: Request/response envelopes align with the `serve` module.
//! Invariants: Blocking transport work never runs on the async runtime threads.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::store::{ApiResult, DocumentStore};
use crate::core::decode::RawDocument;
use crate::core::error::{Error, ErrorKind};

/// Client for one screenbrew server. Cloning shares the underlying agent
/// and its connection pool.
#[derive(Clone)]
pub struct RemoteStore {
    base_url: Url,
    token: Option<String>,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ScreenEnvelope {
    screen: RemoteScreen,
}

#[derive(Deserialize)]
struct RemoteScreen {
    #[allow(dead_code)]
    key: String,
    document: Value,
}

#[derive(Deserialize)]
struct ScreensEnvelope {
    screens: Vec<ScreenEntry>,
}

#[derive(Deserialize)]
struct ScreenEntry {
    key: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
    key: Option<String>,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Ok(Self {
            base_url: parse_base_url(&base_url.into())?,
            token: None,
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn get_screen(&self, key: &str) -> ApiResult<RawDocument> {
        ensure_screen_key(key)?;
        let url = self.endpoint(Some(key))?;
        let envelope: ScreenEnvelope = self
            .request("GET", &url, None)
            .map_err(|err| err.with_key(key))?;
        match envelope.screen.document {
            Value::Object(map) => Ok(map),
            _ => Err(Error::new(ErrorKind::Corrupt)
                .with_message("remote screen document is not a json object")
                .with_key(key)),
        }
    }

    pub fn list_screens(&self) -> ApiResult<Vec<String>> {
        let url = self.endpoint(None)?;
        let envelope: ScreensEnvelope = self.request("GET", &url, None)?;
        Ok(envelope
            .screens
            .into_iter()
            .map(|screen| screen.key)
            .collect())
    }

    pub fn publish_screen(&self, key: &str, document: &RawDocument) -> ApiResult<()> {
        ensure_screen_key(key)?;
        let url = self.endpoint(Some(key))?;
        let body = Value::Object(document.clone());
        let _envelope: ScreenEnvelope = self
            .request("POST", &url, Some(&body))
            .map_err(|err| err.with_key(key))?;
        Ok(())
    }

    pub fn delete_screen(&self, key: &str) -> ApiResult<()> {
        ensure_screen_key(key)?;
        let url = self.endpoint(Some(key))?;
        let _value: Value = self
            .request("DELETE", &url, None)
            .map_err(|err| err.with_key(key))?;
        Ok(())
    }

    /// `/v0/screens` with an optional trailing key segment.
    fn endpoint(&self, key: Option<&str>) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::new(ErrorKind::Usage).with_message("remote base url cannot hold a path")
            })?;
            segments.clear();
            segments.extend(["v0", "screens"]);
            if let Some(key) = key {
                segments.push(key);
            }
        }
        Ok(url)
    }

    fn request<R: DeserializeOwned>(
        &self,
        method: &str,
        url: &Url,
        body: Option<&Value>,
    ) -> ApiResult<R> {
        let mut request = self
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        let outcome = match body {
            Some(body) => request
                .set("Content-Type", "application/json")
                .send_string(&body.to_string()),
            None => request.call(),
        };
        let response = outcome.map_err(|err| match err {
            ureq::Error::Status(status, response) => remote_error(status, response),
            ureq::Error::Transport(transport) => Error::new(ErrorKind::Io)
                .with_message("remote request failed")
                .with_source(transport),
        })?;
        let text = response.into_string().map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("could not read response body")
                .with_source(err)
        })?;
        serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("response body is not the expected json")
                .with_source(err)
        })
    }
}

impl DocumentStore for RemoteStore {
    async fn fetch_document(&self, key: &str) -> ApiResult<RawDocument> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.get_screen(&key))
            .await
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("remote fetch task failed")
                    .with_source(err)
            })?
    }

    async fn list_keys(&self) -> ApiResult<Vec<String>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.list_screens())
            .await
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("remote list task failed")
                    .with_source(err)
            })?
    }
}

fn parse_base_url(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("remote base url does not parse")
            .with_source(err)
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(
            Error::new(ErrorKind::Usage).with_message("remote base url must be http or https")
        );
    }
    if !matches!(url.path(), "" | "/") {
        return Err(
            Error::new(ErrorKind::Usage).with_message("remote base url must not carry a path")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn ensure_screen_key(key: &str) -> ApiResult<()> {
    if key.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("screen key must not be empty"));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("screen key must not contain path separators"));
    }
    Ok(())
}

fn remote_error(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            let remote = envelope.error;
            let mut err = Error::new(kind_from_name(&remote.kind));
            if let Some(message) = remote.message {
                err = err.with_message(message);
            }
            if let Some(hint) = remote.hint {
                err = err.with_hint(hint);
            }
            if let Some(key) = remote.key {
                err = err.with_key(key);
            }
            err
        }
        Err(_) => Error::new(kind_for_status(status))
            .with_message(format!("remote returned status {status}")),
    }
}

fn kind_from_name(name: &str) -> ErrorKind {
    match name {
        "Usage" => ErrorKind::Usage,
        "NotFound" => ErrorKind::NotFound,
        "Permission" => ErrorKind::Permission,
        "Corrupt" => ErrorKind::Corrupt,
        "Io" => ErrorKind::Io,
        _ => ErrorKind::Internal,
    }
}

fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        status if status >= 500 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}
