use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ApiError;
use crate::session::Session;
use crate::{newmanga, remanga};

/// Applied to every request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by all backend clients.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub remanga: remanga::Endpoints,
    pub newmanga: newmanga::Endpoints,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            remanga: remanga::Endpoints::default(),
            newmanga: newmanga::Endpoints::default(),
        }
    }
}

pub(crate) fn build_http(options: &ClientOptions) -> Client {
    let mut builder = Client::builder().timeout(options.timeout);
    if let Some(ref ua) = options.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to configure HTTP client, using defaults");
        Client::new()
    })
}

/// Map a response status onto [`ApiError`].
///
/// A 401 clears the session before `Unauthorized` is returned so that later
/// requests go out unauthenticated. `sent` is the token the request carried;
/// a rejection of a token that has since been replaced leaves the session
/// alone.
pub(crate) async fn check_response(
    session: &Session,
    sent: Option<&str>,
    resp: Response,
) -> Result<Response, ApiError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!(key = session.storage_key(), url = %resp.url(), "unauthorized response");
        session.invalidate(sent);
        return Err(ApiError::Unauthorized);
    }
    if status.is_success() {
        return Ok(resp);
    }

    let status = status.as_u16();
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(status, key = session.storage_key(), "API error");
    Err(ApiError::Api {
        status,
        message: body,
    })
}

/// Read the body and decode it as JSON. Transport failures stay `Http`,
/// schema mismatches become `Parse`.
pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Resolve an image reference against a base URL. Absolute references are
/// returned unchanged.
pub(crate) fn join_url(base: &str, reference: &str) -> Option<String> {
    if reference.is_empty() {
        return None;
    }
    let base = Url::parse(base).ok()?;
    base.join(reference).ok().map(String::from)
}
