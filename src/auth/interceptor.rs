// Session interceptor
// Attaches the bearer token and recovers from expired sessions with one login + resend

use reqwest::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Request, StatusCode, Url};
use std::sync::Arc;

use super::credentials::Credentials;
use super::types::{LoginRequest, LoginResponse};
use crate::connection::user_agent;
use crate::error::{ClientError, Result};
use crate::response::{ApiResponse, RequestRecord, ResponseRecord};

/// Login endpoint, relative to the server root
pub const SESSIONS_PATH: &str = "/api/v1/sessions";

/// Vendor status for "session expired"
const SESSION_EXPIRED: u16 = 440;

/// Whether a status means the session is missing or expired
pub fn requires_login(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status.as_u16() == SESSION_EXPIRED
}

/// Wraps a send on the shared client with bearer-token handling.
///
/// At most one login is performed per failing request. Concurrent requests that all see
/// 401/440 each log in on their own; the last token written wins.
#[derive(Debug, Clone)]
pub struct SessionInterceptor {
    credentials: Arc<Credentials>,
}

impl SessionInterceptor {
    pub fn new(credentials: Arc<Credentials>) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &Arc<Credentials> {
        &self.credentials
    }

    /// Add `Authorization: Bearer <token>` if a session token is known
    pub async fn attach(&self, request: &mut Request) -> Result<()> {
        if let Some(token) = self.credentials.session_token().await {
            set_bearer(request, &token)?;
        }
        Ok(())
    }

    /// Send a request, logging in and resending once if the server rejects the session
    pub async fn send(&self, client: &Client, mut request: Request) -> Result<ApiResponse> {
        self.attach(&mut request).await?;

        // Keep a copy so the request can be reissued after login
        let retry = request.try_clone().ok_or_else(|| {
            ClientError::InvalidRequest("Request body is not cloneable".to_string())
        })?;
        let sent = RequestRecord::of(&request);

        tracing::debug!(method = %sent.method, url = %sent.url, "Sending HTTP request");
        let response = client.execute(request).await?;

        if !requires_login(response.status()) {
            return Ok(ApiResponse::new(response, sent));
        }

        tracing::debug!(
            status = response.status().as_u16(),
            url = %sent.url,
            "Not authenticated"
        );
        let failed = ResponseRecord::drain(response).await?;

        let token = self.login(client, retry.url()).await?;

        let mut retry = retry;
        set_bearer(&mut retry, &token)?;
        let resent = RequestRecord::of(&retry);
        let response = client.execute(retry).await?;

        if requires_login(response.status()) {
            let rejected = ResponseRecord::drain(response).await?;
            tracing::error!(
                status = rejected.status.as_u16(),
                url = %rejected.url,
                "Request rejected again after login"
            );
            return Err(ClientError::authentication_failed(
                "request rejected after a fresh login",
                rejected,
            ));
        }

        tracing::debug!("Authenticated successfully");
        Ok(ApiResponse::new(response, resent).with_history(vec![failed]))
    }

    /// Log in and store the new session token.
    ///
    /// The login goes straight to the client, never through [`send`](Self::send), and targets
    /// the same scheme, host and port as `origin`.
    pub async fn login(&self, client: &Client, origin: &Url) -> Result<String> {
        let (username, password) = self
            .credentials
            .login_pair()
            .ok_or(ClientError::MissingCredentials)?;

        tracing::info!(username = %username, "Attempting to authenticate");

        let mut url = origin.clone();
        url.set_path(SESSIONS_PATH);
        url.set_query(None);
        url.set_fragment(None);

        let body = LoginRequest {
            username,
            password,
            provider: self.credentials.provider(),
        };

        let response = client
            .post(url)
            .header(USER_AGENT, user_agent())
            .json(&body)
            .send()
            .await?;
        let record = ResponseRecord::drain(response).await?;

        if record.status != StatusCode::OK {
            tracing::error!(
                status = record.status.as_u16(),
                body = %record.text(),
                "Login failed"
            );
            return Err(ClientError::authentication_failed(
                format!("login returned {}", record.status),
                record,
            ));
        }

        let token = match serde_json::from_slice::<LoginResponse>(&record.body) {
            Ok(login) if !login.session_id.is_empty() => login.session_id,
            Ok(_) => {
                return Err(ClientError::authentication_failed(
                    "empty sessionId in login response",
                    record,
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, "Unusable login response");
                return Err(ClientError::authentication_failed(
                    "no sessionId in login response",
                    record,
                ));
            }
        };

        let prefix: String = token.chars().take(6).collect();
        tracing::debug!(session = %prefix, "Obtained new session");
        self.credentials.set_session_token(token.clone()).await;
        Ok(token)
    }
}

/// Replace any Authorization header with a bearer token
fn set_bearer(request: &mut Request, token: &str) -> Result<()> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| ClientError::InvalidRequest(format!("Invalid session token: {}", e)))?;
    value.set_sensitive(true);

    let headers = request.headers_mut();
    headers.remove(AUTHORIZATION);
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::DEFAULT_PROVIDER;

    fn request(client: &Client) -> Request {
        client
            .get("http://127.0.0.1:9543/api/v1/events")
            .build()
            .unwrap()
    }

    #[test]
    fn test_requires_login() {
        assert!(requires_login(StatusCode::UNAUTHORIZED));
        assert!(requires_login(StatusCode::from_u16(440).unwrap()));
        assert!(!requires_login(StatusCode::OK));
        assert!(!requires_login(StatusCode::FORBIDDEN));
        assert!(!requires_login(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_attach_without_token_leaves_request_alone() {
        let client = Client::new();
        let interceptor =
            SessionInterceptor::new(Arc::new(Credentials::new("admin", "secret", DEFAULT_PROVIDER)));

        let mut req = request(&client);
        interceptor.attach(&mut req).await.unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_attach_with_token() {
        let client = Client::new();
        let creds = Credentials::new("admin", "secret", DEFAULT_PROVIDER).with_session_token("abc123");
        let interceptor = SessionInterceptor::new(Arc::new(creds));

        let mut req = request(&client);
        interceptor.attach(&mut req).await.unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer abc123");
        assert!(req.headers()[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_set_bearer_replaces_stale_header() {
        let client = Client::new();
        let mut req = client
            .get("http://127.0.0.1:9543/api/v1/events")
            .header(AUTHORIZATION, "Bearer stale")
            .build()
            .unwrap();

        set_bearer(&mut req, "fresh").unwrap();
        let values: Vec<_> = req.headers().get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values, vec!["Bearer fresh"]);
    }

    #[test]
    fn test_set_bearer_rejects_invalid_token() {
        let client = Client::new();
        let mut req = request(&client);
        let err = set_bearer(&mut req, "bad\ntoken").unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_login_without_password_fails_before_sending() {
        let client = Client::new();
        let interceptor = SessionInterceptor::new(Arc::new(Credentials::from_session_token(
            "old",
            DEFAULT_PROVIDER,
        )));
        // Port 9 (discard) is never contacted: the error is raised first
        let origin = Url::parse("http://127.0.0.1:9/api/v1/events").unwrap();

        let err = interceptor.login(&client, &origin).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingCredentials));
        assert_eq!(
            interceptor.credentials().session_token().await.as_deref(),
            Some("old")
        );
    }
}
