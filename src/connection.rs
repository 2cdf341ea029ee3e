use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Credentials, SessionInterceptor};
use crate::error::{ClientError, Result};
use crate::response::{ApiResponse, RequestRecord};

/// All API paths live under this prefix
pub const API_V1: &str = "/api/v1";

/// Default Log Insight API port
pub const DEFAULT_PORT: u16 = 9543;

/// Product-identifying User-Agent sent on every request
pub fn user_agent() -> &'static str {
    concat!("loginsight-client/", env!("CARGO_PKG_VERSION"))
}

/// Where and how to connect. Immutable once a [`Connection`] is built from it.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    hostname: String,
    port: u16,
    use_tls: bool,
    verify_tls: bool,
    connect_timeout: Duration,
    request_timeout: Duration,
    max_idle_connections: usize,
}

impl ConnectionConfig {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            use_tls: true,
            verify_tls: true,
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(300),
            max_idle_connections: 20,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_idle_connections(mut self, max: usize) -> Self {
        self.max_idle_connections = max;
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    /// `{scheme}://{hostname}:{port}/api/v1`
    pub fn api_root(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme(),
            self.hostname,
            self.port,
            API_V1
        )
    }

    /// Build a pooled client honoring the timeouts and TLS verification policy
    fn build_client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent())
            .pool_max_idle_per_host(self.max_idle_connections)
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .danger_accept_invalid_certs(!self.verify_tls)
            .use_rustls_tls()
            .build()
            .map_err(ClientError::Transport)
    }
}

/// Request body
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Raw(Bytes),
}

/// Per-call options for [`Connection::request`]
#[derive(Debug, Clone)]
pub struct RequestOptions {
    body: Option<RequestBody>,
    query: Vec<(String, String)>,
    send_auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            body: None,
            query: Vec::new(),
            send_auth: true,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    pub fn raw(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send without credentials, and without login-and-retry on 401/440
    pub fn without_auth(mut self) -> Self {
        self.send_auth = false;
        self
    }
}

/// Low-level HTTP transport to a Log Insight server's API.
///
/// Requests that need authentication carry the shared session token. When the server
/// answers 401/440, a session is obtained and the request is retried once.
pub struct Connection {
    /// Shared HTTP client with connection pooling
    client: Client,

    config: ConnectionConfig,

    /// Computed once from `config`
    api_root: String,

    /// `None` means unauthenticated access only
    interceptor: Option<SessionInterceptor>,
}

impl Connection {
    /// Create a connection with a fresh HTTP client
    pub fn new(config: ConnectionConfig, credentials: Option<Arc<Credentials>>) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self::with_session(config, credentials, client))
    }

    /// Create a connection reusing an existing HTTP client.
    /// TLS verification and timeouts are whatever `client` was built with.
    pub fn with_session(
        config: ConnectionConfig,
        credentials: Option<Arc<Credentials>>,
        client: Client,
    ) -> Self {
        let api_root = config.api_root();
        let connection = Self {
            client,
            config,
            api_root,
            interceptor: credentials.map(SessionInterceptor::new),
        };
        tracing::debug!("Connected to {:?}", connection);
        connection
    }

    /// A new connection sharing this one's HTTP client and credentials
    pub fn copy(&self) -> Self {
        Self::with_session(
            self.config.clone(),
            self.credentials().cloned(),
            self.client.clone(),
        )
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn credentials(&self) -> Option<&Arc<Credentials>> {
        self.interceptor.as_ref().map(|i| i.credentials())
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::GET, path, options).await
    }

    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::POST, path, options).await
    }

    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::PUT, path, options).await
    }

    pub async fn patch(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::PATCH, path, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::DELETE, path, options).await
    }

    /// Issue `method` against `api_root + path`.
    ///
    /// Non-2xx statuses other than a recovered 401/440 come back as ordinary responses.
    /// Transport errors propagate untouched.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let url = format!("{}{}", self.api_root, path);

        let mut builder = self
            .client
            .request(method, &url)
            .header(USER_AGENT, user_agent());
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        builder = match options.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Raw(bytes)) => builder
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
            None => builder,
        };

        let request = builder
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("{}: {}", url, e)))?;

        let response = match (&self.interceptor, options.send_auth) {
            (Some(interceptor), true) => interceptor.send(&self.client, request).await?,
            _ => {
                let sent = RequestRecord::of(&request);
                tracing::debug!(method = %sent.method, url = %sent.url, "Sending HTTP request");
                ApiResponse::new(self.client.execute(request).await?, sent)
            }
        };

        if let Some(warning) = response.warning() {
            tracing::warn!(
                status = response.status().as_u16(),
                url = %response.url(),
                "Server warning: {}",
                warning
            );
        }

        Ok(response)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("hostname", &self.config.hostname)
            .field("port", &self.config.port)
            .field("tls", &self.config.use_tls)
            .field("verify", &self.config.verify_tls)
            .field("credentials", &self.credentials())
            .finish()
    }
}
