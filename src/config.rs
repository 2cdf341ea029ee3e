use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Method;
use std::time::Duration;

use crate::auth::Credentials;
use crate::connection::{ConnectionConfig, RequestOptions, DEFAULT_PORT};

/// Log Insight API client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// API path below /api/v1, e.g. /events
    pub path: String,

    /// Log Insight server hostname
    #[arg(short = 'H', long, env = "LOGINSIGHT_HOST")]
    pub host: String,

    /// Log Insight API port
    #[arg(short, long, env = "LOGINSIGHT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Use plain HTTP instead of HTTPS
    #[arg(long, env = "LOGINSIGHT_NO_TLS")]
    pub no_tls: bool,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long, env = "LOGINSIGHT_INSECURE")]
    pub insecure: bool,

    /// Username for session login
    #[arg(short, long, env = "LOGINSIGHT_USERNAME")]
    pub username: Option<String>,

    /// Password for session login
    #[arg(long, env = "LOGINSIGHT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Identity provider (Local, ActiveDirectory, ...)
    #[arg(long, env = "LOGINSIGHT_PROVIDER", default_value = "Local")]
    pub provider: String,

    /// Existing session id to reuse
    #[arg(long, env = "LOGINSIGHT_SESSION_ID", hide_env_values = true)]
    pub session_id: Option<String>,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query")]
    pub query: Vec<String>,

    /// Send the request without credentials
    #[arg(long)]
    pub no_auth: bool,

    /// Connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "300")]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (pretty, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub verify_tls: bool,

    // Authentication
    pub username: Option<String>,
    pub password: Option<String>,
    pub provider: String,
    pub session_id: Option<String>,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
    pub log_format: LogFormat,

    // Request
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
    pub send_auth: bool,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let body: Option<serde_json::Value> = args
            .data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("--data must be valid JSON")?;

        let query = args
            .query
            .iter()
            .map(|item| parse_query_item(item))
            .collect::<Result<Vec<_>>>()?;

        let config = Config {
            host: args.host,
            port: args.port,
            use_tls: !args.no_tls,
            verify_tls: !args.insecure,

            username: args.username,
            password: args.password,
            provider: args.provider,
            session_id: args.session_id.filter(|s| !s.is_empty()),

            http_max_connections: std::env::var("HTTP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.timeout,

            log_level: args.log_level,
            log_format: parse_log_format(&args.log_format),

            method: parse_method(&args.method)?,
            path: normalize_path(&args.path),
            body,
            query,
            send_auth: !args.no_auth,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("LOGINSIGHT_HOST is required (use -H or set LOGINSIGHT_HOST env var)");
        }

        match (&self.username, &self.password) {
            (Some(_), None) => {
                anyhow::bail!("A password is required with a username (set LOGINSIGHT_PASSWORD)")
            }
            (None, Some(_)) => {
                anyhow::bail!("A username is required with a password (set LOGINSIGHT_USERNAME)")
            }
            _ => {}
        }

        Ok(())
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.host.clone())
            .port(self.port)
            .use_tls(self.use_tls)
            .verify_tls(self.verify_tls)
            .connect_timeout(Duration::from_secs(self.http_connect_timeout))
            .request_timeout(Duration::from_secs(self.http_request_timeout))
            .max_idle_connections(self.http_max_connections)
    }

    /// Credentials if any authentication is configured
    pub fn credentials(&self) -> Option<Credentials> {
        let creds = match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Credentials::new(username.clone(), password.clone(), self.provider.clone())
            }
            _ => Credentials::from_session_token(self.session_id.clone()?, self.provider.clone()),
        };

        Some(match &self.session_id {
            Some(token) => creds.with_session_token(token.clone()),
            None => creds,
        })
    }

    pub fn request_options(&self) -> RequestOptions {
        let mut options = RequestOptions::new();
        if let Some(body) = &self.body {
            options = options.json(body.clone());
        }
        for (key, value) in &self.query {
            options = options.query(key.clone(), value.clone());
        }
        if !self.send_auth {
            options = options.without_auth();
        }
        options
    }
}

/// Parse HTTP method from string
fn parse_method(s: &str) -> Result<Method> {
    match s.to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => anyhow::bail!("Unsupported HTTP method: {}", other),
    }
}

/// Parse log format from string
fn parse_log_format(s: &str) -> LogFormat {
    match s.to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

fn parse_query_item(item: &str) -> Result<(String, String)> {
    let (key, value) = item
        .split_once('=')
        .with_context(|| format!("Query parameter must be key=value: {}", item))?;
    Ok((key.to_string(), value.to_string()))
}

/// Accept paths with or without the leading slash or the /api/v1 prefix
fn normalize_path(path: &str) -> String {
    let path = path.strip_prefix(crate::connection::API_V1).unwrap_or(path);
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
