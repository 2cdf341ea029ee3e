// Log Insight client - authenticated HTTP transport for the REST API

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod response;

pub use auth::Credentials;
pub use connection::{Connection, ConnectionConfig, RequestBody, RequestOptions};
pub use error::{ClientError, Result};
pub use response::{ApiResponse, RequestRecord, ResponseRecord};
