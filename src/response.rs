// Response types returned by the connection

use bytes::Bytes;
use std::borrow::Cow;
use reqwest::header::{HeaderMap, WARNING};
use reqwest::{Method, Request, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::Result;

/// A response whose body has been fully read.
/// Kept in the history of a retried response and attached to authentication errors.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseRecord {
    /// Drain a response so the underlying connection goes back to the pool.
    /// A transport error while reading the body is propagated.
    pub async fn drain(response: Response) -> Result<Self> {
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            url,
            headers,
            body,
        })
    }

    /// Body as lossy UTF-8, for diagnostics
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The request that produced a response
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl RequestRecord {
    pub fn of(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
        }
    }
}

/// Final response of a call on a [`Connection`](crate::Connection)
#[derive(Debug)]
pub struct ApiResponse {
    inner: Response,
    request: RequestRecord,
    history: Vec<ResponseRecord>,
}

impl ApiResponse {
    pub(crate) fn new(inner: Response, request: RequestRecord) -> Self {
        Self {
            inner,
            request,
            history: Vec::new(),
        }
    }

    pub(crate) fn with_history(mut self, history: Vec<ResponseRecord>) -> Self {
        self.history = history;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    /// Value of the server's `Warning` header, if present.
    /// Bytes outside visible ASCII are decoded as lossy UTF-8 rather than dropped.
    pub fn warning(&self) -> Option<Cow<'_, str>> {
        self.inner
            .headers()
            .get(WARNING)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    /// Responses that preceded this one, oldest first
    pub fn history(&self) -> &[ResponseRecord] {
        &self.history
    }

    /// The request that produced this response.
    /// After a re-authentication this is the copy carrying the fresh token.
    pub fn request(&self) -> &RequestRecord {
        &self.request
    }

    pub fn was_retried(&self) -> bool {
        !self.history.is_empty()
    }

    pub async fn bytes(self) -> Result<Bytes> {
        Ok(self.inner.bytes().await?)
    }

    pub async fn text(self) -> Result<String> {
        Ok(self.inner.text().await?)
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(self.inner.json().await?)
    }

    pub fn into_inner(self) -> Response {
        self.inner
    }
}
