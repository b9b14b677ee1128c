// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Transport client for the coordinator API
//!
//! [`CoordinatorClient`] resolves [`Request`] descriptors against the
//! coordinator's base URL, encodes their parameters, authenticates with
//! the configured token and hands the response to a caller-supplied
//! handler. Two reqwest clients share one TLS configuration and cookie
//! jar: a bounded-timeout one for ordinary calls and an unbounded one for
//! streamed uploads.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use coordinator_types::{ApiResponse, Method, Route};

use crate::error::ClientError;
use crate::params::{append_query, encode_form};
use crate::request::Request;
use crate::retry::Backoff;

/// Default size of file reads feeding a streamed upload
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Default timeout for ordinary (non-upload) requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Construction-time configuration for [`CoordinatorClient`]
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Coordinator base URL, including any path prefix the API is mounted under
    pub base_url: String,
    pub token: Option<String>,
    /// Extra PEM bundle trusted in addition to the system roots
    pub trusted_ca: Option<PathBuf>,
    /// Timeout for ordinary requests; `None` waits indefinitely
    pub timeout: Option<Duration>,
    pub upload_chunk_size: usize,
    /// Upload bandwidth cap in bytes per second; `None` is unthrottled
    pub upload_rate_limit: Option<u64>,
    /// Keep a cookie jar shared by every request from this client
    pub cookies: bool,
    /// Delay policy between upload retries
    pub backoff: Backoff,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            trusted_ca: None,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            upload_rate_limit: None,
            cookies: false,
            backoff: Backoff::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Share a cookie jar across every request of the built client
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookies = true;
        self
    }
}

/// Agent-side client for the coordinator.
///
/// Configure it through the setters before sharing it; they take
/// `&mut self`, so a client cannot be reconfigured while a request that
/// borrows it is still in flight.
#[derive(Clone, Debug)]
pub struct CoordinatorClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
    pub(crate) doc_id: Option<String>,
    pub(crate) upload_chunk_size: usize,
    pub(crate) upload_rate_limit: Option<u64>,
    pub(crate) backoff: Backoff,
    pub(crate) http: reqwest::Client,
    pub(crate) upload_http: reqwest::Client,
    jar: Option<Arc<Jar>>,
}

impl CoordinatorClient {
    /// Build a client, loading the trust roots once.
    ///
    /// Fails if the configured CA file cannot be read.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let tls = agent_tls::client_config(config.trusted_ca.as_deref())?;
        let jar = config.cookies.then(|| Arc::new(Jar::default()));

        let http = build_http(tls.clone(), jar.as_ref(), config.timeout)?;
        // Large uploads legitimately outlast any fixed timeout
        let upload_http = build_http(tls, jar.as_ref(), None)?;

        Ok(Self {
            base_url: config.base_url,
            token: config.token.filter(|t| !t.is_empty()),
            doc_id: None,
            upload_chunk_size: config.upload_chunk_size.max(1),
            upload_rate_limit: config.upload_rate_limit.filter(|r| *r > 0),
            backoff: config.backoff,
            http,
            upload_http,
            jar,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.base_url = url.into();
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
    }

    pub fn set_upload_chunk_size(&mut self, size: usize) {
        self.upload_chunk_size = size.max(1);
    }

    /// Set the upload bandwidth cap in bytes per second; zero removes it
    pub fn set_upload_rate_limit(&mut self, bytes_per_sec: u64) {
        self.upload_rate_limit = (bytes_per_sec > 0).then_some(bytes_per_sec);
    }

    /// Set the task the task-scoped helpers act on
    pub fn set_doc(&mut self, id: impl Into<String>) {
        self.doc_id = Some(id.into());
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.doc_id.as_deref()
    }

    pub fn has_cookie_jar(&self) -> bool {
        self.jar.is_some()
    }

    pub(crate) fn active_doc(&self) -> Result<&str, ClientError> {
        self.doc_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::Encoding("no active task set on client".to_string()))
    }

    /// Resolve a route against the base URL
    pub fn resolve_url(
        &self,
        route: &Route,
        interpolations: &std::collections::BTreeMap<String, String>,
    ) -> Result<url::Url, ClientError> {
        let path = route.interpolate(interpolations)?;
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        url::Url::parse(&raw).map_err(|e| ClientError::Encoding(format!("{}: {}", raw, e)))
    }

    pub(crate) fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("token {}", token)),
            None => builder,
        }
    }

    /// Turn a descriptor into a ready-to-send request. Nothing is sent if
    /// any part of it fails to encode.
    fn build(&self, request: Request) -> Result<reqwest::RequestBuilder, ClientError> {
        let Request {
            route,
            interpolations,
            options,
            body,
        } = request;

        let mut url = self.resolve_url(route, &interpolations)?;
        let method = http_method(route.method);

        let builder = if route.requires_form_encode() {
            if body.is_some() {
                return Err(ClientError::Encoding(format!(
                    "route {} sends its parameters as the body; a raw body is not allowed",
                    route.name
                )));
            }
            let form = encode_form(&options)?;
            self.http
                .request(method, url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(form)
        } else {
            append_query(&mut url, &options)?;
            let builder = self.http.request(method, url);
            match body {
                Some(body) => builder.body(body),
                None => builder,
            }
        };

        Ok(self.authorize(builder))
    }

    /// Send a request and pass the raw response to `handler`.
    ///
    /// Non-2xx responses are handed over like any other: the handler
    /// decides what a status means. Only transport failures and encoding
    /// failures are reported here.
    pub async fn execute_raw<F, Fut, T>(&self, request: Request, handler: F) -> Result<T, ClientError>
    where
        F: FnOnce(reqwest::Response) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let route = request.route.name;
        let builder = self.build(request)?;

        tracing::debug!(route, "Sending coordinator request");
        let response = builder.send().await.map_err(|e| {
            tracing::debug!(route, error = %e, "Coordinator request failed");
            ClientError::from(e)
        })?;
        tracing::debug!(route, status = %response.status(), "Coordinator responded");

        handler(response).await
    }

    /// Send a request and decode the JSON response body into `T`
    pub async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T, ClientError> {
        self.execute_raw(request, decode_json::<T>).await
    }

    /// Send a request and decode the generic `{status, message, payload}`
    /// envelope, leaving the application status for the caller to inspect
    pub async fn execute_for_envelope(&self, request: Request) -> Result<ApiResponse, ClientError> {
        self.execute(request).await
    }
}

fn build_http(
    tls: rustls::ClientConfig,
    jar: Option<&Arc<Jar>>,
    timeout: Option<Duration>,
) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder()
        .use_preconfigured_tls(tls)
        .user_agent(concat!("build-agent/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(jar) = jar {
        builder = builder.cookie_provider(Arc::clone(jar));
    }

    builder
        .build()
        .map_err(|e| ClientError::Config(e.to_string()))
}

pub(crate) fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Decode a response body as JSON, regardless of its status
pub async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Reject non-2xx responses with [`ClientError::Server`]
pub fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ClientError::Server {
            status: status.as_u16(),
        })
    }
}
