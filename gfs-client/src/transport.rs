//! The HTTP transport seam.
//!
//! [`Transport`] is whatever actually puts a request on the wire.
//! [`ReqwestTransport`] is the production implementation; tests substitute
//! their own.

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::TransportError;

/// Caller-supplied options for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method; `GET` when not set
    pub method: Method,
    /// Extra headers; these replace defaults with the same name
    pub headers: HeaderMap,
    /// Request body, already encoded
    pub body: Option<String>,
}

impl RequestOptions {
    /// Options for a `GET`.
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// Options for a `POST` with no body yet.
    #[must_use]
    pub fn post() -> Self {
        Self::default().method(Method::POST)
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds a header, replacing any earlier value with the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `payload` as the JSON body.
    ///
    /// # Errors
    /// Returns [`TransportError::Encode`] if `payload` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_string(payload).map_err(TransportError::Encode)?;
        Ok(self.body(body))
    }
}

/// A fully resolved request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Final header set
    pub headers: HeaderMap,
    /// Encoded body
    pub body: Option<String>,
}

/// A response as returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with no headers.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    /// Returns the parse failure if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Sends requests.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response, whatever its status.
    ///
    /// # Errors
    /// Returns an error only when no response was received.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] over a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a client with the crate's user agent and an optional timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_timeout(timeout: Option<std::time::Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().user_agent("gfs-client");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = reqwest::Url::parse(&request.url).map_err(|err| TransportError::InvalidUrl {
            target: request.url.clone(),
            reason: err.to_string(),
        })?;

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
