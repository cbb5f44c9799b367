//! Bearer-token request decoration.

use std::{fmt, sync::Arc};

use http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tracing::debug;
use url::Url;

use crate::{
    error::TransportError,
    session::SessionStore,
    transport::{HttpRequest, HttpResponse, RequestOptions, Transport},
};

/// Observer for responses flowing back through [`AuthenticatedRequest`].
///
/// This is the place to react centrally to `401`/`403` answers. Hooks only
/// observe; the response is always returned to the caller unchanged.
pub trait ResponseHook: Send + Sync {
    /// Called once per response before it is handed back.
    fn on_response(&self, request: &HttpRequest, response: &HttpResponse);
}

/// Wraps a [`Transport`] so every request carries the session's bearer token.
///
/// Headers are layered as: `Content-Type: application/json`, then the
/// caller's headers, then `Authorization: Bearer <token>` when the session has
/// a token. The token always wins over a caller-supplied `Authorization`.
#[derive(Clone)]
pub struct AuthenticatedRequest {
    session: SessionStore,
    transport: Arc<dyn Transport>,
    base_url: Option<Url>,
    hook: Option<Arc<dyn ResponseHook>>,
}

impl AuthenticatedRequest {
    /// Decorates `transport` with the credentials held by `session`.
    pub fn new(session: SessionStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            session,
            transport,
            base_url: None,
            hook: None,
        }
    }

    /// Resolves relative targets against `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Installs a response observer.
    #[must_use]
    pub fn with_response_hook(mut self, hook: Arc<dyn ResponseHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// The session whose token is attached.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Builds the request that [`send`](Self::send) would hand to the
    /// transport, reading the token once, now.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidUrl`] for an unusable target and
    /// [`TransportError::InvalidHeader`] when the token is not a valid header
    /// value.
    pub fn build_request(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> Result<HttpRequest, TransportError> {
        let url = self.resolve(target)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers);

        if let Some(token) = self.session.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| TransportError::InvalidHeader(AUTHORIZATION.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(HttpRequest {
            method: options.method,
            url: url.into(),
            headers,
            body: options.body,
        })
    }

    /// Sends a request through the wrapped transport.
    ///
    /// The transport's result, success or failure, is returned as is.
    ///
    /// # Errors
    /// Returns whatever [`build_request`](Self::build_request) or the
    /// transport returns.
    pub async fn send(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.build_request(target, options)?;
        debug!(
            method = %request.method,
            url = %request.url,
            authenticated = request.headers.contains_key(AUTHORIZATION),
            "sending request"
        );

        match &self.hook {
            Some(hook) => {
                let response = self.transport.send(request.clone()).await?;
                hook.on_response(&request, &response);
                Ok(response)
            }
            None => self.transport.send(request).await,
        }
    }

    fn resolve(&self, target: &str) -> Result<Url, TransportError> {
        let invalid = |reason: String| TransportError::InvalidUrl {
            target: target.to_string(),
            reason,
        };
        match Url::parse(target) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(target).map_err(|err| invalid(err.to_string())),
                None => Err(invalid("relative target and no base URL configured".to_string())),
            },
            Err(err) => Err(invalid(err.to_string())),
        }
    }
}

impl fmt::Debug for AuthenticatedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedRequest")
            .field("session", &self.session)
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}
