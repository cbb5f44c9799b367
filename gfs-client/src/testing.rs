//! In-crate transport double for unit tests.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use http::StatusCode;

use crate::{
    error::TransportError,
    transport::{HttpRequest, HttpResponse, Transport},
};

type SendHook = Box<dyn Fn() + Send + Sync>;

/// Records every request and replies from a script.
///
/// Once the script runs out, the last reply is repeated.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    fallback: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    on_send: Option<SendHook>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            on_send: None,
        }
    }

    pub(crate) fn ok(body: &str) -> Self {
        Self::new(vec![Ok(HttpResponse::new(StatusCode::OK, body))])
    }

    pub(crate) fn on_send(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_send = Some(Box::new(hook));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        if let Some(hook) = &self.on_send {
            hook();
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => {
                *self.fallback.lock().unwrap() = Some(response.clone());
                Ok(response)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self
                .fallback
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| HttpResponse::new(StatusCode::OK, ""))),
        }
    }
}
