use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, Result};
use client::{
    AuthApi, AuthenticatedRequest, ReqwestTransport, SessionStore,
    storage::{FileStore, SharedStore},
};
use shared::config::client::ClientConfig;
use tracing::debug;

/// Everything a command needs: resolved config, the session, and a request
/// wrapper bound to that session.
pub struct Context {
    pub config: ClientConfig,
    pub session: SessionStore,
    pub requests: AuthenticatedRequest,
}

impl Context {
    pub fn build(config: ClientConfig, ephemeral: bool) -> Result<Self> {
        let storage: Option<SharedStore> = if ephemeral {
            None
        } else {
            Some(Arc::new(FileStore::new(&config.storage_path)))
        };
        debug!(
            storage = %config.storage_path.display(),
            ephemeral,
            "loading session"
        );

        let session = SessionStore::load(storage, config.load_policy).with_context(|| {
            format!(
                "failed to load session from {}; run `gfs logout` to reset it",
                config.storage_path.display()
            )
        })?;

        let transport = ReqwestTransport::with_timeout(
            config.request_timeout_secs.map(Duration::from_secs),
        )
        .context("failed to build HTTP client")?;
        let requests = AuthenticatedRequest::new(session.clone(), Arc::new(transport))
            .with_base_url(config.base_url.clone());

        Ok(Self {
            config,
            session,
            requests,
        })
    }

    pub fn api(&self) -> AuthApi {
        AuthApi::new(self.requests.clone())
    }
}
