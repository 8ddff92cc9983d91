//! Transport seam between payload construction and the remote service.
//!
//! The [`Transport`] trait is the single boundary this crate owns: one
//! `post` of a [`RequestEnvelope`] returning the response records. The
//! HTTP implementation lives in [`http`]; tests may substitute their own.

use async_trait::async_trait;
use std::sync::Arc;

use crate::envelope::RequestEnvelope;
use crate::record::Record;
use crate::{Error, Result};

mod http;
pub use http::HttpTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit the envelope and return the response records in order.
    async fn post(&self, envelope: &RequestEnvelope) -> Result<Vec<Record>>;
}

/// Completion hooks for detached calls.
///
/// When a call is dispatched with hooks, it returns immediately and all
/// further interaction happens through these callbacks: `on_done` receives
/// the raw response records, `on_error` the failure, and `on_always` runs
/// after either outcome.
#[derive(Default)]
pub struct CallHooks {
    pub(crate) on_done: Option<Box<dyn FnOnce(Vec<Record>) + Send + 'static>>,
    pub(crate) on_error: Option<Box<dyn FnOnce(Error) + Send + 'static>>,
    pub(crate) on_always: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl CallHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_done(mut self, hook: impl FnOnce(Vec<Record>) + Send + 'static) -> Self {
        self.on_done = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl FnOnce(Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn on_always(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_always = Some(Box::new(hook));
        self
    }

    pub(crate) fn done(self, records: Vec<Record>) {
        if let Some(hook) = self.on_done {
            hook(records);
        }
        if let Some(hook) = self.on_always {
            hook();
        }
    }

    pub(crate) fn fail(self, error: Error) {
        tracing::warn!(%error, "detached call failed");
        if let Some(hook) = self.on_error {
            hook(error);
        }
        if let Some(hook) = self.on_always {
            hook();
        }
    }
}

impl std::fmt::Debug for CallHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHooks")
            .field("on_done", &self.on_done.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_always", &self.on_always.is_some())
            .finish()
    }
}

/// Submit an envelope on a background task, driving the hooks as the
/// response arrives. The caller gets no result value.
pub fn post_detached(transport: Arc<dyn Transport>, envelope: RequestEnvelope, hooks: CallHooks) {
    tokio::spawn(async move {
        match transport.post(&envelope).await {
            Ok(records) => hooks.done(records),
            Err(error) => hooks.fail(error),
        }
    });
}
