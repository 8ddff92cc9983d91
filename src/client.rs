//! Client facade: authentication, discovery and memoized model handles.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth;
use crate::config::Settings;
use crate::discovery::ModelRegistry;
use crate::model::Model;
use crate::transport::HttpTransport;
use crate::{Error, Result};

const MODEL_CACHE_SIZE: usize = 10;

/// Builder for [`Client`].
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    token: Option<String>,
    host: Option<String>,
    settings: Option<Settings>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Auth token; without one, the keyring and environment are consulted.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Connect every model directly to this endpoint, bypassing discovery
    /// and token validation. Must be an `http(s)` URL.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub async fn build(self) -> Result<Client> {
        let settings = self.settings.unwrap_or_default();

        if let Some(host) = &self.host {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                return Err(Error::Endpoint(format!(
                    "host override `{host}` must be an http(s) endpoint"
                )));
            }
        }

        // With a direct host the token is passed through unvalidated, the
        // way a self-hosted deployment without the identity service needs.
        let auth_token = match &self.host {
            Some(_) => self.token,
            None => Some(auth::login(self.token.as_deref(), &settings).await?),
        };

        let registry = ModelRegistry::new(&settings)?;
        Ok(Client {
            auth_token,
            host: self.host,
            settings,
            registry,
            models: Mutex::new(LruCache::new(
                NonZeroUsize::new(MODEL_CACHE_SIZE).expect("cache size is non-zero"),
            )),
        })
    }
}

/// A client for models hosted on the inference cloud.
///
/// Model handles are memoized: at most [`MODEL_CACHE_SIZE`] distinct models
/// are cached, with recent-use eviction.
pub struct Client {
    auth_token: Option<String>,
    host: Option<String>,
    settings: Settings,
    registry: ModelRegistry,
    models: Mutex<LruCache<String, Arc<Model>>>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build a client with just a token and default settings.
    pub async fn new(token: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().token(token).build().await
    }

    /// Get a model handle by name, reusing a cached one when present.
    pub async fn get_model(&self, model_name: &str) -> Result<Arc<Model>> {
        {
            let mut models = self.models.lock().await;
            if let Some(model) = models.get(model_name) {
                tracing::debug!(model = model_name, "reusing cached model handle");
                return Ok(Arc::clone(model));
            }
        }

        let endpoint = match &self.host {
            Some(host) => host.clone(),
            None => {
                let spec = self
                    .registry
                    .get_model_spec(model_name, self.auth_token.as_deref())
                    .await?;
                spec.http_endpoint()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Error::Endpoint(format!(
                            "model `{model_name}` exposes no http endpoint"
                        ))
                    })?
            }
        };

        let transport = Arc::new(HttpTransport::new(endpoint, &self.settings)?);
        let model = Arc::new(Model::new(
            model_name,
            self.auth_token.clone(),
            transport,
        ));
        tracing::info!(model = model_name, "connected model");

        let mut models = self.models.lock().await;
        models.put(model_name.to_string(), Arc::clone(&model));
        Ok(model)
    }
}
