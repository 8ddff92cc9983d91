//! Model discovery: resolve a model name to its serving endpoints.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::config::Settings;
use crate::{Error, Result};

const SPEC_CACHE_SIZE: usize = 10;

/// Serving endpoints a model is reachable at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelEndpoints {
    #[serde(default)]
    pub grpc: Option<String>,
    #[serde(default)]
    pub http: Option<String>,
}

/// Discovery record for one hosted model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSpec {
    pub endpoints: ModelEndpoints,
    #[serde(default)]
    pub image_size: Option<u32>,
}

impl ModelSpec {
    /// The endpoint this client can talk to.
    pub fn http_endpoint(&self) -> Option<&str> {
        self.endpoints.http.as_deref()
    }
}

/// Client for the model discovery service, with a bounded spec cache.
pub struct ModelRegistry {
    http: reqwest::Client,
    api_endpoint: String,
    cache: Mutex<LruCache<String, ModelSpec>>,
}

impl ModelRegistry {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .build()?;
        Ok(Self {
            http,
            api_endpoint: settings.api_endpoint.trim_end_matches('/').to_string(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(SPEC_CACHE_SIZE).expect("cache size is non-zero"),
            )),
        })
    }

    /// Fetch (or recall) the spec for a model.
    ///
    /// 401 maps to [`Error::Auth`], 404 to [`Error::ModelNotFound`]; other
    /// failures surface as remote errors.
    pub async fn get_model_spec(
        &self,
        model_name: &str,
        token: Option<&str>,
    ) -> Result<ModelSpec> {
        let cache_key = format!("{model_name}\u{1f}{}", token.unwrap_or_default());
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(spec) = cache.get(&cache_key) {
                return Ok(spec.clone());
            }
        }

        let url = format!("{}/models/", self.api_endpoint);
        let mut request = self.http.get(&url).query(&[("model_name", model_name)]);
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }
        let response = request.send().await.map_err(|e| {
            tracing::error!(model = model_name, error = %e, "failed to fetch model spec");
            Error::Http(e)
        })?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED => Err(Error::auth(
                "the provided auth token is invalid. Please check your auth token.",
            )),
            reqwest::StatusCode::NOT_FOUND => Err(Error::ModelNotFound {
                model: model_name.to_string(),
            }),
            status if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                Err(Error::Remote {
                    status: status.as_u16(),
                    message,
                })
            }
            _ => {
                let spec: ModelSpec = response.json().await?;
                if let Ok(mut cache) = self.cache.lock() {
                    cache.put(cache_key, spec.clone());
                }
                Ok(spec)
            }
        }
    }
}
