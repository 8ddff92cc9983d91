//! HTTP implementation of the transport seam.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::envelope::RequestEnvelope;
use crate::record::Record;
use crate::transport::Transport;
use crate::{Error, Result};

/// Transport posting envelopes as JSON to the service's data endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, settings: &Settings) -> Result<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Endpoint(format!(
                "`{base_url}` is not an http(s) endpoint"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post_url(&self) -> String {
        format!("{}/post", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct DataRequest<'a> {
    data: &'a [Record],
    exec_endpoint: &'a str,
    parameters: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "is_false")]
    results_in_order: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Deserialize)]
struct DataResponse {
    #[serde(default)]
    data: Vec<Record>,
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, envelope: &RequestEnvelope) -> Result<Vec<Record>> {
        let url = self.post_url();
        let request_id = envelope.request_id.to_string();
        let mut collected = Vec::with_capacity(envelope.records.len());

        for (batch_index, chunk) in envelope.records.chunks(envelope.batch_size.max(1)).enumerate()
        {
            let body = DataRequest {
                data: chunk,
                exec_endpoint: &envelope.endpoint,
                parameters: &envelope.parameters,
                results_in_order: envelope.results_in_order,
            };
            let mut request = self
                .client
                .post(&url)
                .header("x-request-id", &request_id)
                .json(&body);
            if let Some(token) = &envelope.auth_token {
                request = request.header(AUTHORIZATION, token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(Error::Remote {
                    status: status.as_u16(),
                    message,
                });
            }
            let parsed: DataResponse = response.json().await?;
            collected.extend(parsed.data);
            tracing::debug!(
                endpoint = %envelope.endpoint,
                batch = batch_index,
                received = collected.len(),
                total = ?envelope.total_count,
                "batch completed"
            );
        }

        Ok(collected)
    }
}
