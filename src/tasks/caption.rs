//! Caption task: describe an image in natural language.

use serde_json::{Map, Value};

use crate::content::{load_plain, normalize_records, MediaHint};
use crate::envelope::{ContentShape, RequestEnvelope};
use crate::record::{RawValue, Record};
use crate::tasks::{first_record, resolve_exclusive, response_text};
use crate::{Error, Result};

const ENDPOINT: &str = "/caption";

/// Input contract of [`Model::caption`](crate::model::Model::caption).
///
/// Plain mode takes a single image; lists of images go through `docs`.
#[derive(Debug, Clone, Default)]
pub struct CaptionRequest {
    docs: Option<Vec<Record>>,
    image: Option<RawValue>,
    batch_size: Option<usize>,
    parameters: Option<Map<String, Value>>,
}

impl CaptionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn docs(mut self, docs: impl IntoIterator<Item = Record>) -> Self {
        self.docs = Some(docs.into_iter().collect());
        self
    }

    pub fn image(mut self, image: impl Into<RawValue>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptionOutput {
    Records(Vec<Record>),
    /// Plain mode: the caption text of the lone response record.
    Text(String),
}

pub(crate) async fn build_payload(
    request: CaptionRequest,
    token: Option<&str>,
) -> Result<(RequestEnvelope, ContentShape)> {
    resolve_exclusive(&[
        ("docs", request.docs.is_some()),
        ("image", request.image.is_some()),
    ])?;

    let mut envelope = RequestEnvelope::new(ENDPOINT, token);
    if let Some(batch_size) = request.batch_size {
        envelope = envelope.with_batch_size(batch_size);
    }
    if let Some(parameters) = request.parameters {
        envelope = envelope.with_parameters(parameters);
    }

    let shape;
    if let Some(docs) = request.docs {
        envelope = envelope.with_records(normalize_records(docs).await?);
        shape = ContentShape::structured();
    } else if let Some(image) = request.image {
        let record = load_plain(image, Some(MediaHint::Image)).await?;
        envelope = envelope.with_records(vec![record]);
        shape = ContentShape::plain_single();
    } else {
        return Err(Error::MissingRequiredInput {
            key: "docs or image".to_string(),
        });
    }

    Ok((envelope, shape))
}

pub(crate) fn unbox(records: Vec<Record>, shape: ContentShape) -> Result<CaptionOutput> {
    if shape.is_structured() {
        return Ok(CaptionOutput::Records(records));
    }
    let text = response_text(first_record(&records)?)?;
    Ok(CaptionOutput::Text(text))
}
