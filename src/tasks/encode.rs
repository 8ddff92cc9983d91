//! Embedding task: encode text, images or records into vectors.

use serde_json::{Map, Value};

use crate::content::normalize_records;
use crate::envelope::{ContentShape, RequestEnvelope};
use crate::record::{RawValue, Record};
use crate::tasks::{load_image_values, resolve_exclusive, OneOrMany};
use crate::{Error, Result};

const ENDPOINT: &str = "/encode";

/// Input contract of [`Model::encode`](crate::model::Model::encode).
///
/// Exactly one of `docs`, `text` or `image` must be supplied.
#[derive(Debug, Clone, Default)]
pub struct EncodeRequest {
    docs: Option<Vec<Record>>,
    text: Option<OneOrMany<String>>,
    image: Option<OneOrMany<RawValue>>,
    batch_size: Option<usize>,
    parameters: Option<Map<String, Value>>,
}

impl EncodeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn docs(mut self, docs: impl IntoIterator<Item = Record>) -> Self {
        self.docs = Some(docs.into_iter().collect());
        self
    }

    pub fn text(mut self, text: impl Into<OneOrMany<String>>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn image(mut self, image: impl Into<OneOrMany<RawValue>>) -> Self {
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

/// Encoding result, mirroring the input shape.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeOutput {
    /// Structured mode: the response records with embeddings attached.
    Records(Vec<Record>),
    /// A single plain input's embedding.
    Embedding(Vec<f32>),
    /// One embedding per plain input, index-aligned.
    Embeddings(Vec<Vec<f32>>),
}

pub(crate) async fn build_payload(
    request: EncodeRequest,
    token: Option<&str>,
) -> Result<(RequestEnvelope, ContentShape)> {
    resolve_exclusive(&[
        ("docs", request.docs.is_some()),
        ("text", request.text.is_some()),
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
    } else if let Some(text) = request.text {
        let (items, is_list) = text.into_parts();
        let records = items.into_iter().map(Record::text).collect();
        envelope = envelope
            .with_records(records)
            .with_results_in_order(is_list);
        shape = ContentShape::plain(is_list);
    } else if let Some(image) = request.image {
        let (records, is_list) = load_image_values(image).await?;
        envelope = envelope
            .with_records(records)
            .with_results_in_order(is_list);
        shape = ContentShape::plain(is_list);
    } else {
        return Err(Error::MissingRequiredInput {
            key: "docs, text or image".to_string(),
        });
    }

    Ok((envelope, shape))
}

pub(crate) fn unbox(records: Vec<Record>, shape: ContentShape) -> Result<EncodeOutput> {
    if shape.is_structured() {
        return Ok(EncodeOutput::Records(records));
    }
    if records.is_empty() {
        return Err(Error::empty_result("service returned no records"));
    }
    let embeddings = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .embedding
                .filter(|e| !e.is_empty())
                .ok_or_else(|| {
                    Error::empty_result(format!("record at index {index} carries no embedding"))
                })
        })
        .collect::<Result<Vec<_>>>()?;
    match shape.cardinality {
        crate::envelope::Cardinality::Single => {
            let mut embeddings = embeddings;
            Ok(EncodeOutput::Embedding(embeddings.remove(0)))
        }
        crate::envelope::Cardinality::List => Ok(EncodeOutput::Embeddings(embeddings)),
    }
}
