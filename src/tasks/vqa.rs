//! Visual question answering: ask a question about an image.

use serde_json::{Map, Value};

use crate::content::{load_plain, normalize_records, MediaHint};
use crate::envelope::{ContentShape, RequestEnvelope};
use crate::record::{RawValue, Record};
use crate::tasks::{first_record, resolve_exclusive, response_text};
use crate::{Error, Result};

const ENDPOINT: &str = "/vqa";

/// Input contract of [`Model::vqa`](crate::model::Model::vqa).
///
/// Plain mode takes a single image and a required question; `docs` records
/// carry their question in `tags["prompt"]` themselves.
#[derive(Debug, Clone, Default)]
pub struct VqaRequest {
    docs: Option<Vec<Record>>,
    image: Option<RawValue>,
    question: Option<String>,
    batch_size: Option<usize>,
    parameters: Option<Map<String, Value>>,
}

impl VqaRequest {
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

    pub fn question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
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
pub enum VqaOutput {
    Records(Vec<Record>),
    /// Plain mode: the answer text of the lone response record.
    Answer(String),
}

pub(crate) async fn build_payload(
    request: VqaRequest,
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
        let question = request.question.ok_or_else(|| Error::MissingRequiredInput {
            key: "question".to_string(),
        })?;
        let record = load_plain(image, Some(MediaHint::Image))
            .await?
            .with_tag("prompt", question);
        envelope = envelope.with_records(vec![record]);
        shape = ContentShape::plain_single();
    } else {
        return Err(Error::MissingRequiredInput {
            key: "docs or image".to_string(),
        });
    }

    Ok((envelope, shape))
}

pub(crate) fn unbox(records: Vec<Record>, shape: ContentShape) -> Result<VqaOutput> {
    if shape.is_structured() {
        return Ok(VqaOutput::Records(records));
    }
    let answer = response_text(first_record(&records)?)?;
    Ok(VqaOutput::Answer(answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn question_is_required_with_plain_image() {
        let request = VqaRequest::new().image(RawValue::from(vec![1u8, 2]));
        let err = build_payload(request, None).await.expect_err("must fail");
        match err {
            Error::MissingRequiredInput { key } => assert_eq!(key, "question"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn question_lands_in_prompt_tag() {
        let request = VqaRequest::new()
            .image(RawValue::from(vec![1u8, 2]))
            .question("what breed is this dog?");
        let (envelope, shape) = build_payload(request, None).await.expect("build");
        assert_eq!(
            envelope.records[0].tag_str("prompt"),
            Some("what breed is this dog?")
        );
        assert_eq!(shape, ContentShape::plain_single());
    }

    #[tokio::test]
    async fn image_and_docs_conflict() {
        let request = VqaRequest::new()
            .image(RawValue::from(vec![1u8]))
            .docs(vec![Record::blob(vec![2u8])])
            .question("?");
        let err = build_payload(request, None).await.expect_err("must fail");
        assert!(matches!(err, Error::AmbiguousInput { .. }));
    }

    #[test]
    fn plain_unbox_reads_answer() {
        let record = Record::default().with_tag("response", "a labrador");
        let out = unbox(vec![record], ContentShape::plain_single()).expect("unbox");
        assert_eq!(out, VqaOutput::Answer("a labrador".to_string()));
    }
}
