//! Rank task: score candidate documents against a reference.

use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::content::{load_plain, normalize_records, MediaHint};
use crate::envelope::{ContentShape, RequestEnvelope};
use crate::record::{NamedScore, RawValue, Record, Tensor};
use crate::tasks::{first_record, resolve_exclusive};
use crate::{Error, Result};

const ENDPOINT: &str = "/rank";

/// Input contract of [`Model::rank`](crate::model::Model::rank).
///
/// Plain mode takes a reference (`text` or `image`) plus the required
/// `candidates` collection; `docs` records carry their candidates in
/// `matches` themselves.
#[derive(Debug, Clone, Default)]
pub struct RankRequest {
    docs: Option<Vec<Record>>,
    text: Option<String>,
    image: Option<RawValue>,
    candidates: Option<Vec<RawValue>>,
    batch_size: Option<usize>,
    parameters: Option<Map<String, Value>>,
}

impl RankRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn docs(mut self, docs: impl IntoIterator<Item = Record>) -> Self {
        self.docs = Some(docs.into_iter().collect());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn image(mut self, image: impl Into<RawValue>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn candidates(mut self, candidates: impl IntoIterator<Item = RawValue>) -> Self {
        self.candidates = Some(candidates.into_iter().collect());
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

/// The content a ranked match was built from: the original URI when one was
/// supplied, otherwise the candidate's own content.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchContent {
    Uri(String),
    Text(String),
    Blob(Bytes),
    Tensor(Tensor),
}

/// One scored candidate, in the order the service ranked them.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub content: MatchContent,
    pub scores: BTreeMap<String, NamedScore>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RankOutput {
    Records(Vec<Record>),
    /// Plain mode: candidates with scores, server order preserved.
    Ranked(Vec<RankedMatch>),
}

pub(crate) async fn build_payload(
    request: RankRequest,
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
    } else {
        let reference = if let Some(text) = request.text {
            Record::text(text)
        } else if let Some(image) = request.image {
            load_plain(image, Some(MediaHint::Image)).await?
        } else {
            return Err(Error::MissingRequiredInput {
                key: "docs, text or image".to_string(),
            });
        };
        let candidates = request
            .candidates
            .ok_or_else(|| Error::MissingRequiredInput {
                key: "candidates".to_string(),
            })?;
        let matches = futures::future::try_join_all(
            candidates
                .into_iter()
                .map(|candidate| load_plain(candidate, None)),
        )
        .await?;
        envelope = envelope.with_records(vec![reference.with_matches(matches)]);
        shape = ContentShape::plain_single();
    }

    Ok((envelope, shape))
}

pub(crate) fn unbox(records: Vec<Record>, shape: ContentShape) -> Result<RankOutput> {
    if shape.is_structured() {
        return Ok(RankOutput::Records(records));
    }
    let reference = first_record(&records)?;
    let ranked = reference
        .matches
        .iter()
        .map(|m| RankedMatch {
            content: match_content(m),
            scores: m.scores.clone(),
        })
        .collect();
    Ok(RankOutput::Ranked(ranked))
}

fn match_content(record: &Record) -> MatchContent {
    if let Some(uri) = &record.uri {
        MatchContent::Uri(uri.clone())
    } else if let Some(text) = &record.text {
        MatchContent::Text(text.clone())
    } else if let Some(blob) = &record.blob {
        MatchContent::Blob(blob.clone())
    } else if let Some(tensor) = &record.tensor {
        MatchContent::Tensor(tensor.clone())
    } else {
        MatchContent::Text(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(content: Record, score: f32) -> Record {
        let mut record = content;
        record
            .scores
            .insert("cosine".to_string(), NamedScore::new(score));
        record
    }

    #[tokio::test]
    async fn candidates_are_required_in_plain_mode() {
        let err = build_payload(RankRequest::new().text("reference"), None)
            .await
            .expect_err("must fail");
        match err {
            Error::MissingRequiredInput { key } => assert_eq!(key, "candidates"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn text_and_image_conflict() {
        let request = RankRequest::new()
            .text("reference")
            .image(RawValue::from(vec![1u8]))
            .candidates(vec![RawValue::from("a")]);
        let err = build_payload(request, None).await.expect_err("must fail");
        assert!(matches!(err, Error::AmbiguousInput { .. }));
    }

    #[tokio::test]
    async fn candidates_become_reference_matches() {
        let request = RankRequest::new()
            .text("a dog playing fetch")
            .candidates(vec![RawValue::from("a dog"), RawValue::from("a cat")]);
        let (envelope, shape) = build_payload(request, None).await.expect("build");
        assert_eq!(envelope.total_count, Some(1));
        assert_eq!(envelope.records[0].matches.len(), 2);
        assert_eq!(envelope.records[0].matches[0].text.as_deref(), Some("a dog"));
        assert_eq!(shape, ContentShape::plain_single());
    }

    #[test]
    fn unbox_preserves_server_order() {
        let reference = Record::text("ref").with_matches(vec![
            scored(Record::text("best"), 0.9),
            scored(Record::from_uri("https://host/b.png"), 0.5),
            scored(Record::text("worst"), 0.1),
        ]);
        let out = unbox(vec![reference], ContentShape::plain_single()).expect("unbox");
        match out {
            RankOutput::Ranked(ranked) => {
                assert_eq!(ranked.len(), 3);
                assert_eq!(ranked[0].content, MatchContent::Text("best".into()));
                // a match that carried a URI reports the URI, not the blob
                assert_eq!(
                    ranked[1].content,
                    MatchContent::Uri("https://host/b.png".into())
                );
                assert_eq!(ranked[2].content, MatchContent::Text("worst".into()));
                assert_eq!(ranked[0].scores["cosine"].value, 0.9);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }
}
