//! Text generation task: complete one or more prompts.

use serde_json::{Map, Value};

use crate::envelope::{ContentShape, RequestEnvelope};
use crate::record::Record;
use crate::tasks::OneOrMany;
use crate::{Error, Result};

const ENDPOINT: &str = "/generate";

/// Input contract of [`Model::generate`](crate::model::Model::generate).
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    prompts: OneOrMany<String>,
    max_new_tokens: Option<u32>,
    num_beams: Option<u32>,
    do_sample: Option<bool>,
    temperature: Option<f32>,
    top_k: Option<u32>,
    top_p: Option<f32>,
    repetition_penalty: Option<f32>,
    length_penalty: Option<f32>,
    no_repeat_ngram_size: Option<u32>,
    batch_size: Option<usize>,
    parameters: Option<Map<String, Value>>,
}

impl GenerateRequest {
    pub fn new(prompts: impl Into<OneOrMany<String>>) -> Self {
        Self {
            prompts: prompts.into(),
            max_new_tokens: None,
            num_beams: None,
            do_sample: None,
            temperature: None,
            top_k: None,
            top_p: None,
            repetition_penalty: None,
            length_penalty: None,
            no_repeat_ngram_size: None,
            batch_size: None,
            parameters: None,
        }
    }

    pub fn max_new_tokens(mut self, value: u32) -> Self {
        self.max_new_tokens = Some(value);
        self
    }

    pub fn num_beams(mut self, value: u32) -> Self {
        self.num_beams = Some(value);
        self
    }

    pub fn do_sample(mut self, value: bool) -> Self {
        self.do_sample = Some(value);
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn top_k(mut self, value: u32) -> Self {
        self.top_k = Some(value);
        self
    }

    pub fn top_p(mut self, value: f32) -> Self {
        self.top_p = Some(value);
        self
    }

    pub fn repetition_penalty(mut self, value: f32) -> Self {
        self.repetition_penalty = Some(value);
        self
    }

    pub fn length_penalty(mut self, value: f32) -> Self {
        self.length_penalty = Some(value);
        self
    }

    pub fn no_repeat_ngram_size(mut self, value: u32) -> Self {
        self.no_repeat_ngram_size = Some(value);
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

/// Generated text, mirroring the prompt cardinality.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutput {
    Text(String),
    Texts(Vec<String>),
}

pub(crate) async fn build_payload(
    request: GenerateRequest,
    token: Option<&str>,
) -> Result<(RequestEnvelope, ContentShape)> {
    let mut envelope = RequestEnvelope::new(ENDPOINT, token);
    if let Some(batch_size) = request.batch_size {
        envelope = envelope.with_batch_size(batch_size);
    }
    if let Some(parameters) = request.parameters {
        envelope = envelope.with_parameters(parameters);
    }
    envelope = set_opt(envelope, "max_new_tokens", request.max_new_tokens);
    envelope = set_opt(envelope, "num_beams", request.num_beams);
    envelope = set_opt(envelope, "do_sample", request.do_sample);
    envelope = set_opt_f32(envelope, "temperature", request.temperature);
    envelope = set_opt(envelope, "top_k", request.top_k);
    envelope = set_opt_f32(envelope, "top_p", request.top_p);
    envelope = set_opt_f32(envelope, "repetition_penalty", request.repetition_penalty);
    envelope = set_opt_f32(envelope, "length_penalty", request.length_penalty);
    envelope = set_opt(envelope, "no_repeat_ngram_size", request.no_repeat_ngram_size);

    let (prompts, is_list) = request.prompts.into_parts();
    if prompts.is_empty() {
        return Err(Error::MissingRequiredInput {
            key: "prompts".to_string(),
        });
    }
    let records = prompts.into_iter().map(Record::text).collect();
    envelope = envelope
        .with_records(records)
        .with_results_in_order(is_list);

    Ok((envelope, ContentShape::plain(is_list)))
}

fn set_opt<V: Into<Value>>(
    envelope: RequestEnvelope,
    key: &'static str,
    value: Option<V>,
) -> RequestEnvelope {
    match value {
        Some(value) => envelope.with_parameter(key, value.into()),
        None => envelope,
    }
}

fn set_opt_f32(
    envelope: RequestEnvelope,
    key: &'static str,
    value: Option<f32>,
) -> RequestEnvelope {
    set_opt(envelope, key, value.map(f64::from))
}

pub(crate) fn unbox(records: Vec<Record>, shape: ContentShape) -> Result<GenerateOutput> {
    if records.is_empty() {
        return Err(Error::empty_result("service returned no records"));
    }
    let texts = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .tag_str("generated_text")
                .filter(|t| !t.is_empty())
                .or_else(|| record.tag_str("response"))
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::empty_result(format!("record at index {index} carries no generated text"))
                })
        })
        .collect::<Result<Vec<_>>>()?;
    match shape.cardinality {
        crate::envelope::Cardinality::Single => {
            let mut texts = texts;
            Ok(GenerateOutput::Text(texts.remove(0)))
        }
        crate::envelope::Cardinality::List => Ok(GenerateOutput::Texts(texts)),
    }
}
