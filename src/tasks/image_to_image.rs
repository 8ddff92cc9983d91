//! Image-to-image generation task: transform a base image under a prompt.

use serde_json::{Map, Value};

use crate::content::{load_plain, normalize_records, MediaHint};
use crate::envelope::{ContentShape, RequestEnvelope};
use crate::record::{RawValue, Record};
use crate::tasks::text_to_image::diffusion_parameters;
use crate::tasks::{resolve_exclusive, unbox_generated_images, ImageOutput};
use crate::{Error, Result};

const ENDPOINT: &str = "/image-to-image";

/// Input contract of
/// [`Model::image_to_image`](crate::model::Model::image_to_image).
///
/// Plain mode takes a base image and a required prompt; `docs` records carry
/// base images and prompts themselves.
#[derive(Debug, Clone, Default)]
pub struct ImageToImageRequest {
    docs: Option<Vec<Record>>,
    image: Option<RawValue>,
    prompt: Option<String>,
    negative_prompt: Option<String>,
    strength: Option<f32>,
    num_inference_steps: Option<u32>,
    guidance_scale: Option<f32>,
    num_images_per_prompt: Option<u32>,
    eta: Option<f32>,
    seed: Option<u64>,
    output_type: Option<String>,
    batch_size: Option<usize>,
    parameters: Option<Map<String, Value>>,
}

impl ImageToImageRequest {
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

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn negative_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(prompt.into());
        self
    }

    /// How much to transform the base image, between 0 and 1.
    pub fn strength(mut self, strength: f32) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn num_inference_steps(mut self, steps: u32) -> Self {
        self.num_inference_steps = Some(steps);
        self
    }

    pub fn guidance_scale(mut self, scale: f32) -> Self {
        self.guidance_scale = Some(scale);
        self
    }

    pub fn num_images_per_prompt(mut self, count: u32) -> Self {
        self.num_images_per_prompt = Some(count);
        self
    }

    pub fn eta(mut self, eta: f32) -> Self {
        self.eta = Some(eta);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Ask for `latent` output to receive tensors instead of encoded images.
    pub fn output_type(mut self, output_type: impl Into<String>) -> Self {
        self.output_type = Some(output_type.into());
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

pub(crate) async fn build_payload(
    request: ImageToImageRequest,
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
    envelope = diffusion_parameters(
        envelope,
        &[
            (
                "strength",
                request.strength.map(|v| Value::from(f64::from(v))),
            ),
            (
                "num_inference_steps",
                request.num_inference_steps.map(Value::from),
            ),
            (
                "guidance_scale",
                request.guidance_scale.map(|v| Value::from(f64::from(v))),
            ),
            (
                "num_images_per_prompt",
                request.num_images_per_prompt.map(Value::from),
            ),
            ("eta", request.eta.map(|v| Value::from(f64::from(v)))),
            ("seed", request.seed.map(Value::from)),
            ("output_type", request.output_type.clone().map(Value::from)),
        ],
    );

    let shape;
    if let Some(docs) = request.docs {
        envelope = envelope.with_records(normalize_records(docs).await?);
        shape = ContentShape::structured();
    } else if let Some(image) = request.image {
        let prompt = request.prompt.ok_or_else(|| Error::MissingRequiredInput {
            key: "prompt".to_string(),
        })?;
        let mut record = load_plain(image, Some(MediaHint::Image))
            .await?
            .with_tag("prompt", prompt);
        if let Some(negative) = request.negative_prompt {
            record = record.with_tag("negative_prompt", negative);
        }
        envelope = envelope.with_records(vec![record]);
        shape = ContentShape::plain_single();
    } else {
        return Err(Error::MissingRequiredInput {
            key: "docs or image".to_string(),
        });
    }

    Ok((envelope, shape))
}

pub(crate) fn unbox(records: Vec<Record>, shape: ContentShape) -> Result<ImageOutput> {
    if shape.is_structured() {
        return Ok(ImageOutput::Records(records));
    }
    unbox_generated_images(records)
}
