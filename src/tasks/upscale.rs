//! Upscale task: enlarge an image, optionally to an exact output size.
//!
//! The `scale` parameter is a `"width:height"` string interpreted by the
//! service (zero keeps an axis, a negative value derives the axis from the
//! aspect ratio rounded up to a multiple of its magnitude). The client only
//! validates that both components parse as integers before sending.

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::content::{load_plain, normalize_records, MediaHint};
use crate::envelope::{ContentShape, RequestEnvelope};
use crate::record::{RawValue, Record};
use crate::tasks::{first_record, resolve_exclusive};
use crate::{Error, Result};

const ENDPOINT: &str = "/upscale";

/// Input contract of [`Model::upscale`](crate::model::Model::upscale).
#[derive(Debug, Clone, Default)]
pub struct UpscaleRequest {
    docs: Option<Vec<Record>>,
    image: Option<RawValue>,
    scale: Option<String>,
    quality: Option<u32>,
    image_format: Option<String>,
    output_path: Option<String>,
    batch_size: Option<usize>,
    parameters: Option<Map<String, Value>>,
}

impl UpscaleRequest {
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

    /// Target output size as `"width:height"`.
    pub fn scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = Some(scale.into());
        self
    }

    /// JPEG encoding quality, 1-100.
    pub fn quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Output encoding of the upscaled image (`jpeg` by default).
    pub fn image_format(mut self, format: impl Into<String>) -> Self {
        self.image_format = Some(format.into());
        self
    }

    /// Write the upscaled image to this path once the call returns.
    pub fn output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
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
pub enum UpscaleOutput {
    Records(Vec<Record>),
    /// Plain mode: the encoded bytes of the upscaled image.
    Image(Bytes),
}

/// Check that a scale string is two `:`-separated integers.
pub(crate) fn validate_scale(scale: &str) -> Result<()> {
    let fields: Vec<&str> = scale.split(':').collect();
    if fields.len() != 2 {
        return Err(Error::InvalidScaleFormat {
            given: scale.to_string(),
            reason: "scale should be in the format `width:height`".to_string(),
        });
    }
    if fields.iter().any(|f| f.parse::<i64>().is_err()) {
        return Err(Error::InvalidScaleFormat {
            given: scale.to_string(),
            reason: "both width and height should be integers".to_string(),
        });
    }
    Ok(())
}

fn validate_quality(quality: u32, image_format: Option<&str>) -> Result<()> {
    if !(1..=100).contains(&quality) {
        return Err(Error::InvalidQualityValue {
            given: quality.to_string(),
            reason: "quality should be between 1 and 100".to_string(),
        });
    }
    if let Some(format) = image_format {
        if !format.eq_ignore_ascii_case("jpeg") && !format.eq_ignore_ascii_case("jpg") {
            return Err(Error::InvalidQualityValue {
                given: quality.to_string(),
                reason: format!("quality only applies to jpeg output, not `{format}`"),
            });
        }
    }
    Ok(())
}

pub(crate) async fn build_payload(
    request: UpscaleRequest,
    token: Option<&str>,
) -> Result<(RequestEnvelope, ContentShape)> {
    resolve_exclusive(&[
        ("docs", request.docs.is_some()),
        ("image", request.image.is_some()),
    ])?;
    if let Some(scale) = &request.scale {
        validate_scale(scale)?;
    }
    if let Some(quality) = request.quality {
        validate_quality(quality, request.image_format.as_deref())?;
    }

    let mut envelope = RequestEnvelope::new(ENDPOINT, token);
    if let Some(batch_size) = request.batch_size {
        envelope = envelope.with_batch_size(batch_size);
    }
    if let Some(parameters) = request.parameters {
        envelope = envelope.with_parameters(parameters);
    }
    if let Some(scale) = request.scale {
        envelope = envelope.with_parameter("scale", scale);
    }
    if let Some(quality) = request.quality {
        envelope = envelope.with_parameter("quality", quality);
    }

    let shape;
    if let Some(docs) = request.docs {
        envelope = envelope.with_records(normalize_records(docs).await?);
        shape = ContentShape::structured();
    } else if let Some(image) = request.image {
        let mut record = load_plain(image, Some(MediaHint::Image)).await?;
        if let Some(format) = request.image_format {
            record = record.with_tag("image_format", format);
        }
        if let Some(path) = request.output_path {
            record = record.with_tag("output_path", path);
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

pub(crate) fn unbox(records: Vec<Record>, shape: ContentShape) -> Result<UpscaleOutput> {
    if shape.is_structured() {
        return Ok(UpscaleOutput::Records(records));
    }
    let record = first_record(&records)?;
    let blob = record
        .blob
        .clone()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| Error::empty_result("no upscaled image in the result"))?;
    Ok(UpscaleOutput::Image(blob))
}

/// Write every result blob whose tags name an `output_path` to disk.
pub(crate) async fn save_tagged_outputs(records: &[Record]) -> Result<()> {
    for record in records {
        if let (Some(path), Some(blob)) = (record.tag_str("output_path"), &record.blob) {
            tokio::fs::write(path, blob).await?;
            tracing::debug!(path, bytes = blob.len(), "saved upscaled image");
        }
    }
    Ok(())
}
