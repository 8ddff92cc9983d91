//! Task payload builders and result unboxers.
//!
//! One module per task. Each owns a typed request struct mirroring the
//! task's keyword contract, a payload builder producing a
//! [`RequestEnvelope`](crate::envelope::RequestEnvelope) plus the
//! [`ContentShape`](crate::envelope::ContentShape) needed to unbox the
//! response, and the unboxer itself.

use bytes::Bytes;
use futures::future;

use crate::content::{load_plain, MediaHint};
use crate::record::{RawValue, Record, Tensor};
use crate::{Error, Result};

pub mod caption;
pub mod encode;
pub mod generate;
pub mod image_to_image;
pub mod rank;
pub mod text_to_image;
pub mod upscale;
pub mod vqa;

/// A single value or an ordered list of values.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    /// Flatten into `(items, is_list)`.
    pub(crate) fn into_parts(self) -> (Vec<T>, bool) {
        match self {
            OneOrMany::One(item) => (vec![item], false),
            OneOrMany::Many(items) => (items, true),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

impl From<&str> for OneOrMany<String> {
    fn from(value: &str) -> Self {
        OneOrMany::One(value.to_string())
    }
}

impl From<Vec<&str>> for OneOrMany<String> {
    fn from(values: Vec<&str>) -> Self {
        OneOrMany::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Enforce that exactly one of the task's input modes is populated.
///
/// More than one present key is rejected before any network call; none at
/// all reports the alternatives the task accepts.
pub(crate) fn resolve_exclusive(keys: &[(&'static str, bool)]) -> Result<()> {
    let present: Vec<&str> = keys
        .iter()
        .filter(|(_, given)| *given)
        .map(|(name, _)| *name)
        .collect();
    match present.len() {
        1 => Ok(()),
        0 => Err(Error::MissingRequiredInput {
            key: keys
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(" or "),
        }),
        _ => Err(Error::AmbiguousInput {
            keys: present.join(", "),
        }),
    }
}

/// Load a batch of plain image values concurrently, preserving order and
/// reporting whether a list was given.
pub(crate) async fn load_image_values(
    values: OneOrMany<RawValue>,
) -> Result<(Vec<Record>, bool)> {
    let (items, is_list) = values.into_parts();
    let records = future::try_join_all(
        items
            .into_iter()
            .map(|value| load_plain(value, Some(MediaHint::Image))),
    )
    .await?;
    Ok((records, is_list))
}

/// First response record, or the empty-result error unboxers share.
pub(crate) fn first_record(records: &[Record]) -> Result<&Record> {
    records
        .first()
        .ok_or_else(|| Error::empty_result("service returned no records"))
}

/// The `response` tag carried by caption/vqa result records.
pub(crate) fn response_text(record: &Record) -> Result<String> {
    record
        .tag_str("response")
        .map(str::to_string)
        .ok_or_else(|| Error::empty_result("result record carries no `response` tag"))
}

/// A generated image payload: raw encoded bytes, or a latent tensor when
/// `output_type` asked for one.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    Blob(Bytes),
    Tensor(Tensor),
}

/// Output of the image-generating tasks, mirroring the input shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutput {
    /// Structured mode: the full response records.
    Records(Vec<Record>),
    Image(ImageData),
    Images(Vec<ImageData>),
}

/// Unbox the matches of the sole response record into image payloads; one
/// image collapses to a single value, several stay a list.
pub(crate) fn unbox_generated_images(records: Vec<Record>) -> Result<ImageOutput> {
    let first = first_record(&records)?;
    let matches = &first.matches;
    let lead = matches
        .first()
        .ok_or_else(|| Error::empty_result("no image found in the result"))?;
    let mut images = Vec::with_capacity(matches.len());
    if lead.blob.as_ref().is_some_and(|b| !b.is_empty()) {
        for m in matches {
            let blob = m
                .blob
                .clone()
                .ok_or_else(|| Error::empty_result("match record carries no image blob"))?;
            images.push(ImageData::Blob(blob));
        }
    } else if lead.tensor.is_some() {
        for m in matches {
            let tensor = m
                .tensor
                .clone()
                .ok_or_else(|| Error::empty_result("match record carries no tensor"))?;
            images.push(ImageData::Tensor(tensor));
        }
    } else {
        return Err(Error::empty_result("no image found in the result"));
    }
    if images.len() == 1 {
        // single image per prompt collapses to the bare value
        let image = images.remove(0);
        Ok(ImageOutput::Image(image))
    } else {
        Ok(ImageOutput::Images(images))
    }
}
