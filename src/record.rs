//! Canonical content records exchanged with the inference service.
//!
//! A [`Record`] is the single unit of content for every task: requests carry
//! text, image bytes or tensors (plus task tags such as prompts), responses
//! carry embeddings, generated text tags, scored matches or image blobs.

use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dense row-major numeric array standing in for framework tensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// One-dimensional tensor over the given values.
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A named score attached to a result record or one of its matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedScore {
    pub value: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_name: Option<String>,
}

impl NamedScore {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            op_name: None,
        }
    }
}

/// Which content representation a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Blob,
    Tensor,
    /// Carries a URI that must be resolved to a blob before transmission.
    UriPending,
    Empty,
}

/// Canonical content unit sent to and received from the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "blob_b64")]
    pub blob: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensor: Option<Tensor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub tags: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<Record>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: BTreeMap<String, NamedScore>,
}

impl Record {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn blob(blob: impl Into<Bytes>) -> Self {
        Self {
            blob: Some(blob.into()),
            ..Self::default()
        }
    }

    pub fn tensor(tensor: Tensor) -> Self {
        Self {
            tensor: Some(tensor),
            ..Self::default()
        }
    }

    /// A record whose content is still a URI; it must be resolved to a blob
    /// before it is wire-ready.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn with_blob(mut self, blob: impl Into<Bytes>) -> Self {
        self.blob = Some(blob.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_matches(mut self, matches: Vec<Record>) -> Self {
        self.matches = matches;
        self
    }

    pub fn tag(&self, key: &str) -> Option<&serde_json::Value> {
        self.tags.get(key)
    }

    pub fn tag_str(&self, key: &str) -> Option<&str> {
        self.tags.get(key).and_then(|v| v.as_str())
    }

    /// The effective content representation, in wire-priority order.
    pub fn content_kind(&self) -> ContentKind {
        if self.text.is_some() {
            ContentKind::Text
        } else if self.blob.is_some() {
            ContentKind::Blob
        } else if self.tensor.is_some() {
            ContentKind::Tensor
        } else if self.uri.is_some() {
            ContentKind::UriPending
        } else {
            ContentKind::Empty
        }
    }
}

/// Closed variant set for plain (non-record) caller inputs.
///
/// Strings classify into [`RawValue::Text`] or [`RawValue::Uri`] by guessing
/// the media type from the string itself; byte blobs and tensors are wrapped
/// verbatim by the content loader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Uri(String),
    Blob(Bytes),
    Tensor(Tensor),
}

impl RawValue {
    /// Classify a string input: image-typed URIs load as images, everything
    /// else is treated as text.
    pub fn classify(value: impl Into<String>) -> Self {
        let value = value.into();
        if is_image_uri(&value) {
            RawValue::Uri(value)
        } else {
            RawValue::Text(value)
        }
    }

    pub fn uri(value: impl Into<String>) -> Self {
        RawValue::Uri(value.into())
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(value: Vec<u8>) -> Self {
        RawValue::Blob(Bytes::from(value))
    }
}

impl From<Bytes> for RawValue {
    fn from(value: Bytes) -> Self {
        RawValue::Blob(value)
    }
}

impl From<Tensor> for RawValue {
    fn from(value: Tensor) -> Self {
        RawValue::Tensor(value)
    }
}

/// Guess whether a string points at an image by its extension, ignoring any
/// query string or fragment.
pub(crate) fn is_image_uri(value: &str) -> bool {
    if value.starts_with("data:image/") {
        return true;
    }
    let path = value.split(['?', '#']).next().unwrap_or(value);
    let ext = match path.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return false,
    };
    matches!(
        ext.as_str(),
        "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" | "tif" | "tiff" | "ico"
    )
}

mod blob_b64 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(blob: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match blob {
            Some(bytes) => serializer
                .serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Bytes>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(s) => base64::engine::general_purpose::STANDARD
                .decode(s.as_bytes())
                .map(|b| Some(Bytes::from(b)))
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
