//! Loading caller inputs into wire-ready records.
//!
//! Two entry points: [`load_plain`] turns a single raw value (string, byte
//! blob or tensor) into a [`Record`], fetching image URIs eagerly;
//! [`normalize_records`] validates caller-supplied records and resolves any
//! pending URIs in place so every record is loadable before transmission.

use base64::Engine as _;
use bytes::Bytes;
use once_cell::sync::Lazy;
use url::Url;

use crate::record::{ContentKind, RawValue, Record};
use crate::{Error, Result};

/// Shared client for resolving content URIs.
static FETCH_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// How a string input should be interpreted by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaHint {
    Text,
    Image,
}

/// Load a plain input value into a record.
///
/// Strings classify by the hint first: an `Image` hint forces URI
/// resolution, a `Text` hint forces a text record, and without a hint the
/// media type is guessed from the string itself. Blobs and tensors wrap
/// verbatim.
pub async fn load_plain(value: RawValue, hint: Option<MediaHint>) -> Result<Record> {
    match value {
        RawValue::Text(s) => match hint {
            Some(MediaHint::Image) => resolve_uri_record(s).await,
            Some(MediaHint::Text) => Ok(Record::text(s)),
            None => match RawValue::classify(s) {
                RawValue::Uri(uri) => resolve_uri_record(uri).await,
                RawValue::Text(text) => Ok(Record::text(text)),
                // classify only produces Text or Uri
                other => Err(Error::unsupported(format!("unexpected value {other:?}"))),
            },
        },
        RawValue::Uri(uri) => resolve_uri_record(uri).await,
        RawValue::Blob(blob) => Ok(Record::blob(blob)),
        RawValue::Tensor(tensor) => Ok(Record::tensor(tensor)),
    }
}

/// Validate and normalize caller-supplied records, preserving order.
///
/// Records that already carry text, blob or tensor content pass through
/// untouched; records with a URI but no blob are resolved in place; records
/// with no loadable content fail with [`Error::UnsupportedContentType`].
pub async fn normalize_records(records: Vec<Record>) -> Result<Vec<Record>> {
    let mut out = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match record.content_kind() {
            ContentKind::Text | ContentKind::Blob | ContentKind::Tensor => out.push(record),
            ContentKind::UriPending => {
                let mut record = record;
                if let Some(uri) = record.uri.clone() {
                    record.blob = Some(fetch_uri(&uri).await?);
                }
                out.push(record);
            }
            ContentKind::Empty => {
                return Err(Error::unsupported(format!(
                    "record at index {index} carries no text, blob, tensor or uri"
                )));
            }
        }
    }
    Ok(out)
}

async fn resolve_uri_record(uri: String) -> Result<Record> {
    let blob = fetch_uri(&uri).await?;
    Ok(Record::from_uri(uri).with_blob(blob))
}

/// Fetch the bytes behind a content URI.
///
/// Supports `http(s)` URLs, `data:` URIs, `file:` URLs and bare filesystem
/// paths. Failures propagate as [`Error::UriFetch`].
pub(crate) async fn fetch_uri(uri: &str) -> Result<Bytes> {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            let response = FETCH_CLIENT.get(url).send().await.map_err(|e| fetch_err(uri, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::UriFetch {
                    uri: uri.to_string(),
                    message: format!("HTTP {status}"),
                });
            }
            response.bytes().await.map_err(|e| fetch_err(uri, e))
        }
        Ok(url) if url.scheme() == "data" => decode_data_uri(uri),
        Ok(url) if url.scheme() == "file" => {
            let path = url.to_file_path().map_err(|_| Error::UriFetch {
                uri: uri.to_string(),
                message: "not a valid file path".to_string(),
            })?;
            tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| fetch_err(uri, e))
        }
        Ok(url) => Err(Error::UriFetch {
            uri: uri.to_string(),
            message: format!("unsupported scheme `{}`", url.scheme()),
        }),
        // Relative references parse as errors; treat them as local paths.
        Err(_) => tokio::fs::read(uri)
            .await
            .map(Bytes::from)
            .map_err(|e| fetch_err(uri, e)),
    }
}

fn decode_data_uri(uri: &str) -> Result<Bytes> {
    let payload = uri.strip_prefix("data:").unwrap_or(uri);
    let (meta, data) = payload.split_once(',').ok_or_else(|| Error::UriFetch {
        uri: uri.to_string(),
        message: "malformed data URI".to_string(),
    })?;
    if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map(Bytes::from)
            .map_err(|e| Error::UriFetch {
                uri: uri.to_string(),
                message: format!("invalid base64 payload: {e}"),
            })
    } else {
        Ok(Bytes::copy_from_slice(data.as_bytes()))
    }
}

fn fetch_err(uri: &str, err: impl std::fmt::Display) -> Error {
    Error::UriFetch {
        uri: uri.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Tensor;

    // 1x1 transparent PNG
    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[tokio::test]
    async fn plain_text_without_hint_stays_text() {
        let record = load_plain(RawValue::from("hello world"), None)
            .await
            .expect("load");
        assert_eq!(record.text.as_deref(), Some("hello world"));
        assert_eq!(record.content_kind(), ContentKind::Text);
    }

    #[tokio::test]
    async fn text_hint_never_fetches() {
        let record = load_plain(RawValue::from("cat.png"), Some(MediaHint::Text))
            .await
            .expect("load");
        assert_eq!(record.text.as_deref(), Some("cat.png"));
    }

    #[tokio::test]
    async fn data_uri_resolves_to_blob() {
        let uri = format!("data:image/png;base64,{PNG_B64}");
        let record = load_plain(RawValue::from(uri.as_str()), Some(MediaHint::Image))
            .await
            .expect("load");
        assert_eq!(record.content_kind(), ContentKind::Blob);
        assert_eq!(record.uri.as_deref(), Some(uri.as_str()));
        let blob = record.blob.expect("blob");
        assert_eq!(&blob[1..4], b"PNG");
    }

    #[tokio::test]
    async fn blob_and_tensor_wrap_verbatim() {
        let blob = load_plain(RawValue::from(vec![7u8, 8, 9]), None)
            .await
            .expect("load");
        assert_eq!(blob.blob.as_deref(), Some(&[7u8, 8, 9][..]));

        let tensor = load_plain(RawValue::from(Tensor::from_vec(vec![1.0, 2.0])), None)
            .await
            .expect("load");
        assert_eq!(tensor.tensor.expect("tensor").shape, vec![2]);
    }

    #[tokio::test]
    async fn normalize_passes_loaded_records_unchanged() {
        let input = vec![
            Record::text("hello"),
            Record::blob(vec![1u8, 2, 3]),
            Record::tensor(Tensor::from_vec(vec![0.1, 0.2])),
        ];
        let output = normalize_records(input.clone()).await.expect("normalize");
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn normalize_resolves_pending_uris() {
        let uri = format!("data:image/png;base64,{PNG_B64}");
        let output = normalize_records(vec![Record::from_uri(uri)])
            .await
            .expect("normalize");
        assert_eq!(output[0].content_kind(), ContentKind::Blob);
    }

    #[tokio::test]
    async fn normalize_rejects_empty_records() {
        let err = normalize_records(vec![Record::text("ok"), Record::default()])
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::UnsupportedContentType { .. }));
        assert!(err.to_string().contains("index 1"));
    }

    #[tokio::test]
    async fn unreachable_uri_propagates() {
        let err = fetch_uri("file:///definitely/not/here.png")
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::UriFetch { .. }));
    }
}
