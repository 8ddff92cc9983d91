//! # inference-client
//!
//! A Rust client for models hosted on the inference cloud: embeddings,
//! captioning, candidate ranking, visual question answering, text
//! generation, and image generation/upscaling through one typed API.
//!
//! ## Overview
//!
//! The crate is a request/response adapter. Heterogeneous caller inputs —
//! plain strings, byte blobs, tensors, or structured [`Record`]s — are
//! normalized into a uniform wire representation, sent as one logical
//! request, and the structured response is unboxed back into the shape the
//! caller supplied (scalar vs list, plain value vs record).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inference_client::{Client, EncodeRequest};
//!
//! #[tokio::main]
//! async fn main() -> inference_client::Result<()> {
//!     let client = Client::new("<your auth token>").await?;
//!     let model = client.get_model("ViT-B-32::openai").await?;
//!
//!     let embeddings = model
//!         .encode(EncodeRequest::new().text(vec!["hello world", "hello there"]))
//!         .await?;
//!     println!("{embeddings:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client facade with memoized model handles |
//! | [`model`] | Per-task methods bound to one model endpoint |
//! | [`tasks`] | Payload builders and result unboxers, one module per task |
//! | [`record`] | Canonical content records and raw-value classification |
//! | [`content`] | Content loading and record normalization |
//! | [`envelope`] | Request envelopes and content-shape bookkeeping |
//! | [`transport`] | Transport seam and the HTTP implementation |
//! | [`auth`] | Token resolution and validation |
//! | [`discovery`] | Model discovery with a bounded spec cache |
//! | [`config`] | Settings and logging setup |

pub mod auth;
pub mod client;
pub mod config;
pub mod content;
pub mod discovery;
pub mod envelope;
pub mod error;
pub mod model;
pub mod record;
pub mod tasks;
pub mod transport;

// Re-export main types for convenience
pub use client::{Client, ClientBuilder};
pub use config::Settings;
pub use envelope::{Cardinality, ContentShape, RequestEnvelope, ShapeMode};
pub use model::{Model, TaskCall};
pub use record::{NamedScore, RawValue, Record, Tensor};
pub use tasks::caption::{CaptionOutput, CaptionRequest};
pub use tasks::encode::{EncodeOutput, EncodeRequest};
pub use tasks::generate::{GenerateOutput, GenerateRequest};
pub use tasks::image_to_image::ImageToImageRequest;
pub use tasks::rank::{MatchContent, RankOutput, RankRequest, RankedMatch};
pub use tasks::text_to_image::TextToImageRequest;
pub use tasks::upscale::{UpscaleOutput, UpscaleRequest};
pub use tasks::vqa::{VqaOutput, VqaRequest};
pub use tasks::{ImageData, ImageOutput, OneOrMany};
pub use transport::{CallHooks, HttpTransport, Transport};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
