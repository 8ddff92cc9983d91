//! Model facade: one method per inference task.
//!
//! A [`Model`] binds a model name, an auth token and a transport endpoint.
//! Every task method is the same thin composition: build the payload,
//! post it, unbox the response into the shape the caller supplied.

use std::sync::Arc;

use crate::envelope::{ContentShape, RequestEnvelope};
use crate::tasks::caption::{self, CaptionOutput, CaptionRequest};
use crate::tasks::encode::{self, EncodeOutput, EncodeRequest};
use crate::tasks::generate::{self, GenerateOutput, GenerateRequest};
use crate::tasks::image_to_image::{self, ImageToImageRequest};
use crate::tasks::rank::{self, RankOutput, RankRequest};
use crate::tasks::text_to_image::{self, TextToImageRequest};
use crate::tasks::upscale::{self, UpscaleOutput, UpscaleRequest};
use crate::tasks::vqa::{self, VqaOutput, VqaRequest};
use crate::tasks::ImageOutput;
use crate::transport::{post_detached, CallHooks, Transport};
use crate::Result;

/// A model bound to its serving endpoint.
pub struct Model {
    model_name: String,
    token: Option<String>,
    transport: Arc<dyn Transport>,
}

/// One call against any task, used for hook-mode dispatch.
#[derive(Debug, Clone)]
pub enum TaskCall {
    Encode(EncodeRequest),
    Caption(CaptionRequest),
    Rank(RankRequest),
    Vqa(VqaRequest),
    Generate(GenerateRequest),
    TextToImage(TextToImageRequest),
    ImageToImage(ImageToImageRequest),
    Upscale(UpscaleRequest),
}

impl Model {
    pub(crate) fn new(
        model_name: impl Into<String>,
        token: Option<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            token,
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    /// Encode text, images or records into embeddings.
    pub async fn encode(&self, request: EncodeRequest) -> Result<EncodeOutput> {
        let (envelope, shape) = encode::build_payload(request, self.token.as_deref()).await?;
        let records = self.post(&envelope).await?;
        encode::unbox(records, shape)
    }

    /// Caption an image or a set of records.
    pub async fn caption(&self, request: CaptionRequest) -> Result<CaptionOutput> {
        let (envelope, shape) = caption::build_payload(request, self.token.as_deref()).await?;
        let records = self.post(&envelope).await?;
        caption::unbox(records, shape)
    }

    /// Rank candidates against a reference.
    pub async fn rank(&self, request: RankRequest) -> Result<RankOutput> {
        let (envelope, shape) = rank::build_payload(request, self.token.as_deref()).await?;
        let records = self.post(&envelope).await?;
        rank::unbox(records, shape)
    }

    /// Answer a question about an image.
    pub async fn vqa(&self, request: VqaRequest) -> Result<VqaOutput> {
        let (envelope, shape) = vqa::build_payload(request, self.token.as_deref()).await?;
        let records = self.post(&envelope).await?;
        vqa::unbox(records, shape)
    }

    /// Generate text from one or more prompts.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateOutput> {
        let (envelope, shape) = generate::build_payload(request, self.token.as_deref()).await?;
        let records = self.post(&envelope).await?;
        generate::unbox(records, shape)
    }

    /// Generate an image from a prompt.
    pub async fn text_to_image(&self, request: TextToImageRequest) -> Result<ImageOutput> {
        let (envelope, shape) =
            text_to_image::build_payload(request, self.token.as_deref()).await?;
        let records = self.post(&envelope).await?;
        text_to_image::unbox(records, shape)
    }

    /// Transform a base image under a prompt.
    pub async fn image_to_image(&self, request: ImageToImageRequest) -> Result<ImageOutput> {
        let (envelope, shape) =
            image_to_image::build_payload(request, self.token.as_deref()).await?;
        let records = self.post(&envelope).await?;
        image_to_image::unbox(records, shape)
    }

    /// Upscale an image; results tagged with `output_path` are written to
    /// disk before the call returns.
    pub async fn upscale(&self, request: UpscaleRequest) -> Result<UpscaleOutput> {
        let (envelope, shape) = upscale::build_payload(request, self.token.as_deref()).await?;
        let records = self.post(&envelope).await?;
        upscale::save_tagged_outputs(&records).await?;
        upscale::unbox(records, shape)
    }

    /// Dispatch a call in hook mode: returns immediately, and the raw
    /// response records (or the failure) arrive through the hooks.
    pub fn dispatch(&self, call: TaskCall, hooks: CallHooks) {
        let transport = Arc::clone(&self.transport);
        let token = self.token.clone();
        tokio::spawn(async move {
            match build_call(call, token.as_deref()).await {
                Ok((envelope, _shape)) => post_detached(transport, envelope, hooks),
                Err(error) => hooks.fail(error),
            }
        });
    }

    async fn post(&self, envelope: &RequestEnvelope) -> Result<Vec<crate::record::Record>> {
        tracing::debug!(
            model = %self.model_name,
            endpoint = %envelope.endpoint,
            records = envelope.records.len(),
            "posting request"
        );
        self.transport.post(envelope).await
    }
}

async fn build_call(
    call: TaskCall,
    token: Option<&str>,
) -> Result<(RequestEnvelope, ContentShape)> {
    match call {
        TaskCall::Encode(request) => encode::build_payload(request, token).await,
        TaskCall::Caption(request) => caption::build_payload(request, token).await,
        TaskCall::Rank(request) => rank::build_payload(request, token).await,
        TaskCall::Vqa(request) => vqa::build_payload(request, token).await,
        TaskCall::Generate(request) => generate::build_payload(request, token).await,
        TaskCall::TextToImage(request) => text_to_image::build_payload(request, token).await,
        TaskCall::ImageToImage(request) => image_to_image::build_payload(request, token).await,
        TaskCall::Upscale(request) => upscale::build_payload(request, token).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Transport stub echoing canned records and counting calls.
    struct StubTransport {
        responses: Mutex<Vec<Vec<Record>>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn new(responses: Vec<Vec<Record>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn post(&self, envelope: &RequestEnvelope) -> Result<Vec<Record>> {
            self.calls
                .lock()
                .expect("lock")
                .push(envelope.endpoint.clone());
            Ok(self.responses.lock().expect("lock").remove(0))
        }
    }

    #[tokio::test]
    async fn encode_composes_build_post_unbox() {
        let response = vec![Record {
            embedding: Some(vec![0.25; 8]),
            ..Record::default()
        }];
        let transport = StubTransport::new(vec![response]);
        let model = Model::new("clip-vit", Some("tok".into()), transport.clone());
        let out = model
            .encode(EncodeRequest::new().text("hello"))
            .await
            .expect("encode");
        assert_eq!(out, EncodeOutput::Embedding(vec![0.25; 8]));
        assert_eq!(*transport.calls.lock().expect("lock"), vec!["/encode"]);
    }

    #[tokio::test]
    async fn ambiguous_input_never_reaches_transport() {
        let transport = StubTransport::new(vec![]);
        let model = Model::new("clip-vit", None, transport.clone());
        let err = model
            .encode(
                EncodeRequest::new()
                    .text("hello")
                    .image(crate::record::RawValue::from(vec![1u8])),
            )
            .await
            .expect_err("must fail");
        assert!(matches!(err, crate::Error::AmbiguousInput { .. }));
        assert!(transport.calls.lock().expect("lock").is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dispatch_drives_hooks() {
        let response = vec![Record::default().with_tag("response", "a nice photo")];
        let transport = StubTransport::new(vec![response]);
        let model = Model::new("blip", None, transport);
        let (tx, rx) = std::sync::mpsc::channel();
        let always_tx = tx.clone();
        model.dispatch(
            TaskCall::Caption(CaptionRequest::new().image(crate::record::RawValue::from(vec![1u8]))),
            CallHooks::new()
                .on_done(move |records| {
                    tx.send(format!("done:{}", records.len())).ok();
                })
                .on_always(move || {
                    always_tx.send("always".to_string()).ok();
                }),
        );
        let mut seen: Vec<String> = Vec::new();
        for _ in 0..2 {
            seen.push(
                rx.recv_timeout(std::time::Duration::from_secs(5))
                    .expect("hook fired"),
            );
        }
        assert_eq!(seen, vec!["done:1", "always"]);
    }
}
