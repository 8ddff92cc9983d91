//! End-to-end tests against a stubbed inference service.
//!
//! A mockito server stands in for the identity service, the model
//! discovery service and the serving endpoint at once: discovery answers
//! with an http endpoint pointing back at the same server.

use inference_client::{
    CaptionOutput, CaptionRequest, Client, EncodeOutput, EncodeRequest, Error, GenerateOutput,
    GenerateRequest, MatchContent, RankOutput, RankRequest, RawValue, Settings, UpscaleOutput,
    UpscaleRequest,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

// 1x1 transparent PNG
const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const TOKEN: &str = "secret-token";

fn png_data_uri() -> String {
    format!("data:image/png;base64,{PNG_B64}")
}

fn settings_for(server: &ServerGuard) -> Settings {
    Settings::from_env().with_api_endpoint(server.url())
}

/// Mount the identity and discovery routes every full-flow test needs.
async fn mount_control_plane(server: &mut ServerGuard, model_name: &str) -> (mockito::Mock, mockito::Mock) {
    let validate = server
        .mock("GET", "/token/validate")
        .match_header("authorization", TOKEN)
        .with_status(200)
        .create_async()
        .await;
    let discovery = server
        .mock("GET", "/models/")
        .match_query(Matcher::UrlEncoded(
            "model_name".into(),
            model_name.into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "endpoints": {
                    "grpc": "grpcs://gateway.internal:2096",
                    "http": server.url(),
                },
                "image_size": 224
            })
            .to_string(),
        )
        .create_async()
        .await;
    (validate, discovery)
}

#[tokio::test]
async fn encode_text_list_round_trip() {
    let mut server = Server::new_async().await;
    let (_validate, _discovery) = mount_control_plane(&mut server, "clip-vit").await;

    let post = server
        .mock("POST", "/post")
        .match_header("authorization", TOKEN)
        .match_body(Matcher::PartialJson(json!({
            "exec_endpoint": "/encode",
            "parameters": { "drop_image_content": true },
            "results_in_order": true,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": [
                    { "text": "hello world", "embedding": vec![0.1f32; 512] },
                    { "text": "hello there", "embedding": vec![0.2f32; 512] },
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .settings(settings_for(&server))
        .build()
        .await
        .expect("client");
    let model = client.get_model("clip-vit").await.expect("model");

    let output = model
        .encode(
            EncodeRequest::new()
                .text(vec!["hello world", "hello there"])
                .batch_size(8),
        )
        .await
        .expect("encode");

    match output {
        EncodeOutput::Embeddings(vectors) => {
            assert_eq!(vectors.len(), 2);
            assert_eq!(vectors[0].len(), 512);
            assert_eq!(vectors[1].len(), 512);
            assert_eq!(vectors[1][0], 0.2);
        }
        other => panic!("unexpected output: {other:?}"),
    }
    post.assert_async().await;
}

#[tokio::test]
async fn encode_single_text_returns_one_vector() {
    let mut server = Server::new_async().await;
    let (_validate, _discovery) = mount_control_plane(&mut server, "clip-vit").await;
    let _post = server
        .mock("POST", "/post")
        .with_status(200)
        .with_body(json!({ "data": [ { "embedding": vec![0.5f32; 64] } ] }).to_string())
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .settings(settings_for(&server))
        .build()
        .await
        .expect("client");
    let model = client.get_model("clip-vit").await.expect("model");

    let output = model
        .encode(EncodeRequest::new().text("hello world"))
        .await
        .expect("encode");
    assert_eq!(output, EncodeOutput::Embedding(vec![0.5; 64]));
}

#[tokio::test]
async fn batches_are_submitted_in_chunks() {
    let mut server = Server::new_async().await;
    let post = server
        .mock("POST", "/post")
        .with_status(200)
        .with_body(json!({ "data": [ { "embedding": vec![1.0f32; 8] } ] }).to_string())
        .expect(2)
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .host(server.url())
        .settings(settings_for(&server))
        .build()
        .await
        .expect("client");
    let model = client.get_model("clip-vit").await.expect("model");

    let output = model
        .encode(EncodeRequest::new().text(vec!["a", "b"]).batch_size(1))
        .await
        .expect("encode");
    match output {
        EncodeOutput::Embeddings(vectors) => assert_eq!(vectors.len(), 2),
        other => panic!("unexpected output: {other:?}"),
    }
    post.assert_async().await;
}

#[tokio::test]
async fn caption_image_returns_plain_string() {
    let mut server = Server::new_async().await;
    let (_validate, _discovery) = mount_control_plane(&mut server, "blip2").await;
    let _post = server
        .mock("POST", "/post")
        .match_body(Matcher::PartialJson(json!({ "exec_endpoint": "/caption" })))
        .with_status(200)
        .with_body(json!({ "data": [ { "tags": { "response": "a nice photo" } } ] }).to_string())
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .settings(settings_for(&server))
        .build()
        .await
        .expect("client");
    let model = client.get_model("blip2").await.expect("model");

    let output = model
        .caption(CaptionRequest::new().image(RawValue::uri(png_data_uri())))
        .await
        .expect("caption");
    assert_eq!(output, CaptionOutput::Text("a nice photo".to_string()));
}

#[tokio::test]
async fn rank_mirrors_server_order() {
    let mut server = Server::new_async().await;
    let (_validate, _discovery) = mount_control_plane(&mut server, "clip-vit").await;
    let _post = server
        .mock("POST", "/post")
        .match_body(Matcher::PartialJson(json!({ "exec_endpoint": "/rank" })))
        .with_status(200)
        .with_body(
            json!({
                "data": [{
                    "text": "a dog playing fetch",
                    "matches": [
                        { "text": "a dog", "scores": { "cosine": { "value": 0.92 } } },
                        { "text": "a wolf", "scores": { "cosine": { "value": 0.55 } } },
                        { "text": "a cat", "scores": { "cosine": { "value": 0.12 } } },
                    ]
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .settings(settings_for(&server))
        .build()
        .await
        .expect("client");
    let model = client.get_model("clip-vit").await.expect("model");

    let output = model
        .rank(
            RankRequest::new()
                .text("a dog playing fetch")
                .candidates(vec![
                    RawValue::from("a dog"),
                    RawValue::from("a wolf"),
                    RawValue::from("a cat"),
                ]),
        )
        .await
        .expect("rank");

    match output {
        RankOutput::Ranked(ranked) => {
            assert_eq!(ranked.len(), 3);
            assert_eq!(ranked[0].content, MatchContent::Text("a dog".into()));
            assert_eq!(ranked[2].content, MatchContent::Text("a cat".into()));
            assert!(ranked[0].scores["cosine"].value > ranked[2].scores["cosine"].value);
        }
        other => panic!("unexpected output: {other:?}"),
    }
}

#[tokio::test]
async fn generate_list_mirrors_prompt_count() {
    let mut server = Server::new_async().await;
    let _post = server
        .mock("POST", "/post")
        .match_body(Matcher::PartialJson(json!({ "exec_endpoint": "/generate" })))
        .with_status(200)
        .with_body(
            json!({
                "data": [
                    { "tags": { "generated_text": "first completion" } },
                    { "tags": { "generated_text": "second completion" } },
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .host(server.url())
        .build()
        .await
        .expect("client");
    let model = client.get_model("flan-t5").await.expect("model");

    let output = model
        .generate(
            GenerateRequest::new(vec!["tell me a story", "tell me another"])
                .max_new_tokens(32)
                .batch_size(2),
        )
        .await
        .expect("generate");
    assert_eq!(
        output,
        GenerateOutput::Texts(vec![
            "first completion".to_string(),
            "second completion".to_string()
        ])
    );
}

#[tokio::test]
async fn upscale_returns_bytes_and_saves_tagged_output() {
    let mut server = Server::new_async().await;
    let path = std::env::temp_dir().join(format!("upscaled-{}.png", uuid_suffix()));
    let _post = server
        .mock("POST", "/post")
        .match_body(Matcher::PartialJson(json!({
            "exec_endpoint": "/upscale",
            "parameters": { "scale": "600:800" },
        })))
        .with_status(200)
        .with_body(
            json!({
                "data": [{
                    "blob": PNG_B64,
                    "tags": { "output_path": path.to_string_lossy() }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .host(server.url())
        .build()
        .await
        .expect("client");
    let model = client.get_model("upscaler").await.expect("model");

    let output = model
        .upscale(
            UpscaleRequest::new()
                .image(RawValue::uri(png_data_uri()))
                .scale("600:800")
                .output_path(path.to_string_lossy()),
        )
        .await
        .expect("upscale");

    match output {
        UpscaleOutput::Image(blob) => assert_eq!(&blob[1..4], b"PNG"),
        other => panic!("unexpected output: {other:?}"),
    }
    let written = tokio::fs::read(&path).await.expect("saved image");
    assert_eq!(&written[1..4], b"PNG");
    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn invalid_token_surfaces_auth_error() {
    let mut server = Server::new_async().await;
    let _validate = server
        .mock("GET", "/token/validate")
        .with_status(401)
        .create_async()
        .await;

    let err = Client::builder()
        .token("expired")
        .settings(settings_for(&server))
        .build()
        .await
        .expect_err("must fail");
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn unknown_model_maps_to_model_not_found() {
    let mut server = Server::new_async().await;
    let _validate = server
        .mock("GET", "/token/validate")
        .with_status(200)
        .create_async()
        .await;
    let _discovery = server
        .mock("GET", "/models/")
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .settings(settings_for(&server))
        .build()
        .await
        .expect("client");
    let err = client.get_model("no-such-model").await.expect_err("must fail");
    match err {
        Error::ModelNotFound { model } => assert_eq!(model, "no-such-model"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn model_handles_and_specs_are_memoized() {
    let mut server = Server::new_async().await;
    let _validate = server
        .mock("GET", "/token/validate")
        .with_status(200)
        .create_async()
        .await;
    let discovery = server
        .mock("GET", "/models/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({ "endpoints": { "http": server.url() } }).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .settings(settings_for(&server))
        .build()
        .await
        .expect("client");
    let first = client.get_model("clip-vit").await.expect("model");
    let second = client.get_model("clip-vit").await.expect("model");
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    discovery.assert_async().await;
}

#[tokio::test]
async fn remote_failure_propagates_unmodified() {
    let mut server = Server::new_async().await;
    let _post = server
        .mock("POST", "/post")
        .with_status(500)
        .with_body("executor crashed")
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .host(server.url())
        .build()
        .await
        .expect("client");
    let model = client.get_model("clip-vit").await.expect("model");
    let err = model
        .encode(EncodeRequest::new().text("hello"))
        .await
        .expect_err("must fail");
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "executor crashed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_response_is_a_configuration_hint() {
    let mut server = Server::new_async().await;
    let _post = server
        .mock("POST", "/post")
        .with_status(200)
        .with_body(json!({ "data": [] }).to_string())
        .create_async()
        .await;

    let client = Client::builder()
        .token(TOKEN)
        .host(server.url())
        .build()
        .await
        .expect("client");
    let model = client.get_model("clip-vit").await.expect("model");
    let err = model
        .encode(EncodeRequest::new().text("hello"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, Error::EmptyResult { .. }));
}

fn uuid_suffix() -> String {
    // Filenames only need to avoid collisions between test runs.
    format!("{:x}", std::process::id())
}
