//! HTTP contract tests for provider clients.

use std::time::Duration;

use studio_models::ProviderHandle;
use studio_providers::{
    AvatarVideoGenerator, AvatarVideoRequest, CaptionEditor, CaptionRequest, ElevenLabsClient,
    ElevenLabsConfig, HeyGenClient, HeyGenConfig, ImageGenerator, ImageRequest, OpenAiClient,
    OpenAiConfig, ProviderConfig, ProviderErrorKind, ProviderResponse, SpeechRequest,
    SpeechSynthesizer, SubmagicClient, SubmagicConfig, TextGenerator, TextRequest,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> ProviderConfig {
    ProviderConfig::new(server.uri(), "test-key").with_timeout(Duration::from_secs(5))
}

fn avatar_request() -> AvatarVideoRequest {
    AvatarVideoRequest {
        title: "Weekly news".into(),
        script: "Hello there".into(),
        avatar_id: "avatar-1".into(),
        voice_id: "voice-1".into(),
        callback_id: "output:out-1".into(),
    }
}

#[tokio::test]
async fn openai_completion_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"ok\":true}" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(OpenAiConfig::new(provider(&server))).unwrap();
    let response = client
        .complete(&TextRequest::new("system", "prompt").json())
        .await
        .unwrap();

    assert_eq!(response, ProviderResponse::Sync("{\"ok\":true}".to_string()));
}

#[tokio::test]
async fn openai_rate_limit_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": { "message": "Rate limit reached" }
        })))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(OpenAiConfig::new(provider(&server))).unwrap();
    let err = client
        .complete(&TextRequest::new("system", "prompt"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ProviderErrorKind::RateLimited);
    assert!(err.is_retryable());
    assert!(err.message.contains("Rate limit reached"));
}

#[tokio::test]
async fn openai_image_is_decoded_from_base64() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "b64_json": "aGVsbG8=" }]
        })))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(OpenAiConfig::new(provider(&server))).unwrap();
    let image = client
        .generate_image(&ImageRequest::landscape("a cat"))
        .await
        .unwrap()
        .into_sync("openai")
        .unwrap();

    assert_eq!(image.bytes, b"hello");
}

#[tokio::test]
async fn elevenlabs_returns_audio_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-1"))
        .and(header("xi-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
        .mount(&server)
        .await;

    let client = ElevenLabsClient::new(ElevenLabsConfig::new(provider(&server))).unwrap();
    let audio = client
        .synthesize(&SpeechRequest {
            text: "Hi".into(),
            voice_id: "voice-1".into(),
        })
        .await
        .unwrap()
        .into_sync("elevenlabs")
        .unwrap();

    assert_eq!(audio.bytes, vec![1, 2, 3]);
    assert_eq!(audio.content_type, "audio/mpeg");
}

#[tokio::test]
async fn elevenlabs_auth_failure_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = ElevenLabsClient::new(ElevenLabsConfig::new(provider(&server))).unwrap();
    let err = client
        .synthesize(&SpeechRequest {
            text: "Hi".into(),
            voice_id: "voice-1".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ProviderErrorKind::Unauthorized);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn heygen_returns_avatar_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/video/generate"))
        .and(header("x-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({ "callback_id": "output:out-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": null,
            "data": { "video_id": "hg-123" }
        })))
        .mount(&server)
        .await;

    let client = HeyGenClient::new(HeyGenConfig::new(provider(&server))).unwrap();
    let handle = client
        .submit(&avatar_request())
        .await
        .unwrap()
        .into_handle("heygen")
        .unwrap();

    assert_eq!(handle, ProviderHandle::AvatarVideo("hg-123".into()));
}

#[tokio::test]
async fn heygen_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = HeyGenClient::new(HeyGenConfig::new(provider(&server))).unwrap();
    let err = client.submit(&avatar_request()).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Unavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn submagic_accepts_id_or_project_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/projects"))
        .and(header("x-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "videoUrl": "https://cdn/raw.mp4",
            "webhookUrl": "https://studio/webhooks/submagic"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "projectId": "sm-42",
            "status": "processing"
        })))
        .mount(&server)
        .await;

    let client = SubmagicClient::new(SubmagicConfig::new(provider(&server))).unwrap();
    let handle = client
        .submit(&CaptionRequest {
            title: "Weekly news".into(),
            video_url: "https://cdn/raw.mp4".into(),
            template: "Hormozi 2".into(),
            language: "en".into(),
            webhook_url: "https://studio/webhooks/submagic".into(),
        })
        .await
        .unwrap()
        .into_handle("submagic")
        .unwrap();

    assert_eq!(handle, ProviderHandle::CaptionProject("sm-42".into()));
}

#[tokio::test]
async fn missing_api_key_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(server.uri(), "");
    let client = HeyGenClient::new(HeyGenConfig::new(config)).unwrap();
    let err = client.submit(&avatar_request()).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Unauthorized);
}
