//! Router over an in-memory pipeline, with fake providers and minted tokens.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;
use studio_api::auth::SupabaseClaims;
use studio_api::{create_router, ApiConfig, AppState};
use studio_media::{CompositeOutput, CompositeSpec, Compositor, MediaResult};
use studio_models::{Membership, Organization, ProviderHandle, Role};
use studio_pipeline::{PipelineContext, Providers};
use studio_providers::{
    AvatarVideoGenerator, AvatarVideoRequest, CaptionEditor, CaptionRequest, GeneratedImage,
    ImageGenerator, ImageRequest, ProviderResponse, ProviderResult, SpeechRequest,
    SpeechSynthesizer, SynthesizedAudio, TextGenerator, TextRequest, Transcriber, Transcript,
    TranscriptionRequest,
};
use studio_queue::{
    Backoff, DeadLetter, Delivery, EnqueueReceipt, FailOutcome, JobQueue, MemoryJobQueue,
    QueueError, QueueJob, QueueResult,
};
use studio_storage::MemoryObjectStore;
use studio_store::{MemoryStore, Store};
use studio_worker::{JobExecutor, WorkerConfig};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const HEYGEN_SECRET: &str = "test-heygen-secret";

pub const OWNER: &str = "owner-1";
pub const MEMBER: &str = "member-1";
pub const OUTSIDER: &str = "outsider-1";

pub struct FixedText;

#[async_trait]
impl TextGenerator for FixedText {
    async fn complete(&self, _request: &TextRequest) -> ProviderResult<ProviderResponse<String>> {
        Ok(ProviderResponse::Sync(
            "Rates held steady, and here is why.".to_string(),
        ))
    }
}

pub struct SilentSpeech;

#[async_trait]
impl SpeechSynthesizer for SilentSpeech {
    async fn synthesize(
        &self,
        _request: &SpeechRequest,
    ) -> ProviderResult<ProviderResponse<SynthesizedAudio>> {
        Ok(ProviderResponse::Sync(SynthesizedAudio {
            bytes: b"mp3".to_vec(),
            content_type: "audio/mpeg".to_string(),
        }))
    }
}

pub struct FixedAvatar;

#[async_trait]
impl AvatarVideoGenerator for FixedAvatar {
    async fn submit(&self, _request: &AvatarVideoRequest) -> ProviderResult<ProviderResponse<()>> {
        Ok(ProviderResponse::Async(ProviderHandle::AvatarVideo(
            "hg-42".to_string(),
        )))
    }
}

pub struct FixedCaptions;

#[async_trait]
impl CaptionEditor for FixedCaptions {
    async fn submit(&self, _request: &CaptionRequest) -> ProviderResult<ProviderResponse<()>> {
        Ok(ProviderResponse::Async(ProviderHandle::CaptionProject(
            "sm-42".to_string(),
        )))
    }
}

pub struct FixedTranscriber;

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(
        &self,
        _request: &TranscriptionRequest,
    ) -> ProviderResult<ProviderResponse<Transcript>> {
        Ok(ProviderResponse::Sync(Transcript {
            text: "Rates held steady, and here is why.".to_string(),
            duration_secs: Some(12.5),
        }))
    }
}

pub struct FixedImages;

#[async_trait]
impl ImageGenerator for FixedImages {
    async fn generate_image(
        &self,
        _request: &ImageRequest,
    ) -> ProviderResult<ProviderResponse<GeneratedImage>> {
        Ok(ProviderResponse::Sync(GeneratedImage {
            bytes: b"png".to_vec(),
            content_type: "image/png".to_string(),
        }))
    }
}

pub struct NoopCompositor;

#[async_trait]
impl Compositor for NoopCompositor {
    async fn composite(&self, _spec: &CompositeSpec) -> MediaResult<CompositeOutput> {
        CompositeOutput::from_bytes(b"composited", "composite.mp4")
    }
}

/// Broker that rejects every publish; consuming works as usual.
pub struct UnreachableBroker(pub Arc<MemoryJobQueue>);

#[async_trait]
impl JobQueue for UnreachableBroker {
    async fn enqueue(&self, _job: QueueJob) -> QueueResult<EnqueueReceipt> {
        Err(QueueError::unreachable("connection refused"))
    }

    async fn consume(&self, consumer: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        self.0.consume(consumer, max).await
    }

    async fn reclaim(&self, consumer: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        self.0.reclaim(consumer, max).await
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        self.0.ack(delivery).await
    }

    async fn fail(&self, delivery: &Delivery, error: &str) -> QueueResult<FailOutcome> {
        self.0.fail(delivery, error).await
    }

    async fn dead_letter(&self, delivery: &Delivery, error: &str) -> QueueResult<()> {
        self.0.dead_letter(delivery, error).await
    }

    async fn len(&self) -> QueueResult<u64> {
        self.0.len().await
    }

    async fn dlq_len(&self) -> QueueResult<u64> {
        self.0.dlq_len().await
    }

    async fn dead_letters(&self, limit: usize) -> QueueResult<Vec<DeadLetter>> {
        self.0.dead_letters(limit).await
    }

    async fn ping(&self) -> QueueResult<()> {
        self.0.ping().await
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryJobQueue>,
    pub ctx: Arc<PipelineContext>,
}

impl TestApp {
    /// `acme` has an owner and a member; `globex` belongs to the outsider.
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Same fixtures, but every enqueue fails as if Redis were down.
    pub async fn with_unreachable_broker() -> Self {
        Self::build(true).await
    }

    async fn build(broker_down: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryJobQueue::new(Backoff::new(
            Duration::ZERO,
            Duration::ZERO,
            2,
        )));
        let ctx_queue: Arc<dyn JobQueue> = if broker_down {
            Arc::new(UnreachableBroker(queue.clone()))
        } else {
            queue.clone()
        };
        let providers = Providers {
            text: Arc::new(FixedText),
            speech: Arc::new(SilentSpeech),
            avatar: Arc::new(FixedAvatar),
            captions: Arc::new(FixedCaptions),
            transcriber: Arc::new(FixedTranscriber),
            images: Arc::new(FixedImages),
        };
        let ctx = Arc::new(PipelineContext::new(
            store.clone(),
            ctx_queue,
            Arc::new(MemoryObjectStore::default()),
            Arc::new(NoopCompositor),
            providers,
        ));

        let acme = Organization::new("acme", "Acme News");
        let acme_id = acme.id.clone();
        store
            .seed_organization(acme, Some(Membership::new(acme_id.clone(), OWNER, Role::Owner)))
            .await;
        store
            .add_membership(Membership::new(acme_id, MEMBER, Role::Member))
            .await
            .unwrap();
        let globex = Organization::new("globex", "Globex");
        let globex_id = globex.id.clone();
        store
            .seed_organization(globex, Some(Membership::new(globex_id, OUTSIDER, Role::Owner)))
            .await;

        let config = ApiConfig {
            jwt_secret: JWT_SECRET.to_string(),
            heygen_webhook_secret: Some(HEYGEN_SECRET.to_string()),
            ..Default::default()
        };
        let router = create_router(AppState::new(config, ctx.clone()), None);

        Self {
            router,
            store,
            queue,
            ctx,
        }
    }

    pub fn executor(&self) -> JobExecutor {
        JobExecutor::new(WorkerConfig::default(), self.ctx.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, body)
    }

    /// Authenticated JSON request as `user`.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token(user)));
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn webhook(&self, uri: &str, body: &str, signature: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("signature", signature);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

pub fn token(user: &str) -> String {
    let claims = SupabaseClaims {
        sub: user.to_string(),
        email: Some(format!("{}@example.com", user)),
        aud: "authenticated".to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
        role: Some("authenticated".to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn sign(body: &str) -> String {
    use hmac::{Hmac, Mac};
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(HEYGEN_SECRET.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
