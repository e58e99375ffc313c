//! Shared harness for pipeline integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use studio_media::{CompositeOutput, CompositeSpec, Compositor, MediaResult};
use studio_models::{
    Article, AssetId, BackgroundMusic, BumperMedia, Organization, OrganizationId, ProviderHandle,
    VideoBumper,
};
use studio_pipeline::{PipelineContext, Providers};
use studio_providers::{
    AvatarVideoGenerator, AvatarVideoRequest, CaptionEditor, CaptionRequest, GeneratedImage,
    ImageGenerator, ImageRequest, ProviderError, ProviderErrorKind, ProviderResponse,
    ProviderResult, SpeechRequest, SpeechSynthesizer, SynthesizedAudio, TextGenerator,
    TextRequest, Transcriber, Transcript, TranscriptionRequest,
};
use studio_queue::MemoryJobQueue;
use studio_storage::MemoryObjectStore;
use studio_store::{MemoryStore, Store};
use tokio::sync::Mutex;

pub struct FakeText;

#[async_trait]
impl TextGenerator for FakeText {
    async fn complete(&self, _request: &TextRequest) -> ProviderResult<ProviderResponse<String>> {
        Ok(ProviderResponse::Sync("Welcome to the show.".to_string()))
    }
}

pub struct FakeSpeech;

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
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

pub struct FakeAvatar;

#[async_trait]
impl AvatarVideoGenerator for FakeAvatar {
    async fn submit(&self, _request: &AvatarVideoRequest) -> ProviderResult<ProviderResponse<()>> {
        Ok(ProviderResponse::Async(ProviderHandle::AvatarVideo(
            "hg-1".to_string(),
        )))
    }
}

pub struct FakeCaptions;

#[async_trait]
impl CaptionEditor for FakeCaptions {
    async fn submit(&self, _request: &CaptionRequest) -> ProviderResult<ProviderResponse<()>> {
        Ok(ProviderResponse::Async(ProviderHandle::CaptionProject(
            "sm-1".to_string(),
        )))
    }
}

pub struct FakeTranscriber;

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(
        &self,
        _request: &TranscriptionRequest,
    ) -> ProviderResult<ProviderResponse<Transcript>> {
        Ok(ProviderResponse::Sync(Transcript {
            text: "Welcome to the show.".to_string(),
            duration_secs: Some(12.5),
        }))
    }
}

/// Image provider that is always down, to exercise best-effort paths.
pub struct BrokenImages;

#[async_trait]
impl ImageGenerator for BrokenImages {
    async fn generate_image(
        &self,
        _request: &ImageRequest,
    ) -> ProviderResult<ProviderResponse<GeneratedImage>> {
        Err(ProviderError::new(
            "images",
            ProviderErrorKind::Unavailable,
            "HTTP 503: overloaded",
        ))
    }
}

pub struct FakeImages;

#[async_trait]
impl ImageGenerator for FakeImages {
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

/// Records every composite request and renders a fixed payload.
#[derive(Default)]
pub struct RecordingCompositor {
    pub specs: Mutex<Vec<CompositeSpec>>,
}

#[async_trait]
impl Compositor for RecordingCompositor {
    async fn composite(&self, spec: &CompositeSpec) -> MediaResult<CompositeOutput> {
        self.specs.lock().await.push(spec.clone());
        CompositeOutput::from_bytes(b"composited", "composite.mp4")
    }
}

pub fn providers() -> Providers {
    Providers {
        text: Arc::new(FakeText),
        speech: Arc::new(FakeSpeech),
        avatar: Arc::new(FakeAvatar),
        captions: Arc::new(FakeCaptions),
        transcriber: Arc::new(FakeTranscriber),
        images: Arc::new(FakeImages),
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryJobQueue>,
    pub storage: Arc<MemoryObjectStore>,
    pub compositor: Arc<RecordingCompositor>,
    pub ctx: Arc<PipelineContext>,
    pub org: OrganizationId,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_providers(providers()).await
    }

    pub async fn with_providers(providers: Providers) -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryJobQueue::default());
        let storage = Arc::new(MemoryObjectStore::default());
        let compositor = Arc::new(RecordingCompositor::default());
        let org = store
            .seed_organization(Organization::new("acme", "Acme News"), None)
            .await
            .id;

        let ctx = Arc::new(PipelineContext::new(
            store.clone(),
            queue.clone(),
            storage.clone(),
            compositor.clone(),
            providers,
        ));

        Self {
            store,
            queue,
            storage,
            compositor,
            ctx,
            org,
        }
    }

    pub async fn article(&self) -> Article {
        self.store
            .create_article(Article::new(
                self.org.clone(),
                "Rates hold steady",
                "The central bank kept rates unchanged on Tuesday.",
                "editor-1",
            ))
            .await
            .unwrap()
    }

    pub async fn music(&self) -> AssetId {
        self.store
            .create_music(BackgroundMusic {
                id: AssetId::new(),
                organization_id: self.org.clone(),
                name: "Lo-fi".to_string(),
                media_url: "https://cdn.test/music.mp3".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    pub async fn image_bumper(&self, org: &OrganizationId) -> AssetId {
        self.store
            .create_bumper(VideoBumper {
                id: AssetId::new(),
                organization_id: org.clone(),
                name: "Intro card".to_string(),
                media_url: "https://cdn.test/intro.png".to_string(),
                media: BumperMedia::Image { duration_secs: 2.0 },
            })
            .await
            .unwrap()
            .id
    }

    pub async fn job_types(&self) -> Vec<&'static str> {
        self.queue
            .queued_jobs()
            .await
            .iter()
            .map(|j| j.job_type())
            .collect()
    }
}
