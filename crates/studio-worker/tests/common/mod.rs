//! In-memory wiring for worker tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use studio_media::{CompositeOutput, CompositeSpec, Compositor, MediaResult};
use studio_models::{
    Article, GenerationConfig, Organization, OrganizationId, OutputKind, ProviderHandle,
    RequestedOutputs,
};
use studio_pipeline::{NewSubmission, PipelineContext, Providers, SubmissionService, SubmissionView};
use studio_providers::{
    AvatarVideoGenerator, AvatarVideoRequest, CaptionEditor, CaptionRequest, GeneratedImage,
    ImageGenerator, ImageRequest, ProviderError, ProviderErrorKind, ProviderResponse,
    ProviderResult, SpeechRequest, SpeechSynthesizer, SynthesizedAudio, TextGenerator,
    TextRequest, Transcriber, Transcript, TranscriptionRequest,
};
use studio_queue::{Backoff, MemoryJobQueue};
use studio_storage::MemoryObjectStore;
use studio_store::{MemoryStore, Store};
use studio_worker::{prompts, JobExecutor, WorkerConfig};
use tokio::sync::Mutex;

pub const QUIZ_JSON: &str = r#"{"questions": [
    {"question": "What did the bank do?", "options": ["Raised rates", "Cut rates", "Held rates", "Closed"], "answer_index": 2, "explanation": "Rates were unchanged."}
]}"#;

pub const DIALOGUE: &str = "HOST: Rates held steady today.\nGUEST: Markets expected it.\nHOST: Thanks for joining.";

pub const SEGMENTS_JSON: &str = r#"{"segments": [
    {"speaker": "HOST", "text": "The bank held rates.", "question": "Did you expect that?"},
    {"speaker": "GUEST", "text": "Inflation is cooling.", "question": null}
]}"#;

/// Answers each prompt family with a fixed, well-formed response.
#[derive(Default)]
pub struct ScriptedText {
    pub requests: Mutex<Vec<TextRequest>>,
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn complete(&self, request: &TextRequest) -> ProviderResult<ProviderResponse<String>> {
        self.requests.lock().await.push(request.clone());
        let reply = match request.system.as_str() {
            s if s == prompts::QUIZ_SYSTEM => QUIZ_JSON,
            s if s == prompts::PODCAST_SCRIPT_SYSTEM => DIALOGUE,
            s if s == prompts::INTERACTIVE_SYSTEM => SEGMENTS_JSON,
            s if s == prompts::NARRATION_SYSTEM => "The central bank kept rates unchanged.",
            _ => "Big news from the central bank today.",
        };
        Ok(ProviderResponse::Sync(reply.to_string()))
    }
}

/// Text generator that always fails with `kind`.
pub struct FailingText(pub ProviderErrorKind);

#[async_trait]
impl TextGenerator for FailingText {
    async fn complete(&self, _request: &TextRequest) -> ProviderResult<ProviderResponse<String>> {
        Err(ProviderError::new("openai", self.0, "HTTP error"))
    }
}

/// Text generator that never answers in time.
pub struct StalledText;

#[async_trait]
impl TextGenerator for StalledText {
    async fn complete(&self, _request: &TextRequest) -> ProviderResult<ProviderResponse<String>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ProviderResponse::Sync("too late".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingSpeech {
    pub voices: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSynthesizer for RecordingSpeech {
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> ProviderResult<ProviderResponse<SynthesizedAudio>> {
        self.voices.lock().await.push(request.voice_id.clone());
        Ok(ProviderResponse::Sync(SynthesizedAudio {
            bytes: format!("[{}]", request.voice_id).into_bytes(),
            content_type: "audio/mpeg".to_string(),
        }))
    }
}

#[derive(Default)]
pub struct RecordingAvatar {
    pub requests: Mutex<Vec<AvatarVideoRequest>>,
}

#[async_trait]
impl AvatarVideoGenerator for RecordingAvatar {
    async fn submit(&self, request: &AvatarVideoRequest) -> ProviderResult<ProviderResponse<()>> {
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        Ok(ProviderResponse::Async(ProviderHandle::AvatarVideo(format!(
            "hg-{}",
            requests.len()
        ))))
    }
}

#[derive(Default)]
pub struct RecordingCaptions {
    pub requests: Mutex<Vec<CaptionRequest>>,
}

#[async_trait]
impl CaptionEditor for RecordingCaptions {
    async fn submit(&self, request: &CaptionRequest) -> ProviderResult<ProviderResponse<()>> {
        self.requests.lock().await.push(request.clone());
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
            text: "Big news from the central bank today.".to_string(),
            duration_secs: Some(31.0),
        }))
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
            bytes: b"jpeg".to_vec(),
            content_type: "image/jpeg".to_string(),
        }))
    }
}

pub struct PassthroughCompositor;

#[async_trait]
impl Compositor for PassthroughCompositor {
    async fn composite(&self, _spec: &CompositeSpec) -> MediaResult<CompositeOutput> {
        CompositeOutput::from_bytes(b"composited", "composite.mp4")
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryJobQueue>,
    pub storage: Arc<MemoryObjectStore>,
    pub text: Arc<ScriptedText>,
    pub speech: Arc<RecordingSpeech>,
    pub avatar: Arc<RecordingAvatar>,
    pub captions: Arc<RecordingCaptions>,
    pub ctx: Arc<PipelineContext>,
    pub org: OrganizationId,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(None, WorkerConfig::default()).await.0
    }

    /// Harness whose text generator is replaced by `text`; returns the
    /// executor built with `config`.
    pub async fn with_text(
        text: Arc<dyn TextGenerator>,
        config: WorkerConfig,
    ) -> (Self, JobExecutor) {
        Self::build(Some(text), config).await
    }

    async fn build(
        text_override: Option<Arc<dyn TextGenerator>>,
        config: WorkerConfig,
    ) -> (Self, JobExecutor) {
        let store = Arc::new(MemoryStore::new());
        // Retries are due immediately so drain() sees them
        let queue = Arc::new(MemoryJobQueue::new(Backoff::new(
            Duration::ZERO,
            Duration::ZERO,
            2,
        )));
        let storage = Arc::new(MemoryObjectStore::default());
        let text = Arc::new(ScriptedText::default());
        let speech = Arc::new(RecordingSpeech::default());
        let avatar = Arc::new(RecordingAvatar::default());
        let captions = Arc::new(RecordingCaptions::default());

        let providers = Providers {
            text: text_override.unwrap_or_else(|| text.clone() as Arc<dyn TextGenerator>),
            speech: speech.clone(),
            avatar: avatar.clone(),
            captions: captions.clone(),
            transcriber: Arc::new(FakeTranscriber),
            images: Arc::new(FakeImages),
        };
        let org = store
            .seed_organization(Organization::new("acme", "Acme News"), None)
            .await
            .id;
        let ctx = Arc::new(PipelineContext::new(
            store.clone(),
            queue.clone(),
            storage.clone(),
            Arc::new(PassthroughCompositor),
            providers,
        ));
        let executor = JobExecutor::new(config, ctx.clone());

        (
            Self {
                store,
                queue,
                storage,
                text,
                speech,
                avatar,
                captions,
                ctx,
                org,
            },
            executor,
        )
    }

    pub fn executor(&self) -> JobExecutor {
        JobExecutor::new(WorkerConfig::default(), self.ctx.clone())
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

    pub async fn submit(&self, kinds: &[OutputKind], config: GenerationConfig) -> SubmissionView {
        let article = self.article().await;
        SubmissionService::new(self.ctx.clone())
            .create(NewSubmission {
                organization_id: self.org.clone(),
                article_id: article.id,
                requested: RequestedOutputs::from_kinds(kinds),
                config,
                created_by: "editor-1".to_string(),
            })
            .await
            .unwrap()
    }
}
