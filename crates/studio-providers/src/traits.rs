//! Capability traits implemented by provider clients and test fakes.

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::types::{
    AvatarVideoRequest, CaptionRequest, GeneratedImage, ImageRequest, ProviderResponse,
    SpeechRequest, SynthesizedAudio, TextRequest, Transcript, TranscriptionRequest,
};

/// Scripts, quizzes and other text generation. Synchronous.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &TextRequest) -> ProviderResult<ProviderResponse<String>>;
}

/// Text to speech. Synchronous.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> ProviderResult<ProviderResponse<SynthesizedAudio>>;
}

/// Avatar video rendering. Asynchronous: returns an avatar video handle.
#[async_trait]
pub trait AvatarVideoGenerator: Send + Sync {
    async fn submit(&self, request: &AvatarVideoRequest) -> ProviderResult<ProviderResponse<()>>;
}

/// Caption and B-roll editing. Asynchronous: returns a caption project handle.
#[async_trait]
pub trait CaptionEditor: Send + Sync {
    async fn submit(&self, request: &CaptionRequest) -> ProviderResult<ProviderResponse<()>>;
}

/// Speech to text. Synchronous.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> ProviderResult<ProviderResponse<Transcript>>;
}

/// Image generation. Synchronous.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> ProviderResult<ProviderResponse<GeneratedImage>>;
}
