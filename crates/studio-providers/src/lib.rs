//! Provider adapters.
//!
//! Each external capability sits behind a narrow trait. Adapters translate
//! HTTP failures into [`ProviderError`] and never expose provider payload
//! shapes to callers: a call yields either a synchronous result or an
//! opaque handle whose completion arrives later through a webhook.

pub mod elevenlabs;
pub mod error;
pub mod heygen;
pub mod http;
pub mod openai;
pub mod submagic;
pub mod traits;
pub mod types;

pub use elevenlabs::{ElevenLabsClient, ElevenLabsConfig};
pub use error::{ProviderError, ProviderErrorKind, ProviderResult};
pub use heygen::{HeyGenClient, HeyGenConfig};
pub use http::{AuthScheme, HttpProvider, ProviderConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use submagic::{SubmagicClient, SubmagicConfig};
pub use traits::{
    AvatarVideoGenerator, CaptionEditor, ImageGenerator, SpeechSynthesizer, TextGenerator,
    Transcriber,
};
pub use types::{
    AvatarVideoRequest, CaptionRequest, GeneratedImage, ImageRequest, ProviderResponse,
    SpeechRequest, SynthesizedAudio, TextRequest, Transcript, TranscriptionRequest,
};
