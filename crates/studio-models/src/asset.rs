//! Organization-scoped media assets used by post-processing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::{AssetId, OrganizationId};

/// How a bumper is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BumperMedia {
    /// Still image held on screen for a fixed duration
    Image { duration_secs: f64 },
    /// Video clip played as-is
    Video,
}

/// Intro/outro clip. Immutable once uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoBumper {
    pub id: AssetId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub media_url: String,
    pub media: BumperMedia,
}

/// Background music track. Immutable once uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundMusic {
    pub id: AssetId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub media_url: String,
}
