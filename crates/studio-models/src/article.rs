//! Source articles.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::{ArticleId, OrganizationId};

/// Article (or script) uploaded by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Article {
    pub id: ArticleId,
    pub organization_id: OrganizationId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn new(
        organization_id: OrganizationId,
        title: impl Into<String>,
        content: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: ArticleId::new(),
            organization_id,
            title: title.into(),
            content: content.into(),
            thumbnail_url: None,
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }
}
