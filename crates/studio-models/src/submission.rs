//! Submissions: one article turned into one or more outputs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::{ArticleId, OrganizationId, SubmissionId};
use crate::rollup::RequestedOutputs;
use crate::status::SubmissionStatus;

/// Aggregate generation request for an article.
///
/// `status` is a rollup of the child outputs and is only written by the
/// rollup recomputation (and at creation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Submission {
    pub id: SubmissionId,
    pub organization_id: OrganizationId,
    pub article_id: ArticleId,
    #[serde(flatten)]
    pub requested: RequestedOutputs,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub version: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        organization_id: OrganizationId,
        article_id: ArticleId,
        requested: RequestedOutputs,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubmissionId::new(),
            organization_id,
            article_id,
            requested,
            status: SubmissionStatus::Pending,
            version: 0,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
