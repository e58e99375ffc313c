//! Store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use studio_models::{
    Article, ArticleId, AssetId, BackgroundMusic, Membership, Organization, OrganizationId,
    Output, OutputId, ProviderHandle, StandaloneVideo, StandaloneVideoId, Submission,
    SubmissionId, VideoBumper,
};

use crate::error::StoreResult;

/// Persistence collaborator used by the pipeline and the API.
///
/// `update_*` calls succeed only when the stored `version` equals
/// `expected_version`; the stored record then gets `expected_version + 1`
/// and is returned. Otherwise they fail with `StoreError::Conflict`.
#[async_trait]
pub trait Store: Send + Sync {
    // Organizations
    async fn create_organization(&self, org: Organization) -> StoreResult<Organization>;
    async fn organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>>;
    async fn add_membership(&self, membership: Membership) -> StoreResult<()>;
    async fn membership(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
    ) -> StoreResult<Option<Membership>>;

    // Articles
    async fn create_article(&self, article: Article) -> StoreResult<Article>;
    async fn article(&self, id: &ArticleId) -> StoreResult<Option<Article>>;
    async fn set_article_thumbnail(&self, id: &ArticleId, url: &str) -> StoreResult<()>;

    // Assets (read-only to the pipeline)
    async fn create_bumper(&self, bumper: VideoBumper) -> StoreResult<VideoBumper>;
    async fn bumper(&self, id: &AssetId) -> StoreResult<Option<VideoBumper>>;
    async fn create_music(&self, music: BackgroundMusic) -> StoreResult<BackgroundMusic>;
    async fn music(&self, id: &AssetId) -> StoreResult<Option<BackgroundMusic>>;

    // Submissions
    async fn create_submission(&self, submission: Submission) -> StoreResult<Submission>;
    async fn submission(&self, id: &SubmissionId) -> StoreResult<Option<Submission>>;
    async fn update_submission(
        &self,
        submission: Submission,
        expected_version: u64,
    ) -> StoreResult<Submission>;

    // Outputs
    async fn create_output(&self, output: Output) -> StoreResult<Output>;
    async fn output(&self, id: &OutputId) -> StoreResult<Option<Output>>;
    async fn outputs_for_submission(&self, id: &SubmissionId) -> StoreResult<Vec<Output>>;
    async fn update_output(&self, output: Output, expected_version: u64) -> StoreResult<Output>;
    /// Every output whose handle slot currently holds `handle`.
    async fn outputs_by_handle(&self, handle: &ProviderHandle) -> StoreResult<Vec<Output>>;
    /// Outputs waiting on a provider callback since before `cutoff`.
    async fn outputs_awaiting_since(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Output>>;

    // Standalone videos
    async fn create_standalone(&self, video: StandaloneVideo) -> StoreResult<StandaloneVideo>;
    async fn standalone(&self, id: &StandaloneVideoId) -> StoreResult<Option<StandaloneVideo>>;
    async fn update_standalone(
        &self,
        video: StandaloneVideo,
        expected_version: u64,
    ) -> StoreResult<StandaloneVideo>;
    async fn standalone_by_handle(
        &self,
        handle: &ProviderHandle,
    ) -> StoreResult<Vec<StandaloneVideo>>;
    async fn standalone_awaiting_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<StandaloneVideo>>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
