//! In-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use studio_models::{
    Article, ArticleId, AssetId, BackgroundMusic, Membership, Organization, OrganizationId,
    Output, OutputId, OutputStatus, ProviderHandle, StandaloneVideo, StandaloneVideoId,
    Submission, SubmissionId, VideoBumper,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    organizations: HashMap<OrganizationId, Organization>,
    memberships: HashMap<(OrganizationId, String), Membership>,
    articles: HashMap<ArticleId, Article>,
    bumpers: HashMap<AssetId, VideoBumper>,
    music: HashMap<AssetId, BackgroundMusic>,
    submissions: HashMap<SubmissionId, Submission>,
    outputs: HashMap<OutputId, Output>,
    standalone: HashMap<StandaloneVideoId, StandaloneVideo>,
}

/// Checks the stored version and bumps the incoming record.
fn check_version(record: &str, stored: u64, expected: u64) -> StoreResult<u64> {
    if stored != expected {
        debug!(record, expected, actual = stored, "Conditional update rejected");
        return Err(StoreError::Conflict {
            record: record.to_string(),
            expected,
            actual: stored,
        });
    }
    Ok(stored + 1)
}

fn awaiting_before(
    status: OutputStatus,
    since: Option<DateTime<Utc>>,
    cutoff: DateTime<Utc>,
) -> bool {
    status == OutputStatus::Processing && since.is_some_and(|at| at <= cutoff)
}

/// Store backed by process memory.
///
/// Used by tests and by the single-process development server. All tables
/// sit behind one lock, so every conditional update is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an organization with one member in a single call.
    pub async fn seed_organization(
        &self,
        org: Organization,
        membership: Option<Membership>,
    ) -> Organization {
        let mut tables = self.tables.write().await;
        if let Some(m) = membership {
            tables
                .memberships
                .insert((m.organization_id.clone(), m.user_id.clone()), m);
        }
        tables.organizations.insert(org.id.clone(), org.clone());
        org
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_organization(&self, org: Organization) -> StoreResult<Organization> {
        let mut tables = self.tables.write().await;
        if tables.organizations.values().any(|o| o.slug == org.slug) {
            return Err(StoreError::AlreadyExists(format!("organization {}", org.slug)));
        }
        tables.organizations.insert(org.id.clone(), org.clone());
        Ok(org)
    }

    async fn organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        let tables = self.tables.read().await;
        Ok(tables
            .organizations
            .values()
            .find(|o| o.slug == slug)
            .cloned())
    }

    async fn add_membership(&self, membership: Membership) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.memberships.insert(
            (
                membership.organization_id.clone(),
                membership.user_id.clone(),
            ),
            membership,
        );
        Ok(())
    }

    async fn membership(
        &self,
        organization_id: &OrganizationId,
        user_id: &str,
    ) -> StoreResult<Option<Membership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .get(&(organization_id.clone(), user_id.to_string()))
            .cloned())
    }

    async fn create_article(&self, article: Article) -> StoreResult<Article> {
        let mut tables = self.tables.write().await;
        tables.articles.insert(article.id.clone(), article.clone());
        Ok(article)
    }

    async fn article(&self, id: &ArticleId) -> StoreResult<Option<Article>> {
        Ok(self.tables.read().await.articles.get(id).cloned())
    }

    async fn set_article_thumbnail(&self, id: &ArticleId, url: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let article = tables
            .articles
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("article {}", id)))?;
        article.thumbnail_url = Some(url.to_string());
        Ok(())
    }

    async fn create_bumper(&self, bumper: VideoBumper) -> StoreResult<VideoBumper> {
        let mut tables = self.tables.write().await;
        tables.bumpers.insert(bumper.id.clone(), bumper.clone());
        Ok(bumper)
    }

    async fn bumper(&self, id: &AssetId) -> StoreResult<Option<VideoBumper>> {
        Ok(self.tables.read().await.bumpers.get(id).cloned())
    }

    async fn create_music(&self, music: BackgroundMusic) -> StoreResult<BackgroundMusic> {
        let mut tables = self.tables.write().await;
        tables.music.insert(music.id.clone(), music.clone());
        Ok(music)
    }

    async fn music(&self, id: &AssetId) -> StoreResult<Option<BackgroundMusic>> {
        Ok(self.tables.read().await.music.get(id).cloned())
    }

    async fn create_submission(&self, submission: Submission) -> StoreResult<Submission> {
        let mut tables = self.tables.write().await;
        if tables.submissions.contains_key(&submission.id) {
            return Err(StoreError::AlreadyExists(format!(
                "submission {}",
                submission.id
            )));
        }
        tables
            .submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    async fn submission(&self, id: &SubmissionId) -> StoreResult<Option<Submission>> {
        Ok(self.tables.read().await.submissions.get(id).cloned())
    }

    async fn update_submission(
        &self,
        mut submission: Submission,
        expected_version: u64,
    ) -> StoreResult<Submission> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .submissions
            .get(&submission.id)
            .ok_or_else(|| StoreError::not_found(format!("submission {}", submission.id)))?;
        submission.version = check_version(
            &format!("submission {}", submission.id),
            stored.version,
            expected_version,
        )?;
        tables
            .submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    async fn create_output(&self, output: Output) -> StoreResult<Output> {
        let mut tables = self.tables.write().await;
        if tables.outputs.contains_key(&output.id) {
            return Err(StoreError::AlreadyExists(format!("output {}", output.id)));
        }
        tables.outputs.insert(output.id.clone(), output.clone());
        Ok(output)
    }

    async fn output(&self, id: &OutputId) -> StoreResult<Option<Output>> {
        Ok(self.tables.read().await.outputs.get(id).cloned())
    }

    async fn outputs_for_submission(&self, id: &SubmissionId) -> StoreResult<Vec<Output>> {
        let tables = self.tables.read().await;
        let mut outputs: Vec<Output> = tables
            .outputs
            .values()
            .filter(|o| &o.submission_id == id)
            .cloned()
            .collect();
        outputs.sort_by_key(|o| o.created_at);
        Ok(outputs)
    }

    async fn update_output(&self, mut output: Output, expected_version: u64) -> StoreResult<Output> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .outputs
            .get(&output.id)
            .ok_or_else(|| StoreError::not_found(format!("output {}", output.id)))?;
        output.version = check_version(
            &format!("output {}", output.id),
            stored.version,
            expected_version,
        )?;
        tables.outputs.insert(output.id.clone(), output.clone());
        Ok(output)
    }

    async fn outputs_by_handle(&self, handle: &ProviderHandle) -> StoreResult<Vec<Output>> {
        let tables = self.tables.read().await;
        Ok(tables
            .outputs
            .values()
            .filter(|o| o.state.handles.holds(handle))
            .cloned()
            .collect())
    }

    async fn outputs_awaiting_since(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Output>> {
        let tables = self.tables.read().await;
        Ok(tables
            .outputs
            .values()
            .filter(|o| awaiting_before(o.state.status, o.state.awaiting_provider_since, cutoff))
            .cloned()
            .collect())
    }

    async fn create_standalone(&self, video: StandaloneVideo) -> StoreResult<StandaloneVideo> {
        let mut tables = self.tables.write().await;
        if tables.standalone.contains_key(&video.id) {
            return Err(StoreError::AlreadyExists(format!(
                "standalone video {}",
                video.id
            )));
        }
        tables.standalone.insert(video.id.clone(), video.clone());
        Ok(video)
    }

    async fn standalone(&self, id: &StandaloneVideoId) -> StoreResult<Option<StandaloneVideo>> {
        Ok(self.tables.read().await.standalone.get(id).cloned())
    }

    async fn update_standalone(
        &self,
        mut video: StandaloneVideo,
        expected_version: u64,
    ) -> StoreResult<StandaloneVideo> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .standalone
            .get(&video.id)
            .ok_or_else(|| StoreError::not_found(format!("standalone video {}", video.id)))?;
        video.version = check_version(
            &format!("standalone video {}", video.id),
            stored.version,
            expected_version,
        )?;
        tables.standalone.insert(video.id.clone(), video.clone());
        Ok(video)
    }

    async fn standalone_by_handle(
        &self,
        handle: &ProviderHandle,
    ) -> StoreResult<Vec<StandaloneVideo>> {
        let tables = self.tables.read().await;
        Ok(tables
            .standalone
            .values()
            .filter(|v| v.state.handles.holds(handle))
            .cloned()
            .collect())
    }

    async fn standalone_awaiting_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<StandaloneVideo>> {
        let tables = self.tables.read().await;
        Ok(tables
            .standalone
            .values()
            .filter(|v| awaiting_before(v.state.status, v.state.awaiting_provider_since, cutoff))
            .cloned()
            .collect())
    }
}
