//! Rows driven by the generation state machine.

use studio_models::{
    EntityRef, GenerationConfig, GenerationState, OrganizationId, Output, OutputKind,
    StandaloneVideo, SubmissionId,
};
use studio_store::{Store, StoreResult};

use crate::error::{PipelineError, PipelineResult};

/// An output or a standalone video, tagged by the table it lives in.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Output(Output),
    Standalone(StandaloneVideo),
}

impl Entity {
    /// Load the row `target` points at.
    pub async fn load(store: &dyn Store, target: &EntityRef) -> PipelineResult<Entity> {
        let found = match target {
            EntityRef::Output(id) => store.output(id).await?.map(Entity::Output),
            EntityRef::Standalone(id) => store.standalone(id).await?.map(Entity::Standalone),
        };
        found.ok_or_else(|| PipelineError::not_found(target.table(), target.id()))
    }

    /// Conditionally write this row; `Conflict` if someone else wrote first.
    pub async fn save(self, store: &dyn Store, expected_version: u64) -> StoreResult<Entity> {
        match self {
            Entity::Output(o) => Ok(Entity::Output(store.update_output(o, expected_version).await?)),
            Entity::Standalone(v) => Ok(Entity::Standalone(
                store.update_standalone(v, expected_version).await?,
            )),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Entity::Output(o) => o.entity_ref(),
            Entity::Standalone(v) => v.entity_ref(),
        }
    }

    /// Standalone videos run the video state machine.
    pub fn kind(&self) -> OutputKind {
        match self {
            Entity::Output(o) => o.kind,
            Entity::Standalone(_) => OutputKind::Video,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        match self {
            Entity::Output(o) => &o.config,
            Entity::Standalone(v) => &v.config,
        }
    }

    pub fn state(&self) -> &GenerationState {
        match self {
            Entity::Output(o) => &o.state,
            Entity::Standalone(v) => &v.state,
        }
    }

    pub fn set_state(&mut self, state: GenerationState) {
        match self {
            Entity::Output(o) => o.state = state,
            Entity::Standalone(v) => v.state = state,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Entity::Output(o) => o.version,
            Entity::Standalone(v) => v.version,
        }
    }

    pub fn organization_id(&self) -> &OrganizationId {
        match self {
            Entity::Output(o) => &o.organization_id,
            Entity::Standalone(v) => &v.organization_id,
        }
    }

    /// Owning submission; standalone videos have none.
    pub fn submission_id(&self) -> Option<&SubmissionId> {
        match self {
            Entity::Output(o) => Some(&o.submission_id),
            Entity::Standalone(_) => None,
        }
    }

    /// Title used when talking to providers.
    pub fn title(&self) -> String {
        match self {
            Entity::Output(o) => format!("{} {}", o.kind, o.id),
            Entity::Standalone(v) => v.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_models::{OutputStatus, StandaloneVideoId};
    use studio_store::MemoryStore;

    #[tokio::test]
    async fn test_load_and_save_standalone() {
        let store = MemoryStore::new();
        let video = store
            .create_standalone(StandaloneVideo::new(
                OrganizationId::from("org"),
                "Launch teaser",
                "user-1",
                GenerationConfig::default(),
            ))
            .await
            .unwrap();

        let mut entity = Entity::load(&store, &video.entity_ref()).await.unwrap();
        assert_eq!(entity.kind(), OutputKind::Video);
        assert!(entity.submission_id().is_none());

        let mut state = entity.state().clone();
        state.status = OutputStatus::Processing;
        entity.set_state(state);
        let saved = entity.save(&store, 0).await.unwrap();
        assert_eq!(saved.version(), 1);
        assert_eq!(saved.state().status, OutputStatus::Processing);
    }

    #[tokio::test]
    async fn test_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = Entity::load(&store, &EntityRef::Standalone(StandaloneVideoId::from("nope")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NotFound {
                entity: "standalone_video",
                ..
            }
        ));
    }
}
