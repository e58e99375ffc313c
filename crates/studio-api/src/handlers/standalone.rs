//! Standalone video handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use studio_models::{EntityRef, GenerationConfig, StandaloneVideo, StandaloneVideoId};
use studio_pipeline::NewStandaloneVideo;
use tracing::info;
use validator::Validate;

use super::outputs::{ApproveScriptRequest, EntityBody};
use crate::auth::{AuthUser, OrgAccess};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStandaloneRequest {
    #[validate(length(min = 1, max = 300, message = "title must be 1-300 characters"))]
    pub title: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub config: GenerationConfig,
}

pub async fn create_standalone(
    State(state): State<AppState>,
    user: AuthUser,
    Path(org): Path<String>,
    Json(request): Json<CreateStandaloneRequest>,
) -> ApiResult<(StatusCode, Json<StandaloneVideo>)> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let video = state
        .standalone
        .create(NewStandaloneVideo {
            organization_id: access.organization.id,
            title: request.title,
            prompt: request.prompt,
            script: request.script,
            config: request.config,
            created_by: user.user_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(video)))
}

pub async fn get_standalone(
    State(state): State<AppState>,
    user: AuthUser,
    Path((org, id)): Path<(String, String)>,
) -> ApiResult<Json<StandaloneVideo>> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    let video = state
        .standalone
        .get(&access.organization.id, &StandaloneVideoId::from(id))
        .await?;
    Ok(Json(video))
}

pub async fn approve_standalone_script(
    State(state): State<AppState>,
    user: AuthUser,
    Path((org, id)): Path<(String, String)>,
    body: Option<Json<ApproveScriptRequest>>,
) -> ApiResult<Json<EntityBody>> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    let video = state
        .standalone
        .get(&access.organization.id, &StandaloneVideoId::from(id))
        .await?;
    let script = body.and_then(|Json(b)| b.script);

    let entity = state
        .outputs
        .approve_script(&EntityRef::Standalone(video.id), script)
        .await?;
    Ok(Json(entity.into()))
}

pub async fn regenerate_standalone(
    State(state): State<AppState>,
    user: AuthUser,
    Path((org, id)): Path<(String, String)>,
) -> ApiResult<Json<EntityBody>> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    access.require_manager()?;
    let video = state
        .standalone
        .get(&access.organization.id, &StandaloneVideoId::from(id))
        .await?;

    let entity = state
        .outputs
        .regenerate(&EntityRef::Standalone(video.id.clone()))
        .await?;
    info!(standalone_video_id = %video.id, user_id = %user.user_id, "Standalone video regeneration started");
    Ok(Json(entity.into()))
}
