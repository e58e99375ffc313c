//! Submission handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use studio_models::{ArticleId, GenerationConfig, RequestedOutputs, SubmissionId};
use studio_pipeline::{NewSubmission, SubmissionView};

use crate::auth::{AuthUser, OrgAccess};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    pub article_id: ArticleId,
    /// `generate_audio`, `generate_video`, ... flags
    #[serde(flatten)]
    pub requested: RequestedOutputs,
    #[serde(default)]
    pub config: GenerationConfig,
}

/// Create a submission and start every requested output.
pub async fn create_submission(
    State(state): State<AppState>,
    user: AuthUser,
    Path(org): Path<String>,
    Json(request): Json<CreateSubmissionRequest>,
) -> ApiResult<(StatusCode, Json<SubmissionView>)> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    let view = state
        .submissions
        .create(NewSubmission {
            organization_id: access.organization.id,
            article_id: request.article_id,
            requested: request.requested,
            config: request.config,
            created_by: user.user_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_submission(
    State(state): State<AppState>,
    user: AuthUser,
    Path((org, id)): Path<(String, String)>,
) -> ApiResult<Json<SubmissionView>> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    let view = state
        .submissions
        .get(&access.organization.id, &SubmissionId::from(id))
        .await?;
    Ok(Json(view))
}
