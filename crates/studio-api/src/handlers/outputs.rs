//! Output actions: script approval and regeneration.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use studio_models::{EntityRef, Output, OutputId, StandaloneVideo};
use studio_pipeline::Entity;
use tracing::info;

use crate::auth::{AuthUser, OrgAccess};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ApproveScriptRequest {
    /// Edited script replacing the generated one
    #[serde(default)]
    pub script: Option<String>,
}

/// An output or standalone video as returned after an action.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EntityBody {
    Output(Output),
    Standalone(StandaloneVideo),
}

impl From<Entity> for EntityBody {
    fn from(entity: Entity) -> Self {
        match entity {
            Entity::Output(o) => EntityBody::Output(o),
            Entity::Standalone(v) => EntityBody::Standalone(v),
        }
    }
}

/// Output `id` if it belongs to the caller's organization.
async fn scoped_output(state: &AppState, access: &OrgAccess, id: &str) -> ApiResult<Output> {
    state
        .ctx
        .store
        .output(&OutputId::from(id))
        .await?
        .filter(|o| o.organization_id == access.organization.id)
        .ok_or_else(|| ApiError::not_found(format!("output {}", id)))
}

pub async fn approve_output_script(
    State(state): State<AppState>,
    user: AuthUser,
    Path((org, id)): Path<(String, String)>,
    body: Option<Json<ApproveScriptRequest>>,
) -> ApiResult<Json<EntityBody>> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    let output = scoped_output(&state, &access, &id).await?;
    let script = body.and_then(|Json(b)| b.script);

    let entity = state
        .outputs
        .approve_script(&EntityRef::Output(output.id), script)
        .await?;
    info!(output_id = %id, user_id = %user.user_id, "Script approved");
    Ok(Json(entity.into()))
}

/// Start a fresh cycle for a finished output. Owners and admins only.
pub async fn regenerate_output(
    State(state): State<AppState>,
    user: AuthUser,
    Path((org, id)): Path<(String, String)>,
) -> ApiResult<Json<EntityBody>> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    access.require_manager()?;
    let output = scoped_output(&state, &access, &id).await?;

    let entity = state
        .outputs
        .regenerate(&EntityRef::Output(output.id))
        .await?;
    info!(output_id = %id, user_id = %user.user_id, "Output regeneration started");
    Ok(Json(entity.into()))
}
