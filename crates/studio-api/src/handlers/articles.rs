//! Article handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use studio_models::Article;
use studio_queue::{ArticleThumbnailJob, QueueJob};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{AuthUser, OrgAccess};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 300, message = "title must be 1-300 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
}

/// Create an article and ask for a header image.
///
/// The thumbnail is best-effort: a queue outage is logged and the article
/// is still returned.
pub async fn create_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(org): Path<String>,
    Json(request): Json<CreateArticleRequest>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    let access = OrgAccess::resolve(&state, &user, &org).await?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    if request.title.trim().is_empty() || request.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "title and content must not be blank".to_string(),
        ));
    }

    let article = state
        .ctx
        .store
        .create_article(Article::new(
            access.organization.id.clone(),
            request.title.trim(),
            request.content,
            user.user_id.clone(),
        ))
        .await?;
    info!(article_id = %article.id, organization = %org, "Created article");

    let job = QueueJob::GenerateArticleThumbnail(ArticleThumbnailJob {
        article_id: article.id.clone(),
        title: article.title.clone(),
        organization_id: article.organization_id.clone(),
    });
    if let Err(e) = state.ctx.queue.enqueue(job).await {
        warn!(article_id = %article.id, "Could not queue thumbnail generation: {}", e);
    }

    Ok((StatusCode::CREATED, Json(article)))
}
