use axum::{Json, extract::State, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;
use tracing::debug;

use cerita_db::ReactionToggle;
use cerita_types::ReactionType;
use cerita_types::api::ToggleReactionRequest;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, non_blank};
use crate::middleware::CurrentUser;
use crate::policy::{Subject, can_view};
use crate::state::{AppState, run_db};
use crate::views::reaction_response;

/// Adds the caller's reaction of this type, or removes it if already present.
pub async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<ToggleReactionRequest>,
) -> ApiResult<Response> {
    let (Some(story_id), Some(kind)) = (non_blank(req.story_id), non_blank(req.kind)) else {
        return Err(ApiError::bad_request("storyId dan type wajib diisi"));
    };
    let kind: ReactionType = kind
        .parse()
        .map_err(|_| ApiError::bad_request("Tipe reaksi tidak valid"))?;

    let lookup = story_id.clone();
    let story = run_db(&state, move |db| db.get_story(&lookup))
        .await?
        .ok_or_else(|| ApiError::not_found("Cerita tidak ditemukan"))?;
    if !can_view(Some(user.actor()), Subject::story(&story)) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    let user_id = user.id.clone();
    let toggled = run_db(&state, move |db| db.toggle_reaction(&story_id, &user_id, kind)).await?;

    let response = match toggled {
        ReactionToggle::Added(row) => {
            debug!("Reaction {} added to {} by {}", kind, row.story_id, user.id);
            (
                StatusCode::CREATED,
                Json(json!({ "reaction": reaction_response(row), "message": "Reaksi ditambahkan" })),
            )
                .into_response()
        }
        ReactionToggle::Removed => {
            debug!("Reaction {} removed from {} by {}", kind, story.id, user.id);
            Json(json!({ "message": "Reaksi dihapus" })).into_response()
        }
    };
    Ok(response)
}
