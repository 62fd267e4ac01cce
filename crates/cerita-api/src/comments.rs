use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{debug, info};

use cerita_db::NewComment;
use cerita_db::models::{CommentRow, CommentTarget};
use cerita_types::api::{CreateCommentRequest, UpdateCommentRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, non_blank};
use crate::middleware::CurrentUser;
use crate::policy::{Action, Subject, can_mutate, can_view};
use crate::state::{AppState, run_db};
use crate::views::comment_response;

fn target_of(req: &mut CreateCommentRequest) -> ApiResult<CommentTarget> {
    let story = non_blank(req.story_id.take()).map(CommentTarget::Story);
    let journal = non_blank(req.journal_id.take()).map(CommentTarget::Journal);
    let announcement = non_blank(req.announcement_id.take()).map(CommentTarget::Announcement);

    let mut targets = [story, journal, announcement].into_iter().flatten();
    match (targets.next(), targets.next()) {
        (Some(target), None) => Ok(target),
        _ => Err(ApiError::bad_request(
            "Pilih tepat satu dari storyId, journalId, atau announcementId",
        )),
    }
}

/// The target must exist (404) and be visible to the commenter (403).
async fn check_target(state: &AppState, user: &CurrentUser, target: &CommentTarget) -> ApiResult<()> {
    let viewer = Some(user.actor());
    match target.clone() {
        CommentTarget::Story(id) => {
            let row = run_db(state, move |db| db.get_story(&id))
                .await?
                .ok_or_else(|| ApiError::not_found("Cerita tidak ditemukan"))?;
            if !can_view(viewer, Subject::story(&row)) {
                return Err(ApiError::forbidden("Forbidden"));
            }
        }
        CommentTarget::Journal(id) => {
            let row = run_db(state, move |db| db.get_journal(&id))
                .await?
                .ok_or_else(|| ApiError::not_found("Jurnal tidak ditemukan"))?;
            if !can_view(viewer, Subject::journal(&row)) {
                return Err(ApiError::forbidden("Forbidden"));
            }
        }
        CommentTarget::Announcement(id) => {
            let row = run_db(state, move |db| db.get_announcement(&id))
                .await?
                .ok_or_else(|| ApiError::not_found("Pengumuman tidak ditemukan"))?;
            if !can_view(viewer, Subject::announcement(&row)) {
                return Err(ApiError::forbidden("Forbidden"));
            }
        }
    }
    Ok(())
}

/// The top-level comment a new reply hangs under.
async fn resolve_parent(state: &AppState, parent_id: String, target: &CommentTarget) -> ApiResult<String> {
    let parent = run_db(state, move |db| db.get_comment(&parent_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Komentar induk tidak ditemukan"))?;

    if &parent.target != target {
        return Err(ApiError::bad_request("Komentar induk tidak berada pada konten yang sama"));
    }

    match parent.parent_id {
        Some(root) => {
            debug!("Reply to reply {} attached to {}", parent.id, root);
            Ok(root)
        }
        None => Ok(parent.id),
    }
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(mut req): ApiJson<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let target = target_of(&mut req)?;
    let Some(content) = non_blank(req.content) else {
        return Err(ApiError::bad_request("Konten komentar wajib diisi"));
    };

    check_target(&state, &user, &target).await?;

    let parent_id = match non_blank(req.parent_id) {
        Some(parent_id) => Some(resolve_parent(&state, parent_id, &target).await?),
        None => None,
    };

    let is_anonymous = req.is_anonymous.unwrap_or(false);
    let user_id = user.id.clone();
    let row = run_db(&state, move |db| {
        db.insert_comment(&NewComment {
            user_id: &user_id,
            target: &target,
            parent_id: parent_id.as_deref(),
            content: &content,
            is_anonymous,
        })
    })
    .await?;
    info!("Comment {} created by {}", row.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "comment": comment_response(row, Some(&user)),
            "message": "Komentar berhasil ditambahkan",
        })),
    ))
}

async fn load(state: &AppState, id: String) -> ApiResult<CommentRow> {
    run_db(state, move |db| db.get_comment(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Komentar tidak ditemukan"))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_mutate(user.actor(), Subject::comment(&row), Action::Edit) {
        return Err(ApiError::forbidden("Forbidden"));
    }
    let Some(content) = non_blank(req.content) else {
        return Err(ApiError::bad_request("Konten komentar wajib diisi"));
    };

    let row = run_db(&state, move |db| db.update_comment(&id, &content))
        .await?
        .ok_or_else(|| ApiError::not_found("Komentar tidak ditemukan"))?;

    Ok(Json(json!({
        "comment": comment_response(row, Some(&user)),
        "message": "Komentar berhasil diperbarui",
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_mutate(user.actor(), Subject::comment(&row), Action::Delete) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    run_db(&state, move |db| db.delete_comment(&id)).await?;
    info!("Comment {} deleted by {}", row.id, user.id);

    Ok(Json(json!({ "message": "Komentar berhasil dihapus" })))
}
