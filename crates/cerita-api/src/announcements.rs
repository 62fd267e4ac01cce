use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use cerita_db::models::{AnnouncementRow, CommentTarget};
use cerita_types::api::{AnnouncementRequest, Pagination};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, Page, non_blank};
use crate::middleware::CurrentUser;
use crate::policy::{Action, ResourceKind, Subject, can_create, can_mutate};
use crate::state::{AppState, run_db};
use crate::views::{announcement_response, comment_thread};

#[derive(Debug, Deserialize)]
pub struct AnnouncementQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<AnnouncementQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::new(query.page, query.limit, 10);
    let (rows, total) = run_db(&state, move |db| db.list_announcements(page.limit, page.offset())).await?;

    let announcements: Vec<_> = rows
        .into_iter()
        .map(|row| announcement_response(row, Some(&user)))
        .collect();
    Ok(Json(json!({
        "announcements": announcements,
        "pagination": Pagination::new(page.page, page.limit, total),
    })))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<AnnouncementRequest>,
) -> ApiResult<impl IntoResponse> {
    if !can_create(user.actor(), ResourceKind::Announcement) {
        return Err(ApiError::forbidden("Hanya guru yang dapat membuat pengumuman"));
    }
    let (Some(title), Some(content)) = (non_blank(req.title), non_blank(req.content)) else {
        return Err(ApiError::bad_request("Judul dan konten wajib diisi"));
    };

    let author_id = user.id.clone();
    let row = run_db(&state, move |db| db.insert_announcement(&author_id, &title, &content)).await?;
    info!("Announcement {} created by {}", row.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "announcement": announcement_response(row, Some(&user)),
            "message": "Pengumuman berhasil dibuat",
        })),
    ))
}

async fn load(state: &AppState, id: String) -> ApiResult<AnnouncementRow> {
    run_db(state, move |db| db.get_announcement(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Pengumuman tidak ditemukan"))
}

pub async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    let comments = run_db(&state, move |db| db.comments_for(&CommentTarget::Announcement(id))).await?;

    let mut announcement = announcement_response(row, Some(&user));
    announcement.comments = Some(comment_thread(comments, Some(&user)));
    Ok(Json(json!({ "announcement": announcement })))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AnnouncementRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_mutate(user.actor(), Subject::announcement(&row), Action::Edit) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    let (title, content) = (non_blank(req.title), non_blank(req.content));
    let row = run_db(&state, move |db| db.update_announcement(&id, title.as_deref(), content.as_deref()))
        .await?
        .ok_or_else(|| ApiError::not_found("Pengumuman tidak ditemukan"))?;

    Ok(Json(json!({
        "announcement": announcement_response(row, Some(&user)),
        "message": "Pengumuman berhasil diperbarui",
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_mutate(user.actor(), Subject::announcement(&row), Action::Delete) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    run_db(&state, move |db| db.delete_announcement(&id)).await?;
    info!("Announcement {} deleted by {}", row.id, user.id);

    Ok(Json(json!({ "message": "Pengumuman berhasil dihapus" })))
}
