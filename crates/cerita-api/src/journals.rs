use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use cerita_db::models::{CommentTarget, JournalRow};
use cerita_db::{DiaryScope, JournalListFilter, JournalPatch, NewJournal};
use cerita_types::Privacy;
use cerita_types::api::{JournalRequest, Pagination};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, Page, non_blank};
use crate::middleware::{CurrentUser, Viewer};
use crate::policy::{Action, Subject, can_mutate, can_view};
use crate::state::{AppState, run_db};
use crate::views::{comment_thread, journal_response};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalQuery {
    page: Option<u32>,
    limit: Option<u32>,
    privacy: Option<Privacy>,
    author_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiaryQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    ApiQuery(query): ApiQuery<JournalQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::new(query.page, query.limit, 10);
    let viewer_id = viewer.user().map(|u| u.id.clone());
    let (privacy, author_id) = (query.privacy, non_blank(query.author_id));

    let (rows, total) = run_db(&state, move |db| {
        db.list_journals(&JournalListFilter {
            viewer_id: viewer_id.as_deref(),
            privacy,
            author_id: author_id.as_deref(),
            limit: page.limit,
            offset: page.offset(),
        })
    })
    .await?;

    let journals: Vec<_> = rows.into_iter().map(|row| journal_response(row, viewer.user())).collect();
    Ok(Json(json!({
        "journals": journals,
        "pagination": Pagination::new(page.page, page.limit, total),
    })))
}

/// Teachers see what students chose to share; students see everything they wrote.
pub async fn diary(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<DiaryQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::new(query.page, query.limit, 10);
    let is_teacher = user.role.is_teacher();
    let user_id = user.id.clone();

    let (rows, total) = run_db(&state, move |db| {
        let scope = if is_teacher {
            DiaryScope::SharedByStudents
        } else {
            DiaryScope::OwnedBy(&user_id)
        };
        db.list_diary(scope, page.limit, page.offset())
    })
    .await?;

    let journals: Vec<_> = rows.into_iter().map(|row| journal_response(row, Some(&user))).collect();
    Ok(Json(json!({
        "journals": journals,
        "pagination": Pagination::new(page.page, page.limit, total),
    })))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<JournalRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(title), Some(content)) = (non_blank(req.title), non_blank(req.content)) else {
        return Err(ApiError::bad_request("Judul dan konten wajib diisi"));
    };
    let privacy = req.privacy.unwrap_or(Privacy::Private);

    let author_id = user.id.clone();
    let row = run_db(&state, move |db| {
        db.insert_journal(&NewJournal {
            author_id: &author_id,
            title: &title,
            content: &content,
            privacy,
        })
    })
    .await?;
    info!("Journal {} created by {}", row.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "journal": journal_response(row, Some(&user)), "message": "Jurnal berhasil dibuat" })),
    ))
}

async fn load(state: &AppState, id: String) -> ApiResult<JournalRow> {
    run_db(state, move |db| db.get_journal(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Jurnal tidak ditemukan"))
}

pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_view(viewer.actor(), Subject::journal(&row)) {
        return Err(ApiError::not_found("Jurnal tidak ditemukan"));
    }

    let comments = run_db(&state, move |db| db.comments_for(&CommentTarget::Journal(id))).await?;

    let mut journal = journal_response(row, viewer.user());
    journal.comments = Some(comment_thread(comments, viewer.user()));
    Ok(Json(json!({ "journal": journal })))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<JournalRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_mutate(user.actor(), Subject::journal(&row), Action::Edit) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    let (title, content, privacy) = (non_blank(req.title), non_blank(req.content), req.privacy);
    let row = run_db(&state, move |db| {
        db.update_journal(
            &id,
            &JournalPatch {
                title: title.as_deref(),
                content: content.as_deref(),
                privacy,
            },
        )
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Jurnal tidak ditemukan"))?;

    Ok(Json(json!({ "journal": journal_response(row, Some(&user)), "message": "Jurnal berhasil diperbarui" })))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_mutate(user.actor(), Subject::journal(&row), Action::Delete) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    run_db(&state, move |db| db.delete_journal(&id)).await?;
    info!("Journal {} deleted by {}", row.id, user.id);

    Ok(Json(json!({ "message": "Jurnal berhasil dihapus" })))
}
