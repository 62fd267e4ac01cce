use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use cerita_db::models::{CommentTarget, StoryRow};
use cerita_db::{NewStory, StoryListFilter, StoryPatch, StorySort};
use cerita_types::Privacy;
use cerita_types::api::{Pagination, StoryRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, Page, non_blank};
use crate::middleware::{CurrentUser, Viewer};
use crate::policy::{Action, Subject, can_mutate, can_view};
use crate::state::{AppState, run_db};
use crate::views::{comment_thread, reaction_summary, story_response};

#[derive(Debug, Deserialize)]
pub struct StoryQuery {
    page: Option<u32>,
    limit: Option<u32>,
    tag: Option<String>,
    sort: Option<String>,
    privacy: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    ApiQuery(query): ApiQuery<StoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::new(query.page, query.limit, 10);
    let sort = match query.sort.as_deref() {
        Some("popular") => StorySort::Popular,
        _ => StorySort::Latest,
    };
    let public_only = query.privacy.as_deref() == Some(Privacy::Public.as_str());
    let viewer_id = viewer.user().map(|u| u.id.clone());
    let tag = non_blank(query.tag);

    let (rows, total) = run_db(&state, move |db| {
        db.list_stories(&StoryListFilter {
            viewer_id: viewer_id.as_deref(),
            public_only,
            tag: tag.as_deref(),
            sort,
            limit: page.limit,
            offset: page.offset(),
        })
    })
    .await?;

    let stories: Vec<_> = rows.into_iter().map(|row| story_response(row, viewer.user())).collect();
    Ok(Json(json!({
        "stories": stories,
        "pagination": Pagination::new(page.page, page.limit, total),
    })))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<StoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(title), Some(content)) = (non_blank(req.title), non_blank(req.content)) else {
        return Err(ApiError::bad_request("Judul dan konten wajib diisi"));
    };
    let thumbnail = req.thumbnail.flatten();
    let tags = req.tags.unwrap_or_default();
    let privacy = req.privacy.unwrap_or(Privacy::Public);
    let is_interactive = req.is_interactive.unwrap_or(false);

    let author_id = user.id.clone();
    let row = run_db(&state, move |db| {
        db.insert_story(&NewStory {
            author_id: &author_id,
            title: &title,
            content: &content,
            thumbnail: thumbnail.as_deref(),
            tags: &tags,
            privacy,
            is_interactive,
        })
    })
    .await?;
    info!("Story {} created by {}", row.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "story": story_response(row, Some(&user)), "message": "Cerita berhasil dibuat" })),
    ))
}

async fn load(state: &AppState, id: String) -> ApiResult<StoryRow> {
    run_db(state, move |db| db.get_story(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Cerita tidak ditemukan"))
}

pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    // Hidden stories are reported as missing
    if !can_view(viewer.actor(), Subject::story(&row)) {
        return Err(ApiError::not_found("Cerita tidak ditemukan"));
    }

    let (reactions, comments) = run_db(&state, move |db| {
        db.increment_story_views(&id)?;
        let reactions = db.reactions_for_story(&id)?;
        let comments = db.comments_for(&CommentTarget::Story(id))?;
        Ok((reactions, comments))
    })
    .await?;

    let mut story = story_response(row, viewer.user());
    story.view_count += 1;
    story.reactions = Some(reaction_summary(&reactions, viewer.user()));
    story.comments = Some(comment_thread(comments, viewer.user()));

    Ok(Json(json!({ "story": story })))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_mutate(user.actor(), Subject::story(&row), Action::Edit) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    let title = non_blank(req.title);
    let content = non_blank(req.content);
    let thumbnail = req.thumbnail;
    let tags = req.tags;
    let (privacy, is_interactive) = (req.privacy, req.is_interactive);

    let row = run_db(&state, move |db| {
        db.update_story(
            &id,
            &StoryPatch {
                title: title.as_deref(),
                content: content.as_deref(),
                thumbnail: thumbnail.as_ref().map(|t| t.as_deref()),
                tags: tags.as_deref(),
                privacy,
                is_interactive,
            },
        )
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Cerita tidak ditemukan"))?;

    Ok(Json(json!({ "story": story_response(row, Some(&user)), "message": "Cerita berhasil diperbarui" })))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let row = load(&state, id.clone()).await?;
    if !can_mutate(user.actor(), Subject::story(&row), Action::Delete) {
        return Err(ApiError::forbidden("Forbidden"));
    }

    run_db(&state, move |db| db.delete_story(&id)).await?;
    info!("Story {} deleted by {}", row.id, user.id);

    Ok(Json(json!({ "message": "Cerita berhasil dihapus" })))
}
