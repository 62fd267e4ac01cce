use std::path::Path;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::gate::page_gate;
use crate::middleware::resolve_viewer;
use crate::state::AppState;
use crate::uploads::MAX_UPLOAD_BYTES;
use crate::{announcements, auth, comments, journals, moods, reactions, stories, uploads, users};

/// The whole HTTP surface: `/api`, uploaded media, and the gated frontend
/// when `static_dir` is given.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/user/me", get(users::me))
        .route("/api/user/profile", put(users::update_profile))
        .route("/api/user/password", put(users::change_password))
        .route("/api/stories", get(stories::list).post(stories::create))
        .route(
            "/api/stories/{id}",
            get(stories::detail).put(stories::update).delete(stories::delete),
        )
        .route("/api/journals", get(journals::list).post(journals::create))
        .route("/api/journals/diary", get(journals::diary))
        .route(
            "/api/journals/{id}",
            get(journals::detail).put(journals::update).delete(journals::delete),
        )
        .route(
            "/api/announcements",
            get(announcements::list).post(announcements::create),
        )
        .route(
            "/api/announcements/{id}",
            get(announcements::detail)
                .put(announcements::update)
                .delete(announcements::delete),
        )
        .route("/api/comments", post(comments::create))
        .route("/api/comments/{id}", put(comments::update).delete(comments::delete))
        .route("/api/reactions", post(reactions::toggle))
        .route("/api/moods", get(moods::list).post(moods::submit))
        .route("/api/moods/stats", get(moods::stats))
        .route("/api/upload", post(uploads::upload_thumbnail))
        .route("/api/upload-avatar", post(uploads::upload_avatar))
        // Room for a maximal image plus multipart framing; the handlers enforce the real limit
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_viewer));

    let mut app = api;

    if let Some(dir) = state.storage.media_dir() {
        app = app.nest_service("/media", ServeDir::new(dir));
    }

    if let Some(dir) = static_dir {
        let frontend: Router = Router::new()
            .fallback_service(ServeDir::new(dir))
            .layer(middleware::from_fn_with_state(state.clone(), page_gate));
        app = app.fallback_service(frontend);
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
