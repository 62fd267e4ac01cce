use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use cerita_db::{NewUser, is_unique_violation};
use cerita_types::Role;
use cerita_types::api::{LoginRequest, RegisterRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, non_blank};
use crate::middleware::CurrentUser;
use crate::session::{clear_session_cookie, create_token, hash_password, session_cookie, verify_password};
use crate::state::{AppState, run_db};

pub const MIN_PASSWORD_LEN: usize = 6;

fn issue_token(state: &AppState, user: &CurrentUser) -> ApiResult<String> {
    let user_id: Uuid = user.id.parse().map_err(|e| ApiError::Internal(anyhow::anyhow!("bad user id: {}", e)))?;
    Ok(create_token(&state.auth.jwt_secret, user_id, &user.email, user.role)?)
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password), Some(name), Some(role)) = (
        non_blank(req.email),
        non_blank(req.password),
        non_blank(req.name),
        non_blank(req.role),
    ) else {
        return Err(ApiError::bad_request("Semua field wajib diisi"));
    };

    let role: Role = role
        .parse()
        .map_err(|_| ApiError::bad_request("Role harus SISWA atau GURU"))?;

    if role.is_teacher() && req.teacher_code.as_deref() != Some(state.teacher_code.as_str()) {
        return Err(ApiError::bad_request("Kode guru tidak valid"));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password minimal 6 karakter"));
    }

    let email = email.trim().to_string();
    let lookup = email.clone();
    if run_db(&state, move |db| db.email_taken(&lookup, None)).await? {
        return Err(ApiError::bad_request("Email sudah terdaftar"));
    }

    let password_hash = hash_password(&password)?;
    let name = name.trim().to_string();
    let created = run_db(&state, move |db| {
        db.create_user(&NewUser {
            email: &email,
            name: &name,
            password_hash: &password_hash,
            role,
        })
    })
    .await;

    let user = match created {
        Ok(row) => CurrentUser::from(row),
        // Lost a race with a concurrent registration of the same email
        Err(ApiError::Internal(e)) if is_unique_violation(&e) => {
            return Err(ApiError::bad_request("Email sudah terdaftar"));
        }
        Err(e) => return Err(e),
    };
    info!("User registered: {} ({})", user.email, user.role);

    let token = issue_token(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&state.auth, &token))],
        Json(json!({ "user": user.to_response(), "message": "Registrasi berhasil" })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (non_blank(req.email), non_blank(req.password)) else {
        return Err(ApiError::bad_request("Email dan password wajib diisi"));
    };

    let email = email.trim().to_string();
    let row = run_db(&state, move |db| db.get_user_by_email(&email)).await?;

    let Some(row) = row.filter(|row| verify_password(&password, &row.password)) else {
        return Err(ApiError::Unauthorized("Email atau password salah".into()));
    };

    let user = CurrentUser::from(row);
    let token = issue_token(&state, &user)?;
    Ok((
        [(header::SET_COOKIE, session_cookie(&state.auth, &token))],
        Json(json!({ "user": user.to_response(), "message": "Login berhasil" })),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie(&state.auth))],
        Json(json!({ "message": "Logout berhasil" })),
    )
}
