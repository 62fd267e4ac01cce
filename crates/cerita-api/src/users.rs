use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::info;

use cerita_db::{ProfilePatch, is_unique_violation};
use cerita_types::api::{ChangePasswordRequest, UpdateProfileRequest};

use crate::auth::MIN_PASSWORD_LEN;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, non_blank};
use crate::middleware::CurrentUser;
use crate::session::{hash_password, verify_password};
use crate::state::{AppState, run_db};

pub async fn me(user: CurrentUser) -> impl IntoResponse {
    Json(json!({ "user": user.to_response() }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = non_blank(req.name).map(|n| n.trim().to_string());
    let email = non_blank(req.email).map(|e| e.trim().to_string());
    let avatar = req.avatar;

    let user_id = user.id.clone();
    let updated = run_db(&state, move |db| {
        if let Some(email) = &email {
            if db.email_taken(email, Some(user_id.as_str()))? {
                return Ok(Err(ApiError::bad_request("Email sudah digunakan")));
            }
        }
        let patch = ProfilePatch {
            name: name.as_deref(),
            email: email.as_deref(),
            avatar: avatar.as_ref().map(|a| a.as_deref()),
        };
        Ok(Ok(db.update_profile(&user_id, &patch)?))
    })
    .await;

    let row = match updated {
        Ok(result) => result?,
        Err(ApiError::Internal(e)) if is_unique_violation(&e) => {
            return Err(ApiError::bad_request("Email sudah digunakan"));
        }
        Err(e) => return Err(e),
    }
    .ok_or_else(|| ApiError::not_found("User tidak ditemukan"))?;

    let user = CurrentUser::from(row);
    Ok(Json(json!({ "user": user.to_response(), "message": "Profil berhasil diperbarui" })))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(current), Some(new)) = (non_blank(req.current_password), non_blank(req.new_password)) else {
        return Err(ApiError::bad_request("Password lama dan baru wajib diisi"));
    };
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password baru minimal 6 karakter"));
    }

    let user_id = user.id.clone();
    let row = run_db(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("User tidak ditemukan"))?;

    if !verify_password(&current, &row.password) {
        return Err(ApiError::bad_request("Password lama salah"));
    }

    let hash = hash_password(&new)?;
    let user_id = user.id.clone();
    run_db(&state, move |db| db.update_password(&user_id, &hash)).await?;
    info!("Password changed for user {}", user.id);

    Ok(Json(json!({ "message": "Password berhasil diubah" })))
}
