use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    response::IntoResponse,
};
use bytes::Bytes;
use tracing::info;

use cerita_types::api::UploadResponse;

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::storage::Bucket;

/// Max image size (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted MIME types and the extension each is stored under.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(content_type))
        .map(|(_, ext)| *ext)
}

fn object_name(user_id: &str, millis: i64, ext: &str) -> String {
    format!("{user_id}-{millis}.{ext}")
}

struct UploadedFile {
    content_type: String,
    data: Bytes,
}

async fn read_file(mut multipart: Multipart) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        return Ok(UploadedFile { content_type, data });
    }
    Err(ApiError::bad_request("File tidak ditemukan"))
}

fn validate(file: &UploadedFile) -> ApiResult<&'static str> {
    if file.data.is_empty() {
        return Err(ApiError::bad_request("File tidak ditemukan"));
    }
    if file.data.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::bad_request("Ukuran file maksimal 5MB"));
    }
    extension_for(&file.content_type)
        .ok_or_else(|| ApiError::bad_request("Format file harus JPG, PNG, atau WEBP"))
}

async fn store(
    state: &AppState,
    user: &CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
    bucket: Bucket,
) -> ApiResult<UploadResponse> {
    let file = read_file(multipart?).await?;
    let ext = validate(&file)?;

    let name = object_name(&user.id, chrono::Utc::now().timestamp_millis(), ext);
    let size = file.data.len();
    let url = state.storage.put(bucket, &name, &file.content_type, file.data).await?;
    info!("Stored {} in {} ({} bytes) for {}", name, bucket.as_str(), size, user.id);

    Ok(UploadResponse {
        url,
        message: "File berhasil diupload".to_string(),
    })
}

pub async fn upload_thumbnail(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(store(&state, &user, multipart, Bucket::Thumbnails).await?))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(store(&state, &user, multipart, Bucket::Avatars).await?))
}
