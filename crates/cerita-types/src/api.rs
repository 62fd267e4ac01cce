use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{MoodType, Privacy, ReactionType, Role};

// -- JWT Claims --

/// Session token payload, carried in the `auth-token` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub teacher_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// -- Users --

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Author block attached to every rendered record. When the record is
/// anonymous every identifying field is stripped before serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: Option<String>,
    pub name: String,
    pub initial: String,
    pub avatar: Option<String>,
    pub role: Option<Role>,
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit as u64) };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

// -- Stories --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub thumbnail: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub privacy: Option<Privacy>,
    pub is_interactive: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Counts {
    pub reactions: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub thumbnail: Option<String>,
    pub tags: Vec<String>,
    pub privacy: Privacy,
    pub is_interactive: bool,
    pub view_count: u64,
    pub author: AuthorView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Counts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<ReactionSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
}

// -- Journals --

#[derive(Debug, Default, Deserialize)]
pub struct JournalRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub privacy: Option<Privacy>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub privacy: Privacy,
    pub author: AuthorView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
}

// -- Announcements --

#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: AuthorView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub story_id: Option<String>,
    pub journal_id: Option<String>,
    pub announcement_id: Option<String>,
    pub content: Option<String>,
    pub is_anonymous: Option<bool>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub content: String,
    pub is_anonymous: bool,
    pub parent_id: Option<String>,
    pub author: AuthorView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub replies: Vec<CommentResponse>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionRequest {
    pub story_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    pub id: String,
    pub story_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ReactionType,
    pub created_at: DateTime<Utc>,
}

/// Per-type tally for one story, as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionSummary {
    #[serde(rename = "type")]
    pub kind: ReactionType,
    pub count: u64,
    pub reacted: bool,
}

// -- Moods --

#[derive(Debug, Deserialize)]
pub struct SubmitMoodRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MoodType,
    pub note: Option<String>,
    pub mood_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type MoodDistribution = BTreeMap<MoodType, u64>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationStats {
    pub total_students: u64,
    pub students_logged_today: u64,
    pub participation_rate: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodStatsResponse {
    pub today: MoodDistribution,
    #[serde(rename = "last7Days")]
    pub last_7_days: MoodDistribution,
    #[serde(rename = "last30Days")]
    pub last_30_days: MoodDistribution,
    pub all_time: MoodDistribution,
    pub stats: ParticipationStats,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_avatar_distinguishes_null_from_absent() {
        let absent: UpdateProfileRequest = serde_json::from_str(r#"{"name":"Sari"}"#).unwrap();
        assert_eq!(absent.avatar, None);

        let cleared: UpdateProfileRequest = serde_json::from_str(r#"{"avatar":null}"#).unwrap();
        assert_eq!(cleared.avatar, Some(None));

        let set: UpdateProfileRequest =
            serde_json::from_str(r#"{"avatar":"https://cdn/a.png"}"#).unwrap();
        assert_eq!(set.avatar, Some(Some("https://cdn/a.png".into())));
    }

    #[test]
    fn pagination_rounds_pages_up() {
        let p = Pagination::new(1, 10, 21);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
    }

    #[test]
    fn mood_stats_serialize_with_enum_keys() {
        let mut today = MoodDistribution::new();
        today.insert(MoodType::Happy, 2);
        let stats = MoodStatsResponse {
            today: today.clone(),
            last_7_days: today.clone(),
            last_30_days: today.clone(),
            all_time: today,
            stats: ParticipationStats {
                total_students: 4,
                students_logged_today: 2,
                participation_rate: 50,
            },
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["today"]["SENANG"], 2);
        assert_eq!(value["last7Days"]["SENANG"], 2);
        assert_eq!(value["stats"]["participationRate"], 50);
    }
}
