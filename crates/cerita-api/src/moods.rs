use axum::{Json, extract::State, response::IntoResponse};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use cerita_db::MoodUpsert;
use cerita_types::MoodType;
use cerita_types::api::{MoodDistribution, MoodStatsResponse, ParticipationStats, SubmitMoodRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, non_blank};
use crate::middleware::CurrentUser;
use crate::state::{AppState, run_db};
use crate::views::mood_response;

const DEFAULT_LIMIT: u32 = 7;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct MoodQuery {
    limit: Option<u32>,
}

pub async fn submit(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<SubmitMoodRequest>,
) -> ApiResult<impl IntoResponse> {
    let Some(kind) = non_blank(req.kind) else {
        return Err(ApiError::bad_request("Tipe mood wajib diisi"));
    };
    let kind: MoodType = kind
        .parse()
        .map_err(|_| ApiError::bad_request("Tipe mood tidak valid"))?;
    let note = non_blank(req.note);

    let day = state.today();
    let user_id = user.id.clone();
    let saved = run_db(&state, move |db| db.upsert_mood(&user_id, day, kind, note.as_deref())).await?;
    debug!("Mood {} for {} on {}", kind, user.id, day);

    let message = upsert_message(&saved);
    Ok(Json(json!({ "mood": mood_response(saved.into_row()), "message": message })))
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<MoodQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let rows = run_db(&state, move |db| db.recent_moods(&user.id, limit)).await?;

    let moods: Vec<_> = rows.into_iter().map(mood_response).collect();
    Ok(Json(json!({ "moods": moods })))
}

fn upsert_message(saved: &MoodUpsert) -> &'static str {
    match saved {
        MoodUpsert::Created(_) => "Mood berhasil dicatat",
        MoodUpsert::Updated(_) => "Mood hari ini berhasil diperbarui",
    }
}

/// Every mood type present, zero when nobody picked it.
fn distribution(counts: Vec<(MoodType, u64)>) -> MoodDistribution {
    let mut dist: MoodDistribution = MoodType::ALL.iter().map(|&kind| (kind, 0)).collect();
    dist.extend(counts);
    dist
}

fn participation_rate(logged: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    ((logged as f64 / total as f64) * 100.0).round() as u64
}

fn days_before(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN)
}

/// Student mood overview for teachers.
pub async fn stats(State(state): State<AppState>, user: CurrentUser) -> ApiResult<impl IntoResponse> {
    if !user.role.is_teacher() {
        return Err(ApiError::forbidden("Hanya guru yang dapat melihat statistik mood"));
    }

    let today = state.today();
    let stats = run_db(&state, move |db| {
        let total_students = db.count_students()?;
        let students_logged_today = db.students_logged_on(today)?;
        Ok(MoodStatsResponse {
            today: distribution(db.student_mood_counts(Some(today))?),
            last_7_days: distribution(db.student_mood_counts(Some(days_before(today, 7)))?),
            last_30_days: distribution(db.student_mood_counts(Some(days_before(today, 30)))?),
            all_time: distribution(db.student_mood_counts(None)?),
            stats: ParticipationStats {
                total_students,
                students_logged_today,
                participation_rate: participation_rate(students_logged_today, total_students),
            },
        })
    })
    .await?;

    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_fills_missing_types() {
        let dist = distribution(vec![(MoodType::Happy, 3)]);
        assert_eq!(dist.len(), MoodType::ALL.len());
        assert_eq!(dist[&MoodType::Happy], 3);
        assert_eq!(dist[&MoodType::Angry], 0);
    }

    #[test]
    fn rate_rounds_and_handles_empty_class() {
        assert_eq!(participation_rate(0, 0), 0);
        assert_eq!(participation_rate(1, 3), 33);
        assert_eq!(participation_rate(2, 3), 67);
        assert_eq!(participation_rate(4, 4), 100);
    }
}
