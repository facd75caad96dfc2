use axum::extract::{Path, Query, State};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::operations::lesson::{self, LessonDetail};
use crate::db::operations::progress::{self, Progress, ProgressPatch, ProgressWithLesson};
use crate::db::operations::enrollment;
use crate::middleware::auth::require_auth;
use crate::response::AppError;
use crate::state::AppState;

const DETAIL_ERROR: &str = "Server error fetching lesson";
const PROGRESS_ERROR: &str = "Server error updating progress";
const MY_PROGRESS_ERROR: &str = "Server error fetching progress";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/progress/my", get(my_progress))
        .route("/:id/progress", post(update_progress))
        .route("/:id", get(lesson_by_id))
        .route_layer(from_fn(require_auth))
}

#[derive(Serialize)]
struct LessonResponse {
    lesson: LessonDetail,
    progress: Progress,
}

#[derive(Serialize)]
struct ProgressResponse {
    progress: Progress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyProgressQuery {
    course_id: Option<String>,
}

#[derive(Serialize)]
struct MyProgressResponse {
    progress: Vec<ProgressWithLesson>,
}

async fn lesson_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(DETAIL_ERROR));
    };

    let Some(detail) = lesson::get_lesson_detail(proxy.as_ref(), &id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "lesson lookup failed");
            AppError::internal(DETAIL_ERROR)
        })?
    else {
        return Err(AppError::not_found("Lesson not found"));
    };

    let enrolled =
        enrollment::find_by_user_and_course(proxy.as_ref(), &user.id, &detail.lesson.course_id)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "enrollment lookup failed");
                AppError::internal(DETAIL_ERROR)
            })?;
    if enrolled.is_none() {
        return Err(AppError::forbidden("Not enrolled in this course"));
    }

    let progress = progress::get_or_create(proxy.as_ref(), &user.id, &id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "progress init failed");
            AppError::internal(DETAIL_ERROR)
        })?;

    Ok(Json(LessonResponse {
        lesson: detail,
        progress,
    }))
}

async fn update_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(lesson_id): Path<String>,
    Json(patch): Json<ProgressPatch>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(PROGRESS_ERROR));
    };

    let Some(target) = lesson::find_lesson(proxy.as_ref(), &lesson_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "lesson lookup failed");
            AppError::internal(PROGRESS_ERROR)
        })?
    else {
        return Err(AppError::not_found("Lesson not found"));
    };

    let Some(enrolled) =
        enrollment::find_by_user_and_course(proxy.as_ref(), &user.id, &target.course_id)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "enrollment lookup failed");
                AppError::internal(PROGRESS_ERROR)
            })?
    else {
        return Err(AppError::forbidden("Not enrolled in this course"));
    };

    let updated = progress::upsert_progress(proxy.as_ref(), &user.id, &lesson_id, &patch)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "progress upsert failed");
            AppError::internal(PROGRESS_ERROR)
        })?;

    // Completing a lesson refreshes the course-level rollup.
    if patch.completed == Some(true) {
        let total = lesson::count_published_for_course(proxy.as_ref(), &target.course_id)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "lesson count failed");
                AppError::internal(PROGRESS_ERROR)
            })?;
        let completed =
            progress::count_completed_for_course(proxy.as_ref(), &user.id, &target.course_id)
                .await
                .map_err(|err| {
                    tracing::error!(error = %err, "completed count failed");
                    AppError::internal(PROGRESS_ERROR)
                })?;

        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let completed_at = (percentage == 100.0).then(|| Utc::now().naive_utc());

        enrollment::update_progress_snapshot(proxy.as_ref(), &enrolled.id, percentage, completed_at)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "enrollment rollup failed");
                AppError::internal(PROGRESS_ERROR)
            })?;
    }

    Ok(Json(ProgressResponse { progress: updated }))
}

async fn my_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<MyProgressQuery>,
) -> Result<impl IntoResponse, AppError> {
    let Some(proxy) = state.db_proxy() else {
        return Err(AppError::internal(MY_PROGRESS_ERROR));
    };

    let rows = progress::list_for_user(proxy.as_ref(), &user.id, query.course_id.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "progress list failed");
            AppError::internal(MY_PROGRESS_ERROR)
        })?;

    Ok(Json(MyProgressResponse { progress: rows }))
}
