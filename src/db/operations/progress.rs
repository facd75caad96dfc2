use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: String,
    pub user_id: String,
    pub lesson_id: String,
    pub completed: bool,
    pub time_spent: i32,
    pub last_position: Option<f64>,
    pub score: Option<f64>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update accepted by the progress endpoint. Absent fields keep
/// their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    pub completed: Option<bool>,
    pub time_spent: Option<i32>,
    pub last_position: Option<f64>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonBrief {
    pub id: String,
    pub title: String,
    pub course_id: String,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressWithLesson {
    #[serde(flatten)]
    pub progress: Progress,
    pub lesson: LessonBrief,
}

const PROGRESS_COLUMNS: &str = r#"
    p."id", p."userId", p."lessonId", p."completed", p."timeSpent",
    p."lastPosition", p."score", p."completedAt", p."createdAt", p."updatedAt"
"#;

pub async fn find_by_user_and_lesson(
    proxy: &DatabaseProxy,
    user_id: &str,
    lesson_id: &str,
) -> Result<Option<Progress>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {PROGRESS_COLUMNS} FROM "progress" p
           WHERE p."userId" = $1 AND p."lessonId" = $2 LIMIT 1"#
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_progress(&r)))
}

/// Returns the stored progress row, creating an empty one on first access.
pub async fn get_or_create(
    proxy: &DatabaseProxy,
    user_id: &str,
    lesson_id: &str,
) -> Result<Progress, sqlx::Error> {
    if let Some(existing) = find_by_user_and_lesson(proxy, user_id, lesson_id).await? {
        return Ok(existing);
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO "progress" ("id", "userId", "lessonId", "completed", "timeSpent", "createdAt", "updatedAt")
        VALUES ($1, $2, $3, FALSE, 0, $4, $4)
        ON CONFLICT ("userId", "lessonId") DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(lesson_id)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    // A concurrent insert may have won the conflict; read back either way.
    match find_by_user_and_lesson(proxy, user_id, lesson_id).await? {
        Some(progress) => Ok(progress),
        None => Ok(Progress {
            id,
            user_id: user_id.to_string(),
            lesson_id: lesson_id.to_string(),
            completed: false,
            time_spent: 0,
            last_position: None,
            score: None,
            completed_at: None,
            created_at: format_naive_datetime_iso_millis(now),
            updated_at: format_naive_datetime_iso_millis(now),
        }),
    }
}

/// Merges the patch over the stored row and writes the result back.
/// `completed: true` stamps `completedAt`; anything else leaves it alone.
pub async fn upsert_progress(
    proxy: &DatabaseProxy,
    user_id: &str,
    lesson_id: &str,
    patch: &ProgressPatch,
) -> Result<Progress, sqlx::Error> {
    let existing = find_by_user_and_lesson(proxy, user_id, lesson_id).await?;
    let now = Utc::now().naive_utc();

    let completed = patch
        .completed
        .unwrap_or_else(|| existing.as_ref().map(|p| p.completed).unwrap_or(false));
    let time_spent = patch
        .time_spent
        .unwrap_or_else(|| existing.as_ref().map(|p| p.time_spent).unwrap_or(0));
    let last_position = match patch.last_position {
        Some(v) => Some(v),
        None => existing.as_ref().and_then(|p| p.last_position),
    };
    let score = match patch.score {
        Some(v) => Some(v),
        None => existing.as_ref().and_then(|p| p.score),
    };
    let completed_at: Option<NaiveDateTime> = match patch.completed {
        Some(true) => Some(now),
        _ => existing
            .as_ref()
            .and_then(|p| p.completed_at.as_deref())
            .and_then(parse_iso_millis),
    };

    let id = existing
        .as_ref()
        .map(|p| p.id.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    sqlx::query(
        r#"
        INSERT INTO "progress"
            ("id", "userId", "lessonId", "completed", "timeSpent", "lastPosition", "score", "completedAt", "createdAt", "updatedAt")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        ON CONFLICT ("userId", "lessonId") DO UPDATE SET
            "completed" = EXCLUDED."completed",
            "timeSpent" = EXCLUDED."timeSpent",
            "lastPosition" = EXCLUDED."lastPosition",
            "score" = EXCLUDED."score",
            "completedAt" = EXCLUDED."completedAt",
            "updatedAt" = EXCLUDED."updatedAt"
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(lesson_id)
    .bind(completed)
    .bind(time_spent)
    .bind(last_position)
    .bind(score)
    .bind(completed_at)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(Progress {
        id,
        user_id: user_id.to_string(),
        lesson_id: lesson_id.to_string(),
        completed,
        time_spent,
        last_position,
        score,
        completed_at: completed_at.map(format_naive_datetime_iso_millis),
        created_at: existing
            .as_ref()
            .map(|p| p.created_at.clone())
            .unwrap_or_else(|| format_naive_datetime_iso_millis(now)),
        updated_at: format_naive_datetime_iso_millis(now),
    })
}

pub async fn count_completed_for_course(
    proxy: &DatabaseProxy,
    user_id: &str,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS "count"
        FROM "progress" p
        JOIN "lessons" l ON l."id" = p."lessonId"
        WHERE p."userId" = $1 AND p."completed" = TRUE AND l."courseId" = $2
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(proxy.pool())
    .await?;
    Ok(row.try_get("count").unwrap_or(0))
}

/// Progress rows for a user, newest first, optionally limited to one course.
pub async fn list_for_user(
    proxy: &DatabaseProxy,
    user_id: &str,
    course_id: Option<&str>,
) -> Result<Vec<ProgressWithLesson>, sqlx::Error> {
    let base = format!(
        r#"
        SELECT {PROGRESS_COLUMNS},
            l."title" AS "lessonTitle",
            l."courseId" AS "lessonCourseId",
            l."order" AS "lessonOrder"
        FROM "progress" p
        JOIN "lessons" l ON l."id" = p."lessonId"
        WHERE p."userId" = $1
        "#
    );
    let rows = match course_id {
        Some(course_id) => {
            let sql = format!(r#"{base} AND l."courseId" = $2 ORDER BY p."updatedAt" DESC"#);
            sqlx::query(&sql)
                .bind(user_id)
                .bind(course_id)
                .fetch_all(proxy.pool())
                .await?
        }
        None => {
            let sql = format!(r#"{base} ORDER BY p."updatedAt" DESC"#);
            sqlx::query(&sql).bind(user_id).fetch_all(proxy.pool()).await?
        }
    };

    Ok(rows
        .iter()
        .map(|row| {
            let progress = map_progress(row);
            let lesson = LessonBrief {
                id: progress.lesson_id.clone(),
                title: row.try_get("lessonTitle").unwrap_or_default(),
                course_id: row.try_get("lessonCourseId").unwrap_or_default(),
                order: row.try_get("lessonOrder").unwrap_or(0),
            };
            ProgressWithLesson { progress, lesson }
        })
        .collect())
}

fn parse_iso_millis(value: &str) -> Option<NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
}

pub(crate) fn map_progress(row: &sqlx::postgres::PgRow) -> Progress {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    Progress {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        lesson_id: row.try_get("lessonId").unwrap_or_default(),
        completed: row.try_get("completed").unwrap_or(false),
        time_spent: row.try_get("timeSpent").unwrap_or(0),
        last_position: row.try_get("lastPosition").ok().flatten(),
        score: row.try_get("score").ok().flatten(),
        completed_at: row
            .try_get::<Option<NaiveDateTime>, _>("completedAt")
            .ok()
            .flatten()
            .map(format_naive_datetime_iso_millis),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}
