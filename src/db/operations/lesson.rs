use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    pub r#type: String,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub transcript: Option<String>,
    pub duration: i32,
    pub order: i32,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    pub r#type: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBrief {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonDetail {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub course: CourseBrief,
    pub resources: Vec<Resource>,
}

const LESSON_COLUMNS: &str = r#"
    "id", "courseId", "title", "description", "type"::text AS "type",
    "content", "videoUrl", "transcript", "duration", "order",
    "isPublished", "createdAt", "updatedAt"
"#;

pub async fn find_lesson(proxy: &DatabaseProxy, id: &str) -> Result<Option<Lesson>, sqlx::Error> {
    let sql = format!(r#"SELECT {LESSON_COLUMNS} FROM "lessons" WHERE "id" = $1 LIMIT 1"#);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_lesson(&r)))
}

pub async fn get_lesson_detail(
    proxy: &DatabaseProxy,
    id: &str,
) -> Result<Option<LessonDetail>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {LESSON_COLUMNS}, c."title" AS "courseTitle"
        FROM "lessons"
        JOIN "courses" c ON c."id" = "lessons"."courseId"
        WHERE "lessons"."id" = $1
        LIMIT 1
        "#
    );
    let Some(row) = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(proxy.pool())
        .await?
    else {
        return Ok(None);
    };

    let lesson = map_lesson(&row);
    let course = CourseBrief {
        id: lesson.course_id.clone(),
        title: row.try_get("courseTitle").unwrap_or_default(),
    };

    let resource_rows = sqlx::query(
        r#"SELECT * FROM "resources" WHERE "lessonId" = $1 ORDER BY "createdAt" ASC"#,
    )
    .bind(id)
    .fetch_all(proxy.pool())
    .await?;

    let resources = resource_rows
        .iter()
        .map(|r| {
            let created_at: NaiveDateTime = r
                .try_get("createdAt")
                .unwrap_or_else(|_| Utc::now().naive_utc());
            Resource {
                id: r.try_get("id").unwrap_or_default(),
                lesson_id: r.try_get("lessonId").unwrap_or_default(),
                title: r.try_get("title").unwrap_or_default(),
                r#type: r.try_get("type").unwrap_or_default(),
                url: r.try_get("url").unwrap_or_default(),
                created_at: format_naive_datetime_iso_millis(created_at),
            }
        })
        .collect();

    Ok(Some(LessonDetail {
        lesson,
        course,
        resources,
    }))
}

pub async fn count_published_for_course(
    proxy: &DatabaseProxy,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS "count" FROM "lessons" WHERE "courseId" = $1 AND "isPublished" = TRUE"#,
    )
    .bind(course_id)
    .fetch_one(proxy.pool())
    .await?;
    Ok(row.try_get("count").unwrap_or(0))
}

fn map_lesson(row: &sqlx::postgres::PgRow) -> Lesson {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    Lesson {
        id: row.try_get("id").unwrap_or_default(),
        course_id: row.try_get("courseId").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        description: row.try_get("description").ok().flatten(),
        r#type: row.try_get("type").unwrap_or_else(|_| "VIDEO".to_string()),
        content: row.try_get("content").ok().flatten(),
        video_url: row.try_get("videoUrl").ok().flatten(),
        transcript: row.try_get("transcript").ok().flatten(),
        duration: row.try_get("duration").unwrap_or(0),
        order: row.try_get("order").unwrap_or(0),
        is_published: row.try_get("isPublished").unwrap_or(false),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}
