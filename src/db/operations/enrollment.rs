use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::operations::course::{map_course, Course};
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: String,
    pub progress: f64,
    pub enrolled_at: String,
    pub last_accessed_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Enrollment plus the full course row, returned on enroll.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentWithCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: Course,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherName {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCount {
    pub lessons: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseWithLessonCount {
    #[serde(flatten)]
    pub course: Course,
    pub teacher: Option<TeacherName>,
    #[serde(rename = "_count")]
    pub counts: LessonCount,
}

/// Shape of the "my enrollments" listing.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentListItem {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseWithLessonCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBrief {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
}

/// Compact enrollment used by the current-user profile payload.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentWithCourseBrief {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseBrief,
}

const ENROLLMENT_COLUMNS: &str = r#"
    e."id", e."userId", e."courseId", e."status"::text AS "status",
    e."progress", e."enrolledAt", e."lastAccessedAt", e."completedAt"
"#;

pub async fn find_by_user_and_course(
    proxy: &DatabaseProxy,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {ENROLLMENT_COLUMNS} FROM "enrollments" e
           WHERE e."userId" = $1 AND e."courseId" = $2 LIMIT 1"#
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_enrollment(&r)))
}

pub async fn insert_enrollment(
    proxy: &DatabaseProxy,
    user_id: &str,
    course_id: &str,
) -> Result<Enrollment, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO "enrollments" ("id", "userId", "courseId", "status", "progress", "enrolledAt")
        VALUES ($1, $2, $3, 'ACTIVE', 0, $4)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(course_id)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(Enrollment {
        id,
        user_id: user_id.to_string(),
        course_id: course_id.to_string(),
        status: "ACTIVE".to_string(),
        progress: 0.0,
        enrolled_at: format_naive_datetime_iso_millis(now),
        last_accessed_at: None,
        completed_at: None,
    })
}

/// Enrollments for one user, most recently accessed first, each with its
/// course, the course's teacher name and lesson count.
pub async fn list_for_user(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Vec<EnrollmentListItem>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {ENROLLMENT_COLUMNS} FROM "enrollments" e
           WHERE e."userId" = $1
           ORDER BY e."lastAccessedAt" DESC NULLS LAST"#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(proxy.pool())
        .await?;
    let enrollments: Vec<Enrollment> = rows.iter().map(map_enrollment).collect();
    if enrollments.is_empty() {
        return Ok(Vec::new());
    }

    let course_ids: Vec<String> = enrollments.iter().map(|e| e.course_id.clone()).collect();
    let course_rows = sqlx::query(
        r#"
        SELECT
            c."id", c."title", c."description", c."thumbnail",
            c."level"::text AS "level", c."status"::text AS "status",
            c."duration", c."price", c."tags", c."creatorId", c."teacherId",
            c."createdAt", c."updatedAt",
            t."firstName" AS "teacherFirstName",
            t."lastName" AS "teacherLastName",
            (SELECT COUNT(*) FROM "lessons" l WHERE l."courseId" = c."id") AS "lessonCount"
        FROM "courses" c
        LEFT JOIN "users" t ON t."id" = c."teacherId"
        WHERE c."id" = ANY($1)
        "#,
    )
    .bind(&course_ids)
    .fetch_all(proxy.pool())
    .await?;

    let mut courses: HashMap<String, CourseWithLessonCount> = HashMap::new();
    for row in &course_rows {
        let course = map_course(row);
        let teacher = row
            .try_get::<Option<String>, _>("teacherFirstName")
            .ok()
            .flatten()
            .map(|first_name| TeacherName {
                first_name,
                last_name: row
                    .try_get::<Option<String>, _>("teacherLastName")
                    .ok()
                    .flatten()
                    .unwrap_or_default(),
            });
        let counts = LessonCount {
            lessons: row.try_get("lessonCount").unwrap_or(0),
        };
        courses.insert(
            course.id.clone(),
            CourseWithLessonCount {
                course,
                teacher,
                counts,
            },
        );
    }

    Ok(enrollments
        .into_iter()
        .filter_map(|enrollment| {
            courses
                .get(&enrollment.course_id)
                .cloned()
                .map(|course| EnrollmentListItem { enrollment, course })
        })
        .collect())
}

pub async fn list_with_course_brief(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Vec<EnrollmentWithCourseBrief>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {ENROLLMENT_COLUMNS},
            c."title" AS "courseTitle",
            c."thumbnail" AS "courseThumbnail"
        FROM "enrollments" e
        JOIN "courses" c ON c."id" = e."courseId"
        WHERE e."userId" = $1
        ORDER BY e."enrolledAt" DESC
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(proxy.pool())
        .await?;
    Ok(rows
        .iter()
        .map(|row| {
            let enrollment = map_enrollment(row);
            let course = CourseBrief {
                id: enrollment.course_id.clone(),
                title: row.try_get("courseTitle").unwrap_or_default(),
                thumbnail: row.try_get("courseThumbnail").ok().flatten(),
            };
            EnrollmentWithCourseBrief { enrollment, course }
        })
        .collect())
}

/// Rewrites the rollup columns after a lesson completion. `completed_at`
/// is stored as given, clearing any previous completion when `None`.
pub async fn update_progress_snapshot(
    proxy: &DatabaseProxy,
    enrollment_id: &str,
    progress: f64,
    completed_at: Option<NaiveDateTime>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "enrollments"
        SET "progress" = $2, "lastAccessedAt" = $3, "completedAt" = $4
        WHERE "id" = $1
        "#,
    )
    .bind(enrollment_id)
    .bind(progress)
    .bind(Utc::now().naive_utc())
    .bind(completed_at)
    .execute(proxy.pool())
    .await?;
    Ok(())
}

pub(crate) fn map_enrollment(row: &sqlx::postgres::PgRow) -> Enrollment {
    let enrolled_at: NaiveDateTime = row
        .try_get("enrolledAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    Enrollment {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        course_id: row.try_get("courseId").unwrap_or_default(),
        status: row.try_get("status").unwrap_or_else(|_| "ACTIVE".to_string()),
        progress: row.try_get("progress").unwrap_or(0.0),
        enrolled_at: format_naive_datetime_iso_millis(enrolled_at),
        last_accessed_at: row
            .try_get::<Option<NaiveDateTime>, _>("lastAccessedAt")
            .ok()
            .flatten()
            .map(format_naive_datetime_iso_millis),
        completed_at: row
            .try_get::<Option<NaiveDateTime>, _>("completedAt")
            .ok()
            .flatten()
            .map(format_naive_datetime_iso_millis),
    }
}
