use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub level: String,
    pub status: String,
    pub duration: i32,
    pub price: f64,
    pub tags: Vec<String>,
    pub creator_id: String,
    pub teacher_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCounts {
    pub lessons: i64,
    pub enrollments: i64,
}

/// Course row plus the embedded relations the list endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct CourseWithTeacher {
    #[serde(flatten)]
    pub course: Course,
    pub teacher: Option<TeacherSummary>,
    #[serde(rename = "_count")]
    pub counts: CourseCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub r#type: String,
    pub duration: i32,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUser {
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithUser {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: String,
    pub user: ReviewUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub teacher: Option<TeacherSummary>,
    pub lessons: Vec<LessonSummary>,
    pub reviews: Vec<ReviewWithUser>,
}

#[derive(Debug, Clone)]
pub struct CourseFilter {
    pub status: Option<String>,
    pub level: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub level: Option<String>,
    pub duration: Option<i32>,
    pub price: Option<f64>,
    pub tags: Vec<String>,
    pub creator_id: String,
    pub teacher_id: Option<String>,
}

const COURSE_COLUMNS: &str = r#"
    c."id", c."title", c."description", c."thumbnail",
    c."level"::text AS "level", c."status"::text AS "status",
    c."duration", c."price", c."tags", c."creatorId", c."teacherId",
    c."createdAt", c."updatedAt"
"#;

pub async fn list_courses(
    proxy: &DatabaseProxy,
    filter: &CourseFilter,
) -> Result<Vec<CourseWithTeacher>, sqlx::Error> {
    let mut qb = QueryBuilder::<sqlx::Postgres>::new(format!(
        r#"
        SELECT {COURSE_COLUMNS},
            t."firstName" AS "teacherFirstName",
            t."lastName" AS "teacherLastName",
            t."avatar" AS "teacherAvatar",
            (SELECT COUNT(*) FROM "lessons" l WHERE l."courseId" = c."id") AS "lessonCount",
            (SELECT COUNT(*) FROM "enrollments" e WHERE e."courseId" = c."id") AS "enrollmentCount"
        FROM "courses" c
        LEFT JOIN "users" t ON t."id" = c."teacherId"
        WHERE c."status" = "#
    ));

    // Default to published courses only
    let status = filter.status.as_deref().unwrap_or("PUBLISHED");
    qb.push_bind(status.to_string());
    qb.push(r#"::"CourseStatus""#);

    if let Some(level) = filter.level.as_deref() {
        qb.push(r#" AND c."level" = "#);
        qb.push_bind(level.to_string());
        qb.push(r#"::"CourseLevel""#);
    }

    if let Some(search) = filter.search.as_deref() {
        let pattern = format!("%{}%", search);
        qb.push(r#" AND (c."title" ILIKE "#);
        qb.push_bind(pattern.clone());
        qb.push(r#" OR c."description" ILIKE "#);
        qb.push_bind(pattern);
        qb.push(")");
    }

    qb.push(r#" ORDER BY c."createdAt" DESC"#);

    let rows = qb.build().fetch_all(proxy.pool()).await?;
    Ok(rows.iter().map(map_course_with_teacher).collect())
}

pub async fn find_course(proxy: &DatabaseProxy, id: &str) -> Result<Option<Course>, sqlx::Error> {
    let sql = format!(r#"SELECT {COURSE_COLUMNS} FROM "courses" c WHERE c."id" = $1 LIMIT 1"#);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_course(&r)))
}

pub async fn get_course_detail(
    proxy: &DatabaseProxy,
    id: &str,
) -> Result<Option<CourseDetail>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {COURSE_COLUMNS},
            t."firstName" AS "teacherFirstName",
            t."lastName" AS "teacherLastName",
            t."avatar" AS "teacherAvatar"
        FROM "courses" c
        LEFT JOIN "users" t ON t."id" = c."teacherId"
        WHERE c."id" = $1
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

    let course = map_course(&row);
    let teacher = map_teacher_summary(&row, &course);

    let lesson_rows = sqlx::query(
        r#"
        SELECT "id", "title", "description", "type"::text AS "type", "duration", "order"
        FROM "lessons"
        WHERE "courseId" = $1 AND "isPublished" = TRUE
        ORDER BY "order" ASC
        "#,
    )
    .bind(id)
    .fetch_all(proxy.pool())
    .await?;

    let lessons = lesson_rows
        .iter()
        .map(|r| LessonSummary {
            id: r.try_get("id").unwrap_or_default(),
            title: r.try_get("title").unwrap_or_default(),
            description: r.try_get("description").ok().flatten(),
            r#type: r.try_get("type").unwrap_or_else(|_| "VIDEO".to_string()),
            duration: r.try_get("duration").unwrap_or(0),
            order: r.try_get("order").unwrap_or(0),
        })
        .collect();

    let review_rows = sqlx::query(
        r#"
        SELECT r."id", r."userId", r."courseId", r."rating", r."comment", r."createdAt",
            u."firstName", u."lastName", u."avatar"
        FROM "reviews" r
        JOIN "users" u ON u."id" = r."userId"
        WHERE r."courseId" = $1
        "#,
    )
    .bind(id)
    .fetch_all(proxy.pool())
    .await?;

    let reviews = review_rows
        .iter()
        .map(|r| {
            let created_at: NaiveDateTime = r
                .try_get("createdAt")
                .unwrap_or_else(|_| Utc::now().naive_utc());
            ReviewWithUser {
                id: r.try_get("id").unwrap_or_default(),
                user_id: r.try_get("userId").unwrap_or_default(),
                course_id: r.try_get("courseId").unwrap_or_default(),
                rating: r.try_get("rating").unwrap_or(0),
                comment: r.try_get("comment").ok().flatten(),
                created_at: format_naive_datetime_iso_millis(created_at),
                user: ReviewUser {
                    first_name: r.try_get("firstName").unwrap_or_default(),
                    last_name: r.try_get("lastName").unwrap_or_default(),
                    avatar: r.try_get("avatar").ok().flatten(),
                },
            }
        })
        .collect();

    Ok(Some(CourseDetail {
        course,
        teacher,
        lessons,
        reviews,
    }))
}

pub async fn insert_course(
    proxy: &DatabaseProxy,
    new_course: &NewCourse,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let level = new_course.level.clone().unwrap_or_else(|| "BEGINNER".to_string());
    let duration = new_course.duration.unwrap_or(0);
    let price = new_course.price.unwrap_or(0.0);

    sqlx::query(
        r#"
        INSERT INTO "courses" (
            "id", "title", "description", "level", "duration", "price",
            "tags", "creatorId", "teacherId", "createdAt", "updatedAt"
        ) VALUES ($1, $2, $3, $4::"CourseLevel", $5, $6, $7, $8, $9, $10, $10)
        "#,
    )
    .bind(&id)
    .bind(&new_course.title)
    .bind(&new_course.description)
    .bind(&level)
    .bind(duration)
    .bind(price)
    .bind(&new_course.tags)
    .bind(&new_course.creator_id)
    .bind(&new_course.teacher_id)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(Course {
        id,
        title: new_course.title.clone(),
        description: new_course.description.clone(),
        thumbnail: None,
        level,
        status: "DRAFT".to_string(),
        duration,
        price,
        tags: new_course.tags.clone(),
        creator_id: new_course.creator_id.clone(),
        teacher_id: new_course.teacher_id.clone(),
        created_at: format_naive_datetime_iso_millis(now),
        updated_at: format_naive_datetime_iso_millis(now),
    })
}

pub(crate) fn map_course(row: &sqlx::postgres::PgRow) -> Course {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    Course {
        id: row.try_get("id").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        description: row.try_get("description").unwrap_or_default(),
        thumbnail: row.try_get("thumbnail").ok().flatten(),
        level: row
            .try_get("level")
            .unwrap_or_else(|_| "BEGINNER".to_string()),
        status: row
            .try_get("status")
            .unwrap_or_else(|_| "DRAFT".to_string()),
        duration: row.try_get("duration").unwrap_or(0),
        price: row.try_get("price").unwrap_or(0.0),
        tags: row.try_get("tags").unwrap_or_default(),
        creator_id: row.try_get("creatorId").unwrap_or_default(),
        teacher_id: row.try_get("teacherId").ok().flatten(),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}

fn map_teacher_summary(row: &sqlx::postgres::PgRow, course: &Course) -> Option<TeacherSummary> {
    let teacher_id = course.teacher_id.clone()?;
    Some(TeacherSummary {
        id: teacher_id,
        first_name: row.try_get("teacherFirstName").unwrap_or_default(),
        last_name: row.try_get("teacherLastName").unwrap_or_default(),
        avatar: row.try_get("teacherAvatar").ok().flatten(),
    })
}

fn map_course_with_teacher(row: &sqlx::postgres::PgRow) -> CourseWithTeacher {
    let course = map_course(row);
    let teacher = map_teacher_summary(row, &course);
    CourseWithTeacher {
        counts: CourseCounts {
            lessons: row.try_get("lessonCount").unwrap_or(0),
            enrollments: row.try_get("enrollmentCount").unwrap_or(0),
        },
        course,
        teacher,
    }
}
