use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::Row;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::operations::course::{map_course, Course};
use crate::db::operations::enrollment::{map_enrollment, Enrollment};
use crate::db::operations::progress::{map_progress, Progress};
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverview {
    pub enrolled_courses: i64,
    pub completed_courses: i64,
    pub average_score: f64,
    pub total_time_spent: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressLessonBrief {
    pub title: String,
    pub course_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentProgressItem {
    #[serde(flatten)]
    pub progress: Progress,
    pub lesson: ProgressLessonBrief,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub user_id: String,
    pub r#type: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: i32,
    pub earned_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingLessonBrief {
    pub title: String,
    pub duration: i32,
    pub course_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingLessonItem {
    #[serde(flatten)]
    pub progress: Progress,
    pub lesson: UpcomingLessonBrief,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboard {
    pub overview: StudentOverview,
    pub recent_progress: Vec<RecentProgressItem>,
    pub achievements: Vec<Achievement>,
    pub upcoming_lessons: Vec<UpcomingLessonItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffOverview {
    pub total_students: i64,
    pub total_courses: i64,
    pub total_enrollments: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentUserBrief {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentCourseBrief {
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentEnrollmentItem {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub user: EnrollmentUserBrief,
    pub course: EnrollmentCourseBrief,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStatsCounts {
    pub enrollments: i64,
    pub lessons: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseStatsItem {
    #[serde(flatten)]
    pub course: Course,
    #[serde(rename = "_count")]
    pub counts: CourseStatsCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDashboard {
    pub overview: StaffOverview,
    pub recent_enrollments: Vec<RecentEnrollmentItem>,
    pub course_stats: Vec<CourseStatsItem>,
}

pub async fn student_dashboard(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<StudentDashboard, sqlx::Error> {
    let overview_row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM "enrollments" WHERE "userId" = $1) AS "enrolledCourses",
            (SELECT COUNT(*) FROM "enrollments" WHERE "userId" = $1 AND "status" = 'COMPLETED') AS "completedCourses",
            (SELECT COALESCE(AVG("score"), 0) FROM "progress" WHERE "userId" = $1) AS "averageScore",
            (SELECT COALESCE(SUM("timeSpent"), 0) FROM "progress" WHERE "userId" = $1) AS "totalTimeSpent"
        "#,
    )
    .bind(user_id)
    .fetch_one(proxy.pool())
    .await?;

    let overview = StudentOverview {
        enrolled_courses: overview_row.try_get("enrolledCourses").unwrap_or(0),
        completed_courses: overview_row.try_get("completedCourses").unwrap_or(0),
        average_score: overview_row.try_get("averageScore").unwrap_or(0.0),
        total_time_spent: overview_row.try_get("totalTimeSpent").unwrap_or(0),
    };

    let recent_rows = sqlx::query(
        r#"
        SELECT p."id", p."userId", p."lessonId", p."completed", p."timeSpent",
               p."lastPosition", p."score", p."completedAt", p."createdAt", p."updatedAt",
               l."title" AS "lessonTitle", l."courseId" AS "lessonCourseId"
        FROM "progress" p
        JOIN "lessons" l ON l."id" = p."lessonId"
        WHERE p."userId" = $1
        ORDER BY p."updatedAt" DESC
        LIMIT 5
        "#,
    )
    .bind(user_id)
    .fetch_all(proxy.pool())
    .await?;
    let recent_progress = recent_rows
        .iter()
        .map(|row| RecentProgressItem {
            progress: map_progress(row),
            lesson: ProgressLessonBrief {
                title: row.try_get("lessonTitle").unwrap_or_default(),
                course_id: row.try_get("lessonCourseId").unwrap_or_default(),
            },
        })
        .collect();

    let achievement_rows = sqlx::query(
        r#"
        SELECT "id", "userId", "type", "title", "description", "icon", "points", "earnedAt"
        FROM "achievements"
        WHERE "userId" = $1
        ORDER BY "earnedAt" DESC
        LIMIT 5
        "#,
    )
    .bind(user_id)
    .fetch_all(proxy.pool())
    .await?;
    let achievements = achievement_rows.iter().map(map_achievement).collect();

    let upcoming_rows = sqlx::query(
        r#"
        SELECT p."id", p."userId", p."lessonId", p."completed", p."timeSpent",
               p."lastPosition", p."score", p."completedAt", p."createdAt", p."updatedAt",
               l."title" AS "lessonTitle", l."duration" AS "lessonDuration",
               l."courseId" AS "lessonCourseId"
        FROM "progress" p
        JOIN "lessons" l ON l."id" = p."lessonId"
        WHERE p."userId" = $1 AND p."completed" = FALSE
        ORDER BY p."updatedAt" DESC
        LIMIT 3
        "#,
    )
    .bind(user_id)
    .fetch_all(proxy.pool())
    .await?;
    let upcoming_lessons = upcoming_rows
        .iter()
        .map(|row| UpcomingLessonItem {
            progress: map_progress(row),
            lesson: UpcomingLessonBrief {
                title: row.try_get("lessonTitle").unwrap_or_default(),
                duration: row.try_get("lessonDuration").unwrap_or(0),
                course_id: row.try_get("lessonCourseId").unwrap_or_default(),
            },
        })
        .collect();

    Ok(StudentDashboard {
        overview,
        recent_progress,
        achievements,
        upcoming_lessons,
    })
}

/// Teacher and admin view. Teachers see course numbers scoped to the
/// courses they teach; admins see everything.
pub async fn staff_dashboard(
    proxy: &DatabaseProxy,
    user_id: &str,
    scope_to_teacher: bool,
) -> Result<StaffDashboard, sqlx::Error> {
    let overview_row = if scope_to_teacher {
        sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM "users" WHERE "role" = 'STUDENT') AS "totalStudents",
                (SELECT COUNT(*) FROM "courses" WHERE "teacherId" = $1) AS "totalCourses",
                (SELECT COUNT(*) FROM "enrollments") AS "totalEnrollments"
            "#,
        )
        .bind(user_id)
        .fetch_one(proxy.pool())
        .await?
    } else {
        sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM "users" WHERE "role" = 'STUDENT') AS "totalStudents",
                (SELECT COUNT(*) FROM "courses") AS "totalCourses",
                (SELECT COUNT(*) FROM "enrollments") AS "totalEnrollments"
            "#,
        )
        .fetch_one(proxy.pool())
        .await?
    };

    let overview = StaffOverview {
        total_students: overview_row.try_get("totalStudents").unwrap_or(0),
        total_courses: overview_row.try_get("totalCourses").unwrap_or(0),
        total_enrollments: overview_row.try_get("totalEnrollments").unwrap_or(0),
    };

    let recent_rows = sqlx::query(
        r#"
        SELECT e."id", e."userId", e."courseId", e."status"::text AS "status",
               e."progress", e."enrolledAt", e."lastAccessedAt", e."completedAt",
               u."firstName" AS "userFirstName", u."lastName" AS "userLastName",
               u."email" AS "userEmail",
               c."title" AS "courseTitle"
        FROM "enrollments" e
        JOIN "users" u ON u."id" = e."userId"
        JOIN "courses" c ON c."id" = e."courseId"
        ORDER BY e."enrolledAt" DESC
        LIMIT 10
        "#,
    )
    .fetch_all(proxy.pool())
    .await?;
    let recent_enrollments = recent_rows
        .iter()
        .map(|row| RecentEnrollmentItem {
            enrollment: map_enrollment(row),
            user: EnrollmentUserBrief {
                first_name: row.try_get("userFirstName").unwrap_or_default(),
                last_name: row.try_get("userLastName").unwrap_or_default(),
                email: row.try_get("userEmail").unwrap_or_default(),
            },
            course: EnrollmentCourseBrief {
                title: row.try_get("courseTitle").unwrap_or_default(),
            },
        })
        .collect();

    let stats_sql = format!(
        r#"
        SELECT c."id", c."title", c."description", c."thumbnail",
               c."level"::text AS "level", c."status"::text AS "status",
               c."duration", c."price", c."tags", c."creatorId", c."teacherId",
               c."createdAt", c."updatedAt",
               (SELECT COUNT(*) FROM "enrollments" e WHERE e."courseId" = c."id") AS "enrollmentCount",
               (SELECT COUNT(*) FROM "lessons" l WHERE l."courseId" = c."id") AS "lessonCount"
        FROM "courses" c
        {}
        ORDER BY c."createdAt" DESC
        LIMIT 5
        "#,
        if scope_to_teacher {
            r#"WHERE c."teacherId" = $1"#
        } else {
            ""
        }
    );
    let stats_rows = if scope_to_teacher {
        sqlx::query(&stats_sql)
            .bind(user_id)
            .fetch_all(proxy.pool())
            .await?
    } else {
        sqlx::query(&stats_sql).fetch_all(proxy.pool()).await?
    };
    let course_stats = stats_rows
        .iter()
        .map(|row| CourseStatsItem {
            course: map_course(row),
            counts: CourseStatsCounts {
                enrollments: row.try_get("enrollmentCount").unwrap_or(0),
                lessons: row.try_get("lessonCount").unwrap_or(0),
            },
        })
        .collect();

    Ok(StaffDashboard {
        overview,
        recent_enrollments,
        course_stats,
    })
}

fn map_achievement(row: &sqlx::postgres::PgRow) -> Achievement {
    let earned_at: NaiveDateTime = row
        .try_get("earnedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    Achievement {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        r#type: row.try_get("type").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        description: row.try_get("description").unwrap_or_default(),
        icon: row.try_get("icon").unwrap_or_default(),
        points: row.try_get("points").unwrap_or(0),
        earned_at: format_naive_datetime_iso_millis(earned_at),
    }
}
