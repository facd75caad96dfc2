use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::DatabaseProxy;

pub const COLLEGE_OF_SCIENCE: &str = "College of Science";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityProgram {
    pub id: String,
    pub title: String,
    pub abbreviation: Option<String>,
    pub college: String,
    pub is_active: bool,
    pub order: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPatch {
    pub title: Option<String>,
    pub abbreviation: Option<String>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

const PROGRAM_COLUMNS: &str = r#"
    "id", "title", "abbreviation", "college", "isActive", "order",
    "createdAt", "updatedAt"
"#;

/// Active College of Science programs in display order.
pub async fn list_active_cos(
    proxy: &DatabaseProxy,
) -> Result<Vec<UniversityProgram>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {PROGRAM_COLUMNS} FROM "university_programs"
           WHERE "college" = $1 AND "isActive" = TRUE
           ORDER BY "order" ASC"#
    );
    let rows = sqlx::query(&sql)
        .bind(COLLEGE_OF_SCIENCE)
        .fetch_all(proxy.pool())
        .await?;
    Ok(rows.iter().map(map_program).collect())
}

pub async fn find_program(
    proxy: &DatabaseProxy,
    id: &str,
) -> Result<Option<UniversityProgram>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {PROGRAM_COLUMNS} FROM "university_programs" WHERE "id" = $1 LIMIT 1"#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_program(&r)))
}

/// Appends a program at the end of the College of Science display order.
pub async fn insert_program(
    proxy: &DatabaseProxy,
    title: &str,
    abbreviation: Option<&str>,
) -> Result<UniversityProgram, sqlx::Error> {
    let max_row = sqlx::query(
        r#"SELECT COALESCE(MAX("order"), 0) AS "maxOrder"
           FROM "university_programs" WHERE "college" = $1"#,
    )
    .bind(COLLEGE_OF_SCIENCE)
    .fetch_one(proxy.pool())
    .await?;
    let order: i32 = max_row.try_get::<i32, _>("maxOrder").unwrap_or(0) + 1;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO "university_programs"
            ("id", "title", "abbreviation", "college", "isActive", "order", "createdAt", "updatedAt")
        VALUES ($1, $2, $3, $4, TRUE, $5, $6, $6)
        "#,
    )
    .bind(&id)
    .bind(title)
    .bind(abbreviation)
    .bind(COLLEGE_OF_SCIENCE)
    .bind(order)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(UniversityProgram {
        id,
        title: title.to_string(),
        abbreviation: abbreviation.map(str::to_string),
        college: COLLEGE_OF_SCIENCE.to_string(),
        is_active: true,
        order,
        created_at: format_naive_datetime_iso_millis(now),
        updated_at: format_naive_datetime_iso_millis(now),
    })
}

/// Applies the patch over the stored program. An empty abbreviation clears
/// the column. Returns `None` for an unknown id.
pub async fn update_program(
    proxy: &DatabaseProxy,
    id: &str,
    patch: &ProgramPatch,
) -> Result<Option<UniversityProgram>, sqlx::Error> {
    let Some(existing) = find_program(proxy, id).await? else {
        return Ok(None);
    };

    let title = patch
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or(existing.title);
    let abbreviation = match patch.abbreviation.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => existing.abbreviation,
    };
    let is_active = patch.is_active.unwrap_or(existing.is_active);
    let order = patch.order.unwrap_or(existing.order);
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        UPDATE "university_programs"
        SET "title" = $2, "abbreviation" = $3, "isActive" = $4, "order" = $5, "updatedAt" = $6
        WHERE "id" = $1
        "#,
    )
    .bind(id)
    .bind(&title)
    .bind(&abbreviation)
    .bind(is_active)
    .bind(order)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(Some(UniversityProgram {
        id: existing.id,
        title,
        abbreviation,
        college: existing.college,
        is_active,
        order,
        created_at: existing.created_at,
        updated_at: format_naive_datetime_iso_millis(now),
    }))
}

pub async fn delete_program(proxy: &DatabaseProxy, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "university_programs" WHERE "id" = $1"#)
        .bind(id)
        .execute(proxy.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

fn map_program(row: &sqlx::postgres::PgRow) -> UniversityProgram {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    UniversityProgram {
        id: row.try_get("id").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        abbreviation: row.try_get("abbreviation").ok().flatten(),
        college: row
            .try_get("college")
            .unwrap_or_else(|_| COLLEGE_OF_SCIENCE.to_string()),
        is_active: row.try_get("isActive").unwrap_or(true),
        order: row.try_get("order").unwrap_or(0),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}
