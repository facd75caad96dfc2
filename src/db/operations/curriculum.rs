use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumEntry {
    pub id: String,
    pub program_id: String,
    pub course_code: String,
    pub subject_name: String,
    pub year_level: i32,
    pub semester: i32,
    pub units: i32,
    pub prerequisites: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCurriculumEntry {
    pub program_id: String,
    pub course_code: String,
    pub subject_name: String,
    pub year_level: i32,
    pub semester: i32,
    pub units: i32,
    #[serde(default)]
    pub prerequisites: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumPatch {
    pub course_code: Option<String>,
    pub subject_name: Option<String>,
    pub year_level: Option<i32>,
    pub semester: Option<i32>,
    pub units: Option<i32>,
    pub prerequisites: Option<Vec<String>>,
}

const ENTRY_COLUMNS: &str = r#"
    "id", "programId", "courseCode", "subjectName", "yearLevel",
    "semester", "units", "prerequisites", "createdAt", "updatedAt"
"#;

/// Full curriculum of a program, grouped by year then semester.
pub async fn list_by_program(
    proxy: &DatabaseProxy,
    program_id: &str,
) -> Result<Vec<CurriculumEntry>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {ENTRY_COLUMNS} FROM "curriculum_entries"
           WHERE "programId" = $1
           ORDER BY "yearLevel" ASC, "semester" ASC"#
    );
    let rows = sqlx::query(&sql)
        .bind(program_id)
        .fetch_all(proxy.pool())
        .await?;
    Ok(rows.iter().map(map_entry).collect())
}

/// Subjects of one term, ordered by course code.
pub async fn list_for_program_term(
    proxy: &DatabaseProxy,
    program_id: &str,
    year_level: i32,
    semester: i32,
) -> Result<Vec<CurriculumEntry>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {ENTRY_COLUMNS} FROM "curriculum_entries"
           WHERE "programId" = $1 AND "yearLevel" = $2 AND "semester" = $3
           ORDER BY "courseCode" ASC"#
    );
    let rows = sqlx::query(&sql)
        .bind(program_id)
        .bind(year_level)
        .bind(semester)
        .fetch_all(proxy.pool())
        .await?;
    Ok(rows.iter().map(map_entry).collect())
}

pub async fn find_entry(
    proxy: &DatabaseProxy,
    id: &str,
) -> Result<Option<CurriculumEntry>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {ENTRY_COLUMNS} FROM "curriculum_entries" WHERE "id" = $1 LIMIT 1"#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_entry(&r)))
}

pub async fn insert_entry(
    proxy: &DatabaseProxy,
    new: &NewCurriculumEntry,
) -> Result<CurriculumEntry, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let prerequisites = new.prerequisites.clone().unwrap_or_default();

    sqlx::query(
        r#"
        INSERT INTO "curriculum_entries"
            ("id", "programId", "courseCode", "subjectName", "yearLevel",
             "semester", "units", "prerequisites", "createdAt", "updatedAt")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        "#,
    )
    .bind(&id)
    .bind(&new.program_id)
    .bind(&new.course_code)
    .bind(&new.subject_name)
    .bind(new.year_level)
    .bind(new.semester)
    .bind(new.units)
    .bind(&prerequisites)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(CurriculumEntry {
        id,
        program_id: new.program_id.clone(),
        course_code: new.course_code.clone(),
        subject_name: new.subject_name.clone(),
        year_level: new.year_level,
        semester: new.semester,
        units: new.units,
        prerequisites,
        created_at: format_naive_datetime_iso_millis(now),
        updated_at: format_naive_datetime_iso_millis(now),
    })
}

pub async fn update_entry(
    proxy: &DatabaseProxy,
    id: &str,
    patch: &CurriculumPatch,
) -> Result<Option<CurriculumEntry>, sqlx::Error> {
    let Some(existing) = find_entry(proxy, id).await? else {
        return Ok(None);
    };

    let course_code = patch.course_code.clone().unwrap_or(existing.course_code);
    let subject_name = patch.subject_name.clone().unwrap_or(existing.subject_name);
    let year_level = patch.year_level.unwrap_or(existing.year_level);
    let semester = patch.semester.unwrap_or(existing.semester);
    let units = patch.units.unwrap_or(existing.units);
    let prerequisites = patch
        .prerequisites
        .clone()
        .unwrap_or(existing.prerequisites);
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        UPDATE "curriculum_entries"
        SET "courseCode" = $2, "subjectName" = $3, "yearLevel" = $4,
            "semester" = $5, "units" = $6, "prerequisites" = $7, "updatedAt" = $8
        WHERE "id" = $1
        "#,
    )
    .bind(id)
    .bind(&course_code)
    .bind(&subject_name)
    .bind(year_level)
    .bind(semester)
    .bind(units)
    .bind(&prerequisites)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(Some(CurriculumEntry {
        id: existing.id,
        program_id: existing.program_id,
        course_code,
        subject_name,
        year_level,
        semester,
        units,
        prerequisites,
        created_at: existing.created_at,
        updated_at: format_naive_datetime_iso_millis(now),
    }))
}

pub async fn delete_entry(proxy: &DatabaseProxy, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "curriculum_entries" WHERE "id" = $1"#)
        .bind(id)
        .execute(proxy.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

fn map_entry(row: &sqlx::postgres::PgRow) -> CurriculumEntry {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    CurriculumEntry {
        id: row.try_get("id").unwrap_or_default(),
        program_id: row.try_get("programId").unwrap_or_default(),
        course_code: row.try_get("courseCode").unwrap_or_default(),
        subject_name: row.try_get("subjectName").unwrap_or_default(),
        year_level: row.try_get("yearLevel").unwrap_or(0),
        semester: row.try_get("semester").unwrap_or(0),
        units: row.try_get("units").unwrap_or(0),
        prerequisites: row.try_get("prerequisites").unwrap_or_default(),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}
