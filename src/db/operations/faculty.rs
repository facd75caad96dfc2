use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::operations::program::COLLEGE_OF_SCIENCE;
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: String,
    pub college: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacultyWithSubjects {
    #[serde(flatten)]
    pub faculty: Faculty,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFaculty {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: String,
    #[serde(default)]
    pub subject_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub subject_ids: Option<Vec<String>>,
}

const FACULTY_COLUMNS: &str = r#"
    "id", "firstName", "lastName", "email", "position", "college",
    "createdAt", "updatedAt"
"#;

/// Every faculty member with their taught subjects attached.
pub async fn list_with_subjects(
    proxy: &DatabaseProxy,
) -> Result<Vec<FacultyWithSubjects>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {FACULTY_COLUMNS} FROM "faculty" ORDER BY "lastName" ASC, "firstName" ASC"#
    );
    let rows = sqlx::query(&sql).fetch_all(proxy.pool()).await?;
    let members: Vec<Faculty> = rows.iter().map(map_faculty).collect();
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = members.iter().map(|f| f.id.clone()).collect();
    let link_rows = sqlx::query(
        r#"
        SELECT fs."facultyId", s."id", s."name", s."createdAt"
        FROM "faculty_subjects" fs
        JOIN "subjects" s ON s."id" = fs."subjectId"
        WHERE fs."facultyId" = ANY($1)
        ORDER BY s."name" ASC
        "#,
    )
    .bind(&ids)
    .fetch_all(proxy.pool())
    .await?;

    let mut by_faculty: HashMap<String, Vec<Subject>> = HashMap::new();
    for row in &link_rows {
        let faculty_id: String = row.try_get("facultyId").unwrap_or_default();
        by_faculty
            .entry(faculty_id)
            .or_default()
            .push(map_subject(row));
    }

    Ok(members
        .into_iter()
        .map(|faculty| {
            let subjects = by_faculty.remove(&faculty.id).unwrap_or_default();
            FacultyWithSubjects { faculty, subjects }
        })
        .collect())
}

pub async fn list_subjects(proxy: &DatabaseProxy) -> Result<Vec<Subject>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "id", "name", "createdAt" FROM "subjects" ORDER BY "name" ASC"#,
    )
    .fetch_all(proxy.pool())
    .await?;
    Ok(rows.iter().map(map_subject).collect())
}

/// College of Science members holding the given position, matched
/// case-insensitively, ordered by last name.
pub async fn list_by_position_cos(
    proxy: &DatabaseProxy,
    position: &str,
) -> Result<Vec<Faculty>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {FACULTY_COLUMNS} FROM "faculty"
           WHERE LOWER("position") = LOWER($1) AND "college" = $2
           ORDER BY "lastName" ASC"#
    );
    let rows = sqlx::query(&sql)
        .bind(position)
        .bind(COLLEGE_OF_SCIENCE)
        .fetch_all(proxy.pool())
        .await?;
    Ok(rows.iter().map(map_faculty).collect())
}

/// All College of Science faculty, used when building tutor context.
pub async fn list_cos(proxy: &DatabaseProxy) -> Result<Vec<Faculty>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {FACULTY_COLUMNS} FROM "faculty"
           WHERE "college" = $1
           ORDER BY "lastName" ASC"#
    );
    let rows = sqlx::query(&sql)
        .bind(COLLEGE_OF_SCIENCE)
        .fetch_all(proxy.pool())
        .await?;
    Ok(rows.iter().map(map_faculty).collect())
}

pub async fn insert_faculty(
    proxy: &DatabaseProxy,
    new: &NewFaculty,
) -> Result<FacultyWithSubjects, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        INSERT INTO "faculty"
            ("id", "firstName", "lastName", "email", "position", "college", "createdAt", "updatedAt")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        "#,
    )
    .bind(&id)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.email)
    .bind(&new.position)
    .bind(COLLEGE_OF_SCIENCE)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    link_subjects(proxy, &id, &new.subject_ids).await?;
    let subjects = subjects_by_ids(proxy, &new.subject_ids).await?;

    Ok(FacultyWithSubjects {
        faculty: Faculty {
            id,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            position: new.position.clone(),
            college: COLLEGE_OF_SCIENCE.to_string(),
            created_at: format_naive_datetime_iso_millis(now),
            updated_at: format_naive_datetime_iso_millis(now),
        },
        subjects,
    })
}

/// Updates the member's fields and, when `subject_ids` is given, replaces
/// the subject links wholesale. Returns `false` for an unknown id.
pub async fn update_faculty(
    proxy: &DatabaseProxy,
    id: &str,
    patch: &FacultyPatch,
) -> Result<bool, sqlx::Error> {
    let sql = format!(r#"SELECT {FACULTY_COLUMNS} FROM "faculty" WHERE "id" = $1 LIMIT 1"#);
    let Some(row) = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(proxy.pool())
        .await?
    else {
        return Ok(false);
    };
    let existing = map_faculty(&row);

    let first_name = patch.first_name.clone().unwrap_or(existing.first_name);
    let last_name = patch.last_name.clone().unwrap_or(existing.last_name);
    let email = patch.email.clone().unwrap_or(existing.email);
    let position = patch.position.clone().unwrap_or(existing.position);

    sqlx::query(
        r#"
        UPDATE "faculty"
        SET "firstName" = $2, "lastName" = $3, "email" = $4, "position" = $5, "updatedAt" = $6
        WHERE "id" = $1
        "#,
    )
    .bind(id)
    .bind(&first_name)
    .bind(&last_name)
    .bind(&email)
    .bind(&position)
    .bind(Utc::now().naive_utc())
    .execute(proxy.pool())
    .await?;

    if let Some(subject_ids) = &patch.subject_ids {
        sqlx::query(r#"DELETE FROM "faculty_subjects" WHERE "facultyId" = $1"#)
            .bind(id)
            .execute(proxy.pool())
            .await?;
        link_subjects(proxy, id, subject_ids).await?;
    }

    Ok(true)
}

pub async fn delete_faculty(proxy: &DatabaseProxy, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query(r#"DELETE FROM "faculty_subjects" WHERE "facultyId" = $1"#)
        .bind(id)
        .execute(proxy.pool())
        .await?;
    let result = sqlx::query(r#"DELETE FROM "faculty" WHERE "id" = $1"#)
        .bind(id)
        .execute(proxy.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn link_subjects(
    proxy: &DatabaseProxy,
    faculty_id: &str,
    subject_ids: &[String],
) -> Result<(), sqlx::Error> {
    for subject_id in subject_ids {
        sqlx::query(
            r#"
            INSERT INTO "faculty_subjects" ("id", "facultyId", "subjectId")
            VALUES ($1, $2, $3)
            ON CONFLICT ("facultyId", "subjectId") DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(faculty_id)
        .bind(subject_id)
        .execute(proxy.pool())
        .await?;
    }
    Ok(())
}

async fn subjects_by_ids(
    proxy: &DatabaseProxy,
    ids: &[String],
) -> Result<Vec<Subject>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(
        r#"SELECT "id", "name", "createdAt" FROM "subjects"
           WHERE "id" = ANY($1) ORDER BY "name" ASC"#,
    )
    .bind(ids)
    .fetch_all(proxy.pool())
    .await?;
    Ok(rows.iter().map(map_subject).collect())
}

fn map_faculty(row: &sqlx::postgres::PgRow) -> Faculty {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    Faculty {
        id: row.try_get("id").unwrap_or_default(),
        first_name: row.try_get("firstName").unwrap_or_default(),
        last_name: row.try_get("lastName").unwrap_or_default(),
        email: row.try_get("email").unwrap_or_default(),
        position: row.try_get("position").unwrap_or_default(),
        college: row
            .try_get("college")
            .unwrap_or_else(|_| COLLEGE_OF_SCIENCE.to_string()),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}

fn map_subject(row: &sqlx::postgres::PgRow) -> Subject {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    Subject {
        id: row.try_get("id").unwrap_or_default(),
        name: row.try_get("name").unwrap_or_default(),
        created_at: format_naive_datetime_iso_millis(created_at),
    }
}
