use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub avatar: Option<String>,
    pub learning_style: Option<String>,
    pub grade_level: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilitySettings {
    pub id: String,
    pub user_id: String,
    pub font_size: i32,
    pub font_family: String,
    pub color_scheme: String,
    pub text_to_speech_enabled: bool,
    pub tts_speed: f64,
    pub captions_enabled: bool,
    pub transcripts_enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub learning_style: Option<String>,
    pub grade_level: Option<String>,
}

const USER_COLUMNS: &str = r#"
    "id", "email", "password", "firstName", "lastName",
    "role"::text AS "role", "avatar", "learningStyle"::text AS "learningStyle",
    "gradeLevel", "isActive", "createdAt", "updatedAt"
"#;

pub async fn find_by_email(
    proxy: &DatabaseProxy,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    let sql = format!(r#"SELECT {USER_COLUMNS} FROM "users" WHERE "email" = $1 LIMIT 1"#);
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_user(&r)))
}

pub async fn find_by_id(proxy: &DatabaseProxy, id: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!(r#"SELECT {USER_COLUMNS} FROM "users" WHERE "id" = $1 LIMIT 1"#);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_user(&r)))
}

pub async fn insert_user(proxy: &DatabaseProxy, new_user: &NewUser) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        INSERT INTO "users" (
            "id", "email", "password", "firstName", "lastName",
            "role", "learningStyle", "gradeLevel", "createdAt", "updatedAt"
        ) VALUES ($1, $2, $3, $4, $5, $6::"UserRole", $7::"LearningStyle", $8, $9, $9)
        "#,
    )
    .bind(&id)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.role)
    .bind(&new_user.learning_style)
    .bind(&new_user.grade_level)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(User {
        id,
        email: new_user.email.clone(),
        password: new_user.password_hash.clone(),
        first_name: new_user.first_name.clone(),
        last_name: new_user.last_name.clone(),
        role: new_user.role.clone(),
        avatar: None,
        learning_style: new_user.learning_style.clone(),
        grade_level: new_user.grade_level.clone(),
        is_active: true,
        created_at: format_naive_datetime_iso_millis(now),
        updated_at: format_naive_datetime_iso_millis(now),
    })
}

pub async fn create_default_accessibility_settings(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        INSERT INTO "accessibility_settings" ("id", "userId", "createdAt", "updatedAt")
        VALUES ($1, $2, $3, $3)
        ON CONFLICT ("userId") DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(now)
    .execute(proxy.pool())
    .await?;
    Ok(())
}

pub async fn get_accessibility_settings(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Option<AccessibilitySettings>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT * FROM "accessibility_settings" WHERE "userId" = $1 LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(proxy.pool())
    .await?;
    Ok(row.map(|r| map_accessibility_settings(&r)))
}

fn map_user(row: &sqlx::postgres::PgRow) -> User {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    User {
        id: row.try_get("id").unwrap_or_default(),
        email: row.try_get("email").unwrap_or_default(),
        password: row.try_get("password").unwrap_or_default(),
        first_name: row.try_get("firstName").unwrap_or_default(),
        last_name: row.try_get("lastName").unwrap_or_default(),
        role: row.try_get("role").unwrap_or_else(|_| "STUDENT".to_string()),
        avatar: row.try_get("avatar").ok().flatten(),
        learning_style: row.try_get("learningStyle").ok().flatten(),
        grade_level: row.try_get("gradeLevel").ok().flatten(),
        is_active: row.try_get("isActive").unwrap_or(true),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}

fn map_accessibility_settings(row: &sqlx::postgres::PgRow) -> AccessibilitySettings {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    AccessibilitySettings {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        font_size: row.try_get("fontSize").unwrap_or(16),
        font_family: row
            .try_get("fontFamily")
            .unwrap_or_else(|_| "Inter".to_string()),
        color_scheme: row
            .try_get("colorScheme")
            .unwrap_or_else(|_| "default".to_string()),
        text_to_speech_enabled: row.try_get("textToSpeechEnabled").unwrap_or(false),
        tts_speed: row.try_get("ttsSpeed").unwrap_or(1.0),
        captions_enabled: row.try_get("captionsEnabled").unwrap_or(false),
        transcripts_enabled: row.try_get("transcriptsEnabled").unwrap_or(false),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}
