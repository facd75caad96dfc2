use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::DatabaseProxy;

/// One saved tutor conversation. `messages` is the client's transcript,
/// stored verbatim as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Value,
    pub created_at: String,
    pub updated_at: String,
}

const SESSION_COLUMNS: &str = r#"
    "id", "userId", "title", "messages", "createdAt", "updatedAt"
"#;

pub async fn list_for_user(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Vec<ChatSession>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {SESSION_COLUMNS} FROM "chat_sessions"
           WHERE "userId" = $1 ORDER BY "updatedAt" DESC"#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(proxy.pool())
        .await?;
    Ok(rows.iter().map(map_session).collect())
}

pub async fn find_by_id_and_user(
    proxy: &DatabaseProxy,
    id: &str,
    user_id: &str,
) -> Result<Option<ChatSession>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {SESSION_COLUMNS} FROM "chat_sessions"
           WHERE "id" = $1 AND "userId" = $2 LIMIT 1"#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_session(&r)))
}

pub async fn insert_session(
    proxy: &DatabaseProxy,
    user_id: &str,
    title: Option<String>,
    messages: Option<Value>,
) -> Result<ChatSession, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let title = title.unwrap_or_else(|| "New Chat".to_string());
    let messages = messages.unwrap_or_else(|| Value::Array(Vec::new()));

    sqlx::query(
        r#"
        INSERT INTO "chat_sessions" ("id", "userId", "title", "messages", "createdAt", "updatedAt")
        VALUES ($1, $2, $3, $4, $5, $5)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&title)
    .bind(&messages)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(ChatSession {
        id,
        user_id: user_id.to_string(),
        title,
        messages,
        created_at: format_naive_datetime_iso_millis(now),
        updated_at: format_naive_datetime_iso_millis(now),
    })
}

/// Applies the given fields over the stored session. Returns `None` when
/// the session does not exist or belongs to another user.
pub async fn update_session(
    proxy: &DatabaseProxy,
    id: &str,
    user_id: &str,
    title: Option<String>,
    messages: Option<Value>,
) -> Result<Option<ChatSession>, sqlx::Error> {
    let Some(existing) = find_by_id_and_user(proxy, id, user_id).await? else {
        return Ok(None);
    };

    let title = title.unwrap_or(existing.title);
    let messages = messages.unwrap_or(existing.messages);
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        UPDATE "chat_sessions"
        SET "title" = $3, "messages" = $4, "updatedAt" = $5
        WHERE "id" = $1 AND "userId" = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&title)
    .bind(&messages)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(Some(ChatSession {
        id: existing.id,
        user_id: existing.user_id,
        title,
        messages,
        created_at: existing.created_at,
        updated_at: format_naive_datetime_iso_millis(now),
    }))
}

pub async fn delete_session(
    proxy: &DatabaseProxy,
    id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "chat_sessions" WHERE "id" = $1 AND "userId" = $2"#)
        .bind(id)
        .bind(user_id)
        .execute(proxy.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

fn map_session(row: &sqlx::postgres::PgRow) -> ChatSession {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    ChatSession {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        messages: row
            .try_get("messages")
            .unwrap_or_else(|_| Value::Array(Vec::new())),
        created_at: format_naive_datetime_iso_millis(created_at),
        updated_at: format_naive_datetime_iso_millis(updated_at),
    }
}
