use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::auth::format_naive_datetime_iso_millis;
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInteraction {
    pub id: String,
    pub user_id: String,
    pub r#type: String,
    pub context: Option<String>,
    pub user_message: String,
    pub ai_response: String,
    pub helpful: Option<bool>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAiInteraction {
    pub user_id: String,
    pub r#type: Option<String>,
    pub context: Option<String>,
    pub user_message: String,
    pub ai_response: String,
}

const INTERACTION_COLUMNS: &str = r#"
    "id", "userId", "type"::text AS "type", "context",
    "userMessage", "aiResponse", "helpful", "createdAt"
"#;

pub async fn insert_interaction(
    proxy: &DatabaseProxy,
    new: &NewAiInteraction,
) -> Result<AiInteraction, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let kind = new.r#type.clone().unwrap_or_else(|| "QUESTION".to_string());

    sqlx::query(
        r#"
        INSERT INTO "ai_interactions"
            ("id", "userId", "type", "context", "userMessage", "aiResponse", "createdAt")
        VALUES ($1, $2, $3::"AIInteractionType", $4, $5, $6, $7)
        "#,
    )
    .bind(&id)
    .bind(&new.user_id)
    .bind(&kind)
    .bind(&new.context)
    .bind(&new.user_message)
    .bind(&new.ai_response)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(AiInteraction {
        id,
        user_id: new.user_id.clone(),
        r#type: kind,
        context: new.context.clone(),
        user_message: new.user_message.clone(),
        ai_response: new.ai_response.clone(),
        helpful: None,
        created_at: format_naive_datetime_iso_millis(now),
    })
}

/// Interaction history for a user, newest first. `context_contains` narrows
/// to interactions whose stored context mentions the given fragment.
pub async fn list_for_user(
    proxy: &DatabaseProxy,
    user_id: &str,
    limit: i64,
    context_contains: Option<&str>,
) -> Result<Vec<AiInteraction>, sqlx::Error> {
    let rows = match context_contains {
        Some(fragment) => {
            let sql = format!(
                r#"SELECT {INTERACTION_COLUMNS} FROM "ai_interactions"
                   WHERE "userId" = $1 AND "context" LIKE $2
                   ORDER BY "createdAt" DESC LIMIT $3"#
            );
            sqlx::query(&sql)
                .bind(user_id)
                .bind(format!("%{}%", fragment))
                .bind(limit)
                .fetch_all(proxy.pool())
                .await?
        }
        None => {
            let sql = format!(
                r#"SELECT {INTERACTION_COLUMNS} FROM "ai_interactions"
                   WHERE "userId" = $1
                   ORDER BY "createdAt" DESC LIMIT $2"#
            );
            sqlx::query(&sql)
                .bind(user_id)
                .bind(limit)
                .fetch_all(proxy.pool())
                .await?
        }
    };
    Ok(rows.iter().map(map_interaction).collect())
}

pub async fn find_by_id_and_user(
    proxy: &DatabaseProxy,
    id: &str,
    user_id: &str,
) -> Result<Option<AiInteraction>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {INTERACTION_COLUMNS} FROM "ai_interactions"
           WHERE "id" = $1 AND "userId" = $2 LIMIT 1"#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(proxy.pool())
        .await?;
    Ok(row.map(|r| map_interaction(&r)))
}

/// Records the user's verdict on a response. Returns the updated row, or
/// `None` when the interaction is missing or owned by someone else.
pub async fn set_helpful(
    proxy: &DatabaseProxy,
    id: &str,
    user_id: &str,
    helpful: Option<bool>,
) -> Result<Option<AiInteraction>, sqlx::Error> {
    let Some(mut interaction) = find_by_id_and_user(proxy, id, user_id).await? else {
        return Ok(None);
    };

    sqlx::query(r#"UPDATE "ai_interactions" SET "helpful" = $2 WHERE "id" = $1"#)
        .bind(id)
        .bind(helpful)
        .execute(proxy.pool())
        .await?;

    interaction.helpful = helpful;
    Ok(Some(interaction))
}

fn map_interaction(row: &sqlx::postgres::PgRow) -> AiInteraction {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    AiInteraction {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        r#type: row.try_get("type").unwrap_or_else(|_| "QUESTION".to_string()),
        context: row.try_get("context").ok().flatten(),
        user_message: row.try_get("userMessage").unwrap_or_default(),
        ai_response: row.try_get("aiResponse").unwrap_or_default(),
        helpful: row.try_get("helpful").ok().flatten(),
        created_at: format_naive_datetime_iso_millis(created_at),
    }
}
