use std::collections::HashSet;

use sqlx::PgPool;

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_init_schema",
    include_str!("../../sql/001_init_schema.sql"),
)];

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration {name} failed: {source}")]
    Failed {
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Applies pending SQL migrations in order, recording each in `_migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    ensure_ledger(pool).await?;
    let applied = applied_names(pool).await?;

    let mut fresh = 0;
    for &(name, sql) in MIGRATIONS {
        if applied.contains(name) {
            continue;
        }

        tracing::info!(migration = name, "applying migration");
        sqlx::raw_sql(sql)
            .execute(pool)
            .await
            .map_err(|source| MigrationError::Failed { name, source })?;
        sqlx::query(r#"INSERT INTO "_migrations" ("name") VALUES ($1)"#)
            .bind(name)
            .execute(pool)
            .await
            .map_err(MigrationError::Sqlx)?;
        fresh += 1;
    }

    if fresh > 0 {
        tracing::info!(count = fresh, "migrations applied");
    } else {
        tracing::debug!("schema already up to date");
    }
    Ok(())
}

async fn ensure_ledger(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS "_migrations" (
            "name" TEXT PRIMARY KEY,
            "appliedAt" TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn applied_names(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
    let names: Vec<String> = sqlx::query_scalar(r#"SELECT "name" FROM "_migrations""#)
        .fetch_all(pool)
        .await?;
    Ok(names.into_iter().collect())
}
