use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub entry: String,
    pub user_id: Uuid,
    /// Nullable: an entry may be uncategorized, or become so when its
    /// category is deleted.
    pub category_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

const ENTRY_COLUMNS: &str = "id, entry, user_id, category_id, created_at, updated_at";

// Every query filters on user_id; a guessed id belonging to another tenant
// matches nothing.
impl JournalEntry {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        entry: &str,
        category_id: Option<Uuid>,
    ) -> anyhow::Result<JournalEntry> {
        let mut tx = db.begin().await?;
        let row = sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            INSERT INTO journal_entry (entry, user_id, category_id)
            VALUES ($1, $2, $3)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(entry)
        .bind(user_id)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Patch semantics: absent fields keep their stored value.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        entry: Option<&str>,
        category_id: Option<Uuid>,
    ) -> anyhow::Result<Option<JournalEntry>> {
        let mut tx = db.begin().await?;
        let row = sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            UPDATE journal_entry
            SET entry = COALESCE($3, entry),
                category_id = COALESCE($4, category_id),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(entry)
        .bind(category_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn get_one(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<JournalEntry>> {
        let row = sqlx::query_as::<_, JournalEntry>(&format!(
            r#"SELECT {ENTRY_COLUMNS} FROM journal_entry WHERE id = $1 AND user_id = $2"#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn get_many(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<JournalEntry>> {
        let rows = sqlx::query_as::<_, JournalEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM journal_entry
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
        let mut tx = db.begin().await?;
        let deleted = sqlx::query("DELETE FROM journal_entry WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted)
    }
}
