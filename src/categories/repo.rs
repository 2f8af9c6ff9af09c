use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

const CATEGORY_COLUMNS: &str = "id, name, user_id, created_at, updated_at";

// Every query filters on user_id; a guessed id belonging to another tenant
// matches nothing.
impl Category {
    pub async fn create(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Category> {
        let mut tx = db.begin().await?;
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO category (name, user_id)
            VALUES ($1, $2)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(category)
    }

    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<Category>> {
        let mut tx = db.begin().await?;
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE category
            SET name = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(category)
    }

    pub async fn get_one(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"SELECT {CATEGORY_COLUMNS} FROM category WHERE id = $1 AND user_id = $2"#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(category)
    }

    pub async fn get_many(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            r#"
            SELECT {CATEGORY_COLUMNS}
            FROM category
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(categories)
    }

    /// Hard delete; entries referencing the category are left uncategorized
    /// by the store (FK `ON DELETE SET NULL`), never cascaded.
    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
        let mut tx = db.begin().await?;
        let deleted = sqlx::query("DELETE FROM category WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::User;
    use sqlx::postgres::PgPoolOptions;

    async fn test_pool() -> PgPool {
        let url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a migrated database");
        PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect to test database")
    }

    fn unique(prefix: &str) -> String {
        format!("{prefix}{}", &Uuid::new_v4().simple().to_string()[..10])
    }

    async fn make_user(db: &PgPool) -> User {
        let username = unique("u");
        let email = format!("{}@test.io", unique("m"));
        User::create(db, &username, &email, "not-a-real-hash")
            .await
            .expect("create user")
    }

    #[tokio::test]
    #[ignore = "requires a migrated database via DATABASE_URL"]
    async fn cross_tenant_category_access_matches_nothing() {
        let db = test_pool().await;
        let owner = make_user(&db).await;
        let intruder = make_user(&db).await;

        let category = Category::create(&db, owner.id, "Work")
            .await
            .expect("create category");

        // guessed id, wrong tenant: reads, updates and deletes all miss
        assert!(Category::get_one(&db, intruder.id, category.id)
            .await
            .unwrap()
            .is_none());
        assert!(Category::update(&db, intruder.id, category.id, "Stolen")
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            Category::delete(&db, intruder.id, category.id).await.unwrap(),
            0
        );

        let untouched = Category::get_one(&db, owner.id, category.id)
            .await
            .unwrap()
            .expect("owner still sees the row");
        assert_eq!(untouched.name, "Work");
        assert!(untouched.updated_at.is_none());
    }

    #[tokio::test]
    #[ignore = "requires a migrated database via DATABASE_URL"]
    async fn get_many_only_returns_own_rows() {
        let db = test_pool().await;
        let owner = make_user(&db).await;
        let other = make_user(&db).await;

        Category::create(&db, owner.id, "Mine").await.unwrap();
        Category::create(&db, other.id, "Theirs").await.unwrap();

        let categories = Category::get_many(&db, owner.id).await.unwrap();
        assert!(categories.iter().all(|c| c.user_id == owner.id));
        assert!(categories.iter().any(|c| c.name == "Mine"));
        assert!(!categories.iter().any(|c| c.name == "Theirs"));
    }
}
