//! User repository trait and implementation

use crate::error::Result;
use crate::models::User;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, SqlitePool};

/// User repository interface
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by id
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>>;

    /// Insert or update a user profile.
    ///
    /// Token columns on the row are left untouched; they belong to the
    /// credential store.
    async fn upsert(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        image_url: Option<&str>,
        product: Option<&str>,
    ) -> Result<()>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let user = query_as::<_, User>(
            "SELECT user_id, display_name, image_url, product, created_at, updated_at
             FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn upsert(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        image_url: Option<&str>,
        product: Option<&str>,
    ) -> Result<()> {
        query(
            r#"
            INSERT INTO users (user_id, display_name, image_url, product, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                image_url = excluded.image_url,
                product = excluded.product,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(image_url)
        .bind(product)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_upsert_and_find_user() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);

        repo.upsert("user-1", Some("Alice"), None, Some("premium"))
            .await
            .unwrap();

        let user = repo.find_by_id("user-1").await.unwrap().unwrap();
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        assert_eq!(user.product.as_deref(), Some("premium"));
    }

    #[tokio::test]
    async fn test_upsert_updates_profile() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);

        repo.upsert("user-1", Some("Alice"), None, None).await.unwrap();
        repo.upsert("user-1", Some("Alice Lee"), Some("https://img.test/a.jpg"), None)
            .await
            .unwrap();

        let user = repo.find_by_id("user-1").await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Alice Lee"));
        assert_eq!(user.image_url.as_deref(), Some("https://img.test/a.jpg"));
    }

    #[tokio::test]
    async fn test_upsert_preserves_tokens() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool.clone());

        repo.upsert("user-1", Some("Alice"), None, None).await.unwrap();
        sqlx::query("UPDATE users SET access_token = 'token' WHERE user_id = 'user-1'")
            .execute(&pool)
            .await
            .unwrap();

        repo.upsert("user-1", Some("Alice Lee"), None, None)
            .await
            .unwrap();

        let (token,): (Option<String>,) =
            sqlx::query_as("SELECT access_token FROM users WHERE user_id = 'user-1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(token.as_deref(), Some("token"));
    }

    #[tokio::test]
    async fn test_find_missing_user() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);

        assert!(repo.find_by_id("nobody").await.unwrap().is_none());
    }
}
