use crate::error::{ConvoError, Result};
use crate::models::{User, UserProfile};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar_url, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar_url, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Create a new user
    ///
    /// A duplicate email surfaces as [`ConvoError::EmailTaken`].
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        avatar_url: Option<&str>,
    ) -> Result<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, avatar_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, avatar_url, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(avatar_url)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                info!(id = user.id, email = %user.email, "Created user");
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.constraint() == Some("unique_user_email") => {
                Err(ConvoError::EmailTaken(email.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Keyword search over name and email, excluding the requesting user.
    ///
    /// An empty keyword matches everyone (except the requester).
    pub async fn search(&self, keyword: Option<&str>, exclude_user: i64) -> Result<Vec<UserProfile>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, name, email, avatar_url FROM users WHERE id <> ",
        );
        query.push_bind(exclude_user);

        if let Some(keyword) = keyword {
            if !keyword.is_empty() {
                let pattern = format!("%{}%", keyword);
                query
                    .push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR email ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        query.push(" ORDER BY name");

        let users: Vec<UserProfile> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(users)
    }

    /// Get the shared guest account, creating it on first use.
    ///
    /// Racing creations are resolved by re-fetching after a duplicate-email
    /// error, so concurrent guest logins all land on the same row.
    pub async fn ensure_guest(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        avatar_url: &str,
    ) -> Result<User> {
        if let Some(user) = self.find_by_email(email).await? {
            return Ok(user);
        }

        match self.create(name, email, password_hash, Some(avatar_url)).await {
            Ok(user) => {
                info!(id = user.id, "Created guest user");
                Ok(user)
            }
            Err(ConvoError::EmailTaken(_)) => self
                .find_by_email(email)
                .await?
                .ok_or_else(|| ConvoError::Internal("guest user vanished after creation race".into())),
            Err(e) => Err(e),
        }
    }
}
