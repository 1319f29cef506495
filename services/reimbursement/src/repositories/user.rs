//! User repository for database operations

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::credentials::{hash_password, verify_password};
use crate::models::{NewUser, ProfileUpdate, Role, User, UserId, UserKind};
use crate::repositories::{UserRecord, UserStore};

const USER_COLUMNS: &str = "user_id, user_type, first_name, last_name, email, date_of_birth";

/// User repository backed by PostgreSQL
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn add_new_user(&self, new_user: &NewUser) -> DatabaseResult<UserId> {
        info!(
            "Creating new {}: {} {}",
            new_user.kind.role(),
            new_user.first_name,
            new_user.last_name
        );

        let password_hash = hash_password(&new_user.password)?;
        let email = match &new_user.kind {
            UserKind::Employee { email, .. } => Some(email.as_str()),
            UserKind::Manager => None,
        };

        let row = sqlx::query(
            r#"
            INSERT INTO users (password_hash, user_type, first_name, last_name, email, date_of_birth)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING user_id
            "#,
        )
        .bind(&password_hash)
        .bind(new_user.kind.role().as_str())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(email)
        .bind(new_user.date_of_birth)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.try_get("user_id")?),
            None => Err(DatabaseError::NoIdentity("users")),
        }
    }

    async fn update_user(&self, update: &ProfileUpdate) -> DatabaseResult<bool> {
        info!("Updating user: {}", update.user_id);

        let password_hash = hash_password(&update.password)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, first_name = $2, last_name = $3, email = $4, date_of_birth = $5
            WHERE user_id = $6
            "#,
        )
        .bind(&password_hash)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(update.email.as_deref())
        .bind(update.date_of_birth)
        .bind(update.user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn authenticate_user(
        &self,
        user_id: UserId,
        password: &str,
    ) -> DatabaseResult<Option<User>> {
        debug!("Authenticating user: {}", user_id);

        let row = sqlx::query(&format!(
            "SELECT {}, password_hash FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_hash: String = row.try_get("password_hash")?;
        if !verify_password(password, &stored_hash)? {
            return Ok(None);
        }

        let record = UserRecord {
            user_id: row.try_get("user_id")?,
            user_type: row.try_get("user_type")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            date_of_birth: row.try_get("date_of_birth")?,
        };

        record.into_user().map(Some)
    }

    async fn get_user(&self, user_id: UserId) -> DatabaseResult<Option<User>> {
        info!("Finding user by ID: {}", user_id);

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(UserRecord::into_user).transpose()
    }

    async fn get_all_employees(&self) -> DatabaseResult<Vec<User>> {
        info!("Listing all employees");

        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE user_type = $1 ORDER BY user_id ASC",
            USER_COLUMNS
        ))
        .bind(Role::Employee.as_str())
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(UserRecord::into_user).collect()
    }

    async fn email_is_available(&self, email: &str) -> DatabaseResult<bool> {
        debug!("Checking email availability: {}", email);

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(!taken)
    }
}
