use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::{normalize_email, Identity, Role, User};
use crate::services::storage_service::StorageService;
use crate::utils::crypto;

const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
    storage: StorageService,
}

impl UserService {
    pub fn new(pool: PgPool, storage: StorageService) -> Self {
        Self { pool, storage }
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(user)
    }

    /// Creates the bootstrap administrator unless an account with that email
    /// already exists; an existing account is never modified.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<()> {
        let email = normalize_email(email);
        let existing: Option<(Uuid, Role)> =
            sqlx::query_as("SELECT id, role FROM users WHERE email = $1")
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;

        match existing {
            Some((id, Role::Admin)) => {
                tracing::info!(user_id = %id, "Bootstrap admin already present");
            }
            Some((id, role)) => {
                tracing::warn!(user_id = %id, role = %role, "Bootstrap admin email belongs to a non-admin account");
            }
            None => {
                let mut conn = self.pool.acquire().await?;
                match insert_user(&mut conn, &email, password, Role::Admin).await {
                    Ok(user) => tracing::info!(user_id = %user.id, "Bootstrap admin created"),
                    // Another instance got there first.
                    Err(Error::Duplicate(_)) => {
                        tracing::info!("Bootstrap admin already present")
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Deletes the account; the database cascades to the profile, its status
    /// history and its document rows. Stored files are removed afterwards on a
    /// best-effort basis.
    pub async fn delete(&self, actor: &Identity, id: Uuid) -> Result<()> {
        actor.require_admin()?;
        if actor.user_id == id {
            return Err(Error::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let stored_paths: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT d.stored_path
            FROM documents d
            LEFT JOIN students s ON s.id = d.student_id
            LEFT JOIN employers e ON e.id = d.employer_id
            WHERE s.user_id = $1 OR e.user_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }
        tx.commit().await?;

        for (path,) in &stored_paths {
            self.storage.remove_best_effort(path).await;
        }
        tracing::info!(
            user_id = %id,
            actor = %actor.user_id,
            documents = stored_paths.len(),
            "User deleted"
        );
        Ok(())
    }

    /// Admin-side reset, used to action password-reset requests.
    pub async fn set_password(&self, actor: &Identity, id: Uuid, new_password: &str) -> Result<()> {
        actor.require_admin()?;
        self.store_password(id, new_password).await?;
        tracing::info!(user_id = %id, actor = %actor.user_id, "Password reset by admin");
        Ok(())
    }

    pub async fn change_own_password(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.get(identity.user_id).await?;
        if !crypto::verify_password(current_password, &user.password_hash)? {
            return Err(Error::Validation("Current password is incorrect".to_string()));
        }
        self.store_password(user.id, new_password).await?;
        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    async fn store_password(&self, id: Uuid, new_password: &str) -> Result<()> {
        check_password(new_password)?;
        let hash = crypto::hash_password(new_password)?;
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}

/// Inserts a user on an existing connection so profile creation can share
/// the transaction.
pub async fn insert_user(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(Error::Validation("Email is required".to_string()));
    }
    check_password(password)?;
    let password_hash = crypto::hash_password(password)?;

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, role)
        VALUES ($1, $2, $3)
        RETURNING id, email, password_hash, role, created_at, updated_at
        "#,
    )
    .bind(&email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match Error::from(e) {
        Error::Duplicate(_) => {
            Error::Duplicate("A user with this email already exists".to_string())
        }
        other => other,
    })
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(Error::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}
