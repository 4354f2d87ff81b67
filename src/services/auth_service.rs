use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::{normalize_email, Identity, Role, User};
use crate::utils::{crypto, time::now};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

/// Signs and checks the HS256 session token carried in the session cookie.
#[derive(Clone)]
pub struct SessionTokens {
    secret: String,
    ttl: Duration,
}

impl SessionTokens {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::hours(ttl_hours.max(1)),
        }
    }

    pub fn issue(&self, identity: Identity) -> Result<String> {
        let exp = (now() + self.ttl).timestamp().max(0) as usize;
        let claims = Claims {
            sub: identity.user_id.to_string(),
            exp,
            role: Some(identity.role.as_str().to_string()),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Identity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| Error::Unauthenticated)?;
        let role: Role = data
            .claims
            .role
            .as_deref()
            .ok_or(Error::Unauthenticated)?
            .parse()
            .map_err(|_| Error::Unauthenticated)?;
        Ok(Identity::new(user_id, role))
    }
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    tokens: SessionTokens,
}

impl AuthService {
    pub fn new(pool: PgPool, tokens: SessionTokens) -> Self {
        Self { pool, tokens }
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String)> {
        let email = normalize_email(email);
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            let _ = crypto::verify_password(password, crypto::decoy_hash());
            tracing::info!("Login rejected");
            return Err(Error::InvalidCredentials);
        };

        if !crypto::verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login rejected");
            return Err(Error::InvalidCredentials);
        }

        let token = self.tokens.issue(Identity::new(user.id, user.role))?;
        tracing::info!(user_id = %user.id, role = %user.role, "User signed in");
        Ok((user, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens::new("0123456789abcdef0123456789abcdef", 1)
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let identity = Identity::new(Uuid::new_v4(), Role::Employer);
        let token = tokens().issue(identity).unwrap();
        assert_eq!(tokens().verify(&token).unwrap(), identity);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = SessionTokens::new("ffffffffffffffffffffffffffffffff", 1);
        let token = other.issue(Identity::new(Uuid::new_v4(), Role::Admin)).unwrap();
        assert!(tokens().verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (now() - Duration::hours(2)).timestamp() as usize,
            role: Some("admin".into()),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"0123456789abcdef0123456789abcdef"),
        )
        .unwrap();
        assert!(tokens().verify(&token).is_err());
    }

    #[test]
    fn token_without_known_role_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (now() + Duration::hours(1)).timestamp() as usize,
            role: Some("root".into()),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"0123456789abcdef0123456789abcdef"),
        )
        .unwrap();
        assert!(matches!(tokens().verify(&token), Err(Error::Unauthenticated)));
    }
}
