// Database-backed user identifier with YAML fallback

use crate::auth::identifier::{CredentialQuery, Identifier, LookupField};
use crate::auth::token::TokenHash;
use crate::core::crypto::{constant_time_eq, verify_password_blocking};
use crate::core::errors::AuthError;
use crate::core::models::{Credentials, Identity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Database row for credential lookup
#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: Option<String>,
    password_hash: String,
}

/// Database row for token lookups
#[derive(FromRow)]
struct IdentityRow {
    id: i64,
    username: String,
    email: Option<String>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: row.id,
            username: row.username,
            email: row.email,
        }
    }
}

/// Postgres-backed identifier over `users` and `api_tokens`
pub struct DbUserStore {
    db_pool: PgPool,
    password_field: String,
}

impl DbUserStore {
    /// Create a new database-backed user store
    ///
    /// `password_field` names the credentials entry holding the plaintext
    /// password; every other entry filters on a user attribute.
    pub fn new(db_pool: PgPool, password_field: impl Into<String>) -> Self {
        Self {
            db_pool,
            password_field: password_field.into(),
        }
    }
}

#[async_trait]
impl Identifier for DbUserStore {
    async fn find_by_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Identity>, AuthError> {
        let Some(query) = CredentialQuery::from_credentials(credentials, &self.password_field)? else {
            return Ok(None);
        };

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, username, email, password_hash FROM users WHERE ");
        let mut conditions = builder.separated(" AND ");
        for (field, value) in &query.filters {
            conditions.push(format!("{} = ", field.column()));
            match field {
                LookupField::Id => match value.parse::<i64>() {
                    Ok(id) => {
                        conditions.push_bind_unseparated(id);
                    }
                    // A non-numeric id cannot match any row
                    Err(_) => return Ok(None),
                },
                LookupField::Username | LookupField::Email => {
                    conditions.push_bind_unseparated(value.to_string());
                }
            }
        }
        builder.push(" LIMIT 1");

        let row = builder
            .build_query_as::<UserRow>()
            .fetch_optional(&self.db_pool)
            .await?;

        let Some(row) = row else {
            debug!("No user matched credential filters");
            return Ok(None);
        };

        if !verify_password_blocking(query.password, &row.password_hash).await? {
            debug!(user_id = row.id, "Password mismatch");
            return Ok(None);
        }

        Ok(Some(Identity {
            id: row.id,
            username: row.username,
            email: row.email,
        }))
    }

    async fn find_by_auth_token(
        &self,
        token_hash: &TokenHash,
    ) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "SELECT u.id, u.username, u.email
             FROM api_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token_hash = $1 AND t.revoked_at IS NULL",
        )
        .bind(token_hash.as_str())
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.map(Identity::from))
    }

    async fn find_by_remember_token(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<Option<Identity>, AuthError> {
        let Ok(id) = user_id.parse::<i64>() else {
            return Ok(None);
        };

        let row: Option<(i64, String, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT id, username, email, remember_token FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.and_then(|(id, username, email, stored)| {
            let stored = stored?;
            constant_time_eq(&stored, secret).then_some(Identity { id, username, email })
        }))
    }
}

/// Container for users.yaml root structure
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UsersYaml {
    users: Vec<UserEntry>,
}

/// User entry as written in users.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub remember_token: Option<String>,
    /// HMAC-SHA1 hex hashes of issued bearer tokens
    #[serde(default)]
    pub api_token_hashes: Vec<String>,
}

impl UserEntry {
    fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    fn matches(&self, field: LookupField, value: &str) -> bool {
        match field {
            LookupField::Id => value.parse::<i64>().map(|id| id == self.id).unwrap_or(false),
            LookupField::Username => self.username == value,
            LookupField::Email => self.email.as_deref() == Some(value),
        }
    }
}

/// YAML fallback identifier (for deployments without a database)
pub struct YamlUserStore {
    users: Vec<UserEntry>,
    password_field: String,
}

impl YamlUserStore {
    pub fn new(users: Vec<UserEntry>, password_field: impl Into<String>) -> Self {
        Self {
            users,
            password_field: password_field.into(),
        }
    }

    /// Load users from a YAML file
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        password_field: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let path_ref = path.as_ref();

        let yaml_content = fs::read_to_string(path_ref).map_err(|e| {
            AuthError::Configuration(format!("Failed to read users file {:?}: {}", path_ref, e))
        })?;

        let mut parsed: UsersYaml = serde_yaml::from_str(&yaml_content)
            .map_err(|e| AuthError::Configuration(format!("Failed to parse users YAML: {}", e)))?;

        for user in &mut parsed.users {
            for hash in &mut user.api_token_hashes {
                let normalized = TokenHash::from_hash_string(hash).map_err(|e| {
                    AuthError::Configuration(format!(
                        "User {} has an invalid api token hash: {}",
                        user.id, e
                    ))
                })?;
                *hash = normalized.as_str().to_string();
            }
        }

        Ok(Self::new(parsed.users, password_field))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl Identifier for YamlUserStore {
    async fn find_by_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Identity>, AuthError> {
        let Some(query) = CredentialQuery::from_credentials(credentials, &self.password_field)? else {
            return Ok(None);
        };

        let user = self
            .users
            .iter()
            .find(|u| query.filters.iter().all(|(field, value)| u.matches(*field, value)));

        let Some(user) = user else {
            return Ok(None);
        };

        if verify_password_blocking(query.password, &user.password_hash).await? {
            Ok(Some(user.identity()))
        } else {
            Ok(None)
        }
    }

    async fn find_by_auth_token(
        &self,
        token_hash: &TokenHash,
    ) -> Result<Option<Identity>, AuthError> {
        Ok(self
            .users
            .iter()
            .find(|u| {
                u.api_token_hashes
                    .iter()
                    .any(|h| constant_time_eq(&h.to_ascii_lowercase(), token_hash.as_str()))
            })
            .map(UserEntry::identity))
    }

    async fn find_by_remember_token(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<Option<Identity>, AuthError> {
        let Ok(id) = user_id.parse::<i64>() else {
            return Ok(None);
        };

        Ok(self
            .users
            .iter()
            .find(|u| u.id == id)
            .filter(|u| {
                u.remember_token
                    .as_deref()
                    .map(|stored| constant_time_eq(stored, secret))
                    .unwrap_or(false)
            })
            .map(UserEntry::identity))
    }
}
