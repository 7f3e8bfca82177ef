// Role/permission storage: Postgres plus in-memory store

use crate::core::errors::AuthError;
use crate::rbac::models::{Permission, Role};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Role / permission persistence and the many-to-many link between them
#[async_trait]
pub trait RbacStore: Send + Sync {
    async fn create_role(&self, name: &str) -> Result<Role, AuthError>;
    async fn create_permission(&self, name: &str) -> Result<Permission, AuthError>;
    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, AuthError>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError>;
    async fn find_permission(&self, permission_id: i64) -> Result<Option<Permission>, AuthError>;
    async fn list_roles(&self) -> Result<Vec<Role>, AuthError>;

    /// Delete a role and its join rows; permissions are left untouched
    async fn delete_role(&self, role_id: i64) -> Result<bool, AuthError>;

    /// Delete a permission and its join rows; roles are left untouched
    async fn delete_permission(&self, permission_id: i64) -> Result<bool, AuthError>;

    /// Permissions currently linked to a role, ordered by id
    async fn permissions_for_role(&self, role_id: i64) -> Result<Vec<Permission>, AuthError>;

    /// Link a permission to a role; linking an already linked pair is a no-op
    async fn attach_permission(&self, role_id: i64, permission_id: i64) -> Result<(), AuthError>;

    /// Unlink a permission from a role; returns whether a link was removed
    async fn detach_permission(&self, role_id: i64, permission_id: i64) -> Result<bool, AuthError>;
}

fn map_write_error(err: sqlx::Error, what: &str) -> AuthError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AuthError::Conflict(format!("{} already exists", what));
        }
        if db.is_foreign_key_violation() {
            return AuthError::NotFound(what.to_string());
        }
    }
    err.into()
}

/// Postgres-backed RBAC store
///
/// The role -> permissions relation is always read from `role_permission`;
/// caching happens per `Role` instance only.
pub struct DbRbacStore {
    db_pool: PgPool,
}

impl DbRbacStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RbacStore for DbRbacStore {
    async fn create_role(&self, name: &str) -> Result<Role, AuthError> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, created_at, updated_at)
             VALUES ($1, NOW(), NOW())
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_write_error(e, &format!("role '{}'", name)))
    }

    async fn create_permission(&self, name: &str) -> Result<Permission, AuthError> {
        sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions (name, created_at, updated_at)
             VALUES ($1, NOW(), NOW())
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_write_error(e, &format!("permission '{}'", name)))
    }

    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, AuthError> {
        Ok(sqlx::query_as::<_, Role>(
            "SELECT id, name, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(role_id)
        .fetch_optional(&self.db_pool)
        .await?)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError> {
        Ok(sqlx::query_as::<_, Role>(
            "SELECT id, name, created_at, updated_at FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.db_pool)
        .await?)
    }

    async fn find_permission(&self, permission_id: i64) -> Result<Option<Permission>, AuthError> {
        Ok(sqlx::query_as::<_, Permission>(
            "SELECT id, name, created_at, updated_at FROM permissions WHERE id = $1",
        )
        .bind(permission_id)
        .fetch_optional(&self.db_pool)
        .await?)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, AuthError> {
        Ok(sqlx::query_as::<_, Role>(
            "SELECT id, name, created_at, updated_at FROM roles ORDER BY id",
        )
        .fetch_all(&self.db_pool)
        .await?)
    }

    async fn delete_role(&self, role_id: i64) -> Result<bool, AuthError> {
        let mut tx = self.db_pool.begin().await?;
        sqlx::query("DELETE FROM role_permission WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        Ok(deleted > 0)
    }

    async fn delete_permission(&self, permission_id: i64) -> Result<bool, AuthError> {
        let mut tx = self.db_pool.begin().await?;
        sqlx::query("DELETE FROM role_permission WHERE permission_id = $1")
            .bind(permission_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(permission_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        Ok(deleted > 0)
    }

    async fn permissions_for_role(&self, role_id: i64) -> Result<Vec<Permission>, AuthError> {
        Ok(sqlx::query_as::<_, Permission>(
            "SELECT p.id, p.name, p.created_at, p.updated_at
             FROM permissions p
             JOIN role_permission rp ON rp.permission_id = p.id
             WHERE rp.role_id = $1
             ORDER BY p.id",
        )
        .bind(role_id)
        .fetch_all(&self.db_pool)
        .await?)
    }

    async fn attach_permission(&self, role_id: i64, permission_id: i64) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO role_permission (role_id, permission_id)
             VALUES ($1, $2)
             ON CONFLICT (role_id, permission_id) DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.db_pool)
        .await
        .map_err(|e| {
            map_write_error(e, &format!("role {} or permission {}", role_id, permission_id))
        })?;

        debug!(role_id, permission_id, "Permission attached");
        Ok(())
    }

    async fn detach_permission(&self, role_id: i64, permission_id: i64) -> Result<bool, AuthError> {
        let removed = sqlx::query(
            "DELETE FROM role_permission WHERE role_id = $1 AND permission_id = $2",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(removed > 0)
    }
}

#[derive(Debug, Clone)]
struct RoleRecord {
    id: i64,
    name: String,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl RoleRecord {
    fn to_role(&self) -> Role {
        Role::new(self.id, self.name.clone(), self.created_at, self.updated_at)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    roles: BTreeMap<i64, RoleRecord>,
    permissions: BTreeMap<i64, Permission>,
    // (role_id, permission_id); the set makes duplicates impossible
    links: BTreeSet<(i64, i64)>,
    next_role_id: i64,
    next_permission_id: i64,
}

/// Container for rbac.yaml root structure
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RbacYaml {
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    roles: Vec<RoleSeed>,
}

/// Role entry in rbac.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoleSeed {
    name: String,
    #[serde(default)]
    permissions: Vec<String>,
}

/// In-memory RBAC store (deployments without a database, and tests)
#[derive(Default)]
pub struct MemoryRbacStore {
    state: RwLock<MemoryState>,
}

impl MemoryRbacStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from a YAML file listing permissions and roles
    ///
    /// Permissions referenced by a role are created on demand.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let path_ref = path.as_ref();
        let yaml_content = fs::read_to_string(path_ref).map_err(|e| {
            AuthError::Configuration(format!("Failed to read RBAC file {:?}: {}", path_ref, e))
        })?;
        let seed: RbacYaml = serde_yaml::from_str(&yaml_content)
            .map_err(|e| AuthError::Configuration(format!("Failed to parse RBAC YAML: {}", e)))?;

        let store = Self::new();
        let mut by_name: BTreeMap<String, i64> = BTreeMap::new();

        for name in &seed.permissions {
            if !by_name.contains_key(name) {
                let permission = store.create_permission(name).await?;
                by_name.insert(permission.name, permission.id);
            }
        }

        for role_seed in &seed.roles {
            let role = store.create_role(&role_seed.name).await?;
            for permission_name in &role_seed.permissions {
                let permission_id = match by_name.get(permission_name) {
                    Some(id) => *id,
                    None => {
                        let permission = store.create_permission(permission_name).await?;
                        by_name.insert(permission.name, permission.id);
                        permission.id
                    }
                };
                store.attach_permission(role.id, permission_id).await?;
            }
        }

        info!(
            roles = seed.roles.len(),
            permissions = by_name.len(),
            "RBAC store seeded from YAML"
        );
        Ok(store)
    }
}

#[async_trait]
impl RbacStore for MemoryRbacStore {
    async fn create_role(&self, name: &str) -> Result<Role, AuthError> {
        let mut state = self.state.write().await;
        if state.roles.values().any(|r| r.name == name) {
            return Err(AuthError::Conflict(format!("role '{}' already exists", name)));
        }

        state.next_role_id += 1;
        let now = Utc::now();
        let record = RoleRecord {
            id: state.next_role_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        let role = record.to_role();
        state.roles.insert(record.id, record);
        Ok(role)
    }

    async fn create_permission(&self, name: &str) -> Result<Permission, AuthError> {
        let mut state = self.state.write().await;
        if state.permissions.values().any(|p| p.name == name) {
            return Err(AuthError::Conflict(format!("permission '{}' already exists", name)));
        }

        state.next_permission_id += 1;
        let now = Utc::now();
        let permission = Permission {
            id: state.next_permission_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, AuthError> {
        Ok(self.state.read().await.roles.get(&role_id).map(RoleRecord::to_role))
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .values()
            .find(|r| r.name == name)
            .map(RoleRecord::to_role))
    }

    async fn find_permission(&self, permission_id: i64) -> Result<Option<Permission>, AuthError> {
        Ok(self.state.read().await.permissions.get(&permission_id).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, AuthError> {
        Ok(self.state.read().await.roles.values().map(RoleRecord::to_role).collect())
    }

    async fn delete_role(&self, role_id: i64) -> Result<bool, AuthError> {
        let mut state = self.state.write().await;
        state.links.retain(|(r, _)| *r != role_id);
        Ok(state.roles.remove(&role_id).is_some())
    }

    async fn delete_permission(&self, permission_id: i64) -> Result<bool, AuthError> {
        let mut state = self.state.write().await;
        state.links.retain(|(_, p)| *p != permission_id);
        Ok(state.permissions.remove(&permission_id).is_some())
    }

    async fn permissions_for_role(&self, role_id: i64) -> Result<Vec<Permission>, AuthError> {
        let state = self.state.read().await;
        Ok(state
            .links
            .range((role_id, i64::MIN)..=(role_id, i64::MAX))
            .filter_map(|(_, permission_id)| state.permissions.get(permission_id).cloned())
            .collect())
    }

    async fn attach_permission(&self, role_id: i64, permission_id: i64) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&role_id) {
            return Err(AuthError::NotFound(format!("role {}", role_id)));
        }
        if !state.permissions.contains_key(&permission_id) {
            return Err(AuthError::NotFound(format!("permission {}", permission_id)));
        }
        state.links.insert((role_id, permission_id));
        Ok(())
    }

    async fn detach_permission(&self, role_id: i64, permission_id: i64) -> Result<bool, AuthError> {
        Ok(self.state.write().await.links.remove(&(role_id, permission_id)))
    }
}
