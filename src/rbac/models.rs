// RBAC entities: roles, permissions and the lazy role -> permissions relation

use crate::core::errors::AuthError;
use crate::core::models::Timestamp;
use crate::rbac::store::RbacStore;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tokio::sync::OnceCell;

/// A permission row from the `permissions` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Per-instance cache of a role's permissions
#[derive(Debug, Clone, Default)]
struct PermissionCache(OnceCell<Vec<Permission>>);

/// A role row from the `roles` table
///
/// Permissions are linked through `role_permission(role_id, permission_id)`;
/// neither side owns the other.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[sqlx(skip)]
    #[serde(skip)]
    permissions: PermissionCache,
}

impl Role {
    pub fn new(id: i64, name: impl Into<String>, created_at: Timestamp, updated_at: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            updated_at,
            permissions: PermissionCache::default(),
        }
    }

    /// Permissions linked to this role through the join table
    ///
    /// Resolved on first access and cached on this instance; later calls do
    /// not hit the store until `reload_permissions` is called.
    pub async fn permissions(&self, store: &dyn RbacStore) -> Result<&[Permission], AuthError> {
        self.permissions
            .0
            .get_or_try_init(|| store.permissions_for_role(self.id))
            .await
            .map(Vec::as_slice)
    }

    /// Drop the cached relation so the next access re-queries
    pub fn reload_permissions(&mut self) {
        self.permissions.0.take();
    }

    pub fn permissions_loaded(&self) -> bool {
        self.permissions.0.initialized()
    }

    /// Whether the role grants a permission with the given name
    pub async fn has_permission(&self, store: &dyn RbacStore, name: &str) -> Result<bool, AuthError> {
        Ok(self.permissions(store).await?.iter().any(|p| p.name == name))
    }
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
    }
}

impl Eq for Role {}
