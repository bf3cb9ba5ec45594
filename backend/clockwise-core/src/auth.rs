// src/auth.rs
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Serialize;

use crate::models::{AuthUser, Department, Organization, Profile, Program, UserRole};
use crate::roles::Role;
use crate::supabase_client::{CreateAuthUser, SupabaseError};

/// Auth provider plus the role table, as the administrative endpoints see it.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// `None` when the provider does not accept the token.
    async fn user_for_token(&self, access_token: &str) -> Result<Option<AuthUser>, SupabaseError>;

    async fn role_for_user(&self, user_id: &str) -> Result<Option<UserRole>, SupabaseError>;

    async fn organization_user_ids(&self, organization_id: &str)
        -> Result<Vec<String>, SupabaseError>;

    async fn list_auth_users(&self) -> Result<Vec<AuthUser>, SupabaseError>;

    async fn create_auth_user(&self, new_user: &CreateAuthUser) -> Result<AuthUser, SupabaseError>;

    async fn organization_by_code(&self, code: &str) -> Result<Option<Organization>, SupabaseError>;

    async fn department_by_code(
        &self,
        organization_id: &str,
        code: &str,
    ) -> Result<Option<Department>, SupabaseError>;

    async fn program_by_code(
        &self,
        department_id: &str,
        code: &str,
    ) -> Result<Option<Program>, SupabaseError>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), SupabaseError>;

    async fn insert_user_role(&self, role: &UserRole) -> Result<(), SupabaseError>;
}

/// An authenticated request's identity. `role` is `None` for a valid
/// account with no role row yet.
#[derive(Debug, Clone, Serialize)]
pub struct Caller {
    pub user: AuthUser,
    pub role: Option<UserRole>,
}

impl Caller {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn role_kind(&self) -> Option<Role> {
        self.role.as_ref().map(|r| r.role)
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.role.as_ref().and_then(|r| r.organization_id.as_deref())
    }

    pub fn department_id(&self) -> Option<&str> {
        self.role.as_ref().and_then(|r| r.department_id.as_deref())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingToken,
    #[error("Invalid or expired access token")]
    InvalidToken,
    #[error(transparent)]
    Store(#[from] SupabaseError),
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Token to user, then user to role row.
pub async fn authenticate<S: AuthStore + ?Sized>(
    store: &S,
    headers: &HeaderMap,
) -> Result<Caller, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    let user = store
        .user_for_token(token)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    let role = store.role_for_user(&user.id).await?;
    Ok(Caller { user, role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn authenticate_resolves_user_and_role() {
        let store = MemoryStore::seeded();
        let caller = authenticate(&store, &headers("Bearer token-admin")).await.unwrap();
        assert_eq!(caller.id(), "user-admin");
        assert_eq!(caller.role_kind(), Some(Role::OrgAdmin));
        assert_eq!(caller.organization_id(), Some("org-mab"));

        assert!(matches!(
            authenticate(&store, &headers("Bearer nope")).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            authenticate(&store, &HeaderMap::new()).await,
            Err(AuthError::MissingToken)
        ));
    }
}
