// src/functions.rs
//
// The two administrative endpoints served under /functions/v1.
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::api::AppState;
use crate::auth::{authenticate, AuthStore, Caller};
use crate::error::AppError;
use crate::models::{AuthUser, Profile, UserRole};
use crate::roles::Role;
use crate::supabase_client::CreateAuthUser;

// --- admin-list-users ---

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<AuthUser>,
}

/// The organization the caller administers: 403 for any other role, 400
/// for an admin with no organization.
pub fn admin_organization<'a>(caller: &'a Caller, action: &str) -> Result<&'a str, AppError> {
    if caller.role_kind() != Some(Role::OrgAdmin) {
        warn!("User {} tried to {} without admin role", caller.id(), action);
        return Err(AppError::Forbidden(format!(
            "Only organization admins can {}",
            action
        )));
    }
    caller.organization_id().ok_or_else(|| {
        AppError::BadRequest("Admin is not assigned to an organization".to_string())
    })
}

/// Auth records of everyone holding a role in the caller's organization.
/// Anyone but an organization admin gets nothing at all.
pub async fn list_organization_users<S: AuthStore + ?Sized>(
    store: &S,
    caller: &Caller,
) -> Result<Vec<AuthUser>, AppError> {
    let organization_id = admin_organization(caller, "list users")?;

    let member_ids: HashSet<String> = store
        .organization_user_ids(organization_id)
        .await?
        .into_iter()
        .collect();
    let users: Vec<AuthUser> = store
        .list_auth_users()
        .await?
        .into_iter()
        .filter(|u| member_ids.contains(&u.id))
        .collect();

    info!(
        "Listed {} users for organization {} (requested by {})",
        users.len(),
        organization_id,
        caller.id()
    );
    Ok(users)
}

pub async fn handle_admin_list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListUsersResponse>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let users = list_organization_users(&*state.store, &caller).await?;
    Ok(Json(ListUsersResponse { users }))
}

// --- seed-test-users ---

pub const SEED_ORGANIZATION_CODE: &str = "MAB";
pub const SEED_DEPARTMENT_CODE: &str = "CS";
pub const SEED_PROGRAM_CODE: &str = "BSCS";
pub const SEED_PASSWORD: &str = "ClockWise#Test1";

struct SeedAccount {
    email: &'static str,
    full_name: &'static str,
    role: Role,
}

const SEED_ACCOUNTS: [SeedAccount; 3] = [
    SeedAccount {
        email: "admin@clockwise.test",
        full_name: "Test Admin",
        role: Role::OrgAdmin,
    },
    SeedAccount {
        email: "manager@clockwise.test",
        full_name: "Test Manager",
        role: Role::Manager,
    },
    SeedAccount {
        email: "member@clockwise.test",
        full_name: "Test Member",
        role: Role::Member,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeededAccount {
    pub user_id: String,
    pub email: String,
    pub role: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedOutcome {
    pub created: Vec<SeededAccount>,
    pub skipped: Vec<String>,
}

pub async fn seed_test_users<S: AuthStore + ?Sized>(store: &S) -> Result<SeedOutcome, AppError> {
    let organization = store
        .organization_by_code(SEED_ORGANIZATION_CODE)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Organization {} not found", SEED_ORGANIZATION_CODE))
        })?;
    let department = store
        .department_by_code(&organization.id, SEED_DEPARTMENT_CODE)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Department {} not found", SEED_DEPARTMENT_CODE))
        })?;
    let program = store
        .program_by_code(&department.id, SEED_PROGRAM_CODE)
        .await?;
    if program.is_none() {
        warn!(
            "Program {} not found, seeding the member without a program",
            SEED_PROGRAM_CODE
        );
    }

    let registered: HashSet<String> = store
        .list_auth_users()
        .await?
        .into_iter()
        .filter_map(|u| u.email.map(|e| e.to_lowercase()))
        .collect();

    let mut outcome = SeedOutcome::default();
    for account in &SEED_ACCOUNTS {
        if registered.contains(account.email) {
            info!("Seed account {} already registered, skipping", account.email);
            outcome.skipped.push(account.email.to_string());
            continue;
        }

        let user = store
            .create_auth_user(&CreateAuthUser {
                email: account.email.to_string(),
                password: SEED_PASSWORD.to_string(),
                email_confirm: true,
                user_metadata: serde_json::json!({ "full_name": account.full_name }),
            })
            .await?;

        store
            .upsert_profile(&Profile {
                id: user.id.clone(),
                full_name: account.full_name.to_string(),
                phone: None,
                avatar_url: None,
                is_active: true,
            })
            .await?;

        let (department_id, program_id) = match account.role {
            Role::OrgAdmin => (None, None),
            Role::Manager | Role::ProgramManager => (Some(department.id.clone()), None),
            Role::Member => (
                Some(department.id.clone()),
                program.as_ref().map(|p| p.id.clone()),
            ),
        };
        store
            .insert_user_role(&UserRole {
                user_id: user.id.clone(),
                role: account.role,
                organization_id: Some(organization.id.clone()),
                department_id,
                program_id,
            })
            .await?;

        info!("Seeded {} as {}", account.email, account.role.key());
        outcome.created.push(SeededAccount {
            user_id: user.id,
            email: account.email.to_string(),
            role: account.role.key(),
        });
    }
    Ok(outcome)
}

pub async fn handle_seed_test_users(
    State(state): State<AppState>,
) -> Result<Json<SeedOutcome>, AppError> {
    Ok(Json(seed_test_users(&*state.store).await?))
}
