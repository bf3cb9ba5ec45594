// src/directory.rs
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info};

use crate::models::{ActivityCategory, Department, Organization, Profile, Program, UserRole};
use crate::roles::Role;
use crate::supabase_client::SupabaseError;
use crate::validation::OrganizationInput;

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Active profiles ordered by full name.
    async fn active_profiles(&self) -> Result<Vec<Profile>, SupabaseError>;

    /// Role rows of one organization. The service key bypasses row-level
    /// security, so the organization filter is what scopes the result.
    async fn roles_for_users(
        &self,
        organization_id: &str,
        role: Role,
        user_ids: &[String],
    ) -> Result<Vec<UserRole>, SupabaseError>;

    async fn department(&self, department_id: &str) -> Result<Option<Department>, SupabaseError>;

    async fn departments_by_ids(&self, ids: &[String]) -> Result<Vec<Department>, SupabaseError>;

    async fn departments_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Department>, SupabaseError>;

    async fn programs_for_department(
        &self,
        department_id: &str,
    ) -> Result<Vec<Program>, SupabaseError>;

    /// Every category of the organization, organization-wide and
    /// department-scoped alike.
    async fn activity_categories(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ActivityCategory>, SupabaseError>;

    /// `None` when no organization has that id.
    async fn update_organization(
        &self,
        organization_id: &str,
        input: &OrganizationInput,
    ) -> Result<Option<Organization>, SupabaseError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberListing {
    pub id: String,
    pub full_name: String,
    pub department_name: Option<String>,
}

/// Joins the three collections. Profiles without a role row are dropped;
/// the profiles' order is kept as-is.
pub fn merge_member_directory(
    profiles: &[Profile],
    roles: &[UserRole],
    departments: &[Department],
) -> Vec<MemberListing> {
    let user_department: HashMap<&str, Option<&str>> = roles
        .iter()
        .map(|r| (r.user_id.as_str(), r.department_id.as_deref()))
        .collect();
    let department_names: HashMap<&str, &str> = departments
        .iter()
        .map(|d| (d.id.as_str(), d.name.as_str()))
        .collect();

    profiles
        .iter()
        .filter_map(|profile| {
            let department_id = *user_department.get(profile.id.as_str())?;
            Some(MemberListing {
                id: profile.id.clone(),
                full_name: profile.full_name.clone(),
                department_name: department_id
                    .and_then(|id| department_names.get(id))
                    .map(|name| name.to_string()),
            })
        })
        .collect()
}

pub async fn fetch_member_directory<S: DirectoryStore + ?Sized>(
    store: &S,
    organization_id: &str,
) -> Vec<MemberListing> {
    fetch_role_directory(store, organization_id, Role::Member).await
}

/// Profiles, then the organization's `role` rows among them, then the
/// departments those rows reference. Any failed fetch is logged and yields
/// an empty list.
pub async fn fetch_role_directory<S: DirectoryStore + ?Sized>(
    store: &S,
    organization_id: &str,
    role: Role,
) -> Vec<MemberListing> {
    match try_fetch_role_directory(store, organization_id, role).await {
        Ok(listing) => listing,
        Err(e) => {
            error!(
                "Failed to load {} directory for organization {}: {}",
                role, organization_id, e
            );
            Vec::new()
        }
    }
}

async fn try_fetch_role_directory<S: DirectoryStore + ?Sized>(
    store: &S,
    organization_id: &str,
    role: Role,
) -> Result<Vec<MemberListing>, SupabaseError> {
    let profiles = store.active_profiles().await?;
    if profiles.is_empty() {
        return Ok(Vec::new());
    }
    let profile_ids: Vec<String> = profiles.iter().map(|p| p.id.clone()).collect();

    let roles = store
        .roles_for_users(organization_id, role, &profile_ids)
        .await?;

    let mut department_ids: Vec<String> =
        roles.iter().filter_map(|r| r.department_id.clone()).collect();
    department_ids.sort();
    department_ids.dedup();
    let departments = if department_ids.is_empty() {
        Vec::new()
    } else {
        store.departments_by_ids(&department_ids).await?
    };

    let listing = merge_member_directory(&profiles, &roles, &departments);
    info!(
        "{} directory for {}: {} profiles, {} role rows, {} listed",
        role,
        organization_id,
        profiles.len(),
        roles.len(),
        listing.len()
    );
    Ok(listing)
}

pub async fn fetch_departments<S: DirectoryStore + ?Sized>(
    store: &S,
    organization_id: &str,
) -> Vec<Department> {
    store
        .departments_for_organization(organization_id)
        .await
        .unwrap_or_else(|e| {
            error!(
                "Failed to load departments for organization {}: {}",
                organization_id, e
            );
            Vec::new()
        })
}

/// Programs only ever come scoped to one department; no id, no fetch.
pub async fn fetch_programs<S: DirectoryStore + ?Sized>(
    store: &S,
    department_id: &str,
) -> Vec<Program> {
    if department_id.trim().is_empty() {
        return Vec::new();
    }
    store
        .programs_for_department(department_id)
        .await
        .unwrap_or_else(|e| {
            error!(
                "Failed to load programs for department {}: {}",
                department_id, e
            );
            Vec::new()
        })
}

/// Department-specific categories replace the organization-wide set when the
/// department has any; the two are never merged.
pub fn resolve_activity_categories(
    categories: Vec<ActivityCategory>,
    department_id: Option<&str>,
) -> Vec<ActivityCategory> {
    let (department_specific, organization_wide): (Vec<_>, Vec<_>) = categories
        .into_iter()
        .partition(|c| c.department_id.is_some());

    let mut chosen = match department_id {
        Some(dept) => {
            let own: Vec<ActivityCategory> = department_specific
                .into_iter()
                .filter(|c| c.department_id.as_deref() == Some(dept))
                .collect();
            if own.is_empty() {
                organization_wide
            } else {
                own
            }
        }
        None => organization_wide,
    };
    chosen.sort_by_key(|c| c.display_order);
    chosen
}

pub async fn fetch_activity_categories<S: DirectoryStore + ?Sized>(
    store: &S,
    organization_id: &str,
    department_id: Option<&str>,
) -> Vec<ActivityCategory> {
    match store.activity_categories(organization_id).await {
        Ok(categories) => resolve_activity_categories(categories, department_id),
        Err(e) => {
            error!(
                "Failed to load activity categories for organization {}: {}",
                organization_id, e
            );
            Vec::new()
        }
    }
}
