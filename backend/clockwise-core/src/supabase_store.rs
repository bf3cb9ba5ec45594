// src/supabase_store.rs
//
// Table-level access on top of SupabaseClient. Each method is one request.
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::AuthStore;
use crate::date_range::ISO_DATE_FORMAT;
use crate::directory::DirectoryStore;
use crate::labels::LabelStore;
use crate::models::*;
use crate::roles::Role;
use crate::supabase_client::{CreateAuthUser, SupabaseClient, SupabaseError, TableQuery};
use crate::timesheets::{StatusUpdate, TimesheetStore};
use crate::validation::OrganizationInput;

const PROFILES: &str = "profiles";
const USER_ROLES: &str = "user_roles";
const ORGANIZATIONS: &str = "organizations";
const DEPARTMENTS: &str = "departments";
const PROGRAMS: &str = "programs";
const ACTIVITY_CATEGORIES: &str = "activity_categories";
const ORGANIZATION_LABELS: &str = "organization_labels";
const USER_SETTINGS: &str = "user_settings";
const TIMESHEET_ENTRIES: &str = "timesheet_entries";

const PROFILE_COLUMNS: &str = "id,full_name,phone,avatar_url,is_active";
const ROLE_COLUMNS: &str = "user_id,role,organization_id,department_id,program_id";
const ENTRY_COLUMNS: &str = "id,user_id,entry_date,start_time,end_time,activity_type,\
activity_subtype,notes,status,reviewed_by,review_comment";

#[derive(Debug, Deserialize)]
struct UserIdRow {
    user_id: String,
}

fn iso(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Insert/update calls return the written rows; exactly one is expected.
fn single_row<T>(rows: Vec<T>, context: &str) -> Result<T, SupabaseError> {
    rows.into_iter().next().ok_or_else(|| {
        SupabaseError::ConfigError(format!("{} returned no row", context))
    })
}

#[async_trait]
impl DirectoryStore for SupabaseClient {
    async fn active_profiles(&self) -> Result<Vec<Profile>, SupabaseError> {
        self.select(
            &TableQuery::new(PROFILES)
                .select(PROFILE_COLUMNS)
                .eq("is_active", true)
                .order("full_name", true),
        )
        .await
    }

    async fn roles_for_users(
        &self,
        organization_id: &str,
        role: Role,
        user_ids: &[String],
    ) -> Result<Vec<UserRole>, SupabaseError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            &TableQuery::new(USER_ROLES)
                .select(ROLE_COLUMNS)
                .eq("organization_id", organization_id)
                .eq("role", role.stored_code())
                .in_list("user_id", user_ids),
        )
        .await
    }

    async fn department(&self, department_id: &str) -> Result<Option<Department>, SupabaseError> {
        self.select_one(
            TableQuery::new(DEPARTMENTS)
                .select("id,name,code,organization_id")
                .eq("id", department_id),
        )
        .await
    }

    async fn departments_by_ids(&self, ids: &[String]) -> Result<Vec<Department>, SupabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            &TableQuery::new(DEPARTMENTS)
                .select("id,name,code,organization_id")
                .in_list("id", ids),
        )
        .await
    }

    async fn departments_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Department>, SupabaseError> {
        self.select(
            &TableQuery::new(DEPARTMENTS)
                .select("id,name,code,organization_id")
                .eq("organization_id", organization_id)
                .order("name", true),
        )
        .await
    }

    async fn programs_for_department(
        &self,
        department_id: &str,
    ) -> Result<Vec<Program>, SupabaseError> {
        self.select(
            &TableQuery::new(PROGRAMS)
                .select("id,name,code,department_id")
                .eq("department_id", department_id)
                .order("name", true),
        )
        .await
    }

    async fn activity_categories(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ActivityCategory>, SupabaseError> {
        self.select(
            &TableQuery::new(ACTIVITY_CATEGORIES)
                .select("id,organization_id,department_id,name,display_order")
                .eq("organization_id", organization_id)
                .order("display_order", true),
        )
        .await
    }

    async fn update_organization(
        &self,
        organization_id: &str,
        input: &OrganizationInput,
    ) -> Result<Option<Organization>, SupabaseError> {
        let rows: Vec<Organization> = self
            .update(&TableQuery::new(ORGANIZATIONS).eq("id", organization_id), input)
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl LabelStore for SupabaseClient {
    async fn organization_labels(
        &self,
        organization_id: &str,
    ) -> Result<Option<OrganizationLabels>, SupabaseError> {
        self.select_one(TableQuery::new(ORGANIZATION_LABELS).eq("organization_id", organization_id))
            .await
    }

    async fn save_organization_labels(
        &self,
        labels: &OrganizationLabels,
    ) -> Result<OrganizationLabels, SupabaseError> {
        let rows: Vec<OrganizationLabels> = self
            .upsert(ORGANIZATION_LABELS, "organization_id", labels)
            .await?;
        single_row(rows, "save organization labels")
    }
}

#[async_trait]
impl TimesheetStore for SupabaseClient {
    async fn insert_entry(&self, entry: &NewTimesheetEntry) -> Result<TimesheetEntry, SupabaseError> {
        let rows: Vec<TimesheetEntry> = self.insert(TIMESHEET_ENTRIES, entry).await?;
        single_row(rows, "insert timesheet entry")
    }

    async fn get_entry(&self, entry_id: &str) -> Result<Option<TimesheetEntry>, SupabaseError> {
        self.select_one(
            TableQuery::new(TIMESHEET_ENTRIES)
                .select(ENTRY_COLUMNS)
                .eq("id", entry_id),
        )
        .await
    }

    async fn update_entry_status(
        &self,
        entry_id: &str,
        update: &StatusUpdate,
    ) -> Result<TimesheetEntry, SupabaseError> {
        let rows: Vec<TimesheetEntry> = self
            .update(&TableQuery::new(TIMESHEET_ENTRIES).eq("id", entry_id), update)
            .await?;
        single_row(rows, "update timesheet entry")
    }

    async fn entries_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, SupabaseError> {
        self.select(
            &TableQuery::new(TIMESHEET_ENTRIES)
                .select(ENTRY_COLUMNS)
                .eq("user_id", user_id)
                .gte("entry_date", iso(from))
                .lte("entry_date", iso(to))
                .order("entry_date", true),
        )
        .await
    }

    async fn user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, SupabaseError> {
        self.select_one(
            TableQuery::new(USER_SETTINGS)
                .select("user_id,daily_target_minutes")
                .eq("user_id", user_id),
        )
        .await
    }
}

#[async_trait]
impl AuthStore for SupabaseClient {
    async fn user_for_token(&self, access_token: &str) -> Result<Option<AuthUser>, SupabaseError> {
        self.get_user(access_token).await
    }

    async fn role_for_user(&self, user_id: &str) -> Result<Option<UserRole>, SupabaseError> {
        self.select_one(
            TableQuery::new(USER_ROLES)
                .select(ROLE_COLUMNS)
                .eq("user_id", user_id),
        )
        .await
    }

    async fn organization_user_ids(
        &self,
        organization_id: &str,
    ) -> Result<Vec<String>, SupabaseError> {
        let rows: Vec<UserIdRow> = self
            .select(
                &TableQuery::new(USER_ROLES)
                    .select("user_id")
                    .eq("organization_id", organization_id),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.user_id).collect())
    }

    async fn list_auth_users(&self) -> Result<Vec<AuthUser>, SupabaseError> {
        self.admin_list_users().await
    }

    async fn create_auth_user(&self, new_user: &CreateAuthUser) -> Result<AuthUser, SupabaseError> {
        self.admin_create_user(new_user).await
    }

    async fn organization_by_code(&self, code: &str) -> Result<Option<Organization>, SupabaseError> {
        self.select_one(
            TableQuery::new(ORGANIZATIONS)
                .select("id,name,code")
                .eq("code", code),
        )
        .await
    }

    async fn department_by_code(
        &self,
        organization_id: &str,
        code: &str,
    ) -> Result<Option<Department>, SupabaseError> {
        self.select_one(
            TableQuery::new(DEPARTMENTS)
                .select("id,name,code,organization_id")
                .eq("organization_id", organization_id)
                .eq("code", code),
        )
        .await
    }

    async fn program_by_code(
        &self,
        department_id: &str,
        code: &str,
    ) -> Result<Option<Program>, SupabaseError> {
        self.select_one(
            TableQuery::new(PROGRAMS)
                .select("id,name,code,department_id")
                .eq("department_id", department_id)
                .eq("code", code),
        )
        .await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), SupabaseError> {
        let _: Vec<Profile> = self.upsert(PROFILES, "id", profile).await?;
        Ok(())
    }

    async fn insert_user_role(&self, role: &UserRole) -> Result<(), SupabaseError> {
        let _: Vec<UserRole> = self.insert(USER_ROLES, role).await?;
        Ok(())
    }
}
