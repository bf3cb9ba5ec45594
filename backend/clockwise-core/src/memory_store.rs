// src/memory_store.rs
//
// In-memory stand-in for the hosted backend, used by unit and router tests.
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::auth::AuthStore;
use crate::directory::DirectoryStore;
use crate::labels::LabelStore;
use crate::models::*;
use crate::roles::Role;
use crate::supabase_client::{CreateAuthUser, SupabaseError};
use crate::timesheets::{StatusUpdate, TimesheetStore};
use crate::validation::OrganizationInput;

#[derive(Default)]
struct Data {
    organizations: Vec<Organization>,
    departments: Vec<Department>,
    programs: Vec<Program>,
    profiles: Vec<Profile>,
    roles: Vec<UserRole>,
    auth_users: Vec<AuthUser>,
    tokens: HashMap<String, String>,
    labels: Vec<OrganizationLabels>,
    categories: Vec<ActivityCategory>,
    settings: Vec<UserSettings>,
    entries: Vec<TimesheetEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Data>,
    fail_reads: AtomicBool,
    next_id: AtomicUsize,
}

fn auth_user(id: &str, email: &str) -> AuthUser {
    AuthUser {
        id: id.to_string(),
        email: Some(email.to_string()),
        extra: serde_json::Map::new(),
    }
}

fn profile(id: &str, full_name: &str, is_active: bool) -> Profile {
    Profile {
        id: id.to_string(),
        full_name: full_name.to_string(),
        phone: None,
        avatar_url: None,
        is_active,
    }
}

fn role(user_id: &str, role: Role, org: Option<&str>, dept: Option<&str>) -> UserRole {
    UserRole {
        user_id: user_id.to_string(),
        role,
        organization_id: org.map(String::from),
        department_id: dept.map(String::from),
        program_id: None,
    }
}

fn entry(id: &str, user_id: &str, date: &str, start: &str, end: &str, activity: ActivityType, status: EntryStatus) -> TimesheetEntry {
    TimesheetEntry {
        id: id.to_string(),
        user_id: user_id.to_string(),
        entry_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        activity_type: activity,
        activity_subtype: None,
        notes: None,
        status,
        reviewed_by: None,
        review_comment: None,
    }
}

impl MemoryStore {
    /// Organization `MAB` with a CS department, a BSCS program, and one
    /// account per role; organization `OTH` with a Biology department, a
    /// BSBIO program, and one member. Tokens are `token-<suffix>` for
    /// `user-<suffix>`.
    pub fn seeded() -> Self {
        let mut pm_role = role("user-pm", Role::ProgramManager, Some("org-mab"), Some("dept-cs"));
        pm_role.program_id = Some("prog-bscs".to_string());

        let data = Data {
            organizations: vec![
                Organization {
                    id: "org-mab".to_string(),
                    name: "Mabini Academy".to_string(),
                    code: "MAB".to_string(),
                },
                Organization {
                    id: "org-other".to_string(),
                    name: "Other College".to_string(),
                    code: "OTH".to_string(),
                },
            ],
            departments: vec![
                Department {
                    id: "dept-cs".to_string(),
                    name: "Computer Science".to_string(),
                    code: "CS".to_string(),
                    organization_id: Some("org-mab".to_string()),
                },
                Department {
                    id: "dept-other".to_string(),
                    name: "Mathematics".to_string(),
                    code: "MATH".to_string(),
                    organization_id: Some("org-mab".to_string()),
                },
                Department {
                    id: "dept-bio".to_string(),
                    name: "Biology".to_string(),
                    code: "BIO".to_string(),
                    organization_id: Some("org-other".to_string()),
                },
            ],
            programs: vec![
                Program {
                    id: "prog-bscs".to_string(),
                    name: "BS Computer Science".to_string(),
                    code: "BSCS".to_string(),
                    department_id: "dept-cs".to_string(),
                },
                Program {
                    id: "prog-bsbio".to_string(),
                    name: "BS Biology".to_string(),
                    code: "BSBIO".to_string(),
                    department_id: "dept-bio".to_string(),
                },
            ],
            profiles: vec![
                profile("user-admin", "Ada Admin", true),
                profile("user-manager", "Hana Manager", true),
                profile("user-inactive", "Ivy Inactive", false),
                profile("user-member", "Maya Member", true),
                profile("user-member-2", "Omar Member", true),
                profile("user-pm", "Priya Program", true),
                profile("user-outsider", "Zed Outsider", true),
            ],
            roles: vec![
                role("user-admin", Role::OrgAdmin, Some("org-mab"), None),
                role("user-manager", Role::Manager, Some("org-mab"), Some("dept-cs")),
                role("user-member", Role::Member, Some("org-mab"), Some("dept-cs")),
                role("user-member-2", Role::Member, Some("org-mab"), Some("dept-other")),
                role("user-inactive", Role::Member, Some("org-mab"), Some("dept-cs")),
                pm_role,
                role("user-outsider", Role::Member, Some("org-other"), Some("dept-bio")),
                role("user-orphan", Role::OrgAdmin, None, None),
            ],
            auth_users: vec![
                auth_user("user-admin", "admin@mab.edu"),
                auth_user("user-manager", "manager@mab.edu"),
                auth_user("user-member", "member@mab.edu"),
                auth_user("user-member-2", "member2@mab.edu"),
                auth_user("user-inactive", "inactive@mab.edu"),
                auth_user("user-pm", "pm@mab.edu"),
                auth_user("user-outsider", "someone@other.edu"),
                auth_user("user-orphan", "orphan@nowhere.edu"),
                auth_user("user-norole", "norole@mab.edu"),
            ],
            tokens: [
                "admin", "manager", "member", "member-2", "pm", "outsider", "orphan", "norole",
            ]
            .iter()
            .map(|suffix| (format!("token-{}", suffix), format!("user-{}", suffix)))
            .collect(),
            labels: vec![OrganizationLabels {
                organization_id: "org-mab".to_string(),
                manager_label: Some("Head of Department".to_string()),
                member_label: Some("Faculty".to_string()),
                ..Default::default()
            }],
            categories: vec![
                ActivityCategory {
                    id: "cat-lecture".to_string(),
                    organization_id: "org-mab".to_string(),
                    department_id: None,
                    name: "Lecture".to_string(),
                    display_order: 1,
                },
                ActivityCategory {
                    id: "cat-office".to_string(),
                    organization_id: "org-mab".to_string(),
                    department_id: None,
                    name: "Office Hours".to_string(),
                    display_order: 2,
                },
                ActivityCategory {
                    id: "cat-lab".to_string(),
                    organization_id: "org-mab".to_string(),
                    department_id: Some("dept-cs".to_string()),
                    name: "Lab Session".to_string(),
                    display_order: 1,
                },
            ],
            settings: vec![UserSettings {
                user_id: "user-member".to_string(),
                daily_target_minutes: 360,
            }],
            entries: vec![
                entry("entry-1", "user-member", "2024-03-04", "09:00:00", "12:00:00", ActivityType::Class, EntryStatus::Approved),
                entry("entry-2", "user-member", "2024-03-05", "13:00:00", "14:30:00", ActivityType::Quiz, EntryStatus::Submitted),
                entry("entry-3", "user-member-2", "2024-03-05", "08:00:00", "10:00:00", ActivityType::Invigilation, EntryStatus::Submitted),
            ],
        };

        Self {
            data: Mutex::new(data),
            fail_reads: AtomicBool::new(false),
            next_id: AtomicUsize::new(100),
        }
    }

    /// Every read after this returns a 503 until switched off again.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn role_of(&self, user_id: &str) -> Option<UserRole> {
        self.lock().roles.iter().find(|r| r.user_id == user_id).cloned()
    }

    pub fn entries_snapshot(&self) -> Vec<TimesheetEntry> {
        self.lock().entries.clone()
    }

    pub fn auth_users_snapshot(&self) -> Vec<AuthUser> {
        self.lock().auth_users.clone()
    }

    pub fn profiles_snapshot(&self) -> Vec<Profile> {
        self.lock().profiles.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Data> {
        self.data.lock().unwrap()
    }

    fn read(&self) -> Result<std::sync::MutexGuard<'_, Data>, SupabaseError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SupabaseError::Api {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                message: "memory store reads disabled".to_string(),
            });
        }
        Ok(self.lock())
    }

    fn new_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn active_profiles(&self) -> Result<Vec<Profile>, SupabaseError> {
        let mut profiles: Vec<Profile> = self
            .read()?
            .profiles
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(profiles)
    }

    async fn roles_for_users(
        &self,
        organization_id: &str,
        role: Role,
        user_ids: &[String],
    ) -> Result<Vec<UserRole>, SupabaseError> {
        Ok(self
            .read()?
            .roles
            .iter()
            .filter(|r| {
                r.organization_id.as_deref() == Some(organization_id)
                    && r.role == role
                    && user_ids.contains(&r.user_id)
            })
            .cloned()
            .collect())
    }

    async fn department(&self, department_id: &str) -> Result<Option<Department>, SupabaseError> {
        Ok(self
            .read()?
            .departments
            .iter()
            .find(|d| d.id == department_id)
            .cloned())
    }

    async fn departments_by_ids(&self, ids: &[String]) -> Result<Vec<Department>, SupabaseError> {
        Ok(self
            .read()?
            .departments
            .iter()
            .filter(|d| ids.contains(&d.id))
            .cloned()
            .collect())
    }

    async fn departments_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Department>, SupabaseError> {
        Ok(self
            .read()?
            .departments
            .iter()
            .filter(|d| d.organization_id.as_deref() == Some(organization_id))
            .cloned()
            .collect())
    }

    async fn programs_for_department(
        &self,
        department_id: &str,
    ) -> Result<Vec<Program>, SupabaseError> {
        Ok(self
            .read()?
            .programs
            .iter()
            .filter(|p| p.department_id == department_id)
            .cloned()
            .collect())
    }

    async fn activity_categories(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ActivityCategory>, SupabaseError> {
        Ok(self
            .read()?
            .categories
            .iter()
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn update_organization(
        &self,
        organization_id: &str,
        input: &OrganizationInput,
    ) -> Result<Option<Organization>, SupabaseError> {
        let mut data = self.lock();
        Ok(data
            .organizations
            .iter_mut()
            .find(|o| o.id == organization_id)
            .map(|o| {
                o.name = input.name.clone();
                o.code = input.code.clone();
                o.clone()
            }))
    }
}

#[async_trait]
impl LabelStore for MemoryStore {
    async fn organization_labels(
        &self,
        organization_id: &str,
    ) -> Result<Option<OrganizationLabels>, SupabaseError> {
        Ok(self
            .read()?
            .labels
            .iter()
            .find(|l| l.organization_id == organization_id)
            .cloned())
    }

    async fn save_organization_labels(
        &self,
        labels: &OrganizationLabels,
    ) -> Result<OrganizationLabels, SupabaseError> {
        let mut data = self.lock();
        data.labels.retain(|l| l.organization_id != labels.organization_id);
        data.labels.push(labels.clone());
        Ok(labels.clone())
    }
}

#[async_trait]
impl TimesheetStore for MemoryStore {
    async fn insert_entry(&self, new: &NewTimesheetEntry) -> Result<TimesheetEntry, SupabaseError> {
        let entry = TimesheetEntry {
            id: self.new_id("entry"),
            user_id: new.user_id.clone(),
            entry_date: new.entry_date,
            start_time: new.start_time.clone(),
            end_time: new.end_time.clone(),
            activity_type: new.activity_type,
            activity_subtype: new.activity_subtype.clone(),
            notes: new.notes.clone(),
            status: new.status,
            reviewed_by: None,
            review_comment: None,
        };
        self.lock().entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_entry(&self, entry_id: &str) -> Result<Option<TimesheetEntry>, SupabaseError> {
        Ok(self.read()?.entries.iter().find(|e| e.id == entry_id).cloned())
    }

    async fn update_entry_status(
        &self,
        entry_id: &str,
        update: &StatusUpdate,
    ) -> Result<TimesheetEntry, SupabaseError> {
        let mut data = self.lock();
        let entry = data
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| SupabaseError::Api {
                status: reqwest::StatusCode::NOT_FOUND,
                message: format!("entry {} not found", entry_id),
            })?;
        entry.status = update.status;
        entry.reviewed_by = update.reviewed_by.clone();
        entry.review_comment = update.review_comment.clone();
        Ok(entry.clone())
    }

    async fn entries_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, SupabaseError> {
        let mut entries: Vec<TimesheetEntry> = self
            .read()?
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.entry_date >= from && e.entry_date <= to)
            .cloned()
            .collect();
        entries.sort_by(|a, b| (a.entry_date, &a.start_time).cmp(&(b.entry_date, &b.start_time)));
        Ok(entries)
    }

    async fn user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, SupabaseError> {
        Ok(self
            .read()?
            .settings
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn user_for_token(&self, access_token: &str) -> Result<Option<AuthUser>, SupabaseError> {
        let data = self.read()?;
        Ok(data
            .tokens
            .get(access_token)
            .and_then(|id| data.auth_users.iter().find(|u| &u.id == id))
            .cloned())
    }

    async fn role_for_user(&self, user_id: &str) -> Result<Option<UserRole>, SupabaseError> {
        Ok(self.read()?.roles.iter().find(|r| r.user_id == user_id).cloned())
    }

    async fn organization_user_ids(
        &self,
        organization_id: &str,
    ) -> Result<Vec<String>, SupabaseError> {
        Ok(self
            .read()?
            .roles
            .iter()
            .filter(|r| r.organization_id.as_deref() == Some(organization_id))
            .map(|r| r.user_id.clone())
            .collect())
    }

    async fn list_auth_users(&self) -> Result<Vec<AuthUser>, SupabaseError> {
        Ok(self.read()?.auth_users.clone())
    }

    async fn create_auth_user(&self, new_user: &CreateAuthUser) -> Result<AuthUser, SupabaseError> {
        let user = auth_user(&self.new_id("user"), &new_user.email);
        self.lock().auth_users.push(user.clone());
        Ok(user)
    }

    async fn organization_by_code(&self, code: &str) -> Result<Option<Organization>, SupabaseError> {
        Ok(self
            .read()?
            .organizations
            .iter()
            .find(|o| o.code == code)
            .cloned())
    }

    async fn department_by_code(
        &self,
        organization_id: &str,
        code: &str,
    ) -> Result<Option<Department>, SupabaseError> {
        Ok(self
            .read()?
            .departments
            .iter()
            .find(|d| d.code == code && d.organization_id.as_deref() == Some(organization_id))
            .cloned())
    }

    async fn program_by_code(
        &self,
        department_id: &str,
        code: &str,
    ) -> Result<Option<Program>, SupabaseError> {
        Ok(self
            .read()?
            .programs
            .iter()
            .find(|p| p.code == code && p.department_id == department_id)
            .cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), SupabaseError> {
        let mut data = self.lock();
        data.profiles.retain(|p| p.id != profile.id);
        data.profiles.push(profile.clone());
        Ok(())
    }

    async fn insert_user_role(&self, role: &UserRole) -> Result<(), SupabaseError> {
        self.lock().roles.push(role.clone());
        Ok(())
    }
}
